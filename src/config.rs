use std::time::Duration;

use crate::chart::PanelSettings;
use crate::chat::ModelFilter;
use crate::series::view::{DEFAULT_WINDOW_HOURS, POINT_BUDGET};
use crate::series::{Mode, Range, ViewSelection};

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub poll_secs: u64,
    pub window_hours: i64,
    pub point_budget: usize,
    pub chat_api_base: String,
    pub chat_api_token: Option<String>,
    pub chat_model: String,
    /// Newest cards translated automatically on each conversation refresh.
    pub auto_translate: usize,
    pub resize_debounce_ms: u64,
    pub viewport_width: u32,
    pub range: String,
    pub mode: String,
    pub model_filter: String,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("BOARD_API_BASE").unwrap_or_else(|_| "http://localhost:3000/api/nof1".to_string()),
            poll_secs: std::env::var("POLL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(5),
            window_hours: std::env::var("WINDOW_HOURS").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_WINDOW_HOURS),
            point_budget: std::env::var("POINT_BUDGET").ok().and_then(|v| v.parse().ok()).unwrap_or(POINT_BUDGET),
            chat_api_base: std::env::var("CHAT_API_BASE").unwrap_or_else(|_| "https://api.siliconflow.cn/v1".to_string()),
            chat_api_token: std::env::var("CHAT_API_TOKEN").ok().filter(|v| !v.trim().is_empty()),
            chat_model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "Qwen/Qwen2.5-7B-Instruct".to_string()),
            auto_translate: std::env::var("AUTO_TRANSLATE").ok().and_then(|v| v.parse().ok()).unwrap_or(3),
            resize_debounce_ms: std::env::var("RESIZE_DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(150),
            viewport_width: std::env::var("VIEWPORT_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(1280),
            range: std::env::var("RANGE").unwrap_or_else(|_| "ALL".to_string()),
            mode: std::env::var("MODE").unwrap_or_else(|_| "$".to_string()),
            model_filter: std::env::var("MODEL_FILTER").unwrap_or_else(|_| "ALL".to_string()),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
        }
    }

    /// `window` selects the configured trailing window; anything unparseable is `ALL`.
    pub fn parse_range(&self, s: &str) -> Range {
        if s.trim().eq_ignore_ascii_case("window") {
            return Range::trailing_hours(self.window_hours);
        }
        Range::parse(s).unwrap_or(Range::All)
    }

    pub fn initial_selection(&self) -> ViewSelection {
        ViewSelection {
            range: self.parse_range(&self.range),
            mode: Mode::parse(&self.mode).unwrap_or(Mode::Absolute),
        }
    }

    pub fn model_filter(&self) -> ModelFilter {
        ModelFilter::parse(&self.model_filter)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn debug_endpoints(&self) -> Vec<String> {
        vec![self.endpoint("since-inception-values"), self.endpoint("account-totals")]
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            budget: self.point_budget,
            poll_secs: self.poll_secs,
            viewport_width: self.viewport_width,
            selection: self.initial_selection(),
            debug_endpoints: self.debug_endpoints(),
        }
    }
}
