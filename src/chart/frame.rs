use serde::Serialize;

use crate::series::view::{last_index, last_known_value};
use crate::series::{
    ActiveSet, AnimationLatch, MergeOutcome, Mode, ModelSet, Range, RawPoint, Row, SeriesAggregator,
    ViewSelection,
};

use super::format::{
    format_axis_tick, format_axis_time, format_tooltip, format_tooltip_time, format_value, reference_line,
};
use super::layout::LabelLayout;

pub const FEED_ERROR_MESSAGE: &str = "Account value feed is temporarily unavailable, please retry later.";
pub const EMPTY_MESSAGE: &str = "Not enough chart data yet (at least 2 points are needed).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub budget: usize,
    pub poll_secs: u64,
    pub viewport_width: u32,
    pub selection: ViewSelection,
    /// Raw feed URLs shown in the empty state for manual inspection.
    pub debug_endpoints: Vec<String>,
}

/// One drawable series: the line plus its end-of-line label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub model_id: String,
    pub visible: bool,
    pub end_index: Option<usize>,
    pub last_value: Option<f64>,
    pub label: String,
    pub tooltip: Option<String>,
}

/// Axis and hover text for the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabels {
    pub time_start: String,
    pub time_end: String,
    /// Tooltip header for the newest row.
    pub latest_time: String,
    /// Low, reference and high ticks over the visible lines.
    pub value_ticks: Vec<String>,
}

impl AxisLabels {
    fn build(rows: &[Row], lines: &[Line], mode: Mode) -> Self {
        let reference = reference_line(mode);
        let (mut lo, mut hi) = (reference, reference);
        for line in lines.iter().filter(|l| l.visible) {
            for v in rows.iter().filter_map(|r| r.get(&line.model_id)) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let first = rows.first().map(|r| r.timestamp).unwrap_or_default();
        let last = rows.last().map(|r| r.timestamp).unwrap_or_default();
        Self {
            time_start: format_axis_time(first),
            time_end: format_axis_time(last),
            latest_time: format_tooltip_time(last),
            value_ticks: [lo, reference, hi].iter().map(|v| format_axis_tick(*v, mode)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFrame {
    pub range: String,
    pub mode: Mode,
    pub rows: Vec<Row>,
    pub models: Vec<String>,
    pub lines: Vec<Line>,
    pub right_margin: u32,
    pub reference_line: f64,
    pub layout: LabelLayout,
    /// Value chip position relative to each line's end point.
    pub chip_offset: (i32, i32),
    pub axis: AxisLabels,
    pub animate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameBody {
    Loading,
    Empty { message: String, hint: String, debug_endpoints: Vec<String> },
    Series(SeriesFrame),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    /// Upstream error banner; shown above whatever body is available.
    pub banner: Option<String>,
    pub body: FrameBody,
}

impl ChartFrame {
    /// Plain-text rendering for terminals and logs.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(b) = &self.banner {
            out.push(format!("! {}", b));
        }
        match &self.body {
            FrameBody::Loading => out.push("loading account values...".to_string()),
            FrameBody::Empty { message, hint, debug_endpoints } => {
                out.push(message.clone());
                out.push(hint.clone());
                for e in debug_endpoints {
                    out.push(format!("  debug: {}", e));
                }
            }
            FrameBody::Series(s) => {
                out.push(format!("[{} {}] {} rows", s.range, s.mode.symbol(), s.rows.len()));
                for line in &s.lines {
                    let marker = if line.visible { "*" } else { " " };
                    out.push(format!("{} {:<28} {}", marker, line.model_id, line.label));
                }
            }
        }
        out
    }
}

/// View controller for the account-value chart: one aggregator plus the
/// toggles, legend selection and feed status around it.
#[derive(Debug)]
pub struct ChartPanel {
    aggregator: SeriesAggregator,
    selection: ViewSelection,
    active: ActiveSet,
    latch: AnimationLatch,
    viewport_width: u32,
    status: FeedStatus,
    errored: bool,
    poll_secs: u64,
    debug_endpoints: Vec<String>,
}

impl ChartPanel {
    pub fn new(settings: PanelSettings) -> Self {
        Self {
            aggregator: SeriesAggregator::with_budget(settings.budget),
            selection: settings.selection,
            active: ActiveSet::new(),
            latch: AnimationLatch::new(),
            viewport_width: settings.viewport_width,
            status: FeedStatus::Loading,
            errored: false,
            poll_secs: settings.poll_secs,
            debug_endpoints: settings.debug_endpoints,
        }
    }

    pub fn aggregator(&self) -> &SeriesAggregator {
        &self.aggregator
    }

    pub fn selection(&self) -> ViewSelection {
        self.selection
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn models(&self) -> &ModelSet {
        self.aggregator.models()
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    pub fn animating(&self) -> bool {
        self.latch.is_active()
    }

    /// A successful poll.
    pub fn on_batch(&mut self, points: Vec<RawPoint>, declared: &[String]) -> MergeOutcome {
        self.status = FeedStatus::Ready;
        self.errored = false;
        let outcome = self.aggregator.merge_batch(points, declared);
        self.active.initialize(self.aggregator.models());
        if outcome.appended > 0 {
            self.latch.observe_store(self.aggregator.len());
        }
        outcome
    }

    /// A failed poll. Rows already merged stay on screen.
    pub fn on_fetch_error(&mut self) {
        self.status = FeedStatus::Ready;
        self.errored = true;
    }

    pub fn set_range(&mut self, range: Range) {
        self.selection.range = range;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.selection.mode = mode;
    }

    pub fn toggle_model(&mut self, model_id: &str) {
        self.active.toggle(model_id, self.aggregator.models());
    }

    pub fn resize(&mut self, viewport_width: u32) {
        self.viewport_width = viewport_width;
    }

    pub fn dispose(&mut self) {
        self.aggregator.dispose();
        self.active = ActiveSet::new();
        self.status = FeedStatus::Loading;
        self.errored = false;
    }

    /// Build what the chart should draw right now.
    pub fn frame(&mut self, now_ms: i64) -> ChartFrame {
        let banner = self.errored.then(|| FEED_ERROR_MESSAGE.to_string());
        if self.status == FeedStatus::Loading {
            return ChartFrame { banner, body: FrameBody::Loading };
        }

        let rows = self.aggregator.select_view(self.selection, now_ms);
        if rows.len() < 2 {
            let body = FrameBody::Empty {
                message: EMPTY_MESSAGE.to_string(),
                hint: format!(
                    "Keep the board open for a few minutes; a new equity point is collected every {} seconds.",
                    self.poll_secs
                ),
                debug_endpoints: self.debug_endpoints.clone(),
            };
            return ChartFrame { banner, body };
        }

        let mode = self.selection.mode;
        let layout = LabelLayout::for_viewport(self.viewport_width);
        let lines: Vec<Line> = self
            .aggregator
            .models()
            .iter()
            .map(|id| {
                let last_value = last_known_value(&rows, id);
                Line {
                    model_id: id.to_string(),
                    visible: self.active.is_visible(id),
                    end_index: last_index(&rows, id),
                    last_value,
                    label: format_value(last_value, mode),
                    tooltip: last_value.map(|v| format_tooltip(v, mode)),
                }
            })
            .collect();
        let right_margin = layout.right_margin(lines.iter().filter(|l| l.visible).map(|l| l.label.as_str()));

        let axis = AxisLabels::build(&rows, &lines, mode);
        let animate = self.latch.is_active();
        self.latch.on_rendered(rows.len());

        ChartFrame {
            banner,
            body: FrameBody::Series(SeriesFrame {
                range: self.selection.range.label(),
                mode,
                rows,
                models: self.aggregator.models().as_slice().to_vec(),
                lines,
                right_margin,
                reference_line: reference_line(mode),
                chip_offset: layout.chip_offset(),
                layout,
                axis,
                animate,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PanelSettings {
        PanelSettings {
            budget: 600,
            poll_secs: 5,
            viewport_width: 1440,
            selection: ViewSelection::default(),
            debug_endpoints: vec!["/api/nof1/since-inception-values".to_string()],
        }
    }

    fn series(frame: &ChartFrame) -> &SeriesFrame {
        match &frame.body {
            FrameBody::Series(s) => s,
            other => panic!("expected series frame, got {:?}", other),
        }
    }

    #[test]
    fn test_loading_until_first_poll() {
        let mut panel = ChartPanel::new(settings());
        assert_eq!(panel.frame(0).body, FrameBody::Loading);
    }

    #[test]
    fn test_single_point_shows_empty_state() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(vec![RawPoint::new(100).with("a", 1.0)], &[]);
        match panel.frame(100).body {
            FrameBody::Empty { debug_endpoints, .. } => assert_eq!(debug_endpoints.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_keeps_rows_and_sets_banner() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(
            vec![RawPoint::new(100).with("a", 1.0), RawPoint::new(200).with("a", 2.0)],
            &[],
        );
        panel.on_fetch_error();
        let frame = panel.frame(200);
        assert_eq!(frame.banner.as_deref(), Some(FEED_ERROR_MESSAGE));
        assert_eq!(series(&frame).rows.len(), 2);
    }

    #[test]
    fn test_lines_follow_legend_and_gaps() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(
            vec![
                RawPoint::new(100).with("a", 10_000.0).with("b", 9_000.0),
                RawPoint::new(200).with("a", 10_500.0),
            ],
            &[],
        );
        panel.toggle_model("a");
        let frame = panel.frame(200);
        let s = series(&frame);
        assert_eq!(s.lines[0].label, "$10,500.00");
        assert!(s.lines[0].visible);
        // b is missing at t=200: its label still uses the last known value
        assert_eq!(s.lines[1].end_index, Some(0));
        assert_eq!(s.lines[1].last_value, Some(9_000.0));
        assert!(!s.lines[1].visible);
        assert_eq!(s.reference_line, 10_000.0);

        panel.set_mode(Mode::Percent);
        let frame = panel.frame(200);
        assert_eq!(series(&frame).lines[0].label, "+5.0%");
        assert_eq!(series(&frame).lines[0].tooltip.as_deref(), Some("5.00%"));
    }

    #[test]
    fn test_axis_labels_cover_visible_lines() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(
            vec![
                RawPoint::new(1_709_622_480_000).with("a", 9_800.0).with("b", 20_000.0),
                RawPoint::new(1_709_626_080_000).with("a", 10_500.0),
            ],
            &[],
        );
        panel.toggle_model("a");
        let frame = panel.frame(1_709_626_080_000);
        let s = series(&frame);
        assert_eq!(s.axis.value_ticks, vec!["$9,800", "$10,000", "$10,500"]);
        assert_eq!(s.axis.time_start, "03-05 07:08");
        assert_eq!(s.axis.time_end, "03-05 08:08");
        assert_eq!(s.axis.latest_time, "2024-03-05 08:08");
        assert_eq!(s.chip_offset, s.layout.chip_offset());
    }

    #[test]
    fn test_empty_poll_still_declares_models() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(vec![], &["a".to_string(), "b".to_string()]);
        assert_eq!(panel.models().len(), 2);
        assert_eq!(panel.aggregator().len(), 0);
    }

    #[test]
    fn test_animation_only_on_first_render() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(
            vec![RawPoint::new(1).with("a", 1.0), RawPoint::new(2).with("a", 2.0)],
            &[],
        );
        assert!(series(&panel.frame(2)).animate);
        assert!(!series(&panel.frame(2)).animate);
    }

    #[test]
    fn test_summary_lines_mark_visible_models() {
        let mut panel = ChartPanel::new(settings());
        panel.on_batch(
            vec![RawPoint::new(1).with("a", 1.0).with("b", 1.0), RawPoint::new(2).with("a", 2.0)],
            &[],
        );
        panel.toggle_model("b");
        let lines = panel.frame(2).summary_lines();
        assert!(lines[0].starts_with("[ALL $] 2 rows"));
        assert!(lines[1].starts_with("  a"));
        assert!(lines[2].starts_with("* b"));
    }
}
