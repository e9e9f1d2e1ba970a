use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::feed::Conversation;
use crate::logging::{log_translation, TranslationEvent};

/// Instruction sent ahead of every piece of model output. It asks for a
/// plain-language Chinese rendering written from a trader's perspective.
pub const SYSTEM_PROMPT: &str =
    "你是专业金融交易员和翻译官，能专业翻译用户输入的内容为中文，并直接输出浅显易懂的翻译内容";

pub const NO_SUMMARY: &str = "(no summary)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatCompletionResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

pub fn translation_request(model: &str, text: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage { role: Role::System, content: SYSTEM_PROMPT.to_string() },
            ChatMessage { role: Role::User, content: text.to_string() },
        ],
        temperature: None,
        max_tokens: None,
    }
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: Url,
    token: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(base: &str, token: &str, model: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: base.join("chat/completions")?,
            token: token.to_string(),
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("chat completion http status {}", status.as_u16()));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Translator for ChatCompletionClient {
    async fn translate(&self, text: &str) -> Result<String> {
        let response = self.complete(&translation_request(&self.model, text)).await?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("chat completion returned no choices"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationState {
    pub translated: Option<String>,
    pub translating: bool,
    /// Last request failed; only an explicit request tries again.
    pub failed: bool,
    /// Translation is currently displayed instead of the original.
    pub shown: bool,
}

/// Per-card translation state, keyed by `Conversation::card_key`.
#[derive(Debug, Clone, Default)]
pub struct TranslationBook {
    states: HashMap<String, TranslationState>,
}

impl TranslationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &str) -> TranslationState {
        self.states.get(key).cloned().unwrap_or_default()
    }

    /// Up to `limit` of the newest cards that have content and no
    /// translation, request in flight or earlier failure. Yields
    /// `(card_key, content)`.
    pub fn pending_auto(&self, newest_first: &[&Conversation], limit: usize) -> Vec<(String, String)> {
        newest_first
            .iter()
            .take(limit)
            .filter(|c| !c.summary.is_empty())
            .filter_map(|c| {
                let key = c.card_key();
                let st = self.states.get(&key);
                let busy = st.map(|s| s.translating || s.failed || s.translated.is_some()).unwrap_or(false);
                (!busy).then(|| (key, c.summary.clone()))
            })
            .collect()
    }

    pub fn begin(&mut self, key: &str) {
        self.states.entry(key.to_string()).or_default().translating = true;
    }

    pub fn complete(&mut self, key: &str, text: String) {
        let st = self.states.entry(key.to_string()).or_default();
        st.translated = Some(text);
        st.translating = false;
        st.failed = false;
        st.shown = true;
    }

    /// Failed request: back to showing the original.
    pub fn fail(&mut self, key: &str) {
        let st = self.states.entry(key.to_string()).or_default();
        st.translating = false;
        st.failed = true;
    }

    /// Switch between original and translation, if one exists.
    pub fn toggle(&mut self, key: &str) -> bool {
        match self.states.get_mut(key) {
            Some(st) if st.translated.is_some() => {
                st.shown = !st.shown;
                true
            }
            _ => false,
        }
    }

    pub fn display<'a>(&'a self, key: &str, original: &'a str) -> &'a str {
        match self.states.get(key) {
            Some(TranslationState { translated: Some(t), shown: true, .. }) => t.as_str(),
            _ if !original.is_empty() => original,
            _ => NO_SUMMARY,
        }
    }
}

/// Run `jobs` one after another, recording each result in `book`.
/// Returns how many succeeded. Failures are logged and never propagated.
pub async fn run_translations(
    translator: &dyn Translator,
    book: &mut TranslationBook,
    jobs: Vec<(String, String)>,
) -> usize {
    let mut ok = 0;
    for (key, content) in jobs {
        book.begin(&key);
        match translator.translate(&content).await {
            Ok(text) => {
                log_translation(&key, TranslationEvent::Done, None);
                book.complete(&key, text);
                ok += 1;
            }
            Err(err) => {
                log_translation(&key, TranslationEvent::Failed, Some(&err.to_string()));
                book.fail(&key);
            }
        }
    }
    ok
}
