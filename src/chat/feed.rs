use chrono::{TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

/// One model reasoning entry as shown in the chat feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub model_id: String,
    /// Seconds or milliseconds since epoch, whatever the feed sent.
    pub timestamp: i64,
    pub summary: String,
    pub user_prompt: String,
    pub cot_trace: Value,
    pub llm_response: Value,
}

impl Conversation {
    /// Normalize one wire object. Entries without a `model_id` are dropped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let model_id = map.get("model_id").and_then(Value::as_str).filter(|s| !s.is_empty())?;
        let timestamp = ["timestamp", "inserted_at"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(as_timestamp)
            .unwrap_or(0);
        let summary = ["cot_trace_summary", "summary"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or_default();
        Some(Self {
            model_id: model_id.to_string(),
            timestamp,
            summary: summary.to_string(),
            user_prompt: map.get("user_prompt").and_then(Value::as_str).unwrap_or_default().to_string(),
            cot_trace: map.get("cot_trace").cloned().unwrap_or(Value::Null),
            llm_response: map.get("llm_response").cloned().unwrap_or(Value::Null),
        })
    }

    /// Stable key for per-card state such as translations.
    pub fn card_key(&self) -> String {
        format!("{}:{}", self.model_id, self.timestamp)
    }
}

fn as_timestamp(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelFilter {
    All,
    Model(String),
}

impl ModelFilter {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            ModelFilter::All
        } else {
            ModelFilter::Model(s.to_string())
        }
    }

    pub fn matches(&self, model_id: &str) -> bool {
        match self {
            ModelFilter::All => true,
            ModelFilter::Model(m) => m == model_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationFeed {
    items: Vec<Conversation>,
}

impl ConversationFeed {
    pub fn new(items: Vec<Conversation>) -> Self {
        Self { items }
    }

    /// Accepts `{"conversations": [...]}` or a bare array.
    pub fn from_json(value: &Value) -> Self {
        let list = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("conversations")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => &[],
        };
        Self { items: list.iter().filter_map(Conversation::from_json).collect() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newest first, restricted to `filter`.
    pub fn list(&self, filter: &ModelFilter) -> Vec<&Conversation> {
        let mut out: Vec<&Conversation> = self.items.iter().filter(|c| filter.matches(&c.model_id)).collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Filter choices: `ALL` followed by each model in first-seen order.
    pub fn model_options(&self) -> Vec<String> {
        let mut out = vec!["ALL".to_string()];
        for c in &self.items {
            if !out.contains(&c.model_id) {
                out.push(c.model_id.clone());
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Hold,
    Long,
    Short,
    Other(String),
}

impl Signal {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold" => Signal::Hold,
            "buy" | "long" => Signal::Long,
            "sell" | "short" => Signal::Short,
            _ => Signal::Other(s.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Signal::Hold => "HOLD",
            Signal::Long => "LONG",
            Signal::Short => "SHORT",
            Signal::Other(s) => s,
        }
    }
}

/// A per-coin trading decision taken from `llm_response`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub coin: String,
    pub signal: Option<Signal>,
    pub leverage: Option<f64>,
    pub profit_target: Option<f64>,
    pub stop_loss: Option<f64>,
    pub risk_usd: Option<f64>,
    pub invalidation_condition: Option<String>,
    pub confidence: Option<f64>,
    pub quantity: Option<f64>,
}

impl Decision {
    /// `BTC LONG 72% qty=0.5`
    pub fn headline(&self) -> String {
        let mut s = format!(
            "{} {}",
            self.coin.to_uppercase(),
            self.signal.as_ref().map(Signal::label).unwrap_or("--")
        );
        if let Some(c) = self.confidence {
            s.push_str(&format!(" {}%", (c * 100.0).round() as i64));
        }
        match self.quantity {
            Some(q) => s.push_str(&format!(" qty={}", q)),
            None => s.push_str(" qty=--"),
        }
        s
    }
}

pub fn decisions(llm_response: &Value) -> Vec<Decision> {
    let Some(map) = llm_response.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(coin, v)| Decision {
            coin: coin.clone(),
            signal: v.get("signal").and_then(Value::as_str).map(Signal::parse),
            leverage: num(v, "leverage"),
            profit_target: num(v, "profit_target"),
            stop_loss: num(v, "stop_loss"),
            risk_usd: num(v, "risk_usd"),
            invalidation_condition: v.get("invalidation_condition").and_then(Value::as_str).map(str::to_string),
            confidence: num(v, "confidence"),
            quantity: num(v, "quantity"),
        })
        .collect()
}

fn num(v: &Value, key: &str) -> Option<f64> {
    match v.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Unescape model output that arrives double-encoded.
pub fn normalize_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut t = text.to_string();
    let quoted = t.len() >= 2 && t.starts_with('"') && t.ends_with('"');
    if quoted && (t.contains("\\n") || t.contains("\\t") || t.contains("\\r")) {
        if let Ok(Value::String(decoded)) = serde_json::from_str::<Value>(&t) {
            t = decoded;
        }
    }
    t = t.replace("\\n", "\n").replace("\\t", "\t").replace("\\r", "\r");
    if t.len() > 1 && t.starts_with('"') && t.ends_with('"') {
        t = t[1..t.len() - 1].to_string();
    }
    t
}

/// Chain-of-thought as display text: strings are unescaped, anything else
/// is pretty-printed JSON.
pub fn format_cot(cot: &Value) -> String {
    match cot {
        Value::String(s) => normalize_markdown(s),
        Value::Null => "{}".to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// `MM/DD HH:MM:SS`; accepts seconds or milliseconds.
pub fn format_time(ts: i64) -> String {
    if ts == 0 {
        return String::new();
    }
    let ms = if ts > 1_000_000_000_000 { ts } else { ts * 1000 };
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%m/%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed() -> ConversationFeed {
        ConversationFeed::from_json(&json!({
            "conversations": [
                {"model_id": "gpt-5", "timestamp": 100, "cot_trace_summary": "hold btc"},
                {"model_id": "claude", "inserted_at": "300", "summary": "short eth"},
                {"timestamp": 400, "summary": "orphan"},
                {"model_id": "gpt-5", "timestamp": 200, "cot_trace_summary": "", "summary": "add sol"},
            ]
        }))
    }

    #[test]
    fn test_feed_sorted_newest_first() {
        let f = feed();
        assert_eq!(f.len(), 3);
        let keys: Vec<String> = f.list(&ModelFilter::All).iter().map(|c| c.card_key()).collect();
        assert_eq!(keys, vec!["claude:300", "gpt-5:200", "gpt-5:100"]);
    }

    #[test]
    fn test_feed_filter_and_options() {
        let f = feed();
        let only = f.list(&ModelFilter::parse("gpt-5"));
        assert_eq!(only.len(), 2);
        assert_eq!(only[0].summary, "add sol");
        assert_eq!(ModelFilter::parse("ALL"), ModelFilter::All);
        assert_eq!(f.model_options(), vec!["ALL", "gpt-5", "claude"]);
    }

    #[test]
    fn test_decisions_flatten() {
        let resp = json!({
            "btc": {"signal": "buy", "confidence": 0.72, "quantity": 0.5, "leverage": "10"},
            "eth": {"signal": "hold"}
        });
        let d = decisions(&resp);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].signal, Some(Signal::Long));
        assert_eq!(d[0].leverage, Some(10.0));
        assert_eq!(d[0].headline(), "BTC LONG 72% qty=0.5");
        assert_eq!(d[1].headline(), "ETH HOLD qty=--");
        assert!(decisions(&json!("nope")).is_empty());
    }

    #[test]
    fn test_normalize_markdown() {
        assert_eq!(normalize_markdown(r#""line one\nline two""#), "line one\nline two");
        assert_eq!(normalize_markdown(r"a\tb"), "a\tb");
        assert_eq!(normalize_markdown(r#""quoted""#), "quoted");
        assert_eq!(normalize_markdown(""), "");
    }

    #[test]
    fn test_format_time_accepts_seconds_and_millis() {
        assert_eq!(format_time(1_709_622_480), "03/05 07:08:00");
        assert_eq!(format_time(1_709_622_480_000), "03/05 07:08:00");
        assert_eq!(format_time(0), "");
    }

    #[test]
    fn test_format_cot() {
        assert_eq!(format_cot(&json!("step\\none")), "step\none");
        assert!(format_cot(&json!({"k": 1})).contains("\"k\": 1"));
    }
}
