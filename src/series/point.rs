use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sample delivered by the upstream feed: a millisecond timestamp plus
/// a sparse map of model id to account value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub timestamp: i64,
    pub values: BTreeMap<String, f64>,
}

impl RawPoint {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp, values: BTreeMap::new() }
    }

    /// Builder used mostly by tests and the replay tool.
    pub fn with(mut self, model_id: &str, value: f64) -> Self {
        if value.is_finite() {
            self.values.insert(model_id.to_string(), value);
        }
        self
    }

    /// Parse a wire object `{ "timestamp": 1700000000000, "<model>": 10234.5, ... }`.
    ///
    /// Anything that is not a finite JSON number is dropped: the model simply
    /// has no value at this instant. Returns `None` only when the timestamp
    /// itself is unusable.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let timestamp = match map.get("timestamp")? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| f as i64))?,
            _ => return None,
        };
        let mut point = RawPoint::new(timestamp);
        for (key, v) in map {
            if key == "timestamp" {
                continue;
            }
            if let Some(num) = v.as_f64().filter(|f| f.is_finite()) {
                point.values.insert(key.clone(), num);
            }
        }
        Some(point)
    }
}

/// Aggregated row: the union of model values known at one timestamp.
///
/// A model missing from `values` means "no new value here", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub timestamp: i64,
    pub values: BTreeMap<String, f64>,
}

impl Row {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp, values: BTreeMap::new() }
    }

    pub fn get(&self, model_id: &str) -> Option<f64> {
        self.values.get(model_id).copied()
    }

    pub fn from_point(point: &RawPoint) -> Self {
        let mut row = Row::new(point.timestamp);
        row.absorb(point);
        row
    }

    /// Overlay the point's values; later values win per model key.
    /// Returns true if anything changed.
    pub fn absorb(&mut self, point: &RawPoint) -> bool {
        let mut changed = false;
        for (id, v) in &point.values {
            if !v.is_finite() {
                continue;
            }
            match self.values.insert(id.clone(), *v) {
                Some(prev) if prev == *v => {}
                _ => changed = true,
            }
        }
        changed
    }
}

/// Insertion-ordered set of model identifiers. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSet {
    ids: Vec<String>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }
}

impl<'a> FromIterator<&'a str> for ModelSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = ModelSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
