use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::point::{ModelSet, Row};

/// Row budget for the trailing-window view.
pub const POINT_BUDGET: usize = 600;
pub const DEFAULT_WINDOW_HOURS: i64 = 72;

const HOUR_MS: i64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Range {
    All,
    Trailing { window_ms: i64 },
}

impl Range {
    pub fn trailing_hours(hours: i64) -> Self {
        Range::Trailing { window_ms: hours.max(0).saturating_mul(HOUR_MS) }
    }

    /// Accepts `ALL` or `<n>H` (e.g. `72H`), case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_uppercase();
        if s == "ALL" {
            return Some(Range::All);
        }
        let hours: i64 = s.strip_suffix('H')?.parse().ok()?;
        if hours <= 0 {
            return None;
        }
        let window_ms = hours.checked_mul(HOUR_MS)?;
        Some(Range::Trailing { window_ms })
    }

    pub fn label(&self) -> String {
        match self {
            Range::All => "ALL".to_string(),
            Range::Trailing { window_ms } => format!("{}H", window_ms / HOUR_MS),
        }
    }

    /// Earliest timestamp retained by this range, if any.
    pub fn cutoff(&self, now_ms: i64) -> Option<i64> {
        match self {
            Range::All => None,
            Range::Trailing { window_ms } => Some(now_ms.saturating_sub(*window_ms)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Absolute,
    Percent,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "$" | "abs" | "absolute" | "usd" => Some(Mode::Absolute),
            "%" | "pct" | "percent" => Some(Mode::Percent),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Mode::Absolute => "$",
            Mode::Percent => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelection {
    pub range: Range,
    pub mode: Mode,
}

impl Default for ViewSelection {
    fn default() -> Self {
        Self { range: Range::All, mode: Mode::Absolute }
    }
}

/// First in-range value per model, tagged with the range it was computed for.
#[derive(Debug, Clone, Default)]
pub struct PercentBaseCache {
    range: Option<Range>,
    bases: BTreeMap<String, f64>,
}

impl PercentBaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.range = None;
        self.bases.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn base(&self, model_id: &str) -> Option<f64> {
        self.bases.get(model_id).copied()
    }

    /// Fill bases for `range` from the already-filtered `rows`.
    ///
    /// A range different from the cached one drops every base. Existing
    /// bases are never replaced; models still lacking one pick up their
    /// first value in `rows`. A zero first value leaves the model without a base.
    pub fn ensure(&mut self, range: Range, rows: &[Row], models: &ModelSet) {
        if self.range != Some(range) {
            self.bases.clear();
            self.range = Some(range);
        }
        if rows.is_empty() {
            return;
        }
        for id in models.iter() {
            if self.bases.contains_key(id) {
                continue;
            }
            if let Some(first) = rows.iter().find_map(|r| r.get(id)) {
                if first != 0.0 {
                    self.bases.insert(id.to_string(), first);
                }
            }
        }
    }
}

pub fn to_percent(value: f64, base: f64) -> f64 {
    (value / base - 1.0) * 100.0
}

pub fn from_percent(pct: f64, base: f64) -> f64 {
    (pct / 100.0 + 1.0) * base
}

/// Fixed-stride sampling that always keeps the first and last rows.
pub fn downsample(rows: &[Row], budget: usize) -> Vec<Row> {
    if budget == 0 || rows.len() <= budget {
        return rows.to_vec();
    }
    let stride = rows.len().div_ceil(budget);
    let mut out: Vec<Row> = rows.iter().step_by(stride).cloned().collect();
    if (rows.len() - 1) % stride != 0 {
        if let Some(last) = rows.last() {
            out.push(last.clone());
        }
    }
    out
}

/// Range filter, optional percent transform, then downsampling of the
/// trailing window. Never touches `rows`.
pub fn select_view(
    rows: &[Row],
    models: &ModelSet,
    selection: ViewSelection,
    now_ms: i64,
    cache: &mut PercentBaseCache,
    budget: usize,
) -> Vec<Row> {
    let filtered = match selection.range.cutoff(now_ms) {
        Some(cutoff) => {
            let start = rows.partition_point(|r| r.timestamp < cutoff);
            &rows[start..]
        }
        None => rows,
    };

    let transformed: Vec<Row> = match selection.mode {
        Mode::Percent => {
            cache.ensure(selection.range, filtered, models);
            filtered
                .iter()
                .map(|row| {
                    let mut out = Row::new(row.timestamp);
                    for (id, v) in &row.values {
                        if let Some(base) = cache.base(id) {
                            out.values.insert(id.clone(), to_percent(*v, base));
                        }
                    }
                    out
                })
                .collect()
        }
        Mode::Absolute => {
            cache.clear();
            filtered.to_vec()
        }
    };

    match selection.range {
        Range::Trailing { .. } => downsample(&transformed, budget),
        Range::All => transformed,
    }
}

/// Most recent value carried for `model_id`, scanning backward.
pub fn last_known_value(rows: &[Row], model_id: &str) -> Option<f64> {
    rows.iter().rev().find_map(|r| r.get(model_id))
}

/// Index of the last row carrying `model_id`; where the end label anchors.
pub fn last_index(rows: &[Row], model_id: &str) -> Option<usize> {
    rows.iter().rposition(|r| r.values.contains_key(model_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::point::RawPoint;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row::from_point(&RawPoint::new(i as i64 * 1000).with("a", 100.0 + i as f64)))
            .collect()
    }

    #[test]
    fn test_range_parse() {
        assert_eq!(Range::parse("all"), Some(Range::All));
        assert_eq!(Range::parse("72H"), Some(Range::trailing_hours(72)));
        assert_eq!(Range::parse("0H"), None);
        assert_eq!(Range::parse("week"), None);
        assert_eq!(Range::trailing_hours(72).label(), "72H");
    }

    #[test]
    fn test_huge_windows_do_not_overflow() {
        assert_eq!(Range::parse("9999999999999999H"), None);
        let wide = Range::trailing_hours(i64::MAX);
        assert_eq!(wide, Range::Trailing { window_ms: i64::MAX });
        assert_eq!(wide.cutoff(-5), Some(i64::MIN));

        let input = rows(3);
        let mut cache = PercentBaseCache::new();
        let sel = ViewSelection { range: wide, mode: Mode::Absolute };
        assert_eq!(select_view(&input, &ModelSet::new(), sel, 2000, &mut cache, 600), input);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse("$"), Some(Mode::Absolute));
        assert_eq!(Mode::parse("%"), Some(Mode::Percent));
        assert_eq!(Mode::parse("x"), None);
    }

    #[test]
    fn test_downsample_under_budget_is_identity() {
        let input = rows(10);
        assert_eq!(downsample(&input, 600), input);
    }

    #[test]
    fn test_downsample_keeps_tail() {
        let input = rows(1201);
        let out = downsample(&input, 600);
        // stride 3 -> indices 0,3,...,1200 already include the tail
        assert_eq!(out.len(), 401);
        assert_eq!(out.last(), input.last());

        let input = rows(1202);
        let out = downsample(&input, 600);
        assert_eq!(out.first(), input.first());
        assert_eq!(out.last(), input.last());
        assert_eq!(out.len(), 402);
    }

    #[test]
    fn test_percent_round_trip() {
        let base = 10_000.0;
        for v in [8_123.45, 10_000.0, 10_500.0, 31_337.1] {
            let back = from_percent(to_percent(v, base), base);
            assert!((back - v).abs() < 1e-9, "v={} back={}", v, back);
        }
        assert!((to_percent(10_500.0, 10_000.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_trailing_filter_and_downsample() {
        let input = rows(2000);
        let mut cache = PercentBaseCache::new();
        let models: ModelSet = ["a"].into_iter().collect();
        let now = 1999 * 1000;
        let sel = ViewSelection {
            range: Range::Trailing { window_ms: 999 * 1000 },
            mode: Mode::Absolute,
        };
        let out = select_view(&input, &models, sel, now, &mut cache, 600);
        // 1000 rows in range, stride 2, tail forced in
        assert_eq!(out.first().unwrap().timestamp, 1000 * 1000);
        assert_eq!(out.len(), 501);
        assert_eq!(out.last(), input.last());

        let sel = ViewSelection { range: Range::trailing_hours(1), mode: Mode::Absolute };
        let out = select_view(&input, &models, sel, now, &mut cache, 600);
        assert!(out.len() <= 601);
        assert_eq!(out.last(), input.last());
    }

    #[test]
    fn test_percent_view_leaves_modelless_values_absent() {
        let input = vec![
            Row::from_point(&RawPoint::new(1).with("a", 100.0)),
            Row::from_point(&RawPoint::new(2).with("a", 110.0).with("z", 0.0)),
            Row::from_point(&RawPoint::new(3).with("z", 5.0)),
        ];
        let models: ModelSet = ["a", "z"].into_iter().collect();
        let mut cache = PercentBaseCache::new();
        let sel = ViewSelection { range: Range::All, mode: Mode::Percent };
        let out = select_view(&input, &models, sel, 0, &mut cache, POINT_BUDGET);
        assert_eq!(out[0].get("a"), Some(0.0));
        assert!((out[1].get("a").unwrap() - 10.0).abs() < 1e-9);
        // zero base: never charted as a percentage
        assert_eq!(out[1].get("z"), None);
        assert!(out[2].values.is_empty());
    }

    #[test]
    fn test_cache_invalidated_on_range_change() {
        let input = rows(10);
        let models: ModelSet = ["a"].into_iter().collect();
        let mut cache = PercentBaseCache::new();
        let all = ViewSelection { range: Range::All, mode: Mode::Percent };
        select_view(&input, &models, all, 9000, &mut cache, POINT_BUDGET);
        assert_eq!(cache.base("a"), Some(100.0));

        let recent = ViewSelection { range: Range::Trailing { window_ms: 4000 }, mode: Mode::Percent };
        let out = select_view(&input, &models, recent, 9000, &mut cache, POINT_BUDGET);
        assert_eq!(cache.base("a"), Some(105.0));
        assert_eq!(out[0].get("a"), Some(0.0));

        let abs = ViewSelection { range: Range::All, mode: Mode::Absolute };
        select_view(&input, &models, abs, 9000, &mut cache, POINT_BUDGET);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_known_value_bridges_gaps() {
        let input = vec![
            Row::from_point(&RawPoint::new(1).with("a", 1.0).with("b", 7.0)),
            Row::from_point(&RawPoint::new(2).with("a", 2.0)),
        ];
        assert_eq!(last_known_value(&input, "b"), Some(7.0));
        assert_eq!(last_index(&input, "b"), Some(0));
        assert_eq!(last_known_value(&input, "c"), None);
        assert_eq!(last_index(&input, "c"), None);
    }
}
