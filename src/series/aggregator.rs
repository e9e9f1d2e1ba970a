use serde::Serialize;

use super::point::{ModelSet, RawPoint, Row};
use super::view::{self, PercentBaseCache, ViewSelection, POINT_BUDGET};

/// What a single `merge_batch` call did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub appended: usize,
    pub merged: usize,
    pub stale: usize,
    pub new_models: Vec<String>,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.appended > 0 || self.merged > 0 || !self.new_models.is_empty()
    }
}

/// Append-biased row store for the account-value chart.
///
/// Invariants:
/// - `rows` timestamps are strictly increasing
/// - `last_ts` equals the timestamp of the last row (None iff empty)
/// - `models` never shrinks
#[derive(Debug, Clone)]
pub struct SeriesAggregator {
    rows: Vec<Row>,
    models: ModelSet,
    last_ts: Option<i64>,
    percent_base: PercentBaseCache,
    budget: usize,
}

impl Default for SeriesAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesAggregator {
    pub fn new() -> Self {
        Self::with_budget(POINT_BUDGET)
    }

    pub fn with_budget(budget: usize) -> Self {
        Self {
            rows: Vec::new(),
            models: ModelSet::new(),
            last_ts: None,
            percent_base: PercentBaseCache::new(),
            budget,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_ts
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn percent_base(&self) -> &PercentBaseCache {
        &self.percent_base
    }

    /// Merge one polled batch.
    ///
    /// Points are ordered by timestamp (stable, so later points in the batch
    /// win on ties). A point older than the cursor is stale and dropped; one
    /// equal to the cursor overlays the last row; anything newer is appended.
    /// `declared` lists model ids the feed announced alongside the batch.
    pub fn merge_batch<I>(&mut self, points: I, declared: &[String]) -> MergeOutcome
    where
        I: IntoIterator<Item = RawPoint>,
    {
        let mut outcome = MergeOutcome::default();
        for id in declared {
            if self.models.insert(id) {
                outcome.new_models.push(id.clone());
            }
        }

        let mut sorted: Vec<RawPoint> = points.into_iter().collect();
        sorted.sort_by_key(|p| p.timestamp);

        for point in sorted {
            match self.last_ts {
                Some(last) if point.timestamp < last => {
                    outcome.stale += 1;
                    continue;
                }
                Some(last) if point.timestamp == last => {
                    if let Some(row) = self.rows.last_mut() {
                        if row.absorb(&point) {
                            outcome.merged += 1;
                        }
                    }
                }
                _ => {
                    self.rows.push(Row::from_point(&point));
                    self.last_ts = Some(point.timestamp);
                    outcome.appended += 1;
                }
            }
            for id in point.values.keys() {
                if self.models.insert(id) {
                    outcome.new_models.push(id.clone());
                }
            }
        }
        outcome
    }

    /// Build the render-ready sequence for `selection` at time `now_ms`.
    pub fn select_view(&mut self, selection: ViewSelection, now_ms: i64) -> Vec<Row> {
        view::select_view(
            &self.rows,
            &self.models,
            selection,
            now_ms,
            &mut self.percent_base,
            self.budget,
        )
    }

    /// Latest value for `model_id` within a view produced by `select_view`.
    pub fn last_known_value(sequence: &[Row], model_id: &str) -> Option<f64> {
        view::last_known_value(sequence, model_id)
    }

    /// Drop everything; the aggregator is as good as new afterwards.
    pub fn dispose(&mut self) {
        self.rows.clear();
        self.models = ModelSet::new();
        self.last_ts = None;
        self.percent_base.clear();
    }
}
