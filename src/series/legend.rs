use std::collections::BTreeSet;

use super::point::ModelSet;

/// Which model lines are shown. Empty means every model is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    ids: BTreeSet<String>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with every known model, only if nothing was selected yet.
    pub fn initialize(&mut self, models: &ModelSet) {
        if self.ids.is_empty() {
            self.ids = models.iter().map(str::to_string).collect();
        }
    }

    /// Legend click: isolate `id`, or show everything again if `id` is
    /// already the only active model.
    pub fn toggle(&mut self, id: &str, models: &ModelSet) {
        if self.ids.len() == 1 && self.ids.contains(id) {
            self.ids = models.iter().map(str::to_string).collect();
        } else {
            self.ids = BTreeSet::from([id.to_string()]);
        }
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.ids.is_empty() || self.ids.contains(id)
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> ModelSet {
        ["A", "B", "C"].into_iter().collect()
    }

    #[test]
    fn test_isolate_then_reset() {
        let models = abc();
        let mut active = ActiveSet::new();
        active.initialize(&models);
        assert_eq!(active.len(), 3);

        active.toggle("A", &models);
        assert_eq!(active.iter().collect::<Vec<_>>(), vec!["A"]);
        assert!(!active.is_visible("B"));

        active.toggle("A", &models);
        assert_eq!(active.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_click_other_model_switches_isolation() {
        let models = abc();
        let mut active = ActiveSet::new();
        active.toggle("A", &models);
        active.toggle("B", &models);
        assert_eq!(active.iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_empty_means_all_visible() {
        let active = ActiveSet::new();
        assert!(active.is_visible("anything"));
    }

    #[test]
    fn test_initialize_keeps_existing_selection() {
        let models = abc();
        let mut active = ActiveSet::new();
        active.toggle("C", &models);
        active.initialize(&models);
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_late_model_hidden_until_reset() {
        let mut models: ModelSet = ["A", "B"].into_iter().collect();
        let mut active = ActiveSet::new();
        active.initialize(&models);
        models.insert("C");
        active.initialize(&models);
        assert!(!active.is_visible("C"));

        active.toggle("A", &models);
        active.toggle("A", &models);
        assert!(active.is_visible("C"));
    }
}
