/// Row count past which transitions are dropped even before a render.
const MAX_ANIMATED_ROWS: usize = 50;

/// One-shot switch for chart transition effects. Starts on and, once
/// tripped, stays off for the life of the view.
#[derive(Debug, Clone)]
pub struct AnimationLatch {
    active: bool,
}

impl Default for AnimationLatch {
    fn default() -> Self {
        Self { active: true }
    }
}

impl AnimationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Called after a merge grew the store.
    pub fn observe_store(&mut self, row_count: usize) {
        if row_count > MAX_ANIMATED_ROWS {
            self.active = false;
        }
    }

    /// Called once a frame has been handed to the renderer.
    pub fn on_rendered(&mut self, rendered_rows: usize) {
        if rendered_rows >= 2 {
            self.active = false;
        }
    }
}
