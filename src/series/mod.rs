//! Account-value series core: merge polled batches into an ordered row
//! store and derive the absolute / percent / downsampled views the chart
//! draws from.

pub mod aggregator;
pub mod latch;
pub mod legend;
pub mod point;
pub mod view;

pub use aggregator::{MergeOutcome, SeriesAggregator};
pub use latch::AnimationLatch;
pub use legend::ActiveSet;
pub use point::{ModelSet, RawPoint, Row};
pub use view::{Mode, Range, ViewSelection};
