//! Render-side helpers for the account-value chart: frame construction,
//! value formatting and end-of-line label geometry.

pub mod debounce;
pub mod format;
pub mod frame;
pub mod layout;

pub use debounce::Debouncer;
pub use frame::{AxisLabels, ChartFrame, ChartPanel, FeedStatus, FrameBody, Line, PanelSettings, SeriesFrame};
pub use layout::LabelLayout;
