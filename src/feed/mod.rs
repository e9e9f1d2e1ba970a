pub mod client;
pub mod recorded;
pub mod retry;

pub use client::{parse_series, BoardApi, SeriesBatch};
pub use recorded::{load_batches, Recording, RecordingManifest};
pub use retry::{retry_async, HttpStatusError, RetryConfig};
