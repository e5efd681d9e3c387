pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod offline;
pub mod pipeline;
pub mod render;
pub mod server;

pub use config::Config;
pub use detection::TumorDetector;
pub use error::{ModelLoadError, ScanError};
pub use models::{DetectionResult, Mask, OfflineResult, ScanOutcome, SegmentationResult, UploadResponse};
pub use offline::OfflineProcessor;
pub use pipeline::{DebugConfig, PipelineContext, Stage};
