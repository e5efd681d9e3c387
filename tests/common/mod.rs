mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tumorscan for tests
pub use tumorscan::{Config, OfflineProcessor, ScanError, TumorDetector};
