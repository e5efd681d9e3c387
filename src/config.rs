use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const CLASSIFIER_FILE: &str = "tumor_model.rten";
pub const SEGMENTATION_FILE: &str = "segmentation_model.rten";

/// Runtime configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the optional trained model artifacts
    pub models_dir: PathBuf,
    /// Where offline reports are cached
    pub cache_dir: PathBuf,
    /// Where uploaded files are stored
    pub upload_dir: PathBuf,
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
    /// Dump intermediate stage images here (must be empty or absent)
    pub debug_out: Option<PathBuf>,
}

impl Config {
    pub fn classifier_path(&self) -> PathBuf {
        self.models_dir.join(CLASSIFIER_FILE)
    }

    pub fn segmentation_path(&self) -> PathBuf {
        self.models_dir.join(SEGMENTATION_FILE)
    }

    pub fn with_models_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.models_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_upload_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.upload_dir = dir.as_ref().to_path_buf();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            cache_dir: PathBuf::from("cache"),
            upload_dir: PathBuf::from("uploads"),
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: 16 * 1024 * 1024,
            debug_out: None,
        }
    }
}
