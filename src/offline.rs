//! File-based processing with an on-disk cache of rendered reports.

use crate::detection::TumorDetector;
use crate::detection::preprocessing::load_image;
use crate::error::ScanError;
use crate::models::OfflineResult;
use crate::render;
use anyhow::Context;
use image::ImageFormat;
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Prefix of every cached report file
pub const CACHE_PREFIX: &str = "processed_";

pub struct OfflineProcessor {
    detector: Arc<TumorDetector>,
    cache_dir: PathBuf,
}

impl OfflineProcessor {
    /// Creates the cache directory if needed
    pub fn new(detector: Arc<TumorDetector>, cache_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("creating cache directory {}", cache_dir.display()))?;
        Ok(Self { detector, cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the report for `filename` is cached
    pub fn cache_path_for(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(format!("{CACHE_PREFIX}{filename}"))
    }

    /// Run the full pipeline on an image file and cache the rendered report
    pub fn process_image(&self, image_path: &Path, rng: &mut dyn RngCore) -> Result<OfflineResult, ScanError> {
        let img = load_image(image_path)?;
        let outcome = self.detector.detect_and_segment(&img, rng)?;

        let report = render::create_report(
            &outcome.image,
            outcome.has_tumor(),
            Some(outcome.tumor_area()),
            Some(outcome.detection.confidence),
        );
        let encoded = render::image_to_base64(&report)?;

        let filename = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ScanError::InvalidImage)?;
        let cache_path = self.cache_path_for(&filename);
        report
            .save_with_format(&cache_path, ImageFormat::Png)
            .with_context(|| format!("writing {}", cache_path.display()))?;

        info!(
            file = %filename,
            cache = %cache_path.display(),
            has_tumor = outcome.has_tumor(),
            "offline result cached"
        );

        Ok(OfflineResult {
            image: encoded,
            has_tumor: outcome.has_tumor(),
            tumor_area: outcome.tumor_area(),
            filename,
            cache_path: cache_path.display().to_string(),
        })
    }

    /// Names of all cached reports, sorted; empty if the cache directory is gone
    pub fn get_cached_results(&self) -> anyhow::Result<Vec<String>> {
        Self::list_cache(&self.cache_dir)
    }

    /// List the reports in `cache_dir` without creating it or loading a detector
    pub fn list_cache(cache_dir: &Path) -> anyhow::Result<Vec<String>> {
        if !cache_dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(cache_dir)
            .with_context(|| format!("reading cache directory {}", cache_dir.display()))?
        {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(CACHE_PREFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
