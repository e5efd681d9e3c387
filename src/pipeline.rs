use anyhow::Result;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Stages whose intermediate images can be dumped in debug mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Preprocess,
    Mask,
    Segmentation,
    Annotated,
}

impl Stage {
    pub fn index(self) -> usize {
        match self {
            Stage::Input => 0,
            Stage::Preprocess => 1,
            Stage::Mask => 2,
            Stage::Segmentation => 3,
            Stage::Annotated => 4,
        }
    }

    /// Human-readable name (also used for the debug directory)
    pub fn name(self) -> &'static str {
        match self {
            Stage::Input => "Input",
            Stage::Preprocess => "Preprocess",
            Stage::Mask => "Mask",
            Stage::Segmentation => "Segmentation",
            Stage::Annotated => "Annotated",
        }
    }

    /// Directory name, e.g. "02_mask"
    pub fn dir_name(self) -> String {
        format!("{:02}_{}", self.index(), self.name().to_lowercase())
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Save one stage image of a run as `<stage dir>/<run>.png`
    pub fn save(&self, run: usize, stage: Stage, image: &DynamicImage) -> Result<PathBuf> {
        let step_dir = self.output_dir.join(stage.dir_name());
        std::fs::create_dir_all(&step_dir)?;

        let output_path = step_dir.join(format!("{run:02}.png"));
        image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;

        debug!(path = %output_path.display(), "saved debug image");
        Ok(output_path)
    }
}

/// Context available to every stage of a run
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
    /// Runs started so far; shared between clones
    runs: Arc<AtomicUsize>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable debug mode with output directory
    pub fn with_debug(mut self, output_dir: impl AsRef<Path>) -> Result<Self> {
        self.debug = Some(DebugConfig::new(output_dir)?);
        Ok(self)
    }

    /// Number the next run, starting at 1
    pub fn begin_run(&self) -> usize {
        self.runs.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Save a stage image if debug mode is on; a no-op otherwise
    pub fn save_stage(&self, run: usize, stage: Stage, image: impl FnOnce() -> DynamicImage) -> Result<()> {
        if let Some(debug_config) = &self.debug {
            debug_config.save(run, stage, &image())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn stage_dirs_are_numbered() {
        assert_eq!(Stage::Input.dir_name(), "00_input");
        assert_eq!(Stage::Annotated.dir_name(), "04_annotated");
    }

    #[test]
    fn debug_dir_must_be_empty() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        std::fs::write(dir.path().join("leftover.txt"), b"x")?;
        assert!(DebugConfig::new(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn files_are_named_by_run() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let ctx = PipelineContext::new().with_debug(dir.path().join("out"))?;
        let img = || DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let first = ctx.begin_run();
        let second = ctx.begin_run();
        assert_eq!((first, second), (1, 2));

        // a stage skipped in run 1 does not shift run 2's file
        ctx.save_stage(first, Stage::Input, img)?;
        ctx.save_stage(second, Stage::Input, img)?;
        ctx.save_stage(second, Stage::Mask, img)?;

        let out = dir.path().join("out");
        assert!(out.join("00_input").join("01.png").exists());
        assert!(out.join("00_input").join("02.png").exists());
        assert!(out.join("02_mask").join("02.png").exists());
        assert!(!out.join("02_mask").join("01.png").exists());
        Ok(())
    }

    #[test]
    fn clones_share_the_run_counter() {
        let ctx = PipelineContext::new();
        let clone = ctx.clone();
        assert_eq!(ctx.begin_run(), 1);
        assert_eq!(clone.begin_run(), 2);
    }

    #[test]
    fn without_debug_nothing_is_written() -> Result<()> {
        let ctx = PipelineContext::new();
        ctx.save_stage(1, Stage::Input, || panic!("image should not be built"))?;
        Ok(())
    }
}
