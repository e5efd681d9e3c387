pub mod preprocessing;
pub mod classifier;
pub mod segmentation;
pub mod contours;
pub mod circles;

use anyhow::Result;
use image::{DynamicImage, RgbImage};
use rand::RngCore;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::ScanOutcome;
use crate::pipeline::{PipelineContext, Stage};
use crate::render;
use classifier::{DetectionStage, Detector};
use segmentation::{SegmentationStage, Segmenter};

/// Main detection pipeline orchestrator
///
/// Built once from the configuration and never mutated afterwards; share it
/// behind an `Arc` between requests.
pub struct TumorDetector {
    detection: DetectionStage,
    segmentation: SegmentationStage,
    context: PipelineContext,
}

impl TumorDetector {
    pub fn new(detection: DetectionStage, segmentation: SegmentationStage) -> Self {
        Self {
            detection,
            segmentation,
            context: PipelineContext::new(),
        }
    }

    /// Both stages in placeholder mode, no artifacts touched
    pub fn placeholder() -> Self {
        Self::new(
            DetectionStage::Placeholder(Default::default()),
            SegmentationStage::Placeholder(Default::default()),
        )
    }

    /// Select model-backed or placeholder stages from the artifacts on disk
    pub fn from_config(config: &Config) -> Result<Self> {
        let detection = DetectionStage::from_path(&config.classifier_path());
        let segmentation = SegmentationStage::from_path(&config.segmentation_path());
        info!(
            detection = detection.name(),
            segmentation = segmentation.name(),
            "detector ready"
        );

        let mut context = PipelineContext::new();
        if let Some(dir) = &config.debug_out {
            context = context.with_debug(dir)?;
        }

        Ok(Self {
            detection,
            segmentation,
            context,
        })
    }

    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    pub fn detection(&self) -> &DetectionStage {
        &self.detection
    }

    pub fn segmentation(&self) -> &SegmentationStage {
        &self.segmentation
    }

    /// Detect, segment and annotate one image
    pub fn detect_and_segment(&self, image: &RgbImage, rng: &mut dyn RngCore) -> Result<ScanOutcome> {
        let ctx = &self.context;
        let run = ctx.begin_run();
        ctx.save_stage(run, Stage::Input, || DynamicImage::ImageRgb8(image.clone()))?;

        let input = preprocessing::preprocess(image);
        ctx.save_stage(run, Stage::Preprocess, || DynamicImage::ImageRgb8(input.resized.clone()))?;

        let detection = self.detection.detect(&input, rng)?;
        debug!(
            stage = self.detection.name(),
            presence = detection.presence,
            confidence = detection.confidence,
            run,
            "detection finished"
        );

        let segmented = self.segmentation.run(image, &input, detection.presence, rng)?;
        if let Some(mask) = &segmented.mask {
            ctx.save_stage(run, Stage::Mask, || DynamicImage::ImageRgb8(render::mask_heatmap(mask)))?;
        }
        ctx.save_stage(run, Stage::Segmentation, || DynamicImage::ImageRgb8(segmented.image.clone()))?;

        let mut annotated = segmented.image;
        render::annotate(&mut annotated, &detection, segmented.area_percent);
        ctx.save_stage(run, Stage::Annotated, || DynamicImage::ImageRgb8(annotated.clone()))?;

        info!(
            width = image.width(),
            height = image.height(),
            has_tumor = detection.presence,
            confidence = detection.confidence,
            area = segmented.area_percent,
            "scan complete"
        );

        Ok(ScanOutcome {
            image: annotated,
            detection,
            area_percent: segmented.area_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn outcome_keeps_image_size() -> Result<()> {
        let detector = TumorDetector::placeholder();
        let img = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..20 {
            let outcome = detector.detect_and_segment(&img, &mut rng)?;
            assert_eq!(outcome.image.dimensions(), (100, 100));
            if outcome.has_tumor() {
                assert!(outcome.tumor_area() > 0.0 && outcome.tumor_area() <= 100.0);
            } else {
                assert_eq!(outcome.tumor_area(), 0.0);
            }
        }
        Ok(())
    }

    #[test]
    fn empty_models_dir_gives_placeholders() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let config = Config::default().with_models_dir(dir.path());
        let detector = TumorDetector::from_config(&config)?;
        assert!(detector.detection().is_placeholder());
        assert!(detector.segmentation().is_placeholder());
        Ok(())
    }

    #[test]
    fn debug_mode_dumps_stages() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let out = dir.path().join("debug");
        let detector = TumorDetector::placeholder()
            .with_context(PipelineContext::new().with_debug(&out)?);
        let img = RgbImage::from_pixel(64, 48, Rgb([30, 30, 30]));
        detector.detect_and_segment(&img, &mut StdRng::seed_from_u64(2))?;

        for stage in [Stage::Input, Stage::Preprocess, Stage::Segmentation, Stage::Annotated] {
            assert!(out.join(stage.dir_name()).join("01.png").exists(), "{stage:?}");
        }
        Ok(())
    }

    #[test]
    fn debug_files_line_up_across_stages() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let out = dir.path().join("debug");
        let detector = TumorDetector::placeholder()
            .with_context(PipelineContext::new().with_debug(&out)?);
        let img = RgbImage::from_pixel(64, 48, Rgb([30, 30, 30]));
        let mut rng = StdRng::seed_from_u64(8);

        let mut presences = Vec::new();
        for _ in 0..20 {
            presences.push(detector.detect_and_segment(&img, &mut rng)?.has_tumor());
        }
        assert!(presences.contains(&true) && presences.contains(&false), "{presences:?}");

        for (i, present) in presences.iter().enumerate() {
            let name = format!("{:02}.png", i + 1);
            assert!(out.join(Stage::Input.dir_name()).join(&name).exists());
            assert!(out.join(Stage::Annotated.dir_name()).join(&name).exists());
            assert_eq!(out.join(Stage::Mask.dir_name()).join(&name).exists(), *present, "{name}");
        }
        Ok(())
    }
}
