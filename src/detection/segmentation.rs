//! Tumor region segmentation and highlighting.

use super::circles::Circle;
use super::contours::outer_contours;
use super::preprocessing::Preprocessed;
use crate::error::ModelLoadError;
use crate::models::{Mask, SegmentationResult};
use anyhow::{Result, anyhow};
use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use rand::RngCore;
use rten::Model;
use rten_tensor::Tensor;
use rten_tensor::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

pub const HIGHLIGHT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Weight of the solid highlight layer when blending
pub const HIGHLIGHT_ALPHA: f32 = 0.6;

/// Produce a tumor mask for an image known to contain one
pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage, input: &Preprocessed, rng: &mut dyn RngCore) -> Result<Mask>;

    fn name(&self) -> &str;
}

/// Segmentation network emitting a single-channel probability map
pub struct ModelSegmentation {
    model: Model,
    pub threshold: f32,
}

impl ModelSegmentation {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let model = Model::load_file(path).map_err(|e| ModelLoadError {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Self {
            model,
            threshold: 0.5,
        })
    }
}

/// Turn a probability map into a binary mask; unit dimensions are ignored
fn probabilities_to_mask(probs: &Tensor<f32>, threshold: f32) -> Result<GrayImage> {
    let dims: Vec<usize> = probs.shape().iter().copied().filter(|&d| d != 1).collect();
    let [height, width] = dims[..] else {
        return Err(anyhow!(
            "segmentation output must be a single-channel map, got shape {:?}",
            probs.shape()
        ));
    };
    let data: Vec<u8> = probs
        .iter()
        .map(|&p| if p > threshold { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| anyhow!("segmentation output has inconsistent size"))
}

/// Threshold a probability map and scale it to the source image size
fn mask_from_probabilities(probs: &Tensor<f32>, threshold: f32, width: u32, height: u32) -> Result<Mask> {
    let small = probabilities_to_mask(probs, threshold)?;
    let full = imageops::resize(&small, width, height, FilterType::Nearest);
    Ok(Mask::from_gray(full))
}

impl Segmenter for ModelSegmentation {
    fn segment(&self, image: &RgbImage, input: &Preprocessed, _rng: &mut dyn RngCore) -> Result<Mask> {
        let output: Tensor<f32> = self
            .model
            .run_one(input.tensor.view().into(), None)?
            .try_into()
            .map_err(|_| anyhow!("segmentation output is not an f32 tensor"))?;
        mask_from_probabilities(&output, self.threshold, image.width(), image.height())
    }

    fn name(&self) -> &str {
        "Model Segmentation"
    }
}

/// Draws a random circle as the "tumor"
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSegmentation;

impl Segmenter for PlaceholderSegmentation {
    fn segment(&self, image: &RgbImage, _input: &Preprocessed, rng: &mut dyn RngCore) -> Result<Mask> {
        let (width, height) = image.dimensions();
        let circle = Circle::random(width, height, rng);
        debug!(?circle, "synthetic tumor region");
        Ok(circle.to_mask(width, height))
    }

    fn name(&self) -> &str {
        "Placeholder Segmentation"
    }
}

/// Blend the mask region toward the highlight color and outline it
pub fn highlight(image: &RgbImage, mask: &Mask) -> RgbImage {
    let mut result = image.clone();
    for (x, y, pixel) in result.enumerate_pixels_mut() {
        if !mask.is_set(x, y) {
            continue;
        }
        for c in 0..3 {
            let orig = f32::from(pixel[c]);
            let fill = f32::from(HIGHLIGHT_COLOR[c]);
            let blended = orig * (1.0 - HIGHLIGHT_ALPHA) + fill * HIGHLIGHT_ALPHA;
            pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    for contour in outer_contours(mask) {
        for p in contour {
            draw_filled_circle_mut(&mut result, (p.x, p.y), 1, CONTOUR_COLOR);
        }
    }
    result
}

pub enum SegmentationStage {
    Model(ModelSegmentation),
    Placeholder(PlaceholderSegmentation),
}

impl SegmentationStage {
    /// Load the segmenter if the artifact exists, else fall back to placeholder logic
    pub fn from_path(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "segmentation model not found, using placeholder segmentation");
            return SegmentationStage::Placeholder(PlaceholderSegmentation);
        }
        match ModelSegmentation::load(path) {
            Ok(model) => {
                info!(path = %path.display(), "segmentation model loaded");
                SegmentationStage::Model(model)
            }
            Err(err) => {
                warn!(error = %err, "using placeholder segmentation");
                SegmentationStage::Placeholder(PlaceholderSegmentation)
            }
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, SegmentationStage::Placeholder(_))
    }

    fn inner(&self) -> &dyn Segmenter {
        match self {
            SegmentationStage::Model(m) => m,
            SegmentationStage::Placeholder(p) => p,
        }
    }

    /// Segment and visualize; an image without a tumor passes through untouched
    pub fn run(
        &self,
        image: &RgbImage,
        input: &Preprocessed,
        presence: bool,
        rng: &mut dyn RngCore,
    ) -> Result<SegmentationResult> {
        if !presence {
            return Ok(SegmentationResult::absent(image.clone()));
        }

        let mask = self.inner().segment(image, input, rng)?;
        if mask.width() != image.width() || mask.height() != image.height() {
            anyhow::bail!(
                "{} returned a {}x{} mask for a {}x{} image",
                self.name(),
                mask.width(),
                mask.height(),
                image.width(),
                image.height()
            );
        }

        let area_percent = mask.area_percent();
        let image = highlight(image, &mask);
        Ok(SegmentationResult {
            image,
            mask: Some(mask),
            area_percent,
        })
    }
}

impl Segmenter for SegmentationStage {
    fn segment(&self, image: &RgbImage, input: &Preprocessed, rng: &mut dyn RngCore) -> Result<Mask> {
        self.inner().segment(image, input, rng)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}
