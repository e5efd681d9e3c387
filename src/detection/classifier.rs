//! Tumor presence detection.
//!
//! [`DetectionStage`] is chosen once when the detector is built: a trained
//! classifier when `tumor_model.rten` loads, random placeholder logic
//! otherwise.

use super::preprocessing::Preprocessed;
use crate::error::ModelLoadError;
use crate::models::DetectionResult;
use anyhow::{Result, anyhow};
use rand::{Rng, RngCore};
use rten::Model;
use rten_tensor::Tensor;
use rten_tensor::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Given a preprocessed tensor, decide presence and confidence
pub trait Detector: Send + Sync {
    fn detect(&self, input: &Preprocessed, rng: &mut dyn RngCore) -> Result<DetectionResult>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Binary classifier emitting one sigmoid score
pub struct ModelDetection {
    model: Model,
}

impl ModelDetection {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let model = Model::load_file(path).map_err(|e| ModelLoadError {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Self { model })
    }

    /// Run the model and return its raw score
    pub fn score(&self, input: &Preprocessed) -> Result<f32> {
        let output: Tensor<f32> = self
            .model
            .run_one(input.tensor.view().into(), None)?
            .try_into()
            .map_err(|_| anyhow!("classifier output is not an f32 tensor"))?;
        output
            .iter()
            .next()
            .copied()
            .ok_or_else(|| anyhow!("classifier produced an empty output"))
    }
}

impl Detector for ModelDetection {
    fn detect(&self, input: &Preprocessed, _rng: &mut dyn RngCore) -> Result<DetectionResult> {
        Ok(DetectionResult::from_score(self.score(input)?))
    }

    fn name(&self) -> &str {
        "Model Detection"
    }
}

/// Random stand-in used when no classifier is available
#[derive(Debug, Clone)]
pub struct PlaceholderDetection {
    /// Probability of reporting a tumor
    pub positive_rate: f64,
}

impl Default for PlaceholderDetection {
    fn default() -> Self {
        Self { positive_rate: 0.3 }
    }
}

impl Detector for PlaceholderDetection {
    fn detect(&self, _input: &Preprocessed, rng: &mut dyn RngCore) -> Result<DetectionResult> {
        let presence = rng.random_bool(self.positive_rate);
        let confidence = if presence {
            rng.random_range(0.5f32..1.0)
        } else {
            rng.random_range(0.0f32..0.3)
        };
        Ok(DetectionResult::new(presence, confidence))
    }

    fn name(&self) -> &str {
        "Placeholder Detection"
    }
}

pub enum DetectionStage {
    Model(ModelDetection),
    Placeholder(PlaceholderDetection),
}

impl DetectionStage {
    /// Load the classifier if the artifact exists, else fall back to placeholder logic
    pub fn from_path(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "classifier not found, using placeholder detection");
            return DetectionStage::Placeholder(PlaceholderDetection::default());
        }
        match ModelDetection::load(path) {
            Ok(model) => {
                info!(path = %path.display(), "classifier loaded");
                DetectionStage::Model(model)
            }
            Err(err) => {
                warn!(error = %err, "using placeholder detection");
                DetectionStage::Placeholder(PlaceholderDetection::default())
            }
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DetectionStage::Placeholder(_))
    }

    fn inner(&self) -> &dyn Detector {
        match self {
            DetectionStage::Model(m) => m,
            DetectionStage::Placeholder(p) => p,
        }
    }
}

impl Detector for DetectionStage {
    fn detect(&self, input: &Preprocessed, rng: &mut dyn RngCore) -> Result<DetectionResult> {
        self.inner().detect(input, rng)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::preprocessing::preprocess;
    use image::RgbImage;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn input() -> Preprocessed {
        preprocess(&RgbImage::new(16, 16))
    }

    #[test]
    fn placeholder_confidence_ranges() -> Result<()> {
        let input = input();
        let stage = PlaceholderDetection::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let r = stage.detect(&input, &mut rng)?;
            if r.presence {
                assert!((0.5..1.0).contains(&r.confidence), "{r:?}");
            } else {
                assert!((0.0..0.3).contains(&r.confidence), "{r:?}");
            }
        }
        Ok(())
    }

    #[test]
    fn placeholder_rate_is_roughly_thirty_percent() -> Result<()> {
        let input = input();
        let stage = PlaceholderDetection::default();
        let mut rng = StdRng::seed_from_u64(3);
        let hits = (0..2000)
            .map(|_| stage.detect(&input, &mut rng))
            .collect::<Result<Vec<_>>>()?
            .iter()
            .filter(|r| r.presence)
            .count();
        assert!((450..750).contains(&hits), "hits = {hits}");
        Ok(())
    }

    #[test]
    fn placeholder_is_reproducible_with_same_seed() -> Result<()> {
        let input = input();
        let stage = PlaceholderDetection::default();
        let a = stage.detect(&input, &mut StdRng::seed_from_u64(9))?;
        let b = stage.detect(&input, &mut StdRng::seed_from_u64(9))?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn missing_artifact_selects_placeholder() {
        let stage = DetectionStage::from_path(Path::new("/nonexistent/tumor_model.rten"));
        assert!(stage.is_placeholder());
        assert_eq!(stage.name(), "Placeholder Detection");
    }

    #[test]
    fn corrupt_artifact_falls_back_to_placeholder() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("tumor_model.rten");
        std::fs::write(&path, b"placeholder")?;
        assert!(DetectionStage::from_path(&path).is_placeholder());
        Ok(())
    }
}
