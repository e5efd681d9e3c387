use image::{GrayImage, Luma, RgbImage};
use serde::Serialize;

/// Binary tumor mask, same size as the image it annotates.
#[derive(Debug, Clone)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    pub const SET: Luma<u8> = Luma([255]);

    /// An all-clear mask
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
        }
    }

    /// Wrap a grayscale image, binarizing it (any non-zero pixel is set)
    pub fn from_gray(gray: GrayImage) -> Self {
        let mut pixels = gray;
        for pixel in pixels.pixels_mut() {
            if pixel[0] > 0 {
                *pixel = Self::SET;
            }
        }
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] > 0
    }

    /// Number of set pixels
    pub fn count(&self) -> u64 {
        self.pixels.pixels().filter(|p| p[0] > 0).count() as u64
    }

    /// Set pixels as a percentage of all pixels, in [0, 100]
    pub fn area_percent(&self) -> f64 {
        let total = u64::from(self.width()) * u64::from(self.height());
        if total == 0 {
            return 0.0;
        }
        self.count() as f64 / total as f64 * 100.0
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn as_gray_mut(&mut self) -> &mut GrayImage {
        &mut self.pixels
    }
}

/// Scores strictly above this mean a tumor is present
pub const PRESENCE_THRESHOLD: f32 = 0.5;

/// Output of the detection stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionResult {
    pub presence: bool,
    /// Always within [0, 1]
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(presence: bool, confidence: f32) -> Self {
        Self {
            presence,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Decision for a raw classifier score
    pub fn from_score(score: f32) -> Self {
        Self::new(score > PRESENCE_THRESHOLD, score)
    }
}

/// Output of the segmentation stage
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Highlighted visualization, same dimensions as the input
    pub image: RgbImage,
    /// None when no tumor was present
    pub mask: Option<Mask>,
    pub area_percent: f64,
}

impl SegmentationResult {
    /// Result for an image with no tumor: untouched, zero area
    pub fn absent(image: RgbImage) -> Self {
        Self {
            image,
            mask: None,
            area_percent: 0.0,
        }
    }
}

/// Everything one detect-and-segment run produces
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Segmented image with the status text drawn on it
    pub image: RgbImage,
    pub detection: DetectionResult,
    pub area_percent: f64,
}

impl ScanOutcome {
    pub fn has_tumor(&self) -> bool {
        self.detection.presence
    }

    /// Area reported to callers; zero whenever no tumor was found
    pub fn tumor_area(&self) -> f64 {
        if self.detection.presence {
            self.area_percent
        } else {
            0.0
        }
    }
}

/// JSON payload of `POST /upload`
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub image: String,
    pub has_tumor: bool,
    pub tumor_area: f64,
    pub filename: String,
}

/// Result record of an offline run
#[derive(Debug, Clone, Serialize)]
pub struct OfflineResult {
    pub image: String,
    pub has_tumor: bool,
    pub tumor_area: f64,
    pub filename: String,
    pub cache_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_of_empty_mask_is_zero() {
        let mask = Mask::empty(10, 10);
        assert_eq!(mask.count(), 0);
        assert_eq!(mask.area_percent(), 0.0);
    }

    #[test]
    fn area_counts_set_pixels() {
        let mut gray = GrayImage::new(10, 10);
        for x in 0..10 {
            gray.put_pixel(x, 0, Luma([1]));
        }
        let mask = Mask::from_gray(gray);
        assert_eq!(mask.count(), 10);
        assert!((mask.area_percent() - 10.0).abs() < 1e-9);
        assert!(mask.is_set(3, 0));
        assert!(!mask.is_set(3, 1));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(DetectionResult::new(true, 1.7).confidence, 1.0);
        assert_eq!(DetectionResult::new(false, -0.2).confidence, 0.0);
    }

    #[test]
    fn score_threshold_is_strict() {
        assert_eq!(DetectionResult::from_score(0.49), DetectionResult::new(false, 0.49));
        assert_eq!(DetectionResult::from_score(0.5), DetectionResult::new(false, 0.5));
        assert_eq!(DetectionResult::from_score(0.51), DetectionResult::new(true, 0.51));

        let saturated = DetectionResult::from_score(1.7);
        assert!(saturated.presence);
        assert_eq!(saturated.confidence, 1.0);
    }

    #[test]
    fn absent_tumor_reports_zero_area() {
        let outcome = ScanOutcome {
            image: RgbImage::new(4, 4),
            detection: DetectionResult::new(false, 0.1),
            area_percent: 12.0,
        };
        assert_eq!(outcome.tumor_area(), 0.0);
    }
}
