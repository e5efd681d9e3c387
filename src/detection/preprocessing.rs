use crate::error::ScanError;
use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};
use rten_tensor::NdTensor;
use std::io::Cursor;
use std::path::Path;

/// Side length of the square model input
pub const INPUT_SIZE: u32 = 224;

/// Model-ready form of an image
pub struct Preprocessed {
    /// NHWC tensor of shape [1, 224, 224, 3], values in [0, 1]
    pub tensor: NdTensor<f32, 4>,
    /// The resized image before normalization
    pub resized: RgbImage,
}

fn check_dimensions(img: RgbImage) -> Result<RgbImage, ScanError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(ScanError::InvalidImage);
    }
    Ok(img)
}

/// Decode raw upload bytes into an RGB image
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::InvalidImage);
    }
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| ScanError::InvalidImage)?
        .decode()
        .map_err(|_| ScanError::InvalidImage)?;
    check_dimensions(img.to_rgb8())
}

/// Load an image file, sniffing the format from its content
pub fn load_image(path: &Path) -> Result<RgbImage, ScanError> {
    let img = ImageReader::open(path)
        .map_err(|_| ScanError::InvalidImage)?
        .with_guessed_format()
        .map_err(|_| ScanError::InvalidImage)?
        .decode()
        .map_err(|_| ScanError::InvalidImage)?;
    check_dimensions(img.to_rgb8())
}

/// Resize to the model input size
pub fn resize(img: &RgbImage) -> RgbImage {
    imageops::resize(img, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
}

/// Scale 8-bit pixels into a [1, H, W, 3] float tensor
pub fn normalize(img: &RgbImage) -> NdTensor<f32, 4> {
    let data: Vec<f32> = img.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
    NdTensor::from_data(
        [1, img.height() as usize, img.width() as usize, 3],
        data,
    )
}

pub fn preprocess(img: &RgbImage) -> Preprocessed {
    let resized = resize(img);
    let tensor = normalize(&resized);
    Preprocessed { tensor, resized }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rten_tensor::prelude::*;

    #[test]
    fn preprocess_produces_fixed_shape() {
        let img = RgbImage::from_pixel(37, 91, Rgb([255, 128, 0]));
        let pre = preprocess(&img);
        assert_eq!(pre.tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(pre.resized.dimensions(), (224, 224));
        assert!(pre.tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn preprocess_is_deterministic() {
        let img = RgbImage::from_fn(50, 40, |x, y| Rgb([x as u8, y as u8, 7]));
        let a = preprocess(&img);
        let b = preprocess(&img);
        assert_eq!(a.resized, b.resized);
        assert!(a.tensor.iter().zip(b.tensor.iter()).all(|(x, y)| x == y));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(decode_image(&[]), Err(ScanError::InvalidImage)));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ScanError::InvalidImage)
        ));
    }

    #[test]
    fn png_bytes_decode() {
        let img = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }
}
