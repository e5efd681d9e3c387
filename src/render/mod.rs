//! Annotation, report composition and encoding.

pub mod font;

use crate::models::{DetectionResult, Mask};
use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

/// Height of the footer band added below the image in a report
pub const REPORT_BAND: u32 = 150;

pub const DISCLAIMER: &str = "For research purposes only. Consult a medical professional.";

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const SEPARATOR: Rgb<u8> = Rgb([200, 200, 200]);
const MUTED: Rgb<u8> = Rgb([100, 100, 100]);

/// One line of overlaid text
#[derive(Debug, Clone)]
pub struct TextItem {
    pub text: String,
    /// Top-left corner
    pub position: (i32, i32),
    pub color: Rgb<u8>,
    pub scale: u32,
}

impl TextItem {
    pub fn new(text: impl Into<String>, position: (i32, i32), color: Rgb<u8>, scale: u32) -> Self {
        Self {
            text: text.into(),
            position,
            color,
            scale,
        }
    }
}

pub fn add_text_overlay(image: &mut RgbImage, items: &[TextItem]) {
    for item in items {
        let (x, y) = item.position;
        font::draw_text_mut(image, &item.text, x, y, item.scale, item.color);
    }
}

/// Status lines drawn onto a scanned image
pub fn status_lines(detection: &DetectionResult, area_percent: f64) -> Vec<String> {
    let mut lines = vec![
        format!("Tumor: {}", if detection.presence { "Yes" } else { "No" }),
        format!("Confidence: {:.2}", detection.confidence),
    ];
    if detection.presence {
        lines.push(format!("Area: {:.2}%", area_percent));
    }
    lines
}

/// Draw tumor status, confidence and (when present) area in the top-left corner
pub fn annotate(image: &mut RgbImage, detection: &DetectionResult, area_percent: f64) {
    let items: Vec<TextItem> = status_lines(detection, area_percent)
        .into_iter()
        .enumerate()
        .map(|(i, line)| TextItem::new(line, (10, 10 + 40 * i as i32), GREEN, 3))
        .collect();
    add_text_overlay(image, &items);
}

/// Compose the standalone report: image on top, summary band below
pub fn create_report(
    image: &RgbImage,
    has_tumor: bool,
    tumor_area: Option<f64>,
    confidence: Option<f32>,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut report = RgbImage::from_pixel(w, h + REPORT_BAND, WHITE);
    imageops::replace(&mut report, image, 0, 0);

    draw_filled_rect_mut(&mut report, Rect::at(0, h as i32).of_size(w.max(1), 2), SEPARATOR);

    let top = h as i32;
    let (status, status_color) = if has_tumor {
        ("TUMOR DETECTED", RED)
    } else {
        ("NO TUMOR DETECTED", GREEN)
    };
    let mut items = vec![TextItem::new(status, (20, top + 20), status_color, 2)];

    if let Some(confidence) = confidence {
        items.push(TextItem::new(
            format!("Confidence: {:.2}", confidence),
            (20, top + 50),
            BLACK,
            2,
        ));
    }
    if let (true, Some(area)) = (has_tumor, tumor_area) {
        items.push(TextItem::new(
            format!("Tumor Area: {:.2}%", area),
            (20, top + 80),
            BLACK,
            2,
        ));
    }

    let disclaimer_x = ((w as i32 - font::text_width(DISCLAIMER, 1) as i32) / 2).max(0);
    items.push(TextItem::new(DISCLAIMER, (disclaimer_x, top + 125), MUTED, 1));

    add_text_overlay(&mut report, &items);
    report
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// PNG-encode an image and wrap it as standard base64
pub fn image_to_base64(image: &RgbImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

/// Jet colormap lookup for t in [0, 1]
fn jet(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let channel = |offset: f32| {
        let v = 1.5 - (4.0 * t - offset).abs();
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Render a mask as a jet heatmap (background blue, region red)
pub fn mask_heatmap(mask: &Mask) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        jet(if mask.is_set(x, y) { 1.0 } else { 0.0 })
    })
}
