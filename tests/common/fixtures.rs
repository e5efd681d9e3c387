#![allow(dead_code)]

use image::{ImageBuffer, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tumorscan::server::AppState;
use tumorscan::{Config, TumorDetector};

pub const BOUNDARY: &str = "tumorscan-test-boundary";

/// Creates a solid-black 100x100 image
pub fn black_image() -> RgbImage {
    ImageBuffer::from_fn(100, 100, |_, _| Rgb([0u8, 0u8, 0u8]))
}

/// PNG bytes for an image
pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Writes a solid-black 100x100 PNG to a temp file.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_image() -> NamedTempFile {
    let file = tempfile::Builder::new()
        .prefix("scan")
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    black_image()
        .save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Writes an image with a chosen name into `dir`
pub fn write_image(dir: &Path, name: &str, img: &RgbImage) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(img)).expect("Failed to write test image");
    path
}

/// Builds a multipart/form-data body with one field
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Builds a multipart/form-data body with one plain (non-file) field
pub fn multipart_text_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

/// Config rooted in a temp directory (no model artifacts present)
pub fn test_config(root: &Path) -> Config {
    Config::default()
        .with_models_dir(root.join("models"))
        .with_cache_dir(root.join("cache"))
        .with_upload_dir(root.join("uploads"))
}

/// Server state backed by placeholder stages.
/// Returns both the state and the temp directory (which must be kept alive).
pub fn create_test_state() -> (AppState, Config, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path());
    let detector = Arc::new(TumorDetector::from_config(&config).expect("Failed to build detector"));
    let state = AppState::new(&config, detector).expect("Failed to build app state");
    (state, config, dir)
}
