use super::*;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("in-memory png encode");
    bytes
}

// =============================================================
// decode_image
// =============================================================

#[test]
fn decodes_png_with_dimensions() {
    let img = decode_image(&png_bytes(20, 8)).expect("valid png");
    assert_eq!(img.width, 20);
    assert_eq!(img.height, 8);
    assert_eq!(img.pixels.len(), 20 * 8 * 4);
}

#[test]
fn garbage_bytes_decode_to_none() {
    assert!(decode_image(b"definitely not an image").is_none());
    assert!(decode_image(b"").is_none());
}

#[test]
fn truncated_png_decodes_to_none() {
    let mut bytes = png_bytes(16, 16);
    bytes.truncate(bytes.len() / 2);
    assert!(decode_image(&bytes).is_none());
}

// =============================================================
// errors
// =============================================================

#[test]
fn status_error_displays_code() {
    let message = FetchError::Status(404).to_string();
    assert!(message.contains("404"));
}
