//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs (Anthropic, Gemini) accept images as base64 payloads embedded
//! in the JSON request body. PNG is chosen over JPEG because it is
//! lossless — text crispness matters far more than file size when the model
//! has to read fine print.

use crate::provider::ImageData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG ready for the vision API.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png"))
}
