use std::io::Cursor;

use image::{imageops::FilterType, ImageReader, Limits};

use crate::{DecodeError, NormalizedTensor, INPUT_SIZE};

/// Largest width or height the decoder accepts.
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Decoder allocation cap. Fits an 8-bit RGBA image at [`MAX_IMAGE_SIDE`].
pub const MAX_DECODE_BYTES: u64 = 256 * 1024 * 1024;

/// Decodes `raw` (JPEG, PNG, GIF, BMP, WebP, ...) into a [`NormalizedTensor`].
///
/// Alpha is dropped and grayscale is replicated across RGB before resizing.
/// Every output value is `channel / 255.0`. Images larger than
/// [`MAX_IMAGE_SIDE`] on either axis are rejected before any pixel is decoded.
pub fn normalize(raw: &[u8]) -> Result<NormalizedTensor, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::new("empty payload"));
    }

    let mut reader = ImageReader::new(Cursor::new(raw)).with_guessed_format()?;
    reader.limits(decode_limits());
    let decoded = reader.decode()?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(DecodeError::new("image has no pixels"));
    }

    let rgb = decoded.to_rgb8();
    let side = INPUT_SIZE as u32;
    let resized = image::imageops::resize(&rgb, side, side, FilterType::CatmullRom);

    let data = resized
        .as_raw()
        .iter()
        .map(|&v| f32::from(v) / 255.0)
        .collect();
    Ok(NormalizedTensor::from_unit_values(data))
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_SIDE);
    limits.max_image_height = Some(MAX_IMAGE_SIDE);
    limits.max_alloc = Some(MAX_DECODE_BYTES);
    limits
}
