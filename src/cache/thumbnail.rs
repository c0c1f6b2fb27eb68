use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::app::Result;

/// Largest width or height an avatar keeps.
pub const THUMBNAIL_BOUND: u32 = 48;

/// Crop-scale the image at `path` to `bound`×`bound` if either side exceeds
/// `bound`, overwriting it in its original format. Returns whether it changed.
pub fn resize_to_bound(path: &Path, bound: u32) -> Result<bool> {
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)?;
    let img = image::load_from_memory_with_format(&bytes, format)?;

    if img.width() <= bound && img.height() <= bound {
        return Ok(false);
    }

    let thumb = img.resize_to_fill(bound, bound, FilterType::Lanczos3);
    let thumb = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(thumb.to_rgb8()),
        _ => thumb,
    };
    thumb.save_with_format(path, format)?;
    Ok(true)
}
