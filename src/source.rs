use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;

use crate::error::CutError;

pub const IMAGE_MAX_DIMENSION_DEFAULT: u32 = 1280;

pub fn logical_image_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let max_axis = width.max(height).max(1);
    let logical_max = max_dim.max(1);
    let scale = if max_axis > logical_max {
        logical_max as f64 / max_axis as f64
    } else {
        1.0
    };
    let logical_w = ((width as f64) * scale).round().max(1.0) as u32;
    let logical_h = ((height as f64) * scale).round().max(1.0) as u32;
    (logical_w, logical_h)
}

/// Shrinks `rgba` so its longer side is at most `max_dim`. Zero disables.
pub fn downscale_to_max_dim(rgba: RgbaImage, max_dim: u32) -> RgbaImage {
    if max_dim == 0 {
        return rgba;
    }
    let (width, height) = rgba.dimensions();
    if width.max(height) <= max_dim {
        return rgba;
    }
    let (next_width, next_height) = logical_image_size(width, height, max_dim);
    image::imageops::resize(&rgba, next_width, next_height, FilterType::Triangle)
}

pub fn decode_image(bytes: &[u8], max_dim: u32) -> Result<RgbaImage, CutError> {
    let image = image::load_from_memory(bytes)?;
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(CutError::EmptyImage);
    }
    Ok(downscale_to_max_dim(rgba, max_dim))
}

pub fn open_image(path: &Path, max_dim: u32) -> Result<RgbaImage, CutError> {
    let image = image::open(path)?;
    let rgba = image.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(CutError::EmptyImage);
    }
    Ok(downscale_to_max_dim(rgba, max_dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_size_keeps_aspect() {
        assert_eq!(logical_image_size(2560, 1280, 1280), (1280, 640));
        assert_eq!(logical_image_size(640, 480, 1280), (640, 480));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_image(b"not an image", 1280).unwrap_err();
        assert!(matches!(err, CutError::Image(_)));
    }

    #[test]
    fn large_images_are_downscaled() {
        let rgba = RgbaImage::from_pixel(300, 150, image::Rgba([1, 2, 3, 255]));
        let out = downscale_to_max_dim(rgba, 100);
        assert_eq!(out.dimensions(), (100, 50));
    }
}
