//! PNG tile decoding into single-channel intensity rasters.

use image::ImageFormat;
use rain_traits::RasterImage;

use crate::error::{Result, SourceError};

/// Decode PNG bytes to a luminance raster.
///
/// Fully transparent pixels read as 0 regardless of their colour channels;
/// radar tiles mark "no echo" with alpha rather than black.
pub fn decode_png(bytes: &[u8]) -> Result<RasterImage> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SourceError::Decode(e.to_string()))?
        .to_luma_alpha8();
    let (w, h) = img.dimensions();
    let pixels: Vec<u8> = img
        .pixels()
        .map(|p| if p.0[1] == 0 { 0 } else { p.0[0] })
        .collect();
    RasterImage::new(w as usize, h as usize, pixels)
        .ok_or_else(|| SourceError::Decode(format!("inconsistent {w}x{h} buffer")))
}

/// Encode a raster as an 8-bit grayscale PNG (used by replay fixtures and
/// the simulated source's dump option).
pub fn encode_png(raster: &RasterImage) -> Result<Vec<u8>> {
    let w = u32::try_from(raster.width).map_err(|e| SourceError::Decode(e.to_string()))?;
    let h = u32::try_from(raster.height).map_err(|e| SourceError::Decode(e.to_string()))?;
    let img = image::GrayImage::from_raw(w, h, raster.pixels.clone())
        .ok_or_else(|| SourceError::Decode(format!("inconsistent {w}x{h} buffer")))?;
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(out.into_inner())
}
