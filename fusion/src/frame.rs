//! Frame representation and bit-depth normalization.
//!
//! Every stage past equalization operates on 8-bit single-channel
//! [`GrayImage`] data. Raw sensor frames arrive as `Array2<u16>` and are
//! rescaled per frame; file inputs of any common channel/bit-depth
//! combination are funneled through [`to_gray8`].

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use ndarray::Array2;

/// Normalize a raw 16-bit sensor frame to 8 bits via linear min-max rescale.
///
/// The rescale is per frame and lossy. A zero-variance frame carries no
/// signal once rescaled and normalizes to all-zero.
pub fn normalize_u16(raw: &Array2<u16>) -> GrayImage {
    let (rows, cols) = raw.dim();
    let mut out = GrayImage::new(cols as u32, rows as u32);
    if raw.is_empty() {
        return out;
    }

    let mut lo = u16::MAX;
    let mut hi = u16::MIN;
    for &v in raw.iter() {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if hi == lo {
        return out;
    }

    let span = f32::from(hi - lo);
    for ((y, x), &v) in raw.indexed_iter() {
        let scaled = (f32::from(v - lo) / span * 255.0).round() as u8;
        out.put_pixel(x as u32, y as u32, Luma([scaled]));
    }
    out
}

/// Convert a loaded image of any supported layout to an 8-bit grayscale frame.
///
/// 16-bit variants are min-max rescaled per image (matching the raw sensor
/// path); 8-bit variants go through the standard luma conversion.
pub fn to_gray8(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => rescale_luma16(&img.to_luma16()),
        _ => img.to_luma8(),
    }
}

fn rescale_luma16(raw: &ImageBuffer<Luma<u16>, Vec<u16>>) -> GrayImage {
    let mut out = GrayImage::new(raw.width(), raw.height());
    if raw.width() == 0 || raw.height() == 0 {
        return out;
    }

    let mut lo = u16::MAX;
    let mut hi = u16::MIN;
    for p in raw.pixels() {
        lo = lo.min(p.0[0]);
        hi = hi.max(p.0[0]);
    }
    if hi == lo {
        return out;
    }

    let span = f32::from(hi - lo);
    for (x, y, p) in raw.enumerate_pixels() {
        let scaled = (f32::from(p.0[0] - lo) / span * 255.0).round() as u8;
        out.put_pixel(x, y, Luma([scaled]));
    }
    out
}

/// Broadcast a grayscale frame into RGBA with a fully-opaque alpha channel.
///
/// Used to bring the warped visible frame up to the colorized IR frame's
/// channel count before compositing.
pub fn gray_to_rgba(gray: &GrayImage) -> RgbaImage {
    let mut out = RgbaImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        let v = p.0[0];
        out.put_pixel(x, y, Rgba([v, v, v, 255]));
    }
    out
}
