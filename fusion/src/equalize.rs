//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The threshold search downstream operates on a perceptually normalized
//! signal: the frame is divided into tiles, each tile's histogram is clipped
//! and redistributed before building its equalization LUT, and every pixel is
//! remapped by bilinear interpolation between the four nearest tile LUTs.
//!
//! Reference: Zuiderveld (1994), "Contrast Limited Adaptive Histogram
//! Equalization", Graphics Gems IV.

use image::{GrayImage, Luma};

/// Clip limit tuned for low-resolution IR frames; bounds how far any local
/// histogram bin may be amplified in near-uniform regions.
pub const DEFAULT_CLIP_LIMIT: f32 = 2.7;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 8;

/// Apply CLAHE to a grayscale frame.
///
/// `clip_limit` is a multiplier on the uniform bin count (`tile_pixels /
/// 256`); bins exceeding it are clipped and the excess is redistributed
/// evenly. Zero-variance tiles equalize to zero: a frame with no contrast
/// carries no foreground signal and must leave the pipeline dark rather than
/// as a solid tint. Empty input yields empty output.
pub fn clahe(frame: &GrayImage, tile_size: usize, clip_limit: f32) -> GrayImage {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let mut out = GrayImage::new(frame.width(), frame.height());
    if w == 0 || h == 0 || tile_size == 0 {
        return out;
    }

    // Tile grid, rounded up to cover the frame.
    let cols = w.div_ceil(tile_size);
    let rows = h.div_ceil(tile_size);

    let mut tile_luts = vec![[0u8; 256]; cols * rows];
    for ty in 0..rows {
        for tx in 0..cols {
            let x0 = tx * tile_size;
            let y0 = ty * tile_size;
            let x1 = (x0 + tile_size).min(w);
            let y1 = (y0 + tile_size).min(h);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[frame.get_pixel(x as u32, y as u32).0[0] as usize] += 1;
                }
            }

            let tile_pixels = (x1 - x0) * (y1 - y0);
            tile_luts[ty * cols + tx] = tile_lut(&mut hist, tile_pixels, clip_limit);
        }
    }

    // Remap each pixel by interpolating between the four surrounding tile
    // center LUTs.
    let center_x = |tx: usize| (tx as f32 + 0.5) * tile_size as f32;
    let center_y = |ty: usize| (ty as f32 + 0.5) * tile_size as f32;

    for y in 0..h {
        for x in 0..w {
            let gx = (x as f32 / tile_size as f32) - 0.5;
            let gy = (y as f32 / tile_size as f32) - 0.5;

            let tx0 = (gx.floor() as isize).max(0) as usize;
            let ty0 = (gy.floor() as isize).max(0) as usize;
            let tx1 = (tx0 + 1).min(cols - 1);
            let ty1 = (ty0 + 1).min(rows - 1);

            let wx = if tx0 == tx1 {
                0.0
            } else {
                ((x as f32 - center_x(tx0)) / (center_x(tx1) - center_x(tx0))).clamp(0.0, 1.0)
            };
            let wy = if ty0 == ty1 {
                0.0
            } else {
                ((y as f32 - center_y(ty0)) / (center_y(ty1) - center_y(ty0))).clamp(0.0, 1.0)
            };

            let v = frame.get_pixel(x as u32, y as u32).0[0] as usize;
            let v00 = tile_luts[ty0 * cols + tx0][v] as f32;
            let v10 = tile_luts[ty0 * cols + tx1][v] as f32;
            let v01 = tile_luts[ty1 * cols + tx0][v] as f32;
            let v11 = tile_luts[ty1 * cols + tx1][v] as f32;

            let blended = v00 * (1.0 - wx) * (1.0 - wy)
                + v10 * wx * (1.0 - wy)
                + v01 * (1.0 - wx) * wy
                + v11 * wx * wy;

            out.put_pixel(
                x as u32,
                y as u32,
                Luma([blended.round().clamp(0.0, 255.0) as u8]),
            );
        }
    }

    out
}

/// Build one tile's equalization LUT from its histogram.
fn tile_lut(hist: &mut [u32; 256], tile_pixels: usize, clip_limit: f32) -> [u8; 256] {
    // Zero-variance tile: no contrast to redistribute, equalizes to zero.
    if hist.iter().filter(|&&c| c > 0).count() <= 1 {
        return [0u8; 256];
    }

    if clip_limit > 0.0 {
        clip_histogram(hist, tile_pixels, clip_limit);
    }

    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (i, &c) in hist.iter().enumerate() {
        running += c;
        cdf[i] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = tile_pixels as f32 - cdf_min as f32;
    let mut lut = [0u8; 256];
    if denom <= 0.0 {
        return lut;
    }
    for i in 0..256 {
        let v = (cdf[i] as f32 - cdf_min as f32) / denom * 255.0;
        lut[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Clip histogram bins at `clip_limit` times the uniform bin count and
/// redistribute the excess evenly across all bins.
fn clip_histogram(hist: &mut [u32; 256], tile_pixels: usize, clip_limit: f32) {
    let clip_at = ((tile_pixels as f32 / 256.0) * clip_limit).ceil() as u32;

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip_at {
            excess += *bin - clip_at;
            *bin = clip_at;
        }
    }

    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += per_bin;
        if i < remainder {
            *bin += 1;
        }
    }
}
