//! Percentile-based intensity remapping.
//!
//! Stretches the band between the selected threshold and a robust "top-k"
//! ceiling into the full 0-255 range, clamping a configurable fraction of
//! outlier-bright pixels at white. The LUT is a value type built once per
//! frame, so the remap stays referentially transparent and testable
//! independently of image I/O.

use crate::histogram::Histogram;
use image::{GrayImage, Luma};

/// A 256-entry lookup table, monotonic non-decreasing by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapLut {
    table: [u8; 256],
}

impl RemapLut {
    /// Output intensity for an input intensity.
    pub fn get(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    /// Raw table access.
    pub fn as_array(&self) -> &[u8; 256] {
        &self.table
    }

    /// Apply the table pointwise.
    pub fn apply(&self, frame: &GrayImage) -> GrayImage {
        let mut out = GrayImage::new(frame.width(), frame.height());
        for (x, y, p) in frame.enumerate_pixels() {
            out.put_pixel(x, y, Luma([self.get(p.0[0])]));
        }
        out
    }
}

/// Build the stretch LUT from a frame histogram.
///
/// `high` is the largest occupied intensity; `topk` is the smallest intensity
/// whose cumulative count reaches `total - k * above`, where `above` counts
/// pixels strictly above `threshold`. Values above `topk` map to 255, values
/// in `(threshold, topk]` stretch linearly over `(threshold, high]`, values
/// at or below `threshold` map to 0. When `high == threshold` the stretch
/// band is empty and stays zero, so a degenerate histogram produces an
/// all-zero remap instead of a division fault.
///
/// Returns the LUT and the computed `topk` ceiling (surfaced for
/// diagnostics).
pub fn build_lut(hist: &Histogram, k: f32, threshold: u8) -> (RemapLut, u8) {
    let high = hist.highest_occupied().unwrap_or(0);
    let total = hist.total();
    let cumulative = hist.cumulative();

    let above = total - cumulative[threshold as usize];
    let floor_count = total as f64 - f64::from(k) * above as f64;

    let mut topk = 0u8;
    for (i, &c) in cumulative.iter().enumerate() {
        if c as f64 >= floor_count {
            topk = i as u8;
            break;
        }
    }

    let mut table = [0u8; 256];
    for i in 0..256usize {
        if i > topk as usize {
            table[i] = 255;
        } else if i > threshold as usize && high > threshold {
            let stretched =
                255.0 * (i - threshold as usize) as f32 / f32::from(high - threshold);
            table[i] = stretched.round().clamp(0.0, 255.0) as u8;
        }
    }

    (RemapLut { table }, topk)
}

/// Histogram the frame, build the LUT, and apply it in one step.
pub fn remap_frame(frame: &GrayImage, k: f32, threshold: u8) -> (GrayImage, u8) {
    let hist = Histogram::from_gray(frame);
    let (lut, topk) = build_lut(&hist, k, threshold);
    (lut.apply(frame), topk)
}
