//! Weighted compositing of the aligned frame pair.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Fixed blend weights: `out = alpha * ir + beta * visible + gamma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight of the colorized IR frame. Increase to see more of the
    /// thresholded IR signal.
    pub alpha: f64,
    /// Weight of the warped visible frame.
    pub beta: f64,
    /// Constant bias added per channel.
    pub gamma: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            beta: 0.6,
            gamma: 0.0,
        }
    }
}

/// Blend the aligned IR and visible frames per channel, rounded and clamped
/// to [0, 255].
///
/// Matching dimensions are a caller-guaranteed precondition; a mismatch here
/// means the alignment stage was skipped, not a recoverable runtime state.
pub fn blend(ir: &RgbaImage, visible: &RgbaImage, weights: &BlendWeights) -> RgbaImage {
    assert_eq!(
        ir.dimensions(),
        visible.dimensions(),
        "composite inputs must share dimensions"
    );

    let mut out = RgbaImage::new(ir.width(), ir.height());
    for (x, y, p) in out.enumerate_pixels_mut() {
        let a = ir.get_pixel(x, y);
        let b = visible.get_pixel(x, y);
        let mut blended = [0u8; 4];
        for c in 0..4 {
            let v = weights.alpha * f64::from(a.0[c])
                + weights.beta * f64::from(b.0[c])
                + weights.gamma;
            blended[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        *p = Rgba(blended);
    }
    out
}
