//! Automatic threshold selection (Yen's criterion) and threshold application.

use crate::histogram::Histogram;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// How the selected threshold is applied to the equalized frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMode {
    /// Samples at or above the threshold become 255, everything else 0.
    Binary,
    /// Samples below the threshold become 0, everything else passes through.
    ToZero,
}

/// Select a threshold with Yen's entropy-maximization criterion.
///
/// The histogram is normalized to a probability distribution and, for every
/// candidate split `t`, the criterion
///
/// ```text
/// C(t) = -ln(P1(t) * P2(t)) + 2 ln(Q1(t) * Q2(t))
/// ```
///
/// is evaluated, with `P1`/`P2` the cumulative squared probabilities (the
/// within-class second moments) and `Q1`/`Q2` the plain cumulative
/// probabilities on each side of `t`. Non-positive log arguments contribute
/// zero so a degenerate histogram never faults. The scan is O(256), the
/// maximum wins, and ties break to the smallest `t`. An empty histogram
/// yields 0.
pub fn yen_threshold(hist: &Histogram) -> u8 {
    let total = hist.total();
    if total == 0 {
        return 0;
    }
    let total = total as f64;

    // Running cumulative sums of p and p^2 over the normalized histogram.
    let mut cum_p = [0f64; 256];
    let mut cum_p_sq = [0f64; 256];
    let mut running_p = 0f64;
    let mut running_p_sq = 0f64;
    for i in 0..256 {
        let p = f64::from(hist.count(i as u8)) / total;
        running_p += p;
        running_p_sq += p * p;
        cum_p[i] = running_p;
        cum_p_sq[i] = running_p_sq;
    }
    let total_p_sq = running_p_sq;

    fn guarded_ln(x: f64) -> f64 {
        if x > 0.0 {
            x.ln()
        } else {
            0.0
        }
    }

    let mut best_t = 0usize;
    let mut best_crit = f64::NEG_INFINITY;
    for t in 0..256 {
        let q1 = cum_p[t];
        let q2 = 1.0 - q1;
        let p1 = cum_p_sq[t];
        let p2 = total_p_sq - p1;

        let crit = -guarded_ln(p1 * p2) + 2.0 * guarded_ln(q1 * q2);
        if crit > best_crit {
            best_crit = crit;
            best_t = t;
        }
    }

    best_t as u8
}

/// Apply `threshold` to `frame` in the given mode.
///
/// Pure and stateless; `Binary` is idempotent.
pub fn apply_threshold(frame: &GrayImage, threshold: u8, mode: ThresholdMode) -> GrayImage {
    let mut out = GrayImage::new(frame.width(), frame.height());
    for (x, y, p) in frame.enumerate_pixels() {
        let v = p.0[0];
        let mapped = match mode {
            ThresholdMode::Binary => {
                if v >= threshold {
                    255
                } else {
                    0
                }
            }
            ThresholdMode::ToZero => {
                if v >= threshold {
                    v
                } else {
                    0
                }
            }
        };
        out.put_pixel(x, y, Luma([mapped]));
    }
    out
}
