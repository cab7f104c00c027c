//! False-color mapping and background alpha masking.
//!
//! The remapped IR frame gets a jet-style perceptual ramp plus an alpha
//! channel equal to the source intensity, so pixels the earlier stages zeroed
//! out stay fully transparent. The masker then erases the ramp's own
//! background tint: the colormap renders zero-signal pixels as dark blue,
//! which would otherwise composite as a solid wash over the visible frame.

use image::{GrayImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Inclusive per-channel RGBA box used to match background-colored pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    /// Per-channel lower bounds (RGBA order).
    pub min: [u8; 4],
    /// Per-channel upper bounds (RGBA order).
    pub max: [u8; 4],
}

impl ColorRange {
    /// True when every channel of `pixel` falls inside the box.
    pub fn contains(&self, pixel: &Rgba<u8>) -> bool {
        (0..4).all(|c| pixel.0[c] >= self.min[c] && pixel.0[c] <= self.max[c])
    }

    /// Box covering the jet ramp's dark-blue low end.
    ///
    /// Tuned by hand against the deployed rig; kept configurable so a
    /// different colormap can bring its own zero-color box.
    pub fn jet_background() -> Self {
        Self {
            min: [0, 0, 100, 0],
            max: [100, 100, 255, 255],
        }
    }
}

/// Jet-style ramp entry for one intensity.
fn jet_color(value: u8) -> [u8; 3] {
    let t = f32::from(value) / 255.0;
    let channel = |x: f32| ((1.5 - x.abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        channel(4.0 * t - 3.0),
        channel(4.0 * t - 2.0),
        channel(4.0 * t - 1.0),
    ]
}

/// Apply the jet ramp to a grayscale frame and carry the source intensity as
/// alpha, so zero-intensity pixels come out fully transparent.
pub fn colorize(frame: &GrayImage) -> RgbaImage {
    // Ramp is fixed; build the 256-entry table once per call.
    let mut ramp = [[0u8; 3]; 256];
    for (v, entry) in ramp.iter_mut().enumerate() {
        *entry = jet_color(v as u8);
    }

    let mut out = RgbaImage::new(frame.width(), frame.height());
    for (x, y, p) in frame.enumerate_pixels() {
        let v = p.0[0];
        let [r, g, b] = ramp[v as usize];
        out.put_pixel(x, y, Rgba([r, g, b, v]));
    }
    out
}

/// Zero all four channels of every pixel whose color falls inside `range`.
pub fn mask_background(frame: &mut RgbaImage, range: &ColorRange) {
    for p in frame.pixels_mut() {
        if range.contains(p) {
            *p = Rgba([0, 0, 0, 0]);
        }
    }
}
