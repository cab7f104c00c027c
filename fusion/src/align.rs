//! Geometric alignment: fixed sensor-offset translation and homography
//! warping into a common pixel coordinate space.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Alignment failure modes.
#[derive(Debug, Error)]
pub enum AlignError {
    /// The configured homography cannot be inverted for backward mapping.
    #[error("homography matrix is singular")]
    SingularHomography,
}

/// Physical mounting offset between the two sensors, in pixels.
///
/// Encodes the `[1 0 x; 0 1 y]` affine translation; configuration constant,
/// never derived at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetVector {
    /// Horizontal shift; negative moves left.
    pub x: i32,
    /// Vertical shift; negative moves up.
    pub y: i32,
}

impl OffsetVector {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The translation that undoes this one.
    pub fn inverse(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

/// A 3x3 projective transform between the two sensors' pixel spaces.
///
/// Loaded once from the homography store and shared read-only for the
/// process lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self(matrix)
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2], //
            rows[1][0], rows[1][1], rows[1][2], //
            rows[2][0], rows[2][1], rows[2][2],
        ))
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Map a source point forward through the transform. `None` when the
    /// point projects to infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.0 * Vector3::new(x, y, 1.0);
        if p.z.abs() < 1e-12 {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }
}

/// Translate an RGBA frame by `offset` on its own canvas.
///
/// Pixels shifted out of bounds are dropped; uncovered pixels stay
/// transparent zero.
pub fn translate(frame: &RgbaImage, offset: OffsetVector) -> RgbaImage {
    let (w, h) = frame.dimensions();
    let mut out = RgbaImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let sx = i64::from(x) - i64::from(offset.x);
            let sy = i64::from(y) - i64::from(offset.y);
            if sx >= 0 && sx < i64::from(w) && sy >= 0 && sy < i64::from(h) {
                out.put_pixel(x, y, *frame.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    out
}

/// Warp a grayscale frame through `homography` into a canvas of the given
/// size, bilinear sampling with a black border for unmapped pixels.
///
/// Backward mapping: every output pixel is pulled from
/// `homography^-1 * (x, y, 1)`, so the forward transform matches the stored
/// calibration direction.
pub fn warp_perspective(
    frame: &GrayImage,
    homography: &Homography,
    out_width: u32,
    out_height: u32,
) -> Result<GrayImage, AlignError> {
    let inverse = homography
        .0
        .try_inverse()
        .ok_or(AlignError::SingularHomography)?;

    let mut out = GrayImage::new(out_width, out_height);
    for y in 0..out_height {
        for x in 0..out_width {
            let p = inverse * Vector3::new(f64::from(x), f64::from(y), 1.0);
            if p.z.abs() < 1e-12 {
                continue;
            }
            let sx = p.x / p.z;
            let sy = p.y / p.z;
            out.put_pixel(x, y, Luma([bilinear_sample(frame, sx, sy)]));
        }
    }
    Ok(out)
}

/// Bilinear sample with a zero border for out-of-range contributions.
fn bilinear_sample(frame: &GrayImage, sx: f64, sy: f64) -> u8 {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;

    let fetch = |x: i64, y: i64| -> f64 {
        if x >= 0 && y >= 0 && x < i64::from(frame.width()) && y < i64::from(frame.height()) {
            f64::from(frame.get_pixel(x as u32, y as u32).0[0])
        } else {
            0.0
        }
    };

    let v = fetch(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + fetch(x0 + 1, y0) * fx * (1.0 - fy)
        + fetch(x0, y0 + 1) * (1.0 - fx) * fy
        + fetch(x0 + 1, y0 + 1) * fx * fy;
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    fn checker(w: u32, h: u32) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.put_pixel(x, y, Luma([(((x + y) % 2) * 200 + 20) as u8]));
            }
        }
        img
    }

    #[test]
    fn test_translate_moves_content() {
        let mut frame = RgbaImage::new(4, 4);
        frame.put_pixel(1, 1, Rgba([9, 9, 9, 255]));
        let shifted = translate(&frame, OffsetVector::new(2, 1));
        assert_eq!(shifted.get_pixel(3, 2).0, [9, 9, 9, 255]);
        assert_eq!(shifted.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_translate_fills_uncovered_with_transparent_zero() {
        let frame = RgbaImage::from_pixel(3, 3, Rgba([50, 60, 70, 255]));
        let shifted = translate(&frame, OffsetVector::new(-1, 0));
        // Rightmost column pulled from outside the canvas.
        for y in 0..3 {
            assert_eq!(shifted.get_pixel(2, y).0, [0, 0, 0, 0]);
        }
        assert_eq!(shifted.get_pixel(0, 0).0, [50, 60, 70, 255]);
    }

    #[test]
    fn test_translate_roundtrip_in_bounds() {
        let mut frame = RgbaImage::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                frame.put_pixel(x, y, Rgba([(x * 30) as u8, (y * 30) as u8, 0, 255]));
            }
        }
        let offset = OffsetVector::new(2, -3);
        let back = translate(&translate(&frame, offset), offset.inverse());

        // Pixels that stayed inside the canvas through both shifts must be
        // bit-exact.
        for y in 0..8i32 {
            for x in 0..8i32 {
                let moved_x = x + offset.x;
                let moved_y = y + offset.y;
                if (0..8).contains(&moved_x) && (0..8).contains(&moved_y) {
                    assert_eq!(
                        back.get_pixel(x as u32, y as u32),
                        frame.get_pixel(x as u32, y as u32),
                        "mismatch at ({x}, {y})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_identity_warp_preserves_frame() {
        let frame = checker(6, 5);
        let warped = warp_perspective(&frame, &Homography::identity(), 6, 5).unwrap();
        assert_eq!(warped, frame);
    }

    #[test]
    fn test_translation_homography_shifts() {
        // Forward transform shifts content by (+2, +1).
        let frame = checker(6, 6);
        let h = Homography::from_rows([[1.0, 0.0, 2.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]]);
        let warped = warp_perspective(&frame, &h, 6, 6).unwrap();
        for y in 1..6 {
            for x in 2..6 {
                assert_eq!(
                    warped.get_pixel(x, y),
                    frame.get_pixel(x - 2, y - 1),
                    "mismatch at ({x}, {y})"
                );
            }
        }
        // Unmapped border is black.
        assert_eq!(warped.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_singular_homography_is_an_error() {
        let frame = checker(4, 4);
        let h = Homography::from_rows([[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            warp_perspective(&frame, &h, 4, 4),
            Err(AlignError::SingularHomography)
        ));
    }

    #[test]
    fn test_homography_apply_point() {
        let h = Homography::from_rows([[2.0, 0.0, 1.0], [0.0, 2.0, -1.0], [0.0, 0.0, 1.0]]);
        let (x, y) = h.apply(3.0, 4.0).unwrap();
        assert_relative_eq!(x, 7.0);
        assert_relative_eq!(y, 7.0);
    }

    #[test]
    fn test_homography_apply_perspective_divide() {
        // Non-affine bottom row exercises the projective division.
        let h = Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.1, 0.0, 1.0]]);
        let (x, y) = h.apply(2.0, 4.0).unwrap();
        assert_relative_eq!(x, 2.0 / 1.2, max_relative = 1e-12);
        assert_relative_eq!(y, 4.0 / 1.2, max_relative = 1e-12);
    }

    #[test]
    fn test_homography_apply_point_at_infinity() {
        let h = Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        assert!(h.apply(1.0, 1.0).is_none());
    }
}
