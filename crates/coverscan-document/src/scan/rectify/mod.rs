// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: flatten the quad-bounded region of a frame into
// an upright rectangle.
//
// Two strategies implement `Rectifier`: a true homography warp and a
// linear-interpolation approximation. `PerspectiveRectifier` tries the former
// and falls back to the latter.

pub mod bilinear;
pub mod projective;

use std::sync::Arc;

use coverscan_core::error::{Result, ScanError};
use coverscan_core::{Frame, Quad, ScanConfig};
use tracing::{debug, instrument, warn};

pub use bilinear::BilinearRectifier;
pub use projective::ProjectiveRectifier;

/// Largest output side we are willing to allocate.
pub const MAX_OUTPUT_DIMENSION: u32 = 32_768;

/// A strategy that maps the inside of `quad` onto a `width x height` frame.
pub trait Rectifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn rectify(&self, frame: &Frame, quad: &Quad) -> Result<Frame>;
}

/// Output size for `quad`: the longer of each pair of opposite edges,
/// rounded to the nearest pixel.
///
/// Fails with `InvalidQuad` on non-finite corners, a side that rounds to
/// zero, or a side larger than [`MAX_OUTPUT_DIMENSION`].
pub fn target_size(quad: &Quad) -> Result<(u32, u32)> {
    if !quad.is_finite() {
        return Err(ScanError::InvalidQuad("corner coordinates must be finite".into()));
    }

    let top = quad.top_left().distance(&quad.top_right());
    let bottom = quad.bottom_left().distance(&quad.bottom_right());
    let left = quad.top_left().distance(&quad.bottom_left());
    let right = quad.top_right().distance(&quad.bottom_right());

    let width = top.max(bottom).round();
    let height = left.max(right).round();

    if width < 1.0 || height < 1.0 {
        return Err(ScanError::InvalidQuad(format!(
            "output would be {width}x{height} pixels"
        )));
    }
    let limit = f64::from(MAX_OUTPUT_DIMENSION);
    if width > limit || height > limit {
        return Err(ScanError::InvalidQuad(format!(
            "output {width}x{height} exceeds {MAX_OUTPUT_DIMENSION} pixels per side"
        )));
    }

    Ok((width as u32, height as u32))
}

/// Bilinear sample at `(x, y)`, clamping the position to the frame.
///
/// Channels are rounded to the nearest integer, so sampling exactly on a
/// pixel returns that pixel unchanged.
pub(crate) fn sample_clamped(frame: &Frame, x: f64, y: f64) -> [u8; 4] {
    let max_x = f64::from(frame.width() - 1);
    let max_y = f64::from(frame.height() - 1);
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(frame.width() - 1);
    let y1 = (y0 + 1).min(frame.height() - 1);

    let p00 = frame.pixel(x0, y0).unwrap_or_default();
    let p10 = frame.pixel(x1, y0).unwrap_or_default();
    let p01 = frame.pixel(x0, y1).unwrap_or_default();
    let p11 = frame.pixel(x1, y1).unwrap_or_default();

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Projective warp with an automatic bilinear fallback.
#[derive(Clone)]
pub struct PerspectiveRectifier {
    primary: Option<Arc<dyn Rectifier>>,
    fallback: Arc<dyn Rectifier>,
}

impl std::fmt::Debug for PerspectiveRectifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerspectiveRectifier")
            .field("primary", &self.primary.as_ref().map(|r| r.name()))
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl Default for PerspectiveRectifier {
    fn default() -> Self {
        Self::new()
    }
}

impl PerspectiveRectifier {
    /// Homography first, bilinear approximation on failure.
    pub fn new() -> Self {
        Self {
            primary: Some(Arc::new(ProjectiveRectifier)),
            fallback: Arc::new(BilinearRectifier),
        }
    }

    /// Only the bilinear approximation.
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: Arc::new(BilinearRectifier),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        if config.prefer_projective {
            Self::new()
        } else {
            Self::fallback_only()
        }
    }

    /// Arbitrary strategies, mainly for tests and platform backends.
    pub fn with_strategies(primary: Option<Arc<dyn Rectifier>>, fallback: Arc<dyn Rectifier>) -> Self {
        Self { primary, fallback }
    }

    pub fn rectify(&self, frame: &Frame, quad: &Quad) -> Result<Frame> {
        self.rectify_named(frame, quad).map(|(out, _)| out)
    }

    /// Like [`rectify`](Self::rectify), also returning the name of the
    /// strategy that produced the output.
    #[instrument(skip_all, fields(src_w = frame.width(), src_h = frame.height()))]
    pub fn rectify_named(&self, frame: &Frame, quad: &Quad) -> Result<(Frame, &'static str)> {
        let (width, height) = target_size(quad)?;
        debug!(width, height, "Rectifying quad");

        if let Some(primary) = &self.primary {
            match primary.rectify(frame, quad) {
                Ok(out) => return Ok((out, primary.name())),
                Err(err) => {
                    warn!(strategy = primary.name(), error = %err, "Primary rectifier failed; using fallback");
                }
            }
        }

        match self.fallback.rectify(frame, quad) {
            Ok(out) => Ok((out, self.fallback.name())),
            Err(err @ (ScanError::InvalidQuad(_) | ScanError::RectificationFailed(_))) => Err(err),
            Err(other) => Err(ScanError::RectificationFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use coverscan_core::Point;
    use image::{DynamicImage, imageops};

    use crate::image::{frame_from_dynamic, frame_to_rgba};

    /// High-frequency test pattern; neighbouring pixels always differ.
    pub(crate) fn pattern(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            [
                (x * 7 % 256) as u8,
                (y * 5 % 256) as u8,
                ((x + 3 * y) % 256) as u8,
                255,
            ]
        })
        .expect("frame")
    }

    /// 200x200 frame with one flat colour per quadrant.
    pub(crate) fn quadrants() -> Frame {
        Frame::from_fn(200, 200, |x, y| match (x < 100, y < 100) {
            (true, true) => [255, 0, 0, 255],
            (false, true) => [0, 255, 0, 255],
            (false, false) => [0, 0, 255, 255],
            (true, false) => [255, 255, 0, 255],
        })
        .expect("frame")
    }

    /// The `width x height` region at `(x, y)`, cut out with `image`.
    pub(crate) fn crop(frame: &Frame, x: u32, y: u32, width: u32, height: u32) -> Frame {
        let rgba = frame_to_rgba(frame.clone()).expect("rgba");
        let region = imageops::crop_imm(&rgba, x, y, width, height).to_image();
        frame_from_dynamic(DynamicImage::ImageRgba8(region)).expect("frame")
    }

    pub(crate) fn trapezoid() -> Quad {
        Quad::from_ordered([
            Point::new(40.0, 30.0),
            Point::new(160.0, 50.0),
            Point::new(170.0, 150.0),
            Point::new(30.0, 140.0),
        ])
    }

    struct Broken;

    impl Rectifier for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn rectify(&self, _frame: &Frame, _quad: &Quad) -> Result<Frame> {
            Err(ScanError::RectificationFailed("singular matrix".into()))
        }
    }

    #[test]
    fn target_size_of_axis_aligned_rectangle() {
        let quad = Quad::from_bounds(10.0, 10.0, 500.0, 700.0);
        assert_eq!(target_size(&quad).expect("valid"), (490, 690));
    }

    #[test]
    fn target_size_uses_longer_edges() {
        assert_eq!(target_size(&trapezoid()).expect("valid"), (140, 110));
    }

    #[test]
    fn width_rounding_to_zero_is_invalid() {
        let quad = Quad::from_bounds(10.0, 10.0, 10.3, 700.0);
        assert!(matches!(target_size(&quad), Err(ScanError::InvalidQuad(_))));

        let frame = pattern(20, 20);
        let err = PerspectiveRectifier::new().rectify(&frame, &quad).unwrap_err();
        assert!(matches!(err, ScanError::InvalidQuad(_)));
    }

    #[test]
    fn non_finite_corner_is_invalid() {
        let mut quad = Quad::from_bounds(0.0, 0.0, 10.0, 10.0);
        quad.set_corner(1, Point::new(f64::NAN, 0.0));
        assert!(matches!(target_size(&quad), Err(ScanError::InvalidQuad(_))));
    }

    #[test]
    fn oversized_output_is_invalid() {
        let quad = Quad::from_bounds(0.0, 0.0, 1.0e9, 10.0);
        assert!(matches!(target_size(&quad), Err(ScanError::InvalidQuad(_))));
    }

    #[test]
    fn chain_prefers_projective() {
        let frame = pattern(60, 40);
        let quad = Quad::from_bounds(0.0, 0.0, 60.0, 40.0);
        let (_, used) = PerspectiveRectifier::new()
            .rectify_named(&frame, &quad)
            .expect("rectified");
        assert_eq!(used, "projective");
    }

    #[test]
    fn failing_primary_falls_back_to_bilinear() {
        let frame = pattern(60, 40);
        let quad = Quad::from_bounds(0.0, 0.0, 60.0, 40.0);
        let chain = PerspectiveRectifier::with_strategies(
            Some(Arc::new(Broken)),
            Arc::new(BilinearRectifier),
        );
        let (out, used) = chain.rectify_named(&frame, &quad).expect("fallback");
        assert_eq!(used, "bilinear");
        assert_eq!(out.dimensions(), (60, 40));
    }

    #[test]
    fn fallback_failure_is_reported() {
        let frame = pattern(60, 40);
        let quad = Quad::from_bounds(0.0, 0.0, 60.0, 40.0);
        let chain = PerspectiveRectifier::with_strategies(Some(Arc::new(Broken)), Arc::new(Broken));
        let err = chain.rectify(&frame, &quad).unwrap_err();
        assert!(matches!(err, ScanError::RectificationFailed(_)));
    }

    #[test]
    fn config_can_disable_projective() {
        let config = ScanConfig {
            prefer_projective: false,
            ..ScanConfig::default()
        };
        let frame = pattern(30, 30);
        let quad = Quad::from_bounds(0.0, 0.0, 30.0, 30.0);
        let (_, used) = PerspectiveRectifier::from_config(&config)
            .rectify_named(&frame, &quad)
            .expect("rectified");
        assert_eq!(used, "bilinear");
    }

    #[test]
    fn sampling_on_a_pixel_is_exact() {
        let frame = pattern(10, 10);
        assert_eq!(sample_clamped(&frame, 3.0, 4.0), frame.pixel(3, 4).expect("pixel"));
        assert_eq!(sample_clamped(&frame, 9.0, 9.0), frame.pixel(9, 9).expect("pixel"));
        // Outside clamps to the nearest edge pixel.
        assert_eq!(sample_clamped(&frame, -5.0, 40.0), frame.pixel(0, 9).expect("pixel"));
    }

    #[test]
    fn sampling_between_pixels_blends() {
        let frame = Frame::from_fn(2, 1, |x, _| if x == 0 { [0, 0, 0, 255] } else { [200, 100, 50, 255] })
            .expect("frame");
        assert_eq!(sample_clamped(&frame, 0.5, 0.0), [100, 50, 25, 255]);
    }
}
