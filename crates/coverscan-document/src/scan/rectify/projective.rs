// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Homography-based rectification.

use coverscan_core::error::{Result, ScanError};
use coverscan_core::{Frame, Quad};
use imageproc::geometric_transformations::Projection;
use tracing::trace;

use super::{Rectifier, sample_clamped, target_size};

/// Solves the four-point homography from the output rectangle to the quad
/// and inverse-maps every output pixel with bilinear sampling.
///
/// Source positions that land just outside the frame are clamped to the
/// nearest edge pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectiveRectifier;

impl Rectifier for ProjectiveRectifier {
    fn name(&self) -> &'static str {
        "projective"
    }

    fn rectify(&self, frame: &Frame, quad: &Quad) -> Result<Frame> {
        let (width, height) = target_size(quad)?;
        let (w, h) = (width as f32, height as f32);

        let rect = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let corners = quad.corners().map(|p| (p.x as f32, p.y as f32));

        // Output -> source, so each output pixel maps straight to a sample.
        let projection = Projection::from_control_points(rect, corners).ok_or_else(|| {
            ScanError::RectificationFailed("homography could not be solved".into())
        })?;

        let mut out = Frame::blank(width, height)?;
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = projection * (x as f32, y as f32);
                if !sx.is_finite() || !sy.is_finite() {
                    return Err(ScanError::RectificationFailed(format!(
                        "homography is degenerate at ({x}, {y})"
                    )));
                }
                out.put_pixel(x, y, sample_clamped(frame, f64::from(sx), f64::from(sy)));
            }
        }

        trace!(width, height, "Projective warp complete");
        Ok(out)
    }
}
