// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge-interpolation rectification, used when no homography is available.

use coverscan_core::error::Result;
use coverscan_core::{Frame, Quad};
use tracing::trace;

use super::{Rectifier, sample_clamped, target_size};

/// Tolerance for treating a source position as on the frame edge.
const EDGE_EPSILON: f64 = 1e-6;

/// Approximates the inverse mapping by interpolating linearly along the
/// quad's top and bottom edges, then between them.
///
/// Exact for rectangles and parallelograms; trapezoids come out with some
/// distortion. Output pixels whose source lies outside the frame stay
/// transparent black.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearRectifier;

impl Rectifier for BilinearRectifier {
    fn name(&self) -> &'static str {
        "bilinear"
    }

    fn rectify(&self, frame: &Frame, quad: &Quad) -> Result<Frame> {
        let (width, height) = target_size(quad)?;
        let max_x = f64::from(frame.width() - 1) + EDGE_EPSILON;
        let max_y = f64::from(frame.height() - 1) + EDGE_EPSILON;

        let (tl, tr, br, bl) = (quad.top_left(), quad.top_right(), quad.bottom_right(), quad.bottom_left());

        let mut out = Frame::blank(width, height)?;
        let mut skipped = 0usize;
        for y in 0..height {
            let v = f64::from(y) / f64::from(height);
            for x in 0..width {
                let u = f64::from(x) / f64::from(width);
                let top = tl.lerp(&tr, u);
                let bottom = bl.lerp(&br, u);
                let src = top.lerp(&bottom, v);

                if src.x < -EDGE_EPSILON || src.y < -EDGE_EPSILON || src.x > max_x || src.y > max_y {
                    skipped += 1;
                    continue;
                }
                out.put_pixel(x, y, sample_clamped(frame, src.x, src.y));
            }
        }

        trace!(width, height, skipped, "Bilinear rectification complete");
        Ok(out)
    }
}
