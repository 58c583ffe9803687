// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour detection: pick the best quadrilateral candidate in a frame.
//
// Detection runs on every live frame, so it never fails loudly: backend
// errors are logged and reported as "no quad", and only a missing backend is
// surfaced (as `DetectionUnavailable`) so the caller can keep showing the raw
// feed.

use std::sync::Arc;

use coverscan_core::error::{Result, ScanError};
use coverscan_core::{DetectionResult, Frame, Point, Quad, RatioRange, ScanConfig};
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, instrument, warn};

use super::backend::{Contour, DetectionBackend, EdgeContourBackend};
use super::corners::order_corners;

/// Finds the largest closed outline in a frame and reduces it to a quad.
#[derive(Clone)]
pub struct ContourDetector {
    backend: Option<Arc<dyn DetectionBackend>>,
    accept_ratio: RatioRange,
    epsilon_factor: f64,
}

impl std::fmt::Debug for ContourDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContourDetector")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("accept_ratio", &self.accept_ratio)
            .field("epsilon_factor", &self.epsilon_factor)
            .finish()
    }
}

impl ContourDetector {
    // -- Construction ---------------------------------------------------------

    /// A detector with no backend installed yet. `detect` reports
    /// `DetectionUnavailable` until `install_backend` is called.
    pub fn uninitialised(config: &ScanConfig) -> Self {
        Self {
            backend: None,
            accept_ratio: config.contour_accept_ratio,
            epsilon_factor: config.polygon_approx_epsilon_factor,
        }
    }

    /// A detector using the given backend.
    pub fn with_backend(backend: Arc<dyn DetectionBackend>, config: &ScanConfig) -> Self {
        let mut detector = Self::uninitialised(config);
        detector.install_backend(backend);
        detector
    }

    /// A detector using the built-in edge backend tuned from `config`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::with_backend(
            Arc::new(EdgeContourBackend::new(config.detection.clone())),
            config,
        )
    }

    pub fn install_backend(&mut self, backend: Arc<dyn DetectionBackend>) {
        debug!(backend = backend.name(), "Detection backend installed");
        self.backend = Some(backend);
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    // -- Detection ------------------------------------------------------------

    /// Detect the best quad candidate in `frame`.
    ///
    /// The only error is `DetectionUnavailable`; every other problem degrades
    /// to a result with `quad: None`.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn detect(&self, frame: &Frame) -> Result<DetectionResult> {
        let backend = self.backend.as_ref().ok_or(ScanError::DetectionUnavailable)?;

        let contours = match backend.find_contours(frame) {
            Ok(contours) => contours,
            Err(err) => {
                warn!(backend = backend.name(), error = %err, "Contour backend failed; treating frame as empty");
                return Ok(DetectionResult::empty());
            }
        };

        let result = self.evaluate(&contours, frame.area());
        debug!(
            contours = contours.len(),
            area_ratio = result.area_ratio,
            corner_count = result.corner_count,
            has_quad = result.quad.is_some(),
            "Frame analysed"
        );
        Ok(result)
    }

    /// Reduce a set of contours to a detection result for a frame of
    /// `frame_area` pixels.
    ///
    /// 1. Take the contour with the largest enclosed area
    /// 2. Reject it if its area ratio falls outside the acceptance band
    /// 3. Approximate it with Douglas-Peucker at `epsilon_factor * perimeter`
    /// 4. Four or more vertices: order the first four as the quad
    /// 5. Fewer: fall back to the contour's bounding rectangle
    pub fn evaluate(&self, contours: &[Contour], frame_area: f64) -> DetectionResult {
        let Some(largest) = contours
            .iter()
            .filter(|c| !c.points.is_empty())
            .max_by(|a, b| a.area().total_cmp(&b.area()))
        else {
            return DetectionResult::empty();
        };

        if frame_area <= 0.0 {
            return DetectionResult::empty();
        }

        let area_ratio = largest.area() / frame_area;
        if !self.accept_ratio.contains(area_ratio) {
            return DetectionResult {
                quad: None,
                area_ratio,
                corner_count: 0,
            };
        }

        let epsilon = self.epsilon_factor * largest.perimeter();
        let approx = approximate_polygon(&largest.points, epsilon);
        let corner_count = approx.len() as u32;

        let quad = if approx.len() >= 4 {
            Some(order_corners([approx[0], approx[1], approx[2], approx[3]]))
        } else {
            largest
                .bounding_box()
                .map(|(min_x, min_y, max_x, max_y)| Quad::from_bounds(min_x, min_y, max_x, max_y))
        };

        DetectionResult {
            quad,
            area_ratio,
            corner_count,
        }
    }
}

// -- Polygon approximation ----------------------------------------------------

/// Douglas-Peucker simplification of a closed outline.
///
/// Vertices come back in the outline's own order, starting with its first
/// point. Outlines too short to simplify, or a non-positive `epsilon`, are
/// returned as they are.
pub fn approximate_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    // A repeated closing point would leave no baseline to measure from.
    let open = match points {
        [first, rest @ .., last] if first == last && !rest.is_empty() => &points[..points.len() - 1],
        _ => points,
    };
    if open.len() < 3 || epsilon.is_nan() || epsilon <= 0.0 {
        return open.to_vec();
    }

    let curve: Vec<PixelPoint<f64>> = open.iter().map(|p| PixelPoint::new(p.x, p.y)).collect();
    approximate_polygon_dp(&curve, epsilon, true)
        .into_iter()
        .map(|p| Point::new(p.x, p.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Densely sampled outline of an axis-aligned rectangle, starting at the
    /// top-left and walking clockwise.
    fn rectangle_outline(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        let mut points = Vec::new();
        let mut x = x0;
        while x < x1 {
            points.push(Point::new(x, y0));
            x += 1.0;
        }
        let mut y = y0;
        while y < y1 {
            points.push(Point::new(x1, y));
            y += 1.0;
        }
        let mut x = x1;
        while x > x0 {
            points.push(Point::new(x, y1));
            x -= 1.0;
        }
        let mut y = y1;
        while y > y0 {
            points.push(Point::new(x0, y));
            y -= 1.0;
        }
        Contour::new(points)
    }

    fn detector() -> ContourDetector {
        ContourDetector::uninitialised(&ScanConfig::default())
    }

    struct FailingBackend;

    impl DetectionBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn find_contours(&self, _frame: &Frame) -> Result<Vec<Contour>> {
            Err(ScanError::ImageError("sensor glitch".into()))
        }
    }

    #[test]
    fn rectangle_outline_becomes_ordered_quad() {
        let contours = vec![rectangle_outline(100.0, 50.0, 500.0, 450.0)];
        let result = detector().evaluate(&contours, 600.0 * 500.0);

        let quad = result.quad.expect("quad");
        assert_eq!(result.corner_count, 4);
        assert!((result.area_ratio - 160_000.0 / 300_000.0).abs() < 1e-9);
        assert_eq!(quad.top_left(), Point::new(100.0, 50.0));
        assert_eq!(quad.top_right(), Point::new(500.0, 50.0));
        assert_eq!(quad.bottom_right(), Point::new(500.0, 450.0));
        assert_eq!(quad.bottom_left(), Point::new(100.0, 450.0));
    }

    #[test]
    fn largest_contour_wins() {
        let contours = vec![
            rectangle_outline(10.0, 10.0, 40.0, 40.0),
            rectangle_outline(100.0, 50.0, 500.0, 450.0),
        ];
        let result = detector().evaluate(&contours, 600.0 * 500.0);
        assert_eq!(result.quad.expect("quad").top_left(), Point::new(100.0, 50.0));
    }

    #[test]
    fn contour_below_accept_band_is_unusable() {
        // 100x100 in a 500x500 frame: ratio 0.04.
        let contours = vec![rectangle_outline(0.0, 0.0, 100.0, 100.0)];
        let result = detector().evaluate(&contours, 500.0 * 500.0);
        assert!(result.quad.is_none());
        assert!((result.area_ratio - 0.04).abs() < 1e-9);
    }

    #[test]
    fn contour_above_accept_band_is_unusable() {
        // The whole frame border: ratio 1.0.
        let contours = vec![rectangle_outline(0.0, 0.0, 200.0, 100.0)];
        let result = detector().evaluate(&contours, 200.0 * 100.0);
        assert!(result.quad.is_none());
    }

    #[test]
    fn triangle_falls_back_to_bounding_rectangle() {
        let mut points = Vec::new();
        for i in 0..=100 {
            let t = f64::from(i) / 100.0;
            points.push(Point::new(50.0 + 300.0 * t, 50.0));
        }
        for i in 1..=100 {
            let t = f64::from(i) / 100.0;
            points.push(Point::new(350.0 - 150.0 * t, 50.0 + 300.0 * t));
        }
        for i in 1..100 {
            let t = f64::from(i) / 100.0;
            points.push(Point::new(200.0 - 150.0 * t, 350.0 - 300.0 * t));
        }
        let result = detector().evaluate(&[Contour::new(points)], 400.0 * 400.0);

        assert_eq!(result.corner_count, 3);
        let quad = result.quad.expect("bounding-rectangle quad");
        assert_eq!(quad.top_left(), Point::new(50.0, 50.0));
        assert_eq!(quad.bottom_right(), Point::new(350.0, 350.0));
    }

    #[test]
    fn no_contours_gives_empty_result() {
        let result = detector().evaluate(&[], 100.0);
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn missing_backend_is_reported() {
        let frame = Frame::blank(10, 10).expect("frame");
        let err = detector().detect(&frame).unwrap_err();
        assert!(matches!(err, ScanError::DetectionUnavailable));
    }

    #[test]
    fn backend_failure_degrades_to_no_quad() {
        let detector =
            ContourDetector::with_backend(Arc::new(FailingBackend), &ScanConfig::default());
        let frame = Frame::blank(10, 10).expect("frame");
        let result = detector.detect(&frame).expect("absorbed");
        assert_eq!(result, DetectionResult::empty());
    }

    #[test]
    fn synthetic_cover_is_detected_end_to_end() {
        let (w, h) = (400u32, 500u32);
        let frame = Frame::from_fn(w, h, |x, y| {
            if (50..350).contains(&x) && (60..440).contains(&y) {
                [240, 240, 240, 255]
            } else {
                [30, 30, 30, 255]
            }
        })
        .expect("frame");

        let result = ContourDetector::from_config(&ScanConfig::default())
            .detect(&frame)
            .expect("backend installed");

        let quad = result.quad.expect("cover found");
        assert_eq!(result.corner_count, 4);
        assert!(result.area_ratio > 0.5 && result.area_ratio < 0.65, "ratio {}", result.area_ratio);

        let expected = [(50.0, 60.0), (350.0, 60.0), (350.0, 440.0), (50.0, 440.0)];
        for (corner, (ex, ey)) in quad.corners().iter().zip(expected) {
            assert!(
                (corner.x - ex).abs() < 8.0 && (corner.y - ey).abs() < 8.0,
                "corner {corner:?} too far from ({ex}, {ey})"
            );
        }
    }

    #[test]
    fn approximation_keeps_square_corners() {
        let outline = rectangle_outline(0.0, 0.0, 40.0, 20.0);
        let approx = approximate_polygon(&outline.points, 0.02 * outline.perimeter());
        assert_eq!(approx.len(), 4);
        assert_eq!(approx[0], Point::new(0.0, 0.0));
        assert!(approx.contains(&Point::new(40.0, 20.0)));
        assert!(approx.contains(&Point::new(40.0, 0.0)));
        assert!(approx.contains(&Point::new(0.0, 20.0)));
    }

    #[test]
    fn approximation_ignores_repeated_closing_point() {
        let mut points = rectangle_outline(0.0, 0.0, 40.0, 20.0).points;
        points.push(points[0]);
        let approx = approximate_polygon(&points, 1.0);
        assert_eq!(approx.len(), 4);
        assert_eq!(approx[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn degenerate_input_is_returned_unchanged() {
        let line = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        assert_eq!(approximate_polygon(&line, 1.0), line.to_vec());

        let outline = rectangle_outline(0.0, 0.0, 4.0, 4.0);
        assert_eq!(approximate_polygon(&outline.points, 0.0), outline.points);
    }
}
