// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection backends: turn a frame into candidate outlines.
//
// The contour detector only reasons about polylines; everything that touches
// pixels lives behind `DetectionBackend`, so a platform with a native vision
// library can swap in its own implementation.

use coverscan_core::error::Result;
use coverscan_core::{DetectionTuning, Frame, Point};
use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use tracing::{debug, trace};

use crate::image::convert::frame_to_luma;

/// A closed outline in natural image coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Enclosed area via the shoelace formula.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Length of the closed outline.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| self.points[i].distance(&self.points[(i + 1) % n]))
            .sum()
    }

    /// `(min_x, min_y, max_x, max_y)`, or `None` for an empty contour.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }
}

/// Area of a closed polygon using the shoelace formula. Vertices may be
/// clockwise or counter-clockwise.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice += points[i].x * points[j].y;
        twice -= points[j].x * points[i].y;
    }
    twice.abs() / 2.0
}

/// Source of candidate outlines for the contour detector.
pub trait DetectionBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Find closed outlines in `frame`, in the frame's natural coordinates.
    fn find_contours(&self, frame: &Frame) -> Result<Vec<Contour>>;
}

/// Edge-based backend built on `imageproc`.
///
/// ## Pipeline
///
/// 1. Convert to luma
/// 2. Downscale so the longer side fits `working_max_dimension`
/// 3. Gaussian blur for noise reduction
/// 4. Canny edge detection
/// 5. Dilate by one pixel to close hairline gaps in the outline
/// 6. Suzuki-Abe border following
/// 7. Map contour points back to natural coordinates
#[derive(Debug, Clone, Default)]
pub struct EdgeContourBackend {
    tuning: DetectionTuning,
}

impl EdgeContourBackend {
    pub fn new(tuning: DetectionTuning) -> Self {
        Self { tuning }
    }

    /// Downscale `gray` if needed, returning the working image and the
    /// factors that map working coordinates back to natural ones.
    fn working_image(&self, gray: GrayImage) -> (GrayImage, f64, f64) {
        let (w, h) = gray.dimensions();
        let max_dim = self.tuning.working_max_dimension;
        let longest = w.max(h);
        if max_dim == 0 || longest <= max_dim {
            return (gray, 1.0, 1.0);
        }

        let factor = f64::from(max_dim) / f64::from(longest);
        let nw = ((f64::from(w) * factor).round() as u32).max(1);
        let nh = ((f64::from(h) * factor).round() as u32).max(1);
        let small = imageops::resize(&gray, nw, nh, FilterType::Triangle);
        trace!(from_w = w, from_h = h, nw, nh, "Downscaled frame for detection");
        (small, f64::from(w) / f64::from(nw), f64::from(h) / f64::from(nh))
    }
}

impl DetectionBackend for EdgeContourBackend {
    fn name(&self) -> &'static str {
        "imageproc-canny"
    }

    fn find_contours(&self, frame: &Frame) -> Result<Vec<Contour>> {
        // Canny's Sobel stage needs a 3x3 neighbourhood.
        if frame.width() < 3 || frame.height() < 3 {
            return Ok(Vec::new());
        }

        let (work, sx, sy) = self.working_image(frame_to_luma(frame)?);

        let blurred = if self.tuning.blur_sigma > 0.0 {
            gaussian_blur_f32(&work, self.tuning.blur_sigma)
        } else {
            work
        };
        let edges = canny(&blurred, self.tuning.canny_low, self.tuning.canny_high);
        let closed = dilate(&edges, Norm::LInf, 1);

        let raw = find_contours::<i32>(&closed);
        debug!(contours = raw.len(), "Border following complete");

        Ok(raw
            .into_iter()
            .filter(|c| c.points.len() >= 3)
            .map(|c| {
                Contour::new(
                    c.points
                        .into_iter()
                        .map(|p| Point::new(f64::from(p.x) * sx, f64::from(p.y) * sy))
                        .collect(),
                )
            })
            .collect())
    }
}
