// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Coverscan pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanError};

/// Unique identifier for a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in the natural (full-resolution) coordinate space of an image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation: `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Four corners of a document outline, in canonical order.
///
/// Index 0 is top-left, 1 top-right, 2 bottom-right, 3 bottom-left. Use the
/// corner orderer in `coverscan-document` to build one from unordered points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad([Point; 4]);

impl Quad {
    pub const TOP_LEFT: usize = 0;
    pub const TOP_RIGHT: usize = 1;
    pub const BOTTOM_RIGHT: usize = 2;
    pub const BOTTOM_LEFT: usize = 3;

    /// Wrap four corners that are already in `[tl, tr, br, bl]` order.
    pub const fn from_ordered(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// Axis-aligned quad covering `width x height`, inset by `margin` (a
    /// fraction of each dimension) on every side.
    ///
    /// A margin of `0.01` covers ~98% of the image in each direction, which
    /// is the starting guess after a capture.
    pub fn inset(width: u32, height: u32, margin: f64) -> Self {
        let w = f64::from(width);
        let h = f64::from(height);
        let mx = w * margin;
        let my = h * margin;
        Self([
            Point::new(mx, my),
            Point::new(w - mx, my),
            Point::new(w - mx, h - my),
            Point::new(mx, h - my),
        ])
    }

    /// Axis-aligned quad spanning an inclusive bounding box.
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self([
            Point::new(min_x, min_y),
            Point::new(max_x, min_y),
            Point::new(max_x, max_y),
            Point::new(min_x, max_y),
        ])
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn corner(&self, index: usize) -> Option<Point> {
        self.0.get(index).copied()
    }

    /// Replace one corner. Returns `false` when `index` is out of range.
    pub fn set_corner(&mut self, index: usize, point: Point) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    pub fn top_left(&self) -> Point {
        self.0[Self::TOP_LEFT]
    }

    pub fn top_right(&self) -> Point {
        self.0[Self::TOP_RIGHT]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[Self::BOTTOM_RIGHT]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[Self::BOTTOM_LEFT]
    }

    /// True when every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Point::is_finite)
    }

    /// Scale every corner by independent x/y factors.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self(self.0.map(|p| Point::new(p.x * sx, p.y * sy)))
    }

    /// Area via the shoelace formula (corners taken in stored order).
    pub fn area(&self) -> f64 {
        let mut twice = 0.0;
        for i in 0..4 {
            let a = self.0[i];
            let b = self.0[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// An owned RGBA8 pixel buffer, row-major, `width * height * 4` bytes.
///
/// Frames move between components (source -> session -> rectifier) rather
/// than being shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 4;

    /// Wrap a raw RGBA8 buffer, validating its length against the dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidFrame(format!(
                "zero-sized frame {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * Self::CHANNELS;
        if pixels.len() != expected {
            return Err(ScanError::InvalidFrame(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A fully transparent black frame.
    pub fn blank(width: u32, height: u32) -> Result<Self> {
        let len = width as usize * height as usize * Self::CHANNELS;
        Self::new(width, height, vec![0u8; len])
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * Self::CHANNELS);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel area as a float, used for area ratios.
    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y as usize * self.width as usize + x as usize) * Self::CHANNELS)
        } else {
            None
        }
    }

    /// Read one pixel, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        let p = &self.pixels[i..i + Self::CHANNELS];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Write one pixel. Writes outside the frame are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, value: [u8; 4]) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + Self::CHANNELS].copy_from_slice(&value);
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Outcome of running contour detection over one frame.
///
/// Produced fresh per frame; a missing `quad` is the normal "nothing usable
/// in view" answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Best quadrilateral candidate, in canonical corner order.
    pub quad: Option<Quad>,
    /// Area of the largest contour divided by the frame area.
    pub area_ratio: f64,
    /// Vertex count of the approximated polygon.
    pub corner_count: u32,
}

impl DetectionResult {
    /// The "no contour at all" result.
    pub const fn empty() -> Self {
        Self {
            quad: None,
            area_ratio: 0.0,
            corner_count: 0,
        }
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle states of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanState {
    /// No scan in progress.
    Idle,
    /// Live frames are being analysed, waiting for a capture.
    Capturing,
    /// A frame has been snapshotted; the initial quad is being chosen.
    Captured,
    /// The user is adjusting corners.
    Editing,
    /// The perspective warp is running.
    Rectifying,
    /// A rectified cover has been produced and handed off.
    Complete,
    /// The user abandoned the scan.
    Cancelled,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Captured => "captured",
            Self::Editing => "editing",
            Self::Rectifying => "rectifying",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_buffer_length() {
        let err = Frame::new(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFrame(_)));
        assert!(Frame::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn frame_pixel_access_round_trips() {
        let mut frame = Frame::blank(3, 2).expect("blank");
        frame.put_pixel(2, 1, [1, 2, 3, 4]);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3, 4]));
        assert_eq!(frame.pixel(3, 1), None);
        // Out-of-range writes are silently dropped.
        frame.put_pixel(9, 9, [9, 9, 9, 9]);
        assert_eq!(frame.as_bytes().iter().filter(|&&b| b == 9).count(), 0);
    }

    #[test]
    fn inset_quad_leaves_one_percent_margin() {
        let quad = Quad::inset(800, 600, 0.01);
        assert_eq!(quad.top_left(), Point::new(8.0, 6.0));
        assert_eq!(quad.bottom_right(), Point::new(792.0, 594.0));
        let coverage = quad.area() / (800.0 * 600.0);
        assert!((coverage - 0.98 * 0.98).abs() < 1e-9);
    }

    #[test]
    fn quad_rejects_out_of_range_corner() {
        let mut quad = Quad::inset(10, 10, 0.0);
        assert!(!quad.set_corner(4, Point::new(1.0, 1.0)));
        assert!(quad.set_corner(2, Point::new(5.0, 5.0)));
        assert_eq!(quad.bottom_right(), Point::new(5.0, 5.0));
    }

    #[test]
    fn non_finite_corner_is_detected() {
        let quad = Quad::from_ordered([
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]);
        assert!(!quad.is_finite());
    }

    #[test]
    fn point_lerp_and_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(1.5, 2.0));
    }
}
