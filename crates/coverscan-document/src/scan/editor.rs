// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner editor: manual adjustment of a captured quad.
//
// Pointer events arrive in display coordinates (the size the image is drawn
// at on screen); the quad is always stored in natural coordinates.

use coverscan_core::{Point, Quad};
use tracing::trace;

/// Default hit radius in natural pixels, before display scaling.
pub const DEFAULT_HIT_RADIUS: f64 = 30.0;

/// Pointer interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Selected(usize),
    Dragging(usize),
}

/// Interactive corner adjustment over a quad.
#[derive(Debug, Clone, PartialEq)]
pub struct CornerEditor {
    quad: Quad,
    natural: (u32, u32),
    display: (f64, f64),
    hit_radius: f64,
    selection: Selection,
}

impl CornerEditor {
    /// Edit `quad` over an image of `natural_width x natural_height`. The
    /// display size starts equal to the natural size.
    pub fn new(quad: Quad, natural_width: u32, natural_height: u32) -> Self {
        Self {
            quad,
            natural: (natural_width, natural_height),
            display: (f64::from(natural_width), f64::from(natural_height)),
            hit_radius: DEFAULT_HIT_RADIUS,
            selection: Selection::Idle,
        }
    }

    pub fn with_hit_radius(mut self, radius: f64) -> Self {
        self.hit_radius = radius;
        self
    }

    /// Update the on-screen size the image is rendered at.
    pub fn set_display_size(&mut self, width: f64, height: f64) {
        self.display = (width, height);
    }

    pub fn quad(&self) -> &Quad {
        &self.quad
    }

    pub fn into_quad(self) -> Quad {
        self.quad
    }

    /// Replace the whole quad (e.g. after detection refines the initial
    /// guess). Corners are clamped into the image.
    pub fn replace_quad(&mut self, quad: Quad) {
        for (i, p) in quad.corners().iter().enumerate() {
            self.quad.set_corner(i, self.clamp(*p));
        }
        self.selection = Selection::Idle;
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn natural_size(&self) -> (u32, u32) {
        self.natural
    }

    /// Natural-per-display scale on each axis. A zero or non-finite display
    /// dimension scales by 1.
    pub fn scale(&self) -> (f64, f64) {
        let axis = |natural: u32, display: f64| {
            if display > 0.0 && display.is_finite() {
                f64::from(natural) / display
            } else {
                1.0
            }
        };
        (
            axis(self.natural.0, self.display.0),
            axis(self.natural.1, self.display.1),
        )
    }

    pub fn to_natural(&self, display_point: Point) -> Point {
        let (sx, sy) = self.scale();
        Point::new(display_point.x * sx, display_point.y * sy)
    }

    /// The quad in display coordinates, for drawing the overlay.
    pub fn display_quad(&self) -> Quad {
        let (sx, sy) = self.scale();
        self.quad.scaled(1.0 / sx, 1.0 / sy)
    }

    /// Pick the corner nearest to `display_point` within the hit radius.
    pub fn select_corner(&mut self, display_point: Point) -> Option<usize> {
        let natural = self.to_natural(display_point);
        let radius = self.hit_radius * self.scale().0;

        let hit = self
            .quad
            .corners()
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.distance(&natural)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        self.selection = hit.map_or(Selection::Idle, Selection::Selected);
        trace!(?hit, x = natural.x, y = natural.y, "Corner hit test");
        hit
    }

    /// Move corner `index` to `display_point`, clamped to the image. Returns
    /// the stored natural-coordinate point, or `None` for a bad index.
    pub fn drag_to(&mut self, index: usize, display_point: Point) -> Option<Point> {
        if index >= 4 {
            return None;
        }
        let clamped = self.clamp(self.to_natural(display_point));
        self.quad.set_corner(index, clamped);
        self.selection = Selection::Dragging(index);
        Some(clamped)
    }

    /// End the interaction. The last dragged position is kept.
    pub fn release(&mut self) {
        self.selection = Selection::Idle;
    }

    fn clamp(&self, p: Point) -> Point {
        let (w, h) = (f64::from(self.natural.0), f64::from(self.natural.1));
        // NaN falls to the lower bound.
        let x = if p.x.is_nan() { 0.0 } else { p.x.clamp(0.0, w) };
        let y = if p.y.is_nan() { 0.0 } else { p.y.clamp(0.0, h) };
        Point::new(x, y)
    }
}
