// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// coverscan-document: Image-side processing for Coverscan.
//
// Finds a book cover's outline in camera frames, scores it for auto-capture,
// lets the user adjust the corners, and flattens the result into an upright
// image. Also converts between `Frame` and the `image` crate's buffers.

pub mod image;
pub mod scan;

// Re-export the primary types so callers can use `coverscan_document::ContourDetector` etc.
pub use scan::backend::{Contour, DetectionBackend, EdgeContourBackend};
pub use scan::corners::order_corners;
pub use scan::detect::ContourDetector;
pub use scan::editor::{CornerEditor, Selection};
pub use scan::quality::QualityScorer;
pub use scan::rectify::{
    BilinearRectifier, PerspectiveRectifier, ProjectiveRectifier, Rectifier, target_size,
};
