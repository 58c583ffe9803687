// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: contour detection, readiness scoring, corner ordering
// and editing, and perspective rectification.

pub mod backend;
pub mod corners;
pub mod detect;
pub mod editor;
pub mod quality;
pub mod rectify;

pub use backend::{Contour, DetectionBackend, EdgeContourBackend};
pub use corners::order_corners;
pub use detect::ContourDetector;
pub use editor::{CornerEditor, Selection};
pub use quality::QualityScorer;
pub use rectify::{BilinearRectifier, PerspectiveRectifier, ProjectiveRectifier, Rectifier};
