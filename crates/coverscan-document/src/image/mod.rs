// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: frame conversion, still-photo intake, and fingerprinting.

pub mod convert;
pub mod digest;

pub use convert::{frame_from_bytes, frame_from_dynamic, frame_to_rgba, open_frame, save_frame};
pub use digest::frame_digest;
