// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame fingerprinting: SHA-256 over dimensions and pixels.

use coverscan_core::Frame;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 of a frame and return it as a lowercase hex string.
///
/// Dimensions are hashed ahead of the pixels so that two frames with the
/// same bytes but different shapes never collide.
pub fn frame_digest(frame: &Frame) -> String {
    let mut hasher = Sha256::new();
    hasher.update(frame.width().to_le_bytes());
    hasher.update(frame.height().to_le_bytes());
    hasher.update(frame.as_bytes());
    hex::encode(hasher.finalize())
}
