// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auto-capture readiness scoring.

use coverscan_core::{DetectionResult, RatioRange, ScanConfig};

/// Decides whether a single detection is good enough to count towards
/// auto-capture.
///
/// The readiness band is narrower than the detector's
/// acceptance band: an outline can be detected (and drawn) without being
/// steady or large enough to snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScorer {
    ready_ratio: RatioRange,
    min_corner_count: u32,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl QualityScorer {
    pub fn new(ready_ratio: RatioRange, min_corner_count: u32) -> Self {
        Self {
            ready_ratio,
            min_corner_count,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.auto_capture_ready_ratio, config.min_ready_corner_count)
    }

    /// `true` when a quad exists, its area ratio is inside the readiness band
    /// (inclusive) and the approximated polygon had enough corners.
    pub fn is_ready(&self, result: &DetectionResult) -> bool {
        result.quad.is_some()
            && self.ready_ratio.contains(result.area_ratio)
            && result.corner_count >= self.min_corner_count
    }
}
