// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Inclusive range of area ratios (contour area / frame area).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    pub min: f64,
    pub max: f64,
}

impl RatioRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(ScanError::Config(format!("{name}: bounds must be finite")));
        }
        if self.min < 0.0 || self.max > 1.0 || self.min > self.max {
            return Err(ScanError::Config(format!(
                "{name}: expected 0 <= min <= max <= 1, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Tuning for the edge-based contour backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionTuning {
    /// Gaussian blur sigma applied before edge detection.
    pub blur_sigma: f32,
    /// Canny low hysteresis threshold.
    pub canny_low: f32,
    /// Canny high hysteresis threshold.
    pub canny_high: f32,
    /// Frames whose longer side exceeds this are downscaled before detection.
    /// `0` disables downscaling.
    pub working_max_dimension: u32,
}

impl Default for DetectionTuning {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            canny_low: 50.0,
            canny_high: 150.0,
            working_max_dimension: 640,
        }
    }
}

/// Scanner settings shared by detection, auto-capture, editing, and
/// rectification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Area-ratio band a detection must sit in to count towards auto-capture.
    pub auto_capture_ready_ratio: RatioRange,
    /// Area-ratio band outside of which the largest contour is ignored.
    pub contour_accept_ratio: RatioRange,
    /// How long readiness must hold before auto-capture fires.
    pub auto_capture_debounce_ms: u64,
    /// When false, frames are still scored but capture is manual only.
    pub auto_capture_enabled: bool,
    /// Minimum approximated-polygon vertex count for readiness.
    pub min_ready_corner_count: u32,
    /// Corner hit radius, in natural-resolution pixels.
    pub corner_hit_radius_px: f64,
    /// Polygon approximation epsilon as a fraction of contour perimeter.
    pub polygon_approx_epsilon_factor: f64,
    /// Inset of the default quad as a fraction of each image dimension.
    pub default_quad_margin: f64,
    /// Use the projective (homography) rectifier when it is available.
    pub prefer_projective: bool,
    /// Backend tuning.
    pub detection: DetectionTuning,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            auto_capture_ready_ratio: RatioRange::new(0.3, 0.95),
            contour_accept_ratio: RatioRange::new(0.2, 0.98),
            auto_capture_debounce_ms: 1000,
            auto_capture_enabled: true,
            min_ready_corner_count: 4,
            corner_hit_radius_px: 30.0,
            polygon_approx_epsilon_factor: 0.02,
            default_quad_margin: 0.01,
            prefer_projective: true,
            detection: DetectionTuning::default(),
        }
    }
}

impl ScanConfig {
    /// The auto-capture debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.auto_capture_debounce_ms)
    }

    /// Check that every value is within its documented range.
    pub fn validate(&self) -> Result<()> {
        self.auto_capture_ready_ratio
            .validate("auto_capture_ready_ratio")?;
        self.contour_accept_ratio.validate("contour_accept_ratio")?;

        if !(0.02..=0.03).contains(&self.polygon_approx_epsilon_factor) {
            return Err(ScanError::Config(format!(
                "polygon_approx_epsilon_factor must be within [0.02, 0.03], got {}",
                self.polygon_approx_epsilon_factor
            )));
        }
        if !self.corner_hit_radius_px.is_finite() || self.corner_hit_radius_px < 0.0 {
            return Err(ScanError::Config(format!(
                "corner_hit_radius_px must be a non-negative number, got {}",
                self.corner_hit_radius_px
            )));
        }
        if !(0.0..0.5).contains(&self.default_quad_margin) {
            return Err(ScanError::Config(format!(
                "default_quad_margin must be within [0, 0.5), got {}",
                self.default_quad_margin
            )));
        }
        if self.detection.canny_low > self.detection.canny_high {
            return Err(ScanError::Config(format!(
                "canny_low ({}) exceeds canny_high ({})",
                self.detection.canny_low, self.detection.canny_high
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: ScanConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
