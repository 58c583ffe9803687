// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Coverscan.

use thiserror::Error;

use crate::types::ScanState;

/// Top-level error type for all Coverscan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Detection --
    #[error("contour detection backend is not initialised")]
    DetectionUnavailable,

    #[error("no usable document outline found")]
    NoContourFound,

    // -- Rectification --
    #[error("invalid quadrilateral: {0}")]
    InvalidQuad(String),

    #[error("rectification failed: {0}")]
    RectificationFailed(String),

    // -- Frames / images --
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Session --
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: ScanState,
        action: &'static str,
    },

    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
