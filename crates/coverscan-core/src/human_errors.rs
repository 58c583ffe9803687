// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanning screen.
//
// Detection problems are silent in the UI (the live overlay simply shows no
// outline), so only the errors a user can act on get wording that asks them
// to do something.

use crate::error::ScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Will likely resolve on its own; keep going.
    Transient,
    /// User must do something (move a corner, retake the photo).
    ActionRequired,
    /// Cannot be fixed by retrying or adjusting.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action may succeed.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanError` into wording suitable for the scan screen.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::DetectionUnavailable => HumanError {
            message: "Edge detection is still starting up.".into(),
            suggestion: "Hold on a moment. You can also take the photo now and place the corners yourself.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::NoContourFound => HumanError {
            message: "We couldn't find the edges of the cover.".into(),
            suggestion: "Place the book on a plain, contrasting surface, or drag the corners into place yourself.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidQuad(_) => HumanError {
            message: "The corners don't outline a usable shape.".into(),
            suggestion: "Drag the four corners onto the corners of the cover so they don't overlap, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::RectificationFailed(_) => HumanError {
            message: "We couldn't straighten the photo.".into(),
            suggestion: "Adjust the corners slightly and try again, or retake the photo.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::InvalidFrame(_) | ScanError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try taking the photo again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::InvalidTransition { .. } => HumanError {
            message: "That step isn't available right now.".into(),
            suggestion: "Finish or cancel the current scan, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::SourceUnavailable(_) => HumanError {
            message: "The camera isn't available.".into(),
            suggestion: "Check that the app is allowed to use the camera, or choose a photo from your library instead.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::Config(detail) => HumanError {
            message: "The scanner settings are invalid.".into(),
            suggestion: format!("Reset the scanner settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanError::Serialization(_) => HumanError {
            message: "The scanner settings file is damaged.".into(),
            suggestion: "Delete the settings file to restore the defaults.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanState;

    #[test]
    fn invalid_quad_asks_user_to_adjust() {
        let human = humanize_error(&ScanError::InvalidQuad("width rounds to 0".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn rectification_failure_is_retriable() {
        let human = humanize_error(&ScanError::RectificationFailed("singular".into()));
        assert!(human.retriable);
    }

    #[test]
    fn detection_unavailable_is_transient() {
        let human = humanize_error(&ScanError::DetectionUnavailable);
        assert_eq!(human.severity, Severity::Transient);
    }

    #[test]
    fn illegal_transition_is_not_retriable() {
        let err = ScanError::InvalidTransition {
            state: ScanState::Idle,
            action: "confirm",
        };
        assert!(!humanize_error(&err).retriable);
        assert_eq!(err.to_string(), "cannot confirm while idle");
    }
}
