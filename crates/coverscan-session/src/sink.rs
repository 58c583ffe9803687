// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cover sinks: where a finished cover goes (upload, disk, preview).

use std::sync::Mutex;

use coverscan_core::Frame;
use tracing::warn;

/// Receives the rectified cover when a session completes.
pub trait CoverSink: Send + Sync {
    /// Called once per successful rectification.
    fn cover_ready(&self, cover: &Frame);

    /// Called when a session is cancelled before completing.
    fn session_cancelled(&self) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CoverSink for NullSink {
    fn cover_ready(&self, _cover: &Frame) {}
}

/// Adapts a closure into a sink.
pub struct FnSink<F> {
    callback: Mutex<F>,
}

impl<F> FnSink<F>
where
    F: FnMut(&Frame) + Send,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback: Mutex::new(callback),
        }
    }
}

impl<F> CoverSink for FnSink<F>
where
    F: FnMut(&Frame) + Send,
{
    fn cover_ready(&self, cover: &Frame) {
        let delivered = self
            .callback
            .lock()
            .map(|mut guard| {
                let callback = &mut *guard;
                callback(cover)
            })
            .is_ok();
        if !delivered {
            warn!("Cover callback lock poisoned; cover not delivered");
        }
    }
}

impl<F> std::fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}
