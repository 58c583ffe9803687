// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame sources: where live frames come from.
//
// A camera preview, a still photo picked from storage, or nothing at all on
// platforms without a camera. The session only pulls; it never blocks
// waiting for a frame.

use coverscan_core::Frame;
use coverscan_core::error::{Result, ScanError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, trace, warn};

/// Producer of frames for a scan session.
pub trait FrameSource: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Begin delivering frames.
    fn start(&mut self) -> Result<()>;

    /// Stop delivering frames. Calling this on a stopped source is a no-op.
    fn stop(&mut self);

    /// The newest frame since the previous call, or `None` if nothing new
    /// has arrived. Older undelivered frames are dropped.
    fn next_frame(&mut self) -> Option<Frame>;
}

// ---------------------------------------------------------------------------
// Still photo
// ---------------------------------------------------------------------------

/// Delivers one photo after every `start`, then stalls.
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    photo: Frame,
    pending: bool,
}

impl StillFrameSource {
    pub fn new(photo: Frame) -> Self {
        Self {
            photo,
            pending: false,
        }
    }
}

impl FrameSource for StillFrameSource {
    fn name(&self) -> &'static str {
        "still"
    }

    fn start(&mut self) -> Result<()> {
        self.pending = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.pending = false;
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if std::mem::take(&mut self.pending) {
            Some(self.photo.clone())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Channel (camera preview)
// ---------------------------------------------------------------------------

/// Sending half handed to the camera callback.
pub type FrameSender = mpsc::Sender<Frame>;

/// Receives frames pushed by a camera callback over a bounded channel.
///
/// `next_frame` drains the channel and keeps only the newest frame, so a
/// slow consumer never works through a backlog. While stopped, incoming
/// frames are discarded.
#[derive(Debug)]
pub struct ChannelFrameSource {
    rx: mpsc::Receiver<Frame>,
    running: bool,
    disconnected: bool,
}

impl ChannelFrameSource {
    /// Create a source and the sender for the camera side. `capacity` is
    /// clamped to at least 1.
    pub fn channel(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx,
                running: false,
                disconnected: false,
            },
        )
    }

    /// Drain everything queued, returning the newest frame and how many
    /// older ones were skipped.
    fn drain(&mut self) -> (Option<Frame>, usize) {
        let mut newest = None;
        let mut skipped = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => {
                    if newest.replace(frame).is_some() {
                        skipped += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        warn!("Camera channel closed; no further frames will arrive");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        (newest, skipped)
    }
}

impl FrameSource for ChannelFrameSource {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn start(&mut self) -> Result<()> {
        if self.disconnected {
            return Err(ScanError::SourceUnavailable("camera channel is closed".into()));
        }
        // Frames queued before the start belong to an earlier attempt.
        let (_, stale) = self.drain();
        if stale > 0 {
            debug!(stale, "Discarded frames queued while stopped");
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let (newest, skipped) = self.drain();
        if !self.running {
            return None;
        }
        if skipped > 0 {
            trace!(skipped, "Superseded frames dropped");
        }
        newest
    }
}

// ---------------------------------------------------------------------------
// Unavailable
// ---------------------------------------------------------------------------

/// Placeholder for platforms with no camera; `start` always fails.
#[derive(Debug, Clone)]
pub struct UnavailableFrameSource {
    reason: String,
}

impl UnavailableFrameSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableFrameSource {
    fn default() -> Self {
        Self::new("no camera on this platform")
    }
}

impl FrameSource for UnavailableFrameSource {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn start(&mut self) -> Result<()> {
        warn!(reason = %self.reason, "Frame source unavailable");
        Err(ScanError::SourceUnavailable(self.reason.clone()))
    }

    fn stop(&mut self) {}

    fn next_frame(&mut self) -> Option<Frame> {
        None
    }
}
