// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// coverscan-session: The scan state machine and its platform seams.
//
// `ScanSession` pulls frames from a `FrameSource`, runs detection and the
// auto-capture debounce, hosts the corner editor, and hands the rectified
// cover to a `CoverSink`. Platform code (camera preview, upload) plugs in
// through those two traits.

pub mod readiness;
pub mod session;
pub mod sink;
pub mod source;

pub use readiness::ReadinessTracker;
pub use session::{FrameReport, RectifyOutcome, RectifyTask, ScanSession};
pub use sink::{CoverSink, FnSink, NullSink};
pub use source::{ChannelFrameSource, FrameSender, FrameSource, StillFrameSource, UnavailableFrameSource};
