// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session: the state machine behind one cover scan.
//
//   Idle -> Capturing -> Captured -> Editing -> Rectifying -> Complete
//
// `cancel` leaves any state through `Cancelled` back to `Idle`; a failed
// rectification returns to `Editing` with the corners intact.

use std::time::Instant;

use coverscan_core::error::{Result, ScanError};
use coverscan_core::{DetectionResult, Frame, Point, Quad, ScanConfig, ScanState, SessionId};
use coverscan_document::image::frame_digest;
use coverscan_document::{ContourDetector, CornerEditor, PerspectiveRectifier, QualityScorer, order_corners};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::readiness::ReadinessTracker;
use crate::sink::CoverSink;
use crate::source::FrameSource;

/// What one live frame produced, for drawing the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub detection: DetectionResult,
    /// `false` while the detection backend is not initialised; the caller
    /// should keep showing the raw frame.
    pub detection_available: bool,
    pub ready: bool,
    /// The frame was captured automatically after sustained readiness.
    pub auto_captured: bool,
}

/// Result of a rectification job, to be fed back through
/// [`ScanSession::finish_rectification`].
#[derive(Debug)]
pub struct RectifyOutcome {
    generation: u64,
    result: Result<(Frame, &'static str)>,
}

impl RectifyOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to an in-flight rectification.
#[derive(Debug)]
pub struct RectifyTask {
    generation: u64,
    handle: JoinHandle<RectifyOutcome>,
}

impl RectifyTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the job. A panicked job comes back as `RectificationFailed`.
    pub async fn join(self) -> RectifyOutcome {
        let RectifyTask { generation, handle } = self;
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => RectifyOutcome {
                generation,
                result: Err(ScanError::RectificationFailed(format!(
                    "rectification task did not finish: {err}"
                ))),
            },
        }
    }
}

/// One scan interaction, from live preview to finished cover.
pub struct ScanSession {
    id: SessionId,
    state: ScanState,
    config: ScanConfig,
    detector: ContourDetector,
    scorer: QualityScorer,
    rectifier: PerspectiveRectifier,
    readiness: ReadinessTracker,
    source: Box<dyn FrameSource>,
    sink: Box<dyn CoverSink>,
    current_frame: Option<Frame>,
    last_detection: Option<((u32, u32), DetectionResult)>,
    editor: Option<CornerEditor>,
    output: Option<Frame>,
    last_error: Option<ScanError>,
    /// Bumped whenever in-flight rectification results become unwanted.
    generation: u64,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("source", &self.source.name())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ScanSession {
    /// Build a session with the built-in detector and rectifiers.
    pub fn new(config: ScanConfig, source: Box<dyn FrameSource>, sink: Box<dyn CoverSink>) -> Result<Self> {
        config.validate()?;

        let detector = ContourDetector::from_config(&config);
        let scorer = QualityScorer::from_config(&config);
        let rectifier = PerspectiveRectifier::from_config(&config);
        let readiness = ReadinessTracker::new(config.debounce());

        let id = SessionId::new();
        debug!(session = %id, source = source.name(), "Scan session created");

        Ok(Self {
            id,
            state: ScanState::Idle,
            config,
            detector,
            scorer,
            rectifier,
            readiness,
            source,
            sink,
            current_frame: None,
            last_detection: None,
            editor: None,
            output: None,
            last_error: None,
            generation: 0,
        })
    }

    /// Swap in a different detector (e.g. a platform backend).
    pub fn with_detector(mut self, detector: ContourDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_rectifier(mut self, rectifier: PerspectiveRectifier) -> Self {
        self.rectifier = rectifier;
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    /// The quad being edited, in natural coordinates.
    pub fn quad(&self) -> Option<&Quad> {
        self.editor.as_ref().map(CornerEditor::quad)
    }

    pub fn editor(&self) -> Option<&CornerEditor> {
        self.editor.as_ref()
    }

    pub fn output(&self) -> Option<&Frame> {
        self.output.as_ref()
    }

    pub fn take_output(&mut self) -> Option<Frame> {
        self.output.take()
    }

    pub fn last_error(&self) -> Option<&ScanError> {
        self.last_error.as_ref()
    }

    pub fn last_detection(&self) -> Option<&DetectionResult> {
        self.last_detection.as_ref().map(|(_, d)| d)
    }

    /// The quad from the most recent detection, or `NoContourFound`.
    pub fn detected_quad(&self) -> Result<Quad> {
        self.last_detection
            .and_then(|(_, d)| d.quad)
            .ok_or(ScanError::NoContourFound)
    }

    // -- Capturing ------------------------------------------------------------

    /// `Idle -> Capturing`. Starts the frame source.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(&[ScanState::Idle, ScanState::Cancelled], "start")?;
        self.source.start()?;
        self.readiness.reset();
        self.last_error = None;
        self.transition(ScanState::Capturing);
        Ok(())
    }

    /// Run detection and scoring on one live frame.
    ///
    /// Frames arriving outside `Capturing` are dropped and `Ok(None)` is
    /// returned. When readiness has held for the debounce window the frame is
    /// captured on the spot.
    pub fn process_frame(&mut self, frame: Frame, now: Instant) -> Result<Option<FrameReport>> {
        if self.state != ScanState::Capturing {
            debug!(session = %self.id, state = %self.state, "Frame dropped outside capture");
            return Ok(None);
        }

        let dims = frame.dimensions();
        let frame = self.current_frame.insert(frame);
        let (detection, detection_available) = match self.detector.detect(frame) {
            Ok(detection) => (detection, true),
            Err(ScanError::DetectionUnavailable) => (DetectionResult::empty(), false),
            Err(err) => {
                warn!(session = %self.id, error = %err, "Detection error absorbed");
                (DetectionResult::empty(), true)
            }
        };

        let ready = self.scorer.is_ready(&detection);
        self.last_detection = Some((dims, detection));

        let auto_captured = self.config.auto_capture_enabled && self.readiness.observe(ready, now);
        if let Some(streak) = self.readiness.streak(now) {
            trace!(session = %self.id, streak_ms = streak.as_millis() as u64, "Readiness streak");
        }
        if auto_captured {
            info!(session = %self.id, area_ratio = detection.area_ratio, "Readiness held; capturing automatically");
            self.snapshot()?;
        }

        Ok(Some(FrameReport {
            detection,
            detection_available,
            ready,
            auto_captured,
        }))
    }

    /// Pull the newest frame from the source and process it.
    pub fn poll_source(&mut self, now: Instant) -> Result<Option<FrameReport>> {
        if self.state != ScanState::Capturing {
            return Ok(None);
        }
        match self.source.next_frame() {
            Some(frame) => self.process_frame(frame, now),
            None => Ok(None),
        }
    }

    /// Capture `frame` manually. `Capturing -> Captured -> Editing`.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn capture_frame(&mut self, frame: Frame) -> Result<()> {
        self.expect_state(&[ScanState::Capturing], "capture")?;
        self.current_frame = Some(frame);
        self.snapshot()
    }

    /// Capture the most recent live frame.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn capture_current(&mut self) -> Result<()> {
        self.expect_state(&[ScanState::Capturing], "capture")?;
        self.snapshot()
    }

    /// Freeze `current_frame`, seed the editor with the default quad, then
    /// refine it from detection when a usable outline is available.
    fn snapshot(&mut self) -> Result<()> {
        let Some(frame) = self.current_frame.as_ref() else {
            return Err(ScanError::InvalidFrame("no frame has arrived yet".into()));
        };
        let (width, height) = frame.dimensions();

        let refined = match self.last_detection {
            Some((dims, detection)) if dims == (width, height) && detection.quad.is_some() => detection.quad,
            _ => self.detector.detect(frame).ok().and_then(|d| d.quad),
        };

        self.source.stop();
        self.readiness.reset();

        let default_quad = Quad::inset(width, height, self.config.default_quad_margin);
        let mut editor =
            CornerEditor::new(default_quad, width, height).with_hit_radius(self.config.corner_hit_radius_px);
        self.transition(ScanState::Captured);

        match refined {
            Some(quad) => {
                editor.replace_quad(quad);
                let coverage = quad.area() / (f64::from(width) * f64::from(height));
                debug!(session = %self.id, ?quad, coverage, "Initial quad taken from detection");
            }
            None => debug!(session = %self.id, "No outline detected; keeping default quad"),
        }
        self.editor = Some(editor);
        self.transition(ScanState::Editing);
        Ok(())
    }

    // -- Editing --------------------------------------------------------------

    pub fn set_display_size(&mut self, width: f64, height: f64) -> Result<()> {
        self.editor_mut("resize the editor")?.set_display_size(width, height);
        Ok(())
    }

    pub fn select_corner(&mut self, display_point: Point) -> Result<Option<usize>> {
        Ok(self.editor_mut("select a corner")?.select_corner(display_point))
    }

    /// Drag a corner; the stored point is clamped into the image.
    pub fn drag_corner(&mut self, index: usize, display_point: Point) -> Result<Option<Point>> {
        Ok(self.editor_mut("drag a corner")?.drag_to(index, display_point))
    }

    pub fn release_corner(&mut self) -> Result<()> {
        self.editor_mut("release a corner")?.release();
        Ok(())
    }

    /// Move one corner in a single step (drag then release).
    pub fn adjust_corner(&mut self, index: usize, display_point: Point) -> Result<Option<Point>> {
        let editor = self.editor_mut("adjust a corner")?;
        let moved = editor.drag_to(index, display_point);
        editor.release();
        Ok(moved)
    }

    /// Replace all four corners with natural-coordinate points in any order.
    pub fn set_corners(&mut self, points: [Point; 4]) -> Result<()> {
        self.editor_mut("set corners")?.replace_quad(order_corners(points));
        Ok(())
    }

    fn editor_mut(&mut self, action: &'static str) -> Result<&mut CornerEditor> {
        let state = self.state;
        match (state, self.editor.as_mut()) {
            (ScanState::Editing, Some(editor)) => Ok(editor),
            _ => Err(ScanError::InvalidTransition { state, action }),
        }
    }

    // -- Rectification --------------------------------------------------------

    /// `Editing -> Rectifying`. Runs the warp on the blocking pool; await the
    /// task and pass its outcome to [`finish_rectification`](Self::finish_rectification).
    ///
    /// Needs a Tokio runtime; use [`confirm_blocking`](Self::confirm_blocking)
    /// otherwise.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn confirm(&mut self) -> Result<RectifyTask> {
        self.expect_state(&[ScanState::Editing], "confirm")?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ScanError::RectificationFailed("confirm() needs a Tokio runtime; use confirm_blocking()".into())
        })?;

        // The job works on its own copy; the session keeps the capture so a
        // failed or panicked job leaves it editable.
        let frame = self.captured_frame()?.clone();
        let (quad, generation) = self.begin_rectification()?;
        let rectifier = self.rectifier.clone();
        let handle = runtime.spawn_blocking(move || RectifyOutcome {
            generation,
            result: rectifier.rectify_named(&frame, &quad),
        });

        Ok(RectifyTask { generation, handle })
    }

    /// Apply a finished rectification.
    ///
    /// Returns `Ok(true)` when applied (`Complete`), `Ok(false)` when the
    /// outcome was stale and discarded, and the rectification error after
    /// returning to `Editing`.
    #[instrument(skip_all, fields(session = %self.id, generation = outcome.generation))]
    pub fn finish_rectification(&mut self, outcome: RectifyOutcome) -> Result<bool> {
        if self.state != ScanState::Rectifying || outcome.generation != self.generation {
            warn!(state = %self.state, current = self.generation, "Discarding stale rectification result");
            return Ok(false);
        }

        match outcome.result {
            Ok((cover, strategy)) => {
                info!(
                    width = cover.width(),
                    height = cover.height(),
                    strategy,
                    digest = %frame_digest(&cover),
                    "Cover rectified"
                );
                self.sink.cover_ready(&cover);
                self.output = Some(cover);
                self.transition(ScanState::Complete);
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "Rectification failed; returning to editing");
                self.last_error = Some(replicate(&err));
                self.transition(ScanState::Editing);
                Err(err)
            }
        }
    }

    /// [`confirm`](Self::confirm) and wait for the result.
    pub async fn confirm_and_wait(&mut self) -> Result<()> {
        let task = self.confirm()?;
        let outcome = task.join().await;
        self.finish_rectification(outcome).map(|_| ())
    }

    /// Rectify on the calling thread.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn confirm_blocking(&mut self) -> Result<()> {
        self.expect_state(&[ScanState::Editing], "confirm")?;
        let (quad, generation) = self.begin_rectification()?;
        let result = self.rectifier.rectify_named(self.captured_frame()?, &quad);
        self.finish_rectification(RectifyOutcome { generation, result })
            .map(|_| ())
    }

    fn begin_rectification(&mut self) -> Result<(Quad, u64)> {
        self.captured_frame()?;
        let quad = match self.editor.as_mut() {
            Some(editor) => {
                editor.release();
                *editor.quad()
            }
            None => {
                return Err(ScanError::InvalidTransition {
                    state: self.state,
                    action: "confirm",
                });
            }
        };

        self.generation += 1;
        self.last_error = None;
        self.transition(ScanState::Rectifying);
        Ok((quad, self.generation))
    }

    fn captured_frame(&self) -> Result<&Frame> {
        self.current_frame
            .as_ref()
            .ok_or_else(|| ScanError::InvalidFrame("no captured frame to rectify".into()))
    }

    // -- Reset ----------------------------------------------------------------

    /// Discard the capture and go back to `Capturing`.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn retry(&mut self) -> Result<()> {
        self.expect_state(
            &[ScanState::Captured, ScanState::Editing, ScanState::Complete],
            "retry",
        )?;
        self.discard();
        if let Err(err) = self.source.start() {
            self.transition(ScanState::Idle);
            return Err(err);
        }
        self.transition(ScanState::Capturing);
        Ok(())
    }

    /// Abandon the scan from any state and return to `Idle`. In-flight
    /// rectifications are discarded when they finish.
    #[instrument(skip_all, fields(session = %self.id))]
    pub fn cancel(&mut self) {
        if self.state == ScanState::Idle {
            debug!("Cancel ignored; session already idle");
            return;
        }
        self.source.stop();
        self.discard();
        if self.state != ScanState::Complete {
            self.transition(ScanState::Cancelled);
            self.sink.session_cancelled();
        }
        self.transition(ScanState::Idle);
    }

    fn discard(&mut self) {
        self.generation += 1;
        self.current_frame = None;
        self.last_detection = None;
        self.editor = None;
        self.output = None;
        self.last_error = None;
        self.readiness.reset();
    }

    // -- Helpers --------------------------------------------------------------

    fn expect_state(&self, allowed: &[ScanState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ScanError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, next: ScanState) {
        info!(session = %self.id, from = %self.state, to = %next, "Scan state changed");
        self.state = next;
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.source.stop();
    }
}

/// Rectification only yields string-carrying errors; keep a copy for
/// `last_error` while the original goes back to the caller.
fn replicate(err: &ScanError) -> ScanError {
    match err {
        ScanError::InvalidQuad(msg) => ScanError::InvalidQuad(msg.clone()),
        ScanError::RectificationFailed(msg) => ScanError::RectificationFailed(msg.clone()),
        other => ScanError::RectificationFailed(other.to_string()),
    }
}
