//! Time-based position animations.
//!
//! Each window has at most one live [`AnimationSession`]. Starting a new one
//! cancels the previous session's token, which drops its pending frame from
//! the scheduler, and reports `Err(Cancelled)` to whoever was waiting on it.
//!
//! Frames are sampled from the session's start time, so a late frame simply
//! lands further along the curve instead of slowing the animation down.

use crate::scheduler::{CancelToken, TaskHandle};
use crate::{MotionError, WindowKind};
use glasspane_core_layout::{lerp, Easing, Edge, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Outcome of one animation: exactly one per session.
pub type MotionResult = Result<(), MotionError>;

/// Completion callback for callers that don't want a channel.
pub type MotionCallback = Box<dyn FnOnce(MotionResult) + Send>;

/// Identifies one animation session; unique per animator.
pub type SessionId = u64;

/// Timing and distance constants for header motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSettings {
    /// Pixels moved by one step.
    pub step_size: i32,
    /// Delay between animation frames.
    pub frame_interval: Duration,
    pub step_duration: Duration,
    pub edge_duration: Duration,
    pub hide_duration: Duration,
    pub show_duration: Duration,
    pub display_duration: Duration,
    /// Clearance past the work-area edge when hidden.
    pub hide_margin: i32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            step_size: 80,
            frame_interval: Duration::from_millis(16),
            step_duration: Duration::from_millis(300),
            edge_duration: Duration::from_millis(350),
            hide_duration: Duration::from_millis(300),
            show_duration: Duration::from_millis(400),
            display_duration: Duration::from_millis(300),
            hide_margin: 20,
        }
    }
}

/// What an animation is for. Picks the duration and curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Step,
    Edge,
    Hide,
    Show,
    Display,
}

impl MotionKind {
    pub fn easing(self) -> Easing {
        match self {
            MotionKind::Step | MotionKind::Display => Easing::EaseOutCubic,
            MotionKind::Edge => Easing::EaseOutQuart,
            MotionKind::Hide => Easing::EaseInCubic,
            MotionKind::Show => Easing::EaseOutBack,
        }
    }

    pub fn duration(self, settings: &MotionSettings) -> Duration {
        match self {
            MotionKind::Step => settings.step_duration,
            MotionKind::Edge => settings.edge_duration,
            MotionKind::Hide => settings.hide_duration,
            MotionKind::Show => settings.show_duration,
            MotionKind::Display => settings.display_duration,
        }
    }

    /// Whether companions need repositioning once the header arrives.
    pub fn requests_layout(self) -> bool {
        matches!(self, MotionKind::Step | MotionKind::Edge | MotionKind::Display)
    }
}

/// Check that an interpolated position can be written to a window.
///
/// Rounds to whole pixels; rejects NaN, infinities and anything outside the
/// `i32` range.
pub fn validate_position(x: f64, y: f64) -> Result<Point, MotionError> {
    let in_range = |v: f64| v.is_finite() && v >= i32::MIN as f64 && v <= i32::MAX as f64;
    let (rx, ry) = (x.round(), y.round());
    if !in_range(rx) || !in_range(ry) {
        return Err(MotionError::InvalidGeometry { x, y });
    }
    Ok(Point::new(rx as i32, ry as i32))
}

/// Where a completion goes.
pub(crate) enum Completion {
    /// Nobody is waiting.
    Detached,
    Channel(oneshot::Sender<MotionResult>),
    Callback(MotionCallback),
    /// Continue the visibility cycle with this id.
    Visibility { cycle: u64 },
}

impl Completion {
    /// Hand the result to its consumer.
    ///
    /// Returns the visibility continuation instead of delivering it, since
    /// only the engine knows how to resume a cycle.
    pub(crate) fn deliver(self, result: MotionResult) -> Option<(u64, MotionResult)> {
        match self {
            Completion::Detached => {
                if let Err(e) = result {
                    debug!("Detached animation ended: {}", e);
                }
                None
            }
            Completion::Channel(tx) => {
                // Receiver may have been dropped; that's fine
                let _ = tx.send(result);
                None
            }
            Completion::Callback(callback) => {
                if catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
                    error!("Animation completion callback panicked");
                }
                None
            }
            Completion::Visibility { cycle } => Some((cycle, result)),
        }
    }
}

/// One in-flight animation.
pub(crate) struct AnimationSession {
    pub id: SessionId,
    pub kind: MotionKind,
    pub from: Point,
    pub to: Point,
    pub started_at: Instant,
    pub duration: Duration,
    pub easing: Easing,
    pub token: CancelToken,
    pub completion: Completion,
}

impl AnimationSession {
    /// Position at `now`, and whether the animation has run its course.
    ///
    /// The final frame returns the exact target.
    fn sample(&self, now: Instant) -> (Result<Point, MotionError>, bool) {
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            now.saturating_duration_since(self.started_at).as_secs_f64() / self.duration.as_secs_f64()
        };
        if progress >= 1.0 {
            return (Ok(self.to), true);
        }

        let t = self.easing.apply(progress);
        let x = lerp(self.from.x as f64, self.to.x as f64, t);
        let y = lerp(self.from.y as f64, self.to.y as f64, t);
        (validate_position(x, y), false)
    }
}

/// A session that has ended, waiting for its completion to be delivered.
pub(crate) struct Finished {
    pub window: WindowKind,
    pub kind: MotionKind,
    pub completion: Completion,
    pub result: MotionResult,
}

impl Finished {
    fn cancelled(window: WindowKind, session: AnimationSession) -> Self {
        Self {
            window,
            kind: session.kind,
            completion: session.completion,
            result: Err(MotionError::Cancelled),
        }
    }
}

/// A window parked off-screen by a hide animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parked {
    /// Last on-screen position, restored by show.
    pub visible_at: Point,
    /// Off-screen position the hide animation targeted.
    pub hidden_at: Point,
    /// Edge the window left through.
    pub edge: Edge,
}

/// Caller's end of an animation.
pub struct AnimationHandle {
    task: TaskHandle,
    done: oneshot::Receiver<MotionResult>,
}

impl AnimationHandle {
    pub(crate) fn new(task: TaskHandle, done: oneshot::Receiver<MotionResult>) -> Self {
        Self { task, done }
    }

    /// First frame of the session. Shares the session's cancellation token.
    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    /// Stop the animation where it is. The outcome becomes `Err(Cancelled)`.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// The outcome, if the animation has ended.
    pub fn try_result(&mut self) -> Option<MotionResult> {
        match self.done.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(MotionError::Cancelled)),
        }
    }

    /// Wait for the outcome.
    pub async fn finished(self) -> MotionResult {
        self.done.await.unwrap_or(Err(MotionError::Cancelled))
    }
}

/// Frame produced by [`MovementAnimator::frame`].
pub(crate) struct Frame {
    pub kind: MotionKind,
    pub position: Result<Point, MotionError>,
    pub done: bool,
}

/// Session registry for every animated window.
pub struct MovementAnimator {
    settings: MotionSettings,
    sessions: HashMap<WindowKind, AnimationSession>,
    parked: HashMap<WindowKind, Parked>,
    next_session: SessionId,
}

impl MovementAnimator {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            sessions: HashMap::new(),
            parked: HashMap::new(),
            next_session: 0,
        }
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: MotionSettings) {
        self.settings = settings;
    }

    /// Whether a live session exists for `window`.
    pub fn is_animating(&self, window: WindowKind) -> bool {
        self.sessions
            .get(&window)
            .is_some_and(|s| !s.token.is_cancelled())
    }

    /// Target of the live session, if any.
    pub fn target(&self, window: WindowKind) -> Option<Point> {
        self.sessions
            .get(&window)
            .filter(|s| !s.token.is_cancelled())
            .map(|s| s.to)
    }

    pub fn parked(&self, window: WindowKind) -> Option<Parked> {
        self.parked.get(&window).copied()
    }

    pub(crate) fn park(&mut self, window: WindowKind, parked: Parked) {
        self.parked.insert(window, parked);
    }

    pub(crate) fn unpark(&mut self, window: WindowKind) -> Option<Parked> {
        self.parked.remove(&window)
    }

    /// Register a new session, superseding any existing one for `window`.
    ///
    /// Returns the new session's id and token, plus the superseded session
    /// if there was one.
    pub(crate) fn begin(
        &mut self,
        window: WindowKind,
        kind: MotionKind,
        from: Point,
        to: Point,
        now: Instant,
        completion: Completion,
    ) -> (SessionId, CancelToken, Option<Finished>) {
        let superseded = self.cancel(window);
        if superseded.is_some() {
            debug!("Superseding animation on {}", window);
        }

        let id = self.next_session;
        self.next_session += 1;
        let token = CancelToken::new();
        self.sessions.insert(
            window,
            AnimationSession {
                id,
                kind,
                from,
                to,
                started_at: now,
                duration: kind.duration(&self.settings),
                easing: kind.easing(),
                token: token.clone(),
                completion,
            },
        );
        (id, token, superseded)
    }

    /// Cancel the session on `window`, if any.
    pub(crate) fn cancel(&mut self, window: WindowKind) -> Option<Finished> {
        let session = self.sessions.remove(&window)?;
        session.token.cancel();
        Some(Finished::cancelled(window, session))
    }

    /// Sample the live session `id` on `window`. `None` if it is stale.
    pub(crate) fn frame(&self, window: WindowKind, id: SessionId, now: Instant) -> Option<Frame> {
        let session = self
            .sessions
            .get(&window)
            .filter(|s| s.id == id && !s.token.is_cancelled())?;
        let (position, done) = session.sample(now);
        Some(Frame {
            kind: session.kind,
            position,
            done,
        })
    }

    /// Token of the live session `id`, for scheduling its next frame.
    pub(crate) fn token(&self, window: WindowKind, id: SessionId) -> Option<CancelToken> {
        self.sessions
            .get(&window)
            .filter(|s| s.id == id)
            .map(|s| s.token.clone())
    }

    /// End the session on `window` with `result`.
    pub(crate) fn finish(&mut self, window: WindowKind, result: MotionResult) -> Option<Finished> {
        let session = self.sessions.remove(&window)?;
        if let Err(ref e) = result {
            warn!("Animation on {} aborted: {}", window, e);
        }
        Some(Finished {
            window,
            kind: session.kind,
            completion: session.completion,
            result,
        })
    }

    /// Collect sessions whose token was cancelled from outside.
    pub(crate) fn reap_cancelled(&mut self) -> Vec<Finished> {
        let cancelled: Vec<WindowKind> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.token.is_cancelled())
            .map(|(&w, _)| w)
            .collect();

        cancelled
            .into_iter()
            .filter_map(|window| {
                let session = self.sessions.remove(&window)?;
                debug!("Animation on {} was cancelled", window);
                Some(Finished::cancelled(window, session))
            })
            .collect()
    }
}
