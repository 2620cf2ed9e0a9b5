//! The owned engine context.
//!
//! An [`Engine`] owns the host, the scheduler and every piece of layout,
//! motion and visibility state. There are no globals: two engines over two
//! hosts never interact.

use crate::host::{DisplaySource, WindowHost, WindowSignal};
use crate::layout::{LayoutController, LayoutRules, PassOutcome};
use crate::motion::{
    AnimationHandle, Completion, Finished, MotionCallback, MotionKind, MotionResult,
    MotionSettings, MovementAnimator, Parked, SessionId,
};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::visibility::{ToggleDecision, ToggleState, VisibilityCoordinator, VisibilitySettings};
use crate::{EngineError, HostError, MotionError, WindowKind};
use glasspane_core_layout::{
    flush_origin, hidden_origin, map_between_displays, nearest_edge, position_at_trigger,
    Direction, Display, DisplayId, DisplayResolver, Edge, LayoutStrategy, Point, Rect,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

/// All tunables, grouped by concern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub layout: LayoutRules,
    pub motion: MotionSettings,
    pub visibility: VisibilitySettings,
    /// Delay before a requested auxiliary hide takes effect.
    pub auxiliary_hide_grace: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            layout: LayoutRules::default(),
            motion: MotionSettings::default(),
            visibility: VisibilitySettings::default(),
            auxiliary_hide_grace: Duration::from_millis(200),
        }
    }
}

/// Deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineTask {
    AnimationTick { window: WindowKind, session: SessionId },
    LayoutPass,
    /// Second post-show correction pass.
    LayoutRefresh,
    ToggleFailsafe { cycle: u64 },
    QueuedToggle,
    HideSettle { cycle: u64 },
    ShowSettle { cycle: u64 },
    HideAuxiliary,
}

/// One window in an [`EngineSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub kind: WindowKind,
    pub bounds: Option<Rect>,
    pub visible: bool,
    pub locked: bool,
}

/// Point-in-time view of the engine, for queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub windows: Vec<WindowState>,
    pub strategy: Option<LayoutStrategy>,
    pub toggle: ToggleState,
    /// Whether the header has a live animation.
    pub animating: bool,
    /// Whether the header is parked off-screen.
    pub parked: bool,
}

/// Layout, motion and visibility engine over a host `H`.
pub struct Engine<H> {
    host: H,
    settings: EngineSettings,
    scheduler: Scheduler<EngineTask>,
    animator: MovementAnimator,
    visibility: VisibilityCoordinator,
    layout: LayoutController,
    auxiliary_hide: Option<TaskHandle>,
}

impl<H: WindowHost + DisplaySource> Engine<H> {
    pub fn new(host: H, settings: EngineSettings) -> Self {
        let mut engine = Self {
            host,
            settings,
            scheduler: Scheduler::new(),
            animator: MovementAnimator::new(settings.motion),
            visibility: VisibilityCoordinator::new(settings.visibility),
            layout: LayoutController::new(settings.layout),
            auxiliary_hide: None,
        };
        engine.remember_header_display();
        engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Swap in new settings. Running animations keep their original timing.
    pub fn apply_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
        self.animator.set_settings(settings.motion);
        self.visibility.set_settings(settings.visibility);
        self.layout.set_rules(settings.layout);
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn animator(&self) -> &MovementAnimator {
        &self.animator
    }

    pub fn visibility(&self) -> &VisibilityCoordinator {
        &self.visibility
    }

    pub fn toggle_state(&self) -> ToggleState {
        self.visibility.state()
    }

    /// Whether the header has a live animation.
    pub fn is_animating(&self) -> bool {
        self.animator.is_animating(WindowKind::Header)
    }

    /// A resolver over the host's current displays.
    ///
    /// An unusable display list degrades to a single fallback display.
    pub fn resolver(&self) -> DisplayResolver {
        match DisplayResolver::new(self.host.displays()) {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!("Display list unusable ({}), using fallback display", e);
                DisplayResolver::fallback()
            }
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            windows: WindowKind::ALL
                .iter()
                .map(|&kind| WindowState {
                    kind,
                    bounds: self.host.bounds(kind),
                    visible: self.host.is_visible(kind),
                    locked: self.layout.is_locked(kind),
                })
                .collect(),
            strategy: self.layout.strategy(),
            toggle: self.visibility.state(),
            animating: self.is_animating(),
            parked: self.animator.parked(WindowKind::Header).is_some(),
        }
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// When the next scheduled task is due.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Run every task due at or before `now`. Returns how many ran.
    pub fn fire_due(&mut self, now: Instant) -> usize {
        self.reap_cancelled(now);
        let mut fired = 0;
        while let Some(task) = self.scheduler.pop_due(now) {
            trace!("Running {:?}", task);
            self.run_task(task, now);
            fired += 1;
        }
        fired
    }

    fn run_task(&mut self, task: EngineTask, now: Instant) {
        match task {
            EngineTask::AnimationTick { window, session } => self.tick(window, session, now),
            EngineTask::LayoutPass => {
                self.layout.clear_pending();
                self.layout_pass(now);
            }
            EngineTask::LayoutRefresh => self.forced_layout_pass(now),
            EngineTask::ToggleFailsafe { cycle } => {
                if let Some(queued) = self.visibility.expire(cycle) {
                    self.after_cycle(queued, now);
                }
            }
            EngineTask::QueuedToggle => {
                self.visibility.clear_pending_queue();
                if self.visibility.state() == ToggleState::Idle {
                    info!("Re-issuing queued toggle");
                    self.toggle_visibility(now);
                } else {
                    debug!("Dropping queued toggle: another cycle is running");
                }
            }
            EngineTask::HideSettle { cycle } => self.hide_settled(cycle, now),
            EngineTask::ShowSettle { cycle } => self.show_settled(cycle, now),
            EngineTask::HideAuxiliary => self.finish_hide_auxiliary(),
        }
    }

    fn reap_cancelled(&mut self, now: Instant) {
        for finished in self.animator.reap_cancelled() {
            self.complete(finished, now);
        }
    }

    // ========================================================================
    // Animation plumbing
    // ========================================================================

    fn header(&self) -> Result<Rect, MotionError> {
        if self.host.is_destroyed(WindowKind::Header) {
            return Err(MotionError::HeaderUnavailable);
        }
        self.host
            .bounds(WindowKind::Header)
            .ok_or(MotionError::HeaderUnavailable)
    }

    /// Start a session and schedule its first frame.
    fn animate(
        &mut self,
        window: WindowKind,
        kind: MotionKind,
        from: Point,
        to: Point,
        now: Instant,
        completion: Completion,
    ) -> TaskHandle {
        // Any other movement takes the window off its hide/show track
        if !matches!(kind, MotionKind::Hide | MotionKind::Show) && self.animator.unpark(window).is_some() {
            debug!("{} no longer parked", window);
        }
        let (session, token, superseded) = self.animator.begin(window, kind, from, to, now, completion);
        if let Some(finished) = superseded {
            self.complete(finished, now);
        }
        let at = now + self.settings.motion.frame_interval;
        self.scheduler
            .schedule_with(at, EngineTask::AnimationTick { window, session }, token)
    }

    fn tick(&mut self, window: WindowKind, session: SessionId, now: Instant) {
        let Some(frame) = self.animator.frame(window, session, now) else {
            trace!("Dropping stale frame for {}", window);
            return;
        };

        let bounds = match self.host.bounds(window) {
            Some(bounds) if !self.host.is_destroyed(window) => bounds,
            _ => {
                self.end_animation(window, Err(MotionError::WindowDestroyed), now);
                return;
            }
        };
        let position = match frame.position {
            Ok(position) => position,
            Err(e) => {
                self.end_animation(window, Err(e), now);
                return;
            }
        };
        if let Err(e) = self.host.set_bounds(window, bounds.moved_to(position)) {
            let error = match e {
                HostError::Missing(_) | HostError::Destroyed(_) => MotionError::WindowDestroyed,
                other => MotionError::Host(other),
            };
            self.end_animation(window, Err(error), now);
            return;
        }

        if !frame.done {
            if let Some(token) = self.animator.token(window, session) {
                let at = now + self.settings.motion.frame_interval;
                self.scheduler
                    .schedule_with(at, EngineTask::AnimationTick { window, session }, token);
            }
            return;
        }

        match frame.kind {
            MotionKind::Hide => self.host.hide(window),
            MotionKind::Show => {
                self.animator.unpark(window);
            }
            _ => {}
        }
        if window == WindowKind::Header && frame.kind != MotionKind::Hide {
            self.remember_header_display();
        }
        if frame.kind.requests_layout() {
            self.request_layout(now);
        }
        self.end_animation(window, Ok(()), now);
    }

    fn end_animation(&mut self, window: WindowKind, result: MotionResult, now: Instant) {
        if let Some(finished) = self.animator.finish(window, result) {
            self.complete(finished, now);
        }
    }

    /// Report a failure to `completion` for an animation that never started.
    fn fail(&mut self, kind: MotionKind, completion: Completion, error: MotionError, now: Instant) {
        debug!("{:?} animation not started: {}", kind, error);
        self.complete(
            Finished {
                window: WindowKind::Header,
                kind,
                completion,
                result: Err(error),
            },
            now,
        );
    }

    fn complete(&mut self, finished: Finished, now: Instant) {
        let Finished {
            window,
            kind,
            completion,
            result,
        } = finished;
        trace!("{:?} animation on {} ended: {:?}", kind, window, result);
        if let Some((cycle, result)) = completion.deliver(result) {
            self.resume_cycle(cycle, kind, result, now);
        }
    }

    fn cancel_header_animation(&mut self, now: Instant) {
        if let Some(finished) = self.animator.cancel(WindowKind::Header) {
            self.complete(finished, now);
        }
    }

    // ========================================================================
    // Header movement
    // ========================================================================

    /// Move the header one step in `direction`.
    ///
    /// `Ok(None)` when the move is a no-op: already animating, not visible,
    /// or already against the boundary.
    pub fn move_step(
        &mut self,
        direction: Direction,
        now: Instant,
    ) -> Result<Option<AnimationHandle>, MotionError> {
        let (tx, rx) = oneshot::channel();
        let task = self.start_step(direction, now, Completion::Channel(tx))?;
        Ok(task.map(|task| AnimationHandle::new(task, rx)))
    }

    fn start_step(
        &mut self,
        direction: Direction,
        now: Instant,
        completion: Completion,
    ) -> Result<Option<TaskHandle>, MotionError> {
        let bounds = self.header()?;
        if !self.host.is_visible(WindowKind::Header) {
            debug!("Step ignored: header not visible");
            return Ok(None);
        }
        if self.is_animating() {
            debug!("Step ignored: already animating");
            return Ok(None);
        }

        let resolver = self.resolver();
        let (dx, dy) = direction.offset();
        let step = self.settings.motion.step_size;
        let mut target = bounds.moved_to(Point::new(bounds.x + dx * step, bounds.y + dy * step));
        if !resolver.fits_on_any(&target) {
            let display = resolver.display_nearest_point(target.center_x(), target.center_y());
            target = target.moved_to(display.work_area.clamp_origin(target.origin(), target.size(), 0));
        }
        if target.origin() == bounds.origin() {
            debug!("Step ignored: already at boundary");
            return Ok(None);
        }

        debug!("Stepping header {:?} to ({}, {})", direction, target.x, target.y);
        Ok(Some(self.animate(
            WindowKind::Header,
            MotionKind::Step,
            bounds.origin(),
            target.origin(),
            now,
            completion,
        )))
    }

    /// Snap the header flush to an edge of its display's work area.
    ///
    /// Cancels any running header animation first.
    pub fn move_to_edge(
        &mut self,
        direction: Direction,
        now: Instant,
    ) -> Result<Option<AnimationHandle>, MotionError> {
        let (tx, rx) = oneshot::channel();
        let task = self.start_edge(direction, now, Completion::Channel(tx))?;
        Ok(task.map(|task| AnimationHandle::new(task, rx)))
    }

    fn start_edge(
        &mut self,
        direction: Direction,
        now: Instant,
        completion: Completion,
    ) -> Result<Option<TaskHandle>, MotionError> {
        let bounds = self.header()?;
        if !self.host.is_visible(WindowKind::Header) {
            debug!("Edge snap ignored: header not visible");
            return Ok(None);
        }
        self.cancel_header_animation(now);

        let resolver = self.resolver();
        let display = resolver.current_display(Some(&bounds));
        let target = flush_origin(&bounds, &display.work_area, direction.edge());
        if target == bounds.origin() {
            debug!("Edge snap ignored: already at boundary");
            return Ok(None);
        }

        debug!("Snapping header to {:?} edge", direction.edge());
        Ok(Some(self.animate(
            WindowKind::Header,
            MotionKind::Edge,
            bounds.origin(),
            target,
            now,
            completion,
        )))
    }

    /// Move the header to the same relative spot on another display.
    ///
    /// Unknown ids fall back to the primary display.
    pub fn move_to_display(
        &mut self,
        id: DisplayId,
        now: Instant,
    ) -> Result<Option<AnimationHandle>, MotionError> {
        let (tx, rx) = oneshot::channel();
        let task = self.start_display(id, now, Completion::Channel(tx))?;
        Ok(task.map(|task| AnimationHandle::new(task, rx)))
    }

    fn start_display(
        &mut self,
        id: DisplayId,
        now: Instant,
        completion: Completion,
    ) -> Result<Option<TaskHandle>, MotionError> {
        let bounds = self.header()?;
        if !self.host.is_visible(WindowKind::Header) {
            debug!("Display move ignored: header not visible");
            return Ok(None);
        }
        if self.is_animating() {
            debug!("Display move ignored: already animating");
            return Ok(None);
        }

        let resolver = self.resolver();
        if resolver.find(id).is_none() {
            warn!("Display {} not found, using primary display", id);
        }
        let current = resolver.current_display(Some(&bounds));
        let target_display = resolver.display_by_id(id);
        if target_display.id == current.id {
            debug!("Display move ignored: already on target display {}", current.id);
            return Ok(None);
        }

        let target = map_between_displays(&bounds, current, target_display);
        info!("Moving header from display {} to {}", current.id, target_display.id);
        Ok(Some(self.animate(
            WindowKind::Header,
            MotionKind::Display,
            bounds.origin(),
            target,
            now,
            completion,
        )))
    }

    /// Slide the header off-screen past `edge`, then hide it.
    pub fn hide_to_edge(&mut self, edge: Edge, now: Instant) -> Result<AnimationHandle, MotionError> {
        let (tx, mut rx) = oneshot::channel();
        match self.start_hide(edge, now, Completion::Channel(tx)) {
            Some(task) => Ok(AnimationHandle::new(task, rx)),
            None => Err(immediate_error(&mut rx)),
        }
    }

    /// Callback form of [`Self::hide_to_edge`]. The callback receives exactly
    /// one outcome, including immediate failures.
    pub fn hide_to_edge_with(
        &mut self,
        edge: Edge,
        now: Instant,
        on_done: MotionCallback,
    ) -> Option<TaskHandle> {
        self.start_hide(edge, now, Completion::Callback(on_done))
    }

    fn start_hide(&mut self, edge: Edge, now: Instant, completion: Completion) -> Option<TaskHandle> {
        let bounds = match self.header() {
            Ok(bounds) => bounds,
            Err(e) => {
                self.fail(MotionKind::Hide, completion, e, now);
                return None;
            }
        };
        if !self.host.is_visible(WindowKind::Header) {
            self.fail(MotionKind::Hide, completion, MotionError::NotVisible, now);
            return None;
        }

        let resolver = self.resolver();
        let display = resolver.current_display(Some(&bounds));
        let hidden_at = hidden_origin(&bounds, &display.work_area, edge, self.settings.motion.hide_margin);

        // Mid-show, the window is not yet where it belongs
        let visible_at = match self.animator.parked(WindowKind::Header) {
            Some(parked) if self.is_animating() => parked.visible_at,
            _ => bounds.origin(),
        };
        self.animator.park(
            WindowKind::Header,
            Parked {
                visible_at,
                hidden_at,
                edge,
            },
        );

        debug!("Hiding header past {:?} edge to ({}, {})", edge, hidden_at.x, hidden_at.y);
        Some(self.animate(
            WindowKind::Header,
            MotionKind::Hide,
            bounds.origin(),
            hidden_at,
            now,
            completion,
        ))
    }

    /// Bring the header back from where [`Self::hide_to_edge`] parked it.
    pub fn show_from_edge(&mut self, now: Instant) -> Result<AnimationHandle, MotionError> {
        let (tx, mut rx) = oneshot::channel();
        match self.start_show(now, Completion::Channel(tx)) {
            Some(task) => Ok(AnimationHandle::new(task, rx)),
            None => Err(immediate_error(&mut rx)),
        }
    }

    /// Callback form of [`Self::show_from_edge`].
    pub fn show_from_edge_with(&mut self, now: Instant, on_done: MotionCallback) -> Option<TaskHandle> {
        self.start_show(now, Completion::Callback(on_done))
    }

    fn start_show(&mut self, now: Instant, completion: Completion) -> Option<TaskHandle> {
        let bounds = match self.header() {
            Ok(bounds) => bounds,
            Err(e) => {
                self.fail(MotionKind::Show, completion, e, now);
                return None;
            }
        };
        let Some(parked) = self.animator.parked(WindowKind::Header) else {
            self.fail(MotionKind::Show, completion, MotionError::NothingToRestore, now);
            return None;
        };

        if let Err(e) = self
            .host
            .set_bounds(WindowKind::Header, bounds.moved_to(parked.hidden_at))
        {
            self.fail(MotionKind::Show, completion, MotionError::Host(e), now);
            return None;
        }
        self.host.show(WindowKind::Header);

        debug!(
            "Showing header from {:?} edge back to ({}, {})",
            parked.edge, parked.visible_at.x, parked.visible_at.y
        );
        Some(self.animate(
            WindowKind::Header,
            MotionKind::Show,
            parked.hidden_at,
            parked.visible_at,
            now,
            completion,
        ))
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Hide or show the whole window group.
    pub fn toggle_visibility(&mut self, now: Instant) -> ToggleDecision {
        let decision = self.visibility.request(now);
        if let ToggleDecision::Started { cycle } = decision {
            let failsafe_at = now + self.settings.visibility.failsafe;
            let failsafe = self
                .scheduler
                .schedule(failsafe_at, EngineTask::ToggleFailsafe { cycle });
            self.visibility.arm_failsafe(failsafe);

            if self.host.is_visible(WindowKind::Header) {
                self.begin_hide_cycle(cycle, now);
            } else {
                self.begin_show_cycle(cycle, now);
            }
        }
        decision
    }

    fn begin_hide_cycle(&mut self, cycle: u64, now: Instant) {
        let visible: Vec<WindowKind> = WindowKind::DEPENDENTS
            .into_iter()
            .filter(|&kind| self.host.is_visible(kind))
            .collect();
        self.visibility.record_mut().rebuild(visible.iter().copied());
        for &kind in &visible {
            self.host.signal(kind, WindowSignal::HideAnimationStart);
        }

        info!("Hiding window group ({} dependents)", visible.len());
        let at = now + self.settings.visibility.hide_settle;
        self.scheduler.schedule(at, EngineTask::HideSettle { cycle });
    }

    fn hide_settled(&mut self, cycle: u64, now: Instant) {
        if !self.visibility.is_current(cycle) {
            return;
        }
        let dependents: Vec<WindowKind> = self.visibility.record().dependents().collect();
        for kind in dependents {
            self.host.hide(kind);
        }
        self.cancel_hide_auxiliary();

        let bounds = match self.header() {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!("Hide cycle aborted: {}", e);
                self.end_cycle(cycle, now);
                return;
            }
        };
        let resolver = self.resolver();
        let display = resolver.current_display(Some(&bounds));
        let edge = nearest_edge(&bounds, &display.work_area);
        self.start_hide(edge, now, Completion::Visibility { cycle });
    }

    fn begin_show_cycle(&mut self, cycle: u64, now: Instant) {
        info!("Showing window group");
        self.start_show(now, Completion::Visibility { cycle });
    }

    fn resume_cycle(&mut self, cycle: u64, kind: MotionKind, result: MotionResult, now: Instant) {
        if !self.visibility.is_current(cycle) {
            debug!("Ignoring animation result for stale toggle cycle {}", cycle);
            return;
        }

        if kind == MotionKind::Hide {
            if let Err(e) = result {
                warn!("Hide cycle aborted: {}", e);
            }
            self.end_cycle(cycle, now);
            return;
        }

        if let Err(e) = result {
            warn!("Show animation failed ({}), showing header in place", e);
            self.host.show(WindowKind::Header);
        }
        let dependents: Vec<WindowKind> = self.visibility.record().dependents().collect();
        for kind in dependents {
            self.host.show(kind);
            self.host.signal(kind, WindowSignal::ShowAnimationStart);
        }
        let at = now + self.settings.visibility.show_settle;
        self.scheduler.schedule(at, EngineTask::ShowSettle { cycle });
    }

    fn show_settled(&mut self, cycle: u64, now: Instant) {
        if !self.visibility.is_current(cycle) {
            return;
        }
        // Correct drift from the animation: once now, once shortly after
        self.layout.cancel_pending();
        self.forced_layout_pass(now);
        let at = now + self.settings.visibility.refresh_delay;
        self.scheduler.schedule(at, EngineTask::LayoutRefresh);
        self.end_cycle(cycle, now);
    }

    fn end_cycle(&mut self, cycle: u64, now: Instant) {
        if let Some(queued) = self.visibility.finish(cycle) {
            self.after_cycle(queued, now);
        }
    }

    fn after_cycle(&mut self, queued: bool, now: Instant) {
        if queued {
            let at = now + self.settings.visibility.queue_delay;
            let handle = self.scheduler.schedule(at, EngineTask::QueuedToggle);
            self.visibility.set_pending_queue(handle);
        }
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Request a debounced layout pass. Idempotent.
    pub fn update_layout(&mut self, now: Instant) {
        self.request_layout(now);
    }

    fn request_layout(&mut self, now: Instant) {
        if self.layout.has_pending() {
            trace!("Layout pass already pending");
            return;
        }
        let at = now + self.settings.layout.debounce;
        let handle = self.scheduler.schedule(at, EngineTask::LayoutPass);
        self.layout.set_pending(handle);
    }

    fn layout_pass(&mut self, now: Instant) {
        let resolver = self.resolver();
        let outcome = self.layout.run_pass(&mut self.host, &resolver, now);
        if let PassOutcome::Deferred(at) = outcome {
            if !self.layout.has_pending() {
                let handle = self.scheduler.schedule(at, EngineTask::LayoutPass);
                self.layout.set_pending(handle);
            }
        }
    }

    fn forced_layout_pass(&mut self, now: Instant) {
        let resolver = self.resolver();
        self.layout.run_forced_pass(&mut self.host, &resolver, now);
    }

    /// Record the display the header is on now, for relocation if that
    /// display is later removed.
    fn remember_header_display(&mut self) {
        if let Some(bounds) = self.host.bounds(WindowKind::Header) {
            let display = self.resolver().current_display(Some(&bounds)).clone();
            self.layout.remember_header_display(display);
        }
    }

    // ========================================================================
    // Host notifications
    // ========================================================================

    pub fn on_window_moved(&mut self, kind: WindowKind, now: Instant) {
        if kind != WindowKind::Header {
            trace!("{} moved", kind);
            return;
        }
        // Moves during an animation are the animation's own writes
        if self.is_animating() {
            return;
        }
        self.layout.note_header_moved(now);
        if self.host.is_visible(WindowKind::Header) {
            self.remember_header_display();
        }
        self.request_layout(now);
    }

    pub fn on_window_resized(&mut self, kind: WindowKind, now: Instant) {
        trace!("{} resized", kind);
        self.request_layout(now);
    }

    pub fn on_drag_start(&mut self, kind: WindowKind) {
        if kind == WindowKind::Header {
            self.layout.begin_drag();
        }
    }

    /// A drag ended. A dependent window dragged by the user stays where it
    /// was dropped until the header changes display.
    pub fn on_drag_end(&mut self, kind: WindowKind, now: Instant) {
        if kind == WindowKind::Header {
            self.layout.end_drag(now);
            self.request_layout(now);
        } else {
            self.layout.lock(kind);
        }
    }

    pub fn on_display_added(&mut self, id: DisplayId, _now: Instant) {
        info!("Display {} added", id);
    }

    pub fn on_display_metrics_changed(&mut self, id: DisplayId, now: Instant) {
        debug!("Display {} metrics changed", id);
        self.request_layout(now);
    }

    /// A display went away. If it was the header's, relocate the header to
    /// the primary display.
    pub fn on_display_removed(&mut self, id: DisplayId, now: Instant) {
        match self.layout.header_display().cloned() {
            Some(removed) if removed.id == id => self.relocate_header(removed, now),
            _ => {
                debug!("Display {} removed", id);
                self.request_layout(now);
            }
        }
    }

    fn relocate_header(&mut self, removed: Display, now: Instant) {
        let Ok(bounds) = self.header() else {
            return;
        };
        let resolver = self.resolver();
        let primary = resolver.primary().clone();
        if primary.id == removed.id {
            warn!("Removed display {} is still reported; not relocating", removed.id);
            return;
        }
        info!("Display {} removed, moving header to primary display {}", removed.id, primary.id);

        if let Some(parked) = self.animator.parked(WindowKind::Header) {
            if !self.host.is_visible(WindowKind::Header) {
                // Hidden: re-park against the primary display instead
                let visible_at =
                    map_between_displays(&bounds.moved_to(parked.visible_at), &removed, &primary);
                let hidden_at = hidden_origin(
                    &bounds.moved_to(visible_at),
                    &primary.work_area,
                    parked.edge,
                    self.settings.motion.hide_margin,
                );
                self.animator.park(
                    WindowKind::Header,
                    Parked {
                        visible_at,
                        hidden_at,
                        edge: parked.edge,
                    },
                );
                if let Err(e) = self.host.set_bounds(WindowKind::Header, bounds.moved_to(hidden_at)) {
                    warn!("Failed to re-park header: {}", e);
                }
                self.layout.remember_header_display(primary);
                return;
            }
        }

        let target = map_between_displays(&bounds, &removed, &primary);
        self.layout.remember_header_display(primary);
        self.animate(
            WindowKind::Header,
            MotionKind::Display,
            bounds.origin(),
            target,
            now,
            Completion::Detached,
        );
    }

    // ========================================================================
    // Dependent windows
    // ========================================================================

    /// Open the auxiliary panel under a trigger control on the header.
    ///
    /// `trigger` is relative to the header's origin. The panel is locked in
    /// place until the header changes display.
    pub fn show_auxiliary(&mut self, trigger: Rect) -> Result<(), EngineError> {
        let header = self.header()?;
        let size = self
            .host
            .bounds(WindowKind::Auxiliary)
            .ok_or(HostError::Missing(WindowKind::Auxiliary))?
            .size();
        self.cancel_hide_auxiliary();

        let resolver = self.resolver();
        let display = resolver.current_display(Some(&header));
        let rect = position_at_trigger(
            &header,
            &trigger,
            &display.work_area,
            size,
            &self.settings.layout.auxiliary,
        );
        self.host.set_bounds(WindowKind::Auxiliary, rect)?;
        self.host.show(WindowKind::Auxiliary);
        self.layout.lock(WindowKind::Auxiliary);
        debug!("Auxiliary opened at ({}, {})", rect.x, rect.y);
        Ok(())
    }

    /// Hide the auxiliary panel after the grace period, unless
    /// [`Self::cancel_hide_auxiliary`] is called first.
    pub fn hide_auxiliary(&mut self, now: Instant) {
        if self.auxiliary_hide.as_ref().is_some_and(|h| !h.is_cancelled()) {
            return;
        }
        let at = now + self.settings.auxiliary_hide_grace;
        self.auxiliary_hide = Some(self.scheduler.schedule(at, EngineTask::HideAuxiliary));
    }

    pub fn cancel_hide_auxiliary(&mut self) {
        if let Some(pending) = self.auxiliary_hide.take() {
            debug!("Auxiliary hide cancelled");
            pending.cancel();
        }
    }

    fn finish_hide_auxiliary(&mut self) {
        self.auxiliary_hide = None;
        self.host.hide(WindowKind::Auxiliary);
        self.layout.unlock(WindowKind::Auxiliary);
        self.host.signal(WindowKind::Header, WindowSignal::AuxiliaryClosed);
    }

    pub fn show_companion(&mut self, kind: WindowKind, now: Instant) -> Result<(), EngineError> {
        if !kind.is_companion() {
            return Err(EngineError::NotACompanion(kind));
        }
        self.host.show(kind);
        self.request_layout(now);
        Ok(())
    }

    pub fn hide_companion(&mut self, kind: WindowKind, now: Instant) -> Result<(), EngineError> {
        if !kind.is_companion() {
            return Err(EngineError::NotACompanion(kind));
        }
        self.host.hide(kind);
        self.request_layout(now);
        Ok(())
    }

    /// Resize the header around its horizontal center.
    pub fn resize_header(&mut self, width: i32, height: i32, now: Instant) -> Result<(), EngineError> {
        if width <= 0 || height <= 0 {
            return Err(EngineError::InvalidSize { width, height });
        }
        if self.layout.is_dragging(now) {
            return Err(EngineError::Dragging);
        }
        let bounds = self.header()?;
        let x = (bounds.center_x() - width as f64 / 2.0).round() as i32;
        self.host
            .set_bounds(WindowKind::Header, Rect::new(x, bounds.y, width, height))?;
        self.request_layout(now);
        Ok(())
    }

    /// Move the header immediately, clamped into the work area of the
    /// display nearest to `(x, y)`.
    pub fn move_header_to(&mut self, x: i32, y: i32, now: Instant) -> Result<(), EngineError> {
        let bounds = self.header()?;
        self.cancel_header_animation(now);

        let resolver = self.resolver();
        let display = resolver.display_nearest_point(x as f64, y as f64);
        let origin = display
            .work_area
            .clamp_origin(Point::new(x, y), bounds.size(), 0);
        self.host
            .set_bounds(WindowKind::Header, bounds.moved_to(origin))?;
        if self.host.is_visible(WindowKind::Header) {
            self.remember_header_display();
        }
        self.request_layout(now);
        Ok(())
    }
}

/// The error a completion channel received synchronously.
fn immediate_error(rx: &mut oneshot::Receiver<MotionResult>) -> MotionError {
    match rx.try_recv() {
        Ok(Err(e)) => e,
        _ => MotionError::Cancelled,
    }
}
