//! Group visibility state machine.
//!
//! The coordinator only tracks state; the engine runs the actual hide and
//! show cycles and reports back with [`VisibilityCoordinator::finish`].
//! Each cycle carries an id so late completions from an earlier cycle (for
//! example after a failsafe reset) are ignored.

use crate::scheduler::TaskHandle;
use crate::WindowKind;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timing constants for the visibility cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilitySettings {
    /// Requests closer than this to the last accepted one are dropped.
    pub debounce: Duration,
    /// Delay between a cycle finishing and its queued request running.
    pub queue_delay: Duration,
    /// Forced reset if a cycle never reports completion.
    pub failsafe: Duration,
    /// Time given to companions to run their hide transition.
    pub hide_settle: Duration,
    /// Time given to companions to run their show transition.
    pub show_settle: Duration,
    /// Gap between the two post-show layout refreshes.
    pub refresh_delay: Duration,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            queue_delay: Duration::from_millis(300),
            failsafe: Duration::from_millis(2000),
            hide_settle: Duration::from_millis(180),
            show_settle: Duration::from_millis(100),
            refresh_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    Idle,
    Toggling,
}

/// What happened to a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    /// A new cycle started.
    Started { cycle: u64 },
    /// Too soon after the previous request.
    Debounced,
    /// A cycle is running; the request will be re-issued after it.
    Queued,
}

/// Windows that were visible right before the last hide.
///
/// Always contains the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRecord {
    windows: Vec<WindowKind>,
}

impl Default for VisibilityRecord {
    fn default() -> Self {
        Self {
            windows: vec![WindowKind::Header],
        }
    }
}

impl VisibilityRecord {
    /// Replace the record with the header plus `visible`.
    pub fn rebuild(&mut self, visible: impl IntoIterator<Item = WindowKind>) {
        self.windows.clear();
        self.windows.push(WindowKind::Header);
        for kind in visible {
            if !self.windows.contains(&kind) {
                self.windows.push(kind);
            }
        }
    }

    pub fn contains(&self, kind: WindowKind) -> bool {
        self.windows.contains(&kind)
    }

    /// Recorded windows other than the header.
    pub fn dependents(&self) -> impl Iterator<Item = WindowKind> + '_ {
        self.windows.iter().copied().filter(|&k| k != WindowKind::Header)
    }

    pub fn windows(&self) -> &[WindowKind] {
        &self.windows
    }
}

/// Debounced Idle/Toggling state machine.
pub struct VisibilityCoordinator {
    settings: VisibilitySettings,
    state: ToggleState,
    last_toggle: Option<Instant>,
    queued: bool,
    cycle: u64,
    failsafe: Option<TaskHandle>,
    pending_queue: Option<TaskHandle>,
    record: VisibilityRecord,
}

impl VisibilityCoordinator {
    pub fn new(settings: VisibilitySettings) -> Self {
        Self {
            settings,
            state: ToggleState::Idle,
            last_toggle: None,
            queued: false,
            cycle: 0,
            failsafe: None,
            pending_queue: None,
            record: VisibilityRecord::default(),
        }
    }

    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: VisibilitySettings) {
        self.settings = settings;
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Id of the most recently started cycle.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn has_queued(&self) -> bool {
        self.queued
    }

    pub fn record(&self) -> &VisibilityRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut VisibilityRecord {
        &mut self.record
    }

    /// Whether `cycle` is the one currently running.
    pub fn is_current(&self, cycle: u64) -> bool {
        self.state == ToggleState::Toggling && self.cycle == cycle
    }

    /// Handle a toggle request.
    pub fn request(&mut self, now: Instant) -> ToggleDecision {
        if let Some(last) = self.last_toggle {
            if now.saturating_duration_since(last) < self.settings.debounce {
                debug!("Toggle request debounced");
                return ToggleDecision::Debounced;
            }
        }

        if self.state == ToggleState::Toggling {
            info!("Toggle in progress, queueing request");
            self.queued = true;
            return ToggleDecision::Queued;
        }

        // A direct request supersedes anything still waiting
        if let Some(pending) = self.pending_queue.take() {
            pending.cancel();
        }

        self.state = ToggleState::Toggling;
        self.last_toggle = Some(now);
        self.cycle += 1;
        ToggleDecision::Started { cycle: self.cycle }
    }

    /// Remember the failsafe timer for the running cycle.
    pub fn arm_failsafe(&mut self, handle: TaskHandle) {
        if let Some(old) = self.failsafe.replace(handle) {
            old.cancel();
        }
    }

    /// Remember the timer that will re-issue a queued request.
    ///
    /// Replaces (and cancels) any previously pending one.
    pub fn set_pending_queue(&mut self, handle: TaskHandle) {
        if let Some(old) = self.pending_queue.replace(handle) {
            old.cancel();
        }
    }

    /// Forget the pending queued request timer once it has fired.
    pub fn clear_pending_queue(&mut self) {
        self.pending_queue = None;
    }

    /// End cycle `cycle`.
    ///
    /// Returns `None` for a stale cycle, otherwise whether a queued request
    /// should be re-issued.
    pub fn finish(&mut self, cycle: u64) -> Option<bool> {
        if !self.is_current(cycle) {
            debug!("Ignoring completion of stale toggle cycle {}", cycle);
            return None;
        }
        self.state = ToggleState::Idle;
        if let Some(failsafe) = self.failsafe.take() {
            failsafe.cancel();
        }
        Some(std::mem::take(&mut self.queued))
    }

    /// Failsafe expiry for `cycle`. Same contract as [`Self::finish`].
    pub fn expire(&mut self, cycle: u64) -> Option<bool> {
        if !self.is_current(cycle) {
            return None;
        }
        warn!("Toggle cycle {} did not complete in time, forcing reset", cycle);
        self.failsafe = None;
        self.finish(cycle)
    }
}
