//! Glasspane Engine
//!
//! Keeps the header window and its companions positioned, animated and
//! shown or hidden as one group.
//!
//! Everything runs on a single cooperative thread:
//! - Operations take the current time (`now`) instead of reading a clock
//! - Follow-up work (animation frames, debounced layout passes, settle
//!   delays, failsafes) goes into a [`Scheduler`]
//! - The host drives time forward with [`Engine::fire_due`] and sleeps until
//!   [`Engine::next_deadline`]
//!
//! The host side (real windows, real displays) is abstracted behind
//! [`WindowHost`] and [`DisplaySource`]. [`memory::MemoryHost`] implements
//! both in memory.

pub mod engine;
pub mod host;
pub mod layout;
pub mod memory;
pub mod motion;
pub mod scheduler;
pub mod visibility;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use engine::{Engine, EngineSettings, EngineSnapshot, WindowState};
pub use host::{DisplaySource, WindowHost, WindowSignal};
pub use layout::{LayoutController, LayoutRules, PassOutcome};
pub use motion::{
    validate_position, AnimationHandle, MotionCallback, MotionKind, MotionResult, MotionSettings,
    MovementAnimator, Parked,
};
pub use scheduler::{CancelToken, Scheduler, TaskHandle, TaskId};
pub use visibility::{
    ToggleDecision, ToggleState, VisibilityCoordinator, VisibilityRecord, VisibilitySettings,
};

/// The windows the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// The always-present anchor window.
    Header,
    /// Left-hand companion panel.
    CompanionA,
    /// Right-hand companion panel.
    CompanionB,
    /// Settings-like panel anchored to a trigger on the header.
    Auxiliary,
}

impl WindowKind {
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Header,
        WindowKind::CompanionA,
        WindowKind::CompanionB,
        WindowKind::Auxiliary,
    ];

    /// Every window that follows the header.
    pub const DEPENDENTS: [WindowKind; 3] = [
        WindowKind::CompanionA,
        WindowKind::CompanionB,
        WindowKind::Auxiliary,
    ];

    pub fn is_companion(self) -> bool {
        matches!(self, WindowKind::CompanionA | WindowKind::CompanionB)
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowKind::Header => "header",
            WindowKind::CompanionA => "companion-a",
            WindowKind::CompanionB => "companion-b",
            WindowKind::Auxiliary => "auxiliary",
        };
        f.write_str(name)
    }
}

/// Failures reported by a [`WindowHost`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("window {0} does not exist")]
    Missing(WindowKind),

    #[error("window {0} has been destroyed")]
    Destroyed(WindowKind),

    #[error("host rejected the request: {0}")]
    Rejected(String),
}

/// Why an animation did not complete.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MotionError {
    #[error("header window is absent or destroyed")]
    HeaderUnavailable,

    #[error("window is not visible")]
    NotVisible,

    #[error("invalid position ({x}, {y})")]
    InvalidGeometry { x: f64, y: f64 },

    #[error("window was destroyed mid-animation")]
    WindowDestroyed,

    #[error("animation was cancelled")]
    Cancelled,

    #[error("no hidden position to restore from")]
    NothingToRestore,

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Errors from engine operations that are not animations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("header is being dragged")]
    Dragging,

    #[error("{0} is not a companion window")]
    NotACompanion(WindowKind),

    #[error("invalid window size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },

    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error(transparent)]
    Host(#[from] HostError),
}
