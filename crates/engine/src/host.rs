//! Interfaces the engine consumes from the windowing host.

use crate::{HostError, WindowKind};
use glasspane_core_layout::{Display, Rect};
use serde::{Deserialize, Serialize};

/// Phase notifications sent to dependent windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSignal {
    /// The group is about to slide off-screen; run the hide transition.
    HideAnimationStart,
    /// The group is back; run the show transition.
    ShowAnimationStart,
    /// The auxiliary panel closed. Sent to the header.
    AuxiliaryClosed,
}

/// Handle-level access to the managed windows.
pub trait WindowHost {
    /// Current bounds, or `None` when the window is absent or destroyed.
    fn bounds(&self, kind: WindowKind) -> Option<Rect>;

    /// Move and/or resize a window.
    fn set_bounds(&mut self, kind: WindowKind, bounds: Rect) -> Result<(), HostError>;

    fn is_visible(&self, kind: WindowKind) -> bool;

    fn is_destroyed(&self, kind: WindowKind) -> bool;

    fn show(&mut self, kind: WindowKind);

    fn hide(&mut self, kind: WindowKind);

    /// Deliver a phase notification to a window.
    fn signal(&mut self, kind: WindowKind, signal: WindowSignal);
}

/// Display enumeration.
pub trait DisplaySource {
    /// A fresh snapshot of every connected display.
    fn displays(&self) -> Vec<Display>;
}
