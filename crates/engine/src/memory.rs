//! In-memory host.
//!
//! Windows and displays are plain data. Unless recording is switched off,
//! every bounds write and signal the engine issues is kept so callers can
//! inspect exactly what happened.

use crate::host::{DisplaySource, WindowHost, WindowSignal};
use crate::{HostError, WindowKind};
use glasspane_core_layout::{Display, DisplayId, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of one in-memory window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWindow {
    pub bounds: Rect,
    pub visible: bool,
    pub destroyed: bool,
}

/// A [`WindowHost`] and [`DisplaySource`] backed by plain data.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    windows: BTreeMap<WindowKind, MemoryWindow>,
    displays: Vec<Display>,
    recording: bool,
    writes: Vec<(WindowKind, Rect)>,
    signals: Vec<(WindowKind, WindowSignal)>,
}

impl MemoryHost {
    /// A host with no windows. Writes and signals are recorded.
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            windows: BTreeMap::new(),
            displays,
            recording: true,
            writes: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Turn the write and signal logs on or off.
    ///
    /// A long-running host should switch them off: they grow with every
    /// animation frame.
    pub fn recording(mut self, on: bool) -> Self {
        self.recording = on;
        if !on {
            self.writes = Vec::new();
            self.signals = Vec::new();
        }
        self
    }

    /// One 1920x1080 primary display with a 40px taskbar at the bottom.
    pub fn single_display() -> Self {
        Self::new(vec![Display::new(
            1,
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1040),
        )
        .primary()])
    }

    /// The single display plus a 2560x1440 display to its right with a
    /// 25px menu bar.
    pub fn dual_display() -> Self {
        let mut host = Self::single_display();
        host.displays.push(
            Display::new(
                2,
                Rect::new(1920, 0, 2560, 1440),
                Rect::new(1920, 25, 2560, 1415),
            )
            .with_scale_factor(2.0),
        );
        host
    }

    /// Builder form of [`Self::add_window`].
    pub fn with_window(mut self, kind: WindowKind, bounds: Rect, visible: bool) -> Self {
        self.add_window(kind, bounds, visible);
        self
    }

    /// Create (or replace) a window.
    pub fn add_window(&mut self, kind: WindowKind, bounds: Rect, visible: bool) {
        self.windows.insert(
            kind,
            MemoryWindow {
                bounds,
                visible,
                destroyed: false,
            },
        );
    }

    pub fn window(&self, kind: WindowKind) -> Option<&MemoryWindow> {
        self.windows.get(&kind)
    }

    /// Mark a window destroyed. It keeps its last bounds for inspection.
    pub fn destroy(&mut self, kind: WindowKind) {
        if let Some(window) = self.windows.get_mut(&kind) {
            window.destroyed = true;
            window.visible = false;
        }
    }

    /// Move a window without recording a write, as a user drag would.
    pub fn place(&mut self, kind: WindowKind, bounds: Rect) {
        if let Some(window) = self.windows.get_mut(&kind) {
            window.bounds = bounds;
        }
    }

    pub fn set_displays(&mut self, displays: Vec<Display>) {
        self.displays = displays;
    }

    pub fn add_display(&mut self, display: Display) {
        self.displays.push(display);
    }

    /// Unplug a display. The windows on it stay where they are.
    pub fn remove_display(&mut self, id: DisplayId) -> Option<Display> {
        let index = self.displays.iter().position(|d| d.id == id)?;
        Some(self.displays.remove(index))
    }

    /// Every bounds write, in order.
    pub fn writes(&self) -> &[(WindowKind, Rect)] {
        &self.writes
    }

    /// Bounds writes to one window, in order.
    pub fn writes_for(&self, kind: WindowKind) -> Vec<Rect> {
        self.writes
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| *r)
            .collect()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Every signal delivered, in order.
    pub fn signals(&self) -> &[(WindowKind, WindowSignal)] {
        &self.signals
    }

    pub fn clear_signals(&mut self) {
        self.signals.clear();
    }

    fn live(&self, kind: WindowKind) -> Option<&MemoryWindow> {
        self.windows.get(&kind).filter(|w| !w.destroyed)
    }
}

impl WindowHost for MemoryHost {
    fn bounds(&self, kind: WindowKind) -> Option<Rect> {
        self.live(kind).map(|w| w.bounds)
    }

    fn set_bounds(&mut self, kind: WindowKind, bounds: Rect) -> Result<(), HostError> {
        let window = self.windows.get_mut(&kind).ok_or(HostError::Missing(kind))?;
        if window.destroyed {
            return Err(HostError::Destroyed(kind));
        }
        window.bounds = bounds;
        if self.recording {
            self.writes.push((kind, bounds));
        }
        Ok(())
    }

    fn is_visible(&self, kind: WindowKind) -> bool {
        self.live(kind).is_some_and(|w| w.visible)
    }

    fn is_destroyed(&self, kind: WindowKind) -> bool {
        self.windows.get(&kind).is_some_and(|w| w.destroyed)
    }

    fn show(&mut self, kind: WindowKind) {
        if let Some(window) = self.windows.get_mut(&kind).filter(|w| !w.destroyed) {
            window.visible = true;
        }
    }

    fn hide(&mut self, kind: WindowKind) {
        if let Some(window) = self.windows.get_mut(&kind) {
            window.visible = false;
        }
    }

    fn signal(&mut self, kind: WindowKind, signal: WindowSignal) {
        if self.recording && self.live(kind).is_some() {
            self.signals.push((kind, signal));
        }
    }
}

impl DisplaySource for MemoryHost {
    fn displays(&self) -> Vec<Display> {
        self.displays.clone()
    }
}
