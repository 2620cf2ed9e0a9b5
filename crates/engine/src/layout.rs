//! Debounced companion/auxiliary layout passes.
//!
//! Bursts of move/resize notifications are coalesced into one pass. Passes
//! are skipped while the header is being dragged: either the host reported
//! an explicit drag, or the header moved less than `drag_threshold` ago.
//! The second check is a timing heuristic and can misfire on slow systems
//! or rapid programmatic moves, so the threshold is configurable.

use crate::host::WindowHost;
use crate::scheduler::TaskHandle;
use crate::WindowKind;
use glasspane_core_layout::{
    determine_strategy, position_auxiliary, position_companions, AuxiliaryRules, CompanionRules,
    Display, DisplayResolver, LayoutStrategy, Rect, StrategyRules,
};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Everything a layout pass needs to know.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRules {
    pub strategy: StrategyRules,
    pub companions: CompanionRules,
    pub auxiliary: AuxiliaryRules,
    /// Coalescing window for layout requests.
    pub debounce: Duration,
    /// Header moves closer together than this count as a drag.
    pub drag_threshold: Duration,
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self {
            strategy: StrategyRules::default(),
            companions: CompanionRules::default(),
            auxiliary: AuxiliaryRules::default(),
            debounce: Duration::from_millis(16),
            drag_threshold: Duration::from_millis(100),
        }
    }
}

/// Result of [`LayoutController::run_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Applied,
    /// A pass was already running.
    Busy,
    /// The host reported an explicit drag.
    Dragging,
    /// The header moved recently; try again at the given instant.
    Deferred(Instant),
    /// No header window to lay out around.
    NoHeader,
    /// The group is hidden.
    HeaderHidden,
}

/// Layout state: the pending debounced pass, drag tracking and locks.
pub struct LayoutController {
    rules: LayoutRules,
    pending: Option<TaskHandle>,
    busy: bool,
    dragging: bool,
    last_header_move: Option<Instant>,
    locked: BTreeSet<WindowKind>,
    strategy: Option<LayoutStrategy>,
    header_display: Option<Display>,
}

impl LayoutController {
    pub fn new(rules: LayoutRules) -> Self {
        Self {
            rules,
            pending: None,
            busy: false,
            dragging: false,
            last_header_move: None,
            locked: BTreeSet::new(),
            strategy: None,
            header_display: None,
        }
    }

    pub fn rules(&self) -> &LayoutRules {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: LayoutRules) {
        self.rules = rules;
    }

    /// Whether a debounced pass is already waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    pub(crate) fn set_pending(&mut self, handle: TaskHandle) {
        self.pending = Some(handle);
    }

    /// The pending pass has fired.
    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Drop the pending pass, e.g. when running one immediately.
    pub(crate) fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    pub(crate) fn note_header_moved(&mut self, now: Instant) {
        self.last_header_move = Some(now);
    }

    pub(crate) fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub(crate) fn end_drag(&mut self, now: Instant) {
        self.dragging = false;
        self.last_header_move = Some(now);
    }

    /// Whether the header counts as being dragged at `now`.
    pub fn is_dragging(&self, now: Instant) -> bool {
        self.dragging || self.recently_moved(now).is_some()
    }

    /// When the drag heuristic stops firing, if it is firing at `now`.
    fn recently_moved(&self, now: Instant) -> Option<Instant> {
        let last = self.last_header_move?;
        let settles_at = last + self.rules.drag_threshold;
        (now < settles_at).then_some(settles_at)
    }

    /// Stop auto-positioning `kind` until the header changes display.
    pub fn lock(&mut self, kind: WindowKind) {
        if kind != WindowKind::Header && self.locked.insert(kind) {
            debug!("Locked {}", kind);
        }
    }

    pub fn unlock(&mut self, kind: WindowKind) {
        if self.locked.remove(&kind) {
            debug!("Unlocked {}", kind);
        }
    }

    pub fn is_locked(&self, kind: WindowKind) -> bool {
        self.locked.contains(&kind)
    }

    /// Strategy chosen by the most recent pass.
    pub fn strategy(&self) -> Option<LayoutStrategy> {
        self.strategy
    }

    /// The header's display as of the most recent pass or move.
    pub fn header_display(&self) -> Option<&Display> {
        self.header_display.as_ref()
    }

    pub(crate) fn remember_header_display(&mut self, display: Display) {
        self.header_display = Some(display);
    }

    /// Reposition every dependent window around the header.
    pub fn run_pass<H: WindowHost>(
        &mut self,
        host: &mut H,
        resolver: &DisplayResolver,
        now: Instant,
    ) -> PassOutcome {
        self.pass(host, resolver, now, true)
    }

    /// Like [`Self::run_pass`], but ignores the recent-move heuristic.
    ///
    /// Used to correct drift after the group reappears. An explicit drag
    /// still wins.
    pub fn run_forced_pass<H: WindowHost>(
        &mut self,
        host: &mut H,
        resolver: &DisplayResolver,
        now: Instant,
    ) -> PassOutcome {
        self.pass(host, resolver, now, false)
    }

    fn pass<H: WindowHost>(
        &mut self,
        host: &mut H,
        resolver: &DisplayResolver,
        now: Instant,
        heuristic: bool,
    ) -> PassOutcome {
        if self.busy {
            return PassOutcome::Busy;
        }
        if self.dragging {
            debug!("Skipping layout pass: header is being dragged");
            return PassOutcome::Dragging;
        }
        if let Some(settles_at) = self.recently_moved(now).filter(|_| heuristic) {
            debug!("Skipping layout pass: header moved recently");
            return PassOutcome::Deferred(settles_at);
        }
        let Some(header) = host.bounds(WindowKind::Header) else {
            debug!("Skipping layout pass: no header window");
            return PassOutcome::NoHeader;
        };
        if !host.is_visible(WindowKind::Header) {
            trace!("Skipping layout pass: header hidden");
            return PassOutcome::HeaderHidden;
        }

        self.busy = true;

        let display = resolver.current_display(Some(&header)).clone();
        let work_area = display.work_area;
        let strategy = determine_strategy(&header, &work_area, &self.rules.strategy);
        self.release_locks(host, resolver, &display);

        let size_of = |host: &H, kind: WindowKind| {
            if host.is_visible(kind) && !self.locked.contains(&kind) {
                host.bounds(kind).map(|b| b.size())
            } else {
                None
            }
        };
        let first = size_of(host, WindowKind::CompanionA);
        let second = size_of(host, WindowKind::CompanionB);
        let placement = position_companions(
            &header,
            &work_area,
            &strategy,
            first,
            second,
            &self.rules.companions,
        );
        apply(host, WindowKind::CompanionA, placement.first);
        apply(host, WindowKind::CompanionB, placement.second);

        if let Some(size) = size_of(host, WindowKind::Auxiliary) {
            let obstacles: Vec<Rect> = [WindowKind::CompanionA, WindowKind::CompanionB]
                .into_iter()
                .filter(|&kind| host.is_visible(kind))
                .filter_map(|kind| host.bounds(kind))
                .collect();
            let placed =
                position_auxiliary(&header, &work_area, size, &obstacles, &self.rules.auxiliary);
            trace!("Auxiliary anchored {:?}", placed.anchor);
            apply(host, WindowKind::Auxiliary, Some(placed.rect));
        }

        if self.strategy.map(|s| s.name) != Some(strategy.name) {
            debug!("Layout strategy is now {:?}", strategy.name);
        }
        self.strategy = Some(strategy);
        self.header_display = Some(display);
        self.busy = false;
        PassOutcome::Applied
    }

    /// Release locks on windows that are no longer on the header's display.
    fn release_locks<H: WindowHost>(&mut self, host: &H, resolver: &DisplayResolver, header_display: &Display) {
        let stale: Vec<WindowKind> = self
            .locked
            .iter()
            .copied()
            .filter(|&kind| {
                host.bounds(kind)
                    .map(|b| resolver.current_display(Some(&b)).id != header_display.id)
                    .unwrap_or(true)
            })
            .collect();
        for kind in stale {
            info!("Header changed display, releasing lock on {}", kind);
            self.locked.remove(&kind);
        }
    }
}

/// Write `bounds` unless the window is already there.
fn apply<H: WindowHost>(host: &mut H, kind: WindowKind, bounds: Option<Rect>) {
    let Some(bounds) = bounds else {
        return;
    };
    if host.bounds(kind) == Some(bounds) {
        return;
    }
    if let Err(e) = host.set_bounds(kind, bounds) {
        warn!("Failed to position {}: {}", kind, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DisplaySource;
    use crate::memory::MemoryHost;
    use glasspane_core_layout::StrategyName;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn host() -> MemoryHost {
        MemoryHost::single_display()
            .with_window(WindowKind::Header, Rect::new(528, 0, 344, 60), true)
            .with_window(WindowKind::CompanionA, Rect::new(0, 0, 400, 300), true)
            .with_window(WindowKind::CompanionB, Rect::new(0, 0, 600, 350), true)
    }

    fn resolver(host: &MemoryHost) -> DisplayResolver {
        DisplayResolver::new(host.displays()).unwrap()
    }

    #[test]
    fn test_pass_places_companions_under_header() {
        let t0 = Instant::now();
        let mut host = host();
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        assert_eq!(controller.run_pass(&mut host, &resolver, t0), PassOutcome::Applied);
        assert_eq!(host.bounds(WindowKind::CompanionA), Some(Rect::new(196, 60, 400, 300)));
        assert_eq!(host.bounds(WindowKind::CompanionB), Some(Rect::new(604, 60, 600, 350)));
        assert_eq!(controller.strategy().map(|s| s.name), Some(StrategyName::Below));
    }

    #[test]
    fn test_second_pass_writes_nothing() {
        let t0 = Instant::now();
        let mut host = host();
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.run_pass(&mut host, &resolver, t0);
        let before = host.bounds(WindowKind::CompanionB);
        host.clear_writes();
        controller.run_pass(&mut host, &resolver, t0 + ms(50));
        assert!(host.writes().is_empty());
        assert_eq!(host.bounds(WindowKind::CompanionB), before);
    }

    #[test]
    fn test_hidden_companion_is_left_alone() {
        let t0 = Instant::now();
        let mut host = host();
        host.hide(WindowKind::CompanionA);
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.run_pass(&mut host, &resolver, t0);
        assert_eq!(host.bounds(WindowKind::CompanionA), Some(Rect::new(0, 0, 400, 300)));
        // Alone, B centers on the header: 700 - 300
        assert_eq!(host.bounds(WindowKind::CompanionB), Some(Rect::new(400, 60, 600, 350)));
    }

    #[test]
    fn test_recent_header_move_defers_pass() {
        let t0 = Instant::now();
        let mut host = host();
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.note_header_moved(t0);
        assert!(controller.is_dragging(t0 + ms(50)));
        assert_eq!(
            controller.run_pass(&mut host, &resolver, t0 + ms(16)),
            PassOutcome::Deferred(t0 + ms(100))
        );
        assert!(host.writes().is_empty());
        assert!(!controller.is_dragging(t0 + ms(100)));
        assert_eq!(controller.run_pass(&mut host, &resolver, t0 + ms(100)), PassOutcome::Applied);
    }

    #[test]
    fn test_forced_pass_ignores_recent_move() {
        let t0 = Instant::now();
        let mut host = host();
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.note_header_moved(t0);
        assert_eq!(
            controller.run_forced_pass(&mut host, &resolver, t0 + ms(10)),
            PassOutcome::Applied
        );
        controller.begin_drag();
        assert_eq!(
            controller.run_forced_pass(&mut host, &resolver, t0 + ms(20)),
            PassOutcome::Dragging
        );
    }

    #[test]
    fn test_explicit_drag_skips_pass() {
        let t0 = Instant::now();
        let mut host = host();
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.begin_drag();
        assert_eq!(controller.run_pass(&mut host, &resolver, t0), PassOutcome::Dragging);
        controller.end_drag(t0);
        assert_eq!(
            controller.run_pass(&mut host, &resolver, t0 + ms(150)),
            PassOutcome::Applied
        );
    }

    #[test]
    fn test_hidden_header_skips_pass() {
        let t0 = Instant::now();
        let mut host = host();
        host.hide(WindowKind::Header);
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());
        assert_eq!(controller.run_pass(&mut host, &resolver, t0), PassOutcome::HeaderHidden);
    }

    #[test]
    fn test_auxiliary_falls_back_when_blocked() {
        let t0 = Instant::now();
        let mut host = host().with_window(WindowKind::Auxiliary, Rect::new(0, 0, 400, 600), true);
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.run_pass(&mut host, &resolver, t0);
        // Under the trigger would overlap the companions; moves beside the trailing edge
        assert_eq!(host.bounds(WindowKind::Auxiliary), Some(Rect::new(872 + 5, 0, 400, 600)));
    }

    #[test]
    fn test_locked_window_is_not_moved_on_same_display() {
        let t0 = Instant::now();
        let mut host = host().with_window(WindowKind::Auxiliary, Rect::new(1200, 500, 400, 600), true);
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.lock(WindowKind::Auxiliary);
        controller.run_pass(&mut host, &resolver, t0);
        assert_eq!(host.bounds(WindowKind::Auxiliary), Some(Rect::new(1200, 500, 400, 600)));
        assert!(controller.is_locked(WindowKind::Auxiliary));
    }

    #[test]
    fn test_lock_released_when_header_changes_display() {
        let t0 = Instant::now();
        let mut host = MemoryHost::dual_display()
            .with_window(WindowKind::Header, Rect::new(2400, 100, 345, 60), true)
            .with_window(WindowKind::Auxiliary, Rect::new(300, 300, 400, 600), true);
        let resolver = resolver(&host);
        let mut controller = LayoutController::new(LayoutRules::default());

        controller.lock(WindowKind::Auxiliary);
        controller.run_pass(&mut host, &resolver, t0);
        assert!(!controller.is_locked(WindowKind::Auxiliary));
        let aux = host.bounds(WindowKind::Auxiliary).unwrap();
        assert!(host.displays()[1].work_area.contains_rect(&aux));
    }

    #[test]
    fn test_header_is_never_locked() {
        let mut controller = LayoutController::new(LayoutRules::default());
        controller.lock(WindowKind::Header);
        assert!(!controller.is_locked(WindowKind::Header));
    }
}
