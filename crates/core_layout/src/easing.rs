//! Easing curves for header motion.

use serde::{Deserialize, Serialize};

/// Overshoot constant for [`Easing::EaseOutBack`].
const BACK_OVERSHOOT: f64 = 1.70158;

/// Maps linear progress in `[0, 1]` onto an eased fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Slow start, used when sliding off-screen.
    EaseInCubic,
    /// Fast start, gentle stop. Steps and display moves.
    EaseOutCubic,
    /// Sharper variant of ease-out, used for edge snapping.
    EaseOutQuart,
    /// Overshoots the target slightly and settles back.
    EaseOutBack,
}

impl Easing {
    /// Apply the curve. Progress is clamped to `[0, 1]` first; NaN passes
    /// through so callers can reject it.
    pub fn apply(self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseOutBack => {
                let c3 = BACK_OVERSHOOT + 1.0;
                let t1 = t - 1.0;
                1.0 + c3 * t1.powi(3) + BACK_OVERSHOOT * t1.powi(2)
            }
        }
    }
}

/// Linear interpolation.
#[inline]
pub fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start + (end - start) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 5] = [
        Easing::Linear,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseOutQuart,
        Easing::EaseOutBack,
    ];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_endpoints_are_exact() {
        for easing in ALL {
            assert!(close(easing.apply(0.0), 0.0), "{:?} at 0", easing);
            assert!(close(easing.apply(1.0), 1.0), "{:?} at 1", easing);
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        for easing in ALL {
            assert!(close(easing.apply(-0.5), easing.apply(0.0)));
            assert!(close(easing.apply(3.0), easing.apply(1.0)));
        }
    }

    #[test]
    fn test_ease_in_is_slow_at_start() {
        assert!(close(Easing::EaseInCubic.apply(0.5), 0.125));
        assert!(Easing::EaseInCubic.apply(0.25) < 0.25);
    }

    #[test]
    fn test_ease_out_is_fast_at_start() {
        assert!(close(Easing::EaseOutCubic.apply(0.5), 0.875));
        assert!(close(Easing::EaseOutQuart.apply(0.5), 0.9375));
    }

    #[test]
    fn test_back_overshoots_before_settling() {
        let peak = (1..100)
            .map(|i| Easing::EaseOutBack.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
        assert!(peak < 1.2);
    }

    #[test]
    fn test_nan_passes_through() {
        assert!(Easing::EaseOutCubic.apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(100.0, 200.0, 0.0), 100.0);
        assert_eq!(lerp(100.0, 200.0, 0.5), 150.0);
        assert_eq!(lerp(100.0, 200.0, 1.0), 200.0);
        assert_eq!(lerp(0.0, -1940.0, 0.5), -970.0);
    }
}
