//! Soft constraint coefficients.
//!
//! A soft constraint behaves like a damped spring instead of a rigid
//! equality. Integrating the spring implicitly over one step of length `h`
//! with stiffness `k` and damping `d` yields two solver coefficients:
//!
//! ```text
//! gamma = 1 / (h * (d + h * k))      (inverse mass, added to the K diagonal)
//! beta  = h * k * gamma              (inverse time, scales position error)
//! ```
//!
//! With `k = d = 0` the raw denominator is zero; both coefficients are then
//! defined as zero and the constraint degenerates to a plain velocity
//! constraint.

use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-step coefficients of a soft constraint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoftnessCoefficients {
    /// Softness term with units of inverse mass.
    pub gamma: f64,
    /// Position correction gain with units of inverse time.
    pub beta: f64,
}

impl SoftnessCoefficients {
    /// Coefficients of a rigid, undamped constraint.
    pub const RIGID: Self = Self {
        gamma: 0.0,
        beta: 0.0,
    };

    /// Computes the coefficients for the given stiffness, damping and step
    /// duration.
    #[must_use]
    pub fn compute(stiffness: f64, damping: f64, h: f64) -> Self {
        let gamma_raw = h * (damping + h * stiffness);
        let gamma = if gamma_raw != 0.0 {
            1.0 / gamma_raw
        } else {
            0.0
        };

        Self {
            gamma,
            beta: h * stiffness * gamma,
        }
    }

    /// Whether the constraint is rigid (no softening, no position feedback).
    #[must_use]
    pub fn is_rigid(&self) -> bool {
        self.gamma == 0.0 && self.beta == 0.0
    }
}

/// Spring stiffness and damping expressed in physical units.
///
/// Tuning a drag spring directly in N/m is awkward because the right value
/// scales with the dragged mass. [`LinearSpring::from_frequency`] derives
/// both coefficients from an oscillation frequency and a damping ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearSpring {
    /// Stiffness (N/m).
    pub stiffness: f64,
    /// Damping (N·s/m).
    pub damping: f64,
}

impl LinearSpring {
    /// Create a spring from raw coefficients.
    #[must_use]
    pub const fn new(stiffness: f64, damping: f64) -> Self {
        Self { stiffness, damping }
    }

    /// Spring that oscillates at `hertz` with the given damping ratio when
    /// attached to `mass`.
    ///
    /// ```text
    /// omega     = 2π · hertz
    /// stiffness = mass · omega²
    /// damping   = 2 · mass · ζ · omega
    /// ```
    ///
    /// # Example
    ///
    /// ```
    /// use sim_constraint::LinearSpring;
    ///
    /// let spring = LinearSpring::from_frequency(2.0, 5.0, 0.7);
    /// assert!(spring.stiffness > 0.0);
    /// assert!(spring.damping > 0.0);
    /// ```
    #[must_use]
    pub fn from_frequency(mass: f64, hertz: f64, damping_ratio: f64) -> Self {
        let omega = TAU * hertz;
        Self {
            stiffness: mass * omega * omega,
            damping: 2.0 * mass * damping_ratio * omega,
        }
    }

    /// Coefficients of this spring for a step of length `h`.
    #[must_use]
    pub fn coefficients(&self, h: f64) -> SoftnessCoefficients {
        SoftnessCoefficients::compute(self.stiffness, self.damping, h)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_spring_is_rigid() {
        for h in [1.0 / 240.0, 1.0 / 60.0, 0.1, 1.0] {
            let c = SoftnessCoefficients::compute(0.0, 0.0, h);
            assert_eq!(c.gamma, 0.0);
            assert_eq!(c.beta, 0.0);
            assert!(c.is_rigid());
        }
    }

    #[test]
    fn test_positive_stiffness_gives_positive_gamma() {
        for (k, d) in [(1.0, 0.0), (100.0, 5.0), (1e6, 1e3), (0.01, 0.0)] {
            let c = SoftnessCoefficients::compute(k, d, 1.0 / 60.0);
            assert!(c.gamma > 0.0);
            assert!(c.beta.is_finite());
            assert!(c.beta >= 0.0);
        }
    }

    #[test]
    fn test_damping_only() {
        // Pure damper: no position feedback
        let c = SoftnessCoefficients::compute(0.0, 4.0, 0.5);
        assert_relative_eq!(c.gamma, 0.5, epsilon = 1e-12);
        assert_eq!(c.beta, 0.0);
    }

    #[test]
    fn test_known_values() {
        // h = 0.1, k = 10, d = 1: gamma_raw = 0.1 * (1 + 1) = 0.2
        let c = SoftnessCoefficients::compute(10.0, 1.0, 0.1);
        assert_relative_eq!(c.gamma, 5.0, epsilon = 1e-12);
        assert_relative_eq!(c.beta, 0.1 * 10.0 * 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spring_from_frequency() {
        let spring = LinearSpring::from_frequency(1.0, 1.0, 1.0);
        assert_relative_eq!(spring.stiffness, TAU * TAU, epsilon = 1e-9);
        assert_relative_eq!(spring.damping, 2.0 * TAU, epsilon = 1e-9);

        let c = spring.coefficients(1.0 / 60.0);
        assert!(c.gamma > 0.0);
    }
}
