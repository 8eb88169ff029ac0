//! Effective mass of a point constraint on a single body.
//!
//! For a body point at offset `r` from the center of mass, the Jacobian of
//! `C = p - target` is `J = [I, skew(r)]` and the constraint-space inverse
//! mass is
//!
//! ```text
//! K = J M⁻¹ Jᵀ + gamma I
//!   = [ m⁻¹ + i⁻¹ r.y² + gamma     -i⁻¹ r.x r.y          ]
//!     [ -i⁻¹ r.x r.y               m⁻¹ + i⁻¹ r.x² + gamma ]
//! ```
//!
//! `K` is symmetric positive semi-definite. It is singular only when the
//! body has no mass response in some direction and the constraint is rigid,
//! in which case the effective mass is defined to be the zero matrix.

use nalgebra::{Matrix2, Vector2};
use sim_types::{Result, SimError};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Builds the softened inverse-mass matrix `K` for a point constraint.
#[must_use]
pub fn point_inverse_mass(
    inv_mass: f64,
    inv_inertia: f64,
    r: &Vector2<f64>,
    gamma: f64,
) -> Matrix2<f64> {
    let k00 = inv_mass + inv_inertia * r.y * r.y + gamma;
    let k01 = -inv_inertia * r.x * r.y;
    let k11 = inv_mass + inv_inertia * r.x * r.x + gamma;
    Matrix2::new(k00, k01, k01, k11)
}

/// Inverts `K`, failing with [`SimError::DegenerateMass`] when it is
/// singular or the inverse would not be finite.
pub fn try_invert(k: &Matrix2<f64>) -> Result<Matrix2<f64>> {
    k.try_inverse()
        .filter(|inverse| inverse.iter().all(|x| x.is_finite()))
        .ok_or(SimError::DegenerateMass)
}

/// Inverted effective mass with a record of whether the singular fallback
/// was used.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EffectiveMass {
    /// `K⁻¹`, or the zero matrix when `K` is singular.
    pub matrix: Matrix2<f64>,
    /// Set when `K` could not be inverted.
    pub degenerate: bool,
}

impl Default for EffectiveMass {
    fn default() -> Self {
        Self {
            matrix: Matrix2::zeros(),
            degenerate: false,
        }
    }
}

impl EffectiveMass {
    /// Inverts `k`, falling back to the zero matrix if it is singular.
    ///
    /// A zero effective mass produces zero impulses, so a fully static body
    /// under a rigid constraint is simply left alone.
    #[must_use]
    pub fn from_inverse_mass(k: &Matrix2<f64>) -> Self {
        match try_invert(k) {
            Ok(matrix) => Self {
                matrix,
                degenerate: false,
            },
            Err(err) => {
                debug!(%err, "effective mass fell back to zero");
                Self {
                    matrix: Matrix2::zeros(),
                    degenerate: true,
                }
            }
        }
    }

    /// Solves `K x = rhs` using the stored inverse.
    #[must_use]
    pub fn solve(&self, rhs: &Vector2<f64>) -> Vector2<f64> {
        self.matrix * rhs
    }
}
