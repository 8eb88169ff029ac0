//! Error types for simulation operations.

use thiserror::Error;

/// Errors that can occur during simulation.
///
/// The rejection variants ([`SimError::InvalidJointHandle`],
/// [`SimError::StepInProgress`]) are recoverable: the operation was dropped
/// without touching any state and may be retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid body ID referenced.
    #[error("invalid body ID: {0}")]
    InvalidBodyId(u64),

    /// Joint handle does not refer to a live joint.
    #[error("invalid joint handle: index {index}, generation {generation}")]
    InvalidJointHandle {
        /// Slot index carried by the handle.
        index: u32,
        /// Generation carried by the handle.
        generation: u32,
    },

    /// Mutation attempted while the simulation is executing a step.
    #[error("simulation step in progress")]
    StepInProgress,

    /// Effective mass matrix has no inverse.
    #[error("effective mass matrix is singular")]
    DegenerateMass,

    /// Invalid joint parameter.
    #[error("invalid joint parameter: {reason}")]
    InvalidJointParameter {
        /// Description of the rejected value.
        reason: String,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Simulation diverged (`NaN` or `Inf` detected).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid mass properties.
    #[error("invalid mass properties: {reason}")]
    InvalidMassProperties {
        /// Description of what's wrong.
        reason: String,
    },
}

impl SimError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid joint parameter error.
    #[must_use]
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self::InvalidJointParameter {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass properties error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            reason: reason.into(),
        }
    }

    /// Check if this error rejected an external mutation (stale handle or
    /// step in progress).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::InvalidJointHandle { .. } | Self::StepInProgress)
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::InvalidBodyId(42);
        assert!(err.to_string().contains("42"));

        let err = SimError::InvalidJointHandle {
            index: 3,
            generation: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('9'));

        let err = SimError::diverged("NaN in velocity");
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(SimError::StepInProgress.is_rejection());
        assert!(SimError::InvalidJointHandle {
            index: 0,
            generation: 0
        }
        .is_rejection());
        assert!(!SimError::DegenerateMass.is_rejection());

        let err = SimError::diverged("test");
        assert!(err.is_diverged());
        assert!(!err.is_config_error());

        let err = SimError::invalid_config("bad value");
        assert!(err.is_config_error());
        assert!(!err.is_diverged());
    }
}
