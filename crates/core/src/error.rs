//! Unified error type for the galform evolution engine.
//!
//! Mirrors the error-kind taxonomy the engine is built around: invariant
//! violations are fatal to the enclosing forest, resource exhaustion is
//! fatal to the run, missing capabilities and unknown options are
//! recoverable (logged, the caller decides what to skip). Numerical
//! degenerate cases (Coulomb log non-positive, zero satellite mass) are
//! *not* represented here — they are clamped to sentinel values at the
//! call site and never surface as an `Err`.

use crate::ids::ForestId;
use thiserror::Error;

/// Result type alias used throughout the engine.
pub type EvolutionResult<T> = std::result::Result<T, EvolutionError>;

/// Errors the engine can raise at its public boundaries.
///
/// Every public entry point returns a status in one of these classes.
/// See the classification methods below for how a caller should react.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// A structural invariant was violated (multiple centrals in a halo,
    /// corrupted property pointer, index overflow, phase end without a
    /// matching start). Fatal to the enclosing forest; other forests are
    /// unaffected.
    #[error("invariant violation in forest {forest:?} at halo {halo_nr}: {message}")]
    InvariantViolation {
        /// Forest in which the violation was detected.
        forest: ForestId,
        /// Halo index at which the violation was detected.
        halo_nr: i32,
        /// Human-readable description.
        message: String,
    },

    /// A resource limit was exceeded (property allocation, queue
    /// capacity, output buffer growth). Fatal to the run.
    #[error("resource exhausted: {resource} (limit {limit}, requested {requested})")]
    ResourceExhausted {
        /// Name of the exhausted resource.
        resource: String,
        /// The configured limit.
        limit: usize,
        /// What was requested.
        requested: usize,
    },

    /// A pipeline step needs a runtime capability that has not been
    /// initialized (e.g. property serialization). The step's side
    /// effects are skipped; evolution continues.
    #[error("missing capability '{capability}' required by step '{step}'")]
    MissingCapability {
        /// Name of the step that could not run.
        step: String,
        /// Name of the missing capability.
        capability: String,
    },

    /// An option or property name was not recognized. Returned as a
    /// "not found" sentinel to the caller; never panics.
    #[error("unknown option or name: {name}")]
    UnknownOption {
        /// The unrecognized name.
        name: String,
    },

    /// A caller violated the contract of a public entry point (e.g.
    /// calling `evolve` with an unvalidated context). Fatal to the run —
    /// this indicates a programmer error, not bad input data.
    #[error("contract violation: {message}")]
    ContractViolation {
        /// Human-readable description.
        message: String,
    },
}

impl EvolutionError {
    /// Build an [`EvolutionError::InvariantViolation`].
    pub fn invariant(forest: ForestId, halo_nr: i32, message: impl Into<String>) -> Self {
        EvolutionError::InvariantViolation {
            forest,
            halo_nr,
            message: message.into(),
        }
    }

    /// Build an [`EvolutionError::ResourceExhausted`].
    pub fn resource_exhausted(
        resource: impl Into<String>,
        limit: usize,
        requested: usize,
    ) -> Self {
        EvolutionError::ResourceExhausted {
            resource: resource.into(),
            limit,
            requested,
        }
    }

    /// Build an [`EvolutionError::MissingCapability`].
    pub fn missing_capability(step: impl Into<String>, capability: impl Into<String>) -> Self {
        EvolutionError::MissingCapability {
            step: step.into(),
            capability: capability.into(),
        }
    }

    /// Build an [`EvolutionError::UnknownOption`].
    pub fn unknown_option(name: impl Into<String>) -> Self {
        EvolutionError::UnknownOption { name: name.into() }
    }

    /// Build an [`EvolutionError::ContractViolation`].
    pub fn contract_violation(message: impl Into<String>) -> Self {
        EvolutionError::ContractViolation {
            message: message.into(),
        }
    }

    /// True for errors that abort only the enclosing forest's evolution;
    /// other forests already completed or queued are unaffected.
    pub fn is_fatal_to_forest(&self) -> bool {
        matches!(self, EvolutionError::InvariantViolation { .. })
    }

    /// True for errors that abort the whole run.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            EvolutionError::ResourceExhausted { .. } | EvolutionError::ContractViolation { .. }
        )
    }

    /// True for errors that are logged and recovered from locally —
    /// the caller skips the affected step or treats the name as absent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvolutionError::MissingCapability { .. } | EvolutionError::UnknownOption { .. }
        )
    }

    /// The forest this error pertains to, if any.
    pub fn forest(&self) -> Option<ForestId> {
        match self {
            EvolutionError::InvariantViolation { forest, .. } => Some(*forest),
            _ => None,
        }
    }
}
