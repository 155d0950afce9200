//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced while simulating or checking reversible routines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// An error raised by the core while emitting or mutating.
    #[error("Core error: {0}")]
    Core(#[from] revel_core::CoreError),

    /// The symbolic body and the classical reference disagree.
    #[error("{routine}: {register} symbolic {symbolic:#x}, classical {classical:#x} ({inputs})")]
    Inconsistent {
        /// Routine under test.
        routine: String,
        /// The register whose final value differs.
        register: String,
        /// Value produced by the symbolic body.
        symbolic: u64,
        /// Value produced by the classical reference.
        classical: u64,
        /// Rendering of the sampled inputs.
        inputs: String,
    },

    /// Applying an operation and then undoing it did not restore the state.
    #[error("Round trip of {0} did not restore the simulator state")]
    RoundTripMismatch(String),

    /// The symbolic and classical runs disagree on the global phase.
    #[error("{routine}: phase differs between symbolic and classical runs for inputs {inputs}")]
    PhaseMismatch {
        /// Routine under test.
        routine: String,
        /// Rendering of the sampled inputs.
        inputs: String,
    },
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
