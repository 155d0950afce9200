//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while building or running reversible computations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A calling-convention parameter received a value outside its category.
    #[error("{routine}: parameter '{param}' expected {expected}, got {got}")]
    TypeMismatch {
        /// Routine being called.
        routine: String,
        /// Parameter name.
        param: String,
        /// Human readable category that was expected.
        expected: &'static str,
        /// Debug rendering of the offending argument.
        got: String,
    },

    /// A required argument was not supplied and has no default.
    #[error("{routine}: missing argument '{param}'")]
    MissingArgument {
        /// Routine being called.
        routine: String,
        /// Parameter name.
        param: String,
    },

    /// An argument was supplied for a parameter the routine does not declare.
    #[error("{routine}: unexpected argument '{param}'")]
    UnexpectedArgument {
        /// Routine being called.
        routine: String,
        /// Argument name.
        param: String,
    },

    /// A register was released out of LIFO order.
    #[error("Released {got} but the most recently allocated live register is {expected}")]
    ReleaseOrder {
        /// The register that had to be released next.
        expected: String,
        /// The register that was released instead.
        got: String,
    },

    /// A register was released while still holding a non-zero value.
    #[error("Released register {register} holding non-zero value {value:#b}")]
    ReleasedNonZero {
        /// The released register.
        register: String,
        /// The value it still held.
        value: u64,
    },

    /// A location was read or written that was never allocated.
    #[error("Unknown location {0}")]
    UnknownLocation(String),

    /// A register was allocated twice.
    #[error("Location {0} is already allocated")]
    DoubleAllocation(String),

    /// The sink cannot consume this operation.
    #[error("Operation '{operation}' is not implemented by sink '{sink}'")]
    NotImplemented {
        /// Sink name.
        sink: String,
        /// Operation name.
        operation: &'static str,
    },

    /// A primitive reached the decomposition step instead of a sink.
    #[error("Unprocessed terminal operation '{0}'")]
    UnprocessedTerminal(&'static str),

    /// The operation has no inverse.
    #[error("Operation '{0}' is not invertible")]
    NonInvertible(&'static str),

    /// An operation was emitted outside of any sink scope.
    #[error("No active sink")]
    NoActiveSink,

    /// The active sink was re-entered while it was already handling an operation.
    #[error("The active sink is busy")]
    SinkBusy,

    /// The routine has no registered classical reference.
    #[error("Routine '{0}' has no classical reference implementation")]
    NoClassicalReference(String),

    /// A measurement was attempted under a non-trivial guard.
    #[error("Cannot measure {0} under a control")]
    ControlledMeasurement(String),

    /// Measurement-based uncomputation left the global phase changed.
    #[error("Phase fixup for {0} did not restore the global phase")]
    PhaseFixupMismatch(String),

    /// No measurement-based uncomputation is open for this register.
    #[error("No measurement-based uncomputation started for {0}")]
    NoPendingMbu(String),

    /// A register is too wide to hold as a machine integer.
    #[error("Register {register} has {len} bits, at most 64 can be resolved")]
    ValueTooWide {
        /// The register.
        register: String,
        /// Its width.
        len: usize,
    },

    /// Argument values violate a routine precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
