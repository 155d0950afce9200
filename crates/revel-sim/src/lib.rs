//! `revel-sim`: classical simulation of reversible programs.
//!
//! [`ClassicalSim`] is a [`Sink`](revel_core::Sink) that tracks a concrete
//! boolean per live qubit plus a global phase. It is the oracle the rest of
//! Revel is tested against:
//!
//! - releases are checked to be zero unless declared dirty
//! - reading an unallocated qubit is an error
//! - measurement-based uncomputation outcomes come from an injectable
//!   [`OutcomeChooser`] and the phase fixup is verified
//! - [`SimSnapshot`] compares whole states, so an operation followed by its
//!   inverse can be checked to be the identity
//!
//! # Quick start
//!
//! ```rust
//! use revel_core::{CoreResult, qalloc_int, qfree, with_sink};
//! use revel_sim::ClassicalSim;
//!
//! let sim = ClassicalSim::new().shared();
//! with_sink(&sim, || -> CoreResult<()> {
//!     let a = qalloc_int(4, "a")?;
//!     a.init(2u64)?;
//!     a.add_assign(3u64)?;
//!     assert_eq!(sim.borrow().resolve_quint(&a)?, 5);
//!     qfree(a.qureg(), true)
//! })
//! .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod state;
pub mod testing;

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use state::{ClassicalSim, OutcomeChooser, SimSnapshot};
pub use testing::{Sample, assert_semi_quantum_func_is_consistent, check_consistency, sim_call};
