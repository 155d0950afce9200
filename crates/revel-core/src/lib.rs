//! Revel Reversible Computation Core
//!
//! This crate provides the symbolic layer of Revel: quantum integers and
//! expressions over them, an operation stream with exact inverses, and a
//! library of reversible arithmetic routines. Everything that is emitted goes
//! to whichever [`Sink`] is on top of the thread-local context stack, so the
//! same routine can be simulated, counted, or captured for later replay.
//!
//! # Overview
//!
//! Programs are written against registers ([`Qureg`], [`Quint`]) and
//! expressions ([`RValue`]). Every mutation becomes an [`Operation`]. Composite
//! operations decompose on demand into primitive toggles and phase flips,
//! each under a [`QubitIntersection`] guard.
//!
//! # Core Components
//!
//! - **Registers**: [`Qubit`], [`Qureg`] and the integer view [`Quint`]
//! - **Guards**: [`QubitIntersection`] for conjunctive controls, with the
//!   ambient stack managed by [`controlled_by`]
//! - **Expressions**: [`RValue`] values that can be materialized into fresh
//!   registers and erased again
//! - **Operations**: [`Operation`] with [`Operation::inverse`] and
//!   [`Operation::mutate_state`] for classical execution
//! - **Sinks**: the [`Sink`] trait, plus [`Capture`] and [`GateCounts`]
//! - **Calling convention**: [`SemiQuantum`] routines accepting registers,
//!   constants or expressions for each parameter
//! - **Arithmetic**: addition, comparison, multiplication, division and
//!   table lookup in [`arithmetic`]
//!
//! # Example: Counting Gates of an Adder
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use revel_core::{CoreResult, GateCounts, qalloc_int, qfree, with_sink};
//!
//! let counts = Rc::new(RefCell::new(GateCounts::new()));
//! with_sink(&counts, || -> CoreResult<()> {
//!     let a = qalloc_int(4, "a")?;
//!     let b = qalloc_int(4, "b")?;
//!     a.add_assign(&b)?;
//!     // Releases are LIFO.
//!     qfree(b.qureg(), true)?;
//!     qfree(a.qureg(), true)
//! })
//! .unwrap();
//!
//! assert!(counts.borrow().toggles_with_at_least(2) > 0);
//! assert_eq!(counts.borrow().live_qubits, 0);
//! ```
//!
//! # Example: Capturing and Inverting
//!
//! ```rust
//! use revel_core::{capture, inverted, qalloc_int};
//!
//! let ((), ops) = capture(|| {
//!     let a = qalloc_int(3, "a")?;
//!     inverted(|| a.xor_assign(5u64))
//! })
//! .unwrap();
//! assert!(ops.iter().any(|op| op.name() == "xor_equal"));
//! ```

pub mod alloc;
pub mod arithmetic;
pub mod capture;
pub mod context;
pub mod error;
pub mod guard;
pub mod int_buf;
pub mod inverse;
pub mod operation;
pub mod quint;
pub mod qubit;
pub mod rvalue;
pub mod semi_quantum;
pub mod sink;
pub mod util;

pub use alloc::{hold, pad, qalloc, qalloc_int, qalloc_qubit, qfree, with_qalloc, with_qubit};
pub use arithmetic::LookupTable;
pub use capture::{Capture, GateCounts, capture};
pub use context::{
    ControlScope, SharedSink, SinkScope, controlled_by, current_controls, emit, emit_under,
    enter_sink, with_controls, with_sink,
};
pub use error::{CoreError, CoreResult};
pub use guard::QubitIntersection;
pub use int_buf::IntBuf;
pub use inverse::inverted;
pub use operation::Operation;
pub use quint::Quint;
pub use qubit::{Qubit, Qureg, RegisterId};
pub use rvalue::{LessThan, Lookup, RValue, unary};
pub use semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
pub use sink::{ClassicalSimState, MbuStart, Sink};
