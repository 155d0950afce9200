//! Reversible arithmetic built on the calling convention.
//!
//! Every routine is a [`SemiQuantum`](crate::semi_quantum::SemiQuantum)
//! static with a classical reference plus a typed wrapper function. The
//! wrappers take `impl Into<Arg>` so callers can pass registers, constants,
//! or expressions.

pub mod add;
pub mod cmp;
pub mod coherent_mul;
pub mod gates;
pub mod lookup;
pub mod measure;
pub mod mul;
pub mod mult_add;
pub mod quotient;
pub mod xor;

pub use add::{DO_ADDITION, do_addition};
pub use cmp::{DO_IF_LESS_THAN, do_if_less_than};
pub use coherent_mul::{INIT_MUL, INIT_SQUARE, init_mul, init_square};
pub use gates::{cnot, phase_flip, swap, toggle};
pub use lookup::{
    DEL_XOR_LOOKUP, DO_PHASE_FLIP_LOOKUP, DO_XOR_LOOKUP, LookupTable, del_xor_lookup,
    do_phase_flip_lookup, do_xor_lookup,
};
pub use measure::{measure, measure_bit, measurement_based_uncomputation};
pub use mul::{DO_MULTIPLICATION, do_multiplication};
pub use mult_add::{DO_MULTIPLY_ADD, do_multiply_add};
pub use quotient::{DO_INIT_SMALL_QUOTIENT, do_div_rem, do_init_small_quotient};
pub use xor::{DO_XOR, DO_XOR_CONST, do_xor, do_xor_const};

use crate::error::{CoreError, CoreResult};
use crate::qubit::Qureg;

pub(crate) fn ensure_disjoint(routine: &str, a: &Qureg, b: &Qureg) -> CoreResult<()> {
    if a.overlaps(b) {
        return Err(CoreError::InvalidArgument(format!(
            "{routine}: {a} and {b} must not overlap"
        )));
    }
    Ok(())
}
