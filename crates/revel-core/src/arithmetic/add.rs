//! Ripple-carry addition (Cuccaro et al.).
//!
//! A forward MAJ sweep leaves the carry into bit `i + 1` in `offset[i]`; the
//! backward UMA sweep writes the sum bits and restores the offset and the
//! carry-in. Only the sum-producing step of each UMA is guarded, so the
//! remaining steps cancel when the guard is off.

use std::sync::LazyLock;

use super::ensure_disjoint;
use super::gates::toggle_bit;
use crate::alloc::pad;
use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::quint::Quint;
use crate::qubit::Qubit;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;

fn addition_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let offset = args.quint("offset")?;
    let carry_in = args.qubit("carry_in")?;
    let control = args.controls("control")?;
    let n = lvalue.len();
    if n == 0 {
        return Ok(());
    }
    ensure_disjoint("do_addition", lvalue.qureg(), offset.qureg())?;
    if lvalue.iter().chain(offset.iter()).any(|q| q == carry_in) {
        return Err(CoreError::InvalidArgument(format!(
            "do_addition: carry {carry_in} overlaps an operand"
        )));
    }
    pad(&offset.slice(..n), n, |offset| {
        ripple_add(lvalue, offset, carry_in, control)
    })
}

fn ripple_add(
    lvalue: &Quint,
    offset: &Quint,
    carry_in: &Qubit,
    control: &QubitIntersection,
) -> CoreResult<()> {
    let bits: Vec<(&Qubit, &Qubit)> = lvalue.iter().zip(offset.iter()).collect();
    let carry = |i: usize| if i == 0 { carry_in } else { bits[i - 1].1 };

    for (i, &(b, c)) in bits.iter().enumerate() {
        let a = carry(i);
        toggle_bit(b, c.into())?;
        toggle_bit(a, c.into())?;
        toggle_bit(c, QubitIntersection::new([a.clone(), b.clone()]))?;
    }
    for (i, &(b, c)) in bits.iter().enumerate().rev() {
        let a = carry(i);
        toggle_bit(c, QubitIntersection::new([a.clone(), b.clone()]))?;
        toggle_bit(b, control.and(a))?;
        toggle_bit(b, c.into())?;
        toggle_bit(a, c.into())?;
    }
    Ok(())
}

fn addition_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let offset = args.int("offset")?;
    let carry_in = args.int("carry_in")?;
    if args.bool("control")? {
        args.buf_mut("lvalue")?.add_assign(offset.wrapping_add(carry_in));
    }
    Ok(())
}

/// `lvalue += offset + carry_in` where `control` holds.
pub static DO_ADDITION: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_addition", addition_body)
        .alloc_prefix("_add_")
        .param("lvalue", ParamKind::Quint)
        .param("offset", ParamKind::BorrowedQuint)
        .param_with_default("carry_in", ParamKind::BorrowedQubit, false)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(addition_reference)
});

/// `lvalue += offset + carry_in`. The offset is truncated or zero-padded to
/// the lvalue width.
pub fn do_addition(
    lvalue: &Quint,
    offset: impl Into<Arg>,
    carry_in: impl Into<Arg>,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_ADDITION.call([
        ("lvalue", lvalue.into()),
        ("offset", offset.into()),
        ("carry_in", carry_in.into()),
        ("control", control.into()),
    ])
}
