//! Comparison by carry chain.
//!
//! The carry out of `rhs + !lhs + or_equal` is set exactly when
//! `lhs < rhs` (or `lhs <= rhs` with `or_equal`). The chain computes that
//! carry into the top bit of `rhs`, applies the effect guarded by it, then
//! runs the chain backwards, so neither operand is changed.

use std::sync::LazyLock;

use super::ensure_disjoint;
use super::gates::toggle_bit;
use crate::alloc::pad;
use crate::context::emit;
use crate::error::CoreResult;
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::Qubit;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;

fn less_than_body(args: &Bindings) -> CoreResult<()> {
    let lhs = args.quint("lhs")?;
    let rhs = args.quint("rhs")?;
    let or_equal = args.qubit("or_equal")?;
    let effect = args.operation("effect")?;
    let control = args.controls("control")?;
    let n = lhs.len().max(rhs.len());
    if n == 0 {
        return emit(effect.clone().controlled_by(control.and(or_equal)));
    }
    ensure_disjoint("do_if_less_than", lhs.qureg(), rhs.qureg())?;
    pad(lhs, n, |lhs| {
        pad(rhs, n, |rhs| carry_pyramid(lhs, rhs, or_equal, effect, control))
    })
}

fn carry_pyramid(
    lhs: &Quint,
    rhs: &Quint,
    or_equal: &Qubit,
    effect: &Operation,
    control: &QubitIntersection,
) -> CoreResult<()> {
    let bits: Vec<(&Qubit, &Qubit)> = lhs.iter().zip(rhs.iter()).collect();
    let carry = |i: usize| if i == 0 { or_equal } else { bits[i - 1].1 };

    for (i, &(b, c)) in bits.iter().enumerate() {
        let a = carry(i);
        toggle_bit(a, c.into())?;
        toggle_bit(b, c.into())?;
        toggle_bit(b, a.into())?;
        toggle_bit(c, QubitIntersection::new([a.clone(), b.clone()]))?;
    }

    if let Some(&(_, top)) = bits.last() {
        emit(effect.clone().controlled_by(control.and(top)))?;
    }

    for (i, &(b, c)) in bits.iter().enumerate().rev() {
        let a = carry(i);
        toggle_bit(c, QubitIntersection::new([a.clone(), b.clone()]))?;
        toggle_bit(b, a.into())?;
        toggle_bit(b, c.into())?;
        toggle_bit(a, c.into())?;
    }
    Ok(())
}

fn less_than_reference(
    args: &mut ClassicalBindings,
    state: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let lhs = args.int("lhs")?;
    let rhs = args.int("rhs")?;
    let or_equal = args.bool("or_equal")?;
    if args.bool("control")? && (lhs < rhs || (or_equal && lhs == rhs)) {
        args.operation("effect")?
            .mutate_state(state, true, &QubitIntersection::ALWAYS)?;
    }
    Ok(())
}

/// Apply `effect` where `lhs < rhs` (or `<=`) and `control` hold.
pub static DO_IF_LESS_THAN: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_if_less_than", less_than_body)
        .alloc_prefix("_cmp_")
        .param("lhs", ParamKind::BorrowedQuint)
        .param("rhs", ParamKind::BorrowedQuint)
        .param_with_default("or_equal", ParamKind::BorrowedQubit, false)
        .param("effect", ParamKind::Classical)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(less_than_reference)
});

/// Apply `effect` where `lhs < rhs` (or `lhs <= rhs` when `or_equal`).
pub fn do_if_less_than(
    lhs: impl Into<Arg>,
    rhs: impl Into<Arg>,
    or_equal: impl Into<Arg>,
    effect: Operation,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_IF_LESS_THAN.call([
        ("lhs", lhs.into()),
        ("rhs", rhs.into()),
        ("or_equal", or_equal.into()),
        ("effect", Arg::Operation(effect)),
        ("control", control.into()),
    ])
}
