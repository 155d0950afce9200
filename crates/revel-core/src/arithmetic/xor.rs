//! `lvalue ^= mask`

use std::sync::LazyLock;

use super::ensure_disjoint;
use super::gates::toggle_bit;
use crate::context::emit;
use crate::error::CoreResult;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;
use crate::util::low_mask;

fn xor_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let mask = args.quint("mask")?;
    let control = args.controls("control")?;
    ensure_disjoint("do_xor", lvalue.qureg(), mask.qureg())?;
    for (target, source) in lvalue.iter().zip(mask.iter()) {
        toggle_bit(target, control.and(source))?;
    }
    Ok(())
}

fn xor_reference(args: &mut ClassicalBindings, _: &mut dyn ClassicalSimState) -> CoreResult<()> {
    let mask = args.int("mask")?;
    if args.bool("control")? {
        args.buf_mut("lvalue")?.xor_assign(mask);
    }
    Ok(())
}

/// `lvalue ^= mask` where `control` holds.
pub static DO_XOR: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_xor", xor_body)
        .param("lvalue", ParamKind::Quint)
        .param("mask", ParamKind::BorrowedQuint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(xor_reference)
});

/// `lvalue ^= mask`, truncating the mask to the lvalue width.
pub fn do_xor(lvalue: &Quint, mask: impl Into<Arg>, control: impl Into<Arg>) -> CoreResult<()> {
    DO_XOR.call([
        ("lvalue", lvalue.into()),
        ("mask", mask.into()),
        ("control", control.into()),
    ])
}

fn xor_const_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let mask = args.int("mask")? & low_mask(lvalue.len());
    let control = args.controls("control")?;
    if mask == 0 {
        return Ok(());
    }
    emit(Operation::Toggle(lvalue.qureg().masked(mask)).controlled_by(control.clone()))
}

/// `lvalue ^= mask` for a classical mask, as one multi-target toggle.
pub static DO_XOR_CONST: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_xor_const", xor_const_body)
        .param("lvalue", ParamKind::Quint)
        .param("mask", ParamKind::Classical)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(xor_reference)
});

/// `lvalue ^= mask` for a constant mask.
pub fn do_xor_const(lvalue: &Quint, mask: u64, control: impl Into<Arg>) -> CoreResult<()> {
    DO_XOR_CONST.call([
        ("lvalue", lvalue.into()),
        ("mask", Arg::Int(mask)),
        ("control", control.into()),
    ])
}
