//! `lvalue += quantum_factor * const_factor` by shift-and-add.

use std::sync::LazyLock;

use super::add::do_addition;
use crate::error::CoreResult;
use crate::quint::Quint;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;

fn multiply_add_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let factor = args.quint("quantum_factor")?;
    let const_factor = args.int("const_factor")?;
    let control = args.controls("control")?;
    for i in 0..lvalue.len().min(64) {
        if (const_factor >> i) & 1 == 1 {
            do_addition(&lvalue.slice(i..), factor, false, control)?;
        }
    }
    Ok(())
}

fn multiply_add_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let factor = args.int("quantum_factor")?;
    let const_factor = args.int("const_factor")?;
    if args.bool("control")? {
        args.buf_mut("lvalue")?
            .add_assign(factor.wrapping_mul(const_factor));
    }
    Ok(())
}

/// `lvalue += quantum_factor * const_factor` where `control` holds.
pub static DO_MULTIPLY_ADD: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_multiply_add", multiply_add_body)
        .alloc_prefix("_mul_add_")
        .param("lvalue", ParamKind::Quint)
        .param("quantum_factor", ParamKind::BorrowedQuint)
        .param("const_factor", ParamKind::Classical)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(multiply_add_reference)
});

/// `lvalue += quantum_factor * const_factor`
pub fn do_multiply_add(
    lvalue: &Quint,
    quantum_factor: impl Into<Arg>,
    const_factor: u64,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_MULTIPLY_ADD.call([
        ("lvalue", lvalue.into()),
        ("quantum_factor", quantum_factor.into()),
        ("const_factor", Arg::Int(const_factor)),
        ("control", control.into()),
    ])
}
