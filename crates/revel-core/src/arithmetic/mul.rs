//! In-place multiplication by an odd constant.
//!
//! `x * k = x + 2 * x * (k >> 1)`. Walking bits from the top, bit `i` adds
//! `(k >> 1) << (i + 1)` into the bits above it, so every control bit is
//! read before any addition can reach it.

use std::sync::LazyLock;

use super::add::do_addition;
use crate::error::{CoreError, CoreResult};
use crate::quint::Quint;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;
use crate::util::low_mask;

fn ensure_odd(factor: u64) -> CoreResult<()> {
    if factor % 2 == 0 {
        return Err(CoreError::InvalidArgument(format!(
            "in-place multiplication needs an odd factor, got {factor}"
        )));
    }
    Ok(())
}

fn multiplication_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let factor = args.int("factor")?;
    let control = args.controls("control")?;
    ensure_odd(factor)?;
    let step = factor >> 1;
    for (i, bit) in lvalue.iter().enumerate().rev() {
        let high = lvalue.slice(i + 1..);
        let offset = step & low_mask(high.len());
        if offset != 0 {
            do_addition(&high, offset, false, control.and(bit))?;
        }
    }
    Ok(())
}

fn multiplication_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let factor = args.int("factor")?;
    ensure_odd(factor)?;
    if args.bool("control")? {
        args.buf_mut("lvalue")?.mul_assign(factor);
    }
    Ok(())
}

/// `lvalue *= factor` where `control` holds. The factor must be odd.
pub static DO_MULTIPLICATION: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_multiplication", multiplication_body)
        .alloc_prefix("_mul_")
        .param("lvalue", ParamKind::Quint)
        .param("factor", ParamKind::Classical)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(multiplication_reference)
});

/// `lvalue *= factor` for an odd constant.
pub fn do_multiplication(lvalue: &Quint, factor: u64, control: impl Into<Arg>) -> CoreResult<()> {
    DO_MULTIPLICATION.call([
        ("lvalue", lvalue.into()),
        ("factor", Arg::Int(factor)),
        ("control", control.into()),
    ])
}
