//! Division by a classical constant.
//!
//! Restoring long division: from the top quotient bit down, bit `i` is set
//! when `remainder >> i >= divisor`, and when it is set `divisor << i` is
//! subtracted. Both steps are reversible, so the whole sweep inverts like
//! addition does.

use std::sync::LazyLock;

use super::add::do_addition;
use super::ensure_disjoint;
use crate::context::emit;
use crate::error::{CoreError, CoreResult};
use crate::inverse::inverted;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::rvalue::RValue;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;
use crate::util::bit_len;

fn ensure_divisor(divisor: u64) -> CoreResult<()> {
    if divisor == 0 {
        return Err(CoreError::InvalidArgument("division by zero".to_string()));
    }
    Ok(())
}

fn small_quotient_body(args: &Bindings) -> CoreResult<()> {
    let remainder = args.quint("remainder")?;
    let divisor = args.int("divisor")?;
    let out = args.quint("clean_out")?;
    let control = args.controls("control")?;
    ensure_divisor(divisor)?;
    ensure_disjoint("do_init_small_quotient", remainder.qureg(), out.qureg())?;
    for (i, bit) in out.iter().enumerate().rev() {
        let window = remainder.slice(i..);
        if bit_len(divisor) > window.len() {
            continue;
        }
        emit(
            Operation::LetRValue {
                rvalue: window.ge(RValue::Int(divisor)),
                target: Quint::from(bit.clone()),
            }
            .controlled_by(control.clone()),
        )?;
        inverted(|| do_addition(&window, divisor, false, bit))?;
    }
    Ok(())
}

fn small_quotient_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let divisor = args.int("divisor")?;
    ensure_divisor(divisor)?;
    if !args.bool("control")? {
        return Ok(());
    }
    let remainder = args.int("remainder")?;
    let quotient = remainder / divisor;
    let out = args.buf_mut("clean_out")?;
    if out.len() < 64 && quotient >> out.len() != 0 {
        return Err(CoreError::InvalidArgument(format!(
            "quotient {quotient} does not fit in {} bits",
            out.len()
        )));
    }
    out.xor_assign(quotient);
    args.buf_mut("remainder")?.set(remainder % divisor);
    Ok(())
}

/// Divide `remainder` by `divisor` in place, XORing the quotient into
/// `clean_out`. The quotient must fit in `clean_out`.
pub static DO_INIT_SMALL_QUOTIENT: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_init_small_quotient", small_quotient_body)
        .alloc_prefix("_div_")
        .param("remainder", ParamKind::Quint)
        .param("divisor", ParamKind::Classical)
        .param("clean_out", ParamKind::Quint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(small_quotient_reference)
});

/// Quotient sweep for a quotient known to fit in `clean_out`.
pub fn do_init_small_quotient(
    remainder: &Quint,
    divisor: u64,
    clean_out: &Quint,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_INIT_SMALL_QUOTIENT.call([
        ("remainder", remainder.into()),
        ("divisor", Arg::Int(divisor)),
        ("clean_out", clean_out.into()),
        ("control", control.into()),
    ])
}

/// `(dividend, quotient) := (dividend % divisor, dividend / divisor)` for
/// any dividend value. The quotient register must be wide enough for the
/// largest dividend.
pub fn do_div_rem(
    dividend: &Quint,
    divisor: u64,
    clean_quotient: &Quint,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    ensure_divisor(divisor)?;
    let needed = (dividend.len() + 1).saturating_sub(bit_len(divisor));
    if clean_quotient.len() < needed {
        return Err(CoreError::InvalidArgument(format!(
            "quotient {clean_quotient} needs {needed} bits to divide {dividend} by {divisor}"
        )));
    }
    do_init_small_quotient(dividend, divisor, clean_quotient, control)
}
