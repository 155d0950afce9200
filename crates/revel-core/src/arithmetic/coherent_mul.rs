//! Products of two registers into a clean output.

use std::sync::LazyLock;

use super::add::do_addition;
use super::ensure_disjoint;
use super::gates::toggle_bit;
use crate::alloc::with_qubit;
use crate::error::CoreResult;
use crate::quint::Quint;
use crate::qubit::Qureg;
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;

fn init_mul_body(args: &Bindings) -> CoreResult<()> {
    let factor1 = args.quint("factor1")?;
    let factor2 = args.quint("factor2")?;
    let out = args.quint("clean_out")?;
    let control = args.controls("control")?;
    ensure_disjoint("init_mul", factor1.qureg(), factor2.qureg())?;
    ensure_disjoint("init_mul", factor1.qureg(), out.qureg())?;
    ensure_disjoint("init_mul", factor2.qureg(), out.qureg())?;
    for (i, bit) in factor1.iter().enumerate().take(out.len()) {
        do_addition(&out.slice(i..), factor2, false, control.and(bit))?;
    }
    Ok(())
}

fn init_mul_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let product = args.int("factor1")?.wrapping_mul(args.int("factor2")?);
    if args.bool("control")? {
        args.buf_mut("clean_out")?.add_assign(product);
    }
    Ok(())
}

/// `clean_out += factor1 * factor2`, truncated to the output width.
pub static INIT_MUL: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("init_mul", init_mul_body)
        .param("factor1", ParamKind::BorrowedQuint)
        .param("factor2", ParamKind::BorrowedQuint)
        .param("clean_out", ParamKind::Quint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(init_mul_reference)
});

/// `clean_out += factor1 * factor2`
pub fn init_mul(
    factor1: impl Into<Arg>,
    factor2: impl Into<Arg>,
    clean_out: &Quint,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    INIT_MUL.call([
        ("factor1", factor1.into()),
        ("factor2", factor2.into()),
        ("clean_out", clean_out.into()),
        ("control", control.into()),
    ])
}

// v^2 = sum_i v_i 4^i + sum_{i<j} 2 v_i v_j 2^(i+j), so bit i contributes
// 4^i * (v_i + 2 * v[i+1..]) when v_i is set. That is one addition per bit
// of the offset [v_i, 0, v_{i+1}, v_{i+2}, ...] into out[2i..], and each
// offset is shorter than the factor by i bits.
fn init_square_body(args: &Bindings) -> CoreResult<()> {
    let factor = args.quint("factor")?;
    let out = args.quint("clean_out")?;
    let control = args.controls("control")?;
    ensure_disjoint("init_square", factor.qureg(), out.qureg())?;
    with_qubit("_sqr_zero", |zero| {
        with_qubit("_sqr_one", |one| {
            for (i, bit) in factor.iter().enumerate() {
                let start = 2 * i;
                if start >= out.len() {
                    break;
                }
                toggle_bit(one, bit.into())?;
                let offset = Quint::new(
                    Qureg::from_qubits(vec![one.clone(), zero.clone()])
                        .concat(factor.slice(i + 1..).qureg()),
                );
                do_addition(&out.slice(start..), &offset, false, control.and(bit))?;
                toggle_bit(one, bit.into())?;
            }
            Ok(())
        })
    })
}

fn init_square_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let factor = args.int("factor")?;
    if args.bool("control")? {
        args.buf_mut("clean_out")?.add_assign(factor.wrapping_mul(factor));
    }
    Ok(())
}

/// `clean_out += factor^2`, truncated to the output width.
pub static INIT_SQUARE: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("init_square", init_square_body)
        .param("factor", ParamKind::BorrowedQuint)
        .param("clean_out", ParamKind::Quint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(init_square_reference)
});

/// `clean_out += factor^2`
pub fn init_square(
    factor: impl Into<Arg>,
    clean_out: &Quint,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    INIT_SQUARE.call([
        ("factor", factor.into()),
        ("clean_out", clean_out.into()),
        ("control", control.into()),
    ])
}
