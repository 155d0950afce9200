//! Every arithmetic routine agrees with its classical reference.

use std::sync::LazyLock;

use rand::Rng;
use rand::rngs::StdRng;
use revel_core::arithmetic::{
    DEL_XOR_LOOKUP, DO_ADDITION, DO_IF_LESS_THAN, DO_INIT_SMALL_QUOTIENT, DO_MULTIPLICATION,
    DO_MULTIPLY_ADD, DO_PHASE_FLIP_LOOKUP, DO_XOR, DO_XOR_CONST, DO_XOR_LOOKUP, INIT_MUL,
    INIT_SQUARE, LookupTable, do_xor,
};
use revel_core::semi_quantum::{ClassicalBindings, ParamKind};
use revel_core::{Arg, Bindings, ClassicalSimState, CoreResult, Operation, SemiQuantum};
use revel_sim::{Sample, SimError, assert_semi_quantum_func_is_consistent, check_consistency};

const ROUNDS: usize = 40;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn register(rng: &mut StdRng, widths: std::ops::Range<usize>) -> Sample {
    let len = rng.gen_range(widths);
    Sample::register(len, rng.gen_range(0..1u64 << len))
}

fn control(rng: &mut StdRng) -> Sample {
    match rng.gen_range(0..3) {
        0 => Sample::Value(Arg::Absent),
        1 => Sample::Value(Arg::Bool(rng.gen_bool(0.5))),
        _ => Sample::Bit(rng.gen_bool(0.5)),
    }
}

#[test]
fn xor_is_consistent() {
    assert_semi_quantum_func_is_consistent(&DO_XOR, ROUNDS, |rng| {
        vec![
            ("lvalue", register(rng, 1..6)),
            ("mask", register(rng, 1..6)),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&DO_XOR_CONST, ROUNDS, |rng| {
        vec![
            ("lvalue", register(rng, 1..6)),
            ("mask", Sample::Value(Arg::Int(rng.gen_range(0..64)))),
            ("control", control(rng)),
        ]
    });
}

#[test]
fn addition_is_consistent() {
    init_tracing();
    assert_semi_quantum_func_is_consistent(&DO_ADDITION, ROUNDS, |rng| {
        let n = rng.gen_range(1..7);
        let offset = if rng.gen_bool(0.5) {
            register(rng, 1..8)
        } else {
            Sample::Value(Arg::Int(rng.gen_range(0..200)))
        };
        vec![
            ("lvalue", register(rng, n..n + 1)),
            ("offset", offset),
            ("carry_in", Sample::Bit(rng.gen_bool(0.5))),
            ("control", control(rng)),
        ]
    });
}

#[test]
fn comparison_is_consistent() {
    assert_semi_quantum_func_is_consistent(&DO_IF_LESS_THAN, ROUNDS, |rng| {
        let rhs = if rng.gen_bool(0.5) {
            register(rng, 1..5)
        } else {
            Sample::Value(Arg::Int(rng.gen_range(0..20)))
        };
        vec![
            ("lhs", register(rng, 1..5)),
            ("rhs", rhs),
            ("or_equal", Sample::Value(Arg::Bool(rng.gen_bool(0.5)))),
            ("effect", Sample::Value(Arg::Operation(Operation::PhaseFlip))),
            ("control", control(rng)),
        ]
    });
}

#[test]
fn multiplication_is_consistent() {
    assert_semi_quantum_func_is_consistent(&DO_MULTIPLY_ADD, ROUNDS, |rng| {
        vec![
            ("lvalue", register(rng, 1..7)),
            ("quantum_factor", register(rng, 1..4)),
            ("const_factor", Sample::Value(Arg::Int(rng.gen_range(0..40)))),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&DO_MULTIPLICATION, ROUNDS, |rng| {
        vec![
            ("lvalue", register(rng, 1..7)),
            ("factor", Sample::Value(Arg::Int(2 * rng.gen_range(0..30) + 1))),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&INIT_MUL, ROUNDS, |rng| {
        vec![
            ("factor1", register(rng, 1..4)),
            ("factor2", register(rng, 1..4)),
            ("clean_out", register(rng, 1..7)),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&INIT_SQUARE, ROUNDS, |rng| {
        vec![
            ("factor", register(rng, 1..5)),
            ("clean_out", register(rng, 1..8)),
            ("control", control(rng)),
        ]
    });
}

#[test]
fn division_is_consistent() {
    assert_semi_quantum_func_is_consistent(&DO_INIT_SMALL_QUOTIENT, ROUNDS, |rng| {
        let n = rng.gen_range(1..6);
        vec![
            ("remainder", register(rng, n..n + 1)),
            ("divisor", Sample::Value(Arg::Int(rng.gen_range(1..10)))),
            ("clean_out", Sample::register(n, 0)),
            ("control", control(rng)),
        ]
    });
}

#[test]
fn lookups_are_consistent() {
    init_tracing();
    let table = || LookupTable::new([9, 4, 0, 13, 7, 2]);
    assert_semi_quantum_func_is_consistent(&DO_XOR_LOOKUP, ROUNDS, |rng| {
        vec![
            ("lvalue", register(rng, 4..5)),
            ("table", Sample::Value(Arg::Table(table()))),
            ("address", register(rng, 3..4)),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&DO_PHASE_FLIP_LOOKUP, ROUNDS, |rng| {
        vec![
            ("table", Sample::Value(Arg::Table(table()))),
            ("address", register(rng, 3..4)),
            ("control", control(rng)),
        ]
    });
    assert_semi_quantum_func_is_consistent(&DEL_XOR_LOOKUP, ROUNDS, |rng| {
        let address = rng.gen_range(0..8u64);
        let on = rng.gen_bool(0.5);
        let held = if on { table().get(address).unwrap_or(0) } else { 0 };
        vec![
            ("lvalue", Sample::register(4, held)),
            ("table", Sample::Value(Arg::Table(table()))),
            ("address", Sample::register(3, address)),
            ("control", Sample::Bit(on)),
        ]
    });
}

fn xor_body(args: &Bindings) -> CoreResult<()> {
    do_xor(args.quint("lvalue")?, args.quint("mask")?, Arg::Absent)
}

fn add_reference(args: &mut ClassicalBindings, _: &mut dyn ClassicalSimState) -> CoreResult<()> {
    let mask = args.int("mask")?;
    args.buf_mut("lvalue")?.add_assign(mask);
    Ok(())
}

static MISMATCHED: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("mismatched", xor_body)
        .param("lvalue", ParamKind::Quint)
        .param("mask", ParamKind::BorrowedQuint)
        .classical(add_reference)
});

#[test]
fn disagreement_is_reported() {
    let samples = [
        ("lvalue", Sample::register(3, 1)),
        ("mask", Sample::register(3, 1)),
    ];
    let err = check_consistency(&MISMATCHED, &samples, 0).unwrap_err();
    assert!(matches!(
        err,
        SimError::Inconsistent {
            symbolic: 0,
            classical: 2,
            ..
        }
    ));
}

#[test]
#[should_panic(expected = "mismatched")]
fn consistency_assertion_panics() {
    assert_semi_quantum_func_is_consistent(&MISMATCHED, 4, |_| {
        vec![
            ("lvalue", Sample::register(2, 3)),
            ("mask", Sample::register(2, 1)),
        ]
    });
}
