//! Captured operation streams: replay, inversion, serialization and gate
//! counts.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use revel_core::arithmetic::{
    do_addition, do_if_less_than, do_multiplication, do_xor_lookup, init_mul, init_square,
};
use revel_core::{
    CoreResult, GateCounts, LookupTable, Operation, Quint, capture, emit, qalloc_int, qalloc_qubit,
    with_sink,
};
use revel_sim::{ClassicalSim, SimConfig};

fn reg(len: usize, name: &str, init: u64) -> CoreResult<Quint> {
    let quint = qalloc_int(len, name)?;
    quint.init(init & ((1u64 << len) - 1))?;
    Ok(quint)
}

#[derive(Debug, Clone, Copy)]
enum Routine {
    Add,
    Compare,
    Multiply,
    Square,
    Lookup,
    TimesOdd,
}

fn arb_routine() -> impl Strategy<Value = Routine> {
    prop_oneof![
        Just(Routine::Add),
        Just(Routine::Compare),
        Just(Routine::Multiply),
        Just(Routine::Square),
        Just(Routine::Lookup),
        Just(Routine::TimesOdd),
    ]
}

fn emit_routine(routine: Routine, a: &Quint, b: &Quint, out: &Quint) -> CoreResult<()> {
    match routine {
        Routine::Add => do_addition(a, b, true, true),
        Routine::Compare => {
            do_if_less_than(a, b, false, Operation::Toggle(out.qureg().slice(..1)), true)
        }
        Routine::Multiply => init_mul(a, b, out, true),
        Routine::Square => init_square(a, out, true),
        Routine::Lookup => do_xor_lookup(out, &LookupTable::new([7, 0, 3, 12, 5]), b, true),
        Routine::TimesOdd => do_multiplication(a, 5, true),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn replay_then_undo_restores_snapshot(
        routine in arb_routine(),
        a in 0u64..16,
        b in 0u64..8,
        out in 0u64..64,
    ) {
        let sim = ClassicalSim::with_config(SimConfig::default().with_seed(9)).shared();
        let restored = with_sink(&sim, || -> CoreResult<bool> {
            let a = reg(4, "a", a)?;
            let b = reg(3, "b", b)?;
            let out = reg(6, "out", out)?;
            let before = sim.borrow().snapshot();
            let ((), ops) = capture(|| emit_routine(routine, &a, &b, &out))?;
            for op in &ops {
                emit(op.clone())?;
            }
            for op in ops.iter().rev() {
                sim.borrow_mut().apply(op, false)?;
            }
            Ok(sim.borrow().snapshot() == before)
        })
        .unwrap();
        prop_assert!(restored);
    }

    #[test]
    fn structural_inverse_restores_snapshot(
        routine in arb_routine(),
        a in 0u64..16,
        b in 0u64..8,
    ) {
        let sim = ClassicalSim::with_config(SimConfig::default().with_seed(13)).shared();
        let restored = with_sink(&sim, || -> CoreResult<bool> {
            let a = reg(4, "a", a)?;
            let b = reg(3, "b", b)?;
            let out = qalloc_int(6, "out")?;
            let before = sim.borrow().snapshot();
            let ((), ops) = capture(|| emit_routine(routine, &a, &b, &out))?;
            for op in &ops {
                emit(op.clone())?;
            }
            for op in ops.iter().rev() {
                emit(op.inverse()?)?;
            }
            Ok(sim.borrow().snapshot() == before)
        })
        .unwrap();
        prop_assert!(restored);
    }
}

#[test]
fn borrowed_constant_records_lifetime_operations() {
    let ((), ops) = capture(|| {
        let x = qalloc_int(3, "x")?;
        do_addition(&x, 5u64, false, true)
    })
    .unwrap();
    let names: Vec<&str> = ops.iter().map(Operation::name).collect();
    assert_eq!(names.first(), Some(&"alloc"));
    assert!(names.contains(&"let"));
    assert!(names.contains(&"del"));
    assert_eq!(names.last(), Some(&"release"));
}

#[test]
fn captured_stream_serializes() {
    let ((), ops) = capture(|| {
        let x = qalloc_int(4, "x")?;
        let c = qalloc_qubit("c")?;
        x.add_assign(3u64)?;
        x.xor_assign(&c)?;
        x.init(LookupTable::new([1, 2]).lookup(&c))
    })
    .unwrap();
    let json = serde_json::to_string(&ops).unwrap();
    let back: Vec<Operation> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ops);
}

fn count(body: impl FnOnce() -> CoreResult<()>) -> GateCounts {
    let counts = Rc::new(RefCell::new(GateCounts::new()));
    with_sink(&counts, body).unwrap();
    counts.borrow().clone()
}

#[test]
fn squaring_uses_fewer_toffolis_than_multiplying() {
    let square = count(|| {
        let f = qalloc_int(4, "f")?;
        let out = qalloc_int(8, "out")?;
        init_square(&f, &out, true)
    });
    let product = count(|| {
        let f = qalloc_int(4, "f")?;
        let g = qalloc_int(4, "g")?;
        let out = qalloc_int(8, "out")?;
        init_mul(&f, &g, &out, true)
    });
    assert!(square.toggles_with_at_least(2) < product.toggles_with_at_least(2));
    assert!(square.toggles_with_at_least(2) > 0);
}

#[test]
fn adder_uses_linear_gates_and_constant_ancillae() {
    let small = count(|| {
        let a = qalloc_int(4, "a")?;
        let b = qalloc_int(4, "b")?;
        a.add_assign(&b)
    });
    let large = count(|| {
        let a = qalloc_int(8, "a")?;
        let b = qalloc_int(8, "b")?;
        a.add_assign(&b)
    });
    assert_eq!(large.total_toggles(), 2 * small.total_toggles());
    assert_eq!(large.peak_qubits - 16, small.peak_qubits - 8);
}

#[test]
fn lookup_ancillae_grow_with_address_width() {
    let counts = count(|| {
        let address = qalloc_int(3, "address")?;
        let out = qalloc_int(4, "out")?;
        do_xor_lookup(&out, &LookupTable::new([1, 2, 3, 4, 5, 6, 7, 8]), &address, true)
    });
    // Root plus one qubit per address bit.
    assert_eq!(counts.peak_qubits, 3 + 4 + 4);
}

#[test]
fn inverted_primitives_match_direct_application() {
    let sim = ClassicalSim::new().shared();
    with_sink(&sim, || -> CoreResult<()> {
        let x = qalloc_int(2, "x")?;
        let undo_toggle = Operation::Inverse(Box::new(Operation::Toggle(x.qureg().clone())));
        emit(undo_toggle.clone())?;
        assert_eq!(sim.borrow().resolve_quint(&x)?, 3);
        sim.borrow_mut().apply(&undo_toggle, true)?;
        assert_eq!(sim.borrow().resolve_quint(&x)?, 0);

        emit(Operation::Inverse(Box::new(Operation::PhaseFlip)))?;
        assert_eq!(sim.borrow().phase_degrees(), 180.0);
        emit(Operation::Inverse(Box::new(Operation::GlobalPhase { degrees: 90.0 })))?;
        assert_eq!(sim.borrow().phase_degrees(), 90.0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn global_phase_is_undone_by_inversion() {
    let sim = ClassicalSim::new().shared();
    with_sink(&sim, || -> CoreResult<()> {
        let c = qalloc_qubit("c")?;
        revel_core::arithmetic::toggle(&c.clone().into())?;
        let before = sim.borrow().snapshot();
        let rotate = || emit(Operation::GlobalPhase { degrees: 30.0 }.controlled_by(c.clone()));
        rotate()?;
        assert_eq!(sim.borrow().phase_degrees(), 30.0);
        revel_core::inverted(rotate)?;
        assert_eq!(sim.borrow().snapshot(), before);
        Ok(())
    })
    .unwrap();
}
