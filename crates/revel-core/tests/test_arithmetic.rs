//! Arithmetic routines checked against concrete values on the classical
//! simulator.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use revel_core::arithmetic::{
    do_addition, do_div_rem, do_if_less_than, do_multiplication, init_mul, init_square, measure,
    swap,
};
use revel_core::{
    CoreError, CoreResult, Operation, QubitIntersection, Quint, hold, inverted, qalloc_int,
    qalloc_qubit, qfree, with_controls, with_sink,
};
use revel_sim::{ClassicalSim, SimConfig};

type Sim = Rc<RefCell<ClassicalSim>>;

fn run<R>(body: impl FnOnce(&Sim) -> CoreResult<R>) -> R {
    let sim = ClassicalSim::with_config(SimConfig::default().with_seed(11)).shared();
    let result = with_sink(&sim, || body(&sim));
    result.unwrap()
}

fn value(sim: &Sim, quint: &Quint) -> CoreResult<u64> {
    sim.borrow().resolve_quint(quint)
}

fn reg(len: usize, name: &str, init: u64) -> CoreResult<Quint> {
    let quint = qalloc_int(len, name)?;
    quint.init(init & ((1u64 << len) - 1))?;
    Ok(quint)
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[test]
fn comparisons_against_constant() {
    run(|sim| {
        let t = reg(4, "t", 2)?;
        let cases = [
            (t.ge(2u64), 1),
            (t.gt(2u64), 0),
            (t.le(2u64), 1),
            (t.lt(2u64), 0),
        ];
        for (rvalue, expected) in cases {
            hold(rvalue, "result", |result| {
                assert_eq!(value(sim, result)?, expected);
                Ok(())
            })?;
        }
        assert_eq!(value(sim, &t)?, 2);
        assert_eq!(measure(&t, true)?, 2);
        qfree(t.qureg(), false)
    });
}

#[test]
fn comparison_with_controls() {
    for (c1, c2) in [(false, false), (true, false), (false, true), (true, true)] {
        run(|sim| {
            let a = reg(3, "a", 1)?;
            let b = reg(3, "b", 5)?;
            let g1 = reg(1, "g1", u64::from(c1))?;
            let g2 = reg(1, "g2", u64::from(c2))?;
            let out = qalloc_qubit("out")?;
            let guard = QubitIntersection::new([
                g1.qureg().qubits()[0].clone(),
                g2.qureg().qubits()[0].clone(),
            ]);
            do_if_less_than(&a, &b, false, Operation::Toggle(out.clone().into()), guard)?;
            assert_eq!(sim.borrow().resolve_rvalue(&out.clone().into())?, u64::from(c1 && c2));
            Ok(())
        });
    }
}

#[test]
fn comparison_under_never_has_no_effect() {
    run(|sim| {
        let a = reg(3, "a", 1)?;
        let b = reg(3, "b", 5)?;
        let out = qalloc_int(1, "out")?;
        do_if_less_than(&a, &b, false, Operation::Toggle(out.qureg().clone()), false)?;
        assert_eq!(value(sim, &out)?, 0);
        with_controls(QubitIntersection::NEVER, || {
            do_if_less_than(&a, &b, true, Operation::Toggle(out.qureg().clone()), true)
        })?;
        assert_eq!(value(sim, &out)?, 0);
        Ok(())
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn comparison_matches_native(
        a in 0u64..16,
        b in 0u64..8,
        or_equal: bool,
        control: bool,
    ) {
        let (result, a_after, b_after) = run(|sim| {
            let x = reg(4, "x", a)?;
            let y = reg(3, "y", b)?;
            let c = reg(1, "c", u64::from(control))?;
            let out = qalloc_int(1, "out")?;
            do_if_less_than(
                &x,
                &y,
                or_equal,
                Operation::Toggle(out.qureg().clone()),
                c.qureg().qubits()[0].clone(),
            )?;
            Ok((value(sim, &out)?, value(sim, &x)?, value(sim, &y)?))
        });
        let expected = control && (a < b || (or_equal && a == b));
        prop_assert_eq!(result, u64::from(expected));
        prop_assert_eq!(a_after, a);
        prop_assert_eq!(b_after, b);
    }
}

// ---------------------------------------------------------------------------
// Addition
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn addition_is_modular(n in 1usize..7, a: u64, b: u64, carry: bool) {
        let mask = (1u64 << n) - 1;
        let (sum, offset) = run(|sim| {
            let x = reg(n, "x", a)?;
            let y = reg(n, "y", b)?;
            do_addition(&x, &y, carry, true)?;
            Ok((value(sim, &x)?, value(sim, &y)?))
        });
        prop_assert_eq!(sum, ((a & mask) + (b & mask) + u64::from(carry)) & mask);
        prop_assert_eq!(offset, b & mask);
    }

    #[test]
    fn subtraction_undoes_addition(n in 1usize..7, a: u64, b: u64) {
        let mask = (1u64 << n) - 1;
        let (diff, restored) = run(|sim| {
            let x = reg(n, "x", a)?;
            let y = reg(n, "y", b)?;
            x.sub_assign(&y)?;
            let diff = value(sim, &x)?;
            x.add_assign(&y)?;
            Ok((diff, value(sim, &x)?))
        });
        prop_assert_eq!(diff, (a & mask).wrapping_sub(b & mask) & mask);
        prop_assert_eq!(restored, a & mask);
    }

    #[test]
    fn constant_addition_skips_trailing_zeros(n in 1usize..8, a: u64, k in 0u64..256) {
        let mask = (1u64 << n) - 1;
        let sum = run(|sim| {
            let x = reg(n, "x", a)?;
            x.add_assign(k)?;
            value(sim, &x)
        });
        prop_assert_eq!(sum, ((a & mask) + k) & mask);
    }
}

#[test]
fn addition_with_narrow_and_wide_offsets() {
    run(|sim| {
        let x = reg(5, "x", 30)?;
        let short = reg(2, "short", 3)?;
        x.add_assign(&short)?;
        assert_eq!(value(sim, &x)?, 1);
        let long = reg(7, "long", 0b1000001)?;
        x.add_assign(&long)?;
        assert_eq!(value(sim, &x)?, 2);
        Ok(())
    });
}

#[test]
fn controlled_addition_respects_ambient_guard() {
    for (c1, c2) in [(false, true), (true, true)] {
        let result = run(|sim| {
            let x = reg(4, "x", 3)?;
            let y = reg(4, "y", 6)?;
            let g1 = qalloc_qubit("g1")?;
            let g2 = qalloc_qubit("g2")?;
            if c1 {
                revel_core::arithmetic::toggle(&g1.clone().into())?;
            }
            if c2 {
                revel_core::arithmetic::toggle(&g2.clone().into())?;
            }
            with_controls(QubitIntersection::new([g1, g2]), || x.add_assign(&y))?;
            value(sim, &x)
        });
        assert_eq!(result, if c1 && c2 { 9 } else { 3 });
    }
}

#[test]
fn overlapping_operands_are_rejected() {
    let sim = ClassicalSim::new().shared();
    let err = with_sink(&sim, || {
        let x = qalloc_int(4, "x")?;
        do_addition(&x, &x.slice(1..), false, true)
    })
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

// ---------------------------------------------------------------------------
// Multiplication
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn squaring_is_truncated(n1 in 1usize..5, n2 in 1usize..9, v: u64) {
        let v = v & ((1u64 << n1) - 1);
        let (square, factor) = run(|sim| {
            let f = reg(n1, "f", v)?;
            let out = qalloc_int(n2, "out")?;
            init_square(&f, &out, true)?;
            Ok((value(sim, &out)?, value(sim, &f)?))
        });
        prop_assert_eq!(square, (v * v) & ((1u64 << n2) - 1));
        prop_assert_eq!(factor, v);
    }

    #[test]
    fn product_is_truncated(n1 in 1usize..5, n2 in 1usize..5, n3 in 1usize..9, v1: u64, v2: u64) {
        let v1 = v1 & ((1u64 << n1) - 1);
        let v2 = v2 & ((1u64 << n2) - 1);
        let product = run(|sim| {
            let f1 = reg(n1, "f1", v1)?;
            let f2 = reg(n2, "f2", v2)?;
            let out = qalloc_int(n3, "out")?;
            init_mul(&f1, &f2, &out, true)?;
            value(sim, &out)
        });
        prop_assert_eq!(product, (v1 * v2) & ((1u64 << n3) - 1));
    }

    #[test]
    fn in_place_multiplication_by_odd_constant(n in 1usize..8, v: u64, k in 0u64..64) {
        let k = 2 * k + 1;
        let mask = (1u64 << n) - 1;
        let (product, restored) = run(|sim| {
            let x = reg(n, "x", v)?;
            do_multiplication(&x, k, true)?;
            let product = value(sim, &x)?;
            inverted(|| do_multiplication(&x, k, true))?;
            Ok((product, value(sim, &x)?))
        });
        prop_assert_eq!(product, (v & mask).wrapping_mul(k) & mask);
        prop_assert_eq!(restored, v & mask);
    }
}

#[test]
fn even_factor_is_rejected() {
    let sim = ClassicalSim::new().shared();
    let err = with_sink(&sim, || {
        let x = qalloc_int(4, "x")?;
        x.mul_assign(6)
    })
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

#[test]
fn multiply_add_inverts_classically() {
    run(|sim| {
        let acc = reg(6, "acc", 9)?;
        let f = reg(3, "f", 5)?;
        let op = Operation::PlusEqualProduct {
            lvalue: acc.clone(),
            factor: f.clone().into(),
            const_factor: 3,
        };
        let before = sim.borrow().snapshot();
        revel_core::emit(op.clone())?;
        assert_eq!(value(sim, &acc)?, (9 + 15) & 63);
        sim.borrow_mut().apply(&op, false)?;
        assert_eq!(sim.borrow().snapshot(), before);
        Ok(())
    });
}

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn division_satisfies_euclid(n in 1usize..7, v: u64, d in 1u64..12) {
        let v = v & ((1u64 << n) - 1);
        let q_len = (n + 1).saturating_sub(64 - d.leading_zeros() as usize).max(1);
        let (remainder, quotient) = run(|sim| {
            let dividend = reg(n, "dividend", v)?;
            let quotient = qalloc_int(q_len, "quotient")?;
            do_div_rem(&dividend, d, &quotient, true)?;
            Ok((value(sim, &dividend)?, value(sim, &quotient)?))
        });
        prop_assert_eq!(quotient * d + remainder, v);
        prop_assert!(remainder < d);
    }
}

#[test]
fn division_needs_a_wide_enough_quotient() {
    let sim = ClassicalSim::new().shared();
    let err = with_sink(&sim, || {
        let dividend = qalloc_int(6, "dividend")?;
        let quotient = qalloc_int(2, "quotient")?;
        do_div_rem(&dividend, 3, &quotient, true)
    })
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

#[test]
fn division_by_zero_is_rejected() {
    let sim = ClassicalSim::new().shared();
    let err = with_sink(&sim, || {
        let dividend = qalloc_int(3, "dividend")?;
        let quotient = qalloc_int(3, "quotient")?;
        do_div_rem(&dividend, 0, &quotient, true)
    })
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

// ---------------------------------------------------------------------------
// Swap
// ---------------------------------------------------------------------------

#[test]
fn controlled_swap() {
    for on in [false, true] {
        let (a, b) = run(|sim| {
            let x = reg(3, "x", 5)?;
            let y = reg(3, "y", 2)?;
            swap(&x, &y, on)?;
            Ok((value(sim, &x)?, value(sim, &y)?))
        });
        assert_eq!((a, b), if on { (2, 5) } else { (5, 2) });
    }
}
