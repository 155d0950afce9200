//! Helpers for checking routines against their classical references.
//!
//! A consistency check runs the same sampled inputs twice: once through the
//! symbolic body, decomposed into primitives on a [`ClassicalSim`], and once
//! through the registered classical reference. Final register values and the
//! global phase must agree, and the symbolic run must return every
//! temporary clean.

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use revel_core::{
    Arg, ClassicalSimState, CoreResult, Quint, SemiQuantum, qalloc_int, qfree, with_sink,
};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::state::ClassicalSim;

/// One sampled argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// A fresh register of `len` bits holding `value`.
    Register {
        /// Width.
        len: usize,
        /// Initial value, truncated to the width.
        value: u64,
    },
    /// A fresh qubit.
    Bit(bool),
    /// Passed through unchanged.
    Value(Arg),
}

impl Sample {
    /// A register sample.
    pub fn register(len: usize, value: u64) -> Self {
        Sample::Register {
            len,
            value: value & revel_core::util::low_mask(len),
        }
    }
}

/// Run the classical reference of `routine` against the simulator.
pub fn sim_call<'a>(
    sim: &Rc<RefCell<ClassicalSim>>,
    routine: &SemiQuantum,
    args: impl IntoIterator<Item = (&'a str, Arg)>,
) -> CoreResult<()> {
    routine.sim(&mut *sim.borrow_mut(), args)
}

struct Run {
    values: Vec<(String, u64)>,
    negated: bool,
}

fn allocate_samples(
    samples: &[(&'static str, Sample)],
) -> CoreResult<(Vec<Quint>, Vec<(&'static str, Arg)>)> {
    let mut registers = Vec::new();
    let mut args = Vec::with_capacity(samples.len());
    for (name, sample) in samples {
        let arg = match sample {
            Sample::Register { len, value } => {
                let quint = qalloc_int(*len, name)?;
                quint.init(*value)?;
                registers.push(quint.clone());
                Arg::Quint(quint)
            }
            Sample::Bit(bit) => {
                let quint = qalloc_int(1, name)?;
                quint.init(*bit)?;
                registers.push(quint.clone());
                match quint.get(0) {
                    Some(q) => Arg::Qubit(q.clone()),
                    None => Arg::Bool(*bit),
                }
            }
            Sample::Value(arg) => arg.clone(),
        };
        args.push((*name, arg));
    }
    Ok((registers, args))
}

fn run_once(
    routine: &SemiQuantum,
    samples: &[(&'static str, Sample)],
    seed: u64,
    symbolic: bool,
) -> CoreResult<Run> {
    let sim = ClassicalSim::with_config(SimConfig::default().with_seed(seed)).shared();
    with_sink(&sim, || {
        let (registers, args) = allocate_samples(samples)?;
        if symbolic {
            routine.call(args)?;
        } else {
            sim_call(&sim, routine, args)?;
        }
        let mut values = Vec::with_capacity(registers.len());
        for quint in &registers {
            values.push((quint.name().to_string(), sim.borrow().read_quint(quint.qureg())?));
        }
        for quint in registers.iter().rev() {
            qfree(quint.qureg(), true)?;
        }
        let negated = sim.borrow().phase().re < 0.0;
        Ok(Run { values, negated })
    })
}

/// Compare the symbolic body and the classical reference on one sample.
pub fn check_consistency(
    routine: &SemiQuantum,
    samples: &[(&'static str, Sample)],
    seed: u64,
) -> SimResult<()> {
    let inputs = format!("{samples:?}");
    let symbolic = run_once(routine, samples, seed, true)?;
    let classical = run_once(routine, samples, seed, false)?;
    for ((register, s), (_, c)) in symbolic.values.iter().zip(&classical.values) {
        if s != c {
            return Err(SimError::Inconsistent {
                routine: routine.name().to_string(),
                register: register.clone(),
                symbolic: *s,
                classical: *c,
                inputs,
            });
        }
    }
    if symbolic.negated != classical.negated {
        return Err(SimError::PhaseMismatch {
            routine: routine.name().to_string(),
            inputs,
        });
    }
    Ok(())
}

/// Fuzz `routine` with `count` samples drawn by `sampler`, panicking on the
/// first disagreement.
pub fn assert_semi_quantum_func_is_consistent(
    routine: &SemiQuantum,
    count: usize,
    mut sampler: impl FnMut(&mut StdRng) -> Vec<(&'static str, Sample)>,
) {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for round in 0..count {
        let samples = sampler(&mut rng);
        debug!(routine = routine.name(), round, "consistency sample");
        if let Err(err) = check_consistency(routine, &samples, round as u64) {
            panic!("{err}");
        }
    }
}
