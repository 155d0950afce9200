//! The operation IR.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arithmetic::add::do_addition;
use crate::arithmetic::mul::do_multiplication;
use crate::arithmetic::mult_add::do_multiply_add;
use crate::arithmetic::xor::{do_xor, do_xor_const};
use crate::context::emit_under;
use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::inverse::inverted;
use crate::quint::Quint;
use crate::qubit::Qureg;
use crate::rvalue::RValue;
use crate::sink::{ClassicalSimState, MbuStart};
use crate::util::{low_mask, modular_multiplicative_inverse};

/// One reversible effect.
///
/// The first eight variants are primitives every sink understands. The rest
/// are composites a sink may intercept or let the core decompose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Bring a zeroed register into existence.
    Alloc(Qureg),
    /// Retire a register. Unless `dirty`, it must be zero.
    Release {
        /// The register.
        qureg: Qureg,
        /// Skip the zero check.
        dirty: bool,
    },
    /// Negate the amplitude of the guarded branches.
    PhaseFlip,
    /// Rotate the amplitude of the guarded branches by an angle.
    GlobalPhase {
        /// Angle in degrees. `180` is a phase flip.
        degrees: f64,
    },
    /// Toggle every target bit.
    Toggle(Qureg),
    /// Computational basis measurement.
    Measure {
        /// The register.
        qureg: Qureg,
        /// Zero the register afterwards.
        reset: bool,
    },
    /// X-basis measurement opening a measurement-based uncomputation.
    StartMbu(Qureg),
    /// Close a measurement-based uncomputation.
    EndMbu {
        /// The register.
        qureg: Qureg,
        /// Outcomes reported at the start.
        start: MbuStart,
    },
    /// `target ^= rvalue` on a zeroed target.
    LetRValue {
        /// The expression.
        rvalue: RValue,
        /// Destination, zero beforehand.
        target: Quint,
    },
    /// Undo a matching `LetRValue`.
    DelRValue {
        /// The expression.
        rvalue: RValue,
        /// Location holding the expression's value.
        target: Quint,
    },
    /// `lvalue ^= mask`
    XorEqual {
        /// Target.
        lvalue: Quint,
        /// Mask expression.
        mask: RValue,
    },
    /// `lvalue += offset + carry_in`
    PlusEqual {
        /// Target.
        lvalue: Quint,
        /// Offset expression.
        offset: RValue,
        /// Constant carry into the lowest bit.
        carry_in: bool,
    },
    /// `lvalue += factor * const_factor`
    PlusEqualProduct {
        /// Target.
        lvalue: Quint,
        /// Quantum factor.
        factor: RValue,
        /// Classical factor.
        const_factor: u64,
    },
    /// `lvalue *= factor` for an odd constant.
    TimesEqual {
        /// Target.
        lvalue: Quint,
        /// Odd constant.
        factor: u64,
    },
    /// An operation applied only where `controls` holds.
    Controlled {
        /// The guarded operation. Never itself `Controlled`.
        op: Box<Operation>,
        /// The guard.
        controls: QubitIntersection,
    },
    /// The inverse of an operation.
    Inverse(Box<Operation>),
}

impl Operation {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Alloc(_) => "alloc",
            Operation::Release { .. } => "release",
            Operation::PhaseFlip => "phase_flip",
            Operation::GlobalPhase { .. } => "global_phase",
            Operation::Toggle(_) => "toggle",
            Operation::Measure { .. } => "measure",
            Operation::StartMbu(_) => "start_mbu",
            Operation::EndMbu { .. } => "end_mbu",
            Operation::LetRValue { .. } => "let",
            Operation::DelRValue { .. } => "del",
            Operation::XorEqual { .. } => "xor_equal",
            Operation::PlusEqual { .. } => "plus_equal",
            Operation::PlusEqualProduct { .. } => "plus_equal_product",
            Operation::TimesEqual { .. } => "times_equal",
            Operation::Controlled { .. } => "controlled",
            Operation::Inverse(_) => "inverse",
        }
    }

    /// Whether sinks handle this operation directly.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Operation::Alloc(_)
                | Operation::Release { .. }
                | Operation::PhaseFlip
                | Operation::GlobalPhase { .. }
                | Operation::Toggle(_)
                | Operation::Measure { .. }
                | Operation::StartMbu(_)
                | Operation::EndMbu { .. }
        )
    }

    /// Whether the operation's effect depends on its guard. Lifetime and
    /// measurement operations ignore guards.
    pub fn is_guarded(&self) -> bool {
        match self {
            Operation::Alloc(_) | Operation::Release { .. } => false,
            Operation::Controlled { op, .. } | Operation::Inverse(op) => op.is_guarded(),
            other => !other.is_measurement(),
        }
    }

    /// Whether the operation measures.
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            Operation::Measure { .. } | Operation::StartMbu(_) | Operation::EndMbu { .. }
        )
    }

    /// Wrap in a guard, merging with an existing one.
    pub fn controlled_by(self, controls: impl Into<QubitIntersection>) -> Operation {
        let controls = controls.into();
        if controls.is_always() {
            return self;
        }
        match self {
            Operation::Controlled { op, controls: inner } => Operation::Controlled {
                op,
                controls: inner.intersect(&controls),
            },
            op => Operation::Controlled {
                op: Box::new(op),
                controls,
            },
        }
    }

    /// The operation undoing this one.
    ///
    /// Lifetime operations swap, `LetRValue` and `DelRValue` swap, global
    /// phases negate their angle, composites are wrapped in
    /// [`Operation::Inverse`]. Measurements and dirty releases have no
    /// inverse.
    pub fn inverse(&self) -> CoreResult<Operation> {
        match self {
            Operation::Alloc(qureg) => Ok(Operation::Release {
                qureg: qureg.clone(),
                dirty: false,
            }),
            Operation::Release { qureg, dirty: false } => Ok(Operation::Alloc(qureg.clone())),
            Operation::Release { dirty: true, .. } => {
                Err(CoreError::NonInvertible("dirty release"))
            }
            Operation::GlobalPhase { degrees } => Ok(Operation::GlobalPhase { degrees: -degrees }),
            op if op.is_self_inverse() => Ok(op.clone()),
            Operation::Measure { .. } | Operation::StartMbu(_) | Operation::EndMbu { .. } => {
                Err(CoreError::NonInvertible(self.name()))
            }
            Operation::LetRValue { rvalue, target } => Ok(Operation::DelRValue {
                rvalue: rvalue.clone(),
                target: target.clone(),
            }),
            Operation::DelRValue { rvalue, target } => Ok(Operation::LetRValue {
                rvalue: rvalue.clone(),
                target: target.clone(),
            }),
            Operation::Controlled { op, controls } => Ok(Operation::Controlled {
                op: Box::new(op.inverse()?),
                controls: controls.clone(),
            }),
            Operation::Inverse(op) => Ok((**op).clone()),
            composite => Ok(Operation::Inverse(Box::new(composite.clone()))),
        }
    }

    /// Whether the operation is its own inverse.
    pub fn is_self_inverse(&self) -> bool {
        match self {
            Operation::PhaseFlip | Operation::Toggle(_) | Operation::XorEqual { .. } => true,
            Operation::Controlled { op, .. } => op.is_self_inverse(),
            _ => false,
        }
    }

    /// Decompose a composite into simpler operations, emitted under
    /// `controls`. The ambient guard must already be reset.
    pub fn emit_ops(&self, controls: &QubitIntersection) -> CoreResult<()> {
        match self {
            Operation::LetRValue { rvalue, target } => rvalue.materialize(target, controls),
            Operation::DelRValue { rvalue, target } => rvalue.erase(target, controls),
            Operation::XorEqual { lvalue, mask } => match mask {
                RValue::Int(v) => do_xor_const(lvalue, *v, controls.clone()),
                mask => do_xor(lvalue, mask.clone(), controls.clone()),
            },
            Operation::PlusEqual {
                lvalue,
                offset,
                carry_in,
            } => do_addition(lvalue, offset.clone(), *carry_in, controls.clone()),
            Operation::PlusEqualProduct {
                lvalue,
                factor,
                const_factor,
            } => do_multiply_add(lvalue, factor.clone(), *const_factor, controls.clone()),
            Operation::TimesEqual { lvalue, factor } => {
                do_multiplication(lvalue, *factor, controls.clone())
            }
            Operation::Controlled { op, controls: inner } => {
                emit_under(op, &controls.intersect(inner))
            }
            Operation::Inverse(op) => inverted(|| emit_under(op, controls)),
            primitive => Err(CoreError::UnprocessedTerminal(primitive.name())),
        }
    }

    /// Apply the operation's effect to a classical state, or undo it when
    /// `forward` is false.
    pub fn mutate_state<S: ClassicalSimState + ?Sized>(
        &self,
        state: &mut S,
        forward: bool,
        controls: &QubitIntersection,
    ) -> CoreResult<()> {
        match self {
            Operation::Alloc(qureg) => {
                if forward {
                    state.alloc_register(qureg)
                } else {
                    state.release_register(qureg, false)
                }
            }
            Operation::Release { qureg, dirty } => match (forward, dirty) {
                (true, _) => state.release_register(qureg, *dirty),
                (false, false) => state.alloc_register(qureg),
                (false, true) => Err(CoreError::NonInvertible("dirty release")),
            },
            Operation::Measure { qureg, reset } => {
                if !forward {
                    return Err(CoreError::NonInvertible("measure"));
                }
                if *reset {
                    state.write_quint(qureg, 0)?;
                }
                Ok(())
            }
            Operation::StartMbu(_) | Operation::EndMbu { .. } => Err(CoreError::NotImplemented {
                sink: "classical state mutation".to_string(),
                operation: self.name(),
            }),
            Operation::Controlled { op, controls: inner } => {
                op.mutate_state(state, forward, &controls.intersect(inner))
            }
            Operation::Inverse(op) => op.mutate_state(state, !forward, controls),
            guarded => {
                if !state.resolve_controls(controls)? {
                    return Ok(());
                }
                guarded.mutate_guarded(state, forward)
            }
        }
    }

    fn mutate_guarded<S: ClassicalSimState + ?Sized>(
        &self,
        state: &mut S,
        forward: bool,
    ) -> CoreResult<()> {
        match self {
            Operation::PhaseFlip => {
                state.flip_phase();
                Ok(())
            }
            Operation::GlobalPhase { degrees } => {
                state.rotate_phase(if forward { *degrees } else { -*degrees });
                Ok(())
            }
            Operation::Toggle(targets) => state.xor_quint(targets, low_mask(targets.len())),
            Operation::LetRValue { rvalue, target }
            | Operation::DelRValue { rvalue, target }
            | Operation::XorEqual {
                lvalue: target,
                mask: rvalue,
            } => {
                let value = rvalue.resolve(&*state)?;
                state.xor_quint(target.qureg(), value & low_mask(target.len()))
            }
            Operation::PlusEqual {
                lvalue,
                offset,
                carry_in,
            } => {
                let delta = offset.resolve(&*state)?.wrapping_add(u64::from(*carry_in));
                add_signed(state, lvalue, delta, forward)
            }
            Operation::PlusEqualProduct {
                lvalue,
                factor,
                const_factor,
            } => {
                let delta = factor.resolve(&*state)?.wrapping_mul(*const_factor);
                add_signed(state, lvalue, delta, forward)
            }
            Operation::TimesEqual { lvalue, factor } => {
                let inverse = modular_multiplicative_inverse(*factor).ok_or_else(|| {
                    CoreError::InvalidArgument(format!("cannot multiply in place by even {factor}"))
                })?;
                let k = if forward { *factor } else { inverse };
                let value = state.read_quint(lvalue.qureg())?;
                state.write_quint(
                    lvalue.qureg(),
                    value.wrapping_mul(k) & low_mask(lvalue.len()),
                )
            }
            other => Err(CoreError::UnprocessedTerminal(other.name())),
        }
    }
}

fn add_signed<S: ClassicalSimState + ?Sized>(
    state: &mut S,
    lvalue: &Quint,
    delta: u64,
    forward: bool,
) -> CoreResult<()> {
    let value = state.read_quint(lvalue.qureg())?;
    let result = if forward {
        value.wrapping_add(delta)
    } else {
        value.wrapping_sub(delta)
    };
    state.write_quint(lvalue.qureg(), result & low_mask(lvalue.len()))
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Alloc(q) => write!(f, "alloc {q}"),
            Operation::Release { qureg, dirty } => {
                write!(f, "release {qureg}{}", if *dirty { " (dirty)" } else { "" })
            }
            Operation::PhaseFlip => write!(f, "phase_flip"),
            Operation::GlobalPhase { degrees } => write!(f, "global_phase {degrees}deg"),
            Operation::Toggle(q) => write!(f, "toggle {q}"),
            Operation::Measure { qureg, reset } => {
                write!(f, "measure {qureg}{}", if *reset { " (reset)" } else { "" })
            }
            Operation::StartMbu(q) => write!(f, "start_mbu {q}"),
            Operation::EndMbu { qureg, .. } => write!(f, "end_mbu {qureg}"),
            Operation::LetRValue { rvalue, target } => write!(f, "{target} := {rvalue}"),
            Operation::DelRValue { rvalue, target } => write!(f, "{target} =: {rvalue}"),
            Operation::XorEqual { lvalue, mask } => write!(f, "{lvalue} ^= {mask}"),
            Operation::PlusEqual {
                lvalue,
                offset,
                carry_in,
            } => {
                write!(f, "{lvalue} += {offset}")?;
                if *carry_in {
                    write!(f, " + 1")?;
                }
                Ok(())
            }
            Operation::PlusEqualProduct {
                lvalue,
                factor,
                const_factor,
            } => write!(f, "{lvalue} += {factor} * {const_factor}"),
            Operation::TimesEqual { lvalue, factor } => write!(f, "{lvalue} *= {factor}"),
            Operation::Controlled { op, controls } => write!(f, "{op} if {controls}"),
            Operation::Inverse(op) => write!(f, "inverse({op})"),
        }
    }
}
