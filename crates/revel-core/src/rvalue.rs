//! Expression values that can be written into and erased from an lvalue.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arithmetic::cmp::do_if_less_than;
use crate::arithmetic::lookup::{LookupTable, do_xor_lookup};
use crate::context::emit;
use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::{Qubit, Qureg};
use crate::sink::ClassicalSimState;
use crate::util::{bit_len, low_mask};

/// A comparison between two integer expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessThan {
    /// Left-hand side.
    pub lhs: RValue,
    /// Right-hand side.
    pub rhs: RValue,
    /// Whether equality also counts as true.
    pub or_equal: RValue,
}

impl LessThan {
    /// `lhs < rhs`, or `lhs <= rhs` when `or_equal`.
    pub fn rvalue(lhs: impl Into<RValue>, rhs: impl Into<RValue>, or_equal: bool) -> RValue {
        RValue::LessThan(Box::new(LessThan {
            lhs: lhs.into(),
            rhs: rhs.into(),
            or_equal: RValue::Bool(or_equal),
        }))
    }
}

/// `table[address]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
    /// The constant rows.
    pub table: LookupTable,
    /// The index expression.
    pub address: RValue,
}

/// An expression that knows how to XOR itself into a location and back out.
///
/// For every variant, `materialize` followed by `erase` under the same guard
/// leaves the target unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RValue {
    /// Integer constant.
    Int(u64),
    /// Boolean constant.
    Bool(bool),
    /// A single qubit read as a boolean.
    Qubit(Qubit),
    /// A register read as an integer.
    Quint(Quint),
    /// `quint * factor`
    Scaled {
        /// The register.
        quint: Quint,
        /// Constant factor.
        factor: u64,
    },
    /// Conjunction of qubits.
    Intersection(QubitIntersection),
    /// Carry-chain comparison.
    LessThan(Box<LessThan>),
    /// Table lookup.
    Lookup(Box<Lookup>),
}

impl RValue {
    /// Width of a fresh location able to hold every value of this expression.
    pub fn bit_len_hint(&self) -> usize {
        match self {
            RValue::Int(v) => bit_len(*v),
            RValue::Bool(_) | RValue::Qubit(_) | RValue::Intersection(_) | RValue::LessThan(_) => 1,
            RValue::Quint(q) => q.len(),
            RValue::Scaled { quint, factor } => quint.len() + bit_len(*factor),
            RValue::Lookup(l) => l.table.output_len(),
        }
    }

    /// Whether the expression is boolean typed.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            RValue::Bool(_) | RValue::Qubit(_) | RValue::Intersection(_) | RValue::LessThan(_)
        ) || matches!(self, RValue::Int(0 | 1))
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RValue::Int(_) => "int",
            RValue::Bool(_) => "bool",
            RValue::Qubit(_) => "qubit",
            RValue::Quint(_) => "quint",
            RValue::Scaled { .. } => "scaled",
            RValue::Intersection(_) => "intersection",
            RValue::LessThan(_) => "less_than",
            RValue::Lookup(_) => "lookup",
        }
    }

    /// XOR the value into `target` where `controls` holds.
    pub fn materialize(&self, target: &Quint, controls: &QubitIntersection) -> CoreResult<()> {
        match self {
            RValue::Scaled { quint, factor } => emit(
                Operation::PlusEqualProduct {
                    lvalue: target.clone(),
                    factor: RValue::Quint(quint.clone()),
                    const_factor: *factor,
                }
                .controlled_by(controls.clone()),
            ),
            _ => self.xor_into(target, controls),
        }
    }

    /// Undo [`RValue::materialize`] on the same target and guard.
    pub fn erase(&self, target: &Quint, controls: &QubitIntersection) -> CoreResult<()> {
        match self {
            RValue::Scaled { quint, factor } => emit(
                Operation::Inverse(Box::new(Operation::PlusEqualProduct {
                    lvalue: target.clone(),
                    factor: RValue::Quint(quint.clone()),
                    const_factor: *factor,
                }))
                .controlled_by(controls.clone()),
            ),
            _ => self.xor_into(target, controls),
        }
    }

    fn xor_into(&self, target: &Quint, controls: &QubitIntersection) -> CoreResult<()> {
        let toggle_low = |guard: QubitIntersection| -> CoreResult<()> {
            let low = target.qureg().slice(..1);
            if low.is_empty() {
                return Err(CoreError::InvalidArgument(format!(
                    "cannot store a {} in an empty location",
                    self.kind()
                )));
            }
            emit(Operation::Toggle(low).controlled_by(guard))
        };
        match self {
            RValue::Int(v) => {
                if v & !low_mask(target.len()) != 0 {
                    return Err(CoreError::InvalidArgument(format!(
                        "{v} does not fit in {target}"
                    )));
                }
                if *v == 0 {
                    return Ok(());
                }
                emit(Operation::Toggle(target.qureg().masked(*v)).controlled_by(controls.clone()))
            }
            RValue::Bool(false) => Ok(()),
            RValue::Bool(true) => toggle_low(controls.clone()),
            RValue::Qubit(q) => toggle_low(controls.and(q)),
            RValue::Intersection(c) => toggle_low(controls.intersect(c)),
            RValue::Quint(src) => {
                if src.len() > target.len() {
                    return Err(CoreError::InvalidArgument(format!(
                        "{src} does not fit in {target}"
                    )));
                }
                for (t, s) in target.iter().zip(src.iter()) {
                    emit(Operation::Toggle(Qureg::from(t.clone())).controlled_by(controls.and(s)))?;
                }
                Ok(())
            }
            RValue::LessThan(cmp) => {
                let low = target.qureg().slice(..1);
                if low.is_empty() {
                    return toggle_low(controls.clone());
                }
                do_if_less_than(
                    cmp.lhs.clone(),
                    cmp.rhs.clone(),
                    cmp.or_equal.clone(),
                    Operation::Toggle(low),
                    controls.clone(),
                )
            }
            RValue::Lookup(lookup) => {
                do_xor_lookup(target, &lookup.table, lookup.address.clone(), controls.clone())
            }
            RValue::Scaled { .. } => self.materialize(target, controls),
        }
    }

    /// The concrete value under a classical state.
    pub fn resolve<S: ClassicalSimState + ?Sized>(&self, state: &S) -> CoreResult<u64> {
        Ok(match self {
            RValue::Int(v) => *v,
            RValue::Bool(b) => u64::from(*b),
            RValue::Qubit(q) => u64::from(state.read_bit(q)?),
            RValue::Quint(q) => state.read_quint(q.qureg())?,
            RValue::Scaled { quint, factor } => {
                state.read_quint(quint.qureg())?.wrapping_mul(*factor)
            }
            RValue::Intersection(c) => u64::from(state.resolve_controls(c)?),
            RValue::LessThan(cmp) => {
                let lhs = cmp.lhs.resolve(state)?;
                let rhs = cmp.rhs.resolve(state)?;
                let or_equal = cmp.or_equal.resolve(state)? != 0;
                u64::from(lhs < rhs || (or_equal && lhs == rhs))
            }
            RValue::Lookup(lookup) => {
                let address = lookup.address.resolve(state)?;
                lookup.table.get(address).unwrap_or(0)
            }
        })
    }
}

/// One-hot decode: bit `v` of the result is set when `binary` holds `v`.
pub fn unary(binary: &Quint, len: usize) -> RValue {
    let rows = (0..len.min(64)).map(|k| 1u64 << k).collect();
    LookupTable::with_output_len(rows, len.min(64)).lookup(binary.clone())
}

impl From<u64> for RValue {
    fn from(value: u64) -> Self {
        RValue::Int(value)
    }
}

impl From<bool> for RValue {
    fn from(value: bool) -> Self {
        RValue::Bool(value)
    }
}

impl From<Qubit> for RValue {
    fn from(qubit: Qubit) -> Self {
        RValue::Qubit(qubit)
    }
}

impl From<&Qubit> for RValue {
    fn from(qubit: &Qubit) -> Self {
        RValue::Qubit(qubit.clone())
    }
}

impl From<Quint> for RValue {
    fn from(quint: Quint) -> Self {
        RValue::Quint(quint)
    }
}

impl From<&Quint> for RValue {
    fn from(quint: &Quint) -> Self {
        RValue::Quint(quint.clone())
    }
}

impl From<QubitIntersection> for RValue {
    fn from(controls: QubitIntersection) -> Self {
        RValue::Intersection(controls)
    }
}

impl fmt::Display for RValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RValue::Int(v) => write!(f, "{v}"),
            RValue::Bool(b) => write!(f, "{b}"),
            RValue::Qubit(q) => write!(f, "{q}"),
            RValue::Quint(q) => write!(f, "{q}"),
            RValue::Scaled { quint, factor } => write!(f, "{quint} * {factor}"),
            RValue::Intersection(c) => write!(f, "{c}"),
            RValue::LessThan(cmp) => {
                let op = if cmp.or_equal == RValue::Bool(true) { "<=" } else { "<" };
                write!(f, "{} {op} {}", cmp.lhs, cmp.rhs)
            }
            RValue::Lookup(lookup) => write!(f, "T[{}]", lookup.address),
        }
    }
}
