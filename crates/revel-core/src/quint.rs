//! Integer lvalues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeBounds;

use crate::context::emit;
use crate::error::CoreResult;
use crate::inverse::inverted;
use crate::operation::Operation;
use crate::qubit::{Qubit, Qureg};
use crate::rvalue::{LessThan, RValue};
use crate::util::leading_zero_bit_count;

/// A register read as an unsigned little-endian integer.
///
/// The mutating helpers emit operations to the ambient sink; they do not
/// touch concrete values directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quint {
    qureg: Qureg,
}

impl Quint {
    /// View a register as an integer.
    pub fn new(qureg: Qureg) -> Self {
        Self { qureg }
    }

    /// The underlying register.
    pub fn qureg(&self) -> &Qureg {
        &self.qureg
    }

    /// Bit width.
    pub fn len(&self) -> usize {
        self.qureg.len()
    }

    /// Whether the width is zero.
    pub fn is_empty(&self) -> bool {
        self.qureg.is_empty()
    }

    /// Qubit at a bit position.
    pub fn get(&self, index: usize) -> Option<&Qubit> {
        self.qureg.get(index)
    }

    /// Iterate over the qubits, least significant first.
    pub fn iter(&self) -> std::slice::Iter<'_, Qubit> {
        self.qureg.iter()
    }

    /// A sub-integer view over a range of bit positions.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Quint {
        Quint::new(self.qureg.slice(range))
    }

    /// Append more significant bits.
    pub fn concat(&self, high: &Quint) -> Quint {
        Quint::new(self.qureg.concat(&high.qureg))
    }

    /// Display name of the least significant qubit's register.
    pub fn name(&self) -> &str {
        self.qureg.get(0).map_or("_", |q| q.name.as_str())
    }

    /// `self < rhs`
    pub fn lt(&self, rhs: impl Into<RValue>) -> RValue {
        LessThan::rvalue(self.clone(), rhs, false)
    }

    /// `self <= rhs`
    pub fn le(&self, rhs: impl Into<RValue>) -> RValue {
        LessThan::rvalue(self.clone(), rhs, true)
    }

    /// `self > rhs`
    pub fn gt(&self, rhs: impl Into<RValue>) -> RValue {
        LessThan::rvalue(rhs, self.clone(), false)
    }

    /// `self >= rhs`
    pub fn ge(&self, rhs: impl Into<RValue>) -> RValue {
        LessThan::rvalue(rhs, self.clone(), true)
    }

    /// `self * factor` as an expression.
    pub fn scaled(&self, factor: u64) -> RValue {
        RValue::Scaled {
            quint: self.clone(),
            factor,
        }
    }

    /// Materialize `value` into this (zeroed) location.
    pub fn init(&self, value: impl Into<RValue>) -> CoreResult<()> {
        emit(Operation::LetRValue {
            rvalue: value.into(),
            target: self.clone(),
        })
    }

    /// Erase `value` from this location, leaving it zero.
    pub fn clear(&self, value: impl Into<RValue>) -> CoreResult<()> {
        emit(Operation::DelRValue {
            rvalue: value.into(),
            target: self.clone(),
        })
    }

    /// `self ^= mask`
    pub fn xor_assign(&self, mask: impl Into<RValue>) -> CoreResult<()> {
        emit(Operation::XorEqual {
            lvalue: self.clone(),
            mask: mask.into(),
        })
    }

    /// `self += offset`
    ///
    /// Constant offsets skip their trailing zero bits by shrinking the
    /// target to `self[k..]`.
    pub fn add_assign(&self, offset: impl Into<RValue>) -> CoreResult<()> {
        let offset = offset.into();
        if let RValue::Int(value) = offset {
            let Some(skip) = leading_zero_bit_count(value) else {
                return Ok(());
            };
            let skip = skip as usize;
            if skip >= self.len() {
                return Ok(());
            }
            return emit(Operation::PlusEqual {
                lvalue: self.slice(skip..),
                offset: RValue::Int(value >> skip),
                carry_in: false,
            });
        }
        emit(Operation::PlusEqual {
            lvalue: self.clone(),
            offset,
            carry_in: false,
        })
    }

    /// `self -= offset`
    pub fn sub_assign(&self, offset: impl Into<RValue>) -> CoreResult<()> {
        inverted(|| self.add_assign(offset))
    }

    /// `self += factor * const_factor`
    pub fn add_product(&self, factor: impl Into<RValue>, const_factor: u64) -> CoreResult<()> {
        emit(Operation::PlusEqualProduct {
            lvalue: self.clone(),
            factor: factor.into(),
            const_factor,
        })
    }

    /// `self *= factor` for an odd constant.
    pub fn mul_assign(&self, factor: u64) -> CoreResult<()> {
        emit(Operation::TimesEqual {
            lvalue: self.clone(),
            factor,
        })
    }
}

impl From<Qureg> for Quint {
    fn from(qureg: Qureg) -> Self {
        Quint::new(qureg)
    }
}

impl From<Qubit> for Quint {
    fn from(qubit: Qubit) -> Self {
        Quint::new(Qureg::from(qubit))
    }
}

impl fmt::Display for Quint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.qureg.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture;

    #[test]
    fn test_constant_offset_skips_low_zero_bits() {
        let x = Quint::new(Qureg::named("x", 4));
        let (_, ops) = capture(|| x.add_assign(12u64)).unwrap();
        assert_eq!(
            ops,
            vec![Operation::PlusEqual {
                lvalue: x.slice(2..),
                offset: RValue::Int(3),
                carry_in: false,
            }]
        );

        let (_, ops) = capture(|| {
            x.add_assign(0u64)?;
            x.add_assign(16u64)
        })
        .unwrap();
        assert!(ops.is_empty());
    }
}
