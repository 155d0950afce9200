//! Guard sets: conjunctions of qubits that must all be on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::qubit::Qubit;

/// A set of qubits that must all hold `true`, plus a constant bit.
///
/// Intersection is set union. `NEVER` absorbs everything, `ALWAYS` is the
/// identity. Qubits are kept sorted and de-duplicated so equal guards compare
/// equal regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QubitIntersection {
    qubits: Vec<Qubit>,
    bit: bool,
}

impl QubitIntersection {
    /// The guard that always holds.
    pub const ALWAYS: QubitIntersection = QubitIntersection {
        qubits: Vec::new(),
        bit: true,
    };

    /// The guard that never holds.
    pub const NEVER: QubitIntersection = QubitIntersection {
        qubits: Vec::new(),
        bit: false,
    };

    /// Conjunction of the given qubits.
    pub fn new(qubits: impl IntoIterator<Item = Qubit>) -> Self {
        let mut qubits: Vec<Qubit> = qubits.into_iter().collect();
        qubits.sort();
        qubits.dedup();
        Self { qubits, bit: true }
    }

    /// A constant guard.
    pub fn constant(bit: bool) -> Self {
        if bit { Self::ALWAYS } else { Self::NEVER }
    }

    /// Logical AND of two guards.
    pub fn intersect(&self, other: &QubitIntersection) -> QubitIntersection {
        if !self.bit || !other.bit {
            return Self::NEVER;
        }
        if other.qubits.is_empty() {
            return self.clone();
        }
        if self.qubits.is_empty() {
            return other.clone();
        }
        Self::new(self.qubits.iter().chain(other.qubits.iter()).cloned())
    }

    /// Logical AND with one more qubit.
    pub fn and(&self, qubit: &Qubit) -> QubitIntersection {
        self.intersect(&QubitIntersection::from(qubit.clone()))
    }

    /// Whether this guard is trivially true.
    pub fn is_always(&self) -> bool {
        self.bit && self.qubits.is_empty()
    }

    /// Whether this guard is trivially false.
    pub fn is_never(&self) -> bool {
        !self.bit
    }

    /// The guarding qubits. Empty for `NEVER`.
    pub fn qubits(&self) -> &[Qubit] {
        if self.bit { &self.qubits } else { &[] }
    }

    /// The constant part of the guard.
    pub fn bit(&self) -> bool {
        self.bit
    }

    /// Number of guarding qubits.
    pub fn len(&self) -> usize {
        self.qubits().len()
    }

    /// Whether the guard has no qubits.
    pub fn is_empty(&self) -> bool {
        self.qubits().is_empty()
    }

    /// The single guarding qubit, if the guard is exactly one qubit.
    pub fn single(&self) -> Option<&Qubit> {
        match self.qubits() {
            [q] => Some(q),
            _ => None,
        }
    }
}

impl Default for QubitIntersection {
    fn default() -> Self {
        Self::ALWAYS
    }
}

impl From<Qubit> for QubitIntersection {
    fn from(qubit: Qubit) -> Self {
        Self {
            qubits: vec![qubit],
            bit: true,
        }
    }
}

impl From<&Qubit> for QubitIntersection {
    fn from(qubit: &Qubit) -> Self {
        qubit.clone().into()
    }
}

impl From<bool> for QubitIntersection {
    fn from(bit: bool) -> Self {
        Self::constant(bit)
    }
}

impl fmt::Display for QubitIntersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.bit {
            return write!(f, "never");
        }
        if self.qubits.is_empty() {
            return write!(f, "always");
        }
        for (k, q) in self.qubits.iter().enumerate() {
            if k > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{q}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::Qureg;
    use proptest::prelude::*;

    fn pool() -> Vec<Qubit> {
        Qureg::named("g", 6).qubits().to_vec()
    }

    fn guard_from(pool: &[Qubit], mask: u8, bit: bool) -> QubitIntersection {
        let g = QubitIntersection::new(
            pool.iter()
                .enumerate()
                .filter(|(i, _)| (mask >> i) & 1 == 1)
                .map(|(_, q)| q.clone()),
        );
        if bit { g } else { g.intersect(&QubitIntersection::NEVER) }
    }

    #[test]
    fn test_identity_and_absorption() {
        let q = pool();
        let g = QubitIntersection::new([q[0].clone(), q[2].clone()]);
        assert_eq!(g.intersect(&QubitIntersection::ALWAYS), g);
        assert!(g.intersect(&QubitIntersection::NEVER).is_never());
        assert!(g.intersect(&QubitIntersection::NEVER).qubits().is_empty());
    }

    #[test]
    fn test_dedup() {
        let q = pool();
        let g = QubitIntersection::new([q[1].clone(), q[0].clone(), q[1].clone()]);
        assert_eq!(g.len(), 2);
        assert_eq!(g, QubitIntersection::new([q[0].clone(), q[1].clone()]));
    }

    proptest! {
        #[test]
        fn prop_intersection_commutative(a in 0u8..64, b in 0u8..64, x: bool, y: bool) {
            let q = pool();
            let ga = guard_from(&q, a, x);
            let gb = guard_from(&q, b, y);
            prop_assert_eq!(ga.intersect(&gb), gb.intersect(&ga));
        }

        #[test]
        fn prop_intersection_associative(a in 0u8..64, b in 0u8..64, c in 0u8..64, x: bool) {
            let q = pool();
            let ga = guard_from(&q, a, x);
            let gb = guard_from(&q, b, true);
            let gc = guard_from(&q, c, true);
            prop_assert_eq!(
                ga.intersect(&gb).intersect(&gc),
                ga.intersect(&gb.intersect(&gc))
            );
        }
    }
}
