//! Bit resources and registers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::util::little_endian_bits;

static NEXT_REGISTER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier minted for every named register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegisterId(pub u64);

impl RegisterId {
    /// Mint a fresh identifier.
    pub fn fresh() -> Self {
        RegisterId(NEXT_REGISTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A single bit resource.
///
/// Identity is the register it was minted with plus its position. Two
/// registers sharing a display name are still distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Qubit {
    /// The register identity.
    pub register: RegisterId,
    /// The index within the register, if any.
    pub index: Option<u32>,
    /// Display name of the register.
    pub name: String,
}

impl Qubit {
    /// Mint a stand-alone qubit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            register: RegisterId::fresh(),
            index: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(idx) => write!(f, "{}[{idx}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An ordered sequence of qubits, least significant first.
///
/// Slices are views sharing the same qubit identities; only the scope that
/// allocated a register releases it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Qureg {
    qubits: Vec<Qubit>,
}

impl Qureg {
    /// Mint a fresh register of `len` qubits named `name[0..len]`.
    pub fn named(name: &str, len: usize) -> Self {
        let register = RegisterId::fresh();
        let qubits = (0..len)
            .map(|i| Qubit {
                register,
                index: Some(i as u32),
                name: name.to_string(),
            })
            .collect();
        Self { qubits }
    }

    /// Create a register view over existing qubits.
    pub fn from_qubits(qubits: Vec<Qubit>) -> Self {
        Self { qubits }
    }

    /// Number of qubits.
    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    /// Whether the register holds no qubits.
    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }

    /// The qubits as a slice.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Qubit at a bit position.
    pub fn get(&self, index: usize) -> Option<&Qubit> {
        self.qubits.get(index)
    }

    /// Iterate over the qubits.
    pub fn iter(&self) -> std::slice::Iter<'_, Qubit> {
        self.qubits.iter()
    }

    /// A sub-register view. Out-of-range bounds are clamped.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Qureg {
        let n = self.qubits.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        }
        .min(n);
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => n,
        }
        .clamp(start, n);
        Qureg::from_qubits(self.qubits[start..end].to_vec())
    }

    /// The qubits selected by the set bits of `mask`.
    pub fn masked(&self, mask: u64) -> Qureg {
        Qureg::from_qubits(
            self.qubits
                .iter()
                .zip(little_endian_bits(mask, self.len().min(64)))
                .filter(|(_, on)| *on)
                .map(|(q, _)| q.clone())
                .collect(),
        )
    }

    /// Concatenate with another register (self is less significant).
    pub fn concat(&self, other: &Qureg) -> Qureg {
        let mut qubits = self.qubits.clone();
        qubits.extend(other.qubits.iter().cloned());
        Qureg::from_qubits(qubits)
    }

    /// Whether the two registers share any qubit.
    pub fn overlaps(&self, other: &Qureg) -> bool {
        self.qubits.iter().any(|q| other.qubits.contains(q))
    }
}

impl From<Qubit> for Qureg {
    fn from(qubit: Qubit) -> Self {
        Qureg::from_qubits(vec![qubit])
    }
}

impl FromIterator<Qubit> for Qureg {
    fn from_iter<I: IntoIterator<Item = Qubit>>(iter: I) -> Self {
        Qureg::from_qubits(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Qureg {
    type Item = &'a Qubit;
    type IntoIter = std::slice::Iter<'a, Qubit>;

    fn into_iter(self) -> Self::IntoIter {
        self.qubits.iter()
    }
}

impl fmt::Display for Qureg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.qubits.first() else {
            return write!(f, "[]");
        };
        let contiguous = first.index.is_some()
            && self.qubits.iter().enumerate().all(|(k, q)| {
                q.register == first.register
                    && q.index.zip(first.index).is_some_and(|(a, b)| a == b + k as u32)
            });
        match (contiguous, first.index) {
            (true, Some(start)) => {
                write!(f, "{}[{}:{}]", first.name, start, start as usize + self.len())
            }
            _ => {
                write!(f, "[")?;
                for (k, q) in self.qubits.iter().enumerate() {
                    if k > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{q}")?;
                }
                write!(f, "]")
            }
        }
    }
}
