//! Fixed-width classical integer buffers used by classical references.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::low_mask;

/// A mutable unsigned integer of a fixed bit width. All arithmetic wraps
/// modulo `2^len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntBuf {
    value: u64,
    len: usize,
}

impl IntBuf {
    /// A buffer holding `value` truncated to `len` bits.
    pub fn new(value: u64, len: usize) -> Self {
        Self {
            value: value & low_mask(len),
            len,
        }
    }

    /// A zeroed buffer.
    pub fn zero(len: usize) -> Self {
        Self::new(0, len)
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.value
    }

    /// Bit width.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the width is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Overwrite the value, truncating.
    pub fn set(&mut self, value: u64) {
        self.value = value & low_mask(self.len);
    }

    /// `self ^= mask`
    pub fn xor_assign(&mut self, mask: u64) {
        self.set(self.value ^ mask);
    }

    /// `self += offset`
    pub fn add_assign(&mut self, offset: u64) {
        self.set(self.value.wrapping_add(offset));
    }

    /// `self -= offset`
    pub fn sub_assign(&mut self, offset: u64) {
        self.set(self.value.wrapping_sub(offset));
    }

    /// `self *= factor`
    pub fn mul_assign(&mut self, factor: u64) {
        self.set(self.value.wrapping_mul(factor));
    }
}

impl fmt::Display for IntBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.value, width = self.len.min(64))
    }
}
