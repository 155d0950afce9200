//! Integer helpers shared by the arithmetic routines.

/// Mask covering the low `len` bits.
pub fn low_mask(len: usize) -> u64 {
    if len >= 64 { u64::MAX } else { (1u64 << len) - 1 }
}

/// Number of bits needed to represent `value` (0 for 0).
pub fn bit_len(value: u64) -> usize {
    floor_lg2(value).map_or(0, |k| k as usize + 1)
}

/// Largest `k` with `2^k <= n`. `None` for zero.
pub fn floor_lg2(n: u64) -> Option<u32> {
    if n == 0 { None } else { Some(63 - n.leading_zeros()) }
}

/// Count of zero bits below the lowest set bit. `None` for zero.
pub fn leading_zero_bit_count(n: u64) -> Option<u32> {
    if n == 0 { None } else { Some(n.trailing_zeros()) }
}

/// Pack little-endian bits into an integer.
pub fn little_endian_int(bits: &[bool]) -> u64 {
    bits.iter()
        .take(64)
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | (u64::from(b) << i))
}

/// The low `len` bits of `value`, least significant first.
pub fn little_endian_bits(value: u64, len: usize) -> Vec<bool> {
    (0..len).map(|i| i < 64 && (value >> i) & 1 == 1).collect()
}

/// Inverse of an odd `factor` modulo 2^64.
///
/// Reduce the result modulo `2^n` for an n-bit register.
pub fn modular_multiplicative_inverse(factor: u64) -> Option<u64> {
    if factor % 2 == 0 {
        return None;
    }
    // Newton iteration doubles the number of correct low bits each round.
    let mut inv = factor;
    for _ in 0..6 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(factor.wrapping_mul(inv)));
    }
    Some(inv)
}
