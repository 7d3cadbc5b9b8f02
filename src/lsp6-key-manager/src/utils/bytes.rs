//! Packing of two `uint128` halves into one 256-bit word.
//!
//! LSP25 uses this layout twice: relay nonces (`channel << 128 | sequence`) and validity
//! timestamps (`start << 128 | end`).

use alloy_primitives::U256;

/// Split `word` into its high and low 128 bits.
pub fn split_u128_pair(word: U256) -> (u128, u128) {
    let limbs = word.as_limbs();
    let low = (limbs[1] as u128) << 64 | limbs[0] as u128;
    let high = (limbs[3] as u128) << 64 | limbs[2] as u128;
    (high, low)
}

pub fn join_u128_pair(high: u128, low: u128) -> U256 {
    U256::from_limbs([low as u64, (low >> 64) as u64, high as u64, (high >> 64) as u64])
}
