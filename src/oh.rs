//! OH/PH block compressor: folds up to 256 bytes of input into a 128-bit
//! result using carryless multiplication over GF(2), optionally in the
//! Toeplitz-shifted twin-lane form used for fingerprinting.
//!
//! Grounded on `examples/original_source/umash.c`'s `ph_one_block` /
//! `ph_last_block` (structure and the read-behind contract for the final,
//! possibly-overlapping pair); the portable carryless multiply itself is
//! grounded on `examples/other_examples/07294e2b_..._tachyon...-utils.rs.rs`'s
//! `clmul_u64`, since `_mm_clmulepi64_si128` has no portable std equivalent.

pub(crate) const OH_COUNT: usize = 32;
pub(crate) const TOEPLITZ_SHIFT: usize = 2;
pub(crate) const BLOCK_SIZE: usize = 256;

fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(bytes[0..8].try_into().unwrap())
}

/// Branchless widening carryless multiply of two 64-bit values, returning
/// `(lo, hi)` of the 128-bit GF(2) product.
#[inline]
pub(crate) fn clmul64(a: u64, b: u64) -> (u64, u64) {
    let mut lo = 0u64;
    let mut hi = 0u64;
    for i in 0..64 {
        let mask = ((b >> i) & 1).wrapping_neg();
        let msg_lo = a << i;
        let msg_hi = if i == 0 { 0 } else { a >> (64 - i) };
        lo ^= msg_lo & mask;
        hi ^= msg_hi & mask;
    }
    (lo, hi)
}

#[inline]
fn xor128(acc: (u64, u64), rhs: (u64, u64)) -> (u64, u64) {
    (acc.0 ^ rhs.0, acc.1 ^ rhs.1)
}

/// Compresses one full 256-byte block, keyed by 32 consecutive `oh` words
/// starting at `oh[shift]`.
fn fold_full_block(oh: &[u64], shift: usize, seed: u64, block: &[u8]) -> (u64, u64) {
    debug_assert_eq!(block.len(), BLOCK_SIZE);
    let mut acc = (seed, 0u64);
    for (pair, chunk) in block.chunks_exact(16).enumerate() {
        let x = read_u64_le(&chunk[0..8]) ^ oh[shift + 2 * pair];
        let y = read_u64_le(&chunk[8..16]) ^ oh[shift + 2 * pair + 1];
        acc = xor128(acc, clmul64(x, y));
    }
    acc
}

/// Compresses a variable-length block of `n_bytes` in `[1, 256]`, taken
/// from `buf[start..start + n_bytes]`. The final 16 bytes of the block
/// (which may overlap the penultimate pair when `n_bytes` isn't a multiple
/// of 16) must be readable; this is the caller's "16 readable bytes behind
/// the block end" precondition.
fn fold_varblock(oh: &[u64], shift: usize, seed: u64, buf: &[u8], start: usize, n_bytes: usize) -> (u64, u64) {
    debug_assert!(n_bytes >= 1 && n_bytes <= BLOCK_SIZE);
    let block = &buf[start..start + n_bytes];

    let remaining = 1 + (n_bytes - 1) % 16;
    let end_full_pairs = (n_bytes - remaining) / 8;

    let mut acc = (seed, 0u64);
    let mut pair = 0usize;
    while pair < end_full_pairs {
        let off = pair * 8;
        let x = read_u64_le(&block[off..off + 8]) ^ oh[shift + pair];
        let y = read_u64_le(&block[off + 8..off + 16]) ^ oh[shift + pair + 1];
        acc = xor128(acc, clmul64(x, y));
        pair += 2;
    }

    // The final pair reads the last 16 bytes *ending at* the block, which
    // may reach behind `start` when `n_bytes < 16` (e.g. a one-shot tail
    // of 1..15 bytes). That's the read-behind precondition of §4.4/§9:
    // read from the absolute backing buffer, not from the length-`n_bytes`
    // `block` slice, which is too short to contain those bytes itself.
    let last = &buf[start + n_bytes - 16..start + n_bytes];
    let x = read_u64_le(&last[0..8]) ^ oh[shift + pair];
    let y = read_u64_le(&last[8..16]) ^ oh[shift + pair + 1];
    xor128(acc, clmul64(x, y))
}

/// Single-lane full-block fold, lane 0 (`oh[0..32]`).
pub(crate) fn oh_one_block(oh: &[u64; 34], seed: u64, block: &[u8]) -> (u64, u64) {
    fold_full_block(oh, 0, seed, block)
}

/// Single-lane variable-length fold, lane 0 (`oh[0..32]`).
pub(crate) fn oh_varblock(oh: &[u64; 34], seed: u64, buf: &[u8], start: usize, n_bytes: usize) -> (u64, u64) {
    fold_varblock(oh, 0, seed, buf, start, n_bytes)
}

/// Single-lane full-block fold for an explicit lane (`lane_shift` is 0 or
/// `TOEPLITZ_SHIFT`), used by the one-shot long path to compress either
/// lane without paying for the other lane's unused work.
pub(crate) fn oh_one_block_lane(oh: &[u64; 34], lane_shift: usize, seed: u64, block: &[u8]) -> (u64, u64) {
    fold_full_block(oh, lane_shift, seed, block)
}

/// Single-lane variable-length fold for an explicit lane.
pub(crate) fn oh_varblock_lane(
    oh: &[u64; 34],
    lane_shift: usize,
    seed: u64,
    buf: &[u8],
    start: usize,
    n_bytes: usize,
) -> (u64, u64) {
    fold_varblock(oh, lane_shift, seed, buf, start, n_bytes)
}

/// Two-lane full-block fold for fingerprinting: lane 0 reads `oh[0..32]`,
/// lane 1 reads `oh[2..34]` (the Toeplitz shift).
pub(crate) fn oh_one_block_fprint(oh: &[u64; 34], seed: u64, block: &[u8]) -> [(u64, u64); 2] {
    [
        fold_full_block(oh, 0, seed, block),
        fold_full_block(oh, TOEPLITZ_SHIFT, seed, block),
    ]
}

/// Two-lane variable-length fold for fingerprinting.
pub(crate) fn oh_varblock_fprint(
    oh: &[u64; 34],
    seed: u64,
    buf: &[u8],
    start: usize,
    n_bytes: usize,
) -> [(u64, u64); 2] {
    [
        fold_varblock(oh, 0, seed, buf, start, n_bytes),
        fold_varblock(oh, TOEPLITZ_SHIFT, seed, buf, start, n_bytes),
    ]
}
