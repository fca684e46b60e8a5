//! Parameter derivation and validation: turning a 32-byte secret key plus a
//! 64-bit tweak into a fully validated [`Params`].
//!
//! Grounded on `spec.md` §4.3 for the derive/validate walk (the retained
//! `examples/original_source/umash.c` snapshot doesn't carry
//! `umash_params_derive`/`umash_params_prepare`, so the rejection-sampling
//! mechanics are this port's own reading of that section — see
//! `DESIGN.md` "Open Question decisions" #2) and on
//! `examples/backtrace-labs-umash-rs/src/lib.rs`'s `Params::derive` for the
//! public shape this crate's façade keeps.

use crate::arith::{square_mod_q, Q};
use crate::oh::TOEPLITZ_SHIFT;
use crate::salsa20::salsa20_stream;

/// OH/PH parameter count plus the Toeplitz-shifted lane's extra pair.
pub const OH_TOTAL: usize = crate::oh::OH_COUNT + TOEPLITZ_SHIFT;

/// Default key used when `derive` is called with no explicit key.
pub const DEFAULT_KEY: &[u8; 32] = b"Do not use UMASH VS adversaries.";

/// A validated set of UMASH parameters: two polynomial lanes plus the
/// shared OH/PH table. Immutable once derived; cheap and safe to share
/// across any number of concurrent hashers (see `spec.md` §5).
#[derive(Clone)]
pub(crate) struct RawParams {
    pub(crate) poly: [[u64; 2]; 2],
    pub(crate) oh: [u64; OH_TOTAL],
}

const RAW_PARAMS_WORDS: usize = 2 * 2 + OH_TOTAL;
const RAW_PARAMS_BYTES: usize = RAW_PARAMS_WORDS * 8;

impl RawParams {
    fn from_words(words: &[u64; RAW_PARAMS_WORDS]) -> Self {
        let poly = [[words[0], words[1]], [words[2], words[3]]];
        let mut oh = [0u64; OH_TOTAL];
        oh.copy_from_slice(&words[4..]);
        RawParams { poly, oh }
    }

    /// Validates and repairs an expanded parameter word list in place,
    /// following `spec.md` §4.3: each polynomial multiplier `f` must lie
    /// in `(0, 2**61 - 1)`, and every `oh` entry must be pairwise distinct.
    /// Invalid entries are refilled from a shared two-word entropy buffer
    /// (the two raw "square" slots, before they're overwritten with the
    /// real squares); returns `None` if that buffer runs out before all
    /// entries validate, signalling the caller to retry with a new nonce.
    fn prepare(mut self) -> Option<Self> {
        // The two raw square slots double as a shared entropy reserve for
        // repairing whichever lane or oh-table entry turns out invalid.
        let mut entropy = [self.poly[0][0], self.poly[1][0]];
        let mut entropy_used = 0usize;

        let mut take_entropy = || -> Option<u64> {
            if entropy_used < entropy.len() {
                let v = entropy[entropy_used];
                entropy_used += 1;
                Some(v)
            } else {
                None
            }
        };

        for lane in 0..2 {
            let mut f = self.poly[lane][1] % Q;
            while f == 0 {
                f = take_entropy()? % Q;
            }
            self.poly[lane][0] = square_mod_q(f);
            self.poly[lane][1] = f;
        }

        for i in 0..self.oh.len() {
            loop {
                let duplicate = self.oh[..i].iter().any(|&prev| prev == self.oh[i]);
                if !duplicate {
                    break;
                }
                self.oh[i] = take_entropy()?;
            }
        }

        // consume the closure's captured mutable state so the borrow checker
        // sees `entropy`/`entropy_used` as used past their last read.
        let _ = entropy_used;
        let _ = &mut entropy;

        Some(self)
    }
}

/// Derives a validated [`RawParams`] from `key` (exactly 32 bytes; shorter
/// keys are zero-padded by the caller, per the teacher's `Params::derive`)
/// and tweak `bits`. Retries with an incremented nonce on the
/// astronomically unlikely event that rejection sampling exhausts its
/// entropy buffer.
pub(crate) fn derive(bits: u64, key: &[u8; 32]) -> RawParams {
    let mut nonce = bits;
    loop {
        let mut raw_bytes = [0u8; RAW_PARAMS_BYTES];
        salsa20_stream(&mut raw_bytes, key, &nonce.to_le_bytes());

        let mut words = [0u64; RAW_PARAMS_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = u64::from_le_bytes(raw_bytes[i * 8..i * 8 + 8].try_into().unwrap());
        }

        if let Some(params) = RawParams::from_words(&words).prepare() {
            return params;
        }
        nonce = nonce.wrapping_add(1);
    }
}
