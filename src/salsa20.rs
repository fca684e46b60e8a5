//! Salsa20 keystream generator, used purely as a deterministic parameter
//! expander for [`crate::params::Params::derive`] — not for encryption.
//!
//! Grounded on `examples/typed-io-cryptoxide/src/salsa20.rs`'s `State` /
//! `QR!` quarter-round macro and block-update structure, narrowed to the
//! single variant this crate needs: a 32-byte key, an 8-byte nonce, 20
//! rounds, and a keystream-only `process` (no separate cipher object, no
//! 16-byte-key or XSalsa path, since `Params::derive` never encrypts real
//! plaintext).

const CONSTANT: &[u8; 16] = b"expand 32-byte k";

macro_rules! quarter_round {
    ($a:ident, $b:ident, $c:ident, $d:ident) => {
        $b ^= $a.wrapping_add($d).rotate_left(7);
        $c ^= $b.wrapping_add($a).rotate_left(9);
        $d ^= $c.wrapping_add($b).rotate_left(13);
        $a ^= $d.wrapping_add($c).rotate_left(18);
    };
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn write_u32_le(dst: &mut [u8], value: u32) {
    dst[0..4].copy_from_slice(&value.to_le_bytes());
}

struct State {
    words: [u32; 16],
}

impl State {
    fn init(key: &[u8; 32], nonce: &[u8; 8]) -> Self {
        let words = [
            read_u32_le(&CONSTANT[0..4]),
            read_u32_le(&key[0..4]),
            read_u32_le(&key[4..8]),
            read_u32_le(&key[8..12]),
            read_u32_le(&key[12..16]),
            read_u32_le(&CONSTANT[4..8]),
            read_u32_le(&nonce[0..4]),
            read_u32_le(&nonce[4..8]),
            0,
            0,
            read_u32_le(&CONSTANT[8..12]),
            read_u32_le(&key[16..20]),
            read_u32_le(&key[20..24]),
            read_u32_le(&key[24..28]),
            read_u32_le(&key[28..32]),
            read_u32_le(&CONSTANT[12..16]),
        ];
        State { words }
    }

    fn block(&self) -> [u32; 16] {
        let [mut x0, mut x1, mut x2, mut x3, mut x4, mut x5, mut x6, mut x7, mut x8, mut x9, mut x10, mut x11, mut x12, mut x13, mut x14, mut x15] =
            self.words;

        for _ in 0..10 {
            quarter_round!(x0, x4, x8, x12);
            quarter_round!(x5, x9, x13, x1);
            quarter_round!(x10, x14, x2, x6);
            quarter_round!(x15, x3, x7, x11);
            quarter_round!(x0, x1, x2, x3);
            quarter_round!(x5, x6, x7, x4);
            quarter_round!(x10, x11, x8, x9);
            quarter_round!(x15, x12, x13, x14);
        }

        let rounds = [
            x0, x1, x2, x3, x4, x5, x6, x7, x8, x9, x10, x11, x12, x13, x14, x15,
        ];

        let mut out = [0u32; 16];
        for i in 0..16 {
            out[i] = rounds[i].wrapping_add(self.words[i]);
        }
        out
    }

    fn increment(&mut self) {
        self.words[8] = self.words[8].wrapping_add(1);
        if self.words[8] == 0 {
            self.words[9] = self.words[9].wrapping_add(1);
        }
    }
}

/// Fills `dst` with Salsa20/20 keystream bytes, starting at block counter 0.
pub(crate) fn salsa20_stream(dst: &mut [u8], key: &[u8; 32], nonce: &[u8; 8]) {
    let mut state = State::init(key, nonce);
    for chunk in dst.chunks_mut(64) {
        let block = state.block();
        let mut block_bytes = [0u8; 64];
        for (i, word) in block.iter().enumerate() {
            write_u32_le(&mut block_bytes[i * 4..i * 4 + 4], *word);
        }
        chunk.copy_from_slice(&block_bytes[..chunk.len()]);
        state.increment();
    }
}
