//! Incremental streaming sink: absorbs input in 16-byte granules and
//! produces the same result as the one-shot path (`crate::hash`) for the
//! concatenated input, for any partition into `update` calls.
//!
//! Grounded on `spec.md` §3 (the `Sink` data model) and §4.6 (the two
//! state-machine subtleties: deferring the first filled granule until the
//! sink knows whether more bytes follow, and the look-behind buffer that
//! lets the final, possibly partial block re-read its overlapping tail).
//! No retained source file under `examples/original_source/` carries the
//! reference `umash_sink_update`, so the granule-absorption walk below is
//! this port's own reading of those two sections (see `DESIGN.md`).

use crate::arith::horner_double_update;
use crate::oh::{clmul64, OH_COUNT, TOEPLITZ_SHIFT};
use crate::params::RawParams;

fn read_u64_le(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(bytes.try_into().unwrap())
}

/// Streaming state shared by `Hasher` (one lane) and `Fingerprinter` (two
/// Toeplitz-shifted lanes). Mirrors `spec.md` §3's `Sink` field-for-field.
#[derive(Clone)]
pub(crate) struct Sink<'p> {
    params: &'p RawParams,
    seed: u64,
    /// `oh`-table shift for each active lane: `[0, TOEPLITZ_SHIFT]` when
    /// fingerprinting, or a single possibly-Toeplitz-shifted lane
    /// otherwise.
    shifts: [usize; 2],
    /// The one-shot `which` argument each lane corresponds to, so the
    /// short/medium fallback path (`crate::hash::umash_full`) dispatches
    /// to the same lane `shifts` was built for.
    which: [u64; 2],
    /// 1 for a plain hash, 2 when fingerprinting.
    lanes: usize,
    /// Polynomial accumulators, one per active lane.
    poly: [u64; 2],
    /// OH/PH block accumulators, one per active lane, seeded with `(seed, 0)`.
    ph_acc: [(u64, u64); 2],
    /// The most recently fully-absorbed 16-byte granule, kept so the final
    /// (possibly overlapping) pair can read behind it. Valid once
    /// `large_umash` is true.
    prev_granule: [u8; 16],
    /// Bytes of the next, not-yet-full granule.
    granule: [u8; 16],
    /// `0..=16`: how many bytes of `granule` are valid.
    bufsz: usize,
    /// `0..=OH_COUNT`, even: cursor of 16-byte pairs inside the current block.
    oh_iter: usize,
    /// Bytes accumulated into the current block so far (a multiple of 16,
    /// reset to 0 whenever a block closes).
    block_size: usize,
    /// Set once any full 16-byte granule has been absorbed via the block
    /// compressor; before that the sink might still take the short/medium
    /// one-shot path at `digest` time.
    large_umash: bool,
}

impl<'p> Sink<'p> {
    pub(crate) fn new(params: &'p RawParams, seed: u64, which: u64, fingerprinting: bool) -> Self {
        let lanes = if fingerprinting { 2 } else { 1 };
        // Per `spec.md` §6: only `which == 0` selects the primary lane;
        // any other value (not just `1`) is treated as the secondary lane.
        let which0 = if !fingerprinting && which != 0 { 1 } else { 0 };
        let shift0 = if which0 == 1 { TOEPLITZ_SHIFT } else { 0 };
        Sink {
            params,
            seed,
            shifts: [shift0, TOEPLITZ_SHIFT],
            which: [which0, 1],
            lanes,
            poly: [0, 0],
            ph_acc: [(seed, 0), (seed, 0)],
            prev_granule: [0u8; 16],
            granule: [0u8; 16],
            bufsz: 0,
            oh_iter: 0,
            block_size: 0,
            large_umash: false,
        }
    }

    fn absorb_granule(&mut self, granule: [u8; 16]) {
        for lane in 0..self.lanes {
            let shift = self.shifts[lane];
            let x = read_u64_le(&granule[0..8]) ^ self.params.oh[shift + self.oh_iter];
            let y = read_u64_le(&granule[8..16]) ^ self.params.oh[shift + self.oh_iter + 1];
            let (lo, hi) = clmul64(x, y);
            self.ph_acc[lane].0 ^= lo;
            self.ph_acc[lane].1 ^= hi;
        }
        self.prev_granule = granule;
        self.oh_iter += 2;
        self.block_size += 16;
        if self.oh_iter == OH_COUNT {
            self.close_block();
        }
    }

    fn close_block(&mut self) {
        for lane in 0..self.lanes {
            let m0 = self.params.poly[lane][0];
            let m1 = self.params.poly[lane][1];
            let (ph_lo, ph_hi) = self.ph_acc[lane];
            self.poly[lane] = horner_double_update(self.poly[lane], m0, m1, ph_lo, ph_hi);
            self.ph_acc[lane] = (self.seed, 0);
        }
        self.oh_iter = 0;
        self.block_size = 0;
    }

    /// Absorbs `data`, conceptually concatenating it to everything
    /// absorbed so far.
    pub(crate) fn update(&mut self, mut data: &[u8]) {
        if data.is_empty() {
            return;
        }

        if !self.large_umash {
            let take = (16 - self.bufsz).min(data.len());
            self.granule[self.bufsz..self.bufsz + take].copy_from_slice(&data[..take]);
            self.bufsz += take;
            data = &data[take..];

            if data.is_empty() {
                // Exactly <=16 bytes total so far: stay in S1/S2 and defer
                // absorption until we know whether more input follows.
                return;
            }

            // More than 16 bytes total: commit to the streaming path and
            // absorb the buffered granule as the first one.
            self.large_umash = true;
            let g = self.granule;
            self.bufsz = 0;
            self.absorb_granule(g);
        }

        while !data.is_empty() {
            let take = (16 - self.bufsz).min(data.len());
            self.granule[self.bufsz..self.bufsz + take].copy_from_slice(&data[..take]);
            self.bufsz += take;
            data = &data[take..];

            if self.bufsz == 16 {
                let g = self.granule;
                self.bufsz = 0;
                self.absorb_granule(g);
            }
        }
    }

    /// The last 16 bytes ending at `block_size + bufsz`, built from the
    /// look-behind granule and the pending tail. Only valid when
    /// `0 < bufsz < 16`.
    fn last_16_bytes(&self) -> [u8; 16] {
        debug_assert!(self.bufsz > 0 && self.bufsz < 16);
        let mut out = [0u8; 16];
        let from_prev = 16 - self.bufsz;
        out[..from_prev].copy_from_slice(&self.prev_granule[self.bufsz..16]);
        out[from_prev..].copy_from_slice(&self.granule[..self.bufsz]);
        out
    }

    /// Flushes the pending tail and closes the currently open block,
    /// mutating `self`. Only called on a scratch copy so that `digest`
    /// itself never mutates observable state.
    fn flush_tail_and_close(&mut self) {
        let n_bytes = self.block_size + self.bufsz;
        if n_bytes == 0 {
            // The last full block already closed with nothing left
            // pending; the polynomial lane already holds the right value.
            return;
        }

        // Binds the final polynomial update to the residual length, as
        // the one-shot path's `seed ^= n_bytes_remaining as u8` does
        // before compressing its own last block (see `DESIGN.md` "Open
        // Question decisions" #4 for why applying it here, once, is
        // equivalent).
        let length_byte = n_bytes as u8 as u64;
        for lane in 0..self.lanes {
            self.ph_acc[lane].0 ^= length_byte;
        }

        if self.bufsz > 0 {
            let tail = self.last_16_bytes();
            for lane in 0..self.lanes {
                let shift = self.shifts[lane];
                let x = read_u64_le(&tail[0..8]) ^ self.params.oh[shift + self.oh_iter];
                let y = read_u64_le(&tail[8..16]) ^ self.params.oh[shift + self.oh_iter + 1];
                let (lo, hi) = clmul64(x, y);
                self.ph_acc[lane].0 ^= lo;
                self.ph_acc[lane].1 ^= hi;
            }
        }
        // When `bufsz == 0`, `block_size` is a positive multiple of 16 and
        // the already-absorbed granules are exactly the varblock's full
        // pairs *and* overlap-free last pair (see `DESIGN.md`): nothing
        // left to fold.

        for lane in 0..self.lanes {
            let m0 = self.params.poly[lane][0];
            let m1 = self.params.poly[lane][1];
            let (ph_lo, ph_hi) = self.ph_acc[lane];
            self.poly[lane] = horner_double_update(self.poly[lane], m0, m1, ph_lo, ph_hi);
        }
    }

    /// Returns the digest for each active lane (`[hash, 0]` when not
    /// fingerprinting), without mutating `self`.
    pub(crate) fn digest(&self) -> [u64; 2] {
        if !self.large_umash {
            let data = &self.granule[..self.bufsz];
            let mut out = [0u64; 2];
            for lane in 0..self.lanes {
                out[lane] =
                    crate::hash::umash_full(self.params, self.seed, self.which[lane], data);
            }
            return out;
        }

        let mut copy = self.clone();
        copy.flush_tail_and_close();

        let mut out = [0u64; 2];
        for lane in 0..copy.lanes {
            out[lane] = crate::hash::finalize(copy.poly[lane]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::umash_full;
    use crate::params::{derive, DEFAULT_KEY};

    fn one_shot(params: &RawParams, seed: u64, which: u64, data: &[u8]) -> u64 {
        umash_full(params, seed, which, data)
    }

    fn incremental(params: &RawParams, seed: u64, which: u64, chunks: &[&[u8]]) -> u64 {
        let mut sink = Sink::new(params, seed, which, false);
        for chunk in chunks {
            sink.update(chunk);
        }
        sink.digest()[0]
    }

    #[test]
    fn one_shot_matches_single_update() {
        let params = derive(0, DEFAULT_KEY);
        for n in 0usize..=256 {
            let data: Vec<u8> = (0..n).map(|i| (i * 31 + 7) as u8).collect();
            let want = one_shot(&params, 11, 0, &data);
            let got = incremental(&params, 11, 0, &[&data]);
            assert_eq!(got, want, "n={n}");
        }
    }

    #[test]
    fn one_shot_matches_byte_by_byte_updates() {
        let params = derive(0, DEFAULT_KEY);
        for n in [0usize, 1, 4, 8, 15, 16, 17, 31, 32, 33, 255, 256, 257] {
            let data: Vec<u8> = (0..n).map(|i| (i * 17 + 3) as u8).collect();
            let want = one_shot(&params, 5, 0, &data);

            let mut sink = Sink::new(&params, 5, 0, false);
            for b in &data {
                sink.update(std::slice::from_ref(b));
            }
            assert_eq!(sink.digest()[0], want, "n={n}");
        }
    }

    #[test]
    fn one_shot_matches_all_one_split_partitions() {
        let params = derive(0, DEFAULT_KEY);
        for n in [0usize, 1, 8, 16, 17, 32, 100, 256, 300] {
            let data: Vec<u8> = (0..n).map(|i| (i * 23 + 1) as u8).collect();
            let want = one_shot(&params, 99, 1, &data);

            for split in 0..=n {
                let (a, b) = data.split_at(split);
                let got = incremental(&params, 99, 1, &[a, b]);
                assert_eq!(got, want, "n={n} split={split}");
            }
        }
    }

    #[test]
    fn one_shot_matches_all_two_split_partitions() {
        let params = derive(0, DEFAULT_KEY);
        for n in [0usize, 5, 16, 17, 40] {
            let data: Vec<u8> = (0..n).map(|i| (i * 5 + 11) as u8).collect();
            let want = one_shot(&params, 0, 0, &data);

            for i in 0..=n {
                for j in i..=n {
                    let got = incremental(&params, 0, 0, &[&data[..i], &data[i..j], &data[j..]]);
                    assert_eq!(got, want, "n={n} split=({i},{j})");
                }
            }
        }
    }

    #[test]
    fn sixteen_byte_chunking_is_order_independent() {
        let params = derive(0, DEFAULT_KEY);
        let data: Vec<u8> = (0..16u8).collect();

        let whole = incremental(&params, 7, 0, &[&data]);
        let halves = incremental(&params, 7, 0, &[&data[..8], &data[8..]]);
        let singles: Vec<&[u8]> = data.iter().map(std::slice::from_ref).collect();
        let one_byte_at_a_time = incremental(&params, 7, 0, &singles);

        assert_eq!(whole, halves);
        assert_eq!(whole, one_byte_at_a_time);
    }

    #[test]
    fn empty_input_matches_one_shot() {
        let params = derive(0, DEFAULT_KEY);
        assert_eq!(incremental(&params, 0, 0, &[]), one_shot(&params, 0, 0, &[]));
        assert_eq!(
            incremental(&params, 0, 0, &[&[]]),
            one_shot(&params, 0, 0, &[])
        );
    }

    #[test]
    fn fingerprint_sink_matches_fprint_components() {
        use crate::hash::umash_fprint;

        let params = derive(0, DEFAULT_KEY);
        for n in [0usize, 1, 8, 16, 17, 255, 256, 257, 512] {
            let data: Vec<u8> = (0..n).map(|i| (i * 41 + 9) as u8).collect();
            let (want0, want1) = umash_fprint(&params, 3, &data);

            let mut sink = Sink::new(&params, 3, 0, true);
            sink.update(&data);
            let got = sink.digest();
            assert_eq!(got[0], want0, "n={n} lane0");
            assert_eq!(got[1], want1, "n={n} lane1");
        }
    }

    #[test]
    fn digest_does_not_mutate_sink() {
        let params = derive(0, DEFAULT_KEY);
        let mut sink = Sink::new(&params, 1, 0, false);
        sink.update(b"a sink that streamed more than 256 bytes of data here");
        sink.update(&[0u8; 300]);

        let first = sink.digest();
        let second = sink.digest();
        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_readers_share_params_safely() {
        let params = derive(0, DEFAULT_KEY);
        std::thread::scope(|scope| {
            let a = scope.spawn(|| one_shot(&params, 1, 0, b"thread one input"));
            let b = scope.spawn(|| one_shot(&params, 2, 0, b"thread two input, different"));
            let got_a = a.join().unwrap();
            let got_b = b.join().unwrap();
            assert_eq!(got_a, one_shot(&params, 1, 0, b"thread one input"));
            assert_eq!(got_b, one_shot(&params, 2, 0, b"thread two input, different"));
        });
    }
}
