//! Modular arithmetic over `p = 2**64 - 8`, the field the polynomial
//! Horner lane operates in, plus the smaller `q = 2**61 - 1` used when
//! pre-squaring the Horner multipliers during parameter derivation.
//!
//! Grounded on the `add_mod_fast` / `add_mod_slow` / `mul_mod_fast` /
//! `horner_double_update` quartet in the UMASH reference (umash.c), with
//! GCC's `__builtin_uaddll_overflow` / `__uint128_t` replaced by
//! `u64::overflowing_add` and `u128` widening multiplication.

/// `p = 2**64 - 8`, as a plain 64-bit value (it fits, since `2**64 - 8 <
/// u64::MAX`).
pub(crate) const P: u64 = u64::MAX - 7;

/// `q = 2**61 - 1`, the field used to pre-square the Horner multiplier.
pub(crate) const Q: u64 = (1u64 << 61) - 1;

/// `(x + y) mod p`, assuming `x + y < 2**65 - 8`.
///
/// This is a weak reduction: on overflow it adds 8, which may leave the
/// result anywhere in `[0, 2**64)` rather than strictly under `p`. Callers
/// that need a fully reduced value use [`add_mod_slow`].
#[inline]
pub(crate) fn add_mod_fast(x: u64, y: u64) -> u64 {
    let (sum, overflow) = x.overflowing_add(y);
    if overflow {
        sum + 8
    } else {
        sum
    }
}

#[inline]
fn add_mod_slow_slow_path(mut sum: u64, fixup: u64) -> u64 {
    if sum >= P {
        sum += 8;
    }
    // sum < p now, so this add cannot overflow u64.
    sum += fixup;
    if sum >= P {
        sum += 8;
    }
    sum
}

/// `(x + y) mod p`, fully reduced to `[0, p)`.
#[inline]
pub(crate) fn add_mod_slow(x: u64, y: u64) -> u64 {
    let (sum, overflow) = x.overflowing_add(y);
    let fixup = if overflow { 8 } else { 0 };

    // sum + fixup < p is overwhelmingly likely for pseudorandom sum; only
    // take the slow path when we're close enough to the modulus to need it.
    if sum < P - 8 {
        sum + fixup
    } else {
        add_mod_slow_slow_path(sum, fixup)
    }
}

/// `m * x mod p`, assuming `m < 2**61 - 1` and `m * x < 2**125`.
#[inline]
pub(crate) fn mul_mod_fast(m: u64, x: u64) -> u64 {
    let product = (m as u128) * (x as u128);
    let lo = product as u64;
    let hi = (product >> 64) as u64;
    // 2**64 === 8 (mod p), so the high half folds back in scaled by 8.
    add_mod_fast(lo, 8u64.wrapping_mul(hi))
}

/// `(m0 * (acc + x) + m1 * y) mod p`, the fundamental polynomial step.
#[inline]
pub(crate) fn horner_double_update(acc: u64, m0: u64, m1: u64, x: u64, y: u64) -> u64 {
    let acc = add_mod_fast(acc, x);
    add_mod_slow(mul_mod_fast(m0, acc), mul_mod_fast(m1, y))
}

/// `x * x mod q`, used to cache the square of a Horner multiplier.
#[inline]
pub(crate) fn square_mod_q(x: u64) -> u64 {
    ((x as u128 * x as u128) % (Q as u128)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    // Small xorshift64* generator: deterministic pseudorandom test vectors
    // without pulling in an RNG crate just for fixed-seed unit tests.
    struct XorShift64(u64);

    impl XorShift64 {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x.wrapping_mul(0x2545_f491_4f6c_dd1d)
        }
    }

    #[test]
    fn add_mod_fast_matches_definition() {
        let mut rng = XorShift64(0x9e37_79b9_7f4a_7c15);
        for _ in 0..10_000 {
            let x = rng.next() % P;
            let y = rng.next() % P;
            let got = add_mod_fast(x, y);
            let want = ((x as u128 + y as u128) % (P as u128)) as u64;
            // add_mod_fast is a weak reduction: it may leave the value
            // anywhere below 2**64, not strictly below p. Fully reduce
            // before comparing.
            let got_reduced = if got >= P { got - P } else { got };
            assert_eq!(got_reduced, want, "x={x} y={y}");
        }
    }

    #[test]
    fn add_mod_slow_is_fully_reduced() {
        let mut rng = XorShift64(0x1234_5678_9abc_def0);
        for _ in 0..10_000 {
            let x = rng.next();
            let y = rng.next() % P;
            let got = add_mod_slow(x, y);
            assert!(got < P, "add_mod_slow must fully reduce: got {got}");
            let want = ((x as u128 + y as u128) % (P as u128)) as u64;
            assert_eq!(got, want, "x={x} y={y}");
        }
    }

    #[test]
    fn mul_mod_fast_matches_definition() {
        let mut rng = XorShift64(0xabcd_ef01_2345_6789);
        for _ in 0..10_000 {
            let m = rng.next() % Q;
            let x = rng.next() % P;
            let got = mul_mod_fast(m, x);
            let got_reduced = if got >= P { got - P } else { got };
            let want = ((m as u128 * x as u128) % (P as u128)) as u64;
            assert_eq!(got_reduced, want, "m={m} x={x}");
        }
    }

    #[test]
    fn horner_double_update_matches_definition() {
        let mut rng = XorShift64(0x0fed_cba9_8765_4321);
        for _ in 0..1_000 {
            let acc = rng.next() % P;
            let m0 = rng.next() % Q;
            let m1 = rng.next() % Q;
            let x = rng.next();
            let y = rng.next();

            let got = horner_double_update(acc, m0, m1, x, y);
            assert!(got < P);

            let acc_plus_x = (acc as u128 + x as u128) % (P as u128);
            let want = ((m0 as u128 * acc_plus_x) % (P as u128)
                + (m1 as u128 * y as u128) % (P as u128))
                % (P as u128);
            assert_eq!(got as u128, want);
        }
    }

    #[test]
    fn square_mod_q_is_reduced() {
        assert_eq!(square_mod_q(0), 0);
        assert_eq!(square_mod_q(1), 1);
        assert_eq!(square_mod_q(Q - 1), 1);
    }
}
