//! Controlled visibility of internal primitives for property tests,
//! mirroring the reference's `-DUMASH_TEST_ONLY` build
//! (`examples/original_source/t/umash_test_only.h`): a narrow, explicit
//! surface rather than making every internal function `pub`.
//!
//! Only compiled under the `umash_test_only` feature, so ordinary
//! consumers of this crate never see these names.

pub use crate::arith::{add_mod_fast, add_mod_slow, horner_double_update, mul_mod_fast};
pub use crate::oh::{clmul64, oh_one_block, oh_varblock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_are_reachable() {
        assert_eq!(add_mod_fast(1, 2), 3);
        assert_eq!(add_mod_slow(1, 2), 3);
        assert_eq!(mul_mod_fast(1, 2), 2);
        assert_eq!(horner_double_update(0, 1, 1, 0, 0), 0);
        assert_eq!(clmul64(0, 5), (0, 0));

        let oh = [0u64; 34];
        let block = [0u8; 256];
        let _ = oh_one_block(&oh, 0, &block);
        let _ = oh_varblock(&oh, 0, &block, 0, 16);
    }
}
