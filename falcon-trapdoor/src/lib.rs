#![no_std]

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod dsa;
pub mod utils;

#[cfg(feature = "std")]
pub mod worker;

// RE-EXPORTS
// ================================================================================================

pub use dsa::falcon::{
    FalconLevel, PublicKey, SecretKey, Signature,
    math::{KeygenConfig, TrapdoorError},
};

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {

    #[test]
    #[should_panic]
    fn debug_assert_is_checked() {
        // enforce the release checks to always have `RUSTFLAGS="-C debug-assertions"`.
        //
        // the trapdoor code guards several internal invariants with `debug_assert`, and we want
        // them checked in every test run.
        debug_assert!(false);
    }

    #[test]
    #[should_panic]
    #[allow(arithmetic_overflow)]
    fn overflow_panics_for_test() {
        // the solver works on big integers and the signer on i64 norms; overflows there must not
        // wrap silently.
        //
        // to enable overflow checks in release mode, ensure `RUSTFLAGS="-C overflow-checks"`
        let a = 1_u64;
        let b = 64;
        assert_ne!(a << b, 0);
    }
}
