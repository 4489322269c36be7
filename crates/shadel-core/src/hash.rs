//! Stable signature hashing for mangled symbol names.
//!
//! Mangled function names end in a hash of the parameter type codes, so two
//! compilation units that see the same signature must produce the same
//! digits. The hash is XXHash64 over the codes with position markers mixed
//! in, which makes `(int, float)` and `(float, int)` distinct.
//!
//! # Examples
//!
//! ```
//! use shadel_core::SignatureHash;
//!
//! let a = SignatureHash::from_codes(["i", "f"]);
//! let b = SignatureHash::from_codes(["f", "i"]);
//! assert_ne!(a, b);
//! assert_eq!(a, SignatureHash::from_codes(["i", "f"]));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain mixing constants.
pub mod hash_constants {
    /// Seed for an empty parameter list.
    pub const SIGNATURE: u64 = 0x5ea77ffbcdf5f302;

    /// Separator mixed between parameter codes.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Parameter position markers. Positions past the end wrap around.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash of a function's parameter type codes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SignatureHash(pub u64);

impl SignatureHash {
    /// Hash an ordered list of type codes.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hash = hash_constants::SIGNATURE;
        for (position, code) in codes.into_iter().enumerate() {
            let marker =
                hash_constants::PARAM_MARKERS[position % hash_constants::PARAM_MARKERS.len()];
            let code_hash = xxh64(code.as_ref().as_bytes(), marker);
            hash = (hash ^ hash_constants::SEP)
                .rotate_left(23)
                .wrapping_add(code_hash);
        }
        SignatureHash(hash)
    }
}

impl fmt::Debug for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureHash({:016x})", self.0)
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
