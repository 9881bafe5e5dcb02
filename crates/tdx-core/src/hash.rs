//! Fx-hashed map alias for maps keyed by relative path.
//!
//! The validity cache is keyed by short path strings from the local
//! filesystem, so the non-DoS-resistant Fx hash from `rustc-hash` is used
//! instead of SipHash. File contents are identified by BLAKE3 digests (see
//! [`Validation`](crate::Validation)), never by these hashes.
//!
//! # Examples
//!
//! ```
//! use tdx_core::{FxHashMap, fx_hash_map_with_capacity};
//!
//! let mut by_path: FxHashMap<String, u64> = fx_hash_map_with_capacity(16);
//! by_path.insert("notes/a.md".to_owned(), 42);
//! assert_eq!(by_path.get("notes/a.md"), Some(&42));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// The hasher used by [`FxHashMap`].
pub type FxBuildHasher = rustc_hash::FxBuildHasher;

/// Creates a new [`FxHashMap`] able to hold `capacity` entries without
/// reallocating.
#[inline]
#[must_use]
pub fn fx_hash_map_with_capacity<K, V>(capacity: usize) -> FxHashMap<K, V> {
    FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keyed_by_rel_path() {
        let mut map: FxHashMap<String, usize> = fx_hash_map_with_capacity(2);
        map.insert("a/b.txt".to_owned(), 1);
        map.insert("a/c.md".to_owned(), 2);
        assert_eq!(map.get("a/b.txt"), Some(&1));
        assert_eq!(map.get("a/missing.txt"), None);
    }

    #[test]
    fn test_map_with_capacity() {
        let map: FxHashMap<String, i32> = fx_hash_map_with_capacity(64);
        assert!(map.capacity() >= 64);
    }
}
