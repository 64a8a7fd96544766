use std::hash::Hasher;

use fnv::FnvHasher;

/// Fast, non-cryptographic 64-bit digest used to key the prepared-statement
/// cache. Collisions are expected to be guarded by a secondary comparison of
/// the full key material by the caller (see `twinstore-cache`).
pub fn fnv64(parts: &[&str]) -> u64 {
    let mut hasher = FnvHasher::default();
    for p in parts {
        hasher.write(p.as_bytes());
        // Separator so ("ab", "c") and ("a", "bc") don't collide trivially.
        hasher.write_u8(0);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differs_on_component_boundary() {
        assert_ne!(fnv64(&["ab", "c"]), fnv64(&["a", "bc"]));
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            fnv64(&["master", "app", "SELECT 1"]),
            fnv64(&["master", "app", "SELECT 1"])
        );
    }
}
