use anyhow::{Context, Result};

/// Hash an admin unique key using bcrypt
pub fn hash_key(key: &str) -> Result<String> {
    bcrypt::hash(key, bcrypt::DEFAULT_COST).context("Failed to hash key")
}

/// Verify an admin unique key against a stored hash
pub fn verify_key(key: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(key, hash).context("Failed to verify key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_key("campus-admin-key").unwrap();
        assert!(verify_key("campus-admin-key", &hash).unwrap());
        assert!(!verify_key("campus-admin-kex", &hash).unwrap());
    }

    #[test]
    fn salted_hashes_differ() {
        let hash1 = hash_key("same_key").unwrap();
        let hash2 = hash_key("same_key").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_key("same_key", &hash1).unwrap());
        assert!(verify_key("same_key", &hash2).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_key("key", "not-a-bcrypt-hash").is_err());
    }
}
