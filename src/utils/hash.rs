use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a rendered asset, used as its ETag.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();

    format!("{:x}", result)
}
