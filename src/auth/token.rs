use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random session token (32 bytes,
/// hex-encoded). Not derived from any guessable material.
pub fn generate_session_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// SHA-256 hash a token for storage. The database only ever sees the hash;
/// a leaked sessions table yields nothing replayable.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
