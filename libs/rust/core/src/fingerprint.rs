//! Short identity fingerprint for (model, version, artifact) name tuples.
//!
//! Only 16 bits survive truncation, so fingerprints are a cheap drift marker
//! within one model/version/artifact namespace, not a global identifier.

use sha2::{Digest, Sha256};

pub const FINGERPRINT_LEN: usize = 4;

pub fn fingerprint(model_name: &str, version_name: &str, artifact_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{model_name}:{version_name}:{artifact_name}").as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}
