//! Content fingerprints
//!
//! [`normalized`] is what reconciliation compares: line terminators are
//! unified to `\n` and surrounding whitespace is stripped before hashing,
//! so files edited on different platforms do not appear changed.
//! [`raw`] hashes the content exactly as given.

use sha2::{Digest, Sha256};

use crate::domain::newtypes::Fingerprint;

/// Normalize line endings and trim, then hash
pub fn normalized(content: &str) -> Fingerprint {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    digest(unified.trim().as_bytes())
}

/// Hash content without normalization
pub fn raw(content: &str) -> Fingerprint {
    digest(content.as_bytes())
}

fn digest(bytes: &[u8]) -> Fingerprint {
    let hash = Sha256::digest(bytes);
    Fingerprint::from_digest(format!("{:x}", hash))
}
