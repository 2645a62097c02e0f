//! Signed direct uploads to the image host.
//!
//! The browser uploads the sketch itself; the gate only signs the upload
//! timestamp so the secret never leaves the server.

use serde::Serialize;
use sha1::{Digest, Sha1};

/// The image host verifies SHA-1 unless told otherwise.
pub const SIGNATURE_ALGORITHM: &str = "sha1";

#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSignature {
    pub signature: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub api_key: String,
    pub cloud_name: String,
    pub signature_algorithm: &'static str,
}

/// Sign exactly the parameters the client will send: the timestamp.
pub fn sign(creds: &UploadCredentials, timestamp: i64) -> UploadSignature {
    let mut hasher = Sha1::new();
    hasher.update(format!("timestamp={timestamp}{}", creds.api_secret).as_bytes());
    UploadSignature {
        signature: hex::encode(hasher.finalize()),
        timestamp,
        api_key: creds.api_key.clone(),
        cloud_name: creds.cloud_name.clone(),
        signature_algorithm: SIGNATURE_ALGORITHM,
    }
}
