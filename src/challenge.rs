use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::hasher::HashAlgorithm;
use crate::headers;

/// Which caller attributes feed the context fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    #[default]
    UserAgent,
    IpUserAgent,
}

/// Derive the context fingerprint bound into every stamp.
///
/// In [`ContextMode::IpUserAgent`] the address is prepended to the user agent;
/// a missing address hashes as the empty string.
pub fn generate_context(
    algorithm: HashAlgorithm,
    mode: ContextMode,
    user_agent: &str,
    ip: Option<&str>,
) -> String {
    match mode {
        ContextMode::UserAgent => algorithm.digest(user_agent.as_bytes()),
        ContextMode::IpUserAgent => {
            let mut material = String::from(ip.unwrap_or_default());
            material.push_str(user_agent);
            algorithm.digest(material.as_bytes())
        }
    }
}

/// `endpoint:timestamp:nonce:context`, the preimage of a stamp.
pub fn stamp_input(endpoint: &str, timestamp: &str, nonce: &str, context: &str) -> String {
    format!("{endpoint}:{timestamp}:{nonce}:{context}")
}

/// `timestamp:nonce:context`, the preimage of a trust signature.
pub fn signature_input(timestamp: &str, nonce: &str, context: &str) -> String {
    format!("{timestamp}:{nonce}:{context}")
}

/// `timestamp:nonce`, the replay cache key.
pub fn replay_key(timestamp: &str, nonce: &str) -> String {
    format!("{timestamp}:{nonce}")
}

pub fn compute_stamp(
    algorithm: HashAlgorithm,
    endpoint: &str,
    timestamp: &str,
    nonce: &str,
    context: &str,
) -> String {
    algorithm.digest(stamp_input(endpoint, timestamp, nonce, context).as_bytes())
}

/// A solved puzzle, carried in the four proof headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PuzzleProof {
    pub timestamp: u64,
    pub nonce: String,
    pub context: String,
    pub stamp: String,
}

impl PuzzleProof {
    /// Recompute the stamp for `endpoint` and compare it with the carried one.
    pub fn matches(&self, algorithm: HashAlgorithm, endpoint: &str) -> bool {
        compute_stamp(
            algorithm,
            endpoint,
            &self.timestamp.to_string(),
            &self.nonce,
            &self.context,
        ) == self.stamp
    }

    /// Header name/value pairs to attach to the outgoing request.
    pub fn headers(&self) -> [(&'static str, String); 4] {
        [
            (headers::TIMESTAMP, self.timestamp.to_string()),
            (headers::NONCE, self.nonce.clone()),
            (headers::CONTEXT, self.context.clone()),
            (headers::STAMP, self.stamp.clone()),
        ]
    }

    pub fn apply_to(&self, map: &mut HeaderMap) -> Result<(), Error> {
        for (name, value) in self.headers() {
            let value = HeaderValue::from_str(&value).map_err(|_| Error::InvalidHeader(name))?;
            map.insert(name, value);
        }
        Ok(())
    }
}
