use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::error::Error;

/// Random bytes behind every token produced by [`random_token`].
pub const TOKEN_BYTES: usize = 16;

/// Digest family used for stamps, contexts and trust signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Hex-encoded one-way digest of `data`.
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }

    /// Hex-encoded keyed MAC of `data`.
    pub fn mac(&self, data: &[u8], key: &[u8]) -> Result<String, Error> {
        Ok(MacKey::new(*self, key)?.sign(data))
    }

    /// Width of the digest in bits.
    pub fn output_bits(&self) -> u32 {
        match self {
            Self::Sha256 => 256,
            Self::Sha512 => 512,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Sha512 => f.write_str("sha512"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::InvalidConfig(format!(
                "unsupported algorithm `{other}`"
            ))),
        }
    }
}

/// A MAC keyed once and cloned per message.
#[derive(Clone)]
pub enum MacKey {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl MacKey {
    pub fn new(algorithm: HashAlgorithm, key: &[u8]) -> Result<Self, Error> {
        let invalid =
            |_: hmac::digest::InvalidLength| Error::InvalidConfig("invalid MAC key".into());
        Ok(match algorithm {
            HashAlgorithm::Sha256 => {
                Self::Sha256(Hmac::<Sha256>::new_from_slice(key).map_err(invalid)?)
            }
            HashAlgorithm::Sha512 => {
                Self::Sha512(Hmac::<Sha512>::new_from_slice(key).map_err(invalid)?)
            }
        })
    }

    pub fn sign(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256(mac) => {
                let mut mac = mac.clone();
                mac.update(data);
                hex::encode(mac.finalize().into_bytes())
            }
            Self::Sha512(mac) => {
                let mut mac = mac.clone();
                mac.update(data);
                hex::encode(mac.finalize().into_bytes())
            }
        }
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(_) => f.write_str("MacKey::Sha256(..)"),
            Self::Sha512(_) => f.write_str("MacKey::Sha512(..)"),
        }
    }
}

/// Cryptographically random hex token of [`TOKEN_BYTES`] bytes.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare two hex strings without short-circuiting on the first difference.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_value() {
        assert_eq!(
            HashAlgorithm::Sha256.digest(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn digest_lengths_match_algorithm() {
        assert_eq!(HashAlgorithm::Sha256.digest(b"x").len(), 64);
        assert_eq!(HashAlgorithm::Sha512.digest(b"x").len(), 128);
    }

    #[test]
    fn hmac_sha256_rfc4231_case_2() {
        let mac = HashAlgorithm::Sha256
            .mac(b"what do ya want for nothing?", b"Jefe")
            .unwrap();
        assert_eq!(
            mac,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn mac_depends_on_key() {
        let a = HashAlgorithm::Sha512.mac(b"1:n:c", b"one").unwrap();
        let b = HashAlgorithm::Sha512.mac(b"1:n:c", b"two").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, HashAlgorithm::Sha512.mac(b"1:n:c", b"one").unwrap());
    }

    #[test]
    fn random_tokens_are_hex_and_distinct() {
        let a = random_token();
        let b = random_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn algorithm_parses_and_rejects_unknown() {
        assert_eq!("SHA512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!(matches!(
            "md5".parse::<HashAlgorithm>(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn constant_time_eq_checks_length_and_content() {
        assert!(constant_time_eq("abcd", "abcd"));
        assert!(!constant_time_eq("abcd", "abce"));
        assert!(!constant_time_eq("abcd", "abc"));
    }
}
