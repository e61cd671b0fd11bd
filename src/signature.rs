use crate::challenge::signature_input;
use crate::error::Error;
use crate::hasher::{constant_time_eq, HashAlgorithm, MacKey};

/// Chain-of-custody signer shared by the edge validator and the origin guard.
#[derive(Debug, Clone)]
pub struct TrustSigner {
    key: MacKey,
}

impl TrustSigner {
    pub fn new(secret: &str, algorithm: HashAlgorithm) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(Error::InvalidConfig("secret must not be empty".into()));
        }
        Ok(Self {
            key: MacKey::new(algorithm, secret.as_bytes())?,
        })
    }

    /// Hex MAC over `timestamp:nonce:context`.
    pub fn sign(&self, timestamp: &str, nonce: &str, context: &str) -> String {
        self.key
            .sign(signature_input(timestamp, nonce, context).as_bytes())
    }

    pub fn verify(&self, timestamp: &str, nonce: &str, context: &str, signature: &str) -> bool {
        constant_time_eq(&self.sign(timestamp, nonce, context), signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_plain_mac() {
        let signer = TrustSigner::new("s", HashAlgorithm::Sha256).unwrap();
        let expected = HashAlgorithm::Sha256.mac(b"100:n:c", b"s").unwrap();
        assert_eq!(signer.sign("100", "n", "c"), expected);
        assert!(signer.verify("100", "n", "c", &expected));
    }

    #[test]
    fn any_tampered_field_fails_verification() {
        let signer = TrustSigner::new("s", HashAlgorithm::Sha512).unwrap();
        let sig = signer.sign("100", "n", "c");
        assert!(!signer.verify("101", "n", "c", &sig));
        assert!(!signer.verify("100", "m", "c", &sig));
        assert!(!signer.verify("100", "n", "d", &sig));
        assert!(!signer.verify("100", "n", "c", &sig[1..]));
    }

    #[test]
    fn different_secrets_disagree() {
        let a = TrustSigner::new("a", HashAlgorithm::Sha256).unwrap();
        let b = TrustSigner::new("b", HashAlgorithm::Sha256).unwrap();
        assert!(!b.verify("1", "n", "c", &a.sign("1", "n", "c")));
    }

    #[test]
    fn empty_secret_is_a_config_error() {
        assert!(matches!(
            TrustSigner::new("", HashAlgorithm::Sha256),
            Err(Error::InvalidConfig(_))
        ));
    }
}
