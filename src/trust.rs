//! Origin guard: checks the trust signature added by the edge validator.

use tracing::{debug, warn};

use crate::config::Config;
use crate::decision::Decision;
use crate::endpoint::EndpointMatcher;
use crate::error::{Error, Rejection};
use crate::headers::{self, non_empty, HeaderSource, ProofHeaders};
use crate::signature::TrustSigner;

/// Stateless; share freely across request handlers.
#[derive(Debug, Clone)]
pub struct TrustVerifier {
    endpoints: EndpointMatcher,
    signer: TrustSigner,
    strict: bool,
}

impl TrustVerifier {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            endpoints: EndpointMatcher::new(&config.endpoints),
            signer: TrustSigner::new(config.require_secret()?, config.algorithm)?,
            strict: config.strict_mode,
        })
    }

    pub fn decide<H: HeaderSource + ?Sized>(&self, path: &str, headers: &H) -> Decision {
        if !self.endpoints.is_protected(path) {
            debug!(path, "unprotected path, passing through");
            return Decision::Pass;
        }
        match self.verify(headers) {
            Ok(()) => Decision::Proceed {
                headers: Vec::new(),
            },
            Err(rejection) => {
                warn!(
                    path,
                    status = rejection.status().as_u16(),
                    reason = %rejection,
                    "request rejected at origin"
                );
                Decision::Reject(rejection)
            }
        }
    }

    /// Check the trust signature on a protected request.
    ///
    /// An absent signature is only an error in strict mode; a signature without
    /// the proof fields it covers is malformed.
    pub fn verify<H: HeaderSource + ?Sized>(&self, headers: &H) -> Result<(), Rejection> {
        let Some(signature) = non_empty(headers, headers::HMAC) else {
            if self.strict {
                return Err(Rejection::MissingSignature);
            }
            debug!("unsigned request admitted, strict mode off");
            return Ok(());
        };
        let proof = ProofHeaders::extract(headers).ok_or(Rejection::MissingHeaders)?;
        if !self
            .signer
            .verify(proof.timestamp, proof.nonce, proof.context, signature)
        {
            return Err(Rejection::InvalidSignature);
        }
        debug!("trust signature verified");
        Ok(())
    }
}
