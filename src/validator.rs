//! Edge admission pipeline.
//!
//! Checks run in a fixed order and stop at the first failure:
//! endpoint match, proof headers, timestamp freshness, replay lookup, stamp
//! recomputation, difficulty, replay claim, rate limit, then signing.
//! Only the replay claim and the rate limit write shared state.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{MokaReplayCache, ReplayCache};
use crate::challenge::{compute_stamp, replay_key};
use crate::config::Config;
use crate::decision::Decision;
use crate::difficulty::satisfies;
use crate::endpoint::EndpointMatcher;
use crate::error::{Error, Rejection};
use crate::hasher::{constant_time_eq, HashAlgorithm};
use crate::headers::{self, client_identity, HeaderSource, ProofHeaders};
use crate::rate_limit::{MokaRateLimiter, RateLimiter};
use crate::signature::TrustSigner;
use crate::time::{SystemTimeProvider, TimeProvider};

pub struct Validator<C = MokaReplayCache, R = MokaRateLimiter, T = SystemTimeProvider>
where
    C: ReplayCache,
    R: RateLimiter,
    T: TimeProvider,
{
    endpoints: EndpointMatcher,
    algorithm: HashAlgorithm,
    difficulty: u32,
    tolerance: u64,
    trust_proxy_headers: bool,
    signer: TrustSigner,
    replay_cache: Arc<C>,
    rate_limiter: Option<Arc<R>>,
    clock: Arc<T>,
}

impl Validator {
    /// Validator with in-memory stores sized from `config` and the system clock.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            config,
            Arc::new(MokaReplayCache::new(config.cache_size, config.replay_lifetime())),
            Arc::new(MokaRateLimiter::new(
                config.rate_limit.requests_per_minute,
                config.cache_size,
            )),
            Arc::new(SystemTimeProvider),
        )
    }
}

impl<C, R, T> Validator<C, R, T>
where
    C: ReplayCache + 'static,
    R: RateLimiter + 'static,
    T: TimeProvider + 'static,
{
    pub fn new(
        config: &Config,
        replay_cache: Arc<C>,
        rate_limiter: Arc<R>,
        clock: Arc<T>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let signer = TrustSigner::new(config.require_secret()?, config.algorithm)?;
        Ok(Self {
            endpoints: EndpointMatcher::new(&config.endpoints),
            algorithm: config.algorithm,
            difficulty: config.difficulty,
            tolerance: config.timestamp_tolerance,
            trust_proxy_headers: config.trust_proxy_headers,
            signer,
            replay_cache,
            rate_limiter: config.rate_limit.enabled.then_some(rate_limiter),
            clock,
        })
    }

    /// Decide on a request when the socket peer is unknown.
    pub fn decide<H: HeaderSource + ?Sized>(&self, path: &str, headers: &H) -> Decision {
        self.decide_with_peer(path, headers, None)
    }

    /// Decide on a request; `peer` is the socket address of the caller.
    ///
    /// Proxy headers only name the caller when `trust_proxy_headers` is set.
    pub fn decide_with_peer<H: HeaderSource + ?Sized>(
        &self,
        path: &str,
        headers: &H,
        peer: Option<IpAddr>,
    ) -> Decision {
        if !self.endpoints.is_protected(path) {
            debug!(path, "unprotected path, passing through");
            return Decision::Pass;
        }
        match self.validate(path, headers, peer) {
            Ok(signature) => {
                debug!(path, "proof accepted, forwarding with trust signature");
                Decision::Proceed {
                    headers: vec![(headers::HMAC, signature)],
                }
            }
            Err(rejection) => {
                warn!(
                    path,
                    status = rejection.status().as_u16(),
                    reason = %rejection,
                    "request rejected at edge"
                );
                Decision::Reject(rejection)
            }
        }
    }

    /// Run the pipeline for a protected path and return the trust signature.
    pub fn validate<H: HeaderSource + ?Sized>(
        &self,
        path: &str,
        headers: &H,
        peer: Option<IpAddr>,
    ) -> Result<String, Rejection> {
        let proof = ProofHeaders::extract(headers).ok_or(Rejection::MissingHeaders)?;

        let timestamp = parse_timestamp(proof.timestamp)?;
        let now = self.clock.now_seconds();
        self.check_freshness(timestamp, now)?;

        let key = replay_key(proof.timestamp, proof.nonce);
        if self.replay_cache.seen(&key, now)? {
            return Err(Rejection::Replay);
        }

        let expected = compute_stamp(
            self.algorithm,
            path,
            proof.timestamp,
            proof.nonce,
            proof.context,
        );
        if !constant_time_eq(&expected, proof.stamp) {
            return Err(Rejection::InvalidProof);
        }
        if !satisfies(proof.stamp, self.difficulty) {
            return Err(Rejection::InsufficientDifficulty {
                required: self.difficulty,
            });
        }

        // a future-dated proof stays fresh until `timestamp + tolerance`
        let expires_at = now.max(timestamp).saturating_add(self.tolerance);
        if !self
            .replay_cache
            .insert_if_absent(&key, expires_at, now)?
        {
            // another request with the same key won the claim
            return Err(Rejection::Replay);
        }

        if let Some(limiter) = &self.rate_limiter {
            let identity = client_identity(headers, peer, self.trust_proxy_headers);
            if !limiter.try_admit(&identity, now)? {
                return Err(Rejection::RateExceeded);
            }
        }

        Ok(self
            .signer
            .sign(proof.timestamp, proof.nonce, proof.context))
    }

    fn check_freshness(&self, timestamp: u64, now: u64) -> Result<(), Rejection> {
        if timestamp <= now {
            let age = now - timestamp;
            if age > self.tolerance {
                return Err(Rejection::StaleTimestamp { age });
            }
        } else {
            let skew = timestamp - now;
            if skew > self.tolerance {
                return Err(Rejection::FutureTimestamp { skew });
            }
        }
        Ok(())
    }
}

/// Unix seconds as plain ASCII digits; signs and whitespace are malformed.
fn parse_timestamp(raw: &str) -> Result<u64, Rejection> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Rejection::MalformedTimestamp);
    }
    raw.parse().map_err(|_| Rejection::MalformedTimestamp)
}
