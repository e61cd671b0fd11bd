//! Typed configuration shared by the client, the edge and the origin.
//!
//! Every field has a default; a partial JSON document is merged field by field
//! through `#[serde(default)]`.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::challenge::ContextMode;
use crate::error::Error;
use crate::hasher::HashAlgorithm;
use crate::solver::DEFAULT_MAX_RETRIES;

pub const DEFAULT_DIFFICULTY: u32 = 16;
pub const DEFAULT_TIMESTAMP_TOLERANCE: u64 = 30;
pub const DEFAULT_CACHE_SIZE: u64 = 10_000;
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default)]
#[builder(pattern = "owned")]
pub struct Config {
    /// Protected paths; a trailing `*` matches any path with that prefix.
    #[builder(default, setter(into))]
    pub endpoints: Vec<String>,
    /// Shared edge/origin signing secret.
    #[builder(default, setter(into, strip_option))]
    pub secret: Option<String>,
    /// Required leading zero bits.
    #[builder(default = "DEFAULT_DIFFICULTY")]
    pub difficulty: u32,
    /// Accepted clock distance in seconds.
    #[builder(default = "DEFAULT_TIMESTAMP_TOLERANCE")]
    pub timestamp_tolerance: u64,
    /// Maximum entries held by each in-memory store.
    #[builder(default = "DEFAULT_CACHE_SIZE")]
    pub cache_size: u64,
    #[builder(default)]
    pub algorithm: HashAlgorithm,
    #[builder(default)]
    pub context_mode: ContextMode,
    /// Client attempt budget, in units of 100 attempts.
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    pub max_retries: u32,
    #[builder(default)]
    pub rate_limit: RateLimitConfig,
    /// Reject unsigned requests at the origin.
    #[builder(default = "true")]
    pub strict_mode: bool,
    /// Take the caller identity from `cf-connecting-ip` / `x-forwarded-for` /
    /// `x-real-ip` ahead of the socket peer. Only set behind a proxy that
    /// overwrites these headers.
    #[builder(default)]
    pub trust_proxy_headers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            secret: None,
            difficulty: DEFAULT_DIFFICULTY,
            timestamp_tolerance: DEFAULT_TIMESTAMP_TOLERANCE,
            cache_size: DEFAULT_CACHE_SIZE,
            algorithm: HashAlgorithm::default(),
            context_mode: ContextMode::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            rate_limit: RateLimitConfig::default(),
            strict_mode: true,
            trust_proxy_headers: false,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(raw).map_err(|e| Error::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.endpoints.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one endpoint must be configured".into(),
            ));
        }
        if self.endpoints.iter().any(|e| e.is_empty()) {
            return Err(Error::InvalidConfig("endpoints must not be empty".into()));
        }
        if self.timestamp_tolerance == 0 {
            return Err(Error::InvalidConfig(
                "timestamp_tolerance must be >= 1".into(),
            ));
        }
        if self.cache_size == 0 {
            return Err(Error::InvalidConfig("cache_size must be >= 1".into()));
        }
        if self.max_retries == 0 {
            return Err(Error::InvalidConfig("max_retries must be >= 1".into()));
        }
        if self.difficulty > self.algorithm.output_bits() {
            return Err(Error::InvalidConfig(format!(
                "difficulty {} exceeds {} output bits",
                self.difficulty, self.algorithm
            )));
        }
        if self.rate_limit.enabled && self.rate_limit.requests_per_minute == 0 {
            return Err(Error::InvalidConfig(
                "rate_limit.requests_per_minute must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// The signing secret, required wherever signatures are made or checked.
    pub fn require_secret(&self) -> Result<&str, Error> {
        match self.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(Error::InvalidConfig("secret must be configured".into())),
        }
    }

    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.timestamp_tolerance)
    }

    /// Longest a replay mark must survive: a proof dated `tolerance` ahead
    /// stays fresh until `tolerance` after its own timestamp.
    pub fn replay_lifetime(&self) -> Duration {
        Duration::from_secs(self.timestamp_tolerance.saturating_mul(2))
    }
}

impl ConfigBuilder {
    pub fn build_validated(self) -> Result<Config, Error> {
        let config = self
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
