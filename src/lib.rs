//! Proof-of-work admission for unauthenticated APIs.
//!
//! A client pays for each request by solving a small hash puzzle
//! ([`PuzzleSolver`]); an edge [`Validator`] checks freshness, replay, the
//! proof itself and an optional rate limit, then signs the request; the origin
//! [`TrustVerifier`] only admits requests carrying a valid edge signature.
//!
//! Both server components expose a single `decide(path, headers)` function
//! returning a [`Decision`], which framework adapters translate into their own
//! response types.

pub mod cache;
pub mod challenge;
pub mod config;
pub mod decision;
pub mod difficulty;
pub mod endpoint;
pub mod error;
pub mod hasher;
pub mod headers;
pub mod rate_limit;
pub mod signature;
pub mod solver;
pub mod time;
pub mod trust;
pub mod validator;

pub use cache::{MokaReplayCache, ReplayCache, ReplayCacheError};
pub use challenge::{generate_context, ContextMode, PuzzleProof};
pub use config::{Config, ConfigBuilder, RateLimitConfig};
pub use decision::Decision;
pub use difficulty::satisfies;
pub use endpoint::EndpointMatcher;
pub use error::{Error, Rejection, RejectionKind, SolveError};
pub use hasher::{random_token, HashAlgorithm};
pub use headers::HeaderSource;
pub use rate_limit::{MokaRateLimiter, RateLimitError, RateLimiter};
pub use signature::TrustSigner;
pub use solver::{PuzzleSolver, PuzzleSolverBuilder, SolveSession, SolverState};
#[cfg(any(test, feature = "test-seams"))]
pub use time::ManualClock;
pub use time::{SystemTimeProvider, TimeProvider};
pub use trust::TrustVerifier;
pub use validator::Validator;
