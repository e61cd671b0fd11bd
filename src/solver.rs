//! Client-side puzzle solving.
//!
//! A solve runs in batches of [`YIELD_INTERVAL`] attempts. The async entry point
//! yields to the runtime between batches so a long solve never starves other
//! tasks; [`SolveSession`] keeps all state across those suspension points.

use std::sync::Arc;

use derive_builder::Builder;
use tracing::debug;

use crate::challenge::{compute_stamp, PuzzleProof};
use crate::config::Config;
use crate::difficulty::{leading_zero_bits, satisfies};
use crate::error::{Error, SolveError};
use crate::hasher::{random_token, HashAlgorithm};
use crate::time::{SystemTimeProvider, TimeProvider};

/// Attempts between cooperative yields; also the unit of `max_retries`.
pub const YIELD_INTERVAL: u64 = 100;

pub const DEFAULT_MAX_RETRIES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Ready,
    Solving { attempts: u64 },
    Solved { attempts: u64 },
    Exhausted { attempts: u64 },
}

#[derive(Builder, Clone)]
#[builder(pattern = "owned")]
pub struct PuzzleSolver {
    pub difficulty: u32,
    #[builder(default)]
    pub algorithm: HashAlgorithm,
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    pub max_retries: u32,
    #[builder(default = "Arc::new(SystemTimeProvider)")]
    pub clock: Arc<dyn TimeProvider>,
}

impl PuzzleSolver {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        PuzzleSolverBuilder::default()
            .difficulty(config.difficulty)
            .algorithm(config.algorithm)
            .max_retries(config.max_retries)
            .build_validated()
    }

    fn validate(&self) -> Result<(), SolveError> {
        if self.max_retries == 0 {
            return Err(SolveError::InvalidConfig("max_retries must be >= 1".into()));
        }
        if self.difficulty > self.algorithm.output_bits() {
            return Err(SolveError::InvalidConfig(format!(
                "difficulty {} exceeds {} output bits",
                self.difficulty, self.algorithm
            )));
        }
        Ok(())
    }

    /// Total attempts before giving up.
    pub fn attempt_budget(&self) -> u64 {
        u64::from(self.max_retries) * YIELD_INTERVAL
    }

    /// Start a session for `endpoint` at the current time.
    pub fn session(&self, endpoint: &str, context: &str) -> SolveSession<'_> {
        let timestamp = self.clock.now_seconds();
        SolveSession {
            solver: self,
            endpoint: endpoint.to_owned(),
            context: context.to_owned(),
            timestamp,
            timestamp_text: timestamp.to_string(),
            state: SolverState::Ready,
            proof: None,
        }
    }

    /// Solve, yielding to the runtime every [`YIELD_INTERVAL`] attempts.
    pub async fn solve(&self, endpoint: &str, context: &str) -> Result<PuzzleProof, SolveError> {
        self.validate()?;
        let mut session = self.session(endpoint, context);
        loop {
            if let Some(proof) = session.step()? {
                return Ok(proof);
            }
            tokio::task::yield_now().await;
        }
    }

    /// Solve on the current thread without yielding.
    pub fn solve_blocking(&self, endpoint: &str, context: &str) -> Result<PuzzleProof, SolveError> {
        self.validate()?;
        let mut session = self.session(endpoint, context);
        loop {
            if let Some(proof) = session.step()? {
                return Ok(proof);
            }
        }
    }
}

impl PuzzleSolverBuilder {
    fn validate(&self) -> Result<(), Error> {
        if self.difficulty.is_none() {
            return Err(Error::InvalidConfig("difficulty must be provided".into()));
        }
        if self.max_retries == Some(0) {
            return Err(Error::InvalidConfig("max_retries must be >= 1".into()));
        }
        Ok(())
    }

    pub fn build_validated(self) -> Result<PuzzleSolver, Error> {
        self.validate()?;
        let solver = self
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        solver
            .validate()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(solver)
    }
}

/// One in-progress solve. Drop it to cancel.
pub struct SolveSession<'a> {
    solver: &'a PuzzleSolver,
    endpoint: String,
    context: String,
    timestamp: u64,
    timestamp_text: String,
    state: SolverState,
    proof: Option<PuzzleProof>,
}

impl SolveSession<'_> {
    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Run up to [`YIELD_INTERVAL`] attempts.
    ///
    /// Returns `Ok(Some(proof))` once solved, `Ok(None)` when the batch ran out
    /// without a hit, and [`SolveError::Exhausted`] once the budget is spent.
    pub fn step(&mut self) -> Result<Option<PuzzleProof>, SolveError> {
        let mut attempts = match self.state {
            SolverState::Ready => {
                debug!(
                    endpoint = %self.endpoint,
                    difficulty = self.solver.difficulty,
                    budget = self.solver.attempt_budget(),
                    "solving puzzle"
                );
                0
            }
            SolverState::Solving { attempts } => attempts,
            SolverState::Solved { .. } => return Ok(self.proof.clone()),
            SolverState::Exhausted { attempts } => return Err(SolveError::Exhausted { attempts }),
        };

        let budget = self.solver.attempt_budget();
        let batch_end = attempts.saturating_add(YIELD_INTERVAL).min(budget);
        while attempts < batch_end {
            attempts += 1;
            let nonce = random_token();
            let stamp = compute_stamp(
                self.solver.algorithm,
                &self.endpoint,
                &self.timestamp_text,
                &nonce,
                &self.context,
            );
            if satisfies(&stamp, self.solver.difficulty) {
                debug!(
                    attempts,
                    zero_bits = leading_zero_bits(&stamp),
                    "puzzle solved"
                );
                let proof = PuzzleProof {
                    timestamp: self.timestamp,
                    nonce,
                    context: self.context.clone(),
                    stamp,
                };
                self.state = SolverState::Solved { attempts };
                self.proof = Some(proof.clone());
                return Ok(Some(proof));
            }
        }

        if attempts >= budget {
            debug!(attempts, "puzzle attempt budget exhausted");
            self.state = SolverState::Exhausted { attempts };
            return Err(SolveError::Exhausted { attempts });
        }
        self.state = SolverState::Solving { attempts };
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn solver(difficulty: u32, max_retries: u32) -> PuzzleSolver {
        PuzzleSolverBuilder::default()
            .difficulty(difficulty)
            .max_retries(max_retries)
            .clock(Arc::new(ManualClock::new(1_700_000_000)))
            .build_validated()
            .expect("build solver")
    }

    #[test]
    fn solved_stamp_recomputes_exactly() {
        let solver = solver(4, 1000);
        let proof = solver.solve_blocking("/api/data", "ctx").expect("solve");
        assert_eq!(proof.timestamp, 1_700_000_000);
        assert!(satisfies(&proof.stamp, 4));
        assert!(proof.matches(HashAlgorithm::Sha256, "/api/data"));
        assert!(!proof.matches(HashAlgorithm::Sha256, "/api/other"));
    }

    #[test]
    fn zero_difficulty_solves_on_first_attempt() {
        let solver = solver(0, 1);
        let mut session = solver.session("/x", "c");
        assert_eq!(session.state(), SolverState::Ready);
        let proof = session.step().unwrap().expect("solved");
        assert_eq!(session.state(), SolverState::Solved { attempts: 1 });
        assert_eq!(session.step().unwrap(), Some(proof));
    }

    #[test]
    fn impossible_difficulty_exhausts_after_budget() {
        let solver = solver(256, 2);
        let mut session = solver.session("/x", "c");
        assert_eq!(session.step().unwrap(), None);
        assert_eq!(
            session.state(),
            SolverState::Solving {
                attempts: YIELD_INTERVAL
            }
        );
        let err = session.step().unwrap_err();
        assert_eq!(err, SolveError::Exhausted { attempts: 200 });
        assert_eq!(session.state(), SolverState::Exhausted { attempts: 200 });
        assert!(session.step().is_err());
    }

    #[test]
    fn builder_rejects_bad_config() {
        let err = PuzzleSolverBuilder::default()
            .difficulty(4)
            .max_retries(0)
            .build_validated()
            .err()
            .expect("zero retries rejected");
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = PuzzleSolverBuilder::default()
            .difficulty(257)
            .build_validated()
            .err()
            .expect("difficulty wider than digest rejected");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn async_solve_matches_blocking_semantics() {
        let solver = solver(6, 1000);
        let proof = solver.solve("/api/data", "ctx").await.expect("solve");
        assert!(satisfies(&proof.stamp, 6));
        assert!(proof.matches(HashAlgorithm::Sha256, "/api/data"));
    }

    #[tokio::test]
    async fn async_solve_reports_exhaustion() {
        let solver = solver(256, 3);
        let err = solver.solve("/api/data", "ctx").await.unwrap_err();
        assert_eq!(err, SolveError::Exhausted { attempts: 300 });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn async_solve_lets_sibling_tasks_run() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ticks = Arc::new(AtomicUsize::new(0));
        let sibling = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        });

        let err = solver(256, 50).solve("/api/data", "ctx").await.unwrap_err();
        assert_eq!(err, SolveError::Exhausted { attempts: 5_000 });
        // one thread: the sibling only runs while the solver is suspended
        assert!(ticks.load(Ordering::Relaxed) >= 10);
        sibling.abort();
    }
}
