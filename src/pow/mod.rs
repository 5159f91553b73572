// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Proof-of-Work Engine
//!
//! Searches for a nonce that makes a transaction hash end in
//! `min_weight_magnitude` zero trits.
//!
//! ## Sessions
//!
//! Only one search runs per engine. Every `attachToTangle` request opens a
//! session with [`PowEngine::session`], which cancels the previous session's
//! token: the displaced caller gets [`PowError::Interrupted`] instead of a
//! nonce, and the newest request wins. [`PowEngine::close`] cancels the
//! active session and makes the engine unavailable.

pub mod search;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ternary::{trits_from_trytes, trytes, Curl, TernaryError, HASH_LENGTH};
use crate::transaction::TRANSACTION_TRITS;

/// Trits absorbed before the chunk that carries the nonce.
const MID_STATE_TRITS: usize = TRANSACTION_TRITS - HASH_LENGTH;

/// Errors that can occur during a nonce search.
#[derive(Debug, thiserror::Error)]
pub enum PowError {
    #[error("Proof-of-work interrupted by a newer request")]
    Interrupted,

    #[error("Proof-of-work engine is not available")]
    Unavailable,

    #[error("Invalid min weight magnitude: {0}")]
    InvalidMagnitude(usize),

    #[error("Nonce search space exhausted")]
    Exhausted,

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Ternary(#[from] TernaryError),
}

/// Something that can finalize transaction trytes with a valid nonce.
pub trait ProofOfWork: Send + Sync {
    /// Return `trytes` with a nonce meeting `min_weight_magnitude`, or
    /// [`PowError::Interrupted`] once `session` is cancelled.
    fn search(
        &self,
        trytes: &str,
        min_weight_magnitude: usize,
        session: &CancellationToken,
    ) -> Result<String, PowError>;
}

/// Portable Curl-based PoW engine backed by a dedicated rayon pool.
pub struct PowEngine {
    pool: rayon::ThreadPool,
    workers: usize,
    active: Mutex<Option<CancellationToken>>,
    search_lock: Mutex<()>,
    open: AtomicBool,
}

impl PowEngine {
    /// Create an engine with `workers` search threads (at least one).
    pub fn new(workers: usize) -> Result<Self, PowError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pow-worker-{i}"))
            .build()
            .map_err(|e| PowError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            workers,
            active: Mutex::new(None),
            search_lock: Mutex::new(()),
            open: AtomicBool::new(true),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether the engine accepts new searches.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Stop accepting work and interrupt any in-flight search.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(previous) = lock(&self.active).take() {
            previous.cancel();
        }
    }

    /// Start a new session, interrupting the previous one.
    pub fn session(&self) -> Result<CancellationToken, PowError> {
        if !self.is_open() {
            return Err(PowError::Unavailable);
        }
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.active).replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!("Interrupting in-flight proof-of-work session");
            }
            previous.cancel();
        }
        Ok(token)
    }
}

impl ProofOfWork for PowEngine {
    fn search(
        &self,
        input: &str,
        min_weight_magnitude: usize,
        session: &CancellationToken,
    ) -> Result<String, PowError> {
        if !self.is_open() {
            return Err(PowError::Unavailable);
        }
        if session.is_cancelled() {
            return Err(PowError::Interrupted);
        }
        if min_weight_magnitude > HASH_LENGTH {
            return Err(PowError::InvalidMagnitude(min_weight_magnitude));
        }

        let mut trits = trits_from_trytes(input)?;
        if trits.len() != TRANSACTION_TRITS {
            return Err(TernaryError::InvalidLength {
                expected: TRANSACTION_TRITS,
                actual: trits.len(),
            }
            .into());
        }
        if min_weight_magnitude == 0 {
            return Ok(input.to_string());
        }

        let _running = lock(&self.search_lock);
        if session.is_cancelled() {
            return Err(PowError::Interrupted);
        }

        let mut mid_state = Curl::new();
        mid_state.absorb(&trits[..MID_STATE_TRITS]);
        let last_chunk = &trits[MID_STATE_TRITS..];

        let found = self.pool.install(|| {
            search::find_nonce(
                &mid_state,
                last_chunk,
                min_weight_magnitude,
                self.workers,
                session,
            )
        });

        match found {
            Some(chunk) => {
                trits[MID_STATE_TRITS..].copy_from_slice(&chunk);
                Ok(trytes(&trits)?)
            }
            None if session.is_cancelled() => Err(PowError::Interrupted),
            None => Err(PowError::Exhausted),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::transaction::{fixtures, Transaction, NONCE_TRIT_OFFSET};

    fn trailing_zeros(hash: &str) -> usize {
        let trits = trits_from_trytes(hash).unwrap();
        trits.iter().rev().take_while(|&&t| t == 0).count()
    }

    #[test]
    fn finds_nonce_for_small_magnitude() {
        let engine = PowEngine::new(2).unwrap();
        let session = engine.session().unwrap();
        let input = fixtures::fragment(0, 0);

        let output = engine.search(&input, 5, &session).unwrap();
        let tx = Transaction::decode(&output).expect("result decodes");
        assert!(trailing_zeros(&tx.hash) >= 5);

        // Only the nonce may change.
        let nonce_tryte = NONCE_TRIT_OFFSET / 3;
        assert_eq!(&output[..nonce_tryte], &input[..nonce_tryte]);
    }

    #[test]
    fn zero_magnitude_returns_input_unchanged() {
        let engine = PowEngine::new(1).unwrap();
        let session = engine.session().unwrap();
        let input = fixtures::fragment(0, 0);
        assert_eq!(engine.search(&input, 0, &session).unwrap(), input);
    }

    #[test]
    fn rejects_malformed_input() {
        let engine = PowEngine::new(1).unwrap();
        let session = engine.session().unwrap();
        assert!(matches!(
            engine.search("ABC", 1, &session),
            Err(PowError::Ternary(TernaryError::InvalidLength { .. }))
        ));
        assert!(matches!(
            engine.search(&fixtures::fragment(0, 0), 244, &session),
            Err(PowError::InvalidMagnitude(244))
        ));
    }

    #[test]
    fn new_session_interrupts_running_search() {
        let engine = Arc::new(PowEngine::new(2).unwrap());
        let first = engine.session().unwrap();

        let worker = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.search(&fixtures::fragment(0, 0), 60, &first))
        };
        std::thread::sleep(Duration::from_millis(50));

        let second = engine.session().unwrap();
        let displaced = worker.join().unwrap();
        assert!(matches!(displaced, Err(PowError::Interrupted)));

        let output = engine.search(&fixtures::fragment(0, 0), 3, &second).unwrap();
        assert!(Transaction::decode(&output).is_some());
    }

    #[test]
    fn closed_engine_is_unavailable() {
        let engine = PowEngine::new(1).unwrap();
        let session = engine.session().unwrap();
        engine.close();

        assert!(!engine.is_open());
        assert!(session.is_cancelled());
        assert!(matches!(engine.session(), Err(PowError::Unavailable)));
        assert!(matches!(
            engine.search(&fixtures::fragment(0, 0), 1, &session),
            Err(PowError::Unavailable)
        ));
    }
}
