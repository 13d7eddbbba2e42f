//! Proof-of-work block miner
//!
//! Lifecycle is `Stopped -> InProgress -> {Found | Stopped}`, held in a single
//! [`CoordinationCell`]. Only one run may be in flight per miner; a `mine()`
//! call that arrives while a previous run is still winding down backs off and
//! retries. Each worker strides the nonce field by the worker count from a
//! randomized base, wrapping freely around the 64-bit nonce space.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::Duration;

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use talleo_crypto::hex;

use crate::block::{BlockHasher, BlockMiningParameters, BlockTemplate, KeccakBlockHasher};
use crate::cell::{CoordinationCell, MiningStatus, StopSignal};
use crate::error::{MinerError, WorkerError};
use crate::pool::{WorkerAssignment, WorkerPool};
use crate::predicate::{CandidatePredicate, DifficultyPredicate};
use crate::stats::{format_rate, SearchStats};
use crate::telemetry::Reporter;

/// Hashes counted locally before being added to the shared statistics
const HASH_BATCH: u64 = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    /// Cadence of the hash-rate log line
    pub report_interval: Duration,
    /// Wait between attempts to start while a previous run is still active
    pub retry_backoff: Duration,
    /// Fixed base nonce; random per run when unset
    pub start_nonce: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(1),
            start_nonce: None,
        }
    }
}

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found(BlockTemplate),
    Cancelled,
}

pub struct Miner<H = KeccakBlockHasher> {
    hasher: H,
    config: MinerConfig,
    state: CoordinationCell<MiningStatus>,
    run_lock: Mutex<()>,
    /// Number of runs that have fully wound down
    finished_runs: Mutex<u64>,
    run_finished: Condvar,
    block: Mutex<Option<BlockTemplate>>,
    blocks_found: AtomicU64,
    context: Option<Arc<ThreadPool>>,
}

impl<H: BlockHasher> Miner<H> {
    pub fn new(hasher: H, config: MinerConfig) -> Self {
        Self {
            hasher,
            config,
            state: CoordinationCell::new(MiningStatus::Stopped),
            run_lock: Mutex::new(()),
            finished_runs: Mutex::new(0),
            run_finished: Condvar::new(),
            block: Mutex::new(None),
            blocks_found: AtomicU64::new(0),
            context: None,
        }
    }

    /// Spawn workers on `context` instead of a dedicated pool per run
    pub fn with_context(mut self, context: Arc<ThreadPool>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn state(&self) -> MiningStatus {
        self.state.load()
    }

    /// Blocks published across all runs of this miner
    pub fn blocks_found(&self) -> u64 {
        self.blocks_found.load(Ordering::Relaxed)
    }

    /// Search for a nonce meeting `params.difficulty`.
    ///
    /// Blocks until a worker finds one or [`stop`](Self::stop) is called.
    pub fn mine(&self, params: &BlockMiningParameters, thread_count: usize) -> Result<MiningOutcome, MinerError> {
        if params.difficulty == 0 {
            return Err(MinerError::InvalidDifficulty);
        }
        let pool = match &self.context {
            Some(context) => WorkerPool::with_context(Arc::clone(context), thread_count)?,
            None => WorkerPool::new(thread_count)?,
        };

        let _run = self.begin_run();
        let result = self.run_workers(&pool, params);

        self.state.store(MiningStatus::Stopped);
        let mut finished = self.lock_finished();
        *finished += 1;
        self.run_finished.notify_all();

        result
    }

    /// Cancel the in-flight run and wait until all of its workers have exited.
    ///
    /// Does nothing unless a run is in progress.
    pub fn stop(&self) {
        let mut finished = self.lock_finished();
        if self
            .state
            .compare_and_swap(MiningStatus::InProgress, MiningStatus::Stopped)
            .is_err()
        {
            return;
        }

        info!("Stopping mining");
        let target = *finished + 1;
        while *finished < target {
            finished = self
                .run_finished
                .wait(finished)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    fn begin_run(&self) -> MutexGuard<'_, ()> {
        loop {
            let guard = match self.run_lock.try_lock() {
                Ok(guard) => Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => None,
            };

            if let Some(guard) = guard {
                let _finished = self.lock_finished();
                if self
                    .state
                    .compare_and_swap(MiningStatus::Stopped, MiningStatus::InProgress)
                    .is_ok()
                {
                    return guard;
                }
            }

            debug!("Previous mining run still active, retrying");
            thread::sleep(self.config.retry_backoff);
        }
    }

    fn run_workers(&self, pool: &WorkerPool, params: &BlockMiningParameters) -> Result<MiningOutcome, MinerError> {
        let stats = SearchStats::new();
        let reporter = {
            let stats = Arc::clone(&stats);
            Reporter::spawn("talleo-hashrate", self.config.report_interval, move || {
                info!("Current hash rate: {}", format_rate(stats.per_second(), "H"));
            })?
        };

        let base_nonce = self.config.start_nonce.unwrap_or_else(rand::random);
        info!(
            threads = pool.workers(),
            difficulty = params.difficulty,
            "Starting mining from nonce {}",
            base_nonce
        );

        self.lock_block().take();
        let predicate = DifficultyPredicate::new(&self.hasher, params.difficulty);
        let report = pool.run(base_nonce, &self.state, |assignment| {
            self.search_nonces(&predicate, &params.block_template, assignment, &stats)
        });
        reporter.finish();

        if let Some(block) = self.lock_block().take() {
            return Ok(MiningOutcome::Found(block));
        }
        if !report.is_clean() {
            return Err(MinerError::WorkerFailed {
                failures: report.failures.len(),
            });
        }

        info!("Mining stopped after {} hashes", stats.total());
        Ok(MiningOutcome::Cancelled)
    }

    fn search_nonces(
        &self,
        predicate: &DifficultyPredicate<'_, H>,
        template: &BlockTemplate,
        assignment: WorkerAssignment,
        stats: &SearchStats,
    ) -> Result<(), WorkerError> {
        let mut block = template.clone();
        block.nonce = assignment.start_value.wrapping_add(assignment.worker_id);
        let mut pending = 0u64;

        while !self.state.should_stop() {
            let accepted = predicate.evaluate(&block);
            pending += 1;
            if pending == HASH_BATCH {
                stats.add(pending);
                pending = 0;
            }

            if let Some(hash) = accepted? {
                if self
                    .state
                    .compare_and_swap(MiningStatus::InProgress, MiningStatus::Found)
                    .is_ok()
                {
                    info!(
                        nonce = block.nonce,
                        "Found block for difficulty {} with hash {}",
                        predicate.difficulty(),
                        hex::encode(hash)
                    );
                    self.blocks_found.fetch_add(1, Ordering::Relaxed);
                    *self.lock_block() = Some(block);
                }
                break;
            }

            block.nonce = block.nonce.wrapping_add(assignment.worker_count);
        }

        stats.add(pending);
        Ok(())
    }

    fn lock_finished(&self) -> MutexGuard<'_, u64> {
        self.finished_runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_block(&self) -> MutexGuard<'_, Option<BlockTemplate>> {
        self.block.lock().unwrap_or_else(|e| e.into_inner())
    }
}
