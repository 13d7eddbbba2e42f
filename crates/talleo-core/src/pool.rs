//! Scoped worker pool
//!
//! Every run spawns exactly `workers` tasks on a rayon pool and blocks until
//! all of them have returned. A failing or panicking worker is logged, halts
//! the shared stop signal so its siblings wind down, and is reported back in
//! the [`PoolReport`] instead of unwinding into the caller.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error};

use crate::cell::StopSignal;
use crate::error::{PoolError, WorkerError};
use crate::walker::BoundedStrideWalker;

/// One worker's slice of the search space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker_id: u64,
    pub worker_count: u64,
    pub start_value: u64,
}

impl WorkerAssignment {
    /// Walker over this worker's residue class of a `lane_bits`-wide lane
    pub fn walker(&self, lane_bits: u32) -> Result<BoundedStrideWalker, PoolError> {
        BoundedStrideWalker::with_width(self.worker_id, self.worker_count, self.start_value, lane_bits)
    }
}

/// A worker that ended with an error or a panic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub worker_id: u64,
    pub message: String,
}

/// Outcome of one pool run
#[derive(Debug, Default)]
pub struct PoolReport {
    pub failures: Vec<WorkerFailure>,
}

impl PoolReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct WorkerPool {
    pool: Arc<ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Dedicated pool with one thread per worker
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoThreads);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("talleo-worker-{}", i))
            .build()?;

        Ok(Self {
            pool: Arc::new(pool),
            workers,
        })
    }

    /// Run on a caller-supplied pool, which must be able to host every worker at once
    pub fn with_context(pool: Arc<ThreadPool>, workers: usize) -> Result<Self, PoolError> {
        if workers == 0 {
            return Err(PoolError::NoThreads);
        }

        let available = pool.current_num_threads();
        if available < workers {
            return Err(PoolError::InsufficientThreads {
                requested: workers,
                available,
            });
        }

        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn every worker and block until all have exited
    pub fn run<S, F>(&self, start_value: u64, signal: &S, worker: F) -> PoolReport
    where
        S: StopSignal,
        F: Fn(WorkerAssignment) -> Result<(), WorkerError> + Sync,
    {
        let failures = Mutex::new(Vec::new());
        let worker_count = self.workers as u64;

        self.pool.scope(|scope| {
            for worker_id in 0..worker_count {
                let worker = &worker;
                let failures = &failures;
                scope.spawn(move |_| {
                    let assignment = WorkerAssignment {
                        worker_id,
                        worker_count,
                        start_value,
                    };

                    let message = match catch_unwind(AssertUnwindSafe(|| worker(assignment))) {
                        Ok(Ok(())) => {
                            debug!(worker_id, "Worker finished");
                            return;
                        }
                        Ok(Err(e)) => e.to_string(),
                        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
                    };

                    error!(worker_id, worker_count, "Worker failed: {}", message);
                    signal.halt();
                    failures
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(WorkerFailure { worker_id, message });
                });
            }
        });

        let mut failures = failures.into_inner().unwrap_or_else(|e| e.into_inner());
        failures.sort_by_key(|f| f.worker_id);
        PoolReport { failures }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
