//! Periodic progress reporting on a dedicated thread

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// Runs a report closure every `interval` until finished or dropped.
///
/// The reporter sleeps independently of the workers; dropping it wakes the
/// thread immediately and joins it.
pub struct Reporter {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    pub fn spawn<F>(name: &str, interval: Duration, report: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (shutdown, signal) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                match signal.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => report(),
                    _ => break,
                }
            })?;

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop reporting and wait for the thread to exit
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        // Disconnecting the channel is the shutdown signal
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_reports_periodically() {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        let reporter = Reporter::spawn("test-reporter", Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        reporter.finish();
        assert!(ticks.load(Ordering::Relaxed) >= 3);
    }

    #[test]
    fn test_finish_does_not_wait_for_interval() {
        let reporter = Reporter::spawn("idle-reporter", Duration::from_secs(3600), || {}).unwrap();
        let started = Instant::now();
        reporter.finish();
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
