//! Threading Primitives
//!
//! Fixed-interval ticker thread used by the performance monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, RecvTimeoutError, Sender, TryRecvError};

/// Named thread that runs a callback on a fixed schedule.
///
/// A callback that overruns the interval does not queue up missed ticks: the
/// ticker skips them and realigns to the schedule. Once [`Ticker::stop`]
/// returns, the callback never runs again.
pub struct Ticker {
    name: String,
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

impl Ticker {
    /// Spawn a ticker thread calling `on_tick` every `interval`.
    ///
    /// The first tick fires one interval after spawning.
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let skipped = Arc::new(AtomicU64::new(0));

        let thread_ticks = Arc::clone(&ticks);
        let thread_skipped = Arc::clone(&skipped);
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let mut next = Instant::now() + interval;

            loop {
                let wait = next.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                // A stop request may have landed right at the deadline
                if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                    break;
                }

                on_tick();
                thread_ticks.fetch_add(1, Ordering::Relaxed);

                next += interval;
                let now = Instant::now();
                if now > next {
                    let behind = now - next;
                    let missed = (behind.as_nanos() / interval.as_nanos()) as u64 + 1;
                    next += interval * missed as u32;
                    thread_skipped.fetch_add(missed, Ordering::Relaxed);
                    log::warn!(
                        "{}: tick overran by {:?}, skipping {} tick(s)",
                        thread_name,
                        behind,
                        missed
                    );
                }
            }

            log::debug!("{}: ticker stopped", thread_name);
        })?;

        Ok(Self {
            name,
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            ticks,
            skipped,
        })
    }

    /// Get the thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the ticker thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of completed ticks
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of ticks skipped because a callback overran
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Stop the ticker and wait for an in-flight tick to finish.
    ///
    /// When called from inside the callback the thread is only signalled,
    /// since it cannot join itself.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::warn!("{}: ticker thread panicked", self.name);
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
