use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_world::ViewerSink;

use crate::registry::WorldRegistry;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    pub tick: Duration,
    /// Rayon workers for per-world ticks; 0 picks from available parallelism.
    pub threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            threads: 0,
        }
    }
}

/// Drives maintenance ticks. A driver thread claims every idle loaded world
/// each tick and hands it to the pool; a world still busy from an earlier tick
/// is skipped until it finishes.
pub struct Scheduler {
    stop_tx: Option<Sender<()>>,
    driver: Option<JoinHandle<()>>,
    workers: usize,
}

impl Scheduler {
    pub fn start(
        registry: Arc<WorldRegistry>,
        sink: Arc<dyn ViewerSink>,
        cfg: SchedulerConfig,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = if cfg.threads > 0 {
            cfg.threads
        } else {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .saturating_sub(1)
                .max(1)
        };
        let pool: Arc<ThreadPool> = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strata-tick-{i}"))
                .build()?,
        );
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let tick = cfg.tick;
        let driver = thread::Builder::new()
            .name("strata-driver".into())
            .spawn(move || {
                loop {
                    let started = Instant::now();
                    for guard in registry.claim_ticks() {
                        let registry = Arc::clone(&registry);
                        let sink = Arc::clone(&sink);
                        pool.spawn(move || {
                            let tick = catch_unwind(AssertUnwindSafe(|| {
                                registry.tick_world(&guard, Instant::now(), sink.as_ref())
                            }));
                            if tick.is_err() {
                                log::error!("world {}: tick panicked", guard.world().id());
                            }
                        });
                    }
                    let wait = tick.saturating_sub(started.elapsed());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });
        let driver = match driver {
            Ok(h) => Some(h),
            Err(e) => {
                log::error!("failed to start scheduler driver: {e}");
                None
            }
        };
        log::info!(
            "scheduler: {} tick worker(s), {} ms tick",
            workers,
            tick.as_millis()
        );
        Ok(Self {
            stop_tx: Some(stop_tx),
            driver,
            workers,
        })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stops claiming new ticks and joins the driver. Ticks already handed to
    /// the pool finish on their own.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.driver.take() {
            if handle.join().is_err() {
                log::error!("scheduler driver panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
