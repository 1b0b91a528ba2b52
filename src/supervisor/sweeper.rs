//! Periodic log retention sweeps
//!
//! One shared timer covers every tracked service: when more than the
//! configured interval has passed since the previous sweep, the cleanup
//! runner is invoked once per service and the timer resets.

use tracing::{debug, info};

use crate::adapters::CleanupRunner;
use crate::registry::ServiceRegistry;

pub struct RetentionSweeper<C> {
    cleaner: C,
    interval_secs: i64,
    /// Epoch seconds of the last sweep; starts at 0 so the first tick
    /// sweeps immediately
    last_sweep_ts: i64,
}

impl<C: CleanupRunner> RetentionSweeper<C> {
    pub fn new(cleaner: C, interval_secs: i64) -> Self {
        Self {
            cleaner,
            interval_secs,
            last_sweep_ts: 0,
        }
    }

    /// Run a sweep if the interval has elapsed. Returns whether one ran.
    ///
    /// The timer resets before the cleanup calls, so a slow script delays
    /// the tick but not the schedule.
    pub async fn maybe_sweep(&mut self, now: i64, registry: &ServiceRegistry) -> bool {
        if now - self.last_sweep_ts <= self.interval_secs {
            return false;
        }
        self.last_sweep_ts = now;

        info!(services = registry.len(), "running log retention sweep");
        for svc in registry.iter() {
            if let Err(e) = self.cleaner.clean(&svc.work_path, &svc.exe, svc.port).await {
                debug!(service = %svc.name, error = %e, "cleanup invocation failed");
            }
        }
        true
    }
}
