//! Supervision loop
//!
//! One tick covers the full supervision pass: probe every tracked
//! service, report transitions, relaunch dead services, scan error logs
//! and raise debounced alerts, then run the retention sweep if due.
//! Failures stay contained to the service that produced them; only a
//! missing executable tears the loop down.

use chrono::{DateTime, Local};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::adapters::{CleanupRunner, NotificationSink, ProcessProbe};
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{ServiceDescriptor, ServiceRegistry};
use crate::supervisor::{
    AlertDebouncer, ErrorRateDetector, RetentionSweeper, ServiceLauncher, StatusReporter,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ALERT_TITLE: &str = "Service monitor alert";
const NO_SERVICE_MSG: &str = "No service start, monitor exit.\n";

pub struct Supervisor<P, L, N, C> {
    tick_interval: Duration,
    registry: ServiceRegistry,
    probe: P,
    launcher: L,
    /// Absent when no webhook is configured; alerts are then log-only
    sink: Option<N>,
    detector: ErrorRateDetector,
    debouncer: AlertDebouncer,
    sweeper: RetentionSweeper<C>,
    reporter: StatusReporter,
}

impl<P, L, N, C> Supervisor<P, L, N, C>
where
    P: ProcessProbe,
    L: ServiceLauncher,
    N: NotificationSink,
    C: CleanupRunner,
{
    pub fn new(
        config: &AppConfig,
        registry: ServiceRegistry,
        probe: P,
        launcher: L,
        sink: Option<N>,
        cleaner: C,
    ) -> Self {
        Self {
            tick_interval: Duration::from_secs(config.monitor.tick_secs),
            registry,
            probe,
            launcher,
            sink,
            detector: ErrorRateDetector::new(
                config.monitor.window_secs,
                config.monitor.alert_threshold,
            ),
            debouncer: AlertDebouncer::new(
                config.monitor.alert_threshold,
                config.monitor.send_interval_secs,
            ),
            sweeper: RetentionSweeper::new(cleaner, config.monitor.cleanup_interval_secs),
            reporter: StatusReporter::new(config.paths.report_dir.clone()),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Drive ticks forever. Returns early only for an empty registry or
    /// a fatal launch error.
    pub async fn run(mut self) -> Result<()> {
        if self.registry.is_empty() {
            warn!("no service is assigned to this host, exiting");
            self.reporter.append(Local::now(), NO_SERVICE_MSG)?;
            return Ok(());
        }

        // Seed pids up front so services already running when the
        // supervisor starts do not report a spurious up transition.
        for name in self.registry.names() {
            if let Some(svc) = self.registry.get_mut(&name) {
                svc.pid = self.probe.find_pid(&svc.name, &svc.ip);
            }
        }

        info!(
            services = self.registry.len(),
            tick_secs = self.tick_interval.as_secs(),
            "supervisor loop started"
        );

        let mut ticker = interval(self.tick_interval);
        // Don't burst-fire missed ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick(Local::now()).await?;
        }
    }

    /// One full supervision pass as of `now`.
    pub async fn tick(&mut self, now: DateTime<Local>) -> Result<()> {
        self.check_liveness(now).await?;
        self.check_error_logs(now).await;
        self.sweeper.maybe_sweep(now.timestamp(), &self.registry).await;
        Ok(())
    }

    /// Probe every service, record up/down transitions and relaunch
    /// whatever is dead.
    async fn check_liveness(&mut self, now: DateTime<Local>) -> Result<()> {
        let now_text = now.format(TIME_FORMAT).to_string();
        let mut transitions = String::new();

        for name in self.registry.names() {
            let Some(svc) = self.registry.get_mut(&name) else {
                continue;
            };
            let old_pid = svc.pid;
            let probed = self.probe.find_pid(&svc.name, &svc.ip);
            svc.pid = probed;

            if probed != old_pid {
                if probed != 0 {
                    info!(service = %name, pid = probed, "service is up");
                    transitions.push_str(&format!("service {name} {probed} up {now_text}\n"));
                } else {
                    warn!(service = %name, last_pid = old_pid, "service went down");
                    transitions.push_str(&format!("service {name} {old_pid} down {now_text}\n"));
                }
            }

            if probed == 0 {
                match self.launcher.start(svc).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => warn!(service = %name, error = %e, "launch attempt failed"),
                }
            }
        }

        if let Err(e) = self.reporter.append(now, &transitions) {
            warn!(error = %e, "status report write failed");
        }
        Ok(())
    }

    /// Scan every service's error log and push debounced alerts.
    async fn check_error_logs(&mut self, now: DateTime<Local>) {
        let now_epoch = now.timestamp();
        let now_text = now.format(TIME_FORMAT).to_string();

        for name in self.registry.names() {
            let Some(svc) = self.registry.get_mut(&name) else {
                continue;
            };
            let window = self.detector.scan(&svc.error_log_path(), now_epoch);
            if !self
                .debouncer
                .should_alert(svc.last_alert_ts, window.peak, now_epoch)
            {
                continue;
            }

            warn!(
                service = %name,
                peak = window.peak,
                "error burst detected"
            );
            let body = alert_body(svc, window.peak, &window.samples, &now_text);
            if let Some(sink) = &self.sink {
                if let Err(e) = sink.send(ALERT_TITLE, &body).await {
                    error!(service = %name, error = %e, "alert delivery failed");
                }
            }
            self.debouncer.record_sent(svc, now_epoch);
        }
    }
}

/// Markdown card body in the shape the on-call rotation reads.
fn alert_body(svc: &ServiceDescriptor, peak: u32, samples: &str, now_text: &str) -> String {
    format!(
        "### {}: \n\n   \
         time: {}\n\n   \
         host: {}\n\n   \
         addr: {}\n\n   \
         exe: {}\n\n   \
         semver: {}\n\n   \
         pid: {}\n\n   \
         err logs: {} /sec\n\n{}",
        ALERT_TITLE,
        now_text,
        svc.host_name,
        svc.addr(),
        svc.exe,
        svc.semver,
        svc.pid,
        peak,
        samples
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_body_carries_service_identity() {
        let svc = ServiceDescriptor {
            name: "worker_8080".to_string(),
            exe: "worker".to_string(),
            ip: "10.1.2.3".to_string(),
            port: 8080,
            host_name: "prod-algo-01".to_string(),
            semver: "2.4.1".to_string(),
            pid: 4321,
            ..ServiceDescriptor::default()
        };

        let body = alert_body(
            &svc,
            17,
            "E20240615 12:00:00.1  4321 worker.cc:91] db timeout\n",
            "2024-06-15 12:00:01",
        );

        assert!(body.starts_with("### Service monitor alert: \n\n"));
        assert!(body.contains("   time: 2024-06-15 12:00:01\n\n"));
        assert!(body.contains("   host: prod-algo-01\n\n"));
        assert!(body.contains("   addr: 10.1.2.3:8080\n\n"));
        assert!(body.contains("   exe: worker\n\n"));
        assert!(body.contains("   semver: 2.4.1\n\n"));
        assert!(body.contains("   pid: 4321\n\n"));
        assert!(body.contains("   err logs: 17 /sec\n\n"));
        assert!(body.ends_with("db timeout\n"));
    }
}
