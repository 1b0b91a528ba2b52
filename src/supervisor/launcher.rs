//! Service launching
//!
//! Starts a dead service detached from the supervisor and polls the
//! listener table until the service's port comes up or the confirmation
//! budget runs out.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::adapters::PortProbe;
use crate::config::LaunchConfig;
use crate::error::{Result, SentinelError};
use crate::registry::ServiceDescriptor;

#[async_trait]
pub trait ServiceLauncher: Send + Sync {
    async fn start(&self, svc: &ServiceDescriptor) -> Result<()>;
}

/// Spawns `<work_path>/<exe> <ip> <port> <nickname> <name>` in its own
/// process group with all stdio detached, then confirms the listener.
pub struct DetachedLauncher<P> {
    ports: P,
    confirm_retries: u32,
    confirm_delay: Duration,
}

impl<P: PortProbe> DetachedLauncher<P> {
    pub fn new(ports: P, launch: &LaunchConfig) -> Self {
        Self {
            ports,
            confirm_retries: launch.confirm_retries,
            confirm_delay: Duration::from_millis(launch.confirm_delay_ms),
        }
    }

    async fn confirm_listening(&self, svc: &ServiceDescriptor) {
        for attempt in 0..self.confirm_retries {
            if self.ports.is_listening(&svc.exe, svc.port) {
                debug!(service = %svc.name, attempt, "listening port confirmed");
                return;
            }
            sleep(self.confirm_delay).await;
        }
        // Not an error: the next tick re-probes and retries the launch.
        warn!(
            service = %svc.name,
            port = svc.port,
            retries = self.confirm_retries,
            "service did not confirm its port after launch"
        );
    }
}

#[async_trait]
impl<P: PortProbe> ServiceLauncher for DetachedLauncher<P> {
    async fn start(&self, svc: &ServiceDescriptor) -> Result<()> {
        let exe_path = Path::new(&svc.work_path).join(&svc.exe);
        if !exe_path.exists() {
            return Err(SentinelError::ExecutableMissing {
                service: svc.name.clone(),
                path: exe_path.display().to_string(),
            });
        }

        info!(service = %svc.name, addr = %svc.addr(), "starting service");

        let mut cmd = Command::new(&exe_path);
        cmd.arg(&svc.ip)
            .arg(svc.port.to_string())
            .arg(&svc.nickname)
            .arg(&svc.name)
            .current_dir(&svc.work_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group, so the service outlives supervisor signals.
        #[cfg(unix)]
        cmd.process_group(0);

        // The child is not awaited; the runtime reaps it in the
        // background and liveness comes from the process table.
        cmd.spawn().map_err(|e| SentinelError::SpawnFailed {
            service: svc.name.clone(),
            reason: e.to_string(),
        })?;

        self.confirm_listening(svc).await;
        Ok(())
    }
}
