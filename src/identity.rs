//! Local host identity used to select and describe supervised services.
//!
//! The outbound-route IP decides which entries of the shared descriptor
//! list belong to this host; the rest is carried into alert payloads.

use std::net::UdpSocket;
use std::path::Path;

use crate::config::PathsConfig;
use crate::error::{Result, SentinelError};

/// Identity of the host the supervisor runs on
#[derive(Debug, Clone)]
pub struct HostIdentity {
    /// Outbound-route IP, matched against descriptor `ip` fields
    pub ip: String,
    pub host_name: String,
    /// Working directory, passed to the cleanup collaborator
    pub work_path: String,
    /// Deployed package version, carried into alerts
    pub semver: String,
}

impl HostIdentity {
    /// Detect the local identity. Fails only when the outbound IP cannot
    /// be determined, since without it no services can be selected.
    pub fn detect(paths: &PathsConfig) -> Result<Self> {
        let ip = local_ip()?;
        let host_name = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
        let work_path = std::env::current_dir()?.display().to_string();
        let semver = read_semver(Path::new(&paths.project_config));

        Ok(Self {
            ip,
            host_name,
            work_path,
            semver,
        })
    }
}

/// Determine the outbound-route IP via a connected UDP socket.
/// No packet is sent; connecting only asks the kernel for a route.
fn local_ip() -> Result<String> {
    let socket =
        UdpSocket::bind("0.0.0.0:0").map_err(|e| SentinelError::LocalIp(e.to_string()))?;
    socket
        .connect("8.8.8.8:80")
        .map_err(|e| SentinelError::LocalIp(e.to_string()))?;
    let addr = socket
        .local_addr()
        .map_err(|e| SentinelError::LocalIp(e.to_string()))?;
    Ok(addr.ip().to_string())
}

/// Extract the `service_semver=` value from the project configuration
/// file. A missing file or line yields an empty version, matching the
/// behavior of a freshly unpacked deployment.
fn read_semver(path: &Path) -> String {
    let Ok(content) = std::fs::read_to_string(path) else {
        return String::new();
    };

    content
        .lines()
        .find_map(|line| {
            let line = line.trim();
            line.strip_prefix("service_semver")
                .and_then(|rest| rest.trim_start().strip_prefix('='))
                .map(|value| value.trim().to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn semver_extracted_from_project_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "service_name=ranker").unwrap();
        writeln!(file, "service_semver=2.4.1").unwrap();
        writeln!(file, "service_port=8080").unwrap();

        assert_eq!(read_semver(file.path()), "2.4.1");
    }

    #[test]
    fn semver_missing_file_is_empty() {
        assert_eq!(read_semver(Path::new("no-such-project-config")), "");
    }

    #[test]
    fn semver_missing_line_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "service_name=ranker").unwrap();

        assert_eq!(read_semver(file.path()), "");
    }

    #[test]
    fn semver_tolerates_spacing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "service_semver = 0.9.0 ").unwrap();

        assert_eq!(read_semver(file.path()), "0.9.0");
    }
}
