//! Tracked-service descriptors and the registry context object.
//!
//! The registry owns every `ServiceDescriptor` in the order the shared
//! document lists them, addressable by composite name, and is handed to
//! each component call explicitly. The tracked set is fixed once built;
//! only the runtime fields (`pid`, `last_alert_ts`) change afterwards.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::identity::HostIdentity;

/// One entry of the shared descriptor list (`config/server.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub exe: String,
    pub ip: String,
    pub port: u16,
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
struct ServersFile {
    server_list: Vec<ServerEntry>,
}

/// A service tracked by the supervisor
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    /// Composite key `{exe}_{port}`
    pub name: String,
    pub exe: String,
    pub ip: String,
    pub port: u16,
    pub nickname: String,
    pub host_name: String,
    pub work_path: String,
    /// Directory holding this service's logs
    pub log_dir: String,
    pub semver: String,
    /// Last observed pid; 0 means not running
    pub pid: u32,
    /// Epoch seconds of the last alert attempt; 0 means never alerted
    pub last_alert_ts: i64,
}

impl ServiceDescriptor {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Path of the structured error log scanned by the detector
    pub fn error_log_path(&self) -> PathBuf {
        Path::new(&self.log_dir).join(format!("{}.ERROR", self.name))
    }
}

/// Context object owning the fixed set of supervised services
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Parse the descriptor list from its JSON document
    pub fn load_entries(path: &Path) -> Result<Vec<ServerEntry>> {
        let content = std::fs::read_to_string(path)?;
        let file: ServersFile = serde_json::from_str(&content)?;
        Ok(file.server_list)
    }

    /// Build the registry from parsed entries, keeping only services
    /// whose `ip` matches this host, in document order. A duplicate name
    /// replaces the earlier descriptor in place, preserving the
    /// one-descriptor-per-name invariant.
    pub fn build(
        entries: Vec<ServerEntry>,
        identity: &HostIdentity,
        log_dir_prefix: &str,
    ) -> Self {
        let mut services: Vec<ServiceDescriptor> = Vec::new();

        for entry in entries {
            if entry.ip != identity.ip {
                continue;
            }

            let name = format!("{}_{}", entry.exe, entry.port);
            let descriptor = ServiceDescriptor {
                name: name.clone(),
                log_dir: format!("{}{}", log_dir_prefix, entry.exe),
                exe: entry.exe,
                ip: entry.ip,
                port: entry.port,
                nickname: entry.nickname,
                host_name: identity.host_name.clone(),
                work_path: identity.work_path.clone(),
                semver: identity.semver.clone(),
                pid: 0,
                last_alert_ts: 0,
            };
            match services.iter().position(|svc| svc.name == name) {
                Some(idx) => services[idx] = descriptor,
                None => services.push(descriptor),
            }
        }

        Self { services }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|svc| svc.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|svc| svc.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ServiceDescriptor> {
        self.services.iter_mut().find(|svc| svc.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ServiceDescriptor> {
        self.services.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> HostIdentity {
        HostIdentity {
            ip: "10.0.0.5".to_string(),
            host_name: "algo-host-1".to_string(),
            work_path: "/opt/services".to_string(),
            semver: "1.2.3".to_string(),
        }
    }

    fn entry(exe: &str, ip: &str, port: u16) -> ServerEntry {
        ServerEntry {
            exe: exe.to_string(),
            ip: ip.to_string(),
            port,
            nickname: format!("{exe}-nick"),
        }
    }

    #[test]
    fn build_keeps_only_local_services() {
        let entries = vec![
            entry("worker", "10.0.0.5", 8080),
            entry("worker", "10.0.0.6", 8080),
            entry("ranker", "10.0.0.5", 9000),
        ];

        let registry = ServiceRegistry::build(entries, &identity(), "../Log");
        assert_eq!(registry.len(), 2);
        assert!(registry.get("worker_8080").is_some());
        assert!(registry.get("ranker_9000").is_some());
    }

    #[test]
    fn descriptor_paths_derive_from_exe_and_name() {
        let entries = vec![entry("worker", "10.0.0.5", 8080)];
        let registry = ServiceRegistry::build(entries, &identity(), "../Log");

        let svc = registry.get("worker_8080").unwrap();
        assert_eq!(svc.log_dir, "../Logworker");
        assert_eq!(
            svc.error_log_path(),
            PathBuf::from("../Logworker/worker_8080.ERROR")
        );
        assert_eq!(svc.addr(), "10.0.0.5:8080");
        assert_eq!(svc.pid, 0);
        assert_eq!(svc.last_alert_ts, 0);
    }

    #[test]
    fn registry_preserves_document_order() {
        let mut replacement = entry("zeta", "10.0.0.5", 9100);
        replacement.nickname = "zeta-v2".to_string();
        let entries = vec![
            entry("zeta", "10.0.0.5", 9100),
            entry("alpha", "10.0.0.5", 9200),
            replacement,
        ];

        let registry = ServiceRegistry::build(entries, &identity(), "../Log");
        // document order, not name order; a duplicate keeps its first slot
        assert_eq!(registry.names(), ["zeta_9100", "alpha_9200"]);
        assert_eq!(registry.get("zeta_9100").unwrap().nickname, "zeta-v2");
    }

    #[test]
    fn duplicate_names_collapse_to_one() {
        let mut dup = entry("worker", "10.0.0.5", 8080);
        dup.nickname = "replacement".to_string();
        let entries = vec![entry("worker", "10.0.0.5", 8080), dup];

        let registry = ServiceRegistry::build(entries, &identity(), "../Log");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("worker_8080").unwrap().nickname, "replacement");
    }

    #[test]
    fn entries_parse_from_server_list_document() {
        let json = r#"{
            "server_list": [
                {"exe": "worker", "ip": "10.0.0.5", "port": 8080, "nickname": "w1"}
            ]
        }"#;

        let file: ServersFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.server_list.len(), 1);
        assert_eq!(file.server_list[0].exe, "worker");
        assert_eq!(file.server_list[0].port, 8080);
    }
}
