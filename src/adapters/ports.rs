//! Listening-socket confirmation
//!
//! After a launch, the supervisor waits for the service's port to show
//! up as a bound listener owned by the expected executable. On Linux the
//! socket table is read straight from `/proc/net/tcp{,6}` and tied back
//! to the owning process through its fd table; no external `netstat`
//! process is spawned.

use std::collections::HashSet;
use std::sync::Mutex;
use sysinfo::{RefreshKind, System};

use crate::adapters::process::cmdline_refresh;

/// Read-only query of bound listening sockets
pub trait PortProbe: Send + Sync {
    /// True when `port` is bound as a listener by a process whose
    /// command matches `exe`.
    fn is_listening(&self, exe: &str, port: u16) -> bool;
}

/// `PortProbe` backed by the kernel socket table
pub struct ListenerTable {
    system: Mutex<System>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_with_specifics(
                RefreshKind::new().with_processes(cmdline_refresh()),
            )),
        }
    }
}

impl Default for ListenerTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl PortProbe for ListenerTable {
    fn is_listening(&self, exe: &str, port: u16) -> bool {
        let mut inodes = HashSet::new();
        for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
            if let Ok(content) = std::fs::read_to_string(table) {
                inodes.extend(listening_inodes(&content, port));
            }
        }
        if inodes.is_empty() {
            return false;
        }

        let Ok(mut system) = self.system.lock() else {
            return false;
        };
        system.refresh_processes_specifics(cmdline_refresh());

        for (pid, process) in system.processes() {
            let command_matches = process
                .cmd()
                .first()
                .map(|argv0| argv0.contains(exe))
                .unwrap_or(false)
                || process.name().contains(exe);
            if !command_matches {
                continue;
            }

            if owns_socket_inode(pid.as_u32(), &inodes) {
                return true;
            }
        }
        false
    }
}

#[cfg(not(target_os = "linux"))]
impl PortProbe for ListenerTable {
    fn is_listening(&self, _exe: &str, port: u16) -> bool {
        use std::net::{SocketAddr, TcpStream};
        use std::time::Duration;

        // No portable socket table; a bounded connect probe on loopback
        // is the closest read-only approximation.
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_ok()
    }
}

/// Extract socket inodes of LISTEN entries bound to `port` from one
/// `/proc/net/tcp`-format table.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn listening_inodes(content: &str, port: u16) -> HashSet<u64> {
    const TCP_LISTEN: &str = "0A";

    let mut inodes = HashSet::new();
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || fields[3] != TCP_LISTEN {
            continue;
        }

        let Some(local_port) = fields[1]
            .rsplit(':')
            .next()
            .and_then(|hex| u16::from_str_radix(hex, 16).ok())
        else {
            continue;
        };
        if local_port != port {
            continue;
        }

        if let Ok(inode) = fields[9].parse::<u64>() {
            inodes.insert(inode);
        }
    }
    inodes
}

/// True when the process holds one of the given socket inodes open.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn owns_socket_inode(pid: u32, inodes: &HashSet<u64>) -> bool {
    let fd_dir = format!("/proc/{pid}/fd");
    let Ok(entries) = std::fs::read_dir(fd_dir) else {
        return false;
    };

    for entry in entries.flatten() {
        let Ok(target) = std::fs::read_link(entry.path()) else {
            continue;
        };
        if let Some(inode) = socket_inode(&target.to_string_lossy()) {
            if inodes.contains(&inode) {
                return true;
            }
        }
    }
    false
}

/// Parse the inode out of a `socket:[12345]` fd link target.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
