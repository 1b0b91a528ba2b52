//! Process-table probing
//!
//! Answers "is this service running right now, and under which pid" by
//! enumerating the process table directly instead of shelling out to
//! `ps`/`grep` pipelines.

use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};

/// Process refresh that also collects command lines; the stock
/// `refresh_processes` leaves `cmd` empty.
pub(crate) fn cmdline_refresh() -> ProcessRefreshKind {
    // A cmdline never changes after exec, one read per pid is enough.
    ProcessRefreshKind::new().with_cmd(UpdateKind::OnlyIfNotSet)
}

/// Read-only liveness lookup against the local process table
pub trait ProcessProbe: Send + Sync {
    /// Find the pid of a process whose command line contains both
    /// `name` and `ip` as whole words. Returns 0 when no such process
    /// exists or the process table cannot be read; the supervisor treats
    /// both identically as "not running".
    fn find_pid(&self, name: &str, ip: &str) -> u32;
}

/// `ProcessProbe` backed by the system process table
pub struct SystemProbe {
    system: Mutex<System>,
    own_pid: u32,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_with_specifics(
                RefreshKind::new().with_processes(cmdline_refresh()),
            )),
            own_pid: std::process::id(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn find_pid(&self, name: &str, ip: &str) -> u32 {
        let Ok(mut system) = self.system.lock() else {
            return 0;
        };
        system.refresh_processes_specifics(cmdline_refresh());

        // Smallest matching pid keeps the answer deterministic when a
        // relaunch races an exiting instance.
        let mut found = 0u32;
        for (pid, process) in system.processes() {
            let pid = pid.as_u32();
            if pid == self.own_pid {
                continue;
            }

            let cmdline = process.cmd().join(" ");
            if contains_word(&cmdline, name) && contains_word(&cmdline, ip) {
                if found == 0 || pid < found {
                    found = pid;
                }
            }
        }
        found
    }
}

/// Whole-word containment with `grep -w` semantics: an occurrence only
/// counts when the needle's word-character edges are not extended by
/// adjacent word characters (`[A-Za-z0-9_]`) in the haystack.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let first_char_len = needle.chars().next().map(char::len_utf8).unwrap_or(1);
    let needle_starts_word = needle.chars().next().map(is_word).unwrap_or(false);
    let needle_ends_word = needle.chars().next_back().map(is_word).unwrap_or(false);

    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(needle) {
        let start = search_from + offset;
        let end = start + needle.len();

        let left_ok = !needle_starts_word
            || haystack[..start].chars().next_back().map(is_word) != Some(true);
        let right_ok =
            !needle_ends_word || haystack[end..].chars().next().map(is_word) != Some(true);

        if left_ok && right_ok {
            return true;
        }

        search_from = start + first_char_len;
    }
    false
}
