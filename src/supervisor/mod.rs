//! Supervision Layer for Service Liveness and Recovery
//!
//! This module provides the per-tick supervision machinery:
//! - Launcher for detached restarts with port confirmation
//! - Detector for error-log burst windows
//! - Debouncer for alert rate limiting
//! - Reporter for day-partitioned transition logs
//! - Sweeper for periodic log retention

pub mod debouncer;
pub mod detector;
pub mod launcher;
pub mod report;
pub mod supervisor;
pub mod sweeper;

pub use debouncer::AlertDebouncer;
pub use detector::{ErrorLogWindow, ErrorRateDetector};
pub use launcher::{DetachedLauncher, ServiceLauncher};
pub use report::StatusReporter;
pub use supervisor::Supervisor;
pub use sweeper::RetentionSweeper;
