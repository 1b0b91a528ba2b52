pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod registry;
pub mod supervisor;

pub use adapters::{
    CleanupRunner, DingTalkNotifier, ListenerTable, NotificationSink, PortProbe, ProcessProbe,
    ScriptCleaner, SystemProbe,
};
pub use config::AppConfig;
pub use error::{Result, SentinelError};
pub use identity::HostIdentity;
pub use registry::{ServerEntry, ServiceDescriptor, ServiceRegistry};
pub use supervisor::{
    AlertDebouncer, DetachedLauncher, ErrorLogWindow, ErrorRateDetector, RetentionSweeper,
    ServiceLauncher, StatusReporter, Supervisor,
};
