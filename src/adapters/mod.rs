pub mod cleaner;
pub mod dingtalk;
pub mod ports;
pub mod process;

pub use cleaner::{CleanupRunner, ScriptCleaner};
pub use dingtalk::{DingTalkNotifier, NotificationSink};
pub use ports::{ListenerTable, PortProbe};
pub use process::{ProcessProbe, SystemProbe};
