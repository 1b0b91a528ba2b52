//! Alert debouncing
//!
//! Two gates between a detected burst and an outbound webhook message:
//! the per-second error count must reach the alert threshold, and the
//! service must not have been alerted on within the send interval.

use crate::registry::ServiceDescriptor;

#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    threshold: u32,
    send_interval_secs: i64,
}

impl AlertDebouncer {
    pub fn new(threshold: u32, send_interval_secs: i64) -> Self {
        Self {
            threshold,
            send_interval_secs,
        }
    }

    /// Whether an alert should go out now for a service whose last alert
    /// was at `last_alert_ts` (epoch seconds, 0 for never).
    pub fn should_alert(&self, last_alert_ts: i64, count: u32, now: i64) -> bool {
        if count < self.threshold {
            return false;
        }
        now - last_alert_ts >= self.send_interval_secs
    }

    /// Advance the service's alert window. Called after every send
    /// attempt, delivered or not, so a broken webhook cannot retry at
    /// tick frequency.
    pub fn record_sent(&self, svc: &mut ServiceDescriptor, now: i64) {
        svc.last_alert_ts = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> AlertDebouncer {
        AlertDebouncer::new(10, 60)
    }

    #[test]
    fn below_threshold_never_alerts() {
        let d = debouncer();
        assert!(!d.should_alert(0, 9, 1_000_000));
        // even a stale window does not open the gate
        assert!(!d.should_alert(-1_000_000, 9, 1_000_000));
    }

    #[test]
    fn threshold_is_inclusive() {
        let d = debouncer();
        assert!(d.should_alert(0, 10, 1_000_000));
    }

    #[test]
    fn recent_alert_suppresses_repeat() {
        let d = debouncer();
        let now = 1_000_000;
        assert!(!d.should_alert(now - 10, 50, now));
        assert!(!d.should_alert(now - 59, 50, now));
        assert!(d.should_alert(now - 60, 50, now));
        assert!(d.should_alert(now - 120, 50, now));
    }

    #[test]
    fn record_sent_resets_the_window() {
        let d = debouncer();
        let now = 1_000_000;
        let mut svc = ServiceDescriptor::default();
        svc.last_alert_ts = now - 120;

        assert!(d.should_alert(svc.last_alert_ts, 20, now));
        d.record_sent(&mut svc, now);
        assert_eq!(svc.last_alert_ts, now);
        assert!(!d.should_alert(svc.last_alert_ts, 20, now + 1));
        assert!(d.should_alert(svc.last_alert_ts, 20, now + 60));
    }
}
