//! Statistics for broker sessions

use std::time::Duration;

/// Session-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Destination/payload pairs routed by this session
    pub messages_routed: u64,
    /// Payload bytes routed (counted once per message, not per recipient)
    pub bytes_routed: u64,
    /// Successful per-recipient deliveries
    pub deliveries: u64,
    /// Per-recipient deliveries that failed
    pub failed_deliveries: u64,
    /// Messages that resolved to no recipient at all
    pub unrouted: u64,
    /// Connection duration
    pub duration: Duration,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fan-out round
    pub fn record_round(&mut self, payload_len: usize, delivered: usize, failed: usize) {
        self.messages_routed += 1;
        self.bytes_routed += payload_len as u64;
        self.deliveries += delivered as u64;
        self.failed_deliveries += failed as u64;
        if delivered + failed == 0 {
            self.unrouted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.messages_routed, 0);
        assert_eq!(stats.bytes_routed, 0);
        assert_eq!(stats.deliveries, 0);
        assert_eq!(stats.failed_deliveries, 0);
        assert_eq!(stats.unrouted, 0);
    }

    #[test]
    fn test_record_round() {
        let mut stats = SessionStats::new();
        stats.record_round(5, 2, 1);
        stats.record_round(3, 0, 0);

        assert_eq!(stats.messages_routed, 2);
        assert_eq!(stats.bytes_routed, 8);
        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.failed_deliveries, 1);
        assert_eq!(stats.unrouted, 1);
    }
}
