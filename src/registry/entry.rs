//! Per-channel subscriber list
//!
//! Subscribers are kept in a `VecDeque` in subscription order. Queue-mode
//! delivery pops the front and pushes it to the back, which is O(1) no
//! matter how many subscribers the channel has.

use std::collections::VecDeque;

use super::handle::SubscriberHandle;

/// Entry for a single channel in the registry
#[derive(Debug)]
pub struct ChannelEntry {
    /// Subscribers in subscription order (rotated by queue deliveries)
    subscribers: VecDeque<SubscriberHandle>,
}

impl ChannelEntry {
    pub(super) fn new() -> Self {
        Self {
            subscribers: VecDeque::new(),
        }
    }

    /// Append a subscriber; duplicates are kept
    pub(super) fn push(&mut self, handle: SubscriberHandle) {
        self.subscribers.push_back(handle);
    }

    /// Remove the first subscriber with the given session ID
    ///
    /// Returns `false` if no such subscriber was present.
    pub(super) fn remove(&mut self, session_id: u64) -> bool {
        match self.subscribers.iter().position(|h| h.id() == session_id) {
            Some(index) => {
                self.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the subscriber list
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.subscribers.iter().cloned().collect()
    }

    /// Pick the next subscriber in round-robin order
    ///
    /// The front subscriber is returned and moved to the back, so `k`
    /// consecutive calls over `k` subscribers visit each exactly once in
    /// subscription order.
    pub(super) fn rotate_and_pick_one(&mut self) -> Option<SubscriberHandle> {
        let next = self.subscribers.pop_front()?;
        self.subscribers.push_back(next.clone());
        Some(next)
    }

    /// Get the number of subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub(super) fn contains(&self, session_id: u64) -> bool {
        self.subscribers.iter().any(|h| h.id() == session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::handle::{shared_writer, SharedWriter};

    fn writers(n: usize) -> Vec<SharedWriter> {
        (0..n)
            .map(|_| shared_writer(tokio::io::duplex(8).0))
            .collect()
    }

    fn ids(handles: &[SubscriberHandle]) -> Vec<u64> {
        handles.iter().map(|h| h.id()).collect()
    }

    #[test]
    fn test_push_keeps_order_and_duplicates() {
        let w = writers(2);
        let mut entry = ChannelEntry::new();
        entry.push(SubscriberHandle::new(1, &w[0]));
        entry.push(SubscriberHandle::new(2, &w[1]));
        entry.push(SubscriberHandle::new(1, &w[0]));

        assert_eq!(ids(&entry.snapshot()), vec![1, 2, 1]);
    }

    #[test]
    fn test_remove_first_match_only() {
        let w = writers(2);
        let mut entry = ChannelEntry::new();
        entry.push(SubscriberHandle::new(1, &w[0]));
        entry.push(SubscriberHandle::new(2, &w[1]));
        entry.push(SubscriberHandle::new(1, &w[0]));

        assert!(entry.remove(1));
        assert_eq!(ids(&entry.snapshot()), vec![2, 1]);
        assert!(!entry.remove(9));
        assert_eq!(entry.len(), 2);
    }

    #[test]
    fn test_rotation_is_round_robin() {
        let w = writers(3);
        let mut entry = ChannelEntry::new();
        for (i, writer) in w.iter().enumerate() {
            entry.push(SubscriberHandle::new(i as u64 + 1, writer));
        }

        let picked: Vec<u64> = (0..7)
            .map(|_| entry.rotate_and_pick_one().unwrap().id())
            .collect();
        assert_eq!(picked, vec![1, 2, 3, 1, 2, 3, 1]);
        assert_eq!(entry.len(), 3);
    }

    #[test]
    fn test_rotation_on_empty_entry() {
        let mut entry = ChannelEntry::new();
        assert!(entry.rotate_and_pick_one().is_none());
        assert!(entry.is_empty());
    }
}
