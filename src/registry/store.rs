//! Subscriber registry implementation
//!
//! One registry is created per server and shared by every session through an
//! `Arc`. All operations take a single short-lived lock and never hold it
//! across an `.await`, which keeps rotate-and-pick atomic with respect to
//! other senders on the same channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::channel::ChannelName;
use super::entry::ChannelEntry;
use super::handle::SubscriberHandle;

/// Central registry mapping channel names to their subscribers
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    channels: Mutex<HashMap<ChannelName, ChannelEntry>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<ChannelName, ChannelEntry>> {
        // Critical sections never panic midway, so a poisoned map is still consistent
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a subscriber to a channel, creating the channel on first use
    pub fn subscribe(&self, channel: &ChannelName, handle: SubscriberHandle) {
        let mut channels = self.channels();
        let entry = channels
            .entry(channel.clone())
            .or_insert_with(ChannelEntry::new);
        entry.push(handle);

        tracing::info!(
            channel = %channel,
            subscribers = entry.len(),
            "Subscriber added"
        );
    }

    /// Remove the first subscriber with the given session ID from a channel
    ///
    /// Empty channel entries are left in place.
    pub fn unsubscribe(&self, channel: &ChannelName, session_id: u64) -> bool {
        let mut channels = self.channels();

        let removed = channels
            .get_mut(channel)
            .map(|entry| entry.remove(session_id))
            .unwrap_or(false);

        if removed {
            tracing::debug!(
                channel = %channel,
                session_id = session_id,
                subscribers = channels.get(channel).map_or(0, ChannelEntry::len),
                "Subscriber removed"
            );
        } else {
            tracing::warn!(
                channel = %channel,
                session_id = session_id,
                "Unsubscribe for unknown subscriber"
            );
        }

        removed
    }

    /// Point-in-time copy of a channel's subscribers, for broadcast delivery
    pub fn snapshot(&self, channel: &ChannelName) -> Vec<SubscriberHandle> {
        self.channels()
            .get(channel)
            .map(ChannelEntry::snapshot)
            .unwrap_or_default()
    }

    /// Advance a channel's round-robin pointer and return the chosen subscriber
    pub fn rotate_and_pick_one(&self, channel: &ChannelName) -> Option<SubscriberHandle> {
        self.channels()
            .get_mut(channel)
            .and_then(ChannelEntry::rotate_and_pick_one)
    }

    /// Resolve the recipients of a payload sent to `channel`
    ///
    /// Queue channels yield at most one subscriber; all others yield every
    /// current subscriber.
    pub fn recipients(&self, channel: &ChannelName) -> Vec<SubscriberHandle> {
        if channel.is_queue() {
            self.rotate_and_pick_one(channel).into_iter().collect()
        } else {
            self.snapshot(channel)
        }
    }

    /// Get the number of subscribers on a channel
    pub fn subscriber_count(&self, channel: &ChannelName) -> usize {
        self.channels().get(channel).map_or(0, ChannelEntry::len)
    }

    /// Get total number of channel entries, including empty ones
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Whether a session currently appears on a channel
    pub fn is_subscribed(&self, channel: &ChannelName, session_id: u64) -> bool {
        self.channels()
            .get(channel)
            .is_some_and(|entry| entry.contains(session_id))
    }
}

/// A registered subscription, released when dropped
///
/// Holding the guard is what "subscribed" means for a session: it is created
/// once at subscribe time and removes the handle exactly once, on whatever
/// path the session leaves by, including task abort and panic.
#[derive(Debug)]
pub struct Subscription {
    registry: Arc<SubscriberRegistry>,
    channel: ChannelName,
    session_id: u64,
}

impl Subscription {
    /// Add `handle` to `channel` and return the guard that removes it
    pub fn register(
        registry: Arc<SubscriberRegistry>,
        channel: ChannelName,
        handle: SubscriberHandle,
    ) -> Self {
        let session_id = handle.id();
        registry.subscribe(&channel, handle);

        Self {
            registry,
            channel,
            session_id,
        }
    }

    /// Channel this subscription was registered on
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.channel, self.session_id);
    }
}
