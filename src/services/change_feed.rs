//! Real-time change notification.
//!
//! A channel is a (table, row filter, event mask, callback) registration.
//! The feed invokes the callback once per matching mutation; the payload is
//! informational only.

use std::sync::Arc;

use crate::services::listeners::{ListenerHandle, ListenerRegistry};
use crate::types::change::{ChangeEvent, ChangeFilter, EventMask};
use crate::types::errors::RemoteError;

/// Handle returned by [`ChangeFeed::subscribe`].
pub type ChannelHandle = ListenerHandle;

/// Invoked once per matching remote mutation.
pub type ChangeCallback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Trait defining the change-notification channel contract.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(
        &self,
        table: &str,
        filter: ChangeFilter,
        mask: EventMask,
        callback: ChangeCallback,
    ) -> Result<ChannelHandle, RemoteError>;

    /// Closes a channel. Unknown handles are ignored.
    fn unsubscribe(&self, handle: ChannelHandle);
}

#[derive(Clone)]
struct Channel {
    table: String,
    filter: ChangeFilter,
    mask: EventMask,
    callback: ChangeCallback,
}

impl Channel {
    fn wants(&self, event: &ChangeEvent) -> bool {
        self.table == event.table && self.mask.matches(event.kind) && self.filter.matches(event)
    }
}

/// In-process change feed fed by [`SqliteDataStore`](crate::services::data_store::SqliteDataStore).
#[derive(Default)]
pub struct LocalChangeFeed {
    channels: ListenerRegistry<Channel>,
}

impl LocalChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every matching channel. Returns how many received it.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        for channel in self.channels.snapshot() {
            if channel.wants(event) {
                (channel.callback)(event.clone());
                delivered += 1;
            }
        }
        tracing::trace!(table = %event.table, kind = ?event.kind, delivered, "change published");
        delivered
    }

    /// Number of open channels.
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }
}

impl ChangeFeed for LocalChangeFeed {
    fn subscribe(
        &self,
        table: &str,
        filter: ChangeFilter,
        mask: EventMask,
        callback: ChangeCallback,
    ) -> Result<ChannelHandle, RemoteError> {
        let handle = self.channels.register(Channel {
            table: table.to_string(),
            filter,
            mask,
            callback,
        });
        tracing::debug!(table, handle = handle.id(), "channel opened");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: ChannelHandle) {
        if self.channels.remove(handle) {
            tracing::debug!(handle = handle.id(), "channel closed");
        }
    }
}
