use serde::{Deserialize, Serialize};

use super::bookmark::BookmarkId;
use super::session::UserId;

/// Kind of remote mutation reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One remote mutation on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub owner: UserId,
    pub record_id: BookmarkId,
}

/// Row filter for a channel: only events on rows owned by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub owner: UserId,
}

impl ChangeFilter {
    pub fn owner(owner: UserId) -> Self {
        Self { owner }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.owner == self.owner
    }
}

/// Which mutation kinds a channel wants to hear about. The controller
/// refetches on any mutation, so every channel asks for all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMask {
    #[default]
    All,
}

impl EventMask {
    pub fn matches(&self, _kind: ChangeKind) -> bool {
        match self {
            EventMask::All => true,
        }
    }
}
