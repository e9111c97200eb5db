//! Interfaces to the chat SDK and the host's display policy.
//!
//! The builder only queries these; it never mutates room state. Every call is
//! expected to answer from a snapshot taken before the pass starts.

use super::types::{RawReceipt, RoomEvent, RoomMember};
use crate::error::BoxError;

/// Per-room receipt and membership lookups.
pub trait RoomReceipts {
    fn receipts_for_event(&self, event: &RoomEvent) -> Result<Vec<RawReceipt>, BoxError>;

    fn member(&self, user_id: &str) -> Result<Option<RoomMember>, BoxError>;
}

/// Decides which events have a visible representation.
pub trait EventPolicy {
    fn is_user_ignored(&self, user_id: &str) -> Result<bool, BoxError>;

    /// Whether the host has a tile that can render this event at all
    fn has_renderable_tile(&self, event: &RoomEvent) -> Result<bool, BoxError>;

    /// Host-specific hiding, e.g. redacted events the user chose not to see
    fn should_hide(&self, event: &RoomEvent) -> Result<bool, BoxError>;
}

/// The collaborators one pass runs against.
#[derive(Clone, Copy)]
pub struct TimelineContext<'a> {
    /// `None` for panels that are not tied to a room, e.g. notifications
    pub room: Option<&'a dyn RoomReceipts>,
    pub policy: &'a dyn EventPolicy,
}

impl<'a> TimelineContext<'a> {
    pub fn new(policy: &'a dyn EventPolicy) -> Self {
        Self { room: None, policy }
    }

    pub fn with_room(mut self, room: &'a dyn RoomReceipts) -> Self {
        self.room = Some(room);
        self
    }
}

#[cfg(test)]
pub(crate) use mocks::{MockPolicy, MockRoom};
