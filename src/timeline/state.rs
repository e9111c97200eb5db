//! State carried between build passes.
//!
//! The builder never keeps this itself: each pass borrows the previous
//! [`PanelState`] and returns the next one, and the host decides where it lives.

use super::types::{PanelState, ReadMarkerState};
use crate::error::Result;

impl ReadMarkerState {
    /// Whether a fade-out is playing at `event_id`.
    pub fn is_ghost_at(&self, event_id: &str) -> bool {
        self.current_ghost_event_id.as_deref() == Some(event_id)
    }

    /// Whether the marker was visible after `event_id` on the last pass.
    pub fn is_visible_at(&self, event_id: &str) -> bool {
        self.current_read_marker_event_id.as_deref() == Some(event_id)
    }
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the host when the fade-out animation at `event_id` has
    /// finished. A finish for an abandoned ghost is ignored.
    pub fn finish_ghost_animation(&mut self, event_id: &str) -> bool {
        if self.read_marker.is_ghost_at(event_id) {
            self.read_marker.current_ghost_event_id = None;
            true
        } else {
            tracing::debug!(
                "Ignoring finished ghost animation for {}, tracking {:?}",
                event_id,
                self.read_marker.current_ghost_event_id
            );
            false
        }
    }

    /// Serialize so the host can keep the state across restarts.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Forget everything, e.g. when the panel switches rooms.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
