//! Host-side bookkeeping for drawn tiles: opaque handles per event id, and
//! where the read marker sits relative to the viewport.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque per-event handles (widgets, DOM nodes, list indices, ...) that the
/// host registers while drawing and looks up later to scroll or measure.
#[derive(Debug, Clone)]
pub struct EventNodeRegistry<H> {
    nodes: HashMap<String, H>,
}

impl<H> EventNodeRegistry<H> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Returns the handle previously registered for this event, if any.
    pub fn register(&mut self, event_id: impl Into<String>, handle: H) -> Option<H> {
        self.nodes.insert(event_id.into(), handle)
    }

    pub fn get(&self, event_id: &str) -> Option<&H> {
        self.nodes.get(event_id)
    }

    /// Drop every handle; call before drawing a fresh tile list.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<H> Default for EventNodeRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Vertical extent of a drawn element, in pixels from the top of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadMarkerPosition {
    Above,
    Within,
    Below,
}

/// The marker draws as zero height but is really this tall.
const READ_MARKER_HEIGHT: f64 = 2.0;

/// Where the read marker is relative to the scroll viewport, or `None` if
/// either is not on screen.
pub fn read_marker_position(
    marker: Option<Rect>,
    viewport: Option<Rect>,
) -> Option<ReadMarkerPosition> {
    let (marker, viewport) = (marker?, viewport?);

    if marker.bottom + READ_MARKER_HEIGHT < viewport.top {
        Some(ReadMarkerPosition::Above)
    } else if marker.top < viewport.bottom {
        Some(ReadMarkerPosition::Within)
    } else {
        Some(ReadMarkerPosition::Below)
    }
}
