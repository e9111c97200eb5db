//! Timeline Tile Module
//!
//! Turns a room's ordered event list into the tiles a timeline panel draws:
//! message tiles with continuation styling, date separators, collapsed
//! membership summaries, the read marker and its fade-out ghost, and the read
//! receipts that decorate each shown event.

mod collaborators;
mod date_utils;
mod event_nodes;
mod processor;
mod receipt_handler;
mod state;
mod types;
mod visibility;


pub use collaborators::{EventPolicy, RoomReceipts, TimelineContext};
pub use date_utils::wants_date_separator;
pub use event_nodes::{EventNodeRegistry, ReadMarkerPosition, Rect, read_marker_position};
pub use types::{
    CONTINUATION_MAX_INTERVAL_MS, DateSeparatorTile, EventRecord, MembershipSummaryTile,
    MessageTile, PanelState, READ_RECEIPT_TYPE, RawReceipt, ReadMarkerState, ReadReceipt,
    RoomEvent, RoomMember, SendStatus, Tile, TileBuildOutput, TimelineConfig, TimelineProps,
    UserReceipt,
};

use crate::error::Result;

/// Builds timeline tiles. Holds only configuration; the state that must
/// survive between passes is passed in and handed back explicitly.
pub struct TimelineTileBuilder {
    config: TimelineConfig,
}

impl TimelineTileBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::with_config(TimelineConfig::default())
    }

    /// Create a new builder with custom configuration
    pub fn with_config(config: TimelineConfig) -> Self {
        Self { config }
    }

    /// Build the tiles for one render pass.
    ///
    /// # Arguments
    /// * `events` - The room's events in timeline order, treated as a snapshot
    /// * `props` - Presentation flags for this pass
    /// * `ctx` - Room and policy collaborators
    /// * `state` - The state returned by the previous pass (or the default)
    ///
    /// # Errors
    ///
    /// Any collaborator failure aborts the pass; a partial tile list is never
    /// returned.
    pub fn build_tiles(
        &self,
        events: &[RoomEvent],
        props: &TimelineProps,
        ctx: &TimelineContext<'_>,
        state: &PanelState,
    ) -> Result<TileBuildOutput> {
        if self.config.enable_debug_logging {
            tracing::debug!(
                "Building tiles for {} events (user: {}, read marker: {:?})",
                events.len(),
                props.our_user_id,
                props.read_marker_event_id
            );
        }

        processor::build_tiles(events, props, ctx, state, &self.config).inspect_err(|e| {
            tracing::warn!("Failed to build timeline tiles: {}", e);
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }
}

impl Default for TimelineTileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
