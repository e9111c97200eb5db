//! Core tile building pass
//!
//! Walks the event list once, front to back, emitting date separators,
//! message tiles and membership summaries, and placing the read marker and
//! its fade-out ghost.

use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;

use super::collaborators::TimelineContext;
use super::date_utils;
use super::receipt_handler;
use super::types::{
    DateSeparatorTile, MembershipSummaryTile, MessageTile, PanelState, ReadMarkerState,
    ReadReceipt, RoomEvent, Tile, TileBuildOutput, TimelineConfig, TimelineProps,
};
use super::visibility::Visibility;
use crate::error::Result;

/// Build the tiles for one pass over `events`.
pub fn build_tiles(
    events: &[RoomEvent],
    props: &TimelineProps,
    ctx: &TimelineContext<'_>,
    state: &PanelState,
    config: &TimelineConfig,
) -> Result<TileBuildOutput> {
    let visibility = Visibility::compute(events, props, ctx, config)?;
    if config.enable_debug_logging {
        tracing::debug!(
            "Last confirmed shown event index: {:?}",
            visibility.last_shown_non_local_echo_index()
        );
    }

    let mut read_marker = state.read_marker.clone();

    // if the read marker has moved, cancel any active ghost
    if let (Some(current), Some(target)) = (
        read_marker.current_read_marker_event_id.as_deref(),
        props.read_marker_event_id.as_deref(),
    ) {
        if props.read_marker_visible && current != target {
            read_marker.current_ghost_event_id = None;
        }
    }

    let (receipts_by_event, receipts_by_user) = if props.show_read_receipts {
        receipt_handler::receipts_by_shown_event(
            events,
            &visibility,
            props,
            ctx,
            &state.receipts_by_user,
            config,
        )?
    } else {
        (HashMap::new(), state.receipts_by_user.clone())
    };

    // With no marker configured there is nothing to place or fade out
    let marker_configured = props.read_marker_event_id.is_some();

    let mut pass = TilePass {
        events,
        props,
        config,
        visibility: &visibility,
        receipts_by_event: &receipts_by_event,
        offset: config.utc_offset(),
        tiles: Vec::with_capacity(events.len() + 2),
        prev_event: None,
        read_marker_emitted: false,
        read_marker_visible: false,
        previous_marker: read_marker
            .current_read_marker_event_id
            .clone()
            .filter(|_| marker_configured),
        ghost: read_marker
            .current_ghost_event_id
            .clone()
            .filter(|_| marker_configured),
    };

    let mut i = 0;
    while i < events.len() {
        let event = &events[i];
        let shown = visibility.is_shown(i);

        // Wrap consecutive membership changes in a summary
        if shown && config.is_membership_change(event) {
            i = pass.push_membership_group(i) + 1;
            continue;
        }

        if shown {
            let (separator, tile) = pass.message_tile(pass.prev_event, event, i, true);
            if let Some(separator) = separator {
                pass.tiles.push(Tile::DateSeparator(separator));
            }
            pass.tiles.push(Tile::Message(tile));
            pass.prev_event = Some(event);
        }

        let visible_marker_here = pass.is_read_marker_target(event) && pass.push_read_marker(i);
        pass.handle_ghost(event.event_id(), visible_marker_here);

        i += 1;
    }

    // The marker's event is not loaded; keep a placeholder so position
    // queries still find a marker.
    if props.read_marker_event_id.is_some() && !pass.read_marker_emitted {
        pass.tiles.push(Tile::ReadMarker { visible: false });
    }

    let current_read_marker_event_id = if pass.read_marker_visible {
        props.read_marker_event_id.clone()
    } else {
        None
    };

    if config.enable_debug_logging {
        tracing::debug!(
            "Built {} tiles from {} events (marker: {:?}, ghost: {:?})",
            pass.tiles.len(),
            events.len(),
            current_read_marker_event_id,
            pass.ghost
        );
    }

    read_marker = ReadMarkerState {
        current_read_marker_event_id,
        current_ghost_event_id: pass.ghost,
    };

    Ok(TileBuildOutput {
        tiles: pass.tiles,
        receipts_by_event,
        state: PanelState {
            read_marker,
            receipts_by_user,
        },
    })
}

/// Whether `event` visually continues `prev`: same sender, same or mutually
/// continuable types, and close enough in time.
pub(crate) fn is_continuation(
    prev: &RoomEvent,
    event: &RoomEvent,
    config: &TimelineConfig,
) -> bool {
    let (Some(prev_sender), Some(sender)) = (prev.sender(), event.sender()) else {
        return false;
    };
    if prev_sender != sender {
        return false;
    }

    let types_continue = prev.event_type() == event.event_type()
        || (config.is_continued_type(prev.event_type())
            && config.is_continued_type(event.event_type()));

    types_continue && event.timestamp() - prev.timestamp() <= config.continuation_window()
}

struct TilePass<'a> {
    events: &'a [RoomEvent],
    props: &'a TimelineProps,
    config: &'a TimelineConfig,
    visibility: &'a Visibility,
    receipts_by_event: &'a HashMap<String, Vec<ReadReceipt>>,
    offset: FixedOffset,
    tiles: Vec<Tile>,
    /// The last event we showed
    prev_event: Option<&'a RoomEvent>,
    read_marker_emitted: bool,
    read_marker_visible: bool,
    /// Where the marker was visible on the previous pass
    previous_marker: Option<String>,
    ghost: Option<String>,
}

impl<'a> TilePass<'a> {
    fn is_read_marker_target(&self, event: &RoomEvent) -> bool {
        self.props.read_marker_event_id.as_deref() == Some(event.event_id())
    }

    fn is_highlighted(&self, event: &RoomEvent) -> bool {
        self.props.highlighted_event_id.as_deref() == Some(event.event_id())
    }

    fn wants_date_separator(&self, prev: Option<&RoomEvent>, next: DateTime<Utc>) -> bool {
        match prev {
            // first event in the panel: depends if we could back-paginate from here
            None => !self.props.suppress_first_date_separator,
            Some(prev) => date_utils::wants_date_separator(prev.timestamp(), next, &self.offset),
        }
    }

    fn message_tile(
        &self,
        prev: Option<&RoomEvent>,
        event: &RoomEvent,
        index: usize,
        allow_separator: bool,
    ) -> (Option<DateSeparatorTile>, MessageTile) {
        let mut continuation = prev.is_some_and(|p| is_continuation(p, event, self.config));

        let effective = event.effective_timestamp(self.props.now);
        let separator = if allow_separator && self.wants_date_separator(prev, effective) {
            continuation = false;
            Some(DateSeparatorTile {
                timestamp: effective,
            })
        } else {
            None
        };

        let event_id = event.event_id();
        let tile = MessageTile {
            event: event.clone(),
            continuation,
            is_last: self.visibility.is_last_shown(index),
            is_highlighted: self.is_highlighted(event),
            is_editing: self.props.editing_event_id.as_deref() == Some(event_id),
            is_redacted: event.is_redacted(),
            scroll_token: match event {
                RoomEvent::Confirmed(record) => Some(record.event_id.clone()),
                RoomEvent::Pending(..) => None,
            },
            read_receipts: self
                .receipts_by_event
                .get(event_id)
                .cloned()
                .unwrap_or_default(),
        };

        (separator, tile)
    }

    /// Collapse the run of membership changes starting at `start` into one
    /// summary tile. Returns the index of the last event consumed.
    fn push_membership_group(&mut self, start: usize) -> usize {
        let events = self.events;
        let first = &events[start];

        // Whilst back-paginating the group opens the panel and has no
        // predecessor; otherwise the first event id stays put under forward
        // pagination.
        let key = match self.prev_event {
            Some(_) => format!("membereventlistsummary-{}", first.event_id()),
            None => "membereventlistsummary-initial".to_string(),
        };

        let effective = first.effective_timestamp(self.props.now);
        if self.wants_date_separator(self.prev_event, effective) {
            self.tiles.push(Tile::DateSeparator(DateSeparatorTile {
                timestamp: effective,
            }));
        }

        let mut read_marker_index = self.is_read_marker_target(first).then_some(start);
        let mut members = vec![start];
        let mut end = start;

        while end + 1 < events.len() {
            let next = &events[end + 1];

            // Hidden events are swallowed wherever they are; a marker on one
            // of them goes after the summary.
            if !self.visibility.is_shown(end + 1) {
                if self.is_read_marker_target(next) {
                    read_marker_index = Some(end + 1);
                }
                end += 1;
                continue;
            }

            if !self.config.is_membership_change(next)
                || date_utils::wants_date_separator(
                    first.timestamp(),
                    next.timestamp(),
                    &self.offset,
                )
            {
                break;
            }

            if self.is_read_marker_target(next) {
                read_marker_index = Some(end + 1);
            }
            members.push(end + 1);
            end += 1;
        }

        // Render each member as continuing the one before it so the expanded
        // summary never shows date separators of its own.
        let mut start_expanded = false;
        let mut tiles = Vec::with_capacity(members.len());
        let mut prev_member = first;
        for &index in &members {
            let member = &events[index];
            if self.is_highlighted(member) {
                start_expanded = true;
            }
            let (_, tile) = self.message_tile(Some(prev_member), member, index, false);
            tiles.push(tile);
            prev_member = member;
        }

        if self.config.enable_debug_logging {
            tracing::debug!(
                "Grouped {} membership events ({} consumed) into {}",
                members.len(),
                end - start + 1,
                key
            );
        }

        self.tiles.push(Tile::MembershipSummary(MembershipSummaryTile {
            key,
            events: members.iter().map(|&i| events[i].clone()).collect(),
            tiles,
            start_expanded,
        }));

        let marker_visible = match read_marker_index {
            Some(index) => self.push_read_marker(index),
            None => false,
        };

        // Every consumed event is drawn at the summary, so a visible marker
        // there covers all of them.
        for event in &events[start..=end] {
            self.handle_ghost(event.event_id(), marker_visible);
        }

        self.prev_event = Some(first);
        end
    }

    /// Emit the marker for the target at `index`. Returns its visibility.
    fn push_read_marker(&mut self, index: usize) -> bool {
        let target = &self.events[index];

        // A marker at the end of the timeline (local echoes excluded, their
        // ids are not stable) is hidden, but still emitted so anything that
        // measures its position is not confused.
        let visible = self.props.read_marker_visible
            && !self.visibility.read_marker_suppressed_at(index)
            && !target.is_local_echo();

        self.tiles.push(Tile::ReadMarker { visible });
        self.read_marker_emitted = true;
        self.read_marker_visible = visible;
        visible
    }

    fn handle_ghost(&mut self, event_id: &str, visible_marker_here: bool) {
        if self.ghost.as_deref() == Some(event_id) {
            if visible_marker_here {
                // the marker came back before the fade-out finished
                self.ghost = None;
            } else {
                // if we're showing an animation, continue to show it
                self.tiles.push(Tile::ReadMarkerGhost {
                    keyed_to: event_id.to_string(),
                });
            }
        } else if !visible_marker_here && self.previous_marker.as_deref() == Some(event_id) {
            // the marker was here last pass but no more; fade it out
            self.tiles.push(Tile::ReadMarkerGhost {
                keyed_to: event_id.to_string(),
            });
            self.ghost = Some(event_id.to_string());
        }
    }
}
