//! Which events get a tile, computed once per pass.
//!
//! Every consumer (anchors, receipt folding, grouping, the main pass) reads
//! the same precomputed answers so the filter cannot drift between them.

use super::collaborators::TimelineContext;
use super::types::{RoomEvent, TimelineConfig, TimelineProps};
use crate::error::{Result, TimelineError};

pub(crate) fn should_show_event(
    event: &RoomEvent,
    props: &TimelineProps,
    ctx: &TimelineContext<'_>,
    config: &TimelineConfig,
) -> Result<bool> {
    // ignored = no show (only happens if the ignore happens after an event was received)
    if let Some(sender) = event.sender() {
        let ignored = ctx
            .policy
            .is_user_ignored(sender)
            .map_err(TimelineError::collaborator("is_user_ignored"))?;
        if ignored {
            return Ok(false);
        }
    }

    if config.show_hidden_events {
        return Ok(true);
    }

    let highlighted = props.highlighted_event_id.as_deref() == Some(event.event_id());

    let has_tile = ctx
        .policy
        .has_renderable_tile(event)
        .map_err(TimelineError::collaborator("has_renderable_tile"))?;
    if !has_tile && !highlighted {
        return Ok(false);
    }

    if highlighted {
        return Ok(true);
    }

    let hidden = ctx
        .policy
        .should_hide(event)
        .map_err(TimelineError::collaborator("should_hide"))?;
    Ok(!hidden)
}

/// Per-event visibility plus the anchors derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Visibility {
    shown: Vec<bool>,
    last_shown_index: Option<usize>,
    last_shown_non_local_echo_index: Option<usize>,
}

impl Visibility {
    pub fn compute(
        events: &[RoomEvent],
        props: &TimelineProps,
        ctx: &TimelineContext<'_>,
        config: &TimelineConfig,
    ) -> Result<Self> {
        let shown = events
            .iter()
            .map(|event| should_show_event(event, props, ctx, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_flags(events, shown))
    }

    pub fn from_flags(events: &[RoomEvent], shown: Vec<bool>) -> Self {
        let mut last_shown_index = None;
        let mut last_shown_non_local_echo_index = None;

        for (i, event) in events.iter().enumerate().rev() {
            if !shown[i] {
                continue;
            }
            if last_shown_index.is_none() {
                last_shown_index = Some(i);
            }
            match event {
                RoomEvent::Pending(..) => continue,
                RoomEvent::Confirmed(_) => {
                    last_shown_non_local_echo_index = Some(i);
                    break;
                }
            }
        }

        Self {
            shown,
            last_shown_index,
            last_shown_non_local_echo_index,
        }
    }

    pub fn is_shown(&self, index: usize) -> bool {
        self.shown.get(index).copied().unwrap_or(false)
    }

    pub fn is_last_shown(&self, index: usize) -> bool {
        self.last_shown_index == Some(index)
    }

    pub fn last_shown_non_local_echo_index(&self) -> Option<usize> {
        self.last_shown_non_local_echo_index
    }

    /// A marker at or after the last confirmed shown event would sit at the
    /// end of the timeline, where local echoes cannot host it.
    pub fn read_marker_suppressed_at(&self, index: usize) -> bool {
        match self.last_shown_non_local_echo_index {
            Some(anchor) => index >= anchor,
            None => true,
        }
    }
}
