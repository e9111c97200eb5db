//! Read receipt folding
//!
//! Receipts on hidden events are moved to the nearest preceding shown event,
//! and receipts that lose their event between passes fall back to where they
//! were drawn last time.

use std::collections::{BTreeMap, HashMap};

use super::collaborators::TimelineContext;
use super::types::{
    READ_RECEIPT_TYPE, ReadReceipt, RoomEvent, TimelineConfig, TimelineProps, UserReceipt,
};
use super::visibility::Visibility;
use crate::error::{Result, TimelineError};

/// Receipts to draw for one event: read receipts only, never our own, never
/// from ignored users.
pub(crate) fn receipts_for_event(
    event: &RoomEvent,
    props: &TimelineProps,
    ctx: &TimelineContext<'_>,
) -> Result<Vec<ReadReceipt>> {
    let Some(room) = ctx.room else {
        return Ok(Vec::new());
    };

    let raw = room
        .receipts_for_event(event)
        .map_err(TimelineError::collaborator("receipts_for_event"))?;

    let mut receipts = Vec::with_capacity(raw.len());
    for receipt in raw {
        let Some(user_id) = receipt.user_id.filter(|u| !u.is_empty()) else {
            continue;
        };
        if receipt.receipt_type != READ_RECEIPT_TYPE || user_id == props.our_user_id {
            continue;
        }
        let ignored = ctx
            .policy
            .is_user_ignored(&user_id)
            .map_err(TimelineError::collaborator("is_user_ignored"))?;
        if ignored {
            continue;
        }
        let room_member = room
            .member(&user_id)
            .map_err(TimelineError::collaborator("member"))?;
        receipts.push(ReadReceipt {
            user_id,
            room_member,
            ts: receipt.ts.unwrap_or(0),
        });
    }

    Ok(receipts)
}

/// Maps each shown event id to the receipts drawn next to it, and each user
/// id to where their receipt ended up.
pub(crate) fn receipts_by_shown_event(
    events: &[RoomEvent],
    visibility: &Visibility,
    props: &TimelineProps,
    ctx: &TimelineContext<'_>,
    previous: &BTreeMap<String, UserReceipt>,
    config: &TimelineConfig,
) -> Result<(
    HashMap<String, Vec<ReadReceipt>>,
    BTreeMap<String, UserReceipt>,
)> {
    let mut receipts_by_event: HashMap<String, Vec<ReadReceipt>> = HashMap::new();
    let mut receipts_by_user: BTreeMap<String, UserReceipt> = BTreeMap::new();

    let mut last_shown_event_id: Option<&str> = None;
    for (i, event) in events.iter().enumerate() {
        if visibility.is_shown(i) {
            last_shown_event_id = Some(event.event_id());
        }
        let Some(shown_id) = last_shown_event_id else {
            continue;
        };

        let new_receipts = receipts_for_event(event, props, ctx)?;
        if new_receipts.is_empty() {
            continue;
        }
        for receipt in &new_receipts {
            receipts_by_user.insert(
                receipt.user_id.clone(),
                UserReceipt {
                    last_shown_event_id: shown_id.to_string(),
                    receipt: receipt.clone(),
                },
            );
        }
        receipts_by_event
            .entry(shown_id.to_string())
            .or_default()
            .extend(new_receipts);
    }

    // A receipt can advance before the event it marks has been paginated in,
    // leaving no match this pass. Keep drawing it where it was last time.
    let mut recovered = 0usize;
    for (user_id, user_receipt) in previous {
        if receipts_by_user.contains_key(user_id) {
            continue;
        }
        receipts_by_event
            .entry(user_receipt.last_shown_event_id.clone())
            .or_default()
            .push(user_receipt.receipt.clone());
        receipts_by_user.insert(user_id.clone(), user_receipt.clone());
        recovered += 1;
    }

    if config.enable_debug_logging && recovered > 0 {
        tracing::debug!(
            "Recovered {} read receipts from the previous pass",
            recovered
        );
    }

    for receipts in receipts_by_event.values_mut() {
        receipts.sort_by(|a, b| b.ts.cmp(&a.ts));
    }

    Ok((receipts_by_event, receipts_by_user))
}
