use chrono::{DateTime, FixedOffset, Local, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TimelineError};

/// Messages from the same sender closer together than this are drawn as one run.
pub const CONTINUATION_MAX_INTERVAL_MS: i64 = 5 * 60 * 1000;

/// The only receipt type that decorates the timeline.
pub const READ_RECEIPT_TYPE: &str = "m.read";

pub const ROOM_MESSAGE_EVENT_TYPE: &str = "m.room.message";
pub const STICKER_EVENT_TYPE: &str = "m.sticker";
pub const ROOM_MEMBER_EVENT_TYPE: &str = "m.room.member";
pub const THIRD_PARTY_INVITE_EVENT_TYPE: &str = "m.room.third_party_invite";

/// Send progress of an event that the server has not confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    NotSent,
    Encrypting,
    Sending,
    Queued,
    Sent,
    Cancelled,
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendStatus::NotSent => write!(f, "not_sent"),
            SendStatus::Encrypting => write!(f, "encrypting"),
            SendStatus::Sending => write!(f, "sending"),
            SendStatus::Queued => write!(f, "queued"),
            SendStatus::Sent => write!(f, "sent"),
            SendStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for SendStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_sent" => Ok(SendStatus::NotSent),
            "encrypting" => Ok(SendStatus::Encrypting),
            "sending" => Ok(SendStatus::Sending),
            "queued" => Ok(SendStatus::Queued),
            "sent" => Ok(SendStatus::Sent),
            "cancelled" => Ok(SendStatus::Cancelled),
            _ => Err(format!("Invalid send status: {}", s)),
        }
    }
}

/// The fields of a room event the timeline needs, as handed over by the chat SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier of the event
    pub event_id: String,

    /// Event type, e.g. `m.room.message`
    pub event_type: String,

    /// User id of the sender; some state events carry none
    pub sender: Option<String>,

    /// When the event was sent. Provisional for local echoes.
    pub timestamp: DateTime<Utc>,

    /// Whether the event has been redacted
    #[serde(default)]
    pub redacted: bool,

    /// Id of the event that edits this one, if any
    #[serde(default)]
    pub replacing_event_id: Option<String>,

    /// Type-specific content
    #[serde(default)]
    pub content: serde_json::Value,
}

impl EventRecord {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            sender: None,
            timestamp,
            redacted: false,
            replacing_event_id: None,
            content: serde_json::Value::Null,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }
}

/// A room event as the timeline sees it: either confirmed by the server, or a
/// local echo that still carries its send status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomEvent {
    Confirmed(EventRecord),
    Pending(EventRecord, SendStatus),
}

impl RoomEvent {
    pub fn record(&self) -> &EventRecord {
        match self {
            RoomEvent::Confirmed(record) | RoomEvent::Pending(record, _) => record,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.record().event_id
    }

    pub fn event_type(&self) -> &str {
        &self.record().event_type
    }

    pub fn sender(&self) -> Option<&str> {
        self.record().sender.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record().timestamp
    }

    pub fn is_redacted(&self) -> bool {
        self.record().redacted
    }

    pub fn is_local_echo(&self) -> bool {
        matches!(self, RoomEvent::Pending(..))
    }

    pub fn send_status(&self) -> Option<SendStatus> {
        match self {
            RoomEvent::Confirmed(_) => None,
            RoomEvent::Pending(_, status) => Some(*status),
        }
    }

    /// The timestamp used for date separators. Local echoes carry a
    /// provisional timestamp that may even be yesterday, so they count as `now`.
    pub fn effective_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RoomEvent::Confirmed(record) => record.timestamp,
            RoomEvent::Pending(..) => now,
        }
    }
}

/// Membership data for a receipt's user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A receipt as reported by the room, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReceipt {
    pub user_id: Option<String>,
    pub receipt_type: String,
    pub ts: Option<i64>,
}

/// A read receipt to draw next to a shown event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: String,
    pub room_member: Option<RoomMember>,
    /// Milliseconds since the Unix epoch
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSeparatorTile {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTile {
    pub event: RoomEvent,

    /// Drawn without the sender chrome because it continues the previous tile
    pub continuation: bool,

    /// This is the last shown event of the timeline
    pub is_last: bool,

    pub is_highlighted: bool,

    /// This event is currently being edited
    pub is_editing: bool,

    pub is_redacted: bool,

    /// Token the scroll container can jump to. Local echoes have none since
    /// their ids change once the server confirms them.
    pub scroll_token: Option<String>,

    /// Receipts to draw on this tile, most recent first
    pub read_receipts: Vec<ReadReceipt>,
}

impl MessageTile {
    pub fn event_id(&self) -> &str {
        self.event.event_id()
    }
}

/// A run of membership changes collapsed into one summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipSummaryTile {
    /// Stable across forward pagination so the host can keep its widget
    pub key: String,

    pub events: Vec<RoomEvent>,

    /// Tiles for the expanded form of the summary
    pub tiles: Vec<MessageTile>,

    pub start_expanded: bool,
}

impl MembershipSummaryTile {
    pub fn event_ids(&self) -> Vec<&str> {
        self.events.iter().map(RoomEvent::event_id).collect()
    }
}

/// One renderable unit of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tile {
    DateSeparator(DateSeparatorTile),
    Message(MessageTile),
    MembershipSummary(MembershipSummaryTile),
    ReadMarker { visible: bool },
    ReadMarkerGhost { keyed_to: String },
}

impl Tile {
    pub fn as_message(&self) -> Option<&MessageTile> {
        match self {
            Tile::Message(tile) => Some(tile),
            _ => None,
        }
    }

    pub fn is_read_marker(&self) -> bool {
        matches!(self, Tile::ReadMarker { .. })
    }
}

/// Configuration for the tile builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Largest gap between two messages that still counts as a continuation
    pub continuation_max_interval_ms: i64,

    /// Types that may continue each other even though they differ
    pub continued_types: Vec<String>,

    /// Types that are collapsed into membership summaries
    pub membership_types: Vec<String>,

    /// Show every event that is not from an ignored user
    pub show_hidden_events: bool,

    /// Offset of the local timezone, used to find calendar day boundaries
    pub utc_offset_seconds: i32,

    /// Whether to enable detailed logging of each pass
    pub enable_debug_logging: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            continuation_max_interval_ms: CONTINUATION_MAX_INTERVAL_MS,
            continued_types: vec![
                STICKER_EVENT_TYPE.to_string(),
                ROOM_MESSAGE_EVENT_TYPE.to_string(),
            ],
            membership_types: vec![
                ROOM_MEMBER_EVENT_TYPE.to_string(),
                THIRD_PARTY_INVITE_EVENT_TYPE.to_string(),
            ],
            show_hidden_events: false,
            utc_offset_seconds: Local::now().offset().fix().local_minus_utc(),
            enable_debug_logging: false,
        }
    }
}

impl TimelineConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TimelineError::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.continuation_max_interval_ms < 0 {
            return Err(TimelineError::Configuration(format!(
                "continuation_max_interval_ms must not be negative, got {}",
                self.continuation_max_interval_ms
            )));
        }
        if FixedOffset::east_opt(self.utc_offset_seconds).is_none() {
            return Err(TimelineError::Configuration(format!(
                "utc_offset_seconds out of range: {}",
                self.utc_offset_seconds
            )));
        }
        Ok(())
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    pub fn continuation_window(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.continuation_max_interval_ms)
    }

    pub fn is_membership_change(&self, event: &RoomEvent) -> bool {
        self.membership_types
            .iter()
            .any(|t| t == event.event_type())
    }

    pub fn is_continued_type(&self, event_type: &str) -> bool {
        self.continued_types.iter().any(|t| t == event_type)
    }
}

/// Presentation flags for one build pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineProps {
    /// Our own user id; our receipts are never drawn
    pub our_user_id: String,

    pub highlighted_event_id: Option<String>,

    pub editing_event_id: Option<String>,

    /// Event after which the read marker goes
    pub read_marker_event_id: Option<String>,

    pub read_marker_visible: bool,

    /// Suppress the date at the start of the timeline, e.g. when more
    /// history can still be paginated in
    pub suppress_first_date_separator: bool,

    pub show_read_receipts: bool,

    /// Host clock, the effective date of local echoes
    pub now: DateTime<Utc>,
}

impl TimelineProps {
    pub fn new(our_user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            our_user_id: our_user_id.into(),
            highlighted_event_id: None,
            editing_event_id: None,
            read_marker_event_id: None,
            read_marker_visible: false,
            suppress_first_date_separator: false,
            show_read_receipts: false,
            now,
        }
    }
}

/// Where the read marker was drawn on the previous pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadMarkerState {
    /// Event after which the marker was visible; `None` if it was hidden or
    /// suppressed at the end of the timeline
    pub current_read_marker_event_id: Option<String>,

    /// Event where the fade-out of a moved marker is playing
    pub current_ghost_event_id: Option<String>,
}

/// The shown event a user's receipt was last drawn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReceipt {
    pub last_shown_event_id: String,
    pub receipt: ReadReceipt,
}

/// State carried from one build pass to the next. The host owns it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PanelState {
    pub read_marker: ReadMarkerState,

    /// Keyed by user id
    pub receipts_by_user: BTreeMap<String, UserReceipt>,
}

/// Result of one build pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBuildOutput {
    pub tiles: Vec<Tile>,

    /// Receipts to draw, keyed by shown event id, most recent first
    pub receipts_by_event: HashMap<String, Vec<ReadReceipt>>,

    /// State to hand to the next pass
    pub state: PanelState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn send_status_parses_and_displays() {
        assert_eq!(SendStatus::from_str("not_sent"), Ok(SendStatus::NotSent));
        assert_eq!(SendStatus::from_str("QUEUED"), Ok(SendStatus::Queued));
        assert!(SendStatus::from_str("delivered").is_err());
        assert_eq!(SendStatus::Encrypting.to_string(), "encrypting");
    }

    #[test]
    fn pending_event_dates_as_now() {
        let sent = Utc.timestamp_millis_opt(1_000).unwrap();
        let now = Utc.timestamp_millis_opt(90_000_000).unwrap();
        let record = EventRecord::new("$1", ROOM_MESSAGE_EVENT_TYPE, sent);

        let confirmed = RoomEvent::Confirmed(record.clone());
        let pending = RoomEvent::Pending(record, SendStatus::Sending);

        assert_eq!(confirmed.effective_timestamp(now), sent);
        assert_eq!(pending.effective_timestamp(now), now);
        assert!(pending.is_local_echo());
        assert_eq!(pending.send_status(), Some(SendStatus::Sending));
        assert_eq!(confirmed.send_status(), None);
    }

    #[test]
    fn config_defaults() {
        let config = TimelineConfig::default();
        assert_eq!(config.continuation_max_interval_ms, 300_000);
        assert!(config.is_continued_type("m.sticker"));
        assert!(config.is_continued_type("m.room.message"));
        assert!(!config.is_continued_type("m.room.member"));
        assert!(!config.show_hidden_events);
        assert!(!config.enable_debug_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config =
            TimelineConfig::from_json(r#"{"utc_offset_seconds": 3600, "show_hidden_events": true}"#)
                .unwrap();
        assert_eq!(config.utc_offset().local_minus_utc(), 3600);
        assert!(config.show_hidden_events);
        assert_eq!(config.continuation_max_interval_ms, 300_000);
    }

    #[test]
    fn config_from_json_rejects_bad_values() {
        let err = TimelineConfig::from_json(r#"{"utc_offset_seconds": 999999}"#).unwrap_err();
        assert!(matches!(err, TimelineError::Configuration(_)));

        let err = TimelineConfig::from_json(r#"{"continuation_max_interval_ms": -1}"#).unwrap_err();
        assert!(matches!(err, TimelineError::Configuration(_)));

        let err = TimelineConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, TimelineError::Configuration(_)));
    }

    #[test]
    fn membership_types() {
        let config = TimelineConfig::default();
        let ts = Utc.timestamp_millis_opt(0).unwrap();
        let join = RoomEvent::Confirmed(EventRecord::new("$j", ROOM_MEMBER_EVENT_TYPE, ts));
        let invite =
            RoomEvent::Confirmed(EventRecord::new("$i", THIRD_PARTY_INVITE_EVENT_TYPE, ts));
        let message = RoomEvent::Confirmed(EventRecord::new("$m", ROOM_MESSAGE_EVENT_TYPE, ts));
        assert!(config.is_membership_change(&join));
        assert!(config.is_membership_change(&invite));
        assert!(!config.is_membership_change(&message));
    }

    #[test]
    fn tile_serializes_with_kind_tag() {
        let json = serde_json::to_value(Tile::ReadMarker { visible: true }).unwrap();
        assert_eq!(json["kind"], "read_marker");
        assert_eq!(json["visible"], true);
    }
}
