//! Frames exchanged over the socket.
//!
//! Clients send [`Request`]s: a sequence number plus one [`ClientEvent`].
//! The server answers every request with exactly one [`Envelope::Ack`]
//! carrying the same `seq`, and pushes [`ServerEvent`]s whenever a room
//! changes.

use serde::{Deserialize, Serialize};

use crate::{
    Failure, GuessOutcome, ParticipantId, PhaseUpdate, Reveal, RoomId, RoomSummary, RoomView,
    RosterEntry, Stroke,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// One client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Chosen by the client; echoed back in the ack.
    pub seq: u64,
    pub body: ClientEvent,
}

/// The events a client may send.
///
/// Adjacently tagged: `{"event": "round.sealWord", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join a specific room, or let the server pick one with space.
    ///
    /// Supplying a known `participant_id` is a reconnect.
    #[serde(rename = "room.join")]
    Join {
        display_name: String,
        #[serde(default)]
        avatar: Option<String>,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        participant_id: Option<ParticipantId>,
    },

    #[serde(rename = "room.leave")]
    Leave {
        room_id: RoomId,
        participant_id: ParticipantId,
    },

    #[serde(rename = "room.list")]
    ListRooms,

    #[serde(rename = "round.start")]
    Start { room_id: RoomId },

    /// The judge fixes the secret word.
    #[serde(rename = "round.sealWord")]
    SealWord {
        room_id: RoomId,
        participant_id: ParticipantId,
        word: String,
    },

    #[serde(rename = "draw.stroke")]
    Stroke {
        room_id: RoomId,
        participant_id: ParticipantId,
        strokes: Vec<Stroke>,
    },

    #[serde(rename = "draw.clear")]
    Clear {
        room_id: RoomId,
        participant_id: ParticipantId,
    },

    /// A chat line, read as a guess while drawing.
    #[serde(rename = "guess.submit")]
    Guess {
        room_id: RoomId,
        participant_id: ParticipantId,
        text: String,
    },

    /// Keep-alive; answered with [`AckData::Pong`].
    #[serde(rename = "sys.heartbeat")]
    Heartbeat { client_time: u64 },
}

impl ClientEvent {
    /// The wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "room.join",
            Self::Leave { .. } => "room.leave",
            Self::ListRooms => "room.list",
            Self::Start { .. } => "round.start",
            Self::SealWord { .. } => "round.sealWord",
            Self::Stroke { .. } => "draw.stroke",
            Self::Clear { .. } => "draw.clear",
            Self::Guess { .. } => "guess.submit",
            Self::Heartbeat { .. } => "sys.heartbeat",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything a room pushes to its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Roster after a join, reconnect, or leave.
    #[serde(rename = "room.sync")]
    Sync {
        room_id: RoomId,
        roster: Vec<RosterEntry>,
    },

    /// The recipient's own picture of the room, sent on (re)join.
    #[serde(rename = "room.snapshot")]
    Snapshot(RoomView),

    /// A system line for the room chat.
    #[serde(rename = "room.notice")]
    Notice { room_id: RoomId, text: String },

    #[serde(rename = "round.phase")]
    Phase(PhaseUpdate),

    /// Sent to the judge only.
    #[serde(rename = "round.candidates")]
    Candidates { room_id: RoomId, words: Vec<String> },

    #[serde(rename = "round.reveal")]
    Reveal(Reveal),

    /// Sent to everyone but the judge.
    #[serde(rename = "draw.stroke")]
    Stroke {
        room_id: RoomId,
        strokes: Vec<Stroke>,
    },

    #[serde(rename = "draw.clear")]
    Clear { room_id: RoomId },

    #[serde(rename = "guess.solved")]
    Solved {
        room_id: RoomId,
        participant_id: ParticipantId,
        display_name: String,
        points: u32,
    },

    /// Says who is close, never what they typed.
    #[serde(rename = "guess.close")]
    Close {
        room_id: RoomId,
        participant_id: ParticipantId,
        display_name: String,
    },

    /// An ordinary chat line.
    #[serde(rename = "guess.miss")]
    Miss {
        room_id: RoomId,
        participant_id: ParticipantId,
        display_name: String,
        text: String,
    },
}

impl ServerEvent {
    /// The wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "room.sync",
            Self::Snapshot(_) => "room.snapshot",
            Self::Notice { .. } => "room.notice",
            Self::Phase(_) => "round.phase",
            Self::Candidates { .. } => "round.candidates",
            Self::Reveal(_) => "round.reveal",
            Self::Stroke { .. } => "draw.stroke",
            Self::Clear { .. } => "draw.clear",
            Self::Solved { .. } => "guess.solved",
            Self::Close { .. } => "guess.close",
            Self::Miss { .. } => "guess.miss",
        }
    }
}

/// Reply payloads for requests that return data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AckData {
    /// `room.join` succeeded.
    Joined {
        room_id: RoomId,
        participant: RosterEntry,
        reconnected: bool,
    },
    /// `guess.submit` was interpreted.
    Verdict { outcome: GuessOutcome, points: u32 },
    /// `room.list`.
    Rooms { rooms: Vec<RoomSummary> },
    /// `sys.heartbeat`; both times in Unix milliseconds.
    Pong { client_time: u64, server_time: u64 },
}

/// The reply to one [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub seq: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AckData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Ack {
    /// A positive ack with no payload.
    pub fn ok(seq: u64) -> Self {
        Self {
            seq,
            ok: true,
            data: None,
            error: None,
        }
    }

    /// A positive ack with a payload.
    pub fn with_data(seq: u64, data: AckData) -> Self {
        Self {
            data: Some(data),
            ..Self::ok(seq)
        }
    }

    /// A negative ack.
    pub fn fail(seq: u64, failure: Failure) -> Self {
        Self {
            seq,
            ok: false,
            data: None,
            error: Some(failure),
        }
    }
}

/// A server → client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    Ack(Ack),
    Push(ServerEvent),
}

impl From<ServerEvent> for Envelope {
    fn from(event: ServerEvent) -> Self {
        Self::Push(event)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The client SDK parses these exact JSON shapes, so the tests pin
    //! them down rather than just round-tripping.

    use super::*;
    use crate::{ErrorKind, Phase};

    fn rid() -> RoomId {
        RoomId::new("chamber-1")
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    // =====================================================================
    // Requests
    // =====================================================================

    #[test]
    fn test_request_join_decodes_with_optional_fields_missing() {
        let json = r#"{"seq": 1, "body": {"event": "room.join", "data": {"display_name": "Ada"}}}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.seq, 1);
        match req.body {
            ClientEvent::Join {
                display_name,
                avatar,
                room_id,
                participant_id,
            } => {
                assert_eq!(display_name, "Ada");
                assert!(avatar.is_none());
                assert!(room_id.is_none());
                assert!(participant_id.is_none());
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_request_seal_word_uses_camel_event_name() {
        let req = Request {
            seq: 4,
            body: ClientEvent::SealWord {
                room_id: rid(),
                participant_id: pid("a"),
                word: "apple".into(),
            },
        };
        let json: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["body"]["event"], "round.sealWord");
        assert_eq!(json["body"]["data"]["word"], "apple");
        assert_eq!(req.body.name(), "round.sealWord");
    }

    #[test]
    fn test_request_list_rooms_needs_no_data() {
        let req: Request = serde_json::from_str(r#"{"seq": 2, "body": {"event": "room.list"}}"#).unwrap();
        assert_eq!(req.body, ClientEvent::ListRooms);
    }

    #[test]
    fn test_request_unknown_event_is_rejected() {
        let json = r#"{"seq": 1, "body": {"event": "round.skip", "data": {}}}"#;
        let result: Result<Request, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    // =====================================================================
    // Server events
    // =====================================================================

    #[test]
    fn test_push_envelope_json_shape() {
        let env = Envelope::from(ServerEvent::Phase(PhaseUpdate {
            room_id: rid(),
            phase: Phase::Drawing,
            round: 2,
            round_limit: 5,
            judge_id: Some(pid("a")),
            hint: Some("_____".into()),
            deadline_ms: Some(1_000),
            remaining_ms: Some(80_000),
        }));
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "push");
        assert_eq!(json["event"], "round.phase");
        assert_eq!(json["data"]["phase"], "DRAWING");
        assert_eq!(json["data"]["hint"], "_____");

        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn test_close_event_carries_no_text() {
        let event = ServerEvent::Close {
            room_id: rid(),
            participant_id: pid("b"),
            display_name: "Bo".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "guess.close");
        assert!(json["data"].get("text").is_none());
    }

    // =====================================================================
    // Acks
    // =====================================================================

    #[test]
    fn test_ack_ok_omits_data_and_error() {
        let json: serde_json::Value = serde_json::to_value(Envelope::Ack(Ack::ok(3))).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["ok"], true);
        assert!(json.get("data").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_ack_verdict_json_shape() {
        let ack = Ack::with_data(
            7,
            AckData::Verdict {
                outcome: GuessOutcome::Solved,
                points: 500,
            },
        );
        let json: serde_json::Value = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["data"]["kind"], "verdict");
        assert_eq!(json["data"]["outcome"], "solved");
        assert_eq!(json["data"]["points"], 500);
    }

    #[test]
    fn test_ack_fail_decodes_back() {
        let ack = Ack::fail(5, Failure::new(ErrorKind::Conflict, "room_full", "room is full"));
        let bytes = serde_json::to_vec(&Envelope::Ack(ack.clone())).unwrap();
        let back: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, Envelope::Ack(ack));
    }
}
