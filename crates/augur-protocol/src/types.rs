//! Data types that appear inside Augur events.
//!
//! Everything here is serialized verbatim onto the wire, so these structs
//! are the whitelist: a field that is not declared here cannot leak to a
//! client. The room crate builds them field by field from its internal
//! state, picking the variant appropriate for each audience.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a room.
///
/// Serialized as a plain string (`#[serde(transparent)]`), so clients see
/// `"chamber-1a2b"` rather than `{"0": "chamber-1a2b"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a string as a room id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a participant.
///
/// Minted by whoever authenticates the user; the engine only compares it.
/// It survives reconnects, unlike a [`ConnectionId`](crate::ConnectionId).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps a string as a participant id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a server event emitted by a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every participant in the room.
    All,
    /// One participant.
    Participant(ParticipantId),
    /// Everyone in the room except one participant.
    AllExcept(ParticipantId),
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The round phase a room is in.
///
/// ```text
/// Lobby ──start──→ Selecting ──seal/timeout──→ Drawing ──all solved/timeout──→ Disclosure
///   ↑                  ↑                                                           │
///   │                  └──────────────── next round ──────────────────────────────┤
///   └──────────────── below quorum ───────────────────────────────────────────────┤
///                                                         round limit ──→ Dissolved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for enough participants and a start request.
    Lobby,
    /// The judge is choosing one of the candidate words.
    Selecting,
    /// The judge draws; everyone else guesses.
    Drawing,
    /// The secret and the scores are shown.
    Disclosure,
    /// Terminal: the game ended after its last round.
    Dissolved,
}

impl Phase {
    /// `true` once the room can never change phase again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Dissolved)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "LOBBY",
            Self::Selecting => "SELECTING",
            Self::Drawing => "DRAWING",
            Self::Disclosure => "DISCLOSURE",
            Self::Dissolved => "DISSOLVED",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Strokes
// ---------------------------------------------------------------------------

/// A point on the shared canvas, in client canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Whether a stroke paints or erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Draw,
    Erase,
}

/// One drawing segment. Relayed as-is; the server never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub start: Point,
    pub end: Point,
    pub tool: Tool,
    pub width: f32,
    pub color: String,
}

// ---------------------------------------------------------------------------
// Guess outcome
// ---------------------------------------------------------------------------

/// The four ways a guess can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessOutcome {
    /// Exact match after normalization.
    Solved,
    /// Not a match, but close enough to tell the guesser so.
    CloseHint,
    /// From the judge or someone who already solved; not relayed.
    Suppressed,
    /// Plain chat.
    Miss,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// One line of the public roster. Connection ids never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub avatar: Option<String>,
    pub score: u32,
    pub round_score: u32,
    pub is_judge: bool,
    pub has_solved: bool,
}

/// A participant's standing as shown on disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub score: u32,
    pub round_score: u32,
}

/// Payload of `round.phase`: what everyone may know about the new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUpdate {
    pub room_id: RoomId,
    pub phase: Phase,
    pub round: u32,
    pub round_limit: u32,
    pub judge_id: Option<ParticipantId>,
    /// Masked secret; present only while drawing or later.
    pub hint: Option<String>,
    /// Wall-clock deadline in Unix milliseconds.
    pub deadline_ms: Option<u64>,
    /// Time left when the event was built.
    pub remaining_ms: Option<u64>,
}

/// Payload of `round.reveal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub room_id: RoomId,
    pub round: u32,
    pub secret: String,
    /// Highest cumulative score first.
    pub scores: Vec<ScoreLine>,
}

/// A full room picture for one recipient, sent on (re)join.
///
/// `candidates` and `secret` are absent from the JSON unless the recipient
/// is entitled to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomView {
    pub room_id: RoomId,
    pub phase: Phase,
    pub round: u32,
    pub round_limit: u32,
    pub judge_id: Option<ParticipantId>,
    pub hint: Option<String>,
    pub deadline_ms: Option<u64>,
    pub remaining_ms: Option<u64>,
    pub roster: Vec<RosterEntry>,
    pub strokes: Vec<Stroke>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// A room as shown in the lobby browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub phase: Phase,
    pub occupancy: usize,
    pub max_occupancy: usize,
    pub round: u32,
    pub round_limit: u32,
}

// =========================================================================
// Tests
// =========================================================================
