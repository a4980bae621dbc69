//! The room record and its participants.
//!
//! Fields are crate-private: the roster functions and the round engine are
//! the only code that mutates a [`Room`]. Everything outside the crate
//! reads through accessors or through the views in [`crate::view`].

use augur_protocol::{ConnectionId, ParticipantId, Phase, RoomId, Stroke};
use tokio::time::Instant;

use crate::Pact;

/// A seat in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    /// Current socket; replaced on reconnect, never sent to clients.
    pub connection: ConnectionId,
    pub display_name: String,
    pub avatar: Option<String>,
    /// Cumulative over the game.
    pub score: u32,
    /// Earned in the current round.
    pub round_score: u32,
}

impl Participant {
    /// A fresh participant with zero score.
    pub fn new(id: ParticipantId, connection: ConnectionId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            connection,
            display_name: display_name.into(),
            avatar: None,
            score: 0,
            round_score: 0,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// One game room.
#[derive(Debug, Clone)]
pub struct Room {
    pub(crate) id: RoomId,
    pub(crate) pact: Pact,
    /// Join order, unique by participant id.
    pub(crate) roster: Vec<Participant>,
    pub(crate) phase: Phase,
    pub(crate) phase_started_at: Instant,
    pub(crate) phase_deadline: Option<Instant>,
    pub(crate) judge_id: Option<ParticipantId>,
    /// Non-empty only while selecting.
    pub(crate) candidates: Vec<String>,
    pub(crate) secret: Option<String>,
    pub(crate) hint: Option<String>,
    pub(crate) strokes: Vec<Stroke>,
    /// Solve order; never contains the judge.
    pub(crate) solved_by: Vec<ParticipantId>,
    /// 0 in the lobby, 1-based during a game.
    pub(crate) round: u32,
}

impl Room {
    /// An empty room in the lobby.
    pub fn new(id: RoomId, pact: Pact, now: Instant) -> Self {
        Self {
            id,
            pact,
            roster: Vec::new(),
            phase: Phase::Lobby,
            phase_started_at: now,
            phase_deadline: None,
            judge_id: None,
            candidates: Vec::new(),
            secret: None,
            hint: None,
            strokes: Vec::new(),
            solved_by: Vec::new(),
            round: 0,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn pact(&self) -> &Pact {
        &self.pact
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_started_at(&self) -> Instant {
        self.phase_started_at
    }

    pub fn phase_deadline(&self) -> Option<Instant> {
        self.phase_deadline
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn occupancy(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.roster.iter().find(|p| &p.id == id)
    }

    pub(crate) fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.roster.iter_mut().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    pub fn judge_id(&self) -> Option<&ParticipantId> {
        self.judge_id.as_ref()
    }

    pub fn is_judge(&self, id: &ParticipantId) -> bool {
        self.judge_id.as_ref() == Some(id)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn solved_by(&self) -> &[ParticipantId] {
        &self.solved_by
    }

    pub fn has_solved(&self, id: &ParticipantId) -> bool {
        self.solved_by.contains(id)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// `true` when every participant other than the judge has solved.
    ///
    /// Vacuously true when nobody but the judge is left.
    pub fn all_guessers_solved(&self) -> bool {
        self.roster
            .iter()
            .filter(|p| !self.is_judge(&p.id))
            .all(|p| self.has_solved(&p.id))
    }
}
