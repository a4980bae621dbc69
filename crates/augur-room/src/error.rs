//! Error types for the room layer.

use augur_protocol::{ErrorKind, Failure, ParticipantId, Phase, RoomId};

/// Errors that can occur during room and round operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist, was disposed, or dissolved.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The participant is not on the room's roster.
    #[error("participant {0} not in room {1}")]
    ParticipantNotFound(ParticipantId, RoomId),

    /// No seat left for a new participant.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The operation is only valid in another phase.
    #[error("expected phase {expected}, room is in {actual}")]
    PhaseMismatch { expected: Phase, actual: Phase },

    /// Only the judge may do this.
    #[error("participant {0} is not the judge")]
    NotJudge(ParticipantId),

    /// Not enough participants to start.
    #[error("need {required} participants to start, have {present}")]
    QuorumNotMet { present: usize, required: usize },

    /// The request payload is unusable.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// A state the engine should never reach. Logged, never fatal.
    #[error("internal fault: {0}")]
    Internal(String),
}

impl RoomError {
    /// Coarse class reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::ParticipantNotFound(..) => ErrorKind::NotFound,
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::RoomFull(_)
            | Self::PhaseMismatch { .. }
            | Self::NotJudge(_)
            | Self::QuorumNotMet { .. }
            | Self::Internal(_) => ErrorKind::Conflict,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::ParticipantNotFound(..) => "participant_not_found",
            Self::RoomFull(_) => "room_full",
            Self::PhaseMismatch { .. } => "phase_mismatch",
            Self::NotJudge(_) => "not_judge",
            Self::QuorumNotMet { .. } => "quorum_not_met",
            Self::Invalid(_) => "invalid",
            Self::Internal(_) => "internal",
        }
    }

    /// The negative-ack payload for this error.
    pub fn failure(&self) -> Failure {
        Failure::new(self.kind(), self.code(), self.to_string())
    }
}
