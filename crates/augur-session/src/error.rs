//! Error types for the session layer.

use augur_protocol::{ConnectionId, ErrorKind, Failure, ParticipantId, RoomId};

/// Errors that can occur during presence tracking.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the participant.
    #[error("no session for participant {0}")]
    NotFound(ParticipantId),

    /// The request came from a connection that does not speak for this
    /// participant (another tab took over, or it never joined).
    #[error("connection {connection} is not bound to participant {participant_id}")]
    NotBound {
        participant_id: ParticipantId,
        connection: ConnectionId,
    },

    /// The participant is already seated in a different room.
    #[error("participant {0} is already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomId),

    /// The connection already speaks for a different participant.
    #[error("connection {0} is already bound to participant {1}")]
    ConnectionBusy(ConnectionId, ParticipantId),

    /// The connection has not joined a room yet.
    #[error("connection {0} has not joined a room")]
    Unbound(ConnectionId),
}

impl SessionError {
    /// Coarse class reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotBound { .. }
            | Self::AlreadyInRoom(..)
            | Self::ConnectionBusy(..)
            | Self::Unbound(_) => ErrorKind::Conflict,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "session_not_found",
            Self::NotBound { .. } => "not_bound",
            Self::AlreadyInRoom(..) => "already_in_room",
            Self::ConnectionBusy(..) => "connection_busy",
            Self::Unbound(_) => "not_joined",
        }
    }

    /// The negative-ack payload for this error.
    pub fn failure(&self) -> Failure {
        Failure::new(self.kind(), self.code(), self.to_string())
    }
}
