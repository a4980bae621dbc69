//! Session types: the server's record of one participant's presence.

use std::time::Duration;

use augur_protocol::{ConnectionId, ParticipantId, RoomId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for presence tracking.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a participant whose connection dropped stays in their room.
    ///
    /// Zero (the default) makes a disconnect an immediate leave.
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether a participant currently has a live connection.
///
/// ```text
///   Connected ──(socket closed)──→ Disconnected ──(grace elapsed)──→ removed
///       ↑                               │
///       └────────(join again)───────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Requests from `connection` act for this participant.
    Connected { connection: ConnectionId },

    /// The connection closed at `since`.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One participant's presence in one room.
#[derive(Debug, Clone)]
pub struct Session {
    pub participant_id: ParticipantId,
    pub room_id: RoomId,
    pub state: SessionState,
}

impl Session {
    /// The bound connection, if the participant is connected.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self.state {
            SessionState::Connected { connection } => Some(connection),
            SessionState::Disconnected { .. } => None,
        }
    }
}
