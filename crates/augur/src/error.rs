//! Unified error type for the Augur server.

use augur_protocol::{ErrorKind, Failure, ProtocolError};
use augur_room::RoomError;
use augur_session::SessionError;
use augur_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AugurError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A presence error (unknown session, wrong connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, wrong phase, not the judge).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AugurError {
    /// The negative-ack payload a client receives for this error.
    pub fn failure(&self) -> Failure {
        match self {
            Self::Room(err) => err.failure(),
            Self::Session(err) => err.failure(),
            Self::Protocol(err) => Failure::from(err),
            Self::Transport(_) | Self::Config(_) => {
                Failure::new(ErrorKind::Conflict, "internal", self.to_string())
            }
        }
    }
}
