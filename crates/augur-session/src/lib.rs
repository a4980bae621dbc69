//! Participant presence for Augur.
//!
//! Rooms know participants by their stable [`ParticipantId`]; sockets come
//! and go. This crate keeps the mapping between the two:
//!
//! 1. **Binding**: which connection currently speaks for which participant,
//!    and in which room ([`SessionManager::bind`]).
//! 2. **Authorization**: a request naming a participant is only honoured
//!    from the connection bound to it ([`SessionManager::authorize`]).
//! 3. **Grace**: a dropped connection leaves its participant in the room
//!    for [`SessionConfig::reconnect_grace`]; rejoining with the same id in
//!    that window is a reconnect, otherwise the participant expires.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server handler (above)  ← binds on join, authorizes every room request
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← ParticipantId, RoomId, ConnectionId
//! ```
//!
//! [`ParticipantId`]: augur_protocol::ParticipantId

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionState};
