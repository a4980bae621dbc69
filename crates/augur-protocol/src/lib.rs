//! Wire protocol for Augur.
//!
//! This crate defines the vocabulary that clients and the server speak:
//!
//! - **Types** ([`RoomId`], [`ParticipantId`], [`Phase`], [`Stroke`], the
//!   per-audience view payloads): data that appears inside events.
//! - **Events** ([`Request`], [`ClientEvent`], [`ServerEvent`],
//!   [`Envelope`], [`Ack`]): the frames that travel on the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`], plus the client-facing [`Failure`]).
//!
//! # Frame shapes
//!
//! ```text
//! client → server   {"seq": 3, "body": {"event": "guess.submit", "data": {...}}}
//! server → client   {"type": "ack", "seq": 3, "ok": true, "data": {...}}
//!                   {"type": "push", "event": "round.phase", "data": {...}}
//! ```
//!
//! The protocol layer knows nothing about rooms or timers; it only knows
//! how the messages look.

mod codec;
mod error;
mod events;
mod types;

pub use augur_transport::ConnectionId;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ErrorKind, Failure, ProtocolError};
pub use events::{Ack, AckData, ClientEvent, Envelope, Request, ServerEvent};
pub use types::{
    GuessOutcome, ParticipantId, Phase, PhaseUpdate, Point, Recipient, Reveal, RoomId,
    RoomSummary, RoomView, RosterEntry, ScoreLine, Stroke, Tool,
};
