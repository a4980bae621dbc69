//! Rooms and rounds for Augur.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, its round state, and its phase timer.
//!
//! # Key types
//!
//! - [`RosterStore`]: creates, finds, and disposes rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the state a room actor owns
//! - [`engine`]: the round state machine, as pure functions over a [`Room`]
//! - [`guess::interpret`]: classifies a chat line against the secret
//! - [`Gateway`] / [`Hub`]: event fan-out to participants
//! - [`Pact`]: per-room settings (quorum, capacity, timings, scoring)

mod config;
pub mod engine;
mod error;
pub mod gateway;
pub mod guess;
mod model;
mod room;
pub mod roster;
pub mod score;
mod store;
pub mod view;
pub mod words;

pub use config::{MAX_GUESS_CHARS, MAX_STROKES_PER_BATCH, MAX_WORD_CHARS, Pact, Scoring};
pub use engine::{Transition, Verdict};
pub use error::RoomError;
pub use gateway::{Gateway, Hub, Outbox};
pub use model::{Participant, Room};
pub use room::{GuessReceipt, RoomHandle, RoomInfo};
pub use roster::{Departure, Registration};
pub use store::RosterStore;
pub use words::{Category, Circle, WordBank};
