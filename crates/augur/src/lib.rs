//! # Augur
//!
//! Realtime server for a draw-and-guess party game.
//!
//! Participants join rooms over WebSocket. Each round one of them (the
//! judge) picks a secret word and draws it while the others type guesses;
//! quicker correct guesses earn more points. The server owns every rule:
//! clients only send intentions and render what is pushed back.
//!
//! ## Layers
//!
//! - [`augur_transport`]: WebSocket accept/send/recv
//! - [`augur_protocol`]: wire events, acks, the JSON codec
//! - [`augur_session`]: which connection speaks for which participant
//! - [`augur_room`]: room actors, the round engine, event fan-out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use augur::prelude::*;
//!
//! # async fn start() -> Result<(), AugurError> {
//! let server = AugurServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{BIND_ENV, CONFIG_ENV, ConfigError, ServerConfig};
pub use error::AugurError;
pub use server::{AugurServer, AugurServerBuilder};

pub mod prelude {
    pub use crate::{AugurError, AugurServer, AugurServerBuilder, ServerConfig};
    pub use augur_protocol::{
        Ack, AckData, ClientEvent, Envelope, GuessOutcome, ParticipantId, Phase, Request, RoomId,
        ServerEvent,
    };
    pub use augur_room::{Circle, Pact, Scoring, WordBank};
    pub use augur_session::SessionConfig;
}
