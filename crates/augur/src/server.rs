//! `AugurServer` builder and server loop.
//!
//! This is the entry point for running an Augur server. It ties together
//! all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use augur_protocol::{Codec, ConnectionId, JsonCodec, ParticipantId, RoomId};
use augur_room::{Hub, Pact, RoomError, RosterStore, WordBank};
use augur_session::{SessionConfig, SessionManager};
use augur_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{AugurError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The session
/// lock is never held across a room call.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) store: RosterStore,
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) hub: Arc<Hub>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

impl<C: Codec> ServerState<C> {
    /// Marks the participant behind `connection` as gone. With no grace
    /// period they leave their room right away; otherwise the reaper
    /// removes them once the grace runs out.
    pub(crate) async fn release(&self, connection: ConnectionId) {
        let (participant_id, room_id, immediate) = {
            let mut sessions = self.sessions.lock().await;
            let Some((participant_id, room_id)) = sessions.disconnect(connection) else {
                return;
            };
            let immediate = sessions.grace().is_zero();
            if immediate {
                sessions.unbind(&participant_id);
            }
            (participant_id, room_id, immediate)
        };
        self.hub.unlink(&participant_id, connection);
        if immediate {
            self.evict(&participant_id, &room_id).await;
        }
    }

    /// Sweeps expired sessions out of their rooms.
    pub(crate) async fn reap(&self) -> usize {
        let expired = self.sessions.lock().await.expire_stale();
        for (participant_id, room_id) in &expired {
            self.evict(participant_id, room_id).await;
        }
        expired.len()
    }

    async fn evict(&self, participant_id: &ParticipantId, room_id: &RoomId) {
        match self.store.deregister(room_id, participant_id).await {
            Ok(_) => {}
            // The room dissolved or the participant already left.
            Err(RoomError::RoomNotFound(_) | RoomError::ParticipantNotFound(..)) => {}
            Err(e) => {
                tracing::warn!(%participant_id, %room_id, error = %e, "eviction failed");
            }
        }
    }
}

/// Builder for configuring and starting an Augur server.
///
/// # Example
///
/// ```rust,no_run
/// use augur::prelude::*;
///
/// # async fn start() -> Result<(), AugurError> {
/// let server = AugurServer::builder()
///     .bind("0.0.0.0:8080")
///     .pact(Pact { min_to_start: 3, ..Pact::default() })
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct AugurServerBuilder {
    bind_addr: String,
    pact: Pact,
    session_config: SessionConfig,
    words: WordBank,
    idle_timeout: Duration,
    reaper_interval: Duration,
}

impl AugurServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// A builder primed from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind.clone(),
            pact: config.pact.clone(),
            session_config: config.session_config(),
            words: config.word_bank(),
            idle_timeout: config.idle_timeout(),
            reaper_interval: config.reaper_interval(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration of every room.
    pub fn pact(mut self, pact: Pact) -> Self {
        self.pact = pact;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the word bank judges pick from.
    pub fn words(mut self, words: WordBank) -> Self {
        self.words = words;
        self
    }

    /// Closes connections that stay silent this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// How often disconnected participants past their grace are removed.
    pub fn reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<AugurServer<JsonCodec>, AugurError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let hub = Arc::new(Hub::new());
        let state = Arc::new(ServerState {
            store: RosterStore::new(self.pact, self.words, hub.clone()),
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            hub,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(AugurServer {
            transport,
            state,
            reaper_interval: self.reaper_interval,
        })
    }
}

impl Default for AugurServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Augur server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct AugurServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    reaper_interval: Duration,
}

impl AugurServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> AugurServerBuilder {
        AugurServerBuilder::new()
    }
}

impl<C: Codec> AugurServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, AugurError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), AugurError> {
        tracing::info!("Augur server running");
        self.spawn_reaper();

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    fn spawn_reaper(&self) {
        let state = Arc::clone(&self.state);
        let period = self.reaper_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let reaped = state.reap().await;
                if reaped > 0 {
                    tracing::debug!(reaped, "expired sessions removed");
                }
            }
        });
    }
}
