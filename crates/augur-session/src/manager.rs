//! The session manager: who is connected as whom, and where.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain struct over `HashMap`s. The server wraps it
//! in a mutex and never holds that lock across a room call.

use std::collections::HashMap;
use std::time::Duration;

use augur_protocol::{ConnectionId, ParticipantId, RoomId};
use tokio::time::Instant;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Tracks every participant that is connected, or recently was.
///
/// ## Lifecycle
///
/// ```text
/// bind() ──→ [Connected] ──disconnect()──→ [Disconnected] ──expire_stale()──→ gone
///                 ↑                               │
///                 └──────────── bind() ───────────┘
///
/// unbind() removes a session in any state (explicit leave).
/// ```
pub struct SessionManager {
    sessions: HashMap<ParticipantId, Session>,
    /// Reverse index kept in sync with `sessions` for connected entries.
    connections: HashMap<ConnectionId, ParticipantId>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            connections: HashMap::new(),
            config,
        }
    }

    /// The configured reconnect grace.
    pub fn grace(&self) -> Duration {
        self.config.reconnect_grace
    }

    /// Checks whether [`bind`](Self::bind) would succeed, without changing
    /// anything.
    ///
    /// # Errors
    /// - [`SessionError::ConnectionBusy`]: `connection` already speaks for
    ///   someone else.
    /// - [`SessionError::AlreadyInRoom`]: the participant is seated in a
    ///   different room.
    pub fn check_bind(
        &self,
        participant_id: &ParticipantId,
        room_id: &RoomId,
        connection: ConnectionId,
    ) -> Result<(), SessionError> {
        if let Some(owner) = self.connections.get(&connection) {
            if owner != participant_id {
                return Err(SessionError::ConnectionBusy(connection, owner.clone()));
            }
        }
        if let Some(existing) = self.sessions.get(participant_id) {
            if &existing.room_id != room_id {
                return Err(SessionError::AlreadyInRoom(
                    participant_id.clone(),
                    existing.room_id.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Binds `connection` to the participant in `room_id`.
    ///
    /// Returns `true` when the participant already had a session in this
    /// room (a reconnect or a second tab taking over). The previous
    /// connection, if any, loses its authority.
    ///
    /// # Errors
    /// Same as [`check_bind`](Self::check_bind).
    pub fn bind(
        &mut self,
        participant_id: ParticipantId,
        room_id: RoomId,
        connection: ConnectionId,
    ) -> Result<bool, SessionError> {
        self.check_bind(&participant_id, &room_id, connection)?;

        let previous = self.sessions.insert(
            participant_id.clone(),
            Session {
                participant_id: participant_id.clone(),
                room_id: room_id.clone(),
                state: SessionState::Connected { connection },
            },
        );
        if let Some(old) = previous.as_ref().and_then(Session::connection) {
            if old != connection {
                self.connections.remove(&old);
            }
        }
        self.connections.insert(connection, participant_id.clone());

        let reconnected = previous.is_some();
        tracing::info!(%participant_id, %room_id, %connection, reconnected, "session bound");
        Ok(reconnected)
    }

    /// Resolves the room a request may act on, checking that `connection`
    /// speaks for `participant_id`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`]: no session for the participant.
    /// - [`SessionError::NotBound`]: the session belongs to another
    ///   connection, or is disconnected.
    pub fn authorize(
        &self,
        participant_id: &ParticipantId,
        connection: ConnectionId,
    ) -> Result<RoomId, SessionError> {
        let session = self
            .sessions
            .get(participant_id)
            .ok_or_else(|| SessionError::NotFound(participant_id.clone()))?;
        match session.state {
            SessionState::Connected { connection: bound } if bound == connection => {
                Ok(session.room_id.clone())
            }
            _ => Err(SessionError::NotBound {
                participant_id: participant_id.clone(),
                connection,
            }),
        }
    }

    /// The participant a connection currently speaks for.
    pub fn participant_of(&self, connection: ConnectionId) -> Option<&ParticipantId> {
        self.connections.get(&connection)
    }

    /// Removes a participant's session (explicit leave).
    pub fn unbind(&mut self, participant_id: &ParticipantId) -> Option<Session> {
        let session = self.sessions.remove(participant_id)?;
        if let Some(connection) = session.connection() {
            self.connections.remove(&connection);
        }
        tracing::debug!(%participant_id, room_id = %session.room_id, "session unbound");
        Some(session)
    }

    /// Marks the participant bound to `connection` as disconnected and
    /// starts their grace period.
    ///
    /// Returns the affected participant and room, or `None` if the
    /// connection spoke for nobody (never joined, or already superseded).
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<(ParticipantId, RoomId)> {
        let participant_id = self.connections.remove(&connection)?;
        let session = self.sessions.get_mut(&participant_id)?;
        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        tracing::info!(
            %participant_id,
            room_id = %session.room_id,
            grace_ms = self.config.reconnect_grace.as_millis() as u64,
            "participant disconnected"
        );
        Some((participant_id, session.room_id.clone()))
    }

    /// Removes every disconnected session whose grace has elapsed and
    /// returns them so the caller can take the participants out of their
    /// rooms.
    pub fn expire_stale(&mut self) -> Vec<(ParticipantId, RoomId)> {
        let grace = self.config.reconnect_grace;
        let mut expired = Vec::new();

        self.sessions.retain(|participant_id, session| match session.state {
            SessionState::Disconnected { since } if since.elapsed() >= grace => {
                tracing::info!(%participant_id, room_id = %session.room_id, "session expired");
                expired.push((participant_id.clone(), session.room_id.clone()));
                false
            }
            _ => true,
        });

        expired
    }

    /// Looks up a session.
    pub fn get(&self, participant_id: &ParticipantId) -> Option<&Session> {
        self.sessions.get(participant_id)
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming follows `test_{function}_{scenario}_{expected}`.
    //!
    //! Grace-dependent tests either use a zero grace (expires at once), an
    //! hour (never expires during the test), or a paused Tokio clock.

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn manager_with_instant_expiry() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace: Duration::ZERO,
        })
    }

    fn manager_with_long_grace() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace: Duration::from_secs(3600),
        })
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn rid(id: &str) -> RoomId {
        RoomId::new(id)
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    // =====================================================================
    // bind()
    // =====================================================================

    #[test]
    fn test_bind_new_participant_is_not_reconnect() {
        let mut mgr = manager_with_long_grace();
        let reconnected = mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        assert!(!reconnected);
        assert_eq!(mgr.participant_of(conn(1)), Some(&pid("a")));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_bind_after_disconnect_is_reconnect_on_new_connection() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.disconnect(conn(1));

        let reconnected = mgr.bind(pid("a"), rid("r1"), conn(2)).unwrap();
        assert!(reconnected);
        assert_eq!(mgr.authorize(&pid("a"), conn(2)).unwrap(), rid("r1"));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_bind_second_tab_takes_over_authority() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.bind(pid("a"), rid("r1"), conn(2)).unwrap();

        assert!(matches!(
            mgr.authorize(&pid("a"), conn(1)),
            Err(SessionError::NotBound { .. })
        ));
        assert!(mgr.participant_of(conn(1)).is_none());
        // The old socket closing later must not disconnect the new one.
        assert!(mgr.disconnect(conn(1)).is_none());
        assert!(mgr.authorize(&pid("a"), conn(2)).is_ok());
    }

    #[test]
    fn test_bind_other_room_returns_already_in_room() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();

        let result = mgr.bind(pid("a"), rid("r2"), conn(1));
        assert!(matches!(result, Err(SessionError::AlreadyInRoom(p, r)) if p == pid("a") && r == rid("r1")));
    }

    #[test]
    fn test_bind_busy_connection_returns_connection_busy() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();

        let result = mgr.check_bind(&pid("b"), &rid("r1"), conn(1));
        assert!(matches!(result, Err(SessionError::ConnectionBusy(c, p)) if c == conn(1) && p == pid("a")));
    }

    // =====================================================================
    // authorize()
    // =====================================================================

    #[test]
    fn test_authorize_unknown_participant_returns_not_found() {
        let mgr = manager_with_long_grace();
        assert!(matches!(
            mgr.authorize(&pid("ghost"), conn(1)),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_authorize_disconnected_participant_returns_not_bound() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.disconnect(conn(1));
        assert!(matches!(
            mgr.authorize(&pid("a"), conn(1)),
            Err(SessionError::NotBound { .. })
        ));
    }

    // =====================================================================
    // unbind()
    // =====================================================================

    #[test]
    fn test_unbind_frees_connection_for_another_participant() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        let session = mgr.unbind(&pid("a")).unwrap();
        assert_eq!(session.room_id, rid("r1"));
        assert!(mgr.is_empty());
        assert!(mgr.bind(pid("b"), rid("r2"), conn(1)).is_ok());
    }

    // =====================================================================
    // disconnect() / expire_stale()
    // =====================================================================

    #[test]
    fn test_disconnect_unknown_connection_returns_none() {
        let mut mgr = manager_with_long_grace();
        assert!(mgr.disconnect(conn(9)).is_none());
    }

    #[test]
    fn test_expire_stale_zero_grace_expires_immediately() {
        let mut mgr = manager_with_instant_expiry();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.bind(pid("b"), rid("r1"), conn(2)).unwrap();
        assert_eq!(mgr.disconnect(conn(1)), Some((pid("a"), rid("r1"))));

        let expired = mgr.expire_stale();
        assert_eq!(expired, vec![(pid("a"), rid("r1"))]);
        assert!(mgr.get(&pid("a")).is_none());
        assert!(mgr.get(&pid("b")).is_some(), "connected sessions never expire");
    }

    #[test]
    fn test_expire_stale_long_grace_keeps_session() {
        let mut mgr = manager_with_long_grace();
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.disconnect(conn(1));
        assert!(mgr.expire_stale().is_empty());
        assert!(matches!(
            mgr.get(&pid("a")).unwrap().state,
            SessionState::Disconnected { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_after_grace_elapses() {
        let mut mgr = SessionManager::new(SessionConfig {
            reconnect_grace: Duration::from_secs(10),
        });
        mgr.bind(pid("a"), rid("r1"), conn(1)).unwrap();
        mgr.disconnect(conn(1));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(mgr.expire_stale().is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(mgr.expire_stale(), vec![(pid("a"), rid("r1"))]);
    }
}
