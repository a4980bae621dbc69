//! Per-connection handler: framing, authorization, and event routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbox. The flow is:
//!   1. Receive a frame → decode a [`Request`]
//!   2. Check the connection speaks for the participant named in it
//!   3. Forward to the room actor → ack with the same `seq`
//!
//! Room pushes and acks share the outbox, so a client always sees the
//! events caused by a request before the request's ack.

use std::sync::Arc;

use augur_protocol::{
    Ack, AckData, ClientEvent, Codec, ConnectionId, Envelope, ParticipantId, Request, RoomId,
};
use augur_room::{Outbox, Participant, RoomError, RoomHandle, RoomInfo, view};
use augur_session::{SessionError, SessionManager};
use augur_transport::{Connection, WebSocketConnection};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::AugurError;
use crate::server::ServerState;

/// Registration retries when the allocated room fills up or dissolves
/// before the participant is seated.
const JOIN_ATTEMPTS: usize = 3;

/// Longest display name kept, in characters.
const MAX_NAME_CHARS: usize = 24;

/// Drop guard that releases the participant's presence when the handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the async release is a fire-and-forget task.
struct PresenceGuard<C: Codec> {
    connection: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for PresenceGuard<C> {
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.release(connection).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), AugurError> {
    let connection = conn.id();
    tracing::debug!(%connection, peer = ?conn.peer_addr(), "handling new connection");

    let conn = Arc::new(conn);
    let (outbox, inbox) = mpsc::unbounded_channel::<Envelope>();
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), Arc::clone(&state), inbox));

    let _guard = PresenceGuard {
        connection,
        state: Arc::clone(&state),
    };

    let result = read_frames(&conn, &state, &outbox).await;

    // Room links hold clones of the outbox, so the writer would not stop
    // on its own.
    writer.abort();
    // _guard drops here → presence release fires.
    result
}

async fn read_frames<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    outbox: &Outbox,
) -> Result<(), AugurError> {
    let connection = conn.id();
    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%connection, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%connection, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%connection, "connection timed out");
                return Ok(());
            }
        };

        let request: Request = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                reject_malformed(state, connection, outbox, &data, &e.into());
                continue;
            }
        };

        let seq = request.seq;
        let event = request.body.name();
        let ack = match dispatch(state, connection, outbox, request.body).await {
            Ok(Some(data)) => Ack::with_data(seq, data),
            Ok(None) => Ack::ok(seq),
            Err(e) => {
                tracing::debug!(%connection, seq, event, error = %e, "request rejected");
                Ack::fail(seq, e.failure())
            }
        };
        if outbox.send(Envelope::Ack(ack)).is_err() {
            return Ok(());
        }
    }
}

/// Drains the outbox onto the socket.
async fn write_frames<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
) {
    while let Some(envelope) = inbox.recv().await {
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(connection = %conn.id(), error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(connection = %conn.id(), error = %e, "send failed");
            break;
        }
    }
}

/// Acks a frame that did not decode, if its `seq` can still be read.
fn reject_malformed<C: Codec>(
    state: &ServerState<C>,
    connection: ConnectionId,
    outbox: &Outbox,
    data: &[u8],
    error: &AugurError,
) {
    #[derive(Deserialize)]
    struct SeqOnly {
        seq: u64,
    }

    match state.codec.decode::<SeqOnly>(data) {
        Ok(SeqOnly { seq }) => {
            tracing::debug!(%connection, seq, %error, "malformed request");
            let _ = outbox.send(Envelope::Ack(Ack::fail(seq, error.failure())));
        }
        Err(_) => {
            tracing::debug!(%connection, %error, "unreadable frame skipped");
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    connection: ConnectionId,
    outbox: &Outbox,
    event: ClientEvent,
) -> Result<Option<AckData>, AugurError> {
    match event {
        ClientEvent::Join {
            display_name,
            avatar,
            room_id,
            participant_id,
        } => {
            let joined = join(
                state,
                connection,
                outbox,
                JoinRequest {
                    display_name,
                    avatar,
                    room_id,
                    participant_id,
                },
            )
            .await?;
            Ok(Some(joined))
        }

        ClientEvent::Leave {
            room_id,
            participant_id,
        } => {
            {
                let mut sessions = state.sessions.lock().await;
                bound_room(&sessions, &room_id, &participant_id, connection)?;
                sessions.unbind(&participant_id);
            }
            match state.store.deregister(&room_id, &participant_id).await {
                Ok(departure) => {
                    tracing::info!(
                        %room_id,
                        %participant_id,
                        disposed = departure.room_disposed,
                        "participant left"
                    );
                    Ok(None)
                }
                // Leaving a room that already dissolved.
                Err(RoomError::RoomNotFound(_)) => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        ClientEvent::ListRooms => {
            let rooms = state.store.list().await.iter().map(RoomInfo::summary).collect();
            Ok(Some(AckData::Rooms { rooms }))
        }

        ClientEvent::Start { room_id } => {
            let participant_id = state
                .sessions
                .lock()
                .await
                .participant_of(connection)
                .cloned()
                .ok_or(SessionError::Unbound(connection))?;
            let handle = authorize(state, &room_id, &participant_id, connection).await?;
            handle.start().await?;
            Ok(None)
        }

        ClientEvent::SealWord {
            room_id,
            participant_id,
            word,
        } => {
            let handle = authorize(state, &room_id, &participant_id, connection).await?;
            handle.seal_word(participant_id, word).await?;
            Ok(None)
        }

        ClientEvent::Stroke {
            room_id,
            participant_id,
            strokes,
        } => {
            let handle = authorize(state, &room_id, &participant_id, connection).await?;
            handle.stroke(participant_id, strokes).await?;
            Ok(None)
        }

        ClientEvent::Clear {
            room_id,
            participant_id,
        } => {
            let handle = authorize(state, &room_id, &participant_id, connection).await?;
            handle.clear(participant_id).await?;
            Ok(None)
        }

        ClientEvent::Guess {
            room_id,
            participant_id,
            text,
        } => {
            let handle = authorize(state, &room_id, &participant_id, connection).await?;
            let receipt = handle.guess(participant_id, text).await?;
            Ok(Some(AckData::Verdict {
                outcome: receipt.outcome,
                points: receipt.points,
            }))
        }

        ClientEvent::Heartbeat { client_time } => Ok(Some(AckData::Pong {
            client_time,
            server_time: view::unix_millis(),
        })),
    }
}

/// Checks that `connection` speaks for `participant_id` and that they are
/// seated in `room_id`, then returns the room's handle.
async fn authorize<C: Codec>(
    state: &ServerState<C>,
    room_id: &RoomId,
    participant_id: &ParticipantId,
    connection: ConnectionId,
) -> Result<RoomHandle, AugurError> {
    bound_room(&*state.sessions.lock().await, room_id, participant_id, connection)?;
    Ok(state.store.room(room_id)?)
}

fn bound_room(
    sessions: &SessionManager,
    room_id: &RoomId,
    participant_id: &ParticipantId,
    connection: ConnectionId,
) -> Result<(), SessionError> {
    let bound = sessions.authorize(participant_id, connection)?;
    if &bound != room_id {
        return Err(SessionError::AlreadyInRoom(participant_id.clone(), bound));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

struct JoinRequest {
    display_name: String,
    avatar: Option<String>,
    room_id: Option<RoomId>,
    participant_id: Option<ParticipantId>,
}

/// Seats the caller and binds this connection to them.
///
/// Without a `room_id` the participant goes back to the room their session
/// points at, or else to whichever room [`RosterStore::allocate`] offers.
///
/// [`RosterStore::allocate`]: augur_room::RosterStore::allocate
async fn join<C: Codec>(
    state: &ServerState<C>,
    connection: ConnectionId,
    outbox: &Outbox,
    request: JoinRequest,
) -> Result<AckData, AugurError> {
    let display_name = display_name(&request.display_name);
    let avatar = request.avatar.filter(|a| !a.trim().is_empty());
    let participant_id = request.participant_id.unwrap_or_else(mint_participant_id);

    for attempt in 1..=JOIN_ATTEMPTS {
        let room_id = target_room(state, request.room_id.as_ref(), &participant_id).await;
        check_bind(state, &participant_id, &room_id, connection).await?;

        let was_member = state.hub.members(&room_id).contains(&participant_id);
        state
            .hub
            .attach(&room_id, &participant_id, connection, outbox.clone());

        let mut participant =
            Participant::new(participant_id.clone(), connection, display_name.clone());
        participant.avatar = avatar.clone();
        let registration = match state.store.register(&room_id, participant).await {
            Ok(registration) => registration,
            Err(e) => {
                if !was_member {
                    state.hub.detach(&room_id, &participant_id);
                }
                let retry = request.room_id.is_none()
                    && matches!(e, RoomError::RoomFull(_) | RoomError::RoomNotFound(_));
                if retry && attempt < JOIN_ATTEMPTS {
                    tracing::debug!(%room_id, %participant_id, attempt, error = %e, "join raced, retrying");
                    continue;
                }
                return Err(e.into());
            }
        };

        let bound = state
            .sessions
            .lock()
            .await
            .bind(participant_id.clone(), room_id.clone(), connection);
        if let Err(e) = bound {
            // Lost a race with another join for the same participant.
            let _ = state.store.deregister(&room_id, &participant_id).await;
            return Err(e.into());
        }

        tracing::info!(
            %room_id,
            %participant_id,
            %connection,
            reconnected = registration.reconnected,
            occupancy = registration.occupancy,
            "participant joined"
        );
        return Ok(AckData::Joined {
            room_id,
            participant: registration.entry,
            reconnected: registration.reconnected,
        });
    }

    Err(RoomError::Internal("no room could take the participant".into()).into())
}

/// Where a join without an explicit room should land.
async fn target_room<C: Codec>(
    state: &ServerState<C>,
    requested: Option<&RoomId>,
    participant_id: &ParticipantId,
) -> RoomId {
    if let Some(room_id) = requested {
        return room_id.clone();
    }
    let previous = state
        .sessions
        .lock()
        .await
        .get(participant_id)
        .map(|s| s.room_id.clone());
    match previous {
        Some(room_id) if state.store.room(&room_id).is_ok() => room_id,
        _ => state.store.allocate(),
    }
}

/// Like [`SessionManager::check_bind`], but a session pointing at a room
/// that no longer exists is dropped instead of blocking the join.
///
/// [`SessionManager::check_bind`]: augur_session::SessionManager::check_bind
async fn check_bind<C: Codec>(
    state: &ServerState<C>,
    participant_id: &ParticipantId,
    room_id: &RoomId,
    connection: ConnectionId,
) -> Result<(), AugurError> {
    let mut sessions = state.sessions.lock().await;
    match sessions.check_bind(participant_id, room_id, connection) {
        Err(SessionError::AlreadyInRoom(_, stale)) if state.store.room(&stale).is_err() => {
            tracing::debug!(%participant_id, room_id = %stale, "dropping session for a gone room");
            sessions.unbind(participant_id);
            Ok(sessions.check_bind(participant_id, room_id, connection)?)
        }
        other => Ok(other?),
    }
}

fn display_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    if name.is_empty() {
        "Anon".to_string()
    } else {
        name
    }
}

fn mint_participant_id() -> ParticipantId {
    let n: u64 = rand::rng().random();
    ParticipantId::new(format!("seer-{n:016x}"))
}
