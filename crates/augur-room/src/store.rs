//! The roster store: every live room, keyed by id.
//!
//! The map lock is a plain `std::sync::Mutex` that is only held to look up
//! or clone a [`RoomHandle`]; all awaiting happens on the handle afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use augur_protocol::{ParticipantId, RoomId};
use rand::Rng;

use crate::room::spawn_room;
use crate::roster::{Departure, Registration};
use crate::{Gateway, Pact, Participant, RoomError, RoomHandle, RoomInfo, WordBank};

/// Command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns all active rooms and hands out their handles.
pub struct RosterStore {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    pact: Pact,
    words: Arc<WordBank>,
    gateway: Arc<dyn Gateway>,
    next_room: AtomicU64,
}

impl RosterStore {
    /// Creates an empty store. New rooms get `pact`; judges pick from
    /// `words` (the standard bank if `words` is empty).
    pub fn new(pact: Pact, words: WordBank, gateway: Arc<dyn Gateway>) -> Self {
        let words = if words.is_empty() {
            tracing::warn!("word bank is empty, using the standard bank");
            WordBank::standard()
        } else {
            words
        };
        Self {
            rooms: Mutex::new(HashMap::new()),
            pact: pact.validated(),
            words: Arc::new(words),
            gateway,
            next_room: AtomicU64::new(1),
        }
    }

    pub fn pact(&self) -> &Pact {
        &self.pact
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomId, RoomHandle>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns a new room in the lobby.
    pub fn create_room(&self) -> RoomId {
        let counter = self.next_room.fetch_add(1, Ordering::Relaxed);
        let salt: u16 = rand::rng().random();
        let room_id = RoomId::new(format!("chamber-{counter:x}{salt:04x}"));
        let handle = spawn_room(
            room_id.clone(),
            self.pact.clone(),
            Arc::clone(&self.gateway),
            Arc::clone(&self.words),
            DEFAULT_CHANNEL_SIZE,
        );
        self.rooms().insert(room_id.clone(), handle);
        tracing::info!(%room_id, "room created");
        room_id
    }

    /// A room with a free seat, creating one if none has any.
    ///
    /// Fuller rooms are preferred so players end up together. The answer
    /// can be stale by the time the caller registers; callers retry on
    /// [`RoomError::RoomFull`] or [`RoomError::RoomNotFound`].
    pub fn allocate(&self) -> RoomId {
        {
            let mut rooms = self.rooms();
            rooms.retain(|_, handle| !handle.is_closed());
            let best = rooms
                .values()
                .filter(|handle| handle.has_capacity())
                .max_by_key(|handle| handle.occupancy());
            if let Some(handle) = best {
                return handle.room_id().clone();
            }
        }
        self.create_room()
    }

    /// The handle of a live room.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`] if the id is unknown or the room has
    /// stopped.
    pub fn room(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        let mut rooms = self.rooms();
        match rooms.get(room_id) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            Some(_) => {
                rooms.remove(room_id);
                Err(RoomError::RoomNotFound(room_id.clone()))
            }
            None => Err(RoomError::RoomNotFound(room_id.clone())),
        }
    }

    /// Seats a participant in `room_id`.
    pub async fn register(
        &self,
        room_id: &RoomId,
        participant: Participant,
    ) -> Result<Registration, RoomError> {
        self.room(room_id)?.register(participant).await
    }

    /// Removes a participant; forgets the room once it is empty.
    pub async fn deregister(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<Departure, RoomError> {
        let departure = self
            .room(room_id)?
            .deregister(participant_id.clone())
            .await?;
        if departure.room_disposed {
            self.rooms().remove(room_id);
            tracing::info!(%room_id, "room disposed");
        }
        Ok(departure)
    }

    pub async fn get(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        self.room(room_id)?.info().await
    }

    /// Every live room, ordered by id. Rooms that stop while being asked
    /// are skipped.
    pub async fn list(&self) -> Vec<RoomInfo> {
        let handles: Vec<RoomHandle> = self.rooms().values().cloned().collect();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        infos
    }

    /// Live rooms. Stopped rooms are pruned first.
    pub fn room_count(&self) -> usize {
        let mut rooms = self.rooms();
        rooms.retain(|_, handle| !handle.is_closed());
        rooms.len()
    }

    /// Stops every room.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = self.rooms().drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}
