//! Roster bookkeeping: seats, reconnects, and departures.
//!
//! No game rules live here. Removing a participant keeps the room's
//! references consistent (judge, solved list) but deciding what the round
//! does next is the engine's job.

use augur_protocol::{ParticipantId, Phase, RosterEntry};

use crate::{Participant, Room, RoomError, view};

/// Result of seating a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The seat as it stands after registration (score kept on reconnect).
    pub participant: Participant,
    /// The seat as clients see it.
    pub entry: RosterEntry,
    /// The id was already seated; occupancy did not change.
    pub reconnected: bool,
    /// This registration brought occupancy exactly to `min_to_start`.
    pub quorum_reached: bool,
    pub occupancy: usize,
}

/// Result of removing a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub removed: Participant,
    /// The roster is now empty and the room is gone.
    pub room_disposed: bool,
    pub was_judge: bool,
}

impl Room {
    /// Seats `incoming`, or refreshes the seat if the id is already present.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`]: the room has dissolved.
    /// - [`RoomError::RoomFull`]: a new id and no seat left.
    pub fn register(&mut self, incoming: Participant) -> Result<Registration, RoomError> {
        if self.phase == Phase::Dissolved {
            return Err(RoomError::RoomNotFound(self.id.clone()));
        }

        if let Some(seat) = self.participant_mut(&incoming.id) {
            seat.connection = incoming.connection;
            seat.display_name = incoming.display_name;
            if incoming.avatar.is_some() {
                seat.avatar = incoming.avatar;
            }
            let participant = seat.clone();
            return Ok(Registration {
                entry: view::roster_entry(self, &participant),
                participant,
                reconnected: true,
                quorum_reached: false,
                occupancy: self.roster.len(),
            });
        }

        if self.roster.len() >= self.pact.max_occupancy {
            return Err(RoomError::RoomFull(self.id.clone()));
        }

        let avatar = incoming
            .avatar
            .clone()
            .unwrap_or_else(|| default_avatar(&incoming.display_name));
        let participant = Participant {
            avatar: Some(avatar),
            score: 0,
            round_score: 0,
            ..incoming
        };
        self.roster.push(participant.clone());
        let occupancy = self.roster.len();
        Ok(Registration {
            entry: view::roster_entry(self, &participant),
            participant,
            reconnected: false,
            quorum_reached: occupancy == self.pact.min_to_start,
            occupancy,
        })
    }

    /// Takes a participant off the roster and scrubs every reference to
    /// them.
    ///
    /// # Errors
    /// [`RoomError::ParticipantNotFound`] if the id is not seated.
    pub(crate) fn remove(&mut self, participant_id: &ParticipantId) -> Result<Departure, RoomError> {
        let index = self
            .roster
            .iter()
            .position(|p| &p.id == participant_id)
            .ok_or_else(|| RoomError::ParticipantNotFound(participant_id.clone(), self.id.clone()))?;
        let removed = self.roster.remove(index);

        self.solved_by.retain(|id| id != participant_id);
        let was_judge = self.is_judge(participant_id);
        if was_judge {
            self.judge_id = None;
        }

        Ok(Departure {
            removed,
            room_disposed: self.roster.is_empty(),
            was_judge,
        })
    }
}

/// Generated avatar for a new seat that brought none, seeded by name.
fn default_avatar(display_name: &str) -> String {
    let seed: String = display_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("https://api.dicebear.com/7.x/notionists/svg?seed={seed}")
}
