//! Fan-out of server events to participants.
//!
//! The gateway is deliberately dumb: it never inspects or filters payloads.
//! Callers decide what each audience may see (see [`crate::view`]) and pick
//! the addressing method accordingly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use augur_protocol::{ConnectionId, Envelope, ParticipantId, Recipient, RoomId, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Where a connection handler receives the frames addressed to it.
pub type Outbox = mpsc::UnboundedSender<Envelope>;

/// Delivers events to the members of a room.
pub trait Gateway: Send + Sync + 'static {
    fn to_room(&self, room_id: &RoomId, event: ServerEvent);

    fn to_participant(&self, participant_id: &ParticipantId, event: ServerEvent);

    fn to_room_except(&self, room_id: &RoomId, excluded: &ParticipantId, event: ServerEvent);

    /// A participant left the room for good.
    fn remove_member(&self, _room_id: &RoomId, _participant_id: &ParticipantId) {}

    /// The room is gone; forget its members.
    fn close_room(&self, _room_id: &RoomId) {}

    /// Routes by [`Recipient`].
    fn deliver(&self, room_id: &RoomId, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => self.to_room(room_id, event),
            Recipient::Participant(id) => self.to_participant(&id, event),
            Recipient::AllExcept(id) => self.to_room_except(room_id, &id, event),
        }
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

struct Link {
    connection: ConnectionId,
    outbox: Outbox,
}

/// In-process [`Gateway`]: a room → members index plus one outbox per
/// participant.
///
/// A participant can stay a member while unlinked (socket gone, inside the
/// reconnect grace). Events for them are dropped until they attach again.
#[derive(Default)]
pub struct Hub {
    links: RwLock<HashMap<ParticipantId, Link>>,
    rooms: RwLock<HashMap<RoomId, Vec<ParticipantId>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `participant_id` a member of `room_id` reachable through
    /// `outbox`. Replaces any previous link for the same participant.
    pub fn attach(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        connection: ConnectionId,
        outbox: Outbox,
    ) {
        self.links
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(participant_id.clone(), Link { connection, outbox });
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let members = rooms.entry(room_id.clone()).or_default();
        if !members.contains(participant_id) {
            members.push(participant_id.clone());
        }
        debug!(%room_id, %participant_id, %connection, "participant attached");
    }

    /// Removes a member and their link.
    pub fn detach(&self, room_id: &RoomId, participant_id: &ParticipantId) {
        self.links
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(participant_id);
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = rooms.get_mut(room_id) {
            members.retain(|id| id != participant_id);
            if members.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Drops the link if it still belongs to `connection`. Membership stays.
    ///
    /// Returns `false` when a newer connection has already taken over.
    pub fn unlink(&self, participant_id: &ParticipantId, connection: ConnectionId) -> bool {
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        match links.get(participant_id) {
            Some(link) if link.connection == connection => {
                links.remove(participant_id);
                true
            }
            _ => false,
        }
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<ParticipantId> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_linked(&self, participant_id: &ParticipantId) -> bool {
        self.links
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(participant_id)
    }

    fn send(&self, targets: impl IntoIterator<Item = ParticipantId>, event: ServerEvent) {
        let envelope = Envelope::from(event);
        let links = self.links.read().unwrap_or_else(PoisonError::into_inner);
        for participant_id in targets {
            match links.get(&participant_id) {
                // A closed outbox means the writer task is gone; the
                // handler will clean up on its own.
                Some(link) => {
                    let _ = link.outbox.send(envelope.clone());
                }
                None => trace!(%participant_id, "no link, event dropped"),
            }
        }
    }
}

impl Gateway for Hub {
    fn to_room(&self, room_id: &RoomId, event: ServerEvent) {
        self.send(self.members(room_id), event);
    }

    fn to_participant(&self, participant_id: &ParticipantId, event: ServerEvent) {
        self.send([participant_id.clone()], event);
    }

    fn to_room_except(&self, room_id: &RoomId, excluded: &ParticipantId, event: ServerEvent) {
        let targets = self
            .members(room_id)
            .into_iter()
            .filter(|id| id != excluded);
        self.send(targets, event);
    }

    fn remove_member(&self, room_id: &RoomId, participant_id: &ParticipantId) {
        self.detach(room_id, participant_id);
    }

    fn close_room(&self, room_id: &RoomId) {
        let members = self
            .rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(room_id)
            .unwrap_or_default();
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        for participant_id in &members {
            links.remove(participant_id);
        }
        debug!(%room_id, members = members.len(), "room closed in gateway");
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn notice(text: &str) -> ServerEvent {
        ServerEvent::Notice {
            room_id: RoomId::new("r"),
            text: text.into(),
        }
    }

    fn attach(hub: &Hub, room: &str, id: &str, conn: u64) -> UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.attach(&RoomId::new(room), &pid(id), ConnectionId::new(conn), tx);
        rx
    }

    #[test]
    fn test_to_room_reaches_members_only() {
        let hub = Hub::new();
        let mut a = attach(&hub, "r", "a", 1);
        let mut b = attach(&hub, "r", "b", 2);
        let mut c = attach(&hub, "other", "c", 3);

        hub.to_room(&RoomId::new("r"), notice("hi"));
        assert_eq!(a.try_recv().unwrap(), Envelope::Push(notice("hi")));
        assert_eq!(b.try_recv().unwrap(), Envelope::Push(notice("hi")));
        assert!(c.try_recv().is_err());
    }

    #[test]
    fn test_to_room_except_skips_excluded() {
        let hub = Hub::new();
        let mut a = attach(&hub, "r", "a", 1);
        let mut b = attach(&hub, "r", "b", 2);

        hub.to_room_except(&RoomId::new("r"), &pid("a"), notice("stroke"));
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_deliver_routes_participant_recipient() {
        let hub = Hub::new();
        let mut a = attach(&hub, "r", "a", 1);
        let mut b = attach(&hub, "r", "b", 2);

        hub.deliver(
            &RoomId::new("r"),
            Recipient::Participant(pid("b")),
            notice("psst"),
        );
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_reattach_replaces_outbox() {
        let hub = Hub::new();
        let mut old = attach(&hub, "r", "a", 1);
        let mut new = attach(&hub, "r", "a", 2);

        hub.to_room(&RoomId::new("r"), notice("again"));
        assert!(old.try_recv().is_err());
        assert!(new.try_recv().is_ok());
        assert_eq!(hub.members(&RoomId::new("r")), vec![pid("a")]);
    }

    #[test]
    fn test_unlink_ignores_superseded_connection() {
        let hub = Hub::new();
        let _old = attach(&hub, "r", "a", 1);
        let _new = attach(&hub, "r", "a", 2);

        assert!(!hub.unlink(&pid("a"), ConnectionId::new(1)));
        assert!(hub.is_linked(&pid("a")));
        assert!(hub.unlink(&pid("a"), ConnectionId::new(2)));
        assert!(!hub.is_linked(&pid("a")));
        assert_eq!(hub.members(&RoomId::new("r")), vec![pid("a")]);
    }

    #[test]
    fn test_close_room_forgets_members() {
        let hub = Hub::new();
        let _a = attach(&hub, "r", "a", 1);
        hub.close_room(&RoomId::new("r"));
        assert!(hub.members(&RoomId::new("r")).is_empty());
        assert!(!hub.is_linked(&pid("a")));
    }
}
