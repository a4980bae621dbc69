//! What each audience is allowed to see of a room.
//!
//! These constructors are the only way room state reaches the wire. They
//! copy fields one by one into protocol types, so connection ids never
//! leave the server and the secret is only ever copied on purpose:
//!
//! | field        | guessers              | judge               |
//! |--------------|-----------------------|---------------------|
//! | `hint`       | from DRAWING on       | from DRAWING on     |
//! | `secret`     | from DISCLOSURE on    | once sealed         |
//! | `candidates` | never                 | during SELECTING    |

use std::time::{SystemTime, UNIX_EPOCH};

use augur_protocol::{
    ParticipantId, Phase, PhaseUpdate, Recipient, Reveal, RoomView, RosterEntry, ScoreLine,
    ServerEvent,
};
use tokio::time::Instant;

use crate::{Participant, Room};

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// `(deadline_ms, remaining_ms)` for the current phase.
fn deadline(room: &Room, now: Instant) -> (Option<u64>, Option<u64>) {
    match room.phase_deadline() {
        Some(at) => {
            let remaining = at.saturating_duration_since(now).as_millis() as u64;
            (Some(unix_millis() + remaining), Some(remaining))
        }
        None => (None, None),
    }
}

pub fn roster_entry(room: &Room, participant: &Participant) -> RosterEntry {
    RosterEntry {
        participant_id: participant.id.clone(),
        display_name: participant.display_name.clone(),
        avatar: participant.avatar.clone(),
        score: participant.score,
        round_score: participant.round_score,
        is_judge: room.is_judge(&participant.id),
        has_solved: room.has_solved(&participant.id),
    }
}

pub fn roster_view(room: &Room) -> Vec<RosterEntry> {
    room.roster().iter().map(|p| roster_entry(room, p)).collect()
}

/// Scores, highest first. Ties keep join order.
pub fn score_lines(room: &Room) -> Vec<ScoreLine> {
    let mut lines: Vec<ScoreLine> = room
        .roster()
        .iter()
        .map(|p| ScoreLine {
            participant_id: p.id.clone(),
            display_name: p.display_name.clone(),
            score: p.score,
            round_score: p.round_score,
        })
        .collect();
    lines.sort_by(|a, b| b.score.cmp(&a.score));
    lines
}

pub fn phase_update(room: &Room, now: Instant) -> PhaseUpdate {
    let (deadline_ms, remaining_ms) = deadline(room, now);
    PhaseUpdate {
        room_id: room.id().clone(),
        phase: room.phase(),
        round: room.round(),
        round_limit: room.pact().round_limit,
        judge_id: room.judge_id().cloned(),
        hint: room.hint().map(str::to_string),
        deadline_ms,
        remaining_ms,
    }
}

/// Secret and standings, once the secret may be shown.
pub fn reveal(room: &Room) -> Option<Reveal> {
    if !matches!(room.phase(), Phase::Disclosure | Phase::Dissolved) {
        return None;
    }
    Some(Reveal {
        room_id: room.id().clone(),
        round: room.round(),
        secret: room.secret()?.to_string(),
        scores: score_lines(room),
    })
}

/// What a guesser (or anyone not judging) sees.
pub fn public_view(room: &Room, now: Instant) -> RoomView {
    let (deadline_ms, remaining_ms) = deadline(room, now);
    let disclosed = matches!(room.phase(), Phase::Disclosure | Phase::Dissolved);
    RoomView {
        room_id: room.id().clone(),
        phase: room.phase(),
        round: room.round(),
        round_limit: room.pact().round_limit,
        judge_id: room.judge_id().cloned(),
        hint: room.hint().map(str::to_string),
        deadline_ms,
        remaining_ms,
        roster: roster_view(room),
        strokes: room.strokes().to_vec(),
        candidates: None,
        secret: room.secret().filter(|_| disclosed).map(str::to_string),
    }
}

/// What the judge sees: the public view plus the secret and candidates.
pub fn judge_view(room: &Room, now: Instant) -> RoomView {
    let mut view = public_view(room, now);
    view.secret = room.secret().map(str::to_string);
    if room.phase() == Phase::Selecting {
        view.candidates = Some(room.candidates().to_vec());
    }
    view
}

/// The view appropriate for `participant_id`.
pub fn view_for(room: &Room, participant_id: &ParticipantId, now: Instant) -> RoomView {
    if room.is_judge(participant_id) {
        judge_view(room, now)
    } else {
        public_view(room, now)
    }
}

pub fn sync(room: &Room) -> ServerEvent {
    ServerEvent::Sync {
        room_id: room.id().clone(),
        roster: roster_view(room),
    }
}

/// Events announcing the phase the room has just entered.
pub fn announce(room: &Room, now: Instant) -> Vec<(Recipient, ServerEvent)> {
    let mut out = vec![(Recipient::All, ServerEvent::Phase(phase_update(room, now)))];
    match room.phase() {
        Phase::Selecting => {
            if let Some(judge_id) = room.judge_id() {
                out.push((
                    Recipient::Participant(judge_id.clone()),
                    ServerEvent::Candidates {
                        room_id: room.id().clone(),
                        words: room.candidates().to_vec(),
                    },
                ));
            }
        }
        Phase::Disclosure => {
            if let Some(reveal) = reveal(room) {
                out.push((Recipient::All, ServerEvent::Reveal(reveal)));
            }
        }
        Phase::Dissolved => out.push((Recipient::All, sync(room))),
        Phase::Lobby | Phase::Drawing => {}
    }
    out
}
