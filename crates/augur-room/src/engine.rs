//! The round state machine.
//!
//! Every function here is synchronous and works on a `&mut Room` (or
//! `&Room`). Deciding and applying are separate steps: the deciding
//! functions (`begin`, `seal`, `expire`, `guess`, `depart`) validate and
//! return a [`Transition`] without touching the phase; [`apply`] performs
//! it and says which timer to arm. The room actor glues the two together
//! with a [`PhaseTimer`](augur_timer::PhaseTimer) and the gateway.
//!
//! ```text
//! LOBBY ──start──▶ SELECTING ──seal/timeout──▶ DRAWING ──timeout/all solved──▶ DISCLOSURE
//!                      ▲                                                           │
//!                      └────────────── next round ◀──────────┬─────────────────────┘
//!                                         LOBBY (short) ◀────┤
//!                                     DISSOLVED (limit) ◀────┘
//! ```

use std::time::Duration;

use augur_protocol::{GuessOutcome, ParticipantId, Phase, Stroke};
use rand::Rng;
use tokio::time::Instant;

use crate::config::{MAX_GUESS_CHARS, MAX_STROKES_PER_BATCH, MAX_WORD_CHARS};
use crate::roster::Departure;
use crate::{Room, RoomError, WordBank, guess, score};

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A phase change decided by the engine, waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A judge and their candidates for `round`.
    SelectingEntered {
        round: u32,
        judge_id: ParticipantId,
        candidates: Vec<String>,
    },
    /// The secret is sealed.
    DrawingEntered { secret: String, hint: String },
    DisclosureEntered,
    /// Too few participants to keep playing.
    LobbyReentered,
    /// The last round is over.
    Dissolved,
}

impl Transition {
    /// The phase the room is in after this transition.
    pub fn target(&self) -> Phase {
        match self {
            Self::SelectingEntered { .. } => Phase::Selecting,
            Self::DrawingEntered { .. } => Phase::Drawing,
            Self::DisclosureEntered => Phase::Disclosure,
            Self::LobbyReentered => Phase::Lobby,
            Self::Dissolved => Phase::Dissolved,
        }
    }
}

/// The deadline a freshly entered phase needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    /// Phase the timer belongs to. A firing for any other phase is ignored.
    pub phase: Phase,
    pub after: Duration,
}

/// What a guess did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: GuessOutcome,
    /// Points earned by the guesser; 0 unless solved.
    pub points: u32,
    /// Set when this guess was the last one missing.
    pub transition: Option<Transition>,
}

// ---------------------------------------------------------------------------
// Deciding
// ---------------------------------------------------------------------------

fn expect_phase(room: &Room, expected: Phase) -> Result<(), RoomError> {
    if room.phase == expected {
        Ok(())
    } else {
        Err(RoomError::PhaseMismatch {
            expected,
            actual: room.phase,
        })
    }
}

fn expect_judge(room: &Room, participant_id: &ParticipantId) -> Result<(), RoomError> {
    if !room.contains(participant_id) {
        return Err(RoomError::ParticipantNotFound(
            participant_id.clone(),
            room.id.clone(),
        ));
    }
    if !room.is_judge(participant_id) {
        return Err(RoomError::NotJudge(participant_id.clone()));
    }
    Ok(())
}

/// Starts the first round.
///
/// # Errors
/// - [`RoomError::PhaseMismatch`] outside the lobby.
/// - [`RoomError::QuorumNotMet`] with fewer than `min_to_start` seated.
pub fn begin<R: Rng + ?Sized>(
    room: &Room,
    rng: &mut R,
    words: &WordBank,
) -> Result<Transition, RoomError> {
    expect_phase(room, Phase::Lobby)?;
    if room.occupancy() < room.pact.min_to_start {
        return Err(RoomError::QuorumNotMet {
            present: room.occupancy(),
            required: room.pact.min_to_start,
        });
    }
    select(room, 1, rng, words)
}

/// Draws a judge uniformly from the whole roster and offers them
/// candidates.
pub fn select<R: Rng + ?Sized>(
    room: &Room,
    round: u32,
    rng: &mut R,
    words: &WordBank,
) -> Result<Transition, RoomError> {
    if room.roster.is_empty() {
        return Err(RoomError::Internal(format!(
            "selecting a judge in empty room {}",
            room.id
        )));
    }
    let judge = &room.roster[rng.random_range(0..room.roster.len())];
    let candidates = words.draw(rng, room.pact.candidate_count);
    if candidates.is_empty() {
        return Err(RoomError::Internal("word bank is empty".into()));
    }
    Ok(Transition::SelectingEntered {
        round,
        judge_id: judge.id.clone(),
        candidates,
    })
}

/// The judge seals the secret.
///
/// Any word is accepted, not just one of the candidates.
///
/// # Errors
/// - [`RoomError::PhaseMismatch`] outside SELECTING.
/// - [`RoomError::NotJudge`] / [`RoomError::ParticipantNotFound`] for the
///   wrong caller.
/// - [`RoomError::Invalid`] for a blank or oversized word.
pub fn seal(room: &Room, participant_id: &ParticipantId, word: &str) -> Result<Transition, RoomError> {
    expect_phase(room, Phase::Selecting)?;
    expect_judge(room, participant_id)?;
    sealed(word)
}

fn sealed(word: &str) -> Result<Transition, RoomError> {
    let secret = word.trim();
    if secret.is_empty() {
        return Err(RoomError::Invalid("secret word is empty".into()));
    }
    if secret.chars().count() > MAX_WORD_CHARS {
        return Err(RoomError::Invalid(format!(
            "secret word longer than {MAX_WORD_CHARS} characters"
        )));
    }
    Ok(Transition::DrawingEntered {
        secret: secret.to_string(),
        hint: guess::mask(secret),
    })
}

/// A phase deadline passed while the room was in `phase`.
///
/// Returns `Ok(None)` when the room has already left `phase`.
pub fn expire<R: Rng + ?Sized>(
    room: &Room,
    phase: Phase,
    rng: &mut R,
    words: &WordBank,
) -> Result<Option<Transition>, RoomError> {
    if room.phase != phase {
        return Ok(None);
    }
    match phase {
        Phase::Selecting => {
            let first = room.candidates.first().ok_or_else(|| {
                RoomError::Internal(format!("room {} selecting without candidates", room.id))
            })?;
            sealed(first).map(Some)
        }
        Phase::Drawing => Ok(Some(Transition::DisclosureEntered)),
        Phase::Disclosure => conclude(room, rng, words).map(Some),
        Phase::Lobby | Phase::Dissolved => Ok(None),
    }
}

/// Where a room goes once a disclosure ends.
fn conclude<R: Rng + ?Sized>(
    room: &Room,
    rng: &mut R,
    words: &WordBank,
) -> Result<Transition, RoomError> {
    if room.round >= room.pact.round_limit {
        Ok(Transition::Dissolved)
    } else if room.occupancy() < room.pact.min_to_start {
        Ok(Transition::LobbyReentered)
    } else {
        select(room, room.round + 1, rng, words)
    }
}

/// Scores a chat line. Correct guesses are recorded on the room.
///
/// Chat is allowed in every phase; outside DRAWING it is always a miss.
///
/// # Errors
/// - [`RoomError::Invalid`] for blank or oversized text.
/// - [`RoomError::ParticipantNotFound`] if the sender is not seated.
pub fn guess(
    room: &mut Room,
    participant_id: &ParticipantId,
    text: &str,
    now: Instant,
) -> Result<Verdict, RoomError> {
    if text.trim().is_empty() {
        return Err(RoomError::Invalid("guess is empty".into()));
    }
    if text.chars().count() > MAX_GUESS_CHARS {
        return Err(RoomError::Invalid(format!(
            "guess longer than {MAX_GUESS_CHARS} characters"
        )));
    }
    if !room.contains(participant_id) {
        return Err(RoomError::ParticipantNotFound(
            participant_id.clone(),
            room.id.clone(),
        ));
    }

    let outcome = guess::interpret(room, participant_id, text);
    if outcome != GuessOutcome::Solved {
        return Ok(Verdict {
            outcome,
            points: 0,
            transition: None,
        });
    }

    let elapsed = now.saturating_duration_since(room.phase_started_at);
    let points = score::award(elapsed, room.pact.drawing_duration(), &room.pact.scoring);
    let judge_bonus = room.pact.scoring.judge_bonus;

    if let Some(seat) = room.participant_mut(participant_id) {
        seat.score = seat.score.saturating_add(points);
        seat.round_score = seat.round_score.saturating_add(points);
    }
    if let Some(judge_id) = room.judge_id.clone() {
        if let Some(judge) = room.participant_mut(&judge_id) {
            judge.score = judge.score.saturating_add(judge_bonus);
            judge.round_score = judge.round_score.saturating_add(judge_bonus);
        }
    }
    room.solved_by.push(participant_id.clone());

    let transition = room
        .all_guessers_solved()
        .then_some(Transition::DisclosureEntered);
    Ok(Verdict {
        outcome,
        points,
        transition,
    })
}

/// Appends a batch of strokes from the judge.
///
/// # Errors
/// - [`RoomError::PhaseMismatch`] outside DRAWING.
/// - [`RoomError::NotJudge`] / [`RoomError::ParticipantNotFound`].
/// - [`RoomError::Invalid`] for an empty, oversized, or non-finite batch.
pub fn append_strokes(
    room: &mut Room,
    participant_id: &ParticipantId,
    strokes: &[Stroke],
) -> Result<(), RoomError> {
    expect_phase(room, Phase::Drawing)?;
    expect_judge(room, participant_id)?;
    if strokes.is_empty() {
        return Err(RoomError::Invalid("stroke batch is empty".into()));
    }
    if strokes.len() > MAX_STROKES_PER_BATCH {
        return Err(RoomError::Invalid(format!(
            "more than {MAX_STROKES_PER_BATCH} strokes in one batch"
        )));
    }
    let finite = strokes.iter().all(|s| {
        [s.start.x, s.start.y, s.end.x, s.end.y, s.width]
            .iter()
            .all(|v| v.is_finite())
    });
    if !finite {
        return Err(RoomError::Invalid("stroke has non-finite geometry".into()));
    }
    room.strokes.extend_from_slice(strokes);
    Ok(())
}

/// Wipes the canvas. Same rules as [`append_strokes`].
pub fn clear_strokes(room: &mut Room, participant_id: &ParticipantId) -> Result<(), RoomError> {
    expect_phase(room, Phase::Drawing)?;
    expect_judge(room, participant_id)?;
    room.strokes.clear();
    Ok(())
}

/// Removes a participant and decides how the round carries on.
///
/// - judge gone while selecting: a new judge is drawn for the same round,
///   or the room falls back to LOBBY if no judge can be drawn.
/// - anyone gone while drawing: if everyone left has solved, disclose now.
/// - otherwise the round runs on with a smaller roster.
///
/// Once the participant is removed this never fails, so callers can always
/// finish their own bookkeeping for the departure.
pub fn depart<R: Rng + ?Sized>(
    room: &mut Room,
    participant_id: &ParticipantId,
    rng: &mut R,
    words: &WordBank,
) -> Result<(Departure, Option<Transition>), RoomError> {
    let departure = room.remove(participant_id)?;
    if departure.room_disposed {
        return Ok((departure, None));
    }

    let transition = match room.phase {
        Phase::Selecting if departure.was_judge => match select(room, room.round, rng, words) {
            Ok(transition) => Some(transition),
            Err(err) => {
                tracing::error!(room_id = %room.id, %err, "reselecting judge failed, back to lobby");
                Some(Transition::LobbyReentered)
            }
        },
        Phase::Drawing if room.all_guessers_solved() => Some(Transition::DisclosureEntered),
        _ => None,
    };
    Ok((departure, transition))
}

// ---------------------------------------------------------------------------
// Applying
// ---------------------------------------------------------------------------

/// Moves the room into the transition's phase.
///
/// Returns the timer the new phase needs, or `None` for LOBBY and
/// DISSOLVED (the caller cancels any pending timer in that case).
pub fn apply(room: &mut Room, transition: Transition, now: Instant) -> Option<TimerSpec> {
    let phase = transition.target();
    match transition {
        Transition::SelectingEntered {
            round,
            judge_id,
            candidates,
        } => {
            if round == 1 {
                for seat in &mut room.roster {
                    seat.score = 0;
                }
            }
            for seat in &mut room.roster {
                seat.round_score = 0;
            }
            room.round = round;
            room.judge_id = Some(judge_id);
            room.candidates = candidates;
            room.secret = None;
            room.hint = None;
            room.strokes.clear();
            room.solved_by.clear();
        }
        Transition::DrawingEntered { secret, hint } => {
            room.secret = Some(secret);
            room.hint = Some(hint);
            room.candidates.clear();
            room.strokes.clear();
            room.solved_by.clear();
        }
        Transition::DisclosureEntered => {}
        Transition::LobbyReentered => {
            room.round = 0;
            room.judge_id = None;
            room.candidates.clear();
            room.secret = None;
            room.hint = None;
            room.strokes.clear();
            room.solved_by.clear();
        }
        Transition::Dissolved => {
            room.candidates.clear();
        }
    }

    room.phase = phase;
    room.phase_started_at = now;
    let after = match phase {
        Phase::Selecting => room.pact.selecting_duration(),
        Phase::Drawing => room.pact.drawing_duration(),
        Phase::Disclosure => room.pact.disclosure_duration(),
        Phase::Lobby | Phase::Dissolved => {
            room.phase_deadline = None;
            return None;
        }
    };
    room.phase_deadline = Some(now + after);
    Some(TimerSpec { phase, after })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use augur_protocol::{ConnectionId, Point, RoomId, Tool};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::{Pact, Participant, Scoring};

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn room_with(ids: &[&str], pact: Pact) -> Room {
        let mut room = Room::new(RoomId::new("r"), pact, Instant::now());
        for (i, id) in ids.iter().enumerate() {
            room.register(Participant::new(pid(id), ConnectionId::new(i as u64), *id))
                .unwrap();
        }
        room
    }

    /// A room in SELECTING with `judge` forced as the judge.
    fn selecting(ids: &[&str], judge: &str, now: Instant) -> Room {
        let mut room = room_with(ids, Pact::default());
        apply(
            &mut room,
            Transition::SelectingEntered {
                round: 1,
                judge_id: pid(judge),
                candidates: vec!["apple".into(), "kite".into(), "owl".into()],
            },
            now,
        );
        room
    }

    /// A room in DRAWING with secret "apple".
    fn drawing(ids: &[&str], judge: &str, now: Instant) -> Room {
        let mut room = selecting(ids, judge, now);
        let sealed = seal(&room, &pid(judge), "apple").unwrap();
        apply(&mut room, sealed, now);
        room
    }

    fn stroke() -> Stroke {
        Stroke {
            start: Point { x: 0.0, y: 0.0 },
            end: Point { x: 10.0, y: 10.0 },
            tool: Tool::Draw,
            width: 4.0,
            color: "#000".into(),
        }
    }

    // =====================================================================
    // begin()
    // =====================================================================

    #[test]
    fn test_begin_below_quorum_returns_quorum_not_met() {
        let room = room_with(&["a"], Pact::default());
        assert_eq!(
            begin(&room, &mut rng(), &WordBank::standard()),
            Err(RoomError::QuorumNotMet {
                present: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_begin_outside_lobby_returns_phase_mismatch() {
        let room = selecting(&["a", "b"], "a", Instant::now());
        assert!(matches!(
            begin(&room, &mut rng(), &WordBank::standard()),
            Err(RoomError::PhaseMismatch {
                expected: Phase::Lobby,
                actual: Phase::Selecting
            })
        ));
    }

    #[test]
    fn test_begin_picks_member_judge_and_distinct_candidates() {
        let room = room_with(&["a", "b", "c"], Pact::default());
        let (round, judge_id, candidates) = match begin(&room, &mut rng(), &WordBank::standard()) {
            Ok(Transition::SelectingEntered {
                round,
                judge_id,
                candidates,
            }) => (round, judge_id, candidates),
            other => panic!("expected SelectingEntered, got {other:?}"),
        };
        assert_eq!(round, 1);
        assert!(room.contains(&judge_id));
        assert_eq!(candidates.len(), 3);
        assert_ne!(candidates[0], candidates[1]);
    }

    #[test]
    fn test_select_empty_word_bank_is_internal() {
        let room = room_with(&["a", "b"], Pact::default());
        let empty = WordBank::from_words(Vec::<String>::new());
        assert!(matches!(
            begin(&room, &mut rng(), &empty),
            Err(RoomError::Internal(_))
        ));
    }

    // =====================================================================
    // apply()
    // =====================================================================

    #[test]
    fn test_apply_selecting_resets_scores_on_first_round_only() {
        let now = Instant::now();
        let mut room = room_with(&["a", "b"], Pact::default());
        room.participant_mut(&pid("a")).unwrap().score = 700;

        let spec = apply(
            &mut room,
            Transition::SelectingEntered {
                round: 1,
                judge_id: pid("a"),
                candidates: vec!["kite".into()],
            },
            now,
        );
        assert_eq!(
            spec,
            Some(TimerSpec {
                phase: Phase::Selecting,
                after: Duration::from_secs(15)
            })
        );
        assert_eq!(room.participant(&pid("a")).unwrap().score, 0);
        assert_eq!(room.phase_deadline(), Some(now + Duration::from_secs(15)));

        room.participant_mut(&pid("a")).unwrap().score = 300;
        room.participant_mut(&pid("a")).unwrap().round_score = 300;
        apply(
            &mut room,
            Transition::SelectingEntered {
                round: 2,
                judge_id: pid("b"),
                candidates: vec!["kite".into()],
            },
            now,
        );
        let a = room.participant(&pid("a")).unwrap();
        assert_eq!(a.score, 300);
        assert_eq!(a.round_score, 0);
    }

    #[test]
    fn test_apply_drawing_sets_hint_and_clears_candidates() {
        let room = drawing(&["a", "b"], "a", Instant::now());
        assert_eq!(room.phase(), Phase::Drawing);
        assert_eq!(room.secret(), Some("apple"));
        assert_eq!(room.hint(), Some("_____"));
        assert!(room.candidates().is_empty());
    }

    #[test]
    fn test_apply_lobby_and_dissolved_need_no_timer() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        assert_eq!(apply(&mut room, Transition::LobbyReentered, now), None);
        assert_eq!(room.round(), 0);
        assert!(room.judge_id().is_none());
        assert!(room.phase_deadline().is_none());

        assert_eq!(apply(&mut room, Transition::Dissolved, now), None);
        assert_eq!(room.phase(), Phase::Dissolved);
    }

    // =====================================================================
    // seal()
    // =====================================================================

    #[test]
    fn test_seal_non_judge_returns_not_judge() {
        let room = selecting(&["a", "b"], "a", Instant::now());
        assert_eq!(
            seal(&room, &pid("b"), "apple"),
            Err(RoomError::NotJudge(pid("b")))
        );
    }

    #[test]
    fn test_seal_blank_word_returns_invalid() {
        let room = selecting(&["a", "b"], "a", Instant::now());
        assert!(matches!(seal(&room, &pid("a"), "   "), Err(RoomError::Invalid(_))));
    }

    #[test]
    fn test_seal_accepts_word_outside_candidates() {
        let room = selecting(&["a", "b"], "a", Instant::now());
        assert_eq!(
            seal(&room, &pid("a"), " ice cream "),
            Ok(Transition::DrawingEntered {
                secret: "ice cream".into(),
                hint: "___ _____".into()
            })
        );
    }

    #[test]
    fn test_seal_in_drawing_returns_phase_mismatch() {
        let room = drawing(&["a", "b"], "a", Instant::now());
        assert!(matches!(
            seal(&room, &pid("a"), "kite"),
            Err(RoomError::PhaseMismatch { .. })
        ));
    }

    // =====================================================================
    // expire()
    // =====================================================================

    #[test]
    fn test_expire_selecting_seals_first_candidate() {
        let room = selecting(&["a", "b"], "a", Instant::now());
        let transition = expire(&room, Phase::Selecting, &mut rng(), &WordBank::standard()).unwrap();
        assert_eq!(
            transition,
            Some(Transition::DrawingEntered {
                secret: "apple".into(),
                hint: "_____".into()
            })
        );
    }

    #[test]
    fn test_expire_for_other_phase_is_noop() {
        let room = drawing(&["a", "b"], "a", Instant::now());
        assert_eq!(
            expire(&room, Phase::Selecting, &mut rng(), &WordBank::standard()),
            Ok(None)
        );
    }

    #[test]
    fn test_expire_disclosure_at_round_limit_dissolves() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        room.round = room.pact().round_limit;
        apply(&mut room, Transition::DisclosureEntered, now);
        assert_eq!(
            expire(&room, Phase::Disclosure, &mut rng(), &WordBank::standard()),
            Ok(Some(Transition::Dissolved))
        );
    }

    #[test]
    fn test_expire_disclosure_below_quorum_returns_to_lobby() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        apply(&mut room, Transition::DisclosureEntered, now);
        room.remove(&pid("b")).unwrap();
        assert_eq!(
            expire(&room, Phase::Disclosure, &mut rng(), &WordBank::standard()),
            Ok(Some(Transition::LobbyReentered))
        );
    }

    #[test]
    fn test_expire_disclosure_advances_round() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        apply(&mut room, Transition::DisclosureEntered, now);
        let next = expire(&room, Phase::Disclosure, &mut rng(), &WordBank::standard()).unwrap();
        assert!(matches!(
            next,
            Some(Transition::SelectingEntered { round: 2, .. })
        ));
    }

    // =====================================================================
    // guess()
    // =====================================================================

    #[test]
    fn test_guess_immediate_solve_scores_500_and_judge_bonus() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b", "c"], "a", now);
        let verdict = guess(&mut room, &pid("b"), "Apple", now).unwrap();
        assert_eq!(verdict.outcome, GuessOutcome::Solved);
        assert_eq!(verdict.points, 500);
        assert_eq!(verdict.transition, None);
        assert_eq!(room.participant(&pid("b")).unwrap().score, 500);
        assert_eq!(room.participant(&pid("a")).unwrap().score, 15);
        assert_eq!(room.solved_by(), &[pid("b")]);
    }

    #[test]
    fn test_guess_after_sixty_seconds_of_sixty_scores_base() {
        let now = Instant::now();
        let pact = Pact {
            drawing_duration_ms: 60_000,
            ..Pact::default()
        };
        let mut room = room_with(&["a", "b"], pact);
        apply(
            &mut room,
            Transition::DrawingEntered {
                secret: "apple".into(),
                hint: "_____".into(),
            },
            now,
        );
        room.judge_id = Some(pid("a"));
        let verdict = guess(&mut room, &pid("b"), "apple", now + Duration::from_secs(60)).unwrap();
        assert_eq!(verdict.points, 100);
    }

    #[test]
    fn test_guess_huge_scoring_saturates_instead_of_overflowing() {
        let now = Instant::now();
        let pact = Pact {
            scoring: Scoring {
                base: u32::MAX,
                speed_bonus: u32::MAX,
                judge_bonus: u32::MAX,
            },
            ..Pact::default()
        };
        let mut room = room_with(&["a", "b", "c"], pact);
        apply(
            &mut room,
            Transition::DrawingEntered {
                secret: "apple".into(),
                hint: "_____".into(),
            },
            now,
        );
        room.judge_id = Some(pid("a"));

        room.participant_mut(&pid("b")).unwrap().score = 1;
        guess(&mut room, &pid("b"), "apple", now).unwrap();
        guess(&mut room, &pid("c"), "apple", now).unwrap();

        assert_eq!(room.participant(&pid("b")).unwrap().score, u32::MAX);
        let judge = room.participant(&pid("a")).unwrap();
        assert_eq!(judge.score, u32::MAX);
        assert_eq!(judge.round_score, u32::MAX);
    }

    #[test]
    fn test_guess_last_solver_triggers_disclosure() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b", "c"], "a", now);
        guess(&mut room, &pid("b"), "apple", now).unwrap();
        let verdict = guess(&mut room, &pid("c"), "apple", now).unwrap();
        assert_eq!(verdict.transition, Some(Transition::DisclosureEntered));
    }

    #[test]
    fn test_guess_second_solve_is_suppressed_and_unscored() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b", "c"], "a", now);
        guess(&mut room, &pid("b"), "apple", now).unwrap();
        let again = guess(&mut room, &pid("b"), "apple", now).unwrap();
        assert_eq!(again.outcome, GuessOutcome::Suppressed);
        assert_eq!(again.points, 0);
        assert_eq!(room.participant(&pid("b")).unwrap().score, 500);
    }

    #[test]
    fn test_guess_judge_never_solves() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        let verdict = guess(&mut room, &pid("a"), "apple", now).unwrap();
        assert_eq!(verdict.outcome, GuessOutcome::Suppressed);
        assert!(room.solved_by().is_empty());
    }

    #[test]
    fn test_guess_in_lobby_is_chat_miss() {
        let mut room = room_with(&["a", "b"], Pact::default());
        let verdict = guess(&mut room, &pid("a"), "hello", Instant::now()).unwrap();
        assert_eq!(verdict.outcome, GuessOutcome::Miss);
    }

    #[test]
    fn test_guess_rejects_oversized_text() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        let long = "x".repeat(MAX_GUESS_CHARS + 1);
        assert!(matches!(
            guess(&mut room, &pid("b"), &long, now),
            Err(RoomError::Invalid(_))
        ));
    }

    #[test]
    fn test_guess_from_stranger_returns_participant_not_found() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        assert!(matches!(
            guess(&mut room, &pid("zed"), "apple", now),
            Err(RoomError::ParticipantNotFound(..))
        ));
    }

    // =====================================================================
    // strokes
    // =====================================================================

    #[test]
    fn test_append_strokes_only_from_judge() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        assert_eq!(
            append_strokes(&mut room, &pid("b"), &[stroke()]),
            Err(RoomError::NotJudge(pid("b")))
        );
        append_strokes(&mut room, &pid("a"), &[stroke(), stroke()]).unwrap();
        assert_eq!(room.strokes().len(), 2);

        clear_strokes(&mut room, &pid("a")).unwrap();
        assert!(room.strokes().is_empty());
    }

    #[test]
    fn test_append_strokes_rejects_nan_geometry() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b"], "a", now);
        let mut bad = stroke();
        bad.end.x = f32::NAN;
        assert!(matches!(
            append_strokes(&mut room, &pid("a"), &[bad]),
            Err(RoomError::Invalid(_))
        ));
    }

    #[test]
    fn test_append_strokes_outside_drawing_returns_phase_mismatch() {
        let mut room = selecting(&["a", "b"], "a", Instant::now());
        assert!(matches!(
            append_strokes(&mut room, &pid("a"), &[stroke()]),
            Err(RoomError::PhaseMismatch { .. })
        ));
    }

    // =====================================================================
    // depart()
    // =====================================================================

    #[test]
    fn test_depart_judge_while_selecting_reselects_same_round() {
        let mut room = selecting(&["a", "b", "c"], "a", Instant::now());
        let (departure, transition) =
            depart(&mut room, &pid("a"), &mut rng(), &WordBank::standard()).unwrap();
        assert!(departure.was_judge);
        let (round, judge_id) = match transition {
            Some(Transition::SelectingEntered { round, judge_id, .. }) => (round, judge_id),
            other => panic!("expected reselection, got {other:?}"),
        };
        assert_eq!(round, 1);
        assert_ne!(judge_id, pid("a"));
    }

    #[test]
    fn test_depart_judge_while_selecting_without_words_returns_to_lobby() {
        let mut room = selecting(&["a", "b", "c"], "a", Instant::now());
        let empty = WordBank::from_words(Vec::<String>::new());
        let (departure, transition) = depart(&mut room, &pid("a"), &mut rng(), &empty).unwrap();
        assert!(departure.was_judge);
        assert!(!departure.room_disposed);
        assert_eq!(transition, Some(Transition::LobbyReentered));
        assert!(!room.contains(&pid("a")));
        assert_eq!(room.judge_id(), None);
    }

    #[test]
    fn test_depart_judge_while_drawing_keeps_round_running() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b", "c"], "a", now);
        guess(&mut room, &pid("b"), "apple", now).unwrap();

        let (departure, transition) =
            depart(&mut room, &pid("a"), &mut rng(), &WordBank::standard()).unwrap();
        assert!(departure.was_judge);
        assert_eq!(transition, None);
        assert_eq!(room.phase(), Phase::Drawing);
        assert_eq!(room.judge_id(), None);
        assert_eq!(room.solved_by(), &[pid("b")]);

        let verdict = guess(&mut room, &pid("c"), "apple", now).unwrap();
        assert_eq!(verdict.outcome, GuessOutcome::Solved);
        assert_eq!(verdict.transition, Some(Transition::DisclosureEntered));
        assert_eq!(room.participant(&pid("b")).unwrap().score, 500);
        assert_eq!(room.participant(&pid("c")).unwrap().score, 500);
    }

    #[test]
    fn test_depart_last_unsolved_guesser_triggers_disclosure() {
        let now = Instant::now();
        let mut room = drawing(&["a", "b", "c"], "a", now);
        guess(&mut room, &pid("b"), "apple", now).unwrap();
        let (_, transition) = depart(&mut room, &pid("c"), &mut rng(), &WordBank::standard()).unwrap();
        assert_eq!(transition, Some(Transition::DisclosureEntered));
    }

    #[test]
    fn test_depart_in_lobby_changes_nothing() {
        let mut room = room_with(&["a", "b"], Pact::default());
        let (departure, transition) =
            depart(&mut room, &pid("b"), &mut rng(), &WordBank::standard()).unwrap();
        assert!(!departure.room_disposed);
        assert_eq!(transition, None);
        assert_eq!(room.phase(), Phase::Lobby);
    }

    #[test]
    fn test_depart_last_participant_disposes() {
        let mut room = room_with(&["a"], Pact::default());
        let (departure, transition) =
            depart(&mut room, &pid("a"), &mut rng(), &WordBank::standard()).unwrap();
        assert!(departure.room_disposed);
        assert_eq!(transition, None);
    }
}
