//! Reading a chat line as a guess.
//!
//! [`interpret`] is pure and total: it never fails and never touches the
//! room. Scoring and broadcasting happen in the engine based on its answer.

use augur_protocol::{GuessOutcome, ParticipantId, Phase};

use crate::Room;

/// Placeholder for each hidden character of the hint.
pub const HINT_GLYPH: char = '_';

/// Lowercases and trims a guess or secret for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Masks a secret: every character becomes [`HINT_GLYPH`] except spaces.
pub fn mask(secret: &str) -> String {
    secret
        .chars()
        .map(|c| if c == ' ' { ' ' } else { HINT_GLYPH })
        .collect()
}

/// Classifies `text` from `participant_id` against the room's secret.
///
/// Order of checks:
/// 1. not drawing, no secret, unknown participant, or blank text → `Miss`
/// 2. the judge, or someone who already solved → `Suppressed`
/// 3. equal after [`normalize`] → `Solved`
/// 4. the secret contains the guess and their lengths differ by at most
///    one character → `CloseHint`
/// 5. anything else → `Miss`
pub fn interpret(room: &Room, participant_id: &ParticipantId, text: &str) -> GuessOutcome {
    let secret = match room.secret() {
        Some(secret) if room.phase() == Phase::Drawing => secret,
        _ => return GuessOutcome::Miss,
    };
    let guess = normalize(text);
    if guess.is_empty() || !room.contains(participant_id) {
        return GuessOutcome::Miss;
    }

    if room.is_judge(participant_id) || room.has_solved(participant_id) {
        return GuessOutcome::Suppressed;
    }

    let secret = normalize(secret);
    if guess == secret {
        return GuessOutcome::Solved;
    }

    let gap = secret.chars().count().abs_diff(guess.chars().count());
    if gap < 2 && secret.contains(&guess) {
        GuessOutcome::CloseHint
    } else {
        GuessOutcome::Miss
    }
}

#[cfg(test)]
mod tests {
    use augur_protocol::{ConnectionId, RoomId};
    use tokio::time::Instant;

    use super::*;
    use crate::{Pact, Participant};

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    /// A drawing room: `a` judges, `b` and `c` guess, secret "Apple".
    fn drawing_room() -> Room {
        let mut room = Room::new(RoomId::new("r"), Pact::default(), Instant::now());
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            room.register(Participant::new(pid(id), ConnectionId::new(i as u64), *id))
                .unwrap();
        }
        room.phase = Phase::Drawing;
        room.judge_id = Some(pid("a"));
        room.secret = Some("Apple".into());
        room.hint = Some(mask("Apple"));
        room
    }

    #[test]
    fn test_mask_keeps_spaces() {
        assert_eq!(mask("apple"), "_____");
        assert_eq!(mask("ice cream"), "___ _____");
        assert_eq!(mask("déjà"), "____");
    }

    #[test]
    fn test_interpret_normalizes_case_and_whitespace() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("b"), "  ApPLE "), GuessOutcome::Solved);
    }

    #[test]
    fn test_interpret_judge_is_suppressed_even_when_exact() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("a"), "apple"), GuessOutcome::Suppressed);
        assert_eq!(interpret(&room, &pid("a"), "nice one"), GuessOutcome::Suppressed);
    }

    #[test]
    fn test_interpret_solver_is_suppressed() {
        let mut room = drawing_room();
        room.solved_by.push(pid("b"));
        assert_eq!(interpret(&room, &pid("b"), "apple"), GuessOutcome::Suppressed);
    }

    #[test]
    fn test_interpret_close_hint_within_one_char() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("b"), "appl"), GuessOutcome::CloseHint);
        assert_eq!(interpret(&room, &pid("b"), "pple"), GuessOutcome::CloseHint);
    }

    #[test]
    fn test_interpret_substring_too_short_is_miss() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("b"), "app"), GuessOutcome::Miss);
    }

    #[test]
    fn test_interpret_near_but_not_substring_is_miss() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("b"), "apply"), GuessOutcome::Miss);
    }

    #[test]
    fn test_interpret_outside_drawing_is_miss() {
        let mut room = drawing_room();
        room.phase = Phase::Disclosure;
        assert_eq!(interpret(&room, &pid("b"), "apple"), GuessOutcome::Miss);
    }

    #[test]
    fn test_interpret_non_member_is_miss() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("zed"), "apple"), GuessOutcome::Miss);
    }

    #[test]
    fn test_interpret_blank_is_miss() {
        let room = drawing_room();
        assert_eq!(interpret(&room, &pid("b"), "   "), GuessOutcome::Miss);
    }
}
