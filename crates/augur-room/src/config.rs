//! Room configuration (the "pact" every room is created with).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Longest accepted guess or chat line, in characters.
pub const MAX_GUESS_CHARS: usize = 500;

/// Longest accepted secret word, in characters.
pub const MAX_WORD_CHARS: usize = 48;

/// Most strokes accepted in one `draw.stroke` batch.
pub const MAX_STROKES_PER_BATCH: usize = 256;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Points awarded for correct guesses.
///
/// A guesser earns `base + remaining/duration × speed_bonus` (floored); the
/// judge earns `judge_bonus` for every correct guess on their drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    pub base: u32,
    pub speed_bonus: u32,
    pub judge_bonus: u32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            base: 100,
            speed_bonus: 400,
            judge_bonus: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// Pact
// ---------------------------------------------------------------------------

/// Configuration for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pact {
    /// Participants needed before a round may start.
    pub min_to_start: usize,

    /// Hard cap on roster size.
    pub max_occupancy: usize,

    /// Rounds played before the room dissolves.
    pub round_limit: u32,

    /// How long the judge has to pick a word.
    pub selecting_duration_ms: u64,

    /// How long the drawing phase lasts.
    pub drawing_duration_ms: u64,

    /// How long the answer stays on screen.
    pub disclosure_duration_ms: u64,

    /// Candidate words offered to the judge.
    pub candidate_count: usize,

    /// Start the first round as soon as quorum is reached instead of
    /// waiting for `round.start`.
    pub auto_start: bool,

    pub scoring: Scoring,
}

impl Default for Pact {
    fn default() -> Self {
        Self {
            min_to_start: 2,
            max_occupancy: 8,
            round_limit: 5,
            selecting_duration_ms: 15_000,
            drawing_duration_ms: 80_000,
            disclosure_duration_ms: 8_000,
            candidate_count: 3,
            auto_start: false,
            scoring: Scoring::default(),
        }
    }
}

impl Pact {
    /// Most candidates a judge can be offered.
    pub const MAX_CANDIDATES: usize = 8;

    /// Largest room the engine supports.
    pub const MAX_OCCUPANCY: usize = 64;

    /// Clamp out-of-range values so the pact is safe to run.
    ///
    /// Rules:
    /// - `min_to_start` at least 1, `max_occupancy` in
    ///   `min_to_start..=MAX_OCCUPANCY`.
    /// - `round_limit` at least 1.
    /// - every phase lasts at least 1 ms.
    /// - `candidate_count` in `1..=MAX_CANDIDATES`.
    pub fn validated(mut self) -> Self {
        if self.min_to_start == 0 {
            warn!("min_to_start is 0, clamping to 1");
            self.min_to_start = 1;
        }
        if self.max_occupancy > Self::MAX_OCCUPANCY {
            warn!(
                max_occupancy = self.max_occupancy,
                cap = Self::MAX_OCCUPANCY,
                "max_occupancy exceeds cap, clamping"
            );
            self.max_occupancy = Self::MAX_OCCUPANCY;
        }
        if self.max_occupancy < self.min_to_start {
            warn!(
                max_occupancy = self.max_occupancy,
                min_to_start = self.min_to_start,
                "max_occupancy below quorum, raising"
            );
            self.max_occupancy = self.min_to_start;
        }
        if self.round_limit == 0 {
            warn!("round_limit is 0, clamping to 1");
            self.round_limit = 1;
        }
        for (name, value) in [
            ("selecting_duration_ms", &mut self.selecting_duration_ms),
            ("drawing_duration_ms", &mut self.drawing_duration_ms),
            ("disclosure_duration_ms", &mut self.disclosure_duration_ms),
        ] {
            if *value == 0 {
                warn!(field = name, "phase duration is 0, clamping to 1 ms");
                *value = 1;
            }
        }
        let clamped = self.candidate_count.clamp(1, Self::MAX_CANDIDATES);
        if clamped != self.candidate_count {
            warn!(
                candidate_count = self.candidate_count,
                clamped, "candidate_count out of range, clamping"
            );
            self.candidate_count = clamped;
        }
        self
    }

    pub fn selecting_duration(&self) -> Duration {
        Duration::from_millis(self.selecting_duration_ms)
    }

    pub fn drawing_duration(&self) -> Duration {
        Duration::from_millis(self.drawing_duration_ms)
    }

    pub fn disclosure_duration(&self) -> Duration {
        Duration::from_millis(self.disclosure_duration_ms)
    }
}
