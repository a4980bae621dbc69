//! Speed-weighted scoring.

use std::time::Duration;

use crate::Scoring;

/// Points for a correct guess made `elapsed` into a drawing phase of
/// length `duration`.
///
/// `floor(base + remaining / duration × speed_bonus)` where `remaining`
/// never drops below zero. Integer arithmetic, so the floor is exact.
pub fn award(elapsed: Duration, duration: Duration, scoring: &Scoring) -> u32 {
    let total = duration.as_millis();
    if total == 0 {
        return scoring.base;
    }
    let remaining = duration.saturating_sub(elapsed).as_millis();
    let bonus = u128::from(scoring.speed_bonus) * remaining / total;
    // bonus <= speed_bonus, so it fits
    scoring.base.saturating_add(bonus as u32)
}
