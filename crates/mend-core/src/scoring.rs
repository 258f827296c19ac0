//! Run scoring.
//!
//! Pure function over elapsed time and iteration count. The final value is
//! deliberately unclamped in both directions.

use serde::{Deserialize, Serialize};

/// Base component awarded to every run.
const BASE_SCORE: i64 = 100;

/// Bonus awarded when the run finishes inside this many seconds.
const SPEED_BONUS_WINDOW_SECS: u64 = 300;

/// Bonus value for fast runs.
const SPEED_BONUS: i64 = 10;

/// Iterations allowed before the efficiency penalty starts accruing.
const PENALTY_FREE_ITERATIONS: i64 = 20;

/// Penalty per iteration beyond the free budget.
const PENALTY_PER_ITERATION: i64 = 2;

/// Score breakdown for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub base: i64,
    pub speed_bonus: i64,
    pub efficiency_penalty: i64,
    pub final_score: i64,
}

/// Compute the score for a run.
///
/// `base = 100`; `speed_bonus = 10` iff `total_seconds < 300`;
/// `efficiency_penalty = max(0, (iterations_used - 20) * 2)`;
/// `final = base + speed_bonus - efficiency_penalty`.
pub fn score(total_seconds: u64, iterations_used: u32) -> Score {
    let speed_bonus = if total_seconds < SPEED_BONUS_WINDOW_SECS {
        SPEED_BONUS
    } else {
        0
    };
    let efficiency_penalty =
        ((iterations_used as i64 - PENALTY_FREE_ITERATIONS) * PENALTY_PER_ITERATION).max(0);

    Score {
        base: BASE_SCORE,
        speed_bonus,
        efficiency_penalty,
        final_score: BASE_SCORE + speed_bonus - efficiency_penalty,
    }
}
