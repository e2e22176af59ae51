//! SM-2 Scheduler
//!
//! Turns a word's prior memory state plus one quality rating into the next
//! memory state. The scheduler never reads the clock: callers pass `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{
    add_days, clamp_quality, next_ease_factor, reconstruct_previous_interval, round_days,
    FIRST_INTERVAL_DAYS, INITIAL_EASE_FACTOR, MAX_QUALITY, MIN_EASE_FACTOR, PASSING_QUALITY,
    RELEARN_INTERVAL_DAYS, SECOND_INTERVAL_DAYS,
};

// ============================================================================
// QUALITY
// ============================================================================

/// Recall quality on the classic 0-5 SM-2 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    /// Complete blackout, no recall
    pub const BLACKOUT: Quality = Quality(0);
    /// Incorrect, but the answer felt familiar once shown
    pub const FAMILIAR: Quality = Quality(1);
    /// Incorrect, but the answer seemed easy to recall once shown
    pub const ALMOST: Quality = Quality(2);
    /// Correct with serious difficulty
    pub const DIFFICULT: Quality = Quality(3);
    /// Correct after hesitation
    pub const HESITANT: Quality = Quality(4);
    /// Perfect, effortless recall
    pub const PERFECT: Quality = Quality(5);

    /// Rating recorded when the learner says they knew the word
    pub const KNEW_IT: Quality = Quality::HESITANT;
    /// Rating recorded when the learner forgot or skipped the word
    pub const FORGOT: Quality = Quality::FAMILIAR;

    /// Build a quality from any integer, clamping into `[0, 5]`
    pub fn new(raw: i32) -> Self {
        Quality(clamp_quality(raw))
    }

    /// All six qualities in ascending order
    pub fn all() -> [Quality; 6] {
        [
            Quality::BLACKOUT,
            Quality::FAMILIAR,
            Quality::ALMOST,
            Quality::DIFFICULT,
            Quality::HESITANT,
            Quality::PERFECT,
        ]
    }

    /// Numeric value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this counts as a successful recall
    pub fn is_pass(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl From<i32> for Quality {
    fn from(raw: i32) -> Self {
        Quality::new(raw)
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// MEMORY STATE
// ============================================================================

/// Memory strength of one learnable item
///
/// Absence of a state means the item was never reviewed and is due now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// Consecutive successful recalls since the last failure
    pub repetition_level: u32,
    /// Interval growth multiplier, never below 1.3
    pub ease_factor: f64,
    /// Lifetime successful recalls
    pub correct_count: u32,
    /// Lifetime failed recalls
    pub incorrect_count: u32,
    /// Interval scheduled by the most recent review (days)
    pub interval_days: u32,
    /// When the item was last reviewed
    pub last_reviewed_at: DateTime<Utc>,
    /// When the item becomes due again
    pub next_review_due_at: DateTime<Utc>,
}

impl MemoryState {
    /// Total number of reviews recorded
    pub fn total_reviews(&self) -> u32 {
        self.correct_count.saturating_add(self.incorrect_count)
    }

    /// Whether the item is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_due_at <= now
    }

    /// Caller-side "learned" interpretation of the streak
    pub fn is_learned(&self, threshold: u32) -> bool {
        self.repetition_level >= threshold
    }

    /// Share of reviews that were successful, 0.0 when never reviewed
    pub fn accuracy(&self) -> f64 {
        match self.total_reviews() {
            0 => 0.0,
            total => f64::from(self.correct_count) / f64::from(total),
        }
    }
}

/// Whether an item with optional state is due at `now`
pub fn is_due(state: Option<&MemoryState>, now: DateTime<Utc>) -> bool {
    state.is_none_or(|s| s.is_due(now))
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// SM-2 review scheduler
///
/// Holds the tunable constants; [`ReviewScheduler::default`] reproduces the
/// classic SM-2 values. The scheduler is `Copy` and has no interior state,
/// so it can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewScheduler {
    /// Ease factor for items without prior state
    pub initial_ease: f64,
    /// Lower bound for the ease factor; values below 1.3 are raised to 1.3
    pub min_ease: f64,
    /// Interval after the first success (days)
    pub first_interval: u32,
    /// Interval after the second consecutive success (days)
    pub second_interval: u32,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self {
            initial_ease: INITIAL_EASE_FACTOR,
            min_ease: MIN_EASE_FACTOR,
            first_interval: FIRST_INTERVAL_DAYS,
            second_interval: SECOND_INTERVAL_DAYS,
        }
    }
}

impl ReviewScheduler {
    /// Create a scheduler with the classic SM-2 constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the state that follows one review
    ///
    /// `prior` is `None` on an item's first review. `quality` is clamped into
    /// `[0, 5]`. The prior state is never modified.
    pub fn compute_next_state(
        &self,
        prior: Option<&MemoryState>,
        quality: impl Into<Quality>,
        now: DateTime<Utc>,
    ) -> MemoryState {
        let quality = quality.into();
        let q = quality.value();

        let min_ease = self.min_ease.max(MIN_EASE_FACTOR);
        let ease0 = prior
            .map_or(self.initial_ease, |s| s.ease_factor)
            .max(min_ease);
        let level0 = prior.map_or(0, |s| s.repetition_level);
        let ease1 = next_ease_factor(ease0, q, min_ease);

        let (level, interval_days) = if !quality.is_pass() {
            (0, RELEARN_INTERVAL_DAYS)
        } else {
            match level0 {
                0 => (1, self.first_interval),
                1 => (2, self.second_interval),
                _ => {
                    let previous =
                        reconstruct_previous_interval(level0, ease0, self.second_interval);
                    (
                        level0.saturating_add(1),
                        round_days(f64::from(previous) * ease1),
                    )
                }
            }
        };

        let (correct_count, incorrect_count) = {
            let correct = prior.map_or(0, |s| s.correct_count);
            let incorrect = prior.map_or(0, |s| s.incorrect_count);
            if quality.is_pass() {
                (correct.saturating_add(1), incorrect)
            } else {
                (correct, incorrect.saturating_add(1))
            }
        };

        MemoryState {
            repetition_level: level,
            ease_factor: ease1,
            correct_count,
            incorrect_count,
            interval_days,
            last_reviewed_at: now,
            next_review_due_at: add_days(now, interval_days),
        }
    }

    /// Preview the outcome of every quality without committing to one
    pub fn preview(&self, prior: Option<&MemoryState>, now: DateTime<Utc>) -> PreviewResults {
        let outcomes = Quality::all().map(|q| self.compute_next_state(prior, q, now));
        PreviewResults { outcomes }
    }
}

/// Compute the next state with the default scheduler
pub fn compute_next_state(
    prior: Option<&MemoryState>,
    quality: i32,
    now: DateTime<Utc>,
) -> MemoryState {
    ReviewScheduler::default().compute_next_state(prior, quality, now)
}

/// The state each quality rating would produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResults {
    /// Indexed by quality value 0..=5
    pub outcomes: [MemoryState; MAX_QUALITY as usize + 1],
}

impl PreviewResults {
    /// Outcome for a specific quality
    pub fn for_quality(&self, quality: Quality) -> &MemoryState {
        &self.outcomes[quality.value() as usize]
    }

    /// Scheduled interval per quality, indexed by quality value
    pub fn intervals(&self) -> [u32; MAX_QUALITY as usize + 1] {
        self.outcomes.each_ref().map(|s| s.interval_days)
    }
}
