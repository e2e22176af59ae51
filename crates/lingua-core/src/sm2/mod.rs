//! SM-2 (SuperMemo 2) Spaced Repetition Module
//!
//! Decides, for each learned word, when it should next be reviewed and how
//! a review outcome changes its memory strength.
//!
//! ## Quality scale
//! - 0: complete blackout
//! - 1: incorrect, answer felt familiar once shown
//! - 2: incorrect, answer seemed easy once shown
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect recall
//!
//! ## Core formulas
//! - Ease: EF' = max(1.3, EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))), only for q >= 3
//! - Interval: 1, 6, then round(prev * EF') where prev = round(6 * EF^(level-2))

mod algorithm;
mod scheduler;

pub use algorithm::{
    add_days,
    clamp_quality,
    format_interval,
    // Core functions
    next_ease_factor,
    reconstruct_previous_interval,
    round_days,
    // Constants
    FIRST_INTERVAL_DAYS,
    INITIAL_EASE_FACTOR,
    MAX_QUALITY,
    MIN_EASE_FACTOR,
    MIN_QUALITY,
    PASSING_QUALITY,
    RELEARN_INTERVAL_DAYS,
    SECOND_INTERVAL_DAYS,
};

pub use scheduler::{
    compute_next_state, is_due, MemoryState, PreviewResults, Quality, ReviewScheduler,
};
