//! SM-2 core formulas
//!
//! Stateless numeric building blocks used by [`super::ReviewScheduler`].
//! Every function here is pure and total: out-of-range inputs are clamped
//! and date overflow saturates, nothing returns an error.

use chrono::{DateTime, Days, Utc};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease factor assigned to an item on its first review
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Floor for the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Interval after the first successful recall (days)
pub const FIRST_INTERVAL_DAYS: u32 = 1;

/// Interval after the second consecutive successful recall (days)
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Interval scheduled after a failed recall (days)
pub const RELEARN_INTERVAL_DAYS: u32 = 1;

/// Lowest quality on the SM-2 scale
pub const MIN_QUALITY: u8 = 0;

/// Highest quality on the SM-2 scale
pub const MAX_QUALITY: u8 = 5;

/// Qualities at or above this value count as a successful recall
pub const PASSING_QUALITY: u8 = 3;

// ============================================================================
// FORMULAS
// ============================================================================

/// Clamp a raw rating into `[0, 5]`
pub fn clamp_quality(raw: i32) -> u8 {
    raw.clamp(MIN_QUALITY as i32, MAX_QUALITY as i32) as u8
}

/// SM-2 ease factor update
///
/// `EF' = max(min_ease, EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)))`
///
/// Failed recalls (`q < 3`) leave the ease factor untouched.
pub fn next_ease_factor(ease_factor: f64, quality: u8, min_ease: f64) -> f64 {
    if quality < PASSING_QUALITY {
        return ease_factor;
    }
    let distance = f64::from(MAX_QUALITY - quality.min(MAX_QUALITY));
    let updated = ease_factor + (0.1 - distance * (0.08 + distance * 0.02));
    updated.max(min_ease)
}

/// Round to the nearest whole day, halves away from zero
///
/// Results are saturated into `u32`; negative or NaN inputs become 0.
pub fn round_days(value: f64) -> u32 {
    // `as` saturates on overflow and maps NaN to 0
    value.round() as u32
}

/// Re-derive the interval that preceded a streak of `level` successes
///
/// Level 2 always followed the fixed six-day step. Longer streaks assume the
/// ease factor stayed at `ease_factor` for every step after that.
pub fn reconstruct_previous_interval(level: u32, ease_factor: f64, second_interval: u32) -> u32 {
    if level <= 2 {
        return second_interval;
    }
    let exponent = (level - 2).min(i32::MAX as u32) as i32;
    round_days(f64::from(second_interval) * ease_factor.powi(exponent))
}

/// Add whole calendar days to an instant
///
/// Saturates at the latest representable instant instead of overflowing.
pub fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Format an interval in days as a short human-readable string
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
