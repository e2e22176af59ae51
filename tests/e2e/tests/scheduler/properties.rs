//! SM-2 properties over long random review histories

use chrono::{DateTime, Days, Duration, Utc};
use lingua_core::{compute_next_state, MemoryState, ReviewScheduler, MIN_EASE_FACTOR};
use lingua_e2e_tests::{TestDataFactory, TestDatabaseManager};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_history(seed: u64, len: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-2..=7)).collect()
}

#[test]
fn test_invariants_hold_for_random_histories() {
    let start = TestDataFactory::epoch();

    for seed in 0..50 {
        let mut prior: Option<MemoryState> = None;
        let mut now = start;

        for raw in random_history(seed, 40) {
            let before = prior.clone();
            let next = compute_next_state(prior.as_ref(), raw, now);
            let q = raw.clamp(0, 5);

            assert!(next.ease_factor >= MIN_EASE_FACTOR);
            assert!(next.next_review_due_at >= next.last_reviewed_at);
            assert_eq!(next.last_reviewed_at, now);
            assert!(next.interval_days >= 1);
            // Long streaks saturate at the end of representable time
            let expected_due = now
                .checked_add_days(Days::new(u64::from(next.interval_days)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            assert_eq!(next.next_review_due_at, expected_due);

            let (c0, i0) = before
                .as_ref()
                .map_or((0, 0), |s| (s.correct_count, s.incorrect_count));
            if q < 3 {
                assert_eq!(next.repetition_level, 0);
                assert_eq!(next.interval_days, 1);
                assert_eq!((next.correct_count, next.incorrect_count), (c0, i0 + 1));
                let ease0 = before.as_ref().map_or(2.5, |s| s.ease_factor);
                assert_eq!(next.ease_factor, ease0);
            } else {
                let level0 = before.as_ref().map_or(0, |s| s.repetition_level);
                assert_eq!(next.repetition_level, level0 + 1);
                assert_eq!((next.correct_count, next.incorrect_count), (c0 + 1, i0));
            }

            // The prior value is never modified
            assert_eq!(prior, before);

            now += Duration::hours(i64::from(raw.unsigned_abs()) * 7 + 1);
            prior = Some(next);
        }
    }
}

#[test]
fn test_storage_matches_pure_scheduler() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_batch(&db.storage, &db.dictionary.id, 5);
    let scheduler = ReviewScheduler::default();
    let start = TestDataFactory::epoch();

    for (i, word) in words.iter().enumerate() {
        let history = random_history(100 + i as u64, 8);
        let mut expected: Option<MemoryState> = None;
        let mut now = start;
        for quality in history {
            expected = Some(scheduler.compute_next_state(expected.as_ref(), quality, now));
            let stored = db.storage.record_answer(&word.id, quality, now).unwrap();
            assert_eq!(Some(&stored), expected.as_ref());
            now = stored.next_review_due_at;
        }
        assert_eq!(db.storage.get_progress(&word.id).unwrap(), expected);
    }
}

#[test]
fn test_perfect_streak_grows_monotonically() {
    let start = TestDataFactory::epoch();
    let mut prior = None;
    let mut last_interval = 0;
    let mut now = start;

    for _ in 0..12 {
        let next = compute_next_state(prior.as_ref(), 5, now);
        assert!(next.interval_days >= last_interval);
        last_interval = next.interval_days;
        now = next.next_review_due_at;
        prior = Some(next);
    }

    // Ease climbs by 0.1 per perfect answer
    let ease = prior.unwrap().ease_factor;
    assert!((ease - (2.5 + 12.0 * 0.1)).abs() < 1e-9);
}

#[test]
fn test_ease_floor_under_repeated_hard_passes() {
    let start = TestDataFactory::epoch();
    let mut prior = None;
    for _ in 0..30 {
        prior = Some(compute_next_state(prior.as_ref(), 3, start));
    }
    let state = prior.unwrap();
    assert_eq!(state.ease_factor, MIN_EASE_FACTOR);
    assert_eq!(state.repetition_level, 30);
}
