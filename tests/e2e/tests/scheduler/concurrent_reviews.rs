//! Reviews recorded from several threads against one storage

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use lingua_core::Storage;
use lingua_e2e_tests::{TestDataFactory, TestDatabaseManager};

const THREADS: usize = 8;
const REVIEWS_PER_THREAD: usize = 25;

#[test]
fn test_same_word_reviews_are_not_lost() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_batch(&db.storage, &db.dictionary.id, 1);
    let word_id = words[0].id.clone();
    let start = TestDataFactory::epoch();
    let storage = Arc::new(db.reopen());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let storage = Arc::clone(&storage);
            let word_id = word_id.clone();
            thread::spawn(move || {
                for i in 0..REVIEWS_PER_THREAD {
                    let now = start + Duration::seconds((t * REVIEWS_PER_THREAD + i) as i64);
                    storage.record_answer(&word_id, 4, now).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let state = storage.get_progress(&word_id).unwrap().unwrap();
    let total = (THREADS * REVIEWS_PER_THREAD) as u32;
    assert_eq!(state.correct_count, total);
    assert_eq!(state.incorrect_count, 0);
    assert_eq!(state.repetition_level, total);
    // q=4 leaves the ease factor where it started
    assert!((state.ease_factor - 2.5).abs() < 1e-9);
}

#[test]
fn test_parallel_reviews_of_different_words() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_batch(&db.storage, &db.dictionary.id, THREADS);
    let start = TestDataFactory::epoch();
    let storage: Arc<Storage> = Arc::new(db.reopen());

    let handles: Vec<_> = words
        .iter()
        .enumerate()
        .map(|(t, word)| {
            let storage = Arc::clone(&storage);
            let word_id = word.id.clone();
            thread::spawn(move || {
                // Even threads pass, odd threads fail
                let quality = if t % 2 == 0 { 5 } else { 1 };
                for _ in 0..3 {
                    storage.record_answer(&word_id, quality, start).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for (t, word) in words.iter().enumerate() {
        let state = storage.get_progress(&word.id).unwrap().unwrap();
        if t % 2 == 0 {
            assert_eq!(state.correct_count, 3);
            assert_eq!(state.repetition_level, 3);
        } else {
            assert_eq!(state.incorrect_count, 3);
            assert_eq!(state.repetition_level, 0);
            assert_eq!(state.next_review_due_at, start + Duration::days(1));
        }
    }

    let stats = storage
        .get_stats(&db.user.id, start, lingua_core::DEFAULT_LEARNED_LEVEL)
        .unwrap();
    assert_eq!(stats.reviewed_words, THREADS as i64);
    assert_eq!(stats.total_correct, (THREADS / 2 * 3) as i64);
    assert_eq!(stats.total_incorrect, (THREADS / 2 * 3) as i64);
}
