//! Learner journey: add vocabulary, study due words, come back tomorrow

use chrono::Duration;
use lingua_core::{LearningSession, Quality, SessionType, DEFAULT_LEARNED_LEVEL};
use lingua_e2e_tests::{mocks::ReviewScenario, TestDataFactory, TestDatabaseManager};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_first_session_then_next_day() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();

    // Everything is new, so everything is due
    assert_eq!(db.stats(start).due_words, words.len() as i64);

    let batch = db
        .storage
        .words_for_learning(&db.user.id, None, start, 5)
        .unwrap();
    assert_eq!(batch.len(), 5);
    assert!(batch.iter().all(|w| w.progress.is_none()));

    let mut session = LearningSession::new(batch, SessionType::FlashCards);
    session.shuffle(&mut StdRng::seed_from_u64(42));
    while !session.is_complete() {
        session.reveal();
        let event = session.answer(true).unwrap();
        assert_eq!(event.quality, Quality::KNEW_IT);
        let state = db
            .storage
            .record_answer(&event.word_id, event.quality, start)
            .unwrap();
        assert_eq!(state.repetition_level, 1);
        assert_eq!(state.next_review_due_at, start + Duration::days(1));
    }

    let summary = session.summary();
    assert_eq!(summary.correct, 5);
    assert_eq!(summary.accuracy_percent, 100.0);

    // Same instant: only the untouched words remain
    let stats = db.stats(start);
    assert_eq!(stats.reviewed_words, 5);
    assert_eq!(stats.total_correct, 5);
    assert_eq!(stats.due_words, (words.len() - 5) as i64);

    // Next day the reviewed words are back, new words still lead the queue
    let tomorrow = start + Duration::days(1);
    let due = db
        .storage
        .words_for_learning(&db.user.id, None, tomorrow, 20)
        .unwrap();
    assert_eq!(due.len(), words.len());
    assert!(due[..words.len() - 5].iter().all(|w| w.progress.is_none()));
    assert!(due[words.len() - 5..].iter().all(|w| w.progress.is_some()));
}

#[test]
fn test_written_session_grades_answers() {
    let db = TestDatabaseManager::new_temp();
    TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();

    let batch = db
        .storage
        .words_for_learning(&db.user.id, None, start, 20)
        .unwrap();
    let mut session = LearningSession::new(batch, SessionType::WriteTranslation);

    let mut knew = 0;
    while let Some(current) = session.current() {
        // Answer with the last accepted translation; get every third one wrong
        let answer = if session.position() % 3 == 0 {
            "неправильно".to_string()
        } else {
            current.word.all_translations().last().unwrap().to_uppercase()
        };
        let (_, event) = session.submit(&answer).unwrap();
        if event.quality.is_pass() {
            knew += 1;
        }
        db.storage
            .record_answer(&event.word_id, event.quality, start)
            .unwrap();
    }

    let summary = session.summary();
    assert_eq!(summary.correct, knew);
    assert_eq!(summary.correct + summary.incorrect, summary.total);

    let stats = db.stats(start);
    assert_eq!(stats.total_correct as usize, summary.correct);
    assert_eq!(stats.total_incorrect as usize, summary.incorrect);
}

#[test]
fn test_learned_scenario_moves_dictionary_progress() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();

    let state = TestDataFactory::apply_scenario(
        &db.storage,
        &words[0].id,
        ReviewScenario::Learned,
        start,
    )
    .unwrap();
    assert_eq!(state.repetition_level, 3);
    assert!(state.is_learned(DEFAULT_LEARNED_LEVEL));

    let progress = db
        .storage
        .get_dictionary_progress(&db.dictionary.id, DEFAULT_LEARNED_LEVEL)
        .unwrap();
    assert_eq!(progress.learned_words, 1);
    assert_eq!(progress.total_words as usize, words.len());
    assert!((progress.progress_percent - 100.0 / words.len() as f64).abs() < 1e-9);
}

#[test]
fn test_struggling_word_keeps_coming_back() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();

    let history = TestDataFactory::review_on_schedule(
        &db.storage,
        &words[1].id,
        ReviewScenario::Struggling.qualities(),
        start,
    );
    let last = history.last().unwrap();
    assert_eq!(last.repetition_level, 0);
    assert_eq!(last.interval_days, 1);
    assert_eq!(last.correct_count, 1);
    assert_eq!(last.incorrect_count, 3);
    // Failures never touch the ease factor
    assert!(history.iter().all(|s| (s.ease_factor - 2.5).abs() < 1e-9));

    // Due again the day after the last failure
    let due = db
        .storage
        .words_due_for_review(&db.user.id, last.next_review_due_at, 20)
        .unwrap();
    assert!(due.iter().any(|w| w.id == words[1].id));
}

#[test]
fn test_progress_survives_reopen() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();
    let state = db.storage.record_answer(&words[2].id, 5, start).unwrap();

    let reopened = db.reopen();
    assert_eq!(reopened.get_progress(&words[2].id).unwrap(), Some(state));
}
