//! Organizing vocabulary: several dictionaries, tags, activation, backup

use chrono::Duration;
use lingua_core::{NewWord, Storage, DEFAULT_LEARNED_LEVEL};
use lingua_e2e_tests::{TestDataFactory, TestDatabaseManager};

#[test]
fn test_inactive_dictionary_is_paused_not_lost() {
    let db = TestDatabaseManager::new_temp();
    let travel = db.add_dictionary("Travel");
    TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let travel_words = TestDataFactory::add_batch(&db.storage, &travel.id, 4);
    let now = TestDataFactory::epoch();

    let all = db.storage.words_due_for_review(&db.user.id, now, 100).unwrap();
    assert_eq!(all.len(), 12);

    db.storage.set_dictionary_active(&travel.id, false).unwrap();
    let active_only = db.storage.words_due_for_review(&db.user.id, now, 100).unwrap();
    assert_eq!(active_only.len(), 8);
    assert!(active_only.iter().all(|w| w.dictionary_id == db.dictionary.id));
    assert_eq!(db.stats(now).due_words, 8);

    // Explicit selection still reaches the paused dictionary
    let explicit = db
        .storage
        .words_for_learning(&db.user.id, Some(std::slice::from_ref(&travel.id)), now, 100)
        .unwrap();
    assert_eq!(explicit.len(), travel_words.len());

    db.storage.set_dictionary_active(&travel.id, true).unwrap();
    assert_eq!(
        db.storage.words_due_for_review(&db.user.id, now, 100).unwrap().len(),
        12
    );
}

#[test]
fn test_tags_span_dictionaries() {
    let db = TestDatabaseManager::new_temp();
    let verbs = db.add_dictionary("Verbs");
    let nouns = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let run = db
        .storage
        .add_word(NewWord::new(&verbs.id, "run", "бежать").with_example("I run daily", None))
        .unwrap();

    let basic = db.storage.create_tag(&db.user.id, "basic", None).unwrap();
    let daily = db.storage.create_tag(&db.user.id, "daily", Some("#2196F3")).unwrap();
    db.storage
        .set_word_tags(&nouns[0].id, &[basic.id.clone()])
        .unwrap();
    db.storage
        .set_word_tags(&run.id, &[basic.id.clone(), daily.id.clone()])
        .unwrap();

    assert_eq!(db.storage.words_by_tag(&basic.id).unwrap().len(), 2);
    let either = db
        .storage
        .words_by_tags(&db.user.id, &[basic.id.clone(), daily.id.clone()])
        .unwrap();
    assert_eq!(either.len(), 2);

    let with_tags = db.storage.get_word_with_tags(&run.id).unwrap().unwrap();
    assert_eq!(with_tags.tags.len(), 2);

    // Replacing the set drops the old links
    db.storage.set_word_tags(&run.id, &[]).unwrap();
    assert!(db.storage.tags_for_word(&run.id).unwrap().is_empty());
    assert_eq!(db.storage.words_by_tag(&daily.id).unwrap().len(), 0);
}

#[test]
fn test_delete_dictionary_updates_stats() {
    let db = TestDatabaseManager::new_temp();
    let extra = db.add_dictionary("Scratch");
    let words = TestDataFactory::add_batch(&db.storage, &extra.id, 3);
    let now = TestDataFactory::epoch();
    for word in &words {
        db.storage.record_answer(&word.id, 4, now).unwrap();
    }
    assert_eq!(db.stats(now).reviewed_words, 3);

    assert!(db.storage.delete_dictionary(&extra.id).unwrap());
    let stats = db.stats(now);
    assert_eq!(stats.total_dictionaries, 1);
    assert_eq!(stats.total_words, 0);
    assert_eq!(stats.reviewed_words, 0);
    assert!(stats.average_ease_factor.is_none());
}

#[test]
fn test_backup_restores_progress() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    let start = TestDataFactory::epoch();
    let history = TestDataFactory::review_on_schedule(&db.storage, &words[0].id, &[5, 5], start);

    let backup_path = db.path().with_file_name("backup.db");
    db.storage.backup_to(&backup_path).unwrap();

    let restored = Storage::new(Some(backup_path)).unwrap();
    let state = restored.get_progress(&words[0].id).unwrap().unwrap();
    assert_eq!(&state, history.last().unwrap());
    assert_eq!(
        state.next_review_due_at,
        start + Duration::days(1) + Duration::days(6)
    );
    let progress = restored
        .get_dictionary_progress(&db.dictionary.id, DEFAULT_LEARNED_LEVEL)
        .unwrap();
    assert_eq!(progress.total_words as usize, words.len());
}

#[test]
fn test_word_with_progress_serializes_camel_case() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::add_vocabulary(&db.storage, &db.dictionary.id);
    db.storage
        .record_answer(&words[1].id, 3, TestDataFactory::epoch())
        .unwrap();

    let details = db.storage.get_word_with_progress(&words[1].id).unwrap().unwrap();
    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["word"]["mainTranslation"], "кошка");
    assert_eq!(json["word"]["additionalTranslations"][0], "кот");
    assert_eq!(json["progress"]["repetitionLevel"], 1);
    assert!(json["progress"]["nextReviewDueAt"].is_string());
}
