//! Interactive learning loop over stdin/stdout

use std::io::{self, BufRead, Write};

use chrono::Utc;
use colored::Colorize;
use lingua_core::{
    format_interval, AnswerCheck, LearningSession, ReviewEvent, SessionSummary, SessionType,
    Storage, WordWithProgress,
};
use rand::Rng;

const QUIT: &str = ":q";
const SKIP: &str = ":s";

/// Read one trimmed line, None on end of input
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Run a session to completion (or until the learner quits)
///
/// Every answer is recorded immediately, so quitting midway keeps the
/// reviews done so far.
pub fn run_session<G, R, W>(
    storage: &Storage,
    words: Vec<WordWithProgress>,
    mode: SessionType,
    rng: &mut G,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<SessionSummary>
where
    G: Rng + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut session = LearningSession::new(words, mode);
    session.shuffle(rng);

    writeln!(
        out,
        "{}",
        format!("=== Learning: {} word(s), {} ===", session.len(), mode)
            .cyan()
            .bold()
    )?;
    writeln!(out, "{}", format!("{} skip, {} quit", SKIP, QUIT).dimmed())?;

    while let Some(prompt) = session.prompt().map(str::to_string) {
        writeln!(out)?;
        writeln!(
            out,
            "[{}/{}] {}",
            session.position() + 1,
            session.len(),
            prompt.bold()
        )?;

        let step = if mode.is_written() {
            written_answer(&mut session, input, out)?
        } else {
            flash_card(&mut session, input, out)?
        };
        let Some(event) = step else {
            break;
        };

        let state = storage.record_answer(&event.word_id, event.quality, Utc::now())?;
        writeln!(
            out,
            "{}",
            format!("next review in {}", format_interval(state.interval_days)).dimmed()
        )?;
    }

    let summary = session.summary();
    writeln!(out)?;
    writeln!(out, "{}", "=== Session Summary ===".cyan().bold())?;
    writeln!(
        out,
        "{}: {}  {}: {}  {}: {:.0}%",
        "Correct".green().bold(),
        summary.correct,
        "Incorrect".red().bold(),
        summary.incorrect,
        "Accuracy".white().bold(),
        summary.accuracy_percent
    )?;
    if !session.is_complete() {
        writeln!(
            out,
            "{}",
            format!("{} word(s) left for next time", session.remaining()).dimmed()
        )?;
    }
    out.flush()?;
    Ok(summary)
}

fn show_answer<W: Write>(session: &LearningSession, out: &mut W) -> io::Result<()> {
    if let Some(answer) = session.expected_answer() {
        writeln!(out, "  {} {}", "=".dimmed(), answer.green())?;
    }
    if let Some(current) = session.current() {
        for (sentence, translation) in &current.word.examples {
            match translation {
                Some(t) => writeln!(out, "  {} {}", sentence.italic(), format!("({})", t).dimmed())?,
                None => writeln!(out, "  {}", sentence.italic())?,
            }
        }
    }
    Ok(())
}

/// Reveal, then let the learner judge themselves
fn flash_card<R: BufRead, W: Write>(
    session: &mut LearningSession,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Option<ReviewEvent>> {
    write!(out, "{}", "Enter to reveal > ".dimmed())?;
    out.flush()?;
    match read_line(input)?.as_deref() {
        None | Some(QUIT) => return Ok(None),
        Some(SKIP) => return Ok(session.skip()),
        Some(_) => {}
    }

    session.reveal();
    show_answer(session, out)?;

    loop {
        write!(out, "Did you know it? [y/n] ")?;
        out.flush()?;
        match read_line(input)?.map(|l| l.to_lowercase()).as_deref() {
            None | Some(QUIT) => return Ok(None),
            Some(SKIP) => return Ok(session.skip()),
            Some("y") | Some("yes") => return Ok(session.answer(true)),
            Some("n") | Some("no") => return Ok(session.answer(false)),
            Some(_) => continue,
        }
    }
}

/// Type the answer; prefixes of an accepted answer get another try
fn written_answer<R: BufRead, W: Write>(
    session: &mut LearningSession,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Option<ReviewEvent>> {
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        match line.as_str() {
            QUIT => return Ok(None),
            SKIP | "" => {
                show_answer(session, out)?;
                return Ok(session.skip());
            }
            _ => {}
        }

        match session.check_input(&line) {
            AnswerCheck::Partial => {
                writeln!(out, "{}", "Almost, keep going".yellow())?;
            }
            AnswerCheck::Correct => {
                writeln!(out, "{}", "Correct!".green().bold())?;
                return Ok(session.submit(&line).map(|(_, event)| event));
            }
            AnswerCheck::Incorrect | AnswerCheck::Empty => {
                writeln!(out, "{}", "Incorrect".red().bold())?;
                show_answer(session, out)?;
                return Ok(session.submit(&line).map(|(_, event)| event));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::{NewDictionary, NewWord, Quality};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;
    use tempfile::{tempdir, TempDir};

    fn setup(words: &[(&str, &str)]) -> (Storage, Vec<WordWithProgress>, TempDir) {
        let dir = tempdir().unwrap();
        let storage = Storage::new(Some(dir.path().join("learn.db"))).unwrap();
        let user = storage.create_user("kim@example.com", "Kim").unwrap();
        let dictionary = storage
            .create_dictionary(NewDictionary::new(&user.id, "Basics"))
            .unwrap();
        for (original, translation) in words {
            storage
                .add_word(NewWord::new(&dictionary.id, *original, *translation))
                .unwrap();
        }
        let due = storage
            .words_for_learning(&user.id, None, Utc::now(), 20)
            .unwrap();
        (storage, due, dir)
    }

    #[test]
    fn test_flash_session_records_every_answer() {
        let (storage, words, _dir) = setup(&[("cat", "кошка"), ("dog", "собака")]);
        let ids: Vec<String> = words.iter().map(|w| w.word.id.clone()).collect();

        let mut input = Cursor::new("\ny\n\nn\n");
        let mut out = Vec::new();
        let summary = run_session(
            &storage,
            words,
            SessionType::FlashCards,
            &mut StdRng::seed_from_u64(3),
            &mut input,
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.correct, 1);
        assert_eq!(summary.incorrect, 1);
        for id in &ids {
            assert!(storage.get_progress(id).unwrap().is_some());
        }
    }

    #[test]
    fn test_written_session_retries_partial_answers() {
        let (storage, words, _dir) = setup(&[("house", "дом")]);
        let id = words[0].word.id.clone();

        let mut input = Cursor::new("до\nДОМ\n");
        let mut out = Vec::new();
        let summary = run_session(
            &storage,
            words,
            SessionType::WriteTranslation,
            &mut StdRng::seed_from_u64(1),
            &mut input,
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.correct, 1);
        let state = storage.get_progress(&id).unwrap().unwrap();
        assert_eq!(state.correct_count, 1);
        assert_eq!(state.repetition_level, 1);
    }

    #[test]
    fn test_skip_counts_as_forgotten() {
        let (storage, words, _dir) = setup(&[("tree", "дерево")]);
        let id = words[0].word.id.clone();

        let mut input = Cursor::new(":s\n");
        let mut out = Vec::new();
        run_session(
            &storage,
            words,
            SessionType::WriteWord,
            &mut StdRng::seed_from_u64(1),
            &mut input,
            &mut out,
        )
        .unwrap();

        let state = storage.get_progress(&id).unwrap().unwrap();
        assert_eq!(state.incorrect_count, 1);
        assert_eq!(state.repetition_level, 0);
        assert!(Quality::FORGOT.value() < 3);
    }

    #[test]
    fn test_quit_keeps_words_unreviewed() {
        let (storage, words, _dir) = setup(&[("sun", "солнце"), ("moon", "луна")]);
        let ids: Vec<String> = words.iter().map(|w| w.word.id.clone()).collect();

        let mut input = Cursor::new(":q\n");
        let mut out = Vec::new();
        let summary = run_session(
            &storage,
            words,
            SessionType::FlashCards,
            &mut StdRng::seed_from_u64(9),
            &mut input,
            &mut out,
        )
        .unwrap();

        assert_eq!(summary.correct + summary.incorrect, 0);
        for id in &ids {
            assert!(storage.get_progress(id).unwrap().is_none());
        }
    }
}
