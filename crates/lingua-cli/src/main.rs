//! Lingua CLI
//!
//! Command-line interface for dictionaries, words, tags and review sessions.

mod learn;

use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use lingua_core::{
    format_interval, Config, Dictionary, DictionaryType, MemoryState, NewDictionary, NewWord,
    Quality, SessionType, Storage, Tag, User, UserSettings, Word, WordWithProgress,
};
use tracing_subscriber::EnvFilter;

/// Lingua - vocabulary trainer with SM-2 spaced repetition
#[derive(Parser)]
#[command(name = "lingua")]
#[command(author = "Lingua Franca Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Learn vocabulary from personal dictionaries with spaced repetition")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the database (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the learner profile
    Init {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Language being learned (ISO 639-1)
        #[arg(long)]
        target: Option<String>,
        /// Native language (ISO 639-1)
        #[arg(long)]
        native: Option<String>,
    },

    /// Manage dictionaries
    Dict {
        #[command(subcommand)]
        command: DictCommand,
    },

    /// Manage words
    Word {
        #[command(subcommand)]
        command: WordCommand,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },

    /// Start an interactive learning session over due words
    Learn {
        /// flash, write-word or write-translation
        #[arg(long, default_value = "flash")]
        mode: SessionType,
        /// Maximum words in the session (defaults to config)
        #[arg(long)]
        limit: Option<u32>,
        /// Only these dictionaries (name or id, repeatable)
        #[arg(long = "dict")]
        dicts: Vec<String>,
    },

    /// Record a single review for a word
    Review {
        /// Word id or original
        word: String,
        /// Recall quality 0-5 (values outside are clamped)
        #[arg(allow_negative_numbers = true)]
        quality: i32,
    },

    /// List words due for review
    Due {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show where each rating would schedule a word
    Preview {
        /// Word id or original
        word: String,
    },

    /// Show learning statistics
    Stats,

    /// Create a consistent copy of the database
    Backup {
        /// Output file path for the backup
        output: PathBuf,
    },

    /// Export dictionaries, words, tags and progress as JSON
    Export {
        /// Output file path
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum DictCommand {
    /// Create a dictionary
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// custom, franco or community
        #[arg(long = "type", default_value = "custom")]
        dictionary_type: DictionaryType,
    },
    /// List dictionaries with progress
    List,
    /// Show a dictionary and its words
    Show { dict: String },
    /// Rename a dictionary
    Rename { dict: String, new_name: String },
    /// Include a dictionary in reviews
    Activate { dict: String },
    /// Exclude a dictionary from reviews
    Deactivate { dict: String },
    /// Delete a dictionary and all its words
    Delete {
        dict: String,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum WordCommand {
    /// Add a word to a dictionary
    Add {
        /// Dictionary name or id
        dict: String,
        original: String,
        translation: String,
        /// Additional accepted translation (repeatable)
        #[arg(long)]
        also: Vec<String>,
        /// Example sentence, optionally "sentence|translation" (repeatable)
        #[arg(long)]
        example: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Tag name, created if missing (repeatable)
        #[arg(long)]
        tag: Vec<String>,
    },
    /// List words of a dictionary
    List { dict: String },
    /// Show a word with tags and progress
    Show { word: String },
    /// Delete a word
    Delete { word: String },
    /// Search words by original, translation or notes
    Search {
        query: String,
        /// Restrict to one dictionary
        #[arg(long)]
        dict: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagCommand {
    /// Create a tag
    Add {
        name: String,
        /// Hex color, #RRGGBB
        #[arg(long)]
        color: Option<String>,
    },
    /// List tags
    List,
    /// Delete a tag
    Delete { tag: String },
    /// Attach a tag to a word
    Assign { word: String, tag: String },
    /// Detach a tag from a word
    Remove { word: String, tag: String },
}

/// Opened storage plus resolved configuration
struct App {
    storage: Storage,
    config: Config,
}

impl App {
    fn open(config: Config) -> anyhow::Result<Self> {
        let storage = Storage::new(config.db_path()).context("Failed to open database")?;
        Ok(Self { storage, config })
    }

    fn current_user(&self) -> anyhow::Result<User> {
        self.storage
            .get_current_user()?
            .ok_or_else(|| anyhow!("No learner profile yet. Run `lingua init` first."))
    }

    fn resolve_dictionary(&self, user: &User, key: &str) -> anyhow::Result<Dictionary> {
        if let Some(dictionary) = self.storage.get_dictionary(key)?
            && dictionary.user_id == user.id
        {
            return Ok(dictionary);
        }
        self.storage
            .find_dictionary_by_name(&user.id, key)?
            .ok_or_else(|| anyhow!("No dictionary named '{}'", key))
    }

    fn resolve_tag(&self, user: &User, key: &str) -> anyhow::Result<Tag> {
        if let Some(tag) = self.storage.get_tag(key)?
            && tag.user_id == user.id
        {
            return Ok(tag);
        }
        self.storage
            .find_tag_by_name(&user.id, key)?
            .ok_or_else(|| anyhow!("No tag named '{}'", key))
    }

    /// Accepts a word id, or an original that matches exactly one word
    fn resolve_word(&self, user: &User, key: &str) -> anyhow::Result<Word> {
        if let Some(word) = self.storage.get_word(key)? {
            return Ok(word);
        }
        let mut matches: Vec<Word> = self
            .storage
            .search_words(&user.id, key)?
            .into_iter()
            .filter(|w| w.matches_original(key))
            .collect();
        match matches.len() {
            0 => bail!("No word '{}'", key),
            1 => Ok(matches.remove(0)),
            n => bail!("'{}' matches {} words, use the word id", key, n),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    init_tracing(&config.log_filter);

    let app = App::open(config)?;

    match cli.command {
        Commands::Init {
            email,
            name,
            target,
            native,
        } => run_init(&app, email, name, target, native),
        Commands::Dict { command } => run_dict(&app, command),
        Commands::Word { command } => run_word(&app, command),
        Commands::Tag { command } => run_tag(&app, command),
        Commands::Learn { mode, limit, dicts } => run_learn(&app, mode, limit, dicts),
        Commands::Review { word, quality } => run_review(&app, word, quality),
        Commands::Due { limit } => run_due(&app, limit),
        Commands::Preview { word } => run_preview(&app, word),
        Commands::Stats => run_stats(&app),
        Commands::Backup { output } => run_backup(&app, output),
        Commands::Export { output } => run_export(&app, output),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over the configured filter
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Ask a yes/no question on stdin
fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn format_when(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if at <= now {
        "now".to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Print a progress bar
fn print_progress_bar(label: &str, percentage: f64, detail: &str) {
    let bar_width: usize = 30;
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = if percentage >= 70.0 {
        bar.green()
    } else if percentage >= 30.0 {
        bar.yellow()
    } else {
        bar.red()
    };

    println!("  {:20} [{}] {:>5.1}% {}", label, colored_bar, percentage, detail.dimmed());
}

fn print_progress(state: Option<&MemoryState>, now: DateTime<Utc>) {
    match state {
        None => println!("{}: {}", "Progress".white().bold(), "new, due now".yellow()),
        Some(state) => {
            println!("{}: {}", "Level".white().bold(), state.repetition_level);
            println!("{}: {:.2}", "Ease".white().bold(), state.ease_factor);
            println!(
                "{}: {} correct / {} incorrect ({:.0}%)",
                "Answers".white().bold(),
                state.correct_count,
                state.incorrect_count,
                state.accuracy() * 100.0
            );
            println!(
                "{}: {} (interval {})",
                "Next Review".white().bold(),
                format_when(state.next_review_due_at, now),
                format_interval(state.interval_days)
            );
        }
    }
}

fn word_line(word: &Word) -> String {
    format!(
        "{} {} {}",
        word.original.bold(),
        "->".dimmed(),
        word.all_translations().join(", ")
    )
}

// ============================================================================
// INIT
// ============================================================================

fn run_init(
    app: &App,
    email: String,
    name: String,
    target: Option<String>,
    native: Option<String>,
) -> anyhow::Result<()> {
    if let Some(existing) = app.storage.get_current_user()? {
        bail!(
            "Profile already exists for {} <{}>",
            existing.display_name,
            existing.email
        );
    }

    let user = app.storage.create_user(&email, &name)?;
    let settings = UserSettings {
        target_language: target.unwrap_or_else(|| app.config.default_target_language.clone()),
        native_language: native.unwrap_or_else(|| app.config.default_native_language.clone()),
        ..UserSettings::new(&user.id)
    };
    app.storage.save_user_settings(&settings)?;

    println!(
        "{}",
        format!(
            "Welcome, {}! Learning {} from {}.",
            user.display_name, settings.target_language, settings.native_language
        )
        .green()
        .bold()
    );
    println!("Create a dictionary with: lingua dict add <name>");
    Ok(())
}

// ============================================================================
// DICTIONARIES
// ============================================================================

fn run_dict(app: &App, command: DictCommand) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let learned_level = app.config.learned_level;

    match command {
        DictCommand::Add {
            name,
            description,
            dictionary_type,
        } => {
            if app.storage.find_dictionary_by_name(&user.id, &name)?.is_some() {
                bail!("Dictionary '{}' already exists", name.trim());
            }
            let dictionary = app.storage.create_dictionary(NewDictionary {
                user_id: user.id.clone(),
                name,
                description,
                dictionary_type,
            })?;
            println!(
                "{} {} ({})",
                "Created".green(),
                dictionary.name.bold(),
                dictionary.id.dimmed()
            );
        }
        DictCommand::List => {
            let dictionaries = app
                .storage
                .list_dictionaries_with_progress(&user.id, learned_level)?;
            println!("{}", "=== Dictionaries ===".cyan().bold());
            if dictionaries.is_empty() {
                println!("{}", "No dictionaries yet.".dimmed());
            }
            for entry in &dictionaries {
                let label = if entry.dictionary.is_active {
                    entry.dictionary.name.clone()
                } else {
                    format!("{} (off)", entry.dictionary.name)
                };
                print_progress_bar(
                    &label,
                    entry.progress.progress_percent,
                    &format!(
                        "{}/{} learned",
                        entry.progress.learned_words, entry.progress.total_words
                    ),
                );
            }
        }
        DictCommand::Show { dict } => {
            let dictionary = app.resolve_dictionary(&user, &dict)?;
            let progress = app
                .storage
                .get_dictionary_progress(&dictionary.id, learned_level)?;
            println!("{}", format!("=== {} ===", dictionary.name).cyan().bold());
            println!("{}: {}", "Id".white().bold(), dictionary.id);
            println!("{}: {}", "Type".white().bold(), dictionary.dictionary_type);
            println!(
                "{}: {}",
                "Active".white().bold(),
                if dictionary.is_active { "yes".green() } else { "no".red() }
            );
            if !dictionary.description.is_empty() {
                println!("{}: {}", "Description".white().bold(), dictionary.description);
            }
            println!(
                "{}: {}/{} learned ({:.1}%)",
                "Progress".white().bold(),
                progress.learned_words,
                progress.total_words,
                progress.progress_percent
            );
            println!();
            for word in app.storage.list_words(&dictionary.id)? {
                println!("  {}", word_line(&word));
            }
        }
        DictCommand::Rename { dict, new_name } => {
            let mut dictionary = app.resolve_dictionary(&user, &dict)?;
            let old_name = std::mem::replace(&mut dictionary.name, new_name);
            let updated = app.storage.update_dictionary(&dictionary)?;
            println!("{} {} -> {}", "Renamed".green(), old_name, updated.name.bold());
        }
        DictCommand::Activate { dict } => set_active(app, &user, &dict, true)?,
        DictCommand::Deactivate { dict } => set_active(app, &user, &dict, false)?,
        DictCommand::Delete { dict, yes } => {
            let dictionary = app.resolve_dictionary(&user, &dict)?;
            let count = app.storage.word_count(&dictionary.id)?;
            if !yes
                && !confirm(&format!(
                    "Delete '{}' and its {} word(s)?",
                    dictionary.name, count
                ))?
            {
                println!("{}", "Cancelled.".dimmed());
                return Ok(());
            }
            app.storage.delete_dictionary(&dictionary.id)?;
            println!("{} {}", "Deleted".red(), dictionary.name);
        }
    }
    Ok(())
}

fn set_active(app: &App, user: &User, key: &str, active: bool) -> anyhow::Result<()> {
    let dictionary = app.resolve_dictionary(user, key)?;
    app.storage.set_dictionary_active(&dictionary.id, active)?;
    if active {
        println!("{} {} is included in reviews", "On".green(), dictionary.name.bold());
    } else {
        println!("{} {} is skipped by reviews", "Off".yellow(), dictionary.name.bold());
    }
    Ok(())
}

// ============================================================================
// WORDS
// ============================================================================

/// "sentence" or "sentence|translation"
fn parse_example(raw: &str) -> (String, Option<String>) {
    match raw.split_once('|') {
        Some((sentence, translation)) if !translation.trim().is_empty() => {
            (sentence.trim().to_string(), Some(translation.trim().to_string()))
        }
        Some((sentence, _)) => (sentence.trim().to_string(), None),
        None => (raw.trim().to_string(), None),
    }
}

fn run_word(app: &App, command: WordCommand) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let now = Utc::now();

    match command {
        WordCommand::Add {
            dict,
            original,
            translation,
            also,
            example,
            notes,
            tag,
        } => {
            let dictionary = app.resolve_dictionary(&user, &dict)?;
            let mut input = NewWord::new(&dictionary.id, original, translation);
            for alternative in also {
                input = input.with_translation(alternative);
            }
            for raw in &example {
                let (sentence, translated) = parse_example(raw);
                input = input.with_example(sentence, translated);
            }
            if let Some(notes) = notes {
                input = input.with_notes(notes);
            }
            let word = app.storage.add_word(input)?;

            let mut tag_ids = Vec::with_capacity(tag.len());
            for name in &tag {
                let found = match app.storage.find_tag_by_name(&user.id, name)? {
                    Some(existing) => existing,
                    None => app.storage.create_tag(&user.id, name, None)?,
                };
                tag_ids.push(found.id);
            }
            if !tag_ids.is_empty() {
                app.storage.set_word_tags(&word.id, &tag_ids)?;
            }

            println!(
                "{} {} in {} ({})",
                "Added".green(),
                word_line(&word),
                dictionary.name.bold(),
                word.id.dimmed()
            );
        }
        WordCommand::List { dict } => {
            let dictionary = app.resolve_dictionary(&user, &dict)?;
            let words = app.storage.list_words(&dictionary.id)?;
            println!("{}", format!("=== {} ===", dictionary.name).cyan().bold());
            if words.is_empty() {
                println!("{}", "No words yet.".dimmed());
            }
            for word in &words {
                let status = match app.storage.get_progress(&word.id)? {
                    None => "new".yellow().to_string(),
                    Some(state) if state.is_learned(app.config.learned_level) => {
                        "learned".green().to_string()
                    }
                    Some(state) => format!("level {}", state.repetition_level),
                };
                println!("  {} [{}] {}", word_line(word), status, word.id.dimmed());
            }
        }
        WordCommand::Show { word } => {
            let word = app.resolve_word(&user, &word)?;
            let Some(details) = app.storage.get_word_with_progress(&word.id)? else {
                bail!("No word '{}'", word.id);
            };
            print_word_details(&details, now);
        }
        WordCommand::Delete { word } => {
            let word = app.resolve_word(&user, &word)?;
            app.storage.delete_word(&word.id)?;
            println!("{} {}", "Deleted".red(), word_line(&word));
        }
        WordCommand::Search { query, dict } => {
            let words = match dict {
                Some(key) => {
                    let dictionary = app.resolve_dictionary(&user, &key)?;
                    app.storage.search_words_in_dictionary(&dictionary.id, &query)?
                }
                None => app.storage.search_words(&user.id, &query)?,
            };
            println!("{}", format!("=== Search: {} ===", query).cyan().bold());
            if words.is_empty() {
                println!("{}", "No matches.".dimmed());
            }
            for word in &words {
                println!("  {} {}", word_line(word), word.id.dimmed());
            }
        }
    }
    Ok(())
}

fn print_word_details(details: &WordWithProgress, now: DateTime<Utc>) {
    let word = &details.word;
    println!("{}", format!("=== {} ===", word.original).cyan().bold());
    println!("{}: {}", "Id".white().bold(), word.id);
    println!("{}: {}", "Translation".white().bold(), word.main_translation);
    if !word.additional_translations.is_empty() {
        println!(
            "{}: {}",
            "Also".white().bold(),
            word.additional_translations.join(", ")
        );
    }
    if !details.tags.is_empty() {
        let names: Vec<&str> = details.tags.iter().map(|t| t.name.as_str()).collect();
        println!("{}: {}", "Tags".white().bold(), names.join(", "));
    }
    if !word.notes.is_empty() {
        println!("{}: {}", "Notes".white().bold(), word.notes);
    }
    for (sentence, translation) in &word.examples {
        match translation {
            Some(t) => println!("  {} {}", sentence.italic(), format!("({})", t).dimmed()),
            None => println!("  {}", sentence.italic()),
        }
    }
    print_progress(details.progress.as_ref(), now);
}

// ============================================================================
// TAGS
// ============================================================================

fn run_tag(app: &App, command: TagCommand) -> anyhow::Result<()> {
    let user = app.current_user()?;

    match command {
        TagCommand::Add { name, color } => {
            if app.storage.find_tag_by_name(&user.id, &name)?.is_some() {
                bail!("Tag '{}' already exists", name.trim());
            }
            let tag = app.storage.create_tag(&user.id, &name, color.as_deref())?;
            println!("{} {} {}", "Created".green(), tag.name.bold(), tag.color.dimmed());
        }
        TagCommand::List => {
            println!("{}", "=== Tags ===".cyan().bold());
            let tags = app.storage.list_tags(&user.id)?;
            if tags.is_empty() {
                println!("{}", "No tags yet.".dimmed());
            }
            for tag in &tags {
                let count = app.storage.words_by_tag(&tag.id)?.len();
                println!("  {:20} {} {} word(s)", tag.name, tag.color.dimmed(), count);
            }
        }
        TagCommand::Delete { tag } => {
            let tag = app.resolve_tag(&user, &tag)?;
            app.storage.delete_tag(&tag.id)?;
            println!("{} {}", "Deleted".red(), tag.name);
        }
        TagCommand::Assign { word, tag } => {
            let word = app.resolve_word(&user, &word)?;
            let tag = app.resolve_tag(&user, &tag)?;
            if app.storage.tag_word(&word.id, &tag.id)? {
                println!("{} {} -> {}", "Tagged".green(), word.original, tag.name.bold());
            } else {
                println!("{}", "Already tagged.".dimmed());
            }
        }
        TagCommand::Remove { word, tag } => {
            let word = app.resolve_word(&user, &word)?;
            let tag = app.resolve_tag(&user, &tag)?;
            if app.storage.untag_word(&word.id, &tag.id)? {
                println!("{} {} from {}", "Untagged".yellow(), tag.name, word.original);
            } else {
                println!("{}", "Tag was not attached.".dimmed());
            }
        }
    }
    Ok(())
}

// ============================================================================
// LEARNING
// ============================================================================

fn run_learn(
    app: &App,
    mode: SessionType,
    limit: Option<u32>,
    dicts: Vec<String>,
) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let limit = limit.unwrap_or(app.config.session_size);

    let dictionary_ids = dicts
        .iter()
        .map(|key| app.resolve_dictionary(&user, key).map(|d| d.id))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let filter = (!dictionary_ids.is_empty()).then_some(dictionary_ids.as_slice());

    let words = app
        .storage
        .words_for_learning(&user.id, filter, Utc::now(), limit)?;
    if words.is_empty() {
        println!("{}", "Nothing is due. Come back later!".green());
        return Ok(());
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let summary = learn::run_session(
        &app.storage,
        words,
        mode,
        &mut rand::thread_rng(),
        &mut stdin.lock(),
        &mut stdout.lock(),
    )?;
    tracing::info!(
        correct = summary.correct,
        incorrect = summary.incorrect,
        "Session finished"
    );
    Ok(())
}

fn run_review(app: &App, word: String, quality: i32) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let word = app.resolve_word(&user, &word)?;
    let quality = Quality::new(quality);
    let state = app.storage.record_answer(&word.id, quality, Utc::now())?;

    let verdict = if quality.is_pass() {
        "Recalled".green()
    } else {
        "Forgotten".red()
    };
    println!(
        "{} {} (quality {}): next review in {}",
        verdict,
        word.original.bold(),
        quality,
        format_interval(state.interval_days)
    );
    Ok(())
}

fn run_due(app: &App, limit: Option<u32>) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let now = Utc::now();
    let limit = limit.unwrap_or(app.config.session_size);
    let words = app.storage.words_for_learning(&user.id, None, now, limit)?;

    println!("{}", "=== Due for Review ===".cyan().bold());
    if words.is_empty() {
        println!("{}", "Nothing is due.".dimmed());
    }
    for item in &words {
        let status = match &item.progress {
            None => "new".yellow().to_string(),
            Some(state) => format!(
                "due since {}",
                state.next_review_due_at.format("%Y-%m-%d")
            ),
        };
        println!("  {} [{}] {}", word_line(&item.word), status, item.word.id.dimmed());
    }
    Ok(())
}

fn run_preview(app: &App, word: String) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let word = app.resolve_word(&user, &word)?;
    let now = Utc::now();
    let prior = app.storage.get_progress(&word.id)?;
    let preview = app.storage.scheduler().preview(prior.as_ref(), now);

    println!("{}", format!("=== Preview: {} ===", word.original).cyan().bold());
    print_progress(prior.as_ref(), now);
    println!();
    for quality in Quality::all() {
        let outcome = preview.for_quality(quality);
        let label = if quality.is_pass() {
            format!("{}", quality).green()
        } else {
            format!("{}", quality).red()
        };
        println!(
            "  {} -> level {}, ease {:.2}, next in {}",
            label,
            outcome.repetition_level,
            outcome.ease_factor,
            format_interval(outcome.interval_days)
        );
    }
    Ok(())
}

// ============================================================================
// STATISTICS & MAINTENANCE
// ============================================================================

fn run_stats(app: &App) -> anyhow::Result<()> {
    let user = app.current_user()?;
    let now = Utc::now();
    let stats = app
        .storage
        .get_stats(&user.id, now, app.config.learned_level)?;

    println!("{}", "=== Lingua Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Dictionaries".white().bold(), stats.total_dictionaries);
    println!("{}: {}", "Words".white().bold(), stats.total_words);
    println!("{}: {}", "Reviewed".white().bold(), stats.reviewed_words);
    println!("{}: {}", "Learned".white().bold(), stats.learned_words);
    println!("{}: {}", "Due Now".white().bold(), stats.due_words);
    println!(
        "{}: {:.1}% ({} correct / {} incorrect)",
        "Accuracy".white().bold(),
        stats.accuracy_percent(),
        stats.total_correct,
        stats.total_incorrect
    );
    if let Some(ease) = stats.average_ease_factor {
        println!("{}: {:.2}", "Average Ease".white().bold(), ease);
    }

    let dictionaries = app
        .storage
        .list_dictionaries_with_progress(&user.id, app.config.learned_level)?;
    if !dictionaries.is_empty() {
        println!();
        println!("{}", "=== Dictionary Progress ===".yellow().bold());
        for entry in &dictionaries {
            print_progress_bar(
                &entry.dictionary.name,
                entry.progress.progress_percent,
                &format!(
                    "{}/{}",
                    entry.progress.learned_words, entry.progress.total_words
                ),
            );
        }
    }
    Ok(())
}

fn run_backup(app: &App, output: PathBuf) -> anyhow::Result<()> {
    println!("{}", "=== Lingua Backup ===".cyan().bold());

    if output.exists() {
        bail!("Refusing to overwrite existing file: {}", output.display());
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    app.storage
        .backup_to(&output)
        .with_context(|| format!("Backup to {} failed", output.display()))?;

    let file_size = std::fs::metadata(&output)?.len();
    println!(
        "{}",
        format!("Backup complete: {} ({})", output.display(), format_size(file_size))
            .green()
            .bold()
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", bytes)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument {
    version: &'static str,
    exported_at: DateTime<Utc>,
    user: User,
    settings: Option<UserSettings>,
    tags: Vec<Tag>,
    dictionaries: Vec<ExportDictionary>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDictionary {
    dictionary: Dictionary,
    words: Vec<WordWithProgress>,
}

fn run_export(app: &App, output: PathBuf) -> anyhow::Result<()> {
    println!("{}", "=== Lingua Export ===".cyan().bold());
    let user = app.current_user()?;

    let mut dictionaries = Vec::new();
    let mut word_total = 0;
    for dictionary in app.storage.list_dictionaries(&user.id)? {
        let words = app
            .storage
            .list_words(&dictionary.id)?
            .into_iter()
            .map(|word| {
                app.storage
                    .get_word_with_progress(&word.id)?
                    .ok_or_else(|| anyhow!("Word {} vanished during export", word.id))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        word_total += words.len();
        dictionaries.push(ExportDictionary { dictionary, words });
    }

    let document = ExportDocument {
        version: lingua_core::VERSION,
        exported_at: Utc::now(),
        settings: app.storage.get_user_settings(&user.id)?,
        tags: app.storage.list_tags(&user.id)?,
        user,
        dictionaries,
    };

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&output)
        .with_context(|| format!("Cannot create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    println!(
        "{}",
        format!(
            "Exported {} dictionaries, {} words to {}",
            document.dictionaries.len(),
            word_total,
            output.display()
        )
        .green()
        .bold()
    );
    Ok(())
}
