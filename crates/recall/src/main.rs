//! Recall CLI - notes and spaced-repetition flashcards in a local database.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use recall_core::{
    parse_human_date, Difficulty, Error, Flashcard, FlashcardFilter, NewFlashcard, NewNote,
    NoteFilter, RecallService, UpdateFlashcard,
};
use recall_sqlite::SqliteDatabase;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const RECALL_DIR: &str = ".recall";
const DB_FILE: &str = "recall.sqlite";

/// The CLI is single-user; every record belongs to this id.
const LOCAL_USER: &str = "local";

type Service = RecallService<SqliteDatabase>;

#[derive(Parser)]
#[command(name = "recall", about = "Notes and spaced-repetition flashcards", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new recall database in the current directory
    Init {
        /// Delete existing database and reinitialize
        #[arg(long)]
        reinitialize: bool,
    },
    /// Add a new flashcard
    Add {
        /// Question side
        #[arg(long)]
        question: String,
        /// Answer side (reads from stdin if not provided)
        #[arg(long)]
        answer: Option<String>,
        /// Subject the card belongs to
        #[arg(long)]
        subject: String,
        /// easy, medium or hard
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Note the card was made from
        #[arg(long)]
        note: Option<i64>,
    },
    /// List flashcards
    Ls {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Match any of these words in question, answer or subject
        #[arg(long)]
        search: Option<String>,
        /// Only cards that are due now
        #[arg(long)]
        due: bool,
    },
    /// Show one or more flashcards
    Show {
        /// Comma-separated card IDs
        ids: String,
    },
    /// Edit a flashcard
    Edit {
        /// Card ID
        id: i64,
        #[arg(long)]
        question: Option<String>,
        /// New answer (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        answer: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
    /// Delete one or more flashcards
    Rm {
        /// Comma-separated card IDs
        ids: String,
    },
    /// Record a review of a flashcard
    Review {
        /// Card ID
        id: i64,
        /// How it went: easy, medium or hard
        rating: String,
        /// Pretend the review happens at this time (e.g., "tomorrow", "in 3 days")
        #[arg(long)]
        at: Option<String>,
    },
    /// Show today's review queue
    Daily {
        /// Build the queue as of this time instead of now
        #[arg(long)]
        at: Option<String>,
    },
    /// List all subjects that have notes
    Subjects,
    /// Manage study notes
    #[command(subcommand)]
    Note(NoteCommands),
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a new note
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: String,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Attached file, by path or URL
        #[arg(long)]
        file: Option<String>,
        /// Note content (reads from stdin if not provided)
        #[arg(long)]
        content: Option<String>,
    },
    /// List notes
    Ls {
        #[arg(long)]
        subject: Option<String>,
        /// Match any of these words in title, content, subject or tags
        #[arg(long)]
        search: Option<String>,
        /// Number of notes to show (0 for all)
        #[arg(short = 'n', long, default_value = "100")]
        head: usize,
    },
    /// Show one or more notes
    Show {
        /// Comma-separated note IDs
        ids: String,
        /// Only show the first n lines of each note
        #[arg(short = 'n', long)]
        head: Option<usize>,
    },
    /// Delete one or more notes
    Rm {
        /// Comma-separated note IDs
        ids: String,
    },
}

/// Find the .recall directory by searching up from current directory
fn find_recall_dir() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let recall_path = current.join(RECALL_DIR);
        if recall_path.is_dir() {
            return Some(recall_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn get_recall_dir() -> Result<PathBuf> {
    match find_recall_dir() {
        Some(dir) => Ok(dir),
        None => bail!("No .recall directory found. Run 'recall init' to initialize a new database."),
    }
}

fn open_database(recall_dir: &Path) -> Result<SqliteDatabase> {
    SqliteDatabase::open(recall_dir.join(DB_FILE)).context("Failed to open database")
}

fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_ids(ids: &str) -> Result<Vec<i64>> {
    let ids = ids
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().context(format!("Invalid ID: {}", s)))
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        bail!("No IDs provided");
    }
    Ok(ids)
}

fn parse_when(at: Option<String>) -> Result<DateTime<Local>> {
    match at {
        Some(s) => match parse_human_date(&s, Local::now()) {
            Some(when) => Ok(when),
            None => bail!("Could not understand the time '{}'", s),
        },
        None => Ok(Local::now()),
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn describe_due(card: &Flashcard) -> String {
    match card.next_review {
        None => "new".to_string(),
        Some(next) => format!("due {}", next.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
    }
}

fn print_card_line(card: &Flashcard) {
    println!(
        "{}: [{}/{}] {} ({})",
        card.id,
        card.subject,
        card.difficulty,
        card.question,
        describe_due(card)
    );
}

/// Report ids that were not found and exit non-zero if there were any.
fn exit_if_missing(kind: &str, not_found: &[i64]) {
    if not_found.is_empty() {
        return;
    }
    for id in not_found {
        eprintln!("{} {} not found", kind, id);
    }
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { reinitialize } = cli.command {
        let recall_dir = PathBuf::from(RECALL_DIR);

        if recall_dir.join(DB_FILE).exists() {
            if reinitialize {
                std::fs::remove_dir_all(&recall_dir)
                    .context("Failed to remove existing .recall directory")?;
            } else {
                bail!("Recall is already initialized in this directory. Use --reinitialize to delete and recreate.");
            }
        }

        std::fs::create_dir_all(&recall_dir).context("Failed to create .recall directory")?;
        let _db = open_database(&recall_dir)?;

        if reinitialize {
            println!("Reinitialized recall database in {}", recall_dir.display());
        } else {
            println!("Initialized recall database in {}", recall_dir.display());
        }
        return Ok(());
    }

    // All other commands need the database
    let recall_dir = get_recall_dir()?;
    let service = RecallService::new(open_database(&recall_dir)?);

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Add {
            question,
            answer,
            subject,
            difficulty,
            note,
        } => {
            let answer = match answer {
                Some(a) => a,
                None => read_stdin()?,
            };
            let card = service
                .create_flashcard(
                    LOCAL_USER,
                    NewFlashcard {
                        question,
                        answer,
                        subject,
                        difficulty,
                        note_id: note,
                    },
                )
                .await?;
            println!("Added flashcard {}", card.id);
        }

        Commands::Ls {
            subject,
            difficulty,
            search,
            due,
        } => {
            let filter = FlashcardFilter {
                subject,
                difficulty,
                search,
                due_only: due,
            };
            for card in service.list_flashcards(LOCAL_USER, filter).await? {
                print_card_line(&card);
            }
        }

        Commands::Show { ids } => {
            let mut not_found = Vec::new();
            let mut first = true;

            for id in parse_ids(&ids)? {
                let card = match service.get_flashcard(LOCAL_USER, id).await {
                    Ok(card) => card,
                    Err(Error::NotFound(_)) => {
                        not_found.push(id);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if !first {
                    println!("\n{}\n", "=".repeat(40));
                }
                first = false;

                println!("Q: {}\n", card.question);
                println!("A: {}", card.answer);
                println!("\n---\n");
                println!("Subject: {}", card.subject);
                println!("Difficulty: {}", card.difficulty);
                println!("Reviews: {}", card.review_count);
                if let Some(last) = card.last_reviewed {
                    println!("Last reviewed: {}", last.with_timezone(&Local));
                }
                println!("Next review: {}", describe_due(&card));
                if let Some(note_id) = card.note_id {
                    println!("Note: {}", note_id);
                }
            }

            exit_if_missing("Flashcard", &not_found);
        }

        Commands::Edit {
            id,
            question,
            answer,
            subject,
            difficulty,
        } => {
            let answer = if answer.is_none() && !is_stdin_tty() {
                Some(read_stdin()?)
            } else {
                answer
            };

            let update = UpdateFlashcard {
                question,
                answer,
                subject,
                difficulty,
            };

            let mut updated_fields = Vec::new();
            if update.question.is_some() {
                updated_fields.push("question");
            }
            if update.answer.is_some() {
                updated_fields.push("answer");
            }
            if update.subject.is_some() {
                updated_fields.push("subject");
            }
            if update.difficulty.is_some() {
                updated_fields.push("difficulty");
            }

            if updated_fields.is_empty() {
                eprintln!("Nothing to update");
                std::process::exit(1);
            }

            match service.update_flashcard(LOCAL_USER, id, update).await {
                Ok(_) => println!("Edited flashcard {}: Updated {}", id, updated_fields.join(", ")),
                Err(Error::NotFound(_)) => exit_if_missing("Flashcard", &[id]),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Rm { ids } => {
            let mut not_found = Vec::new();
            for id in parse_ids(&ids)? {
                match service.delete_flashcard(LOCAL_USER, id).await {
                    Ok(()) => println!("Deleted flashcard {}", id),
                    Err(Error::NotFound(_)) => not_found.push(id),
                    Err(e) => return Err(e.into()),
                }
            }
            exit_if_missing("Flashcard", &not_found);
        }

        Commands::Review { id, rating, at } => {
            let when = parse_when(at)?;
            let card = service
                .review_flashcard_at(LOCAL_USER, id, &rating, &when)
                .await?;
            println!(
                "Reviewed flashcard {} ({} reviews), {}",
                card.id,
                card.review_count,
                describe_due(&card)
            );
        }

        Commands::Daily { at } => {
            let when = parse_when(at)?.with_timezone(&Utc);
            let cards = service.daily_set_at(LOCAL_USER, when).await?;
            if cards.is_empty() {
                println!("Nothing to review");
            }
            for card in cards {
                print_card_line(&card);
            }
        }

        Commands::Subjects => {
            for subject in service.list_subjects(LOCAL_USER).await? {
                println!("{}", subject);
            }
        }

        Commands::Note(command) => run_note_command(&service, command).await?,
    }

    Ok(())
}

async fn run_note_command(service: &Service, command: NoteCommands) -> Result<()> {
    match command {
        NoteCommands::Add {
            title,
            subject,
            tags,
            file,
            content,
        } => {
            let content = match content {
                Some(c) => c,
                None => read_stdin()?,
            };
            let note = service
                .create_note(
                    LOCAL_USER,
                    NewNote {
                        title,
                        content,
                        subject,
                        tags: tags.map(|t| parse_tags(&t)).unwrap_or_default(),
                        file_url: file,
                        file_type: None,
                    },
                )
                .await?;
            println!("Added note {}", note.id);
        }

        NoteCommands::Ls {
            subject,
            search,
            head,
        } => {
            let notes = service
                .list_notes(LOCAL_USER, NoteFilter { subject, search })
                .await?;
            let total = notes.len();
            let shown = if head == 0 { total } else { head.min(total) };

            for note in notes.iter().take(shown) {
                let summary = note.to_summary(80);
                println!(
                    "{}: {} [{}] ({}) -- {}",
                    summary.id,
                    summary.title,
                    summary.subject,
                    summary.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    summary.content_preview
                );
            }
            if shown < total {
                println!("[Showing the latest {}/{} notes]", shown, total);
            }
        }

        NoteCommands::Show { ids, head } => {
            let mut not_found = Vec::new();
            let mut first = true;

            for id in parse_ids(&ids)? {
                let note = match service.get_note(LOCAL_USER, id).await {
                    Ok(note) => note,
                    Err(Error::NotFound(_)) => {
                        not_found.push(id);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if !first {
                    println!("\n{}\n", "=".repeat(40));
                }
                first = false;

                println!("# {}\n", note.title);
                if let Some(n) = head {
                    let lines: Vec<&str> = note.content.lines().take(n).collect();
                    println!("{}", lines.join("\n"));
                    if note.content.lines().count() > n {
                        println!("...");
                    }
                } else {
                    println!("{}", note.content);
                }

                if let Some(ref summary) = note.summary {
                    println!("\n## Summary\n\n{}", summary);
                }

                println!("\n---\n");
                println!("Subject: {}", note.subject);
                println!("Last modified: {}", note.updated_at.with_timezone(&Local));
                println!("Tags: {}", note.tags.join(","));
                if let Some(ref file_url) = note.file_url {
                    match note.file_type {
                        Some(file_type) => println!("File: {} ({})", file_url, file_type),
                        None => println!("File: {}", file_url),
                    }
                }
            }

            exit_if_missing("Note", &not_found);
        }

        NoteCommands::Rm { ids } => {
            let mut not_found = Vec::new();
            for id in parse_ids(&ids)? {
                match service.delete_note(LOCAL_USER, id).await {
                    Ok(()) => println!("Deleted note {}", id),
                    Err(Error::NotFound(_)) => not_found.push(id),
                    Err(e) => return Err(e.into()),
                }
            }
            exit_if_missing("Note", &not_found);
        }
    }

    Ok(())
}
