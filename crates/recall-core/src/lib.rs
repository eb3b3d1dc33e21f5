//! Recall core library - shared types, traits, and business logic.
//!
//! This crate contains no I/O: storage sits behind [`Database`] and the
//! language model behind [`Completion`].

mod access;
mod assistant;
mod daily;
mod dateparse;
mod db;
mod error;
mod flashcard;
mod migrations;
mod note;
mod schedule;
mod service;

pub use access::{authorize, Owned};
pub use assistant::{Assistant, Completion, QuestionAnswer, MAX_GENERATED};
pub use daily::{select_daily_set, DailyLimits};
pub use dateparse::parse_human_date;
pub use db::Database;
pub use error::Error;
pub use flashcard::{
    CreateFlashcard, Difficulty, Flashcard, FlashcardFilter, FlashcardQuery, NewFlashcard,
    UpdateFlashcard,
};
pub use migrations::{get_pending_migrations, Migration, MIGRATIONS, SCHEMA_VERSION};
pub use note::{CreateNote, FileType, NewNote, Note, NoteFilter, NoteQuery, NoteSummary, UpdateNote};
pub use schedule::{apply_review, interval_days, next_review_after};
pub use service::RecallService;
