use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// How hard a card is, either as its stored classification or as the
/// rating given at a single review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::Validation(format!(
                "difficulty must be easy, medium or hard, got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flashcard with its review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: i64,
    pub user_id: String,
    pub note_id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub review_count: u32,
    pub last_reviewed: Option<DateTime<Utc>>,
    /// `None` means the card has never been scheduled and is due now.
    pub next_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    /// Whether the card is eligible for review at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_review {
            None => true,
            Some(next) => next <= now,
        }
    }
}

/// Caller-supplied fields for a new flashcard, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
    pub subject: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub note_id: Option<i64>,
}

/// Parameters for inserting a validated flashcard.
#[derive(Debug, Clone)]
pub struct CreateFlashcard {
    pub user_id: String,
    pub note_id: Option<i64>,
    pub question: String,
    pub answer: String,
    pub subject: String,
    pub difficulty: Difficulty,
}

/// Parameters for editing a flashcard. Review fields are not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFlashcard {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
}

/// Caller-facing listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashcardFilter {
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    #[serde(default, alias = "dueOnly")]
    pub due_only: bool,
}

/// Query parameters for listing one user's flashcards.
#[derive(Debug, Clone, Default)]
pub struct FlashcardQuery {
    pub user_id: String,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Whitespace-separated terms matched case-insensitively against
    /// question, answer and subject. A card matches if any term does.
    pub search: Option<String>,
    /// Only cards due at this instant.
    pub due_at: Option<DateTime<Utc>>,
}
