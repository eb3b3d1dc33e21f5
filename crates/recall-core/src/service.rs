use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::{
    apply_review, authorize, select_daily_set, Assistant, CreateFlashcard, CreateNote,
    DailyLimits, Database, Difficulty, Error, FileType, Flashcard, FlashcardFilter,
    FlashcardQuery, NewFlashcard, NewNote, Note, NoteFilter, NoteQuery, QuestionAnswer,
    UpdateFlashcard, UpdateNote, MAX_GENERATED,
};

/// Notes used as material for daily questions.
const DAILY_QUESTION_NOTES: i64 = 5;

/// The main service that contains all business logic.
/// Generic over the database implementation.
///
/// Every operation takes the id of the calling user; records owned by
/// someone else are reported as [`Error::Forbidden`].
pub struct RecallService<D: Database> {
    db: D,
    assistant: Assistant,
    limits: DailyLimits,
}

impl<D: Database> RecallService<D> {
    pub fn new(db: D) -> Self {
        Self {
            db,
            assistant: Assistant::unavailable(),
            limits: DailyLimits::default(),
        }
    }

    pub fn with_assistant(mut self, assistant: Assistant) -> Self {
        self.assistant = assistant;
        self
    }

    pub fn with_daily_limits(mut self, limits: DailyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    // --- Notes ---

    /// Create a note.
    pub async fn create_note(&self, user_id: &str, note: NewNote) -> Result<Note, Error> {
        let title = required("title", note.title)?;
        let subject = required("subject", note.subject)?;
        if note.content.trim().is_empty() {
            return Err(Error::Validation("content cannot be empty".into()));
        }

        let file_url = non_blank(note.file_url);
        let file_type = note
            .file_type
            .or_else(|| file_url.as_deref().map(FileType::from_path));

        let id = self
            .db
            .add_note(CreateNote {
                user_id: user_id.to_string(),
                title,
                content: note.content,
                subject,
                tags: normalize_tags(note.tags),
                file_url,
                file_type,
            })
            .await?;
        info!(user_id, id, "created note");

        self.fetch_note(id).await
    }

    /// Get one of the caller's notes.
    pub async fn get_note(&self, user_id: &str, id: i64) -> Result<Note, Error> {
        authorize(self.db.get_note(id).await?, user_id, id)
    }

    /// List the caller's notes, newest first.
    pub async fn list_notes(&self, user_id: &str, filter: NoteFilter) -> Result<Vec<Note>, Error> {
        self.db
            .list_notes(NoteQuery {
                user_id: user_id.to_string(),
                subject: non_blank(filter.subject),
                search: non_blank(filter.search),
                limit: None,
            })
            .await
    }

    /// Update a note. Blank fields keep their current value.
    pub async fn update_note(
        &self,
        user_id: &str,
        id: i64,
        update: UpdateNote,
    ) -> Result<Note, Error> {
        self.get_note(user_id, id).await?;

        let file_url = non_blank(update.file_url);
        let file_type = update
            .file_type
            .or_else(|| file_url.as_deref().map(FileType::from_path));
        let update = UpdateNote {
            title: non_blank(update.title),
            content: update.content.filter(|c| !c.trim().is_empty()),
            subject: non_blank(update.subject),
            tags: update.tags.map(normalize_tags),
            summary: non_blank(update.summary),
            file_url,
            file_type,
        };

        if !self.db.update_note(id, update).await? {
            return Err(Error::NotFound(format!("note {}", id)));
        }
        info!(user_id, id, "updated note");
        self.fetch_note(id).await
    }

    /// Delete a note.
    pub async fn delete_note(&self, user_id: &str, id: i64) -> Result<(), Error> {
        self.get_note(user_id, id).await?;
        if !self.db.delete_note(id).await? {
            return Err(Error::NotFound(format!("note {}", id)));
        }
        info!(user_id, id, "deleted note");
        Ok(())
    }

    /// Distinct subjects across the caller's notes.
    pub async fn list_subjects(&self, user_id: &str) -> Result<Vec<String>, Error> {
        self.db.list_subjects(user_id).await
    }

    async fn fetch_note(&self, id: i64) -> Result<Note, Error> {
        self.db
            .get_note(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("note {}", id)))
    }

    // --- Flashcards ---

    /// Create a flashcard, optionally linked to one of the caller's notes.
    pub async fn create_flashcard(
        &self,
        user_id: &str,
        card: NewFlashcard,
    ) -> Result<Flashcard, Error> {
        let question = required("question", card.question)?;
        let answer = required("answer", card.answer)?;
        let subject = required("subject", card.subject)?;
        if let Some(note_id) = card.note_id {
            self.get_note(user_id, note_id).await?;
        }

        let id = self
            .db
            .add_flashcard(CreateFlashcard {
                user_id: user_id.to_string(),
                note_id: card.note_id,
                question,
                answer,
                subject,
                difficulty: card.difficulty.unwrap_or_default(),
            })
            .await?;
        info!(user_id, id, "created flashcard");

        self.fetch_flashcard(id).await
    }

    /// Get one of the caller's flashcards.
    pub async fn get_flashcard(&self, user_id: &str, id: i64) -> Result<Flashcard, Error> {
        authorize(self.db.get_flashcard(id).await?, user_id, id)
    }

    /// List the caller's flashcards, newest first.
    pub async fn list_flashcards(
        &self,
        user_id: &str,
        filter: FlashcardFilter,
    ) -> Result<Vec<Flashcard>, Error> {
        self.db
            .list_flashcards(FlashcardQuery {
                user_id: user_id.to_string(),
                subject: non_blank(filter.subject),
                difficulty: filter.difficulty,
                search: non_blank(filter.search),
                due_at: filter.due_only.then(Utc::now),
            })
            .await
    }

    /// Edit a flashcard. Blank fields keep their current value.
    pub async fn update_flashcard(
        &self,
        user_id: &str,
        id: i64,
        update: UpdateFlashcard,
    ) -> Result<Flashcard, Error> {
        self.get_flashcard(user_id, id).await?;

        let update = UpdateFlashcard {
            question: non_blank(update.question),
            answer: non_blank(update.answer),
            subject: non_blank(update.subject),
            difficulty: update.difficulty,
        };
        if !self.db.update_flashcard(id, update).await? {
            return Err(Error::NotFound(format!("flashcard {}", id)));
        }
        info!(user_id, id, "updated flashcard");
        self.fetch_flashcard(id).await
    }

    /// Delete a flashcard.
    pub async fn delete_flashcard(&self, user_id: &str, id: i64) -> Result<(), Error> {
        self.get_flashcard(user_id, id).await?;
        if !self.db.delete_flashcard(id).await? {
            return Err(Error::NotFound(format!("flashcard {}", id)));
        }
        info!(user_id, id, "deleted flashcard");
        Ok(())
    }

    /// Record a review of a flashcard now, on the local calendar.
    pub async fn review_flashcard(
        &self,
        user_id: &str,
        id: i64,
        rating: &str,
    ) -> Result<Flashcard, Error> {
        self.review_flashcard_at(user_id, id, rating, &Local::now())
            .await
    }

    /// Record a review of a flashcard at `now`.
    ///
    /// Ratings other than easy, medium and hard are scheduled as hard.
    pub async fn review_flashcard_at<Tz: TimeZone>(
        &self,
        user_id: &str,
        id: i64,
        rating: &str,
        now: &DateTime<Tz>,
    ) -> Result<Flashcard, Error> {
        let rating = rating.parse::<Difficulty>().unwrap_or_else(|_| {
            warn!(user_id, id, rating, "unknown review rating, scheduling as hard");
            Difficulty::Hard
        });

        let card = self.get_flashcard(user_id, id).await?;
        let reviewed = apply_review(card, rating, now);
        if !self.db.save_review(&reviewed).await? {
            return Err(Error::NotFound(format!("flashcard {}", id)));
        }
        debug!(
            user_id,
            id,
            %rating,
            review_count = reviewed.review_count,
            next_review = ?reviewed.next_review,
            "reviewed flashcard"
        );

        self.fetch_flashcard(id).await
    }

    /// Today's review queue for the caller.
    pub async fn daily_set(&self, user_id: &str) -> Result<Vec<Flashcard>, Error> {
        self.daily_set_at(user_id, Utc::now()).await
    }

    /// The review queue for the caller as of `now`.
    pub async fn daily_set_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>, Error> {
        let cards = self
            .db
            .list_flashcards(FlashcardQuery {
                user_id: user_id.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(select_daily_set(cards, now, self.limits))
    }

    async fn fetch_flashcard(&self, id: i64) -> Result<Flashcard, Error> {
        self.db
            .get_flashcard(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("flashcard {}", id)))
    }

    // --- Assistant ---

    /// Summarize a note with the assistant and store the summary on it.
    pub async fn summarize_note(&self, user_id: &str, note_id: i64) -> Result<String, Error> {
        let note = self.get_note(user_id, note_id).await?;
        let summary = self.assistant.summarize(&note).await?;

        let update = UpdateNote {
            summary: Some(summary.clone()),
            ..Default::default()
        };
        if !self.db.update_note(note_id, update).await? {
            return Err(Error::NotFound(format!("note {}", note_id)));
        }
        info!(user_id, note_id, "stored note summary");
        Ok(summary)
    }

    /// Generate flashcards from a note and save them for the caller.
    pub async fn generate_flashcards(
        &self,
        user_id: &str,
        note_id: i64,
        count: u32,
    ) -> Result<Vec<Flashcard>, Error> {
        check_count(count)?;
        let note = self.get_note(user_id, note_id).await?;
        let pairs = self.assistant.flashcards(&note, count).await?;

        let mut cards = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let id = self
                .db
                .add_flashcard(CreateFlashcard {
                    user_id: user_id.to_string(),
                    note_id: Some(note.id),
                    question: pair.question,
                    answer: pair.answer,
                    subject: note.subject.clone(),
                    difficulty: Difficulty::default(),
                })
                .await?;
            cards.push(self.fetch_flashcard(id).await?);
        }
        info!(user_id, note_id, generated = cards.len(), "generated flashcards");
        Ok(cards)
    }

    /// Ask the assistant for review questions drawn from the caller's most
    /// recent notes, optionally limited to one subject.
    pub async fn daily_questions(
        &self,
        user_id: &str,
        subject: Option<String>,
        count: u32,
    ) -> Result<Vec<QuestionAnswer>, Error> {
        check_count(count)?;
        let notes = self
            .db
            .list_notes(NoteQuery {
                user_id: user_id.to_string(),
                subject: non_blank(subject),
                search: None,
                limit: Some(DAILY_QUESTION_NOTES),
            })
            .await?;
        if notes.is_empty() {
            return Err(Error::NotFound("no notes found for this subject".into()));
        }
        self.assistant.daily_questions(&notes, count).await
    }
}

fn required(field: &str, value: String) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lowercase, trim, deduplicate, remove empty.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

fn check_count(count: u32) -> Result<(), Error> {
    if count == 0 || count > MAX_GENERATED {
        return Err(Error::Validation(format!(
            "count must be between 1 and {}",
            MAX_GENERATED
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " Rust ".to_string(),
            "rust".to_string(),
            "".to_string(),
            "Async".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["async", "rust"]);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_check_count() {
        assert!(check_count(0).is_err());
        assert!(check_count(1).is_ok());
        assert!(check_count(MAX_GENERATED).is_ok());
        assert!(check_count(MAX_GENERATED + 1).is_err());
    }
}
