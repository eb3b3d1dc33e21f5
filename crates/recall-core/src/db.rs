use crate::{
    CreateFlashcard, CreateNote, Error, Flashcard, FlashcardQuery, Note, NoteQuery,
    UpdateFlashcard, UpdateNote,
};

/// Storage for notes and flashcards.
///
/// Lookups by id are not scoped to a user; callers check ownership with
/// [`crate::authorize`]. Listings always are.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Add a new note and return its ID.
    async fn add_note(&self, note: CreateNote) -> Result<i64, Error>;

    /// Get a note by ID.
    async fn get_note(&self, id: i64) -> Result<Option<Note>, Error>;

    /// List notes matching the query, most recently created first.
    async fn list_notes(&self, query: NoteQuery) -> Result<Vec<Note>, Error>;

    /// Update an existing note. Returns false if not found.
    async fn update_note(&self, id: i64, update: UpdateNote) -> Result<bool, Error>;

    /// Delete a note by ID. Flashcards made from it stay but lose the link.
    async fn delete_note(&self, id: i64) -> Result<bool, Error>;

    /// Distinct subjects of a user's notes, sorted.
    async fn list_subjects(&self, user_id: &str) -> Result<Vec<String>, Error>;

    /// Add a new flashcard and return its ID.
    async fn add_flashcard(&self, card: CreateFlashcard) -> Result<i64, Error>;

    /// Get a flashcard by ID.
    async fn get_flashcard(&self, id: i64) -> Result<Option<Flashcard>, Error>;

    /// List flashcards matching the query, most recently created first.
    async fn list_flashcards(&self, query: FlashcardQuery) -> Result<Vec<Flashcard>, Error>;

    /// Edit question, answer, subject or difficulty. Returns false if not found.
    async fn update_flashcard(&self, id: i64, update: UpdateFlashcard) -> Result<bool, Error>;

    /// Overwrite `review_count`, `last_reviewed` and `next_review` with the
    /// values on `card`. Returns false if the card no longer exists.
    async fn save_review(&self, card: &Flashcard) -> Result<bool, Error>;

    /// Delete a flashcard by ID.
    async fn delete_flashcard(&self, id: i64) -> Result<bool, Error>;
}
