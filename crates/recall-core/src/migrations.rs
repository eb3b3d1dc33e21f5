//! Embedded database migrations for Recall.
//!
//! Migrations are versioned and run automatically when a database is opened.
//! The schema version is tracked in the `_recall_meta` table.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text
//! (`2024-01-01T00:00:00.000000Z`) so that string order is time order.

/// Current schema version. Increment when adding new migrations.
pub const SCHEMA_VERSION: i64 = 2;

/// A database migration with version number and SQL statements.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations in order. Each migration should be idempotent where possible.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "notes",
        statements: &[
            "CREATE TABLE IF NOT EXISTS _recall_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                subject TEXT NOT NULL,
                summary TEXT,
                file_url TEXT,
                file_type TEXT CHECK (file_type IN ('pdf', 'image', 'text', 'other')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )",
            "CREATE TABLE IF NOT EXISTS note_tags (
                note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, tag_id)
            )",
            "CREATE INDEX IF NOT EXISTS idx_notes_user_created ON notes(user_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_note_tags_tag_id ON note_tags(tag_id)",
        ],
    },
    Migration {
        version: 2,
        name: "flashcards",
        statements: &[
            "CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                note_id INTEGER REFERENCES notes(id) ON DELETE SET NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                subject TEXT NOT NULL,
                difficulty TEXT NOT NULL DEFAULT 'medium'
                    CHECK (difficulty IN ('easy', 'medium', 'hard')),
                review_count INTEGER NOT NULL DEFAULT 0,
                last_reviewed TEXT,
                next_review TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_flashcards_user_created ON flashcards(user_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_flashcards_user_next_review ON flashcards(user_id, next_review)",
        ],
    },
];

/// Get migrations that need to be applied given the current version.
pub fn get_pending_migrations(current_version: i64) -> Vec<&'static Migration> {
    MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect()
}
