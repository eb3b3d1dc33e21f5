//! SQLite implementation of the Recall database trait.

use chrono::{DateTime, SecondsFormat, Utc};
use recall_core::{
    get_pending_migrations, CreateFlashcard, CreateNote, Database, Difficulty, Error, FileType,
    Flashcard, FlashcardQuery, Note, NoteQuery, UpdateFlashcard, UpdateNote, SCHEMA_VERSION,
};
use regex::Regex;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NOTE_COLUMNS: &str = "SELECT n.id, n.user_id, n.title, n.content, n.subject, n.summary,
            n.file_url, n.file_type, n.created_at, n.updated_at, json_group_array(t.name) as tags
     FROM notes n
     LEFT JOIN note_tags nt ON n.id = nt.note_id
     LEFT JOIN tags t ON nt.tag_id = t.id";

const FLASHCARD_COLUMNS: &str = "SELECT f.id, f.user_id, f.note_id, f.question, f.answer, f.subject,
            f.difficulty, f.review_count, f.last_reviewed, f.next_review, f.created_at, f.updated_at
     FROM flashcards f";

/// SQLite-backed database implementation.
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Open a database at the given path and run any pending migrations.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database and run migrations.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Current schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i64, Error> {
        let conn = self.conn()?;
        Ok(Self::read_schema_version(&conn))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("connection lock poisoned".into()))
    }

    fn read_schema_version(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT value FROM _recall_meta WHERE key = 'schema_version'",
            [],
            |row| {
                let val: String = row.get(0)?;
                Ok(val.parse().unwrap_or(0))
            },
        )
        .unwrap_or(0)
    }

    /// Run any pending database migrations.
    fn run_migrations(&self) -> Result<(), Error> {
        let conn = self.conn()?;

        // Ensure _recall_meta table exists
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _recall_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        let current_version = Self::read_schema_version(&conn);
        if current_version >= SCHEMA_VERSION {
            return Ok(());
        }

        for migration in get_pending_migrations(current_version) {
            for statement in migration.statements {
                // Skip _recall_meta creation (already done above)
                if statement.contains("_recall_meta") {
                    continue;
                }
                conn.execute(statement, []).map_err(|e| {
                    Error::Database(format!("migration {} failed: {}", migration.name, e))
                })?;
            }
        }

        conn.execute(
            "INSERT OR REPLACE INTO _recall_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
        let file_type: Option<String> = row.get(7)?;
        Ok(Note {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            subject: row.get(4)?,
            summary: row.get(5)?,
            file_url: row.get(6)?,
            file_type: file_type
                .map(|s| s.parse::<FileType>().map_err(|e| conversion_err(7, e)))
                .transpose()?,
            created_at: get_timestamp(row, 8)?,
            updated_at: get_timestamp(row, 9)?,
            tags: Self::parse_tags(row, 10)?,
        })
    }

    fn flashcard_from_row(row: &Row) -> rusqlite::Result<Flashcard> {
        let difficulty: String = row.get(6)?;
        Ok(Flashcard {
            id: row.get(0)?,
            user_id: row.get(1)?,
            note_id: row.get(2)?,
            question: row.get(3)?,
            answer: row.get(4)?,
            subject: row.get(5)?,
            difficulty: difficulty
                .parse::<Difficulty>()
                .map_err(|e| conversion_err(6, e))?,
            review_count: row.get(7)?,
            last_reviewed: get_opt_timestamp(row, 8)?,
            next_review: get_opt_timestamp(row, 9)?,
            created_at: get_timestamp(row, 10)?,
            updated_at: get_timestamp(row, 11)?,
        })
    }

    /// Tags arrive as a JSON array; a note without tags yields `[null]`.
    fn parse_tags(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
        let raw: String = row.get(idx)?;
        let names: Vec<Option<String>> = serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })?;
        let mut tags: Vec<String> = names.into_iter().flatten().collect();
        tags.sort();
        Ok(tags)
    }

    fn insert_tags(conn: &Connection, note_id: i64, tags: &[String]) -> Result<(), Error> {
        for tag in tags {
            conn.execute(
                "INSERT INTO tags (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
                params![tag],
            )
            .map_err(db_err)?;

            conn.execute(
                "INSERT OR IGNORE INTO note_tags (note_id, tag_id) SELECT ?1, id FROM tags WHERE name = ?2",
                params![note_id, tag],
            )
            .map_err(db_err)?;
        }
        Ok(())
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn conversion_err(idx: usize, e: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Fixed-width UTC text, so that string comparison in SQL orders by time.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_opt_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(_) => get_timestamp(row, idx).map(Some),
    }
}

/// Case-insensitive matcher for any of the whitespace-separated terms.
fn search_regex(search: Option<&str>) -> Result<Option<Regex>, Error> {
    let terms: Vec<String> = match search {
        Some(s) => s.split_whitespace().map(regex::escape).collect(),
        None => return Ok(None),
    };
    if terms.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!("(?i){}", terms.join("|")))
        .map(Some)
        .map_err(|e| Error::Validation(format!("invalid search: {}", e)))
}

#[async_trait::async_trait]
impl Database for SqliteDatabase {
    async fn add_note(&self, note: CreateNote) -> Result<i64, Error> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(db_err)?;
        let now = timestamp(&Utc::now());

        tx.execute(
            "INSERT INTO notes (user_id, title, content, subject, file_url, file_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                note.user_id,
                note.title,
                note.content,
                note.subject,
                note.file_url,
                note.file_type.map(|t| t.as_str()),
                now
            ],
        )
        .map_err(db_err)?;

        let note_id = tx.last_insert_rowid();
        Self::insert_tags(&tx, note_id, &note.tags)?;
        tx.commit().map_err(db_err)?;

        Ok(note_id)
    }

    async fn get_note(&self, id: i64) -> Result<Option<Note>, Error> {
        let conn = self.conn()?;

        let note = conn
            .query_row(
                &format!("{} WHERE n.id = ?1 GROUP BY n.id", NOTE_COLUMNS),
                params![id],
                Self::note_from_row,
            )
            .optional()
            .map_err(db_err)?;

        Ok(note)
    }

    async fn list_notes(&self, query: NoteQuery) -> Result<Vec<Note>, Error> {
        let matcher = search_regex(query.search.as_deref())?;
        let conn = self.conn()?;

        let mut sql = String::from(NOTE_COLUMNS);
        let mut params_vec: Vec<String> = vec![query.user_id.clone()];
        sql.push_str(" WHERE n.user_id = ?1");

        if let Some(ref subject) = query.subject {
            params_vec.push(subject.clone());
            sql.push_str(&format!(" AND n.subject = ?{}", params_vec.len()));
        }

        sql.push_str(" GROUP BY n.id ORDER BY n.created_at DESC, n.id DESC");

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let notes = stmt
            .query_map(params_from_iter(params_vec.iter()), Self::note_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        // Search runs after the query, so the limit is applied here too
        let limit = query.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(notes
            .into_iter()
            .filter(|note| match matcher {
                Some(ref re) => {
                    re.is_match(&note.title)
                        || re.is_match(&note.content)
                        || re.is_match(&note.subject)
                        || note.tags.iter().any(|t| re.is_match(t))
                }
                None => true,
            })
            .take(limit)
            .collect())
    }

    async fn update_note(&self, id: i64, update: UpdateNote) -> Result<bool, Error> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(db_err)?;

        let mut sets = vec!["updated_at = ?1".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(timestamp(&Utc::now()))];

        let fields: [(&str, Option<String>); 6] = [
            ("title", update.title),
            ("content", update.content),
            ("subject", update.subject),
            ("summary", update.summary),
            ("file_url", update.file_url),
            ("file_type", update.file_type.map(|t| t.as_str().to_string())),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                values.push(Box::new(value));
                sets.push(format!("{} = ?{}", column, values.len()));
            }
        }

        values.push(Box::new(id));
        let sql = format!(
            "UPDATE notes SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len()
        );
        let rows = tx
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(db_err)?;
        if rows == 0 {
            return Ok(false);
        }

        if let Some(ref tags) = update.tags {
            tx.execute("DELETE FROM note_tags WHERE note_id = ?1", params![id])
                .map_err(db_err)?;
            Self::insert_tags(&tx, id, tags)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    async fn delete_note(&self, id: i64) -> Result<bool, Error> {
        let conn = self.conn()?;

        let rows = conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])
            .map_err(db_err)?;

        Ok(rows > 0)
    }

    async fn list_subjects(&self, user_id: &str) -> Result<Vec<String>, Error> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT DISTINCT subject FROM notes WHERE user_id = ?1 ORDER BY subject")
            .map_err(db_err)?;

        let subjects = stmt
            .query_map(params![user_id], |row| row.get(0))
            .map_err(db_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(db_err)?;

        Ok(subjects)
    }

    async fn add_flashcard(&self, card: CreateFlashcard) -> Result<i64, Error> {
        let conn = self.conn()?;
        let now = timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO flashcards (user_id, note_id, question, answer, subject, difficulty, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                card.user_id,
                card.note_id,
                card.question,
                card.answer,
                card.subject,
                card.difficulty.as_str(),
                now
            ],
        )
        .map_err(db_err)?;

        Ok(conn.last_insert_rowid())
    }

    async fn get_flashcard(&self, id: i64) -> Result<Option<Flashcard>, Error> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("{} WHERE f.id = ?1", FLASHCARD_COLUMNS),
            params![id],
            Self::flashcard_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    async fn list_flashcards(&self, query: FlashcardQuery) -> Result<Vec<Flashcard>, Error> {
        let matcher = search_regex(query.search.as_deref())?;
        let conn = self.conn()?;

        let mut sql = String::from(FLASHCARD_COLUMNS);
        let mut conditions = vec!["f.user_id = ?1".to_string()];
        let mut params_vec: Vec<String> = vec![query.user_id.clone()];

        if let Some(ref subject) = query.subject {
            params_vec.push(subject.clone());
            conditions.push(format!("f.subject = ?{}", params_vec.len()));
        }

        if let Some(difficulty) = query.difficulty {
            params_vec.push(difficulty.as_str().to_string());
            conditions.push(format!("f.difficulty = ?{}", params_vec.len()));
        }

        if let Some(ref due_at) = query.due_at {
            params_vec.push(timestamp(due_at));
            conditions.push(format!(
                "(f.next_review IS NULL OR f.next_review <= ?{})",
                params_vec.len()
            ));
        }

        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
        sql.push_str(" ORDER BY f.created_at DESC, f.id DESC");

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let cards = stmt
            .query_map(params_from_iter(params_vec.iter()), Self::flashcard_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(cards
            .into_iter()
            .filter(|card| match matcher {
                Some(ref re) => {
                    re.is_match(&card.question)
                        || re.is_match(&card.answer)
                        || re.is_match(&card.subject)
                }
                None => true,
            })
            .collect())
    }

    async fn update_flashcard(&self, id: i64, update: UpdateFlashcard) -> Result<bool, Error> {
        let conn = self.conn()?;

        let mut sets = vec!["updated_at = ?1".to_string()];
        let mut values: Vec<String> = vec![timestamp(&Utc::now())];

        let fields: [(&str, Option<String>); 4] = [
            ("question", update.question),
            ("answer", update.answer),
            ("subject", update.subject),
            ("difficulty", update.difficulty.map(|d| d.as_str().to_string())),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                values.push(value);
                sets.push(format!("{} = ?{}", column, values.len()));
            }
        }

        let sql = format!(
            "UPDATE flashcards SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len() + 1
        );
        let mut bound: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        bound.push(&id);

        let rows = conn.execute(&sql, bound.as_slice()).map_err(db_err)?;
        Ok(rows > 0)
    }

    async fn save_review(&self, card: &Flashcard) -> Result<bool, Error> {
        let conn = self.conn()?;

        let rows = conn
            .execute(
                "UPDATE flashcards
                 SET review_count = ?1, last_reviewed = ?2, next_review = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    card.review_count,
                    card.last_reviewed.as_ref().map(timestamp),
                    card.next_review.as_ref().map(timestamp),
                    timestamp(&Utc::now()),
                    card.id
                ],
            )
            .map_err(db_err)?;

        Ok(rows > 0)
    }

    async fn delete_flashcard(&self, id: i64) -> Result<bool, Error> {
        let conn = self.conn()?;

        let rows = conn
            .execute("DELETE FROM flashcards WHERE id = ?1", params![id])
            .map_err(db_err)?;

        Ok(rows > 0)
    }
}
