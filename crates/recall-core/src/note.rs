use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind of file attached to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Image,
    Text,
    Other,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Text => "text",
            FileType::Other => "other",
        }
    }

    /// Guess the kind of file from the extension of a path or URL.
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => return FileType::Other,
        };
        match ext.as_str() {
            "pdf" => FileType::Pdf,
            "jpg" | "jpeg" | "png" | "gif" => FileType::Image,
            "txt" | "md" | "doc" | "docx" => FileType::Text,
            _ => FileType::Other,
        }
    }
}

impl FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileType::Pdf),
            "image" => Ok(FileType::Image),
            "text" => Ok(FileType::Text),
            "other" => Ok(FileType::Other),
            other => Err(Error::Validation(format!("unknown file type {:?}", other))),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full note with all fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub subject: String,
    pub tags: Vec<String>,
    /// AI-generated summary, if one has been requested.
    pub summary: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<FileType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A summary of a note for listing (truncated content).
#[derive(Debug, Clone, Serialize)]
pub struct NoteSummary {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub content_preview: String,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new note, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub subject: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<FileType>,
}

/// Parameters for inserting a validated note.
#[derive(Debug, Clone)]
pub struct CreateNote {
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub subject: String,
    pub tags: Vec<String>,
    pub file_url: Option<String>,
    pub file_type: Option<FileType>,
}

/// Parameters for updating an existing note.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub subject: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<FileType>,
}

/// Caller-facing listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub subject: Option<String>,
    pub search: Option<String>,
}

/// Query parameters for listing one user's notes.
#[derive(Debug, Default, Clone)]
pub struct NoteQuery {
    pub user_id: String,
    pub subject: Option<String>,
    /// Whitespace-separated terms matched case-insensitively against title,
    /// content, subject and tags. A note matches if any term does.
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl Note {
    /// Convert to summary with a content preview of at most `max_len` characters.
    pub fn to_summary(&self, max_len: usize) -> NoteSummary {
        // Newlines become spaces so the preview stays on one line
        let normalized: String = self
            .content
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        let trimmed = normalized.trim();

        let content_preview = if trimmed.chars().count() > max_len {
            let cut: String = trimmed.chars().take(max_len).collect();
            format!("{}...", cut)
        } else {
            trimmed.to_string()
        };

        NoteSummary {
            id: self.id,
            title: self.title.clone(),
            subject: self.subject.clone(),
            content_preview,
            tags: self.tags.clone(),
            updated_at: self.updated_at,
        }
    }
}
