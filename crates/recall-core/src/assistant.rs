//! Study assistant backed by an optional language model.
//!
//! The model itself sits behind [`Completion`]. [`Assistant`] owns the
//! prompts and the parsing of model output, and reports
//! [`Error::Unavailable`] when no model has been configured.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Note};

/// Upper bound on cards or questions requested in one call.
pub const MAX_GENERATED: u32 = 20;

const SUMMARIZE_PROMPT: &str = "You are a helpful AI assistant that summarizes educational content. \
Create a concise but comprehensive summary of the following note. Include key points, concepts, \
and important details. Format the summary with bullet points for main ideas and use markdown formatting.";

/// A single chat completion: one system message, one user message, text back.
#[async_trait::async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, Error>;
}

/// A generated question with its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// Handle to the language model, which may be absent.
#[derive(Clone, Default)]
pub struct Assistant {
    client: Option<Arc<dyn Completion>>,
}

impl Assistant {
    pub fn new(client: Arc<dyn Completion>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn unavailable() -> Self {
        Self { client: None }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&dyn Completion, Error> {
        self.client
            .as_deref()
            .ok_or_else(|| Error::Unavailable("AI service is not configured".into()))
    }

    /// Markdown summary of a note.
    pub async fn summarize(&self, note: &Note) -> Result<String, Error> {
        let summary = self
            .client()?
            .complete(SUMMARIZE_PROMPT, &describe(note))
            .await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(Error::Upstream("AI returned an empty summary".into()));
        }
        Ok(summary.to_string())
    }

    /// Question/answer pairs covering the key points of a note.
    pub async fn flashcards(&self, note: &Note, count: u32) -> Result<Vec<QuestionAnswer>, Error> {
        let client = self.client()?;
        let system = format!(
            "You are a helpful AI assistant that creates educational flashcards. \
             Generate {} flashcards based on the following note. Each flashcard should have a \
             question and answer. Focus on key concepts, definitions, and important facts. \
             Format your response as a JSON array of objects with 'question' and 'answer' fields.",
            count
        );
        let raw = client.complete(&system, &describe(note)).await?;
        parse_pairs(&raw)
    }

    /// Review questions that test understanding across several notes.
    pub async fn daily_questions(
        &self,
        notes: &[Note],
        count: u32,
    ) -> Result<Vec<QuestionAnswer>, Error> {
        let client = self.client()?;
        let system = format!(
            "You are a helpful AI assistant that creates educational questions for daily review. \
             Generate {} challenging questions based on the following notes. These questions \
             should test understanding and application of concepts, not just memorization. \
             Format your response as a JSON array of objects with 'question' and 'answer' fields.",
            count
        );
        let combined = notes
            .iter()
            .map(|n| format!("Title: {}\nContent: {}", n.title, n.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let raw = client.complete(&system, &combined).await?;
        parse_pairs(&raw)
    }
}

fn describe(note: &Note) -> String {
    format!(
        "Title: {}\nSubject: {}\nContent: {}",
        note.title, note.subject, note.content
    )
}

/// Parse a JSON array of question/answer objects out of model output.
///
/// Models like to wrap JSON in a markdown code fence, so that is stripped
/// first. Pairs with a blank question or answer are dropped.
fn parse_pairs(raw: &str) -> Result<Vec<QuestionAnswer>, Error> {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    let pairs: Vec<QuestionAnswer> = serde_json::from_str(body)
        .map_err(|e| Error::Upstream(format!("failed to parse AI response: {}", e)))?;

    Ok(pairs
        .into_iter()
        .map(|p| QuestionAnswer {
            question: p.question.trim().to_string(),
            answer: p.answer.trim().to_string(),
        })
        .filter(|p| !p.question.is_empty() && !p.answer.is_empty())
        .collect())
}
