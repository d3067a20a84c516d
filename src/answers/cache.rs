// src/answers/cache.rs
//! Question/answer cache: answers already given are reused before asking the model

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::app_log;
use crate::core::{Database, QuestionRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Radio,
    Dropdown,
    Textbox,
    Numeric,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Radio => "radio",
            QuestionKind::Dropdown => "dropdown",
            QuestionKind::Textbox => "textbox",
            QuestionKind::Numeric => "numeric",
        }
    }

    /// Choice answers are only valid while the form still offers them
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionKind::Radio | QuestionKind::Dropdown)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "radio" => Ok(QuestionKind::Radio),
            "dropdown" => Ok(QuestionKind::Dropdown),
            "textbox" => Ok(QuestionKind::Textbox),
            "numeric" => Ok(QuestionKind::Numeric),
            other => anyhow::bail!("Unknown question type: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub kind: QuestionKind,
    pub question: String,
    pub answer: String,
}

/// Normalize question text into its cache key.
pub fn sanitize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_ascii_control())
        .collect();
    cleaned.trim_end_matches(',').to_string()
}

/// In-memory view of the `questions` table, written through on every new entry.
pub struct QuestionCache {
    entries: Vec<CachedAnswer>,
    db: Option<Database>,
}

impl QuestionCache {
    pub async fn load(db: &Database) -> Result<Self> {
        let mut entries = Vec::new();
        for row in db.questions().load_all().await? {
            match row.question_type.parse::<QuestionKind>() {
                Ok(kind) => entries.push(CachedAnswer {
                    kind,
                    question: row.question,
                    answer: row.answer,
                }),
                Err(e) => app_log!(warn, "Ignoring cached question {}: {}", row.id, e),
            }
        }
        app_log!(info, "Loaded {} cached answers", entries.len());

        Ok(Self {
            entries,
            db: Some(db.clone()),
        })
    }

    /// Cache that never persists
    pub fn detached(entries: Vec<CachedAnswer>) -> Self {
        Self { entries, db: None }
    }

    pub fn entries(&self) -> &[CachedAnswer] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored answer for this question. Choice answers must appear in `options`.
    /// Questions without text are never answered from or stored in the cache.
    pub fn lookup(&self, kind: QuestionKind, question: &str, options: Option<&[String]>) -> Option<&str> {
        let key = sanitize_text(question);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind && entry.question == key)
            .find(|entry| match options {
                Some(options) => options.iter().any(|option| *option == entry.answer),
                None => true,
            })
            .map(|entry| entry.answer.as_str())
    }

    /// Keep a new answer; an already known (kind, question) pair is left untouched.
    pub async fn remember(&mut self, kind: QuestionKind, question: &str, answer: &str) -> Result<bool> {
        let key = sanitize_text(question);
        if key.is_empty() {
            return Ok(false);
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.kind == kind && entry.question == key)
        {
            return Ok(false);
        }

        let entry = CachedAnswer {
            kind,
            question: key,
            answer: answer.to_string(),
        };

        if let Some(db) = &self.db {
            db.questions()
                .insert(&QuestionRow {
                    question_type: kind.as_str().to_string(),
                    question: entry.question.clone(),
                    answer: entry.answer.clone(),
                })
                .await?;
        }

        app_log!(debug, "Cached {} answer for '{}'", kind, entry.question);
        self.entries.push(entry);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  Are you \"legally\" allowed?\n"), "are you legally allowed?");
        assert_eq!(sanitize_text("Years of\nRust,,"), "years ofrust");
        assert_eq!(sanitize_text("C:\\path\t"), "c:path");
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Radio".parse::<QuestionKind>().unwrap(), QuestionKind::Radio);
        assert_eq!(QuestionKind::Numeric.to_string(), "numeric");
        assert!("checkbox".parse::<QuestionKind>().is_err());
        assert!(QuestionKind::Dropdown.is_choice());
        assert!(!QuestionKind::Textbox.is_choice());
    }

    #[test]
    fn test_lookup_requires_kind_and_available_option() {
        let cache = QuestionCache::detached(vec![CachedAnswer {
            kind: QuestionKind::Radio,
            question: "do you require sponsorship?".to_string(),
            answer: "no".to_string(),
        }]);

        let options = vec!["yes".to_string(), "no".to_string()];
        assert_eq!(
            cache.lookup(QuestionKind::Radio, "Do you require sponsorship?", Some(&options)),
            Some("no")
        );
        assert_eq!(
            cache.lookup(QuestionKind::Dropdown, "Do you require sponsorship?", Some(&options)),
            None
        );

        let changed = vec!["yes".to_string(), "not now".to_string()];
        assert_eq!(
            cache.lookup(QuestionKind::Radio, "Do you require sponsorship?", Some(&changed)),
            None
        );
    }

    #[tokio::test]
    async fn test_blank_questions_are_not_cached() {
        let mut cache = QuestionCache::detached(vec![]);
        assert!(!cache.remember(QuestionKind::Radio, "  \n", "yes").await.unwrap());
        assert!(cache.is_empty());
        assert_eq!(cache.lookup(QuestionKind::Radio, "", Some(&["yes".to_string()][..])), None);
    }

    #[tokio::test]
    async fn test_remember_persists_once() {
        let db = Database::in_memory().await.unwrap();
        let mut cache = QuestionCache::load(&db).await.unwrap();
        assert!(cache.is_empty());

        assert!(cache
            .remember(QuestionKind::Textbox, "  City?\n", "Berlin")
            .await
            .unwrap());
        assert!(!cache
            .remember(QuestionKind::Textbox, "city?", "Munich")
            .await
            .unwrap());

        let reloaded = QuestionCache::load(&db).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.lookup(QuestionKind::Textbox, "CITY?", None), Some("Berlin"));
    }
}
