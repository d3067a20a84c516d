// src/answers/answerer.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use super::llm_client::ChatClient;
use super::matching::{best_match, extract_number};
use super::prompts;
use crate::app_log;
use crate::types::{Job, Profile, Section};

/// Question that short-circuits to the cover letter prompt.
pub const COVER_LETTER_QUESTION: &str = "Write a cover letter";

/// Fallback for numeric questions the model gives no number for.
pub const DEFAULT_NUMERIC_ANSWER: i64 = 5;

/// Source of answers for questions the cache cannot answer.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer_text(&self, job: &Job, question: &str) -> Result<String>;

    async fn answer_numeric(&self, job: &Job, question: &str) -> Result<i64>;

    /// Always returns one of `options`
    async fn answer_from_options(&self, job: &Job, question: &str, options: &[String]) -> Result<String>;

    async fn cover_letter(&self, job: &Job) -> Result<String>;
}

pub struct Answerer<C: ChatClient> {
    client: C,
    profile: Profile,
}

fn section_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let names = Section::ALL
            .iter()
            .map(|section| regex::escape(section.label()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i)({})", names)).expect("valid section pattern")
    })
}

/// Section named in a classifier reply
pub fn extract_section(reply: &str) -> Option<Section> {
    section_pattern()
        .captures(reply)
        .and_then(|captures| captures.get(1))
        .and_then(|found| Section::from_label(found.as_str()))
}

impl<C: ChatClient> Answerer<C> {
    pub fn new(client: C, profile: Profile) -> Self {
        Self { client, profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    async fn ask(&self, prompt: &str) -> Result<String> {
        let reply = self
            .client
            .complete(prompt)
            .await
            .context("Language model call failed")?;
        Ok(reply.trim().to_string())
    }

    async fn classify(&self, question: &str) -> Result<Section> {
        let reply = self.ask(&prompts::section_classifier(question)).await?;
        let section = extract_section(&reply)
            .with_context(|| format!("Could not extract section name from the response: {}", reply))?;
        app_log!(debug, "Question '{}' routed to section {}", question, section);
        Ok(section)
    }

    fn render_list<T: serde::Serialize>(items: &[T]) -> Result<String> {
        if items.is_empty() {
            return Ok("none".to_string());
        }
        serde_yaml::to_string(items).context("Failed to render resume entries")
    }
}

#[async_trait]
impl<C: ChatClient> QuestionAnswerer for Answerer<C> {
    async fn answer_text(&self, job: &Job, question: &str) -> Result<String> {
        app_log!(debug, "Answering textual question: {}", question);

        let section = if question == COVER_LETTER_QUESTION {
            Section::CoverLetter
        } else {
            self.classify(question).await?
        };

        if section == Section::CoverLetter {
            return self.cover_letter(job).await;
        }

        let resume_section = self.profile.section(section)?.with_context(|| {
            format!("Section '{}' not found in the profile", section.label())
        })?;

        self.ask(&prompts::section_answer(section, &resume_section, question))
            .await
    }

    async fn answer_numeric(&self, _job: &Job, question: &str) -> Result<i64> {
        app_log!(debug, "Answering numeric question: {}", question);

        let educations = Self::render_list(&self.profile.education_details)?;
        let jobs = Self::render_list(&self.profile.experience_details)?;
        let projects = Self::render_list(&self.profile.projects)?;
        let prompt = prompts::render(
            prompts::NUMERIC_QUESTION,
            &[
                ("resume_educations", &educations),
                ("resume_jobs", &jobs),
                ("resume_projects", &projects),
                ("question", question),
            ],
        );

        let reply = self.ask(&prompt).await?;
        Ok(match extract_number(&reply) {
            Some(number) => number,
            None => {
                app_log!(
                    warn,
                    "No number in reply '{}', using default {}",
                    reply,
                    DEFAULT_NUMERIC_ANSWER
                );
                DEFAULT_NUMERIC_ANSWER
            }
        })
    }

    async fn answer_from_options(&self, _job: &Job, question: &str, options: &[String]) -> Result<String> {
        app_log!(debug, "Answering question from options: {}", question);
        if options.is_empty() {
            anyhow::bail!("No options offered for question: {}", question);
        }

        let resume = self.profile.to_yaml()?;
        let listed = options
            .iter()
            .map(|option| format!("- {}", option))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = prompts::render(
            prompts::OPTIONS_QUESTION,
            &[("resume", &resume), ("question", question), ("options", &listed)],
        );

        let reply = self.ask(&prompt).await?;
        let best = best_match(&reply, options)
            .cloned()
            .with_context(|| format!("No option matched reply: {}", reply))?;
        app_log!(debug, "Best option for '{}': {}", question, best);
        Ok(best)
    }

    async fn cover_letter(&self, job: &Job) -> Result<String> {
        let resume = self.profile.to_yaml()?;
        let prompt = prompts::render(
            prompts::COVER_LETTER,
            &[("resume", &resume), ("job_description", &job.description)],
        );
        let letter = self.ask(&prompt).await?;
        app_log!(debug, "Cover letter generated for {} at {}", job.title, job.company);
        Ok(letter)
    }
}
