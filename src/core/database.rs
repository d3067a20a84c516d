// src/core/database.rs
//! Job records and the question/answer cache in SQLite

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

use crate::app_log;
use crate::core::FsOps;
use crate::types::{Job, JobRecord};

// ===== Core Database Connection Management =====

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `sqlite:` URLs as given, anything else is a file path
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            let path = Path::new(database_url);
            if let Some(parent) = path.parent() {
                FsOps::ensure_dir_exists(parent).await?;
            }
            format!("sqlite:{}?mode=rwc", path.display())
        };

        // An in-memory database lives only as long as its single connection
        let options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(&url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;

        app_log!(info, "Database connection established: {}", database_url);

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn jobs(&self) -> JobRepository<'_> {
        JobRepository::new(&self.pool)
    }

    pub fn questions(&self) -> QuestionRepository<'_> {
        QuestionRepository::new(&self.pool)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                recruiter TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                applied BOOLEAN NOT NULL DEFAULT FALSE,
                connected BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_type TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (question_type, question)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_recruiter ON jobs(recruiter);")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_applied ON jobs(applied);")
            .execute(&self.pool)
            .await?;

        app_log!(debug, "Database migrations completed");
        Ok(())
    }
}

// ===== Job Repository =====

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update by link; only the flags change on conflict
    pub async fn save_job(&self, job: &Job, applied: bool, connected: bool) -> Result<()> {
        app_log!(debug, "Saving job: {} at {} ({})", job.title, job.company, job.link);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO jobs (company, title, link, recruiter, location, applied, connected, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (link) DO UPDATE SET
                applied = excluded.applied,
                connected = excluded.connected,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job.company)
        .bind(&job.title)
        .bind(&job.link)
        .bind(&job.recruiter)
        .bind(&job.location)
        .bind(applied)
        .bind(connected)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .with_context(|| format!("Error saving job: {}", job.link))?;

        Ok(())
    }

    /// Jobs not applied to yet, newest first
    pub async fn load_unapplied(&self) -> Result<Vec<JobRecord>> {
        let jobs = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT id, company, title, link, recruiter, location, applied, connected, created_at, updated_at
            FROM jobs
            WHERE applied = FALSE
            ORDER BY id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Error loading jobs")?;

        Ok(jobs)
    }

    pub async fn list(&self, unapplied_only: bool) -> Result<Vec<JobRecord>> {
        if unapplied_only {
            return self.load_unapplied().await;
        }

        let jobs = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT id, company, title, link, recruiter, location, applied, connected, created_at, updated_at
            FROM jobs
            ORDER BY id DESC
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Error listing jobs")?;

        Ok(jobs)
    }

    pub async fn is_applied(&self, link: &str) -> Result<bool> {
        let applied: Option<bool> = sqlx::query_scalar("SELECT applied FROM jobs WHERE link = ?")
            .bind(link)
            .fetch_optional(self.pool)
            .await?;
        Ok(applied.unwrap_or(false))
    }

    /// Recruiters still to connect with, ordered by their oldest job, newest first
    pub async fn load_recruiters(&self) -> Result<Vec<String>> {
        app_log!(debug, "Loading recruiter URLs");
        let recruiters: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT recruiter
            FROM jobs
            WHERE connected = FALSE AND recruiter <> ''
            GROUP BY recruiter
            ORDER BY MIN(id) DESC
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Error loading recruiters")?;

        Ok(recruiters)
    }

    pub async fn mark_recruiter_connected(&self, recruiter: &str) -> Result<u64> {
        app_log!(debug, "Updating recruiter status to connected for: {}", recruiter);
        let result = sqlx::query("UPDATE jobs SET connected = TRUE, updated_at = ? WHERE recruiter = ?")
            .bind(Utc::now())
            .bind(recruiter)
            .execute(self.pool)
            .await
            .context("Error updating recruiter status")?;

        Ok(result.rows_affected())
    }
}

// ===== Question Repository =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuestionRow {
    pub question_type: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredQuestion {
    pub id: i64,
    pub question_type: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

pub struct QuestionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> QuestionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<StoredQuestion>> {
        let rows = sqlx::query_as::<_, StoredQuestion>(
            "SELECT id, question_type, question, answer, created_at FROM questions ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await
        .context("Error loading questions")?;

        Ok(rows)
    }

    /// Returns false when the pair was already stored
    pub async fn insert(&self, row: &QuestionRow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO questions (question_type, question, answer, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (question_type, question) DO NOTHING
            "#,
        )
        .bind(&row.question_type)
        .bind(&row.question)
        .bind(&row.answer)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .context("Error saving question")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_answer(&self, question_type: &str, question: &str, answer: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE questions SET answer = ? WHERE question_type = ? AND question = ?")
            .bind(answer)
            .bind(question_type)
            .bind(question)
            .execute(self.pool)
            .await
            .context("Error updating answer")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove(&self, question_type: &str, question: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE question_type = ? AND question = ?")
            .bind(question_type)
            .bind(question)
            .execute(self.pool)
            .await
            .context("Error removing question")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(link: &str, recruiter: &str) -> Job {
        Job::new("Engineer", "Acme", "Berlin", link).with_recruiter(recruiter)
    }

    #[tokio::test]
    async fn test_save_job_upserts_flags_by_link() {
        let db = Database::in_memory().await.unwrap();
        let jobs = db.jobs();

        jobs.save_job(&job("https://jobs/1", ""), false, true).await.unwrap();
        assert_eq!(jobs.load_unapplied().await.unwrap().len(), 1);
        assert!(!jobs.is_applied("https://jobs/1").await.unwrap());

        jobs.save_job(&job("https://jobs/1", ""), true, true).await.unwrap();
        assert!(jobs.load_unapplied().await.unwrap().is_empty());
        assert!(jobs.is_applied("https://jobs/1").await.unwrap());
        assert_eq!(jobs.list(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unapplied_jobs_newest_first() {
        let db = Database::in_memory().await.unwrap();
        let jobs = db.jobs();
        for n in 1..=3 {
            jobs.save_job(&job(&format!("https://jobs/{}", n), ""), false, true)
                .await
                .unwrap();
        }
        let links: Vec<String> = jobs
            .load_unapplied()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.link)
            .collect();
        assert_eq!(links, vec!["https://jobs/3", "https://jobs/2", "https://jobs/1"]);
    }

    #[tokio::test]
    async fn test_recruiters_distinct_and_ordered() {
        let db = Database::in_memory().await.unwrap();
        let jobs = db.jobs();
        jobs.save_job(&job("https://jobs/1", "https://in/alice"), true, false).await.unwrap();
        jobs.save_job(&job("https://jobs/2", "https://in/bob"), true, false).await.unwrap();
        jobs.save_job(&job("https://jobs/3", "https://in/alice"), true, false).await.unwrap();
        jobs.save_job(&job("https://jobs/4", ""), true, false).await.unwrap();
        jobs.save_job(&job("https://jobs/5", "https://in/carol"), true, true).await.unwrap();

        let recruiters = jobs.load_recruiters().await.unwrap();
        assert_eq!(recruiters, vec!["https://in/bob", "https://in/alice"]);

        assert_eq!(jobs.mark_recruiter_connected("https://in/alice").await.unwrap(), 2);
        assert_eq!(jobs.load_recruiters().await.unwrap(), vec!["https://in/bob"]);
    }

    #[tokio::test]
    async fn test_question_insert_is_unique_per_type() {
        let db = Database::in_memory().await.unwrap();
        let questions = db.questions();
        let row = QuestionRow {
            question_type: "radio".to_string(),
            question: "do you need a visa?".to_string(),
            answer: "no".to_string(),
        };
        assert!(questions.insert(&row).await.unwrap());
        assert!(!questions.insert(&row).await.unwrap());

        let textbox = QuestionRow {
            question_type: "textbox".to_string(),
            ..row.clone()
        };
        assert!(questions.insert(&textbox).await.unwrap());
        assert_eq!(questions.load_all().await.unwrap().len(), 2);

        assert!(questions
            .update_answer("radio", "do you need a visa?", "yes")
            .await
            .unwrap());
        let stored = questions.load_all().await.unwrap();
        assert_eq!(stored[0].answer, "yes");

        assert!(questions.remove("textbox", "do you need a visa?").await.unwrap());
        assert!(!questions.remove("textbox", "do you need a visa?").await.unwrap());
    }
}
