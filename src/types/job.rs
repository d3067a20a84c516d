// src/types/job.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing apply methods that open the in-site application form.
pub const EASY_APPLY_METHODS: [&str; 2] = ["Easy Apply", "Promoted"];

/// A listing as seen while searching or applying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    #[serde(default)]
    pub apply_method: String,
    #[serde(default)]
    pub recruiter: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub connected: bool,
}

impl Job {
    pub fn new(title: &str, company: &str, location: &str, link: &str) -> Self {
        Self {
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            link: link.to_string(),
            ..Default::default()
        }
    }

    pub fn with_apply_method(mut self, method: &str) -> Self {
        self.apply_method = method.to_string();
        self
    }

    pub fn with_recruiter(mut self, recruiter: &str) -> Self {
        self.recruiter = recruiter.to_string();
        self
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description;
    }

    pub fn set_recruiter(&mut self, recruiter: String) {
        self.recruiter = recruiter;
    }

    pub fn is_easy_apply(&self) -> bool {
        EASY_APPLY_METHODS.contains(&self.apply_method.as_str())
    }

    /// Blacklist entries match the trimmed company name exactly.
    pub fn is_blacklisted(&self, blacklist: &[String]) -> bool {
        let company = self.company.trim();
        blacklist.iter().any(|entry| entry == company)
    }

    /// Jobs without a recruiter have nobody to connect with.
    pub fn connected_by_default(&self) -> bool {
        self.recruiter.is_empty()
    }
}

/// Persisted job row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub link: String,
    pub recruiter: String,
    pub location: String,
    pub applied: bool,
    pub connected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        Self {
            title: record.title,
            company: record.company,
            location: record.location,
            link: record.link,
            apply_method: String::new(),
            recruiter: record.recruiter,
            id: record.id.to_string(),
            description: String::new(),
            applied: record.applied,
            connected: record.connected,
        }
    }
}
