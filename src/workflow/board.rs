// src/workflow/board.rs
//! The job site as seen by the workflows.
//!
//! Everything site-specific (navigation, listing tiles, modal dialogs, profile
//! pages) lives behind these two traits.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::search::SearchQuery;
use crate::form::{Decision, FormSection, PrimaryButton};
use crate::types::Job;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchPage {
    Jobs(Vec<Job>),
    NoResults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Open,
    /// No longer accepting applications
    Closed,
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    Connected,
    AlreadyPending,
    AlreadyConnected,
    WeeklyLimit,
    Unavailable,
}

impl ConnectOutcome {
    /// Whether the recruiter can be marked as connected
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectOutcome::Connected | ConnectOutcome::AlreadyPending | ConnectOutcome::AlreadyConnected
        )
    }
}

#[async_trait]
pub trait JobBoard: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;

    /// Navigate to a listing
    async fn open(&self, job: &Job) -> Result<Box<dyn ApplicationSession>>;

    async fn daily_limit_reached(&self) -> Result<bool>;

    async fn connect(&self, recruiter: &str) -> Result<ConnectOutcome>;
}

/// One open listing and, once started, its application form.
#[async_trait]
pub trait ApplicationSession: Send {
    async fn status(&mut self) -> Result<ListingStatus>;

    async fn description(&mut self) -> Result<String>;

    /// Hiring team profile URL, empty when none is shown
    async fn recruiter(&mut self) -> Result<String>;

    async fn start(&mut self) -> Result<()>;

    async fn sections(&mut self) -> Result<Vec<FormSection>>;

    async fn perform(&mut self, section: usize, decision: &Decision) -> Result<()>;

    async fn primary_button(&mut self) -> Result<Option<PrimaryButton>>;

    async fn progress(&mut self) -> Result<Option<String>>;

    async fn press_primary(&mut self) -> Result<()>;

    async fn discard(&mut self) -> Result<()>;
}
