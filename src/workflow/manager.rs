// src/workflow/manager.rs
//! Apply, reapply and reconnect workflows

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::applier::EasyApplier;
use super::board::{ConnectOutcome, JobBoard, SearchPage};
use super::search::{build_search_filters, SearchQuery};
use crate::app_log;
use crate::core::config_manager::{LimitSettings, PacingSettings, Settings};
use crate::core::{Database, SearchConfig};
use crate::types::Job;

const REPEAT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const REPEAT_LOG_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Consecutive result pages that may fail before a search is abandoned.
pub const MAX_FAILED_PAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Apply,
    Reapply,
    Reconnect,
}

impl FromStr for RunMode {
    type Err = std::convert::Infallible;

    /// Anything that mentions neither reapply nor reconnect means apply
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = s.to_lowercase();
        Ok(if mode.contains("reapply") {
            RunMode::Reapply
        } else if mode.contains("reconnect") {
            RunMode::Reconnect
        } else {
            RunMode::Apply
        })
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Apply => "apply",
            RunMode::Reapply => "reapply",
            RunMode::Reconnect => "reconnect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub connected: usize,
    pub connect_failed: usize,
    pub daily_limit_reached: bool,
    pub weekly_limit_reached: bool,
}

/// Random pauses between page loads.
#[derive(Debug, Clone)]
pub struct Pacer {
    settings: PacingSettings,
}

impl Pacer {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    pub fn delay(&self) -> Duration {
        let min = self.settings.min_delay_ms.min(self.settings.max_delay_ms);
        let max = self.settings.max_delay_ms.max(min);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn pause(&self) {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

pub struct JobManager {
    board: Arc<dyn JobBoard>,
    applier: EasyApplier,
    db: Database,
    search: SearchConfig,
    limits: LimitSettings,
    pacer: Pacer,
}

impl JobManager {
    pub fn new(
        board: Arc<dyn JobBoard>,
        applier: EasyApplier,
        db: Database,
        search: SearchConfig,
        settings: &Settings,
    ) -> Self {
        Self {
            board,
            applier,
            db,
            search,
            limits: settings.limits.clone(),
            pacer: Pacer::new(settings.pacing.clone()),
        }
    }

    pub fn applier(&self) -> &EasyApplier {
        &self.applier
    }

    pub async fn run(&mut self, mode: RunMode) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4();
        let summary = self
            .run_mode(mode)
            .instrument(tracing::info_span!("run", %run_id, %mode))
            .await?;

        app_log!(info, "Run finished: {:?}", summary);
        Ok(summary)
    }

    async fn run_mode(&mut self, mode: RunMode) -> Result<RunSummary> {
        match mode {
            RunMode::Reapply => self.reapply().await,
            RunMode::Reconnect => self.reconnect(0).await,
            RunMode::Apply => {
                let mut summary = self.apply().await?;
                let connections = self.reconnect(self.limits.reconnect_target).await?;
                summary.connected = connections.connected;
                summary.connect_failed = connections.connect_failed;
                summary.weekly_limit_reached = connections.weekly_limit_reached;
                Ok(summary)
            }
        }
    }

    /// Run, then wait a day and run again, forever
    pub async fn run_repeating(&mut self, mode: RunMode) -> Result<()> {
        loop {
            self.run(mode).await?;
            app_log!(info, "All done, halting.");

            let mut remaining = REPEAT_INTERVAL;
            while !remaining.is_zero() {
                let secs = remaining.as_secs();
                app_log!(
                    info,
                    "Time left: {} hours, {} minutes, {} seconds",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                );
                let wait = remaining.min(REPEAT_LOG_INTERVAL);
                tokio::time::sleep(wait).await;
                remaining -= wait;
            }
        }
    }

    fn searches(&self) -> Vec<(String, String)> {
        let mut searches = self
            .search
            .positions
            .iter()
            .flat_map(|position| {
                self.search
                    .locations
                    .iter()
                    .map(move |location| (position.clone(), location.clone()))
            })
            .collect::<Vec<_>>();
        searches.shuffle(&mut rand::thread_rng());
        searches
    }

    pub async fn apply(&mut self) -> Result<RunSummary> {
        app_log!(info, "Starting job application process");
        let filters = build_search_filters(&self.search);
        let mut summary = RunSummary {
            mode: RunMode::Apply,
            ..Default::default()
        };

        for (position, location) in self.searches() {
            app_log!(info, "Starting the search for position {} in {}.", position, location);

            let mut failed_pages = 0;
            for page in 0.. {
                if summary.applied > self.limits.max_daily_applications {
                    app_log!(info, "Daily applications target reached.");
                    return Ok(summary);
                }

                let query = SearchQuery::new(&position, &location, page, self.limits.page_size, &filters);
                app_log!(info, "Navigating to results page #{} at URL: {}", page, query.url());
                self.pacer.pause().await;

                let jobs = match self.board.search(&query).await {
                    Ok(SearchPage::Jobs(jobs)) => jobs,
                    Ok(SearchPage::NoResults) => {
                        app_log!(
                            info,
                            "No jobs left, applications = {}/{}",
                            summary.applied,
                            summary.failed
                        );
                        break;
                    }
                    Err(e) => {
                        app_log!(error, "Error during job application: {:#}", e);
                        failed_pages += 1;
                        if failed_pages >= MAX_FAILED_PAGES {
                            app_log!(
                                warn,
                                "Giving up on {} in {} after {} failed pages",
                                position,
                                location,
                                failed_pages
                            );
                            break;
                        }
                        continue;
                    }
                };
                failed_pages = 0;

                let easy_apply = jobs.iter().filter(|job| job.is_easy_apply()).count();
                app_log!(info, "Found {} jobs on this page", easy_apply);

                for mut job in jobs {
                    if !job.is_easy_apply() {
                        continue;
                    }
                    if job.is_blacklisted(&self.search.companies_blacklist) {
                        app_log!(info, "{} is blacklisted, skipping", job.company);
                        summary.skipped += 1;
                        continue;
                    }
                    if self.db.jobs().is_applied(&job.link).await? {
                        app_log!(info, "Already applied to {}, skipping", job.link);
                        summary.skipped += 1;
                        continue;
                    }

                    self.pacer.pause().await;
                    if self.board.daily_limit_reached().await? {
                        app_log!(
                            info,
                            "Daily applications exceeded, applications = {}/{}",
                            summary.applied,
                            summary.failed
                        );
                        summary.daily_limit_reached = true;
                        return Ok(summary);
                    }

                    self.apply_to(&mut job, &mut summary).await?;
                }

                app_log!(
                    info,
                    "Applying to jobs on this page has been completed, applications = {}/{}",
                    summary.applied,
                    summary.failed
                );
            }
        }

        Ok(summary)
    }

    async fn apply_to(&mut self, job: &mut Job, summary: &mut RunSummary) -> Result<()> {
        app_log!(info, "Applying for job: {} at {} {}", job.title, job.company, job.link);

        let result = self.applier.apply(self.board.as_ref(), job).await;
        let connected = job.connected_by_default();

        match result {
            Ok(()) => {
                summary.applied += 1;
                app_log!(
                    info,
                    "Successfully applied to job {} at {} {}, applications = {}/{}",
                    job.title,
                    job.company,
                    job.link,
                    summary.applied,
                    summary.failed
                );
                self.db.jobs().save_job(job, true, connected).await
            }
            Err(e) => {
                summary.failed += 1;
                app_log!(
                    info,
                    "Failed applying to job {} at {}, applications = {}/{}: {:#}",
                    job.title,
                    job.company,
                    summary.applied,
                    summary.failed,
                    e
                );
                self.db.jobs().save_job(job, false, connected).await
            }
        }
    }

    pub async fn reapply(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            mode: RunMode::Reapply,
            ..Default::default()
        };

        let records = self.db.jobs().load_unapplied().await?;
        app_log!(info, "Reapplying to {} jobs", records.len());

        for record in records {
            let mut job = Job::from(record);
            if job.is_blacklisted(&self.search.companies_blacklist) {
                app_log!(info, "{} is blacklisted, skipping", job.company);
                summary.skipped += 1;
                continue;
            }

            app_log!(info, "Applying for job: {} at {}", job.title, job.company);
            self.pacer.pause().await;
            match self.applier.apply(self.board.as_ref(), &mut job).await {
                Ok(()) => {
                    app_log!(info, "Reapplied to {}", job.link);
                    summary.applied += 1;
                    let connected = job.connected;
                    self.db.jobs().save_job(&job, true, connected).await?;
                }
                Err(e) => {
                    app_log!(error, "Error during reapply: {}: {:#}", job.link, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Connect with recruiters of stored jobs, `target` 0 means no limit
    pub async fn reconnect(&mut self, target: usize) -> Result<RunSummary> {
        let mut summary = RunSummary {
            mode: RunMode::Reconnect,
            ..Default::default()
        };

        let recruiters = self.db.jobs().load_recruiters().await?;
        let total = recruiters.len();

        for recruiter in recruiters {
            if target > 0 && summary.connected > target {
                app_log!(info, "Successful connections target reached.");
                break;
            }

            self.pacer.pause().await;
            match self.board.connect(&recruiter).await {
                Ok(outcome) if outcome.is_connected() => {
                    summary.connected += 1;
                    app_log!(
                        info,
                        "Success reconnecting with {}, {}/{}/{}",
                        recruiter,
                        summary.connected,
                        summary.connect_failed,
                        total - summary.connected
                    );
                    self.db.jobs().mark_recruiter_connected(&recruiter).await?;
                }
                Ok(ConnectOutcome::WeeklyLimit) => {
                    app_log!(info, "Weekly invitation limit reached.");
                    summary.weekly_limit_reached = true;
                    break;
                }
                Ok(_) => {
                    summary.connect_failed += 1;
                    app_log!(
                        error,
                        "Failed reconnecting with {}, {}/{}/{}",
                        recruiter,
                        summary.connected,
                        summary.connect_failed,
                        total - summary.connected
                    );
                }
                Err(e) => {
                    summary.connect_failed += 1;
                    app_log!(error, "Failed reconnecting with {}: {:#}", recruiter, e);
                }
            }
        }

        Ok(summary)
    }
}
