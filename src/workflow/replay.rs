// src/workflow/replay.rs
//! Offline job board replaying captured listings and form steps.
//!
//! Directory layout:
//!
//! ```text
//! listings.yaml          searches, each with pages of listings; optional daily_limit
//! recruiters.yaml        optional, recruiter URL -> connect outcome
//! jobs/<id>/job.yaml     link, status, description, recruiter
//! jobs/<id>/step-N.html  application form steps in order
//! ```

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::board::{ApplicationSession, ConnectOutcome, JobBoard, ListingStatus, SearchPage};
use super::search::SearchQuery;
use crate::app_log;
use crate::core::FsOps;
use crate::form::{Decision, FormSection, PrimaryButton, StepSnapshot};
use crate::types::Job;

const LISTINGS_FILE: &str = "listings.yaml";
const RECRUITERS_FILE: &str = "recruiters.yaml";
const JOBS_DIR: &str = "jobs";
const JOB_FILE: &str = "job.yaml";
const STEP_PREFIX: &str = "step-";

#[derive(Debug, Default, Deserialize)]
struct Listings {
    #[serde(default)]
    daily_limit: Option<usize>,
    #[serde(default)]
    searches: Vec<CapturedSearch>,
}

#[derive(Debug, Deserialize)]
struct CapturedSearch {
    position: String,
    location: String,
    #[serde(default)]
    pages: Vec<Vec<Job>>,
}

impl CapturedSearch {
    fn matches(&self, query: &SearchQuery) -> bool {
        self.position.eq_ignore_ascii_case(&query.position) && self.location.eq_ignore_ascii_case(&query.location)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CapturedJob {
    link: String,
    #[serde(default)]
    status: ListingStatus,
    #[serde(default)]
    description: String,
    #[serde(default)]
    recruiter: String,
}

/// Everything the replay board was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Searched {
        url: String,
        jobs: usize,
    },
    Filled {
        link: String,
        step: usize,
        section: String,
        decision: Decision,
    },
    Pressed {
        link: String,
        step: usize,
        button: PrimaryButton,
    },
    Discarded {
        link: String,
        step: usize,
    },
    Connected {
        recruiter: String,
        outcome: ConnectOutcome,
    },
}

type Transcript = Arc<Mutex<Vec<ReplayEvent>>>;

fn record(transcript: &Transcript, event: ReplayEvent) {
    match transcript.lock() {
        Ok(mut events) => events.push(event),
        Err(poisoned) => poisoned.into_inner().push(event),
    }
}

pub struct ReplayBoard {
    root: PathBuf,
    listings: Listings,
    jobs: HashMap<String, (PathBuf, CapturedJob)>,
    recruiters: HashMap<String, ConnectOutcome>,
    opened: AtomicUsize,
    transcript: Transcript,
}

impl ReplayBoard {
    pub async fn open_dir(root: &Path) -> Result<Self> {
        let listings_path = root.join(LISTINGS_FILE);
        let listings: Listings = serde_yaml::from_str(&FsOps::read_file_safe(&listings_path).await?)
            .with_context(|| format!("Failed to parse {}", listings_path.display()))?;

        let recruiters_path = root.join(RECRUITERS_FILE);
        let recruiters = if recruiters_path.exists() {
            serde_yaml::from_str(&FsOps::read_file_safe(&recruiters_path).await?)
                .with_context(|| format!("Failed to parse {}", recruiters_path.display()))?
        } else {
            HashMap::new()
        };

        let jobs = Self::load_jobs(&root.join(JOBS_DIR)).await?;

        app_log!(
            info,
            "Replay board {}: {} searches, {} captured jobs, {} recruiters",
            root.display(),
            listings.searches.len(),
            jobs.len(),
            recruiters.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            listings,
            jobs,
            recruiters,
            opened: AtomicUsize::new(0),
            transcript: Arc::new(Mutex::new(Vec::new())),
        })
    }

    async fn load_jobs(dir: &Path) -> Result<HashMap<String, (PathBuf, CapturedJob)>> {
        let mut jobs = HashMap::new();
        if !dir.exists() {
            return Ok(jobs);
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let job_dir = entry.path();
            let job_file = job_dir.join(JOB_FILE);
            if !job_file.is_file() {
                continue;
            }
            let captured: CapturedJob = serde_yaml::from_str(&FsOps::read_file_safe(&job_file).await?)
                .with_context(|| format!("Failed to parse {}", job_file.display()))?;
            jobs.insert(captured.link.clone(), (job_dir, captured));
        }

        Ok(jobs)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transcript(&self) -> Vec<ReplayEvent> {
        match self.transcript.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn write_transcript(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.transcript())?;
        FsOps::write_file_safe(path, &json).await
    }

    async fn load_steps(dir: &Path) -> Result<Vec<StepSnapshot>> {
        let mut numbered = Vec::new();
        for name in FsOps::list_files_with_prefix(dir, STEP_PREFIX).await? {
            let number = name
                .strip_prefix(STEP_PREFIX)
                .and_then(|rest| rest.strip_suffix(".html"))
                .and_then(|n| n.parse::<usize>().ok());
            match number {
                Some(number) => numbered.push((number, name)),
                None => app_log!(warn, "Ignoring unexpected step file {}", name),
            }
        }
        numbered.sort();

        let mut steps = Vec::with_capacity(numbered.len());
        for (_, name) in numbered {
            let html = FsOps::read_file_safe(&dir.join(&name)).await?;
            steps.push(StepSnapshot::parse(&html).with_context(|| format!("Failed to read {}", name))?);
        }
        Ok(steps)
    }
}

#[async_trait]
impl JobBoard for ReplayBoard {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let jobs = self
            .listings
            .searches
            .iter()
            .find(|search| search.matches(query))
            .and_then(|search| search.pages.get(query.page))
            .cloned()
            .unwrap_or_default();

        record(
            &self.transcript,
            ReplayEvent::Searched {
                url: query.url(),
                jobs: jobs.len(),
            },
        );

        if jobs.is_empty() {
            Ok(SearchPage::NoResults)
        } else {
            Ok(SearchPage::Jobs(jobs))
        }
    }

    async fn open(&self, job: &Job) -> Result<Box<dyn ApplicationSession>> {
        let (dir, captured) = self
            .jobs
            .get(&job.link)
            .with_context(|| format!("No captured listing for {}", job.link))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        let steps = Self::load_steps(dir).await?;

        Ok(Box::new(ReplaySession {
            job: captured.clone(),
            steps,
            current: 0,
            started: false,
            submitted: false,
            transcript: self.transcript.clone(),
        }))
    }

    async fn daily_limit_reached(&self) -> Result<bool> {
        Ok(self
            .listings
            .daily_limit
            .is_some_and(|limit| self.opened.load(Ordering::SeqCst) >= limit))
    }

    async fn connect(&self, recruiter: &str) -> Result<ConnectOutcome> {
        let outcome = self
            .recruiters
            .get(recruiter)
            .copied()
            .unwrap_or(ConnectOutcome::Unavailable);
        record(
            &self.transcript,
            ReplayEvent::Connected {
                recruiter: recruiter.to_string(),
                outcome,
            },
        );
        Ok(outcome)
    }
}

struct ReplaySession {
    job: CapturedJob,
    steps: Vec<StepSnapshot>,
    current: usize,
    started: bool,
    submitted: bool,
    transcript: Transcript,
}

impl ReplaySession {
    fn current_step(&self) -> Result<&StepSnapshot> {
        if !self.started {
            anyhow::bail!("Application for {} has not been started", self.job.link);
        }
        if self.submitted {
            anyhow::bail!("Application for {} was already submitted", self.job.link);
        }
        self.steps
            .get(self.current)
            .ok_or_else(|| anyhow!("No step {} captured for {}", self.current + 1, self.job.link))
    }
}

#[async_trait]
impl ApplicationSession for ReplaySession {
    async fn status(&mut self) -> Result<ListingStatus> {
        Ok(self.job.status)
    }

    async fn description(&mut self) -> Result<String> {
        Ok(self.job.description.clone())
    }

    async fn recruiter(&mut self) -> Result<String> {
        Ok(self.job.recruiter.clone())
    }

    async fn start(&mut self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("No application form captured for {}", self.job.link);
        }
        self.started = true;
        Ok(())
    }

    async fn sections(&mut self) -> Result<Vec<FormSection>> {
        Ok(self.current_step()?.sections.clone())
    }

    async fn perform(&mut self, section: usize, decision: &Decision) -> Result<()> {
        let step = self.current_step()?;
        let target = step
            .sections
            .get(section)
            .with_context(|| format!("No section {} on step {}", section, self.current + 1))?;
        if let Some(control) = decision.control {
            if control >= target.controls.len() {
                anyhow::bail!("No control {} in section '{}'", control, target.text);
            }
        }

        let event = ReplayEvent::Filled {
            link: self.job.link.clone(),
            step: self.current + 1,
            section: target.text.clone(),
            decision: decision.clone(),
        };
        record(&self.transcript, event);
        Ok(())
    }

    async fn primary_button(&mut self) -> Result<Option<PrimaryButton>> {
        Ok(self.current_step()?.primary_button)
    }

    async fn progress(&mut self) -> Result<Option<String>> {
        Ok(self.current_step()?.progress.clone())
    }

    async fn press_primary(&mut self) -> Result<()> {
        let button = self
            .current_step()?
            .primary_button
            .with_context(|| format!("No primary button on step {}", self.current + 1))?;

        record(
            &self.transcript,
            ReplayEvent::Pressed {
                link: self.job.link.clone(),
                step: self.current + 1,
                button,
            },
        );

        if button == PrimaryButton::Submit {
            self.submitted = true;
        } else if self.current + 1 < self.steps.len() {
            self.current += 1;
        } else if button == PrimaryButton::Continue {
            anyhow::bail!("No step captured after step {}", self.current + 1);
        }
        Ok(())
    }

    async fn discard(&mut self) -> Result<()> {
        record(
            &self.transcript,
            ReplayEvent::Discarded {
                link: self.job.link.clone(),
                step: self.current + 1,
            },
        );
        self.started = false;
        Ok(())
    }
}
