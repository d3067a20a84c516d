// src/workflow/applier.rs
//! Drives one application form from first step to submission

use anyhow::Result;
use std::time::Duration;
use thiserror::Error;

use super::board::{ApplicationSession, JobBoard, ListingStatus};
use crate::app_log;
use crate::form::{FormFiller, PrimaryButton};
use crate::types::Job;

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Failed applying within {0:?}")]
    Timeout(Duration),

    #[error("Form did not advance after pressing {0:?}, an answer or upload was rejected")]
    StuckStep(PrimaryButton),

    #[error("No primary button found on the form step")]
    NoPrimaryButton,
}

pub struct EasyApplier {
    filler: FormFiller,
    timeout: Duration,
}

impl EasyApplier {
    pub fn new(filler: FormFiller, timeout: Duration) -> Self {
        Self { filler, timeout }
    }

    pub fn filler(&self) -> &FormFiller {
        &self.filler
    }

    /// Open the listing on `board` and apply to it
    pub async fn apply(&mut self, board: &dyn JobBoard, job: &mut Job) -> Result<()> {
        let mut session = board.open(job).await?;
        self.apply_session(session.as_mut(), job).await
    }

    pub async fn apply_session(&mut self, session: &mut dyn ApplicationSession, job: &mut Job) -> Result<()> {
        match session.status().await? {
            ListingStatus::Closed => {
                app_log!(info, "{} at {} no longer accepts applications", job.title, job.company);
                return Ok(());
            }
            ListingStatus::AlreadyApplied => {
                app_log!(info, "Already applied to {} at {}", job.title, job.company);
                return Ok(());
            }
            ListingStatus::Open => {}
        }

        match self.fill(session, job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(discard_error) = session.discard().await {
                    app_log!(warn, "Failed to discard application: {}", discard_error);
                }
                app_log!(error, "Failed to apply to job: {} at {}: {:#}", job.title, job.company, e);
                Err(e.context(format!("Failed to apply to job: {} at {}", job.title, job.company)))
            }
        }
    }

    async fn fill(&mut self, session: &mut dyn ApplicationSession, job: &mut Job) -> Result<()> {
        job.set_description(session.description().await?);
        job.set_recruiter(session.recruiter().await?);
        session.start().await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.fill_steps(session, job))
            .await
            .map_err(|_| FormError::Timeout(timeout))?
    }

    async fn fill_steps(&mut self, session: &mut dyn ApplicationSession, job: &Job) -> Result<()> {
        let mut step = 1;
        loop {
            app_log!(debug, "Filling step {} for {}", step, job.link);
            if self.fill_step(session, job).await? {
                app_log!(debug, "Application form submitted");
                return Ok(());
            }
            step += 1;
        }
    }

    /// Fill the current step and press its primary button, true once submitted
    async fn fill_step(&mut self, session: &mut dyn ApplicationSession, job: &Job) -> Result<bool> {
        let sections = session.sections().await?;
        let decisions = self.filler.plan(job, &sections).await?;

        for (index, decision) in decisions.iter().enumerate() {
            if decision.action.is_skip() {
                continue;
            }
            session.perform(index, decision).await?;
        }

        let button = session
            .primary_button()
            .await?
            .ok_or(FormError::NoPrimaryButton)?;

        match button {
            PrimaryButton::Submit => {
                session.press_primary().await?;
                Ok(true)
            }
            PrimaryButton::Continue => {
                session.press_primary().await?;
                Ok(false)
            }
            PrimaryButton::Next | PrimaryButton::Review => {
                let before = session.progress().await?;
                session.press_primary().await?;
                let after = session.progress().await?;
                if before == after {
                    return Err(FormError::StuckStep(button).into());
                }
                Ok(false)
            }
        }
    }
}
