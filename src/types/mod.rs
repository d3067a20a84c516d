// src/types/mod.rs
pub mod job;
pub mod profile;

pub use job::{Job, JobRecord, EASY_APPLY_METHODS};
pub use profile::{Profile, Section};
