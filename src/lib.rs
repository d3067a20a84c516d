//! Job application assistant: fills unseen application forms from a stored
//! profile, a question/answer cache and a generative model.

pub mod answers;
pub mod cli;
pub mod core;
pub mod form;
pub mod types;
pub mod utils;
pub mod workflow;

pub use answers::{Answerer, QuestionAnswerer, QuestionCache, QuestionKind};
pub use crate::core::{ConfigManager, Database};
pub use form::{Control, Decision, FillAction, FormFiller, FormSection};
pub use types::{Job, Profile};
pub use workflow::{EasyApplier, JobBoard, JobManager, ReplayBoard, RunMode, RunSummary};

/// Application logging entry point, forwards to `tracing`.
#[macro_export]
macro_rules! app_log {
    (trace, $($arg:tt)+) => { ::tracing::trace!($($arg)+) };
    (debug, $($arg:tt)+) => { ::tracing::debug!($($arg)+) };
    (info, $($arg:tt)+) => { ::tracing::info!($($arg)+) };
    (warn, $($arg:tt)+) => { ::tracing::warn!($($arg)+) };
    (error, $($arg:tt)+) => { ::tracing::error!($($arg)+) };
}
