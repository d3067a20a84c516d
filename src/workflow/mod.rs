// src/workflow/mod.rs
pub mod applier;
pub mod board;
pub mod manager;
pub mod replay;
pub mod search;

pub use applier::{EasyApplier, FormError};
pub use board::{ApplicationSession, ConnectOutcome, JobBoard, ListingStatus, SearchPage};
pub use manager::{JobManager, Pacer, RunMode, RunSummary};
pub use replay::{ReplayBoard, ReplayEvent};
pub use search::{build_search_filters, SearchQuery};
