// src/core/mod.rs
//! Configuration, persistence and file system services

pub mod config_manager;
pub mod database;
pub mod fs_ops;
pub mod search_config;

pub use config_manager::{ConfigManager, DataFolder, EnvironmentConfig, Settings};
pub use database::{Database, JobRepository, QuestionRepository, QuestionRow};
pub use fs_ops::FsOps;
pub use search_config::{ConfigError, SearchConfig};
