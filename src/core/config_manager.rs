// src/core/config_manager.rs
//! Unified configuration management: environment, settings file and data folder

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::search_config::SearchConfig;
use crate::types::Profile;

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATABASE_URL: &str = "jobpilot.db";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub settings: Settings,
    pub data: DataFolder,
    pub search: SearchConfig,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub llm_api_key: String,
    pub llm_model_name: String,
    pub llm_api_url: String,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub mode: String,
    pub settings_path: PathBuf,
}

/// Tunables read from `settings.toml`, every value has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub limits: LimitSettings,
    pub llm: LlmSettings,
    pub pacing: PacingSettings,
    pub cover_letter: CoverLetterSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_daily_applications: usize,
    pub reconnect_target: usize,
    pub form_timeout_secs: u64,
    pub page_size: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_daily_applications: 100,
            reconnect_target: 15,
            form_timeout_secs: 600,
            page_size: 25,
        }
    }
}

impl LimitSettings {
    pub fn form_timeout(&self) -> Duration {
        Duration::from_secs(self.form_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub default_retry_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: 10,
            default_retry_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 5000,
        }
    }
}

impl PacingSettings {
    pub fn none() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoverLetterSettings {
    pub output_dir: PathBuf,
    pub typst_binary: String,
    pub max_bytes: u64,
}

impl Default for CoverLetterSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("cover_letters"),
            typst_binary: "typst".to_string(),
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Paths of the validated user data folder.
#[derive(Debug, Clone)]
pub struct DataFolder {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub resume_yaml_path: PathBuf,
    pub resume_document_path: PathBuf,
}

const RESUME_DOCUMENTS: [&str; 2] = ["resume.pdf", "resume.docx"];

impl DataFolder {
    pub fn validate(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Data folder not found: {}", root.display());
        }

        let config_path = root.join("config.yaml");
        let resume_yaml_path = root.join("resume.yaml");
        let resume_document_path = RESUME_DOCUMENTS
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.exists());

        let mut missing = Vec::new();
        if !config_path.exists() {
            missing.push("config.yaml".to_string());
        }
        if !resume_yaml_path.exists() {
            missing.push("resume.yaml".to_string());
        }
        if resume_document_path.is_none() {
            missing.push(RESUME_DOCUMENTS.join(" or "));
        }
        if !missing.is_empty() {
            anyhow::bail!("Missing files in the data folder: {}", missing.join(", "));
        }

        Ok(Self {
            root: root.to_path_buf(),
            config_path,
            resume_yaml_path,
            resume_document_path: resume_document_path.unwrap_or_default(),
        })
    }
}

impl EnvironmentConfig {
    pub fn load() -> Result<Self> {
        Ok(Self {
            llm_api_key: required_env("LLM_API_KEY")?,
            llm_model_name: required_env("LLM_MODEL_NAME")?,
            llm_api_url: optional_env("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            database_url: Self::database_url_from_env(),
            data_dir: PathBuf::from(optional_env("DATA_DIR").unwrap_or_else(|| "data".to_string())),
            mode: optional_env("MODE").unwrap_or_else(|| "apply".to_string()),
            settings_path: PathBuf::from(
                optional_env("JOBPILOT_SETTINGS").unwrap_or_else(|| "settings.toml".to_string()),
            ),
        })
    }

    /// Database location alone, for commands that never call the model
    pub fn database_url_from_env() -> String {
        optional_env("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }
}

fn required_env(name: &str) -> Result<String> {
    optional_env(name)
        .ok_or_else(|| anyhow::anyhow!("Environment variable '{}' is not set or is empty.", name))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Settings {
    /// Missing file means defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl ConfigManager {
    /// Load all configurations
    pub fn load() -> Result<Self> {
        let environment = EnvironmentConfig::load()?;
        Self::from_environment(environment)
    }

    pub fn from_environment(environment: EnvironmentConfig) -> Result<Self> {
        info!("Loading data folder: {}", environment.data_dir.display());
        let settings = Settings::load(&environment.settings_path)?;
        let data = DataFolder::validate(&environment.data_dir)?;

        let config_text = std::fs::read_to_string(&data.config_path)
            .with_context(|| format!("Failed to read {}", data.config_path.display()))?;
        let search = SearchConfig::from_yaml(&config_text, &data.config_path)?;

        let resume_text = std::fs::read_to_string(&data.resume_yaml_path)
            .with_context(|| format!("Failed to read {}", data.resume_yaml_path.display()))?;
        let profile = Profile::from_yaml(&resume_text)?;

        Ok(Self {
            environment,
            settings,
            data,
            search,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::search_config::tests::CONFIG;

    #[test]
    fn test_settings_defaults_and_partial_override() {
        let settings = Settings::from_toml("[limits]\nmax_daily_applications = 5\n").unwrap();
        assert_eq!(settings.limits.max_daily_applications, 5);
        assert_eq!(settings.limits.page_size, 25);
        assert_eq!(settings.llm.default_retry_secs, 30);
        assert_eq!(settings.cover_letter.max_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_data_folder_reports_all_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), CONFIG).unwrap();
        let err = DataFolder::validate(dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing files in the data folder: resume.yaml, resume.pdf or resume.docx"
        );
    }

    #[test]
    fn test_data_folder_prefers_pdf() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.yaml", "resume.yaml", "resume.pdf", "resume.docx"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let folder = DataFolder::validate(dir.path()).unwrap();
        assert_eq!(folder.resume_document_path, dir.path().join("resume.pdf"));
    }

    #[test]
    fn test_missing_data_folder() {
        let err = DataFolder::validate(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().starts_with("Data folder not found"));
    }

    #[test]
    fn test_from_environment_loads_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.yaml"), CONFIG).unwrap();
        std::fs::write(dir.path().join("resume.yaml"), "interests: [chess]\n").unwrap();
        std::fs::write(dir.path().join("resume.docx"), "").unwrap();

        let environment = EnvironmentConfig {
            llm_api_key: "key".to_string(),
            llm_model_name: "model".to_string(),
            llm_api_url: DEFAULT_LLM_API_URL.to_string(),
            database_url: "sqlite::memory:".to_string(),
            data_dir: dir.path().to_path_buf(),
            mode: "apply".to_string(),
            settings_path: dir.path().join("missing.toml"),
        };
        let config = ConfigManager::from_environment(environment).unwrap();
        assert_eq!(config.profile.interests, vec!["chess"]);
        assert_eq!(config.search.locations, vec!["Germany"]);
        assert_eq!(config.settings.limits.reconnect_target, 15);
    }
}
