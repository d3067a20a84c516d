// src/core/search_config.rs
//! Job search preferences from `config.yaml`

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const EXPERIENCE_LEVELS: [&str; 6] = [
    "internship",
    "entry",
    "associate",
    "mid-senior level",
    "director",
    "executive",
];

pub const JOB_TYPES: [&str; 7] = [
    "full-time",
    "contract",
    "part-time",
    "temporary",
    "internship",
    "other",
    "volunteer",
];

pub const DATE_FILTERS: [&str; 6] = ["all time", "month", "week", "24 hours", "12 hours", "hour"];

pub const WORK_TYPES: [&str; 3] = ["on-site", "hybrid", "remote"];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing or invalid key '{key}' in config file {path}")]
    MissingKey { key: String, path: PathBuf },

    #[error("Invalid type for key '{key}' in config file {path}. Expected {expected}, received {received}.")]
    InvalidType {
        key: String,
        path: PathBuf,
        expected: &'static str,
        received: &'static str,
    },

    #[error("Invalid field '{field}' in {category} in config file {path}")]
    UnknownField {
        field: String,
        category: String,
        path: PathBuf,
    },

    #[error("{category} '{field}' must be a boolean in config file {path}")]
    NotBoolean {
        field: String,
        category: String,
        path: PathBuf,
    },

    #[error("'{category}' must be a list of strings in config file {path}")]
    NotStringList { category: String, path: PathBuf },
}

/// Validated search preferences. Flag maps hold exactly the allowed keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub experience_level: BTreeMap<String, bool>,
    pub job_types: BTreeMap<String, bool>,
    pub date: BTreeMap<String, bool>,
    pub work_types: BTreeMap<String, bool>,
    pub positions: Vec<String>,
    pub locations: Vec<String>,
    pub companies_blacklist: Vec<String>,
}

impl SearchConfig {
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let root = root.as_mapping().cloned().unwrap_or_default();

        let required: [(&str, &'static str); 7] = [
            ("experience_level", "mapping"),
            ("job_types", "mapping"),
            ("date", "mapping"),
            ("positions", "list"),
            ("locations", "list"),
            ("companies_blacklist", "list"),
            ("work_types", "mapping"),
        ];

        for (key, expected) in required {
            let value = root.get(key).ok_or_else(|| ConfigError::MissingKey {
                key: key.to_string(),
                path: path.to_path_buf(),
            })?;
            let matches = match expected {
                "mapping" => value.is_mapping(),
                _ => value.is_sequence(),
            };
            if !matches {
                return Err(ConfigError::InvalidType {
                    key: key.to_string(),
                    path: path.to_path_buf(),
                    expected,
                    received: type_name(value),
                });
            }
        }

        Ok(Self {
            experience_level: boolean_fields(&root, "experience_level", &EXPERIENCE_LEVELS, path)?,
            job_types: boolean_fields(&root, "job_types", &JOB_TYPES, path)?,
            date: boolean_fields(&root, "date", &DATE_FILTERS, path)?,
            work_types: boolean_fields(&root, "work_types", &WORK_TYPES, path)?,
            positions: string_list(&root, "positions", path)?,
            locations: string_list(&root, "locations", path)?,
            companies_blacklist: string_list(&root, "companies_blacklist", path)?,
        })
    }

    /// Enabled keys of a flag map, in the canonical order of `allowed`
    pub fn enabled<'a>(flags: &BTreeMap<String, bool>, allowed: &[&'a str]) -> Vec<(usize, &'a str)> {
        allowed
            .iter()
            .enumerate()
            .filter(|(_, key)| flags.get(**key).copied().unwrap_or(false))
            .map(|(index, key)| (index, *key))
            .collect()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn boolean_fields(
    root: &Mapping,
    category: &str,
    allowed: &[&str],
    path: &Path,
) -> Result<BTreeMap<String, bool>, ConfigError> {
    let section = root
        .get(category)
        .and_then(Value::as_mapping)
        .cloned()
        .unwrap_or_default();

    for key in section.keys() {
        let name = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", key));
        if !allowed.contains(&name.as_str()) {
            return Err(ConfigError::UnknownField {
                field: name,
                category: category.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    let mut flags = BTreeMap::new();
    for field in allowed {
        match section.get(*field).and_then(Value::as_bool) {
            Some(flag) => {
                flags.insert(field.to_string(), flag);
            }
            None => {
                return Err(ConfigError::NotBoolean {
                    field: field.to_string(),
                    category: capitalize(category),
                    path: path.to_path_buf(),
                })
            }
        }
    }
    Ok(flags)
}

fn string_list(root: &Mapping, category: &str, path: &Path) -> Result<Vec<String>, ConfigError> {
    let items = root
        .get(category)
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::NotStringList {
                    category: category.to_string(),
                    path: path.to_path_buf(),
                })
        })
        .collect()
}
