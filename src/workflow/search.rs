// src/workflow/search.rs
//! Job search URLs built from the search preferences

use crate::core::search_config::{SearchConfig, EXPERIENCE_LEVELS, JOB_TYPES, WORK_TYPES};

pub const SEARCH_BASE_URL: &str = "https://www.linkedin.com/jobs/search/";

/// Time-posted filter for each date option, first enabled option wins
const DATE_PARAMS: [(&str, &str); 6] = [
    ("all time", ""),
    ("month", "&f_TPR=r2592000"),
    ("week", "&f_TPR=r604800"),
    ("24 hours", "&f_TPR=r86400"),
    ("12 hours", "&f_TPR=r43200"),
    ("hour", "&f_TPR=r3600"),
];

/// Query string shared by every search: `?f_E=..&f_WT=..&f_JT=..&f_LF=f_AL[&f_TPR=..]`
pub fn build_search_filters(config: &SearchConfig) -> String {
    let mut parts = Vec::new();

    let levels = SearchConfig::enabled(&config.experience_level, &EXPERIENCE_LEVELS)
        .into_iter()
        .map(|(index, _)| (index + 1).to_string())
        .collect::<Vec<_>>();
    if !levels.is_empty() {
        parts.push(format!("f_E={}", levels.join(",")));
    }

    let work_types = SearchConfig::enabled(&config.work_types, &WORK_TYPES)
        .into_iter()
        .map(|(index, _)| (index + 1).to_string())
        .collect::<Vec<_>>();
    if !work_types.is_empty() {
        parts.push(format!("f_WT={}", work_types.join(",")));
    }

    let job_types = SearchConfig::enabled(&config.job_types, &JOB_TYPES)
        .into_iter()
        .filter_map(|(_, key)| key.chars().next())
        .map(|first| first.to_uppercase().to_string())
        .collect::<Vec<_>>();
    if !job_types.is_empty() {
        parts.push(format!("f_JT={}", job_types.join(",")));
    }

    let date = DATE_PARAMS
        .iter()
        .find(|(key, _)| config.date.get(*key).copied().unwrap_or(false))
        .map(|(_, param)| *param)
        .unwrap_or("");

    // Easy Apply only
    parts.push("f_LF=f_AL".to_string());

    format!("?{}{}", parts.join("&"), date)
}

/// One results page of one (position, location) search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub position: String,
    pub location: String,
    pub page: usize,
    pub start: usize,
    pub filters: String,
}

impl SearchQuery {
    pub fn new(position: &str, location: &str, page: usize, page_size: usize, filters: &str) -> Self {
        Self {
            position: position.to_string(),
            location: location.to_string(),
            page,
            start: page * page_size,
            filters: filters.to_string(),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}{}&keywords={}&location={}&start={}",
            SEARCH_BASE_URL,
            self.filters,
            urlencoding::encode(&self.position),
            urlencoding::encode(&self.location),
            self.start
        )
    }
}
