// src/types/profile.rs
//! Personal profile loaded from `resume.yaml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalInformation {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<serde_yaml::Value>,
    pub phone_prefix: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationDetails {
    pub education_level: Option<String>,
    pub institution: Option<String>,
    pub field_of_study: Option<String>,
    pub final_evaluation_grade: Option<String>,
    pub education_period: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceDetails {
    pub position: Option<String>,
    pub company: Option<String>,
    pub employment_period: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    #[serde(default)]
    pub key_responsibilities: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub skills_acquired: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// Shared shape of achievements and certifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Language {
    pub language: Option<String>,
    pub proficiency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Availability {
    pub notice_period: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalaryExpectations {
    pub salary_range_usd: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfIdentification {
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub veteran: Option<bool>,
    pub disability: Option<bool>,
    pub ethnicity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegalAuthorization {
    pub eu_work_authorization: Option<bool>,
    pub us_work_authorization: Option<bool>,
    pub requires_us_visa: Option<bool>,
    pub requires_us_sponsorship: Option<bool>,
    pub requires_eu_visa: Option<bool>,
    pub legally_allowed_to_work_in_eu: Option<bool>,
    pub legally_allowed_to_work_in_us: Option<bool>,
    pub requires_eu_sponsorship: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkPreferences {
    pub remote_work: Option<bool>,
    pub in_person_work: Option<bool>,
    pub open_to_relocation: Option<bool>,
    pub willing_to_complete_assessments: Option<bool>,
    pub willing_to_undergo_drug_tests: Option<bool>,
    pub willing_to_undergo_background_checks: Option<bool>,
}

/// Everything the applicant shares with application forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub personal_information: Option<PersonalInformation>,
    #[serde(default)]
    pub education_details: Vec<EducationDetails>,
    #[serde(default)]
    pub experience_details: Vec<ExperienceDetails>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub achievements: Vec<NamedEntry>,
    #[serde(default)]
    pub certifications: Vec<NamedEntry>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub self_identification: Option<SelfIdentification>,
    pub legal_authorization: Option<LegalAuthorization>,
    pub work_preferences: Option<WorkPreferences>,
    pub availability: Option<Availability>,
    pub salary_expectations: Option<SalaryExpectations>,
}

/// Profile sections a free-text question can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    PersonalInformation,
    SelfIdentification,
    LegalAuthorization,
    WorkPreferences,
    EducationDetails,
    ExperienceDetails,
    Projects,
    Availability,
    SalaryExpectations,
    Certifications,
    Languages,
    Interests,
    CoverLetter,
}

impl Section {
    pub const ALL: [Section; 13] = [
        Section::PersonalInformation,
        Section::SelfIdentification,
        Section::LegalAuthorization,
        Section::WorkPreferences,
        Section::EducationDetails,
        Section::ExperienceDetails,
        Section::Projects,
        Section::Availability,
        Section::SalaryExpectations,
        Section::Certifications,
        Section::Languages,
        Section::Interests,
        Section::CoverLetter,
    ];

    /// Name the classifier is asked to answer with.
    pub fn label(&self) -> &'static str {
        match self {
            Section::PersonalInformation => "Personal information",
            Section::SelfIdentification => "Self Identification",
            Section::LegalAuthorization => "Legal Authorization",
            Section::WorkPreferences => "Work Preferences",
            Section::EducationDetails => "Education Details",
            Section::ExperienceDetails => "Experience Details",
            Section::Projects => "Projects",
            Section::Availability => "Availability",
            Section::SalaryExpectations => "Salary Expectations",
            Section::Certifications => "Certifications",
            Section::Languages => "Languages",
            Section::Interests => "Interests",
            Section::CoverLetter => "Cover letter",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Profile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse resume YAML")
    }

    /// Render one section as YAML, `None` when the profile does not have it.
    pub fn section(&self, section: Section) -> Result<Option<String>> {
        fn render<T: Serialize>(value: &T) -> Result<Option<String>> {
            Ok(Some(
                serde_yaml::to_string(value).context("Failed to render profile section")?,
            ))
        }
        fn render_list<T: Serialize>(items: &[T]) -> Result<Option<String>> {
            if items.is_empty() {
                Ok(None)
            } else {
                render(&items)
            }
        }

        match section {
            Section::PersonalInformation => self.personal_information.as_ref().map_or(Ok(None), render),
            Section::SelfIdentification => self.self_identification.as_ref().map_or(Ok(None), render),
            Section::LegalAuthorization => self.legal_authorization.as_ref().map_or(Ok(None), render),
            Section::WorkPreferences => self.work_preferences.as_ref().map_or(Ok(None), render),
            Section::EducationDetails => render_list(&self.education_details),
            Section::ExperienceDetails => render_list(&self.experience_details),
            Section::Projects => render_list(&self.projects),
            Section::Availability => self.availability.as_ref().map_or(Ok(None), render),
            Section::SalaryExpectations => self.salary_expectations.as_ref().map_or(Ok(None), render),
            Section::Certifications => render_list(&self.certifications),
            Section::Languages => render_list(&self.languages),
            Section::Interests => render_list(&self.interests),
            Section::CoverLetter => Ok(None),
        }
    }

    /// Whole profile as YAML, used where the model needs the full picture.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to render profile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = r#"
personal_information:
  name: Jane
  surname: Doe
  email: jane@example.com
  zip_code: 10115
experience_details:
  - position: Backend Engineer
    company: Acme
    employment_period: 2019 - Present
    key_responsibilities:
      - responsibility_1: Built payment services
    skills_acquired: [Rust, Postgres]
languages:
  - language: English
    proficiency: Fluent
availability:
  notice_period: 1 month
"#;

    #[test]
    fn test_parse_partial_profile() {
        let profile = Profile::from_yaml(RESUME).unwrap();
        assert_eq!(
            profile.personal_information.as_ref().unwrap().name.as_deref(),
            Some("Jane")
        );
        assert_eq!(profile.experience_details.len(), 1);
        assert!(profile.legal_authorization.is_none());
        assert!(profile.projects.is_empty());
    }

    #[test]
    fn test_section_rendering() {
        let profile = Profile::from_yaml(RESUME).unwrap();
        let experience = profile.section(Section::ExperienceDetails).unwrap().unwrap();
        assert!(experience.contains("Backend Engineer"));
        assert!(profile.section(Section::Projects).unwrap().is_none());
        assert!(profile.section(Section::LegalAuthorization).unwrap().is_none());
        assert!(profile.section(Section::CoverLetter).unwrap().is_none());
    }

    #[test]
    fn test_section_labels_round_trip_case_insensitively() {
        assert_eq!(
            Section::from_label("salary expectations"),
            Some(Section::SalaryExpectations)
        );
        assert_eq!(Section::from_label(" COVER LETTER "), Some(Section::CoverLetter));
        assert_eq!(Section::from_label("Hobbies"), None);
    }
}
