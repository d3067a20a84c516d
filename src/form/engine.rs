// src/form/engine.rs
//! Form-filling decision engine
//!
//! Each section is offered to the handlers in a fixed priority order: terms
//! checkboxes, dates, radio groups, dropdowns, free text, file uploads. The first
//! handler that recognises one of the section's controls decides the action.
//! Answers to radio, dropdown and text questions come from the question cache
//! when possible and from the model otherwise; model answers are remembered.

use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;

use super::cover_letter::CoverLetterWriter;
use super::{Control, Decision, FillAction, FormSection, Origin};
use crate::answers::{sanitize_text, QuestionAnswerer, QuestionCache, QuestionKind, COVER_LETTER_QUESTION};
use crate::app_log;
use crate::types::Job;

const TERMS_PHRASES: [&str; 5] = [
    "confirmed",
    "terms of service",
    "privacy policy",
    "terms of use",
    "i consent",
];

const IGNORED_TEXT_LABELS: [&str; 2] = ["deselect resume", "upload cover letter"];

const START_DATE_OFFSET_DAYS: i64 = 60;

pub const DATE_FORMAT: &str = "%m/%d/%Y";

pub struct FormFiller {
    answerer: Arc<dyn QuestionAnswerer>,
    cache: QuestionCache,
    resume_path: PathBuf,
    cover_letters: Option<CoverLetterWriter>,
    today: Option<NaiveDate>,
}

impl FormFiller {
    pub fn new(answerer: Arc<dyn QuestionAnswerer>, cache: QuestionCache, resume_path: PathBuf) -> Self {
        Self {
            answerer,
            cache,
            resume_path,
            cover_letters: None,
            today: None,
        }
    }

    pub fn with_cover_letters(mut self, writer: CoverLetterWriter) -> Self {
        self.cover_letters = Some(writer);
        self
    }

    /// Pin the date used for date questions
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cache(&self) -> &QuestionCache {
        &self.cache
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Decide every section of one form step, in order
    pub async fn plan(&mut self, job: &Job, sections: &[FormSection]) -> Result<Vec<Decision>> {
        let mut decisions = Vec::with_capacity(sections.len());
        for section in sections {
            decisions.push(self.decide(job, section).await?);
        }
        Ok(decisions)
    }

    pub async fn decide(&mut self, job: &Job, section: &FormSection) -> Result<Decision> {
        if let Some(decision) = self.handle_terms(section) {
            app_log!(debug, "Handled terms of service");
            return Ok(decision);
        }
        if let Some(decision) = self.handle_date(section) {
            app_log!(debug, "Handled date question");
            return Ok(decision);
        }
        if let Some(decision) = self.handle_radio(job, section).await? {
            app_log!(debug, "Handled radio question");
            return Ok(decision);
        }
        if let Some(decision) = self.handle_dropdown(job, section).await? {
            app_log!(debug, "Handled dropdown question");
            return Ok(decision);
        }
        if let Some(decision) = self.handle_text(job, section).await? {
            app_log!(debug, "Handled textbox question");
            return Ok(decision);
        }
        if let Some(decision) = self.handle_upload(job, section).await? {
            app_log!(debug, "Handled upload field");
            return Ok(decision);
        }

        app_log!(debug, "No handler for section: {}", section.text);
        Ok(Decision::skipped("no handler recognised the section"))
    }

    fn handle_terms(&self, section: &FormSection) -> Option<Decision> {
        section.controls.iter().enumerate().find_map(|(index, control)| match control {
            Control::Checkbox { label } => {
                let lower = label.to_lowercase();
                TERMS_PHRASES
                    .iter()
                    .any(|phrase| lower.contains(phrase))
                    .then(|| Decision {
                        control: Some(index),
                        action: FillAction::Check { label: label.clone() },
                        origin: Origin::Rule,
                    })
            }
            _ => None,
        })
    }

    fn handle_date(&self, section: &FormSection) -> Option<Decision> {
        section.controls.iter().enumerate().find_map(|(index, control)| match control {
            Control::Date { question } => {
                let question = question.to_lowercase();
                let value = if question.contains("today") {
                    self.today()
                } else if question.contains("earliest start date") {
                    first_of_month(self.today() + Duration::days(START_DATE_OFFSET_DAYS))
                } else {
                    return None;
                };
                Some(Decision {
                    control: Some(index),
                    action: FillAction::EnterDate {
                        value: value.format(DATE_FORMAT).to_string(),
                    },
                    origin: Origin::Rule,
                })
            }
            _ => None,
        })
    }

    async fn handle_radio(&mut self, job: &Job, section: &FormSection) -> Result<Option<Decision>> {
        let Some((index, question, options)) =
            section.controls.iter().enumerate().find_map(|(index, control)| match control {
                Control::Radio { question, options } if !options.is_empty() => Some((
                    index,
                    question.to_lowercase(),
                    options.iter().map(|o| o.to_lowercase()).collect::<Vec<_>>(),
                )),
                _ => None,
            })
        else {
            return Ok(None);
        };

        let (answer, origin) = self
            .choice_answer(job, QuestionKind::Radio, &question, &options)
            .await?;

        // An answer the form does not offer falls back to the last option
        let option = if options.contains(&answer) {
            answer
        } else {
            app_log!(warn, "Answer '{}' not among radio options, picking the last one", answer);
            options.last().cloned().unwrap_or_default()
        };

        Ok(Some(Decision {
            control: Some(index),
            action: FillAction::SelectRadio { option },
            origin,
        }))
    }

    async fn handle_dropdown(&mut self, job: &Job, section: &FormSection) -> Result<Option<Decision>> {
        let Some((index, question, options, selected)) =
            section.controls.iter().enumerate().find_map(|(index, control)| match control {
                Control::Dropdown {
                    question,
                    options,
                    selected,
                } if !options.is_empty() => Some((index, question.to_lowercase(), options.clone(), selected.clone())),
                _ => None,
            })
        else {
            return Ok(None);
        };

        let (answer, origin) = self
            .choice_answer(job, QuestionKind::Dropdown, &question, &options)
            .await?;

        let action = if selected.as_deref() == Some(answer.as_str()) {
            FillAction::KeepSelection { option: answer }
        } else {
            FillAction::SelectOption { option: answer }
        };

        Ok(Some(Decision {
            control: Some(index),
            action,
            origin,
        }))
    }

    async fn choice_answer(
        &mut self,
        job: &Job,
        kind: QuestionKind,
        question: &str,
        options: &[String],
    ) -> Result<(String, Origin)> {
        if let Some(answer) = self.cache.lookup(kind, question, Some(options)) {
            return Ok((answer.to_string(), Origin::Cache));
        }

        let answer = self.answerer.answer_from_options(job, question, options).await?;
        self.cache.remember(kind, question, &answer).await?;
        Ok((answer, Origin::Model))
    }

    async fn handle_text(&mut self, job: &Job, section: &FormSection) -> Result<Option<Decision>> {
        let Some((index, question, numeric)) =
            section.controls.iter().enumerate().find_map(|(index, control)| match control {
                Control::Text {
                    label,
                    input_type,
                    field_id,
                    ..
                } => {
                    let question = label.trim().to_lowercase();
                    if question.is_empty()
                        || IGNORED_TEXT_LABELS.iter().any(|ignored| question.contains(ignored))
                    {
                        return None;
                    }
                    let numeric = field_id.to_lowercase().contains("numeric")
                        || input_type.eq_ignore_ascii_case("number");
                    Some((index, question, numeric))
                }
                _ => None,
            })
        else {
            return Ok(None);
        };

        let kind = if numeric {
            QuestionKind::Numeric
        } else {
            QuestionKind::Textbox
        };

        // Cover letters are written fresh for every job
        if sanitize_text(&question) != "cover letter" {
            if let Some(answer) = self.cache.lookup(kind, &question, None) {
                return Ok(Some(Decision {
                    control: Some(index),
                    action: FillAction::EnterText {
                        value: answer.to_string(),
                    },
                    origin: Origin::Cache,
                }));
            }
        }

        let answer = if numeric {
            self.answerer.answer_numeric(job, &question).await?.to_string()
        } else {
            self.answerer.answer_text(job, &question).await?
        };
        self.cache.remember(kind, &question, &answer).await?;

        Ok(Some(Decision {
            control: Some(index),
            action: FillAction::EnterText { value: answer },
            origin: Origin::Model,
        }))
    }

    async fn handle_upload(&mut self, job: &Job, section: &FormSection) -> Result<Option<Decision>> {
        for (index, control) in section.controls.iter().enumerate() {
            let Control::FileUpload { label } = control else {
                continue;
            };
            let label = label.to_lowercase();

            if label.contains("resume") {
                return Ok(Some(Decision {
                    control: Some(index),
                    action: FillAction::UploadResume {
                        path: self.resume_path.clone(),
                    },
                    origin: Origin::Rule,
                }));
            }

            if label.contains("cover") {
                let Some(writer) = &self.cover_letters else {
                    return Ok(Some(Decision::skipped("cover letter generation is disabled")));
                };
                let body = self.answerer.answer_text(job, COVER_LETTER_QUESTION).await?;
                let path = writer.write(job, &body).await?;
                return Ok(Some(Decision {
                    control: Some(index),
                    action: FillAction::UploadCoverLetter { path },
                    origin: Origin::Model,
                }));
            }
        }
        Ok(None)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::answers::CachedAnswer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Deterministic answers that count how often the model was asked.
    #[derive(Default)]
    pub(crate) struct FakeAnswerer {
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeAnswerer {
        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QuestionAnswerer for FakeAnswerer {
        async fn answer_text(&self, _job: &Job, question: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!("text:{}", question));
            Ok(format!("answer to {}", question))
        }

        async fn answer_numeric(&self, _job: &Job, question: &str) -> Result<i64> {
            self.calls.lock().unwrap().push(format!("numeric:{}", question));
            Ok(3)
        }

        async fn answer_from_options(&self, _job: &Job, question: &str, options: &[String]) -> Result<String> {
            self.calls.lock().unwrap().push(format!("options:{}", question));
            Ok(options.first().cloned().unwrap_or_default())
        }

        async fn cover_letter(&self, _job: &Job) -> Result<String> {
            self.calls.lock().unwrap().push("cover_letter".to_string());
            Ok("letter".to_string())
        }
    }

    fn filler(answerer: Arc<FakeAnswerer>, entries: Vec<CachedAnswer>) -> FormFiller {
        FormFiller::new(answerer, QuestionCache::detached(entries), PathBuf::from("/data/resume.pdf"))
            .with_today(NaiveDate::from_ymd_opt(2024, 11, 15).unwrap())
    }

    fn job() -> Job {
        Job::new("Engineer", "Acme", "Remote", "https://jobs/1")
    }

    fn text(label: &str, input_type: &str, field_id: &str) -> Control {
        Control::Text {
            label: label.to_string(),
            input_type: input_type.to_string(),
            field_id: field_id.to_string(),
            multiline: false,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_terms_checkbox_is_checked() {
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![]);
        let section = FormSection::single(
            "I agree",
            Control::Checkbox {
                label: "I have read the Privacy Policy".to_string(),
            },
        );
        let decision = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(decision.origin, Origin::Rule);
        assert!(matches!(decision.action, FillAction::Check { .. }));
        assert_eq!(answerer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_plain_checkbox_is_skipped() {
        let mut filler = filler(Arc::new(FakeAnswerer::default()), vec![]);
        let section = FormSection::single(
            "Follow",
            Control::Checkbox {
                label: "Follow Acme to stay up to date".to_string(),
            },
        );
        assert!(filler.decide(&job(), &section).await.unwrap().action.is_skip());
    }

    #[tokio::test]
    async fn test_date_rules() {
        let mut filler = filler(Arc::new(FakeAnswerer::default()), vec![]);

        let today = FormSection::single("Date", Control::Date { question: "Today's date".to_string() });
        assert_eq!(
            filler.decide(&job(), &today).await.unwrap().action,
            FillAction::EnterDate { value: "11/15/2024".to_string() }
        );

        let start = FormSection::single(
            "Start",
            Control::Date {
                question: "What is your earliest start date?".to_string(),
            },
        );
        assert_eq!(
            filler.decide(&job(), &start).await.unwrap().action,
            FillAction::EnterDate { value: "01/01/2025".to_string() }
        );

        let other = FormSection::single("Birthday", Control::Date { question: "Date of birth".to_string() });
        assert!(filler.decide(&job(), &other).await.unwrap().action.is_skip());
    }

    #[tokio::test]
    async fn test_radio_uses_model_then_cache() {
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![]);
        let section = FormSection::single(
            "Visa",
            Control::Radio {
                question: "Do you need a visa?".to_string(),
                options: strings(&["Yes", "No"]),
            },
        );

        let first = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(first.origin, Origin::Model);
        assert_eq!(first.action, FillAction::SelectRadio { option: "yes".to_string() });

        let second = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(answerer.call_count(), 1);
        assert_eq!(filler.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_radio_ignores_stale_cached_answer() {
        let cached = CachedAnswer {
            kind: QuestionKind::Radio,
            question: "gender".to_string(),
            answer: "other".to_string(),
        };
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![cached]);
        let section = FormSection::single(
            "Gender",
            Control::Radio {
                question: "Gender".to_string(),
                options: strings(&["Male", "Female", "Decline"]),
            },
        );
        // stale cached answer is not offered, the model answers instead
        let decision = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(decision.origin, Origin::Model);
        assert_eq!(decision.action, FillAction::SelectRadio { option: "male".to_string() });
    }

    #[tokio::test]
    async fn test_dropdown_keeps_current_selection() {
        let cached = CachedAnswer {
            kind: QuestionKind::Dropdown,
            question: "english level".to_string(),
            answer: "Fluent".to_string(),
        };
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![cached]);

        let selected = FormSection::single(
            "English",
            Control::Dropdown {
                question: "English level".to_string(),
                options: strings(&["Select an option", "Basic", "Fluent"]),
                selected: Some("Fluent".to_string()),
            },
        );
        let decision = filler.decide(&job(), &selected).await.unwrap();
        assert_eq!(decision.action, FillAction::KeepSelection { option: "Fluent".to_string() });
        assert_eq!(decision.origin, Origin::Cache);

        let unselected = FormSection::single(
            "English",
            Control::Dropdown {
                question: "English level".to_string(),
                options: strings(&["Select an option", "Basic", "Fluent"]),
                selected: Some("Select an option".to_string()),
            },
        );
        let decision = filler.decide(&job(), &unselected).await.unwrap();
        assert_eq!(decision.action, FillAction::SelectOption { option: "Fluent".to_string() });
        assert_eq!(answerer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_numeric_text_field() {
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![]);
        let section = FormSection::single(
            "Years",
            text("How many years of Rust experience?", "text", "single-line-text-form-component-numeric-123"),
        );
        let decision = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(decision.action, FillAction::EnterText { value: "3".to_string() });
        assert_eq!(
            filler.cache().lookup(QuestionKind::Numeric, "how many years of rust experience?", None),
            Some("3")
        );
    }

    #[tokio::test]
    async fn test_text_field_cache_and_ignored_labels() {
        let cached = CachedAnswer {
            kind: QuestionKind::Textbox,
            question: "city".to_string(),
            answer: "Berlin".to_string(),
        };
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![cached]);

        let city = FormSection::single("City", text("  City ", "text", "city"));
        let decision = filler.decide(&job(), &city).await.unwrap();
        assert_eq!(decision.action, FillAction::EnterText { value: "Berlin".to_string() });
        assert_eq!(decision.origin, Origin::Cache);

        let ignored = FormSection::single("Resume", text("Deselect resume", "text", "x"));
        assert!(filler.decide(&job(), &ignored).await.unwrap().action.is_skip());

        let unlabeled = FormSection::single("", text("", "text", "x"));
        assert!(filler.decide(&job(), &unlabeled).await.unwrap().action.is_skip());
        assert_eq!(answerer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cover_letter_text_bypasses_cache() {
        let cached = CachedAnswer {
            kind: QuestionKind::Textbox,
            question: "cover letter".to_string(),
            answer: "old letter".to_string(),
        };
        let answerer = Arc::new(FakeAnswerer::default());
        let mut filler = filler(answerer.clone(), vec![cached]);
        let section = FormSection::single("Cover letter", text("Cover letter", "textarea", "cl"));
        let decision = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(decision.origin, Origin::Model);
        assert_eq!(answerer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_upload_and_disabled_cover_letter() {
        let mut filler = filler(Arc::new(FakeAnswerer::default()), vec![]);
        let resume = FormSection::single("Upload", Control::FileUpload { label: "Upload resume".to_string() });
        assert_eq!(
            filler.decide(&job(), &resume).await.unwrap().action,
            FillAction::UploadResume { path: PathBuf::from("/data/resume.pdf") }
        );

        let cover = FormSection::single("Upload", Control::FileUpload { label: "Cover letter (optional)".to_string() });
        assert!(filler.decide(&job(), &cover).await.unwrap().action.is_skip());

        let other = FormSection::single("Upload", Control::FileUpload { label: "Portfolio".to_string() });
        assert!(filler.decide(&job(), &other).await.unwrap().action.is_skip());
    }

    #[tokio::test]
    async fn test_priority_terms_before_text() {
        let mut filler = filler(Arc::new(FakeAnswerer::default()), vec![]);
        let section = FormSection::new(
            "Consent",
            vec![
                text("Signature", "text", "sig"),
                Control::Checkbox {
                    label: "I consent to the processing".to_string(),
                },
            ],
        );
        let decision = filler.decide(&job(), &section).await.unwrap();
        assert_eq!(decision.control, Some(1));
        assert!(matches!(decision.action, FillAction::Check { .. }));
    }

    #[tokio::test]
    async fn test_plan_decides_each_section() {
        let mut filler = filler(Arc::new(FakeAnswerer::default()), vec![]);
        let sections = vec![
            FormSection::single("City", text("City", "text", "city")),
            FormSection::single("Upload", Control::FileUpload { label: "Resume".to_string() }),
        ];
        let plan = filler.plan(&job(), &sections).await.unwrap();
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan[1].action, FillAction::UploadResume { .. }));
    }
}
