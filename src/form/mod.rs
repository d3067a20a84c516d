// src/form/mod.rs
//! Application forms as seen by the decision engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod cover_letter;
pub mod engine;
pub mod snapshot;

pub use cover_letter::CoverLetterWriter;
pub use engine::FormFiller;
pub use snapshot::StepSnapshot;

/// One widget inside a form section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    Checkbox {
        label: String,
    },
    Date {
        question: String,
    },
    Radio {
        question: String,
        options: Vec<String>,
    },
    Dropdown {
        question: String,
        options: Vec<String>,
        selected: Option<String>,
    },
    Text {
        label: String,
        input_type: String,
        field_id: String,
        multiline: bool,
    },
    FileUpload {
        label: String,
    },
}

/// One question block of a form step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    pub text: String,
    pub controls: Vec<Control>,
}

impl FormSection {
    pub fn new(text: &str, controls: Vec<Control>) -> Self {
        Self {
            text: text.to_string(),
            controls,
        }
    }

    pub fn single(text: &str, control: Control) -> Self {
        Self::new(text, vec![control])
    }
}

/// What to do with a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FillAction {
    Check { label: String },
    EnterDate { value: String },
    SelectRadio { option: String },
    SelectOption { option: String },
    KeepSelection { option: String },
    EnterText { value: String },
    UploadResume { path: PathBuf },
    UploadCoverLetter { path: PathBuf },
    Skip { reason: String },
}

impl FillAction {
    pub fn skip(reason: &str) -> Self {
        FillAction::Skip {
            reason: reason.to_string(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, FillAction::Skip { .. })
    }
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Rule,
    Cache,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Index of the control acted on, `None` when skipped
    pub control: Option<usize>,
    pub action: FillAction,
    pub origin: Origin,
}

impl Decision {
    pub fn skipped(reason: &str) -> Self {
        Self {
            control: None,
            action: FillAction::skip(reason),
            origin: Origin::Rule,
        }
    }
}

/// The button that moves an application forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryButton {
    Submit,
    Continue,
    Review,
    Next,
}

impl PrimaryButton {
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text.contains("submit application") {
            Some(PrimaryButton::Submit)
        } else if text.contains("continue applying") {
            Some(PrimaryButton::Continue)
        } else if text == "review" {
            Some(PrimaryButton::Review)
        } else if text == "next" {
            Some(PrimaryButton::Next)
        } else {
            None
        }
    }
}
