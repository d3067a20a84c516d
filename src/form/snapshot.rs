// src/form/snapshot.rs
//! Reads a captured application step (plain HTML) into form sections.
//!
//! Sections are the elements marked `data-form-section`, or every `fieldset`
//! when nothing is marked. Controls are taken from the inputs of each section in
//! document order; their labels come from `label[for]`, falling back to the
//! section's legend or first label.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{Control, FormSection, PrimaryButton};
use crate::utils::clean_text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub sections: Vec<FormSection>,
    pub primary_button: Option<PrimaryButton>,
    pub progress: Option<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

fn element_text(element: &ElementRef) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

impl StepSnapshot {
    pub fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let reader = SnapshotReader::new(&document)?;

        let marked = selector("[data-form-section]")?;
        let mut blocks: Vec<ElementRef> = document.select(&marked).collect();
        if blocks.is_empty() {
            blocks = document.select(&selector("fieldset")?).collect();
        }

        let sections = blocks
            .iter()
            .map(|block| reader.section(block))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sections,
            primary_button: Self::primary_button(&document)?,
            progress: Self::progress(&document)?,
        })
    }

    fn primary_button(document: &Html) -> Result<Option<PrimaryButton>> {
        let buttons = selector("button, input[type='submit']")?;
        Ok(document.select(&buttons).find_map(|button| {
            let text = element_text(&button);
            let value = button.value();
            PrimaryButton::from_text(&text)
                .or_else(|| value.attr("aria-label").and_then(PrimaryButton::from_text))
                .or_else(|| value.attr("value").and_then(PrimaryButton::from_text))
        }))
    }

    fn progress(document: &Html) -> Result<Option<String>> {
        if let Some(bar) = document.select(&selector("progress")?).next() {
            if let Some(value) = bar.value().attr("value") {
                return Ok(Some(value.trim().to_string()));
            }
        }

        let labelled = selector("[aria-label]")?;
        Ok(document
            .select(&labelled)
            .find(|element| {
                element
                    .value()
                    .attr("aria-label")
                    .is_some_and(|label| label.to_lowercase().contains("progress"))
            })
            .map(|element| {
                let value = element.value();
                value
                    .attr("aria-valuenow")
                    .map(str::to_string)
                    .or_else(|| Some(element_text(&element)).filter(|text| !text.is_empty()))
                    .unwrap_or_else(|| value.attr("aria-label").unwrap_or_default().to_string())
            }))
    }
}

/// Elements whose text never counts as question text.
const NON_QUESTION_ELEMENTS: [&str; 4] = ["label", "option", "button", "script"];

struct SnapshotReader {
    labels: HashMap<String, String>,
    /// Ids of radio buttons and checkboxes, their labels name an option
    choice_ids: HashSet<String>,
    inputs: Selector,
    options: Selector,
    legend: Selector,
    label: Selector,
}

impl SnapshotReader {
    fn new(document: &Html) -> Result<Self> {
        let labels = document
            .select(&selector("label[for]")?)
            .filter_map(|label| {
                let target = label.value().attr("for")?;
                Some((target.to_string(), element_text(&label)))
            })
            .collect();

        let choice_ids = document
            .select(&selector("input[type='radio'], input[type='checkbox']")?)
            .filter_map(|input| input.value().attr("id").map(str::to_string))
            .collect();

        Ok(Self {
            labels,
            choice_ids,
            inputs: selector("input, select, textarea")?,
            options: selector("option")?,
            legend: selector("legend")?,
            label: selector("label")?,
        })
    }

    fn label_for(&self, element: &ElementRef) -> Option<String> {
        let id = element.value().attr("id")?;
        self.labels.get(id).filter(|text| !text.is_empty()).cloned()
    }

    fn names_choice(&self, label: &ElementRef) -> bool {
        label
            .value()
            .attr("for")
            .is_some_and(|target| self.choice_ids.contains(target))
    }

    /// Legend, else a label not naming an option, else the block's loose text
    fn question(&self, block: &ElementRef) -> String {
        block
            .select(&self.legend)
            .chain(block.select(&self.label).filter(|label| !self.names_choice(label)))
            .map(|element| element_text(&element))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| loose_text(block))
    }

    fn section(&self, block: &ElementRef) -> Result<FormSection> {
        let question = self.question(block);
        let mut controls = Vec::new();
        let mut radio_groups: HashMap<String, usize> = HashMap::new();

        for input in block.select(&self.inputs) {
            let element = input.value();
            let label = self.label_for(&input).unwrap_or_else(|| question.clone());
            let field_id = element.attr("id").unwrap_or_default().to_string();

            match element.name() {
                "select" => {
                    let options: Vec<(String, bool)> = input
                        .select(&self.options)
                        .map(|option| (element_text(&option), option.value().attr("selected").is_some()))
                        .collect();
                    let selected = options
                        .iter()
                        .find(|(_, selected)| *selected)
                        .or_else(|| options.first())
                        .map(|(text, _)| text.clone());
                    controls.push(Control::Dropdown {
                        question: label,
                        options: options.into_iter().map(|(text, _)| text).collect(),
                        selected,
                    });
                }
                "textarea" => controls.push(Control::Text {
                    label,
                    input_type: "textarea".to_string(),
                    field_id,
                    multiline: true,
                }),
                _ => {
                    let input_type = element.attr("type").unwrap_or("text").to_lowercase();
                    match input_type.as_str() {
                        "file" => controls.push(Control::FileUpload { label }),
                        "date" => controls.push(Control::Date { question: label }),
                        "checkbox" => controls.push(Control::Checkbox { label }),
                        "radio" => {
                            let option = self
                                .label_for(&input)
                                .or_else(|| element.attr("value").map(str::to_string))
                                .unwrap_or_default();
                            let group = element.attr("name").unwrap_or_default().to_string();
                            match radio_groups.get(&group) {
                                Some(&index) => {
                                    if let Some(Control::Radio { options, .. }) = controls.get_mut(index) {
                                        options.push(option);
                                    }
                                }
                                None => {
                                    radio_groups.insert(group, controls.len());
                                    controls.push(Control::Radio {
                                        question: question.clone(),
                                        options: vec![option],
                                    });
                                }
                            }
                        }
                        "hidden" | "submit" | "button" | "reset" | "image" => {}
                        _ => controls.push(Control::Text {
                            label,
                            input_type,
                            field_id,
                            multiline: false,
                        }),
                    }
                }
            }
        }

        Ok(FormSection {
            text: element_text(block),
            controls,
        })
    }
}

/// Text of `block` outside labels, options and buttons
fn loose_text(block: &ElementRef) -> String {
    let parts = block
        .descendants()
        .filter(|node| {
            !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != block.id())
                .any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|element| NON_QUESTION_ELEMENTS.contains(&element.name()))
                })
        })
        .filter_map(|node| node.value().as_text().map(|text| text.trim().to_string()))
        .collect::<Vec<_>>();
    clean_text(&parts.join(" "))
}
