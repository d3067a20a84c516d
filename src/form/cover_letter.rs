// src/form/cover_letter.rs
//! Cover letter PDFs rendered with the typst CLI

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::app_log;
use crate::core::config_manager::CoverLetterSettings;
use crate::core::FsOps;
use crate::types::Job;
use crate::utils::normalize_file_name;

#[derive(Debug, Clone)]
pub struct CoverLetterWriter {
    output_dir: PathBuf,
    typst_binary: String,
    max_bytes: u64,
}

impl CoverLetterWriter {
    pub fn new(settings: &CoverLetterSettings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            typst_binary: settings.typst_binary.clone(),
            max_bytes: settings.max_bytes,
        }
    }

    pub fn output_path(&self, job: &Job) -> PathBuf {
        let stem = normalize_file_name(&format!("{} - {} Cover Letter", job.title, job.company));
        self.output_dir.join(format!("{}.pdf", stem))
    }

    /// Render `body` wrapped in greeting and closing, return the PDF path
    pub async fn write(&self, job: &Job, body: &str) -> Result<PathBuf> {
        let letter = letter_text(body);
        let pdf_path = self.output_path(job);
        let source_path = pdf_path.with_extension("typ");

        FsOps::write_file_safe(&source_path, &typst_source(&letter)).await?;
        self.compile(&source_path, &pdf_path).await?;

        if let Err(e) = tokio::fs::remove_file(&source_path).await {
            app_log!(warn, "Failed to clean up {}: {}", source_path.display(), e);
        }

        let size = FsOps::file_size(&pdf_path).await?;
        app_log!(debug, "Cover letter file size: {} bytes", size);
        if size > self.max_bytes {
            anyhow::bail!(
                "Cover letter file size {} exceeds the maximum limit of {} bytes",
                size,
                self.max_bytes
            );
        }

        Ok(std::path::absolute(&pdf_path).unwrap_or(pdf_path))
    }

    async fn compile(&self, source: &Path, output: &Path) -> Result<()> {
        let status = Command::new(&self.typst_binary)
            .arg("compile")
            .arg(source)
            .arg(output)
            .status()
            .await
            .context("Failed to execute typst command")?;

        if !status.success() {
            anyhow::bail!("Typst compilation failed for {}", source.display());
        }
        Ok(())
    }
}

pub fn letter_text(body: &str) -> String {
    format!(
        "Dear Sir or Madam,\n\n{}\n\nThank you for your consideration.",
        body.trim()
    )
}

/// Typst document showing `text` verbatim, blank lines separate paragraphs
pub fn typst_source(text: &str) -> String {
    let mut source = String::from("#set page(paper: \"a4\", margin: 50pt)\n#set text(size: 12pt)\n\n");

    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty());

    for paragraph in paragraphs {
        let lines = paragraph
            .lines()
            .map(|line| format!("#\"{}\"", escape_string(line.trim())))
            .collect::<Vec<_>>()
            .join(" \\\n");
        source.push_str(&lines);
        source.push_str("\n\n");
    }

    source
}

fn escape_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
