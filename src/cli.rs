// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::answers::{sanitize_text, Answerer, LlmClientConfig, OpenAiChatClient, QuestionAnswerer, QuestionCache, QuestionKind};
use crate::app_log;
use crate::core::{ConfigManager, Database, EnvironmentConfig, FsOps, QuestionRow};
use crate::form::{CoverLetterWriter, FormFiller, StepSnapshot};
use crate::types::Job;
use crate::utils::{preview, validate_file_extension};
use crate::workflow::{build_search_filters, EasyApplier, JobManager, ReplayBoard, RunMode, SearchQuery};

#[derive(Parser)]
#[command(name = "jobpilot")]
#[command(about = "Fill job application forms from a profile, an answer cache and a language model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON log file, truncated on startup
    #[arg(long, global = true, default_value = "jobpilot.log")]
    pub log_file: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the apply, reapply or reconnect workflow against a captured job board
    Run {
        /// Overrides MODE
        #[arg(long)]
        mode: Option<String>,
        /// Directory with listings.yaml and captured application forms
        #[arg(long)]
        board_dir: PathBuf,
        /// Run again every 24 hours
        #[arg(long, conflicts_with = "transcript")]
        repeat: bool,
        /// Write everything the board was asked to do as JSON
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// Check environment, settings and the data folder
    Validate,
    /// Print the search URL of every position and location
    SearchUrl {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Ask the model a single application question
    Answer {
        question: String,
        #[arg(long, conflicts_with = "options")]
        numeric: bool,
        /// Comma separated choices
        #[arg(long, value_delimiter = ',')]
        options: Vec<String>,
    },
    /// Decide how to fill a captured form step
    Fill {
        snapshot: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        company: String,
    },
    /// Inspect and correct the question/answer cache
    #[command(subcommand)]
    Questions(QuestionCommand),
    /// Inspect stored job applications
    #[command(subcommand)]
    Jobs(JobCommand),
}

#[derive(Subcommand)]
pub enum QuestionCommand {
    /// List cached answers
    List,
    /// Store or correct an answer
    Set {
        kind: String,
        question: String,
        answer: String,
    },
    /// Forget an answer
    Remove { kind: String, question: String },
    /// Write all answers to a CSV file (type,question,answer)
    Export { csv_file: PathBuf },
    /// Load answers from a CSV file (type,question,answer), existing answers are corrected
    Import { csv_file: PathBuf },
}

#[derive(Subcommand)]
pub enum JobCommand {
    /// List stored jobs
    List {
        #[arg(long)]
        unapplied: bool,
    },
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            mode,
            board_dir,
            repeat,
            transcript,
        } => run(mode, board_dir, repeat, transcript).await,
        Command::Validate => validate(),
        Command::SearchUrl { page } => search_urls(page),
        Command::Answer {
            question,
            numeric,
            options,
        } => answer(&question, numeric, &options).await,
        Command::Fill {
            snapshot,
            title,
            company,
        } => fill(&snapshot, &title, &company).await,
        Command::Questions(command) => {
            let db = Database::connect(&EnvironmentConfig::database_url_from_env()).await?;
            handle_question_command(&db, command).await
        }
        Command::Jobs(JobCommand::List { unapplied }) => {
            let db = Database::connect(&EnvironmentConfig::database_url_from_env()).await?;
            list_jobs(&db, unapplied).await
        }
    }
}

fn answerer(config: &ConfigManager) -> Result<Answerer<OpenAiChatClient>> {
    let env = &config.environment;
    let client = OpenAiChatClient::new(LlmClientConfig::new(
        &env.llm_api_key,
        &env.llm_api_url,
        &env.llm_model_name,
        &config.settings.llm,
    ))?;
    Ok(Answerer::new(client, config.profile.clone()))
}

async fn form_filler(config: &ConfigManager, db: &Database) -> Result<FormFiller> {
    let cache = QuestionCache::load(db).await?;
    Ok(FormFiller::new(
        Arc::new(answerer(config)?),
        cache,
        config.data.resume_document_path.clone(),
    )
    .with_cover_letters(CoverLetterWriter::new(&config.settings.cover_letter)))
}

async fn run(mode: Option<String>, board_dir: PathBuf, repeat: bool, transcript: Option<PathBuf>) -> Result<()> {
    let config = ConfigManager::load()?;
    let mode: RunMode = mode
        .as_deref()
        .unwrap_or(&config.environment.mode)
        .parse()
        .unwrap_or_default();

    let db = Database::connect(&config.environment.database_url).await?;
    let filler = form_filler(&config, &db).await?;
    let applier = EasyApplier::new(filler, config.settings.limits.form_timeout());
    let board = Arc::new(ReplayBoard::open_dir(&board_dir).await?);
    let mut manager = JobManager::new(board.clone(), applier, db, config.search.clone(), &config.settings);

    app_log!(info, "Starting {} run against {}", mode, board.root().display());
    if repeat {
        return manager.run_repeating(mode).await;
    }

    let summary = manager.run(mode).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = transcript {
        board.write_transcript(&path).await?;
        app_log!(info, "Transcript written to {}", path.display());
    }
    Ok(())
}

fn validate() -> Result<()> {
    let config = ConfigManager::load()?;
    app_log!(info, "✅ Configuration is valid");
    app_log!(info, "   Data folder: {}", config.data.root.display());
    app_log!(info, "   Resume: {}", config.data.resume_document_path.display());
    app_log!(info, "   Positions: {}", config.search.positions.join(", "));
    app_log!(info, "   Locations: {}", config.search.locations.join(", "));
    app_log!(info, "   Blacklist: {} companies", config.search.companies_blacklist.len());
    app_log!(info, "   Model: {} at {}", config.environment.llm_model_name, config.environment.llm_api_url);
    app_log!(info, "   Database: {}", config.environment.database_url);
    println!("ok");
    Ok(())
}

fn search_urls(page: usize) -> Result<()> {
    let config = ConfigManager::load()?;
    let filters = build_search_filters(&config.search);
    for position in &config.search.positions {
        for location in &config.search.locations {
            let query = SearchQuery::new(position, location, page, config.settings.limits.page_size, &filters);
            println!("{}", query.url());
        }
    }
    Ok(())
}

async fn answer(question: &str, numeric: bool, options: &[String]) -> Result<()> {
    let config = ConfigManager::load()?;
    let answerer = answerer(&config)?;
    let job = Job::default();

    let reply = if numeric {
        answerer.answer_numeric(&job, question).await?.to_string()
    } else if !options.is_empty() {
        answerer.answer_from_options(&job, question, options).await?
    } else {
        answerer.answer_text(&job, question).await?
    };
    println!("{}", reply);
    Ok(())
}

async fn fill(snapshot_path: &Path, title: &str, company: &str) -> Result<()> {
    let config = ConfigManager::load()?;
    let db = Database::connect(&config.environment.database_url).await?;
    let mut filler = form_filler(&config, &db).await?;

    let html = FsOps::read_file_safe(snapshot_path).await?;
    let snapshot = StepSnapshot::parse(&html)?;
    let job = Job::new(title, company, "", &snapshot_path.display().to_string());

    let decisions = filler.plan(&job, &snapshot.sections).await?;
    let plan = snapshot
        .sections
        .iter()
        .zip(&decisions)
        .map(|(section, decision)| json!({ "section": preview(&section.text, 80), "decision": decision }))
        .collect::<Vec<_>>();

    let report = json!({
        "primary_button": snapshot.primary_button,
        "progress": snapshot.progress,
        "sections": plan,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn handle_question_command(db: &Database, command: QuestionCommand) -> Result<()> {
    let questions = db.questions();

    match command {
        QuestionCommand::List => {
            let rows = questions.load_all().await?;
            if rows.is_empty() {
                app_log!(info, "No cached answers found.");
                return Ok(());
            }
            println!("{:<5} {:<9} {:<60} {}", "ID", "Type", "Question", "Answer");
            println!("{}", "-".repeat(100));
            for row in rows {
                println!(
                    "{:<5} {:<9} {:<60} {}",
                    row.id,
                    row.question_type,
                    preview(&row.question, 57),
                    preview(&row.answer, 60)
                );
            }
        }

        QuestionCommand::Set {
            kind,
            question,
            answer,
        } => {
            let kind: QuestionKind = kind.parse()?;
            let question = sanitize_text(&question);
            if questions.update_answer(kind.as_str(), &question, &answer).await? {
                app_log!(info, "✅ Updated {} answer for '{}'", kind, question);
            } else {
                questions
                    .insert(&QuestionRow {
                        question_type: kind.as_str().to_string(),
                        question: question.clone(),
                        answer,
                    })
                    .await?;
                app_log!(info, "✅ Stored {} answer for '{}'", kind, question);
            }
        }

        QuestionCommand::Remove { kind, question } => {
            let kind: QuestionKind = kind.parse()?;
            let question = sanitize_text(&question);
            if questions.remove(kind.as_str(), &question).await? {
                app_log!(info, "✅ Removed {} answer for '{}'", kind, question);
            } else {
                app_log!(info, "❌ No {} answer cached for '{}'", kind, question);
            }
        }

        QuestionCommand::Export { csv_file } => {
            let rows = questions.load_all().await?;
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["type", "question", "answer"])?;
            for row in &rows {
                writer.write_record([&row.question_type, &row.question, &row.answer])?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e.error()))?;
            let content = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
            FsOps::write_file_safe(&csv_file, &content).await?;
            app_log!(info, "✅ Exported {} answers to {}", rows.len(), csv_file.display());
        }

        QuestionCommand::Import { csv_file } => {
            validate_file_extension(&csv_file.display().to_string(), &["csv"])?;
            let content = FsOps::read_file_safe(&csv_file).await?;
            let (imported, errors) = import_answers(db, &content).await?;
            app_log!(info, "Import completed:");
            app_log!(info, "  ✅ Success: {}", imported);
            app_log!(info, "  ❌ Errors:  {}", errors);
        }
    }

    Ok(())
}

/// Insert or correct every `type,question,answer` record, returns (imported, errors)
pub async fn import_answers(db: &Database, content: &str) -> Result<(usize, usize)> {
    let questions = db.questions();
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut imported = 0;
    let mut errors = 0;

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                errors += 1;
                app_log!(warn, "❌ CSV parsing error: {}", e);
                continue;
            }
        };

        let (Some(kind), Some(question), Some(answer)) = (record.get(0), record.get(1), record.get(2)) else {
            errors += 1;
            app_log!(warn, "⚠️  Skipping invalid record (need type,question,answer)");
            continue;
        };

        let kind = match kind.parse::<QuestionKind>() {
            Ok(kind) => kind,
            Err(e) => {
                errors += 1;
                app_log!(warn, "⚠️  Skipping record: {}", e);
                continue;
            }
        };

        let question = sanitize_text(question);
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            errors += 1;
            app_log!(warn, "⚠️  Skipping empty question or answer");
            continue;
        }

        let row = QuestionRow {
            question_type: kind.as_str().to_string(),
            question,
            answer: answer.to_string(),
        };
        if !questions.insert(&row).await? {
            questions
                .update_answer(&row.question_type, &row.question, &row.answer)
                .await?;
        }
        imported += 1;
    }

    Ok((imported, errors))
}

async fn list_jobs(db: &Database, unapplied: bool) -> Result<()> {
    let jobs = db.jobs().list(unapplied).await?;
    if jobs.is_empty() {
        app_log!(info, "No jobs found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<30} {:<25} {:<8} {:<10} {:<17}",
        "ID", "Title", "Company", "Applied", "Connected", "Updated"
    );
    println!("{}", "-".repeat(100));
    for job in jobs {
        println!(
            "{:<5} {:<30} {:<25} {:<8} {:<10} {:<17}",
            job.id,
            preview(&job.title, 27),
            preview(&job.company, 22),
            job.applied,
            job.connected,
            job.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_import_answers_inserts_and_corrects() {
        let db = Database::in_memory().await.unwrap();
        db.questions()
            .insert(&QuestionRow {
                question_type: "textbox".to_string(),
                question: "city".to_string(),
                answer: "Munich".to_string(),
            })
            .await
            .unwrap();

        let csv = "type,question,answer\ntextbox,City,Berlin\nradio,\"Do you need a visa?\",no\ncheckbox,Terms,yes\nnumeric,Years of Rust,\n";
        let (imported, errors) = import_answers(&db, csv).await.unwrap();
        assert_eq!(imported, 2);
        assert_eq!(errors, 2);

        let cache = QuestionCache::load(&db).await.unwrap();
        assert_eq!(cache.lookup(QuestionKind::Textbox, "city", None), Some("Berlin"));
        assert_eq!(
            cache.lookup(QuestionKind::Radio, "do you need a visa?", Some(&["yes".to_string(), "no".to_string()][..])),
            Some("no")
        );
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["jobpilot", "answer", "Pick one", "--options", "Yes,No"]).unwrap();
        match cli.command {
            Command::Answer { options, numeric, .. } => {
                assert_eq!(options, vec!["Yes", "No"]);
                assert!(!numeric);
            }
            _ => panic!("expected answer command"),
        }

        assert!(Cli::try_parse_from(["jobpilot", "answer", "q", "--numeric", "--options", "a"]).is_err());

        let cli = Cli::try_parse_from(["jobpilot", "run", "--board-dir", "board", "--transcript", "t.json"]).unwrap();
        assert!(matches!(cli.command, Command::Run { repeat: false, transcript: Some(_), .. }));
        assert!(Cli::try_parse_from([
            "jobpilot",
            "run",
            "--board-dir",
            "board",
            "--repeat",
            "--transcript",
            "t.json"
        ])
        .is_err());

        let cli = Cli::try_parse_from(["jobpilot", "jobs", "list", "--unapplied"]).unwrap();
        assert!(matches!(cli.command, Command::Jobs(JobCommand::List { unapplied: true })));
    }
}
