use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use job_applier::answers::{ChatClient, LlmError};
use job_applier::core::config_manager::PacingSettings;
use job_applier::core::SearchConfig;
use job_applier::form::FillAction;
use job_applier::workflow::ReplayEvent;
use job_applier::{
    Answerer, Database, EasyApplier, FormFiller, JobManager, Profile, QuestionCache, ReplayBoard, RunMode,
};

const CONFIG: &str = r#"
experience_level:
  internship: false
  entry: false
  associate: false
  mid-senior level: true
  director: false
  executive: false
job_types:
  full-time: true
  contract: false
  part-time: false
  temporary: false
  internship: false
  other: false
  volunteer: false
date:
  all time: false
  month: false
  week: true
  24 hours: false
  12 hours: false
  hour: false
work_types:
  on-site: false
  hybrid: false
  remote: true
positions:
  - Rust Engineer
locations:
  - Berlin
companies_blacklist:
  - Evil Corp
"#;

const RESUME: &str = r#"
personal_information:
  name: Jane
  city: Berlin
  email: jane@example.com
"#;

const LISTINGS: &str = r#"
searches:
  - position: Rust Engineer
    location: Berlin
    pages:
      - - title: Rust Engineer
          company: Acme
          location: Berlin
          link: https://jobs/acme
          apply_method: Easy Apply
        - title: Rust Engineer
          company: Evil Corp
          location: Berlin
          link: https://jobs/evil
          apply_method: Easy Apply
        - title: Backend Engineer
          company: Globex
          location: Berlin
          link: https://jobs/globex
          apply_method: Promoted
        - title: Rust Engineer
          company: Initech
          location: Berlin
          link: https://jobs/initech
          apply_method: Apply on company website
"#;

const RECRUITERS: &str = "https://site/in/jane: connected\n";

const CITY_SUBMIT: &str = r#"<div data-form-section><label for="city">City</label><input id="city" type="text"></div>
<button>Submit application</button>"#;

const CITY_NEXT: &str = r#"<div data-form-section><label for="city">City</label><input id="city" type="text"></div>
<progress value="0"></progress><button>Next</button>"#;

const SPONSORSHIP_SUBMIT: &str = r#"<fieldset data-form-section><legend>Will you require visa sponsorship?</legend>
<input type="radio" id="s-yes" name="sponsor" value="Yes"><label for="s-yes">Yes</label>
<input type="radio" id="s-no" name="sponsor" value="No"><label for="s-no">No</label></fieldset>
<progress value="50"></progress><button>Submit application</button>"#;

/// Answers by prompt shape and counts every call.
#[derive(Default)]
struct CountingClient {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatClient for CountingClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = if prompt.contains("determine which section") {
            "Personal information"
        } else if prompt.contains("multiple-choice") {
            "No"
        } else {
            "Berlin"
        };
        Ok(reply.to_string())
    }
}

fn write_job(root: &Path, id: &str, job_yaml: &str, steps: &[&str]) {
    let dir = root.join("jobs").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("job.yaml"), job_yaml).unwrap();
    for (number, html) in steps.iter().enumerate() {
        fs::write(dir.join(format!("step-{}.html", number + 1)), html).unwrap();
    }
}

fn board_fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("listings.yaml"), LISTINGS).unwrap();
    fs::write(dir.path().join("recruiters.yaml"), RECRUITERS).unwrap();
    write_job(
        dir.path(),
        "acme",
        "link: https://jobs/acme\ndescription: Build services in Rust\nrecruiter: https://site/in/jane\n",
        &[CITY_SUBMIT],
    );
    write_job(
        dir.path(),
        "globex",
        "link: https://jobs/globex\ndescription: Backend work\n",
        &[CITY_NEXT, SPONSORSHIP_SUBMIT],
    );
    dir
}

#[tokio::test]
async fn test_apply_run_against_replay_board() {
    let fixture = board_fixture();
    let board = Arc::new(ReplayBoard::open_dir(fixture.path()).await.unwrap());

    let db = Database::in_memory().await.unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let client = CountingClient { calls: calls.clone() };
    let answerer = Arc::new(Answerer::new(client, Profile::from_yaml(RESUME).unwrap()));
    let cache = QuestionCache::load(&db).await.unwrap();
    let filler = FormFiller::new(answerer, cache, PathBuf::from("data/resume.pdf"));
    let applier = EasyApplier::new(filler, std::time::Duration::from_secs(30));

    let search = SearchConfig::from_yaml(CONFIG, Path::new("config.yaml")).unwrap();
    let mut settings = job_applier::core::Settings::default();
    settings.pacing = PacingSettings::none();

    let mut manager = JobManager::new(board.clone(), applier, db.clone(), search, &settings);
    let summary = manager.run(RunMode::Apply).await.unwrap();

    assert_eq!(summary.applied, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.connected, 1);
    assert!(!summary.daily_limit_reached);

    // Classifier and answer for the first "city", options for the radio; the second "city" is cached
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let stored = db.jobs().list(false).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|job| job.applied && job.connected));

    let questions = db.questions().load_all().await.unwrap();
    assert_eq!(questions.len(), 2);

    let events = board.transcript();
    let filled: Vec<&FillAction> = events
        .iter()
        .filter_map(|event| match event {
            ReplayEvent::Filled { decision, .. } => Some(&decision.action),
            _ => None,
        })
        .collect();
    assert_eq!(
        filled,
        vec![
            &FillAction::EnterText {
                value: "Berlin".to_string()
            },
            &FillAction::EnterText {
                value: "Berlin".to_string()
            },
            &FillAction::SelectRadio {
                option: "no".to_string()
            },
        ]
    );

    let pressed = events
        .iter()
        .filter(|event| matches!(event, ReplayEvent::Pressed { .. }))
        .count();
    assert_eq!(pressed, 3);
    assert!(events
        .iter()
        .any(|event| matches!(event, ReplayEvent::Connected { recruiter, .. } if recruiter == "https://site/in/jane")));
}

#[tokio::test]
async fn test_reapply_retries_failed_jobs() {
    let fixture = board_fixture();
    let board = Arc::new(ReplayBoard::open_dir(fixture.path()).await.unwrap());
    let db = Database::in_memory().await.unwrap();

    let failed = job_applier::Job::new("Backend Engineer", "Globex", "Berlin", "https://jobs/globex")
        .with_apply_method("Promoted");
    db.jobs().save_job(&failed, false, true).await.unwrap();

    let client = CountingClient::default();
    let answerer = Arc::new(Answerer::new(client, Profile::from_yaml(RESUME).unwrap()));
    let cache = QuestionCache::load(&db).await.unwrap();
    let filler = FormFiller::new(answerer, cache, PathBuf::from("data/resume.pdf"));
    let applier = EasyApplier::new(filler, std::time::Duration::from_secs(30));
    let search = SearchConfig::from_yaml(CONFIG, Path::new("config.yaml")).unwrap();
    let mut settings = job_applier::core::Settings::default();
    settings.pacing = PacingSettings::none();

    let mut manager = JobManager::new(board, applier, db.clone(), search, &settings);
    let summary = manager.run(RunMode::Reapply).await.unwrap();

    assert_eq!(summary.applied, 1);
    assert!(db.jobs().load_unapplied().await.unwrap().is_empty());
}
