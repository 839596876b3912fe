use compliance_review::{
    ai::{Analyzer, FileState, ModelInfo, PollPolicy, RemoteFile, analyze_project, wait_until_processed},
    analysis::parse_ai_response,
    config::Config,
    error::ReviewError,
    workflow::{ContentType, ProjectRecord, SourceFile},
};
use std::cell::{Cell, RefCell};
use std::time::Duration;

const FENCED: &str = "```json\n{\"score\": 85, \"risks\": [], \"recommendations\": [\"Do X\"], \"email_draft\": \"Hi\"}\n```";

/// Serves a fixed response and walks uploaded files through `states`.
struct FakeAnalyzer {
    response: String,
    states: RefCell<Vec<FileState>>,
    polls: Cell<u32>,
    prompted_with: RefCell<Option<String>>,
}

impl FakeAnalyzer {
    fn new(response: &str, states: Vec<FileState>) -> Self {
        Self {
            response: response.to_string(),
            states: RefCell::new(states),
            polls: Cell::new(0),
            prompted_with: RefCell::new(None),
        }
    }

    fn file(state: FileState) -> RemoteFile {
        RemoteFile {
            name: "files/abc123".into(),
            uri: "https://example.invalid/files/abc123".into(),
            mime_type: "video/mp4".into(),
            state,
        }
    }
}

impl Analyzer for FakeAnalyzer {
    fn analyze_text(&self, _prompt: &str, content: &str) -> Result<String, ReviewError> {
        *self.prompted_with.borrow_mut() = Some(content.to_string());
        Ok(self.response.clone())
    }

    fn upload_file(&self, _: &str, _: &[u8], _: &str) -> Result<RemoteFile, ReviewError> {
        Ok(Self::file(FileState::Processing))
    }

    fn get_file(&self, _name: &str) -> Result<RemoteFile, ReviewError> {
        self.polls.set(self.polls.get() + 1);
        let mut states = self.states.borrow_mut();
        let state = if states.len() > 1 {
            states.remove(0)
        } else {
            states.first().copied().unwrap_or(FileState::Processing)
        };
        Ok(Self::file(state))
    }

    fn analyze_file(&self, _prompt: &str, file: &RemoteFile) -> Result<String, ReviewError> {
        *self.prompted_with.borrow_mut() = Some(file.uri.clone());
        Ok(self.response.clone())
    }

    fn list_models(&self) -> Result<Vec<ModelInfo>, ReviewError> {
        Ok(Vec::new())
    }
}

fn project(kind: ContentType, file: SourceFile) -> ProjectRecord {
    ProjectRecord {
        brand: "Sol".into(),
        campaign: "Verano".into(),
        influencer: "@ana".into(),
        version: "V2 - Revisions".into(),
        reviewer_name: "QA Team".into(),
        content_type: kind,
        source_file: file,
    }
}

fn no_sleep(_: Duration) {}

#[test]
fn fenced_json_response_parses() {
    let result = parse_ai_response(FENCED).unwrap();
    assert_eq!(result.score, 85);
    assert!(result.findings.is_empty());
    assert_eq!(result.recommendations, vec!["Do X"]);
    assert_eq!(result.final_recommendations, "- Do X");
}

#[test]
fn null_lists_mean_nothing_found() {
    let result = parse_ai_response(
        r#"{"score": 95, "risks": null, "recommendations": null, "email_draft": "Hi"}"#,
    )
    .unwrap();
    assert_eq!(result.score, 95);
    assert!(result.findings.is_empty());
    assert!(result.recommendations.is_empty());
    assert_eq!(result.email_draft, "Hi");
}

#[test]
fn unparseable_response_keeps_raw_text() {
    let err = parse_ai_response("I cannot review this script.").unwrap_err();
    assert_eq!(err.raw_response(), Some("I cannot review this script."));
}

#[test]
fn script_is_normalized_before_prompting() {
    let fake = FakeAnalyzer::new(FENCED, vec![]);
    let file = SourceFile::new("guion.txt", b"LUIS: Hola\namigos.\r\n\r\nFin".to_vec());
    let result = analyze_project(&fake, &project(ContentType::Script, file), &Config::default(), &no_sleep)
        .unwrap();
    assert_eq!(result.score, 85);
    assert_eq!(
        fake.prompted_with.borrow().as_deref(),
        Some("LUIS: Hola amigos.\n\nFin")
    );
}

#[test]
fn video_waits_until_active() {
    let fake = FakeAnalyzer::new(FENCED, vec![FileState::Processing, FileState::Active]);
    let file = SourceFile::new("spot.mp4", vec![0u8; 16]);
    let result = analyze_project(&fake, &project(ContentType::Video, file), &Config::default(), &no_sleep)
        .unwrap();
    assert_eq!(result.score, 85);
    assert_eq!(fake.polls.get(), 2);
    assert!(fake.prompted_with.borrow().as_deref().unwrap().ends_with("abc123"));
}

#[test]
fn processing_forever_times_out() {
    let fake = FakeAnalyzer::new(FENCED, vec![FileState::Processing]);
    let policy = PollPolicy {
        interval: Duration::from_secs(5),
        max_attempts: 3,
        timeout: None,
    };
    let slept = Cell::new(Duration::ZERO);
    let sleep = |d: Duration| slept.set(slept.get() + d);
    let err = wait_until_processed(&fake, FakeAnalyzer::file(FileState::Processing), &policy, &sleep)
        .unwrap_err();
    assert!(matches!(err, ReviewError::Timeout { attempts: 3, .. }));
    assert_eq!(fake.polls.get(), 3);
    assert_eq!(slept.get(), Duration::from_secs(15));
}

#[test]
fn failed_processing_is_an_error() {
    let fake = FakeAnalyzer::new(FENCED, vec![FileState::Failed]);
    let policy = PollPolicy {
        interval: Duration::ZERO,
        max_attempts: 10,
        timeout: None,
    };
    let err = wait_until_processed(&fake, FakeAnalyzer::file(FileState::Processing), &policy, &no_sleep)
        .unwrap_err();
    assert!(matches!(err, ReviewError::Ai(_)));
}
