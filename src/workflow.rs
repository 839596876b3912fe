//! The review session: Configure → Review → Finalize, with a carousel over
//! findings and another over recommendations.
//!
//! One session per reviewer, owned by whoever drives it; nothing here is
//! shared or global. `reset` returns everything to the start-of-session
//! defaults.

use crate::{
    analysis::{AnalysisResult, Finding},
    config::Review,
    error::ReviewError,
    util::sha256_hex,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Script,
    Video,
}

impl ContentType {
    pub fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Script => &["pdf", "docx", "txt"],
            Self::Video => &["mp4", "mov"],
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_for(&name).to_string();
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn sha256(&self) -> String {
        sha256_hex(&self.bytes)
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

pub fn mime_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub brand: String,
    pub campaign: String,
    pub influencer: String,
    pub version: String,
    pub reviewer_name: String,
    pub content_type: ContentType,
    pub source_file: SourceFile,
}

/// The Configure form as typed in. Nothing is validated until
/// [`ReviewSession::begin_review`].
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub brand: String,
    pub campaign: String,
    pub influencer: String,
    pub version: String,
    pub reviewer_name: String,
    pub content_type: Option<ContentType>,
    pub source_file: Option<SourceFile>,
}

impl ProjectDraft {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.campaign.trim().is_empty() {
            missing.push("campaign");
        }
        if self.influencer.trim().is_empty() {
            missing.push("influencer");
        }
        if self.source_file.is_none() {
            missing.push("file");
        }
        missing
    }

    /// Blank brand, version and reviewer take the configured defaults (the
    /// first listed brand and version). A blank with no default is missing.
    fn into_record(self, defaults: &Review) -> Result<ProjectRecord, ReviewError> {
        let mut missing = self.missing_fields();
        let brand = or_first(&self.brand, &defaults.brands);
        let version = or_first(&self.version, &defaults.versions);
        if brand.is_none() {
            missing.push("brand");
        }
        if version.is_none() {
            missing.push("version");
        }
        let (Some(source_file), Some(brand), Some(version)) = (self.source_file, brand, version)
        else {
            return Err(ReviewError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(ReviewError::MissingFields(missing));
        }

        let content_type = self.content_type.unwrap_or(ContentType::Script);
        if let Some(ext) = source_file.extension() {
            if !content_type.accepted_extensions().contains(&ext.as_str()) {
                warn!("{} is not a usual {:?} upload", source_file.name, content_type);
            }
        }

        let reviewer_name = match self.reviewer_name.trim() {
            "" => defaults.default_reviewer.clone(),
            name => name.to_string(),
        };
        Ok(ProjectRecord {
            brand,
            campaign: self.campaign.trim().to_string(),
            influencer: self.influencer.trim().to_string(),
            version,
            reviewer_name,
            content_type,
            source_file,
        })
    }
}

fn or_first(value: &str, options: &[String]) -> Option<String> {
    match value.trim() {
        "" => options
            .iter()
            .map(|o| o.trim())
            .find(|o| !o.is_empty())
            .map(str::to_string),
        v => Some(v.to_string()),
    }
}

/// Index into a sequence shown one item at a time, wrapping at both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Carousel {
    cursor: usize,
}

impl Carousel {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor % len + 1) % len;
    }

    pub fn prev(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor % len + len - 1) % len;
    }

    pub fn current<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.cursor % items.len())
        }
    }

    /// `"{label} 2 of 5"`, or `None` for an empty sequence.
    pub fn position(&self, label: &str, len: usize) -> Option<String> {
        (len > 0).then(|| format!("{label} {} of {len}", self.cursor % len + 1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    #[default]
    Configure,
    Review,
    Finalize,
}

impl Step {
    pub fn number(self) -> u8 {
        match self {
            Self::Configure => 1,
            Self::Review => 2,
            Self::Finalize => 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct ReviewSession {
    step: Step,
    draft: ProjectDraft,
    project: Option<ProjectRecord>,
    analysis: Option<AnalysisResult>,
    final_email: String,
    risk_cursor: Carousel,
    recommendation_cursor: Carousel,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &ProjectDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> Result<&mut ProjectDraft, ReviewError> {
        self.expect_step(Step::Configure, "edit the project form")?;
        Ok(&mut self.draft)
    }

    pub fn project(&self) -> Option<&ProjectRecord> {
        self.project.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Email body as it will be archived; set when the review is approved.
    pub fn final_email(&self) -> &str {
        &self.final_email
    }

    pub fn set_final_email(&mut self, text: impl Into<String>) -> Result<(), ReviewError> {
        self.expect_step(Step::Finalize, "edit the email")?;
        self.final_email = text.into();
        Ok(())
    }

    fn expect_step(&self, step: Step, action: &'static str) -> Result<(), ReviewError> {
        if self.step != step {
            return Err(ReviewError::InvalidTransition {
                action,
                step: self.step.number(),
            });
        }
        Ok(())
    }

    /// Configure → Review. Requires campaign, influencer and a file, then runs
    /// `analyze`. Any failure leaves the session in Configure with the form intact.
    pub fn begin_review<F>(&mut self, defaults: &Review, analyze: F) -> Result<(), ReviewError>
    where
        F: FnOnce(&ProjectRecord) -> Result<AnalysisResult, ReviewError>,
    {
        self.expect_step(Step::Configure, "start the analysis")?;
        let record = self.draft.clone().into_record(defaults)?;
        let analysis = analyze(&record)?;

        info!(
            "review started campaign={} influencer={} score={} findings={} recommendations={}",
            record.campaign,
            record.influencer,
            analysis.score,
            analysis.findings.len(),
            analysis.recommendations.len()
        );
        self.project = Some(record);
        self.analysis = Some(analysis);
        self.risk_cursor = Carousel::default();
        self.recommendation_cursor = Carousel::default();
        self.step = Step::Review;
        Ok(())
    }

    /// Review → Configure, keeping the form but dropping the findings.
    pub fn back(&mut self) -> Result<(), ReviewError> {
        self.expect_step(Step::Review, "go back")?;
        self.project = None;
        self.analysis = None;
        self.risk_cursor = Carousel::default();
        self.recommendation_cursor = Carousel::default();
        self.step = Step::Configure;
        Ok(())
    }

    pub fn set_final_recommendations(&mut self, text: impl Into<String>) -> Result<(), ReviewError> {
        self.expect_step(Step::Review, "edit recommendations")?;
        if let Some(a) = self.analysis.as_mut() {
            a.final_recommendations = text.into();
        }
        Ok(())
    }

    /// Review → Finalize. The edited text may be empty. The email draft is
    /// seeded from the model's draft with the sign-off guaranteed.
    pub fn approve(&mut self, edited: Option<String>) -> Result<(), ReviewError> {
        self.expect_step(Step::Review, "approve")?;
        if let Some(a) = self.analysis.as_mut() {
            if let Some(text) = edited {
                a.final_recommendations = text;
            }
            self.final_email = a.email_with_sign_off();
        }
        self.step = Step::Finalize;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn findings(&self) -> &[Finding] {
        self.analysis
            .as_ref()
            .map(|a| a.findings.as_slice())
            .unwrap_or_default()
    }

    fn recommendations(&self) -> &[String] {
        self.analysis
            .as_ref()
            .map(|a| a.recommendations.as_slice())
            .unwrap_or_default()
    }

    pub fn next_risk(&mut self) {
        let n = self.findings().len();
        self.risk_cursor.next(n);
    }

    pub fn prev_risk(&mut self) {
        let n = self.findings().len();
        self.risk_cursor.prev(n);
    }

    pub fn next_recommendation(&mut self) {
        let n = self.recommendations().len();
        self.recommendation_cursor.next(n);
    }

    pub fn prev_recommendation(&mut self) {
        let n = self.recommendations().len();
        self.recommendation_cursor.prev(n);
    }

    pub fn risk_cursor(&self) -> usize {
        self.risk_cursor.cursor()
    }

    pub fn recommendation_cursor(&self) -> usize {
        self.recommendation_cursor.cursor()
    }

    pub fn current_risk(&self) -> Option<&Finding> {
        self.risk_cursor.current(self.findings())
    }

    pub fn current_recommendation(&self) -> Option<&str> {
        self.recommendation_cursor
            .current(self.recommendations())
            .map(String::as_str)
    }

    pub fn risk_position(&self) -> Option<String> {
        self.risk_cursor.position("Risk", self.findings().len())
    }

    pub fn recommendation_position(&self) -> Option<String> {
        self.recommendation_cursor
            .position("Recommendation", self.recommendations().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("clip.MOV"), "video/quicktime");
        assert_eq!(mime_for("guion.txt"), "text/plain");
        assert_eq!(mime_for("mystery"), "application/octet-stream");
    }

    #[test]
    fn blank_reviewer_falls_back_to_default() {
        let draft = ProjectDraft {
            campaign: "C".into(),
            influencer: "I".into(),
            source_file: Some(SourceFile::new("a.txt", b"x".to_vec())),
            ..Default::default()
        };
        let record = draft.into_record(&Review::default()).unwrap();
        assert_eq!(record.reviewer_name, "QA Team");
        assert_eq!(record.content_type, ContentType::Script);
    }

    #[test]
    fn blank_brand_and_version_take_first_configured() {
        let draft = ProjectDraft {
            campaign: "Verano".into(),
            influencer: "@luis".into(),
            source_file: Some(SourceFile::new("g.txt", b"x".to_vec())),
            ..Default::default()
        };
        let record = draft.clone().into_record(&Review::default()).unwrap();
        assert_eq!(record.brand, "Heineken");
        assert_eq!(record.version, "V1 - First Draft");

        let bare = Review {
            brands: Vec::new(),
            versions: vec!["  ".into()],
            default_reviewer: "QA".into(),
        };
        match draft.into_record(&bare) {
            Err(ReviewError::MissingFields(fields)) => assert_eq!(fields, vec!["brand", "version"]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
