//! Line-oriented front end for a [`ReviewSession`].
//!
//! Handler errors are printed and the loop keeps reading; only I/O failures
//! on the console itself end it.

use crate::{
    analysis::{AnalysisResult, Evidence},
    archive::ArchiveOutcome,
    config::Review,
    error::ReviewError,
    render::render_script,
    util::looks_like_url,
    workflow::{ContentType, ProjectRecord, ReviewSession, SourceFile, Step},
};
use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

/// What the console needs from the outside world.
pub trait ReviewServices {
    fn analyze(&self, project: &ProjectRecord) -> Result<AnalysisResult, ReviewError>;
    /// Normalized script text for display; not called for videos.
    fn script_text(&self, project: &ProjectRecord) -> Result<String, ReviewError>;
    fn archive(
        &self,
        project: &ProjectRecord,
        analysis: &AnalysisResult,
        email_body: &str,
    ) -> ArchiveOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Brand,
    Campaign,
    Influencer,
    Version,
    Reviewer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(Field, String),
    Type(ContentType),
    File(PathBuf),
    Show,
    Analyze,
    NextRisk,
    PrevRisk,
    NextRecommendation,
    PrevRecommendation,
    Script,
    EditRecommendations,
    Approve,
    Back,
    Email,
    EditEmail,
    Save,
    Restart,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "brand" => Command::Set(Field::Brand, rest.to_string()),
        "campaign" => Command::Set(Field::Campaign, rest.to_string()),
        "influencer" => Command::Set(Field::Influencer, rest.to_string()),
        "version" => Command::Set(Field::Version, rest.to_string()),
        "reviewer" => Command::Set(Field::Reviewer, rest.to_string()),
        "type" => match rest.to_ascii_lowercase().as_str() {
            "script" => Command::Type(ContentType::Script),
            "video" => Command::Type(ContentType::Video),
            _ => Command::Unknown(line.to_string()),
        },
        "file" if !rest.is_empty() => Command::File(PathBuf::from(rest)),
        "show" => Command::Show,
        "analyze" | "analyse" => Command::Analyze,
        "n" | "next" => Command::NextRisk,
        "p" | "prev" => Command::PrevRisk,
        "rn" => Command::NextRecommendation,
        "rp" => Command::PrevRecommendation,
        "script" => Command::Script,
        "edit" => Command::EditRecommendations,
        "approve" => Command::Approve,
        "back" => Command::Back,
        "email" if rest == "edit" => Command::EditEmail,
        "email" => Command::Email,
        "save" | "confirm" => Command::Save,
        "restart" => Command::Restart,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    };
    Some(cmd)
}

const HELP: &str = "\
Step 1 (configure): brand|campaign|influencer|version|reviewer <value>, type script|video, file <path>, show, analyze
Step 2 (review):    n/p (risks), rn/rp (recommendations), script, edit, approve, back
Step 3 (finalize):  email, email edit, save
Any step:           restart, help, quit
Multi-line edits end with a line containing a single '.'";

pub struct Console<'a, R, W> {
    input: R,
    out: W,
    review: &'a Review,
    services: &'a dyn ReviewServices,
    reject_urls: bool,
    session: ReviewSession,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(input: R, out: W, review: &'a Review, services: &'a dyn ReviewServices) -> Self {
        Self {
            input,
            out,
            review,
            services,
            reject_urls: true,
            session: ReviewSession::new(),
        }
    }

    pub fn reject_url_inputs(mut self, reject: bool) -> Self {
        self.reject_urls = reject;
        self
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ReviewSession {
        &mut self.session
    }

    /// Reads commands until `quit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "{HELP}")?;
        loop {
            let step = self.session.step();
            write!(self.out, "[{}/3 {:?}]> ", step.number(), step)?;
            self.out.flush()?;

            let Some(line) = self.read_line()? else {
                break;
            };
            let Some(cmd) = parse_command(&line) else {
                continue;
            };
            if cmd == Command::Quit {
                break;
            }
            if let Err(e) = self.handle(cmd) {
                self.report_error(&e)?;
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_block(&mut self) -> Result<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim() == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    fn report_error(&mut self, err: &HandlerError) -> Result<()> {
        match err {
            HandlerError::Review(e) => {
                writeln!(self.out, "error: {e}")?;
                if let Some(raw) = e.raw_response() {
                    writeln!(self.out, "raw AI response:\n{raw}")?;
                }
                Ok(())
            }
            HandlerError::Io(e) => Err(anyhow::anyhow!("console I/O: {e}")),
        }
    }

    fn handle(&mut self, cmd: Command) -> Result<(), HandlerError> {
        match cmd {
            Command::Set(field, value) => self.set_field(field, value)?,
            Command::Type(kind) => {
                self.session.draft_mut()?.content_type = Some(kind);
            }
            Command::File(path) => self.attach_file(path)?,
            Command::Show => self.show_draft()?,
            Command::Analyze => self.analyze()?,
            Command::NextRisk => {
                self.session.next_risk();
                self.show_risk()?;
            }
            Command::PrevRisk => {
                self.session.prev_risk();
                self.show_risk()?;
            }
            Command::NextRecommendation => {
                self.session.next_recommendation();
                self.show_recommendation()?;
            }
            Command::PrevRecommendation => {
                self.session.prev_recommendation();
                self.show_recommendation()?;
            }
            Command::Script => self.show_script()?,
            Command::EditRecommendations => {
                if self.session.step() != Step::Review {
                    return Err(not_now("edit recommendations", self.session.step()));
                }
                if let Some(a) = self.session.analysis() {
                    writeln!(self.out, "Current recommendations:\n{}", a.final_recommendations)?;
                }
                writeln!(self.out, "Enter the final recommendations, end with '.':")?;
                let text = self.read_block()?;
                self.session.set_final_recommendations(text)?;
            }
            Command::Approve => {
                self.session.approve(None)?;
                writeln!(self.out, "Approved. Email draft:")?;
                self.show_email()?;
            }
            Command::Back => self.session.back()?,
            Command::Email => self.show_email()?,
            Command::EditEmail => {
                if self.session.step() != Step::Finalize {
                    return Err(not_now("edit the email", self.session.step()));
                }
                writeln!(self.out, "Enter the email body, end with '.':")?;
                let text = self.read_block()?;
                self.session.set_final_email(text)?;
            }
            Command::Save => self.save()?,
            Command::Restart => {
                self.session.reset();
                writeln!(self.out, "Session reset.")?;
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => {}
            Command::Unknown(line) => writeln!(self.out, "unknown command: {line} (try help)")?,
        }
        Ok(())
    }

    fn set_field(&mut self, field: Field, value: String) -> Result<(), HandlerError> {
        let (choices, label) = match field {
            Field::Brand => (Some(&self.review.brands), "brand"),
            Field::Version => (Some(&self.review.versions), "version"),
            _ => (None, ""),
        };
        if let Some(list) = choices {
            if !value.is_empty() && !list.iter().any(|c| c == &value) {
                writeln!(self.out, "note: {value:?} is not a configured {label}")?;
            }
        }
        let draft = self.session.draft_mut()?;
        match field {
            Field::Brand => draft.brand = value,
            Field::Campaign => draft.campaign = value,
            Field::Influencer => draft.influencer = value,
            Field::Version => draft.version = value,
            Field::Reviewer => draft.reviewer_name = value,
        }
        Ok(())
    }

    fn attach_file(&mut self, path: PathBuf) -> Result<(), HandlerError> {
        let shown = path.display().to_string();
        if self.reject_urls && looks_like_url(&shown) {
            return Err(ReviewError::extraction(shown, "URL inputs are disabled").into());
        }
        let draft = self.session.draft_mut()?;
        let file = SourceFile::read(&path).map_err(|e| ReviewError::extraction(&shown, e))?;
        let size = file.bytes.len();
        draft.source_file = Some(file);
        writeln!(self.out, "attached {shown} ({size} bytes)")?;
        Ok(())
    }

    fn show_draft(&mut self) -> Result<(), HandlerError> {
        let d = self.session.draft();
        let file = d
            .source_file
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| "(none)".into());
        writeln!(
            self.out,
            "brand={:?} campaign={:?} influencer={:?} version={:?} reviewer={:?} type={:?} file={}",
            d.brand,
            d.campaign,
            d.influencer,
            d.version,
            d.reviewer_name,
            d.content_type.unwrap_or(ContentType::Script),
            file
        )?;
        Ok(())
    }

    fn analyze(&mut self) -> Result<(), HandlerError> {
        writeln!(self.out, "Analyzing...")?;
        let services = self.services;
        self.session
            .begin_review(self.review, |p| services.analyze(p))?;
        if let Some(a) = self.session.analysis() {
            writeln!(
                self.out,
                "Score: {}/100 ({}) | {} risks | {} recommendations",
                a.score,
                a.score_band().label(),
                a.findings.len(),
                a.recommendations.len()
            )?;
        }
        self.show_risk()?;
        self.show_recommendation()?;
        Ok(())
    }

    fn show_risk(&mut self) -> Result<(), HandlerError> {
        let (Some(pos), Some(f)) = (self.session.risk_position(), self.session.current_risk()) else {
            writeln!(self.out, "No risks found.")?;
            return Ok(());
        };
        writeln!(self.out, "{pos}: {}", f.risk_label)?;
        match &f.evidence {
            Evidence::Quote(q) => writeln!(self.out, "  quote: \"{q}\"")?,
            Evidence::Timestamp(t) => writeln!(self.out, "  at: {t}")?,
            Evidence::None => {}
        }
        writeln!(self.out, "  {}", f.explanation)?;
        Ok(())
    }

    fn show_recommendation(&mut self) -> Result<(), HandlerError> {
        match (
            self.session.recommendation_position(),
            self.session.current_recommendation(),
        ) {
            (Some(pos), Some(r)) => writeln!(self.out, "{pos}: {r}")?,
            _ => writeln!(self.out, "No recommendations.")?,
        }
        Ok(())
    }

    fn show_script(&mut self) -> Result<(), HandlerError> {
        let (Some(project), Some(analysis)) = (self.session.project(), self.session.analysis())
        else {
            return Err(not_now("show the script", self.session.step()));
        };
        if project.content_type == ContentType::Video {
            for f in &analysis.findings {
                let at = f.timestamp().unwrap_or("--:--");
                writeln!(self.out, "[{at}] {}", f.risk_label)?;
            }
            return Ok(());
        }
        let text = self.services.script_text(project)?;
        let rendered = render_script(&text, &analysis.findings);
        write!(self.out, "{rendered}")?;
        writeln!(self.out, "({} highlighted passages)", rendered.highlight_count())?;
        Ok(())
    }

    fn show_email(&mut self) -> Result<(), HandlerError> {
        if self.session.step() != Step::Finalize {
            return Err(not_now("show the email", self.session.step()));
        }
        let campaign = self
            .session
            .project()
            .map(|p| p.campaign.as_str())
            .unwrap_or_default();
        writeln!(
            self.out,
            "Subject: Content Review - {campaign}\n\n{}",
            self.session.final_email()
        )?;
        Ok(())
    }

    fn save(&mut self) -> Result<(), HandlerError> {
        let (Step::Finalize, Some(project), Some(analysis)) = (
            self.session.step(),
            self.session.project(),
            self.session.analysis(),
        ) else {
            return Err(not_now("save", self.session.step()));
        };
        writeln!(self.out, "Saving...")?;
        let outcome = self
            .services
            .archive(project, analysis, self.session.final_email());
        info!(
            "archived campaign={} ledger={} warnings={}",
            project.campaign,
            outcome.ledger_appended,
            outcome.warnings.len()
        );
        self.print_outcome(&outcome)?;
        self.session.reset();
        writeln!(self.out, "Ready for a new review.")?;
        Ok(())
    }

    fn print_outcome(&mut self, outcome: &ArchiveOutcome) -> Result<(), HandlerError> {
        if let Some(p) = &outcome.backup_path {
            writeln!(self.out, "Local backup: {}", p.display())?;
        }
        for (label, link) in [
            ("Folder", &outcome.folder_link),
            ("Original file", &outcome.file_link),
            ("Report", &outcome.report_link),
        ] {
            if !link.is_empty() {
                writeln!(self.out, "{label}: {link}")?;
            }
        }
        writeln!(
            self.out,
            "Ledger: {}",
            if outcome.ledger_appended { "recorded" } else { "not recorded" }
        )?;
        for w in &outcome.warnings {
            writeln!(self.out, "warning: {w}")?;
        }
        Ok(())
    }
}

fn not_now(action: &'static str, step: Step) -> HandlerError {
    HandlerError::Review(ReviewError::InvalidTransition {
        action,
        step: step.number(),
    })
}

#[derive(Debug)]
enum HandlerError {
    Review(ReviewError),
    Io(std::io::Error),
}

impl From<ReviewError> for HandlerError {
    fn from(e: ReviewError) -> Self {
        Self::Review(e)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<std::io::Error>() {
            Ok(io) => Self::Io(io),
            Err(other) => Self::Io(std::io::Error::other(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_command("campaign  Verano 2025 "),
            Some(Command::Set(Field::Campaign, "Verano 2025".into()))
        );
        assert_eq!(parse_command("type VIDEO"), Some(Command::Type(ContentType::Video)));
        assert_eq!(parse_command("email edit"), Some(Command::EditEmail));
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("file"), Some(Command::Unknown("file".into())));
    }
}
