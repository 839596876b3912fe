use crate::{
    ai::{self, Analyzer, gemini::GeminiClient},
    analysis::{AnalysisResult, parse_ai_response},
    archive::{ArchiveOutcome, Archiver},
    config::{Config, require_setting},
    console::{Console, ReviewServices},
    doctor,
    error::ReviewError,
    extract::extract_text,
    render::render_script,
    storage::{
        drive::DriveStore,
        local::LocalBackup,
        sheets::SheetsLedger,
        token::{AccessTokenProvider, TokenSource},
    },
    util::{ensure_dir, local_timestamp, looks_like_url},
    workflow::{ContentType, ProjectRecord, SourceFile},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "compliance-review")]
#[command(about = "Guided compliance review of influencer scripts and videos")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./compliance-review.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check credentials and connectivity to Gemini, Drive and Sheets.
    Doctor {},
    /// List models that support generateContent.
    Models {},
    /// Print the normalized text of a script.
    Extract {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print a script with speakers, scene headers and flagged quotes marked.
    Render {
        #[arg(long)]
        input: PathBuf,
        /// Raw AI response whose quotes are highlighted.
        #[arg(long)]
        response: Option<PathBuf>,
    },
    /// Parse a saved raw AI response and print the typed result.
    Parse {
        #[arg(long)]
        response: PathBuf,
    },
    /// Interactive review session, optionally pre-filled.
    Review {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long)]
        influencer: Option<String>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        reviewer: Option<String>,
        /// Treat the input as a video instead of a script.
        #[arg(long)]
        video: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    info!("config={}", cfg_path.display());

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Models {} => models(&cfg),
        Command::Extract { input } => extract(&cfg, input),
        Command::Render { input, response } => render(&cfg, input, response.as_deref()),
        Command::Parse { response } => parse(response),
        Command::Review {
            input,
            brand,
            campaign,
            influencer,
            version,
            reviewer,
            video,
        } => review(
            &cfg,
            input.as_deref(),
            [brand, campaign, influencer, version, reviewer],
            *video,
        ),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("compliance-review.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("compliance-review.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = if args.log_level.is_some() {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    // The console owns stdout; log lines go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.work_dir).join("compliance-review.log"))
}

fn doctor(cfg: &Config) -> Result<()> {
    let report = doctor::run(cfg);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.all_ok() {
        warn!("one or more connection checks failed");
    }
    Ok(())
}

fn models(cfg: &Config) -> Result<()> {
    let client = GeminiClient::new(cfg)?;
    let models: Vec<_> = client
        .list_models()?
        .into_iter()
        .filter(|m| m.supports_generate_content)
        .collect();
    println!("{}", serde_json::to_string_pretty(&models)?);
    Ok(())
}

fn extract(cfg: &Config, input: &Path) -> Result<()> {
    let source = read_input(cfg, input)?;
    let text = extract_text(&source.name, &source.bytes, &cfg.extract)?;
    println!("{text}");
    Ok(())
}

fn render(cfg: &Config, input: &Path, response: Option<&Path>) -> Result<()> {
    let source = read_input(cfg, input)?;
    let text = extract_text(&source.name, &source.bytes, &cfg.extract)?;
    let findings = match response {
        Some(p) => read_response(p)?.findings,
        None => Vec::new(),
    };
    let rendered = render_script(&text, &findings);
    print!("{rendered}");
    info!("{} highlighted passages", rendered.highlight_count());
    Ok(())
}

fn parse(response: &Path) -> Result<()> {
    let result = read_response(response)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_response(path: &Path) -> Result<AnalysisResult> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading response: {}", path.display()))?;
    Ok(parse_ai_response(&raw)?)
}

fn review(
    cfg: &Config,
    input: Option<&Path>,
    fields: [&Option<String>; 5],
    video: bool,
) -> Result<()> {
    let services = LiveServices::new(cfg)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock(), &cfg.review, &services)
        .reject_url_inputs(cfg.security.reject_url_inputs);

    {
        let draft = console.session_mut().draft_mut()?;
        let [brand, campaign, influencer, version, reviewer] = fields;
        let fill = |slot: &mut String, value: &Option<String>| {
            if let Some(v) = value {
                *slot = v.clone();
            }
        };
        fill(&mut draft.brand, brand);
        fill(&mut draft.campaign, campaign);
        fill(&mut draft.influencer, influencer);
        fill(&mut draft.version, version);
        fill(&mut draft.reviewer_name, reviewer);
        draft.content_type = Some(if video {
            ContentType::Video
        } else {
            ContentType::Script
        });
        if let Some(p) = input {
            draft.source_file = Some(read_input(cfg, p)?);
        }
    }

    console.run()
}

fn read_input(cfg: &Config, input: &Path) -> Result<SourceFile> {
    validate_input(cfg, input)?;
    SourceFile::read(input).with_context(|| format!("reading input: {}", input.display()))
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    let len = std::fs::metadata(input)
        .with_context(|| format!("metadata: {}", input.display()))?
        .len();
    if exceeds_limit(len, cfg.extract.max_input_file_bytes) {
        return Err(anyhow!(
            "input is {len} bytes, above extract.max_input_file_bytes={}",
            cfg.extract.max_input_file_bytes
        ));
    }

    Ok(())
}

/// A limit of 0 disables the check.
fn exceeds_limit(len: u64, max: u64) -> bool {
    max > 0 && len > max
}

/// The production wiring: Gemini for analysis, Drive + Sheets + local disk
/// for archival. Drive and Sheets are optional; when they cannot be set up
/// the archive still writes the local backup and reports why.
struct LiveServices<'a> {
    cfg: &'a Config,
    analyzer: GeminiClient,
    drive: Result<DriveStore, ReviewError>,
    sheets: Result<SheetsLedger, ReviewError>,
}

impl<'a> LiveServices<'a> {
    fn new(cfg: &'a Config) -> Result<Self> {
        let analyzer = GeminiClient::new(cfg)?;
        let tokens: Arc<dyn TokenSource> = Arc::new(AccessTokenProvider::new(&cfg.auth));
        let drive = require_setting(&cfg.drive.root_folder_id, "drive.root_folder_id")
            .and_then(|_| DriveStore::new(&cfg.drive, tokens.clone()));
        let sheets = require_setting(&cfg.sheets.spreadsheet_id, "sheets.spreadsheet_id")
            .and_then(|id| SheetsLedger::new(&cfg.sheets, id, tokens.clone()));
        for (target, r) in [("drive", drive.as_ref().err()), ("sheets", sheets.as_ref().err())] {
            if let Some(e) = r {
                warn!("{target} unavailable: {e}");
            }
        }
        Ok(Self {
            cfg,
            analyzer,
            drive,
            sheets,
        })
    }
}

impl ReviewServices for LiveServices<'_> {
    fn analyze(&self, project: &ProjectRecord) -> Result<AnalysisResult, ReviewError> {
        ai::analyze_project(&self.analyzer, project, self.cfg, &std::thread::sleep)
    }

    fn script_text(&self, project: &ProjectRecord) -> Result<String, ReviewError> {
        let source = &project.source_file;
        extract_text(&source.name, &source.bytes, &self.cfg.extract)
    }

    fn archive(
        &self,
        project: &ProjectRecord,
        analysis: &AnalysisResult,
        email_body: &str,
    ) -> ArchiveOutcome {
        let mut archiver = Archiver::new(LocalBackup::new(&self.cfg.paths.backup_dir));
        match &self.drive {
            Ok(d) => archiver = archiver.with_store(d, self.cfg.drive.root_folder_id.trim()),
            Err(e) => archiver.target_unavailable("drive", e),
        }
        match &self.sheets {
            Ok(s) => archiver = archiver.with_ledger(s),
            Err(e) => archiver.target_unavailable("sheets", e),
        }
        archiver.archive(project, analysis, email_body, &local_timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_limit_accepts_any_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guion.txt");
        std::fs::write(&path, "LUIS: Hola.").unwrap();

        let mut cfg = Config::default();
        cfg.extract.max_input_file_bytes = 0;
        assert!(validate_input(&cfg, &path).is_ok());

        cfg.extract.max_input_file_bytes = 4;
        assert!(validate_input(&cfg, &path).is_err());
    }
}
