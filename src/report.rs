//! The archived review report and the ledger row that points at it.

use crate::{
    analysis::{AnalysisResult, SIGN_OFF},
    storage::LedgerCell,
    workflow::ProjectRecord,
};

pub const LEDGER_HEADER: [&str; 10] = [
    "Timestamp",
    "Brand",
    "Campaign",
    "Influencer",
    "Version",
    "Score",
    "Recommendations",
    "Drive Folder Link",
    "Original File Link",
    "Report Link",
];

/// Sheets rejects cells longer than this.
pub const MAX_CELL_CHARS: usize = 50_000;
const TRUNCATED: &str = "... [truncated]";
const RULE_WIDTH: usize = 80;

pub fn report_title(project: &ProjectRecord) -> String {
    format!("Reporte_{}_{}", project.version, project.campaign)
}

/// Plain-text report body. The email's own sign-off is dropped so the report
/// closes with exactly one `Best regards,` followed by the reviewer's name.
pub fn report_document(
    project: &ProjectRecord,
    analysis: &AnalysisResult,
    email_body: &str,
    reviewed_at: &str,
) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    out.push_str(&format!("REVIEW REPORT - {}\n\n", project.campaign));
    out.push_str(&format!("PROJECT INFORMATION\n{rule}\n"));
    out.push_str(&format!("Brand: {}\n", project.brand));
    out.push_str(&format!("Campaign: {}\n", project.campaign));
    out.push_str(&format!("Influencer: {}\n", project.influencer));
    out.push_str(&format!("Version: {}\n", project.version));
    out.push_str(&format!("Score: {}/100\n", analysis.score));
    out.push_str(&format!("Reviewed by: {}\n", project.reviewer_name));
    out.push_str(&format!("Date: {reviewed_at}\n"));
    out.push_str(&format!(
        "Original file: {} (SHA-256 {})\n\n",
        project.source_file.name,
        project.source_file.sha256()
    ));
    out.push_str(&format!(
        "RECOMMENDATIONS\n{rule}\n{}\n\n",
        analysis.final_recommendations
    ));
    out.push_str(&format!(
        "FINAL EMAIL\n{rule}\n{}\n\n",
        strip_sign_off(email_body)
    ));
    out.push_str(&format!("{SIGN_OFF}\n{}\n", project.reviewer_name));
    out
}

fn strip_sign_off(email: &str) -> &str {
    let trimmed = email.trim_end();
    trimmed
        .strip_suffix(SIGN_OFF)
        .or_else(|| trimmed.strip_suffix("Best regards"))
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

/// Links recorded in the ledger; empty when the corresponding upload failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveLinks {
    pub folder: String,
    pub file: String,
    pub report: String,
}

pub fn ledger_row(
    project: &ProjectRecord,
    analysis: &AnalysisResult,
    links: &ArchiveLinks,
    timestamp: &str,
) -> Vec<LedgerCell> {
    let text = |s: &str| LedgerCell::Text(clean_cell(s));
    let link = |url: &str, label: &str| LedgerCell::Link {
        url: clean_cell(url),
        label: label.to_string(),
    };
    vec![
        text(timestamp),
        text(&project.brand),
        text(&project.campaign),
        text(&project.influencer),
        text(&project.version),
        LedgerCell::Number(f64::from(analysis.score)),
        text(&analysis.final_recommendations),
        link(&links.folder, "📁 Open Folder"),
        link(&links.file, "📄 View File"),
        link(&links.report, "📊 View Report"),
    ]
}

/// Single-line cell text within the Sheets size limit.
pub fn clean_cell(value: &str) -> String {
    let flat = value.replace(['\r', '\n'], " ");
    if flat.chars().count() <= MAX_CELL_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL_CHARS).collect();
    cut.push_str(TRUNCATED);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_off_is_stripped_once() {
        assert_eq!(strip_sign_off("Hola equipo.\n\nBest regards,\n"), "Hola equipo.");
        assert_eq!(strip_sign_off("Hola.\nBest regards"), "Hola.");
        assert_eq!(strip_sign_off("Hola."), "Hola.");
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "a".repeat(MAX_CELL_CHARS + 10);
        let cleaned = clean_cell(&long);
        assert!(cleaned.ends_with(TRUNCATED));
        assert_eq!(cleaned.chars().count(), MAX_CELL_CHARS + TRUNCATED.len());
    }

    #[test]
    fn newlines_are_flattened() {
        assert_eq!(clean_cell("- one\r\n- two"), "- one  - two");
    }
}
