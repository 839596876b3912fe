use crate::{config::Extract, error::ReviewError, normalize::normalize_text};
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

static DOCX_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>").expect("static regex")
});
static DOCX_RUN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br/>|<w:cr/>").expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("docx") => Self::Docx,
            _ => Self::PlainText,
        }
    }
}

/// Plain text of an uploaded script, reconstructed into paragraphs.
pub fn extract_text(file_name: &str, bytes: &[u8], cfg: &Extract) -> Result<String, ReviewError> {
    if cfg.max_input_file_bytes > 0 && bytes.len() as u64 > cfg.max_input_file_bytes {
        return Err(ReviewError::extraction(
            file_name,
            format!(
                "file is {} bytes, limit is {}",
                bytes.len(),
                cfg.max_input_file_bytes
            ),
        ));
    }

    let kind = DocumentKind::from_file_name(file_name);
    let raw = match kind {
        DocumentKind::Pdf => pdf_text(bytes),
        DocumentKind::Docx => docx_text(bytes),
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string()),
    }
    .map_err(|cause| ReviewError::extraction(file_name, cause))?;

    debug!(?kind, raw_chars = raw.len(), "extracted {}", file_name);

    let raw = if cfg.normalize_unicode {
        raw.nfkc().collect::<String>()
    } else {
        raw
    };
    Ok(normalize_text(&raw))
}

fn pdf_text(bytes: &[u8]) -> Result<String, String> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())?;
    // pdf-extract separates pages with form feeds.
    Ok(text.split('\x0C').collect::<Vec<_>>().join("\n"))
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;
    Ok(docx_paragraphs(&xml).join("\n"))
}

fn docx_paragraphs(xml: &str) -> Vec<String> {
    DOCX_PARAGRAPH
        .captures_iter(xml)
        .map(|p| match p.get(1) {
            None => String::new(),
            Some(body) => {
                let mut text = String::new();
                for run in DOCX_RUN_TEXT.captures_iter(body.as_str()) {
                    match run.get(1) {
                        Some(t) => text.push_str(&unescape_xml(t.as_str())),
                        None if run[0].starts_with("<w:tab") => text.push('\t'),
                        None => text.push('\n'),
                    }
                }
                text
            }
        })
        .collect()
}

fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|h| u32::from_str_radix(h, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}
