//! Typed view of the model's compliance verdict.
//!
//! The model is asked for a single JSON object but routinely wraps it in
//! markdown fences, adds prose around it, or leaves raw newlines inside string
//! values. Parsing tolerates those three things and nothing else; any other
//! deviation is an [`ReviewError::AiResponseParse`] carrying the raw text.

use crate::error::ReviewError;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const SIGN_OFF: &str = "Best regards,";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Quote(String),
    Timestamp(String),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub risk_label: String,
    pub evidence: Evidence,
    pub explanation: String,
}

impl Finding {
    pub fn quote(&self) -> Option<&str> {
        match &self.evidence {
            Evidence::Quote(q) if !q.trim().is_empty() => Some(q.trim()),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match &self.evidence {
            Evidence::Timestamp(t) if !t.trim().is_empty() => Some(t.trim()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Fail,
    Warn,
    Pass,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        if score < 60 {
            Self::Fail
        } else if score < 90 {
            Self::Warn
        } else {
            Self::Pass
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fail => "red",
            Self::Warn => "orange",
            Self::Pass => "green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: u8,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub email_draft: String,
    /// The reviewer's edit of the recommendations; the only field that changes
    /// after parsing.
    pub final_recommendations: String,
}

impl AnalysisResult {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.score)
    }

    /// Email draft guaranteed to end with the sign-off line.
    pub fn email_with_sign_off(&self) -> String {
        ensure_sign_off(&self.email_draft)
    }
}

/// Recommendations as a `- item` list, the starting point for the reviewer's edit.
pub fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ensure_sign_off(email: &str) -> String {
    let trimmed = email.trim_end();
    if trimmed.is_empty() || trimmed.ends_with(SIGN_OFF) || trimmed.ends_with("Best regards") {
        return email.to_string();
    }
    format!("{trimmed}\n\n{SIGN_OFF}")
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    risks: Option<Vec<RawRisk>>,
    #[serde(default)]
    recommendations: Option<Vec<String>>,
    #[serde(default)]
    email_draft: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRisk {
    #[serde(default)]
    risk: Option<String>,
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
}

impl From<RawRisk> for Finding {
    fn from(r: RawRisk) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let evidence = match (non_empty(r.quote), non_empty(r.timestamp)) {
            (Some(q), _) => Evidence::Quote(q),
            (None, Some(t)) => Evidence::Timestamp(t),
            (None, None) => Evidence::None,
        };
        Finding {
            risk_label: non_empty(r.risk).unwrap_or_else(|| "Risk".to_string()),
            evidence,
            explanation: r.explanation.unwrap_or_default(),
        }
    }
}

pub fn parse_ai_response(raw: &str) -> Result<AnalysisResult, ReviewError> {
    let fail = |reason: String| ReviewError::AiResponseParse {
        reason,
        raw: raw.to_string(),
    };

    let body = extract_json_object(raw);
    if body.is_empty() {
        return Err(fail("response is empty".into()));
    }
    let body = escape_control_chars_in_strings(body);
    let parsed: RawResponse =
        serde_json::from_str(&body).map_err(|e| fail(e.to_string()))?;

    let score = match parsed.score {
        None | Some(serde_json::Value::Null) => {
            warn!("AI response has no score; recording 0");
            0
        }
        Some(v) => coerce_score(&v).ok_or_else(|| fail(format!("score is not a number: {v}")))?,
    };

    let recommendations = parsed.recommendations.unwrap_or_default();
    Ok(AnalysisResult {
        score,
        findings: parsed
            .risks
            .unwrap_or_default()
            .into_iter()
            .map(Finding::from)
            .collect(),
        final_recommendations: bullet_list(&recommendations),
        recommendations,
        email_draft: parsed.email_draft.unwrap_or_default(),
    })
}

fn coerce_score(v: &serde_json::Value) -> Option<u8> {
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().trim_end_matches("/100").trim().parse().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    if !(0.0..=100.0).contains(&n) {
        warn!("AI score {n} outside 0-100; clamping");
    }
    Some(n.round().clamp(0.0, 100.0) as u8)
}

/// Drops markdown fences and anything outside the outermost `{ ... }`.
fn extract_json_object(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let unfenced = unfenced.strip_suffix("```").unwrap_or(unfenced).trim();

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Escapes raw control characters that appear inside JSON string literals.
fn escape_control_chars_in_strings(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        } else {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
    out
}
