//! Script display: line classification plus quote highlighting.

use crate::analysis::Finding;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static SPEAKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-ZÁÉÍÓÚÑ\s()]{2,30})(:|-)").expect("static regex"));

const SCENE_HEADER_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `rest` starts with the `:` or `-` separator.
    Speaker { speaker: &'a str, rest: &'a str },
    SceneHeader(&'a str),
    Question(&'a str),
    Body(&'a str),
    Blank,
}

/// Classifies one script line. Checks run in order: speaker, scene header,
/// question, body.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if let Some(m) = SPEAKER.captures(line).and_then(|c| c.get(1)) {
        return LineKind::Speaker {
            speaker: m.as_str(),
            rest: &line[m.end()..],
        };
    }
    if line.chars().count() < SCENE_HEADER_MAX_CHARS && is_upper(line) {
        return LineKind::SceneHeader(line);
    }
    if line.ends_with('?') {
        return LineKind::Question(line);
    }
    LineKind::Body(line)
}

/// At least one cased character and no lower-case ones.
fn is_upper(s: &str) -> bool {
    let mut cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Speaker,
    SceneHeader,
    Question,
    Body,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpanStyle {
    Plain,
    Speaker,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub style: SpanStyle,
    pub text: String,
}

impl Span {
    fn new(style: SpanStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedScript {
    pub blocks: Vec<Block>,
}

impl RenderedScript {
    pub fn highlight_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.spans)
            .filter(|s| s.style == SpanStyle::Highlight)
            .count()
    }

    /// Wraps every case-insensitive occurrence of `quote` in a highlight span.
    /// Text already highlighted is not searched again.
    pub fn highlight(&mut self, quote: &str) {
        let quote = quote.trim();
        if quote.is_empty() {
            return;
        }
        let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(quote))) else {
            return;
        };

        for block in &mut self.blocks {
            if !block.spans.iter().any(|s| s.style != SpanStyle::Highlight && re.is_match(&s.text)) {
                continue;
            }
            let mut spans = Vec::with_capacity(block.spans.len() + 2);
            for span in block.spans.drain(..) {
                if span.style == SpanStyle::Highlight {
                    spans.push(span);
                    continue;
                }
                let mut last = 0;
                for m in re.find_iter(&span.text) {
                    if m.start() > last {
                        spans.push(Span::new(span.style, &span.text[last..m.start()]));
                    }
                    spans.push(Span::new(SpanStyle::Highlight, m.as_str()));
                    last = m.end();
                }
                if last < span.text.len() {
                    spans.push(Span::new(span.style, &span.text[last..]));
                }
            }
            block.spans = spans;
        }
    }
}

/// Classified script with every finding quote highlighted. Quotes that do not
/// occur verbatim are skipped.
pub fn render_script(text: &str, findings: &[Finding]) -> RenderedScript {
    let mut doc = render_lines(text);
    for quote in findings.iter().filter_map(Finding::quote) {
        doc.highlight(quote);
    }
    doc
}

fn render_lines(text: &str) -> RenderedScript {
    let blocks = text
        .lines()
        .map(|line| match classify_line(line) {
            LineKind::Speaker { speaker, rest } => Block {
                kind: BlockKind::Speaker,
                spans: vec![
                    Span::new(SpanStyle::Speaker, speaker),
                    Span::new(SpanStyle::Plain, rest),
                ],
            },
            LineKind::SceneHeader(l) => plain_block(BlockKind::SceneHeader, l),
            LineKind::Question(l) => plain_block(BlockKind::Question, l),
            LineKind::Body(l) => plain_block(BlockKind::Body, l),
            LineKind::Blank => Block {
                kind: BlockKind::Break,
                spans: Vec::new(),
            },
        })
        .collect();
    RenderedScript { blocks }
}

fn plain_block(kind: BlockKind, text: &str) -> Block {
    Block {
        kind,
        spans: vec![Span::new(SpanStyle::Plain, text)],
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BlockKind::Break => return Ok(()),
            BlockKind::Body => f.write_str("  ")?,
            BlockKind::Question => f.write_str("? ")?,
            BlockKind::SceneHeader => f.write_str("# ")?,
            BlockKind::Speaker => {}
        }
        for span in &self.spans {
            match span.style {
                SpanStyle::Plain => f.write_str(&span.text)?,
                SpanStyle::Speaker => write!(f, "**{}**", span.text)?,
                SpanStyle::Highlight => write!(f, "[[{}]]", span.text)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for RenderedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
