//! Paragraph reconstruction for text coming out of PDF/DOCX extraction.
//!
//! Column-based extractors break lines mid-sentence and sprinkle blank lines
//! inside paragraphs. A blank line only ends a paragraph when the text so far
//! ends like a sentence or a header (`. ! ? :`). This is a heuristic: two
//! sentence-ending lines with no blank line between them are still merged.

const PARAGRAPH_END: [char; 4] = ['.', '!', '?', ':'];

pub fn reconstruct_paragraphs(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buffer = String::new();

    for line in raw.lines() {
        let line = line.trim();

        if line.is_empty() {
            if buffer.ends_with(PARAGRAPH_END) {
                out.push(std::mem::take(&mut buffer));
            }
            continue;
        }

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(line);
    }

    if !buffer.is_empty() {
        out.push(buffer);
    }
    out
}

/// Paragraphs separated by a blank line. Every paragraph but the last ends in
/// `. ! ? :`, so feeding this back through [`reconstruct_paragraphs`] returns
/// the same paragraphs.
pub fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs.join("\n\n")
}

pub fn normalize_text(raw: &str) -> String {
    let raw = raw.replace('\r', "");
    join_paragraphs(&reconstruct_paragraphs(&raw))
}
