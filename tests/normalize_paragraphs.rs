use compliance_review::normalize::{normalize_text, reconstruct_paragraphs};

#[test]
fn sentence_breaks_survive_blank_lines() {
    let out = reconstruct_paragraphs("Hi there.\n\nSecond.\n\nThird");
    assert_eq!(out, vec!["Hi there.", "Second.", "Third"]);
}

#[test]
fn wrapped_lines_are_joined() {
    let out = reconstruct_paragraphs("NARRADOR: Esta noche\nla fiesta es\n\nen la playa.\n");
    assert_eq!(out, vec!["NARRADOR: Esta noche la fiesta es en la playa."]);
}

#[test]
fn non_blank_content_is_never_dropped() {
    let raw = "  uno  \r\n\r\ndos\n\n\n tres!\n\ncuatro?\n";
    let out = normalize_text(raw);
    for word in ["uno", "dos", "tres!", "cuatro?"] {
        assert!(out.contains(word), "{word} missing from {out:?}");
    }
}

#[test]
fn normalizing_is_idempotent() {
    let raw = "ESCENA 1:\n\nINT. BAR\nLUIS: Hola.\n\n\nMARIA: ¿Una cerveza?\n\nfin";
    let once = normalize_text(raw);
    assert_eq!(normalize_text(&once), once);
}

#[test]
fn empty_input_has_no_paragraphs() {
    assert!(reconstruct_paragraphs("\n\n  \n").is_empty());
    assert_eq!(normalize_text(""), "");
}
