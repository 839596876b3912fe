use compliance_review::{
    analysis::{AnalysisResult, Evidence, Finding},
    config::Review,
    error::ReviewError,
    workflow::{Carousel, ContentType, ReviewSession, SourceFile, Step},
};

fn analysis(findings: usize, recommendations: usize) -> AnalysisResult {
    let recommendations: Vec<String> = (1..=recommendations).map(|i| format!("Rec {i}")).collect();
    AnalysisResult {
        score: 72,
        findings: (1..=findings)
            .map(|i| Finding {
                risk_label: format!("Risk {i}"),
                evidence: Evidence::None,
                explanation: String::new(),
            })
            .collect(),
        final_recommendations: compliance_review::analysis::bullet_list(&recommendations),
        recommendations,
        email_draft: "Dear team,\n\nPlease see the notes.".into(),
    }
}

fn ready_session() -> ReviewSession {
    let mut s = ReviewSession::new();
    let d = s.draft_mut().unwrap();
    d.brand = "Tecate".into();
    d.campaign = "Verano".into();
    d.influencer = "@luisito".into();
    d.version = "V1 - First Draft".into();
    d.source_file = Some(SourceFile::new("guion.txt", b"LUIS: Hola.".to_vec()));
    s
}

#[test]
fn carousel_wraps_and_stays_in_range() {
    let mut c = Carousel::default();
    for _ in 0..7 {
        c.next(3);
        assert!(c.cursor() < 3);
    }
    assert_eq!(c.cursor(), 1);
    c.prev(3);
    c.prev(3);
    assert_eq!(c.cursor(), 2);
    c.next(0);
    assert_eq!(c.cursor(), 0);
    c.prev(0);
    assert_eq!(c.cursor(), 0);
    assert_eq!(c.position("Risk", 0), None);
}

#[test]
fn missing_fields_keep_configure() {
    let mut s = ReviewSession::new();
    let err = s
        .begin_review(&Review::default(), |_| Ok(analysis(1, 1)))
        .unwrap_err();
    match err {
        ReviewError::MissingFields(fields) => {
            assert_eq!(fields, vec!["campaign", "influencer", "file"])
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.step(), Step::Configure);
}

#[test]
fn blank_brand_and_version_use_configured_defaults() {
    let mut s = ReviewSession::new();
    let d = s.draft_mut().unwrap();
    d.campaign = "Verano".into();
    d.influencer = "@luis".into();
    d.source_file = Some(SourceFile::new("g.txt", b"LUIS: Hola.".to_vec()));

    let review = Review {
        brands: vec!["Tecate".into(), "Sol".into()],
        versions: vec!["V2 - Revisions".into()],
        default_reviewer: "QA Team".into(),
    };
    s.begin_review(&review, |_| Ok(analysis(0, 0))).unwrap();
    let project = s.project().unwrap();
    assert_eq!(project.brand, "Tecate");
    assert_eq!(project.version, "V2 - Revisions");
    assert!(s.draft().version.is_empty());
}

#[test]
fn parse_failure_keeps_configure_and_form() {
    let mut s = ready_session();
    let err = s
        .begin_review(&Review::default(), |_| {
            Err(ReviewError::AiResponseParse {
                reason: "expected value".into(),
                raw: "not json".into(),
            })
        })
        .unwrap_err();
    assert_eq!(err.raw_response(), Some("not json"));
    assert_eq!(s.step(), Step::Configure);
    assert_eq!(s.draft().campaign, "Verano");
    assert!(s.analysis().is_none());
}

#[test]
fn full_walk_through_steps() {
    let mut s = ready_session();
    s.begin_review(&Review::default(), |p| {
        assert_eq!(p.reviewer_name, "QA Team");
        assert_eq!(p.content_type, ContentType::Script);
        Ok(analysis(5, 2))
    })
    .unwrap();
    assert_eq!(s.step(), Step::Review);
    assert_eq!(s.risk_position().as_deref(), Some("Risk 1 of 5"));

    s.next_risk();
    assert_eq!(s.risk_position().as_deref(), Some("Risk 2 of 5"));
    assert_eq!(s.current_risk().map(|f| f.risk_label.as_str()), Some("Risk 2"));
    s.prev_recommendation();
    assert_eq!(s.current_recommendation(), Some("Rec 2"));

    assert!(s.draft_mut().is_err());
    s.approve(Some(String::new())).unwrap();
    assert_eq!(s.step(), Step::Finalize);
    assert_eq!(s.analysis().unwrap().final_recommendations, "");
    assert!(s.final_email().ends_with("Best regards,"));

    assert!(matches!(
        s.back(),
        Err(ReviewError::InvalidTransition { step: 3, .. })
    ));
    s.set_final_email("Hola equipo.").unwrap();
    assert_eq!(s.final_email(), "Hola equipo.");

    s.reset();
    assert_eq!(s.step(), Step::Configure);
    assert!(s.project().is_none());
    assert_eq!(s.risk_cursor(), 0);
    assert!(s.draft().campaign.is_empty());
}

#[test]
fn back_keeps_the_form() {
    let mut s = ready_session();
    s.begin_review(&Review::default(), |_| Ok(analysis(2, 0))).unwrap();
    s.next_risk();
    s.back().unwrap();
    assert_eq!(s.step(), Step::Configure);
    assert_eq!(s.draft().influencer, "@luisito");
    assert!(s.current_risk().is_none());
    assert_eq!(s.risk_cursor(), 0);
}

#[test]
fn empty_findings_have_no_position() {
    let mut s = ready_session();
    s.begin_review(&Review::default(), |_| Ok(analysis(0, 0))).unwrap();
    s.next_risk();
    s.prev_recommendation();
    assert_eq!(s.risk_cursor(), 0);
    assert_eq!(s.recommendation_cursor(), 0);
    assert!(s.risk_position().is_none());
    assert!(s.current_recommendation().is_none());
}
