use compliance_review::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../compliance-review.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.ai.max_poll_attempts >= 1);
    assert!(!cfg.paths.backup_dir.is_empty());
    assert_eq!(cfg.review.default_reviewer, "QA Team");
    assert_eq!(cfg.review.versions.len(), 4);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[ai]\nmodel = \"gemini-2.0-flash\"\napi_key_env = \"K\"\nbase_url = \"http://localhost\"\ntemperature = 0.2\nrequest_timeout_seconds = 10\npoll_interval_seconds = 1\nmax_poll_attempts = 3\npoll_timeout_seconds = 0\n")
        .expect("parse TOML");
    assert_eq!(cfg.ai.model, "gemini-2.0-flash");
    assert_eq!(cfg.paths.backup_dir, "archivos_guardados");
    assert_eq!(cfg.sheets.sheet_name, "Sheet1");
}

#[test]
fn missing_secret_is_a_configuration_error() {
    let err = compliance_review::config::require_secret("COMPLIANCE_REVIEW_UNSET_SECRET", "Gemini API key")
        .unwrap_err();
    assert!(matches!(
        err,
        compliance_review::error::ReviewError::Configuration { .. }
    ));
    assert!(err.to_string().contains("COMPLIANCE_REVIEW_UNSET_SECRET"));
}
