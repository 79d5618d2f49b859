use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_invalid_cdp_url() {
    let mut config = Config::default();
    config.browser.cdp_url = Some("localhost:9222".to_string());

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "browser.cdp_url"));
}

#[test]
fn test_validate_zero_port() {
    let mut config = Config::default();
    config.browser.debug_port = 0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "browser.debug_port"));
}

#[test]
fn test_validate_viewport_expansion_disabled_is_valid() {
    let mut config = Config::default();
    config.context.viewport_expansion = -1;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_validate_viewport_expansion_too_small() {
    let mut config = Config::default();
    config.context.viewport_expansion = -2;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "context.viewport_expansion"));
}

#[test]
fn test_validate_wait_ordering() {
    let mut config = Config::default();
    config.context.minimum_wait_page_load_time = 3.0;
    config.context.maximum_wait_page_load_time = 1.0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result
        .errors
        .iter()
        .any(|e| e.path == "context.maximum_wait_page_load_time"));
}

#[test]
fn test_validate_long_wait_warning() {
    let mut config = Config::default();
    config.context.maximum_wait_page_load_time = 120.0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_validate_unbounded_waits_rejected() {
    for content in [
        "[context]\nmaximum_wait_page_load_time = 1e20",
        "[context]\nmaximum_wait_page_load_time = inf",
        "[context]\nminimum_wait_page_load_time = nan",
    ] {
        let config = crate::ConfigLoader::load_str(content).unwrap();
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid(), "{}", content);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.path.starts_with("context.") && e.path.ends_with("_wait_page_load_time")),
            "{}",
            content
        );
    }
}

#[test]
fn test_validate_hour_long_wait_is_allowed() {
    let mut config = Config::default();
    config.context.maximum_wait_page_load_time = 3600.0;

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_validate_allowed_domains_must_be_hosts() {
    let mut config = Config::default();
    config.context.allowed_domains = Some(vec!["https://example.com".to_string()]);

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
}

#[test]
fn test_validate_empty_allowed_domains_warning() {
    let mut config = Config::default();
    config.context.allowed_domains = Some(vec![]);

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result
        .warnings
        .iter()
        .any(|w| w.path == "context.allowed_domains"));
}

#[test]
fn test_validate_hash_attribute_conflict() {
    let mut config = Config::default();
    config.hashing.included_attributes = Some(vec!["style".to_string(), "value".to_string()]);

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "hashing"));
}

#[test]
fn test_validation_error_new() {
    let err = ValidationError::new("browser.cdp_url", "bad");
    assert_eq!(err.path, "browser.cdp_url");
    assert_eq!(err.message, "bad");
}
