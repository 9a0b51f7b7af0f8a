use app_config::AppConfig;
use std::time::Duration;

#[test]
fn test_load_default_config() {
    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.db_port, 5432);
    assert_eq!(cfg.shutdown_timeout, Duration::from_secs(5));
    assert_eq!(cfg.access_token_ttl, Duration::from_secs(24 * 60 * 60));
    assert!(cfg.api_base_url.starts_with("http"));
}
