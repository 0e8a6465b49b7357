use vl_cli::cli::{ensure_valid, open_manager};
use vl_domain::config::Config;

#[test]
fn default_config_passes() {
    ensure_valid(&Config::default()).unwrap();
}

#[test]
fn warnings_alone_do_not_block() {
    let mut config = Config::default();
    config.executor.shutdown_drain_ms = 0;
    assert!(!config.validate().is_empty());
    ensure_valid(&config).unwrap();
}

#[tokio::test]
async fn invalid_config_is_refused_before_connecting() {
    let mut config = Config::default();
    config.lease.sweep_page_size = 0;
    // Nothing listens here; reaching the connect step would fail differently.
    config.store.port = 1;

    let err = open_manager(&config, false).await.err().unwrap();
    let message = format!("{err}");
    assert!(message.contains("invalid configuration"), "{message}");
    assert!(message.contains("lease.sweep_page_size"), "{message}");
}
