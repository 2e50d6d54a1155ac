//! Configuration loading through the real file + environment pipeline.

use trailforge::AppConfig;

#[test]
fn config_file_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trailforge.toml");
    std::fs::write(
        &path,
        r#"
results_dir = "out/results"
sessions_dir = "out/sessions"
auto_index = true

[oracle]
endpoint = "https://oracle.example/v1/decide"
timeout_ms = 30000

[runner]
max_steps = 12
max_retries = 2
action_timeout_ms = 8000
settle_delay_ms = 1000
tab_policy = "terminate"
max_elements = 300

[browser]
headless = true

[[accounts]]
label = "alpha"
profile_dir = "alpha"

[[accounts]]
label = "beta"
profile_dir = "beta"
"#,
    )
    .unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.results_dir.to_str(), Some("out/results"));
    assert_eq!(config.runner.max_steps, 12);
    assert!(config.browser.headless);
    assert_eq!(config.accounts.len(), 2);
    assert_eq!(config.oracle.api_key_env, "ORACLE_API_KEY");

    let specs = config.worker_specs(10).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].range.len() + specs[1].range.len(), 10);
}

#[test]
fn empty_accounts_fail_at_spec_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trailforge.toml");
    std::fs::write(
        &path,
        r#"
accounts = []

[oracle]
endpoint = "https://oracle.example/v1/decide"
"#,
    )
    .unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    assert!(config.worker_specs(5).is_err());
}
