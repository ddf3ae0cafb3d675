use std::fs;

use kogura::config::{resolve_data_dir, Config, CONFIG_FILE};

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_or_default(dir.path()).expect("defaults");

    assert_eq!(config, Config::default());
    assert_eq!(config.schedule.utc_offset, "+09:00");
    assert_eq!(config.interpreter.model, "deepseek-chat");
    assert_eq!(config.interpreter.timeout_secs, 30);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[schedule]
utc_offset = "-05:00"

[interpreter]
endpoint = "http://localhost:8080/v1/chat/completions"
model = "local-model"
timeout_secs = 10
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_or_default(dir.path())?;

    assert_eq!(config.zone()?.local_minus_utc(), -5 * 3600);
    assert_eq!(
        config.interpreter.endpoint,
        "http://localhost:8080/v1/chat/completions"
    );
    assert_eq!(config.interpreter.model, "local-model");
    assert_eq!(config.interpreter.api_key_env, "DEEPSEEK_API_KEY");
    assert_eq!(config.interpreter.timeout_secs, 10);

    Ok(())
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);

    fs::write(&path, "[interpreter]\nendpoint = \"ftp://example.com\"\n").expect("write");
    assert!(Config::load_or_default(dir.path()).is_err());

    fs::write(&path, "[interpreter]\ntimeout_secs = 0\n").expect("write");
    assert!(Config::load_or_default(dir.path()).is_err());

    fs::write(&path, "[schedule]\nutc_offset = \"+25:00\"\n").expect("write");
    assert!(Config::load_or_default(dir.path()).is_err());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    let mut config = Config::default();
    config.schedule.utc_offset = "+01:00".to_string();
    config.save(&path).expect("save");

    assert_eq!(Config::load(&path).expect("load"), config);
}

#[test]
fn explicit_data_dir_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolved = resolve_data_dir(Some(dir.path())).expect("resolve");
    assert_eq!(resolved, dir.path());
}
