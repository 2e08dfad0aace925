use super::{load_settings_with, Settings};

use std::{collections::HashMap, fs, path::PathBuf};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_with(&dir.path().join("missing.toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.bind_addr, "0.0.0.0:8080");
    assert_eq!(settings.init_file(), PathBuf::from("../device/example/init.json"));
    assert_eq!(settings.web_dir(), PathBuf::from("../device/example/web"));
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(
        &file,
        "bind_addr = \"127.0.0.1:9000\"\ndevice_dir = \"/srv/synth\"\nnode_name = \"synth-out\"\n",
    )
    .expect("write settings");

    let settings = load_settings_with(&file, env_from(&[]));
    assert_eq!(settings.bind_addr, "127.0.0.1:9000");
    assert_eq!(settings.device_dir, PathBuf::from("/srv/synth"));
    assert_eq!(settings.node_name, "synth-out");
}

#[test]
fn environment_overrides_file_and_app_prefix_wins() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(&file, "node_name = \"from-file\"\n").expect("write settings");

    let settings = load_settings_with(
        &file,
        env_from(&[
            ("NODE_NAME", "short"),
            ("APP__NODE_NAME", "prefixed"),
            ("SERVER_BIND", "127.0.0.1:7000"),
            ("DEVICE_DIR", "/tmp/device"),
        ]),
    );
    assert_eq!(settings.node_name, "prefixed");
    assert_eq!(settings.bind_addr, "127.0.0.1:7000");
    assert_eq!(settings.device_dir, PathBuf::from("/tmp/device"));
}

#[test]
fn malformed_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(&file, "bind_addr = [").expect("write settings");

    let settings = load_settings_with(&file, env_from(&[("APP__NODE_NAME", "out")]));
    assert_eq!(settings.bind_addr, "0.0.0.0:8080");
    assert_eq!(settings.node_name, "out");
}

#[test]
fn validation_requires_node_name_and_bind_address() {
    let mut settings = Settings::default();
    assert!(settings.validate().is_err());

    settings.node_name = "synth".into();
    assert!(settings.validate().is_ok());

    settings.bind_addr = "localhost".into();
    let error = settings.validate().expect_err("bad bind address");
    assert!(error.to_string().contains("localhost"));
}
