use std::{fs, path::Path, time::Duration};

use client_core::{ClientSettings, InitialIndexPolicy};
use tracing::warn;

pub fn load_settings() -> ClientSettings {
    load_settings_with(Path::new("ccctl.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the optional toml file, then the environment. Unparsable values are
/// skipped with a warning.
pub fn load_settings_with(file: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match raw.parse::<toml::Table>() {
            Ok(table) => apply_table(&mut settings, &table),
            Err(error) => warn!(file = %file.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("CC_DEVICE_ORIGIN") {
        settings.device_origin = v;
    }
    if let Some(v) = env("APP__DEVICE_ORIGIN") {
        settings.device_origin = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(ms) => settings.request_timeout = Duration::from_millis(ms),
            Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_MS"),
        }
    }
    if let Some(v) = env("APP__INITIAL_INDEX_POLICY") {
        match v.parse::<InitialIndexPolicy>() {
            Ok(policy) => settings.initial_index_policy = policy,
            Err(error) => warn!(%error, "ignoring APP__INITIAL_INDEX_POLICY"),
        }
    }

    settings
}

fn apply_table(settings: &mut ClientSettings, table: &toml::Table) {
    if let Some(v) = table.get("device_origin").and_then(toml::Value::as_str) {
        settings.device_origin = v.to_string();
    }
    if let Some(ms) = table
        .get("request_timeout_ms")
        .and_then(toml::Value::as_integer)
        .and_then(|ms| u64::try_from(ms).ok())
    {
        settings.request_timeout = Duration::from_millis(ms);
    }
    if let Some(v) = table.get("initial_index_policy").and_then(toml::Value::as_str) {
        match v.parse::<InitialIndexPolicy>() {
            Ok(policy) => settings.initial_index_policy = policy,
            Err(error) => warn!(%error, "ignoring initial_index_policy"),
        }
    }
    if let Some(v) = table.get("load_templates").and_then(toml::Value::as_bool) {
        settings.load_templates = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
