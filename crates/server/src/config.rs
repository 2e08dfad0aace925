use std::{collections::HashMap, fs, net::SocketAddr, path::Path, path::PathBuf};

use anyhow::{bail, Context};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub device_dir: PathBuf,
    pub node_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            device_dir: PathBuf::from("../device/example"),
            node_name: String::new(),
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.bind_addr))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.node_name.trim().is_empty() {
            bail!("a MIDI node name is required (--node, NODE_NAME or APP__NODE_NAME)");
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn init_file(&self) -> PathBuf {
        self.device_dir.join("init.json")
    }

    pub fn web_dir(&self) -> PathBuf {
        self.device_dir.join("web")
    }
}

pub fn load_settings() -> Settings {
    load_settings_with(Path::new("server.toml"), |key| std::env::var(key).ok())
}

pub fn load_settings_with(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr") {
                    settings.bind_addr = v.clone();
                }
                if let Some(v) = file_cfg.get("device_dir") {
                    settings.device_dir = PathBuf::from(v);
                }
                if let Some(v) = file_cfg.get("node_name") {
                    settings.node_name = v.clone();
                }
            }
            Err(error) => warn!(file = %file.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("DEVICE_DIR") {
        settings.device_dir = PathBuf::from(v);
    }
    if let Some(v) = env("APP__DEVICE_DIR") {
        settings.device_dir = PathBuf::from(v);
    }

    if let Some(v) = env("NODE_NAME") {
        settings.node_name = v;
    }
    if let Some(v) = env("APP__NODE_NAME") {
        settings.node_name = v;
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
