use std::time::Duration;

use url::Url;

use crate::controls::InitialIndexPolicy;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub device_origin: String,
    pub request_timeout: Duration,
    pub initial_index_policy: InitialIndexPolicy,
    /// Fetch per-kind markup from the device before building controls.
    pub load_templates: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            device_origin: "http://127.0.0.1:8080".into(),
            request_timeout: Duration::from_secs(5),
            initial_index_policy: InitialIndexPolicy::FirstStep,
            load_templates: false,
        }
    }
}

impl ClientSettings {
    pub fn origin(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.device_origin.trim())
    }
}
