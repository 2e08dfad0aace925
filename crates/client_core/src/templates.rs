//! Shared markup for each control kind, loaded once and handed to every instance.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::domain::ControlKind;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;
use url::Url;

#[async_trait]
pub trait TemplateLoader: Send + Sync {
    async fn load(&self, kind: ControlKind) -> Result<String>;
}

/// Fetches `<base>/<tag-name>.html`.
pub struct HttpTemplateLoader {
    http: Client,
    base: Url,
}

impl HttpTemplateLoader {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl TemplateLoader for HttpTemplateLoader {
    async fn load(&self, kind: ControlKind) -> Result<String> {
        let url = self
            .base
            .join(&format!("{}.html", kind.tag_name()))
            .with_context(|| format!("invalid template url for {kind}"))?;
        let body = self
            .http
            .get(url.clone())
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("failed to fetch template {url}"))?
            .text()
            .await?;
        Ok(body)
    }
}

/// Read-only cache keyed by control kind. Concurrent requests for the same kind share one
/// load; a failed load is retried by the next request.
pub struct TemplateCache {
    loader: Arc<dyn TemplateLoader>,
    slots: Mutex<HashMap<ControlKind, Arc<OnceCell<Arc<str>>>>>,
}

impl TemplateCache {
    pub fn new(loader: Arc<dyn TemplateLoader>) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, kind: ControlKind) -> Result<Arc<str>> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(kind).or_default())
        };
        let template = slot
            .get_or_try_init(|| async {
                debug!(control = %kind, "loading template");
                self.loader.load(kind).await.map(Arc::from)
            })
            .await?;
        Ok(Arc::clone(template))
    }
}
