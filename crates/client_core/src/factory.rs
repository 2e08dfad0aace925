use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::warn;

use crate::{
    controls::{
        Axis, CcDisplay, CcSlider, CcStepButton, InitialIndexPolicy, Slider, StepButton,
        ValueDisplay,
    },
    element::{ControlAttributes, ControlVariant, ValueElement},
    reporter::{FailureReporter, TracingReporter},
    settings::ClientSettings,
    templates::{HttpTemplateLoader, TemplateCache},
    transport::{HttpValueChannel, ValueChannel},
};

/// Builds controls that share one device channel, one failure reporter and one template
/// cache.
pub struct ControlFactory {
    channel: Arc<dyn ValueChannel>,
    reporter: Arc<dyn FailureReporter>,
    templates: Option<Arc<TemplateCache>>,
    initial_index_policy: InitialIndexPolicy,
}

impl ControlFactory {
    pub fn new(channel: Arc<dyn ValueChannel>) -> Self {
        Self {
            channel,
            reporter: Arc::new(TracingReporter),
            templates: None,
            initial_index_policy: InitialIndexPolicy::default(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let origin = settings
            .origin()
            .with_context(|| format!("invalid device origin '{}'", settings.device_origin))?;
        let http = Client::builder().timeout(settings.request_timeout).build()?;
        let channel = HttpValueChannel::with_client(http.clone(), &origin)?;

        let mut factory = Self::new(Arc::new(channel))
            .with_initial_index_policy(settings.initial_index_policy);
        if settings.load_templates {
            let loader = HttpTemplateLoader::new(http, origin);
            factory = factory.with_templates(Arc::new(TemplateCache::new(Arc::new(loader))));
        }
        Ok(factory)
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_templates(mut self, templates: Arc<TemplateCache>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_initial_index_policy(mut self, policy: InitialIndexPolicy) -> Self {
        self.initial_index_policy = policy;
        self
    }

    pub fn channel(&self) -> Arc<dyn ValueChannel> {
        Arc::clone(&self.channel)
    }

    pub async fn hslider(&self, attributes: ControlAttributes) -> Arc<CcSlider> {
        self.build(Slider::new(Axis::Horizontal), attributes).await
    }

    pub async fn vslider(&self, attributes: ControlAttributes) -> Arc<CcSlider> {
        self.build(Slider::new(Axis::Vertical), attributes).await
    }

    pub async fn step_button(&self, attributes: ControlAttributes) -> Arc<CcStepButton> {
        self.build(StepButton::new(self.initial_index_policy), attributes).await
    }

    pub async fn display(&self, attributes: ControlAttributes) -> Arc<CcDisplay> {
        self.build(ValueDisplay, attributes).await
    }

    async fn build<V: ControlVariant>(
        &self,
        variant: V,
        attributes: ControlAttributes,
    ) -> Arc<ValueElement<V>> {
        let kind = variant.kind();
        let template = match &self.templates {
            Some(cache) => match cache.get(kind).await {
                Ok(template) => Some(template),
                Err(error) => {
                    warn!(control = %kind, error = %format!("{error:#}"), "template unavailable");
                    None
                }
            },
            None => None,
        };
        ValueElement::new_with_dependencies(
            variant,
            attributes,
            Arc::clone(&self.channel),
            Arc::clone(&self.reporter),
            template,
        )
    }
}
