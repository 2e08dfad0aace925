//! The lifecycle every control goes through:
//! `Unattached -> IdentityResolved -> AwaitingInitialValue -> Ready`, or `Failed`.
//!
//! Initialization runs once per instance. Re-attaching only re-enables interaction.

use std::sync::Arc;

use serde::Serialize;
use shared::domain::{ControlKind, Identity};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info};

use crate::{
    error::ControlError,
    reporter::{ControlFailure, FailureReporter, Operation, TracingReporter},
    transport::{resolve_identity, ValueChannel},
};

const EVENT_CAPACITY: usize = 64;

/// Raw configuration of a control as the host hands it over, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlAttributes {
    pub channel: Option<String>,
    pub cc: Option<String>,
    pub step: Option<String>,
}

impl ControlAttributes {
    pub fn new(channel: impl Into<String>, cc: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            cc: Some(cc.into()),
            step: None,
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unattached,
    IdentityResolved,
    AwaitingInitialValue,
    Ready,
    Failed,
}

/// What a host has to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlView {
    Level { value: u8 },
    Step { index: usize, label: String, value: u8 },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    /// Sent at most once: when the initial fetch succeeded before any local update.
    InitialValue { fetched: i64, view: ControlView },
    Render { view: ControlView },
}

pub struct InitialState {
    pub cached: u8,
    pub view: ControlView,
}

/// Variant specific behaviour plugged into [`ValueElement`].
pub trait ControlVariant: Send + 'static {
    fn kind(&self) -> ControlKind;

    /// Derives variant state from the attributes. Called on first attach.
    fn configure(&mut self, attributes: &ControlAttributes);

    /// Maps the fetched device value onto the variant and returns what to cache and draw.
    fn initial_value(&mut self, fetched: i64) -> InitialState;

    /// Something to draw once the identity resolved, before any value is known.
    fn attached_view(&self) -> Option<ControlView> {
        None
    }

    /// Drops transient input state such as pointer capture.
    fn release(&mut self) {}
}

pub(crate) struct ElementState<V> {
    pub(crate) lifecycle: LifecycleState,
    pub(crate) attributes: ControlAttributes,
    pub(crate) identity: Option<Identity>,
    pub(crate) value: Option<u8>,
    pub(crate) connected: bool,
    pub(crate) variant: V,
}

pub struct ValueElement<V: ControlVariant> {
    kind: ControlKind,
    channel: Arc<dyn ValueChannel>,
    reporter: Arc<dyn FailureReporter>,
    template: Option<Arc<str>>,
    pub(crate) inner: Mutex<ElementState<V>>,
    events: broadcast::Sender<ControlEvent>,
}

impl<V: ControlVariant> ValueElement<V> {
    pub fn new(
        variant: V,
        attributes: ControlAttributes,
        channel: Arc<dyn ValueChannel>,
    ) -> Arc<Self> {
        Self::new_with_dependencies(variant, attributes, channel, Arc::new(TracingReporter), None)
    }

    pub fn new_with_dependencies(
        variant: V,
        attributes: ControlAttributes,
        channel: Arc<dyn ValueChannel>,
        reporter: Arc<dyn FailureReporter>,
        template: Option<Arc<str>>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            kind: variant.kind(),
            channel,
            reporter,
            template,
            inner: Mutex::new(ElementState {
                lifecycle: LifecycleState::Unattached,
                attributes,
                identity: None,
                value: None,
                connected: false,
                variant,
            }),
            events,
        })
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.lifecycle
    }

    /// The locally cached value; `None` until the initial fetch succeeded.
    pub async fn value(&self) -> Option<u8> {
        self.inner.lock().await.value
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.inner.lock().await.identity
    }

    /// Connects the control to its host. The first call resolves the identity and starts the
    /// initial fetch in the background; the returned handle completes once the fetch settled.
    /// Later calls only re-enable interaction and return `None`.
    pub async fn attach(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let identity = {
            let mut inner = self.inner.lock().await;
            inner.connected = true;
            if inner.lifecycle != LifecycleState::Unattached {
                debug!(control = %self.kind, "already initialized, attach ignored");
                return None;
            }

            let attributes = inner.attributes.clone();
            inner.variant.configure(&attributes);

            match resolve_identity(attributes.channel.as_deref(), attributes.cc.as_deref()) {
                Ok(identity) => {
                    inner.identity = Some(identity);
                    inner.lifecycle = LifecycleState::IdentityResolved;
                    if let Some(view) = inner.variant.attached_view() {
                        self.emit(ControlEvent::Render { view });
                    }
                    identity
                }
                Err(error) => {
                    inner.lifecycle = LifecycleState::Failed;
                    drop(inner);
                    self.report(Operation::Attach, None, &error);
                    return None;
                }
            }
        };

        let element = Arc::clone(self);
        Some(tokio::spawn(element.load_initial_value(identity)))
    }

    /// Disconnects the control from its host. Cached state is kept.
    pub async fn detach(&self) {
        let mut inner = self.inner.lock().await;
        inner.connected = false;
        inner.variant.release();
    }

    async fn load_initial_value(self: Arc<Self>, identity: Identity) {
        self.inner.lock().await.lifecycle = LifecycleState::AwaitingInitialValue;

        match self.channel.fetch_value(identity).await {
            Ok(fetched) => {
                let mut inner = self.inner.lock().await;
                if let Some(local) = inner.value {
                    // A local update happened while fetching and is newer than `fetched`.
                    inner.lifecycle = LifecycleState::Ready;
                    debug!(
                        control = %self.kind,
                        %identity,
                        fetched,
                        local,
                        "initial value superseded by local update"
                    );
                    return;
                }
                let initial = inner.variant.initial_value(fetched);
                inner.value = Some(initial.cached);
                inner.lifecycle = LifecycleState::Ready;
                info!(
                    control = %self.kind,
                    %identity,
                    fetched,
                    cached = initial.cached,
                    "initial value loaded"
                );
                // Sent under the lock so no interaction can render before the initial value.
                self.emit(ControlEvent::InitialValue {
                    fetched,
                    view: initial.view,
                });
            }
            Err(error) => {
                self.inner.lock().await.lifecycle = LifecycleState::Failed;
                self.report(Operation::Fetch, Some(identity), &error);
            }
        }
    }

    pub(crate) fn emit(&self, event: ControlEvent) {
        let _ = self.events.send(event);
    }

    /// Sends `value` in its own task. Nothing waits for it and failures are only reported.
    pub(crate) fn dispatch_push(&self, identity: Option<Identity>, value: u8) -> JoinHandle<()> {
        let channel = Arc::clone(&self.channel);
        let reporter = Arc::clone(&self.reporter);
        let kind = self.kind;
        tokio::spawn(async move {
            match channel.push_value(identity, f64::from(value)).await {
                Ok(()) => debug!(control = %kind, value, "value pushed"),
                Err(error) => reporter.report(&ControlFailure {
                    kind,
                    operation: Operation::Push,
                    identity,
                    error: &error,
                }),
            }
        })
    }

    fn report(&self, operation: Operation, identity: Option<Identity>, error: &ControlError) {
        self.reporter.report(&ControlFailure {
            kind: self.kind,
            operation,
            identity,
            error,
        });
    }
}
