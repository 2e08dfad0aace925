//! Controls that mirror one CC value on a remote device.
//!
//! A control resolves its `(channel, cc)` identity when it is attached, fetches the device
//! value once, and from then on pushes every locally changed value back without waiting for
//! the device. Failures are handed to a [`FailureReporter`] and never escape a control.

pub mod controls;
pub mod element;
pub mod error;
pub mod factory;
pub mod mapper;
pub mod reporter;
pub mod settings;
pub mod templates;
pub mod transport;

pub use controls::{
    Axis, CcDisplay, CcSlider, CcStepButton, InitialIndexPolicy, Slider, StepButton, ValueDisplay,
};
pub use element::{
    ControlAttributes, ControlEvent, ControlVariant, ControlView, LifecycleState, ValueElement,
};
pub use error::ControlError;
pub use factory::ControlFactory;
pub use reporter::{ControlFailure, FailureReporter, Operation, TracingReporter};
pub use settings::ClientSettings;
pub use templates::{HttpTemplateLoader, TemplateCache, TemplateLoader};
pub use transport::{resolve_identity, HttpValueChannel, ValueChannel};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
