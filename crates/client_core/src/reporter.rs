//! Where control failures go. Failures never propagate out of a control; they are handed to a
//! [`FailureReporter`] so the host decides whether to log, count or surface them.

use shared::domain::{ControlKind, Identity};
use tracing::{error, warn};

use crate::error::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Attach,
    Fetch,
    Push,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Attach => "attach",
            Operation::Fetch => "fetch",
            Operation::Push => "push",
        }
    }
}

#[derive(Debug)]
pub struct ControlFailure<'a> {
    pub kind: ControlKind,
    pub operation: Operation,
    pub identity: Option<Identity>,
    pub error: &'a ControlError,
}

pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &ControlFailure<'_>);
}

/// Logs through `tracing`: configuration problems as warnings, everything else as errors.
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: &ControlFailure<'_>) {
        let identity = failure
            .identity
            .map(|identity| identity.to_string())
            .unwrap_or_default();
        if failure.error.is_configuration() {
            warn!(
                control = %failure.kind,
                operation = failure.operation.as_str(),
                %identity,
                error = %failure.error,
                "control misconfigured"
            );
        } else {
            error!(
                control = %failure.kind,
                operation = failure.operation.as_str(),
                %identity,
                error = %failure.error,
                "control operation failed"
            );
        }
    }
}
