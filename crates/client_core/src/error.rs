use shared::error::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("missing or invalid channel/cc (channel={channel:?}, cc={cc:?})")]
    InvalidIdentity {
        channel: Option<String>,
        cc: Option<String>,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("value must be integer, got {0}")]
    ValueType(f64),
    #[error("cannot set value: missing channel/cc")]
    MissingIdentity,
    #[error("device request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl ControlError {
    /// Identity problems are configuration mistakes rather than runtime faults.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ControlError::InvalidIdentity { .. } | ControlError::MissingIdentity
        )
    }
}
