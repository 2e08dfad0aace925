use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid integer response: {text:?}")]
    InvalidInteger { text: String },
    #[error("invalid {field}")]
    InvalidField { field: &'static str },
}

impl ProtocolError {
    pub fn invalid_integer(text: impl Into<String>) -> Self {
        Self::InvalidInteger { text: text.into() }
    }
}
