use serde::{Deserialize, Serialize};

use crate::{domain::Identity, error::ProtocolError};

pub const GET_PATH: &str = "/get";
pub const SET_PATH: &str = "/set";
pub const SET_ACK_BODY: &str = "CC value updated\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetQuery {
    pub channel: i64,
    pub cc: i64,
}

impl From<Identity> for GetQuery {
    fn from(identity: Identity) -> Self {
        Self {
            channel: identity.channel.0,
            cc: identity.controller.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetQuery {
    pub channel: i64,
    pub cc: i64,
    pub value: i64,
}

impl SetQuery {
    pub fn new(identity: Identity, value: i64) -> Self {
        Self {
            channel: identity.channel.0,
            cc: identity.controller.0,
            value,
        }
    }
}

// ^-?\d+$
pub fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_integer(text: &str) -> Option<i64> {
    if !is_integer_literal(text) {
        return None;
    }
    text.parse().ok()
}

pub fn parse_value_response(body: &str) -> Result<i64, ProtocolError> {
    parse_integer(body.trim()).ok_or_else(|| ProtocolError::invalid_integer(body))
}

pub fn parse_byte_field(raw: Option<&str>, field: &'static str) -> Result<u8, ProtocolError> {
    let raw = raw.unwrap_or_default();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::InvalidField { field });
    }
    raw.parse().map_err(|_| ProtocolError::InvalidField { field })
}
