//! Identity resolution and the two device operations every control relies on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::Identity,
    protocol::{parse_integer, parse_value_response, GetQuery, SetQuery, GET_PATH, SET_PATH},
};
use url::Url;

use crate::error::ControlError;

/// Resolves the `channel` and `cc` attributes of a control. Both must be present and match
/// `^-?\d+$`; anything else leaves the control without an identity.
pub fn resolve_identity(
    raw_channel: Option<&str>,
    raw_controller: Option<&str>,
) -> Result<Identity, ControlError> {
    match (
        raw_channel.and_then(parse_integer),
        raw_controller.and_then(parse_integer),
    ) {
        (Some(channel), Some(controller)) => Ok(Identity::new(channel, controller)),
        _ => Err(ControlError::InvalidIdentity {
            channel: raw_channel.map(str::to_owned),
            cc: raw_controller.map(str::to_owned),
        }),
    }
}

/// Rejects values that are not whole numbers, mirroring the device's integer-only contract.
pub fn checked_integer(value: f64) -> Result<i64, ControlError> {
    // i64::MAX is not representable as f64, so compare against 2^63 exclusively.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if !value.is_finite() || value.fract() != 0.0 || value >= LIMIT || value < -LIMIT {
        return Err(ControlError::ValueType(value));
    }
    Ok(value as i64)
}

#[async_trait]
pub trait ValueChannel: Send + Sync {
    /// Reads the current value of `identity` from the device. The result is not clamped.
    async fn fetch_value(&self, identity: Identity) -> Result<i64, ControlError>;

    /// Writes `value` without looking at the response.
    async fn send_value(&self, identity: Identity, value: i64) -> Result<(), ControlError>;

    /// Guarded write used by controls. The value is checked before the identity.
    async fn push_value(&self, identity: Option<Identity>, value: f64) -> Result<(), ControlError> {
        let value = checked_integer(value)?;
        let identity = identity.ok_or(ControlError::MissingIdentity)?;
        self.send_value(identity, value).await
    }
}

pub struct HttpValueChannel {
    http: Client,
    get_url: Url,
    set_url: Url,
}

impl HttpValueChannel {
    pub fn new(origin: &Url) -> Result<Self, url::ParseError> {
        Self::with_client(Client::new(), origin)
    }

    pub fn with_timeout(origin: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, origin)?)
    }

    pub fn with_client(http: Client, origin: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            get_url: origin.join(GET_PATH)?,
            set_url: origin.join(SET_PATH)?,
        })
    }
}

#[async_trait]
impl ValueChannel for HttpValueChannel {
    async fn fetch_value(&self, identity: Identity) -> Result<i64, ControlError> {
        let body = self
            .http
            .get(self.get_url.clone())
            .query(&GetQuery::from(identity))
            .send()
            .await?
            .text()
            .await?;
        Ok(parse_value_response(&body)?)
    }

    async fn send_value(&self, identity: Identity, value: i64) -> Result<(), ControlError> {
        self.http
            .get(self.set_url.clone())
            .query(&SetQuery::new(identity, value))
            .send()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
