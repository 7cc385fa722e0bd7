//! Platform read and write APIs.
//!
//! The core only talks to platforms through [`SourceApi`] and
//! [`DestinationApi`]; the concrete clients here speak each platform's
//! private HTTP endpoints with `reqwest`.

mod fxreplay;
mod tradingview;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::discovery::Credential;
use crate::models::{Payload, Scope};

pub use fxreplay::{
    FxReplayClient, CHART_PROPERTIES_KEY, DEFAULT_FXREPLAY_URL, MAIN_SERIES_PROPERTIES_KEY,
    USER_ID_KEY,
};
pub use tradingview::{TradingViewClient, DEFAULT_TRADINGVIEW_URL};

/// A single listing, read or write against a platform failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned status {status}")]
    Status { status: u16 },

    #[error("Invalid content: {0}")]
    Parse(String),

    #[error("Not supported by {platform}: {what}")]
    Unsupported {
        platform: &'static str,
        what: String,
    },

    #[error("Request needs a credential but none was supplied")]
    MissingCredential,

    #[error("{0}")]
    Storage(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ApiError::Status {
                status: status.as_u16(),
            },
            None if e.is_decode() => ApiError::Parse(e.to_string()),
            None => ApiError::Transport(e.to_string()),
        }
    }
}

/// The modeled platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Tradingview,
    Fxreplay,
}

impl Platform {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Platform::Tradingview => DEFAULT_TRADINGVIEW_URL,
            Platform::Fxreplay => DEFAULT_FXREPLAY_URL,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Tradingview => write!(f, "tradingview"),
            Platform::Fxreplay => write!(f, "fxreplay"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tradingview" => Ok(Platform::Tradingview),
            "fxreplay" => Ok(Platform::Fxreplay),
            _ => Err(format!(
                "Invalid platform '{}'. Valid options: tradingview, fxreplay",
                s
            )),
        }
    }
}

/// Read side of a platform.
#[async_trait]
pub trait SourceApi: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether reads need a bearer credential from discovery.
    fn requires_credential(&self) -> bool;

    /// The platform user the data belongs to, when known up front.
    fn user_id(&self) -> Option<String> {
        None
    }

    /// Whether entities in `scope` can be listed and read at all.
    fn lists(&self, _scope: &Scope) -> bool {
        true
    }

    /// Names of the entities in `scope`.
    async fn list(
        &self,
        scope: &Scope,
        credential: Option<&Credential>,
    ) -> Result<Vec<String>, ApiError>;

    /// Content of one entity.
    async fn fetch(
        &self,
        scope: &Scope,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError>;
}

/// Write side of a platform. Writes are upserts by name.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether writes into `scope` need a bearer credential from discovery.
    fn requires_credential(&self, scope: &Scope) -> bool;

    /// Whether entities in `scope` can be written at all.
    fn accepts(&self, scope: &Scope) -> bool;

    /// Most entities of `scope` one run can store, when writes into the
    /// scope overwrite each other instead of upserting by name.
    fn max_per_run(&self, _scope: &Scope) -> Option<usize> {
        None
    }

    async fn write(
        &self,
        scope: &Scope,
        name: &str,
        payload: &Payload,
        credential: Option<&Credential>,
    ) -> Result<(), ApiError>;
}

/// Entity content arrives as a JSON-encoded string inside the response
/// envelope; some endpoints send the object directly.
pub(crate) fn decode_content(content: Value) -> Result<Payload, ApiError> {
    match content {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
        }
        Value::Null => Err(ApiError::Parse("response carried no content".to_string())),
        other => Ok(other),
    }
}

pub(crate) fn encode_content(payload: &Payload) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Parse(e.to_string()))
}

pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            status: response.status().as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_content() {
        assert_eq!(decode_content(json!("{\"a\":1}")).unwrap(), json!({"a": 1}));
        assert_eq!(decode_content(json!({"a": 1})).unwrap(), json!({"a": 1}));
        assert!(matches!(
            decode_content(json!("{broken")),
            Err(ApiError::Parse(_))
        ));
        assert!(matches!(decode_content(Value::Null), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!(Platform::from_str("TradingView").unwrap(), Platform::Tradingview);
        assert_eq!(Platform::from_str("fxreplay").unwrap(), Platform::Fxreplay);
        assert!(Platform::from_str("metatrader").is_err());
    }

    #[test]
    fn test_platform_serde() {
        assert_eq!(
            serde_json::to_string(&Platform::Fxreplay).unwrap(),
            "\"fxreplay\""
        );
    }
}
