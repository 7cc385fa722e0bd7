//! TradingView drawing-template endpoints (cookie-session auth).

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::Value;

use super::{
    check_status, decode_content, encode_content, ApiError, DestinationApi, Platform, SourceApi,
};
use crate::discovery::Credential;
use crate::models::{Payload, Scope};

pub const DEFAULT_TRADINGVIEW_URL: &str = "https://www.tradingview.com";

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Value,
}

/// Client for TradingView's private template endpoints.
///
/// Requests ride on the browser session, so the caller supplies the raw
/// `Cookie` header value of a logged-in session.
#[derive(Clone)]
pub struct TradingViewClient {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl TradingViewClient {
    pub fn new(base_url: impl Into<String>, session_cookie: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.with_session(self.http.get(url))
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    fn list_url(&self, scope: &Scope) -> String {
        match scope {
            Scope::Themes => self.url("/themes/"),
            Scope::Tool(tool) => self.url(&format!("/drawing-templates/{}/", tool)),
        }
    }
}

#[async_trait]
impl SourceApi for TradingViewClient {
    fn platform(&self) -> Platform {
        Platform::Tradingview
    }

    fn requires_credential(&self) -> bool {
        false
    }

    async fn list(
        &self,
        scope: &Scope,
        _credential: Option<&Credential>,
    ) -> Result<Vec<String>, ApiError> {
        let url = self.list_url(scope);
        tracing::debug!("GET {}", url);

        let response = check_status(self.get(url).send().await?)?;
        Ok(response.json::<Vec<String>>().await?)
    }

    async fn fetch(
        &self,
        scope: &Scope,
        name: &str,
        _credential: Option<&Credential>,
    ) -> Result<Payload, ApiError> {
        let request = match scope {
            Scope::Themes => self.get(self.url("/theme/")).query(&[("themeName", name)]),
            Scope::Tool(tool) => self
                .get(self.url(&format!("/drawing-template/{}/", tool)))
                .query(&[("templateName", name)]),
        };
        tracing::debug!("GET {} '{}'", scope, name);

        let response = check_status(request.send().await?)?;
        let body: ContentResponse = response.json().await?;
        decode_content(body.content)
    }
}

#[async_trait]
impl DestinationApi for TradingViewClient {
    fn platform(&self) -> Platform {
        Platform::Tradingview
    }

    fn requires_credential(&self, _scope: &Scope) -> bool {
        false
    }

    fn accepts(&self, scope: &Scope) -> bool {
        matches!(scope, Scope::Tool(_))
    }

    async fn write(
        &self,
        scope: &Scope,
        name: &str,
        payload: &Payload,
        _credential: Option<&Credential>,
    ) -> Result<(), ApiError> {
        let Scope::Tool(tool) = scope else {
            return Err(ApiError::Unsupported {
                platform: "tradingview",
                what: "theme writes".to_string(),
            });
        };

        let form = Form::new()
            .text("name", name.to_string())
            .text("tool", tool.to_string())
            .text("content", encode_content(payload)?);

        tracing::debug!("POST save-drawing-template {}/{}", tool, name);
        let request = self
            .with_session(self.http.post(self.url("/save-drawing-template/")))
            .multipart(form);
        check_status(request.send().await?)?;
        Ok(())
    }
}
