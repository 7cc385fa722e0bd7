//! FXReplay chart-storage endpoints (bearer auth) and theme settings.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{
    check_status, decode_content, encode_content, ApiError, DestinationApi, Platform, SourceApi,
};
use crate::discovery::Credential;
use crate::models::{Payload, Scope};
use crate::settings::SettingsStore;

pub const DEFAULT_FXREPLAY_URL: &str = "https://awf.fxreplay.com/chart-storage/2";

/// Settings key under which the page keeps the signed-in user's id.
pub const USER_ID_KEY: &str = "apc_user_id";
/// Settings key for a theme's `chartProperties`.
pub const CHART_PROPERTIES_KEY: &str = "tradingview.chartproperties";
/// Settings key for a theme's `mainSourceProperties`.
pub const MAIN_SERIES_PROPERTIES_KEY: &str = "tradingview.chartproperties.mainSeriesProperties";

const CLIENT_ID: &str = "fxreplay.com";

/// Charting-library storage envelope: `{"status": "ok", "data": ...}`.
#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, ApiError> {
        if self.status != "ok" {
            return Err(ApiError::Parse(format!(
                "server reported '{}': {}",
                self.status,
                self.message.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| ApiError::Parse("response carried no data".to_string()))
    }
}

#[derive(Deserialize)]
struct TemplateData {
    #[serde(default)]
    content: Value,
}

/// Client for FXReplay's drawing-template storage.
///
/// Templates go through the storage API with a bearer token; themes are
/// applied by writing chart properties into the page's settings storage.
#[derive(Clone)]
pub struct FxReplayClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    settings: Arc<dyn SettingsStore>,
}

impl FxReplayClient {
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            settings,
        }
    }

    /// Builds a client for the user recorded in `settings`.
    pub fn from_settings(
        base_url: impl Into<String>,
        settings: Arc<dyn SettingsStore>,
    ) -> Option<Self> {
        let user_id = settings.get(USER_ID_KEY)?;
        Some(Self::new(base_url, user_id, settings))
    }

    fn templates_request(
        &self,
        method: reqwest::Method,
        tool: &str,
        name: Option<&str>,
        credential: Option<&Credential>,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let credential = credential.ok_or(ApiError::MissingCredential)?;
        let mut query = vec![
            ("client", CLIENT_ID),
            ("user", self.user_id.as_str()),
            ("tool", tool),
        ];
        if let Some(name) = name {
            query.push(("name", name));
        }
        Ok(self
            .http
            .request(method, format!("{}/drawing_templates", self.base_url))
            .query(&query)
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .header(ACCEPT, "application/json"))
    }

    fn write_theme(&self, name: &str, payload: &Payload) -> Result<(), ApiError> {
        let mut written = 0;
        for (member, key) in [
            ("chartProperties", CHART_PROPERTIES_KEY),
            ("mainSourceProperties", MAIN_SERIES_PROPERTIES_KEY),
        ] {
            if let Some(properties) = payload.get(member) {
                self.settings
                    .set(key, encode_content(properties)?)
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                written += 1;
            }
        }
        if written == 0 {
            return Err(ApiError::Parse(format!(
                "theme '{}' has neither chartProperties nor mainSourceProperties",
                name
            )));
        }
        Ok(())
    }

    fn unsupported(what: &str) -> ApiError {
        ApiError::Unsupported {
            platform: "fxreplay",
            what: what.to_string(),
        }
    }
}

#[async_trait]
impl SourceApi for FxReplayClient {
    fn platform(&self) -> Platform {
        Platform::Fxreplay
    }

    fn requires_credential(&self) -> bool {
        true
    }

    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    fn lists(&self, scope: &Scope) -> bool {
        matches!(scope, Scope::Tool(_))
    }

    async fn list(
        &self,
        scope: &Scope,
        credential: Option<&Credential>,
    ) -> Result<Vec<String>, ApiError> {
        let Scope::Tool(tool) = scope else {
            return Err(Self::unsupported("theme listing"));
        };
        tracing::debug!("GET drawing_templates tool={}", tool);

        let request =
            self.templates_request(reqwest::Method::GET, tool.as_str(), None, credential)?;
        let response = check_status(request.send().await?)?;
        let envelope: Envelope<Vec<String>> = response.json().await?;
        envelope.into_data()
    }

    async fn fetch(
        &self,
        scope: &Scope,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError> {
        let Scope::Tool(tool) = scope else {
            return Err(Self::unsupported("theme reads"));
        };
        tracing::debug!("GET drawing_templates tool={} name={}", tool, name);

        let request =
            self.templates_request(reqwest::Method::GET, tool.as_str(), Some(name), credential)?;
        let response = check_status(request.send().await?)?;
        let envelope: Envelope<TemplateData> = response.json().await?;
        decode_content(envelope.into_data()?.content)
    }
}

#[async_trait]
impl DestinationApi for FxReplayClient {
    fn platform(&self) -> Platform {
        Platform::Fxreplay
    }

    fn requires_credential(&self, scope: &Scope) -> bool {
        // Themes land in settings storage, which needs no token.
        matches!(scope, Scope::Tool(_))
    }

    fn accepts(&self, _scope: &Scope) -> bool {
        true
    }

    fn max_per_run(&self, scope: &Scope) -> Option<usize> {
        // Every theme lands in the same two settings keys.
        match scope {
            Scope::Themes => Some(1),
            Scope::Tool(_) => None,
        }
    }

    async fn write(
        &self,
        scope: &Scope,
        name: &str,
        payload: &Payload,
        credential: Option<&Credential>,
    ) -> Result<(), ApiError> {
        let tool = match scope {
            Scope::Themes => return self.write_theme(name, payload),
            Scope::Tool(tool) => tool,
        };

        let form = Form::new().text("content", encode_content(payload)?);
        tracing::debug!("POST drawing_templates tool={} name={}", tool, name);

        let request = self
            .templates_request(reqwest::Method::POST, tool.as_str(), Some(name), credential)?
            .multipart(form);
        check_status(request.send().await?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ToolId, ToolKind};
    use crate::settings::MemorySettings;
    use axum::extract::{Multipart, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Saved = Arc<Mutex<Vec<(HashMap<String, String>, String)>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", port)
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .map(|v| v == "Bearer tok-1")
            .unwrap_or(false)
    }

    fn storage_app(saved: Saved) -> Router {
        Router::new().route(
            "/drawing_templates",
            get(
                |headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    assert_eq!(q["client"], "fxreplay.com");
                    assert_eq!(q["user"], "42");
                    match q.get("name") {
                        None => Ok(Json(json!({"status": "ok", "data": ["a", "b"]}))),
                        Some(name) => Ok(Json(json!({
                            "status": "ok",
                            "data": {"content": json!({"template": name}).to_string()}
                        }))),
                    }
                },
            )
            .post(
                move |headers: HeaderMap,
                      Query(q): Query<HashMap<String, String>>,
                      mut form: Multipart| {
                    let saved = saved.clone();
                    async move {
                        if !authorized(&headers) {
                            return StatusCode::UNAUTHORIZED;
                        }
                        let mut content = String::new();
                        while let Some(field) = form.next_field().await.unwrap() {
                            if field.name() == Some("content") {
                                content = field.text().await.unwrap();
                            }
                        }
                        saved.lock().unwrap().push((q, content));
                        StatusCode::OK
                    }
                },
            ),
        )
    }

    fn client(base_url: String, settings: Arc<MemorySettings>) -> FxReplayClient {
        FxReplayClient::new(base_url, "42", settings)
    }

    fn circle() -> Scope {
        Scope::Tool(ToolId::from(ToolKind::Circle))
    }

    #[tokio::test]
    async fn test_list_and_fetch_with_bearer() {
        let base = serve(storage_app(Saved::default())).await;
        let client = client(base, Arc::new(MemorySettings::new()));
        let credential = Credential::new("tok-1");

        let names = client.list(&circle(), Some(&credential)).await.unwrap();
        assert_eq!(names, vec!["a", "b"]);

        let payload = client.fetch(&circle(), "a", Some(&credential)).await.unwrap();
        assert_eq!(payload, json!({"template": "a"}));
    }

    #[tokio::test]
    async fn test_wrong_token_is_status_error() {
        let base = serve(storage_app(Saved::default())).await;
        let client = client(base, Arc::new(MemorySettings::new()));

        let err = client
            .list(&circle(), Some(&Credential::new("stale")))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Status { status: 401 });
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let client = client("http://127.0.0.1:9".into(), Arc::new(MemorySettings::new()));
        let err = client
            .write(&circle(), "a", &json!({}), None)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::MissingCredential);
    }

    #[tokio::test]
    async fn test_write_template() {
        let saved = Saved::default();
        let base = serve(storage_app(saved.clone())).await;
        let client = client(base, Arc::new(MemorySettings::new()));

        client
            .write(&circle(), "my circle", &json!({"r": 3}), Some(&Credential::new("tok-1")))
            .await
            .unwrap();

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        let (query, content) = &saved[0];
        assert_eq!(query["tool"], "LineToolCircle");
        assert_eq!(query["name"], "my circle");
        assert_eq!(serde_json::from_str::<Value>(content).unwrap(), json!({"r": 3}));
    }

    #[tokio::test]
    async fn test_write_theme_goes_to_settings() {
        let settings = Arc::new(MemorySettings::new());
        let client = client("http://127.0.0.1:9".into(), settings.clone());
        let theme = json!({
            "chartProperties": {"paneProperties": {"background": "#000"}},
            "mainSourceProperties": {"style": 1}
        });

        client.write(&Scope::Themes, "dark", &theme, None).await.unwrap();

        let stored = settings.snapshot();
        assert_eq!(
            serde_json::from_str::<Value>(&stored[CHART_PROPERTIES_KEY]).unwrap(),
            json!({"paneProperties": {"background": "#000"}})
        );
        assert_eq!(stored[MAIN_SERIES_PROPERTIES_KEY], "{\"style\":1}");
    }

    #[tokio::test]
    async fn test_second_theme_in_one_apply_is_skipped() {
        use crate::models::{BackupDocument, EntityId};
        use crate::pipeline::SyncPipeline;
        use crate::progress::{CancelFlag, NoopObserver};
        use crate::selection::SelectionModel;
        use crate::testing::empty_locator;

        let settings = Arc::new(MemorySettings::new());
        let client = client("http://127.0.0.1:9".into(), settings.clone());
        let document = BackupDocument::new()
            .with_theme("dark", json!({"chartProperties": {"bg": "#000"}}))
            .with_theme("light", json!({"chartProperties": {"bg": "#fff"}}));
        let selection = SelectionModel::from_document(&document);

        let report = SyncPipeline::new(std::time::Duration::ZERO)
            .apply(
                &document,
                &selection,
                &client,
                &empty_locator(),
                &NoopObserver,
                &CancelFlag::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec![EntityId::theme("dark")]);
        assert_eq!(report.skipped, vec![EntityId::theme("light")]);
        assert_eq!(
            serde_json::from_str::<Value>(&settings.snapshot()[CHART_PROPERTIES_KEY]).unwrap(),
            json!({"bg": "#000"})
        );
    }

    #[test]
    fn test_themes_are_not_listable() {
        let client = client("http://127.0.0.1:9".into(), Arc::new(MemorySettings::new()));
        assert!(!SourceApi::lists(&client, &Scope::Themes));
        assert!(SourceApi::lists(&client, &circle()));
    }

    #[tokio::test]
    async fn test_write_theme_without_properties_fails() {
        let client = client("http://127.0.0.1:9".into(), Arc::new(MemorySettings::new()));
        let err = client
            .write(&Scope::Themes, "odd", &json!({"colors": []}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_from_settings_needs_user_id() {
        let empty: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
        assert!(FxReplayClient::from_settings(DEFAULT_FXREPLAY_URL, empty).is_none());

        let known: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new().with(USER_ID_KEY, "42"));
        let client = FxReplayClient::from_settings(DEFAULT_FXREPLAY_URL, known).unwrap();
        assert_eq!(SourceApi::user_id(&client).as_deref(), Some("42"));
    }
}
