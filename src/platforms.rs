//! Builds platform clients and the credential locator from configuration.

use chartsync_core::{
    CredentialLocator, DestinationApi, FxReplayClient, Namespace, Platform, SettingsStore,
    SourceApi, TradingViewClient,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, Endpoint};
use crate::file_settings::FileSettings;

#[derive(Debug)]
pub enum SetupError {
    Settings(chartsync_core::SettingsError),
    UnknownUser,
    NamespaceRead(PathBuf, std::io::Error),
    NamespaceParse(PathBuf, String),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Settings(e) => write!(f, "{}", e),
            SetupError::UnknownUser => write!(
                f,
                "FXReplay user id unknown: set user_id in the config, CHARTSYNC_USER_ID, \
                 or apc_user_id in the settings file"
            ),
            SetupError::NamespaceRead(path, e) => {
                write!(f, "Failed to read namespace file '{}': {}", path.display(), e)
            }
            SetupError::NamespaceParse(path, e) => {
                write!(f, "Failed to parse namespace file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for SetupError {}

impl From<chartsync_core::SettingsError> for SetupError {
    fn from(e: chartsync_core::SettingsError) -> Self {
        SetupError::Settings(e)
    }
}

fn fxreplay(endpoint: &Endpoint, config: &Config) -> Result<FxReplayClient, SetupError> {
    let file = FileSettings::open(&config.settings_file.value)?;
    tracing::debug!("Settings storage: {}", file.path().display());
    let settings: Arc<dyn SettingsStore> = Arc::new(file);
    match &endpoint.user_id {
        Some(user) => Ok(FxReplayClient::new(&endpoint.base_url, user, settings)),
        None => FxReplayClient::from_settings(&endpoint.base_url, settings)
            .ok_or(SetupError::UnknownUser),
    }
}

pub fn source(config: &Config) -> Result<Box<dyn SourceApi>, SetupError> {
    let endpoint = &config.source;
    tracing::debug!("Source: {} at {}", endpoint.platform, endpoint.base_url);
    Ok(match endpoint.platform {
        Platform::Tradingview => Box::new(TradingViewClient::new(
            &endpoint.base_url,
            endpoint.session_cookie.clone(),
        )),
        Platform::Fxreplay => Box::new(fxreplay(endpoint, config)?),
    })
}

pub fn destination(config: &Config) -> Result<Box<dyn DestinationApi>, SetupError> {
    let endpoint = &config.destination;
    tracing::debug!(
        "Destination: {} at {}",
        endpoint.platform,
        endpoint.base_url
    );
    Ok(match endpoint.platform {
        Platform::Tradingview => Box::new(TradingViewClient::new(
            &endpoint.base_url,
            endpoint.session_cookie.clone(),
        )),
        Platform::Fxreplay => Box::new(fxreplay(endpoint, config)?),
    })
}

/// Loads the page-globals snapshot. Without one the locator has nothing to
/// search and reports the token as not found.
pub fn locator(config: &Config) -> Result<CredentialLocator<Namespace>, SetupError> {
    let options = config.discovery.locator_options();
    let Some(path) = &config.discovery.namespace_file else {
        tracing::warn!("No namespace_file configured; access token cannot be discovered");
        return Ok(CredentialLocator::new(Namespace::new(), options));
    };

    let text = std::fs::read_to_string(path)
        .map_err(|e| SetupError::NamespaceRead(path.clone(), e))?;
    let snapshot: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| SetupError::NamespaceParse(path.clone(), e.to_string()))?;
    let namespace = Namespace::from_json(snapshot).ok_or_else(|| {
        SetupError::NamespaceParse(path.clone(), "expected a JSON object".to_string())
    })?;
    Ok(CredentialLocator::new(namespace, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path, yaml: &str) -> Config {
        let path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", yaml).unwrap();
        Config::load(Some(path)).unwrap()
    }

    #[tokio::test]
    async fn test_locator_reads_namespace_snapshot() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("globals.json"),
            r#"{"other": {"accessToken": "no"}, "tradingview_abc": {"api": {"accessToken": "yes"}}}"#,
        )
        .unwrap();
        let config = config_in(dir.path(), "discovery:\n  namespace_file: globals.json\n");

        let credential = locator(&config).unwrap().locate().await.unwrap();
        assert_eq!(credential.expose(), "yes");
    }

    #[tokio::test]
    async fn test_locator_without_snapshot_finds_nothing() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), "backup_path: b.json\n");

        let result = locator(&config).unwrap().locate().await;
        assert!(result.is_err());
    }

    #[test]
    fn test_fxreplay_user_from_settings_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("storage.json"), r#"{"apc_user_id": "42"}"#).unwrap();
        let config = config_in(dir.path(), "settings_file: storage.json\n");

        assert!(destination(&config).is_ok());
    }

    #[test]
    fn test_fxreplay_without_user_is_rejected() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path(), "settings_file: storage.json\n");

        assert!(matches!(destination(&config), Err(SetupError::UnknownUser)));
    }
}
