//! In-memory platform and observer used by the catalog, pipeline and session tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::api::{ApiError, DestinationApi, Platform, SourceApi};
use crate::discovery::{Credential, CredentialLocator, GraphValue, LocatorOptions, Namespace};
use crate::models::{EntityId, Payload, Scope};
use crate::pipeline::PipelineState;
use crate::progress::{Observer, Progress};

pub const TOKEN: &str = "test-token";

/// A platform holding entities in memory. Writes are upserts.
pub struct FakePlatform {
    pub entities: Mutex<BTreeMap<EntityId, Payload>>,
    pub failing: HashSet<EntityId>,
    pub failing_listings: HashSet<Scope>,
    pub unparseable: HashSet<EntityId>,
    pub needs_token: bool,
    pub accepts_themes: bool,
    pub lists_themes: bool,
    pub theme_slots: Option<usize>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(BTreeMap::new()),
            failing: HashSet::new(),
            failing_listings: HashSet::new(),
            unparseable: HashSet::new(),
            needs_token: false,
            accepts_themes: true,
            lists_themes: true,
            theme_slots: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(self, id: EntityId, payload: Payload) -> Self {
        self.entities.lock().unwrap().insert(id, payload);
        self
    }

    pub fn failing_on(mut self, id: EntityId) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn token_required(mut self) -> Self {
        self.needs_token = true;
        self
    }

    pub fn stored(&self) -> BTreeMap<EntityId, Payload> {
        self.entities.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn authorize(&self, credential: Option<&Credential>) -> Result<(), ApiError> {
        if !self.needs_token {
            return Ok(());
        }
        match credential {
            Some(c) if c.expose() == TOKEN => Ok(()),
            Some(_) => Err(ApiError::Status { status: 401 }),
            None => Err(ApiError::MissingCredential),
        }
    }
}

#[async_trait]
impl SourceApi for FakePlatform {
    fn platform(&self) -> Platform {
        Platform::Tradingview
    }

    fn requires_credential(&self) -> bool {
        self.needs_token
    }

    fn user_id(&self) -> Option<String> {
        Some("user-1".to_string())
    }

    fn lists(&self, scope: &Scope) -> bool {
        self.lists_themes || matches!(scope, Scope::Tool(_))
    }

    async fn list(
        &self,
        scope: &Scope,
        credential: Option<&Credential>,
    ) -> Result<Vec<String>, ApiError> {
        self.calls.lock().unwrap().push(format!("list {}", scope));
        self.authorize(credential)?;
        if self.failing_listings.contains(scope) {
            return Err(ApiError::Status { status: 500 });
        }
        Ok(self
            .entities
            .lock()
            .unwrap()
            .keys()
            .filter(|id| &id.scope == scope)
            .map(|id| id.name.clone())
            .collect())
    }

    async fn fetch(
        &self,
        scope: &Scope,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<Payload, ApiError> {
        let id = EntityId {
            scope: scope.clone(),
            name: name.to_string(),
        };
        self.calls.lock().unwrap().push(format!("fetch {}", id));
        self.authorize(credential)?;
        if self.failing.contains(&id) {
            return Err(ApiError::Transport("connection reset".into()));
        }
        if self.unparseable.contains(&id) {
            return Err(ApiError::Parse("expected value at line 1".into()));
        }
        self.entities
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ApiError::Status { status: 404 })
    }
}

#[async_trait]
impl DestinationApi for FakePlatform {
    fn platform(&self) -> Platform {
        Platform::Fxreplay
    }

    fn requires_credential(&self, scope: &Scope) -> bool {
        self.needs_token && matches!(scope, Scope::Tool(_))
    }

    fn accepts(&self, scope: &Scope) -> bool {
        self.accepts_themes || matches!(scope, Scope::Tool(_))
    }

    fn max_per_run(&self, scope: &Scope) -> Option<usize> {
        match scope {
            Scope::Themes => self.theme_slots,
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
        let id = EntityId {
            scope: scope.clone(),
            name: name.to_string(),
        };
        self.calls.lock().unwrap().push(format!("write {}", id));
        if matches!(scope, Scope::Tool(_)) {
            self.authorize(credential)?;
        }
        if self.failing.contains(&id) {
            return Err(ApiError::Status { status: 500 });
        }
        self.entities.lock().unwrap().insert(id, payload.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(Progress),
    Status(String),
    Transition(PipelineState),
}

/// Observer that remembers everything it was told.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(Progress::Fraction(f)) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn transitions(&self) -> Vec<PipelineState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Transition(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Status(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Observer for Recorder {
    fn on_progress(&self, progress: Progress) {
        self.events.lock().unwrap().push(Event::Progress(progress));
    }

    fn on_status(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Status(message.to_string()));
    }

    fn on_transition(&self, state: &PipelineState) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Transition(state.clone()));
    }
}

/// A locator over a page whose widget object carries [`TOKEN`].
pub fn token_locator() -> CredentialLocator<Namespace> {
    let namespace = Namespace::new().bind(
        "tradingview_widget",
        GraphValue::from_json(serde_json::json!({"auth": {"accessToken": TOKEN}})),
    );
    CredentialLocator::new(namespace, LocatorOptions::default())
}

/// A locator over a page with no token anywhere.
pub fn empty_locator() -> CredentialLocator<Namespace> {
    CredentialLocator::new(Namespace::new(), LocatorOptions::default())
}
