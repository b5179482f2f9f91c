//! Settings collaborator: fetch/save `{ settings }` and debounced persistence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::debounce::Debouncer;
use crate::envelope::read_envelope;
use crate::http::{add_extra_headers, build_http_client};
use crate::options::ClientOptions;

pub type Settings = Map<String, Value>;

pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize, Deserialize)]
struct SettingsPayload {
    #[serde(default)]
    settings: Settings,
}

/// Client for the backend settings endpoint.
#[derive(Debug, Clone)]
pub struct SettingsClient {
    client: reqwest::Client,
    endpoint: String,
    extra_headers: Option<HashMap<String, String>>,
}

impl SettingsClient {
    /// Build a client for `endpoint`, reusing the HTTP settings of `options`.
    pub fn new(options: &ClientOptions, endpoint: impl Into<String>) -> Result<Self, ClientError> {
        Ok(Self {
            client: build_http_client(options)?,
            endpoint: endpoint.into(),
            extra_headers: options.extra_headers.clone(),
        })
    }

    pub async fn fetch(&self) -> Result<Settings, ClientError> {
        let req = add_extra_headers(self.client.get(&self.endpoint), &self.extra_headers);
        let payload: SettingsPayload = read_envelope(req.send().await?).await?;
        Ok(payload.settings)
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), ClientError> {
        let body = SettingsPayload {
            settings: settings.clone(),
        };
        let req = add_extra_headers(self.client.post(&self.endpoint), &self.extra_headers);
        let _: HashMap<String, Value> = read_envelope(req.json(&body).send().await?).await?;
        debug!(keys = settings.len(), "Settings saved");
        Ok(())
    }
}

/// Holds the current settings and persists them shortly after the last change.
pub struct DebouncedSettingsWriter {
    settings: Settings,
    debouncer: Debouncer<Settings>,
}

impl DebouncedSettingsWriter {
    /// Persist through `client`, logging failed saves.
    pub fn new(client: Arc<SettingsClient>, initial: Settings, delay: Duration) -> Self {
        Self::with_sink(initial, delay, move |settings| {
            let client = Arc::clone(&client);
            async move {
                if let Err(e) = client.save(&settings).await {
                    warn!(error = %e, "Failed to save settings");
                }
            }
        })
    }

    /// Persist through an arbitrary sink.
    pub fn with_sink<F, Fut>(initial: Settings, delay: Duration, sink: F) -> Self
    where
        F: Fn(Settings) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            settings: initial,
            debouncer: Debouncer::new(delay, sink),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply `update` to the current settings and schedule a save of the result.
    pub fn update(&mut self, update: impl FnOnce(&Settings) -> Settings) {
        self.settings = update(&self.settings);
        self.debouncer.push(self.settings.clone());
    }

    /// Shorthand for an update setting a single key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.update(|current| {
            let mut next = current.clone();
            next.insert(key, value);
            next
        });
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Discard an unsaved change. The held settings keep it.
    pub fn cancel(&mut self) -> bool {
        self.debouncer.cancel()
    }
}
