//! Remote read/save endpoints for the rating matrix.
//!
//! [`RatingStore`] is the seam the session talks to. [`RemoteSync`] speaks
//! HTTP to the sheet endpoints; [`MemoryStore`] keeps everything in process
//! and behaves like a full-replace server.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

use crate::category::CategorySet;
use crate::config::Config;
use crate::error::SyncError;
use crate::snapshot::RemoteSnapshot;

/// Storage for the rating matrix. Saves always carry every row.
pub trait RatingStore: Send + Sync + 'static {
    /// Fetch previously saved ratings.
    fn load(&self) -> impl Future<Output = Result<RemoteSnapshot, SyncError>> + Send;

    /// Replace the saved ratings with `snapshot`. Returns the HTTP status on success.
    fn save(&self, snapshot: &RemoteSnapshot) -> impl Future<Output = Result<u16, SyncError>> + Send;
}

/// A shared store; lets a caller keep a handle after the session takes its copy.
impl<S: RatingStore> RatingStore for Arc<S> {
    fn load(&self) -> impl Future<Output = Result<RemoteSnapshot, SyncError>> + Send {
        (**self).load()
    }

    fn save(&self, snapshot: &RemoteSnapshot) -> impl Future<Output = Result<u16, SyncError>> + Send {
        (**self).save(snapshot)
    }
}

// ---------------------------------------------------------------------------
// RemoteSync
// ---------------------------------------------------------------------------

/// Endpoints and timeouts for [`RemoteSync`].
#[derive(Debug, Clone)]
pub struct RemoteSyncConfig {
    /// `GET` target returning flat records.
    pub load_url: String,
    /// `POST` target taking `{ rows: [...] }`.
    pub save_url: String,
    pub categories: CategorySet,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RemoteSyncConfig {
    /// Config with the standard categories and default timeouts.
    ///
    /// - connect_timeout: 3 s
    /// - request_timeout: 10 s
    pub fn new(load_url: impl Into<String>, save_url: impl Into<String>) -> Self {
        Self {
            load_url: load_url.into(),
            save_url: save_url.into(),
            categories: CategorySet::standard(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the read and save endpoints.
pub struct RemoteSync {
    config: RemoteSyncConfig,
    client: reqwest::Client,
}

impl RemoteSync {
    /// Start building a client for the given endpoints.
    pub fn builder(load_url: impl Into<String>, save_url: impl Into<String>) -> RemoteSyncBuilder {
        RemoteSyncBuilder::new(load_url, save_url)
    }

    /// Client for the endpoints and categories in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::builder(&config.load_url, &config.save_url)
            .categories(config.categories())
            .connect_timeout(config.connect_timeout())
            .request_timeout(config.request_timeout())
            .build()
    }

    pub fn config(&self) -> &RemoteSyncConfig {
        &self.config
    }

    /// `GET` the read endpoint and convert its flat records.
    ///
    /// Scores the sheet holds in an unusable form are logged and skipped;
    /// the rest of the record still loads.
    ///
    /// # Returns
    /// - `Err(SyncError::Connect)` when the request fails outright.
    /// - `Err(SyncError::Http)` on a non-2xx status.
    /// - `Err(SyncError::Json)` when the body is not a record array.
    pub async fn fetch(&self) -> Result<RemoteSnapshot, SyncError> {
        let url = &self.config.load_url;
        let resp = self.client.get(url).send().await.map_err(|e| SyncError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(SyncError::Http {
                status: resp.status().as_u16(),
                url: url.clone(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| SyncError::Json {
            field: "body".into(),
            detail: e.to_string(),
        })?;

        let (snapshot, rejected) = RemoteSnapshot::from_flat_json(&bytes, &self.config.categories)?;
        for r in &rejected {
            warn!(pizza = %r.pizza, category = %r.category, error = %r.error, "skipping saved score");
        }
        Ok(snapshot)
    }

    /// `POST` the full snapshot as JSON.
    ///
    /// # Returns
    /// - `Ok(status)` on a 2xx response; the body is ignored.
    /// - `Err(SyncError::Connect)` when the request fails outright.
    /// - `Err(SyncError::Http)` on a non-2xx status.
    pub async fn push(&self, snapshot: &RemoteSnapshot) -> Result<u16, SyncError> {
        let url = &self.config.save_url;
        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(snapshot)
            .send()
            .await
            .map_err(|e| SyncError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
                url: url.clone(),
            });
        }
        Ok(status.as_u16())
    }
}

impl RatingStore for RemoteSync {
    fn load(&self) -> impl Future<Output = Result<RemoteSnapshot, SyncError>> + Send {
        self.fetch()
    }

    fn save(&self, snapshot: &RemoteSnapshot) -> impl Future<Output = Result<u16, SyncError>> + Send {
        self.push(snapshot)
    }
}

/// Builder for [`RemoteSync`].
pub struct RemoteSyncBuilder {
    config: RemoteSyncConfig,
}

impl RemoteSyncBuilder {
    pub fn new(load_url: impl Into<String>, save_url: impl Into<String>) -> Self {
        Self {
            config: RemoteSyncConfig::new(load_url, save_url),
        }
    }

    /// Columns to read from the sheet (default: the standard seven).
    pub fn categories(mut self, categories: CategorySet) -> Self {
        self.config.categories = categories;
        self
    }

    /// Override the TCP connect timeout (default 3 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Override the per-request timeout (default 10 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> RemoteSync {
        // Client::builder() only fails when the TLS backend cannot initialise;
        // fall back to a default client rather than panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .unwrap_or_default();

        RemoteSync {
            config: self.config,
            client,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    /// What the read endpoint would return, in its flat shape.
    stored: serde_json::Value,
    saves: Vec<RemoteSnapshot>,
    fail_loads: bool,
    fail_saves: bool,
}

/// In-process [`RatingStore`] with full-replace semantics.
///
/// Saves are kept in the flat read shape, so a later `load` goes through the
/// same conversion a real sheet response does. Every save is also recorded
/// for inspection.
#[derive(Debug)]
pub struct MemoryStore {
    categories: CategorySet,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(categories: CategorySet) -> Self {
        Self {
            categories,
            state: Mutex::new(MemoryState {
                stored: serde_json::Value::Array(Vec::new()),
                ..Default::default()
            }),
        }
    }

    /// A store whose read endpoint returns `flat` (an array of flat records).
    pub fn with_flat(categories: CategorySet, flat: serde_json::Value) -> Self {
        let store = Self::new(categories);
        if let Ok(mut s) = store.state.lock() {
            s.stored = flat;
        }
        store
    }

    /// Make subsequent loads fail with a connection error.
    pub fn fail_loads(&self, fail: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.fail_loads = fail;
        }
    }

    /// Make subsequent saves fail with HTTP 500.
    pub fn fail_saves(&self, fail: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.fail_saves = fail;
        }
    }

    /// Every successful save so far, oldest first.
    pub fn saves(&self) -> Vec<RemoteSnapshot> {
        self.state.lock().map(|s| s.saves.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.state.lock().map(|s| s.saves.len()).unwrap_or(0)
    }

    pub fn last_save(&self) -> Option<RemoteSnapshot> {
        self.state.lock().ok().and_then(|s| s.saves.last().cloned())
    }

    fn load_now(&self) -> Result<RemoteSnapshot, SyncError> {
        let body = {
            let s = self.state.lock().map_err(|_| poisoned())?;
            if s.fail_loads {
                return Err(SyncError::Connect {
                    url: "memory://load".into(),
                    detail: "load failure injected".into(),
                });
            }
            serde_json::to_vec(&s.stored).map_err(|e| SyncError::Json {
                field: "stored".into(),
                detail: e.to_string(),
            })?
        };
        let (snapshot, rejected) = RemoteSnapshot::from_flat_json(&body, &self.categories)?;
        for r in &rejected {
            warn!(pizza = %r.pizza, category = %r.category, error = %r.error, "skipping saved score");
        }
        Ok(snapshot)
    }

    fn save_now(&self, snapshot: &RemoteSnapshot) -> Result<u16, SyncError> {
        let mut s = self.state.lock().map_err(|_| poisoned())?;
        if s.fail_saves {
            return Err(SyncError::Http {
                status: 500,
                url: "memory://save".into(),
            });
        }
        s.stored = snapshot.to_flat();
        s.saves.push(snapshot.clone());
        Ok(200)
    }
}

fn poisoned() -> SyncError {
    SyncError::Connect {
        url: "memory://".into(),
        detail: "store lock poisoned".into(),
    }
}

impl RatingStore for MemoryStore {
    fn load(&self) -> impl Future<Output = Result<RemoteSnapshot, SyncError>> + Send {
        std::future::ready(self.load_now())
    }

    fn save(&self, snapshot: &RemoteSnapshot) -> impl Future<Output = Result<u16, SyncError>> + Send {
        std::future::ready(self.save_now(snapshot))
    }
}
