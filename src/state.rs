//! Shared application state, injected into handlers through `web::Data`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use actix_web::web;
use chrono::{DateTime, Utc};

use crate::clients::{InMemoryLedger, InMemoryMetadataStore, MetadataClient, PinataClient, PollLedger};
use crate::config::AppConfig;
use crate::models::LocalPoll;
use crate::store::drafts::{DraftStore, draft_key};
use crate::store::persist::{FileBackend, LoadReport, StoreError};
use crate::store::{LocalPollStore, StoreSnapshot};
use crate::wizard::{PollForm, ProfileForm, Survey, Wizard};

pub const POLL_DRAFT: &str = "poll";

/// Survey drafts are keyed per poll.
pub fn survey_draft_form(poll_id: &str) -> String {
    format!("survey_{poll_id}")
}

/// In-progress forms of one account.
#[derive(Debug, Default)]
pub struct AccountForms {
    pub poll: Option<Wizard<PollForm>>,
    /// Poll form changed since the last draft save.
    pub poll_dirty: bool,
    pub profile: Option<Wizard<ProfileForm>>,
    pub surveys: HashMap<String, Survey>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct AppState {
    store: Mutex<LocalPollStore>,
    backend: Option<FileBackend>,
    drafts: Mutex<DraftStore>,
    forms: Mutex<HashMap<String, AccountForms>>,
    pub metadata: Arc<dyn MetadataClient>,
    pub ledger: Arc<dyn PollLedger>,
}

impl AppState {
    pub fn new(
        store: LocalPollStore,
        backend: Option<FileBackend>,
        drafts: DraftStore,
        metadata: Arc<dyn MetadataClient>,
        ledger: Arc<dyn PollLedger>,
    ) -> Self {
        AppState {
            store: Mutex::new(store),
            backend,
            drafts: Mutex::new(drafts),
            forms: Mutex::new(HashMap::new()),
            metadata,
            ledger,
        }
    }

    /// Memory-only state with in-memory clients.
    pub fn in_memory() -> Self {
        AppState::new(
            LocalPollStore::new(),
            None,
            DraftStore::in_memory(),
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryLedger::new()),
        )
    }

    /// Open the persisted cache and drafts under the configured data directory.
    pub fn open(config: &AppConfig) -> Result<(Self, LoadReport), StoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let backend = FileBackend::in_dir(&config.data_dir);
        let (snapshot, report) = backend.load()?;
        let store = LocalPollStore::from_snapshot(snapshot);

        let metadata: Arc<dyn MetadataClient> = match &config.pinata_jwt {
            Some(jwt) => match PinataClient::new(
                config.pinata_api_url.clone(),
                config.ipfs_gateway.clone(),
                jwt.clone(),
                config.metadata_timeout,
            ) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    log::error!("Pinning client unavailable ({e}), keeping metadata in memory");
                    Arc::new(InMemoryMetadataStore::new())
                }
            },
            None => {
                log::info!("PINATA_JWT not set, keeping metadata in memory");
                Arc::new(InMemoryMetadataStore::new())
            }
        };

        let state = AppState::new(
            store,
            Some(backend),
            DraftStore::open(&config.data_dir),
            metadata,
            Arc::new(InMemoryLedger::new()),
        );
        Ok((state, report))
    }

    pub fn read_store<R>(&self, f: impl FnOnce(&LocalPollStore) -> R) -> R {
        f(&lock(&self.store))
    }

    /// Apply `f` and write the cache through to disk. A failed write is
    /// logged; the in-memory change stands and the next write retries.
    pub fn mutate_store<R>(&self, f: impl FnOnce(&mut LocalPollStore) -> R) -> R {
        let mut store = lock(&self.store);
        let out = f(&mut store);
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.save(&store.snapshot()) {
                log::error!("Failed to persist local polls to {}: {e}", backend.path().display());
            }
        }
        out
    }

    /// Rewrite the persisted cache from memory.
    pub fn persist(&self) {
        self.mutate_store(|_| ());
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.read_store(|s| s.snapshot())
    }

    pub fn all_polls(&self) -> Vec<LocalPoll> {
        self.read_store(|s| s.get_all_polls())
    }

    pub fn with_drafts<R>(&self, f: impl FnOnce(&mut DraftStore) -> R) -> R {
        f(&mut lock(&self.drafts))
    }

    pub fn with_forms<R>(&self, account: &str, f: impl FnOnce(&mut AccountForms) -> R) -> R {
        let mut forms = lock(&self.forms);
        f(forms.entry(account.to_lowercase()).or_default())
    }

    /// Save every poll form changed since its last save. Returns how many were saved.
    pub fn autosave_drafts(&self, now: DateTime<Utc>) -> usize {
        let mut forms = lock(&self.forms);
        let mut drafts = lock(&self.drafts);
        let mut saved = 0;
        for (account, entry) in forms.iter_mut() {
            if !entry.poll_dirty {
                continue;
            }
            let Some(wizard) = entry.poll.as_mut() else {
                continue;
            };
            let data = match serde_json::to_value(&wizard.form) {
                Ok(v) => v,
                Err(e) => {
                    log::error!("Could not encode poll draft for {account}: {e}");
                    continue;
                }
            };
            match drafts.save(&draft_key(POLL_DRAFT, account), data, now) {
                Ok(()) => {
                    wizard.mark_saved(now);
                    entry.poll_dirty = false;
                    saved += 1;
                }
                Err(e) => log::error!("Draft autosave failed for {account}: {e}"),
            }
        }
        saved
    }
}

/// Periodically save changed poll forms as drafts.
pub fn spawn_autosave(state: web::Data<AppState>, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let saved = state.autosave_drafts(Utc::now());
            if saved > 0 {
                log::info!("Autosaved {saved} poll draft(s)");
            }
        }
    });
}
