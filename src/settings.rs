//! User preferences kept in sync with the backend.
//!
//! Appearance changes apply locally right away, are written to a local JSON
//! file and flushed to the backend once they stop arriving for the debounce
//! delay. Pinned files only change after the backend confirms them.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nimbus_lib::ids;
use nimbus_api::users::{Appearance, UserSettings};

use crate::debounce::{Debouncer, Token};
use crate::error;
use crate::remote::Remote;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct SettingsStore<R> {
    remote: Arc<R>,
    current: Arc<Mutex<UserSettings>>,
    debouncer: Debouncer,
    file: Option<Arc<PathBuf>>,
}

impl<R> Clone for SettingsStore<R> {
    fn clone(&self) -> Self {
        SettingsStore {
            remote: self.remote.clone(),
            current: self.current.clone(),
            debouncer: self.debouncer.clone(),
            file: self.file.clone(),
        }
    }
}

impl<R> SettingsStore<R>
where
    R: Remote
{
    /// `file` is where settings are persisted locally, `None` keeps them in
    /// memory only
    pub fn new(remote: Arc<R>, debounce: Duration, file: Option<PathBuf>) -> Self {
        SettingsStore {
            remote,
            current: Arc::new(Mutex::new(UserSettings::default())),
            debouncer: Debouncer::new(debounce),
            file: file.map(Arc::new),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UserSettings> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> UserSettings {
        self.lock().clone()
    }

    pub fn appearance(&self) -> Appearance {
        self.lock().appearance.clone()
    }

    pub fn pinned(&self) -> Vec<ids::FileId> {
        self.lock().pinned_files.clone()
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.lock().pinned_files.iter().any(|pinned| pinned == id)
    }

    /// replaces the local copy with what the backend has. a pending flush
    /// is dropped since it would overwrite the newer state.
    pub async fn apply_settings_from_backend(&self, settings: UserSettings) {
        self.debouncer.bump();

        *self.lock() = settings;

        self.persist_local().await;
    }

    /// sends the current settings immediately, cancelling any pending
    /// debounced flush
    pub async fn sync_settings_to_backend_now(&self) -> error::Result<UserSettings> {
        let token = self.debouncer.bump();

        self.flush(token).await
    }

    /// applies a change to the appearance and schedules a flush. must be
    /// called from within a tokio runtime.
    pub async fn update_appearance<F>(&self, f: F)
    where
        F: FnOnce(&mut Appearance)
    {
        {
            let mut current = self.lock();

            f(&mut current.appearance);
        }

        self.persist_local().await;

        let token = self.debouncer.bump();
        let store = self.clone();

        tokio::spawn(async move {
            if !store.debouncer.settle(token).await {
                return;
            }

            if let Err(err) = store.flush(token).await {
                tracing::warn!("failed to sync settings: {err}");
            }
        });
    }

    /// replaces the pinned list once the backend accepted it
    pub async fn set_pinned(&self, pinned: Vec<ids::FileId>) -> error::Result<Vec<ids::FileId>> {
        let mut outgoing = self.settings();

        outgoing.pinned_files = pinned;

        let confirmed = self.remote.put_settings(outgoing).await?;

        self.lock().pinned_files = confirmed.pinned_files.clone();
        self.persist_local().await;

        Ok(confirmed.pinned_files)
    }

    /// loads settings saved by an earlier session. returns false if there
    /// was nothing usable to load.
    pub async fn load_local(&self) -> bool {
        let Some(path) = &self.file else {
            return false;
        };

        let contents = match tokio::fs::read(path.as_ref()).await {
            Ok(contents) => contents,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("failed to read settings file \"{}\": {err}", path.display());
                }

                return false;
            }
        };

        match serde_json::from_slice::<UserSettings>(&contents) {
            Ok(loaded) => {
                *self.lock() = loaded;

                true
            },
            Err(err) => {
                tracing::warn!("ignoring malformed settings file \"{}\": {err}", path.display());

                false
            }
        }
    }

    async fn flush(&self, token: Token) -> error::Result<UserSettings> {
        let outgoing = self.settings();

        tracing::debug!("flushing settings");

        let confirmed = self.remote.put_settings(outgoing).await?;

        // a newer change is already waiting for its own flush
        if self.debouncer.is_current(token) {
            self.lock().pinned_files = confirmed.pinned_files.clone();
        }

        Ok(confirmed)
    }

    async fn persist_local(&self) {
        let Some(path) = &self.file else {
            return;
        };

        let serialized = serde_json::to_vec_pretty(&*self.lock());

        let contents = match serialized {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!("failed to serialize settings: {err}");
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("failed to create \"{}\": {err}", parent.display());
                return;
            }
        }

        if let Err(err) = tokio::fs::write(path.as_ref(), contents).await {
            tracing::warn!("failed to write settings file \"{}\": {err}", path.display());
        }
    }
}
