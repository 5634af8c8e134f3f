//! Cache of the user's disks and file trees.
//!
//! [`FileStore`] is a cheap handle around one shared state object. Every
//! mutation first waits for the backend to confirm it and then applies the
//! confirmed result in a single locked section, so callers only ever observe
//! the state before or after an operation. The lock is never held across an
//! await.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use nimbus_lib::ids;
use nimbus_lib::size::SizeUnit;
use nimbus_api::disks::Disk;
use nimbus_api::files::FileItem;
use nimbus_api::users::UserProfile;
use tokio::sync::mpsc;

use crate::debounce::Debouncer;
use crate::error::{self, Error, ErrorKind};
use crate::remote::Remote;
use crate::settings::{self, SettingsStore};
use crate::upload::{self, UploadQueue, UploadEvent};

pub mod tree;
mod disks;
mod files;
mod clipboard;
mod search;

pub use tree::FolderStats;
pub use clipboard::{Clipboard, ClipboardOp};
pub use search::SearchState;

use tree::Tree;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub search_debounce: Duration,
    pub settings_debounce: Duration,
    pub max_uploads: usize,
    /// local copy of the user settings, kept in memory only if `None`
    pub settings_file: Option<PathBuf>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            search_debounce: Duration::from_millis(300),
            settings_debounce: settings::DEFAULT_DEBOUNCE,
            max_uploads: upload::DEFAULT_MAX_CONCURRENT,
            settings_file: None,
        }
    }
}

/// cached disk with its usage counted in bytes
#[derive(Debug, Clone, PartialEq)]
pub struct DiskEntry {
    pub id: ids::DiskId,
    pub name: String,
    /// unit the disk was sized in
    pub unit: SizeUnit,
    pub used: u64,
    pub total: u64,
    pub created_at: DateTime<Utc>,
}

impl DiskEntry {
    fn from_disk(disk: &Disk) -> Self {
        DiskEntry {
            id: disk.id.clone(),
            name: disk.name.clone(),
            unit: disk.usage.unit,
            used: disk.usage.used_bytes(),
            total: disk.usage.total_bytes(),
            created_at: disk.created_at,
        }
    }

    pub fn free(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }

    pub fn total_in_unit(&self) -> f64 {
        self.unit.from_bytes(self.total)
    }

    pub fn used_in_unit(&self) -> f64 {
        self.unit.from_bytes(self.used)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    pub disk_id: Option<ids::DiskId>,
    /// folder ids from the disk root down to the active folder
    pub path: Vec<ids::FileId>,
}

/// bytes allocated to disks against the user's quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUsage {
    pub allocated: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub id: ids::FileId,
    pub name: String,
}

type UploadOutcome = Result<FileItem, (ErrorKind, String)>;

#[derive(Debug, Default)]
pub(crate) struct State {
    disks: Vec<DiskEntry>,
    tree: Tree,
    profile: Option<UserProfile>,
    nav: Navigation,
    clipboard: Clipboard,
    search: SearchState,
    finished_uploads: HashMap<ids::UploadId, UploadOutcome>,
}

impl State {
    fn disk(&self, id: &str) -> Option<&DiskEntry> {
        self.disks.iter().find(|disk| disk.id == id)
    }

    fn disk_mut(&mut self, id: &str) -> Option<&mut DiskEntry> {
        self.disks.iter_mut().find(|disk| disk.id == id)
    }

    fn require_disk(&self, id: &str) -> error::Result<&DiskEntry> {
        self.disk(id).ok_or_else(|| Error::not_found("disk not found"))
    }

    fn require_file(&self, id: &str) -> error::Result<&FileItem> {
        self.tree.item(id).ok_or_else(|| Error::not_found("file not found"))
    }

    /// checks that entries can be placed under `parent_id` on `disk_id`
    fn require_destination(&self, disk_id: &str, parent_id: Option<&str>) -> error::Result<()> {
        self.require_disk(disk_id)?;

        if let Some(parent_id) = parent_id {
            let parent = self.require_file(parent_id)?;

            if !parent.is_folder {
                return Err(Error::validation("destination is not a folder"));
            }

            if parent.disk_id != disk_id {
                return Err(Error::validation("destination folder is on a different disk"));
            }
        }

        Ok(())
    }

    fn check_sibling_name(&self, disk_id: &str, parent_id: Option<&str>, name: &str, ignore: Option<&str>) -> error::Result<()> {
        if self.tree.name_taken(disk_id, parent_id, name, ignore) {
            Err(Error::conflict("A file with this name already exists"))
        } else {
            Ok(())
        }
    }

    fn allocated(&self, except: Option<&str>) -> u64 {
        self.disks.iter()
            .filter(|disk| Some(disk.id.as_str()) != except)
            .map(|disk| disk.total)
            .sum()
    }

    fn add_used(&mut self, disk_id: &str, bytes: u64) {
        if let Some(disk) = self.disk_mut(disk_id) {
            disk.used = disk.used.saturating_add(bytes);
        }
    }

    fn remove_used(&mut self, disk_id: &str, bytes: u64) {
        if let Some(disk) = self.disk_mut(disk_id) {
            disk.used = disk.used.saturating_sub(bytes);
        }
    }

    /// takes usage numbers from a fresh disk listing without touching the
    /// cached trees
    fn apply_usage(&mut self, disks: &[Disk]) {
        for disk in disks {
            if let Some(entry) = self.disk_mut(&disk.id) {
                entry.used = disk.usage.used_bytes();
                entry.total = disk.usage.total_bytes();
                entry.unit = disk.usage.unit;
            }
        }
    }

    /// clipboard entries have to stay in the cache to be pasted
    fn prune_clipboard(&mut self) {
        let tree = &self.tree;

        self.clipboard.files.retain(|id| tree.contains(id));

        if self.clipboard.files.is_empty() {
            self.clipboard.operation = None;
        }
    }

    /// brings the navigation state back to a valid chain after the cache
    /// changed underneath it
    fn resync_nav(&mut self) {
        let Some(disk_id) = self.nav.disk_id.clone() else {
            self.nav.path.clear();
            return;
        };

        if self.disk(&disk_id).is_none() {
            self.nav = Navigation::default();
            return;
        }

        let mut rebuilt = Vec::new();

        for id in self.nav.path.iter().rev() {
            let Some(item) = self.tree.item(id) else {
                continue;
            };

            if item.disk_id != disk_id {
                continue;
            }

            if let Some(chain) = self.tree.path_to(id) {
                rebuilt = chain;
                break;
            }
        }

        if rebuilt != self.nav.path {
            tracing::debug!("navigation resynced to {} levels", rebuilt.len());
        }

        self.nav.path = rebuilt;
    }

    fn current_folder(&self) -> Option<&ids::FileId> {
        self.nav.path.last()
    }
}

pub struct FileStore<R> {
    remote: Arc<R>,
    state: Arc<Mutex<State>>,
    uploads: UploadQueue<R>,
    upload_events: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<UploadEvent>>>,
    search: Debouncer,
    settings: SettingsStore<R>,
}

impl<R> Clone for FileStore<R> {
    fn clone(&self) -> Self {
        FileStore {
            remote: self.remote.clone(),
            state: self.state.clone(),
            uploads: self.uploads.clone(),
            upload_events: self.upload_events.clone(),
            search: self.search.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<R> FileStore<R>
where
    R: Remote
{
    pub fn new(remote: Arc<R>, options: StoreOptions) -> Self {
        let (uploads, events) = UploadQueue::new(remote.clone(), options.max_uploads);
        let settings = SettingsStore::new(
            remote.clone(),
            options.settings_debounce,
            options.settings_file
        );

        FileStore {
            remote,
            state: Arc::new(Mutex::new(State::default())),
            uploads,
            upload_events: Arc::new(tokio::sync::Mutex::new(events)),
            search: Debouncer::new(options.search_debounce),
            settings,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn uploads(&self) -> &UploadQueue<R> {
        &self.uploads
    }

    pub fn settings(&self) -> &SettingsStore<R> {
        &self.settings
    }

    /// loads every disk with its root listing along with the user profile
    /// and replaces the cache wholesale
    pub async fn fetch_disks(&self) -> error::Result<Vec<DiskEntry>> {
        let (disks, profile) = futures::try_join!(
            self.remote.list_disks(),
            self.remote.profile(),
        )?;

        let settings = profile.settings.clone();
        let entries = {
            let mut state = self.lock();
            let mut tree = Tree::new();

            for disk in &disks {
                if let Some(files) = &disk.files {
                    tree.set_listing(&disk.id, None, files.clone());
                }
            }

            state.disks = disks.iter().map(DiskEntry::from_disk).collect();
            state.tree = tree;
            state.profile = Some(profile);
            state.prune_clipboard();
            state.resync_nav();
            state.disks.clone()
        };

        self.settings.apply_settings_from_backend(settings).await;

        tracing::info!("loaded {} disks", entries.len());

        Ok(entries)
    }

    /// switches the active disk and clears the path. the root listing is
    /// fetched the first time a disk is opened.
    pub async fn set_current_disk(&self, disk_id: Option<&str>) -> error::Result<()> {
        let Some(disk_id) = disk_id else {
            self.lock().nav = Navigation::default();
            return Ok(());
        };

        let loaded = {
            let state = self.lock();

            state.require_disk(disk_id)?;
            state.tree.listing_loaded(disk_id, None)
        };

        let fetched = if loaded {
            None
        } else {
            Some(self.remote.list_files(disk_id, None).await?)
        };

        let mut state = self.lock();

        state.require_disk(disk_id)?;

        if let Some(files) = fetched {
            if !state.tree.listing_loaded(disk_id, None) {
                state.tree.set_listing(disk_id, None, files);
            }
        }

        state.nav = Navigation {
            disk_id: Some(disk_id.to_owned()),
            path: Vec::new(),
        };

        Ok(())
    }

    /// makes `folder_id` the active folder, switching disks if needed. the
    /// path is rebuilt from the parent links of the cached folder.
    pub async fn navigate_to_folder(&self, folder_id: &str) -> error::Result<()> {
        let (disk_id, loaded) = {
            let state = self.lock();
            let item = state.require_file(folder_id)?;

            if !item.is_folder {
                return Err(Error::validation("not a folder"));
            }

            if state.tree.path_to(folder_id).is_none() {
                return Err(Error::not_found("folder is no longer reachable from its disk root"));
            }

            (item.disk_id.clone(), state.tree.children(folder_id).is_some())
        };

        let fetched = if loaded {
            None
        } else {
            Some(self.remote.list_files(&disk_id, Some(folder_id)).await?)
        };

        let mut state = self.lock();

        if let Some(files) = fetched {
            if state.tree.children(folder_id).is_none() {
                state.tree.set_listing(&disk_id, Some(folder_id), files);
            }
        }

        let path = state.tree.path_to(folder_id)
            .ok_or_else(|| Error::not_found("folder is no longer reachable from its disk root"))?;

        state.nav = Navigation {
            disk_id: Some(disk_id),
            path,
        };

        Ok(())
    }

    /// moves up one level, nothing happens at the disk root
    pub fn navigate_back(&self) {
        self.lock().nav.path.pop();
    }

    /// drops everything cached below `folder_id` (or below the active
    /// folder when `None`) and fetches that level again
    pub async fn refresh(&self, folder_id: Option<&str>) -> error::Result<()> {
        let (disk_id, parent_id) = {
            let state = self.lock();

            match folder_id {
                Some(folder_id) => {
                    let item = state.require_file(folder_id)?;

                    if !item.is_folder {
                        return Err(Error::validation("not a folder"));
                    }

                    (item.disk_id.clone(), Some(folder_id.to_owned()))
                },
                None => {
                    let Some(disk_id) = state.nav.disk_id.clone() else {
                        return Err(Error::invalid_operation("no disk is open"));
                    };

                    (disk_id, state.current_folder().cloned())
                }
            }
        };

        let files = self.remote.list_files(&disk_id, parent_id.as_deref()).await?;

        let mut state = self.lock();

        if let Some(parent_id) = &parent_id {
            if !state.tree.contains(parent_id) {
                return Err(Error::not_found("folder was removed while refreshing"));
            }
        }

        state.tree.set_listing(&disk_id, parent_id.as_deref(), files);
        state.prune_clipboard();
        state.resync_nav();

        tracing::debug!("refreshed {disk_id} {:?}", parent_id);

        Ok(())
    }

    /// re-reads disk usage from the backend, leaving cached trees alone.
    /// a failed read is returned so the caller knows usage may be behind.
    pub(crate) async fn reconcile_usage(&self) -> error::Result<()> {
        let disks = self.remote.list_disks().await?;

        self.lock().apply_usage(&disks);

        Ok(())
    }

    pub fn disks(&self) -> Vec<DiskEntry> {
        self.lock().disks.clone()
    }

    pub fn disk(&self, id: &str) -> Option<DiskEntry> {
        self.lock().disk(id).cloned()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.lock().profile.clone()
    }

    pub fn navigation(&self) -> Navigation {
        self.lock().nav.clone()
    }

    pub fn current_disk(&self) -> Option<DiskEntry> {
        let state = self.lock();

        state.nav.disk_id.as_deref().and_then(|id| state.disk(id)).cloned()
    }

    pub fn current_path(&self) -> Vec<ids::FileId> {
        self.lock().nav.path.clone()
    }

    pub fn breadcrumbs(&self) -> Vec<Crumb> {
        let state = self.lock();

        state.nav.path.iter()
            .filter_map(|id| state.tree.item(id))
            .map(|item| Crumb {
                id: item.id.clone(),
                name: item.name.clone(),
            })
            .collect()
    }

    /// entries of the active folder, or of the disk root at the top level
    pub fn current_items(&self) -> Vec<FileItem> {
        let state = self.lock();

        let Some(disk_id) = state.nav.disk_id.as_deref() else {
            return Vec::new();
        };

        state.tree.listing(disk_id, state.current_folder().map(|s| s.as_str()))
            .map(|listing| listing.iter()
                .filter_map(|id| state.tree.item(id))
                .cloned()
                .collect())
            .unwrap_or_default()
    }

    /// root entries of a disk, `None` if they were never fetched
    pub fn root_items(&self, disk_id: &str) -> Option<Vec<FileItem>> {
        let state = self.lock();

        state.tree.roots(disk_id).map(|listing| listing.iter()
            .filter_map(|id| state.tree.item(id))
            .cloned()
            .collect())
    }

    /// children of a folder, `None` if they were never fetched
    pub fn children(&self, id: &str) -> Option<Vec<FileItem>> {
        let state = self.lock();

        state.tree.children(id).map(|listing| listing.iter()
            .filter_map(|id| state.tree.item(id))
            .cloned()
            .collect())
    }

    pub fn file(&self, id: &str) -> Option<FileItem> {
        self.lock().tree.item(id).cloned()
    }

    pub fn folder_stats(&self, id: &str) -> Option<FolderStats> {
        let state = self.lock();

        state.tree.contains(id).then(|| state.tree.stats(id))
    }

    /// aggregate over the cached tree of a disk
    pub fn disk_stats(&self, disk_id: &str) -> Option<FolderStats> {
        let state = self.lock();

        state.disk(disk_id).map(|_| state.tree.disk_stats(disk_id))
    }

    pub fn quota(&self) -> Option<QuotaUsage> {
        let state = self.lock();

        state.profile.as_ref().map(|profile| QuotaUsage {
            allocated: state.allocated(None),
            total: profile.quota.total_bytes(),
        })
    }

    /// verifies the cache invariants: an acyclic tree that stays within one
    /// disk, a valid navigation chain and a clipboard of cached entries
    pub fn check_integrity(&self) -> Result<(), String> {
        let state = self.lock();

        state.tree.check_integrity()?;

        let mut seen = HashSet::new();

        for disk in &state.disks {
            if !seen.insert(disk.id.as_str()) {
                return Err(format!("disk {} is listed twice", disk.id));
            }

            if disk.used > disk.total {
                return Err(format!("disk {} uses more than its capacity", disk.id));
            }
        }

        if let Some(disk_id) = &state.nav.disk_id {
            if state.disk(disk_id).is_none() {
                return Err(format!("current disk {disk_id} is unknown"));
            }

            if let Some(last) = state.nav.path.last() {
                if state.tree.path_to(last).as_ref() != Some(&state.nav.path) {
                    return Err(String::from("navigation path is not a chain from the disk root"));
                }

                if state.tree.item(last).map(|i| i.disk_id != *disk_id).unwrap_or(true) {
                    return Err(String::from("navigation path leaves the current disk"));
                }
            }
        } else if !state.nav.path.is_empty() {
            return Err(String::from("navigation path without a disk"));
        }

        for id in &state.clipboard.files {
            if !state.tree.contains(id) {
                return Err(format!("clipboard entry {id} is not cached"));
            }
        }

        Ok(())
    }
}
