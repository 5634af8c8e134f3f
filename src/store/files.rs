use nimbus_lib::ids;
use nimbus_api::Validator;
use nimbus_api::files::{FileItem, CreateFile, RenameFile};

use crate::error::{self, Error};
use crate::remote::Remote;
use crate::upload::{UploadEvent, UploadFile};

use super::{FileStore, State};

impl<R> FileStore<R>
where
    R: Remote
{
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
        disk_id: &str
    ) -> error::Result<FileItem> {
        self.create_entry(CreateFile::folder(
            name.to_owned(),
            parent_id.map(|v| v.to_owned()),
            disk_id.to_owned()
        )).await
    }

    pub async fn create_note(
        &self,
        name: &str,
        content: &str,
        parent_id: Option<&str>,
        disk_id: &str
    ) -> error::Result<FileItem> {
        self.create_entry(CreateFile::note(
            name.to_owned(),
            content.to_owned(),
            parent_id.map(|v| v.to_owned()),
            disk_id.to_owned()
        )).await
    }

    pub async fn create_url(
        &self,
        name: &str,
        url: &str,
        parent_id: Option<&str>,
        disk_id: &str
    ) -> error::Result<FileItem> {
        self.create_entry(CreateFile::url(
            name.to_owned(),
            url.trim().to_owned(),
            parent_id.map(|v| v.to_owned()),
            disk_id.to_owned()
        )).await
    }

    async fn create_entry(&self, body: CreateFile) -> error::Result<FileItem> {
        body.validate()?;

        {
            let state = self.lock();

            state.require_destination(&body.disk_id, body.parent_id.as_deref())?;
            state.check_sibling_name(&body.disk_id, body.parent_id.as_deref(), &body.name, None)?;

            let adding = body.content.as_ref().map(|c| c.len() as u64).unwrap_or(0);

            if state.require_disk(&body.disk_id)?.free() < adding {
                return Err(Error::conflict("Not enough space on disk"));
            }
        }

        let created = self.remote.create_file(body).await?;

        let mut state = self.lock();

        apply_created(&mut state, created.clone());

        tracing::debug!("created {} \"{}\"", created.file_type, created.name);

        Ok(created)
    }

    pub async fn rename_file(&self, id: &str, name: &str) -> error::Result<FileItem> {
        let body = RenameFile { name: name.to_owned() };

        body.validate()?;

        {
            let state = self.lock();
            let item = state.require_file(id)?;

            state.check_sibling_name(&item.disk_id, item.parent_id.as_deref(), name, Some(id))?;
        }

        let renamed = self.remote.rename_file(id, &body.name).await?;

        self.lock().tree.update_item(renamed.clone());

        Ok(renamed)
    }

    /// removes an entry and everything below it. usage drops by the size of
    /// the cached subtree, or is read back from the backend when parts of
    /// the subtree were never loaded. if that read fails the entry is still
    /// gone from the cache and the read error is returned.
    pub async fn delete_file(&self, id: &str) -> error::Result<()> {
        let (disk_id, stats) = {
            let state = self.lock();
            let item = state.require_file(id)?;

            (item.disk_id.clone(), state.tree.stats(id))
        };

        self.remote.delete_file(id).await?;

        {
            let mut state = self.lock();
            let removed = state.tree.detach(id);

            if stats.complete {
                state.remove_used(&disk_id, stats.bytes);
            }

            state.prune_clipboard();
            state.resync_nav();

            tracing::debug!("deleted {id} with {} cached entries", removed.len());
        }

        if !stats.complete {
            self.reconcile_usage().await?;
        }

        Ok(())
    }

    /// hands a file to the upload queue and returns the upload id right
    /// away. the finished entry shows up in the tree through
    /// `apply_finished_uploads` or `wait_upload`.
    pub fn upload_file(
        &self,
        file: UploadFile,
        parent_id: Option<&str>,
        disk_id: &str
    ) -> error::Result<ids::UploadId> {
        {
            let state = self.lock();

            state.require_destination(disk_id, parent_id)?;
            state.check_sibling_name(disk_id, parent_id, &file.file_name, None)?;

            if state.require_disk(disk_id)?.free() < file.total_bytes {
                return Err(Error::conflict("Not enough space on disk"));
            }
        }

        self.uploads.add_upload(file, disk_id.to_owned(), parent_id.map(|v| v.to_owned()))
    }

    /// moves every upload outcome reported so far into the tree. returns
    /// the entries that were added.
    pub fn apply_finished_uploads(&self) -> Vec<FileItem> {
        let Ok(mut events) = self.upload_events.try_lock() else {
            // someone is waiting on an upload and applies events as they come
            return Vec::new();
        };

        let mut added = Vec::new();

        while let Ok(event) = events.try_recv() {
            if let Some(item) = self.apply_upload_event(event) {
                added.push(item);
            }
        }

        added
    }

    /// waits until the given upload finished and returns its entry
    pub async fn wait_upload(&self, upload_id: &str) -> error::Result<FileItem> {
        loop {
            let outcome = self.lock().finished_uploads.get(upload_id).cloned();

            if let Some(outcome) = outcome {
                return outcome.map_err(|(kind, message)| Error::new(kind).message(message));
            }

            if self.uploads.upload(upload_id).is_none() {
                return Err(Error::not_found("unknown upload"));
            }

            let mut events = self.upload_events.lock().await;

            // an event may have been applied while waiting for the receiver
            if self.lock().finished_uploads.contains_key(upload_id) {
                continue;
            }

            let Some(event) = events.recv().await else {
                return Err(Error::invalid_operation("upload queue was shut down"));
            };

            drop(events);

            self.apply_upload_event(event);
        }
    }

    fn apply_upload_event(&self, event: UploadEvent) -> Option<FileItem> {
        let mut state = self.lock();

        match event {
            UploadEvent::Completed { id, item } => {
                apply_created(&mut state, item.clone());
                state.finished_uploads.insert(id, Ok(item.clone()));

                Some(item)
            },
            UploadEvent::Failed { id, kind, message } => {
                state.finished_uploads.insert(id, Err((kind, message)));

                None
            }
        }
    }

    /// drops finished uploads from the queue along with their outcomes
    pub fn clear_finished_uploads(&self) -> usize {
        let removed = self.uploads.clear_finished();
        let mut state = self.lock();

        state.finished_uploads.retain(|id, _| self.uploads.upload(id).is_some());

        removed
    }

    /// pins or unpins an entry once the backend stored the change. returns
    /// whether the entry is pinned afterwards.
    pub async fn toggle_pin(&self, id: &str) -> error::Result<bool> {
        let mut pinned = self.settings.pinned();

        let now_pinned = if let Some(index) = pinned.iter().position(|p| p == id) {
            pinned.remove(index);
            false
        } else {
            self.lock().require_file(id)?;
            pinned.push(id.to_owned());
            true
        };

        self.settings.set_pinned(pinned).await?;

        Ok(now_pinned)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.settings.is_pinned(id)
    }

    /// pinned entries that are currently cached, in pin order
    pub fn pinned_files(&self) -> Vec<FileItem> {
        let pinned = self.settings.pinned();
        let state = self.lock();

        pinned.iter()
            .filter_map(|id| state.tree.item(id))
            .cloned()
            .collect()
    }
}

/// adds a confirmed new entry to the tree and its size to the disk usage
fn apply_created(state: &mut State, mut item: FileItem) {
    if state.disk(&item.disk_id).is_none() {
        return;
    }

    // a folder that was just created has nothing in it yet
    if item.is_folder && item.children.is_none() {
        item.children = Some(Vec::new());
    }

    let disk_id = item.disk_id.clone();
    let bytes = item.size_bytes();

    state.add_used(&disk_id, bytes);
    state.tree.attach(item);
}
