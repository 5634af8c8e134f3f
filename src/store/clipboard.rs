use nimbus_lib::ids;
use nimbus_api::files::{FileItem, Destination};

use crate::error::{self, Error};
use crate::remote::Remote;

use super::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Copy,
    Cut,
}

/// the single cut/copy selection. a new selection replaces the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    pub operation: Option<ClipboardOp>,
    pub files: Vec<ids::FileId>,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.operation.is_none() || self.files.is_empty()
    }
}

/// what a paste will send for one entry
struct Planned {
    id: ids::FileId,
    disk_id: ids::DiskId,
}

impl<R> FileStore<R>
where
    R: Remote
{
    pub fn copy_files(&self, ids: &[ids::FileId]) -> error::Result<()> {
        self.set_clipboard(ClipboardOp::Copy, ids)
    }

    /// marks entries to be moved by the next paste. the tree is left as it
    /// is until then.
    pub fn cut_files(&self, ids: &[ids::FileId]) -> error::Result<()> {
        self.set_clipboard(ClipboardOp::Cut, ids)
    }

    fn set_clipboard(&self, operation: ClipboardOp, ids: &[ids::FileId]) -> error::Result<()> {
        if ids.is_empty() {
            return Err(Error::validation("nothing selected"));
        }

        let mut state = self.lock();
        let mut files: Vec<ids::FileId> = Vec::with_capacity(ids.len());

        for id in ids {
            state.require_file(id)?;

            if !files.contains(id) {
                files.push(id.clone());
            }
        }

        state.clipboard = Clipboard {
            operation: Some(operation),
            files,
        };

        Ok(())
    }

    pub fn clear_clipboard(&self) {
        self.lock().clipboard = Clipboard::default();
    }

    pub fn clipboard(&self) -> Clipboard {
        self.lock().clipboard.clone()
    }

    /// true while the entry waits in a cut selection
    pub fn is_pending_move(&self, id: &str) -> bool {
        let state = self.lock();

        state.clipboard.operation == Some(ClipboardOp::Cut) &&
            state.clipboard.files.iter().any(|file| file == id)
    }

    /// copies or moves the clipboard entries under `target_folder` (the
    /// disk root when `None`) on `target_disk`.
    ///
    /// every entry is its own request. this is not all-or-nothing: entries
    /// the backend confirmed stay applied when a later one fails, so the
    /// cache matches what the backend actually holds, and the failure is
    /// returned. a failed usage re-read afterwards is returned as well.
    pub async fn paste_files(
        &self,
        target_folder: Option<&str>,
        target_disk: &str
    ) -> error::Result<Vec<FileItem>> {
        let (operation, planned) = self.plan_paste(target_folder, target_disk)?;

        let dest = Destination {
            parent_id: target_folder.map(|v| v.to_owned()),
            disk_id: target_disk.to_owned(),
        };

        let mut confirmed = Vec::with_capacity(planned.len());
        let mut failure = None;

        for entry in &planned {
            let result = match operation {
                ClipboardOp::Copy => self.remote.copy_file(&entry.id, dest.clone()).await,
                ClipboardOp::Cut => self.remote.move_file(&entry.id, dest.clone()).await,
            };

            match result {
                Ok(item) => confirmed.push(item),
                Err(err) => {
                    let err = Error::from(err);

                    tracing::warn!("paste of {} stopped at {}: {err}", planned.len(), entry.id);

                    failure = Some(err);
                    break;
                }
            }
        }

        {
            let mut state = self.lock();

            for item in &confirmed {
                match operation {
                    ClipboardOp::Copy => {
                        state.tree.attach(item.clone());
                    },
                    ClipboardOp::Cut => {
                        state.tree.relocate(item.clone());
                    }
                }
            }

            if operation == ClipboardOp::Cut {
                let moved: Vec<&ids::FileId> = confirmed.iter().map(|item| &item.id).collect();

                state.clipboard.files.retain(|id| !moved.contains(&id));

                if state.clipboard.files.is_empty() {
                    state.clipboard.operation = None;
                }
            }

            state.prune_clipboard();
            state.resync_nav();
        }

        let disks_changed = planned.iter()
            .any(|entry| operation == ClipboardOp::Copy || entry.disk_id != target_disk);

        let reconciled = if !confirmed.is_empty() && disks_changed {
            self.reconcile_usage().await
        } else {
            Ok(())
        };

        tracing::debug!("pasted {} of {} entries into {target_disk}", confirmed.len(), planned.len());

        if let Some(err) = failure {
            if let Err(usage_err) = reconciled {
                tracing::warn!("failed to re-read disk usage after paste: {usage_err}");
            }

            return Err(err);
        }

        reconciled?;

        Ok(confirmed)
    }

    /// checks the whole paste against the cache before anything is sent.
    /// only these checks are all-or-nothing, the requests that follow can
    /// stop partway.
    fn plan_paste(
        &self,
        target_folder: Option<&str>,
        target_disk: &str
    ) -> error::Result<(ClipboardOp, Vec<Planned>)> {
        let state = self.lock();

        let Some(operation) = state.clipboard.operation else {
            return Err(Error::invalid_operation("clipboard is empty"));
        };

        if state.clipboard.files.is_empty() {
            return Err(Error::invalid_operation("clipboard is empty"));
        }

        state.require_destination(target_disk, target_folder)?;

        let mut planned = Vec::with_capacity(state.clipboard.files.len());
        let mut incoming = 0u64;
        let mut incoming_known = true;

        for id in &state.clipboard.files {
            let item = state.require_file(id)?;

            if let Some(target_folder) = target_folder {
                if state.tree.is_within(target_folder, id) {
                    return Err(Error::invalid_operation(
                        "cannot move a folder into itself or its own subtree"
                    ));
                }
            }

            let ignore = match operation {
                ClipboardOp::Cut => Some(id.as_str()),
                ClipboardOp::Copy => None,
            };

            state.check_sibling_name(target_disk, target_folder, &item.name, ignore)?;

            if operation == ClipboardOp::Copy || item.disk_id != target_disk {
                let stats = state.tree.stats(id);

                incoming += stats.bytes;
                incoming_known &= stats.complete;
            }

            planned.push(Planned {
                id: id.clone(),
                disk_id: item.disk_id.clone(),
            });
        }

        if incoming_known && state.require_disk(target_disk)?.free() < incoming {
            return Err(Error::conflict("Not enough space on disk"));
        }

        Ok((operation, planned))
    }
}
