//! Transfers running independently of navigation.
//!
//! Every upload gets an entry in the queue the moment it is added. The
//! transfer itself runs on a spawned task that waits for one of a fixed
//! number of permits, streams the body and reports the outcome to whoever
//! holds the receiving end of the event channel.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use nimbus_lib::ids;
use nimbus_lib::validation::name_valid;
use nimbus_api::files::FileItem;
use tokio::sync::{mpsc, Semaphore};

use crate::error::{self, Error, ErrorKind};
use crate::remote::{Remote, UploadBody, UploadSource, ProgressFn};

pub mod progress;

use progress::Progress;

pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// a file waiting to be handed to the queue
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub total_bytes: u64,
    pub content_type: mime::Mime,
    pub source: UploadSource,
}

impl UploadFile {
    /// reads the size of a local file, the name defaults to the last path
    /// component
    pub async fn from_path<P>(path: P) -> error::Result<Self>
    where
        P: AsRef<Path>
    {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|err| {
            Error::validation(format!("cannot read \"{}\"", path.display())).source(err)
        })?;

        if !metadata.is_file() {
            return Err(Error::validation(format!("\"{}\" is not a file", path.display())));
        }

        let file_name = path.file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::validation(format!("\"{}\" has no usable file name", path.display())))?
            .to_owned();

        Ok(UploadFile {
            content_type: mime_guess::from_path(path).first_or_octet_stream(),
            file_name,
            total_bytes: metadata.len(),
            source: UploadSource::Path(path.to_owned()),
        })
    }

    pub fn from_bytes<N, B>(file_name: N, bytes: B) -> Self
    where
        N: Into<String>,
        B: Into<Bytes>,
    {
        let file_name = file_name.into();
        let bytes = bytes.into();

        UploadFile {
            content_type: mime_guess::from_path(&file_name).first_or_octet_stream(),
            total_bytes: bytes.len() as u64,
            source: UploadSource::Bytes(bytes),
            file_name,
        }
    }

    pub fn rename<N>(mut self, file_name: N) -> Self
    where
        N: Into<String>
    {
        self.file_name = file_name.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error)
    }
}

/// snapshot of a queued transfer
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub id: ids::UploadId,
    pub file_name: String,
    pub disk_id: ids::DiskId,
    pub parent_id: Option<ids::FileId>,
    pub status: UploadStatus,
    pub message: Option<String>,
    progress: Progress,
    seq: u64,
}

impl UploadItem {
    pub fn total_bytes(&self) -> u64 {
        self.progress.total()
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.progress.uploaded()
    }

    /// percentage in 0..=100
    pub fn progress(&self) -> f64 {
        self.progress.percent()
    }

    /// bytes per second since the first progress tick
    pub fn speed(&self) -> f64 {
        self.progress.speed()
    }

    fn record_progress(&mut self, uploaded: u64) {
        if self.status.is_finished() {
            return;
        }

        self.status = UploadStatus::Uploading;
        self.progress.record(uploaded, tokio::time::Instant::now());
    }
}

/// outcome of a transfer, sent once per upload
#[derive(Debug)]
pub enum UploadEvent {
    Completed {
        id: ids::UploadId,
        item: FileItem,
    },
    Failed {
        id: ids::UploadId,
        kind: ErrorKind,
        message: String,
    },
}

impl UploadEvent {
    pub fn id(&self) -> &ids::UploadId {
        match self {
            UploadEvent::Completed { id, .. } |
            UploadEvent::Failed { id, .. } => id
        }
    }
}

struct Inner<R> {
    remote: Arc<R>,
    items: DashMap<ids::UploadId, UploadItem>,
    permits: Arc<Semaphore>,
    events: mpsc::UnboundedSender<UploadEvent>,
    seq: AtomicU64,
    max_concurrent: usize,
}

pub struct UploadQueue<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for UploadQueue<R> {
    fn clone(&self) -> Self {
        UploadQueue {
            inner: self.inner.clone(),
        }
    }
}

impl<R> UploadQueue<R>
where
    R: Remote
{
    /// creates a queue that runs at most `max_concurrent` transfers at once.
    /// finished transfers are reported on the returned receiver.
    pub fn new(remote: Arc<R>, max_concurrent: usize) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let max_concurrent = max_concurrent.max(1);
        let (tx, rx) = mpsc::unbounded_channel();

        let queue = UploadQueue {
            inner: Arc::new(Inner {
                remote,
                items: DashMap::new(),
                permits: Arc::new(Semaphore::new(max_concurrent)),
                events: tx,
                seq: AtomicU64::new(0),
                max_concurrent,
            })
        };

        (queue, rx)
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// registers the upload as pending and starts the transfer in the
    /// background. must be called from within a tokio runtime.
    pub fn add_upload(
        &self,
        file: UploadFile,
        disk_id: ids::DiskId,
        parent_id: Option<ids::FileId>,
    ) -> error::Result<ids::UploadId> {
        if !name_valid(&file.file_name) {
            return Err(Error::validation("invalid file name"));
        }

        let id = ids::create_uid();
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);

        self.inner.items.insert(id.clone(), UploadItem {
            id: id.clone(),
            file_name: file.file_name.clone(),
            disk_id: disk_id.clone(),
            parent_id: parent_id.clone(),
            status: UploadStatus::Pending,
            message: None,
            progress: Progress::new(file.total_bytes),
            seq,
        });

        tracing::debug!("queued upload {id} \"{}\" {} bytes", file.file_name, file.total_bytes);

        let body = UploadBody {
            file_name: file.file_name,
            total_bytes: file.total_bytes,
            disk_id,
            parent_id,
            content_type: file.content_type,
            source: file.source,
        };

        tokio::spawn(run_upload(self.inner.clone(), id.clone(), body));

        Ok(id)
    }

    /// all known uploads in the order they were added
    pub fn uploads(&self) -> Vec<UploadItem> {
        let mut list: Vec<UploadItem> = self.inner.items.iter()
            .map(|entry| entry.value().clone())
            .collect();

        list.sort_by_key(|item| item.seq);
        list
    }

    pub fn upload(&self, id: &str) -> Option<UploadItem> {
        self.inner.items.get(id).map(|entry| entry.value().clone())
    }

    /// drops completed and failed entries, returns how many were removed
    pub fn clear_finished(&self) -> usize {
        let before = self.inner.items.len();

        self.inner.items.retain(|_, item| !item.status.is_finished());

        before - self.inner.items.len()
    }

    /// number of uploads that have not finished yet
    pub fn active_count(&self) -> usize {
        self.inner.items.iter()
            .filter(|entry| !entry.value().status.is_finished())
            .count()
    }
}

async fn run_upload<R>(inner: Arc<Inner<R>>, id: ids::UploadId, body: UploadBody)
where
    R: Remote
{
    let _permit = match inner.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            finish(&inner, &id, Err(Error::invalid_operation("upload queue was shut down")));
            return;
        }
    };

    if let Some(mut item) = inner.items.get_mut(&id) {
        item.status = UploadStatus::Uploading;
    }

    let progress: ProgressFn = {
        let inner = inner.clone();
        let id = id.clone();

        Arc::new(move |uploaded| {
            if let Some(mut item) = inner.items.get_mut(&id) {
                item.record_progress(uploaded);
            }
        })
    };

    tracing::debug!("starting upload {id}");

    let result = inner.remote.upload_file(body, progress)
        .await
        .map_err(Error::from);

    finish(&inner, &id, result);
}

fn finish<R>(inner: &Inner<R>, id: &str, result: error::Result<FileItem>) {
    let event = match result {
        Ok(item) => {
            if let Some(mut entry) = inner.items.get_mut(id) {
                entry.progress.finish();
                entry.status = UploadStatus::Completed;
            }

            tracing::info!("upload {id} completed as {}", item.id);

            UploadEvent::Completed { id: id.to_owned(), item }
        },
        Err(err) => {
            let message = err.to_string();

            if let Some(mut entry) = inner.items.get_mut(id) {
                entry.status = UploadStatus::Error;
                entry.message = Some(message.clone());
            }

            tracing::warn!("upload {id} failed: {message}");

            UploadEvent::Failed { id: id.to_owned(), kind: err.kind(), message }
        }
    };

    if inner.events.send(event).is_err() {
        tracing::debug!("no receiver for upload {id} outcome");
    }
}
