//! Seam between the stores and the backend.
//!
//! Everything the client persists goes through [`Remote`]. The production
//! implementation is [`nimbus_api::client::ApiClient`]; tests use the in
//! memory backend in `remote::mock`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use nimbus_lib::ids;
use nimbus_api::client::ApiClient;
use nimbus_api::client::error::RequestError;
use nimbus_api::client::{disks, files, users, requests};
use nimbus_api::disks::{Disk, CreateDisk, UpdateDisk};
use nimbus_api::files::{FileItem, CreateFile, Destination};
use nimbus_api::users::{UserProfile, UserSettings};
use nimbus_api::requests::{StorageRequest, CreateStorageRequest, RequestStatus};
use tokio_util::io::ReaderStream;

#[cfg(test)]
pub mod mock;

/// receives the total number of bytes sent so far for an upload
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum UploadSource {
    Path(PathBuf),
    Bytes(Bytes),
}

#[derive(Debug, Clone)]
pub struct UploadBody {
    pub file_name: String,
    pub total_bytes: u64,
    pub disk_id: ids::DiskId,
    pub parent_id: Option<ids::FileId>,
    pub content_type: mime::Mime,
    pub source: UploadSource,
}

#[async_trait]
pub trait Remote: Send + Sync + 'static {
    async fn list_disks(&self) -> Result<Vec<Disk>, RequestError>;

    async fn profile(&self) -> Result<UserProfile, RequestError>;

    async fn create_disk(&self, body: CreateDisk) -> Result<Disk, RequestError>;

    async fn update_disk(&self, id: &str, body: UpdateDisk) -> Result<Disk, RequestError>;

    async fn format_disk(&self, id: &str) -> Result<Disk, RequestError>;

    async fn delete_disk(&self, id: &str) -> Result<(), RequestError>;

    async fn merge_disks(&self, source_id: &str, target_id: &str) -> Result<Disk, RequestError>;

    async fn list_files(&self, disk_id: &str, parent_id: Option<&str>) -> Result<Vec<FileItem>, RequestError>;

    async fn create_file(&self, body: CreateFile) -> Result<FileItem, RequestError>;

    async fn rename_file(&self, id: &str, name: &str) -> Result<FileItem, RequestError>;

    async fn move_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError>;

    async fn copy_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError>;

    async fn delete_file(&self, id: &str) -> Result<(), RequestError>;

    async fn upload_file(&self, body: UploadBody, progress: ProgressFn) -> Result<FileItem, RequestError>;

    async fn search(&self, query: &str) -> Result<Vec<FileItem>, RequestError>;

    async fn put_settings(&self, settings: UserSettings) -> Result<UserSettings, RequestError>;

    async fn list_storage_requests(&self) -> Result<Vec<StorageRequest>, RequestError>;

    async fn create_storage_request(&self, body: CreateStorageRequest) -> Result<StorageRequest, RequestError>;

    async fn set_storage_request_status(&self, id: &str, status: RequestStatus) -> Result<StorageRequest, RequestError>;
}

#[async_trait]
impl Remote for ApiClient {
    async fn list_disks(&self) -> Result<Vec<Disk>, RequestError> {
        disks::QueryDisks::new().send(self).await
    }

    async fn profile(&self) -> Result<UserProfile, RequestError> {
        users::RetrieveProfile::new().send(self).await
    }

    async fn create_disk(&self, body: CreateDisk) -> Result<Disk, RequestError> {
        disks::CreateDisk::new(body.name, body.size, body.unit).send(self).await
    }

    async fn update_disk(&self, id: &str, body: UpdateDisk) -> Result<Disk, RequestError> {
        disks::UpdateDisk::from((id.to_owned(), body)).send(self).await
    }

    async fn format_disk(&self, id: &str) -> Result<Disk, RequestError> {
        disks::FormatDisk::id(id.to_owned()).send(self).await
    }

    async fn delete_disk(&self, id: &str) -> Result<(), RequestError> {
        disks::DeleteDisk::id(id.to_owned()).send(self).await
    }

    async fn merge_disks(&self, source_id: &str, target_id: &str) -> Result<Disk, RequestError> {
        disks::MergeDisks::new(source_id.to_owned(), target_id.to_owned())
            .send(self)
            .await
    }

    async fn list_files(&self, disk_id: &str, parent_id: Option<&str>) -> Result<Vec<FileItem>, RequestError> {
        let request = match parent_id {
            Some(parent_id) => files::ListFiles::folder(disk_id.to_owned(), parent_id.to_owned()),
            None => files::ListFiles::root(disk_id.to_owned()),
        };

        request.send(self).await
    }

    async fn create_file(&self, body: CreateFile) -> Result<FileItem, RequestError> {
        files::CreateFile::from(body).send(self).await
    }

    async fn rename_file(&self, id: &str, name: &str) -> Result<FileItem, RequestError> {
        files::RenameFile::new(id.to_owned(), name).send(self).await
    }

    async fn move_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError> {
        files::MoveFile::new(id.to_owned(), dest).send(self).await
    }

    async fn copy_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError> {
        files::CopyFile::new(id.to_owned(), dest).send(self).await
    }

    async fn delete_file(&self, id: &str) -> Result<(), RequestError> {
        files::DeleteFile::id(id.to_owned()).send(self).await
    }

    async fn upload_file(&self, body: UploadBody, progress: ProgressFn) -> Result<FileItem, RequestError> {
        let mut request = files::UploadFile::new(
            body.disk_id,
            body.parent_id,
            body.file_name,
            body.total_bytes
        );
        request.content_type(body.content_type);

        match body.source {
            UploadSource::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;

                request.send_stream(self, counted(ReaderStream::new(file), progress)).await
            },
            UploadSource::Bytes(bytes) => {
                let chunks = chunked(bytes);

                request.send_stream(self, counted(futures::stream::iter(chunks), progress)).await
            }
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<FileItem>, RequestError> {
        files::SearchFiles::query(query).send(self).await
    }

    async fn put_settings(&self, settings: UserSettings) -> Result<UserSettings, RequestError> {
        users::UpdateSettings::new(settings).send(self).await
    }

    async fn list_storage_requests(&self) -> Result<Vec<StorageRequest>, RequestError> {
        requests::QueryStorageRequests::new().send(self).await
    }

    async fn create_storage_request(&self, body: CreateStorageRequest) -> Result<StorageRequest, RequestError> {
        requests::CreateStorageRequest::new(body).send(self).await
    }

    async fn set_storage_request_status(&self, id: &str, status: RequestStatus) -> Result<StorageRequest, RequestError> {
        requests::SetRequestStatus::new(id.to_owned(), status).send(self).await
    }
}

const CHUNK_SIZE: usize = 64 * 1024;

/// splits an in memory upload so progress is reported more than once
pub(crate) fn chunked(bytes: Bytes) -> Vec<std::io::Result<Bytes>> {
    let mut chunks = Vec::with_capacity(bytes.len() / CHUNK_SIZE + 1);
    let mut offset = 0;

    while offset < bytes.len() {
        let end = usize::min(offset + CHUNK_SIZE, bytes.len());

        chunks.push(Ok(bytes.slice(offset..end)));
        offset = end;
    }

    chunks
}

/// reports the running byte count of a stream as chunks pass through
fn counted<S>(stream: S, progress: ProgressFn) -> impl futures::TryStream<Ok = Bytes, Error = std::io::Error> + Send + Sync + 'static
where
    S: futures::TryStream<Ok = Bytes, Error = std::io::Error> + Send + Sync + 'static,
{
    let mut sent = 0u64;

    stream.map_ok(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent);
        chunk
    })
}
