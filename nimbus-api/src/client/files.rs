use nimbus_lib::ids;
use reqwest::multipart::{Form, Part};

use crate::client::error::RequestError;
use crate::client::{ApiClient, json_response, empty_response};
use crate::Validator;
use crate::files::{
    CreateFile as CreateFileBody,
    RenameFile as RenameFileBody,
    Destination,
    FileItem,
};

pub struct ListFiles {
    disk_id: ids::DiskId,
    parent_id: Option<ids::FileId>,
}

impl ListFiles {
    /// root level entries of a disk
    pub fn root(disk_id: ids::DiskId) -> Self {
        ListFiles {
            disk_id,
            parent_id: None,
        }
    }

    pub fn folder(disk_id: ids::DiskId, parent_id: ids::FileId) -> Self {
        ListFiles {
            disk_id,
            parent_id: Some(parent_id),
        }
    }

    pub async fn send(self, client: &ApiClient) -> Result<Vec<FileItem>, RequestError> {
        let mut builder = client.get(&["disks", self.disk_id.as_str(), "files"])?;

        if let Some(parent_id) = &self.parent_id {
            builder = builder.query(&[("parentId", parent_id)]);
        }

        json_response(builder.send().await?).await
    }
}

pub struct CreateFile {
    body: CreateFileBody
}

impl CreateFile {
    pub fn body(&self) -> &CreateFileBody {
        &self.body
    }

    pub async fn send(self, client: &ApiClient) -> Result<FileItem, RequestError> {
        self.body.assert_ok()?;

        let res = client.post(&["files"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

impl From<CreateFileBody> for CreateFile {
    fn from(body: CreateFileBody) -> Self {
        CreateFile { body }
    }
}

pub struct RenameFile {
    id: ids::FileId,
    body: RenameFileBody,
}

impl RenameFile {
    pub fn new<N>(id: ids::FileId, name: N) -> Self
    where
        N: Into<String>
    {
        RenameFile {
            id,
            body: RenameFileBody {
                name: name.into()
            }
        }
    }

    pub async fn send(self, client: &ApiClient) -> Result<FileItem, RequestError> {
        self.body.assert_ok()?;

        let res = client.patch(&["files", self.id.as_str()])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

/// reparents an entry, possibly onto another disk
pub struct MoveFile {
    id: ids::FileId,
    body: Destination,
}

impl MoveFile {
    pub fn new(id: ids::FileId, body: Destination) -> Self {
        MoveFile { id, body }
    }

    pub async fn send(self, client: &ApiClient) -> Result<FileItem, RequestError> {
        let res = client.patch(&["files", self.id.as_str()])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

/// duplicates an entry and its descendants under new ids
pub struct CopyFile {
    id: ids::FileId,
    body: Destination,
}

impl CopyFile {
    pub fn new(id: ids::FileId, body: Destination) -> Self {
        CopyFile { id, body }
    }

    pub async fn send(self, client: &ApiClient) -> Result<FileItem, RequestError> {
        let res = client.post(&["files", self.id.as_str(), "copy"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

pub struct DeleteFile {
    id: ids::FileId
}

impl DeleteFile {
    pub fn id(id: ids::FileId) -> Self {
        DeleteFile { id }
    }

    pub async fn send(self, client: &ApiClient) -> Result<(), RequestError> {
        let res = client.delete(&["files", self.id.as_str()])?
            .send()
            .await?;

        empty_response(res).await
    }
}

/// multipart upload of a single binary file
pub struct UploadFile {
    disk_id: ids::DiskId,
    parent_id: Option<ids::FileId>,
    file_name: String,
    content_type: Option<mime::Mime>,
    content_length: u64,
}

impl UploadFile {
    pub fn new<N>(
        disk_id: ids::DiskId,
        parent_id: Option<ids::FileId>,
        file_name: N,
        content_length: u64,
    ) -> Self
    where
        N: Into<String>
    {
        UploadFile {
            disk_id,
            parent_id,
            file_name: file_name.into(),
            content_type: None,
            content_length,
        }
    }

    pub fn content_type(&mut self, mime: mime::Mime) -> &mut Self {
        self.content_type = Some(mime);
        self
    }

    pub async fn send_stream<S>(self, client: &ApiClient, stream: S) -> Result<FileItem, RequestError>
    where
        S: futures::TryStream + Send + Sync + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        bytes::Bytes: From<S::Ok>,
    {
        let content_type = self.content_type.unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let body = reqwest::Body::wrap_stream(stream);
        let part = Part::stream_with_length(body, self.content_length)
            .file_name(self.file_name)
            .mime_str(content_type.as_ref())?;

        let mut form = Form::new()
            .text("diskId", self.disk_id);

        if let Some(parent_id) = self.parent_id {
            form = form.text("parentId", parent_id);
        }

        let res = client.post(&["files", "upload"])?
            .multipart(form.part("file", part))
            .send()
            .await?;

        json_response(res).await
    }
}

pub struct SearchFiles {
    query: String
}

impl SearchFiles {
    pub fn query<Q>(query: Q) -> Self
    where
        Q: Into<String>
    {
        SearchFiles {
            query: query.into()
        }
    }

    pub async fn send(self, client: &ApiClient) -> Result<Vec<FileItem>, RequestError> {
        let res = client.get(&["search"])?
            .query(&[("q", &self.query)])
            .send()
            .await?;

        json_response(res).await
    }
}
