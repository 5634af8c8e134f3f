use nimbus_lib::ids;
use nimbus_lib::fs::FileType;
use nimbus_lib::size::SizeUnit;
use nimbus_lib::validation::{name_valid, http_url_valid, text_valid, MAX_NOTE_CHARS};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::{ApiError, ApiErrorKind, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: ids::FileId,
    pub name: String,
    pub is_folder: bool,
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// `None` places the item at the root of its disk
    #[serde(default)]
    pub parent_id: Option<ids::FileId>,
    pub disk_id: ids::DiskId,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub size_unit: SizeUnit,
    /// binary content location, note text or link target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileItem>>,
}

impl FileItem {
    /// bytes this entry occupies on its disk, folders occupy nothing
    /// themselves
    pub fn size_bytes(&self) -> u64 {
        if self.is_folder {
            0
        } else {
            self.size_unit.to_bytes(self.size)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub parent_id: Option<ids::FileId>,
    pub disk_id: ids::DiskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CreateFile {
    pub fn folder(name: String, parent_id: Option<ids::FileId>, disk_id: ids::DiskId) -> Self {
        CreateFile {
            name,
            file_type: FileType::Folder,
            parent_id,
            disk_id,
            url: None,
            content: None,
        }
    }

    pub fn note(name: String, content: String, parent_id: Option<ids::FileId>, disk_id: ids::DiskId) -> Self {
        CreateFile {
            name,
            file_type: FileType::Note,
            parent_id,
            disk_id,
            url: None,
            content: Some(content),
        }
    }

    pub fn url(name: String, url: String, parent_id: Option<ids::FileId>, disk_id: ids::DiskId) -> Self {
        CreateFile {
            name,
            file_type: FileType::Url,
            parent_id,
            disk_id,
            url: Some(url),
            content: None,
        }
    }
}

impl Validator for CreateFile {
    fn validate(&self) -> Result<(), ApiError> {
        if !name_valid(&self.name) {
            return Err(ApiError::from((ApiErrorKind::ValidationFailed, "name must not be empty or contain path separators")));
        }

        match self.file_type {
            FileType::Url => {
                let valid = self.url.as_deref()
                    .map(http_url_valid)
                    .unwrap_or(false);

                if !valid {
                    return Err(ApiError::from((ApiErrorKind::ValidationFailed, "url must be a valid http(s) address")));
                }
            },
            FileType::Note => {
                let valid = self.content.as_deref()
                    .map(|c| text_valid(c, MAX_NOTE_CHARS))
                    .unwrap_or(true);

                if !valid {
                    return Err(ApiError::from((ApiErrorKind::ValidationFailed, "note content is invalid or too long")));
                }
            },
            FileType::Folder => {},
            _ => {
                return Err(ApiError::from((ApiErrorKind::ValidationFailed, "binary files must be uploaded")));
            }
        }

        Ok(())
    }
}

/// PATCH body for renaming an entry
#[derive(Debug, Serialize, Deserialize)]
pub struct RenameFile {
    pub name: String,
}

impl Validator for RenameFile {
    fn validate(&self) -> Result<(), ApiError> {
        if !name_valid(&self.name) {
            return Err(ApiError::from((ApiErrorKind::ValidationFailed, "name must not be empty or contain path separators")));
        }

        Ok(())
    }
}

/// destination of a move (PATCH) or copy (POST /files/:id/copy). a `None`
/// parent is the root of the target disk and is sent as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub parent_id: Option<ids::FileId>,
    pub disk_id: ids::DiskId,
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "id": "f1",
            "name": "Docs",
            "isFolder": true,
            "type": "folder",
            "parentId": null,
            "diskId": "d1",
            "createdAt": "2024-03-01T10:00:00Z",
            "modifiedAt": "2024-03-02T10:00:00Z",
            "children": [{
                "id": "f2",
                "name": "cv.pdf",
                "isFolder": false,
                "type": "document",
                "parentId": "f1",
                "diskId": "d1",
                "size": 2,
                "sizeUnit": "MB",
                "url": "/content/f2",
                "createdAt": "2024-03-01T10:00:00Z",
                "modifiedAt": "2024-03-01T10:00:00Z"
            }]
        }"#
    }

    #[test]
    fn file_item_from_json() {
        let item: FileItem = serde_json::from_str(sample()).unwrap();

        assert!(item.is_folder);
        assert_eq!(item.size_bytes(), 0);

        let children = item.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].file_type, FileType::Document);
        assert_eq!(children[0].parent_id.as_deref(), Some("f1"));
        assert_eq!(children[0].size_bytes(), SizeUnit::MB.to_bytes(2.0));
    }

    #[test]
    fn create_validation() {
        let folder = CreateFile::folder("Docs".into(), None, "d1".into());
        assert!(folder.validate().is_ok());

        let empty = CreateFile::folder(String::new(), None, "d1".into());
        assert!(empty.validate().is_err());

        let link = CreateFile::url("site".into(), "https://example.com".into(), None, "d1".into());
        assert!(link.validate().is_ok());

        let bad_link = CreateFile::url("site".into(), "example.com".into(), None, "d1".into());
        assert!(bad_link.validate().is_err());

        let note = CreateFile::note("todo".into(), "- milk\n- eggs".into(), None, "d1".into());
        assert!(note.validate().is_ok());
    }

    #[test]
    fn destination_sends_null_parent() {
        let dest = Destination { parent_id: None, disk_id: "d2".into() };

        assert_eq!(serde_json::to_string(&dest).unwrap(), r#"{"parentId":null,"diskId":"d2"}"#);
    }
}
