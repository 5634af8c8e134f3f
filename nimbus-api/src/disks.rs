use nimbus_lib::ids;
use nimbus_lib::size::SizeUnit;
use nimbus_lib::validation::name_valid;
use nimbus_lib::disk::disk_size_valid;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::{ApiError, ApiErrorKind, Validator};
use crate::files::FileItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub used: f64,
    pub total: f64,
    pub unit: SizeUnit,
}

impl Usage {
    pub fn used_bytes(&self) -> u64 {
        self.unit.to_bytes(self.used)
    }

    pub fn total_bytes(&self) -> u64 {
        self.unit.to_bytes(self.total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub id: ids::DiskId,
    pub name: String,
    /// root level entries of the disk, `None` when the backend left them out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileItem>>,
    pub usage: Usage,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDisk {
    pub name: String,
    pub size: f64,
    pub unit: SizeUnit,
}

impl Validator for CreateDisk {
    fn validate(&self) -> Result<(), ApiError> {
        if !name_valid(&self.name) {
            return Err(ApiError::from((ApiErrorKind::ValidationFailed, "invalid disk name")));
        }

        if !disk_size_valid(self.size, self.unit) {
            return Err(ApiError::from((
                ApiErrorKind::ValidationFailed,
                "disk size must be a positive amount of MB, GB or TB"
            )));
        }

        Ok(())
    }
}

/// PATCH body for renaming or resizing a disk. size and unit travel together.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<SizeUnit>,
}

impl Validator for UpdateDisk {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            if !name_valid(name) {
                return Err(ApiError::from((ApiErrorKind::ValidationFailed, "invalid disk name")));
            }
        }

        match (self.size, self.unit) {
            (Some(size), Some(unit)) => if !disk_size_valid(size, unit) {
                return Err(ApiError::from((
                    ApiErrorKind::ValidationFailed,
                    "disk size must be a positive amount of MB, GB or TB"
                )));
            },
            (None, None) => {},
            _ => {
                return Err(ApiError::from((
                    ApiErrorKind::ValidationFailed,
                    "disk size and unit must be given together"
                )));
            }
        }

        Ok(())
    }

    fn has_work(&self) -> bool {
        self.name.is_some() || self.size.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDisks {
    pub source_id: ids::DiskId,
    pub target_id: ids::DiskId,
}

impl Validator for MergeDisks {
    fn validate(&self) -> Result<(), ApiError> {
        if self.source_id == self.target_id {
            return Err(ApiError::from((ApiErrorKind::ValidationFailed, "cannot merge a disk into itself")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disk_from_json() {
        let disk: Disk = serde_json::from_str(r#"{
            "id": "d1",
            "name": "Work",
            "usage": { "used": 1.5, "total": 10, "unit": "GB" },
            "createdAt": "2024-03-01T10:00:00Z"
        }"#).unwrap();

        assert!(disk.files.is_none());
        assert_eq!(disk.usage.unit, SizeUnit::GB);
        assert_eq!(disk.usage.used_bytes(), SizeUnit::MB.to_bytes(1536.0));
    }

    #[test]
    fn update_disk_body() {
        let rename = UpdateDisk {
            name: Some("Archive".into()),
            ..Default::default()
        };

        assert!(rename.assert_ok().is_ok());
        assert_eq!(serde_json::to_string(&rename).unwrap(), r#"{"name":"Archive"}"#);

        let half = UpdateDisk {
            size: Some(4.0),
            ..Default::default()
        };

        assert!(half.validate().is_err());
        assert!(UpdateDisk::default().assert_ok().is_err());
    }

    #[test]
    fn create_disk_validation() {
        let bad_unit = CreateDisk { name: "Work".into(), size: 10.0, unit: SizeUnit::KB };
        let bad_name = CreateDisk { name: " ".into(), size: 10.0, unit: SizeUnit::GB };
        let good = CreateDisk { name: "Work".into(), size: 10.0, unit: SizeUnit::GB };

        assert!(bad_unit.validate().is_err());
        assert!(bad_name.validate().is_err());
        assert!(good.validate().is_ok());
    }
}
