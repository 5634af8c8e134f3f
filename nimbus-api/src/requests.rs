use nimbus_lib::ids;
use nimbus_lib::validation::{text_valid, MAX_REASON_CHARS};

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::{ApiError, ApiErrorKind, Validator};
use crate::users::Quota;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// a user asking an admin for a larger storage quota
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRequest {
    pub id: ids::StorageRequestId,
    pub user_id: ids::UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub requested: Quota,
    #[serde(default)]
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateStorageRequest {
    pub requested: Quota,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validator for CreateStorageRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if !self.requested.unit.is_disk_unit() || self.requested.total_bytes() == 0 {
            return Err(ApiError::from((
                ApiErrorKind::ValidationFailed,
                "requested quota must be a positive amount of MB, GB or TB"
            )));
        }

        if let Some(reason) = &self.reason {
            if !text_valid(reason, MAX_REASON_CHARS) {
                return Err(ApiError::from((ApiErrorKind::ValidationFailed, "reason is invalid or too long")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRequestStatus {
    pub status: RequestStatus,
}

impl Validator for UpdateRequestStatus {
    fn validate(&self) -> Result<(), ApiError> {
        if self.status == RequestStatus::Pending {
            return Err(ApiError::from((ApiErrorKind::ValidationFailed, "a request can only be approved or rejected")));
        }

        Ok(())
    }
}
