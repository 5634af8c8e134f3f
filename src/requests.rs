//! Storage quota requests. Users submit them, admins approve or reject.

use std::sync::Arc;

use nimbus_lib::size::SizeUnit;
use nimbus_api::Validator;
use nimbus_api::users::Quota;
use nimbus_api::requests::{StorageRequest, CreateStorageRequest, UpdateRequestStatus, RequestStatus};

use crate::error;
use crate::remote::Remote;

pub struct StorageRequests<R> {
    remote: Arc<R>,
}

impl<R> Clone for StorageRequests<R> {
    fn clone(&self) -> Self {
        StorageRequests {
            remote: self.remote.clone(),
        }
    }
}

impl<R> StorageRequests<R>
where
    R: Remote
{
    pub fn new(remote: Arc<R>) -> Self {
        StorageRequests { remote }
    }

    /// own requests for users, every request for admins
    pub async fn list(&self) -> error::Result<Vec<StorageRequest>> {
        Ok(self.remote.list_storage_requests().await?)
    }

    pub async fn submit(&self, total: f64, unit: SizeUnit, reason: Option<String>) -> error::Result<StorageRequest> {
        let body = CreateStorageRequest {
            requested: Quota { total, unit },
            reason: reason.filter(|r| !r.trim().is_empty()),
        };

        body.validate()?;

        let created = self.remote.create_storage_request(body).await?;

        tracing::info!("submitted storage request {} for {} {}", created.id, total, unit);

        Ok(created)
    }

    pub async fn set_status(&self, id: &str, status: RequestStatus) -> error::Result<StorageRequest> {
        UpdateRequestStatus { status }.validate()?;

        Ok(self.remote.set_storage_request_status(id, status).await?)
    }
}

#[cfg(test)]
mod test {
    use crate::error::ErrorKind;
    use crate::remote::mock::MockRemote;

    use super::*;

    #[tokio::test]
    async fn submit_and_approve() {
        let remote = Arc::new(MockRemote::new(10.0, SizeUnit::GB));
        let requests = StorageRequests::new(remote.clone());

        let created = requests.submit(20.0, SizeUnit::GB, Some(String::from("photos"))).await.unwrap();

        assert_eq!(created.status, RequestStatus::Pending);
        assert_eq!(requests.list().await.unwrap().len(), 1);

        let updated = requests.set_status(&created.id, RequestStatus::Approved).await.unwrap();

        assert_eq!(updated.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn local_validation_sends_nothing() {
        let remote = Arc::new(MockRemote::new(10.0, SizeUnit::GB));
        let requests = StorageRequests::new(remote.clone());

        let err = requests.submit(0.0, SizeUnit::GB, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = requests.submit(5.0, SizeUnit::KB, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = requests.set_status("r1", RequestStatus::Pending).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_rejections_pass_through() {
        let remote = Arc::new(MockRemote::new(10.0, SizeUnit::GB));
        let requests = StorageRequests::new(remote.clone());

        requests.submit(20.0, SizeUnit::GB, None).await.unwrap();

        let err = requests.submit(30.0, SizeUnit::GB, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "A pending request already exists");

        let err = requests.set_status("missing", RequestStatus::Rejected).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
