use nimbus_lib::ids;

use crate::client::error::RequestError;
use crate::client::{ApiClient, json_response};
use crate::Validator;
use crate::requests::{
    CreateStorageRequest as CreateBody,
    UpdateRequestStatus,
    RequestStatus,
    StorageRequest,
};

pub struct QueryStorageRequests {}

impl QueryStorageRequests {
    pub fn new() -> Self {
        QueryStorageRequests {}
    }

    pub async fn send(self, client: &ApiClient) -> Result<Vec<StorageRequest>, RequestError> {
        let res = client.get(&["storage-requests"])?.send().await?;

        json_response(res).await
    }
}

pub struct CreateStorageRequest {
    body: CreateBody
}

impl CreateStorageRequest {
    pub fn new(body: CreateBody) -> Self {
        CreateStorageRequest { body }
    }

    pub async fn send(self, client: &ApiClient) -> Result<StorageRequest, RequestError> {
        self.body.assert_ok()?;

        let res = client.post(&["storage-requests"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

pub struct SetRequestStatus {
    id: ids::StorageRequestId,
    body: UpdateRequestStatus,
}

impl SetRequestStatus {
    pub fn new(id: ids::StorageRequestId, status: RequestStatus) -> Self {
        SetRequestStatus {
            id,
            body: UpdateRequestStatus { status }
        }
    }

    pub async fn send(self, client: &ApiClient) -> Result<StorageRequest, RequestError> {
        self.body.assert_ok()?;

        let res = client.patch(&["storage-requests", self.id.as_str(), "status"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}
