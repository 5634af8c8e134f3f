use crate::client::error::RequestError;
use crate::client::{ApiClient, json_response};
use crate::users::{UserProfile, UserSettings};

pub struct RetrieveProfile {}

impl RetrieveProfile {
    pub fn new() -> Self {
        RetrieveProfile {}
    }

    pub async fn send(self, client: &ApiClient) -> Result<UserProfile, RequestError> {
        let res = client.get(&["users", "me"])?.send().await?;

        json_response(res).await
    }
}

pub struct UpdateSettings {
    body: UserSettings
}

impl UpdateSettings {
    pub fn new(body: UserSettings) -> Self {
        UpdateSettings { body }
    }

    pub async fn send(self, client: &ApiClient) -> Result<UserSettings, RequestError> {
        let res = client.put(&["users", "me", "settings"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}
