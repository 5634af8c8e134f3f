use nimbus_lib::ids;
use nimbus_lib::size::SizeUnit;

use crate::client::error::RequestError;
use crate::client::{ApiClient, json_response, empty_response};
use crate::Validator;
use crate::disks::{
    CreateDisk as CreateDiskBody,
    UpdateDisk as UpdateDiskBody,
    MergeDisks as MergeDisksBody,
    Disk,
};

pub struct QueryDisks {}

impl QueryDisks {
    pub fn new() -> Self {
        QueryDisks {}
    }

    pub async fn send(self, client: &ApiClient) -> Result<Vec<Disk>, RequestError> {
        let res = client.get(&["disks"])?.send().await?;

        json_response(res).await
    }
}

pub struct CreateDisk {
    body: CreateDiskBody
}

impl CreateDisk {
    pub fn new<N>(name: N, size: f64, unit: SizeUnit) -> Self
    where
        N: Into<String>
    {
        CreateDisk {
            body: CreateDiskBody {
                name: name.into(),
                size,
                unit,
            }
        }
    }

    pub fn body(&self) -> &CreateDiskBody {
        &self.body
    }

    pub async fn send(self, client: &ApiClient) -> Result<Disk, RequestError> {
        self.body.assert_ok()?;

        let res = client.post(&["disks"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

pub struct UpdateDisk {
    id: ids::DiskId,
    body: UpdateDiskBody
}

impl UpdateDisk {
    pub fn id(id: ids::DiskId) -> Self {
        UpdateDisk {
            id,
            body: UpdateDiskBody::default()
        }
    }

    pub fn name<N>(&mut self, name: N) -> &mut Self
    where
        N: Into<String>
    {
        self.body.name = Some(name.into());
        self
    }

    pub fn size(&mut self, size: f64, unit: SizeUnit) -> &mut Self {
        self.body.size = Some(size);
        self.body.unit = Some(unit);
        self
    }

    pub async fn send(self, client: &ApiClient) -> Result<Disk, RequestError> {
        self.body.assert_ok()?;

        let res = client.patch(&["disks", self.id.as_str()])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}

impl From<(ids::DiskId, UpdateDiskBody)> for UpdateDisk {
    fn from((id, body): (ids::DiskId, UpdateDiskBody)) -> Self {
        UpdateDisk { id, body }
    }
}

pub struct FormatDisk {
    id: ids::DiskId
}

impl FormatDisk {
    pub fn id(id: ids::DiskId) -> Self {
        FormatDisk { id }
    }

    pub async fn send(self, client: &ApiClient) -> Result<Disk, RequestError> {
        let res = client.post(&["disks", self.id.as_str(), "format"])?
            .send()
            .await?;

        json_response(res).await
    }
}

pub struct DeleteDisk {
    id: ids::DiskId
}

impl DeleteDisk {
    pub fn id(id: ids::DiskId) -> Self {
        DeleteDisk { id }
    }

    pub async fn send(self, client: &ApiClient) -> Result<(), RequestError> {
        let res = client.delete(&["disks", self.id.as_str()])?
            .send()
            .await?;

        empty_response(res).await
    }
}

pub struct MergeDisks {
    body: MergeDisksBody
}

impl MergeDisks {
    /// moves everything on `source` into `target` and removes `source`
    pub fn new(source_id: ids::DiskId, target_id: ids::DiskId) -> Self {
        MergeDisks {
            body: MergeDisksBody {
                source_id,
                target_id,
            }
        }
    }

    pub async fn send(self, client: &ApiClient) -> Result<Disk, RequestError> {
        self.body.assert_ok()?;

        let res = client.post(&["disks", "merge"])?
            .json(&self.body)
            .send()
            .await?;

        json_response(res).await
    }
}
