//! In memory backend used by tests. Enforces the same rules the real server
//! does (quota, disk capacity, sibling names, moves into a subtree) and can
//! be told to delay or fail calls.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nimbus_lib::ids;
use nimbus_lib::fs::FileType;
use nimbus_lib::size::SizeUnit;
use nimbus_api::{ApiError, ApiErrorKind};
use nimbus_api::client::error::RequestError;
use nimbus_api::disks::{Disk, Usage, CreateDisk, UpdateDisk};
use nimbus_api::files::{FileItem, CreateFile, Destination};
use nimbus_api::users::{UserProfile, UserSettings, Quota, Role};
use nimbus_api::requests::{StorageRequest, CreateStorageRequest, RequestStatus};

use super::{Remote, UploadBody, UploadSource, ProgressFn};

struct MockDisk {
    id: ids::DiskId,
    name: String,
    total: f64,
    unit: SizeUnit,
    created_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct State {
    profile: Option<UserProfile>,
    disks: Vec<MockDisk>,
    files: Vec<FileItem>,
    requests: Vec<StorageRequest>,
    next_id: u64,
    fail_next: Option<ApiError>,
    fail_calls: HashMap<String, ApiError>,
    search_delays: HashMap<String, Duration>,
    upload_delay: Option<Duration>,
    uploading: usize,
    max_uploading: usize,
    settings_puts: usize,
    calls: Vec<String>,
}

pub struct MockRemote {
    state: Mutex<State>,
}

fn reject(status: u16, msg: &str) -> RequestError {
    RequestError::Api(
        ApiError::from(ApiErrorKind::from_status(status))
            .with_status(status)
            .with_message(msg)
    )
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;

        format!("{prefix}{}", self.next_id)
    }

    fn disk(&self, id: &str) -> Result<&MockDisk, RequestError> {
        self.disks.iter()
            .find(|disk| disk.id == id)
            .ok_or_else(|| reject(404, "Disk not found"))
    }

    fn file(&self, id: &str) -> Result<&FileItem, RequestError> {
        self.files.iter()
            .find(|file| file.id == id)
            .ok_or_else(|| reject(404, "File not found"))
    }

    fn used(&self, disk_id: &str) -> u64 {
        self.files.iter()
            .filter(|file| file.disk_id == disk_id)
            .map(|file| file.size_bytes())
            .sum()
    }

    fn to_disk(&self, disk: &MockDisk, with_files: bool) -> Disk {
        let used = self.used(&disk.id);

        Disk {
            id: disk.id.clone(),
            name: disk.name.clone(),
            files: with_files.then(|| self.listing(&disk.id, None)),
            usage: Usage {
                used: disk.unit.from_bytes(used),
                total: disk.total,
                unit: disk.unit,
            },
            created_at: disk.created_at,
        }
    }

    fn listing(&self, disk_id: &str, parent_id: Option<&str>) -> Vec<FileItem> {
        self.files.iter()
            .filter(|file| file.disk_id == disk_id && file.parent_id.as_deref() == parent_id)
            .cloned()
            .collect()
    }

    fn quota_bytes(&self) -> u64 {
        self.profile.as_ref()
            .map(|p| p.quota.total_bytes())
            .unwrap_or(u64::MAX)
    }

    fn allocated_except(&self, disk_id: Option<&str>) -> u64 {
        self.disks.iter()
            .filter(|disk| Some(disk.id.as_str()) != disk_id)
            .map(|disk| disk.unit.to_bytes(disk.total))
            .sum()
    }

    fn check_destination(&self, disk_id: &str, parent_id: Option<&str>) -> Result<(), RequestError> {
        self.disk(disk_id)?;

        if let Some(parent_id) = parent_id {
            let parent = self.file(parent_id)?;

            if !parent.is_folder || parent.disk_id != disk_id {
                return Err(reject(400, "Parent must be a folder on the same disk"));
            }
        }

        Ok(())
    }

    fn check_name(&self, disk_id: &str, parent_id: Option<&str>, name: &str, ignore: Option<&str>) -> Result<(), RequestError> {
        let taken = self.files.iter()
            .filter(|file| file.disk_id == disk_id && file.parent_id.as_deref() == parent_id)
            .filter(|file| Some(file.id.as_str()) != ignore)
            .any(|file| file.name.to_lowercase() == name.to_lowercase());

        if taken {
            Err(reject(409, "A file with this name already exists"))
        } else {
            Ok(())
        }
    }

    fn check_space(&self, disk_id: &str, adding: u64) -> Result<(), RequestError> {
        let disk = self.disk(disk_id)?;

        if self.used(disk_id) + adding > disk.unit.to_bytes(disk.total) {
            Err(reject(409, "Not enough space on disk"))
        } else {
            Ok(())
        }
    }

    fn subtree(&self, id: &str) -> Vec<ids::FileId> {
        let mut rtn = vec![id.to_owned()];
        let mut index = 0;

        while index < rtn.len() {
            let current = rtn[index].clone();

            for file in &self.files {
                if file.parent_id.as_deref() == Some(current.as_str()) {
                    rtn.push(file.id.clone());
                }
            }

            index += 1;
        }

        rtn
    }

    fn subtree_bytes(&self, id: &str) -> u64 {
        self.subtree(id).iter()
            .filter_map(|sub| self.files.iter().find(|f| f.id == *sub))
            .map(|f| f.size_bytes())
            .sum()
    }

    /// nested copy of a stored entry, children included for folders
    fn nested(&self, id: &str) -> Option<FileItem> {
        let mut item = self.files.iter().find(|f| f.id == id)?.clone();

        if item.is_folder {
            let children = self.files.iter()
                .filter(|f| f.parent_id.as_deref() == Some(id))
                .map(|f| f.id.clone())
                .collect::<Vec<_>>();

            item.children = Some(children.iter().filter_map(|c| self.nested(c)).collect());
        }

        Some(item)
    }

    fn duplicate(&mut self, id: &str, disk_id: &str, parent_id: Option<&str>) -> ids::FileId {
        let Some(source) = self.files.iter().find(|f| f.id == id).cloned() else {
            return String::new();
        };

        let new_id = self.next_id("f");
        let children: Vec<ids::FileId> = self.files.iter()
            .filter(|f| f.parent_id.as_deref() == Some(id))
            .map(|f| f.id.clone())
            .collect();

        self.files.push(FileItem {
            id: new_id.clone(),
            parent_id: parent_id.map(|p| p.to_owned()),
            disk_id: disk_id.to_owned(),
            created_at: Utc::now(),
            modified_at: Utc::now(),
            children: None,
            ..source
        });

        for child in children {
            self.duplicate(&child, disk_id, Some(&new_id));
        }

        new_id
    }
}

impl MockRemote {
    /// a backend with one user holding the given quota
    pub fn new(quota: f64, unit: SizeUnit) -> Self {
        let state = State {
            profile: Some(UserProfile {
                id: String::from("u1"),
                username: String::from("tester"),
                role: Role::Admin,
                quota: Quota { total: quota, unit },
                settings: UserSettings::default(),
            }),
            ..Default::default()
        };

        MockRemote {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// records the call and hands out a queued failure if there is one
    fn enter(&self, call: &str) -> Result<(), RequestError> {
        let mut state = self.lock();

        state.calls.push(call.to_owned());

        if let Some(err) = state.fail_calls.remove(call) {
            return Err(RequestError::Api(err));
        }

        match state.fail_next.take() {
            Some(err) => Err(RequestError::Api(err)),
            None => Ok(())
        }
    }

    pub fn seed_disk(&self, name: &str, total: f64, unit: SizeUnit) -> ids::DiskId {
        let mut state = self.lock();
        let id = state.next_id("d");

        state.disks.push(MockDisk {
            id: id.clone(),
            name: name.to_owned(),
            total,
            unit,
            created_at: Utc::now(),
        });

        id
    }

    pub fn seed_folder(&self, disk_id: &str, parent_id: Option<&str>, name: &str) -> ids::FileId {
        self.seed(disk_id, parent_id, name, FileType::Folder, 0.0, SizeUnit::B)
    }

    pub fn seed_file(&self, disk_id: &str, parent_id: Option<&str>, name: &str, size: f64, unit: SizeUnit) -> ids::FileId {
        self.seed(disk_id, parent_id, name, FileType::from_name(name), size, unit)
    }

    fn seed(&self, disk_id: &str, parent_id: Option<&str>, name: &str, file_type: FileType, size: f64, unit: SizeUnit) -> ids::FileId {
        let mut state = self.lock();
        let id = state.next_id("f");

        state.files.push(FileItem {
            id: id.clone(),
            name: name.to_owned(),
            is_folder: file_type == FileType::Folder,
            file_type,
            parent_id: parent_id.map(|p| p.to_owned()),
            disk_id: disk_id.to_owned(),
            size,
            size_unit: unit,
            url: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
            children: None,
        });

        id
    }

    /// removes an entry behind the client's back
    pub fn remove_external(&self, id: &str) {
        let mut state = self.lock();
        let subtree = state.subtree(id);

        state.files.retain(|f| !subtree.contains(&f.id));
    }

    pub fn fail_next(&self, status: u16, msg: &str) {
        let mut state = self.lock();

        state.fail_next = match reject(status, msg) {
            RequestError::Api(err) => Some(err),
            _ => None,
        };
    }

    /// fails the next request made to `call`, leaving other calls alone
    pub fn fail_call(&self, call: &str, status: u16, msg: &str) {
        if let RequestError::Api(err) = reject(status, msg) {
            self.lock().fail_calls.insert(call.to_owned(), err);
        }
    }

    pub fn delay_search(&self, query: &str, delay: Duration) {
        self.lock().search_delays.insert(query.to_owned(), delay);
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.lock().upload_delay = Some(delay);
    }

    pub fn max_parallel_uploads(&self) -> usize {
        self.lock().max_uploading
    }

    pub fn settings_puts(&self) -> usize {
        self.lock().settings_puts
    }

    pub fn stored_settings(&self) -> UserSettings {
        self.lock().profile.as_ref()
            .map(|p| p.settings.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == name).count()
    }

    pub fn used_bytes(&self, disk_id: &str) -> u64 {
        self.lock().used(disk_id)
    }

    pub fn has_file(&self, id: &str) -> bool {
        self.lock().file(id).is_ok()
    }

    pub fn file_parent(&self, id: &str) -> Option<Option<ids::FileId>> {
        self.lock().file(id).ok().map(|f| f.parent_id.clone())
    }
}

#[async_trait]
impl Remote for MockRemote {
    async fn list_disks(&self) -> Result<Vec<Disk>, RequestError> {
        self.enter("list_disks")?;

        let state = self.lock();

        Ok(state.disks.iter().map(|disk| state.to_disk(disk, true)).collect())
    }

    async fn profile(&self) -> Result<UserProfile, RequestError> {
        self.enter("profile")?;

        self.lock().profile.clone().ok_or_else(|| reject(401, "Not authenticated"))
    }

    async fn create_disk(&self, body: CreateDisk) -> Result<Disk, RequestError> {
        self.enter("create_disk")?;

        let mut state = self.lock();

        if state.disks.iter().any(|d| d.name.to_lowercase() == body.name.to_lowercase()) {
            return Err(reject(409, "Disk name already exists"));
        }

        if state.allocated_except(None) + body.unit.to_bytes(body.size) > state.quota_bytes() {
            return Err(reject(409, "Storage quota exceeded"));
        }

        let id = state.next_id("d");
        let disk = MockDisk {
            id,
            name: body.name,
            total: body.size,
            unit: body.unit,
            created_at: Utc::now(),
        };
        let rtn = state.to_disk(&disk, true);

        state.disks.push(disk);

        Ok(rtn)
    }

    async fn update_disk(&self, id: &str, body: UpdateDisk) -> Result<Disk, RequestError> {
        self.enter("update_disk")?;

        let mut state = self.lock();

        state.disk(id)?;

        if let Some(name) = &body.name {
            if state.disks.iter().any(|d| d.id != id && d.name.to_lowercase() == name.to_lowercase()) {
                return Err(reject(409, "Disk name already exists"));
            }
        }

        if let (Some(size), Some(unit)) = (body.size, body.unit) {
            let bytes = unit.to_bytes(size);

            if bytes < state.used(id) {
                return Err(reject(409, "Disk size cannot be smaller than used space"));
            }

            if state.allocated_except(Some(id)) + bytes > state.quota_bytes() {
                return Err(reject(409, "Storage quota exceeded"));
            }
        }

        let Some(index) = state.disks.iter().position(|d| d.id == id) else {
            return Err(reject(404, "Disk not found"));
        };

        if let Some(name) = body.name {
            state.disks[index].name = name;
        }

        if let (Some(size), Some(unit)) = (body.size, body.unit) {
            state.disks[index].total = size;
            state.disks[index].unit = unit;
        }

        Ok(state.to_disk(&state.disks[index], false))
    }

    async fn format_disk(&self, id: &str) -> Result<Disk, RequestError> {
        self.enter("format_disk")?;

        let mut state = self.lock();

        state.disk(id)?;
        state.files.retain(|f| f.disk_id != id);

        Ok(state.to_disk(state.disk(id)?, true))
    }

    async fn delete_disk(&self, id: &str) -> Result<(), RequestError> {
        self.enter("delete_disk")?;

        let mut state = self.lock();

        state.disk(id)?;
        state.files.retain(|f| f.disk_id != id);
        state.disks.retain(|d| d.id != id);

        Ok(())
    }

    async fn merge_disks(&self, source_id: &str, target_id: &str) -> Result<Disk, RequestError> {
        self.enter("merge_disks")?;

        let mut state = self.lock();

        state.disk(source_id)?;
        state.check_space(target_id, state.used(source_id))?;

        for file in state.files.iter_mut() {
            if file.disk_id == source_id {
                file.disk_id = target_id.to_owned();
            }
        }

        state.disks.retain(|d| d.id != source_id);

        Ok(state.to_disk(state.disk(target_id)?, true))
    }

    async fn list_files(&self, disk_id: &str, parent_id: Option<&str>) -> Result<Vec<FileItem>, RequestError> {
        self.enter("list_files")?;

        let state = self.lock();

        state.check_destination(disk_id, parent_id)?;

        Ok(state.listing(disk_id, parent_id))
    }

    async fn create_file(&self, body: CreateFile) -> Result<FileItem, RequestError> {
        self.enter("create_file")?;

        let mut state = self.lock();

        state.check_destination(&body.disk_id, body.parent_id.as_deref())?;
        state.check_name(&body.disk_id, body.parent_id.as_deref(), &body.name, None)?;

        let size = body.content.as_ref().map(|c| c.len() as u64).unwrap_or(0);

        state.check_space(&body.disk_id, size)?;

        let id = state.next_id("f");
        let item = FileItem {
            id,
            is_folder: body.file_type == FileType::Folder,
            file_type: body.file_type,
            name: body.name,
            parent_id: body.parent_id,
            disk_id: body.disk_id,
            size: size as f64,
            size_unit: SizeUnit::B,
            url: body.url.or(body.content),
            created_at: Utc::now(),
            modified_at: Utc::now(),
            children: None,
        };

        state.files.push(item.clone());

        Ok(item)
    }

    async fn rename_file(&self, id: &str, name: &str) -> Result<FileItem, RequestError> {
        self.enter("rename_file")?;

        let mut state = self.lock();
        let file = state.file(id)?.clone();

        state.check_name(&file.disk_id, file.parent_id.as_deref(), name, Some(id))?;

        let Some(stored) = state.files.iter_mut().find(|f| f.id == id) else {
            return Err(reject(404, "File not found"));
        };

        stored.name = name.to_owned();
        stored.modified_at = Utc::now();

        Ok(stored.clone())
    }

    async fn move_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError> {
        self.enter("move_file")?;

        let mut state = self.lock();
        let file = state.file(id)?.clone();

        state.check_destination(&dest.disk_id, dest.parent_id.as_deref())?;

        let subtree = state.subtree(id);

        if let Some(parent_id) = &dest.parent_id {
            if subtree.contains(parent_id) {
                return Err(reject(400, "Cannot move a folder into itself"));
            }
        }

        state.check_name(&dest.disk_id, dest.parent_id.as_deref(), &file.name, Some(id))?;

        if dest.disk_id != file.disk_id {
            state.check_space(&dest.disk_id, state.subtree_bytes(id))?;
        }

        for stored in state.files.iter_mut() {
            if subtree.contains(&stored.id) {
                stored.disk_id = dest.disk_id.clone();
            }

            if stored.id == id {
                stored.parent_id = dest.parent_id.clone();
                stored.modified_at = Utc::now();
            }
        }

        Ok(state.file(id)?.clone())
    }

    async fn copy_file(&self, id: &str, dest: Destination) -> Result<FileItem, RequestError> {
        self.enter("copy_file")?;

        let mut state = self.lock();
        let file = state.file(id)?.clone();

        state.check_destination(&dest.disk_id, dest.parent_id.as_deref())?;

        if let Some(parent_id) = &dest.parent_id {
            if state.subtree(id).contains(parent_id) {
                return Err(reject(400, "Cannot copy a folder into itself"));
            }
        }

        state.check_name(&dest.disk_id, dest.parent_id.as_deref(), &file.name, None)?;
        state.check_space(&dest.disk_id, state.subtree_bytes(id))?;

        let new_id = state.duplicate(id, &dest.disk_id, dest.parent_id.as_deref());

        state.nested(&new_id).ok_or_else(|| reject(500, "copy failed"))
    }

    async fn delete_file(&self, id: &str) -> Result<(), RequestError> {
        self.enter("delete_file")?;

        let mut state = self.lock();

        state.file(id)?;

        let subtree = state.subtree(id);

        state.files.retain(|f| !subtree.contains(&f.id));

        Ok(())
    }

    async fn upload_file(&self, body: UploadBody, progress: ProgressFn) -> Result<FileItem, RequestError> {
        self.enter("upload_file")?;

        let delay = {
            let mut state = self.lock();

            state.uploading += 1;
            state.max_uploading = usize::max(state.max_uploading, state.uploading);
            state.upload_delay
        };

        let sent = match &body.source {
            UploadSource::Bytes(bytes) => bytes.len() as u64,
            UploadSource::Path(_) => body.total_bytes,
        };

        progress(sent / 2);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        progress(sent);

        let mut state = self.lock();

        state.uploading -= 1;
        state.check_destination(&body.disk_id, body.parent_id.as_deref())?;
        state.check_name(&body.disk_id, body.parent_id.as_deref(), &body.file_name, None)?;
        state.check_space(&body.disk_id, sent)?;

        let id = state.next_id("f");
        let unit = SizeUnit::best_fit(sent);
        let item = FileItem {
            url: Some(format!("/content/{id}")),
            id,
            is_folder: false,
            file_type: FileType::from_name(&body.file_name),
            name: body.file_name,
            parent_id: body.parent_id,
            disk_id: body.disk_id,
            size: unit.from_bytes(sent),
            size_unit: unit,
            created_at: Utc::now(),
            modified_at: Utc::now(),
            children: None,
        };

        state.files.push(item.clone());

        Ok(item)
    }

    async fn search(&self, query: &str) -> Result<Vec<FileItem>, RequestError> {
        self.enter(&format!("search:{query}"))?;

        let delay = self.lock().search_delays.get(query).cloned();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let needle = query.to_lowercase();
        let state = self.lock();

        Ok(state.files.iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn put_settings(&self, settings: UserSettings) -> Result<UserSettings, RequestError> {
        self.enter("put_settings")?;

        let mut state = self.lock();

        state.settings_puts += 1;

        if let Some(profile) = state.profile.as_mut() {
            profile.settings = settings.clone();
        }

        Ok(settings)
    }

    async fn list_storage_requests(&self) -> Result<Vec<StorageRequest>, RequestError> {
        self.enter("list_storage_requests")?;

        Ok(self.lock().requests.clone())
    }

    async fn create_storage_request(&self, body: CreateStorageRequest) -> Result<StorageRequest, RequestError> {
        self.enter("create_storage_request")?;

        let mut state = self.lock();

        if state.requests.iter().any(|r| r.status == RequestStatus::Pending) {
            return Err(reject(409, "A pending request already exists"));
        }

        let id = state.next_id("r");
        let (user_id, username) = state.profile.as_ref()
            .map(|p| (p.id.clone(), Some(p.username.clone())))
            .unwrap_or_default();
        let request = StorageRequest {
            id,
            user_id,
            username,
            requested: body.requested,
            reason: body.reason,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };

        state.requests.push(request.clone());

        Ok(request)
    }

    async fn set_storage_request_status(&self, id: &str, status: RequestStatus) -> Result<StorageRequest, RequestError> {
        self.enter("set_storage_request_status")?;

        let mut state = self.lock();
        let Some(index) = state.requests.iter().position(|r| r.id == id) else {
            return Err(reject(404, "Request not found"));
        };

        if state.requests[index].status != RequestStatus::Pending {
            return Err(reject(409, "Request was already handled"));
        }

        state.requests[index].status = status;

        if status == RequestStatus::Approved {
            let requested = state.requests[index].requested.clone();

            if let Some(profile) = state.profile.as_mut() {
                profile.quota = requested;
            }
        }

        Ok(state.requests[index].clone())
    }
}
