use nimbus_lib::ids;
use nimbus_lib::size::SizeUnit;
use nimbus_lib::disk::{fits_quota, disk_size_valid};
use nimbus_api::Validator;
use nimbus_api::disks::{Disk, CreateDisk, UpdateDisk};

use crate::error::{self, Error};
use crate::remote::Remote;

use super::{FileStore, DiskEntry, Navigation, State};

impl State {
    fn check_disk_name(&self, name: &str, ignore: Option<&str>) -> error::Result<()> {
        let taken = self.disks.iter()
            .filter(|disk| Some(disk.id.as_str()) != ignore)
            .any(|disk| disk.name.to_lowercase() == name.to_lowercase());

        if taken {
            Err(Error::conflict("Disk name already exists"))
        } else {
            Ok(())
        }
    }

    /// fails if giving a disk `total` bytes would push the allocation past
    /// the quota. skipped while the profile is unknown, the backend checks
    /// again either way.
    fn check_quota(&self, total: u64, ignore: Option<&str>) -> error::Result<()> {
        let Some(profile) = &self.profile else {
            return Ok(());
        };

        if fits_quota(self.allocated(ignore), total, profile.quota.total_bytes()) {
            Ok(())
        } else {
            Err(Error::conflict("Storage quota exceeded"))
        }
    }

    /// swaps in the confirmed state of a disk. the cached root listing is
    /// only replaced when the response carries one.
    fn apply_disk(&mut self, disk: Disk) -> DiskEntry {
        let entry = DiskEntry::from_disk(&disk);

        match self.disk_mut(&disk.id) {
            Some(existing) => *existing = entry.clone(),
            None => self.disks.push(entry.clone()),
        }

        if let Some(files) = disk.files {
            self.tree.remove_disk(&disk.id);
            self.tree.set_listing(&disk.id, None, files);
        }

        entry
    }

    fn forget_disk(&mut self, id: &str) {
        self.disks.retain(|disk| disk.id != id);
        self.tree.remove_disk(id);
    }
}

impl<R> FileStore<R>
where
    R: Remote
{
    pub async fn create_disk(&self, name: &str, size: f64, unit: SizeUnit) -> error::Result<DiskEntry> {
        let body = CreateDisk {
            name: name.to_owned(),
            size,
            unit,
        };

        body.validate()?;

        {
            let state = self.lock();

            state.check_disk_name(name, None)?;
            state.check_quota(unit.to_bytes(size), None)?;
        }

        let mut created = self.remote.create_disk(body).await?;

        // a new disk is empty even if the response leaves the listing out
        created.files.get_or_insert_with(Vec::new);

        let entry = self.lock().apply_disk(created);

        tracing::info!("created disk {} \"{}\"", entry.id, entry.name);

        Ok(entry)
    }

    pub async fn resize_disk(&self, id: &str, size: f64, unit: SizeUnit) -> error::Result<DiskEntry> {
        if !disk_size_valid(size, unit) {
            return Err(Error::validation("disk size must be a positive amount of MB, GB or TB"));
        }

        let total = unit.to_bytes(size);

        {
            let state = self.lock();
            let disk = state.require_disk(id)?;

            if total < disk.used {
                return Err(Error::conflict("Disk size cannot be smaller than used space"));
            }

            state.check_quota(total, Some(id))?;
        }

        let body = UpdateDisk {
            size: Some(size),
            unit: Some(unit),
            ..Default::default()
        };

        self.update_disk(id, body).await
    }

    pub async fn rename_disk(&self, id: &str, name: &str) -> error::Result<DiskEntry> {
        let body = UpdateDisk {
            name: Some(name.to_owned()),
            ..Default::default()
        };

        body.assert_ok()?;

        {
            let state = self.lock();

            state.require_disk(id)?;
            state.check_disk_name(name, Some(id))?;
        }

        self.update_disk(id, body).await
    }

    async fn update_disk(&self, id: &str, body: UpdateDisk) -> error::Result<DiskEntry> {
        let mut updated = self.remote.update_disk(id, body).await?;

        // a resize or rename does not touch the entries of the disk
        updated.files = None;

        let mut state = self.lock();

        state.require_disk(id)?;

        Ok(state.apply_disk(updated))
    }

    /// removes every entry of a disk while keeping the disk itself
    pub async fn format_disk(&self, id: &str) -> error::Result<DiskEntry> {
        self.lock().require_disk(id)?;

        let mut formatted = self.remote.format_disk(id).await?;

        formatted.files = Some(formatted.files.unwrap_or_default());

        let mut state = self.lock();
        let entry = state.apply_disk(formatted);

        state.prune_clipboard();
        state.resync_nav();

        tracing::info!("formatted disk {id}");

        Ok(entry)
    }

    pub async fn delete_disk(&self, id: &str) -> error::Result<()> {
        self.lock().require_disk(id)?;

        self.remote.delete_disk(id).await?;

        let mut state = self.lock();

        state.forget_disk(id);
        state.prune_clipboard();
        state.resync_nav();

        tracing::info!("deleted disk {id}");

        Ok(())
    }

    /// moves everything on `source_id` into `target_id` and removes the
    /// source disk. the target must have room for the used space of the
    /// source.
    pub async fn merge_disk(&self, source_id: &str, target_id: &str) -> error::Result<DiskEntry> {
        if source_id == target_id {
            return Err(Error::validation("cannot merge a disk into itself"));
        }

        {
            let state = self.lock();
            let source = state.require_disk(source_id)?;
            let target = state.require_disk(target_id)?;

            if target.free() < source.used {
                return Err(Error::conflict("Not enough space on target disk"));
            }
        }

        let merged = self.remote.merge_disks(source_id, target_id).await?;

        let mut state = self.lock();

        state.forget_disk(source_id);
        state.tree.remove_disk(target_id);

        let entry = state.apply_disk(merged);

        if state.nav.disk_id.as_deref() == Some(source_id) {
            state.nav = Navigation {
                disk_id: Some(entry.id.clone()),
                path: Vec::new(),
            };
        }

        state.prune_clipboard();
        state.resync_nav();

        tracing::info!("merged disk {source_id} into {target_id}");

        Ok(entry)
    }

    /// ids of every disk in the order the backend listed them
    pub fn disk_ids(&self) -> Vec<ids::DiskId> {
        self.lock().disks.iter().map(|disk| disk.id.clone()).collect()
    }
}

#[cfg(test)]
mod test {
    use nimbus_lib::size::{GIBI, MEBI};

    use crate::error::ErrorKind;
    use crate::store::test::setup;

    use super::*;

    #[tokio::test]
    async fn quota_blocks_before_request() {
        let (remote, store) = setup(10.0).await;

        store.fetch_disks().await.unwrap();

        store.create_disk("A", 5.0, SizeUnit::GB).await.unwrap();
        store.create_disk("B", 5.0, SizeUnit::GB).await.unwrap();

        let disks_before = store.disks();
        let quota_before = store.quota();
        let calls = remote.calls().len();

        let err = store.create_disk("C", 1.0, SizeUnit::GB).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Storage quota exceeded");
        assert_eq!(remote.calls().len(), calls);
        assert_eq!(store.disks(), disks_before);
        assert_eq!(store.quota(), quota_before);
    }

    #[tokio::test]
    async fn backend_quota_message_passes_through() {
        let (remote, store) = setup(10.0).await;

        // the client never learned the quota so only the backend can object
        remote.seed_disk("A", 10.0, SizeUnit::GB);

        let err = store.create_disk("C", 1.0, SizeUnit::GB).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Storage quota exceeded");
        assert!(store.disks().is_empty());
    }

    #[tokio::test]
    async fn duplicate_disk_names() {
        let (_remote, store) = setup(10.0).await;

        store.fetch_disks().await.unwrap();
        store.create_disk("Work", 1.0, SizeUnit::GB).await.unwrap();

        let err = store.create_disk("work", 1.0, SizeUnit::GB).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.disks().len(), 1);
    }

    #[tokio::test]
    async fn invalid_sizes() {
        let (remote, store) = setup(10.0).await;

        store.fetch_disks().await.unwrap();

        let calls = remote.calls().len();

        for (size, unit) in [(0.0, SizeUnit::GB), (-1.0, SizeUnit::MB), (10.0, SizeUnit::KB)] {
            let err = store.create_disk("X", size, unit).await.unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        assert_eq!(remote.calls().len(), calls);
    }

    #[tokio::test]
    async fn resize_within_quota() {
        let (remote, store) = setup(10.0).await;

        store.fetch_disks().await.unwrap();

        let a = store.create_disk("A", 5.0, SizeUnit::GB).await.unwrap();

        store.create_disk("B", 5.0, SizeUnit::GB).await.unwrap();

        let err = store.resize_disk(&a.id, 6.0, SizeUnit::GB).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.disk(&a.id).unwrap().total, 5 * GIBI);

        let resized = store.resize_disk(&a.id, 4.0, SizeUnit::GB).await.unwrap();
        assert_eq!(resized.total, 4 * GIBI);

        let quota = store.quota().unwrap();
        assert!(quota.allocated <= quota.total);

        remote.seed_file(&a.id, None, "big.bin", 900.0, SizeUnit::MB);
        store.fetch_disks().await.unwrap();

        let err = store.resize_disk(&a.id, 512.0, SizeUnit::MB).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn rename_keeps_listing() {
        let (remote, store) = setup(10.0).await;
        let disk_id = remote.seed_disk("Work", 1.0, SizeUnit::GB);

        remote.seed_file(&disk_id, None, "a.txt", 1.0, SizeUnit::KB);
        remote.seed_disk("Home", 1.0, SizeUnit::GB);
        store.fetch_disks().await.unwrap();

        let err = store.rename_disk(&disk_id, "HOME").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renamed = store.rename_disk(&disk_id, "Office").await.unwrap();

        assert_eq!(renamed.name, "Office");
        assert_eq!(store.root_items(&disk_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn format_and_delete_reset_state() {
        let (remote, store) = setup(10.0).await;
        let disk_id = remote.seed_disk("Work", 1.0, SizeUnit::GB);
        let docs = remote.seed_folder(&disk_id, None, "Docs");

        remote.seed_file(&disk_id, Some(&docs), "a.bin", 2.0, SizeUnit::MB);
        store.fetch_disks().await.unwrap();
        store.navigate_to_folder(&docs).await.unwrap();
        store.copy_files(&[docs.clone()]).unwrap();

        let formatted = store.format_disk(&disk_id).await.unwrap();

        assert_eq!(formatted.used, 0);
        assert!(store.root_items(&disk_id).unwrap().is_empty());
        assert!(store.current_path().is_empty());
        assert!(store.clipboard().files.is_empty());
        assert!(store.check_integrity().is_ok());

        store.delete_disk(&disk_id).await.unwrap();

        assert!(store.disks().is_empty());
        assert!(store.current_disk().is_none());
        assert!(store.check_integrity().is_ok());
    }

    #[tokio::test]
    async fn merge_moves_entries() {
        let (remote, store) = setup(10.0).await;
        let source = remote.seed_disk("Old", 1.0, SizeUnit::GB);
        let target = remote.seed_disk("New", 2.0, SizeUnit::GB);

        remote.seed_file(&source, None, "a.bin", 2.0, SizeUnit::MB);
        remote.seed_file(&target, None, "b.bin", 1.0, SizeUnit::MB);

        store.fetch_disks().await.unwrap();
        store.set_current_disk(Some(&source)).await.unwrap();

        let merged = store.merge_disk(&source, &target).await.unwrap();

        assert_eq!(merged.used, 3 * MEBI);
        assert!(store.disk(&source).is_none());
        assert_eq!(store.root_items(&target).unwrap().len(), 2);
        assert_eq!(store.current_disk().map(|d| d.id), Some(target.clone()));
        assert!(store.check_integrity().is_ok());
    }

    #[tokio::test]
    async fn merge_needs_room() {
        let (remote, store) = setup(10.0).await;
        let source = remote.seed_disk("Old", 1.0, SizeUnit::GB);
        let target = remote.seed_disk("New", 1.0, SizeUnit::MB);

        remote.seed_file(&source, None, "a.bin", 2.0, SizeUnit::MB);
        store.fetch_disks().await.unwrap();

        let err = store.merge_disk(&source, &target).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.disks().len(), 2);

        let err = store.merge_disk(&source, &source).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
