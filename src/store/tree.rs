//! Arena of cached file tree nodes.
//!
//! Nodes are keyed by id and point at their children by id. A listing (the
//! children of a folder or the root entries of a disk) is either loaded or
//! not; entries are only cached under a loaded listing so every cached node
//! can be reached from its disk root.

use std::collections::{HashMap, HashSet};

use nimbus_lib::ids;
use nimbus_api::files::FileItem;

#[derive(Debug, Clone)]
pub struct Node {
    /// `item.children` is always `None` here, see `children`
    pub item: FileItem,
    /// `None` until the listing of a folder has been fetched
    pub children: Option<Vec<ids::FileId>>,
}

/// aggregate over the cached part of a subtree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStats {
    pub files: u64,
    pub folders: u64,
    pub bytes: u64,
    /// false if some folder in the subtree has not been loaded
    pub complete: bool,
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<ids::FileId, Node>,
    roots: HashMap<ids::DiskId, Vec<ids::FileId>>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&FileItem> {
        self.nodes.get(id).map(|node| &node.item)
    }

    pub fn roots(&self, disk_id: &str) -> Option<&Vec<ids::FileId>> {
        self.roots.get(disk_id)
    }

    pub fn children(&self, id: &str) -> Option<&Vec<ids::FileId>> {
        self.nodes.get(id).and_then(|node| node.children.as_ref())
    }

    /// entries of a listing, `None` if it is not loaded
    pub fn listing(&self, disk_id: &str, parent_id: Option<&str>) -> Option<&Vec<ids::FileId>> {
        match parent_id {
            Some(parent_id) => self.children(parent_id),
            None => self.roots(disk_id),
        }
    }

    pub fn listing_loaded(&self, disk_id: &str, parent_id: Option<&str>) -> bool {
        self.listing(disk_id, parent_id).is_some()
    }

    fn listing_mut(&mut self, disk_id: &str, parent_id: Option<&str>) -> Option<&mut Vec<ids::FileId>> {
        match parent_id {
            Some(parent_id) => self.nodes.get_mut(parent_id)
                .and_then(|node| node.children.as_mut()),
            None => self.roots.get_mut(disk_id),
        }
    }

    /// true if an entry named `name` sits in the given listing. names are
    /// compared without regard to case.
    pub fn name_taken(
        &self,
        disk_id: &str,
        parent_id: Option<&str>,
        name: &str,
        ignore: Option<&str>
    ) -> bool {
        let Some(listing) = self.listing(disk_id, parent_id) else {
            return false;
        };

        listing.iter()
            .filter(|id| Some(id.as_str()) != ignore)
            .filter_map(|id| self.item(id))
            .any(|item| item.name.to_lowercase() == name.to_lowercase())
    }

    /// replaces a listing wholesale. anything previously cached below it is
    /// dropped, which is how a refresh invalidates a subtree.
    pub fn set_listing(&mut self, disk_id: &str, parent_id: Option<&str>, items: Vec<FileItem>) {
        if let Some(parent_id) = parent_id {
            if !self.nodes.get(parent_id).map(|n| n.item.is_folder).unwrap_or(false) {
                return;
            }
        }

        let previous = match parent_id {
            Some(parent_id) => self.nodes.get_mut(parent_id)
                .and_then(|node| node.children.take()),
            None => self.roots.remove(disk_id),
        };

        for id in previous.unwrap_or_default() {
            self.remove_subtree(&id);
        }

        let mut listing = Vec::with_capacity(items.len());

        for mut item in items {
            item.parent_id = parent_id.map(|v| v.to_owned());
            item.disk_id = disk_id.to_owned();

            let id = self.insert(item);

            if !listing.contains(&id) {
                listing.push(id);
            }
        }

        match parent_id {
            Some(parent_id) => if let Some(node) = self.nodes.get_mut(parent_id) {
                node.children = Some(listing);
            },
            None => {
                self.roots.insert(disk_id.to_owned(), listing);
            }
        }
    }

    /// drops everything cached below a folder and marks it unloaded
    pub fn invalidate(&mut self, id: &str) {
        let previous = self.nodes.get_mut(id)
            .and_then(|node| node.children.take());

        for child in previous.unwrap_or_default() {
            self.remove_subtree(&child);
        }
    }

    /// adds a newly created entry to its parent listing. returns false and
    /// caches nothing if that listing is not loaded.
    pub fn attach(&mut self, item: FileItem) -> bool {
        let disk_id = item.disk_id.clone();
        let parent_id = item.parent_id.clone();

        if !self.listing_loaded(&disk_id, parent_id.as_deref()) {
            return false;
        }

        if let Some(parent_id) = &parent_id {
            if !self.nodes.get(parent_id).map(|n| n.item.is_folder).unwrap_or(false) {
                return false;
            }
        }

        if self.nodes.contains_key(&item.id) {
            self.detach(&item.id);
        }

        let id = self.insert(item);

        if let Some(listing) = self.listing_mut(&disk_id, parent_id.as_deref()) {
            listing.push(id);
        }

        true
    }

    /// removes an entry and everything below it, returning the removed items
    pub fn detach(&mut self, id: &str) -> Vec<FileItem> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };

        let disk_id = node.item.disk_id.clone();
        let parent_id = node.item.parent_id.clone();

        if let Some(listing) = self.listing_mut(&disk_id, parent_id.as_deref()) {
            listing.retain(|child| child != id);
        }

        self.remove_subtree(id)
    }

    /// applies a confirmed move. the cached subtree follows the entry if the
    /// destination listing is loaded, otherwise it is dropped from the cache.
    pub fn relocate(&mut self, moved: FileItem) -> bool {
        let id = moved.id.clone();

        let taken = if self.nodes.contains_key(&id) {
            let disk_id = self.nodes[&id].item.disk_id.clone();
            let parent_id = self.nodes[&id].item.parent_id.clone();

            if let Some(listing) = self.listing_mut(&disk_id, parent_id.as_deref()) {
                listing.retain(|child| *child != id);
            }

            self.take_subtree(&id)
        } else {
            Vec::new()
        };

        let dest_disk = moved.disk_id.clone();
        let dest_parent = moved.parent_id.clone();

        if !self.listing_loaded(&dest_disk, dest_parent.as_deref()) {
            return false;
        }

        let mut children = None;

        for (_, mut node) in taken {
            if node.item.id == id {
                children = node.children;
                continue;
            }

            node.item.disk_id = dest_disk.clone();
            self.nodes.insert(node.item.id.clone(), node);
        }

        let mut moved = moved;

        // a listing carried by the response replaces whatever was cached
        // below the entry
        let node_id = if moved.children.is_some() {
            if let Some(previous) = children {
                for child in previous {
                    self.remove_subtree(&child);
                }
            }

            self.insert(moved)
        } else {
            let node_id = moved.id.clone();

            moved.children = None;
            self.nodes.insert(node_id.clone(), Node {
                children: if moved.is_folder { children } else { None },
                item: moved,
            });

            node_id
        };

        if let Some(listing) = self.listing_mut(&dest_disk, dest_parent.as_deref()) {
            listing.push(node_id);
        }

        true
    }

    /// updates the metadata of a cached entry in place, keeping its location
    /// and loaded children
    pub fn update_item(&mut self, updated: FileItem) -> bool {
        let Some(node) = self.nodes.get_mut(&updated.id) else {
            return false;
        };

        node.item.name = updated.name;
        node.item.file_type = updated.file_type;
        node.item.size = updated.size;
        node.item.size_unit = updated.size_unit;
        node.item.url = updated.url;
        node.item.modified_at = updated.modified_at;

        true
    }

    /// removes all cached entries of a disk and marks its root unloaded
    pub fn remove_disk(&mut self, disk_id: &str) -> Vec<ids::FileId> {
        self.roots.remove(disk_id);

        let removed: Vec<ids::FileId> = self.nodes.iter()
            .filter(|(_, node)| node.item.disk_id == disk_id)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &removed {
            self.nodes.remove(id);
        }

        removed
    }

    /// ids of the parents of an entry, nearest first. stops at the disk root,
    /// an uncached parent or a repeated id.
    pub fn ancestors(&self, id: &str) -> Vec<ids::FileId> {
        let mut rtn = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.item(id).and_then(|item| item.parent_id.clone());

        seen.insert(id.to_owned());

        while let Some(parent_id) = current {
            if !seen.insert(parent_id.clone()) {
                break;
            }

            current = self.item(&parent_id).and_then(|item| item.parent_id.clone());
            rtn.push(parent_id);
        }

        rtn
    }

    /// true if `id` is `ancestor` or lies somewhere below it
    pub fn is_within(&self, id: &str, ancestor: &str) -> bool {
        id == ancestor || self.ancestors(id).iter().any(|parent| parent == ancestor)
    }

    /// chain of folder ids from the disk root down to and including
    /// `folder_id`. `None` if the chain is broken or not made of folders.
    pub fn path_to(&self, folder_id: &str) -> Option<Vec<ids::FileId>> {
        let item = self.item(folder_id)?;

        if !item.is_folder {
            return None;
        }

        let mut chain = vec![folder_id.to_owned()];
        let mut seen = HashSet::from([folder_id.to_owned()]);
        let mut current = item.parent_id.clone();

        while let Some(parent_id) = current {
            let parent = self.item(&parent_id)?;

            if !parent.is_folder || parent.disk_id != item.disk_id || !seen.insert(parent_id.clone()) {
                return None;
            }

            current = parent.parent_id.clone();
            chain.push(parent_id);
        }

        if !self.roots(&item.disk_id).map(|r| r.contains(&chain[chain.len() - 1])).unwrap_or(false) {
            return None;
        }

        chain.reverse();

        Some(chain)
    }

    /// ids of an entry and all of its cached descendants
    pub fn subtree_ids(&self, id: &str) -> Vec<ids::FileId> {
        let mut rtn = Vec::new();
        let mut stack = vec![id.to_owned()];

        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };

            if let Some(children) = &node.children {
                stack.extend(children.iter().cloned());
            }

            rtn.push(current);
        }

        rtn
    }

    pub fn stats(&self, id: &str) -> FolderStats {
        let mut stats = FolderStats {
            complete: true,
            ..Default::default()
        };

        for sub_id in self.subtree_ids(id) {
            let Some(node) = self.nodes.get(&sub_id) else {
                continue;
            };

            if node.item.is_folder {
                if sub_id != id {
                    stats.folders += 1;
                }

                if node.children.is_none() {
                    stats.complete = false;
                }
            } else {
                stats.files += 1;
                stats.bytes += node.item.size_bytes();
            }
        }

        stats
    }

    /// aggregate over every cached entry of a disk
    pub fn disk_stats(&self, disk_id: &str) -> FolderStats {
        let mut stats = FolderStats {
            complete: self.roots.contains_key(disk_id),
            ..Default::default()
        };

        for id in self.roots(disk_id).cloned().unwrap_or_default() {
            let sub = self.stats(&id);

            if self.item(&id).map(|i| i.is_folder).unwrap_or(false) {
                stats.folders += 1;
            }

            stats.files += sub.files;
            stats.folders += sub.folders;
            stats.bytes += sub.bytes;
            stats.complete &= sub.complete;
        }

        stats
    }

    /// checks the structural invariants of the cache
    pub fn check_integrity(&self) -> Result<(), String> {
        for (id, node) in &self.nodes {
            if *id != node.item.id {
                return Err(format!("node {} is keyed as {}", node.item.id, id));
            }

            if !node.item.is_folder && node.children.is_some() {
                return Err(format!("{} is not a folder but has children", id));
            }

            let mut seen = HashSet::from([id.clone()]);
            let mut current = node.item.parent_id.clone();

            while let Some(parent_id) = current {
                if !seen.insert(parent_id.clone()) {
                    return Err(format!("parent chain of {} loops at {}", id, parent_id));
                }

                let Some(parent) = self.nodes.get(&parent_id) else {
                    return Err(format!("parent {} of {} is not cached", parent_id, id));
                };

                if parent.item.disk_id != node.item.disk_id {
                    return Err(format!("{} and its parent {} are on different disks", id, parent_id));
                }

                if !parent.item.is_folder {
                    return Err(format!("parent {} of {} is not a folder", parent_id, id));
                }

                current = parent.item.parent_id.clone();
            }

            let listed = self.listing(&node.item.disk_id, node.item.parent_id.as_deref())
                .map(|listing| listing.contains(id))
                .unwrap_or(false);

            if !listed {
                return Err(format!("{} is missing from its parent listing", id));
            }

            if let Some(children) = &node.children {
                for child in children {
                    let Some(child_node) = self.nodes.get(child) else {
                        return Err(format!("child {} of {} is not cached", child, id));
                    };

                    if child_node.item.parent_id.as_deref() != Some(id.as_str()) {
                        return Err(format!("child {} does not point back at {}", child, id));
                    }
                }
            }
        }

        for (disk_id, roots) in &self.roots {
            for root in roots {
                let Some(node) = self.nodes.get(root) else {
                    return Err(format!("root {} of disk {} is not cached", root, disk_id));
                };

                if node.item.parent_id.is_some() || node.item.disk_id != *disk_id {
                    return Err(format!("root {} does not belong to the root of {}", root, disk_id));
                }
            }
        }

        Ok(())
    }

    /// caches an item and any nested children it carries
    fn insert(&mut self, mut item: FileItem) -> ids::FileId {
        let id = item.id.clone();
        let nested = item.children.take();

        let children = if item.is_folder {
            nested.map(|list| {
                let mut ids = Vec::with_capacity(list.len());

                for mut child in list {
                    child.parent_id = Some(id.clone());
                    child.disk_id = item.disk_id.clone();

                    ids.push(self.insert(child));
                }

                ids
            })
        } else {
            None
        };

        if let Some(previous) = self.nodes.remove(&id) {
            for child in previous.children.unwrap_or_default() {
                if !children.as_ref().map(|c| c.contains(&child)).unwrap_or(false) {
                    self.remove_subtree(&child);
                }
            }
        }

        self.nodes.insert(id.clone(), Node { item, children });

        id
    }

    fn remove_subtree(&mut self, id: &str) -> Vec<FileItem> {
        self.take_subtree(id)
            .into_iter()
            .map(|(_, node)| node.item)
            .collect()
    }

    fn take_subtree(&mut self, id: &str) -> Vec<(ids::FileId, Node)> {
        let mut rtn = Vec::new();

        for sub_id in self.subtree_ids(id) {
            if let Some(node) = self.nodes.remove(&sub_id) {
                rtn.push((sub_id, node));
            }
        }

        rtn
    }
}
