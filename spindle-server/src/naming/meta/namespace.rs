// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The naming server's in-memory namespace.
//!
//! Every operation does its own locking: shared hand-over-hand on the
//! ancestor chain, root to leaf, with the final directory taken exclusive
//! by the operations that mutate it. All callers acquire in the same total
//! order, which keeps the walks deadlock-free. Release order is always
//! leaf to root.

use crate::naming::meta::node::{DirNode, FileNode, FsNode};
use spindle_common::fs::dfs_path;
use spindle_common::state::StorageAddress;
use spindle_common::{DfsError, DfsResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct ReadLockEntry {
    item: FsNode,
    count: u32,
}

/// The namespace tree plus the two client-facing lock tables. The tables
/// define which paths are currently locked through the `/lock` API; each
/// has its own short mutex, touched only while the corresponding node's
/// FIFO lock is already held.
pub struct Namespace {
    root: Arc<DirNode>,
    read_locked: Mutex<HashMap<String, ReadLockEntry>>,
    write_locked: Mutex<HashMap<String, FsNode>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            root: DirNode::new_root(),
            read_locked: Mutex::new(HashMap::new()),
            write_locked: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `pth` names a directory and/or a file.
    pub async fn path_exists(&self, pth: &str) -> DfsResult<(bool, bool)> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok((true, false));
        }

        let parent_names = &names[..names.len() - 1];
        let Some(chain) = self.lock_path_shared(parent_names).await else {
            return Ok((false, false));
        };
        let parent = chain.last().expect("locked chain is never empty");
        let name = names.last().expect("non-root path has a final name");
        let is_dir = parent.get_dir(name).is_some();
        let is_file = parent.get_file(name).is_some();
        Self::release_chain(&chain);
        Ok((is_dir, is_file))
    }

    /// Create the directory named by `pth`. Creating `/` or an existing
    /// name reports `false` without an error; a missing parent is an error.
    pub async fn make_directory(&self, pth: &str) -> DfsResult<bool> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok(false);
        }

        let parent_names = &names[..names.len() - 1];
        let Some((shared, parent)) = self.lock_path_exclusive(parent_names).await else {
            return Err(DfsError::file_not_found(
                "the parent directory does not exist",
            ));
        };
        let name = names.last().expect("non-root path has a final name");
        let created = if parent.has_child(name) {
            false
        } else {
            parent.add_dir(name);
            true
        };
        Self::release_exclusive(&shared, &parent);
        Ok(created)
    }

    /// Create a file whose single replica lives on `server`. `None` means
    /// the name was refused (root, or a sibling collision) and nothing was
    /// created.
    pub async fn create_file(
        &self,
        pth: &str,
        server: StorageAddress,
    ) -> DfsResult<Option<Arc<FileNode>>> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok(None);
        }

        let parent_names = &names[..names.len() - 1];
        let Some((shared, parent)) = self.lock_path_exclusive(parent_names).await else {
            return Err(DfsError::file_not_found(
                "the parent directory does not exist",
            ));
        };
        let name = names.last().expect("non-root path has a final name");
        let file = if parent.has_child(name) {
            None
        } else {
            Some(parent.add_file(name, dfs_path::from_components(&names), server))
        };
        Self::release_exclusive(&shared, &parent);
        Ok(file)
    }

    /// Detach the subtree rooted at `pth` and destroy its FIFO locks so
    /// queued waiters fail fast. Returns the detached node; callers walk it
    /// with [`subtree_files`] to find the replicas whose bytes must go.
    /// Deleting `/` reports `None` without an error.
    pub async fn delete_path(&self, pth: &str) -> DfsResult<Option<FsNode>> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok(None);
        }

        let parent_names = &names[..names.len() - 1];
        let Some((shared, parent)) = self.lock_path_exclusive(parent_names).await else {
            return Err(DfsError::file_not_found(format!(
                "path {} does not exist",
                pth
            )));
        };
        let name = names.last().expect("non-root path has a final name");
        let detached = parent.remove_child(name);
        Self::release_exclusive(&shared, &parent);

        match detached {
            None => Err(DfsError::file_not_found(format!(
                "path {} does not exist",
                pth
            ))),
            Some(node) => {
                destroy_subtree_locks(&node);
                Ok(Some(node))
            }
        }
    }

    /// Child names of the directory at `pth`.
    pub async fn list_dir(&self, pth: &str) -> DfsResult<Vec<String>> {
        let names = dfs_path::path_components(pth)?;
        let Some(chain) = self.lock_path_shared(&names).await else {
            return Err(DfsError::file_not_found(format!(
                "cannot find directory {}",
                pth
            )));
        };
        let target = chain.last().expect("locked chain is never empty");
        let items = target.child_names();
        Self::release_chain(&chain);
        Ok(items)
    }

    /// One replica of the file at `pth`, chosen at random.
    pub async fn get_file_storage(&self, pth: &str) -> DfsResult<StorageAddress> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Err(DfsError::file_not_found(format!("cannot find file {}", pth)));
        }

        let parent_names = &names[..names.len() - 1];
        let Some(chain) = self.lock_path_shared(parent_names).await else {
            return Err(DfsError::file_not_found(format!("cannot find file {}", pth)));
        };
        let parent = chain.last().expect("locked chain is never empty");
        let name = names.last().expect("non-root path has a final name");
        let Some(file) = parent.get_file(name) else {
            Self::release_chain(&chain);
            return Err(DfsError::file_not_found(format!("cannot find file {}", pth)));
        };
        if file.lock().lock_shared().await.is_err() {
            Self::release_chain(&chain);
            return Err(DfsError::file_not_found(format!("cannot find file {}", pth)));
        }
        let replica = file.pick_replica();
        file.lock().unlock_shared();
        Self::release_chain(&chain);

        replica.ok_or_else(|| DfsError::file_not_found(format!("cannot find file {}", pth)))
    }

    /// Bulk merge from a newly registered storage server. Creating files
    /// and directories anywhere means taking the whole tree exclusive once
    /// rather than locking piecemeal. Returns one success flag per entry;
    /// a `false` entry is a path the server must delete locally.
    pub async fn register_files(&self, pths: &[String], server: &StorageAddress) -> Vec<bool> {
        if self.root.lock().lock_exclusive().await.is_err() {
            return vec![false; pths.len()];
        }
        let success = pths
            .iter()
            .map(|pth| self.register_one(pth, server))
            .collect();
        self.root.lock().unlock_exclusive();
        success
    }

    fn register_one(&self, pth: &str, server: &StorageAddress) -> bool {
        let Ok(names) = dfs_path::path_components(pth) else {
            return false;
        };
        if names.len() == 1 {
            // a "/" entry is silently accepted
            return true;
        }

        let mut curr = self.root.clone();
        for name in &names[1..names.len() - 1] {
            match curr.get_dir(name) {
                Some(next) => curr = next,
                None => {
                    if curr.get_file(name).is_some() {
                        // an intermediate directory would collide with a file
                        return false;
                    }
                    curr = curr.add_dir(name);
                }
            }
        }

        let file_name = names.last().expect("non-root path has a final name");
        if curr.has_child(file_name) {
            return false;
        }
        curr.add_file(
            file_name,
            dfs_path::from_components(&names),
            server.clone(),
        );
        true
    }

    /// Client-facing lock: shared ancestors, then the target in the
    /// requested mode, then the matching lock table. The root itself is
    /// lockable.
    pub async fn lock_item(&self, pth: &str, exclusive: bool) -> DfsResult<FsNode> {
        let canon = dfs_path::clean(pth)?;
        let names = dfs_path::path_components(&canon)?;

        let item = if names.len() == 1 {
            FsNode::Dir(self.root.clone())
        } else {
            let parent_names = &names[..names.len() - 1];
            let Some(chain) = self.lock_path_shared(parent_names).await else {
                return Err(DfsError::file_not_found(
                    "the file or directory cannot be found",
                ));
            };
            let parent = chain.last().expect("locked chain is never empty");
            let name = names.last().expect("non-root path has a final name");
            let found = parent
                .get_dir(name)
                .map(FsNode::Dir)
                .or_else(|| parent.get_file(name).map(FsNode::File));
            match found {
                Some(node) => node,
                None => {
                    Self::release_chain(&chain);
                    return Err(DfsError::file_not_found(
                        "the file or directory cannot be found",
                    ));
                }
            }
        };

        let granted = if exclusive {
            item.lock().lock_exclusive().await
        } else {
            item.lock().lock_shared().await
        };
        if granted.is_err() {
            // the node was deleted while we queued
            if let Some(parent) = item.parent_dir() {
                Self::release_parents(&parent);
            }
            return Err(DfsError::file_not_found(
                "the file or directory cannot be found",
            ));
        }

        if exclusive {
            self.write_locked
                .lock()
                .unwrap()
                .insert(canon, item.clone());
        } else {
            let mut table = self.read_locked.lock().unwrap();
            table
                .entry(canon)
                .and_modify(|e| e.count += 1)
                .or_insert_with(|| ReadLockEntry {
                    item: item.clone(),
                    count: 1,
                });
        }
        Ok(item)
    }

    /// Client-facing unlock. The path must be present in the matching
    /// table, otherwise the request is malformed.
    pub fn unlock_item(&self, pth: &str, exclusive: bool) -> DfsResult<()> {
        let canon = dfs_path::clean(pth)?;

        if exclusive {
            let mut table = self.write_locked.lock().unwrap();
            let Some(item) = table.remove(&canon) else {
                return Err(DfsError::illegal_argument(format!(
                    "path {} is not locked for writing",
                    canon
                )));
            };
            let parent = item.parent_dir();
            item.lock().unlock_exclusive();
            if let Some(parent) = parent {
                Self::release_parents(&parent);
            }
        } else {
            let mut table = self.read_locked.lock().unwrap();
            let Some(entry) = table.get_mut(&canon) else {
                return Err(DfsError::illegal_argument(format!(
                    "path {} is not locked for reading",
                    canon
                )));
            };
            entry.count -= 1;
            let item = entry.item.clone();
            if entry.count == 0 {
                table.remove(&canon);
            }
            let parent = item.parent_dir();
            item.lock().unlock_shared();
            if let Some(parent) = parent {
                Self::release_parents(&parent);
            }
        }
        Ok(())
    }

    /// Shared-lock every directory along `names`, root to leaf, locking
    /// each node before looking up the next segment inside it. On success
    /// the chain is returned root-first with every entry held shared. On a
    /// missing segment or a destroyed lock everything acquired so far is
    /// released leaf to root.
    async fn lock_path_shared(&self, names: &[String]) -> Option<Vec<Arc<DirNode>>> {
        let mut chain: Vec<Arc<DirNode>> = Vec::with_capacity(names.len());
        let mut curr = self.root.clone();
        for name in &names[1..] {
            if curr.lock().lock_shared().await.is_err() {
                Self::release_chain(&chain);
                return None;
            }
            chain.push(curr.clone());
            match curr.get_dir(name) {
                Some(next) => curr = next,
                None => {
                    Self::release_chain(&chain);
                    return None;
                }
            }
        }
        if curr.lock().lock_shared().await.is_err() {
            Self::release_chain(&chain);
            return None;
        }
        chain.push(curr);
        Some(chain)
    }

    /// Like [`Self::lock_path_shared`] but the final directory is taken
    /// exclusive, for operations that mutate its children.
    async fn lock_path_exclusive(
        &self,
        names: &[String],
    ) -> Option<(Vec<Arc<DirNode>>, Arc<DirNode>)> {
        let mut shared: Vec<Arc<DirNode>> = Vec::with_capacity(names.len());
        let mut curr = self.root.clone();
        for name in &names[1..] {
            if curr.lock().lock_shared().await.is_err() {
                Self::release_chain(&shared);
                return None;
            }
            shared.push(curr.clone());
            match curr.get_dir(name) {
                Some(next) => curr = next,
                None => {
                    Self::release_chain(&shared);
                    return None;
                }
            }
        }
        if curr.lock().lock_exclusive().await.is_err() {
            Self::release_chain(&shared);
            return None;
        }
        Some((shared, curr))
    }

    fn release_chain(chain: &[Arc<DirNode>]) {
        for dir in chain.iter().rev() {
            dir.lock().unlock_shared();
        }
    }

    fn release_exclusive(shared: &[Arc<DirNode>], target: &Arc<DirNode>) {
        target.lock().unlock_exclusive();
        Self::release_chain(shared);
    }

    /// Release the shared locks held on `start` and every ancestor above
    /// it, following parent links upward.
    fn release_parents(start: &Arc<DirNode>) {
        let mut curr = Some(start.clone());
        while let Some(dir) = curr {
            dir.lock().unlock_shared();
            curr = dir.parent_dir();
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

/// Every file in a detached subtree, depth-first.
pub fn subtree_files(node: &FsNode) -> Vec<Arc<FileNode>> {
    let mut files = Vec::new();
    collect_files(node, &mut files);
    files
}

fn collect_files(node: &FsNode, files: &mut Vec<Arc<FileNode>>) {
    match node {
        FsNode::File(file) => files.push(file.clone()),
        FsNode::Dir(dir) => {
            for child in dir.children_snapshot() {
                collect_files(&child, files);
            }
        }
    }
}

fn destroy_subtree_locks(node: &FsNode) {
    match node {
        FsNode::File(file) => file.lock().destroy(),
        FsNode::Dir(dir) => {
            dir.lock().destroy();
            for child in dir.children_snapshot() {
                destroy_subtree_locks(&child);
            }
        }
    }
}
