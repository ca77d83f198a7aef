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

//! Namespace tree nodes. Directories own their children behind a short
//! mutex; the FIFO lock on each node serializes structural access along
//! path walks. Parent links are weak so a detached subtree drops cleanly.

use crate::naming::fifo_lock::FifoRwLock;
use rand::seq::SliceRandom;
use spindle_common::state::StorageAddress;
use std::sync::{Arc, Mutex, Weak};

/// A directory. The root has the empty name and no parent.
#[derive(Debug)]
pub struct DirNode {
    name: String,
    parent: Weak<DirNode>,
    lock: FifoRwLock,
    children: Mutex<Children>,
}

#[derive(Default, Debug)]
struct Children {
    dirs: Vec<Arc<DirNode>>,
    files: Vec<Arc<FileNode>>,
}

/// A file entry: its name, the cached canonical path used for command
/// dispatch, and the replica bookkeeping.
#[derive(Debug)]
pub struct FileNode {
    name: String,
    path: String,
    parent: Weak<DirNode>,
    lock: FifoRwLock,
    replicas: Mutex<ReplicaSet>,
}

/// Replica bookkeeping behind its own mutex, deliberately separate from the
/// file's FIFO lock so replication decisions never queue behind path
/// lockers.
#[derive(Debug)]
pub struct ReplicaSet {
    pub read_count: u32,
    pub servers: Vec<StorageAddress>,
}

impl DirNode {
    pub fn new_root() -> Arc<Self> {
        Arc::new(Self {
            name: String::new(),
            parent: Weak::new(),
            lock: FifoRwLock::new(),
            children: Mutex::new(Children::default()),
        })
    }

    pub fn lock(&self) -> &FifoRwLock {
        &self.lock
    }

    pub fn parent_dir(&self) -> Option<Arc<DirNode>> {
        self.parent.upgrade()
    }

    pub fn get_dir(&self, name: &str) -> Option<Arc<DirNode>> {
        let children = self.children.lock().unwrap();
        children.dirs.iter().find(|d| d.name == name).cloned()
    }

    pub fn get_file(&self, name: &str) -> Option<Arc<FileNode>> {
        let children = self.children.lock().unwrap();
        children.files.iter().find(|f| f.name == name).cloned()
    }

    /// Name collisions are checked across both kinds.
    pub fn has_child(&self, name: &str) -> bool {
        let children = self.children.lock().unwrap();
        children.dirs.iter().any(|d| d.name == name)
            || children.files.iter().any(|f| f.name == name)
    }

    /// Child names, files first, in insertion order.
    pub fn child_names(&self) -> Vec<String> {
        let children = self.children.lock().unwrap();
        let mut names: Vec<String> = children.files.iter().map(|f| f.name.clone()).collect();
        names.extend(children.dirs.iter().map(|d| d.name.clone()));
        names
    }

    pub fn children_snapshot(&self) -> Vec<FsNode> {
        let children = self.children.lock().unwrap();
        let mut nodes: Vec<FsNode> = children.dirs.iter().cloned().map(FsNode::Dir).collect();
        nodes.extend(children.files.iter().cloned().map(FsNode::File));
        nodes
    }

    /// Callers hold this directory exclusive and have checked the name is
    /// free.
    pub fn add_dir(self: &Arc<Self>, name: &str) -> Arc<DirNode> {
        let dir = Arc::new(DirNode {
            name: name.to_string(),
            parent: Arc::downgrade(self),
            lock: FifoRwLock::new(),
            children: Mutex::new(Children::default()),
        });
        self.children.lock().unwrap().dirs.push(dir.clone());
        dir
    }

    /// Callers hold this directory exclusive and have checked the name is
    /// free. The new file starts with a single replica.
    pub fn add_file(
        self: &Arc<Self>,
        name: &str,
        path: String,
        server: StorageAddress,
    ) -> Arc<FileNode> {
        let file = Arc::new(FileNode {
            name: name.to_string(),
            path,
            parent: Arc::downgrade(self),
            lock: FifoRwLock::new(),
            replicas: Mutex::new(ReplicaSet {
                read_count: 0,
                servers: vec![server],
            }),
        });
        self.children.lock().unwrap().files.push(file.clone());
        file
    }

    /// Detach the named child of either kind.
    pub fn remove_child(&self, name: &str) -> Option<FsNode> {
        let mut children = self.children.lock().unwrap();
        if let Some(pos) = children.dirs.iter().position(|d| d.name == name) {
            return Some(FsNode::Dir(children.dirs.remove(pos)));
        }
        if let Some(pos) = children.files.iter().position(|f| f.name == name) {
            return Some(FsNode::File(children.files.remove(pos)));
        }
        None
    }
}

impl FileNode {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn lock(&self) -> &FifoRwLock {
        &self.lock
    }

    pub fn parent_dir(&self) -> Option<Arc<DirNode>> {
        self.parent.upgrade()
    }

    pub(crate) fn replicas(&self) -> &Mutex<ReplicaSet> {
        &self.replicas
    }

    /// One replica chosen uniformly at random.
    pub fn pick_replica(&self) -> Option<StorageAddress> {
        let set = self.replicas.lock().unwrap();
        let mut rng = rand::thread_rng();
        set.servers.choose(&mut rng).cloned()
    }

    pub fn snapshot_replicas(&self) -> Vec<StorageAddress> {
        self.replicas.lock().unwrap().servers.clone()
    }

    pub fn add_replica(&self, server: StorageAddress) {
        let mut set = self.replicas.lock().unwrap();
        if !set.servers.contains(&server) {
            set.servers.push(server);
        }
    }
}

/// A namespace entry of either kind. Lock and unlock paths treat the two
/// uniformly through this variant.
#[derive(Clone, Debug)]
pub enum FsNode {
    Dir(Arc<DirNode>),
    File(Arc<FileNode>),
}

impl FsNode {
    pub fn lock(&self) -> &FifoRwLock {
        match self {
            FsNode::Dir(d) => d.lock(),
            FsNode::File(f) => f.lock(),
        }
    }

    pub fn parent_dir(&self) -> Option<Arc<DirNode>> {
        match self {
            FsNode::Dir(d) => d.parent_dir(),
            FsNode::File(f) => f.parent_dir(),
        }
    }
}
