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

//! Lock-driven replication. Client read locks bump a per-file counter and
//! every twentieth read fans a copy out to a server that does not hold the
//! file yet; a client write lock collapses the replica set back to its
//! first entry so no stale copy survives the write.

use crate::naming::commands::CommandClient;
use crate::naming::meta::FileNode;
use crate::naming::registry::StorageRegistry;
use futures::future::join_all;
use log::info;
use rand::seq::SliceRandom;
use spindle_common::state::StorageAddress;
use std::sync::Arc;

/// Reads between fan-outs. The only replication tunable.
pub const READ_REPLICATION_THRESHOLD: u32 = 20;

pub struct ReplicationController {
    registry: Arc<StorageRegistry>,
    commands: CommandClient,
}

impl ReplicationController {
    pub fn new(registry: Arc<StorageRegistry>, commands: CommandClient) -> Self {
        Self { registry, commands }
    }

    /// Called with the file's FIFO lock held shared by the client. The
    /// replica set only grows after the copy command reports success; a
    /// failed copy is dropped, not retried.
    pub async fn on_shared_lock(&self, file: &Arc<FileNode>) {
        let plan = self.plan_copy(file);
        if let Some((dst, src)) = plan {
            info!("replicating {} from {} to {}", file.path(), src, dst);
            if self.commands.copy(file.path(), &dst, &src).await {
                file.add_replica(dst);
            }
        }
    }

    /// Called with the file's FIFO lock held exclusive. Every replica but
    /// the first is deleted before the lock call returns to the client;
    /// individual delete failures are ignored.
    pub async fn on_exclusive_lock(&self, file: &Arc<FileNode>) {
        let victims = {
            let mut set = file.replicas().lock().unwrap();
            set.read_count = 0;
            if set.servers.len() <= 1 {
                Vec::new()
            } else {
                set.servers[1..].to_vec()
            }
        };
        if victims.is_empty() {
            return;
        }

        info!(
            "invalidating {} replicas of {} before write",
            victims.len(),
            file.path()
        );
        let deletes = victims.iter().map(|s| self.commands.delete(file.path(), s));
        join_all(deletes).await;
        file.replicas().lock().unwrap().servers.truncate(1);
    }

    /// Count the read and, on crossing the threshold, pick a destination
    /// among servers not yet holding the file and a random source replica.
    /// All under the file's replica mutex, never its FIFO lock.
    fn plan_copy(&self, file: &Arc<FileNode>) -> Option<(StorageAddress, StorageAddress)> {
        let mut set = file.replicas().lock().unwrap();
        set.read_count += 1;
        if set.read_count < READ_REPLICATION_THRESHOLD {
            return None;
        }
        set.read_count -= READ_REPLICATION_THRESHOLD;

        let candidates: Vec<StorageAddress> = self
            .registry
            .all()
            .into_iter()
            .filter(|s| !set.servers.contains(s))
            .collect();
        let mut rng = rand::thread_rng();
        match (candidates.choose(&mut rng), set.servers.choose(&mut rng)) {
            (Some(dst), Some(src)) => Some((dst.clone(), src.clone())),
            _ => None,
        }
    }
}
