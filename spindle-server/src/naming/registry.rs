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

use spindle_common::state::StorageAddress;
use spindle_common::{DfsError, DfsResult};
use std::sync::RwLock;

/// The set of registered storage servers. Read-mostly: allocation and
/// replication read the list, registration appends under the write lock.
pub struct StorageRegistry {
    servers: RwLock<Vec<StorageAddress>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self {
            servers: RwLock::new(Vec::new()),
        }
    }

    /// Refuses a server whose (client_port, command_port) pair is already
    /// registered.
    pub fn register(&self, server: StorageAddress) -> DfsResult<()> {
        let mut servers = self.servers.write().unwrap();
        if servers.iter().any(|s| s == &server) {
            return Err(DfsError::illegal_state(
                "this storage server is already registered",
            ));
        }
        servers.push(server);
        Ok(())
    }

    pub fn all(&self) -> Vec<StorageAddress> {
        self.servers.read().unwrap().clone()
    }

    /// Stable placement for a fresh file: hash of the canonical path over
    /// the current server list. `None` when no server has registered yet.
    pub fn allocate(&self, path: &str) -> Option<StorageAddress> {
        let servers = self.servers.read().unwrap();
        if servers.is_empty() {
            return None;
        }
        let idx = fxhash::hash32(path.as_bytes()) as usize % servers.len();
        Some(servers[idx].clone())
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
