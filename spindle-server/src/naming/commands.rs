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

//! Command dispatch from the naming server to storage-server command
//! ports. Transport failures and non-success bodies are logged; only the
//! `copy` result is reported back, because it decides whether a replica
//! set may grow.

use log::warn;
use serde::Serialize;
use spindle_common::proto::{CopyRequest, CreateRequest, DeleteRequest, SuccessResponse};
use spindle_common::state::StorageAddress;
use spindle_common::{DfsError, DfsResult};

#[derive(Clone)]
pub struct CommandClient {
    http: reqwest::Client,
}

impl CommandClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Tell `server` to create an empty file at `path`.
    pub async fn create(&self, path: &str, server: &StorageAddress) {
        let req = CreateRequest {
            path: path.to_string(),
        };
        match self.post_success(server.command_url("storage_create"), &req).await {
            Ok(true) => {}
            Ok(false) => warn!("storage_create refused for {} on {}", path, server),
            Err(e) => warn!("storage_create failed for {} on {}: {}", path, server, e),
        }
    }

    /// Tell `server` to delete `path`. Best-effort; the namespace has
    /// already dropped the entry.
    pub async fn delete(&self, path: &str, server: &StorageAddress) {
        let req = DeleteRequest {
            path: path.to_string(),
        };
        match self.post_success(server.command_url("storage_delete"), &req).await {
            Ok(true) => {}
            Ok(false) => warn!("storage_delete refused for {} on {}", path, server),
            Err(e) => warn!("storage_delete failed for {} on {}: {}", path, server, e),
        }
    }

    /// Ask `dst` to pull `path` from `src`. Returns whether the copy
    /// succeeded.
    pub async fn copy(&self, path: &str, dst: &StorageAddress, src: &StorageAddress) -> bool {
        let req = CopyRequest {
            path: path.to_string(),
            server_ip: src.ip.clone(),
            server_port: src.client_port,
        };
        match self.post_success(dst.command_url("storage_copy"), &req).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("storage_copy refused for {} (dst {}, src {})", path, dst, src);
                false
            }
            Err(e) => {
                warn!(
                    "storage_copy failed for {} (dst {}, src {}): {}",
                    path, dst, src, e
                );
                false
            }
        }
    }

    async fn post_success<T: Serialize>(&self, url: String, body: &T) -> DfsResult<bool> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;
        if !resp.status().is_success() {
            return Ok(false);
        }
        let body: SuccessResponse = resp
            .json()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;
        Ok(body.success)
    }
}

impl Default for CommandClient {
    fn default() -> Self {
        Self::new()
    }
}
