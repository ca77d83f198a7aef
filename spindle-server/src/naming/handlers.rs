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

//! Naming server HTTP surface: the nine client routes on the service port
//! and `/register` on the registration port.

use crate::http::{ApiError, ApiResult};
use crate::naming::meta::{subtree_files, FsNode};
use crate::naming::NamingServer;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use spindle_common::fs::dfs_path;
use spindle_common::proto::*;
use spindle_common::state::StorageAddress;
use spindle_common::DfsError;
use std::sync::Arc;

pub(crate) fn service_router(server: Arc<NamingServer>) -> Router {
    Router::new()
        .route("/is_valid_path", post(is_valid_path))
        .route("/get_storage", post(get_storage))
        .route("/is_directory", post(is_directory))
        .route("/list", post(list_dir))
        .route("/create_file", post(create_file))
        .route("/create_directory", post(create_directory))
        .route("/delete", post(delete_path))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .with_state(server)
}

pub(crate) fn registration_router(server: Arc<NamingServer>) -> Router {
    Router::new()
        .route("/register", post(register))
        .with_state(server)
}

async fn is_valid_path(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (is_dir, is_file) = s.namespace().path_exists(&req.path).await?;
    Ok(Json(SuccessResponse {
        success: is_dir || is_file,
    }))
}

async fn get_storage(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<StorageInfoResponse>> {
    let server = s.namespace().get_file_storage(&req.path).await?;
    Ok(Json(StorageInfoResponse {
        server_ip: server.ip.clone(),
        server_port: server.client_port,
    }))
}

async fn is_directory(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (is_dir, is_file) = s.namespace().path_exists(&req.path).await?;
    if !is_dir && !is_file {
        return Err(DfsError::file_not_found(format!(
            "path {} does not exist",
            req.path
        ))
        .into());
    }
    Ok(Json(SuccessResponse { success: is_dir }))
}

async fn list_dir(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<ListFilesResponse>> {
    let files = s.namespace().list_dir(&req.path).await?;
    Ok(Json(ListFilesResponse { files }))
}

async fn create_directory(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = s.namespace().make_directory(&req.path).await?;
    Ok(Json(SuccessResponse { success }))
}

async fn create_file(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let canon = dfs_path::clean(&req.path)?;
    let Some(server) = s.registry().allocate(&canon) else {
        return Err(DfsError::illegal_state(
            "no storage servers are registered with the naming server",
        )
        .into());
    };

    match s.namespace().create_file(&canon, server.clone()).await? {
        Some(file) => {
            s.commands().create(file.path(), &server).await;
            Ok(Json(SuccessResponse { success: true }))
        }
        None => Ok(Json(SuccessResponse { success: false })),
    }
}

async fn delete_path(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<PathRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let Some(node) = s.namespace().delete_path(&req.path).await? else {
        return Ok(Json(SuccessResponse { success: false }));
    };

    // Every replica of every file in the subtree, awaited before the
    // client sees success. Individual failures are logged by the
    // dispatcher and otherwise ignored.
    let files = subtree_files(&node);
    let mut targets: Vec<(String, StorageAddress)> = Vec::new();
    for file in &files {
        for server in file.snapshot_replicas() {
            targets.push((file.path().to_string(), server));
        }
    }
    let deletes = targets.iter().map(|(path, server)| s.commands().delete(path, server));
    futures::future::join_all(deletes).await;

    Ok(Json(SuccessResponse { success: true }))
}

async fn lock(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<LockRequest>,
) -> ApiResult<()> {
    let item = s.namespace().lock_item(&req.path, req.exclusive).await?;
    if let FsNode::File(file) = &item {
        if req.exclusive {
            s.replication().on_exclusive_lock(file).await;
        } else {
            s.replication().on_shared_lock(file).await;
        }
    }
    Ok(())
}

async fn unlock(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<LockRequest>,
) -> ApiResult<()> {
    s.namespace().unlock_item(&req.path, req.exclusive)?;
    Ok(())
}

async fn register(
    State(s): State<Arc<NamingServer>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let server = StorageAddress {
        ip: req.storage_ip.clone(),
        client_port: req.client_port,
        command_port: req.command_port,
    };
    s.registry().register(server.clone())?;

    let success = s.namespace().register_files(&req.files, &server).await;
    let files = req
        .files
        .iter()
        .zip(success)
        .filter(|(_, ok)| !ok)
        .map(|(path, _)| path.clone())
        .collect();
    Ok(Json(RegisterResponse { files }))
}
