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

//! Storage server HTTP surface: byte reads and writes on the client port,
//! naming-server commands on the command port.

use crate::http::ApiResult;
use crate::storage::StorageServer;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use spindle_common::proto::*;
use std::sync::Arc;

pub(crate) fn client_router(server: Arc<StorageServer>) -> Router {
    Router::new()
        .route("/storage_read", post(read))
        .route("/storage_write", post(write))
        .route("/storage_size", post(size))
        .with_state(server)
}

pub(crate) fn command_router(server: Arc<StorageServer>) -> Router {
    Router::new()
        .route("/storage_create", post(create))
        .route("/storage_delete", post(delete))
        .route("/storage_copy", post(copy))
        .with_state(server)
}

async fn read(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<ReadRequest>,
) -> ApiResult<Json<ReadResponse>> {
    let data = s.store().read(&req.path, req.offset, req.length).await?;
    Ok(Json(ReadResponse { data }))
}

async fn write(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<WriteRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    s.store().write(&req.path, req.offset, &req.data).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn size(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<SizeRequest>,
) -> ApiResult<Json<SizeResponse>> {
    let size = s.store().size(&req.path).await?;
    Ok(Json(SizeResponse { size }))
}

async fn create(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = s.store().create(&req.path).await?;
    Ok(Json(SuccessResponse { success }))
}

async fn delete(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let success = s.store().delete(&req.path).await?;
    Ok(Json(SuccessResponse { success }))
}

async fn copy(
    State(s): State<Arc<StorageServer>>,
    Json(req): Json<CopyRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    s.pull_file(&req.path, &req.server_ip, req.server_port)
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}
