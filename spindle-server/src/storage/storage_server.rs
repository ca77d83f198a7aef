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

use crate::storage::file_store::FileStore;
use crate::storage::handlers;
use log::{info, warn};
use spindle_common::conf::StorageConf;
use spindle_common::proto::{
    ReadRequest, ReadResponse, RegisterRequest, RegisterResponse, SizeRequest, SizeResponse,
};
use spindle_common::{DfsError, DfsResult};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const REGISTER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A storage server: a [`FileStore`] plus two HTTP ports. It announces
/// itself to the naming server before serving and deletes whatever the
/// registration response says the naming server already knows.
pub struct StorageServer {
    conf: StorageConf,
    store: FileStore,
    http: reqwest::Client,
}

impl StorageServer {
    pub fn new(conf: StorageConf) -> Arc<Self> {
        let store = FileStore::new(conf.root_dir.clone());
        Arc::new(Self {
            conf,
            store,
            http: reqwest::Client::new(),
        })
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Pull the whole file from a peer storage server: size first, then a
    /// single full read, decoded and written under our root.
    pub(crate) async fn pull_file(
        &self,
        pth: &str,
        source_ip: &str,
        source_port: u16,
    ) -> DfsResult<()> {
        let size_url = format!("http://{}:{}/storage_size", source_ip, source_port);
        let resp = self
            .http
            .post(size_url)
            .json(&SizeRequest {
                path: pth.to_string(),
            })
            .send()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DfsError::file_not_found(format!(
                "source {}:{} has no file {}",
                source_ip, source_port, pth
            )));
        }
        let size: SizeResponse = resp
            .json()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;

        let read_url = format!("http://{}:{}/storage_read", source_ip, source_port);
        let resp = self
            .http
            .post(read_url)
            .json(&ReadRequest {
                path: pth.to_string(),
                offset: 0,
                length: size.size,
            })
            .send()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DfsError::io(format!(
                "source {}:{} failed to read {}",
                source_ip, source_port, pth
            )));
        }
        let body: ReadResponse = resp
            .json()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;

        self.store.create(pth).await?;
        self.store.write(pth, 0, &body.data).await?;
        Ok(())
    }

    /// Register with the naming server, retrying until it answers. A 409
    /// is fatal: these ports are already taken. On success, drop the files
    /// the naming server already knows and prune what that leaves empty.
    pub async fn register(&self) -> DfsResult<()> {
        let files = self.store.scan_files()?;
        let req = RegisterRequest {
            storage_ip: self.conf.bind_ip.clone(),
            client_port: self.conf.client_port,
            command_port: self.conf.command_port,
            files,
        };

        loop {
            match self.try_register(&req).await {
                Ok(to_delete) => {
                    if !to_delete.is_empty() {
                        info!(
                            "registered; deleting {} files the naming server already knows",
                            to_delete.len()
                        );
                        self.store.delete_files(&to_delete).await;
                        self.store.prune_all()?;
                    } else {
                        info!("registered with an empty delete list");
                    }
                    return Ok(());
                }
                Err(err @ DfsError::IllegalState(_)) => return Err(err),
                Err(e) => {
                    warn!("registration attempt failed: {}", e);
                    tokio::time::sleep(REGISTER_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn try_register(&self, req: &RegisterRequest) -> DfsResult<Vec<String>> {
        let resp = self
            .http
            .post(self.conf.register_url())
            .json(req)
            .send()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            return Err(DfsError::illegal_state(
                "this storage server is already registered",
            ));
        }
        if !resp.status().is_success() {
            return Err(DfsError::io(format!(
                "registration returned status {}",
                resp.status()
            )));
        }
        let body: RegisterResponse = resp
            .json()
            .await
            .map_err(|e| DfsError::io(e.to_string()))?;
        Ok(body.files)
    }

    /// Bind the configured ports, register, then serve.
    pub async fn run(self: Arc<Self>) -> DfsResult<()> {
        let client = TcpListener::bind(self.conf.client_addr()).await?;
        let command = TcpListener::bind(self.conf.command_addr()).await?;
        self.register().await?;
        self.serve(client, command).await
    }

    /// Serve on pre-bound listeners. Tests bind port 0 and pass the
    /// listeners in.
    pub async fn serve(
        self: Arc<Self>,
        client: TcpListener,
        command: TcpListener,
    ) -> DfsResult<()> {
        info!(
            "storage server: client on {}, command on {}, root {}",
            client.local_addr()?,
            command.local_addr()?,
            self.store.root().display()
        );

        let client_router = handlers::client_router(self.clone());
        let command_router = handlers::command_router(self.clone());
        tokio::try_join!(
            axum::serve(client, client_router).into_future(),
            axum::serve(command, command_router).into_future(),
        )?;
        Ok(())
    }
}
