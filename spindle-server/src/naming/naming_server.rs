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

use crate::naming::commands::CommandClient;
use crate::naming::handlers;
use crate::naming::meta::Namespace;
use crate::naming::registry::StorageRegistry;
use crate::naming::replication::ReplicationController;
use log::info;
use spindle_common::conf::NamingConf;
use spindle_common::DfsResult;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The metadata coordinator: owns the namespace tree, the storage-server
/// registry, and the replication policy, and serves two HTTP ports (the
/// client service and storage registration).
pub struct NamingServer {
    conf: NamingConf,
    namespace: Namespace,
    registry: Arc<StorageRegistry>,
    commands: CommandClient,
    replication: ReplicationController,
}

impl NamingServer {
    /// Must be called inside a tokio runtime (the namespace root spawns
    /// its lock scheduler).
    pub fn new(conf: NamingConf) -> Arc<Self> {
        let registry = Arc::new(StorageRegistry::new());
        let commands = CommandClient::new();
        let replication = ReplicationController::new(registry.clone(), commands.clone());
        Arc::new(Self {
            conf,
            namespace: Namespace::new(),
            registry,
            commands,
            replication,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn registry(&self) -> &StorageRegistry {
        &self.registry
    }

    pub fn commands(&self) -> &CommandClient {
        &self.commands
    }

    pub fn replication(&self) -> &ReplicationController {
        &self.replication
    }

    /// Bind the configured ports and serve until either listener fails.
    pub async fn run(self: Arc<Self>) -> DfsResult<()> {
        let service = TcpListener::bind(self.conf.service_addr()).await?;
        let registration = TcpListener::bind(self.conf.registration_addr()).await?;
        self.serve(service, registration).await
    }

    /// Serve on pre-bound listeners. Tests bind port 0 and pass the
    /// listeners in.
    pub async fn serve(
        self: Arc<Self>,
        service: TcpListener,
        registration: TcpListener,
    ) -> DfsResult<()> {
        info!(
            "naming server: service on {}, registration on {}",
            service.local_addr()?,
            registration.local_addr()?
        );

        let service_router = handlers::service_router(self.clone());
        let registration_router = handlers::registration_router(self.clone());
        tokio::try_join!(
            axum::serve(service, service_router).into_future(),
            axum::serve(registration, registration_router).into_future(),
        )?;
        Ok(())
    }
}
