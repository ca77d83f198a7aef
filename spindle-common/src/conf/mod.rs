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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const LOCAL_IP: &str = "127.0.0.1";

/// Naming server configuration. Built from the two positional CLI ports;
/// everything else has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConf {
    pub bind_ip: String,
    pub service_port: u16,
    pub registration_port: u16,
}

impl NamingConf {
    pub fn new(service_port: u16, registration_port: u16) -> Self {
        Self {
            bind_ip: LOCAL_IP.to_string(),
            service_port,
            registration_port,
        }
    }

    pub fn service_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.service_port)
    }

    pub fn registration_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.registration_port)
    }
}

/// Storage server configuration: its two serving ports, where to find the
/// naming server's registration port, and the local root directory that
/// holds the file bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConf {
    pub bind_ip: String,
    pub client_port: u16,
    pub command_port: u16,
    pub naming_ip: String,
    pub registration_port: u16,
    pub root_dir: PathBuf,
}

impl StorageConf {
    pub fn new(
        client_port: u16,
        command_port: u16,
        registration_port: u16,
        root_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bind_ip: LOCAL_IP.to_string(),
            client_port,
            command_port,
            naming_ip: LOCAL_IP.to_string(),
            registration_port,
            root_dir: root_dir.into(),
        }
    }

    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.client_port)
    }

    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.command_port)
    }

    pub fn register_url(&self) -> String {
        format!("http://{}:{}/register", self.naming_ip, self.registration_port)
    }
}
