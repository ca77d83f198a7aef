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
use std::fmt::{Display, Formatter};

/// One registered storage server. The client port serves byte reads and
/// writes, the command port obeys the naming server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAddress {
    pub ip: String,
    pub client_port: u16,
    pub command_port: u16,
}

impl StorageAddress {
    pub fn client_url(&self, route: &str) -> String {
        format!("http://{}:{}/{}", self.ip, self.client_port, route)
    }

    pub fn command_url(&self, route: &str) -> String {
        format!("http://{}:{}/{}", self.ip, self.command_port, route)
    }
}

// Identity is the port pair; a re-registration with the same ports is the
// same server regardless of the advertised ip.
impl PartialEq for StorageAddress {
    fn eq(&self, other: &Self) -> bool {
        self.client_port == other.client_port && self.command_port == other.command_port
    }
}

impl Eq for StorageAddress {}

impl Display for StorageAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}",
            self.ip, self.client_port, self.command_port
        )
    }
}
