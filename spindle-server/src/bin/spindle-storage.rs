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

use clap::Parser;
use log::error;
use spindle_common::conf::StorageConf;
use spindle_server::storage::StorageServer;
use std::path::PathBuf;

/// Storage server: holds file bytes under a local directory and obeys
/// create, delete and copy commands from the naming server.
#[derive(Debug, Parser)]
#[command(name = "spindle-storage")]
struct StorageArgs {
    /// Port for byte reads and writes.
    client_port: u16,

    /// Port the naming server sends commands to.
    command_port: u16,

    /// The naming server's registration port.
    registration_port: u16,

    /// Root directory holding this server's file bytes.
    directory: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = StorageArgs::parse();

    if let Err(e) = std::fs::create_dir_all(&args.directory) {
        error!(
            "cannot create storage directory {}: {}",
            args.directory.display(),
            e
        );
        std::process::exit(1);
    }

    let conf = StorageConf::new(
        args.client_port,
        args.command_port,
        args.registration_port,
        args.directory,
    );
    let server = StorageServer::new(conf);
    if let Err(e) = server.run().await {
        error!("storage server failed: {}", e);
        std::process::exit(1);
    }
}
