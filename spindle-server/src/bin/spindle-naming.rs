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
use spindle_common::conf::NamingConf;
use spindle_server::naming::NamingServer;

/// Naming server: owns the namespace tree and routes clients to the
/// storage servers holding their files.
#[derive(Debug, Parser)]
#[command(name = "spindle-naming")]
struct NamingArgs {
    /// Port for the client-facing service API.
    service_port: u16,

    /// Port storage servers register on.
    registration_port: u16,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = NamingArgs::parse();

    let conf = NamingConf::new(args.service_port, args.registration_port);
    let server = NamingServer::new(conf);
    if let Err(e) = server.run().await {
        error!("naming server failed: {}", e);
        std::process::exit(1);
    }
}
