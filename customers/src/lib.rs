// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! REST service to manage customer records.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crm_core::db::Db;
use crm_core::env::get_optional_var;
use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub mod db;
mod driver;
use driver::Driver;
pub(crate) mod model;
mod rest;
use rest::app;

/// Default address to listen on when none is configured.
const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default port to listen on when none is configured.
const DEFAULT_PORT: u16 = 3000;

/// Options to establish the listening socket of the server.
#[derive(Debug, PartialEq)]
pub struct ServeOptions {
    /// Address to bind to.
    pub address: IpAddr,

    /// Port to bind to.
    pub port: u16,
}

impl ServeOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_ADDRESS` and `<prefix>_PORT`, both of which are
    /// optional.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            address: get_optional_var::<IpAddr>(prefix, "ADDRESS")?.unwrap_or(DEFAULT_ADDRESS),
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(DEFAULT_PORT),
        })
    }

    /// Returns the socket address these options describe.
    fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Waits until the process is asked to terminate.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for the termination signal: {}", e);
    }
    info!("Shutting down");
}

/// Instantiates all resources to serve the application as configured by `opts`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(opts: ServeOptions, db: Arc<dyn Db + Send + Sync>) -> Result<(), String> {
    let driver = Driver::new(db.clone());
    let app = app(driver);

    let addr = opts.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Cannot bind to {}: {}", addr, e))?;
    info!("Listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server failed: {}", e));
    db.close().await;
    result
}
