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

//! Entry point to the customers service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crm_core::db::Db;
use crm_core::db::postgres::{PostgresDb, PostgresOptions};
use crm_customers::db::init_schema;
use crm_customers::{ServeOptions, serve};
use log::error;
use std::sync::Arc;

/// Sets up the database and runs the server until it is asked to stop.
async fn run() -> Result<(), String> {
    let serve_opts = ServeOptions::from_env("CUSTOMERS")?;

    let db_opts = PostgresOptions::from_env("PGSQL_PROD")?;
    let db = Arc::from(PostgresDb::connect(db_opts).map_err(|e| e.to_string())?);
    let mut ex = db.ex().await.map_err(|e| e.to_string())?;
    init_schema(&mut ex).await.map_err(|e| e.to_string())?;
    drop(ex);

    serve(serve_opts, db).await
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}
