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

//! Building blocks for database-backed CRUD services that speak JSON over HTTP.
//!
//! A service built on this crate is split into layers, each living in a module of the same name
//! within the service crate:
//!
//! 1.  `model`: domain types that refuse invalid contents at construction time.  A single bad
//!     value is a `ModelError`; a whole request checked field by field yields a
//!     `ValidationError` with one `FieldViolation` per broken rule.
//!
//! 1.  `db`: free functions that take an `Executor` and run the queries of each backend.
//!
//! 1.  `driver`: the `Driver` type, which owns shared resources and runs each operation inside one
//!     transaction.
//!
//! 1.  `rest`: an `axum::Router` with one handler per API, all sharing the `Driver` as state.
//!
//! 1.  `main`: reads the configuration from the environment and starts the server.
//!
//! Each layer has its own error type (`ModelError`, `DbError`, `DriverError`, `RestError`) and
//! `From` conversions between them, so `?` carries a failure up to the REST layer, where it turns
//! into a status code and the JSON error envelope.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
