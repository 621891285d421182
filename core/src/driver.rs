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

//! Errors of the business logic layer.
//!
//! Each service defines its own `Driver` holding an `Arc<dyn Db + Send + Sync>` and any other
//! shared resources.  Driver operations take `self` by value and open, use and commit exactly one
//! transaction, so a handler that needs two operations has to clone the driver explicitly.

use crate::db::DbError;

/// Failures of a driver operation, covering both rule violations and backend problems.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// Another entry already holds one of the unique values of the entry being written, as found
    /// by a lookup before the write.
    #[error("{0}")]
    AlreadyExists(String),

    /// The database failed in a way the caller cannot fix.
    #[error("{0}")]
    BackendError(String),

    /// A unique key was duplicated and the database refused the write.  Holds the message given
    /// by the database.
    #[error("{0}")]
    DuplicateKey(String),

    /// The database refused the write because of a constraint other than a unique key.  Holds
    /// the message given by the database.
    #[error("{0}")]
    IntegrityViolation(String),

    /// The requested entry does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl From<DbError> for DriverError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::AlreadyExists(cause) => DriverError::DuplicateKey(cause),
            DbError::BackendError(_) => DriverError::BackendError(e.to_string()),
            DbError::ConstraintViolation(cause) => DriverError::IntegrityViolation(cause),
            DbError::DataIntegrityError(_) => DriverError::BackendError(e.to_string()),
            DbError::NotFound => DriverError::NotFound(e.to_string()),
            DbError::Unavailable => DriverError::BackendError(e.to_string()),
        }
    }
}

/// Result type for this module.
pub type DriverResult<T> = Result<T, DriverError>;
