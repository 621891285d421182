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

//! SQLite backend, mostly used to run tests against an in-memory database.

use crate::db::{BackendExecutor, Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use log::warn;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{Sqlite, SqlitePool};

/// Executor for SQLite connections and transactions.
pub type SqliteExecutor = BackendExecutor<Sqlite>;

/// Converts a raw sqlx error `e` into a `DbError`.
///
/// Constraint failures keep SQLite's message, such as `UNIQUE constraint failed: customers.email`,
/// which names the offending column.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::Database(e) => {
            let cause = e.message().to_owned();
            match e.kind() {
                ErrorKind::UniqueViolation => DbError::AlreadyExists(cause),
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    DbError::ConstraintViolation(cause)
                }
                _ => DbError::BackendError(e.to_string()),
            }
        }
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Opens a pool against the SQLite database at `conn_str`.
///
/// `:memory:` gives an in-memory database that every connection in the pool shares.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePool::connect(conn_str).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Applies a `schema` made of one or more statements.
pub async fn run_schema(ex: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(&mut **ex).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Pool of SQLite connections.
pub struct SqliteDb {
    /// Connections shared by all concurrent requests.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Checks out a connection typed for SQLite.
    pub async fn typed_ex(&self) -> DbResult<SqliteExecutor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(BackendExecutor::Conn(conn))
    }
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("SQLite pool dropped without calling close()");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Sqlite(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(BackendExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Test utilities for the SQLite backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens an empty in-memory database and sets up test logging.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}
