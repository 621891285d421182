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

//! Database access shared by all services.
//!
//! PostgreSQL backs production deployments while SQLite, usually in-memory, backs the tests.  Both
//! sit behind the `Db` trait, and the `Executor` type lets store code pick the typed connection
//! it needs with a `match` on the backend.
//!
//! Uniqueness and integrity rules live in the schema of each service.  Violations come back as
//! `AlreadyExists` or `ConstraintViolation` together with the database's own description of the
//! problem, so concurrent writers that race for the same unique value still get a precise error.

use crate::model::ModelError;
use async_trait::async_trait;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use std::ops::{Deref, DerefMut};

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Errors raised by the persistence layer.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// A write would have duplicated the value of a unique key.  Holds the database's
    /// description of the clash.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Any database failure we do not classify more precisely.
    #[error("Database error: {0}")]
    BackendError(String),

    /// A write broke a `NOT NULL` or `CHECK` constraint.  Holds the database's description of
    /// the broken rule.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Stored data could not be turned back into a valid model value.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The requested row does not exist.
    #[error("Entity not found")]
    NotFound,

    /// The database cannot take more work right now.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Typed executor for one backend: either a connection checked out of the pool or an open
/// transaction.
///
/// Both variants dereference to the backend's connection type, so queries are written as
/// `query.execute(&mut **ex)` no matter where the executor came from.
#[derive(Debug)]
pub enum BackendExecutor<DB: sqlx::Database> {
    /// A connection taken from the pool, with every statement committed on its own.
    Conn(PoolConnection<DB>),

    /// A transaction that is rolled back unless explicitly committed.
    Tx(Transaction<'static, DB>),
}

impl<DB: sqlx::Database> BackendExecutor<DB> {
    /// Commits the wrapped transaction, translating failures with `map_err`.
    ///
    /// Panics if the executor is not backed by a transaction.
    async fn commit(self, map_err: fn(sqlx::Error) -> DbError) -> DbResult<()> {
        match self {
            BackendExecutor::Conn(_) => unreachable!("Only transactions can be committed"),
            BackendExecutor::Tx(tx) => tx.commit().await.map_err(map_err),
        }
    }
}

impl<DB: sqlx::Database> Deref for BackendExecutor<DB> {
    type Target = DB::Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            BackendExecutor::Conn(conn) => conn,
            BackendExecutor::Tx(tx) => tx,
        }
    }
}

impl<DB: sqlx::Database> DerefMut for BackendExecutor<DB> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            BackendExecutor::Conn(conn) => conn,
            BackendExecutor::Tx(tx) => tx,
        }
    }
}

/// An executor for whichever backend the service was configured with.
///
/// Store functions destructure this to reach the typed executor, which sqlx needs to check
/// queries against the right dialect.
pub enum Executor {
    /// Executor for PostgreSQL.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// Executor for SQLite.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An executor backed by an open transaction.
///
/// Dropping it without calling `commit` rolls the transaction back.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Gives access to the executor to run statements inside the transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.commit(postgres::map_sqlx_error).await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.commit(sqlite::map_sqlx_error).await,
        }
    }
}

/// Handle to a database connection pool.
#[async_trait]
pub trait Db {
    /// Checks out a connection from the pool for statements that need no transaction.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a new transaction.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the pool once all checked-out connections have been returned.
    async fn close(&self);
}

/// Macros to run the same tests against every database backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Generates a test named `name` that calls `module::name` with the database returned by
    /// `setup`, optionally tagged with the `extra` attribute.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Generates one test per `name` in `module`, all of them running against the database
    /// returned by `setup` and optionally tagged with the `extra` attribute.
    ///
    /// Any schema the tests rely on must be set up by `setup`.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}

#[cfg(all(test, any(feature = "postgres", feature = "sqlite")))]
mod tests {
    use super::*;
    use sqlx::Row;
    use std::sync::Arc;

    /// Runs `sql`, which must be valid in every backend, and discards any results.
    async fn exec(ex: &mut Executor, sql: &str) -> DbResult<()> {
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => {
                sqlx::query(sql).execute(&mut **ex).await.map_err(postgres::map_sqlx_error)?;
            }

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => {
                sqlx::query(sql).execute(&mut **ex).await.map_err(sqlite::map_sqlx_error)?;
            }
        }
        Ok(())
    }

    /// Runs `sql`, which must be valid in every backend, and returns the `BIGINT` value in the
    /// `value` column of the only row it yields.
    async fn fetch_value(ex: &mut Executor, sql: &str) -> DbResult<i64> {
        let value: i64 = match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => sqlx::query(sql)
                .fetch_one(&mut **ex)
                .await
                .and_then(|row| row.try_get("value"))
                .map_err(postgres::map_sqlx_error)?,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => sqlx::query(sql)
                .fetch_one(&mut **ex)
                .await
                .and_then(|row| row.try_get("value"))
                .map_err(sqlite::map_sqlx_error)?,
        };
        Ok(value)
    }

    /// Counts the rows in the `people` table.
    async fn count_people(db: &(dyn Db + Send + Sync)) -> i64 {
        let mut ex = db.ex().await.unwrap();
        fetch_value(&mut ex, "SELECT COUNT(*) AS value FROM people").await.unwrap()
    }

    /// Creates the `people` table used by the tests.
    async fn create_people(db: &(dyn Db + Send + Sync)) {
        exec(
            &mut db.ex().await.unwrap(),
            "CREATE TABLE people (
                age BIGINT NOT NULL,
                name TEXT CHECK (length(name) >= 3),
                email TEXT UNIQUE
            )",
        )
        .await
        .unwrap();
    }

    pub(super) async fn test_ex_autocommits(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        exec(&mut db.ex().await.unwrap(), "INSERT INTO people (age) VALUES (30)").await.unwrap();
        exec(&mut db.ex().await.unwrap(), "INSERT INTO people (age) VALUES (40)").await.unwrap();
        assert_eq!(2, count_people(db.as_ref()).await);

        db.close().await;
    }

    pub(super) async fn test_tx_commit_is_visible(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        let mut tx = db.begin().await.unwrap();
        exec(tx.ex(), "INSERT INTO people (age) VALUES (30)").await.unwrap();
        exec(tx.ex(), "INSERT INTO people (age) VALUES (40)").await.unwrap();
        assert_eq!(
            40,
            fetch_value(tx.ex(), "SELECT MAX(age) AS value FROM people").await.unwrap()
        );
        tx.commit().await.unwrap();

        assert_eq!(2, count_people(db.as_ref()).await);
        db.close().await;
    }

    pub(super) async fn test_tx_dropped_rolls_back(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        let mut tx = db.begin().await.unwrap();
        exec(tx.ex(), "INSERT INTO people (age) VALUES (30)").await.unwrap();
        drop(tx);

        assert_eq!(0, count_people(db.as_ref()).await);
        db.close().await;
    }

    pub(super) async fn test_unique_violation_describes_key(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        let insert = "INSERT INTO people (age, email) VALUES (30, 'a@example.com')";
        exec(&mut db.ex().await.unwrap(), insert).await.unwrap();
        match exec(&mut db.ex().await.unwrap(), insert).await {
            Err(DbError::AlreadyExists(cause)) => assert!(cause.contains("email"), "{}", cause),
            e => panic!("Must have failed with AlreadyExists but got: {:?}", e),
        }

        assert_eq!(1, count_people(db.as_ref()).await);
        db.close().await;
    }

    pub(super) async fn test_check_violation(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        let insert = "INSERT INTO people (age, name) VALUES (30, 'Al')";
        match exec(&mut db.ex().await.unwrap(), insert).await {
            Err(DbError::ConstraintViolation(cause)) => assert!(!cause.is_empty()),
            e => panic!("Must have failed with ConstraintViolation but got: {:?}", e),
        }

        db.close().await;
    }

    pub(super) async fn test_not_null_violation(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        let insert = "INSERT INTO people (name) VALUES ('Martin')";
        match exec(&mut db.ex().await.unwrap(), insert).await {
            Err(DbError::ConstraintViolation(cause)) => assert!(!cause.is_empty()),
            e => panic!("Must have failed with ConstraintViolation but got: {:?}", e),
        }

        db.close().await;
    }

    pub(super) async fn test_missing_row(db: Arc<dyn Db + Send + Sync>) {
        create_people(db.as_ref()).await;

        assert_eq!(
            DbError::NotFound,
            fetch_value(&mut db.ex().await.unwrap(), "SELECT age AS value FROM people")
                .await
                .unwrap_err()
        );

        db.close().await;
    }

    pub(super) async fn test_concurrent_txs(db: Arc<dyn Db + Send + Sync>) {
        let tx1 = db.begin().await.unwrap();
        let tx2 = db.begin().await.unwrap();
        tx2.commit().await.unwrap();
        tx1.commit().await.unwrap();

        let tx3 = db.begin().await.unwrap();
        tx3.commit().await.unwrap();

        db.close().await;
    }

    /// Instantiates the tests that open more than one connection at once.  These cannot create
    /// tables.
    macro_rules! generate_db_ro_concurrent_tests [
        ( $setup:expr $(, #[$extra:meta])? ) => {
            $crate::db::testutils::generate_tests!(
                $( #[$extra], )?
                $setup,
                $crate::db::tests,
                test_concurrent_txs
            );
        }
    ];

    pub(super) use generate_db_ro_concurrent_tests;

    /// Instantiates the tests that need to create tables.
    macro_rules! generate_db_rw_tests [
        ( $setup:expr $(, #[$extra:meta])? ) => {
            $crate::db::testutils::generate_tests!(
                $( #[$extra], )?
                $setup,
                $crate::db::tests,
                test_ex_autocommits,
                test_tx_commit_is_visible,
                test_tx_dropped_rolls_back,
                test_unique_violation_describes_key,
                test_check_violation,
                test_not_null_violation,
                test_missing_row
            );
        }
    ];

    pub(super) use generate_db_rw_tests;
}
