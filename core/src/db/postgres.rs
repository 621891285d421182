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

//! PostgreSQL backend for production deployments.

use crate::db::{BackendExecutor, Db, DbError, DbResult, Executor, TxExecutor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use log::warn;
use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPool, PgPoolOptions, Postgres};
use std::future::Future;
use std::time::Duration;

/// Default number of times to retry acquiring a connection while the server is unavailable.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// Delay after which the backoff between retries stops growing.
const MAX_GROWING_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for a pooled connection before declaring the server unavailable.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Executor for PostgreSQL connections and transactions.
pub type PostgresExecutor = BackendExecutor<Postgres>;

/// Converts a raw sqlx error `e` into a `DbError`.
///
/// Unique violations carry the server's message plus its detail line, which names the key and
/// value that clashed.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::Database(e) => {
            let pg = e.downcast_ref::<PgDatabaseError>();
            match pg.code() {
                "23505" /* unique_violation */ => DbError::AlreadyExists(match pg.detail() {
                    Some(detail) => format!("{}: {}", pg.message(), detail),
                    None => pg.message().to_owned(),
                }),
                "23502" /* not_null_violation */ | "23514" /* check_violation */ => {
                    DbError::ConstraintViolation(pg.message().to_owned())
                }
                "53300" /* too_many_connections */ => DbError::Unavailable,
                code => DbError::BackendError(format!("pgsql error {}: {}", code, e)),
            }
        }
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Settings to reach a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Server host name.
    pub host: String,

    /// Server port, usually 5432.
    pub port: u16,

    /// Name of the database to use.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password of the role.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Connections to keep open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on open connections.
    pub max_connections: Option<u32>,

    /// Times to retry acquiring a connection while the server is unavailable.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the options from the `<prefix>_*` environment variables.
    ///
    /// `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`, `<prefix>_USERNAME` and
    /// `<prefix>_PASSWORD` are required.  `<prefix>_MIN_CONNECTIONS`, `<prefix>_MAX_CONNECTIONS`
    /// and `<prefix>_MAX_RETRIES` are optional.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var(prefix, "HOST")?,
            port: get_required_var(prefix, "PORT")?,
            database: get_required_var(prefix, "DATABASE")?,
            username: get_required_var(prefix, "USERNAME")?,
            password: get_required_var(prefix, "PASSWORD")?,
            min_connections: get_optional_var(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var(prefix, "MAX_CONNECTIONS")?,
            max_retries: get_optional_var(prefix, "MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}

/// Randomized, growing delays between attempts to reach an unavailable server.
struct Backoff {
    /// Delay to apply before the next attempt.
    delay: Duration,

    /// Attempts that remain before giving up.
    retries_left: u16,
}

impl Backoff {
    /// Creates a backoff that allows `max_retries` retries.
    fn new(max_retries: u16) -> Self {
        let delay = Duration::from_millis(100 + u64::from(rand::random::<u16>() % 900));
        Self { delay, retries_left: max_retries }
    }

    /// Consumes one retry and returns how long to wait before it, or `None` if none are left.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;

        let delay = self.delay;
        if self.delay < MAX_GROWING_DELAY {
            self.delay += Duration::from_millis(u64::from(rand::random::<u16>() % 1000));
        }
        Some(delay)
    }
}

/// Runs `op` until it succeeds, fails with something other than `Unavailable`, or the retries
/// allowed by `max_retries` run out.
async fn retry<Op, OpFut, T>(op: Op, max_retries: u16) -> DbResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut backoff = Backoff::new(max_retries);
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "Database unavailable; retrying in {}ms ({} retries left)",
                        delay.as_millis(),
                        backoff.retries_left
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(DbError::Unavailable),
            },
            result => return result,
        }
    }
}

/// Pool of PostgreSQL connections.
pub struct PostgresDb {
    /// Connections shared by all concurrent requests.
    pool: PgPool,

    /// Times to retry acquiring a connection while the server is unavailable.
    max_retries: u16,
}

impl PostgresDb {
    /// Configures a pool from `opts`.
    ///
    /// Connections are opened lazily, so this succeeds even if the server is down.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let mut pool_options = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
        if let Some(min_connections) = opts.min_connections {
            pool_options = pool_options.min_connections(min_connections);
        }
        if let Some(max_connections) = opts.max_connections {
            pool_options = pool_options.max_connections(max_connections);
        }

        let connect_options = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password);

        Ok(Self {
            pool: pool_options.connect_lazy_with(connect_options),
            max_retries: opts.max_retries,
        })
    }

    /// Checks out a connection typed for PostgreSQL.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        let conn = retry(|| self.pool.acquire(), self.max_retries).await?;
        Ok(BackendExecutor::Conn(conn))
    }
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgreSQL pool dropped without calling close()");
        }
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = retry(|| self.pool.begin(), self.max_retries).await?;
        Ok(TxExecutor(Executor::Postgres(BackendExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Applies a `schema` made of one or more statements.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(&mut **ex).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the database configured in the `PGSQL_TEST_*` variables.
    ///
    /// The pool holds exactly one connection whose `search_path` points at `pg_temp`, so the
    /// tables created by a test vanish when the pool is closed.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let opts = PostgresOptions {
            min_connections: Some(1),
            max_connections: Some(1),
            ..PostgresOptions::from_env("PGSQL_TEST").unwrap()
        };
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(&mut *ex).await.unwrap();
        db
    }
}
