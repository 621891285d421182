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

//! Database abstraction to manipulate customer records.

use crate::model::{Customer, CustomerFields, CustomerId, CustomerName, PhoneNumber};
#[cfg(feature = "postgres")]
use crm_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use crm_core::db::sqlite;
use crm_core::db::{DbError, DbResult, Executor};
use crm_core::model::EmailAddress;
use futures::TryStreamExt;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Builds a customer from the raw values of a row.
fn build_customer(
    id: i64,
    name: String,
    email: String,
    phone_number: Option<String>,
) -> DbResult<Customer> {
    Ok(Customer::new(
        CustomerId::new(id)?,
        CustomerName::new(name)?,
        EmailAddress::new(email)?,
        phone_number.map(PhoneNumber::new).transpose()?,
    ))
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Customer {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let phone_number: Option<String> =
            row.try_get("phone_number").map_err(postgres::map_sqlx_error)?;

        build_customer(id, name, email, phone_number)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Customer {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let phone_number: Option<String> =
            row.try_get("phone_number").map_err(sqlite::map_sqlx_error)?;

        build_customer(id, name, email, phone_number)
    }
}

/// Gets all existing customers, ordered by their identifier.
pub(crate) async fn list_customers(ex: &mut Executor) -> DbResult<Vec<Customer>> {
    let query_str = "SELECT id, name, email, phone_number FROM customers ORDER BY id ASC";

    let mut customers = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                customers.push(Customer::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(&mut **ex);
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                customers.push(Customer::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(customers)
}

/// Gets the customer identified by `id`.
pub(crate) async fn get_customer(ex: &mut Executor, id: CustomerId) -> DbResult<Customer> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, email, phone_number FROM customers WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, email, phone_number FROM customers WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the customer that owns the `email` address.
pub(crate) async fn get_customer_by_email(
    ex: &mut Executor,
    email: &EmailAddress,
) -> DbResult<Customer> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT id, name, email, phone_number FROM customers WHERE email = $1";
            let row = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT id, name, email, phone_number FROM customers WHERE email = ?";
            let row = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the customer that owns the `phone_number`.
pub(crate) async fn get_customer_by_phone_number(
    ex: &mut Executor,
    phone_number: &PhoneNumber,
) -> DbResult<Customer> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "SELECT id, name, email, phone_number FROM customers WHERE phone_number = $1";
            let row = sqlx::query(query_str)
                .bind(phone_number.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "SELECT id, name, email, phone_number FROM customers WHERE phone_number = ?";
            let row = sqlx::query(query_str)
                .bind(phone_number.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Customer::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates a new customer with the given `fields` and returns it with its assigned identifier.
pub(crate) async fn create_customer(
    ex: &mut Executor,
    fields: CustomerFields,
) -> DbResult<Customer> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO customers (name, email, phone_number)
                VALUES ($1, $2, $3)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name().as_str())
                .bind(fields.email().as_str())
                .bind(fields.phone_number().as_ref().map(PhoneNumber::as_str))
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO customers (name, email, phone_number)
                VALUES (?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(fields.name().as_str())
                .bind(fields.email().as_str())
                .bind(fields.phone_number().as_ref().map(PhoneNumber::as_str))
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(fields.with_id(CustomerId::new(id)?))
}

/// Replaces all mutable fields of the customer identified by `id` with `fields`.
pub(crate) async fn update_customer(
    ex: &mut Executor,
    id: CustomerId,
    fields: CustomerFields,
) -> DbResult<Customer> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE customers SET name = $1, email = $2, phone_number = $3
                WHERE id = $4";
            let done = sqlx::query(query_str)
                .bind(fields.name().as_str())
                .bind(fields.email().as_str())
                .bind(fields.phone_number().as_ref().map(PhoneNumber::as_str))
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE customers SET name = ?, email = ?, phone_number = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(fields.name().as_str())
                .bind(fields.email().as_str())
                .bind(fields.phone_number().as_ref().map(PhoneNumber::as_str))
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(fields.with_id(id)),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the customer identified by `id`.
pub(crate) async fn delete_customer(ex: &mut Executor, id: CustomerId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM customers WHERE id = $1")
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM customers WHERE id = ?")
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}
