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

//! Business logic for the service.

use crate::db;
use crate::model::{CustomerFields, CustomerId};
use crm_core::db::{Db, DbError, Executor};
use crm_core::driver::{DriverError, DriverResult};
use std::sync::Arc;

mod customer;
mod customers;
#[cfg(test)]
mod testutils;

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub(crate) fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { db }
    }
}

/// Checks that the unique values in `fields` are not held by any customer other than `owner`.
///
/// Uniqueness is ultimately enforced by the database: concurrent writers that slip past this check
/// fail later with a duplicate key error.
async fn check_unique_fields(
    ex: &mut Executor,
    fields: &CustomerFields,
    owner: Option<CustomerId>,
) -> DriverResult<()> {
    let is_other = |id: &CustomerId| owner.as_ref() != Some(id);

    match db::get_customer_by_email(ex, fields.email()).await {
        Ok(customer) if is_other(customer.id()) => {
            return Err(DriverError::AlreadyExists(format!(
                "Customer with email '{}' already exists",
                fields.email().as_str()
            )));
        }
        Ok(_) | Err(DbError::NotFound) => (),
        Err(e) => return Err(e.into()),
    }

    if let Some(phone_number) = fields.phone_number() {
        match db::get_customer_by_phone_number(ex, phone_number).await {
            Ok(customer) if is_other(customer.id()) => {
                return Err(DriverError::AlreadyExists(format!(
                    "Customer with phone number '{}' already exists",
                    phone_number.as_str()
                )));
            }
            Ok(_) | Err(DbError::NotFound) => (),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Converts a `NotFound` error from the database into a message that names customer `id`.
fn not_found_by_id(e: DbError, id: CustomerId) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound(format!("Customer with id {} not found", id)),
        e => e.into(),
    }
}
