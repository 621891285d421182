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

//! Operations on one customer.

use crate::db;
use crate::driver::{Driver, check_unique_fields, not_found_by_id};
use crate::model::{Customer, CustomerFields, CustomerId};
use crm_core::db::DbError;
use crm_core::driver::{DriverError, DriverResult};
use crm_core::model::EmailAddress;

impl Driver {
    /// Deletes the customer identified by `id`.
    pub(crate) async fn delete_customer(self, id: CustomerId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::delete_customer(tx.ex(), id).await.map_err(|e| not_found_by_id(e, id))?;
        tx.commit().await?;
        Ok(())
    }

    /// Gets the customer identified by `id`.
    pub(crate) async fn get_customer(self, id: CustomerId) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        let customer = db::get_customer(tx.ex(), id).await.map_err(|e| not_found_by_id(e, id))?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Gets the customer that owns the `email` address.
    pub(crate) async fn get_customer_by_email(self, email: EmailAddress) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        let customer = match db::get_customer_by_email(tx.ex(), &email).await {
            Ok(customer) => customer,
            Err(DbError::NotFound) => {
                return Err(DriverError::NotFound(format!(
                    "Customer with email '{}' not found",
                    email.as_str()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        tx.commit().await?;
        Ok(customer)
    }

    /// Replaces the contents of the customer identified by `id` with `fields`.
    pub(crate) async fn update_customer(
        self,
        id: CustomerId,
        fields: CustomerFields,
    ) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        db::get_customer(tx.ex(), id).await.map_err(|e| not_found_by_id(e, id))?;
        check_unique_fields(tx.ex(), &fields, Some(id)).await?;
        let customer =
            db::update_customer(tx.ex(), id, fields).await.map_err(|e| not_found_by_id(e, id))?;
        tx.commit().await?;
        Ok(customer)
    }
}
