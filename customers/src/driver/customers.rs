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

//! Operations on the collection of customers.

use crate::db;
use crate::driver::{Driver, check_unique_fields};
use crate::model::{Customer, CustomerFields};
use crm_core::driver::DriverResult;

impl Driver {
    /// Creates a new customer with the given `fields`.
    pub(crate) async fn create_customer(self, fields: CustomerFields) -> DriverResult<Customer> {
        let mut tx = self.db.begin().await?;
        check_unique_fields(tx.ex(), &fields, None).await?;
        let customer = db::create_customer(tx.ex(), fields).await?;
        tx.commit().await?;
        Ok(customer)
    }

    /// Gets all existing customers.
    pub(crate) async fn list_customers(self) -> DriverResult<Vec<Customer>> {
        let mut tx = self.db.begin().await?;
        let customers = db::list_customers(tx.ex()).await?;
        tx.commit().await?;
        Ok(customers)
    }
}
