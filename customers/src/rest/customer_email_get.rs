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

//! API to get one customer by its email address.

use crate::driver::Driver;
use crate::model::Customer;
use axum::Json;
use axum::extract::State;
use crm_core::model::EmailAddress;
use crm_core::rest::{EmptyBody, PathParam, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParam(email): PathParam<String>,
    _: EmptyBody,
) -> Result<Json<Customer>, RestError> {
    let email = EmailAddress::new(&email).map_err(|_| {
        RestError::NotFound(format!("Customer with email '{}' not found", email))
    })?;
    let customer = driver.get_customer_by_email(email).await?;
    Ok(Json(customer))
}
