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

//! API to create a new customer.

use crate::driver::Driver;
use crate::model::{Customer, CustomerRequest};
use crate::rest::CUSTOMERS_PATH;
use axum::extract::State;
use axum::{Json, http};
use crm_core::rest::{JsonBody, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    JsonBody(request): JsonBody<CustomerRequest>,
) -> Result<(http::StatusCode, [(http::HeaderName, String); 1], Json<Customer>), RestError> {
    let fields = request.validate()?;
    let customer = driver.create_customer(fields).await?;
    let location = format!("{}/{}", CUSTOMERS_PATH, customer.id());
    Ok((http::StatusCode::CREATED, [(http::header::LOCATION, location)], Json(customer)))
}
