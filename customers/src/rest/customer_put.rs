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

//! API to replace the contents of an existing customer.

use crate::driver::Driver;
use crate::model::{Customer, CustomerRequest};
use crate::rest::parse_customer_id;
use axum::Json;
use axum::extract::State;
use crm_core::rest::{JsonBody, PathParam, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParam(id): PathParam<i64>,
    JsonBody(request): JsonBody<CustomerRequest>,
) -> Result<Json<Customer>, RestError> {
    let id = parse_customer_id(id)?;
    let fields = request.validate()?;
    let customer = driver.update_customer(id, fields).await?;
    Ok(Json(customer))
}
