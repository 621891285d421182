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

//! Entry point to the REST server.

use crate::driver::Driver;
use crate::model::CustomerId;
use axum::{Router, middleware};
use crm_core::rest::{RestError, RestResult, not_found_fallback, reject_unsupported_methods};

mod customer_delete;
mod customer_email_get;
mod customer_get;
mod customer_put;
mod customers_get;
mod customers_post;
mod diagnostics_get;
#[cfg(test)]
mod testutils;

/// Base path of all customer APIs.
const CUSTOMERS_PATH: &str = "/api/v1/customers";

/// Converts the raw `id` received in a path to a customer identifier.
///
/// Identifiers that cannot possibly exist are reported as not found.
fn parse_customer_id(id: i64) -> RestResult<CustomerId> {
    CustomerId::new(id)
        .map_err(|_| RestError::NotFound(format!("Customer with id {} not found", id)))
}

/// Creates the router for the application.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::get;

    Router::new()
        .route(CUSTOMERS_PATH, get(customers_get::handler).post(customers_post::handler))
        .route(
            &format!("{}/:id", CUSTOMERS_PATH),
            get(customer_get::handler).put(customer_put::handler).delete(customer_delete::handler),
        )
        .route(&format!("{}/email/:email", CUSTOMERS_PATH), get(customer_email_get::handler))
        .route(&format!("{}/malformed", CUSTOMERS_PATH), get(diagnostics_get::malformed_handler))
        .route(
            &format!("{}/field-already", CUSTOMERS_PATH),
            get(diagnostics_get::field_already_handler),
        )
        .route(
            &format!("{}/field-invalid", CUSTOMERS_PATH),
            get(diagnostics_get::field_invalid_handler),
        )
        .route(
            &format!("{}/unauthorized", CUSTOMERS_PATH),
            get(diagnostics_get::unauthorized_handler),
        )
        .fallback(not_found_fallback)
        .layer(middleware::from_fn(reject_unsupported_methods))
        .with_state(driver)
}
