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

//! API to get one customer by its identifier.

use crate::driver::Driver;
use crate::model::Customer;
use crate::rest::parse_customer_id;
use axum::Json;
use axum::extract::State;
use crm_core::rest::{EmptyBody, PathParam, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParam(id): PathParam<i64>,
    _: EmptyBody,
) -> Result<Json<Customer>, RestError> {
    let id = parse_customer_id(id)?;
    let customer = driver.get_customer(id).await?;
    Ok(Json(customer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use axum::http;
    use crm_core::rest::testutils::*;
    use crm_core::test_payload_must_be_empty;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::GET, format!("/api/v1/customers/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        context.create("Other", "other@example.com", None).await;
        let customer = context.create("Martin", "martin@example.com", Some("600")).await;

        let response = OneShotBuilder::new(context.app(), route(&customer.id().to_string()))
            .send_empty()
            .await
            .expect_json::<Customer>()
            .await;
        assert_eq!(customer, response);
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("999"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("NotFound", "^Customer with id 999 not found$")
            .await;
    }

    #[tokio::test]
    async fn test_impossible_id() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("0"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("NotFound", "^Customer with id 0 not found$")
            .await;
    }

    #[tokio::test]
    async fn test_id_not_a_number() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), route("abc"))
            .send_empty()
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("TypeMismatch", "abc")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("1"));
}
