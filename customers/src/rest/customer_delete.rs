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

//! API to delete a customer.

use crate::driver::Driver;
use crate::rest::parse_customer_id;
use axum::extract::State;
use axum::http;
use crm_core::rest::{EmptyBody, PathParam, RestError};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParam(id): PathParam<i64>,
    _: EmptyBody,
) -> Result<http::StatusCode, RestError> {
    let id = parse_customer_id(id)?;
    driver.delete_customer(id).await?;
    Ok(http::StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::testutils::*;
    use crm_core::rest::testutils::*;
    use crm_core::test_payload_must_be_empty;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::DELETE, format!("/api/v1/customers/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;

        let customer = context.create("Martin", "martin@example.com", None).await;
        let other = context.create("Other", "other@example.com", None).await;

        OneShotBuilder::new(context.app(), route(&customer.id().to_string()))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        assert_eq!(None, context.get(*customer.id()).await);
        assert_eq!(vec![other], context.list().await);
    }

    #[tokio::test]
    async fn test_twice() {
        let context = TestContext::setup().await;

        let customer = context.create("Martin", "martin@example.com", None).await;
        let id = customer.id().to_string();

        OneShotBuilder::new(context.app(), route(&id))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), route(&id))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("NotFound", &format!("^Customer with id {} not found$", id))
            .await;
    }

    #[tokio::test]
    async fn test_email_is_reusable_after_delete() {
        let context = TestContext::setup().await;

        let customer = context.create("Martin", "martin@example.com", None).await;

        OneShotBuilder::new(context.app(), route(&customer.id().to_string()))
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let again = context.create("Martin", "martin@example.com", None).await;
        assert_ne!(customer.id(), again.id());
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("1"));
}
