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

//! APIs that always fail with a fixed error.
//!
//! These exist so that clients can check how they render the errors that no customer operation
//! raises on its own.

use crm_core::rest::{EmptyBody, RestError};

/// Handler that reports a malformed request header.
pub(crate) async fn malformed_handler(_: EmptyBody) -> RestError {
    RestError::MalformedHeader("Token: Bearer 123.123.123.123".to_owned())
}

/// Handler that reports a field value that is already taken.
pub(crate) async fn field_already_handler(_: EmptyBody) -> RestError {
    RestError::FieldAlreadyExists("The email 'martin@outlook.com' already exists".to_owned())
}

/// Handler that reports an invalid field value.
pub(crate) async fn field_invalid_handler(_: EmptyBody) -> RestError {
    RestError::FieldInvalid("The email 'martin.com' is invalid".to_owned())
}

/// Handler that reports a missing or bad authentication.
pub(crate) async fn unauthorized_handler(_: EmptyBody) -> RestError {
    RestError::Unauthorized
}
