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

//! Generic data types shared by services.
//!
//! Services should define their own `model` module with the high-level data types of their domain.
//! Types should validate their contents at construction time so that invalid values cannot float
//! around the app.

mod emailaddress;
pub use emailaddress::EmailAddress;
mod validation;
pub use validation::{FieldViolation, ValidationError, Violations};

/// Model errors.  These are raised when a single value cannot be represented by a model type.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;
