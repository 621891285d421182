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

//! Collection of per-field validation failures.
//!
//! Request types validate all of their fields in one go and report every problem they find,
//! instead of stopping at the first one.  The order in which violations are recorded is preserved
//! all the way to the client.

use serde::{Deserialize, Serialize};

/// A single validation failure for a named field.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Name of the field as exposed to clients.
    pub field: String,

    /// Description of the rule that the field's value broke.
    pub message: String,
}

impl FieldViolation {
    /// Creates a new violation for `field` described by `message`.
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Error raised when one or more fields of an input fail validation.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("validation errors detected in fields")]
pub struct ValidationError(pub Vec<FieldViolation>);

impl ValidationError {
    /// Returns the violations that caused this error, in detection order.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }
}

/// Accumulator of field violations in detection order.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    /// Records that `field` broke the rule described by `message`.
    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.push(FieldViolation::new(field, message));
    }

    /// Records a violation on `field` with `message` if `ok` is false.
    pub fn check<F: Into<String>, M: Into<String>>(&mut self, ok: bool, field: F, message: M) {
        if !ok {
            self.add(field, message);
        }
    }

    /// Returns true if no violations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the accumulator and fails if any violations were recorded.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() { Ok(()) } else { Err(ValidationError(self.0)) }
    }
}
