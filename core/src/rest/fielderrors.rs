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

//! Aggregation of field violations into per-field error groups.

use crate::model::FieldViolation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All error messages reported for a single field.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldErrors {
    /// Name of the field.
    pub field: String,

    /// Messages for every rule the field broke, in detection order.
    pub errors: Vec<String>,
}

/// Groups `violations` by field.
///
/// Groups appear in the order in which their field was first seen, and each group holds the
/// messages for its field in input order.  A field never appears in more than one group.
pub fn group_field_violations(violations: &[FieldViolation]) -> Vec<FieldErrors> {
    let mut groups: Vec<FieldErrors> = vec![];
    let mut index: HashMap<&str, usize> = HashMap::new();
    for violation in violations {
        let pos = *index.entry(violation.field.as_str()).or_insert_with(|| {
            groups.push(FieldErrors { field: violation.field.clone(), errors: vec![] });
            groups.len() - 1
        });
        groups[pos].errors.push(violation.message.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Syntactic sugar to instantiate a `FieldErrors` group.
    fn group(field: &str, errors: &[&str]) -> FieldErrors {
        FieldErrors {
            field: field.to_owned(),
            errors: errors.iter().map(|e| (*e).to_owned()).collect(),
        }
    }

    #[test]
    fn test_group_field_violations_empty() {
        assert!(group_field_violations(&[]).is_empty());
    }

    #[test]
    fn test_group_field_violations_one_field_many_messages() {
        let violations = [
            FieldViolation::new("name", "size must be between 3 and 20"),
            FieldViolation::new("name", "name may only contain letters"),
        ];
        assert_eq!(
            vec![group(
                "name",
                &["size must be between 3 and 20", "name may only contain letters"]
            )],
            group_field_violations(&violations)
        );
    }

    #[test]
    fn test_group_field_violations_first_seen_order() {
        let violations = [
            FieldViolation::new("email", "e1"),
            FieldViolation::new("name", "n1"),
            FieldViolation::new("email", "e2"),
            FieldViolation::new("phoneNumber", "p1"),
            FieldViolation::new("name", "n2"),
        ];
        assert_eq!(
            vec![
                group("email", &["e1", "e2"]),
                group("name", &["n1", "n2"]),
                group("phoneNumber", &["p1"]),
            ],
            group_field_violations(&violations)
        );
    }

    #[test]
    fn test_group_field_violations_keeps_repeated_messages() {
        let violations = [FieldViolation::new("a", "same"), FieldViolation::new("a", "same")];
        assert_eq!(vec![group("a", &["same", "same"])], group_field_violations(&violations));
    }
}
