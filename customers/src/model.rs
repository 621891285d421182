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

//! High-level data types.

use crm_core::model::{
    EmailAddress, FieldViolation, ModelError, ModelResult, ValidationError, Violations,
};
use derive_getters::Getters;
use derive_more::Constructor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Minimum length of a customer name, in characters.
const MIN_NAME_LENGTH: usize = 3;

/// Maximum length of a customer name, in characters.
const MAX_NAME_LENGTH: usize = 20;

/// Shape of valid customer names.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("Invalid name regex pattern"));

/// Shape of valid phone numbers.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("Invalid phone regex pattern"));

/// Shape of well-formed email addresses accepted from clients.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*",
        r"@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*$",
    ))
    .expect("Invalid email regex pattern")
});

/// Server-assigned identifier of a customer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct CustomerId(i64);

impl CustomerId {
    /// Creates a customer identifier from its raw database representation.
    pub(crate) fn new(id: i64) -> ModelResult<Self> {
        if id <= 0 {
            return Err(ModelError(format!("Customer id must be positive but got {}", id)));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as an `i64`.
    pub(crate) fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a customer: only letters and a bounded length.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "String")]
pub(crate) struct CustomerName(String);

impl CustomerName {
    /// Creates a new name from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        let length = s.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
            return Err(ModelError(format!(
                "Customer name must be between {} and {} characters long",
                MIN_NAME_LENGTH, MAX_NAME_LENGTH
            )));
        }
        if !NAME_PATTERN.is_match(&s) {
            return Err(ModelError(format!("Customer name '{}' may only contain letters", s)));
        }
        Ok(Self(s))
    }

    /// Returns a string view of the name.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomerName {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        CustomerName::new(s)
    }
}

/// Phone number of a customer: digits only.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(try_from = "String")]
pub(crate) struct PhoneNumber(String);

impl PhoneNumber {
    /// Creates a new phone number from an untrusted string `s`, making sure it is valid.
    pub(crate) fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if !PHONE_PATTERN.is_match(&s) {
            return Err(ModelError(format!("Phone number '{}' may only contain digits", s)));
        }
        Ok(Self(s))
    }

    /// Returns a string view of the phone number.
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        PhoneNumber::new(s)
    }
}

/// The mutable contents of a customer record.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub(crate) struct CustomerFields {
    /// Name of the customer.
    name: CustomerName,

    /// Email address of the customer.  Unique across all customers.
    email: EmailAddress,

    /// Phone number of the customer.  Unique across all customers when present.
    phone_number: Option<PhoneNumber>,
}

impl CustomerFields {
    /// Attaches the fields to the customer identified by `id`.
    pub(crate) fn with_id(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name,
            email: self.email,
            phone_number: self.phone_number,
        }
    }
}

/// A persisted customer record.
#[derive(Clone, Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Customer {
    /// Identifier of the customer, assigned at creation time.
    id: CustomerId,

    /// Name of the customer.
    name: CustomerName,

    /// Email address of the customer.
    email: EmailAddress,

    /// Phone number of the customer, if known.
    phone_number: Option<PhoneNumber>,
}

/// Untrusted contents of a customer as sent by a client to create or update a record.
///
/// Any `id` sent by the client is ignored.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerRequest {
    /// Desired name.
    pub(crate) name: Option<String>,

    /// Desired email address.
    pub(crate) email: Option<String>,

    /// Desired phone number.
    pub(crate) phone_number: Option<String>,
}

impl CustomerRequest {
    /// Checks every field of the request and converts it to validated customer fields.
    ///
    /// All broken rules are reported at once, field by field in declaration order.  A missing
    /// value only breaks the "must not be blank" rule of the fields that require one.
    pub(crate) fn validate(self) -> Result<CustomerFields, ValidationError> {
        let mut violations = Violations::default();

        match self.name.as_deref() {
            None => violations.add("name", "must not be blank"),
            Some(name) => {
                violations.check(!name.trim().is_empty(), "name", "must not be blank");
                let length = name.chars().count();
                violations.check(
                    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length),
                    "name",
                    format!("size must be between {} and {}", MIN_NAME_LENGTH, MAX_NAME_LENGTH),
                );
                violations.check(
                    NAME_PATTERN.is_match(name),
                    "name",
                    "name may only contain letters",
                );
            }
        }

        match self.email.as_deref() {
            None => violations.add("email", "must not be blank"),
            Some(email) => {
                violations.check(!email.trim().is_empty(), "email", "must not be blank");
                let well_formed = email.is_empty()
                    || (EMAIL_PATTERN.is_match(email) && EmailAddress::new(email).is_ok());
                violations.check(well_formed, "email", "must be a well-formed email address");
            }
        }

        if let Some(phone_number) = self.phone_number.as_deref() {
            violations.check(
                PHONE_PATTERN.is_match(phone_number),
                "phoneNumber",
                "phone number may only contain digits",
            );
        }

        violations.finish()?;

        let into_violation =
            |field: &str, e: ModelError| ValidationError(vec![FieldViolation::new(field, e.0)]);
        let name = CustomerName::new(self.name.unwrap_or_default())
            .map_err(|e| into_violation("name", e))?;
        let email = EmailAddress::new(self.email.unwrap_or_default())
            .map_err(|e| into_violation("email", e))?;
        let phone_number = self
            .phone_number
            .map(PhoneNumber::new)
            .transpose()
            .map_err(|e| into_violation("phoneNumber", e))?;
        Ok(CustomerFields::new(name, email, phone_number))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Validates `request` and returns the violations as `(field, message)` pairs.
    fn violations_of(request: CustomerRequest) -> Vec<(String, String)> {
        match request.validate() {
            Ok(fields) => panic!("Validation should have failed but got {:?}", fields),
            Err(e) => {
                e.violations().iter().map(|v| (v.field.clone(), v.message.clone())).collect()
            }
        }
    }

    /// Syntactic sugar to build the expected output of `violations_of`.
    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(f, m)| ((*f).to_owned(), (*m).to_owned())).collect()
    }

    #[test]
    fn test_customer_id() {
        assert_eq!(5, CustomerId::new(5).unwrap().as_i64());
        assert_eq!("5", CustomerId::new(5).unwrap().to_string());
        assert!(CustomerId::new(0).is_err());
        assert!(CustomerId::new(-3).is_err());
    }

    #[test]
    fn test_customer_name() {
        assert_eq!("Bob", CustomerName::new("Bob").unwrap().as_str());
        let longest = "abcdefghijklmnopqrst";
        assert_eq!(longest, CustomerName::new(longest).unwrap().as_str());
        assert!(CustomerName::new("Al").is_err());
        assert!(CustomerName::new("abcdefghijklmnopqrstu").is_err());
        assert!(CustomerName::new("Bob1").is_err());
        assert!(CustomerName::new("Bob Smith").is_err());
    }

    #[test]
    fn test_phone_number() {
        assert_eq!("600111222", PhoneNumber::new("600111222").unwrap().as_str());
        assert!(PhoneNumber::new("").is_err());
        assert!(PhoneNumber::new("+34600").is_err());
    }

    #[test]
    fn test_customer_serialization() {
        let customer = CustomerFields::from_strs("Martin", "martin@example.com", Some("123"))
            .with_id(CustomerId::new(4).unwrap());
        assert_eq!(
            r#"{"id":4,"name":"Martin","email":"martin@example.com","phoneNumber":"123"}"#,
            serde_json::to_string(&customer).unwrap()
        );

        let customer = CustomerFields::from_strs("Martin", "martin@example.com", None)
            .with_id(CustomerId::new(4).unwrap());
        assert_eq!(
            r#"{"id":4,"name":"Martin","email":"martin@example.com","phoneNumber":null}"#,
            serde_json::to_string(&customer).unwrap()
        );
    }

    #[test]
    fn test_customer_deserialization_validates() {
        let err = serde_json::from_str::<Customer>(
            r#"{"id":4,"name":"M1","email":"martin@example.com","phoneNumber":null}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("between 3 and 20"));
    }

    #[test]
    fn test_request_ignores_id() {
        let request: CustomerRequest = serde_json::from_str(
            r#"{"id":99,"name":"Martin","email":"martin@example.com","phoneNumber":"5"}"#,
        )
        .unwrap();
        assert_eq!(
            CustomerFields::from_strs("Martin", "martin@example.com", Some("5")),
            request.validate().unwrap()
        );
    }

    #[test]
    fn test_validate_ok_without_phone() {
        let request = CustomerRequest::from_strs("Martin", "martin@example.com", None);
        assert_eq!(
            CustomerFields::from_strs("Martin", "martin@example.com", None),
            request.validate().unwrap()
        );
    }

    #[test]
    fn test_validate_missing_values() {
        assert_eq!(
            pairs(&[("name", "must not be blank"), ("email", "must not be blank")]),
            violations_of(CustomerRequest::default())
        );
    }

    #[test]
    fn test_validate_name_size_and_pattern() {
        assert_eq!(
            pairs(&[
                ("name", "size must be between 3 and 20"),
                ("name", "name may only contain letters"),
            ]),
            violations_of(CustomerRequest::from_strs("A1", "a@example.com", None))
        );
    }

    #[test]
    fn test_validate_name_blank() {
        assert_eq!(
            pairs(&[
                ("name", "must not be blank"),
                ("name", "size must be between 3 and 20"),
                ("name", "name may only contain letters"),
            ]),
            violations_of(CustomerRequest::from_strs("", "a@example.com", None))
        );
        assert_eq!(
            pairs(&[("name", "must not be blank"), ("name", "name may only contain letters")]),
            violations_of(CustomerRequest::from_strs("     ", "a@example.com", None))
        );
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            pairs(&[("email", "must not be blank")]),
            violations_of(CustomerRequest::from_strs("Martin", "", None))
        );
        assert_eq!(
            pairs(&[("email", "must be a well-formed email address")]),
            violations_of(CustomerRequest::from_strs("Martin", "martin.com", None))
        );
        assert_eq!(
            pairs(&[("email", "must be a well-formed email address")]),
            violations_of(CustomerRequest::from_strs("Martin", "a b@example.com", None))
        );
        for email in [".a@example.com", "a..b@example.com", "a.@example.com"] {
            assert_eq!(
                pairs(&[("email", "must be a well-formed email address")]),
                violations_of(CustomerRequest::from_strs("Martin", email, None)),
                "{} should be rejected",
                email
            );
        }
        assert!(CustomerRequest::from_strs("Martin", "a.b@example.com", None).validate().is_ok());
    }

    #[test]
    fn test_validate_phone_number() {
        assert_eq!(
            pairs(&[("phoneNumber", "phone number may only contain digits")]),
            violations_of(CustomerRequest::from_strs("Martin", "a@example.com", Some("12-34")))
        );
    }

    #[test]
    fn test_validate_order_across_fields() {
        let request = CustomerRequest {
            name: Some("x".to_owned()),
            email: Some("bad".to_owned()),
            phone_number: Some("abc".to_owned()),
        };
        assert_eq!(
            ValidationError(vec![
                FieldViolation::new("name", "size must be between 3 and 20"),
                FieldViolation::new("email", "must be a well-formed email address"),
                FieldViolation::new("phoneNumber", "phone number may only contain digits"),
            ]),
            request.validate().unwrap_err()
        );
    }
}
