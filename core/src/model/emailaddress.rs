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

//! Email addresses.

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest email address accepted, as allowed by the SMTP path limits of RFC 5321.
const MAX_LENGTH: usize = 254;

/// An email address that has passed a basic shape check.
///
/// Addresses are compared byte by byte, without case folding, because they act as lookup keys.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates `s` and wraps it as an email address.
    ///
    /// Only the overall shape is checked: one `@` with text on both sides, no whitespace and a
    /// bounded length.  Services that need stricter syntax apply it on their inputs.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();

        if s.trim().is_empty() {
            return Err(ModelError("Email address cannot be empty".to_owned()));
        }
        if s.len() > MAX_LENGTH {
            return Err(ModelError(format!(
                "Email address is too long ({} > {} bytes)",
                s.len(),
                MAX_LENGTH
            )));
        }

        let mut parts = s.split('@');
        let well_shaped = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
        );
        if !well_shaped || s.contains(char::is_whitespace) {
            return Err(ModelError(format!("Email does not look like a valid address '{}'", s)));
        }

        Ok(Self(s))
    }

    /// Returns the address as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        Self::new(s)
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&str> for EmailAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw).expect("Hardcoded email addresses for testing must be valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_de_tokens_error, assert_tokens};

    #[test]
    fn test_accepts_common_shapes() {
        for raw in [
            "martin@example.com",
            "first.last+tag@sub.example.co.uk",
            "x@localhost",
            "o'neil@example.org",
        ] {
            assert_eq!(raw, EmailAddress::new(raw).unwrap().as_str());
        }
    }

    #[test]
    fn test_rejects_empty() {
        for raw in ["", "   "] {
            assert_eq!(
                ModelError("Email address cannot be empty".to_owned()),
                EmailAddress::new(raw).unwrap_err()
            );
        }
    }

    #[test]
    fn test_rejects_too_long() {
        let domain = "@example.com";
        let fits = format!("{}{}", "a".repeat(MAX_LENGTH - domain.len()), domain);
        assert!(EmailAddress::new(fits).is_ok());

        let too_long = format!("{}{}", "a".repeat(MAX_LENGTH - domain.len() + 1), domain);
        assert_eq!(
            ModelError("Email address is too long (255 > 254 bytes)".to_owned()),
            EmailAddress::new(too_long).unwrap_err()
        );
    }

    #[test]
    fn test_rejects_bad_shapes() {
        for raw in ["martin.com", "@example.com", "martin@", "a@b@c", "mar tin@example.com"] {
            assert_eq!(
                ModelError(format!("Email does not look like a valid address '{}'", raw)),
                EmailAddress::new(raw).unwrap_err()
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!("martin@example.com", EmailAddress::from("martin@example.com").to_string());
    }

    #[test]
    fn test_serde() {
        let email = EmailAddress::from("martin@example.com");
        assert_tokens(&email, &[Token::Str("martin@example.com")]);
    }

    #[test]
    fn test_deserialize_validates() {
        assert_de_tokens_error::<EmailAddress>(
            &[Token::Str("martin.com")],
            "Email does not look like a valid address 'martin.com'",
        );
    }
}
