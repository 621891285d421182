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

//! Access to configuration stored in environment variables.
//!
//! Settings that belong together share a prefix, such as `PGSQL_PROD` or `CUSTOMERS`, and each
//! setting is read from the variable `<prefix>_<suffix>`.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Result type for this module.
type Result<T> = std::result::Result<T, String>;

/// Reads the variable `<prefix>_<suffix>` and parses it as a `T`.
///
/// Returns `None` if the variable is not set.
fn get_var<T>(prefix: &str, suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let name = format!("{}_{}", prefix, suffix);
    let raw = match env::var(&name) {
        Ok(raw) => raw,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            return Err(format!("Invalid value in environment variable {}", name));
        }
    };
    match raw.parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(format!(
            "Invalid type in environment variable {}: cannot parse '{}' as {}: {}",
            name,
            raw,
            short_type_name::<T>(),
            e
        )),
    }
}

/// Returns the name of `T` without its module path.
fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Reads the variable `<prefix>_<suffix>` as a `T`, failing if it is not set.
pub fn get_required_var<T>(prefix: &str, suffix: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get_var(prefix, suffix)? {
        Some(value) => Ok(value),
        None => {
            Err(format!("Required environment variable {}_{} not present", prefix, suffix))
        }
    }
}

/// Reads the variable `<prefix>_<suffix>` as a `T`, if set.
pub fn get_optional_var<T>(prefix: &str, suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get_var(prefix, suffix)
}
