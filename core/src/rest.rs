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

//! Error translation and request plumbing shared by the REST layers of all services.
//!
//! A service exposes an `app` function returning its `Router`.  Each endpoint lives in a file
//! named `<entity>_<method>.rs` whose `tests` module defines a `route` helper with the method and
//! path under test.
//!
//! Handlers return `RestError` on failure, which renders as an `ErrorResponse` envelope.  Routers
//! use the `EmptyBody`, `JsonBody` and `PathParam` extractors and install
//! `reject_unsupported_methods` and `not_found_fallback`, so errors raised by axum itself before a
//! handler runs end up in the same envelope.

use crate::driver::DriverError;
use crate::model::{ModelError, ValidationError};
use async_trait::async_trait;
use axum::Json;
use axum::body::HttpBody;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod fielderrors;
pub use fielderrors::{FieldErrors, group_field_violations};

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
///
/// The name of each variant is exposed to clients as the `simpleName` of the `ErrorResponse`.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    BadRequest(String),

    /// Indicates that the request conflicts with the state of an existing entity.
    #[error("{0}")]
    Conflict(String),

    /// Indicates that the database rejected a write because of a duplicate unique key.
    #[error("{0}")]
    DuplicateKey(String),

    /// Indicates that a field carries a value that is already taken.
    #[error("{0}")]
    FieldAlreadyExists(String),

    /// Indicates that a field carries an invalid value.
    #[error("{0}")]
    FieldInvalid(String),

    /// Indicates an authorization problem.
    #[error("{0}")]
    Forbidden(String),

    /// Indicates that the database rejected a write because of a constraint other than a unique
    /// key.  The cause is usually prefixed by a label that is not shown to clients.
    #[error("{0}")]
    IntegrityViolation(String),

    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates that a request header has an invalid format.
    #[error("{0}")]
    MalformedHeader(String),

    /// Indicates that a required request header is missing.
    #[error("{0}")]
    MissingHeader(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,

    /// Indicates that a path parameter could not be converted to its expected type.
    #[error("{0}")]
    TypeMismatch(String),

    /// Indicates an authentication problem.  Responses for this error carry no body.
    #[error("Unauthorized")]
    Unauthorized,

    /// Indicates that the request body could not be parsed.
    #[error("{0}")]
    UnreadableBody(String),

    /// Indicates that the requested path exists but does not support the request method.
    #[error("{0}")]
    UnsupportedMethod(String),

    /// Indicates that one or more fields of the request failed validation.
    #[error("{0}")]
    Validation(ValidationError),
}

impl RestError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound(_) => StatusCode::NOT_FOUND,

            RestError::BadRequest(_)
            | RestError::FieldInvalid(_)
            | RestError::MalformedHeader(_)
            | RestError::MissingHeader(_)
            | RestError::PayloadNotEmpty
            | RestError::TypeMismatch(_)
            | RestError::UnreadableBody(_)
            | RestError::UnsupportedMethod(_)
            | RestError::Validation(_) => StatusCode::BAD_REQUEST,

            RestError::Conflict(_)
            | RestError::DuplicateKey(_)
            | RestError::FieldAlreadyExists(_)
            | RestError::IntegrityViolation(_) => StatusCode::CONFLICT,

            RestError::Forbidden(_) => StatusCode::FORBIDDEN,

            RestError::Unauthorized => StatusCode::UNAUTHORIZED,

            RestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the coarse name of this error kind.
    pub fn simple_name(&self) -> &'static str {
        match self {
            RestError::BadRequest(_) => "BadRequest",
            RestError::Conflict(_) => "Conflict",
            RestError::DuplicateKey(_) => "DuplicateKey",
            RestError::FieldAlreadyExists(_) => "FieldAlreadyExists",
            RestError::FieldInvalid(_) => "FieldInvalid",
            RestError::Forbidden(_) => "Forbidden",
            RestError::IntegrityViolation(_) => "IntegrityViolation",
            RestError::InternalError(_) => "InternalError",
            RestError::MalformedHeader(_) => "MalformedHeader",
            RestError::MissingHeader(_) => "MissingHeader",
            RestError::NotFound(_) => "NotFound",
            RestError::PayloadNotEmpty => "PayloadNotEmpty",
            RestError::TypeMismatch(_) => "TypeMismatch",
            RestError::Unauthorized => "Unauthorized",
            RestError::UnreadableBody(_) => "UnreadableBody",
            RestError::UnsupportedMethod(_) => "UnsupportedMethod",
            RestError::Validation(_) => "Validation",
        }
    }

    /// Returns the message to show to clients for this error.
    ///
    /// This is the same as the textual representation of the error except for integrity
    /// violations, whose leading `label:` is dropped.
    pub fn message(&self) -> String {
        match self {
            RestError::IntegrityViolation(cause) => match cause.split_once(':') {
                Some((_label, rest)) => rest.trim().to_owned(),
                None => cause.clone(),
            },
            _ => self.to_string(),
        }
    }

    /// Returns the per-field error groups for this error, if any.
    fn field_errors(&self) -> Option<Vec<FieldErrors>> {
        match self {
            RestError::Validation(e) => Some(group_field_violations(e.violations())),
            _ => None,
        }
    }
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(msg) => RestError::Conflict(msg),
            DriverError::BackendError(msg) => RestError::InternalError(msg),
            DriverError::DuplicateKey(cause) => RestError::DuplicateKey(cause),
            DriverError::IntegrityViolation(cause) => RestError::IntegrityViolation(cause),
            DriverError::NotFound(msg) => RestError::NotFound(msg),
        }
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::BadRequest(e.to_string())
    }
}

impl From<ValidationError> for RestError {
    fn from(e: ValidationError) -> Self {
        RestError::Validation(e)
    }
}

impl From<JsonRejection> for RestError {
    fn from(e: JsonRejection) -> Self {
        match e {
            JsonRejection::MissingJsonContentType(_) => RestError::MissingHeader(e.body_text()),
            _ => RestError::UnreadableBody(e.body_text()),
        }
    }
}

impl From<PathRejection> for RestError {
    fn from(e: PathRejection) -> Self {
        match e {
            PathRejection::FailedToDeserializePathParams(_) => {
                RestError::TypeMismatch(e.body_text())
            }
            _ => RestError::InternalError(e.body_text()),
        }
    }
}

/// Converts `status` to its upper snake case name, such as `NOT_FOUND`.
fn status_name(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_uppercase().replace(' ', "_")
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed with {}: {}", status, self);
        } else {
            debug!("Request failed with {}: {:?}", status, self);
        }

        if let RestError::Unauthorized = self {
            return status.into_response();
        }

        let response = ErrorResponse {
            simple_name: self.simple_name().to_owned(),
            http_status: status_name(status),
            code: status.as_u16(),
            message: self.message(),
            field_errors: self.field_errors(),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Coarse name of the error kind.
    pub simple_name: String,

    /// Name of the HTTP status in upper snake case.
    pub http_status: String,

    /// Numeric HTTP status.
    pub code: u16,

    /// Textual representation of the error message.
    pub message: String,

    /// Per-field error groups, only present for validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<FieldErrors>>,
}

/// A request body extractor that forbids any content.
///
/// Requests carrying any payload are rejected with `PayloadNotEmpty`, a 400 error.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// A request body extractor for JSON payloads that reports failures as `RestError`s.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// A path parameters extractor that reports failures as `RestError`s.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(PathParam(value))
    }
}

/// Middleware that reports requests for known paths with an unsupported method as bad requests.
///
/// Install this with `axum::middleware::from_fn` as the outermost layer of the router.
pub async fn reject_unsupported_methods(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let response = next.run(req).await;
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        RestError::UnsupportedMethod(format!("Request method '{}' is not supported", method))
            .into_response()
    } else {
        response
    }
}

/// Fallback handler for requests that do not match any route.
pub async fn not_found_fallback(method: Method, uri: Uri) -> RestError {
    RestError::NotFound(format!("No endpoint {} {}.", method, uri.path()))
}

/// Common test code for the REST server.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::http::{self, HeaderName, HeaderValue};
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Builder for a single request to the API server.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Finishes building the request and sends it with an empty payload.
        pub async fn send_empty(self) -> ResponseChecker {
            let request = self.builder.body(axum::body::Body::empty()).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a text payload.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a payload that claims to be JSON but
        /// that is sent verbatim.
        pub async fn send_raw_json<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a JSON payload.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }
    }

    /// Type alias for the complex type returned by the `oneshot` function.
    pub type HttpResponse = http::Response<axum::body::Body>;

    /// Validator for the outcome of a request sent by a `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Sets the expected exit HTTP status to `status`.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Performs common validation operations on the response.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status());
        }

        /// Finishes checking the response and expects it to contain an empty body.
        pub async fn expect_empty(self) {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            let body = String::from_utf8(body.to_vec()).unwrap();
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Finishes checking the response and returns its body as an `ErrorResponse`.
        ///
        /// The envelope is checked for consistency with the HTTP status of the response.
        pub async fn expect_error_response(self) -> ErrorResponse {
            self.verify();

            let status = self.response.status();
            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            let response: ErrorResponse = match serde_json::from_slice(&body) {
                Ok(response) => response,
                Err(e) => {
                    let body = String::from_utf8(body.to_vec()).unwrap();
                    panic!("Invalid error response due to {}; content was {}", e, body);
                }
            };
            assert_eq!(status.as_u16(), response.code);
            assert_eq!(status_name(status), response.http_status);
            response
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` of kind
        /// `simple_name` whose message matches `exp_re`.
        pub async fn expect_error(self, simple_name: &str, exp_re: &str) {
            let response = self.expect_error_response().await;
            assert_eq!(simple_name, response.simple_name, "Unexpected error kind: {:?}", response);
            if exp_re.is_empty() {
                assert!(
                    response.message.is_empty(),
                    "Response content '{:?}' is not empty",
                    response
                );
            } else {
                let re = regex::Regex::new(exp_re).unwrap();
                assert!(
                    re.is_match(&response.message),
                    "Response content '{:?}' does not match re '{}'",
                    response,
                    exp_re
                );
            }
            assert!(
                response.field_errors.is_none(),
                "Unexpected field errors in {:?}; use expect_error_response instead",
                response
            );
        }

        /// Finishes checking the response and expects it to contain a valid JSON object of
        /// type `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            serde_json::from_slice::<T>(&body).unwrap()
        }

        /// Finishes checking the response and returns the response itself for out of band
        /// validation of properties not supported by the `ResponseChecker`.
        pub async fn take_response(self) -> HttpResponse {
            self.verify();

            self.response
        }
    }

    /// Generates a test to verify that an API that expects JSON fails when it gets something else.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("MissingHeader", "Content-Type")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_raw_json("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("UnreadableBody", "expected ident")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Generates a test to verify that an API that does not expect a payload fails as necessary.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("should not be here")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("PayloadNotEmpty", "should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}
