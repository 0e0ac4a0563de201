//! HTTP results produced by endpoints.

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Value, json};

use crate::validation::ValidationErrors;

/// A status code with an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResult {
    status: u16,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl HttpResult {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: None,
            headers: Vec::new(),
        }
    }

    /// Serialize `value` as the body; serialization failures become a 500.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self {
                status,
                body: Some(body),
                headers: Vec::new(),
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response body");
                Self::internal_error(err.to_string())
            }
        }
    }

    pub fn ok<T: Serialize>(value: T) -> Self {
        Self::json(200, &value)
    }

    pub fn created<T: Serialize>(value: T) -> Self {
        Self::json(201, &value)
    }

    pub fn accepted<T: Serialize>(value: T) -> Self {
        Self::json(202, &value)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn bad_request<T: Serialize>(value: T) -> Self {
        Self::json(400, &value)
    }

    pub fn unauthorized() -> Self {
        Self::new(401)
    }

    pub fn forbidden() -> Self {
        Self::new(403)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn conflict<T: Serialize>(value: T) -> Self {
        Self::json(409, &value)
    }

    pub fn unprocessable_entity<T: Serialize>(value: T) -> Self {
        Self::json(422, &value)
    }

    /// A problem-details body.
    pub fn problem(status: u16, detail: impl Into<String>) -> Self {
        Self::json(
            status,
            &json!({
                "status": status,
                "detail": detail.into(),
            }),
        )
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::problem(500, detail)
    }

    /// 400 with the collected validation errors.
    pub fn validation_problem(errors: ValidationErrors) -> Self {
        Self::json(
            400,
            &json!({
                "title": "One or more validation errors occurred.",
                "status": 400,
                "errors": errors,
            }),
        )
    }

    /// 500 for an endpoint's `Err` value.
    pub fn from_error<E: Display + ?Sized>(error: &E) -> Self {
        tracing::warn!(error = %error, "endpoint returned an error");
        Self::internal_error(error.to_string())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Anything an endpoint can return as a finished result.
///
/// Boxed trait objects (`Box<dyn IntoHttpResult>`) are results too.
pub trait IntoHttpResult: IntoHttpResultBoxed {
    fn into_http_result(self) -> HttpResult
    where
        Self: Sized;
}

/// Consumes a boxed result; implemented for every sized [`IntoHttpResult`].
#[doc(hidden)]
pub trait IntoHttpResultBoxed {
    fn into_http_result_boxed(self: Box<Self>) -> HttpResult;
}

impl<T: IntoHttpResult> IntoHttpResultBoxed for T {
    fn into_http_result_boxed(self: Box<Self>) -> HttpResult {
        (*self).into_http_result()
    }
}

impl IntoHttpResult for Box<dyn IntoHttpResult> {
    fn into_http_result(self) -> HttpResult {
        self.into_http_result_boxed()
    }
}

impl IntoHttpResult for Box<dyn IntoHttpResult + Send> {
    fn into_http_result(self) -> HttpResult {
        self.into_http_result_boxed()
    }
}

impl IntoHttpResult for HttpResult {
    fn into_http_result(self) -> HttpResult {
        self
    }
}

impl<T: IntoHttpResult, E: Display> IntoHttpResult for Result<T, E> {
    fn into_http_result(self) -> HttpResult {
        match self {
            Ok(result) => result.into_http_result(),
            Err(err) => HttpResult::from_error(&err),
        }
    }
}

macro_rules! typed_result {
    ($(#[$doc:meta])* $name:ident<T> => $status:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name<T>(pub T);

        impl<T: Serialize> IntoHttpResult for $name<T> {
            fn into_http_result(self) -> HttpResult {
                HttpResult::json($status, &self.0)
            }
        }
    };
    ($(#[$doc:meta])* $name:ident => $status:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl IntoHttpResult for $name {
            fn into_http_result(self) -> HttpResult {
                HttpResult::new($status)
            }
        }
    };
}

typed_result!(/// 200 with a body.
    Success<T> => 200);
typed_result!(/// 201 with the created resource.
    Created<T> => 201);
typed_result!(/// 202 with a status body.
    Accepted<T> => 202);
typed_result!(/// 204.
    NoContent => 204);
typed_result!(/// 400 with an error body.
    BadRequest<T> => 400);
typed_result!(/// 401.
    Unauthorized => 401);
typed_result!(/// 403.
    Forbidden => 403);
typed_result!(/// 404.
    NotFound => 404);
typed_result!(/// 409 with an error body.
    Conflict<T> => 409);
typed_result!(/// 422 with an error body.
    UnprocessableEntity<T> => 422);

/// Factories for the typed results, so each branch keeps its payload type.
pub struct TypedResults;

impl TypedResults {
    pub fn ok<T>(value: T) -> Success<T> {
        Success(value)
    }

    pub fn created<T>(value: T) -> Created<T> {
        Created(value)
    }

    pub fn accepted<T>(value: T) -> Accepted<T> {
        Accepted(value)
    }

    pub fn no_content() -> NoContent {
        NoContent
    }

    pub fn bad_request<T>(value: T) -> BadRequest<T> {
        BadRequest(value)
    }

    pub fn unauthorized() -> Unauthorized {
        Unauthorized
    }

    pub fn forbidden() -> Forbidden {
        Forbidden
    }

    pub fn not_found() -> NotFound {
        NotFound
    }

    pub fn conflict<T>(value: T) -> Conflict<T> {
        Conflict(value)
    }

    pub fn unprocessable_entity<T>(value: T) -> UnprocessableEntity<T> {
        UnprocessableEntity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_results() {
        let result = TypedResults::created(json!({ "id": 1 })).into_http_result();
        assert_eq!(result.status(), 201);
        assert_eq!(result.body(), Some(&json!({ "id": 1 })));

        let result = TypedResults::not_found().into_http_result();
        assert_eq!(result.status(), 404);
        assert_eq!(result.body(), None);
    }

    #[test]
    fn test_result_of_result() {
        let ok: Result<NoContent, String> = Ok(NoContent);
        assert_eq!(ok.into_http_result().status(), 204);

        let err: Result<NoContent, String> = Err("boom".into());
        let result = err.into_http_result();
        assert_eq!(result.status(), 500);
        assert_eq!(result.body().map(|b| &b["detail"]), Some(&json!("boom")));
    }

    #[test]
    fn test_boxed_results() {
        let pick = |flag: bool| -> Box<dyn IntoHttpResult> {
            if flag {
                Box::new(TypedResults::created(json!({ "id": 7 })))
            } else {
                Box::new(HttpResult::problem(503, "down"))
            }
        };
        let result = pick(true).into_http_result();
        assert_eq!(result.status(), 201);
        assert_eq!(result.body(), Some(&json!({ "id": 7 })));
        assert_eq!(pick(false).into_http_result().status(), 503);

        let sendable: Box<dyn IntoHttpResult + Send> = Box::new(NoContent);
        assert_eq!(sendable.into_http_result().status(), 204);
    }

    #[test]
    fn test_validation_problem_body() {
        let mut errors = ValidationErrors::new();
        errors.add("abc", "'not_used' is required.");
        let result = HttpResult::validation_problem(errors);
        assert_eq!(result.status(), 400);
        assert_eq!(
            result.body().map(|b| &b["errors"]),
            Some(&json!({ "abc": ["'not_used' is required."] }))
        );
    }
}
