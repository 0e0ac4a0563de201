use thiserror::Error;

use crate::binding::BindingSource;
use crate::result::{HttpResult, IntoHttpResult};

/// Failure while binding a request or resolving services for an endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("missing {location} value '{name}'")]
    MissingValue {
        location: BindingSource,
        name: String,
    },

    #[error("invalid {location} value '{name}': {message}")]
    InvalidValue {
        location: BindingSource,
        name: String,
        message: String,
    },

    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("service '{type_name}' is not registered")]
    MissingService { type_name: &'static str },

    #[error("{0}")]
    Custom(String),
}

impl EndpointError {
    /// The field a client can fix, when the error is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            EndpointError::MissingValue { name, .. } | EndpointError::InvalidValue { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

impl IntoHttpResult for EndpointError {
    fn into_http_result(self) -> HttpResult {
        match &self {
            EndpointError::MissingValue { name, .. } | EndpointError::InvalidValue { name, .. } => {
                let mut errors = crate::ValidationErrors::new();
                errors.add(name.clone(), self.to_string());
                HttpResult::validation_problem(errors)
            }
            EndpointError::Body(_) => HttpResult::problem(400, self.to_string()),
            EndpointError::MissingService { .. } | EndpointError::Custom(_) => {
                HttpResult::internal_error(self.to_string())
            }
        }
    }
}
