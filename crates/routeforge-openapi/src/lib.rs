//! OpenAPI documents for routeforge endpoints.
//!
//! Generated endpoint metadata converts into [`Operation`]s, and a
//! [`DocumentBuilder`] collects operations and component schemas into a
//! single OpenAPI 3 document.
//!
//! # Example
//!
//! ```ignore
//! let document = DocumentBuilder::new()
//!     .title("Users")
//!     .version("1.0.0")
//!     .operation("/users/{id}", "get", Operation::new("Fetch a user"))?
//!     .build();
//! ```

mod document;
mod error;
mod types;

pub use document::DocumentBuilder;
pub use error::OpenApiError;
pub use types::*;

/// Result type for OpenAPI operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;
