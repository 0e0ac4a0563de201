//! routeforge - HTTP endpoint wiring generated at build time
//!
//! Mark endpoint types and request objects in your crate, then let
//! `routeforge-codegen` write the module that registers them, maps their
//! routes and binds every parameter. No reflection and no runtime scanning:
//! the generated code is plain Rust you can read.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use routeforge::prelude::*;
//!
//! #[endpoint("/users/{id}")]
//! pub struct Users {
//!     repo: Arc<UserRepo>,
//! }
//!
//! #[derive(Request)]
//! pub struct RenameUser {
//!     #[route] pub id: u32,
//!     #[required] pub name: Option<String>,
//! }
//!
//! impl Users {
//!     /// Fetch one user.
//!     pub async fn get(&self, id: u32) -> Option<User> { /* ... */ }
//!
//!     /// Rename a user.
//!     pub async fn put(&self, request: RenameUser) -> Result<User, UserError> { /* ... */ }
//! }
//! ```
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
//!     let config = routeforge_codegen::GeneratorConfig {
//!         output: Some(out_dir.join("endpoints.rs")),
//!         rerun_if_changed: true,
//!         ..Default::default()
//!     };
//!     routeforge_codegen::Generator::new(config).run().unwrap();
//! }
//! ```
//!
//! ```ignore
//! // lib.rs
//! include!(concat!(env!("OUT_DIR"), "/endpoints.rs"));
//! ```
//!
//! The generated `endpoints` module exposes:
//!
//! | Item | Purpose |
//! |------|---------|
//! | `add_endpoints(&mut dyn ServiceRegistry)` | Registers endpoint types and the route source |
//! | `describe_schemas(&mut dyn SchemaRegistry)` | Announces request and response types |
//! | `GeneratedEndpoints` | [`MapEndpoints`] implementation mapping every route |
//!
//! # Method Conventions
//!
//! | Method name | HTTP |
//! |-------------|------|
//! | `get` | GET |
//! | `post` | POST |
//! | `put` | PUT |
//! | `delete` | DELETE |
//! | `patch` | PATCH |
//!
//! Parameters bind by type: the request object, `RequestContext`,
//! `CancellationToken`, scalars from the route template or query string,
//! and anything else from the service locator.

pub use routeforge_core::*;
pub use routeforge_macros::{Request, endpoint};

/// Everything endpoint code usually needs.
pub mod prelude {
    pub use routeforge_core::{
        CancellationToken, EndpointError, HttpResult, IntoHttpResult, RequestContext,
        RuleBuilder, TypedResults, ValidationErrors, Validator,
    };
    pub use routeforge_macros::{Request, endpoint};
}
