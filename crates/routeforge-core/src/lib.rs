//! Runtime contracts for routeforge-generated endpoint code.
//!
//! Generated units call into this crate for everything that happens at
//! request time:
//!
//! - [`RequestContext`] - route values, query, headers, body and services of one request
//! - [`HttpResult`], [`TypedResults`] - what endpoints return
//! - [`Validator`], [`RuleBuilder`] - request validation
//! - [`RouteTable`], [`MapEndpoints`] - how routes reach the host
//! - [`EndpointMetadata`] - documentation attached to each route
//!
//! The HTTP host, the service container and the schema library stay
//! outside; they meet generated code through the narrow traits here.

mod binding;
mod context;
mod error;
mod metadata;
mod result;
mod routing;
pub mod schema;
pub mod services;
mod validation;

pub use binding::BindingSource;
pub use context::{RequestContext, RequestContextBuilder};
pub use error::EndpointError;
pub use metadata::{BodyDescriptor, EndpointMetadata, ParameterDescriptor, ResponseDescriptor};
pub use result::{
    Accepted, BadRequest, Conflict, Created, Forbidden, HttpResult, IntoHttpResult, NoContent,
    NotFound, Success, TypedResults, Unauthorized, UnprocessableEntity,
};
pub use routing::{
    HandlerResult, HttpMethod, MapEndpoints, MetadataFactory, RecordedRoute, RouteBuilder,
    RouteHandler, RouteList, RouteTable, handler, metadata,
};
pub use schema::{SchemaList, SchemaRegistry};
pub use services::{ServiceCollection, ServiceLocator, ServiceProvider, ServiceRegistry};
pub use validation::{Presence, RuleBuilder, RuleSet, ValidationErrors, Validator};

pub use tokio_util::sync::CancellationToken;

// Re-exported for generated code
pub use serde;
pub use serde_json;

#[cfg(feature = "openapi")]
pub use routeforge_openapi as openapi;
