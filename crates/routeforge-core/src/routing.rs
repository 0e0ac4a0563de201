//! Route registration contracts between generated code and the host.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::EndpointError;
use crate::metadata::EndpointMetadata;
use crate::result::{HttpResult, IntoHttpResult};
use crate::services::ServiceLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
        }
    }
}

/// What generated handler bodies evaluate to.
pub type HandlerResult = Result<HttpResult, EndpointError>;

pub type RouteHandler = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, HttpResult> + Send + Sync>;

/// Builds the metadata of a route on demand.
pub type MetadataFactory = Arc<dyn Fn() -> EndpointMetadata + Send + Sync>;

/// Wrap a handler closure; binding and service errors become their HTTP
/// results.
pub fn handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx: RequestContext| {
        let path = ctx.path().to_string();
        let fut = f(ctx);
        Box::pin(async move {
            match fut.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::debug!(path = %path, error = %err, "request rejected");
                    err.into_http_result()
                }
            }
        }) as BoxFuture<'static, HttpResult>
    })
}

/// Wrap a metadata closure.
pub fn metadata<F>(f: F) -> MetadataFactory
where
    F: Fn() -> EndpointMetadata + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered route, open for further configuration.
pub trait RouteBuilder {
    fn with_metadata(&mut self, factory: MetadataFactory);

    fn with_tag(&mut self, tag: &str);

    fn with_name(&mut self, name: &str);
}

/// The host's routing table.
pub trait RouteTable {
    fn map(&mut self, method: HttpMethod, path: &str, handler: RouteHandler) -> &mut dyn RouteBuilder;
}

/// A source of routes; the generated unit provides one.
pub trait MapEndpoints: Send + Sync {
    fn map_endpoints(
        &self,
        routes: &mut dyn RouteTable,
        services: &dyn ServiceLocator,
    ) -> Result<(), EndpointError>;
}

/// A route captured by [`RouteList`].
pub struct RecordedRoute {
    pub method: HttpMethod,
    pub path: String,
    pub handler: RouteHandler,
    pub metadata: Option<MetadataFactory>,
    pub tags: Vec<String>,
    pub name: Option<String>,
}

impl RecordedRoute {
    /// Run the handler for one request.
    pub async fn call(&self, ctx: RequestContext) -> HttpResult {
        (self.handler)(ctx).await
    }

    pub fn metadata(&self) -> Option<EndpointMetadata> {
        self.metadata.as_ref().map(|factory| factory())
    }
}

impl RouteBuilder for RecordedRoute {
    fn with_metadata(&mut self, factory: MetadataFactory) {
        self.metadata = Some(factory);
    }

    fn with_tag(&mut self, tag: &str) {
        self.tags.push(tag.to_string());
    }

    fn with_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }
}

/// A [`RouteTable`] that records routes in registration order.
#[derive(Default)]
pub struct RouteList {
    routes: Vec<RecordedRoute>,
}

impl RouteList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[RecordedRoute] {
        &self.routes
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RecordedRoute> {
        self.routes
            .iter()
            .find(|route| route.method == method && route.path == path)
    }
}

impl RouteTable for RouteList {
    fn map(&mut self, method: HttpMethod, path: &str, handler: RouteHandler) -> &mut dyn RouteBuilder {
        tracing::debug!(%method, path, "mapped route");
        self.routes.push(RecordedRoute {
            method,
            path: path.to_string(),
            handler,
            metadata: None,
            tags: Vec::new(),
            name: None,
        });
        let index = self.routes.len() - 1;
        &mut self.routes[index]
    }
}
