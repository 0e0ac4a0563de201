//! The per-request context handed to generated handlers.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::binding::BindingSource;
use crate::error::EndpointError;
use crate::services::{self, ServiceLocator};

/// Everything a generated handler can read about the current request.
///
/// Route values, the raw query string, headers and the buffered body are
/// captured by the host before the handler runs. Cloning is cheap.
#[derive(Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    route_values: Arc<HashMap<String, String>>,
    query: Option<Arc<str>>,
    headers: Arc<HeaderMap>,
    body: Arc<[u8]>,
    services: Arc<dyn ServiceLocator>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn builder(services: Arc<dyn ServiceLocator>) -> RequestContextBuilder {
        RequestContextBuilder {
            method: Method::GET,
            path: "/".to_string(),
            route_values: HashMap::new(),
            query: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
            services,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn services(&self) -> &dyn ServiceLocator {
        self.services.as_ref()
    }

    /// Token cancelled when the client goes away.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Get an HTTP header value (case-insensitive lookup)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Raw text of a value from the given source.
    pub fn lookup(&self, source: BindingSource, name: &str) -> Option<Cow<'_, str>> {
        match source {
            BindingSource::Route => self
                .route_values
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| Cow::Borrowed(value.as_str())),
            BindingSource::Query => {
                let query = self.query.as_deref()?;
                find_pair(query.as_bytes(), name)
            }
            BindingSource::Header => self.header(name).map(Cow::Borrowed),
            BindingSource::Cookie => self.cookie(name).map(Cow::Borrowed),
            BindingSource::Form => {
                if !self.is_form() {
                    return None;
                }
                find_pair(&self.body, name)
            }
            BindingSource::Body => None,
        }
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    fn is_form(&self) -> bool {
        self.header(header::CONTENT_TYPE.as_str())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
    }

    /// Parse a required value.
    pub fn bind<T>(&self, source: BindingSource, name: &str) -> Result<T, EndpointError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.bind_opt(source, name)?
            .ok_or_else(|| EndpointError::MissingValue {
                location: source,
                name: name.to_string(),
            })
    }

    /// Parse an optional value; absent is `None`, malformed is an error.
    pub fn bind_opt<T>(&self, source: BindingSource, name: &str) -> Result<Option<T>, EndpointError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.lookup(source, name) else {
            return Ok(None);
        };
        raw.parse::<T>()
            .map(Some)
            .map_err(|err| EndpointError::InvalidValue {
                location: source,
                name: name.to_string(),
                message: err.to_string(),
            })
    }

    /// Parse a value, falling back to the textual `default` when absent.
    pub fn bind_or<T>(&self, source: BindingSource, name: &str, default: &str) -> Result<T, EndpointError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .lookup(source, name)
            .unwrap_or(Cow::Borrowed(default));
        raw.parse::<T>().map_err(|err| EndpointError::InvalidValue {
            location: source,
            name: name.to_string(),
            message: err.to_string(),
        })
    }

    /// Deserialize the JSON body.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T, EndpointError> {
        let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        Ok(serde_json::from_slice(body)?)
    }

    /// Resolve a registered service by type.
    pub fn service<T: Any + Send + Sync>(&self) -> Result<Arc<T>, EndpointError> {
        services::require::<T>(self.services.as_ref())
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("route_values", &self.route_values)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

fn find_pair<'a>(input: &'a [u8], name: &str) -> Option<Cow<'a, str>> {
    form_urlencoded::parse(input)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

pub struct RequestContextBuilder {
    method: Method,
    path: String,
    route_values: HashMap<String, String>,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
    services: Arc<dyn ServiceLocator>,
    cancellation: CancellationToken,
}

impl RequestContextBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn route_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_values.insert(name.into(), value.into());
        self
    }

    /// Raw query string, without the leading `?`.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Shortcut for a serialized JSON body with its content type.
    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body))
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            method: self.method,
            path: self.path,
            route_values: Arc::new(self.route_values),
            query: self.query.map(Arc::from),
            headers: Arc::new(self.headers),
            body: Arc::from(self.body),
            services: self.services,
            cancellation: self.cancellation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceCollection;

    fn context() -> RequestContextBuilder {
        RequestContext::builder(Arc::new(ServiceCollection::new().build()))
    }

    #[test]
    fn test_lookup_by_source() {
        let ctx = context()
            .route_value("id", "42")
            .query("q=hello%20world&page=2")
            .header(HeaderName::from_static("x-trace-id"), HeaderValue::from_static("abc"))
            .header(header::COOKIE, HeaderValue::from_static("theme=dark; session=s1"))
            .build();

        assert_eq!(ctx.lookup(BindingSource::Route, "id").as_deref(), Some("42"));
        assert_eq!(ctx.lookup(BindingSource::Query, "q").as_deref(), Some("hello world"));
        assert_eq!(ctx.lookup(BindingSource::Header, "X-Trace-Id").as_deref(), Some("abc"));
        assert_eq!(ctx.lookup(BindingSource::Cookie, "session").as_deref(), Some("s1"));
        assert_eq!(ctx.lookup(BindingSource::Body, "id"), None);
    }

    #[test]
    fn test_form_requires_content_type() {
        let ctx = context().body("note=hi").build();
        assert_eq!(ctx.lookup(BindingSource::Form, "note"), None);

        let ctx = context()
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body("note=hi+there")
            .build();
        assert_eq!(ctx.lookup(BindingSource::Form, "note").as_deref(), Some("hi there"));
    }

    #[test]
    fn test_bind_variants() {
        let ctx = context().route_value("id", "7").query("limit=abc").build();

        let id: u32 = ctx.bind(BindingSource::Route, "id").expect("present");
        assert_eq!(id, 7);

        let missing = ctx.bind::<u32>(BindingSource::Query, "page");
        assert!(matches!(missing, Err(EndpointError::MissingValue { .. })));

        let invalid = ctx.bind_opt::<u32>(BindingSource::Query, "limit");
        assert!(matches!(invalid, Err(EndpointError::InvalidValue { .. })));

        let absent: Option<u32> = ctx.bind_opt(BindingSource::Query, "page").expect("absent ok");
        assert_eq!(absent, None);

        let page: u32 = ctx.bind_or(BindingSource::Query, "page", "20").expect("default");
        assert_eq!(page, 20);
    }

    #[test]
    fn test_read_json() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let ctx = context()
            .json(&serde_json::json!({ "name": "ada" }))
            .expect("serializes")
            .build();
        let payload: Payload = ctx.read_json().expect("valid body");
        assert_eq!(payload.name, "ada");

        let empty = context().build();
        let optional: Option<Payload> = empty.read_json().expect("null body");
        assert!(optional.is_none());
        assert!(matches!(empty.read_json::<Payload>(), Err(EndpointError::Body(_))));
    }
}
