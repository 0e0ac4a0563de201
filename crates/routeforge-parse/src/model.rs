//! What the scanner reports about endpoint types.

use std::fmt;

use syn::{ImplItemFn, Type};

use crate::compilation::ModulePath;

/// HTTP verb of an endpoint method.
///
/// A method is an endpoint when its name equals a verb, ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Get,
        HttpVerb::Put,
        HttpVerb::Post,
        HttpVerb::Delete,
        HttpVerb::Patch,
    ];

    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.label().eq_ignore_ascii_case(name))
    }

    /// Wire form, e.g. `GET`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
        }
    }

    /// Capitalized form, used for runtime enum variants and type names.
    pub fn label(&self) -> &'static str {
        match self {
            HttpVerb::Get => "Get",
            HttpVerb::Put => "Put",
            HttpVerb::Post => "Post",
            HttpVerb::Delete => "Delete",
            HttpVerb::Patch => "Patch",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type marked with the endpoint attribute.
#[derive(Debug, Clone)]
pub struct EndpointClass {
    pub name: String,
    pub full_path: String,
    pub module: ModulePath,
    pub route: String,
    pub docs: Option<String>,
    pub fields: Vec<InstanceField>,
    /// No instance state, so one shared instance serves every request.
    pub singleton_eligible: bool,
    /// Every endpoint is an associated function; no instance is needed.
    pub all_static: bool,
    /// Name of an associated `fn configure(route: &mut dyn RouteBuilder)`.
    pub configure: Option<String>,
    pub endpoints: Vec<Endpoint>,
    pub warnings: Vec<Diagnostic>,
}

/// A field of an endpoint type, filled in when an instance is built.
#[derive(Debug, Clone)]
pub struct InstanceField {
    pub member: String,
    pub ty: Type,
    /// For `Arc<T>` fields, the qualified `T` resolved from the service locator.
    pub service: Option<Type>,
}

/// One verb method of an endpoint type.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub verb: HttpVerb,
    pub method: ImplItemFn,
    pub method_name: String,
    /// Route template, shared with the owning class.
    pub path: String,
    pub docs: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    /// Declared output with any future wrapper removed; `None` for `()`.
    pub output: Option<Type>,
    pub returns_result: bool,
    pub params: Vec<EndpointParam>,
}

impl Endpoint {
    /// Full path of the request object parameter, if the endpoint takes one.
    pub fn request_type(&self) -> Option<&str> {
        self.params.iter().find_map(|param| match &param.binding {
            ParamBinding::Request { full_path } => Some(full_path.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EndpointParam {
    pub name: String,
    /// Declared type, qualified so it is valid from the generated module.
    pub ty: Type,
    pub binding: ParamBinding,
}

/// Where an endpoint parameter's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamBinding {
    /// The request object, built from the HTTP request.
    Request { full_path: String },
    /// The per-request context, by reference or by value.
    Context { by_ref: bool },
    /// The request's cancellation token.
    Cancellation,
    /// A scalar matching a `{..}` parameter of the route template.
    Route { name: String },
    /// A scalar with no matching route parameter, read from the query string.
    Query { name: String },
    /// Anything else is looked up in the service locator by declared type.
    Service { service: Type, access: ServiceAccess },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAccess {
    /// `Arc<T>`
    Shared,
    /// `&T`
    Borrowed,
    /// `T: Clone`
    Cloned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found while scanning or analyzing, attached to the generated
/// unit instead of aborting generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The type or `Type::method` the problem is about.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn error(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level}: {}: {}", self.subject, self.message)
    }
}
