use std::fmt;

use serde::Serialize;

/// Where a bound value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingSource {
    Route,
    Query,
    Header,
    Cookie,
    Form,
    Body,
}

impl BindingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingSource::Route => "route",
            BindingSource::Query => "query",
            BindingSource::Header => "header",
            BindingSource::Cookie => "cookie",
            BindingSource::Form => "form",
            BindingSource::Body => "body",
        }
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
