//! Typed OpenAPI structures.
//!
//! The subset of OpenAPI 3 that endpoint metadata can express.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// An operation on one method of one path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Keyed by status code.
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
}

impl Operation {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Add a response; a second response for the same status replaces the first.
    pub fn with_response(mut self, status: u16, response: Response) -> Self {
        self.responses.insert(status.to_string(), response);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: Value,
}

impl Parameter {
    /// A parameter whose schema is derived from a Rust type name.
    pub fn new(name: impl Into<String>, location: ParameterLocation, type_name: &str) -> Self {
        Self {
            name: name.into(),
            // Path parameters are always required.
            required: location == ParameterLocation::Path,
            location,
            schema: type_schema(type_name),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterLocation::Path;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    /// Keyed by media type.
    pub content: BTreeMap<String, MediaType>,
}

impl RequestBody {
    pub fn json(type_name: &str) -> Self {
        Self::with_media_type("application/json", type_name)
    }

    pub fn form(type_name: &str) -> Self {
        Self::with_media_type("application/x-www-form-urlencoded", type_name)
    }

    fn with_media_type(media_type: &str, type_name: &str) -> Self {
        let mut content = BTreeMap::new();
        content.insert(
            media_type.to_string(),
            MediaType {
                schema: type_schema(type_name),
            },
        );
        Self {
            required: true,
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaType {
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

impl Response {
    /// A response for `status`, with a JSON body when `type_name` is given.
    pub fn new(status: u16, type_name: Option<&str>) -> Self {
        let mut content = BTreeMap::new();
        if let Some(type_name) = type_name {
            content.insert(
                "application/json".to_string(),
                MediaType {
                    schema: type_schema(type_name),
                },
            );
        }
        Self {
            description: status_description(status).to_string(),
            content,
        }
    }
}

/// Reference to a component schema.
pub fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

/// Schema for a Rust type name as written in source.
///
/// Scalars map to JSON types, `Option`, `Vec` and maps map structurally,
/// anything else becomes a reference to a component schema named after the
/// last path segment.
pub fn type_schema(type_name: &str) -> Value {
    let type_name = type_name.trim();
    if let Some(inner) = generic_argument(type_name, "Option") {
        let mut schema = type_schema(inner);
        if let Value::Object(object) = &mut schema {
            object.insert("nullable".to_string(), Value::Bool(true));
        }
        return schema;
    }
    for list in ["Vec", "VecDeque", "HashSet", "BTreeSet"] {
        if let Some(inner) = generic_argument(type_name, list) {
            return json!({ "type": "array", "items": type_schema(inner) });
        }
    }
    for map in ["HashMap", "BTreeMap"] {
        if let Some(arguments) = generic_argument(type_name, map)
            && let Some((_, value)) = split_top_level(arguments)
        {
            return json!({ "type": "object", "additionalProperties": type_schema(value) });
        }
    }

    let base = type_name.trim_start_matches('&').trim_start_matches("'static ");
    let last = base.rsplit("::").next().unwrap_or(base);
    match last {
        "String" | "str" | "char" => json!({ "type": "string" }),
        "Uuid" => json!({ "type": "string", "format": "uuid" }),
        "bool" => json!({ "type": "boolean" }),
        "i8" | "i16" | "i32" | "u8" | "u16" => json!({ "type": "integer", "format": "int32" }),
        "i64" | "i128" | "isize" | "u32" | "u64" | "u128" | "usize" => {
            json!({ "type": "integer", "format": "int64" })
        }
        "f32" => json!({ "type": "number", "format": "float" }),
        "f64" => json!({ "type": "number", "format": "double" }),
        "Value" => json!({}),
        other => schema_ref(other.split('<').next().unwrap_or(other)),
    }
}

/// `Name<inner>` -> `inner`, matching the last path segment of `Name`.
fn generic_argument<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    let open = type_name.find('<')?;
    let head = &type_name[..open];
    let last = head.rsplit("::").next().unwrap_or(head).trim();
    if last != wrapper || !type_name.ends_with('>') {
        return None;
    }
    Some(type_name[open + 1..type_name.len() - 1].trim())
}

/// Split `K, V` at the first comma outside angle brackets.
fn split_top_level(arguments: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (index, ch) in arguments.char_indices() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                return Some((arguments[..index].trim(), arguments[index + 1..].trim()));
            }
            _ => {}
        }
    }
    None
}

fn status_description(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_schema() {
        assert_eq!(type_schema("String"), json!({ "type": "string" }));
        assert_eq!(
            type_schema("Option<u32>"),
            json!({ "type": "integer", "format": "int64", "nullable": true })
        );
        assert_eq!(
            type_schema("Vec<crate::models::User>"),
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/User" } })
        );
        assert_eq!(
            type_schema("::std::collections::HashMap<String, Vec<bool>>"),
            json!({
                "type": "object",
                "additionalProperties": { "type": "array", "items": { "type": "boolean" } }
            })
        );
    }

    #[test]
    fn test_path_parameters_are_required() {
        let parameter = Parameter::new("id", ParameterLocation::Path, "u32").required(false);
        assert!(parameter.required);
        let parameter = Parameter::new("q", ParameterLocation::Query, "String");
        assert!(!parameter.required);
    }

    #[test]
    fn test_operation_serialization() {
        let operation = Operation::new("Fetch a user")
            .with_id("getUser")
            .with_parameter(Parameter::new("id", ParameterLocation::Path, "u32"))
            .with_response(200, Response::new(200, Some("User")))
            .with_response(404, Response::new(404, None));
        let value = serde_json::to_value(&operation).expect("serializes");
        assert_eq!(value["operationId"], "getUser");
        assert_eq!(value["parameters"][0]["in"], "path");
        assert_eq!(
            value["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/User"
        );
        assert_eq!(value["responses"]["404"]["description"], "Not Found");
        assert!(value["responses"]["404"].get("content").is_none());
    }
}
