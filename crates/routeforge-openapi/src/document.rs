//! Assembling operations and schemas into one document.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::Result;
use crate::error::OpenApiError;
use crate::types::Operation;

/// Builder for an OpenAPI 3 document.
///
/// # Conflict Resolution
///
/// - **Operations**: a second operation for the same method and path is an error.
/// - **Schemas**: identical schemas are deduplicated; different schemas with the same name are an error.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    version: Option<String>,
    description: Option<String>,
    paths: BTreeMap<String, BTreeMap<String, Operation>>,
    schemas: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the API version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the API description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an operation for `method` (any case) on `path`.
    pub fn operation(mut self, path: &str, method: &str, operation: Operation) -> Result<Self> {
        let method = method.to_ascii_lowercase();
        let methods = self.paths.entry(path.to_string()).or_default();
        if methods.contains_key(&method) {
            return Err(OpenApiError::DuplicateOperation {
                method: method.to_ascii_uppercase(),
                path: path.to_string(),
            });
        }
        methods.insert(method, operation);
        Ok(self)
    }

    /// Add a component schema.
    pub fn schema(mut self, name: impl Into<String>, schema: Value) -> Result<Self> {
        let name = name.into();
        match self.schemas.get(&name) {
            Some(existing) if existing != &schema => Err(OpenApiError::SchemaConflict { name }),
            Some(_) => Ok(self),
            None => {
                self.schemas.insert(name, schema);
                Ok(self)
            }
        }
    }

    /// Build the final document.
    pub fn build(self) -> Result<Value> {
        let mut document = Map::new();
        document.insert("openapi".to_string(), Value::String("3.0.3".to_string()));

        let mut info = Map::new();
        info.insert(
            "title".to_string(),
            Value::String(self.title.unwrap_or_else(|| "API".to_string())),
        );
        info.insert(
            "version".to_string(),
            Value::String(self.version.unwrap_or_else(|| "0.1.0".to_string())),
        );
        if let Some(description) = self.description {
            info.insert("description".to_string(), Value::String(description));
        }
        document.insert("info".to_string(), Value::Object(info));

        let mut paths = Map::new();
        for (path, methods) in self.paths {
            let mut item = Map::new();
            for (method, operation) in methods {
                item.insert(method, serde_json::to_value(operation)?);
            }
            paths.insert(path, Value::Object(item));
        }
        document.insert("paths".to_string(), Value::Object(paths));

        if !self.schemas.is_empty() {
            let mut components = Map::new();
            components.insert("schemas".to_string(), Value::Object(self.schemas));
            document.insert("components".to_string(), Value::Object(components));
        }

        Ok(Value::Object(document))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{Response, schema_ref};

    #[test]
    fn test_basic_document() {
        let document = DocumentBuilder::new()
            .title("Test API")
            .version("1.0.0")
            .description("A test API")
            .build()
            .expect("builds");

        assert_eq!(document["info"]["title"], "Test API");
        assert_eq!(document["info"]["version"], "1.0.0");
        assert_eq!(document["info"]["description"], "A test API");
        assert_eq!(document["openapi"], "3.0.3");
        assert!(document.get("components").is_none());
    }

    #[test]
    fn test_operations_share_paths() {
        let document = DocumentBuilder::new()
            .operation("/users", "GET", Operation::new("List users"))
            .and_then(|b| b.operation("/users", "post", Operation::new("Create user")))
            .and_then(|b| b.operation("/orders", "get", Operation::new("List orders")))
            .and_then(DocumentBuilder::build)
            .expect("builds");

        assert_eq!(document["paths"]["/users"]["get"]["summary"], "List users");
        assert_eq!(document["paths"]["/users"]["post"]["summary"], "Create user");
        assert!(document["paths"]["/orders"]["get"].is_object());
    }

    #[test]
    fn test_duplicate_operation() {
        let result = DocumentBuilder::new()
            .operation("/users", "get", Operation::new("First"))
            .and_then(|b| b.operation("/users", "GET", Operation::new("Second")));

        assert!(matches!(
            result,
            Err(OpenApiError::DuplicateOperation { method, path }) if method == "GET" && path == "/users"
        ));
    }

    #[test]
    fn test_schema_deduplication() {
        let user = json!({"type": "object", "properties": {"name": {"type": "string"}}});
        let document = DocumentBuilder::new()
            .schema("User", user.clone())
            .and_then(|b| b.schema("User", user))
            .and_then(DocumentBuilder::build)
            .expect("identical schemas dedupe");
        assert!(document["components"]["schemas"]["User"].is_object());
    }

    #[test]
    fn test_schema_conflict() {
        let result = DocumentBuilder::new()
            .schema("User", json!({"type": "object", "properties": {"name": {"type": "string"}}}))
            .and_then(|b| b.schema("User", json!({"type": "object", "properties": {"id": {"type": "integer"}}})));

        assert!(matches!(result, Err(OpenApiError::SchemaConflict { name }) if name == "User"));
    }

    #[test]
    fn test_responses_reference_schemas() {
        let operation = Operation::new("Fetch").with_response(200, Response::new(200, Some("User")));
        let document = DocumentBuilder::new()
            .operation("/users/{id}", "get", operation)
            .and_then(DocumentBuilder::build)
            .expect("builds");
        assert_eq!(
            document["paths"]["/users/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
            schema_ref("User")
        );
    }
}
