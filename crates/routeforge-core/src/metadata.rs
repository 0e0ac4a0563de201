//! Documentation metadata attached to generated routes.

use serde::Serialize;

use crate::binding::BindingSource;
use crate::routing::HttpMethod;

/// A bound member that is not part of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: BindingSource,
    /// Rust type as written in source.
    pub type_name: String,
    pub required: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyDescriptor {
    pub type_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub type_name: Option<String>,
}

/// Everything documentation tooling needs to know about one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointMetadata {
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub operation_id: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub body: Option<BodyDescriptor>,
    pub responses: Vec<ResponseDescriptor>,
}

impl EndpointMetadata {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            summary: None,
            operation_id: None,
            parameters: Vec::new(),
            body: None,
            responses: Vec::new(),
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn parameter(
        mut self,
        name: impl Into<String>,
        location: BindingSource,
        type_name: impl Into<String>,
        required: bool,
        nullable: bool,
    ) -> Self {
        self.parameters.push(ParameterDescriptor {
            name: name.into(),
            location,
            type_name: type_name.into(),
            required,
            nullable,
        });
        self
    }

    /// A JSON request body.
    pub fn body(mut self, type_name: impl Into<String>) -> Self {
        self.body = Some(BodyDescriptor {
            type_name: type_name.into(),
            content_type: "application/json".to_string(),
        });
        self
    }

    /// Add a response; each (status, type) pair is kept once.
    pub fn response(mut self, status: u16, type_name: Option<&str>) -> Self {
        let descriptor = ResponseDescriptor {
            status,
            type_name: type_name.map(str::to_string),
        };
        if !self.responses.contains(&descriptor) {
            self.responses.push(descriptor);
        }
        self
    }

    pub fn response_for(&self, status: u16) -> Option<&ResponseDescriptor> {
        self.responses.iter().find(|response| response.status == status)
    }
}

#[cfg(feature = "openapi")]
mod openapi {
    use std::collections::BTreeMap;

    use routeforge_openapi::{
        DocumentBuilder, MediaType, Operation, Parameter, ParameterLocation, RequestBody,
        Response, type_schema,
    };
    use serde_json::{Map, Value};

    use super::EndpointMetadata;
    use crate::binding::BindingSource;

    const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

    impl EndpointMetadata {
        /// The OpenAPI operation for this route.
        ///
        /// Form members have no parameter location in OpenAPI; they become
        /// the properties of a form-encoded request body.
        pub fn to_operation(&self) -> Operation {
            let mut operation = Operation::default();
            operation.summary = self.summary.clone();
            operation.operation_id = self.operation_id.clone();

            let mut form = Map::new();
            let mut form_required = Vec::new();
            for parameter in &self.parameters {
                let location = match parameter.location {
                    BindingSource::Route => ParameterLocation::Path,
                    BindingSource::Query => ParameterLocation::Query,
                    BindingSource::Header => ParameterLocation::Header,
                    BindingSource::Cookie => ParameterLocation::Cookie,
                    BindingSource::Form => {
                        form.insert(parameter.name.clone(), type_schema(&parameter.type_name));
                        if parameter.required {
                            form_required.push(Value::String(parameter.name.clone()));
                        }
                        continue;
                    }
                    BindingSource::Body => continue,
                };
                operation.parameters.push(
                    Parameter::new(&parameter.name, location, &parameter.type_name)
                        .required(parameter.required),
                );
            }

            if let Some(body) = &self.body {
                let mut content = BTreeMap::new();
                content.insert(
                    body.content_type.clone(),
                    MediaType {
                        schema: type_schema(&body.type_name),
                    },
                );
                operation.request_body = Some(RequestBody {
                    required: true,
                    content,
                });
            }
            if !form.is_empty() {
                let mut schema = Map::new();
                schema.insert("type".to_string(), Value::String("object".to_string()));
                schema.insert("properties".to_string(), Value::Object(form));
                if !form_required.is_empty() {
                    schema.insert("required".to_string(), Value::Array(form_required));
                }
                let body = operation.request_body.get_or_insert_with(|| RequestBody {
                    required: true,
                    content: BTreeMap::new(),
                });
                body.content.insert(
                    FORM_CONTENT_TYPE.to_string(),
                    MediaType {
                        schema: Value::Object(schema),
                    },
                );
            }

            for response in &self.responses {
                operation.responses.insert(
                    response.status.to_string(),
                    Response::new(response.status, response.type_name.as_deref()),
                );
            }
            operation
        }

        /// Add this route to a document.
        pub fn add_to(&self, builder: DocumentBuilder) -> routeforge_openapi::Result<DocumentBuilder> {
            builder.operation(&self.path, self.method.as_str(), self.to_operation())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EndpointMetadata {
        EndpointMetadata::new(HttpMethod::Get, "/users/{id}")
            .summary("Fetch a user")
            .parameter("id", BindingSource::Route, "u32", true, false)
            .parameter("verbose", BindingSource::Query, "Option<bool>", false, true)
            .response(200, Some("User"))
            .response(404, None)
            .response(200, Some("User"))
    }

    #[test]
    fn test_responses_are_deduplicated() {
        let metadata = sample();
        assert_eq!(metadata.responses.len(), 2);
        assert_eq!(
            metadata.response_for(200).and_then(|r| r.type_name.as_deref()),
            Some("User")
        );
        assert!(metadata.response_for(404).is_some_and(|r| r.type_name.is_none()));
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_to_operation() {
        let metadata = sample()
            .parameter("token", BindingSource::Form, "String", true, false)
            .body("CreateUserBody");
        let operation = metadata.to_operation();
        assert_eq!(operation.summary.as_deref(), Some("Fetch a user"));
        assert_eq!(operation.parameters.len(), 2);
        let body = operation.request_body.expect("body");
        assert!(body.content.contains_key("application/json"));
        let form = &body.content["application/x-www-form-urlencoded"].schema;
        assert_eq!(form["properties"]["token"]["type"], "string");
        assert_eq!(form["required"][0], "token");
        assert!(operation.responses.contains_key("404"));
    }
}
