//! Assembles one generated unit from every endpoint class of a compilation.

use std::path::PathBuf;

use routeforge_parse::{Compilation, Diagnostic, find_endpoint_classes};

use crate::config::GeneratorConfig;
use crate::emit::{ENDPOINTS_TYPE, EmitState, Emitter};
use crate::writer::{Block, Function, ImplDecl, Indent, Item, Namespace, Render, SourceFile, StructDecl};

const MODULE_LINTS: &str = "#[allow(dead_code, non_camel_case_types, non_snake_case, unused_imports, unused_mut, unused_variables, clippy::all)]";

/// The rendered unit and what was learned while producing it.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of routes mapped.
    pub endpoints: usize,
    /// Files the unit was generated from.
    pub inputs: Vec<PathBuf>,
}

impl GeneratedUnit {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

pub fn generate_unit(compilation: &Compilation, config: &GeneratorConfig) -> GeneratedUnit {
    let rt = config.runtime.as_str();
    let emitter = Emitter::new(compilation, rt);
    let mut state = EmitState::new();
    let mut diagnostics = Vec::new();

    let mut registrations = Block::new();
    let mut singletons = Block::new();
    let mut routes: Vec<Block> = Vec::new();

    for class in find_endpoint_classes(compilation, &config.endpoint_attribute) {
        let class = match class {
            Ok(class) => class,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                continue;
            }
        };
        diagnostics.extend(class.warnings.iter().cloned());
        if class.endpoints.is_empty() {
            diagnostics.push(Diagnostic::warning(
                class.full_path.as_str(),
                "no verb methods found; the type maps no routes",
            ));
            continue;
        }

        tracing::debug!(
            class = %class.full_path,
            endpoints = class.endpoints.len(),
            "generating endpoint class"
        );
        emitter.registration(&class, &mut registrations);
        let shared = emitter.singleton(&class, &mut state, &mut singletons);
        for endpoint in &class.endpoints {
            routes.push(emitter.endpoint(&class, endpoint, shared.as_deref(), &mut state));
        }
    }

    let endpoints = routes.len();
    let output = state.into_output();
    diagnostics.extend(output.diagnostics);
    for diagnostic in &diagnostics {
        if diagnostic.is_error() {
            tracing::error!(subject = %diagnostic.subject, "{}", diagnostic.message);
        } else {
            tracing::warn!(subject = %diagnostic.subject, "{}", diagnostic.message);
        }
    }

    let add_endpoints = Block::build(|b| {
        b.extend(registrations);
        b.line(format!(
            "services.add_endpoint_source(::std::sync::Arc::new({ENDPOINTS_TYPE}));"
        ));
    });

    let describe_schemas = Block::build(|b| match &config.schema_feature {
        Some(feature) if !output.schema_calls.is_empty() => {
            b.region(format!("feature = {}", crate::writer::string_literal(feature)), |b| {
                b.extend(output.schema_calls);
            });
        }
        _ => {
            b.extend(output.schema_calls);
        }
    });

    let map_endpoints = Block::build(|b| {
        if !output.validator_setup.is_empty() {
            b.extend(output.validator_setup);
            b.blank();
        }
        if !singletons.is_empty() {
            b.extend(singletons);
            b.blank();
        }
        for route in routes {
            b.extend(route);
            b.blank();
        }
        b.line("Ok(())");
    });

    let mut module = Namespace::new(&config.module)
        .docs("Routes, services and schemas for every endpoint type in the crate.")
        .attr(MODULE_LINTS);
    module.item(Item::Function(
        Function::new(
            format!("pub fn add_endpoints(services: &mut dyn {rt}::ServiceRegistry)"),
            add_endpoints,
        )
        .docs("Register endpoint types and the route source with the host."),
    ));
    module.item(Item::Function(
        Function::new(
            format!("pub fn describe_schemas(schemas: &mut dyn {rt}::SchemaRegistry)"),
            describe_schemas,
        )
        .docs("Announce every request and response type for documentation."),
    ));
    module.item(Item::Struct(StructDecl::new(ENDPOINTS_TYPE).docs("Maps every generated route.")));
    module.item(Item::Impl(ImplDecl::new(format!("impl {rt}::MapEndpoints for {ENDPOINTS_TYPE}")).function(
        Function::new(
            format!(
                "fn map_endpoints(&self, routes: &mut dyn {rt}::RouteTable, services: &dyn {rt}::ServiceLocator) -> ::core::result::Result<(), {rt}::EndpointError>"
            ),
            map_endpoints,
        ),
    )));
    for declaration in output.declarations {
        module.item(declaration);
    }

    let mut file = SourceFile::new();
    file.header_line("@generated by routeforge. Do not edit.")
        .header_line("Regenerate with `routeforge generate` or from build.rs.")
        .item(Item::Namespace(module));

    let inputs: Vec<PathBuf> = compilation.input_paths().map(PathBuf::from).collect();
    tracing::info!(endpoints, files = inputs.len(), "generated endpoint unit");

    GeneratedUnit {
        source: file.render_to_string(Indent(config.indent)),
        diagnostics,
        endpoints,
        inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(source: &str, config: &GeneratorConfig) -> GeneratedUnit {
        let compilation = Compilation::from_sources([("lib.rs", source)]).expect("parses");
        generate_unit(&compilation, config)
    }

    #[test]
    fn test_empty_crate_still_has_entry_points() {
        let unit = generate("pub struct Nothing;", &GeneratorConfig::default());
        assert_eq!(unit.endpoints, 0);
        assert!(unit.source.starts_with("// @generated by routeforge. Do not edit.\n"));
        assert!(unit.source.contains("pub mod endpoints {"));
        assert!(unit.source.contains(
            "pub fn add_endpoints(services: &mut dyn ::routeforge::ServiceRegistry) {"
        ));
        assert!(unit.source.contains(
            "pub fn describe_schemas(schemas: &mut dyn ::routeforge::SchemaRegistry) {\n    }"
        ));
        assert!(unit.source.contains("impl ::routeforge::MapEndpoints for GeneratedEndpoints {"));
        assert!(!unit.has_errors());
    }

    #[test]
    fn test_schema_registrations_behind_feature() {
        let config = GeneratorConfig {
            schema_feature: Some("openapi".to_string()),
            ..GeneratorConfig::default()
        };
        let unit = generate(
            r#"
            #[endpoint("/users")]
            pub struct Users;
            pub struct User { pub id: u32 }
            impl Users { pub fn get() -> Vec<User> { Vec::new() } }
            "#,
            &config,
        );
        assert_eq!(unit.endpoints, 1);
        assert!(unit.source.contains(
            "#[cfg(feature = \"openapi\")]\n        {\n            ::routeforge::schema::describe::<crate::User>(schemas, \"User\");\n        }"
        ));
    }

    #[test]
    fn test_class_without_verbs_warns() {
        let unit = generate(
            r#"
            #[endpoint("/idle")]
            pub struct Idle;
            impl Idle { pub fn helper(&self) {} }
            "#,
            &GeneratorConfig::default(),
        );
        assert_eq!(unit.endpoints, 0);
        assert!(!unit.has_errors());
        assert!(unit.diagnostics.iter().any(|d| d.subject == "crate::Idle"));
        assert!(!unit.source.contains("crate::Idle"));
    }
}
