//! Whole-pipeline tests: sources on disk in, generated module out.

use std::fs;
use std::path::{Path, PathBuf};

use routeforge_codegen::{GenerateError, Generator, GeneratorConfig};
use tempfile::TempDir;

const LIB: &str = r#"
pub mod api;
pub mod models;
"#;

const MODELS: &str = r#"
pub struct Order {
    pub id: u32,
    pub total: f64,
}

pub struct OrderStore;
"#;

const API: &str = r#"
use std::sync::Arc;

use crate::models::{Order, OrderStore};

/// Order lookups and edits.
#[endpoint("/orders/{orderId}")]
pub struct Orders {
    store: Arc<OrderStore>,
}

pub struct EditOrder {
    #[route(name = "orderId")]
    pub order_id: u32,
    #[query]
    pub dry_run: Option<bool>,
    #[header(name = "X-Tenant")]
    pub tenant: String,
    #[required]
    pub customer_note: Option<String>,
    pub total: f64,
}

impl Orders {
    /// Fetch one order.
    pub async fn get(&self, order_id: u32) -> Option<Order> {
        None
    }

    /// Edit an order.
    pub async fn put(&self, request: EditOrder) -> Result<Order, String> {
        Err(String::new())
    }
}

#[endpoint("/health")]
pub struct Health;

impl Health {
    pub fn get() -> (bool, String) {
        (true, String::new())
    }
}
"#;

// ============================================================================
// Helpers
// ============================================================================

fn write_crate(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (path, text) in files {
        let path = dir.path().join("src").join(path);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, text).expect("write source");
    }
    dir
}

fn sample_crate() -> TempDir {
    write_crate(&[("lib.rs", LIB), ("models.rs", MODELS), ("api.rs", API)])
}

fn config_for(dir: &Path) -> GeneratorConfig {
    GeneratorConfig {
        sources: vec![dir.join("src")],
        output: Some(dir.join("generated/endpoints.rs")),
        ..GeneratorConfig::default()
    }
}

fn generate(dir: &Path) -> String {
    let generator = Generator::new(config_for(dir));
    let compilation = generator.load().expect("loads");
    generator.generate(&compilation).source
}

// ============================================================================
// Generated code
// ============================================================================

#[test]
fn test_generated_module_parses() {
    let dir = sample_crate();
    let source = generate(dir.path());
    syn::parse_file(&source).expect("generated code is valid Rust");
}

#[test]
fn test_mixed_sources_bind_by_client_names() {
    let dir = sample_crate();
    let source = generate(dir.path());

    assert!(source.contains("let body: EditOrderBody = ctx.read_json()?;"));
    assert!(source.contains(
        "order_id: ctx.bind::<u32>(::routeforge::BindingSource::Route, \"orderId\")?,"
    ));
    assert!(source.contains(
        "dry_run: ctx.bind_opt::<bool>(::routeforge::BindingSource::Query, \"dryRun\")?,"
    ));
    assert!(source.contains(
        "tenant: ctx.bind::<String>(::routeforge::BindingSource::Header, \"X-Tenant\")?,"
    ));
    assert!(source.contains("customer_note: body.customer_note,"));
    assert!(source.contains("total: body.total,"));

    // Only body members end up in the synthesized type.
    let body = source
        .split("pub struct EditOrderBody {")
        .nth(1)
        .and_then(|rest| rest.split('}').next())
        .expect("body type declared");
    assert!(body.contains("pub customer_note: Option<String>,"));
    assert!(body.contains("pub total: f64,"));
    assert!(!body.contains("tenant"));
}

#[test]
fn test_validation_errors_use_client_names() {
    let dir = sample_crate();
    let source = generate(dir.path());

    assert!(source.contains(
        "rules.required(\"customer_note\", |value: &crate::api::EditOrder| ::routeforge::Presence::is_present(&value.customer_note));"
    ));
    assert!(source.contains(".remap(&[(\"order_id\", \"orderId\"), (\"dry_run\", \"dryRun\"), (\"tenant\", \"X-Tenant\"), (\"customer_note\", \"customerNote\")]);"));
}

#[test]
fn test_services_and_routes() {
    let dir = sample_crate();
    let source = generate(dir.path());

    assert!(source.contains("add_transient::<crate::api::Orders, _>"));
    assert!(source.contains("store: ::routeforge::services::require::<crate::models::OrderStore>(provider)?,"));
    assert!(source.contains("let instance = ctx.service::<crate::api::Orders>()?;"));
    assert!(source.contains(
        "let arg_order_id = ctx.bind::<u32>(::routeforge::BindingSource::Route, \"orderId\")?;"
    ));
    assert!(source.contains("let output = instance.get(arg_order_id).await;"));
    assert!(source.contains("Err(err) => ::routeforge::HttpResult::from_error(&err),"));
    assert!(source.contains("let output = <crate::api::Health>::get();"));
    assert!(source.contains("pub struct GetHealthResponse0 {"));
    assert!(source.contains("::routeforge::schema::describe::<crate::models::Order>(schemas, \"Order\");"));
    assert!(source.contains("services.add_endpoint_source(::std::sync::Arc::new(GeneratedEndpoints));"));
}

#[test]
fn test_output_is_deterministic() {
    let dir = sample_crate();
    assert_eq!(generate(dir.path()), generate(dir.path()));
}

// ============================================================================
// Runs
// ============================================================================

#[test]
fn test_run_writes_then_check_detects_drift() {
    let dir = sample_crate();
    let config = config_for(dir.path());
    let output: PathBuf = config.output.clone().expect("output configured");
    let generator = Generator::new(config);

    let unit = generator.run().expect("generation succeeds");
    assert_eq!(unit.endpoints, 3);
    assert_eq!(fs::read_to_string(&output).expect("written"), unit.source);
    generator.check().expect("fresh output is current");

    fs::write(
        dir.path().join("src/api.rs"),
        API.replace("/health", "/status"),
    )
    .expect("edit source");
    match generator.check() {
        Err(GenerateError::Stale { path }) => assert_eq!(path, output),
        other => panic!("expected stale output, got {other:?}"),
    }
}

#[test]
fn test_invalid_template_fails_without_writing() {
    let dir = write_crate(&[(
        "lib.rs",
        r#"
        #[endpoint("/users/{id")]
        pub struct Users;
        impl Users { pub fn get() {} }
        "#,
    )]);
    let config = config_for(dir.path());
    let output = config.output.clone().expect("output configured");

    match Generator::new(config).run() {
        Err(GenerateError::Diagnostics(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].subject, "crate::Users");
        }
        other => panic!("expected diagnostics, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_config_file_paths_are_relative_to_the_file() {
    let dir = sample_crate();
    fs::write(
        dir.path().join("routeforge.toml"),
        "sources = [\"src\"]\noutput = \"out/endpoints.rs\"\nmodule = \"routes\"\nschema_feature = \"openapi\"\n",
    )
    .expect("write config");

    let generator = Generator::from_config_file(dir.path().join("routeforge.toml")).expect("config loads");
    assert_eq!(generator.config().sources, vec![dir.path().join("src")]);

    let unit = generator.run().expect("generation succeeds");
    let written = fs::read_to_string(dir.path().join("out/endpoints.rs")).expect("written");
    assert_eq!(written, unit.source);
    assert!(written.contains("pub mod routes {"));
    assert!(written.contains("#[cfg(feature = \"openapi\")]"));
}
