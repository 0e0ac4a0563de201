//! The generated unit, compiled into this crate and driven through the
//! runtime the way a host would.

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use routeforge::serde_json::{Value, json};
use routeforge::{
    BindingSource, HttpMethod, RecordedRoute, RequestContextBuilder, RequestContext, RouteList,
    SchemaList, ServiceCollection, ServiceLocator, ServiceProvider,
};
use routeforge_fixture::endpoints;
use routeforge_fixture::models::{Order, OrderStore};

// ============================================================================
// Host
// ============================================================================

struct Host {
    provider: Arc<ServiceProvider>,
    routes: RouteList,
}

impl Host {
    fn new() -> Self {
        let mut services = ServiceCollection::new();
        services.add_instance(OrderStore::new(vec![Order {
            id: 1,
            tenant: "initial".to_string(),
            total: 3.0,
            note: None,
        }]));
        endpoints::add_endpoints(&mut services);
        let provider = Arc::new(services.build());

        let mut routes = RouteList::new();
        for source in provider.endpoint_sources() {
            source
                .map_endpoints(&mut routes, provider.as_ref())
                .expect("routes map");
        }
        Self { provider, routes }
    }

    fn route(&self, method: HttpMethod, path: &str) -> &RecordedRoute {
        self.routes.find(method, path).expect("route mapped")
    }

    fn request(&self) -> RequestContextBuilder {
        let locator: Arc<dyn ServiceLocator> = self.provider.clone();
        RequestContext::builder(locator)
    }

    fn edit_order(&self, query: &str, body: Value) -> RequestContext {
        self.request()
            .route_value("orderId", "1")
            .query(query)
            .header(
                HeaderName::from_static("x-tenant"),
                HeaderValue::from_static("acme"),
            )
            .json(&body)
            .expect("body serializes")
            .build()
    }
}

// ============================================================================
// Mixed-source requests
// ============================================================================

#[tokio::test]
async fn test_mixed_source_request_binds_every_member() {
    let host = Host::new();
    let route = host.route(HttpMethod::Put, "/orders/{orderId}");

    let result = route
        .call(host.edit_order("abc=x", json!({ "total": 12.5, "note": "gift" })))
        .await;
    assert_eq!(result.status(), 200);
    assert_eq!(
        result.body(),
        Some(&json!({ "id": 1, "tenant": "acme", "total": 12.5, "note": "gift" }))
    );
}

#[tokio::test]
async fn test_missing_renamed_member_reports_the_client_name() {
    let host = Host::new();
    let route = host.route(HttpMethod::Put, "/orders/{orderId}");

    let result = route.call(host.edit_order("", json!({ "total": 1.0 }))).await;
    assert_eq!(result.status(), 400);
    let errors = &result.body().expect("problem body")["errors"];
    assert!(errors.get("abc").is_some(), "errors: {errors}");
    assert!(errors.get("not_used").is_none(), "errors: {errors}");
}

#[tokio::test]
async fn test_hook_over_the_request_type_runs() {
    let host = Host::new();
    let route = host.route(HttpMethod::Put, "/orders/{orderId}");

    let result = route.call(host.edit_order("abc=x", json!({ "total": -2.0 }))).await;
    assert_eq!(result.status(), 400);
    let errors = &result.body().expect("problem body")["errors"];
    assert_eq!(errors["total"], json!(["must not be negative"]));
    assert!(errors.get("tenant").is_none());
}

#[tokio::test]
async fn test_optional_return_maps_to_not_found() {
    let host = Host::new();
    let route = host.route(HttpMethod::Get, "/orders/{orderId}");

    let found = route.call(host.request().route_value("orderId", "1").build()).await;
    assert_eq!(found.status(), 200);
    assert_eq!(found.body().expect("order")["tenant"], "initial");

    let missing = route.call(host.request().route_value("orderId", "9").build()).await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn test_endpoint_error_becomes_a_server_error() {
    let host = Host::new();
    let route = host.route(HttpMethod::Put, "/orders/{orderId}");

    let ctx = host
        .request()
        .route_value("orderId", "9")
        .query("abc=x")
        .header(
            HeaderName::from_static("x-tenant"),
            HeaderValue::from_static("acme"),
        )
        .json(&json!({ "total": 1.0 }))
        .expect("body serializes")
        .build();
    let result = route.call(ctx).await;
    assert_eq!(result.status(), 500);
}

// ============================================================================
// Validators and boxed results
// ============================================================================

#[tokio::test]
async fn test_required_members_and_validator_factory_both_apply() {
    let host = Host::new();
    let route = host.route(HttpMethod::Post, "/items");
    let post = |body: Value| {
        route.call(
            host.request()
                .json(&body)
                .expect("body serializes")
                .build(),
        )
    };

    let created = post(json!({ "name": "lamp", "quantity": 2 })).await;
    assert_eq!(created.status(), 201);
    assert_eq!(
        created.body(),
        Some(&json!({ "id": 7, "name": "lamp", "quantity": 2 }))
    );

    let unnamed = post(json!({ "quantity": 0 })).await;
    assert_eq!(unnamed.status(), 400);
    let errors = &unnamed.body().expect("problem body")["errors"];
    assert!(errors.get("name").is_some(), "errors: {errors}");
    assert!(errors.get("quantity").is_some(), "errors: {errors}");

    let offline = post(json!({ "name": "broken", "quantity": 1 })).await;
    assert_eq!(offline.status(), 503);
}

#[tokio::test]
async fn test_json_with_clashing_keys_serializes_as_written() {
    let host = Host::new();
    let route = host.route(HttpMethod::Get, "/profile");

    let result = route.call(host.request().build()).await;
    assert_eq!(result.status(), 200);
    assert_eq!(
        result.body(),
        Some(&json!({
            "userName": "ada",
            "user_name": "ada_l",
            "self": true,
            "type": "admin",
        }))
    );
}

// ============================================================================
// Metadata and schemas
// ============================================================================

#[test]
fn test_metadata_uses_client_names_and_declared_statuses() {
    let host = Host::new();

    let edit = host
        .route(HttpMethod::Put, "/orders/{orderId}")
        .metadata()
        .expect("metadata attached");
    let abc = edit
        .parameters
        .iter()
        .find(|parameter| parameter.name == "abc")
        .expect("renamed query member documented");
    assert_eq!(abc.location, BindingSource::Query);
    assert!(abc.required);
    assert!(edit.parameters.iter().any(|p| p.name == "X-Tenant"));
    assert_eq!(
        edit.body.as_ref().map(|body| body.type_name.as_str()),
        Some("EditOrderBody")
    );

    let create = host
        .route(HttpMethod::Post, "/items")
        .metadata()
        .expect("metadata attached");
    assert!(create.response_for(201).is_some());
    assert!(create.response_for(503).is_some());
    assert!(create.response_for(400).is_some());
}

#[test]
fn test_schemas_cover_requests_and_responses() {
    let mut schemas = SchemaList::new();
    endpoints::describe_schemas(&mut schemas);

    let names: Vec<&str> = schemas.names().collect();
    assert!(names.contains(&"EditOrderBody"), "schemas: {names:?}");
    assert!(names.contains(&"NewItem"), "schemas: {names:?}");
    assert!(schemas.contains::<Order>());
}

// ============================================================================
// Templates
// ============================================================================

#[tokio::test]
async fn test_segment_with_several_parameters_binds_each() {
    let host = Host::new();
    let route = host.route(HttpMethod::Get, "/files/{name}.{ext}");

    let ctx = host
        .request()
        .route_value("name", "report")
        .route_value("ext", "pdf")
        .build();
    let result = route.call(ctx).await;
    assert_eq!(result.status(), 200);
    assert_eq!(result.body(), Some(&json!("report as pdf")));

    let described = route.metadata().expect("metadata attached");
    let sources: Vec<(&str, BindingSource)> = described
        .parameters
        .iter()
        .map(|parameter| (parameter.name.as_str(), parameter.location))
        .collect();
    assert_eq!(
        sources,
        vec![("name", BindingSource::Route), ("ext", BindingSource::Route)]
    );
}
