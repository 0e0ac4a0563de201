use std::sync::Arc;

use routeforge::prelude::*;
use routeforge::serde_json::json;
use serde::Deserialize;

use crate::models::{Item, Order, OrderStore};

#[endpoint("/orders/{orderId}")]
pub struct Orders {
    pub(crate) store: Arc<OrderStore>,
}

/// Route, query, header and body members in one request.
#[derive(Request)]
pub struct EditOrder {
    #[route(name = "orderId")]
    pub order_id: u32,
    #[query(name = "abc")]
    #[required]
    pub not_used: Option<String>,
    #[header(name = "X-Tenant")]
    pub tenant: String,
    pub total: f64,
    pub note: Option<String>,
}

impl EditOrder {
    /// Rules over stored orders, not over this request.
    pub fn audit(rules: &mut RuleBuilder<Order>) {
        rules.rule("tenant", "must not be empty", |order: &Order| !order.tenant.is_empty());
    }

    pub fn rules(rules: &mut RuleBuilder<Self>) {
        rules.rule("total", "must not be negative", |request: &EditOrder| request.total >= 0.0);
    }
}

impl Orders {
    /// Fetch one order.
    pub async fn get(&self, order_id: u32) -> Option<Order> {
        self.store.find(order_id)
    }

    /// Edit an order.
    pub async fn put(&self, request: EditOrder) -> Result<Order, String> {
        let mut order = self
            .store
            .find(request.order_id)
            .ok_or_else(|| format!("order {} does not exist", request.order_id))?;
        order.tenant = request.tenant;
        order.total = request.total;
        order.note = request.note;
        Ok(order)
    }
}

#[endpoint("/items")]
pub struct Items;

#[derive(Debug, Deserialize, Request)]
pub struct NewItem {
    #[required]
    pub name: Option<String>,
    pub quantity: u32,
}

impl NewItem {
    pub fn checks() -> impl Validator<NewItem> {
        let mut rules = RuleBuilder::new();
        rules.rule("quantity", "must be positive", |item: &NewItem| item.quantity > 0);
        rules.build()
    }
}

impl Items {
    /// Create an item.
    pub fn post(request: NewItem) -> Box<dyn IntoHttpResult> {
        let name = request.name.unwrap_or_default();
        if name == "broken" {
            return Box::new(HttpResult::problem(503, "item storage is offline"));
        }
        Box::new(HttpResult::json(
            201,
            &Item {
                id: 7,
                name,
                quantity: request.quantity,
            },
        ))
    }
}

#[endpoint("/profile")]
pub struct Profile;

impl Profile {
    /// The caller's profile.
    pub fn get() -> HttpResult {
        HttpResult::ok(json!({
            "userName": "ada",
            "user_name": "ada_l",
            "self": true,
            "type": "admin",
        }))
    }
}

#[endpoint("/files/{name}.{ext}")]
pub struct Files;

impl Files {
    pub fn get(name: String, ext: String) -> String {
        format!("{name} as {ext}")
    }
}
