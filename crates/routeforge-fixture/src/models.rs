use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: u32,
    pub tenant: String,
    pub total: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
    pub quantity: u32,
}

/// Read-only order lookup.
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
}

impl OrderStore {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn find(&self, id: u32) -> Option<Order> {
        self.orders.iter().find(|order| order.id == id).cloned()
    }
}
