//! A small order service whose routes come from the generated unit.

pub mod api;
pub mod models;

include!(concat!(env!("OUT_DIR"), "/endpoints.rs"));
