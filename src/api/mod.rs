//! API module - HTTP routes, handlers, and models

pub mod handlers;
pub mod image_handlers;
pub mod models;
pub mod routes;
pub mod stats_handlers;
