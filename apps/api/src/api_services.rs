//! Wiring of infrastructure adapters into application services.

mod database;
mod redis_client;
mod state_builder;

pub use database::connect_and_migrate;
pub use redis_client::build_redis_client;
pub use state_builder::{ServicePorts, build_app_state, build_state_from_ports};
