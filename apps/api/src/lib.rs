//! Keystone API composition root.

#![forbid(unsafe_code)]

pub mod api_config;
mod api_router;
pub mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

pub use api_router::build_router;
pub use state::AppState;
