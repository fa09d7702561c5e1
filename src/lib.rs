#![doc = "The `tasktrack` library crate."]
#![doc = ""]
#![doc = "Domain models, the auth gate, storage backends, routing configuration and"]
#![doc = "error handling for the task-tracking API. The binary (`main.rs`) wires them"]
#![doc = "into an `HttpServer`."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
