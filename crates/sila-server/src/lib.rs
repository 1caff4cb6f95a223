//! HTTP server for the Sila inventory.
//!
//! Exposes assemblies and parts as a JSON REST API over an [`Inventory`],
//! with the document store selected and tuned by [`SilaConfig`].
//!
//! [`Inventory`]: sila_inventory::Inventory

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{LogConfig, ServerConfig, SilaConfig, StoreBackend, StoreConfig};
pub use error::{ApiError, ApiResult, ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::SilaServer;
