//! # Venta Client
//!
//! REST implementations of the `venta-core` gateway contracts, against
//! the shop's backend API. One [`ApiClient`] implements all four traits;
//! the composition root builds it once and hands it to the core as
//! `Arc<dyn RateProvider>`, `Arc<dyn SaleGateway>`, and so on.
//!
//! ```no_run
//! use std::sync::Arc;
//! use venta_client::{ApiClient, ClientConfig};
//!
//! # fn main() -> Result<(), venta_client::ConfigError> {
//! let client = Arc::new(ApiClient::new(&ClientConfig::load()?)?);
//! let drawer = venta_core::DrawerService::new(client.clone());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gateways;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
