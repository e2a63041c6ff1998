//! Remote order gateway
//!
//! - [`OrderGateway`] - trait used by the sync engine
//! - [`HttpOrderGateway`] - REST implementation (reqwest)
//! - [`wire`] - JSON shapes and boundary validation

pub mod gateway;
pub mod service;
pub mod wire;

pub use gateway::{GatewayError, ListOrdersQuery, OrderGateway, OrderPage, RejectedOrder};
pub use service::HttpOrderGateway;
