//! Order types shared between the sync engine and its collaborators
//!
//! - [`OrderRecord`]: the durable local order
//! - [`RemoteOrder`]: an order as the commerce platform reports it
//! - [`CanonicalStatus`]: the fixed status set both sides are mapped onto

pub mod record;
pub mod remote;
pub mod status;

// Re-exports
pub use record::{
    Amounts, BillingAddress, Customer, LineItem, NewOrderRecord, OrderPatch, OrderRecord,
};
pub use remote::{NewRemoteOrder, OrderUpdatePatch, RemoteOrder};
pub use status::{CanonicalStatus, UnknownStatus};
