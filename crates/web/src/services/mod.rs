//! Business logic services.
//!
//! # Services
//!
//! - `orders` - Order placement, listing and detail reads over the document store
pub mod orders;

pub use orders::{Caller, OrderError, OrderService};
