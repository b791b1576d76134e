//! Core types for the delivery app.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::*;
pub use status::OrderStatus;
