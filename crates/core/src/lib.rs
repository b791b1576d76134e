//! Delivery Core - Shared domain types.
//!
//! This crate provides the types used across the delivery app:
//! - `web` - Server-rendered web application
//! - `integration-tests` - End-to-end HTTP tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no backend access, no HTTP
//! clients. Mapping orders to and from backend documents lives in the web
//! crate next to the backend clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email addresses, order enums and order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
