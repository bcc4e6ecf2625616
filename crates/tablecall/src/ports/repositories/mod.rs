//! Repository Ports
//!
//! Abstract interfaces for call state persistence.

mod call_repository;

pub use call_repository::*;
