//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod call_intent;
mod call_status;
mod failure_reason;
mod reservation_status;

pub use call_intent::*;
pub use call_status::*;
pub use failure_reason::*;
pub use reservation_status::*;
