//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - Call: Outbound call record and its lifecycle state
//! - CallArtifact: Transcript, extraction output and raw payload of a call
//! - CallEvent: Typed lifecycle event reported by the voice provider
//! - Reservation: Requested booking and the outcome read from the call

mod artifact;
mod call;
mod event;
mod reservation;

pub use artifact::*;
pub use call::*;
pub use event::*;
pub use reservation::*;
