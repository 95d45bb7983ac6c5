//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful domain mutations. The wiring context installs a channel
//! sink that drives portfolio recalculation; host applications can install
//! their own sink to observe mutations.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
