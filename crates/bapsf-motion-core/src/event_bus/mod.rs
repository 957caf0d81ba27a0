//! # Motor event bus
//!
//! Publish/subscribe plumbing for motor status changes. Every motor driver
//! owns one [`EventBus`]; listeners register a handler and receive a
//! [`SubscriptionId`] that is later used to unsubscribe.
//!
//! ```rust,ignore
//! use bapsf_motion_core::event_bus::{EventBus, EventFilter, MotorEvent};
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe(EventFilter::All, |event| {
//!     if let MotorEvent::StatusChanged { changed, .. } = event {
//!         tracing::info!("changed: {:?}", changed);
//!     }
//! });
//! bus.unsubscribe(id);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
