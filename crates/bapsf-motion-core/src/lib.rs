//! # bapsf-motion core
//!
//! Shared building blocks for the probe drive stack: the error taxonomy,
//! physical units and per-axis equivalencies, the motor status snapshot
//! and the event bus that carries status changes to listeners.

pub mod error;
pub mod event_bus;
pub mod network;
pub mod status;
pub mod units;

pub use error::{
    ConnectionError, Error, LookupError, ProtocolError, Result, UsageError, ValidationError,
};

pub use event_bus::{EventBus, EventCategory, EventFilter, MotorEvent, SubscriptionId};

pub use network::validate_ip;

pub use status::{ConnectionState, MotorStatus, StatusField};

pub use units::{conversion_pairs, EquivalenceTable, PhysicalType, Quantity, TimeOrder, Unit};
