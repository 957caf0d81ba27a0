//! Firmware implementations for motor controllers
//!
//! Supported controllers:
//! - Applied Motion: STM/SWM stepper drives speaking SCL over TCP

pub mod applied_motion;

pub use applied_motion::{Motor, MotorParameters, MotorSettings};
