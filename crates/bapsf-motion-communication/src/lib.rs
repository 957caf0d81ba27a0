//! # BaPSF Motion Communication
//!
//! Byte transport, drive simulation and firmware drivers for the motors of
//! a probe drive. Only Applied Motion stepper drives over TCP are supported.

pub mod communication;
pub mod firmware;

pub use communication::{
    is_connection_level, is_timeout, read_frame, write_frame, Connector, ReadWrite,
    SimulatedBench, SimulatedDrive, TcpConnector,
};

pub use firmware::applied_motion::{
    command, MotorParameters, MotorSettings, Reply, StatusParser, DEFAULT_PORT,
};
pub use firmware::Motor;
