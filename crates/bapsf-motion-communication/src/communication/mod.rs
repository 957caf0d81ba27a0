//! Communication layer
//!
//! Byte-level transport to motor controllers: framing, connectors and an
//! in-memory simulated drive.

pub mod simulator;
pub mod transport;

pub use simulator::{SimulatedBench, SimulatedDrive};
pub use transport::{
    encode_frame, is_connection_level, is_timeout, read_frame, write_frame, Connector, ReadWrite,
    TcpConnector, FRAME_END, FRAME_HEADER,
};
