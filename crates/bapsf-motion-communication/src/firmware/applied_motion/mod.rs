//! Applied Motion Products stepper drives
//!
//! Drives are addressed by IP and answer SCL (Serial Command Language)
//! requests one at a time over a framed TCP stream.

pub mod alarm_decoder;
pub mod commands;
pub mod config;
pub mod motor;
pub mod status_parser;

pub use alarm_decoder::{alarm_codes, alarm_message, decode_alarm};
pub use commands::{command, command_names, CommandSpec, RecvProcessor, Reply, SendProcessor};
pub use config::{MotorSettings, DEFAULT_PORT};
pub use motor::{validate_ip, Motor, MotorParameters};
pub use status_parser::StatusParser;
