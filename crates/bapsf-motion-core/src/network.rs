//! Motor address checks

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, ValidationError};

/// Validate a dotted IPv4 address
pub fn validate_ip(ip: &str) -> Result<()> {
    static IPV4: OnceLock<Regex> = OnceLock::new();
    let pattern = IPV4.get_or_init(|| {
        Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("invalid regex pattern")
    });

    if pattern.is_match(ip) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIp { ip: ip.to_string() }.into())
    }
}
