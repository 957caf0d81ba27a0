//! Applied Motion SCL command table
//!
//! Each entry names the ASCII template sent to the drive, the optional
//! pattern its reply must match (capturing a `return` group), how the
//! argument and reply are processed, and the motor-native unit of the
//! argument/reply when there is one.

use bapsf_motion_core::{LookupError, ProtocolError, Quantity, Result, Unit, ValidationError};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// How a command argument is rendered into the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendProcessor {
    /// Rendered with `f64` display formatting
    Decimal,
    /// Rounded to the nearest integer
    Integer,
}

/// How the captured reply is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvProcessor {
    /// Returned as text
    Text,
    /// Parsed as an integer
    Integer,
}

/// One entry of the command table
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Name callers use to look the command up
    pub name: &'static str,
    /// ASCII template, `{}` marks the argument
    pub template: &'static str,
    recv: Option<Regex>,
    /// Argument processing
    pub send_processor: SendProcessor,
    /// Reply processing
    pub recv_processor: RecvProcessor,
    /// Motor-native unit of the argument and reply
    pub units: Option<Unit>,
}

impl CommandSpec {
    fn new(name: &'static str, template: &'static str) -> Self {
        Self {
            name,
            template,
            recv: None,
            send_processor: SendProcessor::Decimal,
            recv_processor: RecvProcessor::Text,
            units: None,
        }
    }

    fn reply_pattern(mut self, pattern: &str) -> Self {
        self.recv = Some(Regex::new(&format!("^{pattern}$")).expect("invalid reply pattern"));
        self
    }

    fn integer_arg(mut self) -> Self {
        self.send_processor = SendProcessor::Integer;
        self
    }

    fn integer_reply(mut self) -> Self {
        self.recv_processor = RecvProcessor::Integer;
        self
    }

    fn units(mut self, unit: Unit) -> Self {
        self.units = Some(unit);
        self
    }

    /// True when the template carries an argument slot
    pub fn takes_argument(&self) -> bool {
        self.template.contains("{}")
    }

    /// Render the ASCII payload for this command
    pub fn render(&self, arg: Option<f64>) -> Result<String> {
        if !self.takes_argument() {
            return Ok(self.template.to_string());
        }

        let value = arg.ok_or_else(|| ValidationError::MissingParameter {
            param: format!("{} argument", self.name),
        })?;
        if !value.is_finite() {
            return Err(ValidationError::invalid(
                self.name,
                format!("argument must be finite, got {value}"),
            )
            .into());
        }

        let rendered = match self.send_processor {
            SendProcessor::Integer => format!("{}", value.round() as i64),
            SendProcessor::Decimal => format!("{value}"),
        };
        Ok(self.template.replacen("{}", &rendered, 1))
    }

    /// Match and process a raw reply payload
    pub fn parse_reply(&self, raw: &str) -> Result<Reply> {
        let captured = match &self.recv {
            Some(pattern) => pattern
                .captures(raw)
                .and_then(|caps| caps.name("return"))
                .map(|m| m.as_str())
                .ok_or_else(|| ProtocolError::UnexpectedReply {
                    command: self.name.to_string(),
                    reply: raw.to_string(),
                })?,
            None => raw,
        };

        match self.recv_processor {
            RecvProcessor::Text => Ok(Reply::Text(captured.to_string())),
            RecvProcessor::Integer => {
                let value: i64 = captured.parse().map_err(|_| ProtocolError::NotNumeric {
                    command: self.name.to_string(),
                    value: captured.to_string(),
                })?;
                Ok(match self.units {
                    Some(unit) => Reply::Quantity(Quantity::new(value as f64, unit)),
                    None => Reply::Integer(value),
                })
            }
        }
    }
}

/// Processed reply to a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Raw or captured text, e.g. an acknowledgement or status letters
    Text(String),
    /// Unitless integer
    Integer(i64),
    /// Value carrying a motor-native unit
    Quantity(Quantity),
}

impl Reply {
    /// Text payload, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of an `Integer` or whole-number `Quantity` reply
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(v) => Some(*v),
            Reply::Quantity(q) => Some(q.value.round() as i64),
            Reply::Text(_) => None,
        }
    }

    /// Quantity payload, if any
    pub fn as_quantity(&self) -> Option<Quantity> {
        match self {
            Reply::Quantity(q) => Some(*q),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(s) => f.write_str(s),
            Reply::Integer(v) => write!(f, "{v}"),
            Reply::Quantity(q) => write!(f, "{q}"),
        }
    }
}

fn build_table() -> HashMap<&'static str, CommandSpec> {
    let steps = Unit::steps();
    let rev_rate = Unit::rev().per_second();
    let rev_accel = Unit::rev().per_second_squared();

    let set_position = CommandSpec::new("set_position", "DI{}")
        .integer_arg()
        .units(steps);
    let set_distance = CommandSpec {
        name: "set_distance",
        ..set_position.clone()
    };

    let specs = vec![
        CommandSpec::new("alarm", "AL").reply_pattern("AL=(?P<return>[0-9]{4})"),
        CommandSpec::new("alarm_reset", "AR"),
        CommandSpec::new("disable", "MD"),
        CommandSpec::new("enable", "ME"),
        CommandSpec::new("encoder_resolution", "ER")
            .reply_pattern("ER=(?P<return>[0-9]+)")
            .integer_reply(),
        CommandSpec::new("gearing", "EG")
            .reply_pattern("EG=(?P<return>[0-9]+)")
            .integer_reply(),
        CommandSpec::new("get_position", "IP")
            .reply_pattern("IP=(?P<return>-?[0-9]+)")
            .integer_reply()
            .units(steps),
        CommandSpec::new("request_status", "RS")
            .reply_pattern("RS=(?P<return>[ADEFHJMPRSTW]+)"),
        set_position,
        set_distance,
        CommandSpec::new("feed_to_position", "FP"),
        CommandSpec::new("stop", "SK"),
        CommandSpec::new("set_speed", "VE{}").units(rev_rate),
        CommandSpec::new("set_acceleration", "AC{}").units(rev_accel),
        CommandSpec::new("set_deceleration", "DE{}").units(rev_accel),
        CommandSpec::new("set_position_zero", "SP0"),
        CommandSpec::new("set_encoder_zero", "EP0"),
        CommandSpec::new("immediate_format_decimal", "IFD"),
    ];

    specs.into_iter().map(|spec| (spec.name, spec)).collect()
}

fn table() -> &'static HashMap<&'static str, CommandSpec> {
    static TABLE: OnceLock<HashMap<&'static str, CommandSpec>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Look up a command by name
pub fn command(name: &str) -> Result<&'static CommandSpec> {
    table().get(name).ok_or_else(|| {
        LookupError::UnknownCommand {
            command: name.to_string(),
        }
        .into()
    })
}

/// Names of every known command
pub fn command_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = table().keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command() {
        let err = command("home").unwrap_err();
        assert!(err.is_lookup_error());
    }

    #[test]
    fn test_render() {
        assert_eq!(command("get_position").unwrap().render(None).unwrap(), "IP");
        assert_eq!(
            command("set_position").unwrap().render(Some(1499.6)).unwrap(),
            "DI1500"
        );
        assert_eq!(
            command("set_distance").unwrap().render(Some(-20.0)).unwrap(),
            "DI-20"
        );
        assert_eq!(command("set_speed").unwrap().render(Some(2.5)).unwrap(), "VE2.5");
        assert!(command("set_position").unwrap().render(None).is_err());
    }

    #[test]
    fn test_parse_replies() {
        let reply = command("get_position").unwrap().parse_reply("IP=-1500").unwrap();
        assert_eq!(reply, Reply::Quantity(Quantity::new(-1500.0, Unit::steps())));

        let reply = command("gearing").unwrap().parse_reply("EG=20000").unwrap();
        assert_eq!(reply, Reply::Integer(20000));

        let reply = command("request_status").unwrap().parse_reply("RS=RPF").unwrap();
        assert_eq!(reply.as_text(), Some("RPF"));

        let reply = command("alarm").unwrap().parse_reply("AL=0004").unwrap();
        assert_eq!(reply.as_text(), Some("0004"));

        let reply = command("stop").unwrap().parse_reply("%").unwrap();
        assert_eq!(reply, Reply::Text("%".into()));
    }

    #[test]
    fn test_mismatched_reply_is_protocol_error() {
        let err = command("get_position").unwrap().parse_reply("?").unwrap_err();
        assert!(err.is_protocol_error());

        // partial matches are not accepted
        let err = command("alarm").unwrap().parse_reply("AL=00041").unwrap_err();
        assert!(err.is_protocol_error());

        let err = command("request_status").unwrap().parse_reply("RS=RXZ").unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_alias_shares_definition() {
        let a = command("set_position").unwrap();
        let b = command("set_distance").unwrap();
        assert_eq!(a.template, b.template);
        assert_eq!(a.units, b.units);
        assert!(command_names().contains(&"set_distance"));
    }
}
