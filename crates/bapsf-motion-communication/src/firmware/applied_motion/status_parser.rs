//! Status letter decoding
//!
//! The `RS` reply is a string of status letters. Each letter sets one flag
//! independently; letters outside the table are ignored.

use bapsf_motion_core::MotorStatus;

/// Decoder for `RS` status letters
pub struct StatusParser;

impl StatusParser {
    /// Decode `letters` on top of the null status (every flag false).
    ///
    /// Only the letter-driven flags are set; `connected`, `position` and
    /// `alarm_message` stay at their defaults.
    pub fn parse(letters: &str) -> MotorStatus {
        let mut status = MotorStatus::default();
        for letter in letters.chars() {
            match letter {
                'A' => status.alarm = true,
                'D' => status.enabled = false,
                'R' => status.enabled = true,
                'E' => status.fault = true,
                'F' => status.moving = true,
                'H' => status.homing = true,
                'J' => status.jogging = true,
                'M' => status.motion_in_progress = true,
                'P' => status.in_position = true,
                'S' => status.stopping = true,
                'T' | 'W' => status.waiting = true,
                _ => {}
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_in_position() {
        let status = StatusParser::parse("RP");
        assert!(status.enabled);
        assert!(status.in_position);
        assert!(!status.moving);
        assert!(!status.alarm);
    }

    #[test]
    fn test_rpf() {
        let status = StatusParser::parse("RPF");
        assert!(status.enabled);
        assert!(status.moving);
        assert!(status.in_position);
        assert!(!status.fault);
        assert!(!status.alarm);
        assert!(!status.homing);
        assert!(!status.jogging);
        assert!(!status.motion_in_progress);
        assert!(!status.stopping);
        assert!(!status.waiting);
    }

    #[test]
    fn test_disabled_wins_when_last() {
        assert!(!StatusParser::parse("RD").enabled);
        assert!(StatusParser::parse("DR").enabled);
    }

    #[test]
    fn test_every_letter() {
        let status = StatusParser::parse("AEFHJMPSTW");
        assert!(status.alarm && status.fault && status.moving && status.homing);
        assert!(status.jogging && status.motion_in_progress && status.in_position);
        assert!(status.stopping && status.waiting);
    }

    #[test]
    fn test_unknown_letters_ignored() {
        assert_eq!(StatusParser::parse("xyz?"), MotorStatus::default());
    }
}
