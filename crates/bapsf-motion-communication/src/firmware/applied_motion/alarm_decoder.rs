//! Alarm Code Decoder
//! Converts the 4 digit `AL` reply into human-readable alarm messages

/// Decode a single alarm code to its message (STM series drives)
pub fn decode_alarm(code: u32) -> Option<&'static str> {
    let message = match code {
        1 => "position limit [Drive Fault]",
        2 => "CCW limit",
        4 => "CW limit",
        8 => "over temp [Drive Fault]",
        10 => "internal voltage [Drive Fault]",
        20 => "over voltage [Drive Fault]",
        40 => "under voltage",
        80 => "over current [Drive Fault]",
        100 => "open motor winding [Drive Fault]",
        400 => "common error",
        800 => "bad flash",
        1000 => "no move",
        4000 => "blank Q segment",
        _ => return None,
    };
    Some(message)
}

/// Split an `AL` reply into its per-digit codes.
///
/// Digit `i` of the reply contributes `digit * 10^(3 - i)`; zero digits and
/// non-digits are skipped.
pub fn alarm_codes(reply: &str) -> Vec<u32> {
    let width = reply.chars().count();
    reply
        .chars()
        .enumerate()
        .filter_map(|(i, c)| {
            let digit = c.to_digit(10)?;
            let power = u32::try_from(width.checked_sub(i + 1)?).ok()?;
            let code = digit * 10u32.checked_pow(power)?;
            (code != 0).then_some(code)
        })
        .collect()
}

/// Build the combined alarm message for an `AL` reply.
///
/// Known codes are formatted as `"{code:04} - {message}"` and joined with
/// `" :: "`. Unknown codes are dropped, so the result may be empty.
pub fn alarm_message(reply: &str) -> String {
    alarm_codes(reply)
        .into_iter()
        .filter_map(|code| decode_alarm(code).map(|msg| format!("{code:04} - {msg}")))
        .collect::<Vec<_>>()
        .join(" :: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_alarm() {
        assert_eq!(decode_alarm(2), Some("CCW limit"));
        assert_eq!(decode_alarm(4000), Some("blank Q segment"));
        assert_eq!(decode_alarm(3), None);
    }

    #[test]
    fn test_alarm_codes() {
        assert_eq!(alarm_codes("0000"), Vec::<u32>::new());
        assert_eq!(alarm_codes("0004"), vec![4]);
        assert_eq!(alarm_codes("1024"), vec![1000, 20, 4]);
    }

    #[test]
    fn test_alarm_message() {
        assert_eq!(alarm_message("0002"), "0002 - CCW limit");
        assert_eq!(
            alarm_message("0014"),
            "0010 - internal voltage [Drive Fault] :: 0004 - CW limit"
        );
        // 3 is not a known code
        assert_eq!(alarm_message("0003"), "");
        assert_eq!(alarm_message("0000"), "");
    }
}
