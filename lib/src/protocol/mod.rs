//! Firmware reply classification.
//!
//! The host streams line-numbered commands to the device and reads single
//! ASCII reply lines back. This module only classifies those replies; the
//! send side and its state machine live with the caller. The one piece of
//! state kept here is the outgoing line counter, because `start` replies
//! reset it and resend requests are validated against it.

use thiserror::Error;

/// Telemetry fields reported inline on an `ok` reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    /// T: nozzle temperature, °C.
    NozzleTemp(f64),
    /// B: bed temperature, °C.
    BedTemp(f64),
    AxisX(f64),
    AxisY(f64),
    AxisZ(f64),
    /// E: extruder position.
    Extruder(f64),
}

/// Successful reply classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Command acknowledged; telemetry (if any) was delivered via callback.
    Ok,
    /// Firmware asks for line `n` to be retransmitted.
    Resend(u32),
    /// Firmware (re)announced itself; the line counter was reset.
    Start,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("unknown reply: {0:?}")]
    UnknownReply(String),
    #[error("unknown telemetry field {0:?}")]
    UnknownField(char),
    #[error("malformed resend request: {0:?}")]
    MalformedResend(String),
    #[error("resend requested for unsent line {0}")]
    UnsentResend(u32),
    #[error("hardware fault reported by firmware")]
    HardwareFault,
}

/// First line number of a session.
const INITIAL_LINE: u32 = 1;

/// Classifies firmware reply lines, tracking the outgoing line counter.
#[derive(Debug, Clone)]
pub struct ReplyParser {
    next_line: u32,
}

impl Default for ReplyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyParser {
    pub fn new() -> Self {
        Self {
            next_line: INITIAL_LINE,
        }
    }

    /// Line number the next outgoing command will carry.
    #[inline]
    pub fn next_line(&self) -> u32 {
        self.next_line
    }

    /// Record that one line-numbered command went out.
    pub fn line_sent(&mut self) {
        self.next_line += 1;
    }

    /// Classify one reply line. Telemetry fields on `ok` replies are
    /// reported individually through `telemetry`.
    pub fn parse(
        &mut self,
        line: &str,
        telemetry: impl FnMut(Telemetry),
    ) -> Result<Reply, ProtocolError> {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("ok") {
            parse_telemetry(rest, telemetry)?;
            return Ok(Reply::Ok);
        }
        if line.starts_with("rs") || line.starts_with("resend") {
            return self.parse_resend(line);
        }
        if line.starts_with("!!") {
            return Err(ProtocolError::HardwareFault);
        }
        if line.starts_with("start") {
            // some firmware re-emits this after an internal reset; failing
            // to reset here desynchronizes numbering and causes resend storms
            self.next_line = INITIAL_LINE;
            return Ok(Reply::Start);
        }
        Err(ProtocolError::UnknownReply(line.to_string()))
    }

    fn parse_resend(&self, line: &str) -> Result<Reply, ProtocolError> {
        let Some(digits_at) = line.find(|c: char| c.is_ascii_digit()) else {
            return Err(ProtocolError::MalformedResend(line.to_string()));
        };
        // a negative line number can never have been sent
        if line[..digits_at].ends_with('-') {
            return Err(ProtocolError::UnsentResend(0));
        }
        let digits: String = line[digits_at..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let n: u32 = digits
            .parse()
            .map_err(|_| ProtocolError::MalformedResend(line.to_string()))?;
        if n < self.next_line {
            Ok(Reply::Resend(n))
        } else {
            Err(ProtocolError::UnsentResend(n))
        }
    }
}

/// Scan the remainder of an `ok` line for `<letter><number>` fields, with
/// an optional `:` between them. Field letters are case-insensitive.
fn parse_telemetry(
    rest: &str,
    mut telemetry: impl FnMut(Telemetry),
) -> Result<(), ProtocolError> {
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_alphabetic() {
            i += 1;
            continue;
        }
        i += 1;
        // skip separator
        while i < chars.len() && (chars[i] == ':' || chars[i].is_whitespace()) {
            i += 1;
        }
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '-')
        {
            i += 1;
        }
        let value: f64 = chars[start..i].iter().collect::<String>().parse().unwrap_or(0.0);

        match c.to_ascii_uppercase() {
            'T' => telemetry(Telemetry::NozzleTemp(value)),
            'B' => telemetry(Telemetry::BedTemp(value)),
            'X' => telemetry(Telemetry::AxisX(value)),
            'Y' => telemetry(Telemetry::AxisY(value)),
            'Z' => telemetry(Telemetry::AxisZ(value)),
            'E' => telemetry(Telemetry::Extruder(value)),
            // some firmware reports a C (chamber/checksum) field nobody asked for
            'C' => {}
            other => return Err(ProtocolError::UnknownField(other)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(parser: &mut ReplyParser, line: &str) -> (Result<Reply, ProtocolError>, Vec<Telemetry>) {
        let mut fields = Vec::new();
        let result = parser.parse(line, |t| fields.push(t));
        (result, fields)
    }

    #[test]
    fn test_ok_with_temperatures() {
        let mut p = ReplyParser::new();
        let (result, fields) = collect(&mut p, "ok T:200.1 B:60.0");
        assert_eq!(result, Ok(Reply::Ok));
        assert_eq!(
            fields,
            vec![Telemetry::NozzleTemp(200.1), Telemetry::BedTemp(60.0)]
        );
    }

    #[test]
    fn test_ok_case_insensitive_and_no_colon() {
        let mut p = ReplyParser::new();
        let (result, fields) = collect(&mut p, "ok t201.5 x10.0 e-0.5");
        assert_eq!(result, Ok(Reply::Ok));
        assert_eq!(
            fields,
            vec![
                Telemetry::NozzleTemp(201.5),
                Telemetry::AxisX(10.0),
                Telemetry::Extruder(-0.5)
            ]
        );
    }

    #[test]
    fn test_ok_ignores_c_field() {
        let mut p = ReplyParser::new();
        let (result, fields) = collect(&mut p, "ok C:12 T:180.0");
        assert_eq!(result, Ok(Reply::Ok));
        assert_eq!(fields, vec![Telemetry::NozzleTemp(180.0)]);
    }

    #[test]
    fn test_ok_unknown_field_is_error() {
        let mut p = ReplyParser::new();
        let (result, _) = collect(&mut p, "ok Q:1.0");
        assert_eq!(result, Err(ProtocolError::UnknownField('Q')));
    }

    #[test]
    fn test_resend_of_sent_line() {
        let mut p = ReplyParser::new();
        for _ in 0..9 {
            p.line_sent();
        }
        assert_eq!(p.next_line(), 10);
        let (result, _) = collect(&mut p, "rs N5");
        assert_eq!(result, Ok(Reply::Resend(5)));
    }

    #[test]
    fn test_resend_of_unsent_line() {
        let mut p = ReplyParser::new();
        p.line_sent();
        p.line_sent(); // next_line = 3
        let (result, _) = collect(&mut p, "rs N5");
        assert_eq!(result, Err(ProtocolError::UnsentResend(5)));
    }

    #[test]
    fn test_resend_negative_and_malformed() {
        let mut p = ReplyParser::new();
        for _ in 0..20 {
            p.line_sent();
        }
        let (neg, _) = collect(&mut p, "rs N-1");
        assert_eq!(neg, Err(ProtocolError::UnsentResend(0)));
        let (mal, _) = collect(&mut p, "resend please");
        assert!(matches!(mal, Err(ProtocolError::MalformedResend(_))));
    }

    #[test]
    fn test_resend_word_form() {
        let mut p = ReplyParser::new();
        for _ in 0..9 {
            p.line_sent();
        }
        let (result, _) = collect(&mut p, "resend: 7");
        assert_eq!(result, Ok(Reply::Resend(7)));
    }

    #[test]
    fn test_hardware_fault() {
        let mut p = ReplyParser::new();
        let (result, _) = collect(&mut p, "!!");
        assert_eq!(result, Err(ProtocolError::HardwareFault));
    }

    #[test]
    fn test_start_resets_line_counter() {
        let mut p = ReplyParser::new();
        for _ in 0..50 {
            p.line_sent();
        }
        assert_eq!(p.next_line(), 51);
        let (result, fields) = collect(&mut p, "start");
        assert_eq!(result, Ok(Reply::Start));
        assert!(fields.is_empty());
        assert_eq!(p.next_line(), 1);
    }

    #[test]
    fn test_unknown_reply() {
        let mut p = ReplyParser::new();
        let (result, _) = collect(&mut p, "Error: checksum mismatch");
        assert!(matches!(result, Err(ProtocolError::UnknownReply(_))));
    }
}
