//! Syslog wire format
//!
//! Renders one (event type, message) pair into a single-line record:
//!
//! ```text
//! <13>2026-08-26T12:00:00Z mobile-device LogShield[1000]: [SCREEN_EVENT] Screen: SCREEN_ON
//! ```
//!
//! The facility/severity code is fixed at 13 (user-level notice) and the
//! timestamp is always UTC, regardless of device locale or timezone.
//! Encoding is pure and total; delimiter characters inside the message are
//! not escaped and must be tolerated by the consumer.

use chrono::{DateTime, Utc};

/// Fixed syslog PRI value (facility 1, severity 5).
const PRI: u8 = 13;

/// Default process tag placed after the agent name.
const AGENT_PID: u32 = 1000;

/// Event type used when replaying entries from the retry queue.
pub const RETRY_EVENT_TYPE: &str = "RETRY";

/// Renders events into wire-format records.
#[derive(Debug, Clone)]
pub struct SyslogEncoder {
    device_tag: String,
    agent_tag: String,
}

impl Default for SyslogEncoder {
    fn default() -> Self {
        Self {
            device_tag: "mobile-device".to_string(),
            agent_tag: "LogShield".to_string(),
        }
    }
}

impl SyslogEncoder {
    /// Encoder with a configured hostname field.
    pub fn new(device_tag: impl Into<String>) -> Self {
        Self {
            device_tag: device_tag.into(),
            ..Self::default()
        }
    }

    /// Encode one record at the given instant.
    pub fn encode(&self, event_type: &str, message: &str, now: DateTime<Utc>) -> String {
        format!(
            "<{}>{} {} {}[{}]: [{}] {}",
            PRI,
            now.format("%Y-%m-%dT%H:%M:%SZ"),
            self.device_tag,
            self.agent_tag,
            AGENT_PID,
            event_type,
            message
        )
    }
}

/// Fields recovered from a wire-format record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    pub event_type: String,
    pub message: String,
}

/// Recover the event type and message from a record.
///
/// Only the `[{TYPE}] {message}` tail is parsed; header fields are skipped.
/// Returns `None` for lines that do not carry the bracketed type tag.
pub fn parse_record(record: &str) -> Option<ParsedRecord> {
    let (_, tail) = record.split_once(": [")?;
    let (event_type, message) = tail.split_once("] ")?;
    Some(ParsedRecord {
        event_type: event_type.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 9, 30, 5).unwrap()
    }

    #[test]
    fn test_encode_format() {
        let enc = SyslogEncoder::default();
        let record = enc.encode("APP_EVENT", "Application INSTALLED: Foo (com.foo)", at());
        assert_eq!(
            record,
            "<13>2026-08-26T09:30:05Z mobile-device LogShield[1000]: [APP_EVENT] Application INSTALLED: Foo (com.foo)"
        );
    }

    #[test]
    fn test_encode_custom_device_tag() {
        let enc = SyslogEncoder::new("lab-phone-7");
        let record = enc.encode("SCREEN_EVENT", "Screen: SCREEN_ON", at());
        assert!(record.starts_with("<13>2026-08-26T09:30:05Z lab-phone-7 LogShield[1000]:"));
    }

    #[test]
    fn test_roundtrip() {
        let enc = SyslogEncoder::default();
        let record = enc.encode("BATTERY_EVENT", "Battery: 56% - Charging", at());
        let parsed = parse_record(&record).unwrap();
        assert_eq!(parsed.event_type, "BATTERY_EVENT");
        assert_eq!(parsed.message, "Battery: 56% - Charging");
    }

    #[test]
    fn test_roundtrip_with_embedded_delimiters() {
        // Pipes and colons inside the message are carried through unescaped
        let enc = SyslogEncoder::default();
        let message = "INSTALLED|Foo|com.foo: extra [detail]";
        let record = enc.encode("APP_EVENT", message, at());
        let parsed = parse_record(&record).unwrap();
        assert_eq!(parsed.message, message);
    }

    #[test]
    fn test_parse_rejects_untagged_lines() {
        assert_eq!(parse_record("not a record"), None);
        assert_eq!(parse_record("<13>ts host tag[1]: no type tag"), None);
    }
}
