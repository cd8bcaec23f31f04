//! # SKSTACK Response Line Classification
//!
//! The modem speaks a line-oriented protocol: command echoes are suppressed,
//! and every incoming CRLF-terminated line is one of a small set of shapes.
//! This module classifies a raw line into a `ResponseLine` so the driver's
//! wait loops can pattern-match instead of re-parsing strings.
//!
//! Classification rules, in order:
//! - `SK`-prefixed lines are diagnostics; consumers log and skip them.
//! - A bare `OK` is a success status; any line containing `FAIL` is a
//!   failure status.
//! - `OK <token>` is a value response (the token after the marker).
//! - `EVENT`, `ERXUDP` and `EPANDESC` lines are asynchronous notifications
//!   with their whitespace-separated fields retained in order.
//! - A line with exactly one `:` is a scan descriptor entry.
//! - Anything else falls back to `Value` with the whole line as the token;
//!   the SKLL64 address-resolution reply arrives with no leading marker and
//!   relies on this.

/// A parsed unit from the modem's serial line protocol.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ResponseLine {
    /// Diagnostic output interleaved by the modem firmware; never a response.
    Diagnostic,
    /// Command completion status.
    Status { ok: bool },
    /// A single-token value response.
    Value(String),
    /// One `key:value` entry of a scan descriptor block.
    Descriptor { key: String, value: String },
    /// An asynchronous notification (`EVENT`, `ERXUDP`, `EPANDESC`).
    Notification { kind: String, fields: Vec<String> },
}

const NOTIFICATION_PREFIXES: [&str; 3] = ["EVENT", "ERXUDP", "EPANDESC"];

/// Classifies one stripped line from the modem.
pub fn parse_line(line: &str) -> ResponseLine {
    if line.starts_with(crate::constants::DIAGNOSTIC_PREFIX) {
        return ResponseLine::Diagnostic;
    }
    if line == "OK" {
        return ResponseLine::Status { ok: true };
    }
    if line.contains("FAIL") {
        return ResponseLine::Status { ok: false };
    }
    if let Some(rest) = line.strip_prefix("OK ") {
        if let Some(token) = rest.split_whitespace().next() {
            return ResponseLine::Value(token.to_string());
        }
    }

    let mut fields = line.split_whitespace();
    if let Some(first) = fields.next() {
        if NOTIFICATION_PREFIXES.contains(&first) {
            return ResponseLine::Notification {
                kind: first.to_string(),
                fields: fields.map(str::to_string).collect(),
            };
        }
    }

    // Exactly one colon means a descriptor entry; the bare IPv6 reply to
    // SKLL64 contains seven and must fall through to Value.
    if line.bytes().filter(|b| *b == b':').count() == 1 {
        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        return ResponseLine::Descriptor {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        };
    }

    ResponseLine::Value(line.to_string())
}
