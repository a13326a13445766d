//! Access-log line parsing.
//!
//! Handles the classic load-balancer log layout:
//!
//! ```text
//! <timestamp> <elb> <client:port> <backend:port> <req_t> <backend_t> <resp_t>
//!     <elb_status> <backend_status> <recv_bytes> <sent_bytes>
//!     "<METHOD> <URL> <PROTOCOL>" "<user agent>" <ssl_cipher> <ssl_protocol>
//! ```
//!
//! Only the client, the timestamp and the request URL are kept.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{Error, Result};
use crate::events::Event;

static LOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<ts>\S+) \S+ (?P<client>\S+) \S+ \S+ \S+ \S+ \S+ \S+ \S+ \S+ "(?P<method>\S+) (?P<url>\S+)(?: [^"]*)?""#,
    )
    .expect("log line pattern is valid")
});

/// Parses one access-log line into an event.
pub fn parse_log_line(line: &str) -> Result<Event> {
    let caps = LOG_LINE
        .captures(line.trim_end())
        .ok_or_else(|| Error::malformed("line does not match access-log layout"))?;

    let timestamp = parse_timestamp(&caps["ts"])?;
    let key = client_key(&caps["client"])?;

    Ok(Event::new(key, timestamp, &caps["url"]))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::malformed(format!("timestamp {:?}: {}", raw, e)))
}

/// Strips the source port from a client address.
///
/// Accepts `1.2.3.4:5678`, `[2001:db8::1]:5678` and bare addresses.
fn client_key(raw: &str) -> Result<String> {
    if raw.is_empty() || raw == "-" {
        return Err(Error::malformed("missing client address"));
    }

    if let Some(rest) = raw.strip_prefix('[') {
        return rest
            .split_once(']')
            .map(|(host, _)| host.to_string())
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::malformed(format!("client address {:?}", raw)));
    }

    match raw.split_once(':') {
        // More than one colon: a bare IPv6 address
        Some((_, rest)) if rest.contains(':') => Ok(raw.to_string()),
        Some((host, _)) if !host.is_empty() => Ok(host.to_string()),
        Some(_) => Err(Error::malformed(format!("client address {:?}", raw))),
        None => Ok(raw.to_string()),
    }
}
