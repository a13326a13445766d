//! Test fixtures and event generators.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use session_core::Event;

/// Start of every generated dataset.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 7, 22, 9, 0, 0).unwrap()
}

/// Event `secs` seconds after [`base_time`].
pub fn at(key: &str, secs: i64, resource: &str) -> Event {
    Event::new(key, base_time() + Duration::seconds(secs), resource)
}

/// Candidate gaps of 1..=`n` whole minutes.
pub fn minute_gaps(n: i64) -> Vec<Duration> {
    (1..=n).map(Duration::minutes).collect()
}

/// Renders an event as a load-balancer access-log line.
pub fn log_line(event: &Event, port: u16) -> String {
    format!(
        r#"{} marketpalce-shop {}:{} 10.0.6.158:80 0.000022 0.026109 0.00002 200 200 0 699 "GET {} HTTP/1.1" "Mozilla/5.0 (Test)" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2"#,
        event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        event.key,
        port,
        event.resource
    )
}

/// Number of browsing clients in [`clustered_dataset`].
pub const BROWSERS: usize = 10;
/// Number of single-hit clients in [`clustered_dataset`].
pub const BOUNCERS: usize = 10;
/// Visits per browsing client.
pub const VISITS: usize = 3;

/// Clients whose browsing pauses never exceed ten minutes.
///
/// Each browser makes three visits of four pages with pauses of 2, 5 and
/// 10 minutes, and visits are 25 minutes apart. Each bouncer hits one page
/// every two hours. Swept over whole minutes, the single-URL fraction falls
/// to its lowest at 10 minutes and rises again at 25.
pub fn clustered_dataset() -> Vec<Event> {
    let offsets = [0, 2, 7, 17];
    let pages = ["/shop", "/shop/item", "/shop/cart", "/shop/checkout"];
    let visit_stride = 17 + 25;

    let mut events = Vec::new();
    for b in 0..BROWSERS {
        let key = format!("10.0.0.{}", b + 1);
        for v in 0..VISITS {
            let visit_start = (v * visit_stride) as i64;
            for (offset, page) in offsets.iter().zip(pages) {
                events.push(at(&key, (visit_start + offset) * 60 + b as i64, page));
            }
        }
    }
    for b in 0..BOUNCERS {
        let key = format!("10.1.0.{}", b + 1);
        for hit in 0..VISITS as i64 {
            events.push(at(&key, hit * 7200 + b as i64, "/"));
        }
    }
    events
}
