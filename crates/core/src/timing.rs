//! Duration helpers shared by metrics and reports.

use chrono::Duration;

/// Converts a duration to fractional seconds.
pub fn duration_secs(d: Duration) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1_000_000_000.0
}

/// Builds a duration from whole seconds, saturating at `Duration::MAX`.
pub fn secs(n: u64) -> Duration {
    i64::try_from(n)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// `total / count` at microsecond precision; zero when `count` is 0.
pub fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::zero();
    }
    let micros = total.num_microseconds().unwrap_or(i64::MAX);
    Duration::microseconds(micros / i64::try_from(count).unwrap_or(i64::MAX))
}

/// Serde adapter storing a `chrono::Duration` as fractional seconds.
pub mod as_secs_f64 {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::duration_secs(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(serde::de::Error::custom("duration must be finite"));
        }
        Ok(Duration::microseconds((secs * 1_000_000.0).round() as i64))
    }
}

/// Serde adapter storing a list of durations as fractional seconds.
pub mod vec_as_secs_f64 {
    use chrono::Duration;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ds: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(ds.len()))?;
        for d in ds {
            seq.serialize_element(&super::duration_secs(*d))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        Vec::<f64>::deserialize(deserializer)?
            .into_iter()
            .map(|secs| {
                if secs.is_finite() {
                    Ok(Duration::microseconds((secs * 1_000_000.0).round() as i64))
                } else {
                    Err(serde::de::Error::custom("duration must be finite"))
                }
            })
            .collect()
    }
}
