use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone as _, Utc};
use chrono_tz::Tz;
use tracing::warn;

// ── Zone resolution ───────────────────────────────────────────────────────────

/// IANA name of the host timezone, `"UTC"` when it cannot be detected or
/// is not in the tz database.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone()
        .ok()
        .filter(|name| name.parse::<Tz>().is_ok())
        .unwrap_or_else(|| "UTC".to_string())
}

/// Resolve the `"auto"` sentinel to the host timezone; any other value is
/// returned unchanged.
pub fn resolve_timezone_name(name: &str) -> String {
    if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    }
}

// ── TimestampParser ───────────────────────────────────────────────────────────

/// Zone-less layouts, most specific first. Gerrit writes
/// `2017-04-14 23:22:56.000000000`.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Reads review timestamps, placing zone-less values in a fixed zone.
///
/// Gerrit dumps carry no offset; the zone they are read in shifts every
/// derived epoch.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    zone: Tz,
}

impl TimestampParser {
    /// Parser reading zone-less values in `zone_name`.
    ///
    /// Unknown names log a warning and fall back to UTC.
    pub fn new(zone_name: &str) -> Self {
        let zone = zone_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone \"{}\", reading timestamps as UTC", zone_name);
            Tz::UTC
        });
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Instant denoted by `s`.
    ///
    /// RFC 3339 input keeps its own offset. During a DST fold the earlier
    /// instant wins. `None` for empty input, unknown layouts and wall-clock
    /// times that fall in a DST gap.
    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok());
        let Some(naive) = naive else {
            warn!("Unparseable timestamp \"{}\"", s);
            return None;
        };

        match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                warn!("Timestamp \"{}\" does not exist in {}", s, self.zone);
                None
            }
        }
    }

    /// Milliseconds since the Unix epoch for `s`, see [`TimestampParser::parse`].
    pub fn epoch_millis(&self, s: &str) -> Option<i64> {
        self.parse(s).map(|dt| dt.timestamp_millis())
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self { zone: Tz::UTC }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
