//! timestamp.rs - Timestamp strategies.
//!
//! Timestamps are parsed from the layouts the supported formats emit and
//! rendered back in the same layout, including the number of fractional
//! digits, so a transformed value still looks like it belongs in the line.
//!
//! Supported layouts:
//! - alert clock, `04/13/2025-14:02:15.123`
//! - RFC 3339, `2025-04-13T14:02:15.123Z` or with a numeric offset
//! - BSD syslog, `Apr 13 14:02:15` (no year; a fixed leap reference year is assumed)
//! - epoch seconds, `1681394535.123456`
//!
//! Every strategy leaves unparsable input unchanged and reports it.
//!
//! License: MIT OR APACHE 2.0

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeDelta, Timelike};
use hmac::{Hmac, Mac};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::{InvalidValue, LogveilError, ValueKind};
use crate::strategies::{ColumnOutcome, OnInvalid};

type HmacSha256 = Hmac<Sha256>;

/// Fixed key mixed into seed derivation so a shift cannot be recomputed from
/// the seed with a plain hash.
const SHIFT_DERIVATION_KEY: &[u8] = b"logveil-timestamp-shift-v1";

/// Year assumed for layouts that carry none. A leap year, so Feb 29 parses.
pub const REFERENCE_YEAR: i32 = 2000;

const ALERT_CLOCK: &str = "%m/%d/%Y-%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    AlertClock { frac_digits: usize },
    Rfc3339 { frac_digits: usize, offset: FixedOffset, zulu: bool, separator: char },
    BsdSyslog { space_padded: bool },
    EpochSeconds { frac_digits: usize },
}

/// A parsed timestamp that remembers how it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    /// Wall-clock time in the value's own offset.
    pub local: NaiveDateTime,
    layout: Layout,
}

fn split_fraction(value: &str) -> Option<(&str, u32, usize)> {
    let Some((main, frac)) = value.split_once('.') else {
        return Some((value, 0, 0));
    };
    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos: u32 = format!("{frac:0<9}").parse().ok()?;
    Some((main, nanos, frac.len()))
}

fn render_fraction(nanos: u32, digits: usize) -> String {
    if digits == 0 {
        return String::new();
    }
    let scaled = nanos / 10u32.pow(9 - digits as u32);
    format!(".{scaled:0digits$}")
}

impl ParsedTimestamp {
    pub fn parse(value: &str) -> Result<Self, InvalidValue> {
        let invalid = || InvalidValue::new(ValueKind::Timestamp, value);
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.') && trimmed.len() >= 9 {
            let (secs, nanos, frac_digits) = split_fraction(trimmed).ok_or_else(invalid)?;
            let secs: i64 = secs.parse().map_err(|_| invalid())?;
            let dt = DateTime::from_timestamp(secs, nanos).ok_or_else(invalid)?;
            return Ok(Self {
                local: dt.naive_utc(),
                layout: Layout::EpochSeconds { frac_digits },
            });
        }

        if trimmed.len() >= 19 && trimmed.as_bytes().get(2) == Some(&b'/') {
            let (main, nanos, frac_digits) = split_fraction(trimmed).ok_or_else(invalid)?;
            let dt = NaiveDateTime::parse_from_str(main, ALERT_CLOCK).map_err(|_| invalid())?;
            let local = dt.with_nanosecond(nanos).ok_or_else(invalid)?;
            return Ok(Self { local, layout: Layout::AlertClock { frac_digits } });
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            let frac_digits = trimmed
                .find('.')
                .map(|dot| trimmed[dot + 1..].bytes().take_while(u8::is_ascii_digit).count())
                .unwrap_or(0);
            let zulu = trimmed.ends_with('Z') || trimmed.ends_with('z');
            let separator = trimmed.chars().nth(10).unwrap_or('T');
            return Ok(Self {
                local: dt.naive_local(),
                layout: Layout::Rfc3339 { frac_digits, offset: *dt.offset(), zulu, separator },
            });
        }

        let with_year = format!("{REFERENCE_YEAR} {trimmed}");
        if let Ok(local) = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S") {
            return Ok(Self {
                local,
                layout: Layout::BsdSyslog { space_padded: trimmed.contains("  ") },
            });
        }

        Err(invalid())
    }

    /// Instant used for chronological ordering (offset removed).
    pub fn sort_key(&self) -> NaiveDateTime {
        match self.layout {
            Layout::Rfc3339 { offset, .. } => self.local - TimeDelta::seconds(offset.local_minus_utc() as i64),
            _ => self.local,
        }
    }

    /// Renders `local` in this timestamp's original layout.
    pub fn render(&self, local: NaiveDateTime) -> String {
        match self.layout {
            Layout::AlertClock { frac_digits } => format!(
                "{}{}",
                local.format(ALERT_CLOCK),
                render_fraction(local.nanosecond(), frac_digits)
            ),
            Layout::Rfc3339 { frac_digits, offset, zulu, separator } => {
                let zone = if zulu { "Z".to_string() } else { offset.to_string() };
                format!(
                    "{}{}{}{}{}",
                    local.format("%Y-%m-%d"),
                    separator,
                    local.format("%H:%M:%S"),
                    render_fraction(local.nanosecond(), frac_digits),
                    zone
                )
            }
            Layout::BsdSyslog { space_padded } => {
                let pattern = if space_padded { "%b %e %H:%M:%S" } else { "%b %-d %H:%M:%S" };
                local.format(pattern).to_string()
            }
            Layout::EpochSeconds { frac_digits } => {
                let utc = local.and_utc();
                format!("{}{}", utc.timestamp(), render_fraction(utc.timestamp_subsec_nanos(), frac_digits))
            }
        }
    }

    fn apply(&self, delta: TimeDelta) -> Option<String> {
        self.local.checked_add_signed(delta).map(|dt| self.render(dt))
    }
}

/// Bucket sizes for `bucketize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Day,
    /// Monday of the week. Year-less layouts take the weekday from
    /// [`REFERENCE_YEAR`].
    Week,
    /// First day of the month.
    Month,
}

/// Floors the minute to a multiple of 15 and zeroes seconds and fractions.
pub fn round_to_quarter_hour(value: &str) -> Result<String, InvalidValue> {
    let ts = ParsedTimestamp::parse(value)?;
    let minute = (ts.local.minute() / 15) * 15;
    let rounded = ts
        .local
        .with_minute(minute)
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
        .ok_or_else(|| InvalidValue::new(ValueKind::Timestamp, value))?;
    Ok(ts.render(rounded))
}

/// Moves a timestamp to the start of its day, week or month.
///
/// BSD syslog stamps carry no year, so their week start is computed in
/// [`REFERENCE_YEAR`] and may differ from the real calendar.
pub fn bucketize(value: &str, resolution: Resolution) -> Result<String, InvalidValue> {
    let ts = ParsedTimestamp::parse(value)?;
    let date = ts.local.date();
    let start = match resolution {
        Resolution::Day => Some(date),
        Resolution::Week => date.checked_sub_signed(TimeDelta::days(date.weekday().num_days_from_monday() as i64)),
        Resolution::Month => date.with_day(1),
    }
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .ok_or_else(|| InvalidValue::new(ValueKind::Timestamp, value))?;
    Ok(ts.render(start))
}

/// Adds uniform whole-second jitter within `±window_minutes`.
pub fn perturb<R: Rng + ?Sized>(value: &str, window_minutes: u32, rng: &mut R) -> Result<String, InvalidValue> {
    let ts = ParsedTimestamp::parse(value)?;
    let window = window_minutes as i64 * 60;
    let jitter = if window == 0 { 0 } else { rng.random_range(-window..=window) };
    ts.apply(TimeDelta::seconds(jitter))
        .ok_or_else(|| InvalidValue::new(ValueKind::Timestamp, value))
}

/// Derives the dataset-wide shift for `seed`, bounded by `max_shift_hours`.
///
/// The same seed always gives the same shift.
pub fn derive_shift(seed: &str, max_shift_hours: u32) -> Result<TimeDelta, LogveilError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(SHIFT_DERIVATION_KEY)
        .map_err(|e| LogveilError::Fatal(format!("HMAC key setup failed: {e}")))?;
    mac.update(seed.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    let max = max_shift_hours as i64 * 3600;
    let span = (2 * max + 1) as u64;
    let seconds = (u64::from_be_bytes(word) % span) as i64 - max;
    Ok(TimeDelta::seconds(seconds))
}

/// Applies one fixed offset to a timestamp.
pub fn shift(value: &str, offset: TimeDelta) -> Result<String, InvalidValue> {
    ParsedTimestamp::parse(value)?
        .apply(offset)
        .ok_or_else(|| InvalidValue::new(ValueKind::Timestamp, value))
}

/// Order-preserving noise over a whole column.
///
/// Valid timestamps are ordered chronologically; each gets a uniform offset
/// bounded by half the gap to its nearer neighbour (endpoints use their one
/// gap, a lone timestamp gets none). Neighbours can therefore meet but never
/// cross. `global_offset`, when given, is then added to every value; a
/// value the offset would carry out of range is reported invalid.
pub fn adaptive_noise<R: Rng + ?Sized>(
    inputs: &[&str],
    global_offset: Option<TimeDelta>,
    rng: &mut R,
) -> ColumnOutcome {
    let parsed: Vec<Result<ParsedTimestamp, InvalidValue>> =
        inputs.iter().map(|v| ParsedTimestamp::parse(v)).collect();

    let mut order: Vec<usize> = (0..inputs.len()).filter(|&i| parsed[i].is_ok()).collect();
    let key = |i: usize| parsed[i].as_ref().map(ParsedTimestamp::sort_key).ok();
    order.sort_by_key(|&i| key(i));

    let gap = |a: usize, b: usize| -> i64 {
        match (key(a), key(b)) {
            (Some(x), Some(y)) => y.signed_duration_since(x).num_nanoseconds().unwrap_or(i64::MAX),
            _ => 0,
        }
    };

    let mut deltas = vec![Some(TimeDelta::zero()); inputs.len()];
    for (pos, &idx) in order.iter().enumerate() {
        let before = (pos > 0).then(|| gap(order[pos - 1], idx));
        let after = order.get(pos + 1).map(|&next| gap(idx, next));
        let nearest = match (before, after) {
            (Some(b), Some(a)) => b.min(a),
            (Some(g), None) | (None, Some(g)) => g,
            (None, None) => 0,
        };
        let bound = nearest / 2;
        let noise = if bound > 0 { rng.random_range(-bound..=bound) } else { 0 };
        deltas[idx] = TimeDelta::nanoseconds(noise).checked_add(&global_offset.unwrap_or_else(TimeDelta::zero));
    }
    debug!("Adaptive timestamp noise over {} value(s)", order.len());

    let results = parsed.into_iter().enumerate().map(|(idx, ts)| {
        ts.and_then(|ts| {
            deltas[idx]
                .and_then(|delta| ts.apply(delta))
                .ok_or_else(|| InvalidValue::new(ValueKind::Timestamp, inputs[idx]))
        })
    });
    ColumnOutcome::collect(inputs, results, OnInvalid::PassThrough)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn round_keeps_layout_and_fraction_width() {
        assert_eq!(round_to_quarter_hour("04/13/2025-14:02:15.123").unwrap(), "04/13/2025-14:00:00.000");
        assert_eq!(round_to_quarter_hour("04/13/2025-14:47:59.123456").unwrap(), "04/13/2025-14:45:00.000000");
        assert_eq!(round_to_quarter_hour("2025-04-13T14:31:15.123Z").unwrap(), "2025-04-13T14:30:00.000Z");
        assert_eq!(round_to_quarter_hour("2025-04-13T14:31:15+02:00").unwrap(), "2025-04-13T14:30:00+02:00");
        assert_eq!(round_to_quarter_hour("Apr 13 14:02:15").unwrap(), "Apr 13 14:00:00");
        assert_eq!(round_to_quarter_hour("Apr  3 14:16:15").unwrap(), "Apr  3 14:15:00");
        assert_eq!(round_to_quarter_hour("1681394535.123456").unwrap(), "1681394400.000000");
    }

    #[test]
    fn unparsable_values_are_reported() {
        for bad in ["", "yesterday", "13/45/2025-99:00:00.1", "04/13/2025-14:02:15.abc"] {
            let err = round_to_quarter_hour(bad).unwrap_err();
            assert_eq!(err.kind, ValueKind::Timestamp);
        }
    }

    #[test]
    fn bucketize_to_day_week_and_month() {
        // 2025-04-13 is a Sunday.
        let value = "04/13/2025-14:02:15.123";
        assert_eq!(bucketize(value, Resolution::Day).unwrap(), "04/13/2025-00:00:00.000");
        assert_eq!(bucketize(value, Resolution::Week).unwrap(), "04/07/2025-00:00:00.000");
        assert_eq!(bucketize(value, Resolution::Month).unwrap(), "04/01/2025-00:00:00.000");
    }

    #[test]
    fn bsd_week_start_uses_reference_year() {
        // 2000-04-13 is a Thursday.
        assert_eq!(bucketize("Apr 13 14:02:15", Resolution::Week).unwrap(), "Apr 10 00:00:00");
        assert_eq!(bucketize("Apr 13 14:02:15", Resolution::Month).unwrap(), "Apr 1 00:00:00");
    }

    #[test]
    fn perturb_stays_within_window() {
        let mut rng = StdRng::seed_from_u64(11);
        let original = ParsedTimestamp::parse("04/13/2025-14:02:15.000").unwrap();
        for _ in 0..200 {
            let out = perturb("04/13/2025-14:02:15.000", 5, &mut rng).unwrap();
            let moved = ParsedTimestamp::parse(&out).unwrap();
            let diff = moved.local.signed_duration_since(original.local).num_seconds().abs();
            assert!(diff <= 300);
        }
    }

    #[test]
    fn shift_is_reproducible_per_seed_and_bounded() {
        let a = derive_shift("timestamp", 24).unwrap();
        assert_eq!(a, derive_shift("timestamp", 24).unwrap());
        assert_ne!(a, derive_shift("other-seed", 24).unwrap());
        assert!(a.num_seconds().abs() <= 24 * 3600);
        assert_eq!(derive_shift("x", 0).unwrap(), TimeDelta::zero());

        let shifted = shift("2025-04-13T14:02:15Z", TimeDelta::seconds(3600)).unwrap();
        assert_eq!(shifted, "2025-04-13T15:02:15Z");
    }

    #[test]
    fn adaptive_noise_preserves_order() {
        let inputs = [
            "04/13/2025-14:02:15.100",
            "04/13/2025-14:02:15.300",
            "04/13/2025-14:02:16.000",
            "04/13/2025-14:05:00.000",
            "04/13/2025-14:05:00.000",
            "04/13/2025-15:00:00.000",
        ];
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = adaptive_noise(&inputs, None, &mut rng);
            let times: Vec<NaiveDateTime> = outcome
                .values
                .iter()
                .map(|v| ParsedTimestamp::parse(v).unwrap().local)
                .collect();
            assert!(times.windows(2).all(|w| w[0] <= w[1]), "seed {seed}: {:?}", outcome.values);
        }
    }

    #[test]
    fn adaptive_noise_reports_offsets_past_the_calendar() {
        let inputs = ["2025-04-13T08:00:00Z", "2025-04-13T09:00:00Z", "2025-04-13T10:00:00Z"];
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = adaptive_noise(&inputs, Some(TimeDelta::MAX), &mut rng);
        assert_eq!(outcome.values, inputs.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        assert_eq!(outcome.invalid.len(), 3);
    }

    #[test]
    fn adaptive_noise_orders_unsorted_input_and_applies_global_offset() {
        let inputs = ["2025-04-13T10:00:00Z", "bogus", "2025-04-13T08:00:00Z", "2025-04-13T09:00:00Z"];
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = adaptive_noise(&inputs, Some(TimeDelta::days(1)), &mut rng);
        assert_eq!(outcome.values[1], "bogus");
        assert_eq!(outcome.invalid.len(), 1);

        let t = |i: usize| ParsedTimestamp::parse(&outcome.values[i]).unwrap().local;
        assert!(t(2) <= t(3) && t(3) <= t(0));
        // With the global day removed, each value stays within half an hour.
        let base = ParsedTimestamp::parse(inputs[3]).unwrap().local;
        let drift = t(3) - TimeDelta::days(1) - base;
        assert!(drift.num_minutes().abs() <= 30);
    }
}
