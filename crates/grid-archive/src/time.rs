//! Time steps from source identifiers.
//!
//! Each identifier carries a date token that a [`DatePattern`] extracts through
//! the named groups `year`, `month` and optionally `day`. The
//! [`TemporalSequencer`] turns matched dates into day offsets from the archive
//! epoch and rejects any offset that does not strictly follow the last
//! accepted one. It never re-sorts: ordering is the caller's job.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{ArchiveError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Date-token pattern with named capture groups.
#[derive(Debug, Clone)]
pub struct DatePattern {
    regex: Regex,
    has_day: bool,
}

impl DatePattern {
    /// Matches `YYYY.MM`, `YYYY_MM` or `YYYY-MM` anywhere in the name.
    pub const DEFAULT: &'static str = r"(?P<year>\d{4})[._-](?P<month>\d{2})";

    /// Compile a pattern; it must define `year` and `month` groups.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| ArchiveError::config(format!("invalid date pattern: {}", e)))?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        for required in ["year", "month"] {
            if !names.contains(&required) {
                return Err(ArchiveError::config(format!(
                    "date pattern '{}' has no '{}' group",
                    pattern, required
                )));
            }
        }

        Ok(Self {
            has_day: names.contains(&"day"),
            regex,
        })
    }

    /// Extract the date of an identifier.
    ///
    /// Returns `Ok(None)` when the identifier does not match, and
    /// [`ArchiveError::DateParse`] when it matches but is not a calendar date.
    pub fn parse(&self, identifier: &str) -> Result<Option<NaiveDateTime>> {
        let Some(caps) = self.regex.captures(identifier) else {
            return Ok(None);
        };

        let field = |name: &str| -> Result<u32> {
            let token = caps.name(name).map(|m| m.as_str()).unwrap_or("");
            token.parse::<u32>().map_err(|_| ArchiveError::DateParse {
                identifier: identifier.to_string(),
                reason: format!("{} token '{}' is not a number", name, token),
            })
        };

        let year = field("year")?;
        let month = field("month")?;
        let day = if self.has_day && caps.name("day").is_some() {
            field("day")?
        } else {
            1
        };

        let date = i32::try_from(year)
            .ok()
            .and_then(|y| NaiveDate::from_ymd_opt(y, month, day))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ArchiveError::DateParse {
                identifier: identifier.to_string(),
                reason: format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day),
            })?;

        Ok(Some(date))
    }
}

impl Default for DatePattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(Self::DEFAULT).expect("default date pattern is valid"),
            has_day: false,
        }
    }
}

/// An accepted time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    /// Date parsed from the identifier.
    pub date: NaiveDateTime,
    /// Fractional days since the epoch.
    pub day_offset: f64,
}

/// Fractional days between `epoch` and `date`.
pub fn day_offset(epoch: NaiveDateTime, date: NaiveDateTime) -> f64 {
    let delta = date - epoch;
    delta.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Validates that identifiers arrive in strictly increasing time order.
#[derive(Debug, Clone)]
pub struct TemporalSequencer {
    pattern: DatePattern,
    epoch: NaiveDateTime,
    last: Option<f64>,
}

impl TemporalSequencer {
    /// Create a new sequencer.
    pub fn new(pattern: DatePattern, epoch: NaiveDateTime) -> Self {
        Self {
            pattern,
            epoch,
            last: None,
        }
    }

    /// Day offset of the last accepted step.
    pub fn last_offset(&self) -> Option<f64> {
        self.last
    }

    /// Process the next identifier in order.
    ///
    /// The date token is looked up in the file name of the identifier when it
    /// is a path. Non-matching identifiers yield `Ok(None)` and leave the
    /// sequence untouched.
    pub fn accept(&mut self, identifier: &str) -> Result<Option<TimeStep>> {
        let name = Path::new(identifier)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(identifier);

        let Some(date) = self.pattern.parse(name)? else {
            return Ok(None);
        };

        let offset = day_offset(self.epoch, date);
        if let Some(previous) = self.last {
            if offset <= previous {
                return Err(ArchiveError::NonMonotonicTime {
                    identifier: identifier.to_string(),
                    previous,
                    current: offset,
                });
            }
        }

        self.last = Some(offset);
        Ok(Some(TimeStep {
            date,
            day_offset: offset,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_epoch;

    fn sequencer() -> TemporalSequencer {
        TemporalSequencer::new(DatePattern::default(), default_epoch())
    }

    #[test]
    fn test_default_pattern_matches_known_names() {
        let pattern = DatePattern::default();
        let date = pattern
            .parse("rbb_cli_chirps-v2.0.1981.01.tif")
            .expect("parse")
            .expect("match");
        assert_eq!(date.format("%Y-%m-%d").to_string(), "1981-01-01");

        let date = pattern.parse("x_2020_02").expect("parse").expect("match");
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2020-02-01 00:00:00");

        assert!(pattern.parse("readme.txt").expect("parse").is_none());
    }

    #[test]
    fn test_pattern_requires_year_and_month() {
        assert!(DatePattern::new(r"(?P<year>\d{4})").is_err());
        assert!(DatePattern::new(r"(?P<month>\d{2})").is_err());
        assert!(DatePattern::new(r"(?P<year>\d{4}").is_err());
        assert!(DatePattern::new(r"(?P<year>\d{4})(?P<month>\d{2})").is_ok());
    }

    #[test]
    fn test_pattern_with_day_group() {
        let pattern =
            DatePattern::new(r"(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})").expect("pattern");
        let date = pattern
            .parse("chirps_20200215.tif")
            .expect("parse")
            .expect("match");
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2020-02-15");
    }

    #[test]
    fn test_invalid_calendar_date() {
        let pattern = DatePattern::default();
        let err = pattern.parse("x_2020_13").unwrap_err();
        assert!(matches!(err, ArchiveError::DateParse { .. }));

        let pattern =
            DatePattern::new(r"(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})").expect("pattern");
        assert!(pattern.parse("x_20210229").is_err());
    }

    #[test]
    fn test_day_offset_from_epoch() {
        let epoch = default_epoch();
        let date = NaiveDate::from_ymd_opt(1980, 2, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(day_offset(epoch, date), 31.0);

        let date = NaiveDate::from_ymd_opt(1980, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("date");
        assert_eq!(day_offset(epoch, date), 0.5);

        let date = NaiveDate::from_ymd_opt(1979, 12, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("date");
        assert_eq!(day_offset(epoch, date), -31.0);
    }

    #[test]
    fn test_sequence_strictly_increasing() {
        let mut seq = sequencer();
        let a = seq.accept("x_2020_01").expect("accept").expect("match");
        let b = seq.accept("x_2020_02").expect("accept").expect("match");
        assert!(b.day_offset > a.day_offset);
        assert_eq!(b.day_offset - a.day_offset, 31.0);
        assert_eq!(seq.last_offset(), Some(b.day_offset));
    }

    #[test]
    fn test_out_of_order_identifier_rejected() {
        let mut seq = sequencer();
        seq.accept("x_2020_01").expect("accept");
        seq.accept("x_2020_02").expect("accept");
        let last = seq.last_offset();

        let err = seq.accept("x_2019_12").unwrap_err();
        match err {
            ArchiveError::NonMonotonicTime {
                identifier,
                previous,
                current,
            } => {
                assert_eq!(identifier, "x_2019_12");
                assert!(current < previous);
            }
            other => panic!("expected NonMonotonicTime, got {:?}", other),
        }
        assert_eq!(seq.last_offset(), last);
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let mut seq = sequencer();
        seq.accept("a_2020_01.tif").expect("accept");
        assert!(matches!(
            seq.accept("b_2020_01.tif"),
            Err(ArchiveError::NonMonotonicTime { .. })
        ));
    }

    #[test]
    fn test_non_matching_identifiers_skipped() {
        let mut seq = sequencer();
        assert!(seq.accept("notes.txt").expect("accept").is_none());
        assert!(seq.last_offset().is_none());
        assert!(seq.accept("data/x_2020_01.tif").expect("accept").is_some());
    }

    #[test]
    fn test_date_token_taken_from_file_name() {
        let mut seq = sequencer();
        let step = seq
            .accept("/archive/2001_05/x_2020_01.tif")
            .expect("accept")
            .expect("match");
        assert_eq!(step.date.format("%Y-%m").to_string(), "2020-01");
    }
}
