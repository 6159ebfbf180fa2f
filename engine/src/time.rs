use std::convert::TryInto;
use std::fmt;
use std::ops::Sub;

use serde::{de, ser, Deserialize, Serialize};

/// A span of seconds. Used for footpath durations, board buffers and the
/// difference between two [`Time`]s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration {
    seconds: i64,
}

impl Duration {
    pub const fn seconds(seconds: i64) -> Duration {
        Duration { seconds }
    }

    pub const fn to_secs(&self) -> i64 {
        self.seconds
    }
}

/// Seconds since local service midnight. Not capped at 86,400: GTFS trips
/// that run past midnight carry hours >= 24 and this type preserves that so
/// that ordering and arithmetic across the service day stay monotone. Only
/// rendered modulo 86,400 at the host boundary, via [`Time::to_canonical_hms`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Time {
    seconds_since_midnight: u32,
}

impl Time {
    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Time {
        Time {
            seconds_since_midnight: (hours * 60 + minutes) * 60 + seconds,
        }
    }

    pub const fn from_seconds(seconds_since_midnight: u32) -> Time {
        Time {
            seconds_since_midnight,
        }
    }

    pub const fn to_seconds(self) -> u32 {
        self.seconds_since_midnight
    }

    fn hour(self) -> u32 {
        self.seconds_since_midnight / 3600
    }

    fn minute(self) -> u8 {
        ((self.seconds_since_midnight / 60) % 60)
            .try_into()
            .unwrap()
    }

    fn second(self) -> u8 {
        (self.seconds_since_midnight % 60).try_into().unwrap()
    }

    /// Canonical 24h wall-clock rendering, wrapping times past midnight
    /// (e.g. a trip recorded as `25:10:00`) back into `00:00:00..24:00:00`.
    pub fn to_canonical_hms(self) -> String {
        let wrapped = self.seconds_since_midnight % 86_400;
        let t = Time::from_seconds(wrapped);
        format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
    }
}

impl ser::Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        self.seconds_since_midnight.serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        de::Deserialize::deserialize(deserializer).map(|seconds_since_midnight| Time {
            seconds_since_midnight,
        })
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    /// Duration between two [`Time`]s on the same (possibly overflowed)
    /// service day. Does not wrap: both operands are assumed to already be
    /// in service-midnight-relative seconds, which never wrap internally.
    fn sub(self, rhs: Self) -> Duration {
        Duration::seconds(self.seconds_since_midnight as i64 - rhs.seconds_since_midnight as i64)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl std::str::FromStr for Time {
    type Err = TimeParseError;

    /// Parses `H:MM:SS` or `HH:MM:SS`. Hours above 23 (service continuing
    /// past midnight) are accepted, per GTFS.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        let (hh, mm, ss) = if s.len() == 8 {
            if s[2] != b':' || s[5] != b':' {
                return Err(TimeParseError::InvalidFormat);
            }
            (&s[0..2], &s[3..5], &s[6..8])
        } else if s.len() == 7 {
            if s[1] != b':' || s[4] != b':' {
                return Err(TimeParseError::InvalidFormat);
            }
            (&s[0..1], &s[2..4], &s[5..7])
        } else {
            return Err(TimeParseError::InvalidFormat);
        };
        use std::str::from_utf8;
        let hours: u32 = from_utf8(hh)?.parse()?;
        let minutes: u32 = from_utf8(mm)?.parse()?;
        let seconds: u32 = from_utf8(ss)?.parse()?;
        if seconds > 59 || minutes > 59 {
            return Err(TimeParseError::TooManySecondsOrMinutes);
        }
        Ok(Time::from_hms(hours, minutes, seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    InvalidFormat,
    TooManySecondsOrMinutes,
    ParseIntError(std::num::ParseIntError),
}

impl From<std::num::ParseIntError> for TimeParseError {
    fn from(err: std::num::ParseIntError) -> TimeParseError {
        TimeParseError::ParseIntError(err)
    }
}

impl From<std::str::Utf8Error> for TimeParseError {
    fn from(_err: std::str::Utf8Error) -> TimeParseError {
        TimeParseError::InvalidFormat
    }
}

impl fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TimeParseError::*;
        match self {
            InvalidFormat => write!(f, "time should use format eg. 23:59:59"),
            TooManySecondsOrMinutes => write!(f, "maximum minutes or seconds is 59"),
            ParseIntError(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TimeParseError {}

#[cfg(test)]
mod test {
    use super::{Duration, Time};

    #[test]
    fn hms_times() {
        assert_eq!(Time::from_hms(12, 59, 59), "12:59:59".parse().unwrap());
    }

    #[test]
    fn subtract_times() {
        assert_eq!(
            "12:00:15".parse::<Time>().unwrap() - "12:00:00".parse::<Time>().unwrap(),
            Duration::seconds(15)
        );
    }

    #[test]
    fn parse_and_format_roundtrip_up_to_h48() {
        for h in 0..=48u32 {
            let s = format!("{:02}:00:00", h);
            let t: Time = s.parse().unwrap();
            assert_eq!(t.to_string(), s);
        }
    }

    #[test]
    fn canonical_wraps_past_midnight() {
        let t = Time::from_hms(24, 10, 0);
        assert_eq!(t.to_canonical_hms(), "00:10:00");
        assert_eq!(t.to_string(), "24:10:00");
    }

    #[test]
    fn invalid_parses() {
        assert!("".parse::<Time>().is_err());
        assert!("00:00:0".parse::<Time>().is_err());
        assert!("00:00:60".parse::<Time>().is_err());
        assert!("00:60:00".parse::<Time>().is_err());
    }
}
