//! Exact rational time arithmetic.
//!
//! All pipeline timing is carried as exact rational seconds so that
//! frame-period comparisons and range rebasing never accumulate float
//! drift. Values only collapse to `f64` at the FFmpeg argument boundary.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Upper bound on decimal digits accepted when parsing literals. Keeps
/// intermediate products comfortably inside `i128`.
const MAX_DECIMAL_DIGITS: usize = 24;

/// An exact rational number of seconds.
///
/// Invariants: the denominator is always positive and the fraction is
/// gcd-normalized, so derived `PartialEq`/`Hash` are sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i128,
    den: i128,
}

/// Error parsing a rational from a decimal or fraction literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RationalParseError {
    #[error("empty numeric literal")]
    Empty,
    #[error("invalid numeric literal: {0}")]
    Invalid(String),
    #[error("numeric literal has too many digits: {0}")]
    TooPrecise(String),
    #[error("zero denominator in fraction: {0}")]
    ZeroDenominator(String),
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// Create a normalized rational. Returns `None` when `den == 0`.
    pub fn new(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num, den).max(1);
        Some(Self {
            num: sign * num / g,
            den: (den / g).abs(),
        })
    }

    pub fn from_int(n: i64) -> Self {
        Self {
            num: n as i128,
            den: 1,
        }
    }

    /// Parse a decimal literal such as `"3.5"`, `"-0.04"` or `"1.2e-3"`
    /// into the exact fraction it denotes (`7/2`, `-1/25`, `3/2500`).
    pub fn from_decimal_str(s: &str) -> Result<Self, RationalParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RationalParseError::Empty);
        }

        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => (-1i128, rest),
            None => (1i128, s.strip_prefix('+').unwrap_or(s)),
        };

        let (mantissa, exp) = match body.split_once(['e', 'E']) {
            Some((m, e)) => {
                let exp: i32 = e
                    .parse()
                    .map_err(|_| RationalParseError::Invalid(s.to_string()))?;
                (m, exp)
            }
            None => (body, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(RationalParseError::Invalid(s.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(RationalParseError::Invalid(s.to_string()));
        }
        if int_part.len() + frac_part.len() > MAX_DECIMAL_DIGITS {
            return Err(RationalParseError::TooPrecise(s.to_string()));
        }

        let mut digits: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            digits = digits * 10 + (b - b'0') as i128;
        }

        let scale = frac_part.len() as i32 - exp;
        if scale.unsigned_abs() as usize > MAX_DECIMAL_DIGITS {
            return Err(RationalParseError::TooPrecise(s.to_string()));
        }

        let pow = 10i128.pow(scale.unsigned_abs());
        let (num, den) = if scale >= 0 {
            (sign * digits, pow)
        } else {
            (sign * digits * pow, 1)
        };

        // den is a power of ten, never zero
        Ok(Self::new(num, den).unwrap_or(Self::ZERO))
    }

    /// Parse a `num/den` fraction literal as emitted by ffprobe
    /// (`"30000/1001"`), falling back to decimal parsing for bare numbers.
    pub fn from_fraction_str(s: &str) -> Result<Self, RationalParseError> {
        let s = s.trim();
        match s.split_once('/') {
            Some((n, d)) => {
                let num: i128 = n
                    .trim()
                    .parse()
                    .map_err(|_| RationalParseError::Invalid(s.to_string()))?;
                let den: i128 = d
                    .trim()
                    .parse()
                    .map_err(|_| RationalParseError::Invalid(s.to_string()))?;
                Self::new(num, den).ok_or_else(|| RationalParseError::ZeroDenominator(s.to_string()))
            }
            None => Self::from_decimal_str(s),
        }
    }

    /// Multiplicative inverse. Returns `None` for zero.
    pub fn invert(&self) -> Option<Self> {
        Self::new(self.den, self.num)
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_positive(&self) -> bool {
        self.num > 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Clamp negative values to zero, used when rebasing scene boundaries.
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Render as fixed-point seconds for FFmpeg `-ss`/`-t` arguments.
    pub fn to_seconds_string(&self) -> String {
        format!("{:.6}", self.to_f64())
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Both denominators are positive, so cross-multiplication preserves order.
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        Rational::new(
            self.num * rhs.den + rhs.num * self.den,
            self.den * rhs.den,
        )
        .unwrap_or(Rational::ZERO)
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        Rational::new(
            self.num * rhs.den - rhs.num * self.den,
            self.den * rhs.den,
        )
        .unwrap_or(Rational::ZERO)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl Serialize for Rational {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Rational {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RationalVisitor;

        impl de::Visitor<'_> for RationalVisitor {
            type Value = Rational;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Rational, E> {
                Ok(Rational::from_int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Rational, E> {
                Ok(Rational::from_int(v as i64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Rational, E> {
                // The shortest round-trip representation recovers the decimal
                // the document author wrote (`0.1` stays exactly 1/10).
                Rational::from_decimal_str(&format!("{}", v)).map_err(de::Error::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Rational, E> {
                Rational::from_decimal_str(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(RationalVisitor)
    }
}

/// Error constructing a [`TimeRange`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error("invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidRange { start: String, end: String },
}

/// A half-open slice of source time, `end > start` guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Rational,
    pub end: Rational,
}

impl TimeRange {
    pub fn new(start: Rational, end: Rational) -> Result<Self, TimeRangeError> {
        if end <= start {
            return Err(TimeRangeError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Rational {
        self.end - self.start
    }
}

/// An exact frame rate in frames per second.
///
/// Stored as the rational ffprobe reports, never a rounded float, so the
/// derived frame period stays exact (`30000/1001` fps -> `1001/30000` s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    fps: Rational,
}

impl FrameRate {
    /// Build from a positive rational. Returns `None` for zero or negative
    /// rates (ffprobe reports `0/0` for streams without timing).
    pub fn new(fps: Rational) -> Option<Self> {
        fps.is_positive().then_some(Self { fps })
    }

    /// Parse an ffprobe frame-rate field (`"30000/1001"`, `"25/1"`, `"29.97"`).
    pub fn parse(s: &str) -> Option<Self> {
        Rational::from_fraction_str(s).ok().and_then(Self::new)
    }

    pub fn fps(&self) -> Rational {
        self.fps
    }

    /// Duration of one displayed frame, `1/fps`, exact.
    pub fn frame_period(&self) -> Rational {
        // fps is positive, so the inverse exists
        self.fps.invert().unwrap_or(Rational::ZERO)
    }

    /// Whether `duration` fits inside a single displayed frame.
    pub fn is_subframe(&self, duration: Rational) -> bool {
        duration <= self.frame_period()
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(s: &str) -> Rational {
        Rational::from_decimal_str(s).unwrap()
    }

    #[test]
    fn test_decimal_parsing_is_exact() {
        assert_eq!(rat("3.5"), Rational::new(7, 2).unwrap());
        assert_eq!(rat("0.1"), Rational::new(1, 10).unwrap());
        assert_eq!(rat("-0.04"), Rational::new(-1, 25).unwrap());
        assert_eq!(rat("2"), Rational::from_int(2));
        assert_eq!(rat("1.2e-3"), Rational::new(3, 2500).unwrap());
        assert_eq!(rat("5e2"), Rational::from_int(500));
    }

    #[test]
    fn test_decimal_parsing_rejects_garbage() {
        assert!(Rational::from_decimal_str("").is_err());
        assert!(Rational::from_decimal_str("abc").is_err());
        assert!(Rational::from_decimal_str("1.2.3").is_err());
        assert!(Rational::from_decimal_str(".").is_err());
    }

    #[test]
    fn test_fraction_parsing() {
        assert_eq!(
            Rational::from_fraction_str("30000/1001").unwrap(),
            Rational::new(30000, 1001).unwrap()
        );
        assert_eq!(Rational::from_fraction_str("25/1").unwrap(), rat("25"));
        assert!(Rational::from_fraction_str("1/0").is_err());
    }

    #[test]
    fn test_arithmetic_and_ordering() {
        assert_eq!(rat("0.1") + rat("0.2"), rat("0.3"));
        assert_eq!(rat("5.0") - rat("2.0"), rat("3.0"));
        assert!(rat("0.3") > rat("0.2999999"));
        assert!(rat("-1.5") < Rational::ZERO);
        assert_eq!(rat("-2").clamp_non_negative(), Rational::ZERO);
        assert_eq!(rat("2").clamp_non_negative(), rat("2"));
    }

    #[test]
    fn test_seconds_string() {
        assert_eq!(rat("3.5").to_seconds_string(), "3.500000");
        assert_eq!(rat("0").to_seconds_string(), "0.000000");
    }

    #[test]
    fn test_time_range() {
        let range = TimeRange::new(rat("2.0"), rat("5.0")).unwrap();
        assert_eq!(range.duration(), rat("3.0"));

        assert!(matches!(
            TimeRange::new(rat("5.0"), rat("5.0")),
            Err(TimeRangeError::InvalidRange { .. })
        ));
        assert!(TimeRange::new(rat("5.0"), rat("2.0")).is_err());
    }

    #[test]
    fn test_frame_period_is_exact() {
        let ntsc = FrameRate::parse("30000/1001").unwrap();
        assert_eq!(ntsc.frame_period(), Rational::new(1001, 30000).unwrap());

        let thirty = FrameRate::parse("30/1").unwrap();
        assert_eq!(thirty.frame_period(), Rational::new(1, 30).unwrap());

        // A duration of exactly one frame period counts as sub-frame.
        assert!(thirty.is_subframe(Rational::new(1, 30).unwrap()));
        assert!(thirty.is_subframe(rat("0.02")));
        assert!(!thirty.is_subframe(rat("0.04")));
    }

    #[test]
    fn test_frame_rate_rejects_degenerate() {
        assert!(FrameRate::parse("0/0").is_none());
        assert!(FrameRate::parse("0/1").is_none());
        assert!(FrameRate::parse("garbage").is_none());
    }

    #[test]
    fn test_serde_round_trip() {
        let v: Rational = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, rat("3.5"));

        let v: Rational = serde_json::from_str("7").unwrap();
        assert_eq!(v, Rational::from_int(7));

        let v: Rational = serde_json::from_str("0.1").unwrap();
        assert_eq!(v, Rational::new(1, 10).unwrap());
    }
}
