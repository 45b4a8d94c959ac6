//! Fixed-point money with two decimal places.
//!
//! Stored as an integer count of cents, which maps directly onto the
//! warehouse `Decimal(10,2)` columns (Decimal64 with scale 2).

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Largest magnitude a `Decimal(10, 2)` column holds (99,999,999.99).
    pub const MAX: Cents = Cents(9_999_999_999);

    pub fn new(cents: i64) -> Self {
        Self(cents)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True when the amount fits a `Decimal(10, 2)` column.
    pub fn fits_column(&self) -> bool {
        self.0.unsigned_abs() <= Self::MAX.0.unsigned_abs()
    }

    /// `self * rhs`, failing when the product leaves the column range.
    pub fn checked_mul(self, rhs: i64) -> Result<Cents> {
        bounded(self.0.checked_mul(rhs), || format!("{} x {}", self, rhs))
    }

    /// `self + rhs`, failing when the sum leaves the column range.
    pub fn checked_add(self, rhs: Cents) -> Result<Cents> {
        bounded(self.0.checked_add(rhs.0), || format!("{} + {}", self, rhs))
    }

    /// `self - rhs`, failing when the difference leaves the column range.
    pub fn checked_sub(self, rhs: Cents) -> Result<Cents> {
        bounded(self.0.checked_sub(rhs.0), || format!("{} - {}", self, rhs))
    }

    /// Addition for report totals, which are never stored in a column.
    pub fn saturating_add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }

    /// Decimal value as a float (for reports only, never for arithmetic).
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Ratio `self / total` as a percentage rounded to two decimals.
    pub fn percent_of(&self, total: Cents) -> f64 {
        if total.0 == 0 {
            return 0.0;
        }
        (self.0 as f64 / total.0 as f64 * 10_000.0).round() / 100.0
    }
}

fn bounded(value: Option<i64>, expr: impl FnOnce() -> String) -> Result<Cents> {
    match value.map(Cents) {
        Some(cents) if cents.fits_column() => Ok(cents),
        _ => Err(Error::validation(format!("amount out of range: {}", expr()))),
    }
}

impl FromStr for Cents {
    type Err = Error;

    /// Parses `12`, `12.5`, `12.50`, `-3.10`, the decimal-comma form `12,50`
    /// and thousands groups such as `1,234` or `1,234.50`. A third
    /// fractional digit rounds half away from zero.
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::parse("empty amount"));
        }

        let normalized = normalize_separators(raw)
            .ok_or_else(|| Error::parse(format!("invalid digit grouping: {}", s)))?;

        let (negative, digits) = match normalized.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, normalized.as_str()),
        };

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(Error::parse(format!("invalid amount: {}", s)));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::parse(format!("invalid amount: {}", s)));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| Error::parse(format!("amount out of range: {}", s)))?
        };

        let mut frac_digits = frac.bytes().map(|b| (b - b'0') as i64);
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().map(|d| d >= 5).unwrap_or(false);

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(|| Error::parse(format!("amount out of range: {}", s)))?;

        Ok(Cents(if negative { -cents } else { cents }))
    }
}

/// Rewrites commas into plain digits with a `.` decimal point.
///
/// A single comma followed by one or two digits is a decimal comma. Any
/// other comma separates thousands and must be followed by exactly three
/// digits.
fn normalize_separators(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }

    let (int_part, frac) = match raw.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (raw, None),
    };

    if frac.is_none() {
        if let Some((whole, decimals)) = raw.split_once(',') {
            if !decimals.contains(',') && (1..=2).contains(&decimals.len()) {
                return Some(format!("{}.{}", whole, decimals));
            }
        }
    }

    let mut groups = int_part.split(',');
    let head = groups.next()?;
    let lead = head.strip_prefix('-').unwrap_or(head);
    if lead.is_empty() || lead.len() > 3 {
        return None;
    }

    let mut out = head.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        out.push_str(group);
    }
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    Some(out)
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}
