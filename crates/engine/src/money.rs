use std::{fmt, str::FromStr};

use crate::EngineError;

/// Currency code every amount in the marketplace is denominated in.
pub const CURRENCY_CODE: &str = "KES";

/// Money amount represented as **integer cents**.
///
/// Balances, listing prices and transaction amounts all use this type, so no
/// floating-point value ever reaches the ledger.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(2_500_00);
/// assert_eq!(amount.cents(), 250000);
/// assert_eq!(amount.to_string(), "KES 2500.00");
/// ```
///
/// Parsing from form input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new amount from whole currency units.
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Fails with `InvalidAmount` unless the amount is strictly positive.
    pub fn ensure_positive(self, label: &str) -> Result<Self, EngineError> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(EngineError::InvalidAmount(format!(
                "{label} must be greater than zero"
            )))
        }
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{CURRENCY_CODE} {sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator, an optional leading `+`/`-`
    /// and an optional `KES` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix(CURRENCY_CODE)
            .map(str::trim_start)
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped.trim())
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped.trim())
        } else {
            (false, trimmed)
        };
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let (units_str, frac_str) = match rest.split_once('.') {
            Some((units, frac)) => (units, Some(frac)),
            None => (rest.as_str(), None),
        };

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let cents: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) if !frac.chars().all(|c| c.is_ascii_digit()) => return Err(invalid()),
            Some(frac) if frac.len() == 1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            Some(frac) if frac.len() == 2 => frac.parse::<i64>().map_err(|_| invalid())?,
            Some(_) => {
                return Err(EngineError::InvalidAmount("too many decimals".to_string()));
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_kes() {
        assert_eq!(MoneyCents::new(0).to_string(), "KES 0.00");
        assert_eq!(MoneyCents::new(5).to_string(), "KES 0.05");
        assert_eq!(MoneyCents::from_units(10_000).to_string(), "KES 10000.00");
        assert_eq!(MoneyCents::new(-1050).to_string(), "KES -10.50");
    }

    #[test]
    fn parse_accepts_dot_comma_and_prefix() {
        assert_eq!("2500".parse::<MoneyCents>().unwrap().cents(), 250_000);
        assert_eq!("2500.5".parse::<MoneyCents>().unwrap().cents(), 250_050);
        assert_eq!("10,50".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("KES 7500.00".parse::<MoneyCents>().unwrap().cents(), 750_000);
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("  2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("12.345".parse::<MoneyCents>().is_err());
        assert!("".parse::<MoneyCents>().is_err());
        assert!("abc".parse::<MoneyCents>().is_err());
        assert!("1.2.3".parse::<MoneyCents>().is_err());
        assert!(".50".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(
            MoneyCents::new(1).checked_add(MoneyCents::new(2)),
            Some(MoneyCents::new(3))
        );
        assert_eq!(MoneyCents::new(i64::MAX).checked_add(MoneyCents::new(1)), None);
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(MoneyCents::ZERO.ensure_positive("amount").is_err());
        assert!(MoneyCents::new(-1).ensure_positive("amount").is_err());
        assert_eq!(
            MoneyCents::new(1).ensure_positive("amount").unwrap(),
            MoneyCents::new(1)
        );
    }
}
