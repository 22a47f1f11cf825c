use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use super::RateError;
use crate::clock::Clock;

/// Date format accepted from callers.
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Date format returned to callers.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";
/// Decimal places rates and values are rounded to.
pub const RATE_DECIMALS: u32 = 4;

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";

/// The calendar date a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuery {
    date: NaiveDate,
}

impl RateQuery {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn today(clock: &dyn Clock) -> Self {
        Self::new(clock.today())
    }

    /// Parse a `YYYY-MM-DD` caller date.
    pub fn parse(input: &str) -> Result<Self, RateError> {
        NaiveDate::parse_from_str(input, INPUT_DATE_FORMAT)
            .map(Self::new)
            .map_err(|_| RateError::InvalidDateFormat {
                input: input.to_string(),
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn days_back(&self, days: i64) -> Self {
        Self::new(self.date - Duration::days(days))
    }
}

/// Render a date the way callers receive it (`DD.MM.YYYY`).
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Parse a CBR numeric field. Both `,` and `.` are accepted as the decimal
/// separator.
pub fn parse_cbr_decimal(raw: &str, field: &str) -> Result<Decimal, RateError> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .map_err(|_| RateError::ParseFault(format!("{field} is not a number: {raw:?}")))
}

/// One quote as published by either CBR source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyQuote {
    pub code: String,
    pub name: String,
    /// Lot size the value is quoted for.
    pub nominal: Decimal,
    /// Price of `nominal` units in rubles.
    pub value: Decimal,
}

impl CurrencyQuote {
    /// Build a quote from raw field text. Rejects unparsable numbers and a
    /// zero nominal.
    pub fn from_raw(
        code: &str,
        name: &str,
        nominal: &str,
        value: &str,
    ) -> Result<Self, RateError> {
        let nominal = parse_cbr_decimal(nominal, "Nominal")?;
        if nominal.is_zero() {
            return Err(RateError::ParseFault(format!("zero nominal for {code}")));
        }
        let value = parse_cbr_decimal(value, "Value")?;

        Ok(Self {
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            nominal,
            value,
        })
    }

    /// Price of one unit, rounded to [`RATE_DECIMALS`].
    pub fn rate(&self) -> Decimal {
        (self.value / self.nominal).round_dp(RATE_DECIMALS)
    }
}

/// USD and EUR rates for the date that was actually resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    pub date: NaiveDate,
    pub usd: Option<Decimal>,
    pub eur: Option<Decimal>,
}

impl RateSnapshot {
    /// Pick USD and EUR out of a quote list. A code missing from the list
    /// leaves its field unset; a repeated code keeps the last occurrence.
    pub fn from_quotes(date: NaiveDate, quotes: &[CurrencyQuote]) -> Self {
        let mut snapshot = Self {
            date,
            usd: None,
            eur: None,
        };
        for quote in quotes {
            match quote.code.as_str() {
                USD => snapshot.usd = Some(quote.rate()),
                EUR => snapshot.eur = Some(quote.rate()),
                _ => {}
            }
        }
        snapshot
    }

    pub fn is_complete(&self) -> bool {
        self.usd.is_some() && self.eur.is_some()
    }
}

/// Outcome of a USD/EUR lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateResult {
    Success(RateSnapshot),
    Failure(RateError),
}

impl RateResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Successful, but at least one of USD/EUR has no quote.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Success(snapshot) if !snapshot.is_complete())
    }

    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        match self {
            Self::Success(snapshot) => Some(snapshot),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RateError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }
}

/// A row of the all-currencies table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyEntry {
    pub code: String,
    pub name: String,
    pub nominal: Decimal,
    /// `value / nominal`, rounded.
    pub rate: Decimal,
    /// Quoted value, rounded.
    pub value: Decimal,
}

impl From<&CurrencyQuote> for CurrencyEntry {
    fn from(quote: &CurrencyQuote) -> Self {
        Self {
            code: quote.code.clone(),
            name: quote.name.clone(),
            nominal: quote.nominal,
            rate: quote.rate(),
            value: quote.value.round_dp(RATE_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllRatesResult {
    Success {
        date: NaiveDate,
        currencies: Vec<CurrencyEntry>,
    },
    Failure(RateError),
}

impl AllRatesResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_accepts_iso_dates() {
        let query = RateQuery::parse("2024-01-15").unwrap();
        assert_eq!(query.date(), date(2024, 1, 15));
    }

    #[test]
    fn parse_rejects_invalid_month() {
        let err = RateQuery::parse("2024-13-01").unwrap_err();
        assert_eq!(
            err,
            RateError::InvalidDateFormat {
                input: "2024-13-01".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_display_format() {
        assert!(RateQuery::parse("15.01.2024").is_err());
        assert!(RateQuery::parse("").is_err());
    }

    #[test]
    fn days_back_crosses_month_boundary() {
        let query = RateQuery::new(date(2024, 3, 1));
        assert_eq!(query.days_back(2).date(), date(2024, 2, 28));
    }

    #[test]
    fn display_date_uses_dots() {
        assert_eq!(display_date(date(2024, 1, 15)), "15.01.2024");
    }

    #[test]
    fn comma_decimal_separator_is_normalized() {
        assert_eq!(parse_cbr_decimal("90,5", "Value").unwrap(), dec("90.5"));
        assert_eq!(parse_cbr_decimal(" 90.5000 ", "Value").unwrap(), dec("90.5"));
    }

    #[test]
    fn garbage_value_is_a_parse_fault() {
        let err = parse_cbr_decimal("n/a", "Value").unwrap_err();
        assert_eq!(err.kind(), "parse_fault");
    }

    #[test]
    fn rate_divides_by_nominal_and_rounds() {
        // 10 units of HKD for 115.1234 rub.
        let quote = CurrencyQuote::from_raw("HKD", "Гонконгский доллар", "10", "115,1234").unwrap();
        assert_eq!(quote.rate(), dec("11.5123"));

        let quote = CurrencyQuote::from_raw("JPY", "Японских иен", "100", "61,2345").unwrap();
        assert_eq!(quote.rate(), dec("0.6123"));
    }

    #[test]
    fn zero_nominal_is_rejected() {
        let err = CurrencyQuote::from_raw("XXX", "", "0", "1,0").unwrap_err();
        assert!(matches!(err, RateError::ParseFault(_)));
    }

    #[test]
    fn snapshot_leaves_missing_codes_unset() {
        let quotes = vec![CurrencyQuote::from_raw("USD", "Доллар США", "1", "89,6883").unwrap()];
        let snapshot = RateSnapshot::from_quotes(date(2024, 1, 15), &quotes);
        assert_eq!(snapshot.usd, Some(dec("89.6883")));
        assert_eq!(snapshot.eur, None);
        assert!(!snapshot.is_complete());
        assert!(RateResult::Success(snapshot).is_partial());
    }

    #[test]
    fn entry_rate_matches_rounded_value_over_nominal() {
        let quote = CurrencyQuote::from_raw("AMD", "Армянских драмов", "100", "22,123456").unwrap();
        let entry = CurrencyEntry::from(&quote);
        assert_eq!(entry.value, dec("22.1235"));
        assert_eq!(entry.rate, (quote.value / quote.nominal).round_dp(RATE_DECIMALS));
        assert_eq!(entry.nominal, dec("100"));
    }

    #[test]
    fn failure_is_neither_success_nor_partial() {
        let result = RateResult::Failure(RateError::NetworkFault("timeout".into()));
        assert!(!result.is_success());
        assert!(!result.is_partial());
        assert!(result.snapshot().is_none());
    }
}
