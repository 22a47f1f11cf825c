//! JSON shapes handed to HTTP and CLI callers.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{display_date, AllRatesResult, CurrencyEntry, RateResult};

/// `{success, date, usd, eur}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RateResponse {
    Success {
        success: bool,
        date: String,
        #[serde(with = "rust_decimal::serde::float_option")]
        usd: Option<Decimal>,
        #[serde(with = "rust_decimal::serde::float_option")]
        eur: Option<Decimal>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl From<&RateResult> for RateResponse {
    fn from(result: &RateResult) -> Self {
        match result {
            RateResult::Success(snapshot) => Self::Success {
                success: true,
                date: display_date(snapshot.date),
                usd: snapshot.usd,
                eur: snapshot.eur,
            },
            RateResult::Failure(err) => Self::Failure {
                success: false,
                error: err.to_string(),
            },
        }
    }
}

/// Numbers go out as JSON floats, not decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyEntryResponse {
    pub code: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub nominal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

impl From<&CurrencyEntry> for CurrencyEntryResponse {
    fn from(entry: &CurrencyEntry) -> Self {
        Self {
            code: entry.code.clone(),
            name: entry.name.clone(),
            nominal: entry.nominal,
            rate: entry.rate,
            value: entry.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AllRatesResponse {
    Success {
        success: bool,
        date: String,
        currencies: Vec<CurrencyEntryResponse>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl From<&AllRatesResult> for AllRatesResponse {
    fn from(result: &AllRatesResult) -> Self {
        match result {
            AllRatesResult::Success { date, currencies } => Self::Success {
                success: true,
                date: display_date(*date),
                currencies: currencies.iter().map(CurrencyEntryResponse::from).collect(),
            },
            AllRatesResult::Failure(err) => Self::Failure {
                success: false,
                error: err.to_string(),
            },
        }
    }
}
