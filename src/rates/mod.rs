mod error;
mod fetcher;
mod models;
pub mod providers;
mod resolver;
mod response;
mod source;
mod xml;

pub use error::RateError;
pub use fetcher::RateFetcher;
pub use models::{
    display_date, parse_cbr_decimal, AllRatesResult, CurrencyEntry, CurrencyQuote, RateQuery,
    RateResult, RateSnapshot, DISPLAY_DATE_FORMAT, EUR, INPUT_DATE_FORMAT, RATE_DECIMALS, USD,
};
pub use resolver::{RateResolver, LATEST_LOOKBACK_DAYS};
pub use response::{AllRatesResponse, CurrencyEntryResponse, RateResponse};
pub use source::RateSource;
