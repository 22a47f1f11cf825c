use chrono::NaiveDate;

use super::{CurrencyQuote, RateError};

/// A transport that can produce the CBR quote table for a date.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// All quotes published for `date`, in source order. An empty list is a
    /// valid answer for days without publication.
    async fn fetch_quotes(&self, date: NaiveDate) -> Result<Vec<CurrencyQuote>, RateError>;

    fn name(&self) -> &str;
}
