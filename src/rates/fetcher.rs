use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{AllRatesResult, CurrencyEntry, RateResult, RateSnapshot, RateSource};

/// Turns a [`RateSource`] answer into a caller-facing result.
///
/// This is the fault boundary: source errors are logged and folded into a
/// `Failure` value, never returned as `Err`.
#[derive(Clone)]
pub struct RateFetcher {
    source: Arc<dyn RateSource>,
}

impl RateFetcher {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// USD and EUR rates for `date`.
    pub async fn fetch_rates(&self, date: NaiveDate) -> RateResult {
        debug!(source = self.source.name(), date = %date, "fetching USD/EUR rates");

        match self.source.fetch_quotes(date).await {
            Ok(quotes) => {
                let snapshot = RateSnapshot::from_quotes(date, &quotes);
                debug!(
                    source = self.source.name(),
                    date = %date,
                    quotes = quotes.len(),
                    usd = ?snapshot.usd,
                    eur = ?snapshot.eur,
                    "rates fetched"
                );
                RateResult::Success(snapshot)
            }
            Err(err) => {
                warn!(
                    source = self.source.name(),
                    date = %date,
                    kind = err.kind(),
                    error = %err,
                    "failed to fetch currency rates"
                );
                RateResult::Failure(err)
            }
        }
    }

    /// Every published currency for `date`, in source order.
    pub async fn fetch_all(&self, date: NaiveDate) -> AllRatesResult {
        debug!(source = self.source.name(), date = %date, "fetching all currencies");

        match self.source.fetch_quotes(date).await {
            Ok(quotes) => AllRatesResult::Success {
                date,
                currencies: quotes.iter().map(CurrencyEntry::from).collect(),
            },
            Err(err) => {
                warn!(
                    source = self.source.name(),
                    date = %date,
                    kind = err.kind(),
                    error = %err,
                    "failed to fetch currency table"
                );
                AllRatesResult::Failure(err)
            }
        }
    }
}
