use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::providers::{SoapRateSource, XmlDailyRateSource};
use super::{AllRatesResult, RateFetcher, RateQuery, RateResult, RateSource};
use crate::clock::{Clock, SystemClock};
use crate::config::CbrConfig;

/// How many days `resolve_latest` steps back from today at most.
pub const LATEST_LOOKBACK_DAYS: i64 = 2;

/// Applies the fallback policy over the structured (SOAP) and document
/// (XML_daily) fetchers.
///
/// Every chain is sequential: an attempt starts only after the previous one
/// finished and was judged insufficient.
pub struct RateResolver {
    structured: RateFetcher,
    document: RateFetcher,
    clock: Arc<dyn Clock>,
}

impl RateResolver {
    pub fn new(structured: Arc<dyn RateSource>, document: Arc<dyn RateSource>) -> Self {
        Self {
            structured: RateFetcher::new(structured),
            document: RateFetcher::new(document),
            clock: Arc::new(SystemClock::default()),
        }
    }

    /// Resolver over the live CBR endpoints described by `config`.
    pub fn from_config(config: &CbrConfig) -> Self {
        let mut soap = SoapRateSource::new().with_endpoint(config.soap_url.clone());
        if let Some(timeout) = config.soap_timeout {
            soap = soap.with_timeout(timeout);
        }
        let xml_daily = XmlDailyRateSource::new()
            .with_base_url(config.xml_daily_url.clone())
            .with_timeout(config.request_timeout);

        Self::new(Arc::new(soap), Arc::new(xml_daily))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Latest available USD/EUR rates.
    ///
    /// Starts at today and steps back one day at a time, up to
    /// [`LATEST_LOOKBACK_DAYS`], while the result is successful but missing a
    /// currency. A failure stops the chain. If the window is exhausted the
    /// last partial result is returned as is.
    pub async fn resolve_latest(&self) -> RateResult {
        let today = RateQuery::today(self.clock.as_ref());
        let mut result = self.document.fetch_rates(today.date()).await;

        for days_back in 1..=LATEST_LOOKBACK_DAYS {
            if !result.is_partial() {
                break;
            }
            let query = today.days_back(days_back);
            debug!(date = %query.date(), days_back, "no complete quote, stepping back a day");
            result = self.document.fetch_rates(query.date()).await;
        }

        if result.is_partial() {
            warn!(
                today = %today.date(),
                lookback_days = LATEST_LOOKBACK_DAYS,
                "no complete USD/EUR quote within lookback window"
            );
        }
        result
    }

    /// USD/EUR rates for a caller-supplied `YYYY-MM-DD` date.
    ///
    /// Tries the SOAP call first and falls back to the document fetch for the
    /// same date if it failed for any reason. No date stepping.
    pub async fn resolve_by_date(&self, input: &str) -> RateResult {
        let query = match RateQuery::parse(input) {
            Ok(query) => query,
            Err(err) => return RateResult::Failure(err),
        };

        let result = self.structured.fetch_rates(query.date()).await;
        if result.is_success() {
            return result;
        }

        info!(
            date = %query.date(),
            from = self.structured.source_name(),
            to = self.document.source_name(),
            "structured call failed, falling back to document fetch"
        );
        self.document.fetch_rates(query.date()).await
    }

    /// All published currencies for `date`, today when unset.
    pub async fn resolve_all(&self, date: Option<NaiveDate>) -> AllRatesResult {
        let date = date.unwrap_or_else(|| self.clock.today());
        self.document.fetch_all(date).await
    }

    /// [`Self::resolve_all`] for an optional `YYYY-MM-DD` caller string.
    pub async fn resolve_all_by_date(&self, input: Option<&str>) -> AllRatesResult {
        match input.map(RateQuery::parse).transpose() {
            Ok(query) => self.resolve_all(query.map(|q| q.date())).await,
            Err(err) => AllRatesResult::Failure(err),
        }
    }
}
