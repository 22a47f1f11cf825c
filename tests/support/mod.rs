use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rublekurs::clock::{FixedClock, DEFAULT_TIMEZONE};
use rublekurs::rates::{CurrencyQuote, RateError, RateResolver, RateSource};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn quote(code: &str, nominal: &str, value: &str) -> CurrencyQuote {
    CurrencyQuote::from_raw(code, code, nominal, value).unwrap()
}

pub fn usd_eur(usd: &str, eur: &str) -> Vec<CurrencyQuote> {
    vec![quote("USD", "1", usd), quote("EUR", "1", eur)]
}

/// Clock reading noon Moscow time on `day`.
pub fn moscow_noon(day: NaiveDate) -> FixedClock {
    let noon = day.and_hms_opt(9, 0, 0).unwrap();
    FixedClock::new(Utc.from_utc_datetime(&noon)).with_timezone(DEFAULT_TIMEZONE)
}

/// Rate source answering from a per-date script and recording every call.
///
/// Dates without a scripted answer fail with a network fault.
pub struct ScriptedRateSource {
    name: String,
    answers: HashMap<NaiveDate, Result<Vec<CurrencyQuote>, RateError>>,
    calls: Mutex<Vec<NaiveDate>>,
}

impl ScriptedRateSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answers: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_quotes(mut self, date: NaiveDate, quotes: Vec<CurrencyQuote>) -> Self {
        self.answers.insert(date, Ok(quotes));
        self
    }

    pub fn with_error(mut self, date: NaiveDate, error: RateError) -> Self {
        self.answers.insert(date, Err(error));
        self
    }

    pub fn calls(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateSource for ScriptedRateSource {
    async fn fetch_quotes(&self, date: NaiveDate) -> Result<Vec<CurrencyQuote>, RateError> {
        self.calls.lock().unwrap().push(date);
        self.answers
            .get(&date)
            .cloned()
            .unwrap_or_else(|| Err(RateError::NetworkFault(format!("no answer for {date}"))))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolver over two scripted sources, returned alongside them for call
/// inspection.
pub fn scripted_resolver(
    structured: ScriptedRateSource,
    document: ScriptedRateSource,
    clock: FixedClock,
) -> (RateResolver, Arc<ScriptedRateSource>, Arc<ScriptedRateSource>) {
    let structured = Arc::new(structured);
    let document = Arc::new(document);
    let resolver = RateResolver::new(structured.clone(), document.clone()).with_clock(Arc::new(clock));
    (resolver, structured, document)
}
