//! CBR `XML_daily.asp` document source.
//!
//! `GET XML_daily.asp?date_req=DD/MM/YYYY` returns a `ValCurs` document with
//! one `Valute` element per currency. Values use a comma decimal separator
//! and the document is served in windows-1251.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::rates::xml::read_document;
use crate::rates::{CurrencyQuote, RateError, RateSource};

const CBR_XML_DAILY_URL: &str = "http://www.cbr.ru/scripts/XML_daily.asp";

/// Timeout applied to every document fetch unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct XmlDailyRateSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl XmlDailyRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: CBR_XML_DAILY_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Points the source at a different endpoint (mirror or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_url(&self, date: NaiveDate) -> String {
        format!("{}?date_req={}", self.base_url, date.format("%d/%m/%Y"))
    }
}

impl Default for XmlDailyRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "CharCode")]
    char_code: Option<String>,
    #[serde(rename = "Nominal")]
    nominal: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Value")]
    value: Option<String>,
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, RateError> {
    field
        .as_deref()
        .ok_or_else(|| RateError::ParseFault(format!("Valute element without {name}")))
}

impl Valute {
    fn to_quote(&self) -> Result<CurrencyQuote, RateError> {
        CurrencyQuote::from_raw(
            required(&self.char_code, "CharCode")?,
            self.name.as_deref().unwrap_or_default(),
            required(&self.nominal, "Nominal")?,
            required(&self.value, "Value")?,
        )
    }
}

/// Parse an XML_daily body into quotes, in document order.
pub fn parse_xml_daily(body: &[u8]) -> Result<Vec<CurrencyQuote>, RateError> {
    let doc = read_document(body).map_err(|e| RateError::ParseFault(e.to_string()))?;

    if doc.root.as_deref() != Some("ValCurs") {
        return Err(RateError::ParseFault(
            "response is not a ValCurs document".to_string(),
        ));
    }

    let document: ValCurs = doc
        .deserialize()
        .map_err(|e| RateError::ParseFault(e.to_string()))?;
    document.valutes.iter().map(Valute::to_quote).collect()
}

#[async_trait::async_trait]
impl RateSource for XmlDailyRateSource {
    async fn fetch_quotes(&self, date: NaiveDate) -> Result<Vec<CurrencyQuote>, RateError> {
        let url = self.request_url(date);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| RateError::NetworkFault(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| RateError::NetworkFault(e.to_string()))?;

        parse_xml_daily(&body)
    }

    fn name(&self) -> &str {
        "cbr_xml_daily"
    }
}
