//! CBR `DailyInfo` SOAP source (`GetCursOnDate`).
//!
//! The service answers with an ADO.NET DataSet: `ValuteCursOnDate` rows with
//! `Vname`, `Vnom`, `Vcurs` and `VchCode` children. Protocol faults come
//! back as `soap:Fault`, usually with HTTP 500.

use std::fmt::Display;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::rates::xml::read_document;
use crate::rates::{CurrencyQuote, RateError, RateSource};

const CBR_SOAP_URL: &str = "http://www.cbr.ru/DailyInfoWebServ/DailyInfo.asmx";
const SOAP_ACTION: &str = "http://web.cbr.ru/GetCursOnDate";

#[derive(Debug, Clone)]
pub struct SoapRateSource {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl SoapRateSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            endpoint: CBR_SOAP_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Bound the call duration. Without this the call waits for as long as
    /// the remote service keeps the connection open.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn envelope(date: NaiveDate) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <GetCursOnDate xmlns="http://web.cbr.ru/">
      <On_date>{}T00:00:00</On_date>
    </GetCursOnDate>
  </soap:Body>
</soap:Envelope>"#,
            date.format("%Y-%m-%d")
        )
    }
}

impl Default for SoapRateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "Fault")]
    fault: Option<Fault>,
    #[serde(rename = "GetCursOnDateResponse")]
    response: Option<CursOnDateResponse>,
}

#[derive(Debug, Deserialize)]
struct Fault {
    faultstring: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CursOnDateResponse {
    #[serde(rename = "GetCursOnDateResult")]
    result: Option<CursOnDateResult>,
}

// The result also carries an `xs:schema` describing the rows, skipped here.
#[derive(Debug, Deserialize)]
struct CursOnDateResult {
    diffgram: Option<Diffgram>,
}

#[derive(Debug, Deserialize)]
struct Diffgram {
    #[serde(rename = "ValuteData")]
    data: Option<ValuteData>,
}

#[derive(Debug, Deserialize)]
struct ValuteData {
    #[serde(rename = "ValuteCursOnDate", default)]
    rows: Vec<ValuteCursOnDate>,
}

#[derive(Debug, Deserialize)]
struct ValuteCursOnDate {
    #[serde(rename = "Vname")]
    name: Option<String>,
    #[serde(rename = "Vnom")]
    nominal: Option<String>,
    #[serde(rename = "Vcurs")]
    rate: Option<String>,
    #[serde(rename = "VchCode")]
    code: Option<String>,
}

impl Envelope {
    fn into_rows(self) -> Vec<ValuteCursOnDate> {
        self.body
            .response
            .and_then(|response| response.result)
            .and_then(|result| result.diffgram)
            .and_then(|diffgram| diffgram.data)
            .map(|data| data.rows)
            .unwrap_or_default()
    }
}

fn malformed(err: impl Display) -> RateError {
    RateError::UnknownFault(format!("malformed SOAP response: {err}"))
}

/// Interpret a GetCursOnDate response.
///
/// A fault in the body wins over the HTTP status. Everything else that goes
/// wrong is reported as [`RateError::UnknownFault`].
pub fn parse_soap_response(
    status: StatusCode,
    body: &[u8],
) -> Result<Vec<CurrencyQuote>, RateError> {
    let doc = read_document(body).map_err(malformed)?;

    let envelope = match doc.root.as_deref() {
        Some("Envelope") => Some(doc.deserialize::<Envelope>()),
        _ => None,
    };

    if let Some(Ok(Envelope {
        body: Body {
            fault: Some(fault), ..
        },
    })) = &envelope
    {
        let fault = fault
            .faultstring
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or("unspecified fault");
        return Err(RateError::TransportFault(fault.to_string()));
    }

    if !status.is_success() {
        return Err(RateError::UnknownFault(format!(
            "SOAP endpoint returned HTTP {status}"
        )));
    }

    let envelope = envelope
        .ok_or_else(|| RateError::UnknownFault("response is not a SOAP envelope".to_string()))?
        .map_err(malformed)?;

    let mut quotes = Vec::new();
    for row in envelope.into_rows() {
        // Rows without a letter code (e.g. retired currencies) are skipped.
        let Some(code) = row.code.as_deref().filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        let field = |value: &Option<String>, name: &str| {
            value.clone().ok_or_else(|| {
                RateError::UnknownFault(format!("ValuteCursOnDate {code} without {name}"))
            })
        };
        let nominal = field(&row.nominal, "Vnom")?;
        let rate = field(&row.rate, "Vcurs")?;
        let name = row.name.as_deref().unwrap_or_default();
        let quote = CurrencyQuote::from_raw(code, name, &nominal, &rate)
            .map_err(|e| RateError::UnknownFault(e.to_string()))?;
        quotes.push(quote);
    }

    Ok(quotes)
}

#[async_trait::async_trait]
impl RateSource for SoapRateSource {
    async fn fetch_quotes(&self, date: NaiveDate) -> Result<Vec<CurrencyQuote>, RateError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{SOAP_ACTION}\""))
            .body(Self::envelope(date));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RateError::UnknownFault(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RateError::UnknownFault(e.to_string()))?;

        parse_soap_response(status, &body)
    }

    fn name(&self) -> &str {
        "cbr_soap"
    }
}
