use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rublekurs::rates::providers::XmlDailyRateSource;
use rublekurs::rates::{RateError, RateFetcher, RateResult, RateSource};
use rust_decimal::Decimal;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::date;

const DOCUMENT_PATH: &str = "/scripts/XML_daily.asp";

fn source(server: &MockServer) -> XmlDailyRateSource {
    XmlDailyRateSource::new().with_base_url(format!("{}{DOCUMENT_PATH}", server.uri()))
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

const FULL_DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ValCurs Date="13.01.2024" name="Foreign Currency Market">
    <Valute ID="R01235">
        <NumCode>840</NumCode>
        <CharCode>USD</CharCode>
        <Nominal>1</Nominal>
        <Name>Доллар США</Name>
        <Value>89,6883</Value>
    </Valute>
    <Valute ID="R01239">
        <NumCode>978</NumCode>
        <CharCode>EUR</CharCode>
        <Nominal>1</Nominal>
        <Name>Евро</Name>
        <Value>98,2236</Value>
    </Valute>
    <Valute ID="R01820">
        <NumCode>392</NumCode>
        <CharCode>JPY</CharCode>
        <Nominal>100</Nominal>
        <Name>Японских иен</Name>
        <Value>61,5711</Value>
    </Valute>
</ValCurs>"#;

#[tokio::test]
async fn xml_daily_parses_comma_decimals_and_nominal() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .and(query_param("date_req", "15/01/2024"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FULL_DOCUMENT, "application/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let quotes = source(&server).fetch_quotes(date(2024, 1, 15)).await?;

    let codes: Vec<_> = quotes.iter().map(|q| q.code.as_str()).collect();
    assert_eq!(codes, ["USD", "EUR", "JPY"]);
    assert_eq!(quotes[0].rate(), dec("89.6883"));
    assert_eq!(quotes[1].name, "Евро");
    assert_eq!(quotes[2].nominal, dec("100"));
    assert_eq!(quotes[2].rate(), dec("0.6157"));

    Ok(())
}

#[tokio::test]
async fn xml_daily_missing_eur_is_partial_success() -> Result<()> {
    let server = MockServer::start().await;

    let body = r#"<?xml version="1.0" encoding="utf-8"?>
<ValCurs Date="15.01.2024" name="Foreign Currency Market">
    <Valute ID="R01235">
        <CharCode>USD</CharCode>
        <Nominal>1</Nominal>
        <Name>Доллар США</Name>
        <Value>89,6883</Value>
    </Valute>
</ValCurs>"#;

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .mount(&server)
        .await;

    let fetcher = RateFetcher::new(Arc::new(source(&server)));
    let result = fetcher.fetch_rates(date(2024, 1, 15)).await;

    assert!(result.is_success());
    assert!(result.is_partial());
    let snapshot = result.snapshot().expect("success");
    assert_eq!(snapshot.date, date(2024, 1, 15));
    assert_eq!(snapshot.usd, Some(dec("89.6883")));
    assert_eq!(snapshot.eur, None);

    Ok(())
}

#[tokio::test]
async fn xml_daily_decodes_windows_1251() -> Result<()> {
    let server = MockServer::start().await;

    let mut body = br#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="15.01.2024" name="Foreign Currency Market"><Valute ID="R01239"><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>"#
        .to_vec();
    // "Евро" in windows-1251.
    body.extend_from_slice(&[0xC5, 0xE2, 0xF0, 0xEE]);
    body.extend_from_slice(b"</Name><Value>98,2236</Value></Valute></ValCurs>");

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "application/xml; charset=windows-1251"),
        )
        .mount(&server)
        .await;

    let quotes = source(&server).fetch_quotes(date(2024, 1, 15)).await?;

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].name, "Евро");
    assert_eq!(quotes[0].rate(), dec("98.2236"));

    Ok(())
}

#[tokio::test]
async fn xml_daily_http_error_is_network_fault() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = RateFetcher::new(Arc::new(source(&server)));
    let result = fetcher.fetch_rates(date(2024, 1, 15)).await;

    match result {
        RateResult::Failure(RateError::NetworkFault(msg)) => assert!(msg.contains("500")),
        other => panic!("expected network fault, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn xml_daily_slow_response_times_out() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(FULL_DOCUMENT, "application/xml")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let source = source(&server).with_timeout(Duration::from_millis(100));
    let err = source.fetch_quotes(date(2024, 1, 15)).await.unwrap_err();

    assert!(matches!(err, RateError::NetworkFault(_)), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn xml_daily_non_document_is_parse_fault() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOCUMENT_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body>maintenance</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_quotes(date(2024, 1, 15))
        .await
        .unwrap_err();

    assert!(matches!(err, RateError::ParseFault(_)), "got {err:?}");
    assert!(err.to_string().starts_with("Ошибка разбора ответа"));

    Ok(())
}
