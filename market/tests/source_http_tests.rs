
use std::time::Duration;

use market::source::{BinanceSpotSource, Interval, MexcFuturesSource, PriceSource, SourceError};
use market::types::PriceSample;
use mock_http::CannedServer;

const TIMEOUT: Duration = Duration::from_secs(5);

fn mexc(server: &CannedServer) -> MexcFuturesSource {
    MexcFuturesSource::new(&server.base_url, Interval::Min5, TIMEOUT).unwrap()
}

fn binance(server: &CannedServer) -> BinanceSpotSource {
    BinanceSpotSource::new(&server.base_url, Interval::Min5, TIMEOUT).unwrap()
}

#[tokio::test]
async fn mexc_fetch_parses_column_layout() {
    let server = CannedServer::start(
        "200 OK",
        r#"{"success":true,"code":0,"data":{"time":[1717229100,1717228800],"close":[101.5,100.0]}}"#,
    )
    .await;

    let out = mexc(&server).fetch_klines("btc_usdt", 2).await.unwrap();

    assert_eq!(
        out,
        vec![
            PriceSample::new(1_717_228_800_000, 100.0),
            PriceSample::new(1_717_229_100_000, 101.5),
        ]
    );
    let head = server.last_head();
    assert!(head.starts_with("GET /api/v1/contract/kline/BTC_USDT?"), "{head}");
    assert!(head.contains("interval=Min5"));
    assert!(head.contains("limit=2"));
}

#[tokio::test]
async fn mexc_404_is_not_found() {
    let server = CannedServer::start("404 Not Found", "{}").await;

    let err = mexc(&server).fetch_klines("NOPE_USDT", 2).await.unwrap_err();

    assert!(matches!(err, SourceError::NotFound(ref s) if s == "NOPE_USDT"), "{err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn mexc_429_is_rate_limited() {
    let server = CannedServer::start("429 Too Many Requests", "{}").await;

    let err = mexc(&server).fetch_klines("BTC_USDT", 2).await.unwrap_err();

    assert!(matches!(err, SourceError::RateLimited), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mexc_server_error_keeps_status_and_body() {
    let server = CannedServer::start("503 Service Unavailable", "maintenance").await;

    let err = mexc(&server).fetch_klines("BTC_USDT", 2).await.unwrap_err();

    match err {
        SourceError::Status { status, ref body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        ref other => panic!("unexpected: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn mexc_unsuccessful_envelope_is_venue_error() {
    let server = CannedServer::start(
        "200 OK",
        r#"{"success":false,"code":1001,"message":"contract not exist"}"#,
    )
    .await;

    let err = mexc(&server).fetch_klines("NOPE_USDT", 2).await.unwrap_err();

    assert!(matches!(err, SourceError::Venue { code: 1001, .. }), "{err:?}");
}

#[tokio::test]
async fn binance_fetch_translates_symbol_and_interval() {
    let server = CannedServer::start(
        "200 OK",
        r#"[[1717228800000,"1","1","1","67050.5","1",1717229099999]]"#,
    )
    .await;

    let out = binance(&server).fetch_klines("BTC_USDT", 500).await.unwrap();

    assert_eq!(out, vec![PriceSample::new(1_717_228_800_000, 67050.5)]);
    let head = server.last_head();
    assert!(head.starts_with("GET /api/v3/klines?"), "{head}");
    assert!(head.contains("symbol=BTCUSDT"));
    assert!(head.contains("interval=5m"));
}

#[tokio::test]
async fn binance_invalid_symbol_is_not_found() {
    let server = CannedServer::start(
        "400 Bad Request",
        r#"{"code":-1121,"msg":"Invalid symbol."}"#,
    )
    .await;

    let err = binance(&server).fetch_klines("NOPE_USDT", 2).await.unwrap_err();

    assert!(matches!(err, SourceError::NotFound(ref s) if s == "NOPEUSDT"), "{err:?}");
}

#[tokio::test]
async fn binance_other_bad_request_is_status_error() {
    let server = CannedServer::start(
        "400 Bad Request",
        r#"{"code":-1100,"msg":"Illegal characters found in parameter 'symbol'"}"#,
    )
    .await;

    let err = binance(&server).fetch_klines("BTC_USDT", 2).await.unwrap_err();

    assert!(matches!(err, SourceError::Status { status: 400, .. }), "{err:?}");
    assert!(!err.is_retryable());
}
