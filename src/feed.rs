use std::collections::HashSet;
use std::future::Future;

use tracing::debug;

use crate::error::{DecodeError, FetchError};
use crate::models::{AssetRecord, FeedEnvelope};

pub const DEFAULT_ENDPOINT: &str = "https://api.coincap.io/v2/assets";

/// Producer of raw feed documents.
pub trait FeedSource {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Plain GET against a fixed URL. No query, no auth.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = resp.bytes().await.map_err(FetchError::Body)?;
        debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(body.to_vec())
    }
}

/// Parses a `/v2/assets` document into its records, in source order.
///
/// Extra fields are ignored. Ids must be non-empty and unique within the
/// document since they become the table's partition key.
pub fn decode(bytes: &[u8]) -> Result<Vec<AssetRecord>, DecodeError> {
    let envelope: FeedEnvelope = serde_json::from_slice(bytes)?;

    {
        let mut seen = HashSet::with_capacity(envelope.data.len());
        for (idx, record) in envelope.data.iter().enumerate() {
            if record.id.is_empty() {
                return Err(DecodeError::EmptyId(idx));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(DecodeError::DuplicateId(record.id.clone()));
            }
        }
    }

    debug!(
        "Decoded {} assets (producer timestamp {})",
        envelope.data.len(),
        envelope.timestamp
    );
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TWO_ASSETS: &str = r#"{
        "data": [
            {"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin",
             "supply": "19700000.0", "maxSupply": "21000000.0",
             "marketCapUsd": "1280500000000.00", "volumeUsd24Hr": "9000000000.12",
             "priceUsd": "65000.00", "changePercent24Hr": "-1.2500",
             "vwap24Hr": "64800.12", "explorer": "https://blockchain.info/",
             "tokens": {}},
            {"id": "ethereum", "rank": "2", "symbol": "ETH", "name": "Ethereum",
             "supply": "120000000.0", "maxSupply": null,
             "marketCapUsd": "420000000000.00", "volumeUsd24Hr": "5000000000.00",
             "priceUsd": "3500.10", "changePercent24Hr": "0.8800",
             "vwap24Hr": "3490.00", "explorer": "https://etherscan.io/"}
        ],
        "timestamp": 1718000000000
    }"#;

    #[test]
    fn test_decode_keeps_order_and_values() {
        let records = decode(TWO_ASSETS.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "bitcoin");
        assert_eq!(records[1].id, "ethereum");

        let btc = &records[0];
        assert_eq!(btc.rank, "1");
        assert_eq!(btc.symbol, "BTC");
        assert_eq!(btc.supply, "19700000.0");
        assert_eq!(btc.market_cap_usd, "1280500000000.00");
        assert_eq!(btc.volume_usd24_hr, "9000000000.12");
        assert_eq!(btc.price_usd, "65000.00");
        assert_eq!(btc.change_percent24_hr, "-1.2500");
        assert_eq!(btc.vwap24_hr, "64800.12");
        assert_eq!(records[1].max_supply, "");
    }

    #[test]
    fn test_decode_empty_data() {
        let records = decode(br#"{"data": [], "timestamp": 1}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_decode_missing_data() {
        let err = decode(br#"{"timestamp": 1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)), "got {:?}", err);
    }

    #[test]
    fn test_decode_non_array_data() {
        let err = decode(br#"{"data": {"id": "bitcoin"}, "timestamp": 1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_type_mismatch() {
        let payload = br#"{"data": [{"id": "bitcoin", "rank": 1, "symbol": "BTC", "name": "Bitcoin"}], "timestamp": 1}"#;
        assert!(decode(payload).is_err());

        let payload = br#"{"data": [{"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin", "priceUsd": 65000}], "timestamp": 1}"#;
        assert!(decode(payload).is_err());
    }

    #[test]
    fn test_decode_not_json() {
        assert!(matches!(decode(b"<html>502</html>"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_empty_and_duplicate_ids() {
        let payload = br#"{"data": [
            {"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin"},
            {"id": "", "rank": "2", "symbol": "X", "name": "X"}
        ], "timestamp": 1}"#;
        assert!(matches!(decode(payload), Err(DecodeError::EmptyId(1))));

        let payload = br#"{"data": [
            {"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin"},
            {"id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin"}
        ], "timestamp": 1}"#;
        match decode(payload) {
            Err(DecodeError::DuplicateId(id)) => assert_eq!(id, "bitcoin"),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    fn local_fetcher(url: String) -> HttpFetcher {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpFetcher::with_client(client, url)
    }

    /// Serves a single canned HTTP response and returns the URL to hit.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let resp = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });
        format!("http://{}/v2/assets", addr)
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let url = serve_once("HTTP/1.1 200 OK", TWO_ASSETS).await;
        let body = local_fetcher(url).fetch().await.unwrap();
        assert_eq!(body, TWO_ASSETS.as_bytes());
    }

    #[tokio::test]
    async fn test_fetch_truncated_body_is_body_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            // Promise 100 bytes, deliver 10, hang up.
            let resp = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"data\": [";
            stream.write_all(resp.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });

        let err = local_fetcher(format!("http://{}/v2/assets", addr)).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Body(_)), "got {:?}", err);
        assert!(err.to_string().starts_with("could not read response body"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;
        match local_fetcher(url).fetch().await {
            Err(FetchError::Status(s)) => assert_eq!(s.as_u16(), 503),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_fetcher(format!("http://{}/", addr)).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
