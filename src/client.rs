//! Remote client port and its reqwest-backed implementation.
//!
//! Aggregators only see [`RemoteClient`]: a GET against a semantic
//! [`Endpoint`] that yields a JSON document. [`HttpClient`] maps endpoints
//! onto the configured base URLs and attaches the API key, language and
//! country parameters the upstream expects.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::AppError;

/// Boxed future returned by [`RemoteClient::get_json`].
pub type JsonFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, AppError>> + Send + 'a>>;

/// Query parameters passed to an endpoint.
pub type Params = Vec<(&'static str, String)>;

/// Upstream endpoints consumed by the aggregators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FeaturedCategories,
    AppDetails,
    StoreSearch,
    PlayerSummaries,
    OwnedGames,
    PlayerAchievements,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Self::FeaturedCategories => "/api/featuredcategories",
            Self::AppDetails => "/api/appdetails",
            Self::StoreSearch => "/api/storesearch/",
            Self::PlayerSummaries => "/ISteamUser/GetPlayerSummaries/v2/",
            Self::OwnedGames => "/IPlayerService/GetOwnedGames/v1/",
            Self::PlayerAchievements => "/ISteamUserStats/GetPlayerAchievements/v1/",
        }
    }

    /// Web API endpoints are keyed; store endpoints are public.
    fn is_web_api(self) -> bool {
        matches!(
            self,
            Self::PlayerSummaries | Self::OwnedGames | Self::PlayerAchievements
        )
    }
}

/// Abstract capability to GET an endpoint and decode its JSON body.
pub trait RemoteClient: Send + Sync {
    /// Fails with `Transport` on network errors and timeouts, and with
    /// `Decode` when the body is not JSON.
    fn get_json(&self, endpoint: Endpoint, params: Params) -> JsonFuture<'_>;
}

/// [`RemoteClient`] over HTTPS using `reqwest`.
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_url(&self, endpoint: Endpoint, params: &[(&'static str, String)]) -> Result<Url, AppError> {
        let base = if endpoint.is_web_api() {
            &self.config.web_api_base_url
        } else {
            &self.config.store_base_url
        };
        let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), endpoint.path()))?;
        {
            let mut qp = url.query_pairs_mut();
            if endpoint.is_web_api() {
                qp.append_pair("key", &self.config.api_key);
                qp.append_pair("format", "json");
            } else {
                qp.append_pair("l", &self.config.language);
                qp.append_pair("cc", &self.config.country_code);
            }
            for (name, value) in params {
                qp.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn fetch(&self, endpoint: Endpoint, params: Params) -> Result<Value, AppError> {
        let url = self.build_url(endpoint, &params)?;
        debug!(?endpoint, path = url.path(), "GET");

        let text = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str(&text)
            .map_err(|e| AppError::Decode(format!("{endpoint:?} returned malformed JSON: {e}")))
    }
}

impl RemoteClient for HttpClient {
    fn get_json(&self, endpoint: Endpoint, params: Params) -> JsonFuture<'_> {
        Box::pin(self.fetch(endpoint, params))
    }
}

/// Returns the value of the first query parameter called `name`.
pub fn param<'a>(params: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_str())
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a mock HTTP server answering every request with `status` and
    /// `body`, and recording each request line.
    async fn mock_server(
        status: u16,
        body: &str,
    ) -> (String, Arc<Mutex<Vec<String>>>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_task = seen.clone();

        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let line = request.lines().next().unwrap_or_default().to_string();
                seen_task.lock().unwrap().push(line);

                let resp = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, seen, handle)
    }

    fn client_for(url: &str) -> HttpClient {
        let config = ClientConfig::new("test-key")
            .with_store_base_url(url)
            .with_web_api_base_url(url);
        HttpClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn store_endpoint_gets_language_and_country() {
        let (url, seen, handle) = mock_server(200, r#"{"specials":{"items":[]}}"#).await;

        let client = client_for(&url);
        let value = client
            .get_json(Endpoint::FeaturedCategories, Vec::new())
            .await
            .unwrap();

        assert!(value.get("specials").is_some());
        let line = seen.lock().unwrap()[0].clone();
        assert!(line.starts_with("GET /api/featuredcategories?"), "{line}");
        assert!(line.contains("l=english"), "{line}");
        assert!(line.contains("cc=US"), "{line}");
        assert!(!line.contains("key="), "{line}");

        handle.abort();
    }

    #[tokio::test]
    async fn web_api_endpoint_gets_key_and_params() {
        let (url, seen, handle) = mock_server(200, r#"{"response":{"players":[]}}"#).await;

        let client = client_for(&url);
        client
            .get_json(
                Endpoint::PlayerSummaries,
                vec![("steamids", "76561197960287930".to_string())],
            )
            .await
            .unwrap();

        let line = seen.lock().unwrap()[0].clone();
        assert!(line.contains("/ISteamUser/GetPlayerSummaries/v2/"), "{line}");
        assert!(line.contains("key=test-key"), "{line}");
        assert!(line.contains("steamids=76561197960287930"), "{line}");

        handle.abort();
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (url, _seen, handle) = mock_server(200, "<html>nope</html>").await;

        let client = client_for(&url);
        let err = client
            .get_json(Endpoint::AppDetails, vec![("appids", "10".to_string())])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DECODE");

        handle.abort();
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let (url, _seen, handle) = mock_server(429, "{}").await;
        let err = client_for(&url)
            .get_json(Endpoint::StoreSearch, vec![("term", "portal".to_string())])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMIT");
        handle.abort();

        let (url, _seen, handle) = mock_server(401, "{}").await;
        let err = client_for(&url)
            .get_json(Endpoint::OwnedGames, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        handle.abort();

        let (url, _seen, handle) = mock_server(500, "{}").await;
        let err = client_for(&url)
            .get_json(Endpoint::OwnedGames, Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client_for(&format!("http://127.0.0.1:{port}"))
            .get_json(Endpoint::FeaturedCategories, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSPORT");
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ClientConfig::new("key").with_max_concurrency(0);
        assert!(HttpClient::new(config).is_err());
    }

    #[test]
    fn param_lookup() {
        let params: Params = vec![("appids", "10".to_string()), ("cc", "US".to_string())];
        assert_eq!(param(&params, "appids"), Some("10"));
        assert_eq!(param(&params, "missing"), None);
    }
}
