use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::util::build_client;
use crate::core::cache::{Cache, LOGO_TTL};
use crate::core::error::PriceError;
use crate::core::ticker::Ticker;
use crate::store::memory::MemoryCache;

pub const DEFAULT_BASE_URL: &str = "https://img.logo.dev";
pub const API_KEY_ENV: &str = "LOGO_DEV_API_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// True for the generated initials badge.
    pub fallback: bool,
}

/// Initials badge served whenever the upstream logo cannot be fetched.
pub fn fallback_logo(ticker: &Ticker) -> Logo {
    let initials: String = ticker.as_str().chars().take(4).collect();
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="48" height="48" viewBox="0 0 48 48">"#,
            r#"<rect width="48" height="48" rx="12" fill="hsl(222, 47%, 11%)" />"#,
            r#"<text x="50%" y="50%" dy="0.35em" text-anchor="middle" fill="white" "#,
            r#"font-family="Arial, sans-serif" font-size="18" font-weight="700">{}</text>"#,
            "</svg>"
        ),
        initials
    );
    Logo {
        bytes: svg.into_bytes(),
        content_type: "image/svg+xml".to_string(),
        fallback: true,
    }
}

/// Ticker logos from logo.dev, cached for a day in their own cache.
///
/// Fallback badges are not cached, so a later call retries the upstream.
pub struct LogoProvider {
    base_url: String,
    token: Option<String>,
    client: Client,
    cache: MemoryCache<Ticker, Logo>,
}

impl LogoProvider {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, PriceError> {
        Ok(LogoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client: build_client(timeout)?,
            cache: MemoryCache::new(),
        })
    }

    #[instrument(name = "LogoFetch", skip(self))]
    pub async fn logo(&self, raw_ticker: &str) -> Result<Logo, PriceError> {
        let ticker = Ticker::parse(raw_ticker)?;
        if let Some(cached) = self.cache.get(&ticker).await {
            return Ok(cached);
        }

        let Some(token) = &self.token else {
            warn!("{} is not configured", API_KEY_ENV);
            return Ok(fallback_logo(&ticker));
        };

        match self.fetch(&ticker, token).await {
            Ok(logo) => {
                self.cache.put(ticker, logo.clone(), Some(LOGO_TTL)).await;
                Ok(logo)
            }
            Err(reason) => {
                warn!("Unable to fetch logo for {}: {}", ticker, reason);
                Ok(fallback_logo(&ticker))
            }
        }
    }

    async fn fetch(&self, ticker: &Ticker, token: &str) -> Result<Logo, String> {
        let url = format!(
            "{}/ticker/{}?token={}",
            self.base_url,
            ticker.as_str().to_lowercase(),
            token
        );
        debug!("Requesting logo for {}", ticker);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| format!("Request error: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("logo.dev returned {}", response.status()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read body: {e}"))?;

        Ok(Logo {
            bytes: bytes.to_vec(),
            content_type,
            fallback: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetches_lowercase_ticker_and_caches() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ticker/aapl"))
            .and(query_param("token", "pk_test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = LogoProvider::new(
            &mock_server.uri(),
            Some("pk_test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let logo = provider.logo("AAPL").await.unwrap();
        assert_eq!(logo.content_type, "image/png");
        assert_eq!(logo.bytes, vec![0x89, b'P', b'N', b'G']);
        assert!(!logo.fallback);

        // Second call is served from the cache
        assert_eq!(provider.logo("aapl").await.unwrap(), logo);
    }

    #[tokio::test]
    async fn test_missing_token_uses_fallback() {
        let provider =
            LogoProvider::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();

        let logo = provider.logo("brk.b").await.unwrap();
        assert!(logo.fallback);
        let svg = String::from_utf8(logo.bytes).unwrap();
        assert!(svg.contains(">BRK.</text>"));
        assert!(svg.contains(r#"rx="12""#));
    }

    #[tokio::test]
    async fn test_upstream_failure_uses_fallback() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ticker/zzz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let provider = LogoProvider::new(
            &mock_server.uri(),
            Some("pk_test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let logo = provider.logo("ZZZ").await.unwrap();
        assert!(logo.fallback);
        assert!(String::from_utf8(logo.bytes).unwrap().contains(">ZZZ</text>"));
    }

    #[tokio::test]
    async fn test_empty_ticker_is_rejected() {
        let provider =
            LogoProvider::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            provider.logo("  ").await,
            Err(PriceError::InvalidInput(_))
        ));
    }
}
