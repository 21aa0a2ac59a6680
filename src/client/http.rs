//! HTTP implementation of the content source

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::document::{ApiInfo, Cursor, SearchResponse};
use super::query::{render_q, Predicate, QueryOptions};
use super::ContentSource;
use crate::config::SiteConfig;
use crate::error::FetchError;

/// Master ref and when it was looked up
#[derive(Debug, Clone)]
struct CachedRef {
    value: String,
    fetched_at: Instant,
}

/// Content repository client over its REST API
#[derive(Clone)]
pub struct HttpContentClient {
    http: Client,
    endpoint: String,
    access_token: Option<String>,
    ref_ttl: Duration,
    master_ref: Arc<Mutex<Option<CachedRef>>>,
}

impl HttpContentClient {
    /// Create a client for an API endpoint (`https://<repo>.cdn.prismic.io/api/v2`)
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self, FetchError> {
        Self::build(endpoint, access_token, Duration::from_secs(10), Duration::from_secs(5))
    }

    /// Create a client from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, FetchError> {
        Self::build(
            &config.api_endpoint,
            config.access_token.clone().filter(|t| !t.is_empty()),
            config.request_timeout(),
            Duration::from_secs(config.ref_ttl),
        )
    }

    fn build(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
        ref_ttl: Duration,
    ) -> Result<Self, FetchError> {
        // Validate early so a bad endpoint fails at startup
        Url::parse(endpoint)?;

        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
            ref_ttl,
            master_ref: Arc::new(Mutex::new(None)),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("spacetraveling/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The published content version, cached for `ref_ttl`
    pub async fn master_ref(&self) -> Result<String, FetchError> {
        if let Some(cached) = self.cached_ref() {
            return Ok(cached);
        }

        let url = self.with_token(Url::parse(&self.endpoint)?);
        let info: ApiInfo = self.get_json(url).await?;
        let master = info
            .master_ref()
            .ok_or(FetchError::MissingMasterRef)?
            .to_string();

        tracing::debug!("Resolved master ref {}", master);
        if let Ok(mut slot) = self.master_ref.lock() {
            *slot = Some(CachedRef {
                value: master.clone(),
                fetched_at: Instant::now(),
            });
        }

        Ok(master)
    }

    fn cached_ref(&self) -> Option<String> {
        let slot = self.master_ref.lock().ok()?;
        slot.as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ref_ttl)
            .map(|c| c.value.clone())
    }

    /// Build the search URL for a query pinned to `reference`
    pub fn search_url(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
        reference: &str,
    ) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/documents/search", self.endpoint))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);
            if !predicates.is_empty() {
                pairs.append_pair("q", &render_q(predicates));
            }
            if let Some(size) = options.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if let Some(after) = &options.after {
                pairs.append_pair("after", after);
            }
            if let Some(ordering) = &options.orderings {
                pairs.append_pair("orderings", &ordering.to_string());
            }
            if !options.fetch.is_empty() {
                pairs.append_pair("fetch", &options.fetch.join(","));
            }
        }
        Ok(self.with_token(url))
    }

    /// Append the access token unless the URL already carries one
    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            let present = url.query_pairs().any(|(k, _)| k == "access_token");
            if !present {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ContentSource for HttpContentClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, FetchError> {
        let reference = match &options.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };
        let url = self.search_url(predicates, options, &reference)?;
        self.get_json(url).await
    }

    async fn fetch_page(&self, cursor: &Cursor) -> Result<SearchResponse, FetchError> {
        let url = self.with_token(Url::parse(cursor.as_str())?);
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Ordering;
    use httpmock::prelude::*;

    const API_INFO: &str =
        r#"{"refs": [{"id": "master", "ref": "MASTER", "label": "Master", "isMasterRef": true}]}"#;

    fn client(server: &MockServer, token: Option<&str>) -> HttpContentClient {
        HttpContentClient::new(&server.url("/api/v2"), token.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_search_url() {
        let client = HttpContentClient::new("https://repo.cdn.prismic.io/api/v2/", None).unwrap();
        let options = QueryOptions::new()
            .page_size(1)
            .after("YF0a")
            .orderings(Ordering::last_publication(true));
        let url = client
            .search_url(&[Predicate::document_type("post")], &options, "MASTER")
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/api/v2/documents/search");
        assert!(pairs.contains(&("ref".into(), "MASTER".into())));
        assert!(pairs.contains(&("q".into(), r#"[[at(document.type, "post")]]"#.into())));
        assert!(pairs.contains(&("pageSize".into(), "1".into())));
        assert!(pairs.contains(&("after".into(), "YF0a".into())));
        assert!(pairs.contains(&(
            "orderings".into(),
            "[document.last_publication_date desc]".into()
        )));
    }

    #[tokio::test]
    async fn test_query_resolves_master_ref() {
        let server = MockServer::start_async().await;
        let api = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(API_INFO);
            })
            .await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/documents/search")
                    .query_param("ref", "MASTER")
                    .query_param("q", r#"[[at(document.type, "post")]]"#)
                    .query_param("pageSize", "10")
                    .query_param("fetch", "post.title,post.subtitle");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"results": [{"id": "1", "uid": "a", "type": "post", "data": {}}], "next_page": null}"#);
            })
            .await;

        let client = client(&server, None);
        let options = QueryOptions::new()
            .fetch(["post.title", "post.subtitle"])
            .page_size(10);
        let response = client
            .query(&[Predicate::document_type("post")], &options)
            .await
            .unwrap();

        // Second query reuses the cached master ref
        client
            .query(&[Predicate::document_type("post")], &options)
            .await
            .unwrap();

        api.assert_hits_async(1).await;
        search.assert_hits_async(2).await;
        assert_eq!(response.results.len(), 1);
        assert!(response.next_cursor().is_none());
    }

    #[tokio::test]
    async fn test_query_with_preview_ref_skips_api_lookup() {
        let server = MockServer::start_async().await;
        let api = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2");
                then.status(200).body(API_INFO);
            })
            .await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/documents/search")
                    .query_param("ref", "PREVIEW");
                then.status(200).body(r#"{"results": []}"#);
            })
            .await;

        let client = client(&server, None);
        let options = QueryOptions::new().reference(Some("PREVIEW"));
        client
            .query(&[Predicate::document_type("post")], &options)
            .await
            .unwrap();

        api.assert_hits_async(0).await;
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_appends_access_token() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v2/documents/search")
                    .query_param("page", "2")
                    .query_param("access_token", "secret");
                then.status(200).body(r#"{"results": [], "next_page": null}"#);
            })
            .await;

        let client = client(&server, Some("secret"));
        let cursor = Cursor::new(server.url("/api/v2/documents/search?page=2"));
        let response = client.fetch_page(&cursor).await.unwrap();

        page.assert_async().await;
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/documents/search");
                then.status(404).body(r#"{"error": "unknown ref"}"#);
            })
            .await;

        let client = client(&server, None);
        let cursor = Cursor::new(server.url("/api/v2/documents/search?ref=bogus"));
        let err = client.fetch_page(&cursor).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_invalid_body_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v2/documents/search");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = client(&server, None);
        let cursor = Cursor::new(server.url("/api/v2/documents/search"));
        let err = client.fetch_page(&cursor).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
