//! HTTP listing source
//!
//! This module talks to a paginated post listing service:
//! - `GET {base}/profiles/{profile}/posts[?cursor=...]`
//! - each page is `{"items": [...], "next_cursor": "..." | null}`
//! - HTTP 429 maps to a rate-limit signal (honoring `Retry-After`)
//! - HTTP 404 maps to an unknown profile
//! - anything else that is not a success is transient

use crate::source::{Credential, PostListing, PostSource, RawPost, SourceError, SourceResult};
use async_trait::async_trait;
use reqwest::header::{COOKIE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

/// One page of a profile listing
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    items: Vec<RawPost>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Post source backed by an HTTP listing service
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// Creates a source for `base_url` identifying itself as `user_agent`
    ///
    /// # Returns
    ///
    /// * `Ok(HttpSource)` - Source ready to open listings
    /// * `Err(SourceError)` - The URL is unusable or the client failed to build
    pub fn new(base_url: &str, user_agent: &str) -> SourceResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SourceError::Transient(format!("invalid base url: {}", e)))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| SourceError::Transient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn listing_url(&self, profile: &str) -> SourceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Transient("base url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["profiles", profile, "posts"]);
        Ok(url)
    }
}

#[async_trait]
impl PostSource for HttpSource {
    async fn open_listing(
        &self,
        profile: &str,
        credential: &Credential,
    ) -> SourceResult<Box<dyn PostListing>> {
        let mut listing = HttpListing {
            client: self.client.clone(),
            url: self.listing_url(profile)?,
            profile: profile.to_string(),
            token: credential.token.clone(),
            buffer: VecDeque::new(),
            next_cursor: None,
            exhausted: false,
        };

        // The first page doubles as the existence check for the profile
        listing.fetch_page().await?;

        tracing::debug!(
            "Opened listing for {} with session {}",
            profile,
            credential.name
        );
        Ok(Box::new(listing))
    }
}

/// Cursor-driven listing over the HTTP service
struct HttpListing {
    client: Client,
    url: Url,
    profile: String,
    token: Option<String>,
    buffer: VecDeque<RawPost>,
    next_cursor: Option<String>,
    exhausted: bool,
}

impl HttpListing {
    async fn fetch_page(&mut self) -> SourceResult<()> {
        let mut request = self.client.get(self.url.clone());
        if let Some(cursor) = &self.next_cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        if let Some(token) = &self.token {
            request = request.header(COOKIE, format!("sessionid={}", token));
        }

        let response = request.send().await.map_err(classify_request_error)?;
        let response = check_status(response, &self.profile)?;

        let page: ListingPage = response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("malformed listing page: {}", e)))?;

        tracing::trace!(
            "Fetched {} posts for {} (more: {})",
            page.items.len(),
            self.profile,
            page.next_cursor.is_some()
        );

        // An empty page handing back the cursor it was asked for never advances
        let stuck = page.items.is_empty()
            && page.next_cursor.is_some()
            && page.next_cursor == self.next_cursor;
        if stuck {
            return Err(SourceError::Transient(format!(
                "listing for {} is stuck on an empty page",
                self.profile
            )));
        }

        self.buffer.extend(page.items);
        self.exhausted = page.next_cursor.is_none();
        self.next_cursor = page.next_cursor;
        Ok(())
    }
}

#[async_trait]
impl PostListing for HttpListing {
    async fn next_post(&mut self) -> SourceResult<Option<RawPost>> {
        // Pages may legitimately be empty while a cursor is still offered
        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }
}

/// Maps a response status onto the source error taxonomy
fn check_status(response: Response, profile: &str) -> SourceResult<Response> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(SourceError::RateLimited { retry_after });
    }

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::ProfileNotFound(profile.to_string()));
    }

    if !status.is_success() {
        return Err(SourceError::Transient(format!("HTTP {}", status.as_u16())));
    }

    Ok(response)
}

fn classify_request_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Transient("request timeout".to_string())
    } else if e.is_connect() {
        SourceError::Transient("connection refused".to_string())
    } else {
        SourceError::Transient(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "typename": "GraphImage",
            "display_url": format!("https://cdn.example.com/{}.jpg", id),
            "likes": 1,
            "comments": 0,
            "taken_at": "2024-01-01T00:00:00Z"
        })
    }

    async fn drain(listing: &mut Box<dyn PostListing>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(post) = listing.next_post().await.unwrap() {
            ids.push(post.id);
        }
        ids
    }

    #[test]
    fn test_listing_url() {
        let source = HttpSource::new("https://feeds.example.com/v1/", "test").unwrap();
        let url = source.listing_url("nasa").unwrap();
        assert_eq!(url.as_str(), "https://feeds.example.com/v1/profiles/nasa/posts");
    }

    #[tokio::test]
    async fn test_listing_follows_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/profiles/nasa/posts"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("c")],
                "next_cursor": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/profiles/nasa/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("a"), item("b")],
                "next_cursor": "page2"
            })))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let mut listing = source
            .open_listing("nasa", &Credential::anonymous("alpha"))
            .await
            .unwrap();

        assert_eq!(drain(&mut listing).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_repeated_empty_page_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/profiles/nasa/posts"))
            .and(query_param("cursor", "loop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "next_cursor": "loop"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/profiles/nasa/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("a")],
                "next_cursor": "loop"
            })))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let mut listing = source
            .open_listing("nasa", &Credential::anonymous("alpha"))
            .await
            .unwrap();

        assert_eq!(listing.next_post().await.unwrap().unwrap().id, "a");
        assert!(matches!(
            listing.next_post().await,
            Err(SourceError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_session_token_sent_as_cookie() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/profiles/nasa/posts"))
            .and(header("cookie", "sessionid=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [item("a")],
                "next_cursor": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let credential = Credential::new("alpha", Some("secret".to_string()));
        let mut listing = source.open_listing("nasa", &credential).await.unwrap();
        assert_eq!(drain(&mut listing).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_rate_limit_with_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let result = source
            .open_listing("nasa", &Credential::anonymous("alpha"))
            .await;

        match result {
            Err(SourceError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
            }
            _ => panic!("expected rate limit"),
        }
    }

    #[tokio::test]
    async fn test_unknown_profile() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let result = source
            .open_listing("ghost", &Credential::anonymous("alpha"))
            .await;

        assert!(matches!(result, Err(SourceError::ProfileNotFound(p)) if p == "ghost"));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let result = source
            .open_listing("nasa", &Credential::anonymous("alpha"))
            .await;

        assert!(matches!(result, Err(SourceError::Transient(_))));
    }

    #[tokio::test]
    async fn test_malformed_page_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), "test").unwrap();
        let result = source
            .open_listing("nasa", &Credential::anonymous("alpha"))
            .await;

        assert!(matches!(result, Err(SourceError::Transient(_))));
    }
}
