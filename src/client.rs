// src/client.rs

use reqwest::{Client, Response, Url};
use std::time::{Duration, Instant};

use crate::errors::Result;

/// The parts of an HTTP response that a check looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP calls a `Test` makes against NodeNorm and NameRes.
///
/// Implemented over `reqwest` for real runs; tests substitute canned replies.
pub trait LookupClient: Send + Sync {
    /// Sends a GET request and returns the response without interpreting it.
    fn get(&self, url: Url) -> impl std::future::Future<Output = Result<HttpReply>> + Send;

    /// Sends a body-less POST request and returns the response without interpreting it.
    fn post(&self, url: Url) -> impl std::future::Future<Output = Result<HttpReply>> + Send;
}

/// A `LookupClient` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpLookupClient {
    client: Client,
}

impl HttpLookupClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("babel-validation/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::new(client))
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn read(response: Response, start: Instant) -> Result<HttpReply> {
        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;
        log::debug!("{} responded {} ({}ms)", response.url(), status, latency_ms);

        let body = response.text().await?;
        Ok(HttpReply {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

impl LookupClient for HttpLookupClient {
    async fn get(&self, url: Url) -> Result<HttpReply> {
        log::debug!("GET {}", url);
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        Self::read(response, start).await
    }

    async fn post(&self, url: Url) -> Result<HttpReply> {
        log::debug!("POST {}", url);
        let start = Instant::now();
        let response = self.client.post(url).send().await?;
        Self::read(response, start).await
    }
}

/// Joins a service base URL and an API path, tolerating a trailing slash on
/// the base.
pub fn endpoint_url(endpoint: &str, path: &str) -> std::result::Result<Url, String> {
    let joined = format!("{}/{}", endpoint.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| format!("invalid endpoint URL '{}': {}", endpoint, e))
}

#[cfg(test)]
pub(crate) mod canned {
    use super::*;
    use crate::errors::ValidationError;
    use std::sync::Mutex;

    type Canned = std::result::Result<HttpReply, String>;

    /// Replies to every GET with one response and every POST with another,
    /// recording the URLs it was asked for.
    pub(crate) struct CannedClient {
        get_reply: Canned,
        post_reply: Canned,
        pub(crate) requests: Mutex<Vec<(String, String)>>,
    }

    fn ok(status: u16, body: &str) -> Canned {
        Ok(HttpReply {
            status,
            status_text: if status == 200 { "OK" } else { "Not Found" }.to_string(),
            body: body.to_string(),
        })
    }

    impl CannedClient {
        fn both(reply: Canned) -> Self {
            Self {
                get_reply: reply.clone(),
                post_reply: reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn json(body: serde_json::Value) -> Self {
            Self::status(200, &body.to_string())
        }

        pub(crate) fn status(status: u16, body: &str) -> Self {
            Self::both(ok(status, body))
        }

        pub(crate) fn unreachable(message: &str) -> Self {
            Self::both(Err(message.to_string()))
        }

        /// NodeNorm answers GETs with `get_body`, NameRes answers POSTs with
        /// `post_body`.
        pub(crate) fn routed(get_body: serde_json::Value, post_body: serde_json::Value) -> Self {
            Self {
                get_reply: ok(200, &get_body.to_string()),
                post_reply: ok(200, &post_body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn answer(&self, method: &str, url: Url) -> Result<HttpReply> {
            self.requests.lock().unwrap().push((method.to_string(), url.to_string()));
            let reply = if method == "POST" { &self.post_reply } else { &self.get_reply };
            reply.clone().map_err(ValidationError::Config)
        }
    }

    impl LookupClient for CannedClient {
        async fn get(&self, url: Url) -> Result<HttpReply> {
            self.answer("GET", url)
        }

        async fn post(&self, url: Url) -> Result<HttpReply> {
            self.answer("POST", url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_tolerates_trailing_slash() {
        let a = endpoint_url("https://nodenorm.transltr.io/", "get_normalized_nodes").unwrap();
        let b = endpoint_url("https://nodenorm.transltr.io", "get_normalized_nodes").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://nodenorm.transltr.io/get_normalized_nodes");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(endpoint_url("not a url", "lookup").is_err());
    }

    #[test]
    fn test_reply_success_range() {
        let reply = HttpReply { status: 204, status_text: "No Content".into(), body: String::new() };
        assert!(reply.is_success());
        let reply = HttpReply { status: 502, status_text: "Bad Gateway".into(), body: String::new() };
        assert!(!reply.is_success());
    }
}
