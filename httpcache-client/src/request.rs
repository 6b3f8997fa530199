//! Request builder.

use crate::{CachingClient, ClientError, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use httpcache_core::{Body, Request, Response, Source};
use httpcache_store::CacheStore;
use serde::Serialize;
use std::time::Duration;

/// Request builder for a [`CachingClient`].
pub struct RequestBuilder<'a, S> {
    client: &'a CachingClient<S>,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl<'a, S> RequestBuilder<'a, S>
where
    S: CacheStore + 'static,
{
    pub(crate) fn new(client: &'a CachingClient<S>, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Add a header to the request. Invalid names or values are ignored.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add multiple headers to the request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add multiple query parameters.
    pub fn queries<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            self.query.push((k.into(), v.into()));
        }
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body = Some(text.into().into_bytes());
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: Serialize>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(bytes);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize JSON body");
            }
        }
        self
    }

    /// Set the request body as form data.
    pub fn form<T: Serialize>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(encoded) => {
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                self.body = Some(encoded.into_bytes());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode form data");
            }
        }
        self
    }

    /// Limit how long the whole exchange may take, cache lookup included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ask for a response revalidated with the origin.
    pub fn no_cache(self) -> Self {
        self.header("Cache-Control", "no-cache")
    }

    /// Set bearer authentication.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Set basic authentication.
    pub fn basic_auth(
        self,
        username: impl Into<String>,
        password: Option<impl Into<String>>,
    ) -> Self {
        use base64::Engine;
        let credentials = match password {
            Some(p) => format!("{}:{}", username.into(), p.into()),
            None => format!("{}:", username.into()),
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    fn build_url(&self) -> Result<url::Url> {
        let mut url = if let Some(base) = &self.client.config().base_url {
            let base = url::Url::parse(base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
            base.join(&self.url)
                .map_err(|e| ClientError::InvalidUrl(e.to_string()))?
        } else {
            url::Url::parse(&self.url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?
        };

        if !self.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Build the request without sending it.
    pub fn build(&self) -> Result<Request> {
        let url = self.build_url()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.client.config().default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| ClientError::RequestBuild(e.to_string()))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| ClientError::RequestBuild(e.to_string()))?;
            headers.append(name, value);
        }
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }

        let body = self.body.clone().map(Body::from).unwrap_or_default();
        Ok(Request {
            method: self.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Send the request.
    pub async fn send(self) -> Result<Response> {
        let (response, _) = self.send_with_source().await?;
        Ok(response)
    }

    /// Send the request and report whether the cache answered it.
    pub async fn send_with_source(self) -> Result<(Response, Source)> {
        let request = self.build()?;
        let exchange = self.client.execute_with_source(request);

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => exchange.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;

    fn client(config: ClientConfig) -> CachingClient {
        CachingClient::in_memory(config).unwrap()
    }

    #[test]
    fn test_build_joins_base_url_and_query() {
        let client = client(ClientConfig::builder().base_url("https://api.example.com/v1/").build());
        let request = client
            .get("users")
            .query("page", "2")
            .queries([("sort", "name")])
            .build()
            .unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://api.example.com/v1/users?page=2&sort=name"
        );
    }

    #[test]
    fn test_request_headers_override_defaults() {
        let client = client(
            ClientConfig::builder()
                .default_header("Accept", "text/html")
                .default_header("X-Client", "tests")
                .build(),
        );
        let request = client
            .get("https://example.com/")
            .header("Accept", "application/json")
            .build()
            .unwrap();

        assert_eq!(request.headers.get("accept").unwrap(), "application/json");
        assert_eq!(request.headers.get_all("accept").iter().count(), 1);
        assert_eq!(request.headers.get("x-client").unwrap(), "tests");
    }

    #[test]
    fn test_basic_auth_and_json_body() {
        let client = client(ClientConfig::default());
        let request = client
            .post("https://example.com/items")
            .basic_auth("user", Some("pass"))
            .json(&serde_json::json!({"name": "widget"}))
            .build()
            .unwrap();

        assert_eq!(
            request.headers.get("authorization").unwrap(),
            "Basic dXNlcjpwYXNz"
        );
        assert_eq!(
            request.headers.get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(request.body.as_bytes().unwrap(), br#"{"name":"widget"}"#);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let client = client(ClientConfig::default());
        let err = client.get("not a url").build().unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }
}
