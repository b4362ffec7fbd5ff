//! Authenticated request dispatch.
//!
//! URLs are `<origin>/service/core/<version>/<path>`. GET targets the read
//! origin, PUT and DELETE the write origin. POST is tried against the read
//! origin first and retried exactly once against the write origin on any
//! failure; no other verb retries.
//!
//! Header and body logging goes through [`crate::redaction`].

use std::time::Instant;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::client::SafeguardClient;
use crate::endpoints::send_checked;
use crate::error::{ClientError, Result};
use crate::redaction::{RedactedHeaders, redact_response_body};
use crate::tracing::inject_trace_context;

/// Query, body and extra headers for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| ClientError::InvalidResponse(format!("request body: {e}")))?;
        Ok(self.body(body))
    }

    /// Set a header; a caller `Content-Type` replaces the JSON default.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl SafeguardClient {
    /// Send a request to `path` and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] with no session,
    /// [`ClientError::HttpError`] on transport failure and
    /// [`ClientError::ApiError`] on a non-success status. For POST the error
    /// is the one from the write origin attempt.
    #[instrument(skip(self, method, options), fields(method = %method))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Vec<u8>> {
        if method == Method::GET {
            let origin = self.resolve_read_origin()?;
            return self.send_once(method, &origin, path, &options).await;
        }

        if method == Method::POST {
            let read_origin = self.resolve_read_origin()?;
            match self.send_once(Method::POST, &read_origin, path, &options).await {
                Ok(body) => return Ok(body),
                Err(first) => {
                    let write_origin = self.resolve_write_origin().await?;
                    warn!(
                        error = %first,
                        read_origin = %read_origin,
                        write_origin = %write_origin,
                        path,
                        "POST failed on read origin; retrying on write origin"
                    );
                    if let Some(metrics) = self.metrics() {
                        metrics.record_failover(endpoint_label(path));
                    }
                    return self.send_once(Method::POST, &write_origin, path, &options).await;
                }
            }
        }

        let origin = self.resolve_write_origin().await?;
        self.send_once(method, &origin, path, &options).await
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.request(Method::GET, path, RequestOptions::new()).await
    }

    /// GET with query parameters.
    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let options = query
            .iter()
            .fold(RequestOptions::new(), |options, (k, v)| options.query(*k, *v));
        self.request(Method::GET, path, options).await
    }

    /// POST with an optional JSON body.
    pub async fn post(&self, path: &str, body: Option<&serde_json::Value>) -> Result<Vec<u8>> {
        let options = match body {
            Some(body) => RequestOptions::new().json(body)?,
            None => RequestOptions::new(),
        };
        self.request(Method::POST, path, options).await
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<Vec<u8>> {
        self.request(Method::PUT, path, RequestOptions::new().json(body)?)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Vec<u8>> {
        self.request(Method::DELETE, path, RequestOptions::new())
            .await
    }

    /// GET and deserialize the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("{path}: {e}")))
    }

    pub(crate) fn service_url(&self, origin: &str, path: &str) -> String {
        format!(
            "{}/service/core/{}/{}",
            origin.trim_end_matches('/'),
            self.inner.settings.api_version,
            path.trim_start_matches('/')
        )
    }

    /// One attempt against one origin.
    pub(crate) async fn send_once(
        &self,
        method: Method,
        origin: &str,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Vec<u8>> {
        let url = self.service_url(origin, path);
        let mut headers = self.request_headers(options)?;
        inject_trace_context(&mut headers);
        let endpoint = endpoint_label(path);
        let method_label = method.as_str().to_string();

        debug!(
            method = %method,
            %url,
            headers = ?RedactedHeaders(&headers),
            "Sending request"
        );

        let mut builder = self.http().request(method, &url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.body(body.clone());
        }

        if let Some(metrics) = self.metrics() {
            metrics.record_request(endpoint, &method_label);
        }
        let started = Instant::now();

        let outcome = match send_checked(builder).await {
            Ok(response) => {
                let status = response.status().as_u16();
                response
                    .bytes()
                    .await
                    .map(|bytes| (status, bytes.to_vec()))
                    .map_err(ClientError::from)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok((status, body)) => {
                if let Some(metrics) = self.metrics() {
                    metrics.record_request_duration(
                        endpoint,
                        &method_label,
                        started.elapsed(),
                        Some(status),
                    );
                }
                debug!(
                    status,
                    %url,
                    body = %redact_response_body(path, &String::from_utf8_lossy(&body)),
                    "Received response"
                );
                Ok(body)
            }
            Err(e) => {
                if let Some(metrics) = self.metrics() {
                    let status = match &e {
                        ClientError::ApiError { status, .. } => Some(*status),
                        _ => None,
                    };
                    metrics.record_request_duration(endpoint, &method_label, started.elapsed(), status);
                    metrics.record_client_error(endpoint, &method_label, &e);
                }
                Err(e)
            }
        }
    }

    fn request_headers(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let token = self
            .inner
            .session
            .session_token()
            .ok_or(ClientError::SessionExpired)?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|_| ClientError::AuthFailed("session token is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.extend(self.inner.default_headers.clone());
        headers.extend(options.headers.clone());
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }
}

/// Metrics label for a path: its first segment.
fn endpoint_label(path: &str) -> &str {
    path.trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
}
