//! HTTP transport abstraction.
//!
//! The facade never talks to the network directly. It builds an
//! [`ApiRequest`] and hands it to a [`Transport`], which returns the raw
//! status, headers and body. Non-2xx statuses are ordinary responses at
//! this layer; only failures to obtain any response are errors.
//!
//! [`HttpTransport`] is the production implementation backed by a blocking
//! `reqwest` client with a fixed per-request timeout.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use supa_admin_core::QueryParams;

use crate::error::{ClientError, Result};

/// Failure to obtain a response at all (DNS, connect, timeout, ...).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP methods used by the metadata and data APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A fully described request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL without a query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Query parameters, serialized and escaped by the transport.
    pub query: QueryParams,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: QueryParams::new(),
            body: None,
        }
    }

    /// Adds a header, replacing any existing header of the same name.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Removes a header.
    pub fn without_header(mut self, name: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self
    }

    /// Merges query parameters.
    pub fn query(mut self, params: QueryParams) -> Self {
        self.query.extend(params);
        self
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the value of a header (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Raw response as returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    /// Builds a response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.to_string(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Decodes the body as JSON. An empty body decodes as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Format`] naming `operation` if the body does
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, operation: &str) -> Result<T> {
        let text = if self.body.trim().is_empty() { "null" } else { &self.body };
        serde_json::from_str(text).map_err(|e| {
            ClientError::format("JSON response", format!("{operation}: {e}"))
        })
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends requests and returns raw responses.
pub trait Transport {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] only if no response was received.
    fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text()?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
