//! HTTP transport
//!
//! The API client talks to the network through the [`Transport`] trait so the
//! auth-retry protocol can be driven by a scripted transport in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::BridgeError;

/// Fixed wall-clock bound on every API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Request parameters, encoded according to the request's [`Encoding`]
pub type Params = serde_json::Map<String, Value>;

/// HTTP verbs used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
}

impl Verb {
    pub fn method(&self) -> http::Method {
        match self {
            Verb::Get => http::Method::GET,
            Verb::Post => http::Method::POST,
            Verb::Put => http::Method::PUT,
            Verb::Patch => http::Method::PATCH,
        }
    }

    /// Parameter encoding the vendor expects for this verb
    pub fn default_encoding(&self) -> Encoding {
        match self {
            Verb::Get => Encoding::Query,
            Verb::Post => Encoding::Form,
            Verb::Put | Verb::Patch => Encoding::Json,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

/// Where and how request parameters travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// URL query string
    Query,
    /// `application/x-www-form-urlencoded` body
    Form,
    /// JSON body
    Json,
}

impl Encoding {
    fn apply(&self, builder: RequestBuilder, params: &Params) -> RequestBuilder {
        match self {
            Encoding::Query => builder.query(&string_pairs(params)),
            Encoding::Form => builder.form(&string_pairs(params)),
            Encoding::Json => builder.json(params),
        }
    }
}

/// Flatten parameters into string pairs; strings are sent without quotes
pub fn string_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// One API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub verb: Verb,
    pub path: String,
    pub params: Params,
    pub encoding: Encoding,
}

impl ApiRequest {
    pub fn new(verb: Verb, path: impl Into<String>, params: Params) -> Self {
        Self {
            verb,
            path: path.into(),
            params,
            encoding: verb.default_encoding(),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// String value of a parameter, for assertions and logging
    pub fn param(&self, key: &str) -> Option<String> {
        self.params.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Sends a request and returns the decoded JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<Value, BridgeError>;
}

/// Transport backed by a shared `reqwest` client
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, BridgeError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.verb, request.path);

        let builder = self.client.request(request.verb.method(), &url);
        let response = request
            .encoding
            .apply(builder, &request.params)
            .send()
            .await
            .map_err(|e| transport_error(e, request))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(e, request))?;

        // The API reports business errors as JSON even on non-2xx statuses
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(_) => {
                error!("{} {} returned a non-JSON body ({})", request.verb, request.path, status);
                Err(BridgeError::UnexpectedResponse(format!("{}: {}", status, body)))
            }
        }
    }
}

fn transport_error(err: reqwest::Error, request: &ApiRequest) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout(format!("{} {}", request.verb, request.path))
    } else {
        BridgeError::HttpError(err)
    }
}
