//! Blocking `reqwest` adapter for [`HttpClient`].

use std::time::Duration;

use super::{HttpClient, HttpResponse, TransportError};

/// Real HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rampcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.inner.get(url).send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
