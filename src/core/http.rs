//! HTTP probes against the deployed service.
//!
//! One request in, status and body out. Every check the health gate and the
//! conformance runner make goes through [`HttpProbe`] so tests can script the
//! service instead of running it.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            body: Some(body),
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

pub trait HttpProbe {
    /// Issue one request. Errors only when no response came back at all.
    fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse>;
}

/// Blocking reqwest client with a fixed per-request timeout.
pub struct ProbeClient {
    client: Client,
}

impl ProbeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal_unexpected(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpProbe for ProbeClient {
    fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| Error::http_request_failed(request.method.as_str(), &request.url, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| Error::http_request_failed(request.method.as_str(), &request.url, e.to_string()))?;

        Ok(ProbeResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn method_serializes_uppercase() {
        let method: Method = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(method, Method::Post);
        assert_eq!(serde_json::to_string(&Method::Get).unwrap(), "\"GET\"");
    }

    #[test]
    fn response_json_tolerates_non_json() {
        let ok = ProbeResponse {
            status: 200,
            body: r#"{"data":{"id":1}}"#.to_string(),
        };
        assert_eq!(ok.json().unwrap()["data"]["id"], 1);

        let text = ProbeResponse {
            status: 200,
            body: "OK".to_string(),
        };
        assert!(text.json().is_none());
    }

    #[test]
    fn unreachable_service_is_a_request_error() {
        let client = ProbeClient::new(Duration::from_secs(2)).unwrap();
        let err = client.send(&ProbeRequest::get("http://127.0.0.1:1/health")).unwrap_err();
        assert_eq!(err.code, ErrorCode::HttpRequestFailed);
        assert_eq!(err.details["method"], "GET");
    }

    #[test]
    fn bearer_is_attached() {
        let req = ProbeRequest::get("http://h/api/user/profile").with_bearer("tok");
        assert_eq!(req.bearer.as_deref(), Some("tok"));
        assert!(req.body.is_none());
    }
}
