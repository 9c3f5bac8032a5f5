//! Re-delivery of captured requests to an arbitrary target.
//!
//! The engine never touches the store: callers read the event, release the
//! store, await [`ReplayEngine::replay`], and only then record the outcome.

use std::time::Duration;

use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde_json::{Map, Value};
use tracing::{info_span, Instrument};
use url::Url;

use crate::domain::{HeaderMultiMap, QueryMultiMap, ReplayResult};

pub const DEFAULT_REPLAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Headers that describe the original exchange rather than the payload.
const SKIPPED_HEADERS: [&str; 3] = ["host", "content-length", "transfer-encoding"];

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error("invalid target url: {0}")]
    InvalidTarget(String),
    #[error("failed to prepare request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    TransportFailure(#[from] reqwest::Error),
}

/// A captured request to be sent again.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySource<'a> {
    pub method: &'a str,
    pub headers: &'a HeaderMultiMap,
    pub query_params: &'a QueryMultiMap,
    pub body: &'a Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ReplayEngine {
    client: reqwest::Client,
}

impl ReplayEngine {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Uses a caller-built client; its timeout is the caller's concern.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Sends `source` to `target_url` and reports how the exchange went.
    ///
    /// Any answer from the target, including 4xx and 5xx, is a success. Only a
    /// bad target or a transport failure yields `success: false`.
    pub async fn replay(&self, source: ReplaySource<'_>, target_url: &str) -> ReplayResult {
        let span = info_span!("replay", method = %source.method, target = %target_url);

        async move {
            let request = match self.build(source, target_url) {
                Ok(request) => request,
                Err(err) => {
                    tracing::debug!(error = %err, "replay rejected before dispatch");
                    return ReplayResult::failed(None, err.to_string());
                }
            };

            let replayed_at = Utc::now();
            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::debug!(status, "replay delivered");
                    ReplayResult::delivered(replayed_at, status)
                }
                Err(err) => {
                    let err = ReplayError::from(err);
                    tracing::warn!(error = %err, "replay transport failure");
                    ReplayResult::failed(Some(replayed_at), err.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    fn build(
        &self,
        source: ReplaySource<'_>,
        target_url: &str,
    ) -> Result<reqwest::Request, ReplayError> {
        let url = build_target_url(target_url, source.query_params)?;
        let method = Method::from_bytes(source.method.as_bytes())
            .map_err(|_| ReplayError::InvalidRequest(format!("invalid method {}", source.method)))?;
        let headers = forwarded_headers(source.headers)?;
        let body = serde_json::to_vec(source.body)
            .map_err(|err| ReplayError::InvalidRequest(err.to_string()))?;

        self.client
            .request(method, url)
            .headers(headers)
            .body(body)
            .build()
            .map_err(|err| ReplayError::InvalidRequest(err.to_string()))
    }
}

/// Parses the target and appends the captured query after any query it
/// already carries.
fn build_target_url(target_url: &str, query_params: &QueryMultiMap) -> Result<Url, ReplayError> {
    let mut url =
        Url::parse(target_url).map_err(|err| ReplayError::InvalidTarget(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ReplayError::InvalidTarget(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    if query_params.values().any(|values| !values.is_empty()) {
        let mut pairs = url.query_pairs_mut();
        for (key, values) in query_params {
            for value in values {
                pairs.append_pair(key, value);
            }
        }
    }
    Ok(url)
}

fn forwarded_headers(captured: &HeaderMultiMap) -> Result<HeaderMap, ReplayError> {
    let mut headers = HeaderMap::new();
    for (name, values) in captured {
        if SKIPPED_HEADERS
            .iter()
            .any(|skipped| name.eq_ignore_ascii_case(skipped))
        {
            continue;
        }

        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ReplayError::InvalidRequest(format!("invalid header name {name}")))?;
        for value in values {
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                ReplayError::InvalidRequest(format!("invalid value for header {name}"))
            })?;
            headers.append(header_name.clone(), header_value);
        }
    }
    Ok(headers)
}
