//! Submission gateway: one compile request in, one report (or failure) out.
//!
//! The [`CompileGateway`] trait is the seam the session talks to, so tests can
//! inject stub gateways without a running compiler service. [`HttpGateway`]
//! is the production implementation backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::model::{CompileReport, CompileRequest};

/// Path of the compile endpoint, relative to the service base URL.
pub const DEFAULT_ENDPOINT_PATH: &str = "compiler/generate";

/// Sends a compile request and resolves with the service's report.
///
/// Implementations are stateless: the same gateway serves every submission
/// and makes exactly one outbound call per `submit`.
#[async_trait]
pub trait CompileGateway: Send + Sync {
    async fn submit(&self, request: CompileRequest) -> TransportResult<CompileReport>;
}

/// Gateway that POSTs JSON to the compiler service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpGateway {
    /// Build a gateway for `{base_url}/{endpoint_path}`.
    ///
    /// `timeout` of `None` waits for the service indefinitely.
    pub fn new(
        base_url: &str,
        endpoint_path: &str,
        timeout: Option<Duration>,
    ) -> TransportResult<Self> {
        let endpoint = resolve_endpoint(base_url, endpoint_path)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompileGateway for HttpGateway {
    async fn submit(&self, request: CompileRequest) -> TransportResult<CompileReport> {
        debug!(
            endpoint = %self.endpoint,
            parser = %request.parser_mode,
            code_len = request.code.len(),
            "Posting compile request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Compiler service rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        decode_report(&body)
    }
}

/// Strictly decode and validate a report body.
///
/// Any mismatch with the expected schema fails closed as
/// [`TransportError::Decode`].
pub fn decode_report(body: &[u8]) -> TransportResult<CompileReport> {
    let report: CompileReport =
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    report
        .validate()
        .map_err(|e| TransportError::Decode(e.to_string()))?;
    Ok(report)
}

fn resolve_endpoint(base_url: &str, endpoint_path: &str) -> TransportResult<Url> {
    // Url::join replaces the last path segment unless the base ends in '/'.
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let base = Url::parse(&base)
        .map_err(|e| TransportError::InvalidEndpoint(format!("{base_url}: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(TransportError::InvalidEndpoint(format!(
            "{base_url}: unsupported scheme '{}'",
            base.scheme()
        )));
    }
    base.join(endpoint_path.trim_start_matches('/'))
        .map_err(|e| TransportError::InvalidEndpoint(format!("{endpoint_path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_resolution() {
        let gw = HttpGateway::new("http://localhost:8000", DEFAULT_ENDPOINT_PATH, None).unwrap();
        assert_eq!(
            gw.endpoint().as_str(),
            "http://localhost:8000/compiler/generate"
        );

        let nested = HttpGateway::new("http://host/api", "/compiler/generate", None).unwrap();
        assert_eq!(nested.endpoint().as_str(), "http://host/api/compiler/generate");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = HttpGateway::new("not a url", DEFAULT_ENDPOINT_PATH, None).unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));

        let err = HttpGateway::new("ftp://host", DEFAULT_ENDPOINT_PATH, None).unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_decode_report_fails_closed() {
        assert!(matches!(
            decode_report(b"<html>502</html>"),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(
            decode_report(br#"{"diagnostics": [], "symbol_table": [], "seconds": -3}"#),
            Err(TransportError::Decode(_))
        ));
        assert!(matches!(
            decode_report(br#"{"diagnostics": [], "symbol_table": [{"id": 1}], "seconds": 0}"#),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_report_accepts_valid_body() {
        let report =
            decode_report(br#"{"diagnostics": [], "symbol_table": [], "seconds": 0.01}"#).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.elapsed_seconds, 0.01);
    }
}
