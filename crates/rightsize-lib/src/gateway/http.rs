//! Prometheus-compatible HTTP gateway

use super::{async_trait, MetricsGateway, QueryOptions};
use crate::error::{Result, RightsizeError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Per-request timeout; the run deadline is enforced separately by the engine
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway speaking the Prometheus HTTP API (Prometheus, VictoriaMetrics vmselect)
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Create a gateway for an API root such as
    /// `http://vmselect:8481/select/0/prometheus`
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RightsizeError::Transport(format!("failed to create HTTP client: {e}")))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| RightsizeError::InvalidParams(format!("invalid gateway URL {base_url:?}: {e}")))?;

        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Host name of the backend, for diagnostics
    pub fn host(&self) -> Option<&str> {
        self.base_url.host_str()
    }

    /// Probe the server's `/-/healthy` endpoint at the URL root
    pub async fn check_health(&self) -> Result<String> {
        let url = self
            .base_url
            .join("/-/healthy")
            .map_err(|e| RightsizeError::InvalidParams(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RightsizeError::Transport(format!("backend unhealthy: {status}")));
        }

        Ok(status.to_string())
    }

    fn query_url(&self) -> Result<Url> {
        self.base_url
            .join("api/v1/query")
            .map_err(|e| RightsizeError::InvalidParams(e.to_string()))
    }
}

#[async_trait]
impl MetricsGateway for HttpGateway {
    async fn query(&self, opts: &QueryOptions) -> Result<Vec<u8>> {
        let url = self.query_url()?;

        let mut params: Vec<(&str, &str)> = vec![("query", opts.expr.as_str())];
        if let Some(step) = &opts.step {
            params.push(("step", step.as_str()));
        }

        debug!(url = %url, "Issuing instant query");

        let response = self.client.get(url).query(&params).send().await?;

        // Prometheus reports query errors as 4xx/5xx with a JSON body; let
        // the parser surface the reported status when there is one.
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() && !looks_like_api_error(&body) {
            return Err(RightsizeError::Transport(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(body.to_vec())
    }
}

fn looks_like_api_error(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(|s| s == "error"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_instant_vector;
    use mockito::Matcher;

    const VECTOR_BODY: &str = r#"{"status":"success","data":{"resultType":"vector","result":[
        {"metric":{"namespace":"ns","uw_cluster":"c1","container":"app"},"value":[1700000000,"0.5"]}
    ]}}"#;

    #[tokio::test]
    async fn test_query_hits_api_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/select/0/prometheus/api/v1/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "up".into()),
                Matcher::UrlEncoded("step".into(), "5m".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VECTOR_BODY)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&format!("{}/select/0/prometheus", server.url())).unwrap();
        let body = gateway
            .query(&QueryOptions::new("up").with_step("5m"))
            .await
            .unwrap();

        mock.assert_async().await;
        let parsed = parse_instant_vector(&body).unwrap();
        assert_eq!(parsed.samples.len(), 1);
    }

    #[tokio::test]
    async fn test_query_without_step_sends_only_expression() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Exact("query=up".into()))
            .with_status(200)
            .with_body(VECTOR_BODY)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        gateway.query(&QueryOptions::new("up")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let err = gateway.query(&QueryOptions::new("up")).await.unwrap_err();

        match err {
            RightsizeError::Transport(message) => {
                assert!(message.contains("502"));
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_body_reaches_parser() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#)
            .create_async()
            .await;

        let gateway = HttpGateway::new(&server.url()).unwrap();
        let body = gateway.query(&QueryOptions::new("up{")).await.unwrap();

        assert!(matches!(
            parse_instant_vector(&body),
            Err(RightsizeError::BackendStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_uses_root() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/-/healthy")
            .with_status(200)
            .with_body("OK")
            .create_async()
            .await;

        let gateway = HttpGateway::new(&format!("{}/select/0/prometheus", server.url())).unwrap();
        assert!(gateway.check_health().await.is_ok());
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            HttpGateway::new("not a url"),
            Err(RightsizeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_base_url_normalized() {
        let gateway = HttpGateway::new("http://vmselect:8481/select/0/prometheus").unwrap();
        assert_eq!(
            gateway.query_url().unwrap().as_str(),
            "http://vmselect:8481/select/0/prometheus/api/v1/query"
        );
        assert_eq!(gateway.host(), Some("vmselect"));
    }
}
