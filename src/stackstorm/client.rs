use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::StackStormError;
use super::resolver::ResolvedConnection;

const API_KEY_HEADER: &str = "St2-Api-Key";
const TEST_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const EXECUTIONS_LIMIT: &str = "50";

/// Outcome of a connectivity probe. Failures are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct StackStormClient {
    http: reqwest::Client,
}

impl StackStormClient {
    pub fn new(verify_tls: bool) -> Result<Self, StackStormError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self { http })
    }

    fn endpoint(conn: &ResolvedConnection, segments: &[&str]) -> Result<Url, StackStormError> {
        let invalid = || StackStormError::InvalidUrl(conn.url.clone());

        let mut url = Url::parse(&conn.url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        conn: &ResolvedConnection,
        url: Url,
        timeout: Duration,
    ) -> Result<reqwest::Response, StackStormError> {
        debug!("StackStorm request: GET {}", url.path());

        let mut request = self
            .http
            .get(url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(key) = conn.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.header(API_KEY_HEADER, key);
        }

        Ok(request.send().await?)
    }

    async fn api_error(response: reqwest::Response) -> StackStormError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StackStormError::Api { status, body }
    }

    /// Probes the executions endpoint with the given credential.
    pub async fn test_connection(&self, conn: &ResolvedConnection) -> ConnectionCheck {
        let outcome = match Self::endpoint(conn, &["v1", "executions"]) {
            Ok(url) => self.send(conn, url, TEST_TIMEOUT).await,
            Err(e) => Err(e),
        };

        let (success, message) = match outcome {
            Ok(response) if response.status() == StatusCode::OK => {
                (true, "Connection successful".to_string())
            }
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => (
                false,
                "Authentication failed: Invalid API key".to_string(),
            ),
            Ok(response) => (
                false,
                format!("Connection failed: HTTP {}", response.status().as_u16()),
            ),
            Err(StackStormError::Request(e)) => {
                warn!("StackStorm connection test failed: {}", e);
                (false, "Failed to connect to StackStorm server".to_string())
            }
            Err(e) => (false, e.to_string()),
        };

        ConnectionCheck { success, message }
    }

    pub async fn list_executions(
        &self,
        conn: &ResolvedConnection,
    ) -> Result<Vec<Value>, StackStormError> {
        let mut url = Self::endpoint(conn, &["v1", "executions"])?;
        url.query_pairs_mut()
            .append_pair("limit", EXECUTIONS_LIMIT)
            .append_pair("show_secrets", "false");

        let response = self.send(conn, url, REQUEST_TIMEOUT).await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED => Err(StackStormError::Unauthorized),
            _ => Err(Self::api_error(response).await),
        }
    }

    pub async fn get_execution(
        &self,
        conn: &ResolvedConnection,
        execution_id: &str,
    ) -> Result<Value, StackStormError> {
        let mut url = Self::endpoint(conn, &["v1", "executions", execution_id])?;
        url.query_pairs_mut().append_pair("show_secrets", "false");

        let response = self.send(conn, url, REQUEST_TIMEOUT).await?;
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED => Err(StackStormError::Unauthorized),
            StatusCode::NOT_FOUND => Err(StackStormError::ExecutionNotFound(
                execution_id.to_string(),
            )),
            _ => Err(Self::api_error(response).await),
        }
    }
}
