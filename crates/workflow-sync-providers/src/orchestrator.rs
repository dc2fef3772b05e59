// crates/workflow-sync-providers/src/orchestrator.rs
// ============================================================================
// Module: HTTP Orchestrator Client
// Description: Airflow-compatible REST client for one cluster.
// Purpose: List, trigger, stop, and pause orchestrated runs over HTTP.
// Dependencies: workflow-sync-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpOrchestratorConnector`] builds one [`HttpOrchestratorClient`] per
//! cluster. Requests carry the cluster credential, never follow redirects,
//! and read at most `max_response_bytes` of any body. Transport failures,
//! timeouts, 429, and 5xx responses are retried under the injected
//! [`RetryPolicy`]; every other failure is returned on first sight.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use workflow_sync_core::ClusterConfig;
use workflow_sync_core::ClusterCredential;
use workflow_sync_core::ExternalRun;
use workflow_sync_core::ExternalRunId;
use workflow_sync_core::ExternalRunState;
use workflow_sync_core::OrchestratorClient;
use workflow_sync_core::OrchestratorConnector;
use workflow_sync_core::OrchestratorError;
use workflow_sync_core::RetryPolicy;
use workflow_sync_core::RunId;
use workflow_sync_core::TeamId;
use workflow_sync_core::Timestamp;
use workflow_sync_core::WorkflowName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum bytes of an error body quoted in [`OrchestratorError::Status`].
const MAX_ERROR_EXCERPT: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Settings shared by every cluster client.
///
/// # Invariants
/// - `allow_http = false` rejects `http://` cluster endpoints.
/// - `max_response_bytes` bounds every response body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOrchestratorConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// User agent for outbound requests.
    pub user_agent: String,
    /// Allow cleartext HTTP endpoints.
    pub allow_http: bool,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// Retry policy for retryable failures.
    pub retry: RetryPolicy,
}

impl Default for HttpOrchestratorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 2_000,
            request_timeout_ms: 10_000,
            user_agent: format!("workflow-sync/{}", env!("CARGO_PKG_VERSION")),
            allow_http: false,
            max_response_bytes: 4 * 1024 * 1024,
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Builds HTTP clients for clusters.
#[derive(Debug, Clone)]
pub struct HttpOrchestratorConnector {
    /// Shared client settings.
    config: HttpOrchestratorConfig,
}

impl HttpOrchestratorConnector {
    /// Creates a connector with the given settings.
    #[must_use]
    pub const fn new(config: HttpOrchestratorConfig) -> Self {
        Self {
            config,
        }
    }
}

impl OrchestratorConnector for HttpOrchestratorConnector {
    fn connect(
        &self,
        cluster: &ClusterConfig,
    ) -> Result<Box<dyn OrchestratorClient>, OrchestratorError> {
        Ok(Box::new(HttpOrchestratorClient::new(cluster, self.config.clone())?))
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Orchestrator client bound to one cluster endpoint.
pub struct HttpOrchestratorClient {
    /// Cluster owner, used in error context.
    team: TeamId,
    /// Base URL of the orchestrator.
    base: Url,
    /// Credential applied to every request.
    credential: ClusterCredential,
    /// Underlying blocking HTTP client.
    client: Client,
    /// Client settings.
    config: HttpOrchestratorConfig,
}

impl HttpOrchestratorClient {
    /// Creates a client for `cluster`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Invalid`] when the endpoint is unusable or
    /// the HTTP client cannot be built.
    pub fn new(
        cluster: &ClusterConfig,
        config: HttpOrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        let base = parse_endpoint(&cluster.endpoint, config.allow_http)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| OrchestratorError::Invalid(format!("http client build failed: {err}")))?;
        Ok(Self {
            team: cluster.team.clone(),
            base,
            credential: cluster.credential.clone(),
            client,
            config,
        })
    }

    /// Returns the team that owns this client's cluster.
    #[must_use]
    pub const fn team(&self) -> &TeamId {
        &self.team
    }

    /// Builds `{base}/api/v1/{segments...}` with each segment escaped.
    fn url(&self, segments: &[&str]) -> Result<Url, OrchestratorError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| OrchestratorError::Invalid("endpoint cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    /// Sends one request with credentials and an optional JSON body.
    fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, OrchestratorError> {
        let mut request =
            self.client.request(method.clone(), url.clone()).header(ACCEPT, "application/json");
        request = apply_credential(request, &self.credential);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body.to_vec());
        }
        let mut response = request.send().map_err(|err| classify_transport(&err))?;
        if response.url() != url {
            return Err(OrchestratorError::Transport("redirect not allowed".to_string()));
        }
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(OrchestratorError::Auth(status.as_u16()));
        }
        if !status.is_success() {
            let excerpt = read_response_limited(&mut response, MAX_ERROR_EXCERPT)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            return Err(OrchestratorError::Status {
                status: status.as_u16(),
                message: excerpt,
            });
        }
        read_response_limited(&mut response, self.config.max_response_bytes)
    }

    /// Sends a request, retrying retryable failures under the policy.
    fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<Vec<u8>, OrchestratorError> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| OrchestratorError::Invalid(format!("request encoding failed: {err}")))?;
        let mut attempt = 1;
        loop {
            match self.send_once(method, url, body.as_deref()) {
                Err(err) if err.is_retryable() && self.config.retry.allows_retry(attempt) => {
                    thread::sleep(self.config.retry.backoff(attempt));
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Sends a request and decodes a JSON response.
    fn send_json<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<T, OrchestratorError> {
        let bytes = self.send(method, url, body)?;
        serde_json::from_slice(&bytes).map_err(|err| OrchestratorError::Malformed(err.to_string()))
    }

    /// Loads one run by workflow and external id.
    fn fetch_run(
        &self,
        workflow: &WorkflowName,
        external_id: &str,
    ) -> Result<ExternalRun, OrchestratorError> {
        let url = self.url(&["dags", workflow.as_str(), "dagRuns", external_id])?;
        let run: DagRun = self.send_json(&Method::GET, &url, None)?;
        run.into_external()
    }
}

impl OrchestratorClient for HttpOrchestratorClient {
    fn list_recent_runs(
        &self,
        since: Timestamp,
        limit: usize,
    ) -> Result<Vec<ExternalRun>, OrchestratorError> {
        let since = since
            .to_rfc3339()
            .map_err(|err| OrchestratorError::Invalid(err.to_string()))?;
        let url = self.url(&["dags", "~", "dagRuns", "list"])?;
        let body = json!({
            "start_date_gte": since,
            "page_limit": limit,
            "order_by": "-start_date",
        });
        let page: DagRunList = self.send_json(&Method::POST, &url, Some(&body))?;
        // Entries that cannot be decoded are dropped so the rest still reconcile.
        Ok(page
            .dag_runs
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<DagRun>(entry).ok())
            .filter_map(|run| run.into_external().ok())
            .take(limit)
            .collect())
    }

    fn trigger_run(
        &self,
        workflow: &WorkflowName,
        run_id: &RunId,
    ) -> Result<ExternalRun, OrchestratorError> {
        let url = self.url(&["dags", workflow.as_str(), "dagRuns"])?;
        let body = json!({ "dag_run_id": run_id.as_str() });
        match self.send_json::<DagRun>(&Method::POST, &url, Some(&body)) {
            Ok(run) => run.into_external(),
            // A retried submission may find its own earlier attempt.
            Err(OrchestratorError::Status {
                status: 409,
                ..
            }) => self.fetch_run(workflow, run_id.as_str()),
            Err(err) => Err(err),
        }
    }

    fn stop_run(
        &self,
        workflow: &WorkflowName,
        external_id: &ExternalRunId,
    ) -> Result<(), OrchestratorError> {
        let url = self.url(&["dags", workflow.as_str(), "dagRuns", external_id.as_str()])?;
        self.send(&Method::PATCH, &url, Some(&json!({ "state": "failed" })))?;
        Ok(())
    }

    fn set_paused(&self, workflow: &WorkflowName, paused: bool) -> Result<(), OrchestratorError> {
        let url = self.url(&["dags", workflow.as_str()])?;
        self.send(&Method::PATCH, &url, Some(&json!({ "is_paused": paused })))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Page of runs returned by the list endpoint.
#[derive(Debug, Deserialize)]
struct DagRunList {
    /// Runs in the page, decoded one at a time.
    #[serde(default)]
    dag_runs: Vec<Value>,
}

/// One run as encoded by the orchestrator.
#[derive(Debug, Deserialize)]
struct DagRun {
    /// External run id.
    dag_run_id: String,
    /// Workflow id.
    dag_id: String,
    /// External state; absent while the run is being created, read as queued.
    #[serde(default)]
    state: Option<String>,
    /// RFC 3339 start time.
    #[serde(default)]
    start_date: Option<String>,
    /// RFC 3339 end time.
    #[serde(default)]
    end_date: Option<String>,
    /// Free-form note.
    #[serde(default)]
    note: Option<String>,
}

impl DagRun {
    /// Converts the wire form into the port's run record.
    fn into_external(self) -> Result<ExternalRun, OrchestratorError> {
        if self.dag_run_id.is_empty() {
            return Err(OrchestratorError::Malformed("run without dag_run_id".to_string()));
        }
        Ok(ExternalRun {
            started_at: parse_time(self.start_date.as_deref()),
            ended_at: parse_time(self.end_date.as_deref()),
            state: self
                .state
                .as_deref()
                .filter(|state| !state.trim().is_empty())
                .map_or(ExternalRunState::Queued, ExternalRunState::parse),
            external_id: ExternalRunId::new(self.dag_run_id),
            workflow_id: self.dag_id,
            note: self.note.filter(|note| !note.trim().is_empty()),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and validates a cluster endpoint.
fn parse_endpoint(endpoint: &str, allow_http: bool) -> Result<Url, OrchestratorError> {
    let url = Url::parse(endpoint.trim())
        .map_err(|err| OrchestratorError::Invalid(format!("invalid endpoint {endpoint}: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        scheme => {
            return Err(OrchestratorError::Invalid(format!(
                "endpoint scheme {scheme} is not allowed"
            )));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(OrchestratorError::Invalid(
            "endpoint must not embed credentials".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(OrchestratorError::Invalid(
            "endpoint must not carry a query or fragment".to_string(),
        ));
    }
    Ok(url)
}

/// Applies the cluster credential to a request.
fn apply_credential(request: RequestBuilder, credential: &ClusterCredential) -> RequestBuilder {
    match credential {
        ClusterCredential::None => request,
        ClusterCredential::Bearer {
            token,
        } => request.bearer_auth(token),
        ClusterCredential::Basic {
            username,
            password,
        } => request.basic_auth(username, Some(password)),
    }
}

/// Maps a reqwest failure onto the port error.
fn classify_transport(err: &reqwest::Error) -> OrchestratorError {
    if err.is_timeout() {
        OrchestratorError::Timeout(err.to_string())
    } else {
        OrchestratorError::Transport(err.to_string())
    }
}

/// Parses an optional RFC 3339 timestamp; unparseable values read as absent.
fn parse_time(value: Option<&str>) -> Option<Timestamp> {
    value.filter(|value| !value.is_empty()).and_then(|value| Timestamp::parse_rfc3339(value).ok())
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, OrchestratorError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| OrchestratorError::Invalid("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(OrchestratorError::Malformed("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| classify_read(&err))?;
    if buf.len() > max_bytes {
        return Err(OrchestratorError::Malformed("response exceeds size limit".to_string()));
    }
    Ok(buf)
}

/// Maps a body read failure onto the port error.
fn classify_read(err: &std::io::Error) -> OrchestratorError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        OrchestratorError::Timeout(err.to_string())
    } else {
        OrchestratorError::Transport(format!("failed to read response: {err}"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
