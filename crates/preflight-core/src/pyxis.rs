//! Minimal blocking client for the Pyxis certification API.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use preflight_types::{ApiToken, UserResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_KEY_HEADER: &str = "X-API-KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum PyxisError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{method} {url} failed: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The parts of a certification project the submitter looks at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CertProject {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResultsSubmission<'a> {
    pub cert_project: &'a str,
    #[serde(flatten)]
    pub response: &'a UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactUpload<'a> {
    pub cert_project: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub file_size: usize,
    /// Base64 of the file contents.
    pub content: String,
}

impl<'a> ArtifactUpload<'a> {
    pub fn new(cert_project: &'a str, filename: &'a str, content_type: &'a str, raw: &[u8]) -> Self {
        Self {
            cert_project,
            filename,
            content_type,
            file_size: raw.len(),
            content: BASE64.encode(raw),
        }
    }
}

/// Talks to `https://{host}/v1/projects/certification/id/{project}`.
///
/// The underlying HTTP client is built on first use, so constructing a
/// `PyxisClient` never fails.
#[derive(Debug)]
pub struct PyxisClient {
    host: String,
    token: ApiToken,
    project_id: String,
    http: std::sync::OnceLock<reqwest::blocking::Client>,
}

impl PyxisClient {
    pub fn new(host: impl Into<String>, token: ApiToken, project_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token,
            project_id: project_id.into(),
            http: std::sync::OnceLock::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Base URL of the project. Hosts given with a scheme are used as-is.
    pub fn project_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        format!("{base}/v1/projects/certification/id/{}", self.project_id)
    }

    fn http(&self) -> Result<&reqwest::blocking::Client, PyxisError> {
        if let Some(c) = self.http.get() {
            return Ok(c);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PyxisError::Client)?;
        Ok(self.http.get_or_init(|| client))
    }

    pub fn get_project(&self) -> Result<CertProject, PyxisError> {
        let url = self.project_url();
        debug!(%url, "fetching certification project");
        let request = |source: reqwest::Error| PyxisError::Request {
            method: "GET",
            url: url.clone(),
            source,
        };
        self.http()?
            .get(&url)
            .header(API_KEY_HEADER, self.token.expose_secret())
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<CertProject>())
            .map_err(request)
    }

    pub fn submit_test_results(&self, response: &UserResponse) -> Result<(), PyxisError> {
        let body = TestResultsSubmission {
            cert_project: &self.project_id,
            response,
        };
        self.post("test-results", &body)
    }

    pub fn upload_artifact(&self, artifact: &ArtifactUpload<'_>) -> Result<(), PyxisError> {
        self.post("artifacts", artifact)
    }

    fn post<T: Serialize + ?Sized>(&self, resource: &str, body: &T) -> Result<(), PyxisError> {
        let url = format!("{}/{resource}", self.project_url());
        debug!(%url, "posting to pyxis");
        self.http()?
            .post(&url)
            .header(API_KEY_HEADER, self.token.expose_secret())
            .json(body)
            .send()
            .and_then(|r| r.error_for_status())
            .map(|_| ())
            .map_err(|source| PyxisError::Request {
                method: "POST",
                url,
                source,
            })
    }
}
