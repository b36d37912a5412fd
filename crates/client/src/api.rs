//! REST API client for the simulation backend.
//!
//! Wraps the job endpoints (submission, status, results, history,
//! deletion, risk calculation) using [`reqwest`]. Credentials are passed
//! per call; the client itself holds no authentication state.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use surety_core::job::JobConfig;
use surety_core::results::ResultSet;

use crate::credentials::Credentials;
use crate::error::ClientError;
use crate::input::InputFile;
use crate::wire::{error_message, JobList, JobRecord, RiskAnswer, RiskQuery, StatusReport};

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one backend deployment.
#[derive(Debug, Clone)]
pub struct SuretyApi {
    client: reqwest::Client,
    api_url: String,
}

impl SuretyApi {
    /// Create a client with the default request timeout.
    ///
    /// * `api_url` - Base URL the `/jobs` routes hang off, e.g.
    ///   `http://host:8000/api`.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(api_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a job.
    ///
    /// Sends `POST /jobs` as a multipart body carrying the configuration
    /// and both raw files.
    pub async fn submit_job(
        &self,
        credentials: &Credentials,
        config: &JobConfig,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<JobRecord, ClientError> {
        let form = Form::new()
            .text("method", config.method.as_str())
            .text("num_samples", config.num_samples.to_string())
            .text("alpha", config.alpha.to_string())
            .part("lending_file", file_part(lending))
            .part("recovery_file", file_part(recovery));

        let request = self
            .client
            .post(format!("{}/jobs", self.api_url))
            .multipart(form);
        let response = credentials.apply(request).send().await?;

        Self::parse_response(response).await
    }

    /// `GET /jobs/{id}/status`.
    pub async fn job_status(
        &self,
        credentials: &Credentials,
        job_id: &str,
    ) -> Result<StatusReport, ClientError> {
        let request = self
            .client
            .get(format!("{}/jobs/{}/status", self.api_url, job_id));
        let response = credentials.apply(request).send().await?;

        Self::parse_response(response).await
    }

    /// `GET /jobs/{id}/results`. The backend answers 400 until the job
    /// has completed.
    pub async fn job_results(
        &self,
        credentials: &Credentials,
        job_id: &str,
    ) -> Result<ResultSet, ClientError> {
        let request = self
            .client
            .get(format!("{}/jobs/{}/results", self.api_url, job_id));
        let response = credentials.apply(request).send().await?;

        Self::parse_response(response).await
    }

    /// `GET /jobs`, newest first as ordered by the backend.
    pub async fn list_jobs(&self, credentials: &Credentials) -> Result<Vec<JobRecord>, ClientError> {
        let request = self.client.get(format!("{}/jobs", self.api_url));
        let response = credentials.apply(request).send().await?;

        let list: JobList = Self::parse_response(response).await?;
        Ok(list.into_records())
    }

    /// `DELETE /jobs/{id}`.
    pub async fn delete_job(&self, credentials: &Credentials, job_id: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .delete(format!("{}/jobs/{}", self.api_url, job_id));
        let response = credentials.apply(request).send().await?;

        Self::check_status(response).await
    }

    /// `POST /jobs/{id}/calculate_risk`.
    pub async fn calculate_risk(
        &self,
        credentials: &Credentials,
        job_id: &str,
        query: &RiskQuery,
    ) -> Result<RiskAnswer, ClientError> {
        let request = self
            .client
            .post(format!("{}/jobs/{}/calculate_risk", self.api_url, job_id))
            .json(query);
        let response = credentials.apply(request).send().await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Map a non-2xx response to [`ClientError::Auth`] or
    /// [`ClientError::Server`]; pass successful responses through.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status = status.as_u16();
        if status == 401 || status == 403 {
            return Err(ClientError::Auth { status });
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(ClientError::Server {
            status,
            message: error_message(&body),
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ClientError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

fn file_part(file: &InputFile) -> Part {
    Part::bytes(file.bytes.clone()).file_name(file.file_name.clone())
}
