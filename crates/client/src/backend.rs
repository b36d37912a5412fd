//! The seam between job orchestration and the transport.
//!
//! The poller, hydrator and slot only ever see a [`JobBackend`]; production
//! code plugs in [`HttpBackend`], tests plug in scripted fakes.

use async_trait::async_trait;
use surety_core::job::JobConfig;
use surety_core::results::ResultSet;

use crate::api::SuretyApi;
use crate::credentials::Credentials;
use crate::error::ClientError;
use crate::input::InputFile;
use crate::wire::{JobRecord, RiskAnswer, RiskQuery, StatusReport};

/// Operations the client needs from the simulation backend.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit_job(
        &self,
        config: &JobConfig,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<JobRecord, ClientError>;

    async fn job_status(&self, job_id: &str) -> Result<StatusReport, ClientError>;

    async fn job_results(&self, job_id: &str) -> Result<ResultSet, ClientError>;

    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ClientError>;

    async fn delete_job(&self, job_id: &str) -> Result<(), ClientError>;

    async fn calculate_risk(&self, job_id: &str, query: &RiskQuery)
        -> Result<RiskAnswer, ClientError>;
}

/// [`JobBackend`] over HTTP, sending `credentials` with every request.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    api: SuretyApi,
    credentials: Credentials,
}

impl HttpBackend {
    pub fn new(api: SuretyApi, credentials: Credentials) -> Self {
        Self { api, credentials }
    }

    pub fn api(&self) -> &SuretyApi {
        &self.api
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit_job(
        &self,
        config: &JobConfig,
        lending: &InputFile,
        recovery: &InputFile,
    ) -> Result<JobRecord, ClientError> {
        self.api
            .submit_job(&self.credentials, config, lending, recovery)
            .await
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusReport, ClientError> {
        self.api.job_status(&self.credentials, job_id).await
    }

    async fn job_results(&self, job_id: &str) -> Result<ResultSet, ClientError> {
        self.api.job_results(&self.credentials, job_id).await
    }

    async fn list_jobs(&self) -> Result<Vec<JobRecord>, ClientError> {
        self.api.list_jobs(&self.credentials).await
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), ClientError> {
        self.api.delete_job(&self.credentials, job_id).await
    }

    async fn calculate_risk(
        &self,
        job_id: &str,
        query: &RiskQuery,
    ) -> Result<RiskAnswer, ClientError> {
        query.validate()?;
        self.api
            .calculate_risk(&self.credentials, job_id, query)
            .await
    }
}
