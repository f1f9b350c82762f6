//! The imputation, simulation and report service, seen from the client side.

use crate::error::ServiceError;
use async_trait::async_trait;
use circulca_schemas::wire::{
    ImputationResponse, ReportRequest, ServiceRequest, SimulationResponse,
};
use reqwest::header::CONTENT_DISPOSITION;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_REPORT_FILENAME: &str = "lca_report.pdf";

/// A generated report document.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait LcaService {
    /// Fills absent fields. The response is aligned with `request.data` by position.
    async fn impute(&self, request: &ServiceRequest) -> Result<ImputationResponse, ServiceError>;
    async fn simulate(&self, request: &ServiceRequest) -> Result<SimulationResponse, ServiceError>;
    async fn generate_report(&self, request: &ReportRequest) -> Result<ReportDocument, ServiceError>;
}

/// `LcaService` over HTTP with JSON bodies.
pub struct HttpLcaService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLcaService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(base_url.to_string(), e))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(
        &self,
        url: String,
        body: &impl serde::Serialize,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(url.clone(), e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status { status, body });
        }
        Ok(response)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: String,
        body: &impl serde::Serialize,
    ) -> Result<T, ServiceError> {
        let response = self.post(url, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LcaService for HttpLcaService {
    async fn impute(&self, request: &ServiceRequest) -> Result<ImputationResponse, ServiceError> {
        info!(rows = request.data.len(), "requesting imputation");
        self.post_json(self.url("impute"), request).await
    }

    async fn simulate(&self, request: &ServiceRequest) -> Result<SimulationResponse, ServiceError> {
        let scenario = request.project_metadata.scenario;
        info!(rows = request.data.len(), %scenario, "requesting simulation");
        self.post_json(format!("{}?scenario={}", self.url("simulate"), scenario), request)
            .await
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<ReportDocument, ServiceError> {
        info!("requesting report");
        let response = self.post(self.url("report"), request).await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        Ok(ReportDocument {
            filename,
            bytes: bytes.to_vec(),
        })
    }
}

/// Extracts the filename hint from a `Content-Disposition` header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for part in header.split(';').map(str::trim) {
        if let Some(value) = part.strip_prefix("filename*=") {
            // charset'language'value
            extended = value.rsplit('\'').next().map(|v| v.trim_matches('"').to_string());
        } else if let Some(value) = part.strip_prefix("filename=") {
            plain = Some(value.trim_matches('"').to_string());
        }
    }
    extended
        .filter(|name| !name.is_empty())
        .or(plain)
        .and_then(|name| name.rsplit(['/', '\\']).next().map(str::to_string))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_quoted_and_bare_filenames() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"LCA_Report_can.pdf\""),
            Some("LCA_Report_can.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=report.pdf"),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn prefers_extended_filename() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"a.pdf\"; filename*=UTF-8''b.pdf"),
            Some("b.pdf".to_string())
        );
    }

    #[test]
    fn strips_directories_and_ignores_missing_hints() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"../../etc/report.pdf\""),
            Some("report.pdf".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn base_url_is_normalized() {
        let service = HttpLcaService::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.url("simulate"), "http://localhost:8000/simulate");
    }
}
