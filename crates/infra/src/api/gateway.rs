//! HTTP implementation of the [`BackendGateway`] port.

use std::collections::BTreeMap;

use async_trait::async_trait;
use esusync_core::ports::{Artifact, BackendGateway};
use esusync_domain::{AutoUpdateConfig, BillingPeriod, Result, Section, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use urlencoding::encode;

use super::billing;
use super::client::ApiClient;
use crate::errors::InfraError;
use crate::push::wire::lenient_percent;

#[derive(Debug, Deserialize)]
struct FileCheckResponse {
    available: bool,
}

#[derive(Debug, Deserialize)]
struct TaskStatusResponse {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImportRequest {
    ano: String,
    mes: String,
}

#[derive(Debug, Deserialize)]
struct ExportStartResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<String>,
}

/// Auto-update config as the backend spells it.
#[derive(Debug, Serialize, Deserialize)]
struct AutoUpdateWire {
    #[serde(rename = "isAutoUpdateOn")]
    enabled: bool,
    #[serde(rename = "autoUpdateTime")]
    time: String,
}

/// REST gateway over [`ApiClient`].
pub struct HttpBackendGateway {
    api: ApiClient,
}

impl HttpBackendGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn fetch_artifact(&self, path: &str, fallback_name: &str) -> Result<Artifact> {
        let response = self.api.get_raw(path).await?;
        let disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(InfraError::from)?;
        Ok(Artifact {
            filename: billing::filename_from_disposition(disposition.as_deref(), fallback_name),
            bytes: bytes.to_vec(),
        })
    }
}

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    async fn check_file(&self, section: Section) -> Result<bool> {
        let response: FileCheckResponse =
            self.api.get_json(&format!("/check-file/{section}")).await?;
        Ok(response.available)
    }

    async fn fetch_progress(&self, section: Section) -> Result<u8> {
        // The backend is loose about this field's type (number or numeric
        // string), so decode leniently and default to zero.
        let body: Value = self.api.get_json(&format!("/progress/{section}")).await?;
        let percent = body.get("progress").and_then(lenient_percent).unwrap_or_else(|| {
            warn!(%section, %body, "unparseable progress payload; assuming 0");
            0
        });
        Ok(percent)
    }

    async fn fetch_task_status(&self, section: Section) -> Result<TaskStatus> {
        let response: TaskStatusResponse =
            self.api.get_json(&format!("/task-status/{section}")).await?;
        Ok(TaskStatus::parse(response.status.as_deref().unwrap_or("")))
    }

    async fn fetch_last_imports(&self) -> Result<BTreeMap<String, String>> {
        // Values may be missing or non-strings for never-imported sections.
        let body: BTreeMap<String, Value> = self.api.get_json("/configimport").await?;
        Ok(body
            .into_iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
            .collect())
    }

    async fn fetch_auto_update_config(&self) -> Result<AutoUpdateConfig> {
        let wire: AutoUpdateWire = self.api.get_json("/api/get-import-config").await?;
        Ok(AutoUpdateConfig { enabled: wire.enabled, time: wire.time })
    }

    async fn save_auto_update_config(&self, config: &AutoUpdateConfig) -> Result<()> {
        let wire = AutoUpdateWire { enabled: config.enabled, time: config.time.clone() };
        self.api.post_json("/api/save-auto-update-config", &wire).await
    }

    async fn start_import(&self, section: Section, period: Option<&BillingPeriod>) -> Result<()> {
        let path = format!("/execute-queries/{section}");
        match period {
            Some(period) => {
                let body = ImportRequest {
                    ano: period.year.to_string(),
                    mes: period.month.clone(),
                };
                self.api.post_json(&path, &body).await
            }
            None => self.api.post_json(&path, &serde_json::json!({})).await,
        }
    }

    async fn start_export(&self, section: Section) -> Result<()> {
        let response: ExportStartResponse =
            self.api.get_json(&format!("/export/{section}")).await?;
        if response.status != "started" {
            let message = response
                .message
                .unwrap_or_else(|| format!("export did not start (status: {})", response.status));
            return Err(esusync_domain::SyncError::Internal(message));
        }
        Ok(())
    }

    async fn download_artifact(&self, section: Section) -> Result<Artifact> {
        self.fetch_artifact(
            &format!("/download-exported-file/{section}"),
            &format!("{section}_export.xlsx"),
        )
        .await
    }

    async fn generate_billing_file(&self) -> Result<Artifact> {
        let response = self.api.post_raw("/gerar-bpa").await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let disposition = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(InfraError::from)?;

        if !status.is_success() {
            return Err(esusync_domain::SyncError::Network(format!(
                "/gerar-bpa returned {status}"
            )));
        }
        billing::ensure_billing_payload(content_type.as_deref(), &bytes)?;

        Ok(Artifact {
            filename: billing::filename_from_disposition(disposition.as_deref(), "bpa_gerado.txt"),
            bytes: bytes.to_vec(),
        })
    }

    async fn list_billing_files(&self) -> Result<Vec<String>> {
        let response: ListFilesResponse = self.api.get_json("/api/list-bpa-files").await?;
        Ok(response.files)
    }

    async fn download_billing_file(&self, filename: &str) -> Result<Artifact> {
        self.fetch_artifact(
            &format!("/download-bpa-file?filename={}", encode(filename)),
            filename,
        )
        .await
    }

    async fn delete_billing_file(&self, filename: &str) -> Result<()> {
        self.api.delete(&format!("/delete-bpa-file?filename={}", encode(filename))).await
    }

    async fn fix_addresses(&self) -> Result<()> {
        // Response body is informational only; counters arrive via push.
        let _ = self.api.get_raw("/api/corrigir-ceps").await?;
        Ok(())
    }
}
