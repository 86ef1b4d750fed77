//! Collaborators around the engine: snapshot fetching and progress
//! write-back, plus the reqwest client for the initiatives REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::{ActivityRecord, Initiative, Story, Subordinate, Supervisors};
use crate::progress::ProgressPatch;

/// Supplies snapshots keyed by owner email or initiative id.
///
/// "Not found" is an empty vec; only transport or decoding problems are
/// errors.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn initiatives_by_owner(&self, email: &str) -> Result<Vec<Initiative>, FetchError>;
    async fn activities_by_owner(&self, email: &str) -> Result<Vec<ActivityRecord>, FetchError>;
    async fn activities_by_initiative(&self, initiative_id: i64) -> Result<Vec<ActivityRecord>, FetchError>;
    async fn subordinates_of(&self, email: &str) -> Result<Vec<Subordinate>, FetchError>;
    /// Supervisors of the collaborator, `None` when the collaborator is unknown.
    async fn supervisors_of(&self, email: &str) -> Result<Option<Supervisors>, FetchError>;
}

#[async_trait]
pub trait StorySource: Send + Sync {
    async fn stories_for(&self, initiative_id: i64) -> Result<Vec<Story>, FetchError>;
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn write_progress(&self, initiative_id: i64, patch: &ProgressPatch) -> Result<(), FetchError>;
}

/// HTTP client for the initiatives backend (`{base_url}/api/...`).
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GETs a JSON array. 404 and a `null` body both read as empty.
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, FetchError> {
        debug!(path, "backend GET");

        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        let rows: Option<Vec<T>> = response.json().await.map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(rows.unwrap_or_default())
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment.trim()).into_owned()
}

#[async_trait]
impl DataFetcher for BackendClient {
    async fn initiatives_by_owner(&self, email: &str) -> Result<Vec<Initiative>, FetchError> {
        self.get_list(&format!("/api/iniciativas_por_correo/{}", encode(email)))
            .await
    }

    async fn activities_by_owner(&self, email: &str) -> Result<Vec<ActivityRecord>, FetchError> {
        self.get_list(&format!("/api/actividades_por_correo/{}", encode(email)))
            .await
    }

    async fn activities_by_initiative(&self, initiative_id: i64) -> Result<Vec<ActivityRecord>, FetchError> {
        self.get_list(&format!("/api/actividades_por_iniciativa/{initiative_id}"))
            .await
    }

    async fn subordinates_of(&self, email: &str) -> Result<Vec<Subordinate>, FetchError> {
        self.get_list(&format!("/api/subordinados_de/{}", encode(email)))
            .await
    }

    async fn supervisors_of(&self, email: &str) -> Result<Option<Supervisors>, FetchError> {
        let rows: Vec<Supervisors> = self
            .get_list(&format!("/api/colaborador/{}", encode(email)))
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl StorySource for BackendClient {
    async fn stories_for(&self, initiative_id: i64) -> Result<Vec<Story>, FetchError> {
        self.get_list(&format!("/api/historias_usuario/{initiative_id}"))
            .await
    }
}

#[async_trait]
impl ProgressSink for BackendClient {
    async fn write_progress(&self, initiative_id: i64, patch: &ProgressPatch) -> Result<(), FetchError> {
        let path = format!("/api/iniciativas/{initiative_id}");
        debug!(path = %path, progress = patch.progress, "backend PUT");

        let response = self
            .http
            .put(self.url(&path))
            .json(patch)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            warn!(path = %path, status = %response.status(), "progress write-back rejected");
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                path,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = BackendClient::new("http://127.0.0.1:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
        assert_eq!(client.url("/api/x"), "http://127.0.0.1:5000/api/x");
    }

    #[test]
    fn test_email_segment_encoding() {
        assert_eq!(encode(" ana.pérez+ops@corp.com "), "ana.p%C3%A9rez%2Bops%40corp.com");
    }
}
