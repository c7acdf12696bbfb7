//! HTTP client for the remote content analyzer
//!
//! Endpoints, both `POST` with a JSON file descriptor:
//! - `{base}/quality` → `{ "needs_ocr": bool, "score": f32? }`
//! - `{base}/extract` → `{ "text_length": usize, "page_count": u32 }`

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use docimp_common::config::AnalyzerConfig;

use super::content_analysis::{
    AnalysisError, ExtractedText, QualityAnalyzer, QualityVerdict, TextExtractor,
};
use crate::models::FileEntry;

const USER_AGENT: &str = concat!("docimp-ie/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct FileDescriptor<'a> {
    name: &'a str,
    size: u64,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_hint: Option<&'a str>,
}

impl<'a> From<&'a FileEntry> for FileDescriptor<'a> {
    fn from(file: &'a FileEntry) -> Self {
        Self {
            name: &file.name,
            size: file.size,
            path: file.path.to_string_lossy().into_owned(),
            mime_hint: file.mime_hint.as_deref(),
        }
    }
}

/// Remote quality analyzer and text extractor
pub struct HttpContentAnalyzer {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpContentAnalyzer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        file: &FileEntry,
    ) -> Result<T, AnalysisError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(url = %url, file = %file.name, "Querying content analyzer");

        let response = self
            .http_client
            .post(&url)
            .json(&FileDescriptor::from(file))
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Request(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl QualityAnalyzer for HttpContentAnalyzer {
    async fn assess(&self, file: &FileEntry) -> Result<QualityVerdict, AnalysisError> {
        self.post("quality", file).await
    }
}

#[async_trait]
impl TextExtractor for HttpContentAnalyzer {
    async fn extract(&self, file: &FileEntry) -> Result<ExtractedText, AnalysisError> {
        self.post("extract", file).await
    }
}

/// Stand-in used when no analyzer is configured
///
/// Every call fails, so automatic mode falls back to OCR for every file.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAnalyzer;

#[async_trait]
impl QualityAnalyzer for DisabledAnalyzer {
    async fn assess(&self, _file: &FileEntry) -> Result<QualityVerdict, AnalysisError> {
        Err(AnalysisError::Unavailable("no analyzer configured".to_string()))
    }
}

#[async_trait]
impl TextExtractor for DisabledAnalyzer {
    async fn extract(&self, _file: &FileEntry) -> Result<ExtractedText, AnalysisError> {
        Err(AnalysisError::Unavailable("no analyzer configured".to_string()))
    }
}

type AnalyzerPair = (Arc<dyn QualityAnalyzer>, Arc<dyn TextExtractor>);

/// Analyzer pair built from configuration
pub fn analyzers_from_config(config: &AnalyzerConfig) -> Result<AnalyzerPair, AnalysisError> {
    match &config.base_url {
        Some(base_url) => {
            let client = Arc::new(HttpContentAnalyzer::new(
                base_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?);
            tracing::info!(base_url = %client.base_url(), "Content analyzer configured");
            Ok((client.clone(), client))
        }
        None => {
            tracing::warn!("No content analyzer configured, automatic mode will always use OCR");
            Ok((Arc::new(DisabledAnalyzer), Arc::new(DisabledAnalyzer)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_analyzer() -> String {
        let app = Router::new()
            .route(
                "/quality",
                post(|Json(body): Json<Value>| async move {
                    let scanned = body["name"].as_str().unwrap_or("").starts_with("scan");
                    Json(json!({ "needs_ocr": scanned, "score": 0.5 }))
                }),
            )
            .route(
                "/extract",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({ "text_length": body["size"], "page_count": 2 }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_http_analyzer_round_trip() {
        let base = spawn_analyzer().await;
        let client = HttpContentAnalyzer::new(base, Duration::from_secs(5)).unwrap();
        assert!(!client.base_url().ends_with('/'));

        let verdict = client
            .assess(&FileEntry::new("scan.pdf", 10, "/tmp/scan.pdf"))
            .await
            .unwrap();
        assert!(verdict.needs_ocr);
        assert_eq!(verdict.score, Some(0.5));

        let text = client
            .extract(&FileEntry::new("report.pdf", 1234, "/tmp/report.pdf"))
            .await
            .unwrap();
        assert_eq!(text.text_length, 1234);
        assert_eq!(text.page_count, 2);
    }

    #[tokio::test]
    async fn test_http_analyzer_error_status() {
        let base = spawn_analyzer().await;
        let client = HttpContentAnalyzer::new(format!("{}missing", base), Duration::from_secs(5))
            .unwrap();

        let err = client
            .assess(&FileEntry::new("a.pdf", 1, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Request(_)));
    }

    #[tokio::test]
    async fn test_disabled_analyzer_is_unavailable() {
        let (quality, extractor) = analyzers_from_config(&AnalyzerConfig {
            base_url: None,
            ..Default::default()
        })
        .unwrap();
        let file = FileEntry::new("a.pdf", 1, "");

        assert!(matches!(
            quality.assess(&file).await,
            Err(AnalysisError::Unavailable(_))
        ));
        assert!(matches!(
            extractor.extract(&file).await,
            Err(AnalysisError::Unavailable(_))
        ));
    }
}
