//! Duplicate detection against the remote record index
//!
//! Per file, two ordered lookups:
//! 1. same `(name, size)` in the target location → critical (stop)
//! 2. same `(name, size)` anywhere else, first match only → informative
//!
//! Lookups for different files run concurrently and are gathered before the
//! report is returned. A failed lookup is fail-open: the file passes through
//! as a non-duplicate and the rest of the batch is unaffected.

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use docimp_common::events::DuplicateCounts;

use crate::models::{DuplicateCandidate, DuplicateClass, ExistingRecord, FileEntry};

/// Location filter of a record query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationScope {
    /// Records in this location
    Within(String),
    /// Records in any location except this one
    Outside(String),
}

/// Record index query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub name: String,
    pub size: u64,
    pub scope: LocationScope,
    /// Skip records flagged obsolete
    pub exclude_obsolete: bool,
    pub limit: Option<usize>,
}

/// Record index errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Record index unavailable: {0}")]
    Unavailable(String),

    #[error("Record index query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Query(err.to_string())
    }
}

/// External index of already-imported documents
#[async_trait]
pub trait RecordIndex: Send + Sync {
    /// Records matching `query`, at most `query.limit`
    async fn find(&self, query: &RecordQuery) -> Result<Vec<ExistingRecord>, IndexError>;
}

/// Detection output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionReport {
    pub duplicates: Vec<DuplicateCandidate>,
    pub passthrough: Vec<FileEntry>,
    /// Lookups that failed and were treated as "no duplicate"
    pub lookup_failures: usize,
}

impl DetectionReport {
    pub fn counts(&self) -> DuplicateCounts {
        let critical = self
            .duplicates
            .iter()
            .filter(|d| d.classification == DuplicateClass::Critical)
            .count();
        DuplicateCounts {
            critical,
            informative: self.duplicates.len() - critical,
            passthrough: self.passthrough.len(),
        }
    }
}

/// Duplicate detector
#[derive(Clone)]
pub struct DuplicateDetector {
    index: Arc<dyn RecordIndex>,
}

impl DuplicateDetector {
    pub fn new(index: Arc<dyn RecordIndex>) -> Self {
        Self { index }
    }

    /// Classify every file of the batch
    pub async fn detect(&self, files: Vec<FileEntry>, target_location: &str) -> DetectionReport {
        let lookups = files.iter().map(|file| self.classify(file, target_location));
        let outcomes = join_all(lookups).await;

        let mut report = DetectionReport::default();
        for (file, outcome) in files.into_iter().zip(outcomes) {
            match outcome {
                Ok(Some((existing, classification))) => {
                    report.duplicates.push(DuplicateCandidate {
                        file,
                        existing,
                        classification,
                    });
                }
                Ok(None) => report.passthrough.push(file),
                Err(e) => {
                    tracing::warn!(
                        file = %file.name,
                        error = %e,
                        "Duplicate lookup failed, treating file as unique"
                    );
                    report.lookup_failures += 1;
                    report.passthrough.push(file);
                }
            }
        }

        let counts = report.counts();
        tracing::info!(
            target_location = %target_location,
            critical = counts.critical,
            informative = counts.informative,
            passthrough = counts.passthrough,
            lookup_failures = report.lookup_failures,
            "Duplicate detection complete"
        );

        report
    }

    async fn classify(
        &self,
        file: &FileEntry,
        target_location: &str,
    ) -> Result<Option<(ExistingRecord, DuplicateClass)>, IndexError> {
        let exact = RecordQuery {
            name: file.name.clone(),
            size: file.size,
            scope: LocationScope::Within(target_location.to_string()),
            exclude_obsolete: true,
            limit: Some(1),
        };
        if let Some(record) = self.index.find(&exact).await?.into_iter().next() {
            tracing::debug!(file = %file.name, record = %record.id, "Critical duplicate");
            return Ok(Some((record, DuplicateClass::Critical)));
        }

        let elsewhere = RecordQuery {
            scope: LocationScope::Outside(target_location.to_string()),
            ..exact
        };
        if let Some(record) = self.index.find(&elsewhere).await?.into_iter().next() {
            tracing::debug!(
                file = %file.name,
                record = %record.id,
                location = %record.location_label,
                "Informative duplicate"
            );
            return Ok(Some((record, DuplicateClass::Informative)));
        }

        Ok(None)
    }
}
