use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use meterflux_parser::Reading;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::{ImportName, UtilityType};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeriesKey {
    pub utility_type: UtilityType,
    pub meter_name: ImportName,
}

impl SeriesKey {
    pub fn new(utility_type: UtilityType, meter_name: ImportName) -> Self {
        Self {
            utility_type,
            meter_name,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.utility_type, self.meter_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub points: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub content_hashes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for ingested series. Writes are keyed by timestamp, so
/// storing the same readings twice leaves the series unchanged.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn upsert(
        &self,
        key: &SeriesKey,
        content_hash: &str,
        readings: &[Reading],
    ) -> Result<UpsertReport, StoreError>;

    async fn series_summary(&self, key: &SeriesKey) -> Result<Option<SeriesSummary>, StoreError>;
}

#[derive(Debug, Default)]
struct Series {
    points: BTreeMap<NaiveDateTime, f64>,
    content_hashes: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<SeriesKey, Series>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn series_keys(&self) -> Vec<SeriesKey> {
        let mut keys: Vec<SeriesKey> = self.series.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn upsert(
        &self,
        key: &SeriesKey,
        content_hash: &str,
        readings: &[Reading],
    ) -> Result<UpsertReport, StoreError> {
        let mut guard = self.series.write().await;
        let series = guard.entry(key.clone()).or_default();

        let mut report = UpsertReport {
            inserted: 0,
            updated: 0,
        };
        for reading in readings {
            match series.points.insert(reading.timestamp, reading.value) {
                Some(_) => report.updated += 1,
                None => report.inserted += 1,
            }
        }
        if !series.content_hashes.iter().any(|h| h == content_hash) {
            series.content_hashes.push(content_hash.to_string());
        }
        Ok(report)
    }

    async fn series_summary(&self, key: &SeriesKey) -> Result<Option<SeriesSummary>, StoreError> {
        let guard = self.series.read().await;
        Ok(guard.get(key).map(|series| SeriesSummary {
            points: series.points.len(),
            first: series.points.keys().next().copied(),
            last: series.points.keys().next_back().copied(),
            content_hashes: series.content_hashes.clone(),
        }))
    }
}
