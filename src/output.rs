use crate::aggregate::AggregateStats;
use crate::error::Result;
use crate::series::FilteredSeries;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationOutput {
    pub name: String,
    pub series: FilteredSeries,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDocument {
    pub generated_at: DateTime<Utc>,
    pub last_updated: NaiveDateTime,
    pub window_hours: u32,
    pub stations: BTreeMap<String, StationOutput>,
    pub selected: Vec<String>,
    pub aggregate: AggregateStats,
}

/// Write the document next to its final path and rename it into place, so a
/// reader sees either the previous document or the complete new one.
pub async fn write_document(path: &Path, document: &SeriesDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let body = serde_json::to_vec_pretty(document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    tokio::fs::write(&tmp, &body).await?;
    tokio::fs::rename(&tmp, path).await?;

    info!(
        "Wrote {} stations ({} bytes) to {}",
        document.stations.len(),
        body.len(),
        path.display()
    );
    Ok(())
}
