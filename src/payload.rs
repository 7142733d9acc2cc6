use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    pub fn cell(row: &[Option<String>], column: Option<usize>) -> Option<&str> {
        row.get(column?)?.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationPayload {
    pub station_id: String,
    #[serde(default)]
    pub station_name: String,
    #[serde(default)]
    pub table: Option<Table>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub url: Option<String>,
}

impl StationPayload {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn display_name(&self) -> &str {
        if self.station_name.is_empty() {
            &self.station_id
        } else {
            &self.station_name
        }
    }
}

pub type StationPayloads = BTreeMap<String, StationPayload>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub last_updated: NaiveDateTime,
    #[serde(default)]
    pub stations: Vec<String>,
    /// Retention window of the stored history, in hours.
    pub hours_of_data: u32,
}
