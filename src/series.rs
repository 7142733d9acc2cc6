use crate::anomaly::AnomalyThresholds;
use crate::columns::{ColumnMap, ColumnRules};
use crate::normalize::{normalize_direction, normalize_value, ValueKind};
use crate::payload::{StationPayload, Table};
use crate::table::extract_table;
use crate::timestamp::resolve_timestamp;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

/// Parallel sequences for one station, all of the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub temperature: Vec<Option<f64>>,
    pub wind_speed: Vec<Option<f64>>,
    pub wind_direction: Vec<Option<String>>,
    /// Snow depth after spike smoothing.
    pub snow_depth: Vec<Option<f64>>,
    pub raw_snow_depth: Vec<Option<f64>>,
    pub new_snow_24h: Vec<Option<f64>>,
    pub swe: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
    pub snow_depth: Option<f64>,
    pub raw_snow_depth: Option<f64>,
    pub new_snow_24h: Option<f64>,
    pub swe: Option<f64>,
    pub precipitation: Option<f64>,
}

impl Reading {
    pub fn is_blank(&self) -> bool {
        self.temperature.is_none()
            && self.wind_speed.is_none()
            && self.wind_direction.is_none()
            && self.snow_depth.is_none()
            && self.new_snow_24h.is_none()
            && self.swe.is_none()
            && self.precipitation.is_none()
    }
}

impl ParsedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn push(&mut self, reading: Reading) {
        self.timestamps.push(reading.timestamp);
        self.temperature.push(reading.temperature);
        self.wind_speed.push(reading.wind_speed);
        self.wind_direction.push(reading.wind_direction);
        self.snow_depth.push(reading.snow_depth);
        self.raw_snow_depth.push(reading.raw_snow_depth);
        self.new_snow_24h.push(reading.new_snow_24h);
        self.swe.push(reading.swe);
        self.precipitation.push(reading.precipitation);
    }

    /// Panics if the sequences have drifted out of alignment. That can only
    /// happen through a bug in this module.
    pub fn assert_aligned(&self) {
        let n = self.timestamps.len();
        let lengths = [
            self.temperature.len(),
            self.wind_speed.len(),
            self.wind_direction.len(),
            self.snow_depth.len(),
            self.raw_snow_depth.len(),
            self.new_snow_24h.len(),
            self.swe.len(),
            self.precipitation.len(),
        ];
        assert!(
            lengths.iter().all(|&len| len == n),
            "series out of alignment: {} timestamps, field lengths {:?}",
            n,
            lengths
        );
    }

    pub fn get(&self, index: usize) -> Option<Reading> {
        Some(Reading {
            timestamp: *self.timestamps.get(index)?,
            temperature: self.temperature[index],
            wind_speed: self.wind_speed[index],
            wind_direction: self.wind_direction[index].clone(),
            snow_depth: self.snow_depth[index],
            raw_snow_depth: self.raw_snow_depth[index],
            new_snow_24h: self.new_snow_24h[index],
            swe: self.swe[index],
            precipitation: self.precipitation[index],
        })
    }

    pub fn latest(&self) -> Option<Reading> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Records with `timestamp >= now - window_hours`, in their original order.
    pub fn window(&self, window_hours: u32, now: NaiveDateTime) -> FilteredSeries {
        let cutoff = now - Duration::hours(i64::from(window_hours));
        let mut series = ParsedSeries::default();
        for (index, ts) in self.timestamps.iter().enumerate() {
            if *ts >= cutoff {
                if let Some(reading) = self.get(index) {
                    series.push(reading);
                }
            }
        }
        FilteredSeries {
            window_hours,
            series,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredSeries {
    pub window_hours: u32,
    #[serde(flatten)]
    pub series: ParsedSeries,
}

impl FilteredSeries {
    pub fn series(&self) -> &ParsedSeries {
        &self.series
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    pub rows_seen: usize,
    pub rows_dropped: usize,
    pub values_rejected: usize,
    pub spikes_smoothed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    rules: ColumnRules,
    thresholds: AnomalyThresholds,
}

impl SeriesBuilder {
    pub fn new(rules: ColumnRules, thresholds: AnomalyThresholds) -> Self {
        Self { rules, thresholds }
    }

    pub fn build(
        &self,
        payload: &StationPayload,
        now: NaiveDateTime,
    ) -> (ParsedSeries, BuildStats) {
        if let Some(err) = &payload.error {
            warn!(
                "Station {} reported a fetch error, no data: {}",
                payload.station_id, err
            );
            return (ParsedSeries::default(), BuildStats::default());
        }

        let extracted;
        let table = match &payload.table {
            Some(table) => table,
            None => {
                extracted = payload.data.as_deref().and_then(extract_table);
                match &extracted {
                    Some(table) => table,
                    None => {
                        debug!("Station {} has no table data", payload.station_id);
                        return (ParsedSeries::default(), BuildStats::default());
                    }
                }
            }
        };

        let (series, stats) = self.build_table(table, now);
        debug!(
            "Built series for {}: {} rows kept, {} dropped, {} values rejected, {} spikes smoothed",
            payload.station_id,
            series.len(),
            stats.rows_dropped,
            stats.values_rejected,
            stats.spikes_smoothed
        );
        (series, stats)
    }

    pub fn build_table(&self, table: &Table, now: NaiveDateTime) -> (ParsedSeries, BuildStats) {
        let mut series = ParsedSeries::default();
        let mut stats = BuildStats::default();

        if table.is_empty() {
            return (series, stats);
        }

        let columns = self.rules.resolve(&table.headers);
        if !columns.has_date_source() {
            warn!("No date column among headers {:?}", table.headers);
            return (series, stats);
        }

        for (row_num, row) in table.rows.iter().enumerate() {
            stats.rows_seen += 1;
            match self.parse_row(row, &columns, now, &mut stats) {
                Some(reading) => series.push(reading),
                None => {
                    stats.rows_dropped += 1;
                    warn!("Dropping row {}: unparseable timestamp", row_num + 1);
                }
            }
        }

        stats.spikes_smoothed = self.thresholds.smooth_depth_spikes(&mut series.snow_depth);
        series.assert_aligned();
        (series, stats)
    }

    fn parse_row(
        &self,
        row: &[Option<String>],
        columns: &ColumnMap,
        now: NaiveDateTime,
        stats: &mut BuildStats,
    ) -> Option<Reading> {
        let date = Table::cell(row, columns.date)?;
        let time = if columns.combined_date_time {
            None
        } else {
            Table::cell(row, columns.time)
        };
        let timestamp = resolve_timestamp(date, time, now)?;

        let plain =
            |column: Option<usize>| normalize_value(Table::cell(row, column), ValueKind::Plain);

        let raw_new_snow = plain(columns.new_snow_24h);
        let new_snow_24h = self.thresholds.validate_new_snow(raw_new_snow);
        let raw_swe = plain(columns.swe);
        let swe = self.thresholds.validate_swe(raw_swe);
        stats.values_rejected += usize::from(raw_new_snow.is_some() && new_snow_24h.is_none());
        stats.values_rejected += usize::from(raw_swe.is_some() && swe.is_none());

        let snow_depth = plain(columns.snow_depth);

        Some(Reading {
            timestamp,
            temperature: plain(columns.temperature),
            wind_speed: normalize_value(
                Table::cell(row, columns.wind_speed),
                ValueKind::WindSpeed,
            ),
            wind_direction: normalize_direction(Table::cell(row, columns.wind_direction)),
            snow_depth,
            raw_snow_depth: snow_depth,
            new_snow_24h,
            swe,
            precipitation: plain(columns.precipitation),
        })
    }
}

pub fn build_series(payload: &StationPayload, now: NaiveDateTime) -> ParsedSeries {
    SeriesBuilder::default().build(payload, now).0
}
