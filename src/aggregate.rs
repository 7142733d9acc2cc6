use crate::series::ParsedSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    #[default]
    Contributing,
    Selected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnowfallSummary {
    #[default]
    Max,
    Total,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub active_stations: usize,
    pub avg_temperature: Option<f64>,
    pub avg_swe: Option<f64>,
    pub max_snow_depth: Option<f64>,
    pub new_snow_24h: Option<f64>,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self, denominator: usize) -> Option<f64> {
        if self.count == 0 || denominator == 0 {
            None
        } else {
            Some(self.sum / denominator as f64)
        }
    }
}

fn max_of(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn sum_of(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}

/// Aggregate the last row of each selected station's series.
pub fn aggregate<'a, I>(
    series: &BTreeMap<String, ParsedSeries>,
    selected: I,
    averaging: Averaging,
    snowfall: SnowfallSummary,
) -> AggregateStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = AggregateStats::default();
    let mut temperature = Mean::default();
    let mut swe = Mean::default();
    let mut selected_count = 0;

    for station_id in selected {
        selected_count += 1;
        let Some(latest) = series.get(station_id).and_then(ParsedSeries::latest) else {
            continue;
        };
        if latest.is_blank() {
            continue;
        }

        stats.active_stations += 1;
        temperature.add(latest.temperature);
        swe.add(latest.swe);
        stats.max_snow_depth = max_of(stats.max_snow_depth, latest.snow_depth);
        stats.new_snow_24h = match snowfall {
            SnowfallSummary::Max => max_of(stats.new_snow_24h, latest.new_snow_24h),
            SnowfallSummary::Total => sum_of(stats.new_snow_24h, latest.new_snow_24h),
        };
    }

    let (temp_denominator, swe_denominator) = match averaging {
        Averaging::Contributing => (temperature.count, swe.count),
        Averaging::Selected => (selected_count, selected_count),
    };
    stats.avg_temperature = temperature.value(temp_denominator);
    stats.avg_swe = swe.value(swe_denominator);
    stats
}
