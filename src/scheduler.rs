use crate::aggregate::aggregate;
use crate::columns::ColumnRules;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::DataSource;
use crate::output::{write_document, SeriesDocument, StationOutput};
use crate::series::{ParsedSeries, SeriesBuilder};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Unchanged,
    Updated { stations: usize },
}

pub struct Scheduler {
    config: Config,
    source: DataSource,
    builder: SeriesBuilder,
    shutdown_rx: watch::Receiver<bool>,
    last_updated: Option<NaiveDateTime>,
    series: BTreeMap<String, ParsedSeries>,
}

impl Scheduler {
    pub fn new(config: Config, shutdown_rx: watch::Receiver<bool>) -> Result<Self> {
        let source = DataSource::from_config(&config.source)?;
        let rules = if config.display.simplified_columns {
            ColumnRules::simplified()
        } else {
            ColumnRules::default()
        };
        let builder = SeriesBuilder::new(rules, config.thresholds);

        Ok(Self {
            config,
            source,
            builder,
            shutdown_rx,
            last_updated: None,
            series: BTreeMap::new(),
        })
    }

    pub fn series(&self) -> &BTreeMap<String, ParsedSeries> {
        &self.series
    }

    pub fn last_updated(&self) -> Option<NaiveDateTime> {
        self.last_updated
    }

    pub async fn run(&mut self) -> Result<()> {
        let initial_delay = Duration::from_secs(self.config.scheduler.initial_delay_seconds);
        let poll_interval = Duration::from_secs(self.config.scheduler.interval_minutes * 60);

        info!(
            "Scheduler starting with {}s initial delay, {}m interval",
            self.config.scheduler.initial_delay_seconds, self.config.scheduler.interval_minutes
        );

        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {},
            _ = self.shutdown_rx.changed() => {
                info!("Shutdown received during initial delay");
                return Ok(());
            }
        }

        // Run immediately, then on interval
        self.refresh_logged().await;

        let mut ticker = interval(poll_interval);
        ticker.tick().await; // First tick is immediate, skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_logged().await;
                }
                _ = self.shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn refresh_logged(&mut self) {
        match self.refresh_at(Utc::now()).await {
            Ok(RefreshOutcome::Unchanged) => debug!("No new station data"),
            Ok(RefreshOutcome::Updated { stations }) => {
                info!("Refreshed {} stations", stations)
            }
            Err(e) => error!("Refresh failed, will retry next interval: {}", e),
        }
    }

    /// Reload the documents and rebuild every station's series as of `now`.
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<RefreshOutcome> {
        let source = &self.config.source;
        let metadata = self.source.metadata(&source.metadata_file).await?;

        if self.last_updated == Some(metadata.last_updated) {
            return Ok(RefreshOutcome::Unchanged);
        }

        info!(
            "New station data (last updated {}), rebuilding series",
            metadata.last_updated
        );
        let payloads = self.source.stations(&source.stations_file).await?;

        for station_id in &metadata.stations {
            if !payloads.contains_key(station_id) {
                warn!("Station {} listed in metadata but has no payload", station_id);
            }
        }

        let local_now = now
            .with_timezone(&self.config.display.offset()?)
            .naive_local();

        let series: BTreeMap<String, ParsedSeries> = payloads
            .iter()
            .map(|(station_id, payload)| {
                let (series, _stats) = self.builder.build(payload, local_now);
                (station_id.clone(), series)
            })
            .collect();

        let window_hours = self
            .config
            .display
            .window_hours
            .unwrap_or(metadata.hours_of_data);

        let selected = self
            .config
            .stations
            .select(series.keys().map(String::as_str));
        let aggregate = aggregate(
            &series,
            selected.iter().copied(),
            self.config.display.averaging,
            self.config.display.snowfall,
        );
        debug!("Aggregate over {:?}: {:?}", selected, aggregate);

        let stations = payloads
            .iter()
            .map(|(station_id, payload)| {
                let windowed = series
                    .get(station_id)
                    .map(|s| s.window(window_hours, local_now))
                    .unwrap_or_else(|| ParsedSeries::default().window(window_hours, local_now));
                (
                    station_id.clone(),
                    StationOutput {
                        name: payload.display_name().to_string(),
                        series: windowed,
                    },
                )
            })
            .collect();

        let document = SeriesDocument {
            generated_at: now,
            last_updated: metadata.last_updated,
            window_hours,
            stations,
            selected: selected.iter().map(|s| s.to_string()).collect(),
            aggregate,
        };
        write_document(&self.config.output.path(), &document).await?;

        let count = series.len();
        self.series = series;
        self.last_updated = Some(metadata.last_updated);

        Ok(RefreshOutcome::Updated { stations: count })
    }
}
