// 🔁 Planner pipeline - one consolidation pass per invocation
//
//   snapshot → configuration → store → ingest sheets → window
//            → update (apportion + earnings) → save snapshot → render
//
// A fatal apportionment error aborts before anything is written.

use crate::aggregation::{AggregationEngine, UpdateSummary};
use crate::calendar::{header_periods, reporting_window, YearMonth};
use crate::config::{PlannerConfig, CONFIG_FILE};
use crate::error::Result;
use crate::ingest::{ingest_directory, IngestSummary};
use crate::report::ReportBuilder;
use crate::snapshot::{load_snapshot, save_snapshot};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    /// Holds planner.toml, snapshot.json and the rendered sheets
    pub directory: PathBuf,
    pub start: Option<YearMonth>,
    pub end: Option<YearMonth>,

    /// Write sheets after saving the snapshot
    pub render: bool,

    /// Reference date for the default reporting window
    pub today: NaiveDate,
}

impl PlannerOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        PlannerOptions {
            directory: directory.into(),
            start: None,
            end: None,
            render: true,
            today: Local::now().date_naive(),
        }
    }

    pub fn with_window(mut self, start: Option<YearMonth>, end: Option<YearMonth>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn without_render(mut self) -> Self {
        self.render = false;
        self
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(SNAPSHOT_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.directory.join(CONFIG_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub units: usize,
    pub window: (YearMonth, YearMonth),
    pub ingest: IngestSummary,
    pub update: UpdateSummary,
    pub snapshot: PathBuf,
    pub written: Vec<PathBuf>,
}

pub struct Planner {
    options: PlannerOptions,
    engine: AggregationEngine,
}

impl Planner {
    pub fn new(options: PlannerOptions) -> Self {
        Planner {
            options,
            engine: AggregationEngine::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.options.directory
    }

    pub fn run(&self) -> Result<RunSummary> {
        let options = &self.options;

        info!("Loading snapshot");
        let mut builder = load_snapshot(&options.snapshot_path())?;

        info!("Loading configuration");
        if let Some(config) = PlannerConfig::load_optional(&options.config_path())? {
            config.register(&mut builder);
        }

        let mut store = builder.build();
        let units = store.registry.units().count();
        info!(
            "Store ready: {} units, {} definitions",
            units,
            store.registry.count()
        );

        let ingest = ingest_directory(&options.directory, &mut store)?;
        if let Some((first, last)) = ingest.span {
            info!("Sheets cover {} - {}", first, last);
        }

        let settlement_month = store.settings.settlement_month;
        let window = match (options.start, options.end, ingest.span) {
            // Keep the window of the sheets already on disk
            (None, None, Some((first, last))) => {
                reporting_window(Some(first), Some(last), options.today, settlement_month)
            }
            (start, end, _) => reporting_window(start, end, options.today, settlement_month),
        };
        info!("Reporting window {} - {}", window.0, window.1);

        let update = self.engine.update(&mut store)?;

        let snapshot = options.snapshot_path();
        save_snapshot(&snapshot, &store)?;

        let written = if options.render {
            let periods = header_periods(window.0, window.1, settlement_month);
            ReportBuilder::new(&store, &self.engine, &periods).render_all(&options.directory)?
        } else {
            Vec::new()
        };

        Ok(RunSummary {
            units,
            window,
            ingest,
            update,
            snapshot,
            written,
        })
    }
}
