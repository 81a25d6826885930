// P/L Planner - Core Library
// Consolidates monthly profit/loss figures of several business units into
// per-unit and company-wide report sheets.

pub mod error;
pub mod calendar;     // Period tokens and fiscal calendar
pub mod items;        // Sales items and expense triples
pub mod registry;     // Label Registry
pub mod observation;  // Monthly series and merge
pub mod grid;         // Cell addressing and the in-memory sheet
pub mod layout;       // Grid table layout engine
pub mod store;        // Consolidated store and builder
pub mod aggregation;  // Apportionment, earnings, rollups
pub mod snapshot;     // JSON persistence
pub mod config;       // planner.toml
pub mod report;       // Sheet assembly
pub mod ingest;       // Reading rendered sheets back
pub mod pipeline;     // One consolidation pass

#[cfg(feature = "cli")]
pub mod logger;

// Re-export commonly used types
pub use error::{PlannerError, Result};
pub use calendar::{header_periods, reporting_window, term_end, term_start, Period, YearMonth};
pub use items::{CostBehavior, ExpenseItem, ItemIdentity, ItemKey, Kind, SalesItem};
pub use registry::{LabelQuery, LabelRegistry};
pub use observation::{MonthlySeries, Observation};
pub use grid::{CellContent, CellRange, CellRef, CellStyle, GridSink, Sheet, StyleName};
pub use layout::{fiscal_year_span, LabeledValue, ReportTable, RowLabel, SubTableId};
pub use store::{ConsolidatedStore, RawRecord, Scenario, Settings, StoreBuilder};
pub use aggregation::{AggregationEngine, Consolidation, FixvalRollup, Rollup, UpdateSummary};
pub use snapshot::{load_snapshot, save_snapshot};
pub use config::PlannerConfig;
pub use report::ReportBuilder;
pub use ingest::{ingest_directory, IngestSummary};
pub use pipeline::{Planner, PlannerOptions, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
