// 📥 Ingest - read rendered unit sheets back into the store
// The sheet layout is the one written by the report module; reading uses the
// same table geometry, sized from the registry's current definitions.

use crate::calendar::{Period, YearMonth};
use crate::error::Result;
use crate::grid::{CellRef, GridSink, Sheet};
use crate::items::Kind;
use crate::layout::ReportTable;
use crate::observation::Observation;
use crate::registry::LabelQuery;
use crate::report::{sheet_path, TABLE_ORIGIN, UNIT_LABEL_COLUMNS};
use crate::store::{ConsolidatedStore, Scenario};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Sheets read
    pub sheets: usize,

    /// Observations merged into the store
    pub merged: usize,

    /// Values whose label did not resolve
    pub dropped: usize,

    /// Earliest and latest month read
    pub span: Option<(YearMonth, YearMonth)>,
}

impl IngestSummary {
    fn cover(&mut self, ym: YearMonth) {
        self.span = Some(match self.span {
            None => (ym, ym),
            Some((first, last)) => (first.min(ym), last.max(ym)),
        });
    }

    fn absorb(&mut self, other: IngestSummary) {
        self.sheets += other.sheets;
        self.merged += other.merged;
        self.dropped += other.dropped;
        if let Some((first, last)) = other.span {
            self.cover(first);
            self.cover(last);
        }
    }
}

/// Read `<unit>.<plan|actual>.csv` for every registered unit that has one
pub fn ingest_directory(directory: &Path, store: &mut ConsolidatedStore) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let units: Vec<String> = store.registry.units().map(str::to_string).collect();

    for scenario in Scenario::ALL {
        for unit in &units {
            let path = sheet_path(directory, unit, scenario);
            if !path.exists() {
                continue;
            }
            let sheet = Sheet::load_csv(&path)?;
            summary.absorb(ingest_sheet(&sheet, unit, scenario, store)?);
        }
    }

    if summary.sheets > 0 {
        info!(
            "Ingested {} sheets: {} observations merged, {} unresolved dropped",
            summary.sheets, summary.merged, summary.dropped
        );
    }
    Ok(summary)
}

/// Merge one unit sheet. A sheet whose A1 is not the unit's name is skipped.
pub fn ingest_sheet(
    sheet: &Sheet,
    unit: &str,
    scenario: Scenario,
    store: &mut ConsolidatedStore,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let title = sheet.read(CellRef::new(0, 0)).to_text();
    if title != unit {
        warn!(
            "Skipping sheet '{}': expected title '{}' in A1, found '{}'",
            sheet.name, unit, title
        );
        return Ok(summary);
    }

    let sales_rows = store.registry.get_all(unit, Kind::Sales)?.len() + 1;
    let expense_rows = store.registry.get_all(unit, Kind::Expense)?.len() + 1;

    let mut table = ReportTable::new(TABLE_ORIGIN, UNIT_LABEL_COLUMNS);
    table.read_as_header(sheet, 0);
    let sales = table.add_sub_table("sales")?;
    table.sub_table_mut(sales)?.expect_aggregation_row(true);
    table.read_as_row_labels(sheet, sales, sales_rows)?;
    table.add_blank_row(true);
    let expenses = table.add_sub_table("expenses")?;
    table.sub_table_mut(expenses)?.expect_aggregation_row(true);
    table.read_as_row_labels(sheet, expenses, expense_rows)?;

    for (kind, id) in [(Kind::Sales, sales), (Kind::Expense, expenses)] {
        for (token, values) in table.get_all_data(sheet, id)? {
            if Period::is_settlement_token(&token) {
                continue;
            }
            let period: Period = match token.parse() {
                Ok(period) => period,
                Err(err) => {
                    debug!("{}: ignoring column '{}': {}", sheet.name, token, err);
                    continue;
                }
            };

            let rows: Vec<Observation> = values
                .into_iter()
                .map(|entry| {
                    let query = LabelQuery::from_fields(kind, entry.label.fields());
                    match store.registry.resolve(unit, &query) {
                        Some(identity) => Observation::new(identity.key(), entry.value),
                        None => {
                            debug!("{}: unresolved label {:?}", sheet.name, entry.label.fields());
                            Observation::unresolved(entry.value)
                        }
                    }
                })
                .collect();

            let resolved = rows.iter().filter(|row| row.item.is_some()).count();
            summary.dropped += rows.len() - resolved;
            summary.merged += resolved;
            summary.cover(period.year_month());
            store.merge(scenario, unit, kind, period, rows)?;
        }
    }

    summary.sheets = 1;
    debug!("{}: {} observations", sheet.name, summary.merged);
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
