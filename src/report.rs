// 🖨️ Report assembly - unit sheets and the consolidated sheet
// Unit sheet (table at A2, 3 row-label columns):
//
//   A1  <unit>
//   header      group | account | category | 2024/04 ... 2025.03 settlement
//   sales       Total sales + one row per sales item
//   expenses    Total expenses + one row per expense triple
//   earnings    Earnings
//   analysis    sales, fixed/variable costs, variable ratio, categories

use crate::aggregation::{AggregationEngine, Rollup};
use crate::calendar::Period;
use crate::error::Result;
use crate::layout::{LabeledValue, ReportTable, RowLabel, SubTableId};
use crate::grid::{Border, CellContent, CellRef, CellStyle, GridSink, NumberFormat, Sheet, StyleName};
use crate::items::{ItemKey, Kind};
use crate::store::{ConsolidatedStore, Scenario, SeriesMap, UnitLedger, EARNINGS_LABEL};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Top-left of every report table (A2)
pub const TABLE_ORIGIN: CellRef = CellRef::new(1, 0);

/// Row-label columns of a unit sheet: group, account, category
pub const UNIT_LABEL_COLUMNS: usize = 3;

/// First cell that scrolls (D3)
pub const FREEZE_ANCHOR: CellRef = CellRef::new(2, 3);

/// File stem of the company-wide sheet
pub const CONSOLIDATED_SHEET: &str = "consolidated";

pub const TOTAL_SALES: &str = "Total sales";
pub const TOTAL_EXPENSES: &str = "Total expenses";
const ANALYSIS_TITLE: &str = "Fixed/variable & category analysis";
const VARIABLE_RATIO: &str = "Variable ratio";

// ============================================================================
// STYLES
// ============================================================================

fn title_style() -> CellStyle {
    CellStyle::named(StyleName::Title).with_border(Border::HairBox)
}

fn header_style() -> CellStyle {
    CellStyle::boxed(StyleName::HeaderDate)
}

fn body_style() -> CellStyle {
    CellStyle::boxed(StyleName::TableMain).with_format(NumberFormat::Number)
}

fn marker_style() -> CellStyle {
    CellStyle::boxed(StyleName::TableYellow).with_format(NumberFormat::Number)
}

fn aggregated_style() -> CellStyle {
    CellStyle::boxed(StyleName::TableAggregated).with_format(NumberFormat::Number)
}

fn accent_style() -> CellStyle {
    CellStyle::boxed(StyleName::TableAggregatedAccent).with_format(NumberFormat::Number)
}

fn shaded_style() -> CellStyle {
    CellStyle::boxed(StyleName::TableLightGray).with_format(NumberFormat::Number)
}

/// `<unit>.<scenario>` / `consolidated.<scenario>`
pub fn sheet_name(unit: &str, scenario: Scenario) -> String {
    format!("{}.{}", unit, scenario.as_str())
}

pub fn sheet_path(directory: &Path, unit: &str, scenario: Scenario) -> PathBuf {
    directory.join(format!("{}.csv", sheet_name(unit, scenario)))
}

// ============================================================================
// REPORT BUILDER
// ============================================================================

pub struct ReportBuilder<'a> {
    store: &'a ConsolidatedStore,
    engine: &'a AggregationEngine,
    headers: Vec<String>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(store: &'a ConsolidatedStore, engine: &'a AggregationEngine, periods: &[Period]) -> Self {
        ReportBuilder {
            store,
            engine,
            headers: periods.iter().map(Period::to_string).collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Render every unit sheet and the consolidated sheet of both scenarios
    /// into `directory`. Returns the written paths.
    pub fn render_all(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for scenario in Scenario::ALL {
            for unit in self.store.registry.units() {
                let sheet = self.unit_sheet(scenario, unit)?;
                let path = sheet_path(directory, unit, scenario);
                sheet.save_csv(&path)?;
                debug!("wrote {}", path.display());
                written.push(path);
            }
            let sheet = self.consolidated_sheet(scenario)?;
            let path = sheet_path(directory, CONSOLIDATED_SHEET, scenario);
            sheet.save_csv(&path)?;
            written.push(path);
        }
        info!("Rendered {} sheets", written.len());
        Ok(written)
    }

    // ------------------------------------------------------------------------
    // Unit sheet
    // ------------------------------------------------------------------------

    pub fn unit_sheet(&self, scenario: Scenario, unit: &str) -> Result<Sheet> {
        let mut sheet = Sheet::new(sheet_name(unit, scenario));
        sheet.write(CellRef::new(0, 0), CellContent::text(unit), title_style());

        let empty = UnitLedger::default();
        let ledger = self.store.scenario(scenario).unit(unit).unwrap_or(&empty);
        let sales_labels: Vec<RowLabel> = self
            .store
            .registry
            .sales_items(unit)
            .map(|item| ItemKey::sales(item.name.as_str()).row_label())
            .collect();
        let expense_labels: Vec<RowLabel> = self
            .store
            .registry
            .get_all(unit, Kind::Expense)?
            .iter()
            .map(|identity| identity.key().row_label())
            .collect();

        let mut table = ReportTable::new(TABLE_ORIGIN, UNIT_LABEL_COLUMNS);
        table.set_headers(self.headers.clone(), header_style());
        table.set_row_label_headers(vec!["Group".into(), "Account".into(), "Category".into()]);

        let sales = self.totaled_sub_table(&mut table, "sales", sales_labels.clone(), true, TOTAL_SALES)?;
        table.add_blank_row(true);
        let expenses = self.totaled_sub_table(&mut table, "expenses", expense_labels, false, TOTAL_EXPENSES)?;
        table.add_blank_row(true);
        let earnings = table.add_single_row(
            "earnings",
            &[EARNINGS_LABEL],
            CellStyle::boxed(StyleName::TableAggregatedAccent),
            true,
        )?;

        // Analysis block
        table.add_blank_row(true);
        table.add_blank_row(true);
        table.add_single_row(
            "analysis_title",
            &[ANALYSIS_TITLE],
            CellStyle::named(StyleName::TableMainLeft).with_border(Border::HairBox),
            true,
        )?;
        let fixval = self.engine.fixval_rollup(self.store, scenario, unit);
        let categories = self.engine.category_rollup(self.store, scenario, unit);
        let fixval_sales = self.totaled_sub_table(&mut table, "fixval_sales", sales_labels, true, TOTAL_SALES)?;
        table.add_blank_row(true);
        let fixval_expenses =
            self.totaled_sub_table(&mut table, "fixval_expenses", fixval.totals.labels.clone(), true, TOTAL_EXPENSES)?;
        let ratio = table.add_single_row(
            "variable_ratio",
            &[VARIABLE_RATIO],
            CellStyle::boxed(StyleName::ColumnLabel),
            true,
        )?;
        table.add_blank_row(true);
        let category_expenses =
            self.totaled_sub_table(&mut table, "category_expenses", categories.labels.clone(), true, TOTAL_EXPENSES)?;

        table.create_frame(&mut sheet);

        let body = body_style();
        let marker = marker_style();
        table
            .sub_table(sales)?
            .fill_body(&mut sheet, |t| series_column(&ledger.sales, t), body, marker)?;
        table
            .sub_table(expenses)?
            .fill_body(&mut sheet, |t| series_column(&ledger.expenses, t), body, marker)?;
        table
            .sub_table(earnings)?
            .fill_body(&mut sheet, |t| series_column(&ledger.earnings, t), accent_style(), marker)?;
        table
            .sub_table(fixval_sales)?
            .fill_body(&mut sheet, |t| series_column(&ledger.sales, t), body, marker)?;
        table
            .sub_table(fixval_expenses)?
            .fill_body(&mut sheet, |t| fixval.totals.column(t), body, marker)?;
        table.sub_table(ratio)?.put_data_in_row(
            &mut sheet,
            0,
            |t| period_lookup(&fixval.variable_ratio, t),
            CellStyle::boxed(StyleName::TableMain).with_format(NumberFormat::Percentage),
        )?;
        table
            .sub_table(category_expenses)?
            .fill_body(&mut sheet, |t| categories.column(t), body, marker)?;

        if unit == self.store.settings.shared_unit {
            self.shade_apportioned_rows(&table, &mut sheet)?;
        }

        sheet.freeze_panes(FREEZE_ANCHOR);
        Ok(sheet)
    }

    /// Light-gray every row whose account column names an apportioned account
    fn shade_apportioned_rows(&self, table: &ReportTable, sheet: &mut Sheet) -> Result<()> {
        let accounts = self.engine.apportioned_accounts(self.store);
        if accounts.is_empty() {
            return Ok(());
        }
        for row in 1..table.row_extent() {
            let account = table.cell_at(&*sheet, row, 1).to_text();
            if accounts.contains(&account) {
                table.set_row_style(sheet, row, shaded_style())?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Consolidated sheet
    // ------------------------------------------------------------------------

    pub fn consolidated_sheet(&self, scenario: Scenario) -> Result<Sheet> {
        let mut sheet = Sheet::new(sheet_name(CONSOLIDATED_SHEET, scenario));
        sheet.write(CellRef::new(0, 0), CellContent::text("Business plan"), title_style());

        let consolidation = self.engine.consolidate(self.store, scenario);
        let earnings = earnings_rollup(&consolidation.earnings);

        let mut table = ReportTable::new(TABLE_ORIGIN, 1);
        table.set_headers(self.headers.clone(), header_style());
        let sales = self.totaled_sub_table(&mut table, "sales", consolidation.sales.labels.clone(), true, TOTAL_SALES)?;
        table.add_blank_row(true);
        let expenses =
            self.totaled_sub_table(&mut table, "expenses", consolidation.expenses.labels.clone(), false, TOTAL_EXPENSES)?;
        table.add_blank_row(true);
        let earnings_row = table.add_single_row(
            "earnings",
            &[EARNINGS_LABEL],
            CellStyle::boxed(StyleName::TableAggregatedAccent),
            true,
        )?;

        table.create_frame(&mut sheet);

        let (body, marker) = (body_style(), marker_style());
        table
            .sub_table(sales)?
            .fill_body(&mut sheet, |t| consolidation.sales.column(t), body, marker)?;
        table
            .sub_table(expenses)?
            .fill_body(&mut sheet, |t| consolidation.expenses.column(t), body, marker)?;
        table
            .sub_table(earnings_row)?
            .fill_body(&mut sheet, |t| earnings.column(t), accent_style(), marker)?;

        sheet.freeze_panes(FREEZE_ANCHOR);
        Ok(sheet)
    }

    fn totaled_sub_table(
        &self,
        table: &mut ReportTable,
        name: &str,
        labels: Vec<RowLabel>,
        merge: bool,
        total_label: &str,
    ) -> Result<SubTableId> {
        let id = table.add_sub_table(name)?;
        let sub = table.sub_table_mut(id)?;
        sub.set_row_labels(labels, CellStyle::boxed(StyleName::ColumnLabel), merge);
        sub.set_aggregation_row(total_label, aggregated_style(), true);
        Ok(id)
    }
}

// ============================================================================
// COLUMN SOURCES
// ============================================================================

fn series_column(series: &SeriesMap, token: &str) -> Option<Vec<LabeledValue>> {
    let period: Period = token.parse().ok()?;
    series.get(&period).map(|month| month.labeled_values())
}

fn period_lookup(values: &BTreeMap<Period, f64>, token: &str) -> Option<f64> {
    let period: Period = token.parse().ok()?;
    values.get(&period).copied()
}

fn earnings_rollup(earnings: &BTreeMap<Period, f64>) -> Rollup {
    let label = RowLabel::single(EARNINGS_LABEL);
    Rollup {
        labels: vec![label.clone()],
        months: earnings
            .iter()
            .map(|(period, value)| (*period, vec![LabeledValue::new(label.clone(), Some(*value))]))
            .collect(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
