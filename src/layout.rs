// 📐 Grid table layout engine - stacked sub-tables under one header row
// A table is a header row followed by an ordered partition of regions
// (sub-tables and blank spacers). Every row position is derived from that
// partition; nothing else stores absolute rows.
//
//   row 0            header (row-label headers + column tokens)
//   region 0         sub-table: [aggregation row] + one row per label
//   region 1         blank spacer (1 row)
//   ...

use crate::calendar::Period;
use crate::error::{PlannerError, Result};
use crate::grid::{sum_formula, CellContent, CellRange, CellRef, CellStyle, GridSink};
use std::ops::Range;

/// Number of trailing month columns a fiscal-year-end column sums
pub const FISCAL_YEAR_MONTHS: usize = 12;

// ============================================================================
// ROW LABELS AND DATA ROWS
// ============================================================================

/// Label tuple of one row. Data is matched to rows by value equality of this
/// tuple, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RowLabel(Vec<String>);

impl RowLabel {
    pub fn new(fields: Vec<String>) -> Self {
        RowLabel(fields)
    }

    pub fn single(field: impl Into<String>) -> Self {
        RowLabel(vec![field.into()])
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

/// One value destined for the row carrying `label`
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledValue {
    pub label: RowLabel,
    pub value: Option<f64>,
}

impl LabeledValue {
    pub fn new(label: RowLabel, value: Option<f64>) -> Self {
        LabeledValue { label, value }
    }
}

// ============================================================================
// SUB-TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubTableId(usize);

#[derive(Debug, Clone)]
struct AggregationRow {
    label: String,
    style: CellStyle,
    at_top: bool,
}

/// Named region of a table; its row extent is the number of labels plus one
/// when it carries an aggregation row
#[derive(Debug, Clone)]
pub struct SubTable {
    name: String,
    row_labels: Vec<RowLabel>,
    row_label_style: CellStyle,
    merge_row_labels: bool,
    aggregation: Option<AggregationRow>,
}

impl SubTable {
    fn new(name: &str) -> Self {
        SubTable {
            name: name.to_string(),
            row_labels: Vec::new(),
            row_label_style: CellStyle::default(),
            merge_row_labels: false,
            aggregation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One row per label, in order. With `merge` the label cells of each row
    /// render as one merged cell.
    pub fn set_row_labels(&mut self, labels: Vec<RowLabel>, style: CellStyle, merge: bool) {
        self.row_labels = labels;
        self.row_label_style = style;
        self.merge_row_labels = merge;
    }

    /// Add the SUM row over this sub-table's data rows
    pub fn set_aggregation_row(&mut self, label: impl Into<String>, style: CellStyle, at_top: bool) {
        self.aggregation = Some(AggregationRow {
            label: label.into(),
            style,
            at_top,
        });
    }

    /// Declare an aggregation row when reading an existing table, so that
    /// offsets match what was rendered
    pub fn expect_aggregation_row(&mut self, at_top: bool) {
        self.set_aggregation_row(String::new(), CellStyle::default(), at_top);
    }

    pub fn row_labels(&self) -> &[RowLabel] {
        &self.row_labels
    }

    pub fn has_aggregation_row(&self) -> bool {
        self.aggregation.is_some()
    }

    pub fn row_extent(&self) -> usize {
        self.row_labels.len() + usize::from(self.aggregation.is_some())
    }

    /// (offset of the first data row, offset of the aggregation row)
    fn offsets(&self) -> (usize, Option<usize>) {
        match &self.aggregation {
            None => (0, None),
            Some(agg) if agg.at_top => (1, Some(0)),
            Some(_) => (0, Some(self.row_labels.len())),
        }
    }
}

// ============================================================================
// REPORT TABLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    SubTable(SubTableId),
    Blank { merge: bool },
}

/// A rectangular report table anchored at `origin`
#[derive(Debug, Clone)]
pub struct ReportTable {
    origin: CellRef,
    row_label_columns: usize,
    row_label_headers: Vec<String>,
    headers: Vec<String>,
    header_style: CellStyle,
    regions: Vec<Region>,
    sub_tables: Vec<SubTable>,
}

impl ReportTable {
    /// Table whose header row starts at `origin`, with `row_label_columns`
    /// label columns before the data columns
    pub fn new(origin: CellRef, row_label_columns: usize) -> Self {
        ReportTable {
            origin,
            row_label_columns,
            row_label_headers: Vec::new(),
            headers: Vec::new(),
            header_style: CellStyle::default(),
            regions: Vec::new(),
            sub_tables: Vec::new(),
        }
    }

    pub fn origin(&self) -> CellRef {
        self.origin
    }

    pub fn row_label_columns(&self) -> usize {
        self.row_label_columns
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Total columns: label columns + data columns
    pub fn width(&self) -> usize {
        self.row_label_columns + self.headers.len()
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    fn region_extent(&self, region: &Region) -> usize {
        match region {
            Region::Blank { .. } => 1,
            Region::SubTable(id) => self.sub_tables[id.0].row_extent(),
        }
    }

    /// Rows occupied by the whole table, header included
    pub fn row_extent(&self) -> usize {
        1 + self
            .regions
            .iter()
            .map(|region| self.region_extent(region))
            .sum::<usize>()
    }

    /// Table-relative row span of every region, in order
    pub fn region_rows(&self) -> Vec<Range<usize>> {
        let mut row = 1;
        self.regions
            .iter()
            .map(|region| {
                let start = row;
                row += self.region_extent(region);
                start..row
            })
            .collect()
    }

    /// Table-relative row of a sub-table's first row
    fn sub_table_top(&self, id: SubTableId) -> usize {
        let mut row = 1;
        for region in &self.regions {
            if *region == Region::SubTable(id) {
                return row;
            }
            row += self.region_extent(region);
        }
        row
    }

    /// Absolute cell for a table-relative position (column 0 is the first
    /// row-label column)
    fn cell(&self, row: usize, col: usize) -> CellRef {
        CellRef::new(self.origin.row + row as u32, self.origin.col + col as u32)
    }

    fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.headers.len() {
            return Err(PlannerError::ColumnOutOfRange {
                column,
                width: self.headers.len(),
            });
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        let extent = self.row_extent();
        if row == 0 || row >= extent {
            return Err(PlannerError::RowOutOfRange { row, extent });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// Append a named sub-table after every region defined so far
    pub fn add_sub_table(&mut self, name: &str) -> Result<SubTableId> {
        if self.find_sub_table(name).is_some() {
            return Err(PlannerError::DuplicateSubTable {
                name: name.to_string(),
            });
        }
        let id = SubTableId(self.sub_tables.len());
        self.sub_tables.push(SubTable::new(name));
        self.regions.push(Region::SubTable(id));
        Ok(id)
    }

    /// Sub-table with one single-field row per label
    pub fn add_single_row(
        &mut self,
        name: &str,
        labels: &[&str],
        style: CellStyle,
        merge: bool,
    ) -> Result<SubTableId> {
        let id = self.add_sub_table(name)?;
        let rows = labels.iter().map(|label| RowLabel::single(*label)).collect();
        self.sub_table_mut(id)?.set_row_labels(rows, style, merge);
        Ok(id)
    }

    /// Append a one-row spacer; with `merge` it renders as a single merged
    /// region spanning the full table width
    pub fn add_blank_row(&mut self, merge: bool) {
        self.regions.push(Region::Blank { merge });
    }

    /// Insert a spacer right after the named sub-table (appended when the
    /// name is unknown). Later regions move down with it.
    pub fn add_blank_row_after(&mut self, name: &str, merge: bool) {
        let position = self.find_sub_table(name).and_then(|id| {
            self.regions
                .iter()
                .position(|region| *region == Region::SubTable(id))
        });
        match position {
            Some(idx) => self.regions.insert(idx + 1, Region::Blank { merge }),
            None => self.add_blank_row(merge),
        }
    }

    /// Column tokens; data column `i` sits at `row_label_columns + i`
    pub fn set_headers(&mut self, headers: Vec<String>, style: CellStyle) {
        self.headers = headers;
        self.header_style = style;
    }

    /// Captions above the row-label columns
    pub fn set_row_label_headers(&mut self, headers: Vec<String>) {
        self.row_label_headers = headers;
    }

    pub fn find_sub_table(&self, name: &str) -> Option<SubTableId> {
        self.sub_tables
            .iter()
            .position(|st| st.name == name)
            .map(SubTableId)
    }

    fn check_id(&self, id: SubTableId) -> Result<()> {
        if id.0 < self.sub_tables.len() {
            Ok(())
        } else {
            Err(PlannerError::UnknownSubTable {
                index: id.0,
                count: self.sub_tables.len(),
            })
        }
    }

    pub fn sub_table_mut(&mut self, id: SubTableId) -> Result<&mut SubTable> {
        let count = self.sub_tables.len();
        self.sub_tables
            .get_mut(id.0)
            .ok_or(PlannerError::UnknownSubTable { index: id.0, count })
    }

    /// Writer for one sub-table; fails for an id handed out by another table
    pub fn sub_table(&self, id: SubTableId) -> Result<SubTableRef<'_>> {
        self.check_id(id)?;
        Ok(SubTableRef { table: self, id })
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Render the header row, row labels, spacers and aggregation formulas
    pub fn create_frame<S: GridSink>(&self, sink: &mut S) {
        for i in 0..self.row_label_columns {
            let content = self
                .row_label_headers
                .get(i)
                .map_or(CellContent::Empty, |h| CellContent::text(h.as_str()));
            sink.write(self.cell(0, i), content, self.header_style);
        }
        for (i, header) in self.headers.iter().enumerate() {
            sink.write(
                self.cell(0, self.row_label_columns + i),
                CellContent::text(header.as_str()),
                self.header_style,
            );
        }

        let mut row = 1;
        for region in &self.regions {
            match region {
                Region::Blank { merge: true } => {
                    if self.width() > 0 {
                        sink.merge_region(CellRange::new(
                            self.cell(row, 0),
                            self.cell(row, self.width() - 1),
                        ));
                    }
                }
                Region::Blank { merge: false } => {
                    for col in 0..self.width() {
                        sink.write(self.cell(row, col), CellContent::Empty, CellStyle::default());
                    }
                }
                Region::SubTable(id) => SubTableRef { table: self, id: *id }.create_frame(sink, row),
            }
            row += self.region_extent(region);
        }
    }

    /// SUM over table rows `start_row..=end_row` in every data column, written
    /// at `row`. Rows are table-relative (the header is row 0).
    pub fn put_row_sum<S: GridSink>(
        &self,
        sink: &mut S,
        row: usize,
        start_row: usize,
        end_row: usize,
        style: CellStyle,
    ) -> Result<()> {
        self.check_row(row)?;
        for i in 0..self.headers.len() {
            let col = self.row_label_columns + i;
            sink.write(
                self.cell(row, col),
                sum_formula(self.cell(start_row, col), self.cell(end_row, col)),
                style,
            );
        }
        Ok(())
    }

    /// Write one value at a table-relative row and data column
    pub fn put_data_at<S: GridSink>(
        &self,
        sink: &mut S,
        column: usize,
        row: usize,
        content: CellContent,
        style: CellStyle,
    ) -> Result<()> {
        self.check_row(row)?;
        self.check_column(column)?;
        sink.write(self.cell(row, self.row_label_columns + column), content, style);
        Ok(())
    }

    /// Restyle every data cell of a table-relative row
    pub fn set_row_style<S: GridSink>(&self, sink: &mut S, row: usize, style: CellStyle) -> Result<()> {
        self.check_row(row)?;
        for i in 0..self.headers.len() {
            sink.set_style(self.cell(row, self.row_label_columns + i), style);
        }
        Ok(())
    }

    /// Read back a cell by table-relative position (column 0 is the first
    /// row-label column)
    pub fn cell_at<S: GridSink>(&self, sink: &S, row: usize, col: usize) -> CellContent {
        sink.read(self.cell(row, col))
    }

    // ------------------------------------------------------------------------
    // Reading an existing table
    // ------------------------------------------------------------------------

    /// Take the tokens of `row` (table-relative) as column headers, scanning
    /// right until the first empty cell
    pub fn read_as_header<S: GridSink>(&mut self, sink: &S, row: usize) -> &[String] {
        let mut headers = Vec::new();
        let mut col = self.row_label_columns;
        loop {
            let content = sink.read(self.cell(row, col));
            if content.is_empty() {
                break;
            }
            headers.push(content.to_text());
            col += 1;
        }
        self.headers = headers;
        &self.headers
    }

    /// Treat the next `row_size` rows (aggregation row included) as the given
    /// sub-table and read its row labels
    pub fn read_as_row_labels<S: GridSink>(&mut self, sink: &S, id: SubTableId, row_size: usize) -> Result<()> {
        self.check_id(id)?;
        let top = self.sub_table_top(id);
        let sub = &self.sub_tables[id.0];
        let data_rows = row_size.saturating_sub(usize::from(sub.has_aggregation_row()));
        let data_offset = match &sub.aggregation {
            Some(agg) if agg.at_top => 1,
            _ => 0,
        };

        let labels = (0..data_rows)
            .map(|i| {
                let fields = (0..self.row_label_columns)
                    .map(|k| sink.read(self.cell(top + data_offset + i, k)).to_text())
                    .collect();
                RowLabel::new(fields)
            })
            .collect();
        self.sub_tables[id.0].row_labels = labels;
        Ok(())
    }

    /// Body of a sub-table, one entry per header in column order
    pub fn get_all_data<S: GridSink>(&self, sink: &S, id: SubTableId) -> Result<Vec<(String, Vec<LabeledValue>)>> {
        let sub = self.sub_table(id)?;
        let data = self
            .headers
            .iter()
            .enumerate()
            .map(|(k, header)| {
                let values = sub
                    .labels()
                    .iter()
                    .enumerate()
                    .map(|(i, label)| {
                        let cell = self.cell(sub.data_row(i), self.row_label_columns + k);
                        LabeledValue::new(label.clone(), sink.read(cell).as_number())
                    })
                    .collect();
                (header.clone(), values)
            })
            .collect();
        Ok(data)
    }
}

// ============================================================================
// SUB-TABLE VIEW (writes resolved against the parent's geometry)
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct SubTableRef<'t> {
    table: &'t ReportTable,
    id: SubTableId,
}

impl<'t> SubTableRef<'t> {
    fn inner(&self) -> &'t SubTable {
        &self.table.sub_tables[self.id.0]
    }

    pub fn name(&self) -> &'t str {
        &self.inner().name
    }

    pub fn labels(&self) -> &'t [RowLabel] {
        &self.inner().row_labels
    }

    /// Table-relative row of the sub-table's first row
    pub fn top(&self) -> usize {
        self.table.sub_table_top(self.id)
    }

    pub fn row_extent(&self) -> usize {
        self.inner().row_extent()
    }

    /// Table-relative row of data row `i`
    pub fn data_row(&self, i: usize) -> usize {
        self.top() + self.inner().offsets().0 + i
    }

    /// Table-relative row of the aggregation row, if any
    pub fn aggregation_row(&self) -> Option<usize> {
        self.inner().offsets().1.map(|offset| self.top() + offset)
    }

    fn create_frame<S: GridSink>(&self, sink: &mut S, top: usize) {
        let sub = self.inner();
        let table = self.table;
        let (data_offset, agg_offset) = sub.offsets();
        let label_columns = table.row_label_columns;

        for (i, label) in sub.row_labels.iter().enumerate() {
            let row = top + data_offset + i;
            for k in 0..label_columns {
                let content = label
                    .fields()
                    .get(k)
                    .map_or(CellContent::Empty, |f| CellContent::text(f.as_str()));
                sink.write(table.cell(row, k), content, sub.row_label_style);
            }
            if sub.merge_row_labels && label_columns > 1 {
                sink.merge_region(CellRange::new(
                    table.cell(row, 0),
                    table.cell(row, label_columns - 1),
                ));
            }
        }

        if let (Some(agg), Some(offset)) = (&sub.aggregation, agg_offset) {
            let row = top + offset;
            if label_columns > 0 {
                sink.write(table.cell(row, 0), CellContent::text(agg.label.as_str()), agg.style);
                for k in 1..label_columns {
                    sink.write(table.cell(row, k), CellContent::Empty, agg.style);
                }
            }
            if label_columns > 1 {
                sink.merge_region(CellRange::new(
                    table.cell(row, 0),
                    table.cell(row, label_columns - 1),
                ));
            }
            for column in 0..table.headers.len() {
                self.put_aggregation_sum(sink, column);
            }
        }
    }

    /// SUM over this sub-table's data rows in one column. An empty sub-table
    /// still gets its (empty-range) formula.
    fn put_aggregation_sum<S: GridSink>(&self, sink: &mut S, column: usize) {
        let sub = self.inner();
        let (Some(agg), Some(agg_row)) = (&sub.aggregation, self.aggregation_row()) else {
            return;
        };
        let table = self.table;
        let col = table.row_label_columns + column;
        let first = self.data_row(0);
        let last = (first + sub.row_labels.len()).saturating_sub(1);
        sink.write(
            table.cell(agg_row, col),
            sum_formula(table.cell(first, col), table.cell(last, col)),
            agg.style,
        );
    }

    /// Fill one column: each row gets the value whose label equals the row's
    /// label, or a blank. `None` blanks the whole column.
    pub fn put_data_in_column<S: GridSink>(
        &self,
        sink: &mut S,
        column: usize,
        data: Option<&[LabeledValue]>,
        style: CellStyle,
    ) -> Result<()> {
        self.table.check_column(column)?;
        self.put_aggregation_sum(sink, column);

        let col = self.table.row_label_columns + column;
        for (i, label) in self.labels().iter().enumerate() {
            let value = data
                .and_then(|rows| rows.iter().find(|entry| entry.label == *label))
                .and_then(|entry| entry.value);
            sink.write(self.table.cell(self.data_row(i), col), CellContent::number(value), style);
        }
        Ok(())
    }

    /// Per data row, SUM across data columns `start..=end`
    pub fn put_column_sum<S: GridSink>(
        &self,
        sink: &mut S,
        column: usize,
        start: usize,
        end: usize,
        style: CellStyle,
    ) -> Result<()> {
        for c in [column, start, end] {
            self.table.check_column(c)?;
        }
        let offset = self.table.row_label_columns;
        for i in 0..self.labels().len() {
            let row = self.data_row(i);
            sink.write(
                self.table.cell(row, offset + column),
                sum_formula(self.table.cell(row, offset + start), self.table.cell(row, offset + end)),
                style,
            );
        }
        Ok(())
    }

    /// Fiscal-year-end column: SUM over the columns chosen by
    /// `fiscal_year_span`
    pub fn put_fiscal_year_sum<S: GridSink>(
        &self,
        sink: &mut S,
        column: usize,
        markers_before: usize,
        style: CellStyle,
    ) -> Result<()> {
        match fiscal_year_span(column, markers_before) {
            Some((start, end)) => self.put_column_sum(sink, column, start, end, style),
            None => self.put_data_in_column(sink, column, None, style),
        }
    }

    /// Write data row `index` across all columns; `lookup` maps a header
    /// token to its value
    pub fn put_data_in_row<S, F>(&self, sink: &mut S, index: usize, lookup: F, style: CellStyle) -> Result<()>
    where
        S: GridSink,
        F: Fn(&str) -> Option<f64>,
    {
        if index >= self.labels().len() {
            return Err(PlannerError::RowOutOfRange {
                row: index,
                extent: self.labels().len(),
            });
        }
        let row = self.data_row(index);
        for (i, header) in self.table.headers.iter().enumerate() {
            sink.write(
                self.table.cell(row, self.table.row_label_columns + i),
                CellContent::number(lookup(header)),
                style,
            );
        }
        Ok(())
    }

    /// Restyle data row `index`
    pub fn set_row_style<S: GridSink>(&self, sink: &mut S, index: usize, style: CellStyle) -> Result<()> {
        if index >= self.labels().len() {
            return Err(PlannerError::RowOutOfRange {
                row: index,
                extent: self.labels().len(),
            });
        }
        self.table.set_row_style(sink, self.data_row(index), style)
    }

    /// Fill every column of the body. Month columns take `column_data(token)`
    /// (blank when `None`); fiscal-year-end columns get range sums.
    pub fn fill_body<S, F>(&self, sink: &mut S, column_data: F, style: CellStyle, marker_style: CellStyle) -> Result<()>
    where
        S: GridSink,
        F: Fn(&str) -> Option<Vec<LabeledValue>>,
    {
        let mut markers = 0;
        for (column, header) in self.table.headers.iter().enumerate() {
            if Period::is_settlement_token(header) {
                self.put_fiscal_year_sum(sink, column, markers, marker_style)?;
                markers += 1;
            } else {
                let data = column_data(header);
                self.put_data_in_column(sink, column, data.as_deref(), style)?;
            }
        }
        Ok(())
    }
}

/// Columns summed by the fiscal-year-end column at `column`.
///
/// Fewer than twelve columns since the table start (counting earlier
/// markers twice) sums from column 0; otherwise the twelve columns right
/// before the marker, clamped at column 0. `None` when nothing precedes the
/// marker.
pub fn fiscal_year_span(column: usize, markers_before: usize) -> Option<(usize, usize)> {
    if column == 0 {
        return None;
    }
    if column + markers_before < FISCAL_YEAR_MONTHS {
        Some((0, column - 1))
    } else {
        Some((column.saturating_sub(FISCAL_YEAR_MONTHS), column - 1))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Sheet, StyleName};

    fn labels(rows: &[&[&str]]) -> Vec<RowLabel> {
        rows.iter()
            .map(|fields| RowLabel::new(fields.iter().map(|f| f.to_string()).collect()))
            .collect()
    }

    fn headers(count: usize) -> Vec<String> {
        (1..=count).map(|m| format!("2024/{:02}", m)).collect()
    }

    fn formula(sheet: &Sheet, a1_row: u32, col: u32) -> String {
        sheet.read(CellRef::new(a1_row - 1, col)).to_text()
    }

    /// Table at A2 with 3 label columns: sales (2 rows + total at top),
    /// spacer, expenses (1 row + total at bottom)
    fn sample_table() -> (ReportTable, SubTableId, SubTableId) {
        let mut table = ReportTable::new(CellRef::new(1, 0), 3);
        table.set_headers(headers(3), CellStyle::named(StyleName::HeaderDate));

        let sales = table.add_sub_table("sales").unwrap();
        table.sub_table_mut(sales).unwrap().set_row_labels(
            labels(&[&["Store"], &["Online"]]),
            CellStyle::named(StyleName::ColumnLabel),
            true,
        );
        table
            .sub_table_mut(sales)
            .unwrap()
            .set_aggregation_row("Total sales", CellStyle::named(StyleName::TableAggregated), true);
        table.add_blank_row(true);

        let expenses = table.add_sub_table("expenses").unwrap();
        table.sub_table_mut(expenses).unwrap().set_row_labels(
            labels(&[&["Office", "Rent", "Facilities"]]),
            CellStyle::named(StyleName::ColumnLabel),
            false,
        );
        table
            .sub_table_mut(expenses)
            .unwrap()
            .set_aggregation_row("Total expenses", CellStyle::named(StyleName::TableAggregated), false);
        (table, sales, expenses)
    }

    #[test]
    fn test_geometry_invariant() {
        let (table, sales, expenses) = sample_table();
        let spans = table.region_rows();

        assert_eq!(spans, vec![1..4, 4..5, 5..7]);
        assert_eq!(table.row_extent(), 1 + spans.iter().map(|r| r.len()).sum::<usize>());
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(table.sub_table(sales).unwrap().top(), 1);
        assert_eq!(table.sub_table(expenses).unwrap().top(), 5);
        assert_eq!(table.sub_table(expenses).unwrap().aggregation_row(), Some(6));
    }

    #[test]
    fn test_extent_tracks_configuration_order() {
        let mut table = ReportTable::new(CellRef::new(0, 0), 1);
        let id = table.add_sub_table("x").unwrap();
        assert_eq!(table.sub_table(id).unwrap().row_extent(), 0);

        table
            .sub_table_mut(id)
            .unwrap()
            .set_aggregation_row("Total", CellStyle::default(), true);
        assert_eq!(table.sub_table(id).unwrap().row_extent(), 1);

        table
            .sub_table_mut(id)
            .unwrap()
            .set_row_labels(labels(&[&["a"], &["b"]]), CellStyle::default(), false);
        assert_eq!(table.sub_table(id).unwrap().row_extent(), 3);
        assert_eq!(table.row_extent(), 4);
    }

    #[test]
    fn test_duplicate_sub_table_name_fails() {
        let (mut table, _, _) = sample_table();
        assert!(matches!(
            table.add_sub_table("sales"),
            Err(PlannerError::DuplicateSubTable { .. })
        ));
    }

    #[test]
    fn test_create_frame_renders_headers_labels_and_sums() {
        let (table, _, _) = sample_table();
        let mut sheet = Sheet::new("frame");
        table.create_frame(&mut sheet);

        // Header row is sheet row 2, data columns start at D
        assert_eq!(formula(&sheet, 2, 3), "2024/01");
        assert_eq!(formula(&sheet, 2, 5), "2024/03");
        // Sales total at top (row 3), data rows 4-5
        assert_eq!(formula(&sheet, 3, 0), "Total sales");
        assert_eq!(formula(&sheet, 3, 3), "=SUM(D4:D5)");
        assert_eq!(formula(&sheet, 4, 0), "Store");
        assert_eq!(formula(&sheet, 5, 0), "Online");
        // Spacer on row 6 spans A:F
        assert!(sheet
            .merged_regions()
            .contains(&CellRange::new(CellRef::new(5, 0), CellRef::new(5, 5))));
        // Expenses: data row 7, total at bottom on row 8
        assert_eq!(formula(&sheet, 7, 1), "Rent");
        assert_eq!(formula(&sheet, 8, 0), "Total expenses");
        assert_eq!(formula(&sheet, 8, 4), "=SUM(E7:E7)");
        // Merged label cells only where requested
        assert!(sheet
            .merged_regions()
            .contains(&CellRange::new(CellRef::new(3, 0), CellRef::new(3, 2))));
        assert!(!sheet
            .merged_regions()
            .contains(&CellRange::new(CellRef::new(6, 0), CellRef::new(6, 2))));
    }

    #[test]
    fn test_put_data_in_column_matches_by_label() {
        let (table, sales, _) = sample_table();
        let mut sheet = Sheet::new("data");
        let data = vec![LabeledValue::new(RowLabel::single("Online"), Some(250.0))];

        table
            .sub_table(sales)
            .unwrap()
            .put_data_in_column(&mut sheet, 1, Some(&data), CellStyle::default())
            .unwrap();

        // "Store" omitted → blank, "Online" keeps its own row
        assert_eq!(sheet.read(CellRef::new(3, 4)), CellContent::Empty);
        assert_eq!(sheet.read(CellRef::new(4, 4)), CellContent::Number(250.0));
        assert_eq!(formula(&sheet, 3, 4), "=SUM(E4:E5)");
    }

    #[test]
    fn test_put_data_in_column_rejects_unknown_column() {
        let (table, sales, _) = sample_table();
        let mut sheet = Sheet::new("data");
        let result = table
            .sub_table(sales)
            .unwrap()
            .put_data_in_column(&mut sheet, 3, None, CellStyle::default());
        assert!(matches!(result, Err(PlannerError::ColumnOutOfRange { column: 3, width: 3 })));
    }

    #[test]
    fn test_empty_sub_table_still_emits_sum() {
        let mut table = ReportTable::new(CellRef::new(1, 0), 1);
        table.set_headers(headers(1), CellStyle::default());
        let id = table.add_sub_table("empty").unwrap();
        table
            .sub_table_mut(id)
            .unwrap()
            .set_aggregation_row("Total", CellStyle::default(), true);

        let mut sheet = Sheet::new("empty");
        table.create_frame(&mut sheet);
        // Total on row 3; the empty data range runs from row 4 back to row 3
        assert_eq!(formula(&sheet, 3, 1), "=SUM(B4:B3)");
    }

    #[test]
    fn test_blank_row_after_shifts_later_regions() {
        let (mut table, sales, expenses) = sample_table();
        let before = table.sub_table(expenses).unwrap().top();
        table.add_blank_row_after("sales", false);

        assert_eq!(table.sub_table(sales).unwrap().top(), 1);
        assert_eq!(table.sub_table(expenses).unwrap().top(), before + 1);
        assert_eq!(table.region_rows().len(), 4);
    }

    #[test]
    fn test_fiscal_year_sum_after_twelve_months() {
        // 15 months with the marker after month 12
        let mut tokens = headers(12);
        tokens.push("2024.12 settlement".to_string());
        tokens.extend(["2025/01", "2025/02", "2025/03"].map(String::from));

        let mut table = ReportTable::new(CellRef::new(1, 0), 3);
        table.set_headers(tokens, CellStyle::default());
        let id = table.add_sub_table("sales").unwrap();
        table
            .sub_table_mut(id)
            .unwrap()
            .set_row_labels(labels(&[&["Store"]]), CellStyle::default(), false);

        let mut sheet = Sheet::new("fy");
        table
            .sub_table(id)
            .unwrap()
            .fill_body(&mut sheet, |_| None, CellStyle::default(), CellStyle::default())
            .unwrap();

        // Data starts at D; months 1-12 are D..O, the marker is P
        assert_eq!(formula(&sheet, 3, 15), "=SUM(D3:O3)");
    }

    #[test]
    fn test_sub_table_id_from_another_table_fails() {
        let (_, _, expenses) = sample_table();
        let mut other = ReportTable::new(CellRef::new(0, 0), 1);
        other.add_sub_table("only").unwrap();

        assert!(matches!(
            other.sub_table(expenses),
            Err(PlannerError::UnknownSubTable { index: 1, count: 1 })
        ));
        assert!(other.sub_table_mut(expenses).is_err());
        let sheet = Sheet::new("empty");
        let err = other.read_as_row_labels(&sheet, expenses, 2).unwrap_err();
        assert!(err.is_structural());
        assert!(other.get_all_data(&sheet, expenses).is_err());
    }

    #[test]
    fn test_fiscal_year_span_policy() {
        assert_eq!(fiscal_year_span(12, 0), Some((0, 11)));
        assert_eq!(fiscal_year_span(5, 0), Some((0, 4)));
        assert_eq!(fiscal_year_span(18, 1), Some((6, 17)));
        assert_eq!(fiscal_year_span(25, 1), Some((13, 24)));
        assert_eq!(fiscal_year_span(0, 0), None);
        // Two markers closer than a year apart
        assert_eq!(fiscal_year_span(11, 1), Some((0, 10)));
    }

    #[test]
    fn test_put_data_in_row_and_bounds() {
        let mut table = ReportTable::new(CellRef::new(0, 0), 1);
        table.set_headers(headers(2), CellStyle::default());
        let id = table
            .add_single_row("ratio", &["Variable ratio"], CellStyle::default(), true)
            .unwrap();

        let mut sheet = Sheet::new("row");
        let sub = table.sub_table(id).unwrap();
        sub.put_data_in_row(&mut sheet, 0, |h| (h == "2024/02").then_some(0.25), CellStyle::default())
            .unwrap();
        assert_eq!(sheet.read(CellRef::new(1, 1)), CellContent::Empty);
        assert_eq!(sheet.read(CellRef::new(1, 2)), CellContent::Number(0.25));

        assert!(matches!(
            sub.put_data_in_row(&mut sheet, 1, |_| None, CellStyle::default()),
            Err(PlannerError::RowOutOfRange { .. })
        ));
        assert!(matches!(
            table.put_data_at(&mut sheet, 0, 2, CellContent::Number(1.0), CellStyle::default()),
            Err(PlannerError::RowOutOfRange { row: 2, extent: 2 })
        ));
    }

    #[test]
    fn test_read_mode_inverts_write_mode() {
        let (table, sales, expenses) = sample_table();
        let mut sheet = Sheet::new("roundtrip");
        table.create_frame(&mut sheet);
        let sales_data = vec![
            LabeledValue::new(RowLabel::single("Store"), Some(100.0)),
            LabeledValue::new(RowLabel::single("Online"), Some(40.0)),
        ];
        table
            .sub_table(sales)
            .unwrap()
            .put_data_in_column(&mut sheet, 0, Some(&sales_data), CellStyle::default())
            .unwrap();
        let rent = vec![LabeledValue::new(
            RowLabel::new(vec!["Office".into(), "Rent".into(), "Facilities".into()]),
            Some(30.0),
        )];
        table
            .sub_table(expenses)
            .unwrap()
            .put_data_in_column(&mut sheet, 2, Some(&rent), CellStyle::default())
            .unwrap();

        let mut reader = ReportTable::new(CellRef::new(1, 0), 3);
        assert_eq!(reader.read_as_header(&sheet, 0), headers(3).as_slice());

        let read_sales = reader.add_sub_table("sales").unwrap();
        reader.sub_table_mut(read_sales).unwrap().expect_aggregation_row(true);
        reader.read_as_row_labels(&sheet, read_sales, 3).unwrap();
        reader.add_blank_row(true);
        let read_expenses = reader.add_sub_table("expenses").unwrap();
        reader.sub_table_mut(read_expenses).unwrap().expect_aggregation_row(false);
        reader.read_as_row_labels(&sheet, read_expenses, 2).unwrap();

        assert_eq!(
            reader.sub_table(read_sales).unwrap().labels(),
            &[
                RowLabel::new(vec!["Store".into(), String::new(), String::new()]),
                RowLabel::new(vec!["Online".into(), String::new(), String::new()]),
            ]
        );

        let data = reader.get_all_data(&sheet, read_sales).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0].0, "2024/01");
        assert_eq!(data[0].1[0].value, Some(100.0));
        assert_eq!(data[0].1[1].value, Some(40.0));
        assert_eq!(data[1].1[0].value, None);

        let data = reader.get_all_data(&sheet, read_expenses).unwrap();
        assert_eq!(data[2].1[0].label.fields(), ["Office", "Rent", "Facilities"]);
        assert_eq!(data[2].1[0].value, Some(30.0));
    }

    #[test]
    fn test_put_row_sum_spans_every_data_column() {
        let (table, _, _) = sample_table();
        let mut sheet = Sheet::new("rows");
        // Spacer row (table row 4) totals the two sales rows
        table
            .put_row_sum(&mut sheet, 4, 2, 3, CellStyle::named(StyleName::TableAggregated))
            .unwrap();
        assert_eq!(formula(&sheet, 6, 3), "=SUM(D4:D5)");
        assert_eq!(formula(&sheet, 6, 5), "=SUM(F4:F5)");
        assert!(table
            .put_row_sum(&mut sheet, 0, 2, 3, CellStyle::default())
            .is_err());
    }

    #[test]
    fn test_set_row_style_and_cell_at() {
        let (table, _, expenses) = sample_table();
        let mut sheet = Sheet::new("style");
        table.create_frame(&mut sheet);
        let gray = CellStyle::named(StyleName::TableLightGray);
        table.sub_table(expenses).unwrap().set_row_style(&mut sheet, 0, gray).unwrap();

        let row = table.sub_table(expenses).unwrap().data_row(0);
        assert_eq!(table.cell_at(&sheet, row, 1), CellContent::text("Rent"));
        let styled = sheet.cell(CellRef::new(1 + row as u32, 3)).unwrap();
        assert_eq!(styled.style.name, Some(StyleName::TableLightGray));
    }
}
