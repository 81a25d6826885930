// 🧮 Grid sink - cell addressing, cell contents, style descriptors
// The layout engine only talks to `GridSink`; `Sheet` is the in-memory
// implementation, persisted as CSV.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

// ============================================================================
// ADDRESSING
// ============================================================================

/// A single cell. Rows and columns are 0-indexed: `row = 0` is sheet row 1,
/// `col = 0` is column A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    /// A1 notation (e.g. `A1`, `BC32`)
    pub fn to_a1(self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Column letters for a 0-indexed column (0 → A, 25 → Z, 26 → AA)
pub fn column_name(col: u32) -> String {
    let mut n = col + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// Inclusive rectangular region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        CellRange { start, end }
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// `SUM(<start>:<end>)` as literal formula text, never evaluated here
pub fn sum_formula(start: CellRef, end: CellRef) -> CellContent {
    CellContent::Formula(format!("SUM({}:{})", start, end))
}

// ============================================================================
// CELL CONTENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellContent {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Formula text without the leading `=`
    Formula(String),
}

impl CellContent {
    pub fn text(value: impl Into<String>) -> Self {
        CellContent::Text(value.into())
    }

    pub fn number(value: Option<f64>) -> Self {
        value.map_or(CellContent::Empty, CellContent::Number)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellContent::Empty => true,
            CellContent::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellContent::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Display form; formulas keep their leading `=`
    pub fn to_text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Number(value) => value.to_string(),
            CellContent::Formula(formula) => format!("={}", formula),
        }
    }

    /// Inverse of `to_text`
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return CellContent::Empty;
        }
        if let Some(formula) = text.strip_prefix('=') {
            return CellContent::Formula(formula.to_string());
        }
        match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => CellContent::Number(value),
            _ => CellContent::Text(text.to_string()),
        }
    }
}

// ============================================================================
// STYLE DESCRIPTORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleName {
    Title,
    TableMain,
    TableMainLeft,
    TableYellow,
    TableLightGray,
    HeaderDate,
    ColumnLabel,
    ColumnLabelRight,
    TableAggregated,
    TableAggregatedAccent,
}

impl StyleName {
    /// Background fill (RGB hex)
    pub fn fill(&self) -> &'static str {
        match self {
            StyleName::Title | StyleName::TableMain | StyleName::TableMainLeft => "ffffff",
            StyleName::TableYellow => "fcf4dd",
            StyleName::TableLightGray => "dfdfdf",
            StyleName::HeaderDate => "ebf1de",
            StyleName::ColumnLabel | StyleName::ColumnLabelRight => "ded9c4",
            StyleName::TableAggregated => "dce5f1",
            StyleName::TableAggregatedAccent => "fcd5b4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Border {
    /// Thin box border
    Box,
    /// Hair-line box border
    HairBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberFormat {
    /// Thousands separators, negatives in red
    Number,
    /// Percentage with two decimals
    Percentage,
}

/// Style to apply with a write; unset fields leave the cell's current style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    pub name: Option<StyleName>,
    pub border: Option<Border>,
    pub number_format: Option<NumberFormat>,
}

impl CellStyle {
    pub const fn named(name: StyleName) -> Self {
        CellStyle {
            name: Some(name),
            border: None,
            number_format: None,
        }
    }

    /// Named style with a thin box border
    pub const fn boxed(name: StyleName) -> Self {
        CellStyle {
            name: Some(name),
            border: Some(Border::Box),
            number_format: None,
        }
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.number_format = Some(format);
        self
    }

    /// Overlay the set fields of `self` onto `base`
    pub fn apply_to(&self, base: &mut CellStyle) {
        if self.name.is_some() {
            base.name = self.name;
        }
        if self.border.is_some() {
            base.border = self.border;
        }
        if self.number_format.is_some() {
            base.number_format = self.number_format;
        }
    }
}

// ============================================================================
// GRID SINK CONTRACT
// ============================================================================

/// Destination (and source) of rendered tables
pub trait GridSink {
    /// Put a value or formula at `cell` with `style`
    fn write(&mut self, cell: CellRef, content: CellContent, style: CellStyle);

    /// Restyle `cell` without touching its content
    fn set_style(&mut self, cell: CellRef, style: CellStyle);

    /// Render `range` as a single merged region
    fn merge_region(&mut self, range: CellRange);

    /// Current content of `cell` (`Empty` when never written)
    fn read(&self, cell: CellRef) -> CellContent;
}

// ============================================================================
// SHEET (in-memory sink)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    pub style: CellStyle,
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<CellRef, Cell>,
    merged: Vec<CellRange>,
    freeze_panes: Option<CellRef>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            ..Sheet::default()
        }
    }

    pub fn cell(&self, cell: CellRef) -> Option<&Cell> {
        self.cells.get(&cell)
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Rows above and columns left of `anchor` stay visible when scrolling
    pub fn freeze_panes(&mut self, anchor: CellRef) {
        self.freeze_panes = Some(anchor);
    }

    pub fn frozen_at(&self) -> Option<CellRef> {
        self.freeze_panes
    }

    /// (rows, columns) spanned by written cells
    pub fn dimensions(&self) -> (u32, u32) {
        self.cells.keys().fold((0, 0), |(rows, cols), cell| {
            (rows.max(cell.row + 1), cols.max(cell.col + 1))
        })
    }

    /// Write the grid as CSV, one record per row
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let (rows, cols) = self.dimensions();
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        for row in 0..rows {
            let record: Vec<String> = (0..cols)
                .map(|col| self.read(CellRef::new(row, col)).to_text())
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Read a grid written by `write_csv`; styles and merges are not restored
    pub fn read_csv<R: io::Read>(name: impl Into<String>, reader: R) -> Result<Sheet> {
        let mut sheet = Sheet::new(name);
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                let content = CellContent::from_text(field);
                if !content.is_empty() {
                    sheet.write(
                        CellRef::new(row as u32, col as u32),
                        content,
                        CellStyle::default(),
                    );
                }
            }
        }
        Ok(sheet)
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write_csv(fs::File::create(path)?)
    }

    pub fn load_csv(path: &Path) -> Result<Sheet> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Sheet::read_csv(name, fs::File::open(path)?)
    }
}

impl GridSink for Sheet {
    fn write(&mut self, cell: CellRef, content: CellContent, style: CellStyle) {
        let entry = self.cells.entry(cell).or_default();
        entry.content = content;
        style.apply_to(&mut entry.style);
    }

    fn set_style(&mut self, cell: CellRef, style: CellStyle) {
        let entry = self.cells.entry(cell).or_default();
        style.apply_to(&mut entry.style);
    }

    fn merge_region(&mut self, range: CellRange) {
        if !self.merged.contains(&range) {
            self.merged.push(range);
        }
    }

    fn read(&self, cell: CellRef) -> CellContent {
        self.cells
            .get(&cell)
            .map(|c| c.content.clone())
            .unwrap_or_default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(54), "BC");
        assert_eq!(CellRef::new(31, 54).to_a1(), "BC32");
    }

    #[test]
    fn test_sum_formula_text() {
        let formula = sum_formula(CellRef::new(2, 3), CellRef::new(5, 3));
        assert_eq!(formula, CellContent::Formula("SUM(D3:D6)".to_string()));
        assert_eq!(formula.to_text(), "=SUM(D3:D6)");
    }

    #[test]
    fn test_content_text_round_trip() {
        for content in [
            CellContent::Empty,
            CellContent::text("Rent"),
            CellContent::Number(1250.5),
            CellContent::Formula("SUM(A1:A3)".to_string()),
        ] {
            assert_eq!(CellContent::from_text(&content.to_text()), content);
        }
        assert_eq!(CellContent::Number(1000.0).to_text(), "1000");
    }

    #[test]
    fn test_write_overlays_style() {
        let mut sheet = Sheet::new("test");
        let cell = CellRef::new(0, 0);
        sheet.write(cell, CellContent::Number(1.0), CellStyle::boxed(StyleName::TableMain));
        sheet.set_style(cell, CellStyle::named(StyleName::TableLightGray));

        let stored = sheet.cell(cell).unwrap();
        assert_eq!(stored.style.name, Some(StyleName::TableLightGray));
        assert_eq!(stored.style.border, Some(Border::Box));
        assert_eq!(stored.content, CellContent::Number(1.0));
    }

    #[test]
    fn test_csv_round_trip_keeps_cells() {
        let mut sheet = Sheet::new("Retail.plan");
        sheet.write(CellRef::new(0, 0), CellContent::text("Retail"), CellStyle::default());
        sheet.write(CellRef::new(1, 3), CellContent::text("2024/04"), CellStyle::default());
        sheet.write(CellRef::new(2, 3), CellContent::Number(300.0), CellStyle::default());
        sheet.write(
            CellRef::new(3, 3),
            CellContent::Formula("SUM(D3:D3)".to_string()),
            CellStyle::default(),
        );

        let mut buf = Vec::new();
        sheet.write_csv(&mut buf).unwrap();
        let loaded = Sheet::read_csv("Retail.plan", buf.as_slice()).unwrap();

        assert_eq!(loaded.dimensions(), (4, 4));
        for (cell, expected) in [
            (CellRef::new(0, 0), CellContent::text("Retail")),
            (CellRef::new(1, 3), CellContent::text("2024/04")),
            (CellRef::new(2, 3), CellContent::Number(300.0)),
            (CellRef::new(3, 3), CellContent::Formula("SUM(D3:D3)".to_string())),
            (CellRef::new(2, 0), CellContent::Empty),
        ] {
            assert_eq!(loaded.read(cell), expected);
        }
    }

    #[test]
    fn test_merge_region_recorded_once() {
        let mut sheet = Sheet::new("test");
        let range = CellRange::new(CellRef::new(4, 0), CellRef::new(4, 5));
        sheet.merge_region(range);
        sheet.merge_region(range);
        assert_eq!(sheet.merged_regions(), &[range]);
        assert!(range.contains(CellRef::new(4, 3)));
        assert_eq!(range.to_string(), "A5:F5");
    }
}
