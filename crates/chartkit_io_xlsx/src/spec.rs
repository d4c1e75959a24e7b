//! Shared chart-export specification models.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use rust_xlsxwriter::XlsxError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conf::{C_CELL_ERROR_NOT_AVAILABLE, C_SHEET_NAME_DEFAULT, N_WIDTH_WRAP_COLUMN_DEFAULT};
use crate::resolve::deserialize_lenient_option;

////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Raw cell produced by the host's row extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumRawCell {
    /// Numeric value (may be non-finite).
    Number(f64),
    /// Text value.
    String(String),
    /// Missing value.
    #[default]
    None,
}

impl EnumRawCell {
    /// Return the number if this cell is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Spreadsheet error markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCellError {
    /// `#N/A`.
    NotAvailable,
}

impl EnumCellError {
    /// Display text shown by spreadsheet applications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAvailable => C_CELL_ERROR_NOT_AVAILABLE,
        }
    }
}

/// Normalized cell value handed to the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Date/time value (wall-clock, no timezone).
    DateTime(NaiveDateTime),
    /// Explicit error marker.
    Error(EnumCellError),
}

impl EnumCellValue {
    /// Natural display text, used when a column has no number format.
    pub fn to_natural_string(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Error(err) => err.as_str().to_string(),
        }
    }
}

impl From<EnumRawCell> for EnumCellValue {
    fn from(value: EnumRawCell) -> Self {
        match value {
            EnumRawCell::None => Self::None,
            EnumRawCell::String(s) => Self::String(s),
            EnumRawCell::Number(n) => Self::Number(n),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification consumed by the writer kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Bold style.
    pub bold: Option<bool>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color, `AARRGGBB`.
    pub bg_color: Option<String>,
    /// Font color, `AARRGGBB`.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            bold: other.bold.or(self.bold),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// True when no property is set.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Resolved `exporting` options (host JSON shape, camelCase keys).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecExportingOptions {
    /// Output file name override, without extension.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub filename: Option<String>,
    /// XLSX specific options.
    pub xlsx: SpecXlsxOptions,
}

/// Workbook + worksheet scoped XLSX options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecXlsxOptions {
    /// Workbook scope.
    pub workbook: SpecXlsxWorkbookOptions,
    /// Worksheet scope.
    pub worksheet: SpecXlsxWorksheetOptions,
}

/// Workbook scoped options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecXlsxWorkbookOptions {
    /// Free-form file metadata; `created`/`modified`/`lastPrinted` are dates.
    pub file_properties: BTreeMap<String, Value>,
}

/// Worksheet scoped options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecXlsxWorksheetOptions {
    /// Sheet name (truncated to the Excel limit on write).
    pub sheet_name: String,
    /// Size columns to their widest rendered cell.
    pub auto_fit_columns: bool,
    /// First-column width above which the header wraps instead.
    pub wrap_column_width: f64,
    /// Category column overrides.
    pub category_column: SpecCategoryColumnOptions,
    /// Header row style.
    pub header_style: SpecHeaderStyleOptions,
}

impl Default for SpecXlsxWorksheetOptions {
    fn default() -> Self {
        Self {
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            auto_fit_columns: false,
            wrap_column_width: N_WIDTH_WRAP_COLUMN_DEFAULT,
            category_column: SpecCategoryColumnOptions::default(),
            header_style: SpecHeaderStyleOptions::default(),
        }
    }
}

/// Category column overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecCategoryColumnOptions {
    /// Header text override.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub title: Option<String>,
    /// Number format override.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub number_format: Option<String>,
}

/// Header row style.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecHeaderStyleOptions {
    /// Font options.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub font: Option<SpecHeaderFontOptions>,
    /// Fill options.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub fill: Option<SpecHeaderFillOptions>,
}

impl SpecHeaderStyleOptions {
    /// True when neither font nor fill is configured.
    pub fn is_empty(&self) -> bool {
        self.font.is_none() && self.fill.is_none()
    }
}

/// Header font options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecHeaderFontOptions {
    /// Bold flag.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub bold: Option<bool>,
    /// Font color, `#RRGGBB`.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub color: Option<String>,
}

/// Header fill options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecHeaderFillOptions {
    /// Solid fill color, `#RRGGBB`.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub color: Option<String>,
}

/// Per-series XLSX options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecSeriesExportOptions {
    /// Column header override.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub name: Option<String>,
    /// Number format applied to the series column.
    #[serde(deserialize_with = "deserialize_lenient_option")]
    pub number_format: Option<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RawTable

/// One host data row: the category key plus the row's cells.
///
/// A row deserialized without `x` (or with `x: null`) keys on its first cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SpecRawDataRowShape")]
pub struct SpecRawDataRow {
    /// Category key used for range filtering (numeric on value axes).
    pub x: EnumRawCell,
    /// Cells; the first one is the category label.
    pub cells: Vec<EnumRawCell>,
}

impl SpecRawDataRow {
    /// Build a row whose category key is its first cell.
    pub fn from_cells(cells: Vec<EnumRawCell>) -> Self {
        Self {
            x: cells.first().cloned().unwrap_or_default(),
            cells,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct SpecRawDataRowShape {
    x: Option<EnumRawCell>,
    cells: Vec<EnumRawCell>,
}

impl From<SpecRawDataRowShape> for SpecRawDataRow {
    fn from(shape: SpecRawDataRowShape) -> Self {
        match shape.x {
            Some(x) => Self { x, cells: shape.cells },
            None => Self::from_cells(shape.cells),
        }
    }
}

/// Header row plus one row per category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecRawTable {
    /// Header texts; the first one is the category header.
    pub headers: Vec<String>,
    /// Data rows.
    pub rows: Vec<SpecRawDataRow>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetPlan

/// One output column.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecColumn {
    /// Header text.
    pub header: String,
    /// Stable identity, never displayed.
    pub key: String,
    /// Number format code.
    pub number_format: Option<String>,
    /// Width in character units.
    pub width: Option<f64>,
    /// Category column flag.
    pub if_category: bool,
}

/// Worksheet definition handed to the writer kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecWorksheetPlan {
    /// Sanitized sheet name.
    pub sheet_name: String,
    /// Ordered columns.
    pub columns: Vec<SpecColumn>,
    /// Header cell format per column.
    pub header_formats: Vec<SpecCellFormat>,
    /// Data rows; each row has one value per column.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecWorksheetPlan {
    /// Indices of category columns.
    pub fn cols_idx_category(&self) -> Vec<usize> {
        derive_category_columns_idx(&self.columns)
    }
}

/// Indices of the columns flagged as category columns.
pub fn derive_category_columns_idx(columns: &[SpecColumn]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter_map(|(n_idx, col)| col.if_category.then_some(n_idx))
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-export report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// File name handed to the saver.
    pub file_name: String,
    /// Sheet name written.
    pub sheet_name: String,
    /// Data rows written.
    pub n_rows: usize,
    /// Columns written.
    pub n_cols: usize,
    /// Payload size.
    pub n_bytes: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        log::warn!("{}", msg.as_ref());
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Export failures surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ExportXlsxError {
    /// The spreadsheet writer rejected the worksheet or workbook.
    #[error("xlsx write error: {0}")]
    Writer(#[from] XlsxError),
    /// Row or column index does not fit the worksheet grid.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow {
        /// `row` or `column`.
        axis: &'static str,
        /// Offending index.
        value: usize,
    },
    /// The save step failed.
    #[error("failed to save {path:?}: {source}")]
    Save {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
