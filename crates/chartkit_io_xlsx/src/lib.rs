//! `chartkit_io_xlsx` v1:
//! Chart-to-XLSX tabular export kernel.
//!
//! Pipeline stages, in call order:
//! - `resolve` : user options layered over default presets
//! - `rows`    : host rows filtered to the visible axis range
//! - `columns` : one column per exportable series plus category columns
//! - `cells`   : native dates and `#N/A` markers
//! - `layout`  : auto-fit widths and header styles
//! - `writer`  : workbook kernel, metadata and savers
//!
//! Support modules:
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options
//! - `util`   : pure helper functions
//! - `host`   : chart collaborator interface
//! - `numfmt` : number-format rendering for width measurement
pub mod cells;
pub mod columns;
pub mod conf;
pub mod host;
pub mod layout;
pub mod numfmt;
pub mod resolve;
pub mod rows;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_MIME_TYPE_XLSX, C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, N_WIDTH_COLUMN_DEFAULT, N_WIDTH_WRAP_COLUMN_DEFAULT,
};
pub use host::{
    ChartSource, EnumAxisType, EnumHeaderSubject, SpecChartAxis, SpecChartSeries,
    SpecChartSnapshot,
};
pub use numfmt::{BuiltinNumberFormatEvaluator, NumberFormatEvaluator};
pub use resolve::{resolve_exporting_options, resolve_series_export_options};
pub use rows::{VisibleRangeRows, check_whole_part_series, filter_rows_to_axis_range};
pub use spec::{
    EnumCellError, EnumCellValue, EnumRawCell, ExportXlsxError, SpecCellFormat, SpecColumn,
    SpecExportingOptions, SpecRawDataRow, SpecRawTable, SpecSeriesExportOptions,
    SpecWorksheetPlan, SpecXlsxReport,
};
pub use util::sanitize_sheet_name;
pub use writer::{
    DirectoryFileSaver, FileSaver, MemoryFileSaver, SpecSavedFile, XlsxChartExporter,
    plan_worksheet, write_workbook,
};
