//! XLSX writer kernel that turns a chart into a single-sheet workbook.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use rust_xlsxwriter::{Color, DocProperties, Format, Formula, Workbook, Worksheet};
use serde_json::Value;

use crate::cells::{SpecCellNormalizeOptions, normalize_rows};
use crate::columns::plan_columns;
use crate::conf::{
    C_CELL_ERROR_NOT_AVAILABLE, C_FILE_EXTENSION_XLSX, C_FORMULA_NOT_AVAILABLE, C_MIME_TYPE_XLSX,
    C_NUM_FORMAT_DATETIME_DEFAULT, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_FILE_PROPERTY_DATE_KEYS,
};
use crate::host::ChartSource;
use crate::layout::{apply_autofit, derive_header_formats};
use crate::numfmt::{BuiltinNumberFormatEvaluator, NumberFormatEvaluator};
use crate::resolve::resolve_exporting_options;
use crate::rows::VisibleRangeRows;
use crate::spec::{
    EnumCellValue, ExportXlsxError, SpecCellFormat, SpecExportingOptions, SpecWorksheetPlan,
    SpecXlsxReport, SpecXlsxWorkbookOptions, SpecXlsxWorksheetOptions,
    derive_category_columns_idx,
};
use crate::util::{
    convert_argb_to_rgb, convert_datetime_to_excel_datetime, parse_property_datetime,
    sanitize_sheet_name,
};

////////////////////////////////////////////////////////////////////////////////
// #region Exporter

/// Chart-to-XLSX exporter holding resolved options.
pub struct XlsxChartExporter {
    options: SpecExportingOptions,
    evaluator: Box<dyn NumberFormatEvaluator>,
    if_month_zero_based: bool,
}

impl XlsxChartExporter {
    /// Create an exporter from already-resolved options.
    pub fn new(options: SpecExportingOptions) -> Self {
        Self {
            options,
            evaluator: Box::new(BuiltinNumberFormatEvaluator),
            if_month_zero_based: false,
        }
    }

    /// Create an exporter from the host's raw `exporting` JSON.
    pub fn from_json(exporting: Option<&Value>) -> Self {
        Self::new(resolve_exporting_options(exporting))
    }

    /// Replace the number-format evaluator used by auto-fit.
    pub fn with_evaluator(mut self, evaluator: Box<dyn NumberFormatEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Declare that datetime category labels carry zero-based months.
    pub fn with_month_zero_based(mut self, if_month_zero_based: bool) -> Self {
        self.if_month_zero_based = if_month_zero_based;
        self
    }

    /// Resolved options.
    pub fn options(&self) -> &SpecExportingOptions {
        &self.options
    }

    /// Output file name: configured name, else the chart default, plus `.xlsx`.
    pub fn derive_file_name<C: ChartSource + ?Sized>(&self, chart: &C) -> String {
        let c_stem = self
            .options
            .filename
            .clone()
            .filter(|c_name| !c_name.trim().is_empty())
            .unwrap_or_else(|| chart.default_file_name());
        format!("{c_stem}{C_FILE_EXTENSION_XLSX}")
    }

    /// Build the worksheet plan for `chart` without writing anything.
    pub fn plan<C: ChartSource + ?Sized>(
        &self,
        chart: &C,
        report: &mut SpecXlsxReport,
    ) -> SpecWorksheetPlan {
        plan_worksheet(
            chart,
            &self.options.xlsx.worksheet,
            self.evaluator.as_ref(),
            self.if_month_zero_based,
            report,
        )
    }

    /// Render `chart` into an in-memory XLSX payload.
    pub fn write_buffer<C: ChartSource + ?Sized>(
        &self,
        chart: &C,
    ) -> Result<(Vec<u8>, SpecXlsxReport), ExportXlsxError> {
        let mut report = SpecXlsxReport {
            file_name: self.derive_file_name(chart),
            ..Default::default()
        };
        let plan = self.plan(chart, &mut report);
        let v_payload = write_workbook(&plan, &self.options.xlsx.workbook, &mut report)?;
        report.n_bytes = v_payload.len();
        Ok((v_payload, report))
    }

    /// Render `chart` and hand the payload to `saver`.
    pub fn download<C: ChartSource + ?Sized>(
        &self,
        chart: &C,
        saver: &mut dyn FileSaver,
    ) -> Result<SpecXlsxReport, ExportXlsxError> {
        let (v_payload, report) = self.write_buffer(chart)?;
        saver.save(&v_payload, &report.file_name, C_MIME_TYPE_XLSX)?;
        log::info!(
            "Exported {} ({} rows x {} cols, {} bytes).",
            report.file_name,
            report.n_rows,
            report.n_cols,
            report.n_bytes
        );
        Ok(report)
    }
}

/// Run the export pipeline: filter rows, plan columns, normalize cells, finish layout.
pub fn plan_worksheet<C: ChartSource + ?Sized>(
    chart: &C,
    worksheet: &SpecXlsxWorksheetOptions,
    evaluator: &dyn NumberFormatEvaluator,
    if_month_zero_based: bool,
    report: &mut SpecXlsxReport,
) -> SpecWorksheetPlan {
    let table = VisibleRangeRows::new(chart).extract_data_rows();
    let mut l_columns = plan_columns(chart, &table.headers, worksheet);

    let cols_idx_category = derive_category_columns_idx(&l_columns);
    let l_rows = normalize_rows(
        table.rows,
        SpecCellNormalizeOptions {
            n_cols: l_columns.len(),
            cols_idx_category: &cols_idx_category,
            if_datetime_axis: chart.category_axis().if_datetime(),
            if_month_zero_based,
        },
        report,
    );

    let if_wrap_first = worksheet.auto_fit_columns
        && apply_autofit(
            &mut l_columns,
            &l_rows,
            worksheet.wrap_column_width,
            evaluator,
        );
    let header_formats = derive_header_formats(&l_columns, &worksheet.header_style, if_wrap_first);

    SpecWorksheetPlan {
        sheet_name: sanitize_sheet_name(&worksheet.sheet_name, "_"),
        columns: l_columns,
        header_formats,
        rows: l_rows,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookKernel

/// Write `plan` into a new workbook and return the XLSX bytes.
pub fn write_workbook(
    plan: &SpecWorksheetPlan,
    workbook_options: &SpecXlsxWorkbookOptions,
    report: &mut SpecXlsxReport,
) -> Result<Vec<u8>, ExportXlsxError> {
    let n_rows = plan.rows.len();
    let n_cols = plan.columns.len();
    if n_rows + 1 > N_NROWS_EXCEL_MAX {
        return Err(ExportXlsxError::IndexOverflow {
            axis: "row",
            value: n_rows + 1,
        });
    }
    if n_cols > N_NCOLS_EXCEL_MAX {
        return Err(ExportXlsxError::IndexOverflow {
            axis: "column",
            value: n_cols,
        });
    }

    let mut workbook = Workbook::new();
    let properties = derive_doc_properties(&workbook_options.file_properties, report);
    workbook.set_properties(&properties);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&plan.sheet_name)?;

    for (n_idx_col, column) in plan.columns.iter().enumerate() {
        if let Some(n_width) = column.width {
            worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width)?;
        }
        let fmt_header = plan
            .header_formats
            .get(n_idx_col)
            .map(derive_rust_xlsx_format)
            .unwrap_or_else(Format::new);
        write_header_cell(worksheet, n_idx_col, &column.header, &fmt_header)?;
    }

    let l_fmt_data: Vec<Format> = plan
        .columns
        .iter()
        .map(|column| {
            derive_rust_xlsx_format(&SpecCellFormat {
                num_format: column.number_format.clone(),
                ..Default::default()
            })
        })
        .collect();
    let l_fmt_datetime: Vec<Format> = plan
        .columns
        .iter()
        .map(|column| {
            derive_rust_xlsx_format(&SpecCellFormat {
                num_format: Some(
                    column
                        .number_format
                        .clone()
                        .unwrap_or_else(|| C_NUM_FORMAT_DATETIME_DEFAULT.to_string()),
                ),
                ..Default::default()
            })
        })
        .collect();

    let mut n_cells_non_finite = 0usize;
    let mut n_cells_date_out_of_range = 0usize;
    for (n_idx_row, row_values) in plan.rows.iter().enumerate() {
        for (n_idx_col, value) in row_values.iter().enumerate().take(n_cols) {
            let format = match value {
                EnumCellValue::DateTime(_) => &l_fmt_datetime[n_idx_col],
                _ => &l_fmt_data[n_idx_col],
            };
            match write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col, value, format)? {
                EnumCellWriteOutcome::Native => {}
                EnumCellWriteOutcome::NonFiniteBlanked => n_cells_non_finite += 1,
                EnumCellWriteOutcome::DateAsText => n_cells_date_out_of_range += 1,
            }
        }
    }
    if n_cells_non_finite > 0 {
        report.warn(format!(
            "{n_cells_non_finite} non-finite number(s) were written as blank cells."
        ));
    }
    if n_cells_date_out_of_range > 0 {
        report.warn(format!(
            "{n_cells_date_out_of_range} date(s) outside Excel's 1900-9999 range were written as text."
        ));
    }

    report.sheet_name = plan.sheet_name.clone();
    report.n_rows = n_rows;
    report.n_cols = n_cols;

    Ok(workbook.save_to_buffer()?)
}

fn write_header_cell(
    worksheet: &mut Worksheet,
    col_idx: usize,
    header: &str,
    format: &Format,
) -> Result<(), ExportXlsxError> {
    if header.is_empty() {
        worksheet.write_blank(0, cast_col_num(col_idx)?, format)?;
    } else {
        worksheet.write_string_with_format(0, cast_col_num(col_idx)?, header, format)?;
    }
    Ok(())
}

/// How a data cell ended up in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumCellWriteOutcome {
    Native,
    NonFiniteBlanked,
    DateAsText,
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<EnumCellWriteOutcome, ExportXlsxError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) if !val.is_finite() => {
            worksheet.write_blank(n_row, n_col, format)?;
            return Ok(EnumCellWriteOutcome::NonFiniteBlanked);
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::DateTime(dt) => match convert_datetime_to_excel_datetime(dt) {
            Some(dt_excel) => {
                worksheet.write_datetime_with_format(n_row, n_col, &dt_excel, format)?;
            }
            None => {
                worksheet.write_string_with_format(n_row, n_col, value.to_natural_string(), format)?;
                return Ok(EnumCellWriteOutcome::DateAsText);
            }
        },
        EnumCellValue::Error(_) => {
            let formula = Formula::new(C_FORMULA_NOT_AVAILABLE).set_result(C_CELL_ERROR_NOT_AVAILABLE);
            worksheet.write_formula_with_format(n_row, n_col, formula, format)?;
        }
    }
    Ok(EnumCellWriteOutcome::Native)
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(color) = spec.bg_color.as_deref().and_then(derive_format_color) {
        format = format.set_background_color(color);
    }
    if let Some(color) = spec.font_color.as_deref().and_then(derive_format_color) {
        format = format.set_font_color(color);
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

/// Parse an `AARRGGBB`/`RRGGBB` color; unusable values are dropped with a warning.
fn derive_format_color(argb: &str) -> Option<Color> {
    let color = convert_argb_to_rgb(argb).map(Color::RGB);
    if color.is_none() {
        log::warn!("Ignoring invalid color {argb:?}; expected #RRGGBB.");
    }
    color
}

fn cast_row_num(value: usize) -> Result<u32, ExportXlsxError> {
    u32::try_from(value).map_err(|_| ExportXlsxError::IndexOverflow { axis: "row", value })
}

fn cast_col_num(value: usize) -> Result<u16, ExportXlsxError> {
    u16::try_from(value).map_err(|_| ExportXlsxError::IndexOverflow {
        axis: "column",
        value,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookProperties

/// Map workbook `fileProperties` onto document properties.
///
/// Known keys fill the standard core/app fields; the rest become custom
/// properties. Unparseable dates and empty values are dropped with a warning.
pub fn derive_doc_properties(
    file_properties: &BTreeMap<String, Value>,
    report: &mut SpecXlsxReport,
) -> DocProperties {
    let mut properties = DocProperties::new();

    for (c_key, value) in file_properties {
        if value.is_null() {
            continue;
        }

        if TUP_FILE_PROPERTY_DATE_KEYS.contains(&c_key.as_str()) {
            let Some(dt_excel) =
                parse_property_datetime(value).and_then(|dt| convert_datetime_to_excel_datetime(&dt))
            else {
                report.warn(format!(
                    "Workbook property `{c_key}` is not a valid date and was skipped: {value}"
                ));
                continue;
            };
            properties = if c_key == "created" {
                properties.set_creation_datetime(&dt_excel)
            } else {
                properties.set_custom_property(c_key.as_str(), &dt_excel)
            };
            continue;
        }

        let c_text = derive_property_text(value);
        properties = match c_key.as_str() {
            "title" => properties.set_title(&c_text),
            "subject" => properties.set_subject(&c_text),
            "creator" | "author" => properties.set_author(&c_text),
            "manager" => properties.set_manager(&c_text),
            "company" => properties.set_company(&c_text),
            "category" => properties.set_category(&c_text),
            "keywords" => properties.set_keywords(&c_text),
            "description" | "comment" => properties.set_comment(&c_text),
            "status" => properties.set_status(&c_text),
            "hyperlinkBase" => properties.set_hyperlink_base(&c_text),
            _ => match value {
                Value::Bool(if_value) => properties.set_custom_property(c_key.as_str(), *if_value),
                Value::Number(n) => match n.as_f64() {
                    Some(n_value) => properties.set_custom_property(c_key.as_str(), n_value),
                    None => properties.set_custom_property(c_key.as_str(), c_text.as_str()),
                },
                _ => properties.set_custom_property(c_key.as_str(), c_text.as_str()),
            },
        };
    }

    properties
}

fn derive_property_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Savers

/// Destination for the finished payload.
pub trait FileSaver {
    /// Persist `payload` under `file_name`.
    fn save(&mut self, payload: &[u8], file_name: &str, mime_type: &str)
    -> Result<(), ExportXlsxError>;
}

/// Writes files into a directory, creating it when missing.
#[derive(Debug, Clone)]
pub struct DirectoryFileSaver {
    dir_out: PathBuf,
}

impl DirectoryFileSaver {
    /// Save into `dir_out`.
    pub fn new(dir_out: impl Into<PathBuf>) -> Self {
        Self {
            dir_out: dir_out.into(),
        }
    }
}

impl FileSaver for DirectoryFileSaver {
    fn save(
        &mut self,
        payload: &[u8],
        file_name: &str,
        _mime_type: &str,
    ) -> Result<(), ExportXlsxError> {
        fs::create_dir_all(&self.dir_out).map_err(|source| ExportXlsxError::Save {
            path: self.dir_out.clone(),
            source,
        })?;
        let path_file_out = self.dir_out.join(file_name);
        fs::write(&path_file_out, payload).map_err(|source| ExportXlsxError::Save {
            path: path_file_out.clone(),
            source,
        })?;
        log::debug!("Wrote {}.", path_file_out.display());
        Ok(())
    }
}

/// One file captured by [`MemoryFileSaver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSavedFile {
    /// File name including extension.
    pub file_name: String,
    /// MIME type.
    pub mime_type: String,
    /// File bytes.
    pub payload: Vec<u8>,
}

/// Keeps saved files in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSaver {
    /// Files in save order.
    pub files: Vec<SpecSavedFile>,
}

impl FileSaver for MemoryFileSaver {
    fn save(
        &mut self,
        payload: &[u8],
        file_name: &str,
        mime_type: &str,
    ) -> Result<(), ExportXlsxError> {
        self.files.push(SpecSavedFile {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
