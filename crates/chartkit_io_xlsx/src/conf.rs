//! XLSX export constants and default preset factories.

use serde_json::{Value, json};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Sheet name used when none is configured.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// First-column width (character units) above which the header wraps.
pub const N_WIDTH_WRAP_COLUMN_DEFAULT: f64 = 20.0;
/// Excel's default Calibri 11pt width (8.43) plus the 0.71 writers lose on open.
pub const N_WIDTH_COLUMN_DEFAULT: f64 = 8.43 + 0.71;
/// Excel maximum digit width in pixels for Calibri 11pt.
pub const N_EXCEL_MAX_DIGIT_WIDTH: f64 = 6.0;
/// Category number format applied on datetime axes without an override.
pub const C_NUM_FORMAT_DATETIME_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";

/// Display text of the not-available error marker.
pub const C_CELL_ERROR_NOT_AVAILABLE: &str = "#N/A";
/// Formula that evaluates to the not-available error.
pub const C_FORMULA_NOT_AVAILABLE: &str = "=NA()";

/// Output file extension.
pub const C_FILE_EXTENSION_XLSX: &str = ".xlsx";
/// Output MIME type.
pub const C_MIME_TYPE_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Series types carrying exactly one point per category (no visible range).
pub const TUP_WHOLE_PART_SERIES_TYPES: [&str; 2] = ["pie", "variablepie"];

/// Workbook file-property keys holding dates.
pub const TUP_FILE_PROPERTY_DATE_KEYS: [&str; 3] = ["created", "modified", "lastPrinted"];

/// Default `exporting` options, in the host's JSON shape.
///
/// `null` leaves are optional and stay unset unless the user provides them.
pub fn derive_default_exporting_options_value() -> Value {
    json!({
        "filename": null,
        "xlsx": {
            "workbook": {
                "fileProperties": {}
            },
            "worksheet": {
                "sheetName": C_SHEET_NAME_DEFAULT,
                "autoFitColumns": false,
                "wrapColumnWidth": N_WIDTH_WRAP_COLUMN_DEFAULT,
                "categoryColumn": {
                    "title": null,
                    "numberFormat": null
                },
                "headerStyle": {}
            }
        }
    })
}

/// Default per-series `xlsx` options, in the host's JSON shape.
pub fn derive_default_series_export_options_value() -> Value {
    json!({
        "name": null,
        "numberFormat": null
    })
}
