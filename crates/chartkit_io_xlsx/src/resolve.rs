//! Configuration resolver: user export options layered over default presets.
//!
//! User options arrive in the host's JSON shape. They are merged leaf by leaf
//! over the presets from [`crate::conf`] and deserialized into owned typed
//! structs, so the result never shares state with the host's live options.
//! Resolution never fails: malformed leaves fall back to their defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::conf::{
    N_WIDTH_WRAP_COLUMN_DEFAULT, derive_default_exporting_options_value,
    derive_default_series_export_options_value,
};
use crate::spec::{SpecExportingOptions, SpecSeriesExportOptions};

/// Resolve chart-level `exporting` options (including `exporting.xlsx`).
pub fn resolve_exporting_options(exporting: Option<&Value>) -> SpecExportingOptions {
    let value_defaults = derive_default_exporting_options_value();
    let value_merged = match exporting {
        Some(value_user) => merge_json_over_defaults(&value_defaults, value_user, "exporting"),
        None => value_defaults,
    };

    let mut cfg: SpecExportingOptions = serde_json::from_value(value_merged).unwrap_or_else(|err| {
        log::warn!("Falling back to default exporting options: {err}");
        SpecExportingOptions::default()
    });

    let n_wrap_width = cfg.xlsx.worksheet.wrap_column_width;
    if !(n_wrap_width.is_finite() && n_wrap_width > 0.0) {
        log::warn!(
            "Ignoring wrapColumnWidth {n_wrap_width}; using {N_WIDTH_WRAP_COLUMN_DEFAULT}."
        );
        cfg.xlsx.worksheet.wrap_column_width = N_WIDTH_WRAP_COLUMN_DEFAULT;
    }
    cfg
}

/// Resolve one series' `xlsx` options. Called when the host creates the series.
pub fn resolve_series_export_options(xlsx: Option<&Value>) -> SpecSeriesExportOptions {
    let value_defaults = derive_default_series_export_options_value();
    let value_merged = match xlsx {
        Some(value_user) => merge_json_over_defaults(&value_defaults, value_user, "series.xlsx"),
        None => value_defaults,
    };

    serde_json::from_value(value_merged).unwrap_or_else(|err| {
        log::warn!("Falling back to default series export options: {err}");
        SpecSeriesExportOptions::default()
    })
}

/// Merge `user` over `defaults` into a new value.
///
/// - Objects merge key by key; keys absent from `defaults` are taken as given.
/// - A `null` default is an optional leaf: any non-empty user value wins.
/// - A scalar default only accepts a user value of the same JSON kind.
/// - Empty user values (`null`, `false`, `0`, `""`) keep the default.
pub fn merge_json_over_defaults(defaults: &Value, user: &Value, path: &str) -> Value {
    match (defaults, user) {
        (_, Value::Null) => defaults.clone(),
        (Value::Object(dict_defaults), Value::Object(dict_user)) => {
            let mut dict_merged = dict_defaults.clone();
            for (key, value_user) in dict_user {
                let value_merged = match dict_defaults.get(key) {
                    Some(value_default) => {
                        merge_json_over_defaults(value_default, value_user, &format!("{path}.{key}"))
                    }
                    None => value_user.clone(),
                };
                dict_merged.insert(key.clone(), value_merged);
            }
            Value::Object(dict_merged)
        }
        (Value::Null, _) => {
            if check_json_empty(user) {
                Value::Null
            } else {
                user.clone()
            }
        }
        (Value::Object(_), _) => {
            log::warn!("Ignoring {path}: expected an object, got {user}");
            defaults.clone()
        }
        _ if std::mem::discriminant(defaults) == std::mem::discriminant(user) => {
            if check_json_empty(user) {
                defaults.clone()
            } else {
                user.clone()
            }
        }
        _ => {
            log::warn!("Ignoring {path}: expected a value like {defaults}, got {user}");
            defaults.clone()
        }
    }
}

fn check_json_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Deserialize an optional leaf, mapping malformed values to `None`.
pub(crate) fn deserialize_lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => {
            log::warn!("Ignoring malformed export option: {err}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::spec::{SpecHeaderFontOptions, SpecXlsxWorksheetOptions};

    #[test]
    fn test_resolve_exporting_options_defaults_when_absent() {
        let cfg = resolve_exporting_options(None);

        assert_eq!(cfg.filename, None);
        assert_eq!(cfg.xlsx.worksheet, SpecXlsxWorksheetOptions::default());
        assert_eq!(cfg.xlsx.worksheet.sheet_name, "Sheet1");
        assert!(!cfg.xlsx.worksheet.auto_fit_columns);
        assert_eq!(cfg.xlsx.worksheet.wrap_column_width, 20.0);
        assert!(cfg.xlsx.worksheet.header_style.is_empty());
        assert!(cfg.xlsx.workbook.file_properties.is_empty());
    }

    #[test]
    fn test_resolve_exporting_options_fills_partial_input() {
        let value_user = json!({
            "filename": "revenue",
            "xlsx": {
                "worksheet": {
                    "autoFitColumns": true,
                    "categoryColumn": { "title": "Day" },
                    "headerStyle": { "font": { "bold": true, "color": "#FF0000" } }
                },
                "workbook": { "fileProperties": { "creator": "ops" } }
            }
        });

        let cfg = resolve_exporting_options(Some(&value_user));

        assert_eq!(cfg.filename.as_deref(), Some("revenue"));
        assert!(cfg.xlsx.worksheet.auto_fit_columns);
        assert_eq!(cfg.xlsx.worksheet.sheet_name, "Sheet1");
        assert_eq!(cfg.xlsx.worksheet.wrap_column_width, 20.0);
        assert_eq!(cfg.xlsx.worksheet.category_column.title.as_deref(), Some("Day"));
        assert_eq!(cfg.xlsx.worksheet.category_column.number_format, None);
        assert_eq!(
            cfg.xlsx.worksheet.header_style.font,
            Some(SpecHeaderFontOptions {
                bold: Some(true),
                color: Some("#FF0000".to_string()),
            })
        );
        assert_eq!(cfg.xlsx.worksheet.header_style.fill, None);
        assert_eq!(
            cfg.xlsx.workbook.file_properties.get("creator"),
            Some(&json!("ops"))
        );
    }

    #[test]
    fn test_resolve_exporting_options_repairs_malformed_leaves() {
        let value_user = json!({
            "filename": 42,
            "xlsx": {
                "worksheet": {
                    "sheetName": "",
                    "autoFitColumns": "yes",
                    "wrapColumnWidth": 0,
                    "categoryColumn": { "title": 7, "numberFormat": "0.00" },
                    "headerStyle": { "font": "bold", "fill": { "color": "#00FF00" } }
                },
                "workbook": "nope"
            }
        });

        let cfg = resolve_exporting_options(Some(&value_user));

        assert_eq!(cfg.filename, None);
        assert_eq!(cfg.xlsx.worksheet.sheet_name, "Sheet1");
        assert!(!cfg.xlsx.worksheet.auto_fit_columns);
        assert_eq!(cfg.xlsx.worksheet.wrap_column_width, 20.0);
        assert_eq!(cfg.xlsx.worksheet.category_column.title, None);
        assert_eq!(
            cfg.xlsx.worksheet.category_column.number_format.as_deref(),
            Some("0.00")
        );
        assert_eq!(cfg.xlsx.worksheet.header_style.font, None);
        assert_eq!(
            cfg.xlsx
                .worksheet
                .header_style
                .fill
                .as_ref()
                .and_then(|fill| fill.color.as_deref()),
            Some("#00FF00")
        );
        assert!(cfg.xlsx.workbook.file_properties.is_empty());
    }

    #[test]
    fn test_resolve_exporting_options_rejects_negative_wrap_width() {
        let cfg = resolve_exporting_options(Some(&json!({
            "xlsx": { "worksheet": { "wrapColumnWidth": -5 } }
        })));
        assert_eq!(cfg.xlsx.worksheet.wrap_column_width, N_WIDTH_WRAP_COLUMN_DEFAULT);

        let cfg = resolve_exporting_options(Some(&json!({
            "xlsx": { "worksheet": { "wrapColumnWidth": 32.5 } }
        })));
        assert_eq!(cfg.xlsx.worksheet.wrap_column_width, 32.5);
    }

    #[test]
    fn test_resolve_exporting_options_is_deeply_independent() {
        let value_user = json!({
            "xlsx": {
                "worksheet": { "sheetName": "Data" },
                "workbook": { "fileProperties": { "title": "Q1" } }
            }
        });

        let mut cfg_first = resolve_exporting_options(Some(&value_user));
        let cfg_second = resolve_exporting_options(Some(&value_user));
        assert_eq!(cfg_first, cfg_second);

        cfg_first.xlsx.worksheet.sheet_name.push_str("_mutated");
        cfg_first
            .xlsx
            .workbook
            .file_properties
            .insert("title".to_string(), json!("changed"));

        assert_eq!(cfg_second.xlsx.worksheet.sheet_name, "Data");
        assert_eq!(
            cfg_second.xlsx.workbook.file_properties.get("title"),
            Some(&json!("Q1"))
        );
        assert_eq!(value_user["xlsx"]["worksheet"]["sheetName"], json!("Data"));
    }

    #[test]
    fn test_resolve_series_export_options() {
        assert_eq!(
            resolve_series_export_options(None),
            SpecSeriesExportOptions::default()
        );

        let cfg = resolve_series_export_options(Some(&json!({
            "name": "",
            "numberFormat": "#,##0.00",
            "unused": true
        })));
        assert_eq!(cfg.name, None);
        assert_eq!(cfg.number_format.as_deref(), Some("#,##0.00"));
    }

    #[test]
    fn test_merge_json_over_defaults_keeps_unknown_keys() {
        let value_merged = merge_json_over_defaults(
            &json!({ "a": 1, "nested": { "b": null } }),
            &json!({ "nested": { "b": "x", "c": [1, 2] }, "d": true }),
            "root",
        );

        assert_eq!(
            value_merged,
            json!({ "a": 1, "nested": { "b": "x", "c": [1, 2] }, "d": true })
        );
    }
}
