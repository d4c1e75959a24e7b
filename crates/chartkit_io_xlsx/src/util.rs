//! Stateless helper utilities used by the export pipeline.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use rust_xlsxwriter::ExcelDateTime;
use serde_json::Value;

use crate::conf::{
    C_SHEET_NAME_DEFAULT, N_EXCEL_MAX_DIGIT_WIDTH, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL,
};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_DEFAULT.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColorsAndWidths

/// Convert `#RRGGBB` (or `#RGB`) into opaque `FFRRGGBB`.
pub fn convert_hex_to_argb(hex: &str) -> String {
    let c_hex = hex.trim().trim_start_matches('#');
    let c_hex = if c_hex.len() == 3 {
        c_hex.chars().flat_map(|chr| [chr, chr]).collect()
    } else {
        c_hex.to_string()
    };
    format!("FF{c_hex}").to_uppercase()
}

/// Parse `AARRGGBB`/`RRGGBB` into a 24-bit RGB integer, dropping alpha.
pub fn convert_argb_to_rgb(argb: &str) -> Option<u32> {
    let c_hex = argb.trim().trim_start_matches('#');
    if !matches!(c_hex.len(), 6 | 8) {
        return None;
    }
    u32::from_str_radix(c_hex, 16)
        .ok()
        .map(|n_argb| n_argb & 0x00FF_FFFF)
}

/// Convert a character count into Excel column width units.
///
/// `ceil(round((n * MDW + 5) / MDW * 256) / 256)` with MDW = 6.
pub fn calculate_char_width(n_chars: usize) -> f64 {
    let n_chars = n_chars as f64;
    ((((n_chars * N_EXCEL_MAX_DIGIT_WIDTH + 5.0) / N_EXCEL_MAX_DIGIT_WIDTH) * 256.0).round()
        / 256.0)
        .ceil()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DateConversion

/// Parse a `yyyy-mm-dd hh:mm:ss` category label into a wall-clock datetime.
///
/// The month is 1-based unless `if_month_zero_based` is set. Missing time
/// components are zero. Returns `None` for labels that do not name a date.
pub fn parse_category_datetime(text: &str, if_month_zero_based: bool) -> Option<NaiveDateTime> {
    let c_text = text.trim();
    let (c_date, c_time) = match c_text.split_once([' ', 'T']) {
        Some((c_date, c_time)) => (c_date, c_time.trim()),
        None => (c_text, ""),
    };

    let l_date_parts: Vec<&str> = c_date.split('-').collect();
    let [c_year, c_month, c_day] = l_date_parts.as_slice() else {
        return None;
    };
    let n_year: i32 = c_year.trim().parse().ok()?;
    let n_month: u32 = c_month.trim().parse().ok()?;
    let n_day: u32 = c_day.trim().parse().ok()?;
    let n_month = if if_month_zero_based {
        n_month.checked_add(1)?
    } else {
        n_month
    };

    let mut l_time_parts = [0u32; 3];
    if !c_time.is_empty() {
        for (n_idx, c_part) in c_time.split(':').enumerate() {
            if n_idx >= l_time_parts.len() {
                return None;
            }
            let n_value: f64 = c_part.trim().parse().ok()?;
            if !n_value.is_finite() || n_value < 0.0 {
                return None;
            }
            l_time_parts[n_idx] = n_value.trunc() as u32;
        }
    }
    let [n_hour, n_minute, n_second] = l_time_parts;

    NaiveDate::from_ymd_opt(n_year, n_month, n_day)?.and_hms_opt(n_hour, n_minute, n_second)
}

/// Convert a Unix timestamp in milliseconds into a UTC wall-clock datetime.
pub fn convert_timestamp_millis_to_datetime(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64).map(|dt| dt.naive_utc())
}

/// Parse a workbook metadata date (RFC 3339, `yyyy-mm-dd[ hh:mm:ss]`, or epoch millis).
pub fn parse_property_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => convert_timestamp_millis_to_datetime(n.as_f64()?),
        Value::String(s) => {
            let c_text = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(c_text) {
                return Some(dt.naive_utc());
            }
            for c_pattern in [
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M:%S%.f",
            ] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(c_text, c_pattern) {
                    return Some(dt);
                }
            }
            NaiveDate::parse_from_str(c_text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

/// Convert a wall-clock datetime into the writer's date type.
///
/// Returns `None` outside Excel's 1900..=9999 date range.
pub fn convert_datetime_to_excel_datetime(dt: &NaiveDateTime) -> Option<ExcelDateTime> {
    let n_seconds =
        f64::from(dt.second()) + f64::from(dt.nanosecond() % 1_000_000_000 / 1_000_000) / 1000.0;
    ExcelDateTime::from_ymd(
        u16::try_from(dt.year()).ok()?,
        u8::try_from(dt.month()).ok()?,
        u8::try_from(dt.day()).ok()?,
    )
    .ok()?
    .and_hms(
        u16::try_from(dt.hour()).ok()?,
        u8::try_from(dt.minute()).ok()?,
        n_seconds,
    )
    .ok()
}

/// Convert an Excel 1900-system serial number into a datetime.
///
/// Serials below 60 precede Excel's phantom 1900-02-29 and shift by one day;
/// serial 60 itself lands on 1900-02-28.
pub fn convert_excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let n_epoch_day = if serial < 60.0 { 31 } else { 30 };
    let dt_epoch = NaiveDate::from_ymd_opt(1899, 12, n_epoch_day)?.and_hms_opt(0, 0, 0)?;
    let n_millis = (serial * 86_400_000.0).round() as i64;
    dt_epoch.checked_add_signed(TimeDelta::try_milliseconds(n_millis)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sanitize_sheet_name_truncates_to_excel_limit() {
        let c_name = "Quarterly revenue by region and product line";
        let c_sanitized = sanitize_sheet_name(c_name, "_");

        assert_eq!(c_sanitized.chars().count(), 31);
        assert_eq!(c_sanitized, "Quarterly revenue by region and");
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet1");
    }

    proptest! {
        #[test]
        fn test_sanitize_sheet_name_never_exceeds_limit(name in "[A-Za-z0-9 ]{0,80}") {
            let c_sanitized = sanitize_sheet_name(&name, "_");
            prop_assert!(c_sanitized.chars().count() <= 31);
            prop_assert!(!c_sanitized.is_empty());
            if name.trim().chars().count() > 31 {
                prop_assert_eq!(c_sanitized.chars().count(), 31);
            }
        }
    }

    #[test]
    fn test_convert_hex_to_argb() {
        assert_eq!(convert_hex_to_argb("#FF0000"), "FFFF0000");
        assert_eq!(convert_hex_to_argb("1f2e3d"), "FF1F2E3D");
        assert_eq!(convert_hex_to_argb("#0f0"), "FF00FF00");
        assert_eq!(convert_argb_to_rgb("FFFF0000"), Some(0xFF0000));
        assert_eq!(convert_argb_to_rgb("#00FF00"), Some(0x00FF00));
        assert_eq!(convert_argb_to_rgb("FFZZ0000"), None);
    }

    #[test]
    fn test_calculate_char_width() {
        assert_eq!(calculate_char_width(0), 1.0);
        assert_eq!(calculate_char_width(8), 9.0);
        assert_eq!(calculate_char_width(19), 20.0);
        assert_eq!(calculate_char_width(35), 36.0);
    }

    #[test]
    fn test_parse_category_datetime_keeps_wall_clock() {
        let dt = parse_category_datetime("2024-03-05 14:30:00", false).unwrap();

        assert_eq!((dt.year(), dt.month0(), dt.day()), (2024, 2, 5));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (14, 30, 0));
        assert_eq!(dt.format("%B").to_string(), "March");
    }

    #[test]
    fn test_parse_category_datetime_variants() {
        let dt = parse_category_datetime("2024-02-05 01:02:03", true).unwrap();
        assert_eq!(dt.month(), 3);

        let dt = parse_category_datetime("2024-03-05", false).unwrap();
        assert_eq!((dt.hour(), dt.minute()), (0, 0));

        assert_eq!(parse_category_datetime("Week 12", false), None);
        assert_eq!(parse_category_datetime("2024-13-05 00:00:00", false), None);
        assert_eq!(parse_category_datetime("", false), None);
    }

    #[test]
    fn test_parse_property_datetime() {
        let dt = parse_property_datetime(&json!("2023-06-01T08:00:00Z")).unwrap();
        assert_eq!(dt.to_string(), "2023-06-01 08:00:00");

        let dt = parse_property_datetime(&json!("2023-06-01")).unwrap();
        assert_eq!(dt.to_string(), "2023-06-01 00:00:00");

        let dt = parse_property_datetime(&json!(0)).unwrap();
        assert_eq!(dt.to_string(), "1970-01-01 00:00:00");

        assert_eq!(parse_property_datetime(&json!("yesterday")), None);
        assert_eq!(parse_property_datetime(&json!(true)), None);
    }

    #[test]
    fn test_excel_serial_conversion() {
        let dt = parse_category_datetime("2024-03-05 12:00:00", false).unwrap();
        let n_serial = convert_datetime_to_excel_datetime(&dt).unwrap().to_excel();

        assert_eq!(n_serial, 45356.5);
        assert_eq!(convert_excel_serial_to_datetime(n_serial), Some(dt));
        assert_eq!(convert_excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_excel_serial_before_phantom_leap_day() {
        let dt = parse_category_datetime("1900-01-15 00:00:00", false).unwrap();
        let n_serial = convert_datetime_to_excel_datetime(&dt).unwrap().to_excel();

        assert_eq!(n_serial, 15.0);
        assert_eq!(convert_excel_serial_to_datetime(15.0), Some(dt));
        assert_eq!(
            convert_excel_serial_to_datetime(61.0).map(|dt| dt.to_string()),
            Some("1900-03-01 00:00:00".to_string())
        );
        let dt_early = parse_category_datetime("1899-12-31 00:00:00", false).unwrap();
        assert!(convert_datetime_to_excel_datetime(&dt_early).is_none());
    }

    #[test]
    fn test_parse_category_datetime_rejects_overflowing_month() {
        assert_eq!(
            parse_category_datetime("2024-4294967295-01 00:00:00", true),
            None
        );
        assert_eq!(
            parse_category_datetime("2024-4294967295-01 00:00:00", false),
            None
        );
    }
}
