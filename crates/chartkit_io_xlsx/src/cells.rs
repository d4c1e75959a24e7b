//! Cell normalization: native dates on datetime axes, `#N/A` for non-finite numbers.

use crate::spec::{EnumCellError, EnumCellValue, EnumRawCell, SpecRawDataRow, SpecXlsxReport};
use crate::util::{convert_timestamp_millis_to_datetime, parse_category_datetime};

/// Options for [`normalize_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecCellNormalizeOptions<'a> {
    /// Number of output columns; rows are padded/truncated to it.
    pub n_cols: usize,
    /// Category column indices.
    pub cols_idx_category: &'a [usize],
    /// Convert category labels into dates.
    pub if_datetime_axis: bool,
    /// Category label months are already zero-based.
    pub if_month_zero_based: bool,
}

/// Convert raw host rows into writer-ready rows.
pub fn normalize_rows(
    rows: Vec<SpecRawDataRow>,
    options: SpecCellNormalizeOptions<'_>,
    report: &mut SpecXlsxReport,
) -> Vec<Vec<EnumCellValue>> {
    let SpecCellNormalizeOptions {
        n_cols,
        cols_idx_category,
        if_datetime_axis,
        if_month_zero_based,
    } = options;

    let mut n_rows_reshaped = 0usize;
    let mut l_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut l_cells = row.cells;
        if l_cells.len() != n_cols {
            n_rows_reshaped += 1;
            l_cells.resize(n_cols, EnumRawCell::None);
        }

        let n_idx_last = n_cols.saturating_sub(1);
        let l_values: Vec<EnumCellValue> = l_cells
            .into_iter()
            .enumerate()
            .map(|(n_idx, cell)| {
                if cols_idx_category.contains(&n_idx) {
                    if if_datetime_axis {
                        convert_category_cell(cell, if_month_zero_based)
                    } else {
                        EnumCellValue::from(cell)
                    }
                } else if n_idx == n_idx_last {
                    EnumCellValue::from(cell)
                } else {
                    convert_value_cell(cell)
                }
            })
            .collect();
        l_rows.push(l_values);
    }

    if n_rows_reshaped > 0 {
        report.warn(format!(
            "{n_rows_reshaped} row(s) did not match the {n_cols} planned columns and were padded/truncated."
        ));
    }
    l_rows
}

/// Category label to date; unparseable labels pass through unchanged.
pub fn convert_category_cell(cell: EnumRawCell, if_month_zero_based: bool) -> EnumCellValue {
    match cell {
        EnumRawCell::None => EnumCellValue::None,
        EnumRawCell::String(s) if s.trim().is_empty() => EnumCellValue::None,
        EnumRawCell::String(s) => match parse_category_datetime(&s, if_month_zero_based) {
            Some(dt) => EnumCellValue::DateTime(dt),
            None => {
                log::debug!("Category label {s:?} is not a date; kept as text.");
                EnumCellValue::String(s)
            }
        },
        EnumRawCell::Number(n) => match convert_timestamp_millis_to_datetime(n) {
            Some(dt) => EnumCellValue::DateTime(dt),
            None => EnumCellValue::Number(n),
        },
    }
}

/// Series value: non-finite numbers become `#N/A`.
pub fn convert_value_cell(cell: EnumRawCell) -> EnumCellValue {
    match cell {
        EnumRawCell::Number(n) if !n.is_finite() => {
            EnumCellValue::Error(EnumCellError::NotAvailable)
        }
        other => EnumCellValue::from(other),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn derive_row(cells: Vec<EnumRawCell>) -> SpecRawDataRow {
        SpecRawDataRow::from_cells(cells)
    }

    #[test]
    fn test_normalize_rows_converts_datetime_categories() {
        let mut report = SpecXlsxReport::default();
        let l_rows = normalize_rows(
            vec![derive_row(vec![
                EnumRawCell::String("2024-03-05 14:30:00".to_string()),
                EnumRawCell::Number(1.5),
            ])],
            SpecCellNormalizeOptions {
                n_cols: 2,
                cols_idx_category: &[0],
                if_datetime_axis: true,
                if_month_zero_based: false,
            },
            &mut report,
        );

        let EnumCellValue::DateTime(dt) = &l_rows[0][0] else {
            panic!("expected a date, got {:?}", l_rows[0][0]);
        };
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month0(), 2);
        assert_eq!(dt.day(), 5);
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (14, 30, 0));
        assert_eq!(l_rows[0][1], EnumCellValue::Number(1.5));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_normalize_rows_marks_nan_except_last_column() {
        let mut report = SpecXlsxReport::default();
        let l_rows = normalize_rows(
            vec![derive_row(vec![
                EnumRawCell::String("Jan".to_string()),
                EnumRawCell::Number(f64::NAN),
                EnumRawCell::Number(f64::INFINITY),
                EnumRawCell::Number(2.0),
                EnumRawCell::Number(f64::NAN),
            ])],
            SpecCellNormalizeOptions {
                n_cols: 5,
                cols_idx_category: &[0],
                ..Default::default()
            },
            &mut report,
        );

        assert_eq!(l_rows[0][0], EnumCellValue::String("Jan".to_string()));
        assert_eq!(
            l_rows[0][1],
            EnumCellValue::Error(EnumCellError::NotAvailable)
        );
        assert_eq!(
            l_rows[0][2],
            EnumCellValue::Error(EnumCellError::NotAvailable)
        );
        assert_eq!(l_rows[0][3], EnumCellValue::Number(2.0));
        assert!(matches!(l_rows[0][4], EnumCellValue::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_normalize_rows_converts_every_category_position() {
        let mut report = SpecXlsxReport::default();
        let l_rows = normalize_rows(
            vec![derive_row(vec![
                EnumRawCell::String("2024-01-02 00:00:00".to_string()),
                EnumRawCell::Number(1.0),
                EnumRawCell::String("2024-01-02 00:00:00".to_string()),
                EnumRawCell::Number(2.0),
            ])],
            SpecCellNormalizeOptions {
                n_cols: 4,
                cols_idx_category: &[0, 2],
                if_datetime_axis: true,
                if_month_zero_based: false,
            },
            &mut report,
        );

        assert!(matches!(l_rows[0][0], EnumCellValue::DateTime(_)));
        assert!(matches!(l_rows[0][2], EnumCellValue::DateTime(_)));
    }

    #[test]
    fn test_normalize_rows_reshapes_and_warns() {
        let mut report = SpecXlsxReport::default();
        let l_rows = normalize_rows(
            vec![
                derive_row(vec![EnumRawCell::String("A".to_string())]),
                derive_row(vec![
                    EnumRawCell::String("B".to_string()),
                    EnumRawCell::Number(1.0),
                    EnumRawCell::Number(2.0),
                ]),
            ],
            SpecCellNormalizeOptions {
                n_cols: 2,
                cols_idx_category: &[0],
                ..Default::default()
            },
            &mut report,
        );

        assert_eq!(l_rows[0], vec![EnumCellValue::String("A".to_string()), EnumCellValue::None]);
        assert_eq!(l_rows[1].len(), 2);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_convert_category_cell_edge_cases() {
        assert_eq!(
            convert_category_cell(EnumRawCell::String("Q1".to_string()), false),
            EnumCellValue::String("Q1".to_string())
        );
        assert_eq!(
            convert_category_cell(EnumRawCell::String(String::new()), false),
            EnumCellValue::None
        );
        let EnumCellValue::DateTime(dt) = convert_category_cell(EnumRawCell::Number(0.0), false)
        else {
            panic!("expected a date");
        };
        assert_eq!(dt.year(), 1970);
    }
}
