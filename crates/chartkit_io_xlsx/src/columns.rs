//! Column planning: one column per exportable series plus category columns.

use crate::conf::{C_NUM_FORMAT_DATETIME_DEFAULT, N_WIDTH_COLUMN_DEFAULT};
use crate::host::{ChartSource, EnumHeaderSubject, SpecChartSeries};
use crate::spec::{SpecColumn, SpecXlsxWorksheetOptions};

/// Build the ordered column list for `headers` (the raw header row).
///
/// Series columns keep chart order; the category column is inserted at every
/// index whose raw header equals the first (category) header, which is how
/// combination charts repeat the category data.
pub fn plan_columns<C: ChartSource + ?Sized>(
    chart: &C,
    headers: &[String],
    worksheet: &SpecXlsxWorksheetOptions,
) -> Vec<SpecColumn> {
    let mut l_columns: Vec<SpecColumn> = chart
        .series()
        .iter()
        .filter(|series| series.if_exportable())
        .map(|series| derive_series_column(chart, series))
        .collect();

    let column_category = derive_category_column(chart, headers.first(), worksheet);
    for n_idx in derive_category_column_indices(headers) {
        let n_idx_insert = usize::min(n_idx, l_columns.len());
        l_columns.insert(n_idx_insert, column_category.clone());
    }

    log::debug!(
        "Planned {} columns ({} series).",
        l_columns.len(),
        l_columns.iter().filter(|col| !col.if_category).count()
    );
    l_columns
}

/// Indices of `headers` equal to the category header (`headers[0]`).
pub fn derive_category_column_indices(headers: &[String]) -> Vec<usize> {
    let Some(c_category_header) = headers.first() else {
        return vec![];
    };
    headers
        .iter()
        .enumerate()
        .filter_map(|(n_idx, c_header)| (c_header == c_category_header).then_some(n_idx))
        .collect()
}

/// Column for one series: override name, else host formatter, else series name.
pub fn derive_series_column<C: ChartSource + ?Sized>(
    chart: &C,
    series: &SpecChartSeries,
) -> SpecColumn {
    let c_header = series
        .xlsx
        .name
        .clone()
        .or_else(|| chart.format_column_header(EnumHeaderSubject::Series(series)))
        .unwrap_or_else(|| series.name.clone());

    derive_column(c_header, series.xlsx.number_format.clone(), false)
}

/// Category column template shared by every category position.
pub fn derive_category_column<C: ChartSource + ?Sized>(
    chart: &C,
    header_raw: Option<&String>,
    worksheet: &SpecXlsxWorksheetOptions,
) -> SpecColumn {
    let axis = chart.category_axis();
    let c_header = worksheet
        .category_column
        .title
        .clone()
        .or_else(|| chart.format_column_header(EnumHeaderSubject::CategoryAxis(axis)))
        .or_else(|| header_raw.cloned())
        .unwrap_or_default();

    let c_num_format = worksheet.category_column.number_format.clone().or_else(|| {
        axis.if_datetime()
            .then(|| C_NUM_FORMAT_DATETIME_DEFAULT.to_string())
    });

    derive_column(c_header, c_num_format, true)
}

fn derive_column(header: String, number_format: Option<String>, if_category: bool) -> SpecColumn {
    // Formatted columns need an explicit width or the format is lost on open.
    let width = number_format.as_ref().map(|_| N_WIDTH_COLUMN_DEFAULT);
    SpecColumn {
        key: header.clone(),
        header,
        number_format,
        width,
        if_category,
    }
}
