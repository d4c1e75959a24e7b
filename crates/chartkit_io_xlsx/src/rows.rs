//! Row extraction restricted to the visible category range.

use std::collections::BTreeSet;

use crate::conf::TUP_WHOLE_PART_SERIES_TYPES;
use crate::host::{ChartSource, SpecChartAxis, SpecChartSeries};
use crate::spec::{SpecRawDataRow, SpecRawTable};

/// Decorator over the host's base extraction that drops rows outside the
/// visible axis window.
pub struct VisibleRangeRows<'a, C: ChartSource + ?Sized> {
    chart: &'a C,
}

impl<'a, C: ChartSource + ?Sized> VisibleRangeRows<'a, C> {
    /// Wrap `chart`'s base extraction.
    pub fn new(chart: &'a C) -> Self {
        Self { chart }
    }

    /// Extract rows, filtered unless the chart is a whole-part chart.
    pub fn extract_data_rows(&self) -> SpecRawTable {
        let mut table = self.chart.extract_data_rows();
        if check_whole_part_series(self.chart.series()) {
            log::debug!(
                "Whole-part chart: exporting all {} rows unfiltered.",
                table.rows.len()
            );
            return table;
        }

        let n_rows_before = table.rows.len();
        table.rows = filter_rows_to_axis_range(table.rows, self.chart.category_axis());
        log::debug!(
            "Axis range filter kept {} of {} rows.",
            table.rows.len(),
            n_rows_before
        );
        table
    }
}

/// Distinct series types, in sorted order.
pub fn derive_distinct_series_types(series: &[SpecChartSeries]) -> BTreeSet<&str> {
    series.iter().map(|s| s.series_type.as_str()).collect()
}

/// True when all series share exactly one whole-part type (e.g. `pie`).
pub fn check_whole_part_series(series: &[SpecChartSeries]) -> bool {
    let set_types = derive_distinct_series_types(series);
    set_types.len() == 1
        && set_types
            .iter()
            .all(|c_type| TUP_WHOLE_PART_SERIES_TYPES.contains(c_type))
}

/// Keep rows whose numeric category lies in `[axis.min, axis.max]`.
///
/// Non-numeric categories are always kept; a missing bound is open.
pub fn filter_rows_to_axis_range(
    rows: Vec<SpecRawDataRow>,
    axis: &SpecChartAxis,
) -> Vec<SpecRawDataRow> {
    rows.into_iter()
        .filter(|row| match row.x.as_number() {
            Some(n_x) => {
                axis.min.is_none_or(|n_min| n_x >= n_min) && axis.max.is_none_or(|n_max| n_x <= n_max)
            }
            None => true,
        })
        .collect()
}
