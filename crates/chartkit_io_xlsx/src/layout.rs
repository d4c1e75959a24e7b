//! Layout finishing: column auto-fit and header cell styles.

use crate::conf::N_WIDTH_COLUMN_DEFAULT;
use crate::numfmt::NumberFormatEvaluator;
use crate::spec::{EnumCellValue, SpecCellFormat, SpecColumn, SpecHeaderStyleOptions};
use crate::util::{calculate_char_width, convert_hex_to_argb};

/// Size every column to its longest rendered value.
///
/// Widths are floored at the default column width. When the first column ends
/// up wider than `wrap_column_width` it is clamped to it, and `true` is
/// returned so its header can wrap.
pub fn apply_autofit(
    columns: &mut [SpecColumn],
    rows: &[Vec<EnumCellValue>],
    wrap_column_width: f64,
    evaluator: &dyn NumberFormatEvaluator,
) -> bool {
    for (n_idx_col, column) in columns.iter_mut().enumerate() {
        let n_len_longest = rows
            .iter()
            .filter_map(|row| row.get(n_idx_col))
            .map(|value| render_cell_text(column, value, evaluator).chars().count())
            .fold(column.header.chars().count(), usize::max);

        column.width = Some(f64::max(
            calculate_char_width(n_len_longest),
            N_WIDTH_COLUMN_DEFAULT,
        ));
    }

    let Some(column_first) = columns.first_mut() else {
        return false;
    };
    match column_first.width {
        Some(n_width) if n_width > wrap_column_width => {
            log::debug!(
                "First column width {n_width} exceeds {wrap_column_width}; wrapping its header."
            );
            column_first.width = Some(wrap_column_width);
            true
        }
        _ => false,
    }
}

/// Text a cell shows once opened, used for width measurement.
pub fn render_cell_text(
    column: &SpecColumn,
    value: &EnumCellValue,
    evaluator: &dyn NumberFormatEvaluator,
) -> String {
    match &column.number_format {
        Some(c_num_format) => evaluator.format(c_num_format, value),
        None => value.to_natural_string(),
    }
}

/// Header cell format per column.
///
/// Style applies to populated headers only; `if_wrap_first` marks the first
/// header for wrapping.
pub fn derive_header_formats(
    columns: &[SpecColumn],
    header_style: &SpecHeaderStyleOptions,
    if_wrap_first: bool,
) -> Vec<SpecCellFormat> {
    let fmt_style = derive_header_style_format(header_style);

    columns
        .iter()
        .enumerate()
        .map(|(n_idx_col, column)| {
            let mut fmt_header = if column.header.is_empty() {
                SpecCellFormat::default()
            } else {
                fmt_style.clone()
            };
            if n_idx_col == 0 && if_wrap_first {
                fmt_header = fmt_header.with_(SpecCellFormat {
                    text_wrap: Some(true),
                    ..Default::default()
                });
            }
            fmt_header
        })
        .collect()
}

/// Translate the user header style into a cell format; colors become `FFRRGGBB`.
pub fn derive_header_style_format(header_style: &SpecHeaderStyleOptions) -> SpecCellFormat {
    let mut fmt_style = SpecCellFormat::default();
    if let Some(font) = &header_style.font {
        fmt_style.bold = font.bold.filter(|if_bold| *if_bold);
        fmt_style.font_color = font
            .color
            .as_deref()
            .filter(|c_color| !c_color.trim().is_empty())
            .map(convert_hex_to_argb);
    }
    if let Some(fill) = &header_style.fill {
        fmt_style.bg_color = fill
            .color
            .as_deref()
            .filter(|c_color| !c_color.trim().is_empty())
            .map(convert_hex_to_argb);
    }
    fmt_style
}
