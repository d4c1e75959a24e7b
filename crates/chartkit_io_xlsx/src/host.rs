//! Host chart collaborator interface.
//!
//! The charting host supplies series/axis state and its base row extraction;
//! nothing in this crate mutates host state.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::resolve::resolve_series_export_options;
use crate::spec::{SpecRawTable, SpecSeriesExportOptions};

/// Category axis type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumAxisType {
    /// Numeric linear axis.
    #[default]
    Linear,
    /// Numeric logarithmic axis.
    Logarithmic,
    /// Date/time axis; category labels are formatted date strings.
    Datetime,
    /// Named categories.
    Category,
    /// Any other host axis type.
    #[serde(other)]
    Other,
}

/// Category (x) axis state at export time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecChartAxis {
    /// Axis title, if any.
    pub title: Option<String>,
    /// Axis type.
    #[serde(rename = "type")]
    pub axis_type: EnumAxisType,
    /// Current visible minimum.
    pub min: Option<f64>,
    /// Current visible maximum.
    pub max: Option<f64>,
}

impl SpecChartAxis {
    /// True on date/time axes.
    pub fn if_datetime(&self) -> bool {
        self.axis_type == EnumAxisType::Datetime
    }
}

/// One chart series as seen by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecChartSeries {
    /// Default display name.
    pub name: String,
    /// Host series type (`line`, `column`, `pie`, ...).
    #[serde(rename = "type")]
    pub series_type: String,
    /// Currently visible.
    pub visible: bool,
    /// `Some(false)` excludes the series from data export.
    pub include_in_data_export: Option<bool>,
    /// Internal helper series (navigator etc.), never exported.
    pub is_internal: bool,
    /// XLSX options, resolved when the series is created.
    #[serde(deserialize_with = "deserialize_series_export_options")]
    pub xlsx: SpecSeriesExportOptions,
}

impl Default for SpecChartSeries {
    fn default() -> Self {
        Self {
            name: String::new(),
            series_type: "line".to_string(),
            visible: true,
            include_in_data_export: None,
            is_internal: false,
            xlsx: SpecSeriesExportOptions::default(),
        }
    }
}

impl SpecChartSeries {
    /// Create a series, resolving its raw `xlsx` options.
    pub fn new(name: impl Into<String>, series_type: impl Into<String>, xlsx: Option<&Value>) -> Self {
        Self {
            name: name.into(),
            series_type: series_type.into(),
            xlsx: resolve_series_export_options(xlsx),
            ..Default::default()
        }
    }

    /// Visible, not internal, and not excluded from data export.
    pub fn if_exportable(&self) -> bool {
        self.include_in_data_export != Some(false) && !self.is_internal && self.visible
    }
}

fn deserialize_series_export_options<'de, D>(
    deserializer: D,
) -> Result<SpecSeriesExportOptions, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(resolve_series_export_options(Some(&value)))
}

/// What a header formatter is asked to name.
#[derive(Debug, Clone, Copy)]
pub enum EnumHeaderSubject<'a> {
    /// A series column.
    Series(&'a SpecChartSeries),
    /// The category column.
    CategoryAxis(&'a SpecChartAxis),
}

/// Chart state and base data extraction supplied by the host.
pub trait ChartSource {
    /// All series, in chart order.
    fn series(&self) -> &[SpecChartSeries];

    /// The first category (x) axis.
    fn category_axis(&self) -> &SpecChartAxis;

    /// Base extraction: header row plus one row per category, unfiltered.
    fn extract_data_rows(&self) -> SpecRawTable;

    /// Default export file name, without extension.
    fn default_file_name(&self) -> String;

    /// Host column-header formatter; `None` falls through to the defaults.
    fn format_column_header(&self, _subject: EnumHeaderSubject<'_>) -> Option<String> {
        None
    }
}

/// Serializable chart snapshot, for hosts that hand over plain data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecChartSnapshot {
    /// Chart title, used for the default file name.
    pub title: Option<String>,
    /// Series, in chart order.
    pub series: Vec<SpecChartSeries>,
    /// Category axis.
    pub x_axis: SpecChartAxis,
    /// Host-extracted rows.
    pub data: SpecRawTable,
}

impl ChartSource for SpecChartSnapshot {
    fn series(&self) -> &[SpecChartSeries] {
        &self.series
    }

    fn category_axis(&self) -> &SpecChartAxis {
        &self.x_axis
    }

    fn extract_data_rows(&self) -> SpecRawTable {
        self.data.clone()
    }

    fn default_file_name(&self) -> String {
        derive_default_file_name(self.title.as_deref())
    }
}

/// Derive a file name from a chart title (`chart` when untitled).
pub fn derive_default_file_name(title: Option<&str>) -> String {
    let c_name: String = title
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|chr| if chr.is_whitespace() { '-' } else { chr })
        .filter(|chr| chr.is_alphanumeric() || matches!(chr, '-' | '_'))
        .collect::<String>()
        .to_lowercase();
    if c_name.is_empty() {
        "chart".to_string()
    } else {
        c_name
    }
}
