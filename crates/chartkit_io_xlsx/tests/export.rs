use std::io::{Cursor, Read};

use chartkit_io_xlsx::{
    C_MIME_TYPE_XLSX, DirectoryFileSaver, EnumAxisType, EnumRawCell, MemoryFileSaver,
    SpecChartAxis, SpecChartSeries, SpecChartSnapshot, SpecRawDataRow, SpecRawTable,
    XlsxChartExporter,
};
use serde_json::json;

fn derive_snapshot() -> SpecChartSnapshot {
    let derive_row = |x: f64, c_day: &str, n_rain: f64, n_temp: f64| SpecRawDataRow {
        x: EnumRawCell::Number(x),
        cells: vec![
            EnumRawCell::String(c_day.to_string()),
            EnumRawCell::Number(n_rain),
            EnumRawCell::String(c_day.to_string()),
            EnumRawCell::Number(n_temp),
        ],
    };

    SpecChartSnapshot {
        title: Some("Weather Station".to_string()),
        series: vec![
            SpecChartSeries::new("Rain", "column", Some(&json!({ "numberFormat": "0.0" }))),
            SpecChartSeries::new("Temp", "spline", None),
        ],
        x_axis: SpecChartAxis {
            axis_type: EnumAxisType::Datetime,
            ..Default::default()
        },
        data: SpecRawTable {
            headers: vec![
                "DateTime".to_string(),
                "Rain".to_string(),
                "DateTime".to_string(),
                "Temp".to_string(),
            ],
            rows: vec![
                derive_row(1.0, "2024-03-05 14:30:00", 1.5, 12.0),
                derive_row(2.0, "2024-03-06 14:30:00", f64::NAN, 13.5),
            ],
        },
    }
}

fn read_zip_entry(v_payload: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(v_payload)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut c_text = String::new();
    entry.read_to_string(&mut c_text).unwrap();
    c_text
}

#[test]
fn test_export_writes_native_workbook() {
    let exporter = XlsxChartExporter::from_json(Some(&json!({
        "xlsx": {
            "workbook": {
                "fileProperties": {
                    "title": "Weather",
                    "creator": "Station 7",
                    "created": "2024-03-07 08:00:00",
                    "reviewed": true
                }
            },
            "worksheet": {
                "sheetName": "Observations recorded at weather station seven",
                "autoFitColumns": true,
                "headerStyle": {
                    "font": { "bold": true, "color": "#FF0000" },
                    "fill": { "color": "#FFFF00" }
                }
            }
        }
    })));
    let mut saver = MemoryFileSaver::default();
    let report = exporter.download(&derive_snapshot(), &mut saver).unwrap();

    assert_eq!(report.file_name, "weather-station.xlsx");
    assert_eq!(report.sheet_name, "Observations recorded at weathe");
    assert_eq!(report.sheet_name.chars().count(), 31);
    assert_eq!((report.n_rows, report.n_cols), (2, 4));
    assert!(report.warnings.is_empty());

    let saved = &saver.files[0];
    assert_eq!(saved.mime_type, C_MIME_TYPE_XLSX);

    let c_workbook = read_zip_entry(&saved.payload, "xl/workbook.xml");
    assert!(c_workbook.contains(r#"name="Observations recorded at weathe""#));

    let c_sheet = read_zip_entry(&saved.payload, "xl/worksheets/sheet1.xml");
    assert!(c_sheet.contains("<f>NA()</f>"));
    assert!(c_sheet.contains("customWidth"));

    let c_styles = read_zip_entry(&saved.payload, "xl/styles.xml");
    assert!(c_styles.contains("FFFF0000"));
    assert!(c_styles.contains("FFFFFF00"));
    assert!(c_styles.contains("<b/>"));
    assert!(c_styles.contains(r#"formatCode="yyyy-mm-dd hh:mm:ss""#));
    assert!(c_styles.contains(r#"formatCode="0.0""#));

    let c_core = read_zip_entry(&saved.payload, "docProps/core.xml");
    assert!(c_core.contains("Weather"));
    assert!(c_core.contains("Station 7"));
    assert!(c_core.contains("2024-03-07T08:00:00Z"));

    let c_custom = read_zip_entry(&saved.payload, "docProps/custom.xml");
    assert!(c_custom.contains(r#"name="reviewed""#));
}

#[test]
fn test_export_to_directory() {
    let dir_tmp = tempfile::tempdir().unwrap();
    let dir_out = dir_tmp.path().join("exports");

    let exporter = XlsxChartExporter::from_json(Some(&json!({ "filename": "rain-report" })));
    let mut saver = DirectoryFileSaver::new(&dir_out);
    let report = exporter.download(&derive_snapshot(), &mut saver).unwrap();

    let path_file = dir_out.join("rain-report.xlsx");
    let v_payload = std::fs::read(&path_file).unwrap();
    assert_eq!(v_payload.len(), report.n_bytes);

    let c_workbook = read_zip_entry(&v_payload, "xl/workbook.xml");
    assert!(c_workbook.contains(r#"name="Sheet1""#));
}

#[test]
fn test_export_pie_chart_ignores_axis_range() {
    let mut snapshot = derive_snapshot();
    for series in &mut snapshot.series {
        series.series_type = "pie".to_string();
    }
    snapshot.x_axis = SpecChartAxis {
        min: Some(100.0),
        max: Some(200.0),
        ..Default::default()
    };

    let (_, report) = XlsxChartExporter::from_json(None)
        .write_buffer(&snapshot)
        .unwrap();
    assert_eq!(report.n_rows, 2);

    snapshot.series[1].series_type = "line".to_string();
    let (_, report) = XlsxChartExporter::from_json(None)
        .write_buffer(&snapshot)
        .unwrap();
    assert_eq!(report.n_rows, 0);
}
