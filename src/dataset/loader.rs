//! CSV import/export for sensor tables.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{Column, SensorTable};
use crate::error::Result;

/// Lowercase, trim, spaces to underscores (`"AC Power"` -> `"ac_power"`)
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Load a headered CSV. A column is numeric when every non-empty cell parses
/// as `f64`; empty numeric cells become NaN.
pub fn load_csv(path: impl AsRef<Path>) -> Result<SensorTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").trim().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| (name, infer_column(values)))
        .collect();

    let table = SensorTable::from_columns(columns)?;
    info!(path = %path.display(), rows = table.len(), columns = table.width(), "loaded table");
    debug!(columns = ?table.column_names(), "table columns");
    Ok(table)
}

fn infer_column(values: Vec<String>) -> Column {
    let parsed: Option<Vec<f64>> = values
        .iter()
        .map(|v| if v.is_empty() { Some(f64::NAN) } else { v.parse::<f64>().ok() })
        .collect();

    match parsed {
        Some(numbers) if values.iter().any(|v| !v.is_empty()) => Column::Numeric(numbers),
        _ => Column::Text(values),
    }
}

/// Write the table as CSV, creating parent directories. The file is written
/// next to its destination and renamed into place.
pub fn write_csv(table: &SensorTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(table.column_names())?;
        for row in 0..table.len() {
            writer.write_record(table.columns().iter().map(|(_, c)| c.cell(row)))?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), rows = table.len(), "wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("AC Power"), "ac_power");
        assert_eq!(normalize_header(" Module Temperature "), "module_temperature");
        assert_eq!(normalize_header("date_time"), "date_time");
    }

    #[test]
    fn test_load_csv_infers_column_kinds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DATE_TIME,PLANT_ID,IRRADIATION,AC Power").unwrap();
        writeln!(file, "15-05-2020 00:00,4135001,0,0").unwrap();
        writeln!(file, "15-05-2020 12:00,4135001,,812.5").unwrap();
        writeln!(file, "15-05-2020 12:15,abc,0.91,820").unwrap();

        let table = load_csv(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column_names(),
            vec!["date_time", "plant_id", "irradiation", "ac_power"]
        );
        assert!(matches!(table.column("date_time"), Some(Column::Text(_))));
        assert!(matches!(table.column("plant_id"), Some(Column::Text(_))));

        let irradiation = table.numeric("irradiation").unwrap();
        assert!(irradiation[1].is_nan());
        assert_eq!(irradiation[2], 0.91);
        assert_eq!(table.numeric("ac_power").unwrap(), &[0.0, 812.5, 820.0]);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interim").join("train.csv");

        let table = SensorTable::from_columns(vec![
            ("hour".to_string(), Column::Numeric(vec![6.0, f64::NAN])),
            ("note".to_string(), Column::Text(vec!["a".into(), "b".into()])),
        ])
        .unwrap();

        write_csv(&table, &path).unwrap();
        let loaded = load_csv(&path).unwrap();

        assert_eq!(loaded.numeric("hour").unwrap()[0], 6.0);
        assert!(loaded.numeric("hour").unwrap()[1].is_nan());
        assert_eq!(loaded.column("note"), table.column("note"));
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
