// src/sources.rs
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use crate::errors::{Result, ValidationError};
use crate::row::Row;

/// The shared sheet of Babel test cases.
pub const DEFAULT_GOOGLE_SHEET_ID: &str = "11zebx8Qs1Tc3ShQR9nh4HRW8QSoo8k65w_xIaftN0no";

/// The CSV export URL of the `Tests` tab of a Google Sheet.
pub fn google_sheet_csv_url(sheet_id: &str) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet=Tests",
        sheet_id
    )
}

/// Reads rows from CSV with a header row.
///
/// Row numbers match the spreadsheet, so the first data row is line 2. Rows
/// with nothing but empty cells are skipped.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let cells: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();
        let row = Row::new(index + 2, cells);
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Reads rows from a JSON array of objects with string values. Rows are
/// numbered by their position in the array, starting at 1.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<Row>> {
    let objects: Vec<BTreeMap<String, String>> = serde_json::from_reader(reader)?;
    Ok(objects
        .into_iter()
        .enumerate()
        .map(|(index, cells)| Row::new(index + 1, cells))
        .filter(|row| !row.is_blank())
        .collect())
}

/// Loads a sheet from disk, picking the reader by file extension.
pub fn load_sheet(path: &Path) -> Result<Vec<Row>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let file = std::fs::File::open(path)?;

    let rows = match extension.as_deref() {
        Some("csv") => read_csv(file)?,
        Some("json") => read_json(file)?,
        _ => return Err(ValidationError::UnsupportedSheet(path.display().to_string())),
    };
    log::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Downloads the `Tests` tab of a Google Sheet and reads it as CSV.
pub async fn download_google_sheet(client: &Client, sheet_id: &str) -> Result<Vec<Row>> {
    let url = google_sheet_csv_url(sheet_id);
    log::debug!("Downloading test cases from {}", url);

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ValidationError::Download {
            url,
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    let rows = read_csv(body.as_bytes())?;
    log::info!("Downloaded {} rows from Google Sheet {}", rows.len(), sheet_id);
    Ok(rows)
}

/// Counts rows per `Category`.
pub fn categories(rows: &[Row]) -> BTreeMap<String, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.category()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(category, count)| (category.to_string(), count))
        .collect()
}
