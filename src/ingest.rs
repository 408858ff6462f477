use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::ScorecardError;
use crate::normalize::{RawRecord, RawValue};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
}

pub fn load_table(path: &Path) -> Result<RawTable, ScorecardError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let file = File::open(path)?;
    let table = match extension.as_str() {
        "csv" => read_csv(file)?,
        "json" => read_json(file)?,
        other => {
            return Err(ScorecardError::UnsupportedFormat(format!(
                "{} (extension '{other}')",
                path.display()
            )))
        }
    };

    info!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded export"
    );
    Ok(table)
}

pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, ScorecardError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = dedupe_headers(reader.headers()?.iter());
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRecord = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let value = record.get(index).map_or(RawValue::Empty, RawValue::from);
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

pub fn read_json<R: Read>(reader: R) -> Result<RawTable, ScorecardError> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_reader(reader)?;

    let mut headers: Vec<String> = Vec::new();
    let rows: Vec<RawRecord> = objects
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .map(|(header, value)| {
                    if !headers.contains(&header) {
                        headers.push(header.clone());
                    }
                    (header, json_cell(value))
                })
                .collect::<RawRecord>()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_cell(value: serde_json::Value) -> RawValue {
    use serde_json::Value;

    match value {
        Value::Null => RawValue::Empty,
        Value::Bool(flag) => RawValue::Flag(flag),
        Value::Number(number) => number.as_f64().map_or(RawValue::Empty, RawValue::Number),
        Value::String(text) => RawValue::from(text.as_str()),
        other => RawValue::Text(other.to_string()),
    }
}

fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|header| {
            let occurrences = seen.entry(header.to_string()).or_insert(0);
            let name = if *occurrences == 0 {
                header.to_string()
            } else {
                debug!(header, occurrence = *occurrences, "renaming duplicate header");
                format!("{header}.{occurrences}")
            };
            *occurrences += 1;
            name
        })
        .collect()
}
