use serde_json::Value;

use crate::error::ExportError;
use crate::table::{value_of, CellValue, COLUMNS};
use crate::views::Subset;

const BOM: &[u8] = "\u{feff}".as_bytes();

fn number(n: Option<f64>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

fn loose(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Untyped source keys across the subset, in first-seen order.
fn extra_keys(subset: &Subset) -> Vec<&str> {
    let mut keys: Vec<&str> = Vec::new();
    for r in subset.iter() {
        for k in r.extra.keys() {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
    }
    keys
}

/// CSV of the subset with the source column names, prefixed with a BOM so
/// spreadsheet tools pick UTF-8. Empty subsets export as an empty string.
pub fn to_csv(subset: &Subset) -> Result<String, ExportError> {
    if subset.is_empty() {
        return Ok(String::new());
    }
    let extra = extra_keys(subset);
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(BOM.to_vec());

    let header = COLUMNS
        .iter()
        .map(|c| c.key.source_key())
        .chain(extra.iter().copied());
    wtr.write_record(header)?;

    for r in subset.iter() {
        let typed = COLUMNS.iter().map(|c| match value_of(r, c.key) {
            CellValue::Text(t) => t.unwrap_or("").to_string(),
            CellValue::Number(n) => number(n),
        });
        let untyped = extra.iter().map(|k| loose(r.extra.get(*k)));
        wtr.write_record(typed.chain(untyped))?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Suggested download name, e.g. `tramos_vias_2024-05-01.csv`.
pub fn file_name(date_iso: &str) -> String {
    let day: String = date_iso.chars().take(10).collect();
    format!("tramos_vias_{}.csv", day)
}
