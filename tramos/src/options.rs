use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::collate;
use crate::model::Record;

/// Option lists derived once from a dataset. Never mutated afterwards.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionIndex {
    pub subregiones: Vec<String>,
    pub municipios: Vec<String>,
    pub circuitos: Vec<String>,
    pub contratistas: Vec<String>,
    pub municipios_by_subregion: BTreeMap<String, Vec<String>>,
    pub circuitos_by_subregion: BTreeMap<String, Vec<String>>,
}

fn distinct_sorted<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for v in values.flatten() {
        if !v.is_empty() && seen.insert(v.as_str()) {
            out.push(v.clone());
        }
    }
    collate::sort(&mut out);
    out
}

fn grouped<F>(records: &[Record], pick: F) -> BTreeMap<String, Vec<String>>
where
    F: Fn(&Record) -> Option<&String>,
{
    let mut raw: BTreeMap<String, Vec<&Record>> = BTreeMap::new();
    for r in records {
        if let Some(s) = r.subregion.as_ref() {
            raw.entry(s.clone()).or_default().push(r);
        }
    }
    raw.into_iter()
        .map(|(k, rs)| (k, distinct_sorted(rs.into_iter().map(&pick))))
        .collect()
}

impl OptionIndex {
    pub fn build(records: &[Record]) -> Self {
        OptionIndex {
            subregiones: distinct_sorted(records.iter().map(|r| r.subregion.as_ref())),
            municipios: distinct_sorted(records.iter().map(|r| r.municipio.as_ref())),
            circuitos: distinct_sorted(records.iter().map(|r| r.circuito.as_ref())),
            contratistas: distinct_sorted(records.iter().map(|r| r.contratista.as_ref())),
            municipios_by_subregion: grouped(records, |r| r.municipio.as_ref()),
            circuitos_by_subregion: grouped(records, |r| r.circuito.as_ref()),
        }
    }

    /// Municipios selectable under `subregion`; the full list when it is empty.
    /// An unknown subregion yields no options.
    pub fn municipios_for(&self, subregion: &str) -> &[String] {
        if subregion.is_empty() {
            return &self.municipios;
        }
        self.municipios_by_subregion
            .get(subregion)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn circuitos_for(&self, subregion: &str) -> &[String] {
        if subregion.is_empty() {
            return &self.circuitos;
        }
        self.circuitos_by_subregion
            .get(subregion)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
