use std::cell::RefCell;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ViewError;
use crate::model::Record;
use crate::views::{Consumer, Subset};

const EMPTY_MESSAGE: &str = "No se encontraron registros";
const TEXT_MAX_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    Number,
    Text,
    Currency,
    Decimal,
    Percent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColumnKey {
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "CIRCUITO")]
    Circuito,
    #[serde(rename = "SUBREGION")]
    Subregion,
    #[serde(rename = "MPIO_NOMBRE")]
    Municipio,
    #[serde(rename = "CONTRATISTA")]
    Contratista,
    #[serde(rename = "NOMBRE_VIA")]
    NombreVia,
    #[serde(rename = "CODIGO_VIA")]
    CodigoVia,
    #[serde(rename = "VALOR_CTO")]
    ValorContrato,
    #[serde(rename = "Longitud (km)")]
    LongitudCircuito,
    #[serde(rename = "Longitud(m)")]
    LongitudTramo,
    #[serde(rename = "Long_m")]
    LongitudM,
    #[serde(rename = "PLAZO (MESES)")]
    PlazoMeses,
    #[serde(rename = "ACTA_INICIO")]
    ActaInicio,
    #[serde(rename = "ACTA_FIN")]
    ActaFin,
    #[serde(rename = "Dias")]
    Dias,
    #[serde(rename = "Avance")]
    Avance,
    #[serde(rename = "NO_CONTRATO")]
    Contrato,
    #[serde(rename = "LOTE")]
    Lote,
    #[serde(rename = "TIPO_VIA")]
    TipoVia,
    #[serde(rename = "ORDEN")]
    Orden,
    #[serde(rename = "SUBREGION_1")]
    Subregion1,
}

impl ColumnKey {
    /// Source JSON key, also used as the CSV header.
    pub fn source_key(self) -> &'static str {
        match self {
            ColumnKey::Id => "ID",
            ColumnKey::Circuito => "CIRCUITO",
            ColumnKey::Subregion => "SUBREGION",
            ColumnKey::Municipio => "MPIO_NOMBRE",
            ColumnKey::Contratista => "CONTRATISTA",
            ColumnKey::NombreVia => "NOMBRE_VIA",
            ColumnKey::CodigoVia => "CODIGO_VIA",
            ColumnKey::ValorContrato => "VALOR_CTO",
            ColumnKey::LongitudCircuito => "Longitud (km)",
            ColumnKey::LongitudTramo => "Longitud(m)",
            ColumnKey::LongitudM => "Long_m",
            ColumnKey::PlazoMeses => "PLAZO (MESES)",
            ColumnKey::ActaInicio => "ACTA_INICIO",
            ColumnKey::ActaFin => "ACTA_FIN",
            ColumnKey::Dias => "Dias",
            ColumnKey::Avance => "Avance",
            ColumnKey::Contrato => "NO_CONTRATO",
            ColumnKey::Lote => "LOTE",
            ColumnKey::TipoVia => "TIPO_VIA",
            ColumnKey::Orden => "ORDEN",
            ColumnKey::Subregion1 => "SUBREGION_1",
        }
    }
}

impl FromStr for ColumnKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COLUMNS
            .iter()
            .map(|c| c.key)
            .find(|k| k.source_key() == s)
            .ok_or(())
    }
}

/// Raw value of one column for a record.
pub enum CellValue<'a> {
    Text(Option<&'a str>),
    Number(Option<f64>),
}

pub fn value_of(r: &Record, key: ColumnKey) -> CellValue<'_> {
    use CellValue::{Number, Text};
    match key {
        ColumnKey::Id => Number(r.id),
        ColumnKey::Circuito => Text(r.circuito.as_deref()),
        ColumnKey::Subregion => Text(r.subregion.as_deref()),
        ColumnKey::Municipio => Text(r.municipio.as_deref()),
        ColumnKey::Contratista => Text(r.contratista.as_deref()),
        ColumnKey::NombreVia => Text(r.nombre_via.as_deref()),
        ColumnKey::CodigoVia => Text(r.codigo_via.as_deref()),
        ColumnKey::ValorContrato => Number(r.valor_contrato),
        ColumnKey::LongitudCircuito => Number(r.longitud_circuito_km),
        ColumnKey::LongitudTramo => Number(r.longitud_tramo_km),
        ColumnKey::LongitudM => Number(r.longitud_m),
        ColumnKey::PlazoMeses => Number(r.plazo_meses),
        ColumnKey::ActaInicio => Text(r.acta_inicio.as_deref()),
        ColumnKey::ActaFin => Text(r.acta_fin.as_deref()),
        ColumnKey::Dias => Number(r.dias),
        ColumnKey::Avance => Number(r.avance),
        ColumnKey::Contrato => Text(r.contrato.as_deref()),
        ColumnKey::Lote => Number(r.lote),
        ColumnKey::TipoVia => Number(r.tipo_via),
        ColumnKey::Orden => Number(r.orden),
        ColumnKey::Subregion1 => Text(r.subregion_1.as_deref()),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub key: ColumnKey,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub active: bool,
}

const fn col(key: ColumnKey, label: &'static str, kind: ColumnKind, active: bool) -> Column {
    Column {
        key,
        label,
        kind,
        active,
    }
}

pub const COLUMNS: [Column; 21] = [
    col(ColumnKey::Id, "ID", ColumnKind::Number, true),
    col(ColumnKey::Circuito, "CIRCUITO", ColumnKind::Text, true),
    col(ColumnKey::Subregion, "SUBREGIÓN", ColumnKind::Text, true),
    col(ColumnKey::Municipio, "MUNICIPIO", ColumnKind::Text, true),
    col(ColumnKey::Contratista, "CONTRATISTA", ColumnKind::Text, true),
    col(ColumnKey::NombreVia, "VÍA", ColumnKind::Text, true),
    col(ColumnKey::CodigoVia, "CÓDIGO VÍA", ColumnKind::Text, true),
    col(ColumnKey::ValorContrato, "VALOR CONTRATO", ColumnKind::Currency, true),
    col(ColumnKey::LongitudCircuito, "LONG. CIRCUITO (km)", ColumnKind::Decimal, true),
    col(ColumnKey::LongitudTramo, "LONG. TRAMO (km)", ColumnKind::Decimal, true),
    col(ColumnKey::LongitudM, "LONG. TRAMO (m)", ColumnKind::Decimal, false),
    col(ColumnKey::PlazoMeses, "PLAZO (meses)", ColumnKind::Number, false),
    col(ColumnKey::ActaInicio, "ACTA INICIO", ColumnKind::Text, false),
    col(ColumnKey::ActaFin, "ACTA FIN", ColumnKind::Text, false),
    col(ColumnKey::Dias, "DÍAS TRANSCURRIDOS", ColumnKind::Number, false),
    col(ColumnKey::Avance, "AVANCE (%)", ColumnKind::Percent, true),
    col(ColumnKey::Contrato, "No. CONTRATO", ColumnKind::Text, false),
    col(ColumnKey::Lote, "LOTE", ColumnKind::Number, false),
    col(ColumnKey::TipoVia, "TIPO VÍA", ColumnKind::Number, false),
    col(ColumnKey::Orden, "ORDEN", ColumnKind::Number, false),
    col(ColumnKey::Subregion1, "SUBREGIÓN 2", ColumnKind::Text, false),
];

pub fn column(key: ColumnKey) -> &'static Column {
    // Every key has exactly one entry.
    match COLUMNS.iter().find(|c| c.key == key) {
        Some(c) => c,
        None => unreachable!("column {:?} missing", key),
    }
}

// es-CO number formatting

fn group_thousands(int_part: &str) -> String {
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// `1234.5` with 2 decimals -> `1.234,50`.
pub fn format_decimal(v: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, v.abs());
    let (int_part, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut out = String::new();
    if v < 0.0 && s.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(f) = frac {
        out.push(',');
        out.push_str(f);
    }
    out
}

pub fn format_currency(v: f64) -> String {
    format!("$\u{a0}{}", format_decimal(v, 0))
}

pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format_decimal(v, 0)
    } else {
        format_decimal(v, 2)
    }
}

pub fn truncate_text(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PercentBand {
    High,
    Mid,
    Low,
}

impl PercentBand {
    pub fn for_pct(pct: f64) -> Self {
        if pct >= 50.0 {
            PercentBand::High
        } else if pct >= 20.0 {
            PercentBand::Mid
        } else {
            PercentBand::Low
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<PercentBand>,
}

impl Cell {
    fn plain(text: String) -> Self {
        Cell {
            text,
            title: None,
            band: None,
        }
    }
}

pub fn format_cell(r: &Record, column: &Column) -> Cell {
    let missing = || Cell::plain("-".to_string());
    match (column.kind, value_of(r, column.key)) {
        (ColumnKind::Percent, CellValue::Number(v)) => {
            let pct = v.unwrap_or(0.0) * 100.0;
            Cell {
                text: format!("{:.1}%", pct),
                title: None,
                band: Some(PercentBand::for_pct(pct)),
            }
        }
        (ColumnKind::Currency, CellValue::Number(v)) => {
            v.map_or_else(missing, |v| Cell::plain(format_currency(v)))
        }
        (ColumnKind::Decimal, CellValue::Number(v)) => {
            v.map_or_else(missing, |v| Cell::plain(format_decimal(v, 2)))
        }
        (_, CellValue::Number(v)) => v.map_or_else(missing, |v| Cell::plain(format_number(v))),
        (_, CellValue::Text(t)) => {
            let t = t.unwrap_or("");
            let text = truncate_text(t, TEXT_MAX_CHARS);
            let title = (text.len() != t.len()).then(|| t.to_string());
            Cell {
                text,
                title,
                band: None,
            }
        }
    }
}

/// Table rows for the current subset, restricted to the active columns.
pub struct TableModel {
    columns: RefCell<Vec<Column>>,
    subset: RefCell<Subset>,
}

impl TableModel {
    pub fn new(initial: Subset) -> Self {
        TableModel {
            columns: RefCell::new(COLUMNS.to_vec()),
            subset: RefCell::new(initial),
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        self.columns.borrow().clone()
    }

    pub fn active_columns(&self) -> Vec<Column> {
        self.columns
            .borrow()
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect()
    }

    /// Turning off the last active column is refused.
    pub fn set_active(&self, key: ColumnKey, active: bool) -> bool {
        let mut cols = self.columns.borrow_mut();
        let remaining = cols.iter().filter(|c| c.active && c.key != key).count();
        if !active && remaining == 0 {
            return false;
        }
        match cols.iter_mut().find(|c| c.key == key) {
            Some(c) => {
                c.active = active;
                true
            }
            None => false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.subset.borrow().len()
    }

    /// Placeholder shown instead of rows when the subset is empty.
    pub fn empty_message(&self) -> Option<&'static str> {
        (self.row_count() == 0).then_some(EMPTY_MESSAGE)
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        let cols = self.active_columns();
        self.subset
            .borrow()
            .iter()
            .map(|r| cols.iter().map(|c| format_cell(r, c)).collect())
            .collect()
    }

    pub fn subset(&self) -> Subset {
        self.subset.borrow().clone()
    }
}

impl Consumer for TableModel {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        *self.subset.borrow_mut() = subset.clone();
        Ok(())
    }

    fn label(&self) -> &str {
        "table"
    }
}
