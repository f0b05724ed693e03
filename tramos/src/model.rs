use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::limits::clamp_text;

/// One road segment / contract line item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord", rename_all = "camelCase")]
pub struct Record {
    pub id: Option<f64>,
    pub subregion: Option<String>,
    pub municipio: Option<String>,
    pub circuito: Option<String>,
    pub contratista: Option<String>,
    pub nombre_via: Option<String>,
    pub codigo_via: Option<String>,
    pub contrato: Option<String>,
    pub longitud_tramo_km: Option<f64>,
    pub longitud_circuito_km: Option<f64>,
    pub avance: Option<f64>,
    pub valor_contrato: Option<f64>,
    pub longitud_m: Option<f64>,
    pub plazo_meses: Option<f64>,
    pub acta_inicio: Option<String>,
    pub acta_fin: Option<String>,
    pub dias: Option<f64>,
    pub lote: Option<f64>,
    pub tipo_via: Option<f64>,
    pub orden: Option<f64>,
    /// `SUBREGION_1` as given, even when `subregion` came from `SUBREGION`.
    pub subregion_1: Option<String>,
    /// Source keys with no typed field, kept for export.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Record {
    pub fn avance_pct(&self) -> f64 {
        self.avance.unwrap_or(0.0) * 100.0
    }

    pub fn longitud_km(&self) -> f64 {
        self.longitud_tramo_km.unwrap_or(0.0)
    }

    /// Text the free search is matched against, lower-cased.
    pub fn search_text(&self) -> String {
        [
            &self.circuito,
            &self.municipio,
            &self.subregion,
            &self.contratista,
            &self.nombre_via,
            &self.codigo_via,
        ]
        .iter()
        .map(|f| f.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// Shape of a record as it appears in the bundled JSON.
#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRecord {
    #[serde(rename = "ID", alias = "id")]
    id: Value,
    #[serde(rename = "SUBREGION", alias = "subregion")]
    subregion: Value,
    #[serde(rename = "SUBREGION_1")]
    subregion_alt: Value,
    #[serde(rename = "MPIO_NOMBRE", alias = "municipio")]
    municipio: Value,
    #[serde(rename = "CIRCUITO", alias = "circuito")]
    circuito: Value,
    #[serde(rename = "CONTRATISTA", alias = "contratista")]
    contratista: Value,
    #[serde(rename = "NOMBRE_VIA", alias = "nombreVia")]
    nombre_via: Value,
    #[serde(rename = "CODIGO_VIA", alias = "codigoVia")]
    codigo_via: Value,
    #[serde(rename = "NO_CONTRATO", alias = "contrato")]
    contrato: Value,
    // The source sheet stores the segment length in km under this key.
    #[serde(rename = "Longitud(m)", alias = "longitudTramoKm")]
    longitud_tramo: Value,
    #[serde(rename = "Longitud (km)", alias = "longitudCircuitoKm")]
    longitud_circuito: Value,
    #[serde(rename = "Avance", alias = "avance")]
    avance: Value,
    #[serde(rename = "VALOR_CTO", alias = "valorContrato")]
    valor: Value,
    #[serde(rename = "Long_m", alias = "longitudM")]
    longitud_m: Value,
    #[serde(rename = "PLAZO (MESES)", alias = "plazoMeses")]
    plazo_meses: Value,
    #[serde(rename = "ACTA_INICIO", alias = "actaInicio")]
    acta_inicio: Value,
    #[serde(rename = "ACTA_FIN", alias = "actaFin")]
    acta_fin: Value,
    #[serde(rename = "Dias", alias = "dias")]
    dias: Value,
    #[serde(rename = "LOTE", alias = "lote")]
    lote: Value,
    #[serde(rename = "TIPO_VIA", alias = "tipoVia")]
    tipo_via: Value,
    #[serde(rename = "ORDEN", alias = "orden")]
    orden: Value,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl From<RawRecord> for Record {
    fn from(r: RawRecord) -> Self {
        Record {
            id: loose_number(&r.id),
            subregion: loose_text(&r.subregion).or_else(|| loose_text(&r.subregion_alt)),
            municipio: loose_text(&r.municipio),
            circuito: loose_text(&r.circuito),
            contratista: loose_text(&r.contratista),
            nombre_via: loose_text(&r.nombre_via),
            codigo_via: loose_text(&r.codigo_via),
            contrato: loose_text(&r.contrato),
            longitud_tramo_km: loose_number(&r.longitud_tramo),
            longitud_circuito_km: loose_number(&r.longitud_circuito),
            avance: loose_number(&r.avance),
            valor_contrato: loose_number(&r.valor),
            longitud_m: loose_number(&r.longitud_m),
            plazo_meses: loose_number(&r.plazo_meses),
            acta_inicio: loose_text(&r.acta_inicio),
            acta_fin: loose_text(&r.acta_fin),
            dias: loose_number(&r.dias),
            lote: loose_number(&r.lote),
            tipo_via: loose_number(&r.tipo_via),
            orden: loose_number(&r.orden),
            subregion_1: loose_text(&r.subregion_alt),
            extra: r
                .extra
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, Value::String(clamp_text(&s).to_string())),
                    other => (k, other),
                })
                .collect(),
        }
    }
}

fn loose_text(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => clamp_text(s.trim()).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn loose_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parses the longest numeric prefix of `s` ("12.5 km" -> 12.5).
pub(crate) fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        let c = bytes[end];
        match c {
            b'0'..=b'9' => seen_digit = true,
            b'+' | b'-' if end == 0 || matches!(bytes[end - 1], b'e' | b'E') => {}
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => seen_exp = true,
            _ => break,
        }
        end += 1;
    }
    // Back off a dangling exponent or sign ("3e", "3e-").
    while end > 0 && s[..end].parse::<f64>().is_err() {
        end -= 1;
    }
    if !seen_digit || end == 0 {
        return None;
    }
    s[..end].parse().ok()
}
