use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FilterError;
use crate::limits::MAX_SEARCH_LEN;
use crate::model::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Search,
    Subregion,
    Municipio,
    Circuito,
    Contratista,
    MinAvance,
    MaxAvance,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        FilterField::Search,
        FilterField::Subregion,
        FilterField::Municipio,
        FilterField::Circuito,
        FilterField::Contratista,
        FilterField::MinAvance,
        FilterField::MaxAvance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Search => "search",
            FilterField::Subregion => "subregion",
            FilterField::Municipio => "municipio",
            FilterField::Circuito => "circuito",
            FilterField::Contratista => "contratista",
            FilterField::MinAvance => "minAvance",
            FilterField::MaxAvance => "maxAvance",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterField {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| FilterError::UnknownField { name: s.to_string() })
    }
}

/// One field assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterUpdate {
    Search(String),
    Subregion(String),
    Municipio(String),
    Circuito(String),
    Contratista(String),
    MinAvance(Option<f64>),
    MaxAvance(Option<f64>),
}

impl FilterUpdate {
    pub fn field(&self) -> FilterField {
        match self {
            FilterUpdate::Search(_) => FilterField::Search,
            FilterUpdate::Subregion(_) => FilterField::Subregion,
            FilterUpdate::Municipio(_) => FilterField::Municipio,
            FilterUpdate::Circuito(_) => FilterField::Circuito,
            FilterUpdate::Contratista(_) => FilterField::Contratista,
            FilterUpdate::MinAvance(_) => FilterField::MinAvance,
            FilterUpdate::MaxAvance(_) => FilterField::MaxAvance,
        }
    }

    /// Builds an update from a field name and a loosely-typed value, the way
    /// form controls deliver them: text fields take strings (null clears),
    /// bounds take numbers, numeric strings, `""` or null.
    pub fn from_json(field: &str, value: &Value) -> Result<Self, FilterError> {
        let field: FilterField = field.parse()?;
        let text = |v: &Value| -> Result<String, FilterError> {
            match v {
                Value::String(s) => Ok(s.clone()),
                Value::Null => Ok(String::new()),
                _ => Err(FilterError::InvalidValue {
                    field: field.name(),
                    expected: "a string",
                }),
            }
        };
        let bound = |v: &Value| -> Result<Option<f64>, FilterError> {
            let n = match v {
                Value::Null => return Ok(None),
                Value::String(s) if s.trim().is_empty() => return Ok(None),
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| FilterError::InvalidValue {
                    field: field.name(),
                    expected: "a number",
                })?,
                Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                _ => {
                    return Err(FilterError::InvalidValue {
                        field: field.name(),
                        expected: "a number",
                    })
                }
            };
            if !n.is_finite() {
                return Err(FilterError::NonFinite { field: field.name() });
            }
            Ok(Some(n))
        };
        Ok(match field {
            FilterField::Search => FilterUpdate::Search(text(value)?),
            FilterField::Subregion => FilterUpdate::Subregion(text(value)?),
            FilterField::Municipio => FilterUpdate::Municipio(text(value)?),
            FilterField::Circuito => FilterUpdate::Circuito(text(value)?),
            FilterField::Contratista => FilterUpdate::Contratista(text(value)?),
            FilterField::MinAvance => FilterUpdate::MinAvance(bound(value)?),
            FilterField::MaxAvance => FilterUpdate::MaxAvance(bound(value)?),
        })
    }
}

/// Kinds of active-filter chips. Avance covers both bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagKind {
    Search,
    Subregion,
    Municipio,
    Circuito,
    Contratista,
    Avance,
}

impl FromStr for TagKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "search" => TagKind::Search,
            "subregion" => TagKind::Subregion,
            "municipio" => TagKind::Municipio,
            "circuito" => TagKind::Circuito,
            "contratista" => TagKind::Contratista,
            "avance" => TagKind::Avance,
            _ => return Err(FilterError::UnknownTag { name: s.to_string() }),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterTag {
    pub kind: TagKind,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub search: String,
    pub subregion: String,
    pub municipio: String,
    pub circuito: String,
    pub contratista: String,
    pub min_avance: Option<f64>,
    pub max_avance: Option<f64>,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || !self.subregion.is_empty()
            || !self.municipio.is_empty()
            || !self.circuito.is_empty()
            || !self.contratista.is_empty()
            || self.min_avance.is_some()
            || self.max_avance.is_some()
    }

    pub(crate) fn assign(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Search(s) => {
                let mut s = s;
                if s.len() > MAX_SEARCH_LEN {
                    let mut end = MAX_SEARCH_LEN;
                    while !s.is_char_boundary(end) {
                        end -= 1;
                    }
                    s.truncate(end);
                }
                self.search = s;
            }
            FilterUpdate::Subregion(s) => self.subregion = s,
            FilterUpdate::Municipio(s) => self.municipio = s,
            FilterUpdate::Circuito(s) => self.circuito = s,
            FilterUpdate::Contratista(s) => self.contratista = s,
            FilterUpdate::MinAvance(b) => self.min_avance = b,
            FilterUpdate::MaxAvance(b) => self.max_avance = b,
        }
    }

    pub(crate) fn clear(&mut self, kind: TagKind) {
        match kind {
            TagKind::Search => self.search.clear(),
            TagKind::Subregion => self.subregion.clear(),
            TagKind::Municipio => self.municipio.clear(),
            TagKind::Circuito => self.circuito.clear(),
            TagKind::Contratista => self.contratista.clear(),
            TagKind::Avance => {
                self.min_avance = None;
                self.max_avance = None;
            }
        }
    }

    /// Chips describing the active constraints, in form order.
    pub fn tags(&self) -> Vec<FilterTag> {
        let mut tags = Vec::new();
        let mut push = |kind, label: String| tags.push(FilterTag { kind, label });
        if !self.search.is_empty() {
            push(TagKind::Search, format!("\"{}\"", self.search));
        }
        if !self.subregion.is_empty() {
            push(TagKind::Subregion, self.subregion.clone());
        }
        if !self.municipio.is_empty() {
            push(TagKind::Municipio, self.municipio.clone());
        }
        if !self.circuito.is_empty() {
            push(TagKind::Circuito, self.circuito.clone());
        }
        if !self.contratista.is_empty() {
            push(TagKind::Contratista, self.contratista.clone());
        }
        match (self.min_avance, self.max_avance) {
            (Some(lo), Some(hi)) => push(TagKind::Avance, format!("{}%-{}%", lo, hi)),
            (Some(lo), None) => push(TagKind::Avance, format!("≥{}%", lo)),
            (None, Some(hi)) => push(TagKind::Avance, format!("≤{}%", hi)),
            (None, None) => {}
        }
        tags
    }

    pub fn predicate(&self) -> Predicate<'_> {
        Predicate {
            state: self,
            needle: self.search.to_lowercase(),
        }
    }
}

/// A filter state prepared for evaluation over many records.
pub struct Predicate<'a> {
    state: &'a FilterState,
    needle: String,
}

fn eq_constraint(want: &str, have: &Option<String>) -> bool {
    want.is_empty() || have.as_deref() == Some(want)
}

impl Predicate<'_> {
    pub fn matches(&self, r: &Record) -> bool {
        let s = self.state;
        if !self.needle.is_empty() && !r.search_text().contains(&self.needle) {
            return false;
        }
        if !eq_constraint(&s.subregion, &r.subregion)
            || !eq_constraint(&s.municipio, &r.municipio)
            || !eq_constraint(&s.circuito, &r.circuito)
            || !eq_constraint(&s.contratista, &r.contratista)
        {
            return false;
        }
        let pct = r.avance_pct();
        if let Some(lo) = s.min_avance {
            if pct < lo {
                return false;
            }
        }
        if let Some(hi) = s.max_avance {
            if pct > hi {
                return false;
            }
        }
        true
    }
}
