use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Map extent as south/west/north/east degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            south: 4.8,
            west: -77.2,
            north: 8.8,
            east: -73.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    pub search_debounce_ms: u32,
    /// Municipios covered by the contract, shown while nothing is filtered.
    pub nominal_municipios: Option<usize>,
    pub default_extent: Extent,
    pub locale: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 300,
            nominal_municipios: Some(46),
            default_extent: Extent::default(),
            locale: "es-CO".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// `null` yields the defaults.
    pub fn from_json_value(v: Value) -> Result<Self, ConfigError> {
        if v.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(v)?)
    }
}
