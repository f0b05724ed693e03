use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::ViewError;
use crate::views::{Consumer, Subset};

/// Headline numbers shown on the summary cards.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStats {
    pub total_tramos: usize,
    pub longitud_total_km: f64,
    pub total_municipios: usize,
    pub circuitos: usize,
    pub valor_total: f64,
    pub avance_promedio: f64,
}

impl CardStats {
    /// `nominal_municipios` replaces the municipio count while the subset
    /// holds every record (the contract covers municipios without tramos).
    pub fn compute(subset: &Subset, nominal_municipios: Option<usize>) -> Self {
        let mut km = 0.0;
        let mut avance = 0.0;
        let mut municipios = HashSet::new();
        let mut circuitos = HashSet::new();
        // One value per contract number; rows without a number share a slot.
        // A zero or missing value yields to the next non-zero one.
        let mut contratos: HashMap<Option<&str>, f64> = HashMap::new();
        for r in subset.iter() {
            km += r.longitud_km();
            avance += r.avance_pct();
            if let Some(m) = r.municipio.as_deref() {
                municipios.insert(m);
            }
            if let Some(c) = r.circuito.as_deref() {
                circuitos.insert(c);
            }
            let slot = contratos.entry(r.contrato.as_deref()).or_insert(0.0);
            if *slot == 0.0 {
                *slot = r.valor_contrato.unwrap_or(0.0);
            }
        }
        let n = subset.len();
        let total_municipios = match nominal_municipios {
            Some(nominal) if n == subset.total() => nominal,
            _ => municipios.len(),
        };
        CardStats {
            total_tramos: n,
            longitud_total_km: (km * 100.0).round() / 100.0,
            total_municipios,
            circuitos: circuitos.len(),
            valor_total: contratos.values().sum(),
            avance_promedio: if n == 0 {
                0.0
            } else {
                (avance / n as f64 * 10.0).round() / 10.0
            },
        }
    }
}

/// Keeps the card values current.
pub struct CardsPanel {
    nominal_municipios: Option<usize>,
    stats: RefCell<CardStats>,
}

impl CardsPanel {
    pub fn new(initial: &Subset, nominal_municipios: Option<usize>) -> Self {
        CardsPanel {
            nominal_municipios,
            stats: RefCell::new(CardStats::compute(initial, nominal_municipios)),
        }
    }

    pub fn stats(&self) -> CardStats {
        self.stats.borrow().clone()
    }
}

impl Consumer for CardsPanel {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        *self.stats.borrow_mut() = CardStats::compute(subset, self.nominal_municipios);
        Ok(())
    }

    fn label(&self) -> &str {
        "cards"
    }
}
