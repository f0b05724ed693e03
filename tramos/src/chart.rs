use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::collate;
use crate::engine::{FilterEngine, Propagation};
use crate::error::ViewError;
use crate::filter::FilterUpdate;
use crate::model::Record;
use crate::views::{Consumer, Subset};

pub const SIN_SUBREGION: &str = "Sin subregión";

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub name: String,
    pub total_km: f64,
    pub selected: bool,
    pub dimmed: bool,
}

/// Length per subregion over `records`, largest first.
pub fn subregion_totals(records: &[Record]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for r in records {
        let key = r.subregion.as_deref().unwrap_or(SIN_SUBREGION);
        *totals.entry(key).or_insert(0.0) += r.longitud_km();
    }
    let mut out: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(k, v)| (k.to_string(), round_to(v, 2)))
        .collect();
    out.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| collate::compare(&a.0, &b.0))
    });
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressBand {
    #[default]
    Inicio,
    EnCurso,
    Avanzado,
}

impl ProgressBand {
    pub fn for_pct(pct: f64) -> Self {
        if pct < 5.0 {
            ProgressBand::Inicio
        } else if pct < 15.0 {
            ProgressBand::EnCurso
        } else {
            ProgressBand::Avanzado
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgressBand::Inicio => "Inicio",
            ProgressBand::EnCurso => "En curso",
            ProgressBand::Avanzado => "Avanzado",
        }
    }
}

/// Physical progress of a set of tramos, weighted by length.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub tramos: usize,
    pub total_km: f64,
    pub avance_pct: f64,
    pub band: ProgressBand,
}

impl ProgressSummary {
    pub fn from_records<'a>(records: impl Iterator<Item = &'a Record>) -> Self {
        let (mut n, mut km, mut weighted) = (0usize, 0.0f64, 0.0f64);
        for r in records {
            n += 1;
            km += r.longitud_km();
            weighted += r.avance.unwrap_or(0.0) * r.longitud_km();
        }
        let avance = if km > 0.0 { weighted / km } else { 0.0 };
        let pct = (avance * 100.0).min(100.0);
        ProgressSummary {
            tramos: n,
            total_km: round_to(km, 1),
            avance_pct: round_to(pct, 1),
            band: ProgressBand::for_pct(pct),
        }
    }
}

/// Bar chart of length per subregion. Clicking a bar filters by that
/// subregion; the bar set always covers the whole dataset.
pub struct SubregionChart {
    engine: Weak<FilterEngine>,
    selected: RefCell<Option<String>>,
    progress: RefCell<ProgressSummary>,
    renders: Cell<u64>,
}

impl SubregionChart {
    pub fn new(engine: &Rc<FilterEngine>) -> Rc<Self> {
        let subset = engine.subset();
        Rc::new(SubregionChart {
            engine: Rc::downgrade(engine),
            selected: RefCell::new(None),
            progress: RefCell::new(ProgressSummary::from_records(subset.iter())),
            renders: Cell::new(0),
        })
    }

    /// Creates the chart and registers it with the engine.
    pub fn attach(engine: &Rc<FilterEngine>) -> Rc<Self> {
        let chart = SubregionChart::new(engine);
        engine.register(Rc::clone(&chart) as Rc<dyn Consumer>);
        chart
    }

    pub fn selected(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    pub fn progress(&self) -> ProgressSummary {
        self.progress.borrow().clone()
    }

    /// Times the chart re-rendered from a subset.
    pub fn renders(&self) -> u64 {
        self.renders.get()
    }

    pub fn bars(&self) -> Vec<Bar> {
        let Some(engine) = self.engine.upgrade() else {
            return Vec::new();
        };
        let catalog = engine.catalog();
        let selected = self.selected.borrow();
        subregion_totals(catalog.store.records())
            .into_iter()
            .map(|(name, total_km)| {
                let is_selected = selected.as_deref() == Some(name.as_str());
                Bar {
                    dimmed: selected.is_some() && !is_selected,
                    selected: is_selected,
                    name,
                    total_km,
                }
            })
            .collect()
    }

    /// Visual selection only; never touches the filters.
    pub fn set_selected_subregion(&self, name: Option<&str>) {
        *self.selected.borrow_mut() = name.filter(|s| !s.is_empty()).map(String::from);
    }

    pub fn handle_bar_click(&self, name: &str) -> Propagation {
        if self.selected.borrow().as_deref() == Some(name) {
            return self.clear_selection();
        }
        self.set_selected_subregion(Some(name));
        self.push(name)
    }

    pub fn clear_selection(&self) -> Propagation {
        self.set_selected_subregion(None);
        self.push("")
    }

    fn push(&self, value: &str) -> Propagation {
        let Some(engine) = self.engine.upgrade() else {
            return Propagation::Suppressed;
        };
        // Mid fan-out the highlight above is all that changes.
        if engine.is_propagating() {
            return Propagation::Suppressed;
        }
        engine.set_filter(FilterUpdate::Subregion(value.to_string()))
    }
}

impl Consumer for SubregionChart {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        self.set_selected_subregion(Some(subset.state().subregion.as_str()));
        *self.progress.borrow_mut() = ProgressSummary::from_records(subset.iter());
        self.renders.set(self.renders.get() + 1);
        Ok(())
    }

    fn label(&self) -> &str {
        "subregion-chart"
    }
}
