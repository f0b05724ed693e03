use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use crate::collate::normalize_key;
use crate::engine::{FilterEngine, Propagation};
use crate::error::ViewError;
use crate::filter::{FilterUpdate, TagKind};
use crate::views::{Consumer, HighlightField, MapView, Subset};

/// Keys of the map features that should stay highlighted for a subset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapHighlight {
    pub municipios: BTreeSet<String>,
    pub circuitos: BTreeSet<String>,
}

impl MapHighlight {
    pub fn from_subset(subset: &Subset) -> Self {
        let mut h = MapHighlight::default();
        for r in subset.iter() {
            if let Some(m) = r.municipio.as_deref() {
                h.municipios.insert(normalize_key(m));
            }
            // Line features are named after the circuit, or the road when it has none.
            if let Some(c) = r.circuito.as_deref().or(r.nombre_via.as_deref()) {
                let key = c.trim().to_uppercase();
                if !key.is_empty() {
                    h.circuitos.insert(key);
                }
            }
        }
        h
    }
}

/// Adapts a [`MapView`] to the engine: resets it for an unfiltered subset,
/// highlights matching municipios and circuits otherwise, and turns polygon
/// clicks into municipio filters.
pub struct MapSync {
    engine: Weak<FilterEngine>,
    view: Rc<dyn MapView>,
}

impl MapSync {
    pub fn new(engine: &Rc<FilterEngine>, view: Rc<dyn MapView>) -> Rc<Self> {
        Rc::new(MapSync {
            engine: Rc::downgrade(engine),
            view,
        })
    }

    /// Creates the adapter and registers it as the engine's map.
    pub fn attach(engine: &Rc<FilterEngine>, view: Rc<dyn MapView>) -> Rc<Self> {
        let sync = MapSync::new(engine, view);
        engine.register_map(Rc::clone(&sync));
        sync
    }

    pub(crate) fn reset(&self) {
        self.view.reset_to_default_extent();
    }

    /// Clicking the selected municipio clears it; any other selects it.
    /// Ignored while the engine is propagating.
    pub fn click_municipio(&self, name: &str) -> Propagation {
        let Some(engine) = self.engine.upgrade() else {
            return Propagation::Suppressed;
        };
        if engine.is_propagating() {
            return Propagation::Suppressed;
        }
        if engine.state().municipio == name {
            engine.clear_filter(TagKind::Municipio)
        } else {
            engine.set_filter(FilterUpdate::Municipio(name.to_string()))
        }
    }
}

impl Consumer for MapSync {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        if !subset.is_filtered() {
            self.view.reset_to_default_extent();
            return Ok(());
        }
        let h = MapHighlight::from_subset(subset);
        self.view
            .highlight_by_field(HighlightField::Municipio, &h.municipios);
        self.view
            .highlight_by_field(HighlightField::Circuito, &h.circuitos);
        Ok(())
    }

    fn label(&self) -> &str {
        "map"
    }
}
