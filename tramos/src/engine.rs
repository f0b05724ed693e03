use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::dataset::DataStore;
use crate::error::FilterError;
use crate::filter::{FilterField, FilterState, FilterUpdate, TagKind};
use crate::map::MapSync;
use crate::options::OptionIndex;
use crate::views::{Consumer, Subset};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Propagating,
}

/// Outcome of a state-changing call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// State updated (where applicable) and consumers notified.
    Applied,
    /// Called while a fan-out was in progress; nothing changed.
    Suppressed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConsumerId(u32);

impl ConsumerId {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn from_raw(id: u32) -> Self {
        ConsumerId(id)
    }
}

/// A dataset together with the option lists derived from it.
#[derive(Debug)]
pub struct Catalog {
    pub store: DataStore,
    pub options: OptionIndex,
}

impl Catalog {
    pub fn new(store: DataStore) -> Self {
        let options = OptionIndex::build(store.records());
        Catalog { store, options }
    }
}

// Holds the engine in Propagating for one fan-out; Idle is restored on drop.
struct PropagationGuard<'a> {
    phase: &'a Cell<Phase>,
}

impl<'a> PropagationGuard<'a> {
    fn acquire(phase: &'a Cell<Phase>) -> Option<Self> {
        if phase.get() == Phase::Propagating {
            return None;
        }
        phase.set(Phase::Propagating);
        Some(PropagationGuard { phase })
    }
}

impl Drop for PropagationGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(Phase::Idle);
    }
}

/// Owns the filter state and keeps every registered view in sync with it.
///
/// All methods take `&self`: views hold a `Weak` handle to the engine and may
/// call back into it from event handlers. Calls made while a fan-out is in
/// progress are suppressed.
pub struct FilterEngine {
    catalog: RefCell<Rc<Catalog>>,
    state: RefCell<FilterState>,
    subset: RefCell<Subset>,
    phase: Cell<Phase>,
    consumers: RefCell<Vec<(ConsumerId, Rc<dyn Consumer>)>>,
    map: RefCell<Option<(ConsumerId, Rc<MapSync>)>>,
    next_id: Cell<u32>,
    generation: Cell<u64>,
}

impl FilterEngine {
    pub fn new(store: DataStore) -> Self {
        let catalog = Catalog::new(store);
        let subset = Subset::full(catalog.store.shared());
        log::info!(
            "filters: {} tramos, {} subregiones, {} municipios",
            catalog.store.len(),
            catalog.options.subregiones.len(),
            catalog.options.municipios.len()
        );
        FilterEngine {
            catalog: RefCell::new(Rc::new(catalog)),
            state: RefCell::new(FilterState::default()),
            subset: RefCell::new(subset),
            phase: Cell::new(Phase::Idle),
            consumers: RefCell::new(Vec::new()),
            map: RefCell::new(None),
            next_id: Cell::new(1),
            generation: Cell::new(0),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_propagating(&self) -> bool {
        self.phase.get() == Phase::Propagating
    }

    /// Number of completed recomputes.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn catalog(&self) -> Rc<Catalog> {
        Rc::clone(&self.catalog.borrow())
    }

    pub fn state(&self) -> FilterState {
        self.state.borrow().clone()
    }

    pub fn subset(&self) -> Subset {
        self.subset.borrow().clone()
    }

    /// Municipios selectable under the current subregion.
    pub fn municipio_options(&self) -> Vec<String> {
        let subregion = self.state.borrow().subregion.clone();
        self.catalog.borrow().options.municipios_for(&subregion).to_vec()
    }

    pub fn circuito_options(&self) -> Vec<String> {
        let subregion = self.state.borrow().subregion.clone();
        self.catalog.borrow().options.circuitos_for(&subregion).to_vec()
    }

    pub fn result_count(&self) -> String {
        let s = self.subset.borrow();
        format!("{} de {}", s.len(), s.total())
    }

    // Registration

    fn next_id(&self) -> ConsumerId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        ConsumerId(id)
    }

    /// Adds a view; views are notified in registration order.
    pub fn register(&self, consumer: Rc<dyn Consumer>) -> ConsumerId {
        let id = self.next_id();
        log::debug!("filters: registered {} as #{}", consumer.label(), id.0);
        self.consumers.borrow_mut().push((id, consumer));
        id
    }

    /// Registers the map view. A previously attached map is detached.
    pub fn register_map(&self, map: Rc<MapSync>) -> ConsumerId {
        if let Some((old, _)) = self.map.borrow_mut().take() {
            self.consumers.borrow_mut().retain(|(id, _)| *id != old);
        }
        let id = self.register(Rc::clone(&map) as Rc<dyn Consumer>);
        *self.map.borrow_mut() = Some((id, map));
        id
    }

    pub fn unregister(&self, id: ConsumerId) -> bool {
        let mut map = self.map.borrow_mut();
        if map.as_ref().map_or(false, |(mid, _)| *mid == id) {
            *map = None;
        }
        let mut consumers = self.consumers.borrow_mut();
        let before = consumers.len();
        consumers.retain(|(cid, _)| *cid != id);
        consumers.len() != before
    }

    // State changes

    fn write(&self, update: FilterUpdate) {
        let field = update.field();
        let catalog = self.catalog();
        let mut st = self.state.borrow_mut();
        st.assign(update);
        if field == FilterField::Subregion {
            let options = &catalog.options;
            if !st.municipio.is_empty()
                && !options.municipios_for(&st.subregion).contains(&st.municipio)
            {
                log::debug!("filters: municipio '{}' cleared by subregion change", st.municipio);
                st.municipio.clear();
            }
            if !st.circuito.is_empty() && !options.circuitos_for(&st.subregion).contains(&st.circuito)
            {
                log::debug!("filters: circuito '{}' cleared by subregion change", st.circuito);
                st.circuito.clear();
            }
        }
    }

    fn suppressed(&self, what: &str) -> Propagation {
        log::warn!("filters: {} ignored during propagation", what);
        Propagation::Suppressed
    }

    /// Assigns one field and recomputes.
    pub fn set_filter(&self, update: FilterUpdate) -> Propagation {
        if self.is_propagating() {
            return self.suppressed("set_filter");
        }
        self.write(update);
        self.recompute()
    }

    /// `set_filter` for callers holding a field name and an untyped value.
    /// Unknown names and mistyped values are rejected before any mutation.
    pub fn set_filter_named(&self, field: &str, value: &Value) -> Result<Propagation, FilterError> {
        let update = FilterUpdate::from_json(field, value)?;
        Ok(self.set_filter(update))
    }

    /// Assigns one field without notifying views; a later `recompute`
    /// publishes it.
    pub fn stage(&self, update: FilterUpdate) -> Propagation {
        if self.is_propagating() {
            return self.suppressed("stage");
        }
        self.write(update);
        Propagation::Applied
    }

    /// Removes one active-filter chip and recomputes.
    pub fn clear_filter(&self, kind: TagKind) -> Propagation {
        if self.is_propagating() {
            return self.suppressed("clear_filter");
        }
        self.state.borrow_mut().clear(kind);
        self.recompute()
    }

    /// Resets every field. The map is sent straight to its default extent and
    /// skipped in the fan-out that follows.
    pub fn clear_all(&self) -> Propagation {
        let Some(_guard) = PropagationGuard::acquire(&self.phase) else {
            return self.suppressed("clear_all");
        };
        *self.state.borrow_mut() = FilterState::default();
        let map = self.map.borrow().clone();
        if let Some((_, m)) = &map {
            m.reset();
        }
        log::info!("filters: cleared");
        self.publish(map.map(|(id, _)| id));
        Propagation::Applied
    }

    /// Re-evaluates the predicate and notifies every view.
    pub fn recompute(&self) -> Propagation {
        let Some(_guard) = PropagationGuard::acquire(&self.phase) else {
            return self.suppressed("recompute");
        };
        self.publish(None);
        Propagation::Applied
    }

    /// Points the engine at a new dataset and resets the filters.
    pub fn reload(&self, store: DataStore) -> Propagation {
        if self.is_propagating() {
            return self.suppressed("reload");
        }
        let catalog = Catalog::new(store);
        log::info!("filters: reloaded {} tramos", catalog.store.len());
        *self.catalog.borrow_mut() = Rc::new(catalog);
        *self.state.borrow_mut() = FilterState::default();
        self.recompute()
    }

    fn evaluate(&self) -> Subset {
        let catalog = self.catalog();
        let state = self.state.borrow().clone();
        let indices: Vec<usize> = {
            let pred = state.predicate();
            catalog
                .store
                .records()
                .iter()
                .enumerate()
                .filter(|(_, r)| pred.matches(r))
                .map(|(i, _)| i)
                .collect()
        };
        log::debug!(
            "filters: {} of {} tramos",
            indices.len(),
            catalog.store.len()
        );
        Subset::new(catalog.store.shared(), indices, state)
    }

    // Caller holds the propagation guard.
    fn publish(&self, skip: Option<ConsumerId>) {
        let subset = self.evaluate();
        *self.subset.borrow_mut() = subset.clone();
        self.generation.set(self.generation.get() + 1);
        // Snapshot so views may register or unregister from inside `apply`.
        let consumers = self.consumers.borrow().clone();
        for (id, c) in consumers {
            if Some(id) == skip {
                continue;
            }
            if let Err(e) = c.apply(&subset) {
                log::error!("filters: view #{} failed: {}", id.0, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use crate::model::Record;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn store() -> DataStore {
        let rec = |sub: &str, mpio: &str| Record {
            subregion: Some(sub.into()),
            municipio: Some(mpio.into()),
            ..Default::default()
        };
        DataStore::new(vec![
            rec("Oriente", "Rionegro"),
            rec("Oriente", "Guatapé"),
            rec("Norte", "Yarumal"),
        ])
    }

    #[test]
    fn guard_releases_on_panic() {
        let engine = FilterEngine::new(store());
        engine.register(Rc::new(|_: &Subset| -> Result<(), ViewError> {
            panic!("render bug")
        }));
        let r = catch_unwind(AssertUnwindSafe(|| engine.recompute()));
        assert!(r.is_err());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn subregion_change_clears_foreign_municipio() {
        let engine = FilterEngine::new(store());
        engine.set_filter(FilterUpdate::Municipio("Rionegro".into()));
        engine.set_filter(FilterUpdate::Subregion("Oriente".into()));
        assert_eq!(engine.state().municipio, "Rionegro");
        engine.set_filter(FilterUpdate::Subregion("Norte".into()));
        assert_eq!(engine.state().municipio, "");
        assert_eq!(engine.municipio_options(), ["Yarumal"]);
    }

    #[test]
    fn unknown_field_leaves_state_untouched() {
        let engine = FilterEngine::new(store());
        let err = engine
            .set_filter_named("valorContrato", &Value::from("x"))
            .unwrap_err();
        assert_eq!(err.code(), "unknown_field");
        assert_eq!(engine.state(), FilterState::default());
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn stage_defers_publication() {
        let engine = FilterEngine::new(store());
        assert_eq!(engine.stage(FilterUpdate::Search("yar".into())), Propagation::Applied);
        assert_eq!(engine.subset().len(), 3);
        engine.recompute();
        assert_eq!(engine.subset().indices(), [2]);
        assert_eq!(engine.result_count(), "1 de 3");
    }
}
