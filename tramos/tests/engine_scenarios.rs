use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::json;
use tramos::{
    Consumer, DataStore, FilterEngine, FilterUpdate, HighlightField, MapSync, MapView, Phase,
    Propagation, Subset, SubregionChart, TagKind, ViewError,
};

fn three_tramos() -> DataStore {
    DataStore::from_json_value(json!([
        {"SUBREGION": "Oriente", "MPIO_NOMBRE": "Rionegro", "CIRCUITO": "C-1", "Avance": 0.4, "Longitud(m)": 2.0},
        {"SUBREGION": "Oriente", "MPIO_NOMBRE": "Guatapé", "CIRCUITO": "C-2", "Avance": 0.6, "Longitud(m)": 1.0},
        {"SUBREGION": "Norte", "MPIO_NOMBRE": "Yarumal", "CIRCUITO": "C-3", "Avance": 0.9, "Longitud(m)": 4.0}
    ]))
    .unwrap()
}

fn engine() -> Rc<FilterEngine> {
    Rc::new(FilterEngine::new(three_tramos()))
}

fn ok() -> Result<(), ViewError> {
    Ok(())
}

#[test]
fn scenario_a_subregion_equality() {
    let e = engine();
    e.set_filter(FilterUpdate::Subregion("Oriente".into()));
    let s = e.subset();
    assert_eq!(s.len(), 2);
    assert!(s.iter().all(|r| r.subregion.as_deref() == Some("Oriente")));
}

#[test]
fn scenario_b_min_avance() {
    let e = engine();
    e.set_filter(FilterUpdate::MinAvance(Some(50.0)));
    let avances: Vec<f64> = e.subset().iter().filter_map(|r| r.avance).collect();
    assert_eq!(avances, [0.6, 0.9]);
}

#[test]
fn scenario_c_search_is_case_insensitive() {
    let e = engine();
    e.set_filter(FilterUpdate::Search("oriente".into()));
    assert_eq!(e.subset().indices(), [0, 1]);
    e.set_filter(FilterUpdate::Search("zzz".into()));
    assert!(e.subset().is_empty());
    e.set_filter(FilterUpdate::Search("GUATAPÉ".into()));
    assert_eq!(e.subset().indices(), [1]);
}

#[test]
fn scenario_d_impossible_combination_is_empty() {
    let e = engine();
    e.set_filter(FilterUpdate::Subregion("Norte".into()));
    assert!(!e.municipio_options().contains(&"Rionegro".to_string()));
    e.set_filter(FilterUpdate::Municipio("Rionegro".into()));
    assert!(e.subset().is_empty());
}

#[test]
fn municipio_options_follow_subregion() {
    let e = engine();
    e.set_filter(FilterUpdate::Subregion("Oriente".into()));
    assert_eq!(e.municipio_options(), ["Guatapé", "Rionegro"]);
    e.set_filter(FilterUpdate::Subregion(String::new()));
    assert_eq!(e.municipio_options(), ["Guatapé", "Rionegro", "Yarumal"]);
}

#[test]
fn consumers_run_in_registration_order() {
    let e = engine();
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["cards", "charts", "table"] {
        let log = Rc::clone(&log);
        e.register(Rc::new(move |s: &Subset| {
            log.borrow_mut().push((name, s.len()));
            ok()
        }));
    }
    e.set_filter(FilterUpdate::Subregion("Norte".into()));
    assert_eq!(*log.borrow(), [("cards", 1), ("charts", 1), ("table", 1)]);
}

#[test]
fn failing_view_does_not_block_later_views() {
    let e = engine();
    let seen = Rc::new(Cell::new(0usize));
    e.register(Rc::new(|_: &Subset| -> Result<(), ViewError> {
        Err(ViewError::new("broken", "render failed"))
    }));
    let s2 = Rc::clone(&seen);
    e.register(Rc::new(move |s: &Subset| {
        s2.set(s.len());
        ok()
    }));
    assert_eq!(e.set_filter(FilterUpdate::Subregion("Oriente".into())), Propagation::Applied);
    assert_eq!(seen.get(), 2);
    assert_eq!(e.phase(), Phase::Idle);
}

#[test]
fn filter_change_from_inside_apply_is_suppressed() {
    let e = engine();
    let weak = Rc::downgrade(&e);
    let calls = Rc::new(Cell::new(0u32));
    let inner = Rc::new(RefCell::new(Vec::new()));
    {
        let calls = Rc::clone(&calls);
        let inner = Rc::clone(&inner);
        e.register(Rc::new(move |_: &Subset| {
            calls.set(calls.get() + 1);
            let engine = weak.upgrade().expect("engine alive");
            assert!(engine.is_propagating());
            inner.borrow_mut().push(engine.set_filter(FilterUpdate::Municipio("Yarumal".into())));
            inner.borrow_mut().push(engine.recompute());
            inner.borrow_mut().push(engine.clear_all());
            ok()
        }));
    }
    let before = e.generation();
    assert_eq!(e.set_filter(FilterUpdate::Subregion("Oriente".into())), Propagation::Applied);
    assert_eq!(calls.get(), 1);
    assert_eq!(e.generation(), before + 1);
    assert_eq!(*inner.borrow(), [Propagation::Suppressed; 3]);
    assert_eq!(e.state().municipio, "");
    assert_eq!(e.phase(), Phase::Idle);
}

#[test]
fn chart_click_pushes_filter_once_and_keeps_selection() {
    let e = engine();
    let chart = SubregionChart::attach(&e);
    assert_eq!(chart.handle_bar_click("Norte"), Propagation::Applied);
    assert_eq!(e.state().subregion, "Norte");
    assert_eq!(chart.selected().as_deref(), Some("Norte"));
    assert_eq!(chart.renders(), 1);
    let bars = chart.bars();
    assert_eq!(bars[0].name, "Norte");
    assert!(bars[0].selected);
    assert!(bars[1].dimmed);

    // Second click on the same bar clears it.
    chart.handle_bar_click("Norte");
    assert_eq!(e.state().subregion, "");
    assert_eq!(chart.selected(), None);
    assert_eq!(chart.renders(), 2);
}

#[test]
fn chart_click_during_propagation_is_visual_only() {
    let e = engine();
    let chart = SubregionChart::attach(&e);
    let outcome = Rc::new(Cell::new(None));
    {
        let chart = Rc::clone(&chart);
        let outcome = Rc::clone(&outcome);
        e.register(Rc::new(move |_: &Subset| {
            outcome.set(Some(chart.handle_bar_click("Oriente")));
            ok()
        }));
    }
    e.set_filter(FilterUpdate::Search("c-".into()));
    assert_eq!(outcome.get(), Some(Propagation::Suppressed));
    assert_eq!(chart.selected().as_deref(), Some("Oriente"));
    assert_eq!(e.state().subregion, "");
    assert_eq!(chart.renders(), 1);
}

#[test]
fn form_subregion_updates_chart_selection() {
    let e = engine();
    let chart = SubregionChart::attach(&e);
    e.set_filter(FilterUpdate::Subregion("Oriente".into()));
    assert_eq!(chart.selected().as_deref(), Some("Oriente"));
    assert_eq!(chart.progress().tramos, 2);
}

#[derive(Default)]
struct RecordingMap {
    resets: Cell<u32>,
    highlights: RefCell<Vec<(HighlightField, BTreeSet<String>)>>,
}

impl MapView for RecordingMap {
    fn reset_to_default_extent(&self) {
        self.resets.set(self.resets.get() + 1);
    }

    fn highlight_by_field(&self, field: HighlightField, values: &BTreeSet<String>) {
        self.highlights.borrow_mut().push((field, values.clone()));
    }
}

#[test]
fn clear_all_resets_map_once_and_notifies_others() {
    let e = engine();
    let view = Rc::new(RecordingMap::default());
    MapSync::attach(&e, Rc::clone(&view) as Rc<dyn MapView>);
    let table_seen = Rc::new(Cell::new(0usize));
    let t = Rc::clone(&table_seen);
    e.register(Rc::new(move |s: &Subset| {
        t.set(s.len());
        ok()
    }));

    e.set_filter(FilterUpdate::Municipio("Guatapé".into()));
    assert_eq!(view.resets.get(), 0);
    {
        let h = view.highlights.borrow();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].0, HighlightField::Municipio);
        assert!(h[0].1.contains("GUATAPE"));
        assert!(h[1].1.contains("C-2"));
    }

    assert_eq!(e.clear_all(), Propagation::Applied);
    assert_eq!(view.resets.get(), 1);
    assert_eq!(view.highlights.borrow().len(), 2);
    assert_eq!(table_seen.get(), 3);
    assert_eq!(e.subset().indices(), [0, 1, 2]);
}

#[test]
fn map_click_toggles_municipio() {
    let e = engine();
    let view: Rc<dyn MapView> = Rc::new(RecordingMap::default());
    let map = MapSync::attach(&e, view);
    map.click_municipio("Yarumal");
    assert_eq!(e.subset().indices(), [2]);
    map.click_municipio("Yarumal");
    assert_eq!(e.state().municipio, "");
    assert_eq!(e.subset().len(), 3);
}

#[test]
fn removing_one_tag_keeps_the_others() {
    let e = engine();
    e.set_filter(FilterUpdate::Subregion("Oriente".into()));
    e.set_filter(FilterUpdate::MaxAvance(Some(50.0)));
    assert_eq!(e.subset().indices(), [0]);
    e.clear_filter(TagKind::Avance);
    assert_eq!(e.subset().indices(), [0, 1]);
    assert_eq!(e.state().tags().len(), 1);
}

#[test]
fn reload_repoints_store_and_resets_filters() {
    let e = engine();
    e.set_filter(FilterUpdate::Subregion("Norte".into()));
    let next = DataStore::from_json_value(json!([{"SUBREGION": "Urabá", "MPIO_NOMBRE": "Turbo"}]))
        .unwrap();
    assert_eq!(e.reload(next), Propagation::Applied);
    assert_eq!(e.state().subregion, "");
    assert_eq!(e.subset().len(), 1);
    assert_eq!(e.catalog().options.subregiones, ["Urabá"]);
}

#[test]
fn unregistered_views_stop_receiving() {
    let e = engine();
    let hits = Rc::new(Cell::new(0u32));
    let h = Rc::clone(&hits);
    let id = e.register(Rc::new(move |_: &Subset| {
        h.set(h.get() + 1);
        ok()
    }) as Rc<dyn Consumer>);
    e.recompute();
    assert!(e.unregister(id));
    e.recompute();
    assert_eq!(hits.get(), 1);
    assert!(!e.unregister(id));
}
