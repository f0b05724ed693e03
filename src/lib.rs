use std::cell::RefCell;
use std::rc::Rc;

use tramos::{CardsPanel, DashboardConfig, FilterEngine, MapSync, SubregionChart, TableModel};
use wasm_bindgen::prelude::*;

mod api;
mod bridge;
mod debounce;
mod error;
mod interop;

/// The tramos dashboard: one filter engine and the views wired to it.
#[wasm_bindgen]
pub struct Dashboard {
    pub(crate) engine: Rc<FilterEngine>,
    pub(crate) config: DashboardConfig,
    pub(crate) chart: Rc<SubregionChart>,
    pub(crate) cards: Rc<CardsPanel>,
    pub(crate) table: Rc<TableModel>,
    pub(crate) map: RefCell<Option<Rc<MapSync>>>,
    pub(crate) search: debounce::SearchDebounce,
}

impl Dashboard {
    /// Wires the built-in views in the order the page renders them.
    pub fn rs_new(store: tramos::DataStore, config: DashboardConfig) -> Dashboard {
        let engine = Rc::new(FilterEngine::new(store));
        let initial = engine.subset();
        let cards = Rc::new(CardsPanel::new(&initial, config.nominal_municipios));
        engine.register(Rc::clone(&cards) as Rc<dyn tramos::Consumer>);
        let chart = SubregionChart::attach(&engine);
        let table = Rc::new(TableModel::new(initial));
        engine.register(Rc::clone(&table) as Rc<dyn tramos::Consumer>);
        let search = debounce::SearchDebounce::new(config.search_debounce_ms);
        Dashboard {
            engine,
            config,
            chart,
            cards,
            table,
            map: RefCell::new(None),
            search,
        }
    }
}
