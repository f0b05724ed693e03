use std::rc::Rc;
use std::sync::Once;

use js_sys::{Function, Uint32Array};
use serde::Serialize;
use tramos::export;
use tramos::table::ColumnKey;
use tramos::{
    Consumer, ConsumerId, DashboardConfig, DataStore, FilterField, FilterUpdate, MapSync,
    MapView, Propagation, TagKind,
};
use wasm_bindgen::prelude::*;

use crate::bridge::{JsConsumer, JsMapView};
use crate::interop::{arr_u32, from_js, to_js};
use crate::{error, Dashboard};

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

static LOGGER: Once = Once::new();

/// Routes `log` records to the browser console. `level` is one of
/// error/warn/info/debug/trace (default info).
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) {
    let level = match level.as_deref().map(str::parse::<log::Level>) {
        Some(Ok(l)) => l,
        Some(Err(_)) => {
            // No logger yet; report straight to the console.
            web_sys::console::warn_1(&JsValue::from_str("init_logging: unknown level, using info"));
            log::Level::Info
        }
        None => log::Level::Info,
    };
    LOGGER.call_once(|| wasm_logger::init(wasm_logger::Config::new(level)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionLists<'a> {
    subregiones: &'a [String],
    municipios: Vec<String>,
    circuitos: Vec<String>,
    contratistas: &'a [String],
}

fn applied(p: Propagation) -> bool {
    p == Propagation::Applied
}

impl Dashboard {
    /// An applied recompute already read the staged search text, so a
    /// pending debounce would only repeat it.
    fn settle(&self, p: Propagation) -> bool {
        if applied(p) {
            self.search.cancel();
        }
        applied(p)
    }
}

fn load_store(records: JsValue) -> Result<DataStore, JsValue> {
    let v = from_js(records).map_err(|e| error::err("invalid_dataset", e.to_string(), None))?;
    DataStore::from_json_value(v).map_err(|e| error::dataset(&e))
}

fn load_config(config: JsValue) -> Result<DashboardConfig, JsValue> {
    let v = from_js(config).map_err(|e| error::err("invalid_config", e.to_string(), None))?;
    DashboardConfig::from_json_value(v).map_err(|e| error::config(&e))
}

#[wasm_bindgen]
impl Dashboard {
    /// `records`: array of tramo objects. `config`: optional settings object.
    /// Throws an error envelope when either is malformed.
    #[wasm_bindgen(constructor)]
    pub fn new(records: JsValue, config: JsValue) -> Result<Dashboard, JsValue> {
        let config = load_config(config)?;
        let store = load_store(records)?;
        Ok(Dashboard::rs_new(store, config))
    }

    // Filters

    /// Envelope: `{ok:true, value:applied}` or a typed error; a rejected
    /// update leaves the state untouched.
    pub fn set_filter(&self, field: &str, value: JsValue) -> JsValue {
        if let Err(e) = field.parse::<FilterField>() {
            return error::filter(&e);
        }
        // NaN and infinities would otherwise arrive as JSON null.
        if value.as_f64().map_or(false, |n| !n.is_finite()) {
            return error::non_finite(field);
        }
        let value = match from_js(value) {
            Ok(v) => v,
            Err(_) => return error::invalid_value(field, "a string or number"),
        };
        match self.engine.set_filter_named(field, &value) {
            Ok(p) => error::ok(JsValue::from_bool(self.settle(p))),
            Err(e) => error::filter(&e),
        }
    }

    /// Stages the search text and recomputes once typing pauses.
    pub fn set_search(&self, text: &str) -> bool {
        if !applied(self.engine.stage(FilterUpdate::Search(text.to_string()))) {
            return false;
        }
        self.search.schedule(&self.engine);
        true
    }

    pub fn flush_search(&self) {
        self.search.flush(&self.engine);
    }

    pub fn search_debounce_ms(&self) -> u32 {
        self.search.delay_ms()
    }

    pub fn clear_all(&self) -> bool {
        self.settle(self.engine.clear_all())
    }

    /// Removes one active-filter chip by kind (`search`, `subregion`,
    /// `municipio`, `circuito`, `contratista`, `avance`).
    pub fn remove_filter(&self, kind: &str) -> JsValue {
        match kind.parse::<TagKind>() {
            Ok(k) => error::ok(JsValue::from_bool(self.settle(self.engine.clear_filter(k)))),
            Err(e) => error::filter(&e),
        }
    }

    pub fn recompute(&self) -> bool {
        self.settle(self.engine.recompute())
    }

    /// Swaps in a new dataset; filters are reset.
    pub fn reload(&self, records: JsValue) -> JsValue {
        match load_store(records) {
            Ok(store) => error::ok(JsValue::from_bool(self.settle(self.engine.reload(store)))),
            Err(e) => e,
        }
    }

    // Views

    /// `callback({indices, count, total, filtered, state})` after every
    /// recompute. Returns an id for `unregister`.
    pub fn on_update(&self, callback: Function) -> u32 {
        let consumer: Rc<dyn Consumer> = Rc::new(JsConsumer::new(callback));
        self.engine.register(consumer).get()
    }

    pub fn unregister(&self, id: u32) -> bool {
        self.engine.unregister(ConsumerId::from_raw(id))
    }

    /// Attaches the map layer, replacing any previous one.
    pub fn attach_map(&self, reset: Function, highlight: Function) {
        let view: Rc<dyn MapView> = Rc::new(JsMapView::new(reset, highlight));
        let sync = MapSync::attach(&self.engine, view);
        *self.map.borrow_mut() = Some(sync);
    }

    pub fn click_subregion_bar(&self, name: &str) -> bool {
        self.settle(self.chart.handle_bar_click(name))
    }

    pub fn clear_chart_selection(&self) -> bool {
        self.settle(self.chart.clear_selection())
    }

    /// Polygon click on the map. No-op until a map is attached.
    pub fn click_municipio(&self, name: &str) -> bool {
        let map = self.map.borrow().clone();
        match map {
            Some(m) => self.settle(m.click_municipio(name)),
            None => false,
        }
    }

    pub fn set_column_active(&self, key: &str, active: bool) -> JsValue {
        match key.parse::<ColumnKey>() {
            Ok(k) => error::ok(JsValue::from_bool(self.table.set_active(k, active))),
            Err(()) => error::invalid_value("column", "a known column key"),
        }
    }

    // Getters

    pub fn is_propagating(&self) -> bool {
        self.engine.is_propagating()
    }

    pub fn generation(&self) -> u64 {
        self.engine.generation()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.state())
    }

    pub fn tags(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.state().tags())
    }

    pub fn options(&self) -> Result<JsValue, JsValue> {
        let catalog = self.engine.catalog();
        to_js(&OptionLists {
            subregiones: &catalog.options.subregiones,
            municipios: self.engine.municipio_options(),
            circuitos: self.engine.circuito_options(),
            contratistas: &catalog.options.contratistas,
        })
    }

    pub fn municipio_options(&self) -> Result<JsValue, JsValue> {
        to_js(&self.engine.municipio_options())
    }

    pub fn subset_indices(&self) -> Uint32Array {
        let indices: Vec<u32> = self
            .engine
            .subset()
            .indices()
            .iter()
            .map(|&i| i as u32)
            .collect();
        arr_u32(&indices)
    }

    pub fn record(&self, index: u32) -> Result<JsValue, JsValue> {
        let catalog = self.engine.catalog();
        match catalog.store.get(index as usize) {
            Some(r) => to_js(r),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn cards(&self) -> Result<JsValue, JsValue> {
        to_js(&self.cards.stats())
    }

    pub fn bars(&self) -> Result<JsValue, JsValue> {
        to_js(&self.chart.bars())
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_js(&self.chart.progress())
    }

    pub fn table_columns(&self) -> Result<JsValue, JsValue> {
        to_js(&self.table.columns())
    }

    pub fn table_rows(&self) -> Result<JsValue, JsValue> {
        to_js(&self.table.rows())
    }

    /// Placeholder text while the table has no rows.
    pub fn table_empty_message(&self) -> Option<String> {
        self.table.empty_message().map(str::to_string)
    }

    /// "N de M".
    pub fn result_count(&self) -> String {
        self.engine.result_count()
    }

    /// BOM-prefixed CSV of the current subset, every source column included.
    pub fn export_csv(&self) -> Result<String, JsValue> {
        export::to_csv(&self.engine.subset()).map_err(|e| error::export(&e))
    }

    pub fn export_file_name(&self, date_iso: &str) -> String {
        export::file_name(date_iso)
    }

    pub fn config(&self) -> Result<JsValue, JsValue> {
        to_js(&self.config)
    }
}
