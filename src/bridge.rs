use std::collections::BTreeSet;

use js_sys::Function;
use tramos::{Consumer, HighlightField, MapView, Subset, ViewError};
use wasm_bindgen::JsValue;

use crate::interop::{arr_u32, new_obj, set_kv, str_array, to_js};

fn describe(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Update payload handed to JS listeners.
fn update_payload(subset: &Subset) -> Result<JsValue, JsValue> {
    let indices: Vec<u32> = subset.indices().iter().map(|&i| i as u32).collect();
    let o = new_obj();
    set_kv(&o, "indices", &arr_u32(&indices).into());
    set_kv(&o, "count", &JsValue::from_f64(subset.len() as f64));
    set_kv(&o, "total", &JsValue::from_f64(subset.total() as f64));
    set_kv(&o, "filtered", &JsValue::from_bool(subset.is_filtered()));
    set_kv(&o, "state", &to_js(subset.state())?);
    Ok(o.into())
}

/// A page listener registered through `Dashboard::on_update`.
pub struct JsConsumer {
    callback: Function,
    label: String,
}

impl JsConsumer {
    pub fn new(callback: Function) -> Self {
        let name = callback.name().as_string().unwrap_or_default();
        let label = if name.is_empty() {
            "js".to_string()
        } else {
            format!("js:{}", name)
        };
        JsConsumer { callback, label }
    }
}

impl Consumer for JsConsumer {
    fn apply(&self, subset: &Subset) -> Result<(), ViewError> {
        let payload = update_payload(subset).map_err(|e| ViewError::new(&self.label, describe(&e)))?;
        self.callback
            .call1(&JsValue::NULL, &payload)
            .map(|_| ())
            .map_err(|e| ViewError::new(&self.label, describe(&e)))
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Map layer driven through two page callbacks: `reset()` and
/// `highlight(field, values)`.
pub struct JsMapView {
    reset: Function,
    highlight: Function,
}

impl JsMapView {
    pub fn new(reset: Function, highlight: Function) -> Self {
        JsMapView { reset, highlight }
    }
}

impl MapView for JsMapView {
    fn reset_to_default_extent(&self) {
        if let Err(e) = self.reset.call0(&JsValue::NULL) {
            log::error!("map: reset failed: {}", describe(&e));
        }
    }

    fn highlight_by_field(&self, field: HighlightField, values: &BTreeSet<String>) {
        let field = match field {
            HighlightField::Municipio => "municipio",
            HighlightField::Circuito => "circuito",
        };
        let values = str_array(values);
        if let Err(e) = self
            .highlight
            .call2(&JsValue::NULL, &JsValue::from_str(field), &values)
        {
            log::error!("map: highlight {} failed: {}", field, describe(&e));
        }
    }
}
