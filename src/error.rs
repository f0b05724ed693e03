use js_sys::Object;
use tramos::{ConfigError, DatasetError, ExportError, FilterError};
use wasm_bindgen::prelude::*;

use crate::interop::{new_obj, set_kv};

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data {
        set_kv(&e, "data", &d);
    }
    set_kv(&root, "error", &e.into());
    root.into()
}

fn data(k: &str, v: &str) -> Object {
    let d = new_obj();
    set_kv(&d, k, &JsValue::from_str(v));
    d
}

pub fn filter(e: &FilterError) -> JsValue {
    let d = match e {
        FilterError::UnknownField { name } => data("field", name),
        FilterError::InvalidValue { field, expected } => {
            let d = data("field", field);
            set_kv(&d, "expected", &JsValue::from_str(expected));
            d
        }
        FilterError::NonFinite { field } => data("field", field),
        FilterError::UnknownTag { name } => data("kind", name),
    };
    err(e.code(), e.to_string(), Some(d.into()))
}

pub fn dataset(e: &DatasetError) -> JsValue {
    let d = match e {
        DatasetError::TooManyRecords { count, max } => {
            let d = new_obj();
            set_kv(&d, "count", &JsValue::from_f64(*count as f64));
            set_kv(&d, "max", &JsValue::from_f64(*max as f64));
            Some(d.into())
        }
        _ => None,
    };
    err("invalid_dataset", e.to_string(), d)
}

pub fn config(e: &ConfigError) -> JsValue {
    err("invalid_config", e.to_string(), None)
}

pub fn export(e: &ExportError) -> JsValue {
    err("export_failed", e.to_string(), None)
}

#[inline]
pub fn non_finite(field: &str) -> JsValue {
    err(
        "non_finite",
        format!("'{}' must be finite", field),
        Some(data("field", field).into()),
    )
}

#[inline]
pub fn invalid_value(field: &str, expected: &str) -> JsValue {
    let d = data("field", field);
    set_kv(&d, "expected", &JsValue::from_str(expected));
    err(
        "invalid_value",
        format!("'{}' expects {}", field, expected),
        Some(d.into()),
    )
}
