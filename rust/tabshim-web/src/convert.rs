//! Moving values between JavaScript and Rust.
//!
//! Everything crosses as JSON text: `JSON.stringify` on the way in,
//! `JSON.parse` on the way out. Host objects are plain data, so nothing is
//! lost that the host would have kept.

use js_sys::{Array, Function, JSON, Object, Reflect};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tabshim::translate::parse_record;
use tabshim::{ShimError, TranslateError};
use tabshim_effects::HostError;
use tabshim_effects::scripting::InjectionRequest;
use wasm_bindgen::{JsCast, JsValue};

/// Encode `value` as a JavaScript value.
pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ShimError> {
    let json = serde_json::to_string(value)?;
    JSON::parse(&json).map_err(|error| ShimError::Serialization(describe(&error)))
}

/// Decode a JavaScript value. `undefined` decodes as JSON `null`.
pub fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, ShimError> {
    if value.is_undefined() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    let json = JSON::stringify(value)
        .map_err(|error| ShimError::Serialization(describe(&error)))?
        .as_string()
        .unwrap_or_else(|| "null".to_owned());
    Ok(serde_json::from_str(&json)?)
}

/// Read caller-supplied injection options for the legacy path.
///
/// A `func` given as a function value is replaced with its source text.
/// The record is then checked the same way [`parse_record`] checks it.
pub fn injection_request(options: &JsValue) -> Result<InjectionRequest, ShimError> {
    if !options.is_object() || Array::is_array(options) {
        return Err(TranslateError::MalformedRequest(format!(
            "expected an options object, found {}",
            options
                .js_typeof()
                .as_string()
                .unwrap_or_else(|| "a value".to_owned())
        ))
        .into());
    }

    let record = Object::assign(&Object::new(), options.unchecked_ref());
    let func = Reflect::get(&record, &"func".into()).unwrap_or(JsValue::UNDEFINED);
    if let Some(func) = func.dyn_ref::<Function>() {
        let source = String::from(func.to_string());
        Reflect::set(&record, &"func".into(), &source.into())
            .map_err(|error| ShimError::Serialization(describe(&error)))?;
    }

    let record: Value = from_js(&record)?;
    Ok(parse_record(record)?)
}

/// Read a storage key list: nothing, one key, or an array of keys.
pub fn storage_keys(keys: &JsValue) -> Result<Option<Vec<String>>, ShimError> {
    if keys.is_undefined() || keys.is_null() {
        return Ok(None);
    }
    if let Some(key) = keys.as_string() {
        return Ok(Some(vec![key]));
    }
    from_js(keys)
}

/// Best-effort text of a thrown JavaScript value.
pub fn describe(error: &JsValue) -> String {
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    error
        .as_string()
        .unwrap_or_else(|| format!("{error:?}"))
}

/// Classify a thrown JavaScript value as a host failure.
pub fn host_error(error: &JsValue) -> HostError {
    HostError::from_message(describe(error))
}
