//! JSON as a host: exporting erased values to `serde_json::Value` and back.

use base64::Engine;
use rebind_core::{Exception, Float, Integer, Ref, Registry, RegistryBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::HostError;

/// Register `serde_json::Value` with its scalar bridges.
///
/// Expects the builtins to be installed as well.
pub fn install(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register::<Value>()
        .load(|v: &Value| v.as_i64())
        .load(|v: &Value| v.as_f64())
        .load(|v: &Value| v.as_bool())
        .load(|v: &Value| v.as_str().map(String::from))
        .load(|i: &Integer| Some(Value::from(*i)))
        .load(|f: &Float| Number::from_f64(*f).map(Value::Number))
        .load(|b: &bool| Some(Value::Bool(*b)))
        .load(|s: &String| Some(Value::String(s.clone())))
}

/// Register `T` with JSON bridges derived from its serde impls.
///
/// `T` dumps to a `Value`; loading from a `Value` that does not
/// deserialize raises the serde error.
pub fn register_serde<T>(builder: RegistryBuilder) -> RegistryBuilder
where
    T: Serialize + DeserializeOwned + Clone + 'static,
{
    builder
        .register::<T>()
        .dump(|t: &T| serde_json::to_value(t).ok())
        .try_load(|v: &Value| {
            serde_json::from_value::<T>(v.clone())
                .map(Some)
                .map_err(Exception::new)
        })
}

/// Express `source` as JSON.
///
/// JSON values pass through and byte buffers become base64 text. Anything
/// else is converted to a `Value`, then tried as a boolean, a number and a
/// string, in that order.
pub fn export(registry: &Registry, source: Ref<'_>) -> Result<Value, HostError> {
    let index = source.index();
    if !source.has_value() || index.is_void() {
        return Ok(Value::Null);
    }
    if let Some(value) = source.get::<Value>() {
        return Ok(value.clone());
    }
    if let Some(bytes) = source.get::<Vec<u8>>() {
        // JSON doesn't have bytes
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        return Ok(Value::String(encoded));
    }
    if let Some(value) = registry.load::<Value>(source.reborrow())? {
        return Ok(value);
    }
    if let Some(b) = registry.load::<bool>(source.reborrow())? {
        return Ok(Value::Bool(b));
    }
    let floating = index.equals::<f32>() || index.equals::<f64>();
    let number = if floating {
        match export_float(registry, &source)? {
            Some(value) => Some(value),
            None => export_integer(registry, &source)?,
        }
    } else {
        match export_integer(registry, &source)? {
            Some(value) => Some(value),
            None => export_float(registry, &source)?,
        }
    };
    if let Some(value) = number {
        return Ok(value);
    }
    if let Some(s) = registry.load::<String>(source.reborrow())? {
        return Ok(Value::String(s));
    }
    tracing::debug!(%index, "no JSON form");
    Err(HostError::Type(format!("cannot export {}", index)))
}

fn export_integer(registry: &Registry, source: &Ref<'_>) -> Result<Option<Value>, HostError> {
    Ok(registry
        .load::<Integer>(source.reborrow())?
        .map(Value::from))
}

fn export_float(registry: &Registry, source: &Ref<'_>) -> Result<Option<Value>, HostError> {
    Ok(registry.load::<Float>(source.reborrow())?.map(|f| {
        Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }))
}

/// Bring a JSON value across as an owned ref.
///
/// Scalars become `bool`, `i64`, `u64`, `f64` or `String`; arrays and
/// objects stay `Value`. `null` is the empty ref.
pub fn import(value: Value) -> Ref<'static> {
    match value {
        Value::Null => Ref::empty(),
        Value::Bool(b) => Ref::owned(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ref::owned(i)
            } else if let Some(u) = n.as_u64() {
                Ref::owned(u)
            } else {
                Ref::owned(n.as_f64().unwrap_or(Float::NAN))
            }
        }
        Value::String(s) => Ref::owned(s),
        value @ (Value::Array(_) | Value::Object(_)) => Ref::owned(value),
    }
}
