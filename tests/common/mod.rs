//! Shared test helpers for integration tests

use quicksilver_objects::{Exported, Object, Runtime, RuntimeConfig, Value};

/// A runtime with the array fast paths switched on or off
#[allow(dead_code)]
pub fn runtime_with_fast_paths(enabled: bool) -> Runtime {
    Runtime::with_config(RuntimeConfig::new().with_fast_paths(enabled))
}

/// Build an array from a JSON literal
#[allow(dead_code)]
pub fn json_array(runtime: &Runtime, json: &str) -> Object {
    let value = runtime
        .import_json(&serde_json::from_str(json).expect("valid JSON"))
        .expect("import");
    value.as_object().cloned().expect("array")
}

/// Call an `Array.prototype` method by name
#[allow(dead_code)]
pub fn call_array_method(
    runtime: &Runtime,
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> quicksilver_objects::Result<Value> {
    let func = runtime.array_prototype().get(method)?;
    let func = func.as_object().cloned().expect("method exists");
    func.call(receiver, args)
}

/// Export a value and render it through serde_json
#[allow(dead_code)]
pub fn to_json(runtime: &Runtime, value: &Value) -> serde_json::Value {
    let exported: Exported = runtime.export_value(value).expect("export");
    serde_json::to_value(&exported).expect("serialize")
}

/// Own keys rendered as strings
#[allow(dead_code)]
pub fn key_strings(obj: &Object) -> Vec<String> {
    obj.own_property_keys()
        .expect("own keys")
        .iter()
        .map(|k| k.to_string())
        .collect()
}
