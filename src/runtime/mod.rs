//! Runtime module - the object model and its host embedding API
//!
//! A [`Runtime`] owns the intrinsic objects (`Object.prototype`,
//! `Array.prototype`, the constructors, `Reflect` and a global object) and
//! is the factory for everything a host creates: plain objects, arrays,
//! native functions, proxies and dynamic adapters.
//!
//! The runtime is single threaded. Objects are `Rc` handles and the runtime
//! itself is a cheap clone of an `Rc`.

mod array;
mod base;
pub(crate) mod builtins;
mod dynamic;
mod function;
mod object;
mod property;
mod proxy;
mod symbol;
mod value;

pub use array::{to_array_length, ArrayObject};
pub use base::BaseObject;
pub use dynamic::{DynamicArray, DynamicArrayAdapter, DynamicObject, DynamicObjectAdapter};
pub use function::{FunctionObject, NativeCtor, NativeFn};
pub use object::{
    class, ordinary_to_primitive, relative_index, ExportContext, Exported, Object, ObjectImpl,
};
pub use property::{
    apply_descriptor, parse_array_index, Attributes, DefineRejection, OwnProperty, Property,
    PropertyDescriptor, PropertyKey, PropertyKind,
};
pub use proxy::{ProxyHandler, ProxyObject, ProxyTrapConfig};
pub use symbol::{well_known, Symbol, WellKnownSymbols};
pub use value::{number_to_string, string_to_number, JsString, PreferredType, Value, MAX_SAFE_INTEGER};

use crate::config::RuntimeConfig;
use crate::error::{messages, Error, Result};
use proxy::JsProxyHandler;
use rustc_hash::FxHashSet;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::debug;

/// Objects every runtime starts with
pub(crate) struct Intrinsics {
    pub(crate) object_prototype: Object,
    pub(crate) function_prototype: Object,
    pub(crate) array_prototype: Object,
    pub(crate) boolean_prototype: Object,
    pub(crate) number_prototype: Object,
    pub(crate) string_prototype: Object,
    pub(crate) symbol_prototype: Object,
    pub(crate) object: Object,
    pub(crate) array: Object,
    pub(crate) global: Object,
}

pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    intrinsics: Intrinsics,
    call_depth: Cell<usize>,
    /// Arrays currently being joined, to cut `join` cycles short
    joining: RefCell<FxHashSet<u64>>,
}

/// Decrements the native call depth when dropped
pub(crate) struct CallGuard {
    inner: Rc<RuntimeInner>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        let depth = self.inner.call_depth.get();
        self.inner.call_depth.set(depth.saturating_sub(1));
    }
}

/// Removes an array from the join set when dropped
pub(crate) struct JoinGuard {
    inner: Rc<RuntimeInner>,
    id: u64,
}

impl Drop for JoinGuard {
    fn drop(&mut self) {
        self.inner.joining.borrow_mut().remove(&self.id);
    }
}

/// The object model runtime
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with a custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<RuntimeInner>| {
            let intrinsics = builtins::install(weak, &config);
            RuntimeInner {
                config,
                intrinsics,
                call_depth: Cell::new(0),
                joining: RefCell::new(FxHashSet::default()),
            }
        });
        debug!(
            fast_paths = inner.config.fast_paths,
            max_call_depth = inner.config.max_call_depth,
            "runtime created"
        );
        Runtime(inner)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    /// Upgrade a back-reference held by a function or proxy handler
    pub(crate) fn from_weak(weak: &Weak<RuntimeInner>) -> Result<Runtime> {
        weak.upgrade()
            .map(Runtime)
            .ok_or_else(|| Error::InternalError("runtime was dropped".to_string()))
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.0)
    }

    /// Enter a native call, failing once the configured depth is reached
    pub(crate) fn enter_call(&self) -> Result<CallGuard> {
        let depth = self.0.call_depth.get();
        if depth >= self.0.config.max_call_depth {
            return Err(Error::range_error(messages::MAXIMUM_CALL_STACK));
        }
        self.0.call_depth.set(depth + 1);
        Ok(CallGuard {
            inner: self.0.clone(),
        })
    }

    /// Mark an array as being joined. `None` if it already is.
    pub(crate) fn enter_join(&self, obj: &Object) -> Option<JoinGuard> {
        if !self.0.joining.borrow_mut().insert(obj.id()) {
            return None;
        }
        Some(JoinGuard {
            inner: self.0.clone(),
            id: obj.id(),
        })
    }

    pub(crate) fn intrinsics(&self) -> &Intrinsics {
        &self.0.intrinsics
    }

    /// The global object holding `Object`, `Array`, `Proxy` and `Reflect`
    pub fn global(&self) -> &Object {
        &self.0.intrinsics.global
    }

    pub fn object_prototype(&self) -> &Object {
        &self.0.intrinsics.object_prototype
    }

    pub fn array_prototype(&self) -> &Object {
        &self.0.intrinsics.array_prototype
    }

    pub fn function_prototype(&self) -> &Object {
        &self.0.intrinsics.function_prototype
    }

    /// The `Object` constructor
    pub fn object_constructor(&self) -> &Object {
        &self.0.intrinsics.object
    }

    /// The `Array` constructor
    pub fn array_constructor(&self) -> &Object {
        &self.0.intrinsics.array
    }

    /// A new empty ordinary object inheriting from `Object.prototype`
    pub fn new_object(&self) -> Object {
        self.new_object_with_prototype(Some(self.object_prototype().clone()))
    }

    pub fn new_object_with_prototype(&self, prototype: Option<Object>) -> Object {
        Object::new(BaseObject::new(class::OBJECT, prototype))
    }

    /// A new empty array
    pub fn new_array(&self) -> Object {
        self.new_array_from_values(Vec::new())
    }

    /// A new standard array holding `values`
    pub fn new_array_from_values(&self, values: Vec<Value>) -> Object {
        Object::new(ArrayObject::from_values(
            Some(self.array_prototype().clone()),
            self.0.config.sparse_threshold,
            values,
        ))
    }

    /// ArrayCreate: an array of `len` holes
    pub fn new_array_with_length(&self, len: i64) -> Result<Object> {
        self.new_array_with_length_and_prototype(len, self.array_prototype().clone())
    }

    pub(crate) fn new_array_with_length_and_prototype(&self, len: i64, prototype: Object) -> Result<Object> {
        if !(0..=u32::MAX as i64).contains(&len) {
            return Err(Error::range_error(messages::INVALID_ARRAY_LENGTH));
        }
        let array = Object::new(ArrayObject::new(Some(prototype), self.0.config.sparse_threshold));
        if len > 0 {
            array.set("length", len, true)?;
        }
        Ok(array)
    }

    /// A native function that is not a constructor
    pub fn new_function<F>(&self, name: &str, length: u32, f: F) -> Object
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
    {
        Object::new(FunctionObject::new(
            self.downgrade(),
            Some(self.function_prototype().clone()),
            name,
            length,
            Rc::new(f),
            None,
        ))
    }

    /// A native constructor with its own `prototype` object
    pub fn new_constructor<F, C>(&self, name: &str, length: u32, call: F, construct: C) -> Result<Object>
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
        C: Fn(&Runtime, &[Value], &Object) -> Result<Object> + 'static,
    {
        let ctor = Object::new(FunctionObject::new(
            self.downgrade(),
            Some(self.function_prototype().clone()),
            name,
            length,
            Rc::new(call),
            Some(Rc::new(construct)),
        ));
        let prototype = self.new_object();
        prototype.define_own_property(
            "constructor",
            &PropertyDescriptor::data(&ctor, Attributes::WRITABLE | Attributes::CONFIGURABLE),
            true,
        )?;
        ctor.define_own_property("prototype", &PropertyDescriptor::data(prototype, Attributes::WRITABLE), true)?;
        Ok(ctor)
    }

    /// GetPrototypeFromConstructor
    pub(crate) fn prototype_from_constructor(&self, new_target: &Object, fallback: &Object) -> Result<Object> {
        match new_target.get("prototype")? {
            Value::Object(proto) => Ok(proto),
            _ => Ok(fallback.clone()),
        }
    }

    /// Expose a host map as an object inheriting from `Object.prototype`
    pub fn new_dynamic_object<H: DynamicObject>(&self, handler: H) -> Object {
        Object::new(DynamicObjectAdapter::new(handler, Some(self.object_prototype().clone())))
    }

    /// Expose a host sequence as an array inheriting from `Array.prototype`
    pub fn new_dynamic_array<H: DynamicArray>(&self, handler: H) -> Object {
        Object::new(DynamicArrayAdapter::new(handler, Some(self.array_prototype().clone())))
    }

    /// Expose a thread-safe host map. The object has no prototype so the same
    /// handler can back objects in several runtimes.
    pub fn new_shared_dynamic_object<H>(&self, handler: Arc<H>) -> Object
    where
        H: DynamicObject + Send + Sync,
    {
        Object::new(DynamicObjectAdapter::new(handler, None))
    }

    /// Thread-safe counterpart of [`Runtime::new_dynamic_array`], without a prototype
    pub fn new_shared_dynamic_array<H>(&self, handler: Arc<H>) -> Object
    where
        H: DynamicArray + Send + Sync,
    {
        Object::new(DynamicArrayAdapter::new(handler, None))
    }

    /// A proxy over `target` driven by host closures
    pub fn new_proxy(&self, target: &Object, traps: ProxyTrapConfig) -> Object {
        Object::new(ProxyObject::new(target.clone(), Rc::new(traps)))
    }

    /// A proxy over `target` whose traps are methods of `handler`
    pub fn new_proxy_with_handler_object(&self, target: &Object, handler: &Object) -> Object {
        let handler = JsProxyHandler::new(handler.clone(), self.downgrade());
        Object::new(ProxyObject::new(target.clone(), Rc::new(handler)))
    }

    pub fn new_symbol(&self, description: Option<&str>) -> Symbol {
        Symbol::new(description)
    }

    /// Build a value graph from JSON. Objects keep the document's key order.
    pub fn import_json(&self, json: &serde_json::Value) -> Result<Value> {
        use serde_json::Value as Json;
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) if i.unsigned_abs() <= MAX_SAFE_INTEGER as u64 => Value::Int(i),
                _ => Value::number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::from(s.as_str()),
            Json::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.import_json(item))
                    .collect::<Result<Vec<_>>>()?;
                Value::Object(self.new_array_from_values(values))
            }
            Json::Object(map) => {
                let obj = self.new_object();
                for (key, item) in map {
                    obj.create_data_property_or_throw(key.as_str(), self.import_json(item)?)?;
                }
                Value::Object(obj)
            }
        })
    }

    /// ToObject: primitives become wrapper objects
    pub fn to_object(&self, value: &Value) -> Result<Object> {
        let intrinsics = self.intrinsics();
        let (class, prototype) = match value {
            Value::Object(obj) => return Ok(obj.clone()),
            Value::Undefined | Value::Null => {
                return Err(Error::type_error(messages::NULL_OR_UNDEFINED_TO_OBJECT))
            }
            Value::Bool(_) => (class::BOOLEAN, &intrinsics.boolean_prototype),
            Value::Int(_) | Value::Float(_) => (class::NUMBER, &intrinsics.number_prototype),
            Value::Symbol(_) => (class::SYMBOL, &intrinsics.symbol_prototype),
            Value::String(s) => return Ok(self.new_string_wrapper(s)),
        };
        Ok(Object::new(BaseObject::with_primitive(
            class,
            Some(prototype.clone()),
            value.clone(),
        )))
    }

    fn new_string_wrapper(&self, s: &JsString) -> Object {
        let wrapper = BaseObject::with_primitive(
            class::STRING,
            Some(self.intrinsics().string_prototype.clone()),
            Value::String(s.clone()),
        );
        let units: Vec<u16> = s.encode_utf16().collect();
        for (idx, unit) in units.iter().enumerate() {
            let ch = String::from_utf16_lossy(std::slice::from_ref(unit));
            wrapper.put(
                idx as u32,
                OwnProperty::Property(Property::data(Value::from(ch), Attributes::ENUMERABLE)),
            );
        }
        wrapper.put(
            "length",
            OwnProperty::Property(Property::data(Value::from(units.len()), Attributes::empty())),
        );
        Object::new(wrapper)
    }

    /// Snapshot any value for the host
    pub fn export_value(&self, value: &Value) -> Result<Exported> {
        Exported::from_value(value, &mut ExportContext::default())
    }

    /// ToPropertyDescriptor
    pub fn to_property_descriptor(&self, value: &Value) -> Result<PropertyDescriptor> {
        PropertyDescriptor::from_value(value)
    }

    /// FromPropertyDescriptor
    pub fn from_property_descriptor(&self, desc: &PropertyDescriptor) -> Result<Object> {
        let obj = self.new_object();
        if let Some(value) = &desc.value {
            obj.create_data_property_or_throw("value", value.clone())?;
        }
        if let Some(writable) = desc.writable {
            obj.create_data_property_or_throw("writable", writable)?;
        }
        if let Some(getter) = &desc.get {
            obj.create_data_property_or_throw("get", getter.clone())?;
        }
        if let Some(setter) = &desc.set {
            obj.create_data_property_or_throw("set", setter.clone())?;
        }
        if let Some(enumerable) = desc.enumerable {
            obj.create_data_property_or_throw("enumerable", enumerable)?;
        }
        if let Some(configurable) = desc.configurable {
            obj.create_data_property_or_throw("configurable", configurable)?;
        }
        Ok(obj)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_intrinsics() {
        let runtime = Runtime::new();
        let array = runtime.new_array();
        assert_eq!(array.prototype().unwrap().as_ref(), Some(runtime.array_prototype()));
        assert_eq!(
            runtime.array_prototype().prototype().unwrap().as_ref(),
            Some(runtime.object_prototype())
        );
        assert!(runtime.global().get("Array").unwrap().is_constructor());
        assert!(runtime.global().get("Reflect").unwrap().is_object());
    }

    #[test]
    fn test_import_json_keeps_key_order() {
        let runtime = Runtime::new();
        let json = serde_json::json!({"b": 1, "a": [true, null, "x"], "2": 2.5});
        let value = runtime.import_json(&json).unwrap();
        let obj = value.as_object().unwrap();
        let keys: Vec<String> = obj.keys().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2", "b", "a"]);
        let a = obj.get("a").unwrap();
        assert_eq!(a.as_object().unwrap().get(2).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_import_json_integer_extremes() {
        let runtime = Runtime::new();
        let min = runtime.import_json(&serde_json::json!(i64::MIN)).unwrap();
        assert_eq!(min, Value::number(-9.223372036854776e18));
        let safe = runtime.import_json(&serde_json::json!(-MAX_SAFE_INTEGER)).unwrap();
        assert_eq!(safe, Value::Int(-MAX_SAFE_INTEGER));
        let unsafe_max = runtime.import_json(&serde_json::json!(u64::MAX)).unwrap();
        assert_eq!(unsafe_max, Value::number(1.8446744073709552e19));
    }

    #[test]
    fn test_to_object_wrappers() {
        let runtime = Runtime::new();
        assert!(runtime.to_object(&Value::Undefined).unwrap_err().is_type_error());

        let wrapper = runtime.to_object(&Value::from("hi")).unwrap();
        assert_eq!(wrapper.class_name(), class::STRING);
        assert_eq!(wrapper.get(1).unwrap(), Value::from("i"));
        assert_eq!(wrapper.get("length").unwrap(), Value::from(2));
        assert!(!wrapper.set(0, "x", false).unwrap());

        let number = runtime.to_object(&Value::from(4)).unwrap();
        assert_eq!(number.class_name(), class::NUMBER);
        assert_eq!(number.to_primitive(PreferredType::Number).unwrap(), Value::from(4));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let runtime = Runtime::new();
        let desc = PropertyDescriptor::data(1, Attributes::WRITABLE);
        let obj = runtime.from_property_descriptor(&desc).unwrap();
        assert_eq!(obj.get("value").unwrap(), Value::from(1));
        assert_eq!(obj.get("writable").unwrap(), Value::Bool(true));
        let back = runtime.to_property_descriptor(&Value::Object(obj)).unwrap();
        assert_eq!(back.value, Some(Value::from(1)));
        assert_eq!(back.enumerable, Some(false));
    }

    #[test]
    fn test_call_depth_limit() {
        let runtime = Runtime::with_config(RuntimeConfig::new().with_max_call_depth(8));
        let recurse = runtime.new_function("recurse", 0, |rt, _this, _args| {
            let f = rt.global().get("recurse")?;
            f.as_object()
                .ok_or_else(|| Error::type_error("missing"))?
                .call(&Value::Undefined, &[])
        });
        runtime.global().set("recurse", &recurse, true).unwrap();
        let err = recurse.call(&Value::Undefined, &[]).unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(runtime.0.call_depth.get(), 0);
    }

    #[test]
    fn test_dropped_runtime_is_internal_error() {
        let f = {
            let runtime = Runtime::new();
            runtime.new_function("f", 0, |_, _, _| Ok(Value::Undefined))
        };
        assert!(matches!(
            f.call(&Value::Undefined, &[]),
            Err(Error::InternalError(_))
        ));
    }
}
