//! Built-in constructors and prototype methods
//!
//! This module creates the intrinsic objects of a runtime: `Object`,
//! `Array`, `Reflect` and `Proxy`, their prototypes, and the wrapper
//! prototypes used by `to_object`.

mod array;
mod object;
mod proxy;
mod reflect;

use crate::config::RuntimeConfig;
use crate::error::{messages, Error, Result};
use crate::runtime::{
    class, ArrayObject, Attributes, BaseObject, FunctionObject, Intrinsics, Object,
    PropertyDescriptor, PropertyKey, Runtime, RuntimeInner, Symbol, Value,
};
use std::rc::{Rc, Weak};

/// Creates native functions bound to a runtime that is still being built
pub(crate) struct Installer {
    runtime: Weak<RuntimeInner>,
    function_prototype: Object,
}

impl Installer {
    fn function<F>(&self, name: &str, length: u32, f: F) -> Object
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
    {
        Object::new(FunctionObject::new(
            self.runtime.clone(),
            Some(self.function_prototype.clone()),
            name,
            length,
            Rc::new(f),
            None,
        ))
    }

    /// A constructor, linked both ways with `prototype` when one is given
    fn constructor<F, C>(&self, name: &str, length: u32, call: F, construct: C, prototype: Option<&Object>) -> Object
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
        C: Fn(&Runtime, &[Value], &Object) -> Result<Object> + 'static,
    {
        let ctor = Object::new(FunctionObject::new(
            self.runtime.clone(),
            Some(self.function_prototype.clone()),
            name,
            length,
            Rc::new(call),
            Some(Rc::new(construct)),
        ));
        if let Some(prototype) = prototype {
            define(&ctor, "prototype", prototype, Attributes::empty());
            define(prototype, "constructor", &ctor, Attributes::WRITABLE | Attributes::CONFIGURABLE);
        }
        ctor
    }

    fn method<F>(&self, target: &Object, name: &str, length: u32, f: F)
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
    {
        let function = self.function(name, length, f);
        define(target, name, function, Attributes::WRITABLE | Attributes::CONFIGURABLE);
    }

    fn getter<F>(&self, target: &Object, key: impl Into<PropertyKey>, name: &str, f: F)
    where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value> + 'static,
    {
        let getter = self.function(name, 0, f);
        let desc = PropertyDescriptor::accessor(Some(getter), None, Attributes::CONFIGURABLE);
        // Fresh intrinsics accept every define.
        let _ = target.define_own_property(key, &desc, false);
    }
}

fn define(target: &Object, key: impl Into<PropertyKey>, value: impl Into<Value>, attributes: Attributes) {
    let _ = target.define_data_property(key, value, attributes, false);
}

/// Build the intrinsics of a new runtime
pub(crate) fn install(runtime: &Weak<RuntimeInner>, config: &RuntimeConfig) -> Intrinsics {
    let object_prototype = Object::new(BaseObject::new(class::OBJECT, None));
    let function_prototype = Object::new(FunctionObject::new(
        runtime.clone(),
        Some(object_prototype.clone()),
        "",
        0,
        Rc::new(|_, _, _| Ok(Value::Undefined)),
        None,
    ));
    let array_prototype = Object::new(ArrayObject::new(
        Some(object_prototype.clone()),
        config.sparse_threshold,
    ));
    let plain = || Object::new(BaseObject::new(class::OBJECT, Some(object_prototype.clone())));
    let boolean_prototype = plain();
    let number_prototype = plain();
    let string_prototype = plain();
    let symbol_prototype = plain();
    let global = plain();

    let installer = Installer {
        runtime: runtime.clone(),
        function_prototype: function_prototype.clone(),
    };

    let object = object::register_object(&installer, &object_prototype);
    object::register_wrapper(&installer, &boolean_prototype, class::BOOLEAN);
    object::register_wrapper(&installer, &number_prototype, class::NUMBER);
    object::register_wrapper(&installer, &string_prototype, class::STRING);
    object::register_wrapper(&installer, &symbol_prototype, class::SYMBOL);
    let array = array::register_array(&installer, &array_prototype);
    let reflect = reflect::register_reflect(&installer, plain());
    let proxy = proxy::register_proxy(&installer);

    let hidden = Attributes::WRITABLE | Attributes::CONFIGURABLE;
    define(&global, "Object", &object, hidden);
    define(&global, "Array", &array, hidden);
    define(&global, "Reflect", &reflect, hidden);
    define(&global, "Proxy", &proxy, hidden);

    Intrinsics {
        object_prototype,
        function_prototype,
        array_prototype,
        boolean_prototype,
        number_prototype,
        string_prototype,
        symbol_prototype,
        object,
        array,
        global,
    }
}

/// Argument `idx`, or `undefined` when absent
pub(crate) fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or_default()
}

/// Argument `idx`, which must be callable
pub(crate) fn callable_arg(args: &[Value], idx: usize) -> Result<Object> {
    match arg(args, idx) {
        Value::Object(f) if f.is_callable() => Ok(f),
        other => Err(Error::type_error(messages::not_a_function(&other))),
    }
}

/// Argument `idx`, which must be an object. `what` names the caller in the error.
pub(crate) fn object_arg(args: &[Value], idx: usize, what: &str) -> Result<Object> {
    match arg(args, idx) {
        Value::Object(obj) => Ok(obj),
        _ => Err(Error::type_error(format!("{} called on non-object", what))),
    }
}

/// The `Symbol.toStringTag` key
fn to_string_tag() -> PropertyKey {
    PropertyKey::from(Symbol::to_string_tag())
}
