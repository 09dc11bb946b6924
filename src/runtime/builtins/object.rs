//! `Object` constructor, `Object.prototype`, and the primitive wrapper prototypes

use super::{arg, object_arg, to_string_tag, Installer};
use crate::error::{Error, Result};
use crate::runtime::{
    class, number_to_string, BaseObject, Object, PropertyDescriptor, PropertyKey, Runtime, Value,
};

/// Register `Object` and its statics on `Object.prototype`'s constructor
pub(super) fn register_object(installer: &Installer, prototype: &Object) -> Object {
    let ctor = installer.constructor("Object", 1, object_call, object_construct, Some(prototype));

    installer.method(&ctor, "keys", 1, object_keys);
    installer.method(&ctor, "getOwnPropertyNames", 1, object_get_own_property_names);
    installer.method(&ctor, "getOwnPropertySymbols", 1, object_get_own_property_symbols);
    installer.method(&ctor, "getOwnPropertyDescriptor", 2, object_get_own_property_descriptor);
    installer.method(&ctor, "defineProperty", 3, object_define_property);
    installer.method(&ctor, "getPrototypeOf", 1, object_get_prototype_of);
    installer.method(&ctor, "setPrototypeOf", 2, object_set_prototype_of);
    installer.method(&ctor, "preventExtensions", 1, object_prevent_extensions);
    installer.method(&ctor, "isExtensible", 1, object_is_extensible);
    installer.method(&ctor, "freeze", 1, object_freeze);
    installer.method(&ctor, "isFrozen", 1, object_is_frozen);

    installer.method(prototype, "hasOwnProperty", 1, object_proto_has_own_property);
    installer.method(prototype, "toString", 0, object_proto_to_string);
    installer.method(prototype, "valueOf", 0, object_proto_value_of);
    ctor
}

/// Register `valueOf` and `toString` on a wrapper prototype
pub(super) fn register_wrapper(installer: &Installer, prototype: &Object, class: &'static str) {
    installer.method(prototype, "valueOf", 0, move |_, this, _| this_primitive(this, class, "valueOf"));
    installer.method(prototype, "toString", 0, move |_, this, _| {
        let primitive = this_primitive(this, class, "toString")?;
        Ok(match &primitive {
            Value::Int(_) | Value::Float(_) => {
                Value::from(number_to_string(primitive.as_number().unwrap_or(f64::NAN)))
            }
            Value::Symbol(sym) => Value::from(sym.to_string()),
            other => Value::String(other.to_js_string()?),
        })
    });
}

/// thisBooleanValue and friends
fn this_primitive(this: &Value, class: &'static str, method: &str) -> Result<Value> {
    let matches = match this {
        Value::Bool(_) => class == class::BOOLEAN,
        Value::Int(_) | Value::Float(_) => class == class::NUMBER,
        Value::String(_) => class == class::STRING,
        Value::Symbol(_) => class == class::SYMBOL,
        _ => false,
    };
    if matches {
        return Ok(this.clone());
    }
    if let Some(base) = this.as_object().and_then(|obj| obj.downcast_ref::<BaseObject>()) {
        if base.class() == class {
            if let Some(primitive) = base.primitive() {
                return Ok(primitive);
            }
        }
    }
    Err(Error::type_error(format!(
        "{}.prototype.{} requires that 'this' be a {}",
        class, method, class
    )))
}

fn object_construct(rt: &Runtime, args: &[Value], new_target: &Object) -> Result<Object> {
    if new_target != rt.object_constructor() {
        let proto = rt.prototype_from_constructor(new_target, rt.object_prototype())?;
        return Ok(rt.new_object_with_prototype(Some(proto)));
    }
    match arg(args, 0) {
        Value::Undefined | Value::Null => Ok(rt.new_object()),
        value => rt.to_object(&value),
    }
}

fn object_call(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let ctor = rt.object_constructor().clone();
    object_construct(rt, args, &ctor).map(Value::Object)
}

fn key_array(rt: &Runtime, keys: Vec<PropertyKey>) -> Value {
    Value::Object(rt.new_array_from_values(keys.iter().map(PropertyKey::to_value).collect()))
}

fn object_keys(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(&arg(args, 0))?;
    Ok(key_array(rt, obj.keys()?))
}

fn object_get_own_property_names(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(&arg(args, 0))?;
    Ok(key_array(rt, obj.own_property_names()?))
}

fn object_get_own_property_symbols(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(&arg(args, 0))?;
    Ok(key_array(rt, obj.own_property_symbols()?))
}

fn object_get_own_property_descriptor(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(&arg(args, 0))?;
    let key = arg(args, 1).to_property_key()?;
    match obj.get_own_property_descriptor(key)? {
        Some(desc) => Ok(Value::Object(rt.from_property_descriptor(&desc)?)),
        None => Ok(Value::Undefined),
    }
}

fn object_define_property(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = object_arg(args, 0, "Object.defineProperty")?;
    let key = arg(args, 1).to_property_key()?;
    let desc = PropertyDescriptor::from_value(&arg(args, 2))?;
    obj.define_own_property(key, &desc, true)?;
    Ok(Value::Object(obj))
}

fn object_get_prototype_of(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(&arg(args, 0))?;
    Ok(obj.prototype()?.map_or(Value::Null, Value::Object))
}

/// The prototype argument of `setPrototypeOf`: an object or null
pub(super) fn proto_arg(value: Value) -> Result<Option<Object>> {
    match value {
        Value::Object(proto) => Ok(Some(proto)),
        Value::Null => Ok(None),
        other => Err(Error::type_error(format!(
            "Object prototype may only be an Object or null: {}",
            other
        ))),
    }
}

fn object_set_prototype_of(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        rt.to_object(&target)?;
    }
    let proto = proto_arg(arg(args, 1))?;
    if let Value::Object(obj) = &target {
        obj.set_prototype(proto, true)?;
    }
    Ok(target)
}

fn object_prevent_extensions(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    if let Value::Object(obj) = &target {
        obj.prevent_extensions(true)?;
    }
    Ok(target)
}

fn object_is_extensible(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    match arg(args, 0) {
        Value::Object(obj) => Ok(Value::Bool(obj.is_extensible()?)),
        _ => Ok(Value::Bool(false)),
    }
}

fn object_freeze(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let target = arg(args, 0);
    let Value::Object(obj) = &target else {
        return Ok(target);
    };
    obj.prevent_extensions(true)?;
    for key in obj.own_property_keys()? {
        let Some(prop) = obj.get_own_property(&key)? else {
            continue;
        };
        let desc = if prop.is_accessor() {
            PropertyDescriptor::default().with_configurable(false)
        } else {
            PropertyDescriptor::default()
                .with_configurable(false)
                .with_writable(false)
        };
        obj.define_own_property(&key, &desc, true)?;
    }
    Ok(target)
}

fn object_is_frozen(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let Value::Object(obj) = arg(args, 0) else {
        return Ok(Value::Bool(true));
    };
    if obj.is_extensible()? {
        return Ok(Value::Bool(false));
    }
    for key in obj.own_property_keys()? {
        if let Some(prop) = obj.get_own_property(&key)? {
            if prop.is_configurable() || (!prop.is_accessor() && prop.is_writable()) {
                return Ok(Value::Bool(false));
            }
        }
    }
    Ok(Value::Bool(true))
}

fn object_proto_has_own_property(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let key = arg(args, 0).to_property_key()?;
    let obj = rt.to_object(this)?;
    Ok(Value::Bool(obj.has_own_property(key)?))
}

/// `Object.prototype.toString`
pub(super) fn object_proto_to_string(rt: &Runtime, this: &Value, _args: &[Value]) -> Result<Value> {
    match this {
        Value::Undefined => return Ok(Value::from("[object Undefined]")),
        Value::Null => return Ok(Value::from("[object Null]")),
        _ => {}
    }
    let obj = rt.to_object(this)?;
    let builtin_tag = if obj.is_array()? {
        class::ARRAY
    } else {
        match obj.class_name() {
            tag @ (class::FUNCTION | class::ERROR | class::BOOLEAN | class::NUMBER | class::STRING) => tag,
            _ => class::OBJECT,
        }
    };
    let tag = match obj.get(to_string_tag())? {
        Value::String(tag) => tag.to_string(),
        _ => builtin_tag.to_string(),
    };
    Ok(Value::from(format!("[object {}]", tag)))
}

fn object_proto_value_of(rt: &Runtime, this: &Value, _args: &[Value]) -> Result<Value> {
    rt.to_object(this).map(Value::Object)
}
