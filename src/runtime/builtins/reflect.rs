//! `Reflect`
//!
//! Each method is a thin wrapper over one internal method. Mutating methods
//! run with `throw == false` and report failure as `false`.

use super::object::proto_arg;
use super::{arg, define, object_arg, to_string_tag, Installer};
use crate::error::{messages, Error, Result};
use crate::runtime::{Attributes, Object, PropertyDescriptor, Runtime, Value};

pub(super) fn register_reflect(installer: &Installer, reflect: Object) -> Object {
    installer.method(&reflect, "apply", 3, reflect_apply);
    installer.method(&reflect, "construct", 2, reflect_construct);
    installer.method(&reflect, "defineProperty", 3, reflect_define_property);
    installer.method(&reflect, "deleteProperty", 2, reflect_delete_property);
    installer.method(&reflect, "get", 2, reflect_get);
    installer.method(&reflect, "getOwnPropertyDescriptor", 2, reflect_get_own_property_descriptor);
    installer.method(&reflect, "getPrototypeOf", 1, reflect_get_prototype_of);
    installer.method(&reflect, "has", 2, reflect_has);
    installer.method(&reflect, "isExtensible", 1, reflect_is_extensible);
    installer.method(&reflect, "ownKeys", 1, reflect_own_keys);
    installer.method(&reflect, "preventExtensions", 1, reflect_prevent_extensions);
    installer.method(&reflect, "set", 3, reflect_set);
    installer.method(&reflect, "setPrototypeOf", 2, reflect_set_prototype_of);
    define(&reflect, to_string_tag(), "Reflect", Attributes::CONFIGURABLE);
    reflect
}

/// CreateListFromArrayLike
pub(crate) fn list_from_array_like(value: &Value) -> Result<Vec<Value>> {
    let Value::Object(list) = value else {
        return Err(Error::type_error("CreateListFromArrayLike called on non-object"));
    };
    let len = list.length_of_array_like()?;
    (0..len).map(|idx| list.get(idx)).collect()
}

fn target(args: &[Value], method: &str) -> Result<Object> {
    object_arg(args, 0, &format!("Reflect.{}", method))
}

fn reflect_apply(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let func = match arg(args, 0) {
        Value::Object(f) if f.is_callable() => f,
        other => return Err(Error::type_error(messages::not_a_function(&other))),
    };
    let call_args = list_from_array_like(&arg(args, 2))?;
    func.call(&arg(args, 1), &call_args)
}

fn reflect_construct(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let ctor = match arg(args, 0) {
        Value::Object(c) if c.is_constructor() => c,
        other => return Err(Error::type_error(messages::not_a_constructor(&other))),
    };
    let new_target = match args.get(2) {
        None => ctor.clone(),
        Some(Value::Object(nt)) if nt.is_constructor() => nt.clone(),
        Some(other) => return Err(Error::type_error(messages::not_a_constructor(other))),
    };
    let call_args = list_from_array_like(&arg(args, 1))?;
    ctor.construct(&call_args, Some(&new_target)).map(Value::Object)
}

fn reflect_define_property(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "defineProperty")?;
    let key = arg(args, 1).to_property_key()?;
    let desc = PropertyDescriptor::from_value(&arg(args, 2))?;
    Ok(Value::Bool(obj.define_own_property(key, &desc, false)?))
}

fn reflect_delete_property(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "deleteProperty")?;
    let key = arg(args, 1).to_property_key()?;
    Ok(Value::Bool(obj.delete(key, false)?))
}

fn reflect_get(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "get")?;
    let key = arg(args, 1).to_property_key()?;
    let receiver = args.get(2).cloned().unwrap_or_else(|| Value::Object(obj.clone()));
    obj.get_with_receiver(&key, &receiver)
}

fn reflect_get_own_property_descriptor(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "getOwnPropertyDescriptor")?;
    let key = arg(args, 1).to_property_key()?;
    match obj.get_own_property_descriptor(key)? {
        Some(desc) => Ok(Value::Object(rt.from_property_descriptor(&desc)?)),
        None => Ok(Value::Undefined),
    }
}

fn reflect_get_prototype_of(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "getPrototypeOf")?;
    Ok(obj.prototype()?.map_or(Value::Null, Value::Object))
}

fn reflect_has(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "has")?;
    let key = arg(args, 1).to_property_key()?;
    Ok(Value::Bool(obj.has_property(key)?))
}

fn reflect_is_extensible(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "isExtensible")?;
    Ok(Value::Bool(obj.is_extensible()?))
}

fn reflect_own_keys(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "ownKeys")?;
    let keys = obj.own_property_keys()?;
    Ok(Value::Object(rt.new_array_from_values(keys.iter().map(|k| k.to_value()).collect())))
}

fn reflect_prevent_extensions(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "preventExtensions")?;
    Ok(Value::Bool(obj.prevent_extensions(false)?))
}

fn reflect_set(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "set")?;
    let key = arg(args, 1).to_property_key()?;
    let receiver = args.get(3).cloned().unwrap_or_else(|| Value::Object(obj.clone()));
    Ok(Value::Bool(obj.set_with_receiver(&key, arg(args, 2), &receiver, false)?))
}

fn reflect_set_prototype_of(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let obj = target(args, "setPrototypeOf")?;
    let proto = proto_arg(arg(args, 1))?;
    Ok(Value::Bool(obj.set_prototype(proto, false)?))
}
