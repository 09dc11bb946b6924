//! Host-backed objects and arrays
//!
//! A [`DynamicObject`] or [`DynamicArray`] handler owns the data; the adapter
//! only translates property operations into handler calls. Every property an
//! adapter exposes is a plain data property, so attribute changes, accessors
//! and symbol keys are rejected.

use crate::error::{messages, type_error_result, Result};
use crate::runtime::array::to_array_length;
use crate::runtime::base::{check_proto_cycle, set_foreign_step, set_through_prototype};
use crate::runtime::object::{class, ExportContext, Exported, Object, ObjectImpl};
use crate::runtime::property::{Attributes, OwnProperty, Property, PropertyDescriptor, PropertyKey};
use crate::runtime::value::Value;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// A host map exposed as an object
pub trait DynamicObject: 'static {
    fn get(&self, key: &str) -> Value;
    /// Store a value. Returning `false` rejects the assignment.
    fn set(&self, key: &str, value: Value) -> bool;
    fn has(&self, key: &str) -> bool;
    /// Remove a key. Returning `false` rejects the deletion.
    fn delete(&self, key: &str) -> bool;
    /// Enumeration order is the host's. Integer-like keys are not moved first.
    fn keys(&self) -> Vec<String>;
}

/// A host sequence exposed as an array
pub trait DynamicArray: 'static {
    fn len(&self) -> usize;
    fn get(&self, idx: usize) -> Value;
    /// Store a value. Returning `false` rejects the assignment.
    fn set(&self, idx: usize, value: Value) -> bool;
    /// Resize. Returning `false` rejects the change.
    fn set_len(&self, len: usize) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: DynamicObject + Send + Sync> DynamicObject for Arc<H> {
    fn get(&self, key: &str) -> Value {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> bool {
        (**self).set(key, value)
    }

    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }
}

impl<H: DynamicArray + Send + Sync> DynamicArray for Arc<H> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, idx: usize) -> Value {
        (**self).get(idx)
    }

    fn set(&self, idx: usize, value: Value) -> bool {
        (**self).set(idx, value)
    }

    fn set_len(&self, len: usize) -> bool {
        (**self).set_len(len)
    }
}

/// Reject every descriptor a dynamic property cannot honour
fn check_descriptor(key: &PropertyKey, desc: &PropertyDescriptor, throw: bool) -> Result<bool> {
    if desc.is_accessor() {
        return type_error_result(throw, messages::DYNAMIC_NO_ACCESSORS);
    }
    if desc.writable == Some(false) {
        return type_error_result(throw, messages::dynamic_attribute(key, "read-only"));
    }
    if desc.enumerable == Some(false) {
        return type_error_result(throw, messages::dynamic_attribute(key, "non-enumerable"));
    }
    if desc.configurable == Some(false) {
        return type_error_result(throw, messages::dynamic_attribute(key, "non-configurable"));
    }
    Ok(true)
}

fn set_prototype_checked(
    slot: &RefCell<Option<Object>>,
    this: &Object,
    proto: Option<Object>,
    throw: bool,
) -> Result<bool> {
    if *slot.borrow() == proto {
        return Ok(true);
    }
    if !check_proto_cycle(this, proto.as_ref(), throw)? {
        return Ok(false);
    }
    *slot.borrow_mut() = proto;
    Ok(true)
}

/// Adapter exposing a [`DynamicObject`] handler
pub struct DynamicObjectAdapter<H: DynamicObject> {
    handler: Rc<H>,
    prototype: RefCell<Option<Object>>,
}

impl<H: DynamicObject> DynamicObjectAdapter<H> {
    pub fn new(handler: H, prototype: Option<Object>) -> Self {
        DynamicObjectAdapter {
            handler: Rc::new(handler),
            prototype: RefCell::new(prototype),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn proto(&self) -> Option<Object> {
        self.prototype.borrow().clone()
    }

    fn own_value(&self, key: &PropertyKey) -> Option<Value> {
        match key {
            PropertyKey::Symbol(_) => None,
            _ => {
                let name = key.to_string();
                self.handler.has(&name).then(|| self.handler.get(&name))
            }
        }
    }

    fn store(&self, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        if key.is_symbol() {
            return type_error_result(throw, messages::DYNAMIC_NO_SYMBOLS);
        }
        if self.handler.set(&key.to_string(), value) {
            Ok(true)
        } else {
            type_error_result(throw, "'Set' on a dynamic object returned false")
        }
    }
}

impl<H: DynamicObject> ObjectImpl for DynamicObjectAdapter<H> {
    fn class_name(&self) -> &'static str {
        class::OBJECT
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        Ok(self.own_value(key).map(OwnProperty::Plain))
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        match self.own_value(key) {
            Some(value) => Ok(value),
            None => match self.proto() {
                Some(proto) => proto.get_with_receiver(key, receiver),
                None => Ok(Value::Undefined),
            },
        }
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        if key.is_symbol() {
            return type_error_result(throw, messages::DYNAMIC_NO_SYMBOLS);
        }
        if !self.handler.has(&key.to_string()) {
            if let Some(result) = set_through_prototype(self.proto(), this, key, &value, throw)? {
                return Ok(result);
            }
        }
        self.store(key, value, throw)
    }

    fn set_foreign(
        &self,
        _this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        let existing = self.own_value(key).map(OwnProperty::Plain);
        set_foreign_step(self.proto(), key, existing, value, receiver, throw)
    }

    fn has_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<bool> {
        Ok(!key.is_symbol() && self.handler.has(&key.to_string()))
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        if key.is_symbol() {
            return type_error_result(throw, messages::DYNAMIC_NO_SYMBOLS);
        }
        if !check_descriptor(key, desc, throw)? {
            return Ok(false);
        }
        let value = match &desc.value {
            Some(value) => value.clone(),
            None => self.own_value(key).unwrap_or_default(),
        };
        self.store(key, value, throw)
    }

    fn delete(&self, _this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        if key.is_symbol() {
            return Ok(true);
        }
        let name = key.to_string();
        if self.handler.delete(&name) {
            Ok(true)
        } else {
            type_error_result(
                throw,
                format!("Could not delete property {:?} of a dynamic object", name),
            )
        }
    }

    /// Keys in the order the handler reports them
    fn own_keys(&self, _this: &Object, _all: bool) -> Result<Vec<PropertyKey>> {
        Ok(self.handler.keys().into_iter().map(PropertyKey::from).collect())
    }

    fn prototype(&self, _this: &Object) -> Result<Option<Object>> {
        Ok(self.proto())
    }

    fn set_prototype(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        set_prototype_checked(&self.prototype, this, proto, throw)
    }

    fn is_extensible(&self, _this: &Object) -> Result<bool> {
        Ok(true)
    }

    fn prevent_extensions(&self, _this: &Object, throw: bool) -> Result<bool> {
        type_error_result(throw, messages::DYNAMIC_NON_EXTENSIBLE)
    }

    fn export(&self, _this: &Object, _ctx: &mut ExportContext) -> Result<Exported> {
        Ok(Exported::Host(self.handler.clone()))
    }
}

/// Adapter exposing a [`DynamicArray`] handler
pub struct DynamicArrayAdapter<H: DynamicArray> {
    handler: Rc<H>,
    prototype: RefCell<Option<Object>>,
}

impl<H: DynamicArray> DynamicArrayAdapter<H> {
    pub fn new(handler: H, prototype: Option<Object>) -> Self {
        DynamicArrayAdapter {
            handler: Rc::new(handler),
            prototype: RefCell::new(prototype),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn proto(&self) -> Option<Object> {
        self.prototype.borrow().clone()
    }

    fn length_property(&self) -> OwnProperty {
        OwnProperty::Property(Property::data(
            Value::from(self.handler.len()),
            Attributes::WRITABLE,
        ))
    }

    fn own_property(&self, key: &PropertyKey) -> Option<OwnProperty> {
        match key {
            PropertyKey::Index(idx) if (*idx as usize) < self.handler.len() => {
                Some(OwnProperty::Plain(self.handler.get(*idx as usize)))
            }
            _ if key.is_str("length") => Some(self.length_property()),
            _ => None,
        }
    }

    fn set_idx(&self, idx: u32, value: Value, throw: bool) -> Result<bool> {
        if self.handler.set(idx as usize, value) {
            Ok(true)
        } else {
            type_error_result(throw, "'Set' on a dynamic array returned false")
        }
    }

    fn set_len(&self, value: &Value, throw: bool) -> Result<bool> {
        let len = to_array_length(value)?;
        if self.handler.set_len(len as usize) {
            Ok(true)
        } else {
            type_error_result(throw, "'SetLen' on a dynamic array returned false")
        }
    }
}

impl<H: DynamicArray> ObjectImpl for DynamicArrayAdapter<H> {
    fn class_name(&self) -> &'static str {
        class::ARRAY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        Ok(self.own_property(key))
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        match key {
            PropertyKey::Index(idx) if (*idx as usize) < self.handler.len() => {
                Ok(self.handler.get(*idx as usize))
            }
            _ if key.is_str("length") => Ok(Value::from(self.handler.len())),
            _ => match self.proto() {
                Some(proto) => proto.get_with_receiver(key, receiver),
                None => Ok(Value::Undefined),
            },
        }
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) => {
                if (*idx as usize) >= self.handler.len() {
                    if let Some(result) = set_through_prototype(self.proto(), this, key, &value, throw)? {
                        return Ok(result);
                    }
                }
                self.set_idx(*idx, value, throw)
            }
            _ if key.is_str("length") => self.set_len(&value, throw),
            _ => type_error_result(throw, messages::dynamic_array_property(key)),
        }
    }

    fn set_foreign(
        &self,
        _this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        set_foreign_step(self.proto(), key, self.own_property(key), value, receiver, throw)
    }

    fn has_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<bool> {
        Ok(self.own_property(key).is_some())
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) => {
                if !check_descriptor(key, desc, throw)? {
                    return Ok(false);
                }
                let value = match &desc.value {
                    Some(value) => value.clone(),
                    None if (*idx as usize) < self.handler.len() => self.handler.get(*idx as usize),
                    None => Value::Undefined,
                };
                self.set_idx(*idx, value, throw)
            }
            _ if key.is_str("length") => {
                if desc.configurable == Some(true)
                    || desc.enumerable == Some(true)
                    || desc.is_accessor()
                    || desc.writable == Some(false)
                {
                    return type_error_result(throw, messages::cannot_redefine(key));
                }
                match &desc.value {
                    Some(value) => self.set_len(value, throw),
                    None => Ok(true),
                }
            }
            _ => type_error_result(
                throw,
                format!("Cannot define property {:?} on a dynamic array", key.to_string()),
            ),
        }
    }

    fn delete(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) if (*idx as usize) < self.handler.len() => {
                self.set_idx(*idx, Value::Undefined, throw)
            }
            _ if key.is_str("length") => type_error_result(throw, messages::cannot_delete(key, this)),
            _ => Ok(true),
        }
    }

    fn own_keys(&self, _this: &Object, all: bool) -> Result<Vec<PropertyKey>> {
        let len = self.handler.len().min(u32::MAX as usize) as u32;
        let mut keys: Vec<PropertyKey> = (0..len).map(PropertyKey::from).collect();
        if all {
            keys.push(PropertyKey::from("length"));
        }
        Ok(keys)
    }

    fn prototype(&self, _this: &Object) -> Result<Option<Object>> {
        Ok(self.proto())
    }

    fn set_prototype(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        set_prototype_checked(&self.prototype, this, proto, throw)
    }

    fn is_extensible(&self, _this: &Object) -> Result<bool> {
        Ok(true)
    }

    fn prevent_extensions(&self, _this: &Object, throw: bool) -> Result<bool> {
        type_error_result(throw, messages::DYNAMIC_NON_EXTENSIBLE)
    }

    fn export(&self, _this: &Object, _ctx: &mut ExportContext) -> Result<Exported> {
        Ok(Exported::Host(self.handler.clone()))
    }

    fn is_array(&self, _this: &Object) -> Result<bool> {
        Ok(true)
    }
}
