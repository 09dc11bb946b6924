//! Array exotic objects
//!
//! Elements live in their own store, separate from the embedded `BaseObject`
//! that holds every non-index property. The store is a dense vector of
//! optional slots until a write lands far beyond the populated range, at
//! which point it switches to an ordered sparse map.
//!
//! Two counters track the shape of the element store:
//!
//! - `obj_count`: number of present elements
//! - `prop_value_count`: number of elements stored as full property records
//!
//! An array is *standard* when it is dense, `length` equals the vector length,
//! every slot is present and plain, and it has no other own properties. Builtins
//! use [`ArrayObject::is_standard`] to pick the direct storage path.

use crate::error::{messages, type_error_result, Error, Result};
use crate::runtime::base::{read_property, validate_define, BaseObject};
use crate::runtime::object::{class, ExportContext, Exported, Object, ObjectImpl};
use crate::runtime::property::{
    Attributes, OwnProperty, Property, PropertyDescriptor, PropertyKey, PropertyKind,
};
use crate::runtime::value::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::trace;

enum Elements {
    Dense(Vec<Option<OwnProperty>>),
    Sparse(BTreeMap<u32, OwnProperty>),
}

struct ArrayState {
    elements: Elements,
    length: u32,
    obj_count: usize,
    prop_value_count: usize,
    length_writable: bool,
    sparse_threshold: u32,
}

impl ArrayState {
    fn get(&self, idx: u32) -> Option<&OwnProperty> {
        match &self.elements {
            Elements::Dense(values) => values.get(idx as usize).and_then(Option::as_ref),
            Elements::Sparse(map) => map.get(&idx),
        }
    }

    fn get_mut(&mut self, idx: u32) -> Option<&mut OwnProperty> {
        match &mut self.elements {
            Elements::Dense(values) => values.get_mut(idx as usize).and_then(Option::as_mut),
            Elements::Sparse(map) => map.get_mut(&idx),
        }
    }

    fn account_removed(&mut self, prop: &OwnProperty) {
        self.obj_count -= 1;
        if !prop.is_plain() {
            self.prop_value_count -= 1;
        }
    }

    /// Store an element, keeping the counters in step
    fn put(&mut self, idx: u32, prop: OwnProperty) {
        if let Elements::Dense(values) = &self.elements {
            let beyond = idx as usize >= values.len();
            if beyond
                && idx > self.sparse_threshold
                && (self.obj_count as u64 + 1) * 10 < idx as u64 + 1
            {
                self.convert_to_sparse();
            }
        }
        let plain = prop.is_plain();
        let previous = match &mut self.elements {
            Elements::Dense(values) => {
                let i = idx as usize;
                if i >= values.len() {
                    values.resize_with(i + 1, || None);
                }
                values[i].replace(prop)
            }
            Elements::Sparse(map) => map.insert(idx, prop),
        };
        if let Some(old) = previous {
            self.account_removed(&old);
        }
        self.obj_count += 1;
        if !plain {
            self.prop_value_count += 1;
        }
    }

    fn remove(&mut self, idx: u32) {
        let removed = match &mut self.elements {
            Elements::Dense(values) => values.get_mut(idx as usize).and_then(Option::take),
            Elements::Sparse(map) => map.remove(&idx),
        };
        if let Some(old) = removed {
            self.account_removed(&old);
        }
    }

    fn convert_to_sparse(&mut self) {
        if let Elements::Dense(values) = &mut self.elements {
            let map: BTreeMap<u32, OwnProperty> = std::mem::take(values)
                .into_iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.map(|p| (i as u32, p)))
                .collect();
            trace!(elements = map.len(), length = self.length, "array switched to sparse storage");
            self.elements = Elements::Sparse(map);
        }
    }

    /// Present indices in `[from, to)`, descending
    fn present_indices_desc(&self, from: u32, to: u32) -> Vec<u32> {
        match &self.elements {
            Elements::Dense(values) => {
                let end = (to as usize).min(values.len());
                (from as usize..end)
                    .rev()
                    .filter(|&i| values[i].is_some())
                    .map(|i| i as u32)
                    .collect()
            }
            Elements::Sparse(map) => map.range(from..to).rev().map(|(&i, _)| i).collect(),
        }
    }

    /// Drop every element at or above `len`
    fn truncate(&mut self, len: u32) {
        let removed: Vec<OwnProperty> = match &mut self.elements {
            Elements::Dense(values) => {
                if (len as usize) < values.len() {
                    values.drain(len as usize..).flatten().collect()
                } else {
                    Vec::new()
                }
            }
            Elements::Sparse(map) => map.split_off(&len).into_values().collect(),
        };
        for prop in &removed {
            self.account_removed(prop);
        }
    }

    fn length_property(&self) -> OwnProperty {
        let attrs = if self.length_writable {
            Attributes::WRITABLE
        } else {
            Attributes::empty()
        };
        OwnProperty::Property(Property::data(Value::from(self.length), attrs))
    }
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// Convert a value assigned to `length`, rejecting anything that is not a
/// canonical uint32.
pub fn to_array_length(value: &Value) -> Result<u32> {
    if let Value::Int(i) = value {
        if (0..=u32::MAX as i64).contains(i) {
            return Ok(*i as u32);
        }
    }
    let n = value.to_number()?;
    let len = to_uint32(n);
    if len as f64 != n {
        return Err(Error::range_error(messages::INVALID_ARRAY_LENGTH));
    }
    Ok(len)
}

/// An Array exotic object
pub struct ArrayObject {
    base: BaseObject,
    state: RefCell<ArrayState>,
}

impl ArrayObject {
    pub fn new(prototype: Option<Object>, sparse_threshold: u32) -> Self {
        ArrayObject {
            base: BaseObject::new(class::ARRAY, prototype),
            state: RefCell::new(ArrayState {
                elements: Elements::Dense(Vec::new()),
                length: 0,
                obj_count: 0,
                prop_value_count: 0,
                length_writable: true,
                sparse_threshold,
            }),
        }
    }

    /// A standard array holding `values`
    pub fn from_values(prototype: Option<Object>, sparse_threshold: u32, values: Vec<Value>) -> Self {
        let array = Self::new(prototype, sparse_threshold);
        array.set_standard_values(values);
        array
    }

    pub fn length(&self) -> u32 {
        self.state.borrow().length
    }

    pub fn is_length_writable(&self) -> bool {
        self.state.borrow().length_writable
    }

    /// Check whether the element store can be read directly
    pub fn is_standard(&self) -> bool {
        let state = self.state.borrow();
        let dense_full = match &state.elements {
            Elements::Dense(values) => values.len() == state.length as usize,
            Elements::Sparse(_) => false,
        };
        dense_full
            && state.prop_value_count == 0
            && state.obj_count == state.length as usize
            && self.base.is_empty()
    }

    /// Check whether the element store can also be mutated directly
    pub fn is_standard_mutable(&self) -> bool {
        self.is_standard() && self.is_length_writable() && self.base.extensible()
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.state.borrow().elements, Elements::Sparse(_))
    }

    /// Snapshot of an element
    pub fn element(&self, idx: u32) -> Option<OwnProperty> {
        self.state.borrow().get(idx).cloned()
    }

    /// The element values of a standard array
    pub fn standard_values(&self) -> Option<Vec<Value>> {
        if !self.is_standard() {
            return None;
        }
        let state = self.state.borrow();
        match &state.elements {
            Elements::Dense(values) => Some(
                values
                    .iter()
                    .map(|slot| slot.as_ref().and_then(|p| p.value().cloned()).unwrap_or_default())
                    .collect(),
            ),
            Elements::Sparse(_) => None,
        }
    }

    /// Replace every element, leaving a standard dense store
    pub fn set_standard_values(&self, values: Vec<Value>) {
        let mut state = self.state.borrow_mut();
        state.length = values.len() as u32;
        state.obj_count = values.len();
        state.prop_value_count = 0;
        state.elements = Elements::Dense(values.into_iter().map(|v| Some(OwnProperty::Plain(v))).collect());
    }

    /// Append to a standard array
    pub fn push_values(&self, values: &[Value]) {
        let mut state = self.state.borrow_mut();
        if let Elements::Dense(store) = &mut state.elements {
            store.extend(values.iter().cloned().map(|v| Some(OwnProperty::Plain(v))));
            state.length += values.len() as u32;
            state.obj_count += values.len();
        }
    }

    /// Remove the last element of a standard array
    pub fn pop_value(&self) -> Option<Value> {
        let mut state = self.state.borrow_mut();
        let Elements::Dense(store) = &mut state.elements else {
            return None;
        };
        let prop = store.pop()??;
        state.length -= 1;
        state.obj_count -= 1;
        prop.value().cloned()
    }

    /// Remove the first element of a standard array
    pub fn shift_value(&self) -> Option<Value> {
        let mut state = self.state.borrow_mut();
        let Elements::Dense(store) = &mut state.elements else {
            return None;
        };
        if store.is_empty() {
            return None;
        }
        let prop = store.remove(0)?;
        state.length -= 1;
        state.obj_count -= 1;
        prop.value().cloned()
    }

    /// Present element indices, ascending
    pub fn present_indices(&self) -> Vec<u32> {
        let state = self.state.borrow();
        let mut indices = state.present_indices_desc(0, u32::MAX);
        indices.reverse();
        indices
    }

    /// Shrink or grow `length`.
    ///
    /// Shrinking deletes from the end and stops at the first non-configurable
    /// element, leaving `length` just above it; that case reports a failure
    /// after the partial deletion.
    fn set_length_unchecked(&self, new_len: u32, throw: bool) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        let mut target = new_len;
        let mut ok = true;
        if new_len < state.length {
            for idx in state.present_indices_desc(new_len, state.length) {
                let configurable = state.get(idx).is_some_and(|p| p.is_configurable());
                if !configurable {
                    target = idx + 1;
                    ok = false;
                    break;
                }
            }
            state.truncate(target);
        }
        state.length = target;
        drop(state);
        if ok {
            Ok(true)
        } else {
            type_error_result(throw, messages::cannot_redefine(&"length"))
        }
    }

    fn set_length(&self, new_len: u32, throw: bool) -> Result<bool> {
        if new_len == self.length() {
            return Ok(true);
        }
        if !self.is_length_writable() {
            return type_error_result(throw, messages::LENGTH_NOT_WRITABLE);
        }
        self.set_length_unchecked(new_len, throw)
    }

    fn set_own_idx(&self, this: &Object, idx: u32, value: Value, throw: bool) -> Result<bool> {
        let key = PropertyKey::Index(idx);
        if let Some(prop) = self.element(idx) {
            if !prop.accepts_assignment() {
                return type_error_result(throw, messages::read_only(&idx));
            }
            if let Some(setter) = prop.setter() {
                setter.call(&Value::Object(this.clone()), &[value])?;
                return Ok(true);
            }
            let mut state = self.state.borrow_mut();
            match state.get_mut(idx) {
                Some(OwnProperty::Plain(v)) => *v = value,
                Some(OwnProperty::Property(p)) => p.kind = PropertyKind::Data(value),
                None => state.put(idx, OwnProperty::Plain(value)),
            }
            return Ok(true);
        }
        if let Some(result) = self.base.set_through_prototype(this, &key, &value, throw)? {
            return Ok(result);
        }
        if !self.base.extensible() {
            return type_error_result(throw, messages::cannot_add_property(&idx));
        }
        if idx >= self.length() && !self.set_length(idx + 1, throw)? {
            return Ok(false);
        }
        self.state.borrow_mut().put(idx, OwnProperty::Plain(value));
        Ok(true)
    }

    fn define_own_idx(&self, idx: u32, desc: &PropertyDescriptor, throw: bool) -> Result<bool> {
        let key = PropertyKey::Index(idx);
        let existing = self.element(idx);
        let Some(prop) = validate_define(&key, existing.as_ref(), self.base.extensible(), desc, throw)? else {
            return Ok(false);
        };
        if idx >= self.length() && !self.set_length(idx + 1, throw)? {
            return Ok(false);
        }
        self.state.borrow_mut().put(idx, prop);
        Ok(true)
    }

    fn define_length(&self, desc: &PropertyDescriptor, throw: bool) -> Result<bool> {
        let new_len = desc.value.as_ref().map(to_array_length).transpose()?;
        let reject = || type_error_result(throw, messages::cannot_redefine(&"length"));
        if desc.configurable == Some(true) || desc.enumerable == Some(true) || desc.is_accessor() {
            return reject();
        }
        let writable = self.is_length_writable();
        if desc.writable == Some(true) && !writable {
            return reject();
        }
        let mut ok = true;
        if let Some(new_len) = new_len {
            if writable {
                ok = self.set_length_unchecked(new_len, false)?;
            } else if new_len != self.length() {
                ok = false;
            }
        }
        if desc.writable == Some(false) {
            self.state.borrow_mut().length_writable = false;
        }
        if ok {
            Ok(true)
        } else {
            reject()
        }
    }

    fn delete_idx(&self, this: &Object, idx: u32, throw: bool) -> Result<bool> {
        match self.element(idx) {
            None => Ok(true),
            Some(prop) if !prop.is_configurable() => {
                type_error_result(throw, messages::cannot_delete(&idx, this))
            }
            Some(_) => {
                self.state.borrow_mut().remove(idx);
                Ok(true)
            }
        }
    }
}

impl ObjectImpl for ArrayObject {
    fn class_name(&self) -> &'static str {
        class::ARRAY
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        Ok(match key {
            PropertyKey::Index(idx) => self.element(*idx),
            _ if key.is_str("length") => Some(self.state.borrow().length_property()),
            _ => self.base.own_property(key),
        })
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        match key {
            PropertyKey::Index(idx) => match self.element(*idx) {
                Some(prop) => read_property(&prop, receiver),
                None => self.base.get_from_prototype(key, receiver),
            },
            _ if key.is_str("length") => Ok(Value::from(self.length())),
            _ => self.base.get_str(key, receiver),
        }
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) => self.set_own_idx(this, *idx, value, throw),
            _ if key.is_str("length") => {
                let new_len = to_array_length(&value)?;
                self.set_length(new_len, throw)
            }
            _ => self.base.set_own_str(this, key, value, throw),
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
        let existing = match key {
            PropertyKey::Index(idx) => self.element(*idx),
            _ if key.is_str("length") => Some(self.state.borrow().length_property()),
            _ => self.base.own_property(key),
        };
        self.base.set_foreign_with(key, existing, value, receiver, throw)
    }

    fn has_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<bool> {
        Ok(match key {
            PropertyKey::Index(idx) => self.state.borrow().get(*idx).is_some(),
            _ if key.is_str("length") => true,
            _ => self.base.own_property(key).is_some(),
        })
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) => self.define_own_idx(*idx, desc, throw),
            _ if key.is_str("length") => self.define_length(desc, throw),
            _ => self.base.define_own_str(key, desc, throw),
        }
    }

    fn delete(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        match key {
            PropertyKey::Index(idx) => self.delete_idx(this, *idx, throw),
            _ if key.is_str("length") => type_error_result(throw, messages::cannot_delete(key, this)),
            _ => self.base.delete_str(this, key, throw),
        }
    }

    fn own_keys(&self, _this: &Object, all: bool) -> Result<Vec<PropertyKey>> {
        let mut keys: Vec<PropertyKey> = {
            let state = self.state.borrow();
            let mut indices = state.present_indices_desc(0, u32::MAX);
            indices.reverse();
            indices
                .into_iter()
                .filter(|&i| all || state.get(i).is_some_and(|p| p.is_enumerable()))
                .map(PropertyKey::Index)
                .collect()
        };
        if all {
            keys.push(PropertyKey::from("length"));
        }
        keys.extend(self.base.ordered_keys(all));
        Ok(keys)
    }

    fn prototype(&self, _this: &Object) -> Result<Option<Object>> {
        Ok(self.base.proto())
    }

    fn set_prototype(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        self.base.set_proto(this, proto, throw)
    }

    fn is_extensible(&self, _this: &Object) -> Result<bool> {
        Ok(self.base.extensible())
    }

    fn prevent_extensions(&self, _this: &Object, _throw: bool) -> Result<bool> {
        self.base.disable_extensions();
        Ok(true)
    }

    fn export(&self, this: &Object, ctx: &mut ExportContext) -> Result<Exported> {
        let receiver = Value::Object(this.clone());
        let len = self.length();
        let mut items = Vec::with_capacity(len.min(1 << 16) as usize);
        for idx in 0..len {
            let value = match self.element(idx) {
                Some(prop) => read_property(&prop, &receiver)?,
                None => Value::Undefined,
            };
            items.push(Exported::from_value(&value, ctx)?);
        }
        Ok(Exported::Array(items))
    }

    fn as_array(&self) -> Option<&ArrayObject> {
        Some(self)
    }

    fn is_array(&self, _this: &Object) -> Result<bool> {
        Ok(true)
    }
}
