//! Ordinary objects
//!
//! `BaseObject` implements the ordinary-object algorithms over an
//! insertion-ordered property map. Arrays, functions and primitive wrappers
//! embed a `BaseObject` for their non-exotic properties and reuse its
//! prototype and foreign-set helpers.

use crate::error::{messages, type_error_result, Result};
use crate::runtime::object::{ExportContext, Exported, Object, ObjectImpl};
use crate::runtime::property::{
    apply_descriptor, DefineRejection, OwnProperty, PropertyDescriptor, PropertyKey, PropertyKind,
};
use crate::runtime::proxy::ProxyObject;
use crate::runtime::symbol::Symbol;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::any::Any;
use std::cell::RefCell;

type PropertyMap<K> = IndexMap<K, OwnProperty, FxBuildHasher>;

struct BaseState {
    class: &'static str,
    prototype: Option<Object>,
    extensible: bool,
    /// String and index keys in insertion order, index keys lazily moved to
    /// the front on enumeration
    values: PropertyMap<PropertyKey>,
    /// Length of the prefix of `values` that is already in enumeration order
    sorted_len: usize,
    /// Number of index keys at the front of the sorted prefix
    index_count: usize,
    symbols: PropertyMap<Symbol>,
    /// Wrapped primitive for Boolean/Number/String/Symbol objects
    primitive: Option<Value>,
}

impl BaseState {
    fn lookup(&self, key: &PropertyKey) -> Option<&OwnProperty> {
        match key {
            PropertyKey::Symbol(sym) => self.symbols.get(sym),
            _ => self.values.get(key),
        }
    }

    /// Insert or replace in place, keeping the key's position
    fn store(&mut self, key: &PropertyKey, prop: OwnProperty) {
        match key {
            PropertyKey::Symbol(sym) => {
                self.symbols.insert(sym.clone(), prop);
            }
            _ => {
                self.values.insert(key.clone(), prop);
            }
        }
    }

    fn remove(&mut self, key: &PropertyKey) {
        if let PropertyKey::Symbol(sym) = key {
            self.symbols.shift_remove(sym);
            return;
        }
        if let Some((pos, _, _)) = self.values.shift_remove_full(key) {
            if pos < self.sorted_len {
                self.sorted_len -= 1;
                if pos < self.index_count {
                    self.index_count -= 1;
                }
            }
        }
    }

    /// Move index keys appended since the last enumeration into the sorted
    /// index prefix.
    fn fix_prop_order(&mut self) {
        for i in self.sorted_len..self.values.len() {
            let Some((PropertyKey::Index(idx), _)) = self.values.get_index(i) else {
                continue;
            };
            let idx = *idx;
            let (mut lo, mut hi) = (0, self.index_count);
            while lo < hi {
                let mid = (lo + hi) / 2;
                match self.values.get_index(mid) {
                    Some((PropertyKey::Index(m), _)) if *m < idx => lo = mid + 1,
                    _ => hi = mid,
                }
            }
            if lo != i {
                self.values.move_index(i, lo);
            }
            self.index_count += 1;
        }
        self.sorted_len = self.values.len();
    }
}

/// Read a property found on some object, invoking a getter with `receiver`.
pub(crate) fn read_property(prop: &OwnProperty, receiver: &Value) -> Result<Value> {
    match prop {
        OwnProperty::Plain(v) => Ok(v.clone()),
        OwnProperty::Property(p) => match &p.kind {
            PropertyKind::Data(v) => Ok(v.clone()),
            PropertyKind::Accessor { getter, .. } => match getter {
                Some(getter) => getter.call(receiver, &[]),
                None => Ok(Value::Undefined),
            },
        },
    }
}

/// Run the descriptor merge for `key`, reporting a rejection per `throw`.
///
/// `Ok(None)` is a soft failure.
pub(crate) fn validate_define(
    key: &PropertyKey,
    current: Option<&OwnProperty>,
    extensible: bool,
    desc: &PropertyDescriptor,
    throw: bool,
) -> Result<Option<OwnProperty>> {
    match apply_descriptor(current, extensible, desc) {
        Ok(prop) => Ok(Some(prop)),
        Err(DefineRejection::NotExtensible) => {
            type_error_result(throw, messages::cannot_define_property(key)).map(|_| None)
        }
        Err(DefineRejection::Redefine) => {
            type_error_result(throw, messages::cannot_redefine(key)).map(|_| None)
        }
    }
}

/// Offer an assignment to `proto`'s chain on behalf of `this`, which has no
/// own property `key`.
pub(crate) fn set_through_prototype(
    proto: Option<Object>,
    this: &Object,
    key: &PropertyKey,
    value: &Value,
    throw: bool,
) -> Result<Option<bool>> {
    if let Some(proto) = proto {
        let receiver = Value::Object(this.clone());
        let (result, handled) = proto.imp().set_foreign(&proto, key, value.clone(), &receiver, throw)?;
        if handled {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

/// One step of the foreign-set walk: an accessor or a read-only property
/// handles the assignment, a writable data property leaves it to the
/// receiver, an absent property defers to `proto`.
pub(crate) fn set_foreign_step(
    proto: Option<Object>,
    key: &PropertyKey,
    existing: Option<OwnProperty>,
    value: Value,
    receiver: &Value,
    throw: bool,
) -> Result<(bool, bool)> {
    match existing {
        Some(prop) => {
            if !prop.accepts_assignment() {
                return Ok((type_error_result(throw, messages::read_only(key))?, true));
            }
            if let Some(setter) = prop.setter() {
                setter.call(receiver, &[value])?;
                return Ok((true, true));
            }
            Ok((false, false))
        }
        None => match proto {
            Some(proto) => {
                if receiver.as_object() == Some(&proto) {
                    Ok((proto.set(key, value, throw)?, true))
                } else {
                    proto.imp().set_foreign(&proto, key, value, receiver, throw)
                }
            }
            None => Ok((false, false)),
        },
    }
}

/// Reject a prototype that would put `this` on its own chain. The walk
/// stops at a proxy.
pub(crate) fn check_proto_cycle(this: &Object, proto: Option<&Object>, throw: bool) -> Result<bool> {
    let mut p = proto.cloned();
    while let Some(current) = p {
        if &current == this {
            return type_error_result(throw, messages::CYCLIC_PROTO);
        }
        if current.downcast_ref::<ProxyObject>().is_some() {
            break;
        }
        p = current.prototype()?;
    }
    Ok(true)
}

/// An ordinary object
pub struct BaseObject {
    state: RefCell<BaseState>,
}

impl BaseObject {
    pub fn new(class: &'static str, prototype: Option<Object>) -> Self {
        BaseObject {
            state: RefCell::new(BaseState {
                class,
                prototype,
                extensible: true,
                values: PropertyMap::default(),
                sorted_len: 0,
                index_count: 0,
                symbols: PropertyMap::default(),
                primitive: None,
            }),
        }
    }

    /// A wrapper object around a primitive value
    pub fn with_primitive(class: &'static str, prototype: Option<Object>, primitive: Value) -> Self {
        let base = Self::new(class, prototype);
        base.state.borrow_mut().primitive = Some(primitive);
        base
    }

    pub fn class(&self) -> &'static str {
        self.state.borrow().class
    }

    /// The wrapped primitive, if this is a wrapper object
    pub fn primitive(&self) -> Option<Value> {
        self.state.borrow().primitive.clone()
    }

    pub fn proto(&self) -> Option<Object> {
        self.state.borrow().prototype.clone()
    }

    pub fn extensible(&self) -> bool {
        self.state.borrow().extensible
    }

    /// Check whether there are no own properties at all
    pub fn is_empty(&self) -> bool {
        let state = self.state.borrow();
        state.values.is_empty() && state.symbols.is_empty()
    }

    /// Snapshot of an own property
    pub fn own_property(&self, key: &PropertyKey) -> Option<OwnProperty> {
        self.state.borrow().lookup(key).cloned()
    }

    /// Store a property unconditionally (intrinsic setup)
    pub(crate) fn put(&self, key: impl Into<PropertyKey>, prop: OwnProperty) {
        self.state.borrow_mut().store(&key.into(), prop);
    }

    /// Look `key` up on the prototype chain only
    pub fn get_from_prototype(&self, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        match self.proto() {
            Some(proto) => proto.get_with_receiver(key, receiver),
            None => Ok(Value::Undefined),
        }
    }

    pub fn get_str(&self, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        match self.own_property(key) {
            Some(prop) => read_property(&prop, receiver),
            None => self.get_from_prototype(key, receiver),
        }
    }

    /// Offer an assignment of an absent own property to the prototype chain.
    ///
    /// `Some(result)` means an accessor or read-only property up the chain
    /// decided the outcome; `None` means a new own property should be created.
    pub fn set_through_prototype(
        &self,
        this: &Object,
        key: &PropertyKey,
        value: &Value,
        throw: bool,
    ) -> Result<Option<bool>> {
        set_through_prototype(self.proto(), this, key, value, throw)
    }

    /// Assign through an existing own property (a writable data property or
    /// an accessor with a setter).
    fn assign_existing(
        &self,
        this: &Object,
        key: &PropertyKey,
        prop: &OwnProperty,
        value: Value,
        throw: bool,
    ) -> Result<bool> {
        if !prop.accepts_assignment() {
            return type_error_result(throw, messages::read_only(key));
        }
        if let Some(setter) = prop.setter() {
            setter.call(&Value::Object(this.clone()), &[value])?;
            return Ok(true);
        }
        let updated = {
            let mut state = self.state.borrow_mut();
            let slot = match key {
                PropertyKey::Symbol(sym) => state.symbols.get_mut(sym),
                _ => state.values.get_mut(key),
            };
            match slot {
                Some(OwnProperty::Plain(v)) => {
                    *v = value.clone();
                    true
                }
                Some(OwnProperty::Property(p)) => {
                    p.kind = PropertyKind::Data(value.clone());
                    true
                }
                None => false,
            }
        };
        if updated {
            Ok(true)
        } else {
            self.create_own(key, value, throw)
        }
    }

    fn create_own(&self, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        let mut state = self.state.borrow_mut();
        if !state.extensible {
            drop(state);
            return type_error_result(throw, messages::cannot_add_property(key));
        }
        state.store(key, OwnProperty::Plain(value));
        Ok(true)
    }

    pub fn set_own_str(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        match self.own_property(key) {
            Some(prop) => self.assign_existing(this, key, &prop, value, throw),
            None => {
                if let Some(result) = self.set_through_prototype(this, key, &value, throw)? {
                    return Ok(result);
                }
                self.create_own(key, value, throw)
            }
        }
    }

    /// The foreign-set step for a property `existing` found (or not) on this
    /// object while assigning to `receiver`.
    pub fn set_foreign_with(
        &self,
        key: &PropertyKey,
        existing: Option<OwnProperty>,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        set_foreign_step(self.proto(), key, existing, value, receiver, throw)
    }

    pub fn define_own_str(&self, key: &PropertyKey, desc: &PropertyDescriptor, throw: bool) -> Result<bool> {
        let outcome = {
            let state = self.state.borrow();
            validate_define(key, state.lookup(key), state.extensible, desc, throw)?
        };
        match outcome {
            Some(prop) => {
                self.state.borrow_mut().store(key, prop);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete_str(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        let configurable = self.state.borrow().lookup(key).map(|p| p.is_configurable());
        match configurable {
            None => Ok(true),
            Some(false) => type_error_result(throw, messages::cannot_delete(key, this)),
            Some(true) => {
                self.state.borrow_mut().remove(key);
                Ok(true)
            }
        }
    }

    /// Own keys in enumeration order
    pub fn ordered_keys(&self, all: bool) -> Vec<PropertyKey> {
        let mut state = self.state.borrow_mut();
        state.fix_prop_order();
        let mut keys: Vec<PropertyKey> = state
            .values
            .iter()
            .filter(|(_, p)| all || p.is_enumerable())
            .map(|(k, _)| k.clone())
            .collect();
        keys.extend(
            state
                .symbols
                .iter()
                .filter(|(_, p)| all || p.is_enumerable())
                .map(|(s, _)| PropertyKey::Symbol(s.clone())),
        );
        keys
    }

    pub fn set_proto(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        {
            let state = self.state.borrow();
            if state.prototype == proto {
                return Ok(true);
            }
            if !state.extensible {
                drop(state);
                return type_error_result(throw, messages::not_extensible(this));
            }
        }
        if !check_proto_cycle(this, proto.as_ref(), throw)? {
            return Ok(false);
        }
        self.state.borrow_mut().prototype = proto;
        Ok(true)
    }

    pub fn disable_extensions(&self) {
        self.state.borrow_mut().extensible = false;
    }

    /// Export the enumerable string-keyed properties as a map
    pub fn export_map(&self, this: &Object, ctx: &mut ExportContext) -> Result<Exported> {
        let receiver = Value::Object(this.clone());
        let mut map = IndexMap::new();
        for key in self.ordered_keys(false) {
            if key.is_symbol() {
                continue;
            }
            let Some(prop) = self.own_property(&key) else {
                continue;
            };
            let value = read_property(&prop, &receiver)?;
            map.insert(key.to_string(), Exported::from_value(&value, ctx)?);
        }
        Ok(Exported::Map(map))
    }
}

impl ObjectImpl for BaseObject {
    fn class_name(&self) -> &'static str {
        self.class()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        Ok(self.own_property(key))
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        self.get_str(key, receiver)
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        self.set_own_str(this, key, value, throw)
    }

    fn set_foreign(
        &self,
        _this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        self.set_foreign_with(key, self.own_property(key), value, receiver, throw)
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        self.define_own_str(key, desc, throw)
    }

    fn delete(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        self.delete_str(this, key, throw)
    }

    fn own_keys(&self, _this: &Object, all: bool) -> Result<Vec<PropertyKey>> {
        Ok(self.ordered_keys(all))
    }

    fn prototype(&self, _this: &Object) -> Result<Option<Object>> {
        Ok(self.proto())
    }

    fn set_prototype(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        self.set_proto(this, proto, throw)
    }

    fn is_extensible(&self, _this: &Object) -> Result<bool> {
        Ok(self.extensible())
    }

    fn prevent_extensions(&self, _this: &Object, _throw: bool) -> Result<bool> {
        self.disable_extensions();
        Ok(true)
    }

    fn export(&self, this: &Object, ctx: &mut ExportContext) -> Result<Exported> {
        match self.primitive() {
            Some(primitive) => Exported::from_value(&primitive, ctx),
            None => self.export_map(this, ctx),
        }
    }
}
