//! The object handle and the `ObjectImpl` capability contract
//!
//! Every object backing (ordinary objects, arrays, functions, proxies and the
//! dynamic host adapters) implements [`ObjectImpl`]. Builtins and hosts only
//! ever talk to backings through this trait, via the [`Object`] handle.
//!
//! Backings keep their state behind `RefCell`s and never hold a borrow while
//! calling out to user code (getters, setters, traps, host handlers), so any
//! callback may freely re-enter the object it was invoked from.

use crate::error::{messages, type_error_result, Error, Result};
use crate::runtime::array::ArrayObject;
use crate::runtime::property::{Attributes, OwnProperty, PropertyDescriptor, PropertyKey};
use crate::runtime::symbol::Symbol;
use crate::runtime::value::{PreferredType, Value, MAX_SAFE_INTEGER};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Object class tags
pub mod class {
    pub const OBJECT: &str = "Object";
    pub const ARRAY: &str = "Array";
    pub const FUNCTION: &str = "Function";
    pub const BOOLEAN: &str = "Boolean";
    pub const NUMBER: &str = "Number";
    pub const STRING: &str = "String";
    pub const SYMBOL: &str = "Symbol";
    pub const ERROR: &str = "Error";
}

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

struct ObjectCell {
    id: u64,
    imp: Box<dyn ObjectImpl>,
}

/// A reference to a JavaScript object.
///
/// Cloning the handle shares the object. Equality and hashing use the
/// object's identity.
#[derive(Clone)]
pub struct Object(Rc<ObjectCell>);

/// The capability set every object backing implements.
///
/// All operations receive `this`, the handle of the object being operated on,
/// so a backing can pass itself on as a receiver or compare identities.
/// Mutating operations take a `throw` flag: with `throw == false` a failure is
/// reported as `Ok(false)`, otherwise as a TypeError.
pub trait ObjectImpl: 'static {
    /// Class tag ("Object", "Array", "Function", ...)
    fn class_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// The own property stored under `key`, if any
    fn get_own_property(&self, this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>>;

    /// [[Get]]. Accessors are invoked with `receiver` as `this`.
    fn get(&self, this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value>;

    /// [[Set]] with the receiver being the object itself
    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool>;

    /// [[Set]] reached while walking the prototype chain of `receiver`.
    ///
    /// Returns `(result, handled)`. `handled == false` means the property is
    /// either absent or a writable data property, and the caller must create
    /// or update the property on the receiver itself.
    fn set_foreign(
        &self,
        this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)>;

    /// [[HasProperty]]
    fn has_property(&self, this: &Object, key: &PropertyKey) -> Result<bool> {
        if self.has_own_property(this, key)? {
            return Ok(true);
        }
        match self.prototype(this)? {
            Some(proto) => proto.has_property(key),
            None => Ok(false),
        }
    }

    fn has_own_property(&self, this: &Object, key: &PropertyKey) -> Result<bool> {
        Ok(self.get_own_property(this, key)?.is_some())
    }

    /// [[DefineOwnProperty]]
    fn define_own_property(
        &self,
        this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool>;

    /// [[Delete]]
    fn delete(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool>;

    /// [[OwnPropertyKeys]]: index keys ascending, other strings in insertion
    /// order, then symbols in insertion order. With `all == false` only
    /// enumerable keys are returned.
    fn own_keys(&self, this: &Object, all: bool) -> Result<Vec<PropertyKey>>;

    /// [[GetPrototypeOf]]
    fn prototype(&self, this: &Object) -> Result<Option<Object>>;

    /// [[SetPrototypeOf]]
    fn set_prototype(&self, this: &Object, proto: Option<Object>, throw: bool) -> Result<bool>;

    fn is_extensible(&self, this: &Object) -> Result<bool>;

    fn prevent_extensions(&self, this: &Object, throw: bool) -> Result<bool>;

    fn to_primitive(&self, this: &Object, hint: PreferredType) -> Result<Value> {
        ordinary_to_primitive(this, hint)
    }

    fn is_callable(&self) -> bool {
        false
    }

    fn is_constructor(&self) -> bool {
        false
    }

    /// [[Call]]
    fn call(&self, this: &Object, _this_arg: &Value, _args: &[Value]) -> Result<Value> {
        Err(Error::type_error(messages::not_a_function(this)))
    }

    /// [[Construct]]
    fn construct(&self, this: &Object, _args: &[Value], _new_target: &Object) -> Result<Object> {
        Err(Error::type_error(messages::not_a_constructor(this)))
    }

    /// Snapshot into a host representation
    fn export(&self, this: &Object, ctx: &mut ExportContext) -> Result<Exported>;

    /// The array backing, used by builtins to detect fast-path candidates
    fn as_array(&self) -> Option<&ArrayObject> {
        None
    }

    /// Whether this object is an Array exotic object (IsArray)
    fn is_array(&self, _this: &Object) -> Result<bool> {
        Ok(false)
    }
}

impl Object {
    /// Wrap a backing into a new object with a fresh identity
    pub fn new(imp: impl ObjectImpl) -> Self {
        Object(Rc::new(ObjectCell {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            imp: Box::new(imp),
        }))
    }

    /// The unique identity of this object
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The backing implementation
    pub fn imp(&self) -> &dyn ObjectImpl {
        &*self.0.imp
    }

    /// Downcast the backing to a concrete type
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.imp.as_any().downcast_ref::<T>()
    }

    pub fn class_name(&self) -> &'static str {
        self.0.imp.class_name()
    }

    /// The array backing, if this is an array
    pub fn as_array(&self) -> Option<&ArrayObject> {
        self.0.imp.as_array()
    }

    pub fn get(&self, key: impl Into<PropertyKey>) -> Result<Value> {
        self.0.imp.get(self, &key.into(), &Value::Object(self.clone()))
    }

    pub fn get_with_receiver(&self, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        self.0.imp.get(self, key, receiver)
    }

    pub fn get_own_property(&self, key: impl Into<PropertyKey>) -> Result<Option<OwnProperty>> {
        self.0.imp.get_own_property(self, &key.into())
    }

    /// The complete descriptor of an own property
    pub fn get_own_property_descriptor(
        &self,
        key: impl Into<PropertyKey>,
    ) -> Result<Option<PropertyDescriptor>> {
        Ok(self.get_own_property(key)?.map(|p| p.to_descriptor()))
    }

    /// Assign with this object as the receiver
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>, throw: bool) -> Result<bool> {
        self.0.imp.set_own(self, &key.into(), value.into(), throw)
    }

    /// [[Set]] with an explicit receiver.
    ///
    /// When the receiver is another value, the foreign-set protocol runs: an
    /// accessor or read-only property found on this object's chain decides the
    /// outcome, otherwise the value lands on the receiver as an own property.
    pub fn set_with_receiver(
        &self,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<bool> {
        if let Value::Object(r) = receiver {
            if r == self {
                return self.0.imp.set_own(self, key, value, throw);
            }
        }
        let (result, handled) = self.0.imp.set_foreign(self, key, value.clone(), receiver, throw)?;
        if handled {
            return Ok(result);
        }
        let Value::Object(robj) = receiver else {
            return type_error_result(throw, format!("Receiver is not an object: {}", receiver));
        };
        match robj.get_own_property(key)? {
            Some(existing) => {
                if existing.is_accessor() {
                    return type_error_result(throw, messages::receiver_accessor(key));
                }
                if !existing.is_writable() {
                    return type_error_result(throw, messages::read_only(key));
                }
                robj.define_own_property(key, &PropertyDescriptor::value_only(value), throw)
            }
            None => robj.define_own_property(
                key,
                &PropertyDescriptor::data(value, Attributes::all()),
                throw,
            ),
        }
    }

    pub fn has_property(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        self.0.imp.has_property(self, &key.into())
    }

    pub fn has_own_property(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        self.0.imp.has_own_property(self, &key.into())
    }

    pub fn define_own_property(
        &self,
        key: impl Into<PropertyKey>,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        self.0.imp.define_own_property(self, &key.into(), desc, throw)
    }

    /// Define a data property with explicit attributes
    pub fn define_data_property(
        &self,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
        attributes: Attributes,
        throw: bool,
    ) -> Result<bool> {
        self.define_own_property(key, &PropertyDescriptor::data(value, attributes), throw)
    }

    /// Define an accessor property with explicit attributes
    pub fn define_accessor_property(
        &self,
        key: impl Into<PropertyKey>,
        getter: Option<Object>,
        setter: Option<Object>,
        attributes: Attributes,
        throw: bool,
    ) -> Result<bool> {
        self.define_own_property(key, &PropertyDescriptor::accessor(getter, setter, attributes), throw)
    }

    /// CreateDataPropertyOrThrow
    pub fn create_data_property_or_throw(
        &self,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
    ) -> Result<bool> {
        self.define_data_property(key, value, Attributes::all(), true)
    }

    pub fn delete(&self, key: impl Into<PropertyKey>, throw: bool) -> Result<bool> {
        self.0.imp.delete(self, &key.into(), throw)
    }

    /// All own keys, including non-enumerable ones and symbols
    pub fn own_property_keys(&self) -> Result<Vec<PropertyKey>> {
        self.0.imp.own_keys(self, true)
    }

    /// Own string keys (Object.getOwnPropertyNames)
    pub fn own_property_names(&self) -> Result<Vec<PropertyKey>> {
        Ok(self
            .0
            .imp
            .own_keys(self, true)?
            .into_iter()
            .filter(|k| !k.is_symbol())
            .collect())
    }

    /// Own symbol keys (Object.getOwnPropertySymbols)
    pub fn own_property_symbols(&self) -> Result<Vec<PropertyKey>> {
        Ok(self
            .0
            .imp
            .own_keys(self, true)?
            .into_iter()
            .filter(|k| k.is_symbol())
            .collect())
    }

    /// Enumerable own string keys (Object.keys)
    pub fn keys(&self) -> Result<Vec<PropertyKey>> {
        Ok(self
            .0
            .imp
            .own_keys(self, false)?
            .into_iter()
            .filter(|k| !k.is_symbol())
            .collect())
    }

    /// The keys a for-in loop visits: enumerable string keys of the object and
    /// its prototypes, each name at most once, shadowed names skipped.
    pub fn for_in_keys(&self) -> Result<Vec<PropertyKey>> {
        let mut seen: FxHashSet<PropertyKey> = FxHashSet::default();
        let mut out = Vec::new();
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            for key in obj.own_property_names()? {
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(prop) = obj.get_own_property(&key)? {
                    if prop.is_enumerable() {
                        out.push(key);
                    }
                }
            }
            current = obj.prototype()?;
        }
        Ok(out)
    }

    pub fn prototype(&self) -> Result<Option<Object>> {
        self.0.imp.prototype(self)
    }

    pub fn set_prototype(&self, proto: Option<Object>, throw: bool) -> Result<bool> {
        self.0.imp.set_prototype(self, proto, throw)
    }

    pub fn is_extensible(&self) -> Result<bool> {
        self.0.imp.is_extensible(self)
    }

    pub fn prevent_extensions(&self, throw: bool) -> Result<bool> {
        self.0.imp.prevent_extensions(self, throw)
    }

    pub fn to_primitive(&self, hint: PreferredType) -> Result<Value> {
        self.0.imp.to_primitive(self, hint)
    }

    pub fn is_callable(&self) -> bool {
        self.0.imp.is_callable()
    }

    pub fn is_constructor(&self) -> bool {
        self.0.imp.is_constructor()
    }

    /// IsArray (sees through proxies)
    pub fn is_array(&self) -> Result<bool> {
        self.0.imp.is_array(self)
    }

    /// Call this object as a function
    pub fn call(&self, this_arg: &Value, args: &[Value]) -> Result<Value> {
        self.0.imp.call(self, this_arg, args)
    }

    /// Construct with this object as constructor. `new_target` defaults to self.
    pub fn construct(&self, args: &[Value], new_target: Option<&Object>) -> Result<Object> {
        self.0.imp.construct(self, args, new_target.unwrap_or(self))
    }

    /// GetMethod: `Ok(None)` for undefined/null, TypeError for non-callables
    pub fn get_method(&self, key: impl Into<PropertyKey>) -> Result<Option<Object>> {
        let key = key.into();
        match self.get(&key)? {
            Value::Undefined | Value::Null => Ok(None),
            Value::Object(f) if f.is_callable() => Ok(Some(f)),
            other => Err(Error::type_error(messages::not_a_function(&format!(
                "{} ({})",
                other, key
            )))),
        }
    }

    /// LengthOfArrayLike
    pub fn length_of_array_like(&self) -> Result<i64> {
        self.get("length")?.to_length()
    }

    /// Snapshot into a host representation
    pub fn export(&self) -> Result<Exported> {
        let mut ctx = ExportContext::default();
        self.export_with(&mut ctx)
    }

    /// Export, sharing cycle detection with an outer export
    pub fn export_with(&self, ctx: &mut ExportContext) -> Result<Exported> {
        if !ctx.visiting.insert(self.id()) {
            return Ok(Exported::Circular);
        }
        let result = self.0.imp.export(self, ctx);
        ctx.visiting.remove(&self.id());
        result
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]#{}", self.class_name(), self.id())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class_name())
    }
}

/// OrdinaryToPrimitive, preceded by the `@@toPrimitive` lookup
pub fn ordinary_to_primitive(this: &Object, hint: PreferredType) -> Result<Value> {
    let this_value = Value::Object(this.clone());
    if let Some(exotic) = this.get_method(Symbol::to_primitive())? {
        let result = exotic.call(&this_value, &[Value::from(hint.as_str())])?;
        if result.is_object() {
            return Err(Error::type_error(messages::OBJECT_TO_PRIMITIVE));
        }
        return Ok(result);
    }
    let order = if hint == PreferredType::String {
        ["toString", "valueOf"]
    } else {
        ["valueOf", "toString"]
    };
    for name in order {
        if let Value::Object(method) = this.get(name)? {
            if method.is_callable() {
                let result = method.call(&this_value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
    }
    Err(Error::type_error(messages::OBJECT_TO_PRIMITIVE))
}

/// Clamp a relative index argument into `[0, len]`
pub fn relative_index(rel: f64, len: i64) -> i64 {
    if rel >= 0.0 {
        if rel >= len as f64 {
            len
        } else {
            rel as i64
        }
    } else {
        let from_end = len as f64 + rel;
        if from_end <= 0.0 {
            0
        } else {
            from_end as i64
        }
    }
}

/// Tracks objects on the current export path
#[derive(Default)]
pub struct ExportContext {
    visiting: FxHashSet<u64>,
}

/// A host-side snapshot of a value
#[derive(Clone)]
pub enum Exported {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Symbol(Symbol),
    /// Arrays export element-wise; holes export as `Undefined`
    Array(Vec<Exported>),
    /// Ordinary objects export their enumerable string-keyed properties
    Map(IndexMap<String, Exported>),
    /// Functions and proxies stay live
    Live(Object),
    /// Dynamic adapters hand back their host handler
    Host(Rc<dyn Any>),
    /// An object already being exported higher up the path
    Circular,
}

impl Exported {
    /// Export a value
    pub fn from_value(value: &Value, ctx: &mut ExportContext) -> Result<Exported> {
        Ok(match value {
            Value::Undefined => Exported::Undefined,
            Value::Null => Exported::Null,
            Value::Bool(b) => Exported::Bool(*b),
            Value::Int(i) => Exported::Int(*i),
            Value::Float(f) => Exported::Float(*f),
            Value::String(s) => Exported::String(s.to_string()),
            Value::Symbol(sym) => Exported::Symbol(sym.clone()),
            Value::Object(obj) => obj.export_with(ctx)?,
        })
    }

    /// Downcast a `Host` export to the handler type
    pub fn host<T: 'static>(&self) -> Option<&T> {
        match self {
            Exported::Host(handler) => handler.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Exported]> {
        match self {
            Exported::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Exported>> {
        match self {
            Exported::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Debug for Exported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exported::Undefined => write!(f, "Undefined"),
            Exported::Null => write!(f, "Null"),
            Exported::Bool(b) => write!(f, "Bool({})", b),
            Exported::Int(i) => write!(f, "Int({})", i),
            Exported::Float(n) => write!(f, "Float({})", n),
            Exported::String(s) => write!(f, "String({:?})", s),
            Exported::Symbol(sym) => write!(f, "Symbol({:?})", sym),
            Exported::Array(items) => f.debug_list().entries(items).finish(),
            Exported::Map(map) => f.debug_map().entries(map.iter()).finish(),
            Exported::Live(obj) => write!(f, "Live({:?})", obj),
            Exported::Host(_) => write!(f, "Host(..)"),
            Exported::Circular => write!(f, "Circular"),
        }
    }
}

impl PartialEq for Exported {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Exported::Undefined, Exported::Undefined) => true,
            (Exported::Null, Exported::Null) => true,
            (Exported::Bool(a), Exported::Bool(b)) => a == b,
            (Exported::Int(a), Exported::Int(b)) => a == b,
            (Exported::Float(a), Exported::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Exported::Int(a), Exported::Float(b)) | (Exported::Float(b), Exported::Int(a)) => {
                *a as f64 == *b
            }
            (Exported::String(a), Exported::String(b)) => a == b,
            (Exported::Symbol(a), Exported::Symbol(b)) => a == b,
            (Exported::Array(a), Exported::Array(b)) => a == b,
            (Exported::Map(a), Exported::Map(b)) => a == b,
            (Exported::Live(a), Exported::Live(b)) => a == b,
            (Exported::Host(a), Exported::Host(b)) => Rc::ptr_eq(a, b),
            (Exported::Circular, Exported::Circular) => true,
            _ => false,
        }
    }
}

impl Serialize for Exported {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Exported::Undefined | Exported::Null | Exported::Host(_) | Exported::Circular => {
                serializer.serialize_unit()
            }
            Exported::Bool(b) => serializer.serialize_bool(*b),
            Exported::Int(i) => serializer.serialize_i64(*i),
            Exported::Float(n) => serializer.serialize_f64(*n),
            Exported::String(s) => serializer.serialize_str(s),
            Exported::Symbol(sym) => serializer.serialize_str(&sym.to_string()),
            Exported::Live(obj) => serializer.serialize_str(&obj.to_string()),
            Exported::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Exported::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Number of elements an array-like reports, rejecting lengths past 2^53 - 1
pub(crate) fn check_length(len: i64) -> Result<i64> {
    if len > MAX_SAFE_INTEGER {
        Err(Error::type_error(messages::INVALID_ARRAY_LENGTH))
    } else {
        Ok(len)
    }
}
