//! Property keys, property records and descriptors
//!
//! The descriptor merge (`apply_descriptor`) is shared by every backing that
//! stores attributes, and by the proxy invariant checks.

use crate::error::{Error, Result};
use crate::runtime::object::Object;
use crate::runtime::symbol::Symbol;
use crate::runtime::value::{JsString, Value};
use bitflags::bitflags;
use std::fmt;

/// A property key
///
/// Strings that are canonical array indices (`"0"`, `"17"`, but not `"017"`)
/// are always represented as `Index`; construct keys through the `From`
/// impls to keep that normalization.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Canonical array index, `0 ..= 2^32 - 2`
    Index(u32),
    /// Any other string
    String(JsString),
    /// Symbol key
    Symbol(Symbol),
}

/// Parse a canonical array index: `^(0|[1-9][0-9]*)$` below `2^32 - 1`.
pub fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes[0] == b'0' {
        return (bytes.len() == 1).then_some(0);
    }
    let mut n: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        n = n * 10 + (b - b'0') as u64;
    }
    (n < u32::MAX as u64).then_some(n as u32)
}

impl PropertyKey {
    /// The array index, if this key is one
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// The symbol, if this key is one
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            PropertyKey::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// Check if this key is a symbol
    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// Check if this key is the string `s`
    pub fn is_str(&self, s: &str) -> bool {
        matches!(self, PropertyKey::String(k) if &**k == s)
    }

    /// The key as a JS value (indices become strings)
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::Index(i) => Value::String(i.to_string().into()),
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(sym) => Value::Symbol(sym.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        match parse_array_index(s) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(s.into()),
        }
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::from(s.as_str())
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        match parse_array_index(&s) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        if idx == u32::MAX {
            PropertyKey::String(idx.to_string().into())
        } else {
            PropertyKey::Index(idx)
        }
    }
}

impl From<i64> for PropertyKey {
    fn from(idx: i64) -> Self {
        if (0..u32::MAX as i64).contains(&idx) {
            PropertyKey::Index(idx as u32)
        } else {
            PropertyKey::String(idx.to_string().into())
        }
    }
}

impl From<i32> for PropertyKey {
    fn from(idx: i32) -> Self {
        PropertyKey::from(idx as i64)
    }
}

impl From<usize> for PropertyKey {
    fn from(idx: usize) -> Self {
        PropertyKey::from(idx as i64)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(sym: Symbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl From<&Symbol> for PropertyKey {
    fn from(sym: &Symbol) -> Self {
        PropertyKey::Symbol(sym.clone())
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Symbol(sym) => write!(f, "{}", sym),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::String(s) => write!(f, "{:?}", s),
            PropertyKey::Symbol(sym) => write!(f, "{}", sym),
        }
    }
}

bitflags! {
    /// Property attributes. Accessor properties never carry `WRITABLE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        const WRITABLE = 0b001;
        const ENUMERABLE = 0b010;
        const CONFIGURABLE = 0b100;
    }
}

/// The value half of a property record
#[derive(Clone, Debug)]
pub enum PropertyKind {
    Data(Value),
    Accessor {
        getter: Option<Object>,
        setter: Option<Object>,
    },
}

/// A full property record
#[derive(Clone, Debug)]
pub struct Property {
    pub kind: PropertyKind,
    pub attributes: Attributes,
}

impl Property {
    /// Build a data property
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Property {
            kind: PropertyKind::Data(value),
            attributes,
        }
    }

    /// Build an accessor property
    pub fn accessor(getter: Option<Object>, setter: Option<Object>, attributes: Attributes) -> Self {
        Property {
            kind: PropertyKind::Accessor { getter, setter },
            attributes: attributes - Attributes::WRITABLE,
        }
    }
}

/// An own property as stored by a backing.
///
/// `Plain` is the unboxed form of a data property whose attributes are all
/// true; it behaves exactly like the equivalent `Property`.
#[derive(Clone, Debug)]
pub enum OwnProperty {
    Plain(Value),
    Property(Property),
}

impl OwnProperty {
    /// Store a property, unboxing it when all attributes are true
    pub fn from_property(prop: Property) -> Self {
        match prop.kind {
            PropertyKind::Data(value) if prop.attributes == Attributes::all() => {
                OwnProperty::Plain(value)
            }
            _ => OwnProperty::Property(prop),
        }
    }

    /// Check if this is stored unboxed
    pub fn is_plain(&self) -> bool {
        matches!(self, OwnProperty::Plain(_))
    }

    pub fn attributes(&self) -> Attributes {
        match self {
            OwnProperty::Plain(_) => Attributes::all(),
            OwnProperty::Property(p) => p.attributes,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(
            self,
            OwnProperty::Property(Property {
                kind: PropertyKind::Accessor { .. },
                ..
            })
        )
    }

    /// The `[[Writable]]` attribute (always false for accessors)
    pub fn is_writable(&self) -> bool {
        self.attributes().contains(Attributes::WRITABLE)
    }

    pub fn is_enumerable(&self) -> bool {
        self.attributes().contains(Attributes::ENUMERABLE)
    }

    pub fn is_configurable(&self) -> bool {
        self.attributes().contains(Attributes::CONFIGURABLE)
    }

    /// Whether an assignment through this property can succeed: a writable
    /// data property or an accessor with a setter.
    pub fn accepts_assignment(&self) -> bool {
        match self {
            OwnProperty::Plain(_) => true,
            OwnProperty::Property(p) => match &p.kind {
                PropertyKind::Data(_) => p.attributes.contains(Attributes::WRITABLE),
                PropertyKind::Accessor { setter, .. } => setter.is_some(),
            },
        }
    }

    /// The stored value of a data property
    pub fn value(&self) -> Option<&Value> {
        match self {
            OwnProperty::Plain(v) => Some(v),
            OwnProperty::Property(Property {
                kind: PropertyKind::Data(v),
                ..
            }) => Some(v),
            _ => None,
        }
    }

    pub fn getter(&self) -> Option<&Object> {
        match self {
            OwnProperty::Property(Property {
                kind: PropertyKind::Accessor { getter, .. },
                ..
            }) => getter.as_ref(),
            _ => None,
        }
    }

    pub fn setter(&self) -> Option<&Object> {
        match self {
            OwnProperty::Property(Property {
                kind: PropertyKind::Accessor { setter, .. },
                ..
            }) => setter.as_ref(),
            _ => None,
        }
    }

    /// Materialize as a full record
    pub fn to_property(&self) -> Property {
        match self {
            OwnProperty::Plain(v) => Property::data(v.clone(), Attributes::all()),
            OwnProperty::Property(p) => p.clone(),
        }
    }

    /// Describe this property as a complete descriptor
    pub fn to_descriptor(&self) -> PropertyDescriptor {
        let attrs = self.attributes();
        match self.to_property().kind {
            PropertyKind::Data(value) => PropertyDescriptor {
                value: Some(value),
                writable: Some(attrs.contains(Attributes::WRITABLE)),
                enumerable: Some(attrs.contains(Attributes::ENUMERABLE)),
                configurable: Some(attrs.contains(Attributes::CONFIGURABLE)),
                get: None,
                set: None,
            },
            PropertyKind::Accessor { getter, setter } => PropertyDescriptor {
                value: None,
                writable: None,
                enumerable: Some(attrs.contains(Attributes::ENUMERABLE)),
                configurable: Some(attrs.contains(Attributes::CONFIGURABLE)),
                get: Some(getter.into_value_or_undefined()),
                set: Some(setter.into_value_or_undefined()),
            },
        }
    }
}

trait IntoValueOrUndefined {
    fn into_value_or_undefined(self) -> Value;
}

impl IntoValueOrUndefined for Option<Object> {
    fn into_value_or_undefined(self) -> Value {
        self.map_or(Value::Undefined, Value::Object)
    }
}

/// A property descriptor as passed to `define_own_property`.
///
/// Every field is optional. For `get`/`set`, `Some(Value::Undefined)` means
/// "explicitly no function", which differs from an absent field.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    pub get: Option<Value>,
    pub set: Option<Value>,
}

impl PropertyDescriptor {
    /// A complete data descriptor
    pub fn data(value: impl Into<Value>, attributes: Attributes) -> Self {
        PropertyDescriptor {
            value: Some(value.into()),
            writable: Some(attributes.contains(Attributes::WRITABLE)),
            enumerable: Some(attributes.contains(Attributes::ENUMERABLE)),
            configurable: Some(attributes.contains(Attributes::CONFIGURABLE)),
            get: None,
            set: None,
        }
    }

    /// A complete accessor descriptor
    pub fn accessor(getter: Option<Object>, setter: Option<Object>, attributes: Attributes) -> Self {
        PropertyDescriptor {
            value: None,
            writable: None,
            enumerable: Some(attributes.contains(Attributes::ENUMERABLE)),
            configurable: Some(attributes.contains(Attributes::CONFIGURABLE)),
            get: Some(getter.into_value_or_undefined()),
            set: Some(setter.into_value_or_undefined()),
        }
    }

    /// A descriptor carrying only a value
    pub fn value_only(value: impl Into<Value>) -> Self {
        PropertyDescriptor {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// ToPropertyDescriptor: read a descriptor out of a JS object
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(Error::type_error(format!(
                "Property description must be an object: {}",
                value
            )));
        };
        let mut desc = PropertyDescriptor::default();
        if obj.has_property("enumerable")? {
            desc.enumerable = Some(obj.get("enumerable")?.to_boolean());
        }
        if obj.has_property("configurable")? {
            desc.configurable = Some(obj.get("configurable")?.to_boolean());
        }
        if obj.has_property("value")? {
            desc.value = Some(obj.get("value")?);
        }
        if obj.has_property("writable")? {
            desc.writable = Some(obj.get("writable")?.to_boolean());
        }
        if obj.has_property("get")? {
            let getter = obj.get("get")?;
            if !getter.is_undefined() && !getter.is_callable() {
                return Err(Error::type_error("getter must be a function"));
            }
            desc.get = Some(getter);
        }
        if obj.has_property("set")? {
            let setter = obj.get("set")?;
            if !setter.is_undefined() && !setter.is_callable() {
                return Err(Error::type_error("setter must be a function"));
            }
            desc.set = Some(setter);
        }
        if desc.is_accessor() && desc.is_data() {
            return Err(Error::type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }

    pub fn is_empty(&self) -> bool {
        self.is_generic() && self.enumerable.is_none() && self.configurable.is_none()
    }

    /// Fill absent fields with their defaults
    pub fn complete(&mut self) {
        if self.is_generic() || self.is_data() {
            self.value.get_or_insert(Value::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(Value::Undefined);
            self.set.get_or_insert(Value::Undefined);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
    }
}

/// Why a descriptor could not be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineRejection {
    /// The property is absent and the object is not extensible
    NotExtensible,
    /// The change is not allowed on a non-configurable property
    Redefine,
}

fn same_function(desc_value: &Value, current: Option<&Object>) -> bool {
    match (desc_value.as_object(), current) {
        (None, None) => desc_value.is_undefined(),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// ValidateAndApplyPropertyDescriptor.
///
/// Returns the property to store, or the reason the change is rejected.
pub fn apply_descriptor(
    current: Option<&OwnProperty>,
    extensible: bool,
    desc: &PropertyDescriptor,
) -> std::result::Result<OwnProperty, DefineRejection> {
    let Some(current) = current else {
        if !extensible {
            return Err(DefineRejection::NotExtensible);
        }
        let mut attrs = Attributes::empty();
        attrs.set(Attributes::ENUMERABLE, desc.enumerable.unwrap_or(false));
        attrs.set(Attributes::CONFIGURABLE, desc.configurable.unwrap_or(false));
        let prop = if desc.is_accessor() {
            Property::accessor(
                desc.get.as_ref().and_then(|g| g.as_object().cloned()),
                desc.set.as_ref().and_then(|s| s.as_object().cloned()),
                attrs,
            )
        } else {
            attrs.set(Attributes::WRITABLE, desc.writable.unwrap_or(false));
            Property::data(desc.value.clone().unwrap_or_default(), attrs)
        };
        return Ok(OwnProperty::from_property(prop));
    };

    if !current.is_configurable() {
        if desc.configurable == Some(true) {
            return Err(DefineRejection::Redefine);
        }
        if desc.enumerable.is_some_and(|e| e != current.is_enumerable()) {
            return Err(DefineRejection::Redefine);
        }
        if !desc.is_generic() && desc.is_accessor() != current.is_accessor() {
            return Err(DefineRejection::Redefine);
        }
        if current.is_accessor() {
            if let Some(g) = &desc.get {
                if !same_function(g, current.getter()) {
                    return Err(DefineRejection::Redefine);
                }
            }
            if let Some(s) = &desc.set {
                if !same_function(s, current.setter()) {
                    return Err(DefineRejection::Redefine);
                }
            }
        } else if !current.is_writable() {
            if desc.writable == Some(true) {
                return Err(DefineRejection::Redefine);
            }
            if let (Some(new), Some(old)) = (&desc.value, current.value()) {
                if !new.same_value(old) {
                    return Err(DefineRejection::Redefine);
                }
            }
        }
    }

    let Property {
        kind,
        mut attributes,
    } = current.to_property();
    if let Some(e) = desc.enumerable {
        attributes.set(Attributes::ENUMERABLE, e);
    }
    if let Some(c) = desc.configurable {
        attributes.set(Attributes::CONFIGURABLE, c);
    }

    let kind = if desc.is_accessor() {
        let (mut getter, mut setter) = match kind {
            PropertyKind::Accessor { getter, setter } => (getter, setter),
            PropertyKind::Data(_) => (None, None),
        };
        attributes.remove(Attributes::WRITABLE);
        if let Some(g) = &desc.get {
            getter = g.as_object().cloned();
        }
        if let Some(s) = &desc.set {
            setter = s.as_object().cloned();
        }
        PropertyKind::Accessor { getter, setter }
    } else if desc.is_data() {
        match kind {
            PropertyKind::Data(old) => {
                if let Some(w) = desc.writable {
                    attributes.set(Attributes::WRITABLE, w);
                }
                PropertyKind::Data(desc.value.clone().unwrap_or(old))
            }
            PropertyKind::Accessor { .. } => {
                attributes.set(Attributes::WRITABLE, desc.writable.unwrap_or(false));
                PropertyKind::Data(desc.value.clone().unwrap_or_default())
            }
        }
    } else {
        kind
    };

    Ok(OwnProperty::from_property(Property { kind, attributes }))
}
