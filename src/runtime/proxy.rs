//! Proxy exotic objects
//!
//! A proxy forwards every operation to a handler. A missing trap falls
//! through to the target. Trap results are checked against the target so a
//! handler can never report something the target contradicts (for example a
//! non-configurable property that vanished).
//!
//! Handlers are either a JS object whose trap methods are looked up by name
//! on every operation, or a [`ProxyTrapConfig`] of Rust closures.

use crate::error::{messages, type_error_result, Error, Result};
use crate::runtime::object::{class, ExportContext, Exported, Object, ObjectImpl};
use crate::runtime::property::{apply_descriptor, OwnProperty, PropertyDescriptor, PropertyKey};
use crate::runtime::value::Value;
use crate::runtime::{Runtime, RuntimeInner};
use rustc_hash::FxHashSet;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

/// The trap dispatch seam. Every method returns `Ok(None)` when the handler
/// has no trap for the operation.
pub trait ProxyHandler {
    fn get_prototype_of(&self, target: &Object) -> Result<Option<Option<Object>>>;
    fn set_prototype_of(&self, target: &Object, proto: Option<&Object>) -> Result<Option<bool>>;
    fn is_extensible(&self, target: &Object) -> Result<Option<bool>>;
    fn prevent_extensions(&self, target: &Object) -> Result<Option<bool>>;
    fn get_own_property_descriptor(
        &self,
        target: &Object,
        key: &PropertyKey,
    ) -> Result<Option<Option<PropertyDescriptor>>>;
    fn define_property(
        &self,
        target: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> Result<Option<bool>>;
    fn has(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>>;
    fn get(&self, target: &Object, key: &PropertyKey, receiver: &Value) -> Result<Option<Value>>;
    fn set(
        &self,
        target: &Object,
        key: &PropertyKey,
        value: &Value,
        receiver: &Value,
    ) -> Result<Option<bool>>;
    fn delete_property(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>>;
    fn own_keys(&self, target: &Object) -> Result<Option<Vec<PropertyKey>>>;
    fn apply(&self, target: &Object, this_arg: &Value, args: &[Value]) -> Result<Option<Value>>;
    fn construct(&self, target: &Object, args: &[Value], new_target: &Object) -> Result<Option<Value>>;
}

type Trap<F> = Option<Box<F>>;

/// Host-side proxy traps
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct ProxyTrapConfig {
    pub get_prototype_of: Trap<dyn Fn(&Object) -> Result<Option<Object>>>,
    pub set_prototype_of: Trap<dyn Fn(&Object, Option<&Object>) -> Result<bool>>,
    pub is_extensible: Trap<dyn Fn(&Object) -> Result<bool>>,
    pub prevent_extensions: Trap<dyn Fn(&Object) -> Result<bool>>,
    pub get_own_property_descriptor:
        Trap<dyn Fn(&Object, &PropertyKey) -> Result<Option<PropertyDescriptor>>>,
    pub define_property: Trap<dyn Fn(&Object, &PropertyKey, &PropertyDescriptor) -> Result<bool>>,
    pub has: Trap<dyn Fn(&Object, &PropertyKey) -> Result<bool>>,
    pub get: Trap<dyn Fn(&Object, &PropertyKey, &Value) -> Result<Value>>,
    pub set: Trap<dyn Fn(&Object, &PropertyKey, &Value, &Value) -> Result<bool>>,
    pub delete_property: Trap<dyn Fn(&Object, &PropertyKey) -> Result<bool>>,
    pub own_keys: Trap<dyn Fn(&Object) -> Result<Vec<PropertyKey>>>,
    pub apply: Trap<dyn Fn(&Object, &Value, &[Value]) -> Result<Value>>,
    pub construct: Trap<dyn Fn(&Object, &[Value], &Object) -> Result<Object>>,
}

impl ProxyTrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get(mut self, f: impl Fn(&Object, &PropertyKey, &Value) -> Result<Value> + 'static) -> Self {
        self.get = Some(Box::new(f));
        self
    }

    pub fn with_set(
        mut self,
        f: impl Fn(&Object, &PropertyKey, &Value, &Value) -> Result<bool> + 'static,
    ) -> Self {
        self.set = Some(Box::new(f));
        self
    }

    pub fn with_has(mut self, f: impl Fn(&Object, &PropertyKey) -> Result<bool> + 'static) -> Self {
        self.has = Some(Box::new(f));
        self
    }

    pub fn with_delete_property(
        mut self,
        f: impl Fn(&Object, &PropertyKey) -> Result<bool> + 'static,
    ) -> Self {
        self.delete_property = Some(Box::new(f));
        self
    }

    pub fn with_own_keys(mut self, f: impl Fn(&Object) -> Result<Vec<PropertyKey>> + 'static) -> Self {
        self.own_keys = Some(Box::new(f));
        self
    }

    pub fn with_get_own_property_descriptor(
        mut self,
        f: impl Fn(&Object, &PropertyKey) -> Result<Option<PropertyDescriptor>> + 'static,
    ) -> Self {
        self.get_own_property_descriptor = Some(Box::new(f));
        self
    }

    pub fn with_define_property(
        mut self,
        f: impl Fn(&Object, &PropertyKey, &PropertyDescriptor) -> Result<bool> + 'static,
    ) -> Self {
        self.define_property = Some(Box::new(f));
        self
    }

    pub fn with_apply(mut self, f: impl Fn(&Object, &Value, &[Value]) -> Result<Value> + 'static) -> Self {
        self.apply = Some(Box::new(f));
        self
    }

    pub fn with_construct(
        mut self,
        f: impl Fn(&Object, &[Value], &Object) -> Result<Object> + 'static,
    ) -> Self {
        self.construct = Some(Box::new(f));
        self
    }

    pub fn with_get_prototype_of(mut self, f: impl Fn(&Object) -> Result<Option<Object>> + 'static) -> Self {
        self.get_prototype_of = Some(Box::new(f));
        self
    }

    pub fn with_set_prototype_of(
        mut self,
        f: impl Fn(&Object, Option<&Object>) -> Result<bool> + 'static,
    ) -> Self {
        self.set_prototype_of = Some(Box::new(f));
        self
    }

    pub fn with_is_extensible(mut self, f: impl Fn(&Object) -> Result<bool> + 'static) -> Self {
        self.is_extensible = Some(Box::new(f));
        self
    }

    pub fn with_prevent_extensions(mut self, f: impl Fn(&Object) -> Result<bool> + 'static) -> Self {
        self.prevent_extensions = Some(Box::new(f));
        self
    }
}

impl ProxyHandler for ProxyTrapConfig {
    fn get_prototype_of(&self, target: &Object) -> Result<Option<Option<Object>>> {
        self.get_prototype_of.as_ref().map(|f| f(target)).transpose()
    }

    fn set_prototype_of(&self, target: &Object, proto: Option<&Object>) -> Result<Option<bool>> {
        self.set_prototype_of.as_ref().map(|f| f(target, proto)).transpose()
    }

    fn is_extensible(&self, target: &Object) -> Result<Option<bool>> {
        self.is_extensible.as_ref().map(|f| f(target)).transpose()
    }

    fn prevent_extensions(&self, target: &Object) -> Result<Option<bool>> {
        self.prevent_extensions.as_ref().map(|f| f(target)).transpose()
    }

    fn get_own_property_descriptor(
        &self,
        target: &Object,
        key: &PropertyKey,
    ) -> Result<Option<Option<PropertyDescriptor>>> {
        self.get_own_property_descriptor
            .as_ref()
            .map(|f| f(target, key))
            .transpose()
    }

    fn define_property(
        &self,
        target: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> Result<Option<bool>> {
        self.define_property.as_ref().map(|f| f(target, key, desc)).transpose()
    }

    fn has(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>> {
        self.has.as_ref().map(|f| f(target, key)).transpose()
    }

    fn get(&self, target: &Object, key: &PropertyKey, receiver: &Value) -> Result<Option<Value>> {
        self.get.as_ref().map(|f| f(target, key, receiver)).transpose()
    }

    fn set(
        &self,
        target: &Object,
        key: &PropertyKey,
        value: &Value,
        receiver: &Value,
    ) -> Result<Option<bool>> {
        self.set.as_ref().map(|f| f(target, key, value, receiver)).transpose()
    }

    fn delete_property(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>> {
        self.delete_property.as_ref().map(|f| f(target, key)).transpose()
    }

    fn own_keys(&self, target: &Object) -> Result<Option<Vec<PropertyKey>>> {
        self.own_keys.as_ref().map(|f| f(target)).transpose()
    }

    fn apply(&self, target: &Object, this_arg: &Value, args: &[Value]) -> Result<Option<Value>> {
        self.apply.as_ref().map(|f| f(target, this_arg, args)).transpose()
    }

    fn construct(&self, target: &Object, args: &[Value], new_target: &Object) -> Result<Option<Value>> {
        self.construct
            .as_ref()
            .map(|f| f(target, args, new_target).map(Value::Object))
            .transpose()
    }
}

/// A handler backed by a JS object
pub(crate) struct JsProxyHandler {
    handler: Object,
    runtime: Weak<RuntimeInner>,
}

impl JsProxyHandler {
    pub(crate) fn new(handler: Object, runtime: Weak<RuntimeInner>) -> Self {
        JsProxyHandler { handler, runtime }
    }

    fn call_trap(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        match self.handler.get_method(name)? {
            Some(trap) => self.call_resolved(&trap, args).map(Some),
            None => Ok(None),
        }
    }

    /// Invoke a trap already read from the handler
    fn call_resolved(&self, trap: &Object, args: &[Value]) -> Result<Value> {
        trap.call(&Value::Object(self.handler.clone()), args)
    }

    fn bool_trap(&self, name: &str, args: &[Value]) -> Result<Option<bool>> {
        Ok(self.call_trap(name, args)?.map(|v| v.to_boolean()))
    }

    fn runtime(&self) -> Result<Runtime> {
        Runtime::from_weak(&self.runtime)
    }
}

/// CreateListFromArrayLike restricted to property keys
fn keys_from_array_like(value: &Value) -> Result<Vec<PropertyKey>> {
    let Value::Object(list) = value else {
        return Err(Error::type_error("CreateListFromArrayLike called on non-object"));
    };
    let len = list.length_of_array_like()?;
    let mut keys = Vec::with_capacity(len.min(1024) as usize);
    for i in 0..len {
        let item = list.get(i)?;
        match item {
            Value::String(_) | Value::Symbol(_) => keys.push(item.to_property_key()?),
            other => return Err(Error::type_error(format!("{} is not a valid property name", other))),
        }
    }
    Ok(keys)
}

impl ProxyHandler for JsProxyHandler {
    fn get_prototype_of(&self, target: &Object) -> Result<Option<Option<Object>>> {
        match self.call_trap("getPrototypeOf", &[target.into()])? {
            None => Ok(None),
            Some(Value::Object(proto)) => Ok(Some(Some(proto))),
            Some(Value::Null) => Ok(Some(None)),
            Some(_) => Err(Error::type_error(
                "'getPrototypeOf' on proxy: trap returned neither object nor null",
            )),
        }
    }

    fn set_prototype_of(&self, target: &Object, proto: Option<&Object>) -> Result<Option<bool>> {
        self.bool_trap("setPrototypeOf", &[target.into(), proto.cloned().into()])
    }

    fn is_extensible(&self, target: &Object) -> Result<Option<bool>> {
        self.bool_trap("isExtensible", &[target.into()])
    }

    fn prevent_extensions(&self, target: &Object) -> Result<Option<bool>> {
        self.bool_trap("preventExtensions", &[target.into()])
    }

    fn get_own_property_descriptor(
        &self,
        target: &Object,
        key: &PropertyKey,
    ) -> Result<Option<Option<PropertyDescriptor>>> {
        match self.call_trap("getOwnPropertyDescriptor", &[target.into(), key.to_value()])? {
            None => Ok(None),
            Some(Value::Undefined) => Ok(Some(None)),
            Some(desc @ Value::Object(_)) => Ok(Some(Some(PropertyDescriptor::from_value(&desc)?))),
            Some(_) => Err(Error::type_error(format!(
                "'getOwnPropertyDescriptor' on proxy: trap returned neither object nor undefined for property '{}'",
                key
            ))),
        }
    }

    fn define_property(
        &self,
        target: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> Result<Option<bool>> {
        let Some(trap) = self.handler.get_method("defineProperty")? else {
            return Ok(None);
        };
        let desc_obj = self.runtime()?.from_property_descriptor(desc)?;
        let result = self.call_resolved(&trap, &[target.into(), key.to_value(), desc_obj.into()])?;
        Ok(Some(result.to_boolean()))
    }

    fn has(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>> {
        self.bool_trap("has", &[target.into(), key.to_value()])
    }

    fn get(&self, target: &Object, key: &PropertyKey, receiver: &Value) -> Result<Option<Value>> {
        self.call_trap("get", &[target.into(), key.to_value(), receiver.clone()])
    }

    fn set(
        &self,
        target: &Object,
        key: &PropertyKey,
        value: &Value,
        receiver: &Value,
    ) -> Result<Option<bool>> {
        self.bool_trap(
            "set",
            &[target.into(), key.to_value(), value.clone(), receiver.clone()],
        )
    }

    fn delete_property(&self, target: &Object, key: &PropertyKey) -> Result<Option<bool>> {
        self.bool_trap("deleteProperty", &[target.into(), key.to_value()])
    }

    fn own_keys(&self, target: &Object) -> Result<Option<Vec<PropertyKey>>> {
        match self.call_trap("ownKeys", &[target.into()])? {
            None => Ok(None),
            Some(list) => keys_from_array_like(&list).map(Some),
        }
    }

    fn apply(&self, target: &Object, this_arg: &Value, args: &[Value]) -> Result<Option<Value>> {
        let Some(trap) = self.handler.get_method("apply")? else {
            return Ok(None);
        };
        let args = self.runtime()?.new_array_from_values(args.to_vec());
        self.call_resolved(&trap, &[target.into(), this_arg.clone(), args.into()])
            .map(Some)
    }

    fn construct(&self, target: &Object, args: &[Value], new_target: &Object) -> Result<Option<Value>> {
        let Some(trap) = self.handler.get_method("construct")? else {
            return Ok(None);
        };
        let args = self.runtime()?.new_array_from_values(args.to_vec());
        self.call_resolved(&trap, &[target.into(), args.into(), new_target.into()])
            .map(Some)
    }
}

struct ProxyState {
    target: Object,
    handler: Rc<dyn ProxyHandler>,
}

/// A Proxy exotic object
pub struct ProxyObject {
    state: RefCell<Option<ProxyState>>,
    class: &'static str,
    callable: bool,
    constructor: bool,
}

fn is_compatible(extensible: bool, desc: &PropertyDescriptor, current: Option<&OwnProperty>) -> bool {
    apply_descriptor(current, extensible, desc).is_ok()
}

impl ProxyObject {
    pub fn new(target: Object, handler: Rc<dyn ProxyHandler>) -> Self {
        let class = if target.is_callable() {
            class::FUNCTION
        } else {
            class::OBJECT
        };
        ProxyObject {
            class,
            callable: target.is_callable(),
            constructor: target.is_constructor(),
            state: RefCell::new(Some(ProxyState { target, handler })),
        }
    }

    /// Detach target and handler. Every later operation fails.
    pub fn revoke(&self) {
        if self.state.borrow_mut().take().is_some() {
            debug!("proxy revoked");
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.state.borrow().is_none()
    }

    /// The proxied target
    pub fn target(&self) -> Result<Object> {
        Ok(self.parts()?.0)
    }

    fn parts(&self) -> Result<(Object, Rc<dyn ProxyHandler>)> {
        match &*self.state.borrow() {
            Some(state) => Ok((state.target.clone(), state.handler.clone())),
            None => Err(Error::type_error(messages::PROXY_REVOKED)),
        }
    }

    fn proxy_get_own_property(&self, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        let (target, handler) = self.parts()?;
        let Some(result) = handler.get_own_property_descriptor(&target, key)? else {
            return target.get_own_property(key);
        };
        let target_desc = target.get_own_property(key)?;
        let Some(mut desc) = result else {
            if let Some(td) = &target_desc {
                if !td.is_configurable() {
                    return Err(Error::type_error(format!(
                        "'getOwnPropertyDescriptor' on proxy: trap returned undefined for property '{}' which is non-configurable in the proxy target",
                        key
                    )));
                }
                if !target.is_extensible()? {
                    return Err(Error::type_error(format!(
                        "'getOwnPropertyDescriptor' on proxy: trap returned undefined for property '{}' which exists in the non-extensible proxy target",
                        key
                    )));
                }
            }
            return Ok(None);
        };
        let extensible = target.is_extensible()?;
        desc.complete();
        if !is_compatible(extensible, &desc, target_desc.as_ref()) {
            return Err(Error::type_error(format!(
                "'getOwnPropertyDescriptor' on proxy: trap returned descriptor for property '{}' that is incompatible with the existing property in the proxy target",
                key
            )));
        }
        if desc.configurable == Some(false) {
            match &target_desc {
                Some(td) if !td.is_configurable() => {
                    if desc.writable == Some(false) && td.is_writable() {
                        return Err(Error::type_error(format!(
                            "'getOwnPropertyDescriptor' on proxy: trap reported non-configurable and non-writable for property '{}' which is writable in the proxy target",
                            key
                        )));
                    }
                }
                _ => {
                    return Err(Error::type_error(format!(
                        "'getOwnPropertyDescriptor' on proxy: trap reported non-configurability for property '{}' which is either non-existent or configurable in the proxy target",
                        key
                    )));
                }
            }
        }
        Ok(apply_descriptor(None, true, &desc).ok())
    }

    fn proxy_define(&self, key: &PropertyKey, desc: &PropertyDescriptor, throw: bool) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(ok) = handler.define_property(&target, key, desc)? else {
            return target.define_own_property(key, desc, throw);
        };
        if !ok {
            return type_error_result(
                throw,
                format!("'defineProperty' on proxy: trap returned falsish for property '{}'", key),
            );
        }
        let target_desc = target.get_own_property(key)?;
        let extensible = target.is_extensible()?;
        let setting_non_configurable = desc.configurable == Some(false);
        let non_configurable_error = || {
            Err(Error::type_error(format!(
                "'defineProperty' on proxy: trap returned truish for defining non-configurable property '{}' which is either non-existent or configurable in the proxy target",
                key
            )))
        };
        match &target_desc {
            None => {
                if !extensible {
                    return Err(Error::type_error(format!(
                        "'defineProperty' on proxy: trap returned truish for adding property '{}'  to the non-extensible proxy target",
                        key
                    )));
                }
                if setting_non_configurable {
                    return non_configurable_error();
                }
            }
            Some(td) => {
                if !is_compatible(extensible, desc, Some(td)) {
                    return Err(Error::type_error(format!(
                        "'defineProperty' on proxy: trap returned truish for adding property '{}'  that is incompatible with the existing property in the proxy target",
                        key
                    )));
                }
                if setting_non_configurable && td.is_configurable() {
                    return non_configurable_error();
                }
                if !td.is_accessor()
                    && !td.is_configurable()
                    && td.is_writable()
                    && desc.writable == Some(false)
                {
                    return Err(Error::type_error(format!(
                        "'defineProperty' on proxy: trap returned truish for defining non-configurable property '{}' which cannot be non-writable, unless there exists a corresponding non-configurable, non-writable own property of the target object.",
                        key
                    )));
                }
            }
        }
        Ok(true)
    }

    fn proxy_has(&self, key: &PropertyKey) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(found) = handler.has(&target, key)? else {
            return target.has_property(key);
        };
        if !found {
            if let Some(td) = target.get_own_property(key)? {
                if !td.is_configurable() {
                    return Err(Error::type_error(format!(
                        "'has' on proxy: trap returned falsish for property '{}' which exists in the proxy target as non-configurable",
                        key
                    )));
                }
                if !target.is_extensible()? {
                    return Err(Error::type_error(format!(
                        "'has' on proxy: trap returned falsish for property '{}' but the proxy target is not extensible",
                        key
                    )));
                }
            }
        }
        Ok(found)
    }

    fn proxy_get(&self, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        let (target, handler) = self.parts()?;
        let Some(value) = handler.get(&target, key, receiver)? else {
            return target.get_with_receiver(key, receiver);
        };
        if let Some(td) = target.get_own_property(key)? {
            if !td.is_configurable() {
                if let Some(expected) = td.value() {
                    if !td.is_writable() && !value.same_value(expected) {
                        return Err(Error::type_error(format!(
                            "'get' on proxy: property '{}' is a read-only and non-configurable data property on the proxy target but the proxy did not return its actual value (expected '{}' but got '{}')",
                            key, expected, value
                        )));
                    }
                } else if td.getter().is_none() && !value.is_undefined() {
                    return Err(Error::type_error(format!(
                        "'get' on proxy: property '{}' is a non-configurable accessor property on the proxy target and does not have a getter function, but the trap did not return 'undefined' (got '{}')",
                        key, value
                    )));
                }
            }
        }
        Ok(value)
    }

    fn proxy_set(&self, key: &PropertyKey, value: Value, receiver: &Value, throw: bool) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(ok) = handler.set(&target, key, &value, receiver)? else {
            return target.set_with_receiver(key, value, receiver, throw);
        };
        if !ok {
            return type_error_result(
                throw,
                format!("'set' on proxy: trap returned falsish for property '{}'", key),
            );
        }
        if let Some(td) = target.get_own_property(key)? {
            if !td.is_configurable() {
                if let Some(current) = td.value() {
                    if !td.is_writable() && !value.same_value(current) {
                        return Err(Error::type_error(format!(
                            "'set' on proxy: trap returned truish for property '{}' which exists in the proxy target as a non-configurable and non-writable data property with a different value",
                            key
                        )));
                    }
                } else if td.setter().is_none() {
                    return Err(Error::type_error(format!(
                        "'set' on proxy: trap returned truish for property '{}' which exists in the proxy target as a non-configurable and non-writable accessor property without a setter",
                        key
                    )));
                }
            }
        }
        Ok(true)
    }

    fn proxy_delete(&self, key: &PropertyKey, throw: bool) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(ok) = handler.delete_property(&target, key)? else {
            return target.delete(key, throw);
        };
        if !ok {
            return type_error_result(
                throw,
                format!("'deleteProperty' on proxy: trap returned falsish for property '{}'", key),
            );
        }
        if let Some(td) = target.get_own_property(key)? {
            if !td.is_configurable() {
                return Err(Error::type_error(format!(
                    "'deleteProperty' on proxy: trap returned truish for property '{}' which is non-configurable in the proxy target",
                    key
                )));
            }
            if !target.is_extensible()? {
                return Err(Error::type_error(format!(
                    "'deleteProperty' on proxy: trap returned truish for property '{}' but the proxy target is non-extensible",
                    key
                )));
            }
        }
        Ok(true)
    }

    fn proxy_own_keys(&self) -> Result<Vec<PropertyKey>> {
        let (target, handler) = self.parts()?;
        let Some(keys) = handler.own_keys(&target)? else {
            return target.own_property_keys();
        };
        let mut unchecked: FxHashSet<PropertyKey> = FxHashSet::default();
        for key in &keys {
            if !unchecked.insert(key.clone()) {
                return Err(Error::type_error("'ownKeys' on proxy: trap returned duplicate entries"));
            }
        }
        let extensible = target.is_extensible()?;
        for key in target.own_property_keys()? {
            let Some(td) = target.get_own_property(&key)? else {
                continue;
            };
            if !unchecked.remove(&key) && (!td.is_configurable() || !extensible) {
                return Err(Error::type_error(format!(
                    "'ownKeys' on proxy: trap result did not include '{}'",
                    key
                )));
            }
        }
        if !extensible && !unchecked.is_empty() {
            return Err(Error::type_error(
                "'ownKeys' on proxy: trap returned extra keys but proxy target is non-extensible",
            ));
        }
        Ok(keys)
    }
}

impl ObjectImpl for ProxyObject {
    fn class_name(&self) -> &'static str {
        self.class
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        self.proxy_get_own_property(key)
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        self.proxy_get(key, receiver)
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        self.proxy_set(key, value, &Value::Object(this.clone()), throw)
    }

    fn set_foreign(
        &self,
        _this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        Ok((self.proxy_set(key, value, receiver, throw)?, true))
    }

    fn has_property(&self, _this: &Object, key: &PropertyKey) -> Result<bool> {
        self.proxy_has(key)
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        self.proxy_define(key, desc, throw)
    }

    fn delete(&self, _this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        self.proxy_delete(key, throw)
    }

    fn own_keys(&self, this: &Object, all: bool) -> Result<Vec<PropertyKey>> {
        let keys = self.proxy_own_keys()?;
        if all {
            return Ok(keys);
        }
        let mut enumerable = Vec::with_capacity(keys.len());
        for key in keys {
            if self
                .get_own_property(this, &key)?
                .is_some_and(|p| p.is_enumerable())
            {
                enumerable.push(key);
            }
        }
        Ok(enumerable)
    }

    fn prototype(&self, _this: &Object) -> Result<Option<Object>> {
        let (target, handler) = self.parts()?;
        let Some(proto) = handler.get_prototype_of(&target)? else {
            return target.prototype();
        };
        if !target.is_extensible()? && target.prototype()? != proto {
            return Err(Error::type_error(
                "'getPrototypeOf' on proxy: proxy target is non-extensible but the trap did not return its actual prototype",
            ));
        }
        Ok(proto)
    }

    fn set_prototype(&self, _this: &Object, proto: Option<Object>, throw: bool) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(ok) = handler.set_prototype_of(&target, proto.as_ref())? else {
            return target.set_prototype(proto, throw);
        };
        if !ok {
            return type_error_result(throw, "'setPrototypeOf' on proxy: trap returned falsish");
        }
        if !target.is_extensible()? && target.prototype()? != proto {
            return Err(Error::type_error(
                "'setPrototypeOf' on proxy: trap returned truish for setting a new prototype on the non-extensible proxy target",
            ));
        }
        Ok(true)
    }

    fn is_extensible(&self, _this: &Object) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(result) = handler.is_extensible(&target)? else {
            return target.is_extensible();
        };
        let actual = target.is_extensible()?;
        if result != actual {
            return Err(Error::type_error(format!(
                "'isExtensible' on proxy: trap result does not reflect extensibility of proxy target (which is '{}')",
                actual
            )));
        }
        Ok(result)
    }

    fn prevent_extensions(&self, _this: &Object, throw: bool) -> Result<bool> {
        let (target, handler) = self.parts()?;
        let Some(ok) = handler.prevent_extensions(&target)? else {
            return target.prevent_extensions(throw);
        };
        if !ok {
            return type_error_result(throw, "'preventExtensions' on proxy: trap returned falsish");
        }
        if target.is_extensible()? {
            return Err(Error::type_error(
                "'preventExtensions' on proxy: trap returned truish but the proxy target is extensible",
            ));
        }
        Ok(true)
    }

    fn is_callable(&self) -> bool {
        self.callable
    }

    fn is_constructor(&self) -> bool {
        self.constructor
    }

    fn call(&self, this: &Object, this_arg: &Value, args: &[Value]) -> Result<Value> {
        if !self.callable {
            return Err(Error::type_error(messages::not_a_function(this)));
        }
        let (target, handler) = self.parts()?;
        match handler.apply(&target, this_arg, args)? {
            Some(result) => Ok(result),
            None => target.call(this_arg, args),
        }
    }

    fn construct(&self, this: &Object, args: &[Value], new_target: &Object) -> Result<Object> {
        if !self.constructor {
            return Err(Error::type_error(messages::not_a_constructor(this)));
        }
        let (target, handler) = self.parts()?;
        match handler.construct(&target, args, new_target)? {
            Some(Value::Object(obj)) => Ok(obj),
            Some(other) => Err(Error::type_error(format!(
                "'construct' on proxy: trap returned non-object ('{}')",
                other
            ))),
            None => target.construct(args, Some(new_target)),
        }
    }

    fn export(&self, this: &Object, _ctx: &mut ExportContext) -> Result<Exported> {
        Ok(Exported::Live(this.clone()))
    }

    fn is_array(&self, _this: &Object) -> Result<bool> {
        self.parts()?.0.is_array()
    }
}
