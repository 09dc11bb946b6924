//! Native function objects

use crate::error::{messages, Error, Result};
use crate::runtime::base::BaseObject;
use crate::runtime::object::{class, ExportContext, Exported, Object, ObjectImpl};
use crate::runtime::property::{Attributes, OwnProperty, Property, PropertyDescriptor, PropertyKey};
use crate::runtime::value::{JsString, Value};
use crate::runtime::{Runtime, RuntimeInner};
use std::any::Any;
use std::rc::{Rc, Weak};

/// A native function body: `(runtime, this, args)`
pub type NativeFn = Rc<dyn Fn(&Runtime, &Value, &[Value]) -> Result<Value>>;

/// A native constructor body: `(runtime, args, new_target)`
pub type NativeCtor = Rc<dyn Fn(&Runtime, &[Value], &Object) -> Result<Object>>;

/// A function implemented by the host
pub struct FunctionObject {
    base: BaseObject,
    runtime: Weak<RuntimeInner>,
    name: JsString,
    call: NativeFn,
    construct: Option<NativeCtor>,
}

impl FunctionObject {
    pub(crate) fn new(
        runtime: Weak<RuntimeInner>,
        prototype: Option<Object>,
        name: &str,
        length: u32,
        call: NativeFn,
        construct: Option<NativeCtor>,
    ) -> Self {
        let base = BaseObject::new(class::FUNCTION, prototype);
        base.put(
            "length",
            OwnProperty::Property(Property::data(Value::from(length), Attributes::CONFIGURABLE)),
        );
        base.put(
            "name",
            OwnProperty::Property(Property::data(Value::from(name), Attributes::CONFIGURABLE)),
        );
        FunctionObject {
            base,
            runtime,
            name: name.into(),
            call,
            construct,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn runtime(&self) -> Result<Runtime> {
        Runtime::from_weak(&self.runtime)
    }
}

impl ObjectImpl for FunctionObject {
    fn class_name(&self) -> &'static str {
        class::FUNCTION
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_own_property(&self, _this: &Object, key: &PropertyKey) -> Result<Option<OwnProperty>> {
        Ok(self.base.own_property(key))
    }

    fn get(&self, _this: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        self.base.get_str(key, receiver)
    }

    fn set_own(&self, this: &Object, key: &PropertyKey, value: Value, throw: bool) -> Result<bool> {
        self.base.set_own_str(this, key, value, throw)
    }

    fn set_foreign(
        &self,
        _this: &Object,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        throw: bool,
    ) -> Result<(bool, bool)> {
        self.base.set_foreign_with(key, self.base.own_property(key), value, receiver, throw)
    }

    fn define_own_property(
        &self,
        _this: &Object,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> Result<bool> {
        self.base.define_own_str(key, desc, throw)
    }

    fn delete(&self, this: &Object, key: &PropertyKey, throw: bool) -> Result<bool> {
        self.base.delete_str(this, key, throw)
    }

    fn own_keys(&self, _this: &Object, all: bool) -> Result<Vec<PropertyKey>> {
        Ok(self.base.ordered_keys(all))
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

    fn is_callable(&self) -> bool {
        true
    }

    fn is_constructor(&self) -> bool {
        self.construct.is_some()
    }

    fn call(&self, _this: &Object, this_arg: &Value, args: &[Value]) -> Result<Value> {
        let runtime = self.runtime()?;
        let _depth = runtime.enter_call()?;
        (self.call)(&runtime, this_arg, args)
    }

    fn construct(&self, _this: &Object, args: &[Value], new_target: &Object) -> Result<Object> {
        let Some(construct) = &self.construct else {
            return Err(Error::type_error(messages::not_a_constructor(&self.name)));
        };
        let runtime = self.runtime()?;
        let _depth = runtime.enter_call()?;
        construct(&runtime, args, new_target)
    }

    fn export(&self, this: &Object, _ctx: &mut ExportContext) -> Result<Exported> {
        Ok(Exported::Live(this.clone()))
    }
}
