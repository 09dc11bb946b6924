//! `Proxy` constructor and `Proxy.revocable`

use super::{arg, Installer};
use crate::error::{Error, Result};
use crate::runtime::{Object, ProxyObject, Runtime, Value};
use std::cell::RefCell;

pub(super) fn register_proxy(installer: &Installer) -> Object {
    let ctor = installer.constructor("Proxy", 2, proxy_call, proxy_construct, None);
    installer.method(&ctor, "revocable", 2, proxy_revocable);
    ctor
}

fn target_and_handler(args: &[Value]) -> Result<(Object, Object)> {
    match (arg(args, 0), arg(args, 1)) {
        (Value::Object(target), Value::Object(handler)) => Ok((target, handler)),
        _ => Err(Error::type_error(
            "Cannot create proxy with a non-object as target or handler",
        )),
    }
}

fn proxy_call(_rt: &Runtime, _this: &Value, _args: &[Value]) -> Result<Value> {
    Err(Error::type_error("Constructor Proxy requires 'new'"))
}

fn proxy_construct(rt: &Runtime, args: &[Value], _new_target: &Object) -> Result<Object> {
    let (target, handler) = target_and_handler(args)?;
    Ok(rt.new_proxy_with_handler_object(&target, &handler))
}

fn proxy_revocable(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let (target, handler) = target_and_handler(args)?;
    let proxy = rt.new_proxy_with_handler_object(&target, &handler);
    let slot = RefCell::new(Some(proxy.clone()));
    let revoke = rt.new_function("", 0, move |_, _, _| {
        let revoked = slot.borrow_mut().take();
        if let Some(proxy) = revoked {
            if let Some(backing) = proxy.downcast_ref::<ProxyObject>() {
                backing.revoke();
            }
        }
        Ok(Value::Undefined)
    });
    let result = rt.new_object();
    result.create_data_property_or_throw("proxy", proxy)?;
    result.create_data_property_or_throw("revoke", revoke)?;
    Ok(Value::Object(result))
}
