//! Integration tests for proxies

mod common;
use common::{call_array_method, json_array, key_strings, to_json};
use pretty_assertions::assert_eq;
use quicksilver_objects::{
    Attributes, Object, PropertyKey, ProxyObject, ProxyTrapConfig, Runtime, Value,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn target_with_x(rt: &Runtime) -> Object {
    let target = rt.new_object();
    target.set("x", 1, true).unwrap();
    target
}

mod transparency {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_traps_forward_everything() {
        let rt = Runtime::new();
        let target = target_with_x(&rt);
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new());

        assert_eq!(proxy.get("x").unwrap(), Value::from(1));
        assert!(proxy.has_property("x").unwrap());
        assert!(!proxy.has_property("y").unwrap());
        assert_eq!(key_strings(&proxy), vec!["x"]);
        assert!(proxy.delete("x", true).unwrap());
        assert!(!target.has_own_property("x").unwrap());
    }

    #[test]
    fn test_set_lands_on_target() {
        let rt = Runtime::new();
        let target = rt.new_object();
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new());
        proxy.set("y", 2, true).unwrap();
        assert_eq!(target.get("y").unwrap(), Value::from(2));
        assert_eq!(proxy.get_own_property_descriptor("y").unwrap().unwrap().enumerable, Some(true));
    }

    #[test]
    fn test_proxy_of_array_is_array() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[3, 1, 2]");
        let proxy = rt.new_proxy(&arr, ProxyTrapConfig::new());
        assert!(proxy.is_array().unwrap());

        call_array_method(&rt, &Value::from(&proxy), "sort", &[]).unwrap();
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([1, 2, 3]));
    }

    #[test]
    fn test_prototype_forwarding() {
        let rt = Runtime::new();
        let target = rt.new_object();
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new());
        assert_eq!(proxy.prototype().unwrap().as_ref(), Some(rt.object_prototype()));
        proxy.prevent_extensions(true).unwrap();
        assert!(!target.is_extensible().unwrap());
    }
}

mod traps {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_trap_receives_key() {
        let rt = Runtime::new();
        let target = target_with_x(&rt);
        let traps = ProxyTrapConfig::new().with_get(|_, key, _| Ok(Value::from(format!("got {key}"))));
        let proxy = rt.new_proxy(&target, traps);
        assert_eq!(proxy.get("anything").unwrap(), Value::from("got anything"));
    }

    #[test]
    fn test_has_trap_hides_keys() {
        let rt = Runtime::new();
        let target = target_with_x(&rt);
        let traps = ProxyTrapConfig::new().with_has(|_, key| Ok(!key.is_str("x")));
        let proxy = rt.new_proxy(&target, traps);
        assert!(!proxy.has_property("x").unwrap());
        assert!(proxy.has_property("ghost").unwrap());
    }

    #[test]
    fn test_set_trap_falsish() {
        let rt = Runtime::new();
        let target = rt.new_object();
        let traps = ProxyTrapConfig::new().with_set(|_, _, _, _| Ok(false));
        let proxy = rt.new_proxy(&target, traps);
        assert!(!proxy.set("a", 1, false).unwrap());
        let err = proxy.set("a", 1, true).unwrap_err();
        assert_eq!(err.message(), "'set' on proxy: trap returned falsish for property 'a'");
    }

    #[test]
    fn test_own_keys_trap_order() {
        let rt = Runtime::new();
        let target = rt.new_object();
        let traps = ProxyTrapConfig::new()
            .with_own_keys(|_| Ok(vec![PropertyKey::from("b"), PropertyKey::from("a")]));
        let proxy = rt.new_proxy(&target, traps);
        assert_eq!(key_strings(&proxy), vec!["b", "a"]);
    }

    #[test]
    fn test_apply_trap() {
        let rt = Runtime::new();
        let func = rt.new_function("f", 0, |_, _, _| Ok(Value::from("target")));
        let traps = ProxyTrapConfig::new().with_apply(|target, this, args| {
            let inner = target.call(this, args)?;
            Ok(Value::from(format!("wrapped {inner}")))
        });
        let proxy = rt.new_proxy(&func, traps);
        assert!(proxy.is_callable());
        assert_eq!(proxy.call(&Value::Undefined, &[]).unwrap(), Value::from("wrapped target"));
    }

    #[test]
    fn test_construct_trap() {
        let rt = Runtime::new();
        let ctor = rt
            .new_constructor("Point", 0, |_, _, _| Ok(Value::Undefined), |rt, _, _| Ok(rt.new_object()))
            .unwrap();
        let traps = ProxyTrapConfig::new().with_construct(|target, args, new_target| {
            let obj = target.construct(args, Some(new_target))?;
            obj.set("tagged", true, true)?;
            Ok(obj)
        });
        let proxy = rt.new_proxy(&ctor, traps);
        assert!(proxy.is_constructor());
        let built = proxy.construct(&[], None).unwrap();
        assert_eq!(built.get("tagged").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_prototype_and_extensibility_traps() {
        let rt = Runtime::new();
        let target = rt.new_object();
        let traps = ProxyTrapConfig::new()
            .with_get_prototype_of(|_| Ok(None))
            .with_set_prototype_of(|_, _| Ok(false))
            .with_is_extensible(|_| Ok(true))
            .with_prevent_extensions(|target| target.prevent_extensions(false));
        let proxy = rt.new_proxy(&target, traps);

        assert_eq!(proxy.prototype().unwrap(), None);
        assert!(!proxy.set_prototype(None, false).unwrap());
        assert!(proxy.set_prototype(None, true).unwrap_err().is_type_error());
        assert!(proxy.is_extensible().unwrap());

        assert!(proxy.prevent_extensions(true).unwrap());
        assert!(!target.is_extensible().unwrap());
        assert!(proxy.is_extensible().unwrap_err().is_type_error());
    }

    #[test]
    fn test_plain_target_is_not_callable() {
        let rt = Runtime::new();
        let proxy = rt.new_proxy(&rt.new_object(), ProxyTrapConfig::new());
        assert!(!proxy.is_callable());
        assert!(proxy.call(&Value::Undefined, &[]).unwrap_err().is_type_error());
    }
}

mod invariants {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frozen_target(rt: &Runtime) -> Object {
        let target = rt.new_object();
        target.define_data_property("fixed", 1, Attributes::empty(), true).unwrap();
        target
    }

    #[test]
    fn test_get_must_report_frozen_value() {
        let rt = Runtime::new();
        let target = frozen_target(&rt);
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new().with_get(|_, _, _| Ok(Value::from(2))));
        let err = proxy.get("fixed").unwrap_err();
        assert!(err.is_type_error());
        assert!(err.message().starts_with("'get' on proxy: property 'fixed'"));
    }

    #[test]
    fn test_has_cannot_hide_non_configurable() {
        let rt = Runtime::new();
        let target = frozen_target(&rt);
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new().with_has(|_, _| Ok(false)));
        assert!(proxy.has_property("fixed").unwrap_err().is_type_error());
    }

    #[test]
    fn test_delete_cannot_report_non_configurable_gone() {
        let rt = Runtime::new();
        let target = frozen_target(&rt);
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new().with_delete_property(|_, _| Ok(true)));
        let err = proxy.delete("fixed", false).unwrap_err();
        assert!(err.message().contains("non-configurable in the proxy target"));
    }

    #[test]
    fn test_own_keys_must_include_non_configurable() {
        let rt = Runtime::new();
        let target = frozen_target(&rt);
        let proxy = rt.new_proxy(&target, ProxyTrapConfig::new().with_own_keys(|_| Ok(vec![])));
        let err = proxy.own_property_keys().unwrap_err();
        assert_eq!(err.message(), "'ownKeys' on proxy: trap result did not include 'fixed'");
    }

    #[test]
    fn test_own_keys_rejects_duplicates() {
        let rt = Runtime::new();
        let traps = ProxyTrapConfig::new()
            .with_own_keys(|_| Ok(vec![PropertyKey::from("a"), PropertyKey::from("a")]));
        let proxy = rt.new_proxy(&rt.new_object(), traps);
        assert!(proxy.own_property_keys().is_err());
    }

    #[test]
    fn test_descriptor_cannot_invent_non_configurable() {
        let rt = Runtime::new();
        let traps = ProxyTrapConfig::new().with_get_own_property_descriptor(|_, _| {
            Ok(Some(quicksilver_objects::PropertyDescriptor::data(1, Attributes::empty())))
        });
        let proxy = rt.new_proxy(&rt.new_object(), traps);
        assert!(proxy.get_own_property("ghost").unwrap_err().is_type_error());
    }
}

mod revocation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_revoked_proxy_throws() {
        let rt = Runtime::new();
        let proxy = rt.new_proxy(&target_with_x(&rt), ProxyTrapConfig::new());
        proxy.downcast_ref::<ProxyObject>().unwrap().revoke();

        let err = proxy.get("x").unwrap_err();
        assert_eq!(err.message(), "Proxy already revoked");
        assert!(proxy.is_array().is_err());
        assert!(proxy.own_property_keys().is_err());
    }

    #[test]
    fn test_revocable_builtin() {
        let rt = Runtime::new();
        let proxy_ctor = rt.global().get("Proxy").unwrap();
        let revocable = proxy_ctor.as_object().unwrap().get("revocable").unwrap();
        let pair = revocable
            .as_object()
            .unwrap()
            .call(&proxy_ctor, &[target_with_x(&rt).into(), rt.new_object().into()])
            .unwrap();
        let pair = pair.as_object().unwrap();
        let proxy = pair.get("proxy").unwrap();
        let proxy = proxy.as_object().unwrap();
        assert_eq!(proxy.get("x").unwrap(), Value::from(1));

        let revoke = pair.get("revoke").unwrap();
        revoke.as_object().unwrap().call(&Value::Undefined, &[]).unwrap();
        // A second revoke is a no-op
        revoke.as_object().unwrap().call(&Value::Undefined, &[]).unwrap();
        assert!(proxy.get("x").is_err());
    }
}

mod handler_objects {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handler_methods_act_as_traps() {
        let rt = Runtime::new();
        let calls: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let log = calls.clone();
        let handler = rt.new_object();
        let get = rt.new_function("get", 3, move |_, this, args| {
            log.borrow_mut().push(args[1].to_js_string()?.to_string());
            let target = args[0].as_object().cloned();
            assert!(this.is_object());
            match target {
                Some(t) => Ok(Value::number(t.get("x")?.to_number()? * 10.0)),
                None => Ok(Value::Undefined),
            }
        });
        handler.set("get", get, true).unwrap();

        let proxy = rt.new_proxy_with_handler_object(&target_with_x(&rt), &handler);
        assert_eq!(proxy.get("x").unwrap(), Value::from(10));
        assert_eq!(proxy.get("y").unwrap(), Value::from(10));
        assert_eq!(*calls.borrow(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_handler_without_trap_forwards() {
        let rt = Runtime::new();
        let proxy = rt.new_proxy_with_handler_object(&target_with_x(&rt), &rt.new_object());
        assert_eq!(proxy.get("x").unwrap(), Value::from(1));
        assert_eq!(key_strings(&proxy), vec!["x"]);
    }

    #[test]
    fn test_trap_is_read_once_per_operation() {
        let rt = Runtime::new();
        let reads = Rc::new(RefCell::new(0));
        let apply = rt.new_function("apply", 3, |_, _, _| Ok(Value::from(2)));
        let counter = reads.clone();
        let getter = rt.new_function("get apply", 0, move |_, _, _| {
            *counter.borrow_mut() += 1;
            Ok(Value::from(apply.clone()))
        });
        let handler = rt.new_object();
        handler
            .define_accessor_property("apply", Some(getter), None, Attributes::all(), true)
            .unwrap();

        let func = rt.new_function("f", 0, |_, _, _| Ok(Value::from(1)));
        let proxy = rt.new_proxy_with_handler_object(&func, &handler);
        assert_eq!(proxy.call(&Value::Undefined, &[]).unwrap(), Value::from(2));
        assert_eq!(*reads.borrow(), 1);
    }

    #[test]
    fn test_own_keys_trap_rejects_numbers() {
        let rt = Runtime::new();
        let handler = rt.new_object();
        let own_keys = rt.new_function("ownKeys", 1, |rt, _, _| {
            Ok(Value::from(rt.new_array_from_values(vec![Value::from(1)])))
        });
        handler.set("ownKeys", own_keys, true).unwrap();
        let proxy = rt.new_proxy_with_handler_object(&rt.new_object(), &handler);
        let err = proxy.own_property_keys().unwrap_err();
        assert_eq!(err.message(), "1 is not a valid property name");
    }

    #[test]
    fn test_proxy_constructor_requires_new() {
        let rt = Runtime::new();
        let proxy_ctor = rt.global().get("Proxy").unwrap();
        let proxy_ctor = proxy_ctor.as_object().unwrap();
        let err = proxy_ctor.call(&Value::Undefined, &[]).unwrap_err();
        assert_eq!(err.message(), "Constructor Proxy requires 'new'");
        let err = proxy_ctor.construct(&[Value::from(1), rt.new_object().into()], None).unwrap_err();
        assert_eq!(err.message(), "Cannot create proxy with a non-object as target or handler");
    }
}
