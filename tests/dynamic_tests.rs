//! Integration tests for host-backed dynamic objects and arrays

mod common;
use common::{call_array_method, key_strings, to_json};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use quicksilver_objects::{
    Attributes, DynamicArray, DynamicObject, PropertyDescriptor, Runtime, Value,
};
use serde_json::json;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};

/// A host map that refuses to store `"locked"`
#[derive(Default)]
struct Settings {
    values: RefCell<IndexMap<String, Value>>,
}

impl DynamicObject for Settings {
    fn get(&self, key: &str) -> Value {
        self.values.borrow().get(key).cloned().unwrap_or_default()
    }

    fn set(&self, key: &str, value: Value) -> bool {
        if key == "locked" {
            return false;
        }
        self.values.borrow_mut().insert(key.to_string(), value);
        true
    }

    fn has(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.values.borrow_mut().shift_remove(key);
        true
    }

    fn keys(&self) -> Vec<String> {
        self.values.borrow().keys().cloned().collect()
    }
}

/// A growable host vector
#[derive(Default)]
struct Samples {
    items: RefCell<Vec<Value>>,
}

impl DynamicArray for Samples {
    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, idx: usize) -> Value {
        self.items.borrow().get(idx).cloned().unwrap_or_default()
    }

    fn set(&self, idx: usize, value: Value) -> bool {
        let mut items = self.items.borrow_mut();
        if idx >= items.len() {
            items.resize(idx + 1, Value::Undefined);
        }
        items[idx] = value;
        true
    }

    fn set_len(&self, len: usize) -> bool {
        self.items.borrow_mut().resize(len, Value::Undefined);
        true
    }
}

/// A counter list shared across threads
#[derive(Default)]
struct SharedCounters {
    counts: Mutex<Vec<i64>>,
}

impl DynamicArray for SharedCounters {
    fn len(&self) -> usize {
        self.counts.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn get(&self, idx: usize) -> Value {
        let counts = self.counts.lock().unwrap();
        counts.get(idx).map_or(Value::Undefined, |&n| Value::from(n))
    }

    fn set(&self, idx: usize, value: Value) -> bool {
        let Some(n) = value.as_number() else {
            return false;
        };
        let mut counts = self.counts.lock().unwrap();
        if idx >= counts.len() {
            counts.resize(idx + 1, 0);
        }
        counts[idx] = n as i64;
        true
    }

    fn set_len(&self, len: usize) -> bool {
        self.counts.lock().unwrap().resize(len, 0);
        true
    }
}

mod objects {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_and_writes_reach_handler() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        obj.set("theme", "dark", true).unwrap();
        obj.set("size", 3, true).unwrap();

        assert_eq!(obj.get("theme").unwrap(), Value::from("dark"));
        assert_eq!(key_strings(&obj), vec!["theme", "size"]);
        let exported = obj.export().unwrap();
        let settings = exported.host::<Settings>().unwrap();
        assert_eq!(settings.get("size"), Value::from(3));
    }

    #[test]
    fn test_key_order_comes_from_handler() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        for key in ["b", "1", "a", "0"] {
            obj.set(key, key, true).unwrap();
        }
        assert_eq!(key_strings(&obj), vec!["b", "1", "a", "0"]);
    }

    #[test]
    fn test_handler_rejection() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        assert!(!obj.set("locked", 1, false).unwrap());
        assert!(obj.set("locked", 1, true).unwrap_err().is_type_error());
    }

    #[test]
    fn test_inherits_object_prototype() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        let has_own = obj.get("hasOwnProperty").unwrap();
        assert!(has_own.is_callable());
        obj.set("k", 1, true).unwrap();
        assert_eq!(has_own.as_object().unwrap().call(&Value::from(&obj), &["k".into()]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_descriptors_are_plain_data() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        obj.set("a", 1, true).unwrap();
        let desc = obj.get_own_property_descriptor("a").unwrap().unwrap();
        assert_eq!(desc.writable, Some(true));
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.configurable, Some(true));

        let read_only = PropertyDescriptor::data(2, Attributes::ENUMERABLE | Attributes::CONFIGURABLE);
        let err = obj.define_own_property("a", &read_only, true).unwrap_err();
        assert_eq!(err.message(), "Dynamic object field \"a\" cannot be made read-only");
    }

    #[test]
    fn test_symbols_and_accessors_rejected() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        let sym = rt.new_symbol(None);
        let err = obj.set(sym, 1, true).unwrap_err();
        assert_eq!(err.message(), "Dynamic objects do not support Symbol properties");

        let getter = rt.new_function("get", 0, |_, _, _| Ok(Value::Undefined));
        let accessor = PropertyDescriptor::accessor(Some(getter), None, Attributes::all());
        assert!(!obj.define_own_property("g", &accessor, false).unwrap());
    }

    #[test]
    fn test_cannot_prevent_extensions() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        assert!(!obj.prevent_extensions(false).unwrap());
        assert!(obj.is_extensible().unwrap());
    }

    #[test]
    fn test_delete_reaches_handler() {
        let rt = Runtime::new();
        let obj = rt.new_dynamic_object(Settings::default());
        obj.set("gone", 1, true).unwrap();
        assert!(obj.delete("gone", true).unwrap());
        assert!(!obj.has_own_property("gone").unwrap());
    }
}

mod arrays {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length_tracks_handler() {
        let rt = Runtime::new();
        let arr = rt.new_dynamic_array(Samples::default());
        assert!(arr.is_array().unwrap());
        arr.set(2, "c", true).unwrap();
        assert_eq!(arr.get("length").unwrap(), Value::from(3));
        arr.set("length", 1, true).unwrap();
        assert_eq!(key_strings(&arr), vec!["0", "length"]);
    }

    #[test]
    fn test_array_builtins_work_generically() {
        let rt = Runtime::new();
        let arr = rt.new_dynamic_array(Samples::default());
        let this = Value::from(&arr);
        call_array_method(&rt, &this, "push", &[3.into(), 1.into(), 2.into()]).unwrap();
        call_array_method(&rt, &this, "sort", &[]).unwrap();
        let sliced = call_array_method(&rt, &this, "slice", &[1.into()]).unwrap();
        assert_eq!(to_json(&rt, &sliced), json!([2, 3]));
        let joined = call_array_method(&rt, &this, "join", &[]).unwrap();
        assert_eq!(joined, Value::from("1,2,3"));
    }

    #[test]
    fn test_named_properties_rejected() {
        let rt = Runtime::new();
        let arr = rt.new_dynamic_array(Samples::default());
        assert!(!arr.set("name", 1, false).unwrap());
        let err = arr.set("name", 1, true).unwrap_err();
        assert_eq!(err.message(), "Cannot set property \"name\" on a dynamic array");
    }

    #[test]
    fn test_delete_leaves_undefined() {
        let rt = Runtime::new();
        let arr = rt.new_dynamic_array(Samples::default());
        arr.set(0, 1, true).unwrap();
        arr.delete(0, true).unwrap();
        assert_eq!(arr.get("length").unwrap(), Value::from(1));
        assert_eq!(arr.get(0).unwrap(), Value::Undefined);
        assert!(arr.delete("length", false).is_ok_and(|ok| !ok));
    }

    #[test]
    fn test_length_cannot_be_frozen() {
        let rt = Runtime::new();
        let arr = rt.new_dynamic_array(Samples::default());
        let freeze = PropertyDescriptor::default().with_writable(false);
        assert!(arr.define_own_property("length", &freeze, true).unwrap_err().is_type_error());
    }

    #[test]
    fn test_shared_handler_across_runtimes() {
        let counters = Arc::new(SharedCounters::default());
        let first = Runtime::new();
        let second = Runtime::new();
        let a = first.new_shared_dynamic_array(counters.clone());
        let b = second.new_shared_dynamic_array(counters.clone());
        assert!(a.prototype().unwrap().is_none());

        a.set(0, 5, true).unwrap();
        assert_eq!(b.get(0).unwrap(), Value::from(5));
        assert!(!b.set(1, "text", false).unwrap());

        let worker = std::thread::spawn({
            let counters = counters.clone();
            move || counters.set(1, Value::from(9))
        });
        assert!(worker.join().unwrap());
        assert_eq!(a.get("length").unwrap(), Value::from(2));
    }
}
