//! Integration tests for array exotic objects and Array.prototype

mod common;
use common::{call_array_method, json_array, key_strings, runtime_with_fast_paths, to_json};
use pretty_assertions::assert_eq;
use quicksilver_objects::{
    Attributes, Object, PropertyDescriptor, Runtime, Symbol, Value, MAX_SAFE_INTEGER,
};
use serde_json::json;

fn call(rt: &Runtime, receiver: &Object, method: &str, args: &[Value]) -> Value {
    call_array_method(rt, &Value::from(receiver), method, args).unwrap()
}

fn length(obj: &Object) -> Value {
    obj.get("length").unwrap()
}

mod length_semantics {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_write_grows_length() {
        let rt = Runtime::new();
        let arr = rt.new_array();
        arr.set(4, "x", true).unwrap();
        assert_eq!(length(&arr), Value::from(5));
        assert!(!arr.has_own_property(0).unwrap());
    }

    #[test]
    fn test_truncate_removes_tail() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2, 3, 4]");
        arr.set("length", 2, true).unwrap();
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([1, 2]));
        assert!(!arr.has_own_property(3).unwrap());
    }

    #[test]
    fn test_invalid_length_is_range_error() {
        let rt = Runtime::new();
        let arr = rt.new_array();
        let err = arr.set("length", -1, true).unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(err.message(), "Invalid array length");
        assert!(arr.set("length", 1.5, true).unwrap_err().is_range_error());
        assert!(rt.new_array_with_length(1 << 32).unwrap_err().is_range_error());
    }

    #[test]
    fn test_length_shrink_stops_at_non_configurable() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[0, 1, 2]");
        let pin = PropertyDescriptor::default().with_configurable(false);
        arr.define_own_property(1, &pin, true).unwrap();

        let err = arr.set("length", 0, true).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(length(&arr), Value::from(2));
        assert!(arr.has_own_property(1).unwrap());
        assert!(!arr.has_own_property(2).unwrap());
        assert!(arr.has_own_property(0).unwrap());
    }

    #[test]
    fn test_read_only_length_blocks_growth() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1]");
        let freeze_len = PropertyDescriptor::default().with_writable(false);
        arr.define_own_property("length", &freeze_len, true).unwrap();

        assert!(!arr.set(1, 2, false).unwrap());
        let err = call_array_method(&rt, &Value::from(&arr), "push", &[Value::from(2)]).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(length(&arr), Value::from(1));
    }

    #[test]
    fn test_length_descriptor() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2]");
        let desc = arr.get_own_property_descriptor("length").unwrap().unwrap();
        assert_eq!(desc.value, Some(Value::from(2)));
        assert_eq!(desc.writable, Some(true));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(false));
    }

    #[test]
    fn test_length_cannot_become_configurable() {
        let rt = Runtime::new();
        let arr = rt.new_array();
        let desc = PropertyDescriptor::default().with_configurable(true);
        assert!(!arr.define_own_property("length", &desc, false).unwrap());
    }
}

mod sparse {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_far_write_stays_ordered() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[0, 1]");
        arr.set(1_000_000, "far", true).unwrap();
        arr.set("name", "n", true).unwrap();
        arr.set(500, "mid", true).unwrap();

        assert_eq!(length(&arr), Value::from(1_000_001));
        assert_eq!(key_strings(&arr), vec!["0", "1", "500", "1000000", "length", "name"]);
        assert_eq!(arr.get(500).unwrap(), Value::from("mid"));
    }

    #[test]
    fn test_holes_read_through_prototype() {
        let rt = Runtime::new();
        let arr = rt.new_array_with_length(3).unwrap();
        rt.array_prototype().set(1, "inherited", true).unwrap();
        assert_eq!(arr.get(1).unwrap(), Value::from("inherited"));
        assert_eq!(arr.get(0).unwrap(), Value::Undefined);
        rt.array_prototype().delete(1, true).unwrap();
    }

    #[test]
    fn test_for_each_skips_holes() {
        let rt = Runtime::new();
        let arr = rt.new_array_with_length(4).unwrap();
        arr.set(2, "only", true).unwrap();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let log = seen.clone();
        let f = rt.new_function("f", 1, move |_, _, args| {
            log.borrow_mut().push(args[1].clone());
            Ok(Value::Undefined)
        });
        call(&rt, &arr, "forEach", &[Value::from(f)]);
        assert_eq!(*seen.borrow(), vec![Value::from(2)]);
    }
}

mod mutators {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_splice_length_limit() {
        let rt = Runtime::new();
        let like = rt.new_object();
        like.set("length", MAX_SAFE_INTEGER - 1, true).unwrap();
        let this = Value::from(&like);
        let end = Value::from(MAX_SAFE_INTEGER - 1);

        call_array_method(&rt, &this, "splice", &[end.clone(), 0.into(), "last".into()]).unwrap();
        assert_eq!(like.get("length").unwrap(), Value::from(MAX_SAFE_INTEGER));
        assert_eq!(like.get(MAX_SAFE_INTEGER - 1).unwrap(), Value::from("last"));

        let err = call_array_method(&rt, &this, "splice", &[end, 0.into(), "over".into()]).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.message(), "Invalid array length");
        assert_eq!(like.get("length").unwrap(), Value::from(MAX_SAFE_INTEGER));
    }

    #[test]
    fn test_splice_replaces_range() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2, 3, 4, 5]");
        let removed = call(&rt, &arr, "splice", &[1.into(), 2.into(), "a".into(), "b".into(), "c".into()]);
        assert_eq!(to_json(&rt, &removed), json!([2, 3]));
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([1, "a", "b", "c", 4, 5]));
    }

    #[test]
    fn test_splice_without_delete_count_removes_rest() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2, 3]");
        let removed = call(&rt, &arr, "splice", &[Value::from(-2)]);
        assert_eq!(to_json(&rt, &removed), json!([2, 3]));
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([1]));
    }

    #[test]
    fn test_push_pop_shift_unshift() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[2]");
        assert_eq!(call(&rt, &arr, "push", &[3.into(), 4.into()]), Value::from(3));
        assert_eq!(call(&rt, &arr, "unshift", &[1.into()]), Value::from(4));
        assert_eq!(call(&rt, &arr, "pop", &[]), Value::from(4));
        assert_eq!(call(&rt, &arr, "shift", &[]), Value::from(1));
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([2, 3]));
        let empty = rt.new_array();
        assert_eq!(call(&rt, &empty, "pop", &[]), Value::Undefined);
    }

    #[test]
    fn test_push_on_array_like_object() {
        let rt = Runtime::new();
        let obj = rt.new_object();
        obj.set("length", 1, true).unwrap();
        call_array_method(&rt, &Value::from(&obj), "push", &["x".into()]).unwrap();
        assert_eq!(obj.get("length").unwrap(), Value::from(2));
        assert_eq!(obj.get(1).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_push_past_max_safe_length() {
        let rt = Runtime::new();
        let obj = rt.new_object();
        obj.set("length", 9_007_199_254_740_991_i64, true).unwrap();
        let err = call_array_method(&rt, &Value::from(&obj), "push", &[1.into()]).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_reverse_preserves_holes() {
        let rt = Runtime::new();
        let arr = rt.new_array_with_length(3).unwrap();
        arr.set(0, "a", true).unwrap();
        call(&rt, &arr, "reverse", &[]);
        assert!(!arr.has_own_property(0).unwrap());
        assert_eq!(arr.get(2).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_fill_and_copy_within() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2, 3, 4, 5]");
        call(&rt, &arr, "copyWithin", &[0.into(), 3.into()]);
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([4, 5, 3, 4, 5]));
        call(&rt, &arr, "fill", &[0.into(), 1.into(), (-1).into()]);
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([4, 0, 0, 0, 5]));
    }
}

mod sorting {
    use super::*;
    use pretty_assertions::assert_eq;

    fn by_key(rt: &Runtime) -> Value {
        Value::from(rt.new_function("cmp", 2, |_, _, args| {
            let key = |v: &Value| -> quicksilver_objects::Result<f64> {
                match v.as_object() {
                    Some(o) => o.get("k")?.to_number(),
                    None => Ok(f64::NAN),
                }
            };
            Ok(Value::number(key(&args[0])? - key(&args[1])?))
        }))
    }

    #[test]
    fn test_sort_is_stable() {
        let rt = Runtime::new();
        let arr = json_array(&rt, r#"[{"k":1,"v":"a"},{"k":1,"v":"b"},{"k":0,"v":"c"}]"#);
        call(&rt, &arr, "sort", &[by_key(&rt)]);
        assert_eq!(
            to_json(&rt, &Value::from(&arr)),
            json!([{"k":0,"v":"c"},{"k":1,"v":"a"},{"k":1,"v":"b"}])
        );
    }

    #[test]
    fn test_default_sort_compares_strings() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[10, 9, 1, null, 2]");
        call(&rt, &arr, "sort", &[]);
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([1, 10, 2, 9, null]));
    }

    #[test]
    fn test_sort_moves_undefined_and_holes_last() {
        let rt = runtime_with_fast_paths(false);
        let arr = rt.new_array_with_length(4).unwrap();
        arr.set(0, Value::Undefined, true).unwrap();
        arr.set(1, "b", true).unwrap();
        arr.set(3, "a", true).unwrap();
        call(&rt, &arr, "sort", &[]);
        assert_eq!(arr.get(0).unwrap(), Value::from("a"));
        assert_eq!(arr.get(1).unwrap(), Value::from("b"));
        assert!(arr.has_own_property(2).unwrap());
        assert!(!arr.has_own_property(3).unwrap());
    }

    #[test]
    fn test_sort_rejects_non_callable_comparator() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[2, 1]");
        let err = call_array_method(&rt, &Value::from(&arr), "sort", &[Value::from(1)]).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(to_json(&rt, &Value::from(&arr)), json!([2, 1]));
    }
}

mod species {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A constructor whose instances inherit from Array.prototype, with
    /// `@@species` answered by `species`
    fn subclass(rt: &Runtime, species: Value) -> Object {
        let sub = rt
            .new_constructor(
                "Sub",
                0,
                |_, _, _| Ok(Value::Undefined),
                |rt, args, new_target| rt.array_constructor().construct(args, Some(new_target)),
            )
            .unwrap();
        let proto = sub.get("prototype").unwrap();
        let proto = proto.as_object().unwrap();
        proto.set_prototype(Some(rt.array_prototype().clone()), true).unwrap();
        let getter = rt.new_function("get [Symbol.species]", 0, move |_, _, _| Ok(species.clone()));
        sub.define_accessor_property(Symbol::species(), Some(getter), None, Attributes::CONFIGURABLE, true)
            .unwrap();
        sub
    }

    #[test]
    fn test_species_array_yields_plain_array() {
        let rt = Runtime::new();
        let sub = subclass(&rt, Value::from(rt.array_constructor()));
        let instance = sub.construct(&[1.into(), 2.into(), 3.into()], None).unwrap();
        assert_eq!(instance.get("constructor").unwrap(), Value::from(&sub));

        let identity = rt.new_function("id", 1, |_, _, args| Ok(args[0].clone()));
        let mapped = call(&rt, &instance, "map", &[identity.into()]);
        let mapped = mapped.as_object().unwrap();
        assert_eq!(mapped.get("constructor").unwrap(), Value::from(rt.array_constructor()));
        assert_eq!(to_json(&rt, &Value::from(mapped)), json!([1, 2, 3]));
    }

    #[test]
    fn test_species_subclass_is_used() {
        let rt = Runtime::new();
        let sub = subclass(&rt, Value::Undefined);
        let sub_value = Value::from(&sub);
        let getter = rt.new_function("get [Symbol.species]", 0, move |_, _, _| Ok(sub_value.clone()));
        sub.define_accessor_property(Symbol::species(), Some(getter), None, Attributes::CONFIGURABLE, true)
            .unwrap();
        let instance = sub.construct(&[1.into(), 2.into()], None).unwrap();

        let sliced = call(&rt, &instance, "slice", &[]);
        let sliced = sliced.as_object().unwrap();
        assert_eq!(sliced.get("constructor").unwrap(), Value::from(&sub));
        assert_eq!(to_json(&rt, &Value::from(sliced)), json!([1, 2]));
    }

    #[test]
    fn test_species_non_constructor_is_type_error() {
        let rt = Runtime::new();
        let sub = subclass(&rt, Value::from(1));
        let instance = sub.construct(&[1.into()], None).unwrap();
        let err = call_array_method(&rt, &Value::from(&instance), "slice", &[]).unwrap_err();
        assert_eq!(err.message(), "Species is not a constructor");
    }
}

mod accessors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_and_to_string() {
        let rt = Runtime::new();
        let arr = json_array(&rt, r#"[1, null, "x", [2, 3]]"#);
        assert_eq!(call(&rt, &arr, "join", &["-".into()]), Value::from("1--x-2,3"));
        assert_eq!(call(&rt, &arr, "toString", &[]), Value::from("1,,x,2,3"));
    }

    #[test]
    fn test_join_cycle_is_empty() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1]");
        arr.set(1, &arr, true).unwrap();
        assert_eq!(call(&rt, &arr, "join", &[]), Value::from("1,"));
    }

    #[test]
    fn test_search_methods() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 2, 1]");
        arr.set(3, f64::NAN, true).unwrap();
        assert_eq!(call(&rt, &arr, "indexOf", &[1.into()]), Value::from(0));
        assert_eq!(call(&rt, &arr, "lastIndexOf", &[1.into()]), Value::from(2));
        assert_eq!(call(&rt, &arr, "indexOf", &[f64::NAN.into()]), Value::from(-1));
        assert_eq!(call(&rt, &arr, "includes", &[f64::NAN.into()]), Value::Bool(true));
        assert_eq!(call(&rt, &arr, "at", &[(-1).into()]).as_number().map(f64::is_nan), Some(true));
    }

    #[test]
    fn test_concat_spreads_arrays_only() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1]");
        let other = json_array(&rt, "[2, 3]");
        let plain = rt.new_object();
        let result = call(&rt, &arr, "concat", &[other.into(), 4.into()]);
        assert_eq!(to_json(&rt, &result), json!([1, 2, 3, 4]));
        let result = call(&rt, &arr, "concat", &[plain.into()]);
        assert_eq!(result.as_object().unwrap().get("length").unwrap(), Value::from(2));
    }

    #[test]
    fn test_flat_depth() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, [2, [3, [4]]]]");
        assert_eq!(to_json(&rt, &call(&rt, &arr, "flat", &[])), json!([1, 2, [3, [4]]]));
        let deep = call(&rt, &arr, "flat", &[f64::INFINITY.into()]);
        assert_eq!(to_json(&rt, &deep), json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_reduce_on_empty_without_initial() {
        let rt = Runtime::new();
        let arr = rt.new_array();
        let add = rt.new_function("add", 2, |_, _, _| Ok(Value::Undefined));
        let err = call_array_method(&rt, &Value::from(&arr), "reduce", &[add.into()]).unwrap_err();
        assert_eq!(err.message(), "Reduce of empty array with no initial value");
    }

    #[test]
    fn test_reduce_right_order() {
        let rt = Runtime::new();
        let arr = json_array(&rt, r#"["a", "b", "c"]"#);
        let concat = rt.new_function("concat", 2, |_, _, args| {
            Ok(Value::from(format!("{}{}", args[0].to_js_string()?, args[1].to_js_string()?)))
        });
        assert_eq!(call(&rt, &arr, "reduceRight", &[concat.into()]), Value::from("cba"));
    }

    #[test]
    fn test_find_family() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1, 4, 9, 16]");
        let big = rt.new_function("big", 1, |_, _, args| Ok(Value::Bool(args[0].to_number()? > 3.0)));
        assert_eq!(call(&rt, &arr, "find", &[big.clone().into()]), Value::from(4));
        assert_eq!(call(&rt, &arr, "findIndex", &[big.clone().into()]), Value::from(1));
        assert_eq!(call(&rt, &arr, "findLast", &[big.clone().into()]), Value::from(16));
        assert_eq!(call(&rt, &arr, "findLastIndex", &[big.clone().into()]), Value::from(3));
        assert_eq!(call(&rt, &arr, "some", &[big.clone().into()]), Value::Bool(true));
        assert_eq!(call(&rt, &arr, "every", &[big.into()]), Value::Bool(false));
    }

    #[test]
    fn test_callback_must_be_callable() {
        let rt = Runtime::new();
        let arr = json_array(&rt, "[1]");
        let err = call_array_method(&rt, &Value::from(&arr), "map", &[Value::from("nope")]).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.message(), "nope is not a function");
    }
}

mod constructor {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_constructor_forms() {
        let rt = Runtime::new();
        let ctor = rt.array_constructor();
        let sized = ctor.construct(&[3.into()], None).unwrap();
        assert_eq!(length(&sized), Value::from(3));
        assert!(!sized.has_own_property(0).unwrap());

        let listed = ctor.construct(&["3".into()], None).unwrap();
        assert_eq!(to_json(&rt, &Value::from(&listed)), json!(["3"]));

        let err = ctor.construct(&[1.5.into()], None).unwrap_err();
        assert!(err.is_range_error());
    }

    #[test]
    fn test_is_array_of_and_from() {
        let rt = Runtime::new();
        let ctor = Value::from(rt.array_constructor());
        let statics = rt.array_constructor();
        let is_array = statics.get("isArray").unwrap();
        let is_array = is_array.as_object().unwrap();
        assert_eq!(is_array.call(&ctor, &[rt.new_array().into()]).unwrap(), Value::Bool(true));
        assert_eq!(is_array.call(&ctor, &[rt.new_object().into()]).unwrap(), Value::Bool(false));

        let of = statics.get("of").unwrap();
        let made = of.as_object().unwrap().call(&ctor, &[7.into(), 8.into()]).unwrap();
        assert_eq!(to_json(&rt, &made), json!([7, 8]));

        let like = rt.new_object();
        like.set("length", 2, true).unwrap();
        like.set(0, "a", true).unwrap();
        let from = statics.get("from").unwrap();
        let made = from.as_object().unwrap().call(&ctor, &[like.into()]).unwrap();
        assert_eq!(to_json(&rt, &made), json!(["a", null]));
    }
}
