//! `Array` constructor and `Array.prototype`
//!
//! Every method has a generic path that works through the object protocol
//! one index at a time, in the order ECMAScript mandates. When the receiver
//! is a standard array (dense, all plain elements, nothing else on it) and
//! fast paths are enabled, methods read or rewrite the backing store
//! directly instead. The two paths produce the same observable result.

use super::object::object_proto_to_string;
use super::{arg, callable_arg, Installer};
use crate::error::{messages, Error, Result};
use crate::runtime::{
    relative_index, to_array_length, ArrayObject, JsString, Object, Runtime, Symbol, Value,
    MAX_SAFE_INTEGER,
};
use std::cmp::Ordering;
use tracing::trace;

type Builtin = fn(&Runtime, &Value, &[Value]) -> Result<Value>;

const PROTOTYPE_METHODS: &[(&str, u32, Builtin)] = &[
    ("at", 1, array_at),
    ("concat", 1, array_concat),
    ("copyWithin", 2, array_copy_within),
    ("every", 1, array_every),
    ("fill", 1, array_fill),
    ("filter", 1, array_filter),
    ("find", 1, array_find),
    ("findIndex", 1, array_find_index),
    ("findLast", 1, array_find_last),
    ("findLastIndex", 1, array_find_last_index),
    ("flat", 0, array_flat),
    ("flatMap", 1, array_flat_map),
    ("forEach", 1, array_for_each),
    ("includes", 1, array_includes),
    ("indexOf", 1, array_index_of),
    ("join", 1, array_join),
    ("lastIndexOf", 1, array_last_index_of),
    ("map", 1, array_map),
    ("pop", 0, array_pop),
    ("push", 1, array_push),
    ("reduce", 1, array_reduce),
    ("reduceRight", 1, array_reduce_right),
    ("reverse", 0, array_reverse),
    ("shift", 0, array_shift),
    ("slice", 2, array_slice),
    ("some", 1, array_some),
    ("sort", 1, array_sort),
    ("splice", 2, array_splice),
    ("toString", 0, array_to_string),
    ("unshift", 1, array_unshift),
];

pub(super) fn register_array(installer: &Installer, prototype: &Object) -> Object {
    let ctor = installer.constructor("Array", 1, array_call, array_construct, Some(prototype));
    installer.method(&ctor, "isArray", 1, array_is_array);
    installer.method(&ctor, "of", 0, array_of);
    installer.method(&ctor, "from", 1, array_from);
    installer.getter(&ctor, Symbol::species(), "get [Symbol.species]", |_, this, _| {
        Ok(this.clone())
    });
    for &(name, length, f) in PROTOTYPE_METHODS {
        installer.method(prototype, name, length, f);
    }
    ctor
}

/// The receiver's array backing, if the fast path may use it. `mutable`
/// additionally requires a writable length and an extensible array.
fn fast_array<'a>(rt: &Runtime, obj: &'a Object, method: &'static str, mutable: bool) -> Option<&'a ArrayObject> {
    if !rt.config().fast_paths {
        return None;
    }
    let arr = obj.as_array()?;
    let eligible = if mutable {
        arr.is_standard_mutable()
    } else {
        arr.is_standard()
    };
    if eligible {
        Some(arr)
    } else {
        trace!(method, "array is not standard, taking the generic path");
        None
    }
}

/// Snapshot of a standard receiver's elements
fn fast_values(rt: &Runtime, obj: &Object, method: &'static str) -> Option<Vec<Value>> {
    fast_array(rt, obj, method, false).and_then(ArrayObject::standard_values)
}

/// HasProperty followed by Get. `None` for a missing index.
fn read_index(rt: &Runtime, obj: &Object, idx: i64) -> Result<Option<Value>> {
    if rt.config().fast_paths {
        if let Some(arr) = obj.as_array() {
            if idx < arr.length() as i64 && arr.is_standard() {
                if let Some(value) = arr.element(idx as u32).and_then(|p| p.value().cloned()) {
                    return Ok(Some(value));
                }
            }
        }
    }
    if obj.has_property(idx)? {
        Ok(Some(obj.get(idx)?))
    } else {
        Ok(None)
    }
}

fn relative_arg(value: &Value, len: i64) -> Result<i64> {
    Ok(relative_index(value.to_integer_or_infinity()?, len))
}

/// A relative end argument, where `undefined` means `len`
fn relative_end(value: Option<&Value>, len: i64) -> Result<i64> {
    match value {
        None | Some(Value::Undefined) => Ok(len),
        Some(v) => relative_arg(v, len),
    }
}

fn check_new_length(len: i64) -> Result<()> {
    if len > MAX_SAFE_INTEGER {
        Err(Error::type_error(messages::INVALID_ARRAY_LENGTH))
    } else {
        Ok(())
    }
}

/// ArraySpeciesCreate. The flag is true when the result is a fresh default
/// array, which nothing else can observe until it is returned.
fn species_create(rt: &Runtime, original: &Object, length: i64) -> Result<(Object, bool)> {
    if !original.is_array()? {
        return Ok((rt.new_array_with_length(length)?, true));
    }
    let mut ctor = original.get("constructor")?;
    if let Value::Object(c) = &ctor {
        ctor = c.get(Symbol::species())?;
        if ctor.is_null() {
            ctor = Value::Undefined;
        }
    }
    match ctor {
        Value::Undefined => Ok((rt.new_array_with_length(length)?, true)),
        Value::Object(c) if &c == rt.array_constructor() => Ok((rt.new_array_with_length(length)?, true)),
        Value::Object(c) if c.is_constructor() => Ok((c.construct(&[Value::from(length)], None)?, false)),
        _ => Err(Error::type_error(messages::SPECIES_NOT_CONSTRUCTOR)),
    }
}

/// The array backing of a fresh default result, when the fast path is on
fn fast_result<'a>(rt: &Runtime, result: &'a Object, is_default: bool) -> Option<&'a ArrayObject> {
    if is_default && rt.config().fast_paths {
        result.as_array()
    } else {
        None
    }
}

fn array_construct(rt: &Runtime, args: &[Value], new_target: &Object) -> Result<Object> {
    let proto = rt.prototype_from_constructor(new_target, rt.array_prototype())?;
    match args {
        [len @ (Value::Int(_) | Value::Float(_))] => {
            let len = to_array_length(len)?;
            rt.new_array_with_length_and_prototype(len as i64, proto)
        }
        _ => {
            let array = rt.new_array_with_length_and_prototype(0, proto)?;
            if let Some(arr) = array.as_array() {
                arr.set_standard_values(args.to_vec());
            }
            Ok(array)
        }
    }
}

fn array_call(rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    let ctor = rt.array_constructor().clone();
    array_construct(rt, args, &ctor).map(Value::Object)
}

fn array_is_array(_rt: &Runtime, _this: &Value, args: &[Value]) -> Result<Value> {
    match arg(args, 0) {
        Value::Object(obj) => Ok(Value::Bool(obj.is_array()?)),
        _ => Ok(Value::Bool(false)),
    }
}

/// `new C(len)` when the receiver is a constructor, else ArrayCreate
fn construct_from_this(rt: &Runtime, this: &Value, len: i64) -> Result<Object> {
    match this {
        Value::Object(c) if c.is_constructor() => c.construct(&[Value::from(len)], None),
        _ => rt.new_array_with_length(len),
    }
}

fn array_of(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let len = args.len() as i64;
    let result = construct_from_this(rt, this, len)?;
    for (k, item) in args.iter().enumerate() {
        result.create_data_property_or_throw(k, item.clone())?;
    }
    result.set("length", len, true)?;
    Ok(Value::Object(result))
}

/// `Array.from` over array-likes. Iterables are not consulted.
fn array_from(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let mapper = match arg(args, 1) {
        Value::Undefined => None,
        Value::Object(f) if f.is_callable() => Some(f),
        other => return Err(Error::type_error(messages::not_a_function(&other))),
    };
    let this_arg = arg(args, 2);
    let source = rt.to_object(&arg(args, 0))?;
    let len = source.length_of_array_like()?;
    let result = construct_from_this(rt, this, len)?;
    for k in 0..len {
        let mut value = source.get(k)?;
        if let Some(f) = &mapper {
            value = f.call(&this_arg, &[value, Value::from(k)])?;
        }
        result.create_data_property_or_throw(k, value)?;
    }
    result.set("length", len, true)?;
    Ok(Value::Object(result))
}

fn array_at(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let rel = arg(args, 0).to_integer_or_infinity()?;
    let k = if rel >= 0.0 { rel } else { len as f64 + rel };
    if k < 0.0 || k >= len as f64 {
        return Ok(Value::Undefined);
    }
    obj.get(k as i64)
}

/// IsConcatSpreadable: the object to spread, if any
fn concat_spreadable(value: &Value) -> Result<Option<&Object>> {
    let Value::Object(obj) = value else {
        return Ok(None);
    };
    let spreadable = obj.get(Symbol::is_concat_spreadable())?;
    let spread = if spreadable.is_undefined() {
        obj.is_array()?
    } else {
        spreadable.to_boolean()
    };
    Ok(spread.then_some(obj))
}

fn array_concat(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let (result, _) = species_create(rt, &obj, 0)?;
    let mut n: i64 = 0;
    let items = std::iter::once(Value::Object(obj.clone())).chain(args.iter().cloned());
    for item in items {
        let Some(spread) = concat_spreadable(&item)? else {
            check_new_length(n + 1)?;
            result.create_data_property_or_throw(n, item.clone())?;
            n += 1;
            continue;
        };
        let len = spread.length_of_array_like()?;
        check_new_length(n + len)?;
        for k in 0..len {
            if let Some(value) = read_index(rt, spread, k)? {
                result.create_data_property_or_throw(n, value)?;
            }
            n += 1;
        }
    }
    result.set("length", n, true)?;
    Ok(Value::Object(result))
}

fn array_copy_within(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let mut to = relative_arg(&arg(args, 0), len)?;
    let mut from = relative_arg(&arg(args, 1), len)?;
    let end = relative_end(args.get(2), len)?;
    let mut count = (end - from).min(len - to);
    if count <= 0 {
        return Ok(Value::Object(obj));
    }
    if let Some(arr) = fast_array(rt, &obj, "copyWithin", true) {
        if let Some(mut values) = arr.standard_values() {
            let chunk = values[from as usize..(from + count) as usize].to_vec();
            values.splice(to as usize..(to + count) as usize, chunk);
            arr.set_standard_values(values);
            return Ok(Value::Object(obj));
        }
    }
    let step = if from < to && to < from + count {
        from += count - 1;
        to += count - 1;
        -1
    } else {
        1
    };
    while count > 0 {
        if obj.has_property(from)? {
            let value = obj.get(from)?;
            obj.set(to, value, true)?;
        } else {
            obj.delete(to, true)?;
        }
        from += step;
        to += step;
        count -= 1;
    }
    Ok(Value::Object(obj))
}

/// Shared loop of every/some/forEach: stops when `visit` returns false
fn for_each_present<F>(rt: &Runtime, this: &Value, args: &[Value], mut visit: F) -> Result<()>
where
    F: FnMut(Value) -> bool,
{
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let callback = callable_arg(args, 0)?;
    let this_arg = arg(args, 1);
    for k in 0..len {
        if let Some(value) = read_index(rt, &obj, k)? {
            let result = callback.call(&this_arg, &[value, Value::from(k), Value::from(&obj)])?;
            if !visit(result) {
                break;
            }
        }
    }
    Ok(())
}

fn array_every(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let mut all = true;
    for_each_present(rt, this, args, |result| {
        all = result.to_boolean();
        all
    })?;
    Ok(Value::Bool(all))
}

fn array_some(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let mut any = false;
    for_each_present(rt, this, args, |result| {
        any = result.to_boolean();
        !any
    })?;
    Ok(Value::Bool(any))
}

fn array_for_each(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    for_each_present(rt, this, args, |_| true)?;
    Ok(Value::Undefined)
}

fn array_fill(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let value = arg(args, 0);
    let start = relative_arg(&arg(args, 1), len)?;
    let end = relative_end(args.get(2), len)?;
    if let Some(arr) = fast_array(rt, &obj, "fill", true) {
        if let Some(mut values) = arr.standard_values() {
            for slot in values.iter_mut().take(end.max(0) as usize).skip(start as usize) {
                *slot = value.clone();
            }
            arr.set_standard_values(values);
            return Ok(Value::Object(obj));
        }
    }
    for k in start..end {
        obj.set(k, value.clone(), true)?;
    }
    Ok(Value::Object(obj))
}

fn array_filter(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let callback = callable_arg(args, 0)?;
    let this_arg = arg(args, 1);
    let (result, is_default) = species_create(rt, &obj, 0)?;
    let fast_out = fast_result(rt, &result, is_default);
    let mut kept = Vec::new();
    let mut to: i64 = 0;
    for k in 0..len {
        let Some(value) = read_index(rt, &obj, k)? else {
            continue;
        };
        let selected = callback
            .call(&this_arg, &[value.clone(), Value::from(k), Value::from(&obj)])?
            .to_boolean();
        if selected {
            if fast_out.is_some() {
                kept.push(value);
            } else {
                result.create_data_property_or_throw(to, value)?;
            }
            to += 1;
        }
    }
    if let Some(out) = fast_out {
        out.set_standard_values(kept);
    }
    Ok(Value::Object(result))
}

/// Shared search of find/findIndex/findLast/findLastIndex
fn find_by(rt: &Runtime, this: &Value, args: &[Value], from_end: bool) -> Result<Option<(i64, Value)>> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let predicate = callable_arg(args, 0)?;
    let this_arg = arg(args, 1);
    let visit = |k: i64| -> Result<Option<(i64, Value)>> {
        let value = obj.get(k)?;
        let hit = predicate
            .call(&this_arg, &[value.clone(), Value::from(k), Value::from(&obj)])?
            .to_boolean();
        Ok(hit.then_some((k, value)))
    };
    if from_end {
        for k in (0..len).rev() {
            if let Some(found) = visit(k)? {
                return Ok(Some(found));
            }
        }
    } else {
        for k in 0..len {
            if let Some(found) = visit(k)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

fn array_find(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    Ok(find_by(rt, this, args, false)?.map(|(_, v)| v).unwrap_or_default())
}

fn array_find_index(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    Ok(Value::from(find_by(rt, this, args, false)?.map_or(-1, |(k, _)| k)))
}

fn array_find_last(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    Ok(find_by(rt, this, args, true)?.map(|(_, v)| v).unwrap_or_default())
}

fn array_find_last_index(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    Ok(Value::from(find_by(rt, this, args, true)?.map_or(-1, |(k, _)| k)))
}

/// FlattenIntoArray. Returns the next target index.
fn flatten_into_array(
    rt: &Runtime,
    target: &Object,
    source: &Object,
    start: i64,
    depth: f64,
    mapper: Option<(&Object, &Value)>,
) -> Result<i64> {
    let _depth = rt.enter_call()?;
    let source_len = source.length_of_array_like()?;
    let mut target_index = start;
    for k in 0..source_len {
        let Some(mut element) = read_index(rt, source, k)? else {
            continue;
        };
        if let Some((f, this_arg)) = mapper {
            element = f.call(this_arg, &[element, Value::from(k), Value::from(source)])?;
        }
        if depth > 0.0 {
            if let Value::Object(inner) = &element {
                if inner.is_array()? {
                    target_index = flatten_into_array(rt, target, inner, target_index, depth - 1.0, None)?;
                    continue;
                }
            }
        }
        check_new_length(target_index + 1)?;
        target.create_data_property_or_throw(target_index, element)?;
        target_index += 1;
    }
    Ok(target_index)
}

fn array_flat(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let depth = match args.first() {
        None | Some(Value::Undefined) => 1.0,
        Some(v) => v.to_integer_or_infinity()?.max(0.0),
    };
    let (result, _) = species_create(rt, &obj, 0)?;
    flatten_into_array(rt, &result, &obj, 0, depth, None)?;
    Ok(Value::Object(result))
}

fn array_flat_map(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let mapper = callable_arg(args, 0)?;
    let this_arg = arg(args, 1);
    let (result, _) = species_create(rt, &obj, 0)?;
    flatten_into_array(rt, &result, &obj, 0, 1.0, Some((&mapper, &this_arg)))?;
    Ok(Value::Object(result))
}

/// The first index a forward search starts from. `None` when nothing can match.
fn search_start(from_index: &Value, len: i64) -> Result<Option<i64>> {
    let n = from_index.to_integer_or_infinity()?;
    if n == f64::INFINITY {
        return Ok(None);
    }
    Ok(Some(if n >= 0.0 {
        n as i64
    } else {
        (len as f64 + n).max(0.0) as i64
    }))
}

fn array_includes(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    if len == 0 {
        return Ok(Value::Bool(false));
    }
    let search = arg(args, 0);
    let Some(start) = search_start(&arg(args, 1), len)? else {
        return Ok(Value::Bool(false));
    };
    if let Some(values) = fast_values(rt, &obj, "includes") {
        let found = values.iter().skip(start as usize).any(|v| v.same_value_zero(&search));
        return Ok(Value::Bool(found));
    }
    for k in start..len {
        if obj.get(k)?.same_value_zero(&search) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn array_index_of(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    if len == 0 {
        return Ok(Value::from(-1));
    }
    let search = arg(args, 0);
    let Some(start) = search_start(&arg(args, 1), len)? else {
        return Ok(Value::from(-1));
    };
    if let Some(values) = fast_values(rt, &obj, "indexOf") {
        let found = values
            .iter()
            .enumerate()
            .skip(start as usize)
            .find(|(_, v)| v.strict_equals(&search));
        return Ok(Value::from(found.map_or(-1, |(k, _)| k as i64)));
    }
    for k in start..len {
        if obj.has_property(k)? && obj.get(k)?.strict_equals(&search) {
            return Ok(Value::from(k));
        }
    }
    Ok(Value::from(-1))
}

fn array_last_index_of(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    if len == 0 {
        return Ok(Value::from(-1));
    }
    let search = arg(args, 0);
    let n = match args.get(1) {
        Some(v) => v.to_integer_or_infinity()?,
        None => (len - 1) as f64,
    };
    if n == f64::NEG_INFINITY {
        return Ok(Value::from(-1));
    }
    let mut k = if n >= 0.0 {
        n.min((len - 1) as f64) as i64
    } else {
        (len as f64 + n) as i64
    };
    while k >= 0 {
        if obj.has_property(k)? && obj.get(k)?.strict_equals(&search) {
            return Ok(Value::from(k));
        }
        k -= 1;
    }
    Ok(Value::from(-1))
}

fn array_join(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let separator: JsString = match args.first() {
        None | Some(Value::Undefined) => ",".into(),
        Some(sep) => sep.to_js_string()?,
    };
    // An array reached again through its own elements joins as "".
    let Some(_joining) = rt.enter_join(&obj) else {
        return Ok(Value::from(""));
    };
    let mut out = String::new();
    for k in 0..len {
        if k > 0 {
            out.push_str(&separator);
        }
        let element = obj.get(k)?;
        if !element.is_nullish() {
            out.push_str(&element.to_js_string()?);
        }
    }
    Ok(Value::from(out))
}

fn array_map(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let callback = callable_arg(args, 0)?;
    let this_arg = arg(args, 1);
    let (result, is_default) = species_create(rt, &obj, len)?;
    // Buffering is bounded by the source, so only for standard sources.
    let fast_out = fast_result(rt, &result, is_default).filter(|_| fast_array(rt, &obj, "map", false).is_some());
    let mut mapped: Vec<Option<Value>> = Vec::new();
    for k in 0..len {
        let Some(value) = read_index(rt, &obj, k)? else {
            if fast_out.is_some() {
                mapped.push(None);
            }
            continue;
        };
        let out = callback.call(&this_arg, &[value, Value::from(k), Value::from(&obj)])?;
        if fast_out.is_some() {
            mapped.push(Some(out));
        } else {
            result.create_data_property_or_throw(k, out)?;
        }
    }
    if let Some(out) = fast_out {
        if mapped.iter().all(Option::is_some) {
            out.set_standard_values(mapped.into_iter().flatten().collect());
        } else {
            for (k, value) in mapped.into_iter().enumerate() {
                if let Some(value) = value {
                    result.create_data_property_or_throw(k, value)?;
                }
            }
        }
    }
    Ok(Value::Object(result))
}

fn array_pop(rt: &Runtime, this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    if let Some(arr) = fast_array(rt, &obj, "pop", true) {
        if arr.length() > 0 {
            return Ok(arr.pop_value().unwrap_or_default());
        }
    }
    let len = obj.length_of_array_like()?;
    if len == 0 {
        obj.set("length", 0, true)?;
        return Ok(Value::Undefined);
    }
    let idx = len - 1;
    let element = obj.get(idx)?;
    obj.delete(idx, true)?;
    obj.set("length", idx, true)?;
    Ok(element)
}

fn array_push(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    if let Some(arr) = fast_array(rt, &obj, "push", true) {
        if arr.length() as u64 + args.len() as u64 <= u32::MAX as u64 {
            arr.push_values(args);
            return Ok(Value::from(arr.length()));
        }
    }
    let len = obj.length_of_array_like()?;
    let new_len = len + args.len() as i64;
    if new_len > MAX_SAFE_INTEGER {
        return Err(Error::type_error(format!(
            "Pushing {} elements on an array-like of length {} is disallowed, as the total surpasses 2**53-1",
            args.len(),
            len
        )));
    }
    for (i, item) in args.iter().enumerate() {
        obj.set(len + i as i64, item.clone(), true)?;
    }
    obj.set("length", new_len, true)?;
    Ok(Value::from(new_len))
}

fn reduce_with(rt: &Runtime, this: &Value, args: &[Value], from_end: bool) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let callback = callable_arg(args, 0)?;
    let step: i64 = if from_end { -1 } else { 1 };
    let mut k: i64 = if from_end { len - 1 } else { 0 };
    let in_range = |k: i64| (0..len).contains(&k);
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => loop {
            if !in_range(k) {
                return Err(Error::type_error("Reduce of empty array with no initial value"));
            }
            let found = read_index(rt, &obj, k)?;
            k += step;
            if let Some(value) = found {
                break value;
            }
        },
    };
    while in_range(k) {
        if let Some(value) = read_index(rt, &obj, k)? {
            acc = callback.call(
                &Value::Undefined,
                &[acc, value, Value::from(k), Value::from(&obj)],
            )?;
        }
        k += step;
    }
    Ok(acc)
}

fn array_reduce(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    reduce_with(rt, this, args, false)
}

fn array_reduce_right(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    reduce_with(rt, this, args, true)
}

fn array_reverse(rt: &Runtime, this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    if let Some(arr) = fast_array(rt, &obj, "reverse", true) {
        if let Some(mut values) = arr.standard_values() {
            values.reverse();
            arr.set_standard_values(values);
            return Ok(Value::Object(obj));
        }
    }
    let len = obj.length_of_array_like()?;
    let middle = len / 2;
    let mut lower = 0;
    while lower != middle {
        let upper = len - lower - 1;
        let lower_value = if obj.has_property(lower)? {
            Some(obj.get(lower)?)
        } else {
            None
        };
        let upper_value = if obj.has_property(upper)? {
            Some(obj.get(upper)?)
        } else {
            None
        };
        match (lower_value, upper_value) {
            (Some(lv), Some(uv)) => {
                obj.set(lower, uv, true)?;
                obj.set(upper, lv, true)?;
            }
            (None, Some(uv)) => {
                obj.set(lower, uv, true)?;
                obj.delete(upper, true)?;
            }
            (Some(lv), None) => {
                obj.delete(lower, true)?;
                obj.set(upper, lv, true)?;
            }
            (None, None) => {}
        }
        lower += 1;
    }
    Ok(Value::Object(obj))
}

fn array_shift(rt: &Runtime, this: &Value, _args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    if let Some(arr) = fast_array(rt, &obj, "shift", true) {
        if arr.length() > 0 {
            return Ok(arr.shift_value().unwrap_or_default());
        }
    }
    let len = obj.length_of_array_like()?;
    if len == 0 {
        obj.set("length", 0, true)?;
        return Ok(Value::Undefined);
    }
    let first = obj.get(0)?;
    for k in 1..len {
        if obj.has_property(k)? {
            let value = obj.get(k)?;
            obj.set(k - 1, value, true)?;
        } else {
            obj.delete(k - 1, true)?;
        }
    }
    obj.delete(len - 1, true)?;
    obj.set("length", len - 1, true)?;
    Ok(first)
}

fn array_slice(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let mut k = relative_arg(&arg(args, 0), len)?;
    let end = relative_end(args.get(1), len)?;
    let count = (end - k).max(0);
    let (result, is_default) = species_create(rt, &obj, count)?;
    if let Some(out) = fast_result(rt, &result, is_default) {
        if let Some(values) = fast_values(rt, &obj, "slice") {
            // The species lookup may have shrunk the source.
            if values.len() as i64 >= end {
                let taken = if count > 0 {
                    values[k as usize..end as usize].to_vec()
                } else {
                    Vec::new()
                };
                out.set_standard_values(taken);
                return Ok(Value::Object(result));
            }
        }
    }
    let mut n: i64 = 0;
    while k < end {
        if let Some(value) = read_index(rt, &obj, k)? {
            result.create_data_property_or_throw(n, value)?;
        }
        k += 1;
        n += 1;
    }
    result.set("length", n, true)?;
    Ok(Value::Object(result))
}

/// SortCompare. `undefined` sorts after every other value.
fn sort_compare(comparator: Option<&Object>, x: &Value, y: &Value) -> Result<Ordering> {
    match (x.is_undefined(), y.is_undefined()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Greater),
        (false, true) => return Ok(Ordering::Less),
        (false, false) => {}
    }
    if let Some(f) = comparator {
        let v = f.call(&Value::Undefined, &[x.clone(), y.clone()])?.to_number()?;
        return Ok(if v > 0.0 {
            Ordering::Greater
        } else if v < 0.0 || v.is_sign_negative() {
            Ordering::Less
        } else {
            Ordering::Equal
        });
    }
    let (xs, ys) = (x.to_js_string()?, y.to_js_string()?);
    Ok(xs.encode_utf16().cmp(ys.encode_utf16()))
}

/// Stable merge sort with a fallible comparator. On error the slice is left
/// in an unspecified order.
fn merge_sort<F>(items: &mut [Value], cmp: &mut F) -> Result<()>
where
    F: FnMut(&Value, &Value) -> Result<Ordering>,
{
    let len = items.len();
    if len <= 1 {
        return Ok(());
    }
    if len <= 8 {
        for i in 1..len {
            let mut j = i;
            while j > 0 && cmp(&items[j - 1], &items[j])? == Ordering::Greater {
                items.swap(j - 1, j);
                j -= 1;
            }
        }
        return Ok(());
    }
    let mid = len / 2;
    merge_sort(&mut items[..mid], cmp)?;
    merge_sort(&mut items[mid..], cmp)?;
    if cmp(&items[mid - 1], &items[mid])? != Ordering::Greater {
        return Ok(());
    }
    let left = items[..mid].to_vec();
    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < left.len() && j < len {
        if cmp(&items[j], &left[i])? == Ordering::Less {
            items[k] = items[j].clone();
            j += 1;
        } else {
            items[k] = left[i].clone();
            i += 1;
        }
        k += 1;
    }
    while i < left.len() {
        items[k] = left[i].clone();
        i += 1;
        k += 1;
    }
    Ok(())
}

fn array_sort(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let comparator = match arg(args, 0) {
        Value::Undefined => None,
        Value::Object(f) if f.is_callable() => Some(f),
        _ => return Err(Error::type_error(messages::BAD_COMPARATOR)),
    };
    let obj = rt.to_object(this)?;
    let mut compare = |x: &Value, y: &Value| sort_compare(comparator.as_ref(), x, y);

    if let Some(arr) = fast_array(rt, &obj, "sort", true) {
        if let Some(mut values) = arr.standard_values() {
            merge_sort(&mut values, &mut compare)?;
            if arr.is_standard_mutable() && arr.length() as usize == values.len() {
                arr.set_standard_values(values);
                return Ok(Value::Object(obj));
            }
            // The comparator reshaped the array; write back through the protocol.
            trace!("array changed during sort, writing back generically");
            for (k, value) in values.into_iter().enumerate() {
                obj.set(k, value, true)?;
            }
            return Ok(Value::Object(obj));
        }
    }

    let len = obj.length_of_array_like()?;
    let mut items = Vec::new();
    for k in 0..len {
        if let Some(value) = read_index(rt, &obj, k)? {
            items.push(value);
        }
    }
    merge_sort(&mut items, &mut compare)?;
    let count = items.len() as i64;
    for (k, value) in items.into_iter().enumerate() {
        obj.set(k, value, true)?;
    }
    for k in count..len {
        obj.delete(k, true)?;
    }
    Ok(Value::Object(obj))
}

fn array_splice(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    let len = obj.length_of_array_like()?;
    let start = relative_arg(&arg(args, 0), len)?;
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => {
            let dc = args[1].to_integer_or_infinity()?;
            dc.max(0.0).min((len - start) as f64) as i64
        }
    };
    let items = args.get(2..).unwrap_or(&[]);
    let item_count = items.len() as i64;
    let new_len = len - delete_count + item_count;
    if new_len > MAX_SAFE_INTEGER {
        return Err(Error::type_error(messages::INVALID_ARRAY_LENGTH));
    }
    let (removed, is_default) = species_create(rt, &obj, delete_count)?;

    if let (Some(out), Some(arr)) = (
        fast_result(rt, &removed, is_default),
        fast_array(rt, &obj, "splice", true),
    ) {
        // The species lookup may have resized the source.
        if arr.length() as i64 == len && new_len <= u32::MAX as i64 {
            if let Some(mut values) = arr.standard_values() {
                let (s, d) = (start as usize, delete_count as usize);
                let deleted: Vec<Value> = values.splice(s..s + d, items.iter().cloned()).collect();
                out.set_standard_values(deleted);
                arr.set_standard_values(values);
                return Ok(Value::Object(removed));
            }
        }
    }

    for k in 0..delete_count {
        if let Some(value) = read_index(rt, &obj, start + k)? {
            removed.create_data_property_or_throw(k, value)?;
        }
    }
    removed.set("length", delete_count, true)?;

    let shift = |from: i64, to: i64| -> Result<()> {
        if obj.has_property(from)? {
            let value = obj.get(from)?;
            obj.set(to, value, true)?;
        } else {
            obj.delete(to, true)?;
        }
        Ok(())
    };
    if item_count < delete_count {
        for k in start..len - delete_count {
            shift(k + delete_count, k + item_count)?;
        }
        let mut k = len;
        while k > new_len {
            obj.delete(k - 1, true)?;
            k -= 1;
        }
    } else if item_count > delete_count {
        let mut k = len - delete_count;
        while k > start {
            shift(k + delete_count - 1, k + item_count - 1)?;
            k -= 1;
        }
    }
    for (i, item) in items.iter().enumerate() {
        obj.set(start + i as i64, item.clone(), true)?;
    }
    obj.set("length", new_len, true)?;
    Ok(Value::Object(removed))
}

fn array_to_string(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    match obj.get("join")? {
        Value::Object(join) if join.is_callable() => join.call(&Value::Object(obj), &[]),
        _ => object_proto_to_string(rt, &Value::Object(obj), args),
    }
}

fn array_unshift(rt: &Runtime, this: &Value, args: &[Value]) -> Result<Value> {
    let obj = rt.to_object(this)?;
    if let Some(arr) = fast_array(rt, &obj, "unshift", true) {
        if arr.length() as u64 + args.len() as u64 <= u32::MAX as u64 {
            if let Some(values) = arr.standard_values() {
                let mut next = args.to_vec();
                next.extend(values);
                arr.set_standard_values(next);
                return Ok(Value::from(arr.length()));
            }
        }
    }
    let len = obj.length_of_array_like()?;
    let n = args.len() as i64;
    if n > 0 {
        check_new_length(len + n)?;
        let mut k = len;
        while k > 0 {
            let (from, to) = (k - 1, k + n - 1);
            if obj.has_property(from)? {
                let value = obj.get(from)?;
                obj.set(to, value, true)?;
            } else {
                obj.delete(to, true)?;
            }
            k -= 1;
        }
        for (j, item) in args.iter().enumerate() {
            obj.set(j, item.clone(), true)?;
        }
    }
    obj.set("length", len + n, true)?;
    Ok(Value::from(len + n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(items: &[i32]) -> Vec<Value> {
        items.iter().map(|&i| Value::from(i)).collect()
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let mut items: Vec<Value> = (0..40).map(|i| Value::from(format!("{}:{}", i % 3, i))).collect();
        let key = |v: &Value| v.as_str().map(|s| s.as_bytes()[0]).unwrap_or(0);
        let mut cmp = |a: &Value, b: &Value| Ok(key(a).cmp(&key(b)));
        merge_sort(&mut items, &mut cmp).unwrap();
        let strings: Vec<String> = items.iter().map(|v| v.to_string()).collect();
        let zeros: Vec<&String> = strings.iter().filter(|s| s.starts_with("0:")).collect();
        let indices: Vec<i32> = zeros.iter().map(|s| s[2..].parse().unwrap()).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted);
        assert!(strings[..14].iter().all(|s| s.starts_with("0:")));
    }

    #[test]
    fn test_merge_sort_propagates_errors() {
        let mut items = values(&[3, 1, 2]);
        let mut cmp = |_: &Value, _: &Value| Err(Error::thrown("boom"));
        assert!(merge_sort(&mut items, &mut cmp).is_err());
    }

    #[test]
    fn test_sort_compare_undefined_and_signbit() {
        assert_eq!(
            sort_compare(None, &Value::Undefined, &Value::from(1)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            sort_compare(None, &Value::from(10), &Value::from(9)).unwrap(),
            Ordering::Less
        );
        let rt = Runtime::new();
        let negative_zero = rt.new_function("cmp", 2, |_, _, _| Ok(Value::Float(-0.0)));
        assert_eq!(
            sort_compare(Some(&negative_zero), &Value::from(1), &Value::from(2)).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_species_create_defaults() {
        let rt = Runtime::new();
        let plain = rt.new_object();
        let (result, is_default) = species_create(&rt, &plain, 3).unwrap();
        assert!(is_default);
        assert_eq!(result.get("length").unwrap(), Value::from(3));

        let array = rt.new_array();
        array.set("constructor", 5, true).unwrap();
        let err = species_create(&rt, &array, 0).unwrap_err();
        assert_eq!(err.message(), messages::SPECIES_NOT_CONSTRUCTOR);
    }

    #[test]
    fn test_read_index_skips_holes() {
        let rt = Runtime::new();
        let array = rt.new_array_with_length(3).unwrap();
        array.set(1, "x", true).unwrap();
        assert_eq!(read_index(&rt, &array, 0).unwrap(), None);
        assert_eq!(read_index(&rt, &array, 1).unwrap(), Some(Value::from("x")));
    }

    #[test]
    fn test_relative_end() {
        assert_eq!(relative_end(None, 5).unwrap(), 5);
        assert_eq!(relative_end(Some(&Value::Undefined), 5).unwrap(), 5);
        assert_eq!(relative_end(Some(&Value::from(-1)), 5).unwrap(), 4);
    }
}
