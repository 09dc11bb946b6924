//! Randomized comparison of the array fast paths against the generic
//! per-index protocol

mod common;
use common::{call_array_method, runtime_with_fast_paths, to_json};
use pretty_assertions::assert_eq;
use quicksilver_objects::{Object, Runtime, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
enum Op {
    MapDouble,
    FilterEven,
    Slice(i64, i64),
    Splice(i64, i64, Vec<i64>),
    SortDefault,
    SortNumeric,
    Push(Vec<i64>),
    Reverse,
}

fn random_op(rng: &mut StdRng) -> Op {
    let small = |rng: &mut StdRng| rng.gen_range(-8..12);
    match rng.gen_range(0..8) {
        0 => Op::MapDouble,
        1 => Op::FilterEven,
        2 => Op::Slice(small(rng), small(rng)),
        3 => {
            let count = rng.gen_range(0..4);
            let items = (0..count).map(|_| rng.gen_range(-50..50)).collect();
            Op::Splice(small(rng), rng.gen_range(-1..6), items)
        }
        4 => Op::SortDefault,
        5 => Op::SortNumeric,
        6 => Op::Push((0..rng.gen_range(1..4)).map(|_| rng.gen_range(-50..50)).collect()),
        _ => Op::Reverse,
    }
}

/// Apply `op` to `receiver` and return the method result
fn apply(rt: &Runtime, receiver: &Object, op: &Op) -> Value {
    let this = Value::from(receiver);
    let (method, args): (&str, Vec<Value>) = match op {
        Op::MapDouble => {
            let f = rt.new_function("double", 1, |_, _, args| Ok(Value::number(args[0].to_number()? * 2.0)));
            ("map", vec![f.into()])
        }
        Op::FilterEven => {
            let f = rt.new_function("even", 1, |_, _, args| {
                Ok(Value::Bool(args[0].to_number()?.rem_euclid(2.0) == 0.0))
            });
            ("filter", vec![f.into()])
        }
        Op::Slice(start, end) => ("slice", vec![(*start).into(), (*end).into()]),
        Op::Splice(start, delete, items) => {
            let mut args = vec![Value::from(*start), Value::from(*delete)];
            args.extend(items.iter().map(|&i| Value::from(i)));
            ("splice", args)
        }
        Op::SortDefault => ("sort", vec![]),
        Op::SortNumeric => {
            let f = rt.new_function("cmp", 2, |_, _, args| {
                Ok(Value::number(args[0].to_number()? - args[1].to_number()?))
            });
            ("sort", vec![f.into()])
        }
        Op::Push(items) => ("push", items.iter().map(|&i| Value::from(i)).collect()),
        Op::Reverse => ("reverse", vec![]),
    };
    call_array_method(rt, &this, method, &args).unwrap()
}

fn build(rt: &Runtime, values: &[i64]) -> Object {
    rt.new_array_from_values(values.iter().map(|&v| Value::from(v)).collect())
}

fn run_sequence(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = rng.gen_range(0..24);
    let initial: Vec<i64> = (0..len).map(|_| rng.gen_range(-100..100)).collect();
    let ops: Vec<Op> = (0..12).map(|_| random_op(&mut rng)).collect();

    let fast = runtime_with_fast_paths(true);
    let slow = runtime_with_fast_paths(false);
    let fast_arr = build(&fast, &initial);
    let slow_arr = build(&slow, &initial);

    for op in &ops {
        let fast_result = apply(&fast, &fast_arr, op);
        let slow_result = apply(&slow, &slow_arr, op);
        assert_eq!(
            to_json(&fast, &fast_result),
            to_json(&slow, &slow_result),
            "seed {seed}: result of {op:?}"
        );
        assert_eq!(
            to_json(&fast, &Value::from(&fast_arr)),
            to_json(&slow, &Value::from(&slow_arr)),
            "seed {seed}: receiver after {op:?}"
        );
        assert_eq!(fast_arr.get("length").unwrap(), slow_arr.get("length").unwrap());
    }
}

mod equivalence {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_random_sequences_match() {
        for seed in 0..200 {
            run_sequence(seed);
        }
    }

    #[test]
    fn test_fresh_array_takes_fast_path() {
        let rt = runtime_with_fast_paths(true);
        let arr = build(&rt, &[3, 1, 2]);
        assert!(arr.as_array().unwrap().is_standard());
        apply(&rt, &arr, &Op::SortNumeric);
        assert!(arr.as_array().unwrap().is_standard());
        assert_eq!(to_json(&rt, &Value::from(&arr)), serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_extra_property_leaves_fast_path() {
        let rt = runtime_with_fast_paths(true);
        let arr = build(&rt, &[1, 2]);
        arr.set("tag", "x", true).unwrap();
        assert!(!arr.as_array().unwrap().is_standard());
        let mapped = apply(&rt, &arr, &Op::MapDouble);
        assert_eq!(to_json(&rt, &mapped), serde_json::json!([2, 4]));
    }

    #[test]
    fn test_hole_leaves_fast_path() {
        let rt = runtime_with_fast_paths(true);
        let arr = build(&rt, &[1, 2, 3]);
        arr.delete(1, true).unwrap();
        assert!(!arr.as_array().unwrap().is_standard());
        let filtered = apply(&rt, &arr, &Op::FilterEven);
        assert_eq!(to_json(&rt, &filtered), serde_json::json!([]));
        arr.set(1, 2, true).unwrap();
        assert!(arr.as_array().unwrap().is_standard());
    }

    #[test]
    fn test_comparator_mutation_is_observed() {
        // A comparator that grows the array forces the result back through
        // the generic write path.
        for fast_paths in [true, false] {
            let rt = runtime_with_fast_paths(fast_paths);
            let arr = build(&rt, &[2, 1]);
            let target = arr.clone();
            let cmp = rt.new_function("cmp", 2, move |_, _, args| {
                target.set("extra", true, true)?;
                Ok(Value::number(args[0].to_number()? - args[1].to_number()?))
            });
            call_array_method(&rt, &Value::from(&arr), "sort", &[cmp.into()]).unwrap();
            assert_eq!(arr.get(0).unwrap(), Value::from(1));
            assert_eq!(arr.get("extra").unwrap(), Value::Bool(true));
        }
    }
}
