// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! End-to-end scenarios exercised through the public `Dict` façade rather
//! than the internal `Engine`.

use quiverdb_engine::{Dict, EngineOptions, Kind, OpenOptions};
use quiverdb_type::{DType, NdArray, Value};
use std::sync::Arc;
use std::thread;

#[test]
fn rebuild_open_then_reopen_observes_the_write() {
    let dir = tempfile::tempdir().unwrap();
    {
        let dict = Dict::open_with_storage_options(
            "demo",
            dir.path(),
            Kind::Lsm,
            OpenOptions { rebuild: true, ..OpenOptions::default() },
            EngineOptions::default(),
            false,
        )
        .unwrap();
        dict.set(&Value::Text("k".into()), &Value::Text("v".into())).unwrap();
        assert_eq!(dict.get(&Value::Text("k".into()), Value::Undefined).unwrap(), Value::Text("v".into()));
        dict.write_immediately(true).unwrap();
        dict.close(true, true).unwrap();
    }

    let reopened = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
    assert_eq!(reopened.get(&Value::Text("k".into()), Value::Undefined).unwrap(), Value::Text("v".into()));
}

#[test]
fn nested_tuple_key_round_trips_through_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let dict = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();

    let key = Value::tuple([Value::Int(1), Value::tuple([Value::Int(2), Value::Int(3)])]);
    let value = Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    dict.set(&key, &value).unwrap();

    let keys = dict.keys().unwrap();
    assert_eq!(keys, vec![key]);
    match &keys[0] {
        Value::Tuple(items) => match &items[1] {
            Value::Tuple(_) => {}
            other => panic!("expected the nested element to be a Tuple, got {other:?}"),
        },
        other => panic!("expected a Tuple key, got {other:?}"),
    }
}

#[test]
fn numeric_array_survives_flush_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let shape = vec![100u64, 100];
    let mut data = Vec::with_capacity(100 * 100 * 8);
    // A fixed but non-uniform fill stands in for "uniform random values":
    // what matters for this scenario is that the raw buffer round-trips
    // byte-for-byte, not the particular distribution of values in it.
    for i in 0..100 * 100u64 {
        data.extend_from_slice(&(i as f64 * 0.5).to_le_bytes());
    }
    let array = Value::Array(NdArray { dtype: DType::F64, shape: shape.clone(), data: data.clone() });

    {
        let dict = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
        dict.set(&Value::Text("arr".into()), &array).unwrap();
        dict.write_immediately(true).unwrap();
        dict.close(true, true).unwrap();
    }

    let reopened = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
    match reopened.get(&Value::Text("arr".into()), Value::Undefined).unwrap() {
        Value::Array(arr) => {
            assert_eq!(arr.dtype, DType::F64);
            assert_eq!(arr.shape, shape);
            assert_eq!(arr.data, data);
        }
        other => panic!("expected an Array value, got {other:?}"),
    }
}

#[test]
fn max_buffer_size_flush_preserves_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = EngineOptions::default();
    options.max_buffer_size = 10;
    let dict = Dict::open("demo", dir.path(), Kind::Lsm, options).unwrap();

    for i in 0..16u32 {
        dict.set(&Value::Int(i as i64), &Value::Int(i as i64)).unwrap();
    }
    dict.write_immediately(true).unwrap();
    thread::sleep(std::time::Duration::from_millis(50));

    assert_eq!(dict.len().unwrap(), 16);
    for i in 0..16u32 {
        assert_eq!(dict.get(&Value::Int(i as i64), Value::Undefined).unwrap(), Value::Int(i as i64));
    }
}

#[test]
fn concurrent_writers_from_two_threads_both_land() {
    let dir = tempfile::tempdir().unwrap();
    let dict = Arc::new(Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap());

    let writer = |dict: Arc<Dict>, start: i64| {
        thread::spawn(move || {
            for i in start..start + 100 {
                dict.set(&Value::Int(i), &Value::Int(i * 2)).unwrap();
            }
        })
    };
    let a = writer(Arc::clone(&dict), 0);
    let b = writer(Arc::clone(&dict), 100);
    a.join().unwrap();
    b.join().unwrap();

    dict.write_immediately(true).unwrap();
    assert_eq!(dict.len().unwrap(), 200);
    dict.close(true, true).unwrap();

    let reopened = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
    assert_eq!(reopened.len().unwrap(), 200);
    for i in 0..200i64 {
        assert_eq!(reopened.get(&Value::Int(i), Value::Undefined).unwrap(), Value::Int(i * 2));
    }
}

#[test]
fn clear_empties_the_store_and_is_usable_afterwards() {
    let dir = tempfile::tempdir().unwrap();
    let dict = Dict::open("demo", dir.path(), Kind::BPlus, EngineOptions::default()).unwrap();
    dict.set(&Value::Text("a".into()), &Value::Int(1)).unwrap();
    dict.write_immediately(true).unwrap();
    assert_eq!(dict.len().unwrap(), 1);

    dict.clear().unwrap();
    assert_eq!(dict.len().unwrap(), 0);

    dict.set(&Value::Text("b".into()), &Value::Int(2)).unwrap();
    dict.write_immediately(true).unwrap();
    assert_eq!(dict.get(&Value::Text("b".into()), Value::Undefined).unwrap(), Value::Int(2));
}

#[test]
fn clear_is_refused_while_a_snapshot_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let dict = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
    dict.set(&Value::Int(1), &Value::Int(1)).unwrap();
    dict.write_immediately(true).unwrap();

    let snap = dict.engine().snapshot().unwrap();
    assert!(dict.clear().is_err());
    drop(snap);
    assert!(dict.clear().is_ok());
}

#[test]
fn stat_reports_count_buffer_and_backend_kind() {
    let dir = tempfile::tempdir().unwrap();
    let dict = Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default()).unwrap();
    dict.set(&Value::Int(1), &Value::Int(1)).unwrap();
    let stat = dict.stat().unwrap();
    assert_eq!(stat.db, "demo");
    assert_eq!(stat.backend, "lsm");
    assert_eq!(stat.buffer, 1);
    assert_eq!(stat.count, 1);
}
