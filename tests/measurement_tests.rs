use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pulse::{MemoryCollector, Tracker};
use serde_json::Value;

fn objects(payload: &str) -> Vec<Value> {
    let parsed: Value = serde_json::from_str(payload).expect("payload should be valid JSON");
    parsed.as_array().expect("payload should be an array").clone()
}

#[test]
fn test_single_scope_with_custom_value() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    // 1. Open, record, close
    let mut scope = tracker.track("main");
    scope.add_value("Custom", "ms", 1000);
    scope.close().expect("close should succeed");

    // 2. Exactly one emission, tagged with the routing label
    let batches = sink.batches();
    assert_eq!(batches.len(), 1, "Root closure should emit exactly once");
    assert_eq!(batches[0].0, "PerfCounters");

    // 3. One object carrying the value and its unit
    let objs = objects(&batches[0].1);
    assert_eq!(objs.len(), 1, "Single scope should render a single object");
    assert_eq!(objs[0]["OperationName"], "main");
    assert_eq!(objs[0]["LogType"], "Performance");
    assert_eq!(objs[0]["Custom"], 1000);
    assert_eq!(objs[0]["Custom_unit"], "ms");
    assert!(
        objs[0].get("ParentOperationId").is_none(),
        "Roots carry no parent id"
    );
    let id = objs[0]["OperationId"].as_str().expect("id should be a string");
    assert!(!id.is_empty(), "OperationId should be populated");
}

#[test]
fn test_elapsed_is_always_recorded() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    let scope = tracker.track("sleepy");
    thread::sleep(Duration::from_millis(25));
    scope.close().expect("close should succeed");

    let objs = objects(&sink.batches()[0].1);
    let elapsed = objs[0]["Elapsed"].as_i64().expect("Elapsed should be numeric");
    assert!(elapsed >= 25, "Elapsed ({}) should cover the sleep", elapsed);
    assert_eq!(objs[0]["Elapsed_unit"], "ms");
}

#[test]
fn test_every_value_is_paired_with_a_unit() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    let mut scope = tracker.track("paired");
    scope.add_value("Reads", "count", 7);
    scope.add_value("Writes", "count", 3);
    scope.set_property("Region", "eu");
    scope.close().expect("close should succeed");

    let objs = objects(&sink.batches()[0].1);
    let obj = objs[0].as_object().expect("element should be an object");
    for (key, value) in obj {
        if let Some(base) = key.strip_suffix("_unit") {
            assert!(obj.contains_key(base), "Orphaned unit key: {}", key);
            assert!(obj[base].is_i64(), "Unit {} should pair with a number", key);
        } else if value.is_i64() {
            let unit_key = format!("{}_unit", key);
            assert!(obj.contains_key(&unit_key), "Numeric fact {} lacks a unit", key);
        }
    }
}

#[test]
fn test_property_overwrite_keeps_first_position() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    let mut scope = tracker.track("props");
    scope.set_property("alpha", "first");
    scope.set_property("beta", "second");
    scope.set_property("alpha", "third");
    scope.close().expect("close should succeed");

    let payload = sink.batches()[0].1.clone();
    assert!(
        payload.contains(r#""alpha":"third""#),
        "Last write should win: {}",
        payload
    );
    let alpha = payload.find(r#""alpha""#).expect("alpha should render");
    let beta = payload.find(r#""beta""#).expect("beta should render");
    assert!(alpha < beta, "Overwrite should keep the original position");
}

#[test]
fn test_duplicate_value_names_render_repeated_keys() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    let mut scope = tracker.track("retries");
    scope.add_value("Retry", "count", 1);
    scope.add_value("Retry", "count", 2);
    scope.close().expect("close should succeed");

    // Parsers collapse repeated keys, so assert on the raw text
    let payload = sink.batches()[0].1.clone();
    assert_eq!(
        payload.matches(r#""Retry":"#).count(),
        2,
        "Both duplicate values should render: {}",
        payload
    );
    assert_eq!(
        payload.matches(r#""Retry_unit":"#).count(),
        2,
        "Both duplicate units should render: {}",
        payload
    );
}

#[test]
fn test_property_and_flag_may_share_a_name() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    let mut scope = tracker.track("cache");
    scope.set_property("Cached", "warm");
    scope.set_flag("Cached", true);
    scope.close().expect("close should succeed");

    // Two same-named entries, property block before flag block
    let payload = sink.batches()[0].1.clone();
    let as_property = payload
        .find(r#""Cached":"warm""#)
        .expect("property entry should render");
    let as_flag = payload
        .find(r#""Cached":true"#)
        .expect("flag entry should render");
    assert!(as_property < as_flag, "Properties render before flags");
}

#[test]
fn test_drop_closes_and_emits() {
    let sink = Arc::new(MemoryCollector::new());
    let tracker = Tracker::new("PerfCounters", sink.clone());

    {
        let mut scope = tracker.track("abandoned");
        scope.set_flag("clean_exit", false);
        // No explicit close; the scope exits here
    }

    let batches = sink.batches();
    assert_eq!(batches.len(), 1, "Drop must still flush the scope");
    let objs = objects(&batches[0].1);
    assert_eq!(objs[0]["OperationName"], "abandoned");
    assert_eq!(objs[0]["clean_exit"], false);
}
