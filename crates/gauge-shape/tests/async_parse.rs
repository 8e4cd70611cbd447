//! # Async Parse Tests
//!
//! Shapes with async operations or converters must be applied through the
//! async entry points. Members of containers run concurrently but results
//! are assembled in declaration order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use gauge_core::{ApplyOptions, Code, Error, Issue, PathKey, Validated, Value};
use gauge_shape::Shape;

static TRACING: Once = Once::new();

/// Route engine logs to the test writer; set `RUST_LOG=gauge_shape=debug`
/// to see union lookups and lazy resolution.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A number shape whose check sleeps for `value` milliseconds.
fn slow_number() -> Shape {
    Shape::number().check_async(|value, _| async move {
        let millis = value.as_f64().unwrap_or_default().max(0.0) as u64;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Vec::new())
    })
}

#[tokio::test]
async fn test_async_check_passes_and_keeps_identity() {
    init_tracing();
    let shape = Shape::array(slow_number());
    assert!(shape.is_async());
    let input = Value::array([Value::from(5), Value::from(1)]);
    let output = shape.parse_async(input.clone()).await.unwrap();
    assert!(output.same(&input));
}

#[tokio::test]
async fn test_results_assembled_in_declaration_order() {
    init_tracing();
    let shape = Shape::array(Shape::number().transform_async(|value, _| async move {
        let millis = value.as_f64().unwrap_or_default() as u64;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Value::from(format!("done:{millis}")))
    }));
    let input = Value::array([Value::from(20), Value::from(1), Value::from(10)]);
    let output = shape.parse_async(input).await.unwrap();
    assert_eq!(
        output,
        Value::array([
            Value::from("done:20"),
            Value::from("done:1"),
            Value::from("done:10"),
        ])
    );
}

#[tokio::test]
async fn test_async_issues_carry_paths() {
    init_tracing();
    let even = Shape::number().check_async(|value, _| async move {
        let n = value.as_f64().unwrap_or_default();
        if n % 2.0 == 0.0 {
            Ok(Vec::new())
        } else {
            Ok(vec![Issue::new(Code::Custom("even".into()), value)])
        }
    });
    let shape = Shape::object([("a", even.clone()), ("b", even)]);
    let input = Value::object([("a", Value::from(2)), ("b", Value::from(3))]);
    let Ok(Validated::Invalid(issues)) = shape.try_parse_async(input).await else {
        panic!("expected invalid");
    };
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].path, vec![PathKey::from("b")]);
}

#[tokio::test]
async fn test_sync_shapes_work_through_async_entry_points() {
    let shape = Shape::union([Shape::string(), Shape::number()]);
    assert!(!shape.is_async());
    assert_eq!(shape.parse_async(Value::from(1)).await.unwrap(), Value::from(1));
    assert!(shape.parse_async(Value::Null).await.is_err());
}

#[tokio::test]
async fn test_async_union_tries_branches_in_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let counted = Shape::string().check_async(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Vec::new()) }
    });
    let shape = Shape::union([Shape::number(), counted]);
    assert_eq!(shape.parse_async(Value::from(1)).await.unwrap(), Value::from(1));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(shape.parse_async(Value::from("a")).await.unwrap(), Value::from("a"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_fatal_error_propagates() {
    let shape = Shape::string().alter_async(|_, _| async { Err(Error::callback("timeout")) });
    let result = shape.parse_async(Value::from("x")).await;
    assert!(matches!(result, Err(Error::Callback(_))));
}

#[tokio::test]
async fn test_async_verbose_intersection_collects_all_branches() {
    let fails = |code: &'static str| {
        Shape::any().check_async(move |value, _| async move {
            Ok(vec![Issue::new(Code::Custom(code.into()), value)])
        })
    };
    let shape = Shape::intersection([fails("left"), fails("right")]);
    let options = ApplyOptions::new().verbose(true);
    let Ok(Validated::Invalid(issues)) = shape.try_parse_async_with(Value::Null, &options).await else {
        panic!("expected invalid");
    };
    let codes: Vec<Code> = issues.into_iter().map(|i| i.code).collect();
    assert_eq!(codes, vec![Code::Custom("left".into()), Code::Custom("right".into())]);
}

#[tokio::test]
async fn test_async_recursive_shape_over_cycle() {
    let slot: Arc<std::sync::OnceLock<Shape>> = Arc::new(std::sync::OnceLock::new());
    let provider_slot = Arc::clone(&slot);
    let node = Shape::lazy(move || provider_slot.get().cloned().unwrap_or_else(Shape::never));
    let _ = slot.set(Shape::object([("value", slow_number()), ("next", node.optional())]));
    assert!(node.is_async());

    let cyclic = Value::object([("value", Value::from(1))]);
    if let Value::Object(object) = &cyclic {
        object.insert("next", cyclic.clone());
    }
    let output = node.parse_async(cyclic.clone()).await.unwrap();
    assert!(output.same(&cyclic));
}

#[tokio::test]
async fn test_shared_member_is_not_mistaken_for_cycle() {
    init_tracing();
    let slot: Arc<std::sync::OnceLock<Shape>> = Arc::new(std::sync::OnceLock::new());
    let provider_slot = Arc::clone(&slot);
    let node = Shape::lazy(move || provider_slot.get().cloned().unwrap_or_else(Shape::never))
        .circular("<cycle>");
    let _ = slot.set(Shape::object([("v", slow_number())]));
    let shape = Shape::array(node);

    let shared = Value::object([("v", Value::from(5))]);
    let input = Value::array([shared.clone(), shared]);
    let output = shape.parse_async(input.clone()).await.unwrap();
    assert!(output.same(&input));

    let invalid = Value::object([("v", Value::from("x"))]);
    let verbose = ApplyOptions::new().verbose(true);
    let Ok(Validated::Invalid(issues)) = shape
        .try_parse_async_with(Value::array([invalid.clone(), invalid]), &verbose)
        .await
    else {
        panic!("expected invalid");
    };
    let paths: Vec<Vec<PathKey>> = issues.into_iter().map(|i| i.path).collect();
    assert_eq!(
        paths,
        vec![
            vec![PathKey::Index(0), PathKey::from("v")],
            vec![PathKey::Index(1), PathKey::from("v")],
        ]
    );
}
