use formwork::{BlockDefinition, Config, Form, Severity, Value};
use formwork_core::gateway::{Operation, Response};
use pretty_assertions::assert_eq;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tests::*;

/// The first select answers `OLD`, every later one `NEW`.
fn old_then_new() -> impl Fn(&Operation) -> Response + Send + Sync + 'static {
    let selects = AtomicUsize::new(0);

    move |op| match op {
        Operation::Select(_) => match selects.fetch_add(1, Ordering::SeqCst) {
            0 => emp_rows(vec![emp(1, "OLD", 100, 10)]),
            _ => emp_rows(vec![emp(2, "NEW", 200, 10)]),
        },
        op => standard(op),
    }
}

#[tokio::test]
async fn superseded_query_is_discarded() {
    let test = FormTest::new(old_then_new());

    let view = Arc::new(RecordingView::new("ename"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    let gate = test.gateway().hold_next_select();

    let first = tokio::spawn({
        let emp = emp.clone();
        async move { emp.query().await }
    });
    gate.arrived().await;
    assert_eq!(form.queries().running_generation("emp"), Some(1));

    let second = tokio::spawn({
        let emp = emp.clone();
        async move { emp.query().await }
    });
    while form.queries().running_generation("emp") != Some(2) {
        tokio::task::yield_now().await;
    }
    gate.release();

    // Both complete without error; only the newer one touches the block
    assert!(first.await.unwrap().unwrap());
    assert!(second.await.unwrap().unwrap());

    assert_eq!(test.log().selects(), 2);
    assert_eq!(emp.len().await, 1);
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("NEW"));

    assert_eq!(view.rows(), [Value::from("NEW")]);
    assert!(!view
        .events()
        .contains(&ViewEvent::Display(Value::from("OLD"))));

    assert_eq!(form.queries().running_generation("emp"), None);
}

#[tokio::test]
async fn slow_query_warns_the_next_caller() {
    let config = Config {
        query_poll_interval_ms: 1,
        query_poll_limit: 3,
        ..Config::default()
    };
    let test = FormTest::with_config(config, old_then_new());

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    let gate = test.gateway().hold_next_select();

    let first = tokio::spawn({
        let emp = emp.clone();
        async move { emp.query().await }
    });
    gate.arrived().await;

    let waiting = tokio::spawn({
        let emp = emp.clone();
        async move { emp.len().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(test.session().diagnostics().any(|d| {
        d.severity == Severity::Warning && d.message == "block `emp` is waiting on previous query"
    }));

    gate.release();
    assert!(first.await.unwrap().unwrap());
    assert_eq!(waiting.await.unwrap(), 1);
}

#[tokio::test]
async fn blocks_query_independently() {
    let test = FormTest::new(standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .block(BlockDefinition::new("dept", test.dept()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    let dept = form.block("dept").unwrap();

    let gate = test.gateway().hold_next_select();
    let held = tokio::spawn({
        let emp = emp.clone();
        async move { emp.query().await }
    });
    gate.arrived().await;

    // A query on another block is not held up
    assert!(dept.query().await.unwrap());
    assert_eq!(form.queries().running_generation("emp"), Some(1));

    gate.release();
    assert!(held.await.unwrap().unwrap());
}
