use formwork::{BlockDefinition, Config, Form, LockMode, RecordState, Severity, Value};
use formwork_core::gateway::{DmlKind, Operation, Response};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tests::*;

fn pessimistic() -> Config {
    Config {
        lock_mode: LockMode::Pessimistic,
        ..Config::default()
    }
}

fn smith(op: &Operation) -> Response {
    match op {
        Operation::Select(_) => emp_rows(vec![emp(7369, "SMITH", 800, 20)]),
        Operation::Lock(_) | Operation::Refresh(_) => emp_rows(vec![emp(7369, "SMITH", 800, 20)]),
        op => standard(op),
    }
}

#[tokio::test]
async fn pessimistic_lock_before_first_change() {
    let test = FormTest::with_config(pessimistic(), smith);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    assert!(emp.set_value("sal", 1000).await.unwrap());
    assert!(emp.set_value("sal", 1100).await.unwrap());

    // Locked once, held for the second change
    let log = test.log();
    assert_eq!(log.locks(), 1);
    assert!(log.texts().contains(
        &"select empno, ename, sal, deptno from emp where empno = :pk_empno for update".to_string()
    ));

    let record = emp.current_record().await.unwrap();
    assert!(record.is_locked());
    assert_eq!(record.value("sal"), &Value::I64(1100));
    assert!(test.session().diagnostics().is_empty());
}

#[tokio::test]
async fn row_changed_underneath() {
    let test = FormTest::with_config(pessimistic(), |op| match op {
        Operation::Lock(_) => emp_rows(vec![emp(7369, "SMITH", 900, 20)]),
        op => smith(op),
    });

    let view = Arc::new(RecordingView::new("empno"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    assert!(!emp.set_value("sal", 1000).await.unwrap());

    // The record now holds the backend's values
    let record = emp.current_record().await.unwrap();
    assert_eq!(record.value("sal"), &Value::I64(900));
    assert!(!record.is_dirty());
    assert!(record.is_locked());
    assert!(view.events().contains(&ViewEvent::Refresh(Value::I64(7369))));

    let diagnostics = test.session().diagnostics().take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(
        diagnostics[0].message,
        "row empno=7369 of `emp` was changed by another user (sal); record refreshed"
    );

    // The lock is held, so the retry goes straight through
    assert!(emp.set_value("sal", 1000).await.unwrap());
    assert_eq!(test.log().locks(), 1);
}

#[tokio::test]
async fn row_deleted_underneath() {
    let test = FormTest::with_config(pessimistic(), |op| match op {
        Operation::Lock(_) => emp_rows(vec![]),
        op => smith(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    assert!(!emp.set_value("sal", 1000).await.unwrap());

    let record = emp.current_record().await.unwrap();
    assert!(record.is_failed());
    assert!(!record.is_locked());
    assert_eq!(record.value("sal"), &Value::I64(800));

    assert!(test.session().diagnostics().any(|d| {
        d.severity == Severity::Warning && d.message.ends_with("was deleted by another user")
    }));
}

#[tokio::test]
async fn optimistic_update_rejected() {
    let test = FormTest::new(|op| match op {
        Operation::Batch(_) => Response::ok().with_results(vec![Response {
            violations: Some(vec!["SAL".to_string()]),
            ..Response::failure("row was changed")
        }]),
        Operation::Refresh(_) => emp_rows(vec![emp(7369, "SMITH", 950, 20)]),
        op => smith(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    // No lock under optimistic locking; the update asserts the old values
    assert!(emp.set_value("sal", 1000).await.unwrap());
    assert_eq!(test.log().locks(), 0);

    assert!(!emp.flush().await.unwrap());

    let log = test.log();
    assert!(log.has_batch(DmlKind::Update));
    log.with_ops(|ops| {
        let update = ops
            .iter()
            .find_map(|op| match &op.operation {
                Operation::Batch(batch) => Some(&batch.requests[0].statement),
                _ => None,
            })
            .unwrap();

        assert_eq!(update.text, "update emp set sal = :sal where empno = :pk_empno");
        assert!(update.assertion.is_some());
    });
    assert!(log.any(|op| matches!(op, Operation::Refresh(_))));

    // Back to the last synchronized state, holding the backend's values
    let record = emp.current_record().await.unwrap();
    assert_eq!(record.value("sal"), &Value::I64(950));
    assert_eq!(record.state(), RecordState::Consistent);
    assert!(!record.is_dirty());
    assert!(record.is_failed());

    assert!(test.session().diagnostics().any(|d| {
        d.message == "row empno=7369 of `emp` was changed by another user (sal); record refreshed"
    }));
}

#[tokio::test]
async fn explicit_lock_and_lock_modes() {
    let test = FormTest::new(smith);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .block(BlockDefinition::new("emp_unlocked", test.emp()).lock_mode(LockMode::None))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.lock().await.unwrap());
    assert!(emp.current_record().await.unwrap().is_locked());
    assert_eq!(test.log().locks(), 1);

    let unlocked = form.block("emp_unlocked").unwrap();
    assert!(unlocked.query().await.unwrap());
    assert!(unlocked.lock().await.unwrap());
    assert!(!unlocked.current_record().await.unwrap().is_locked());
    assert_eq!(test.log().locks(), 1);
}

#[tokio::test]
async fn non_transactional_sources_never_lock() {
    let config = Config {
        transactional: false,
        ..pessimistic()
    };
    let test = FormTest::with_config(config, smith);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 1000).await.unwrap());
    assert!(emp.lock().await.unwrap());

    assert_eq!(test.log().locks(), 0);
}
