use formwork::{BlockDefinition, Form, RecordState, Severity, Value};
use formwork_core::{
    gateway::{DmlKind, Operation, Response},
    BindValue,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tests::*;

fn kinds(log: &ExecLog) -> Vec<&'static str> {
    log.with_ops(|ops| {
        ops.iter()
            .map(|op| match &op.operation {
                Operation::Describe(_) => "describe",
                Operation::Select(_) => "select",
                Operation::Fetch(_) => "fetch",
                Operation::Batch(batch) => match batch.kind {
                    DmlKind::Insert => "insert",
                    DmlKind::Update => "update",
                    DmlKind::Delete => "delete",
                },
                Operation::Call(_) => "call",
                Operation::Lock(_) => "lock",
                Operation::Refresh(_) => "refresh",
                Operation::Close { .. } => "close",
                Operation::Commit => "commit",
                Operation::Rollback => "rollback",
            })
            .collect()
    })
}

#[tokio::test]
async fn commit_confirms_flushed_records() {
    let test = FormTest::new(standard);

    let view = Arc::new(RecordingView::new("ename"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(true).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());

    assert!(form.commit().await.unwrap());
    assert_eq!(kinds(&test.log()), ["describe", "insert", "commit"]);

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Consistent);
    assert!(!record.is_locked());
    assert_eq!(
        view.events().last(),
        Some(&ViewEvent::Attributes("Ann".into(), RecordState::Consistent))
    );
}

#[tokio::test]
async fn failed_commit_keeps_records_pending_confirmation() {
    let test = FormTest::new(|op| match op {
        Operation::Commit => Response::failure("transaction rolled back by the server"),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());

    assert!(!form.commit().await.unwrap());
    assert_eq!(kinds(&test.log()), ["describe", "insert", "commit"]);

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Inserted);

    let diagnostics = test.session().diagnostics().take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Severe);
    assert!(diagnostics[0]
        .message
        .contains("transaction rolled back by the server"));
}

#[tokio::test]
async fn rollback_empties_every_block() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) if table_of(op) == Some("emp") => {
            emp_rows(vec![emp(7369, "SMITH", 800, 20)])
        }
        Operation::Select(_) => dept_rows(vec![dept(20, "RESEARCH")]),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .block(BlockDefinition::new("dept", test.dept()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    let dept = form.block("dept").unwrap();

    assert!(emp.query().await.unwrap());
    assert!(dept.query().await.unwrap());
    assert!(emp.set_value("sal", 900).await.unwrap());

    assert!(form.rollback().await.unwrap());
    assert!(test.log().has_rollback());

    assert!(emp.is_empty().await);
    assert!(dept.is_empty().await);
    assert!(emp.current_record().await.is_none());

    // The blocks can be queried again right away
    assert!(emp.query().await.unwrap());
    assert_eq!(emp.len().await, 1);
}

#[tokio::test]
async fn stored_procedure_outputs() {
    let test = FormTest::new(|op| match op {
        Operation::Call(_) => Response::rows(["TOTAL"], ["NUMBER(10)"], vec![vec![900.into()]]),
        op => standard(op),
    });

    let params = [
        BindValue::new("empno", 7369),
        BindValue::output("total", "total"),
    ];
    let params = test.session().call("raise_salary", &params).await.unwrap();

    assert_eq!(test.log().texts(), ["call raise_salary(:empno, :total)"]);
    assert_eq!(params[0].value, Value::I64(7369));
    assert_eq!(params[1].value, Value::I64(900));
}
