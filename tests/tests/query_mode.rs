use formwork::{BlockDefinition, Filter, Form, Value};
use formwork_core::gateway::Operation;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tests::*;

fn select_texts(log: &ExecLog) -> Vec<String> {
    log.with_ops(|ops| {
        ops.iter()
            .filter(|op| op.operation.is_select())
            .filter_map(|op| op.operation.text().map(str::to_string))
            .collect()
    })
}

#[tokio::test]
async fn query_by_example() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) => emp_rows(vec![emp(7369, "SMITH", 800, 20)]),
        op => standard(op),
    });

    let view = Arc::new(RecordingView::new("ename"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.enter_query_mode().await.unwrap());
    assert!(emp.is_query_mode().await);

    // Criteria go to the search template, not to a record
    assert!(emp.set_value("ename", "S%").await.unwrap());
    assert!(emp.set_value("sal", 800).await.unwrap());
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("S%"));
    assert!(emp.current_record().await.is_none());

    assert!(emp.query().await.unwrap());
    assert!(!emp.is_query_mode().await);

    let texts = select_texts(&test.log());
    assert_eq!(
        texts,
        ["select empno, ename, sal, deptno from emp \
          where (ename like :qbe_ename and sal = :qbe_sal)"]
    );
    assert_eq!(view.rows(), [Value::from("SMITH")]);

    // The criteria can be recalled for the next search
    assert!(emp.enter_query_mode().await.unwrap());
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::Null);
    assert!(emp.show_last_query().await.unwrap());
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("S%"));
    assert_eq!(emp.get_value("sal").await.unwrap(), Value::I64(800));

    // Leaving without querying keeps the records
    assert!(emp.exit_query_mode().await);
    assert!(!emp.exit_query_mode().await);
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("SMITH"));
    assert_eq!(select_texts(&test.log()).len(), 1);
}

#[tokio::test]
async fn explicit_qbe_filter() {
    let test = FormTest::new(standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();

    // Only in query mode
    assert!(!emp
        .set_qbe_filter("empno", Some(Filter::any_of("empno")))
        .await
        .unwrap());

    assert!(emp.enter_query_mode().await.unwrap());
    assert!(emp
        .set_qbe_filter("empno", Some(Filter::any_of("empno")))
        .await
        .unwrap());
    assert!(emp.set_value("empno", 7369).await.unwrap());
    assert!(emp
        .set_qbe_filter("bonus", None)
        .await
        .unwrap_err()
        .is_unknown_column());

    assert!(emp.query().await.unwrap());
    assert_eq!(
        select_texts(&test.log()),
        ["select empno, ename, sal, deptno from emp where (empno in (:qbe_empno_0))"]
    );
}

#[tokio::test]
async fn unsaved_changes_keep_the_block_out_of_query_mode() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) => emp_rows(vec![emp(7369, "SMITH", 800, 20)]),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 900).await.unwrap());

    assert!(!emp.enter_query_mode().await.unwrap());
    assert!(test
        .session()
        .diagnostics()
        .any(|d| d.message.contains("has unsaved changes")));

    // Navigation and inserts are refused while searching
    assert!(emp.undo().await.unwrap());
    assert!(emp.enter_query_mode().await.unwrap());
    assert!(!emp.insert(false).await.unwrap());
    assert!(!emp.first().await.unwrap());
    assert!(!emp.delete().await.unwrap());
}
