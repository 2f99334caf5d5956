use formwork::{BlockDefinition, Filter, Form, Session, Severity, Table, Type, Value};
use formwork::{DatabaseTable, RecordState};
use formwork_core::gateway::Operation;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tests::*;

#[tokio::test]
async fn equals_filter_reaches_the_statement() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) => emp_rows(vec![emp(7369, "SMITH", 800, 20)]),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    emp.add_filter(Filter::equals("deptno").with_constraint(20), "deptno")
        .await;

    assert!(emp.query().await.unwrap());

    let mut log = test.log();

    // The table is described before the first select
    let (op, _) = log.pop().unwrap();
    assert!(op.is_describe());
    assert_eq!(op.text(), Some("select * from emp where 1 = 2"));

    let (op, _) = log.pop().unwrap();
    let Operation::Select(request) = op else {
        panic!("expected a select, got {op:?}");
    };

    assert_eq!(
        request.statement.text,
        "select empno, ename, sal, deptno from emp where (deptno = :deptno)"
    );
    assert_eq!(request.array_fetch_size, Some(32));
    assert_eq!(request.statement.binds.len(), 1);
    assert_eq!(request.statement.binds[0].name, "deptno");
    assert_eq!(request.statement.binds[0].value, Value::I64(20));
    assert_eq!(request.statement.binds[0].ty, Some(Type::Int));

    // A single short batch is the whole result
    assert!(log.is_empty());

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.value("ename"), &Value::from("SMITH"));
    assert_eq!(record.state(), RecordState::Consistent);
    assert_eq!(emp.current_position().await, Some(0));
}

#[tokio::test]
async fn full_batch_costs_one_empty_fetch() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) => emp_rows(
            (1..=32)
                .map(|n| emp(n, &format!("E{n}"), 1000, 10))
                .collect(),
        ),
        Operation::Fetch(_) => emp_rows(vec![]),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    // Records are pulled into the block lazily
    assert_eq!(emp.len().await, 1);
    assert!(!emp.is_eof().await);
    assert_eq!(test.log().fetches(), 0);

    assert!(emp.last().await.unwrap());
    assert_eq!(emp.len().await, 32);
    assert_eq!(emp.current_position().await, Some(31));
    assert_eq!(emp.get_value("empno").await.unwrap(), Value::I64(32));
    assert!(emp.is_eof().await);

    let log = test.log();
    assert_eq!(log.fetches(), 1);
    log.with_ops(|ops| {
        let Operation::Fetch(fetch) = &ops.last().unwrap().operation else {
            panic!("expected the last operation to be a fetch");
        };
        assert_eq!(fetch.cursor.0, "emp_cursor");
        assert_eq!(fetch.array_fetch_size, 32);
    });

    // Nothing more to read
    assert!(!emp.next().await.unwrap());
    assert_eq!(test.log().fetches(), 1);
}

#[tokio::test]
async fn navigation() {
    let test = FormTest::new(|op| match op {
        Operation::Select(_) => emp_rows(vec![
            emp(7369, "SMITH", 800, 20),
            emp(7499, "ALLEN", 1600, 30),
            emp(7521, "WARD", 1250, 30),
        ]),
        op => standard(op),
    });

    let view = Arc::new(RecordingView::new("ename"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert_eq!(view.rows(), [Value::from("SMITH")]);

    assert!(emp.next().await.unwrap());
    assert!(emp.next().await.unwrap());
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("WARD"));
    assert!(!emp.next().await.unwrap());

    assert!(emp.prev().await.unwrap());
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("ALLEN"));

    assert!(emp.first().await.unwrap());
    assert!(!emp.prev().await.unwrap());
    assert_eq!(emp.current_position().await, Some(0));

    assert_eq!(
        view.rows(),
        [Value::from("SMITH"), Value::from("ALLEN"), Value::from("WARD")]
    );

    assert!(emp.get_value("bonus").await.unwrap_err().is_unknown_column());
}

#[tokio::test]
async fn user_filters_can_be_removed() {
    let test = FormTest::new(standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    emp.add_filter(Filter::like("ename").with_constraint("S%"), "name")
        .await;
    assert!(emp.remove_filter("NAME").await);
    assert!(!emp.remove_filter("name").await);
    assert!(emp.filter().await.is_empty());

    assert!(emp.query().await.unwrap());
    assert_eq!(
        test.log().texts().last().map(String::as_str),
        Some("select empno, ename, sal, deptno from emp")
    );
    assert!(emp.is_empty().await);
    assert!(emp.current_record().await.is_none());
}

#[tokio::test]
async fn not_connected_is_reported() {
    init_logging();

    let session = Session::builder().build();
    assert!(!session.is_connected());

    let form = Form::builder(&session)
        .block(BlockDefinition::new(
            "emp",
            DatabaseTable::new(&session, Table::new("emp")),
        ))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(!emp.query().await.unwrap());

    let diagnostics = session.diagnostics().take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Severe);

    assert!(!form.commit().await.unwrap());
    assert!(session
        .diagnostics()
        .any(|d| d.severity == Severity::Severe && d.message.starts_with("commit failed")));
}

#[tokio::test]
async fn unknown_block() {
    let test = FormTest::new(standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("EMP", test.emp()))
        .build()
        .unwrap();

    assert_eq!(form.blocks().collect::<Vec<_>>(), ["emp"]);
    assert!(form.block("Emp").is_ok());
    assert!(form.block("dept").unwrap_err().is_unknown_block());

    let err = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .relation(formwork::Relation::new("dept", "emp").link("deptno", "deptno"))
        .build()
        .unwrap_err();
    assert!(err.is_unknown_block());

    assert!(Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .is_err());
}
