use formwork::{BlockDefinition, Filter, Form, QueryTable, Severity, Statement, Value};
use formwork_core::{
    gateway::{Operation, Response},
    BindValue,
};
use pretty_assertions::assert_eq;
use tests::*;

fn high_earners(op: &Operation) -> Response {
    match op {
        Operation::Describe(_) => Response::rows(EMP_COLUMNS, EMP_TYPES, vec![]),
        Operation::Select(_) => emp_rows(vec![
            emp(7839, "KING", 5000, 10),
            emp(7902, "FORD", 3000, 20),
        ]),
        op => standard(op),
    }
}

fn query(test: &FormTest) -> QueryTable {
    let mut stmt = Statement::new("select * from emp where sal > :min_sal");
    stmt.binds.push(BindValue::new("min_sal", 2000));

    QueryTable::new(test.session(), "high_earners", stmt).with_order("sal desc")
}

#[tokio::test]
async fn filters_wrap_the_query() {
    let test = FormTest::new(high_earners);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("high_earners", query(&test)))
        .build()
        .unwrap();

    let block = form.block("high_earners").unwrap();
    block
        .add_filter(Filter::equals("deptno").with_constraint(10), "deptno")
        .await;
    assert!(block.query().await.unwrap());

    let log = test.log();
    assert_eq!(
        log.texts(),
        [
            "select * from (select * from emp where sal > :min_sal) q where 1 = 2",
            "select * from (select * from emp where sal > :min_sal) q \
             where (deptno = :deptno) order by sal desc",
        ]
    );

    log.with_ops(|ops| {
        let Operation::Select(request) = &ops[1].operation else {
            panic!("expected a select");
        };
        let names: Vec<_> = request
            .statement
            .binds
            .iter()
            .map(|bind| bind.name.as_str())
            .collect();
        assert_eq!(names, ["min_sal", "deptno"]);
    });

    assert_eq!(block.get_value("ename").await.unwrap(), Value::from("KING"));
}

#[tokio::test]
async fn writes_are_refused() {
    let test = FormTest::new(high_earners);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("high_earners", query(&test)))
        .build()
        .unwrap();

    let block = form.block("high_earners").unwrap();
    assert!(block.query().await.unwrap());

    // Editing in place is allowed; sending it is not
    assert!(block.set_value("sal", 6000).await.unwrap());
    assert!(!block.flush().await.unwrap());
    assert!(!block.update().await.unwrap());

    let diagnostics = test.session().diagnostics().take();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.severity == Severity::Severe));
    assert_eq!(
        diagnostics[0].message,
        "data source `high_earners` is read-only; update is not allowed"
    );

    assert!(!test.log().any(Operation::is_batch));

    // Undo is the way out
    assert!(block.undo().await.unwrap());
    assert_eq!(block.get_value("sal").await.unwrap(), Value::I64(5000));
}
