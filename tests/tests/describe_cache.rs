use formwork::{BlockDefinition, DatabaseTable, Form, Table};
use formwork_core::gateway::Response;
use pretty_assertions::assert_eq;
use tests::*;

#[tokio::test]
async fn describe_once_per_statement() {
    let test = FormTest::new(standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .block(BlockDefinition::new("emp_history", test.emp()))
        .block(BlockDefinition::new("dept", test.dept()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    let history = form.block("emp_history").unwrap();
    let dept = form.block("dept").unwrap();

    let (a, b) = tokio::join!(emp.query(), history.query());
    assert!(a.unwrap());
    assert!(b.unwrap());

    assert!(emp.query().await.unwrap());
    assert!(dept.query().await.unwrap());

    let log = test.log();
    assert_eq!(log.describes(), 2);
    assert_eq!(log.selects(), 4);

    let cache = test.session().describe_cache();
    assert_eq!(cache.len(), 2);

    let described = cache.get("select * from emp where 1 = 2").unwrap();
    assert_eq!(described.columns, EMP_COLUMNS);
    assert_eq!(described.types[0], "number(10)");
}

#[tokio::test]
async fn failed_describe_is_retried() {
    let test = FormTest::new(|op| match table_of(op) {
        Some("emp") => standard(op),
        _ => Response::failure("table or view does not exist"),
    });

    let table = DatabaseTable::new(test.session(), Table::new("bonus"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("bonus", table))
        .build()
        .unwrap();

    let bonus = form.block("bonus").unwrap();
    assert!(!bonus.query().await.unwrap());
    assert!(!bonus.query().await.unwrap());

    assert_eq!(test.log().describes(), 2);
    assert!(test.session().describe_cache().is_empty());

    let diagnostics = test.session().diagnostics().take();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].message.contains("table or view does not exist"));
}
