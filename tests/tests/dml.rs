use formwork::{
    async_trait, BlockDefinition, Config, Events, Form, Record, RecordState, Value,
};
use formwork_core::gateway::{DmlKind, Operation, Response};
use pretty_assertions::assert_eq;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tests::*;

fn two_employees(op: &Operation) -> Response {
    match op {
        Operation::Select(_) => emp_rows(vec![
            emp(7369, "SMITH", 800, 20),
            emp(7499, "ALLEN", 1600, 30),
        ]),
        op => standard(op),
    }
}

fn batches(log: &ExecLog) -> Vec<(DmlKind, Vec<String>)> {
    log.with_ops(|ops| {
        ops.iter()
            .filter_map(|op| match &op.operation {
                Operation::Batch(batch) => Some((
                    batch.kind,
                    batch
                        .requests
                        .iter()
                        .map(|request| request.statement.text.clone())
                        .collect(),
                )),
                _ => None,
            })
            .collect()
    })
}

#[tokio::test]
async fn insert_and_flush() {
    let test = FormTest::new(standard);

    let view = Arc::new(RecordingView::new("ename"));
    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).view(view.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("empno", 1).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::New);
    assert!(record.is_dirty());

    assert!(emp.flush().await.unwrap());

    let log = test.log();
    assert_eq!(
        batches(&log),
        [(
            DmlKind::Insert,
            vec!["insert into emp (empno, ename) values (:empno, :ename)".to_string()]
        )]
    );
    log.with_ops(|ops| {
        let Operation::Batch(batch) = &ops.last().unwrap().operation else {
            panic!("expected the flush to end with a batch");
        };
        let binds = &batch.requests[0].statement.binds;
        assert_eq!(binds[1].name, "ename");
        assert_eq!(binds[1].value, Value::from("Ann"));
    });

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Inserted);
    assert!(!record.is_dirty());
    assert!(view
        .events()
        .contains(&ViewEvent::Attributes(Value::from("Ann"), RecordState::Inserted)));

    // Flushed but not committed
    assert!(!log.has_commit());
}

#[tokio::test]
async fn insert_without_transaction_is_consistent() {
    let config = Config {
        transactional: false,
        ..Config::default()
    };
    let test = FormTest::with_config(config, standard);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());
    assert!(emp.flush().await.unwrap());

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Consistent);
}

#[tokio::test]
async fn update_sends_dirty_columns() {
    let test = FormTest::new(two_employees);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    // Setting the same value is not a change
    assert!(!emp.set_value("sal", 800).await.unwrap());
    assert!(emp.set_value("sal", 950).await.unwrap());
    assert!(emp.update().await.unwrap());
    assert_eq!(
        emp.current_record().await.unwrap().state(),
        RecordState::Update
    );

    assert!(emp.flush().await.unwrap());
    assert_eq!(
        batches(&test.log()),
        [(
            DmlKind::Update,
            vec!["update emp set sal = :sal where empno = :pk_empno".to_string()]
        )]
    );

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Updated);
    assert_eq!(record.initial_value("sal"), Some(&Value::I64(950)));

    assert!(form.commit().await.unwrap());
    assert_eq!(
        emp.current_record().await.unwrap().state(),
        RecordState::Consistent
    );
}

#[tokio::test]
async fn delete_then_flush() {
    let test = FormTest::new(two_employees);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.last().await.unwrap());
    assert!(emp.first().await.unwrap());

    assert!(emp.delete().await.unwrap());

    // Queued, still cached until flushed
    assert_eq!(emp.len().await, 2);
    assert_eq!(
        emp.current_record().await.unwrap().state(),
        RecordState::Delete
    );

    assert!(emp.flush().await.unwrap());
    assert_eq!(
        batches(&test.log()),
        [(
            DmlKind::Delete,
            vec!["delete from emp where empno = :pk_empno".to_string()]
        )]
    );

    assert_eq!(emp.len().await, 1);
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("ALLEN"));
}

#[tokio::test]
async fn undo_discards_unflushed_work() {
    let test = FormTest::new(two_employees);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 999).await.unwrap());

    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "TEMP").await.unwrap());
    assert_eq!(emp.len().await, 2);

    assert!(emp.undo().await.unwrap());

    assert_eq!(emp.len().await, 1);
    let record = emp.current_record().await.unwrap();
    assert_eq!(record.value("ename"), &Value::from("SMITH"));
    assert_eq!(record.value("sal"), &Value::I64(800));
    assert!(!record.is_dirty());

    // Nothing left to send
    assert!(emp.flush().await.unwrap());
    assert!(batches(&test.log()).is_empty());
}

#[tokio::test]
async fn unsaved_changes_block_a_requery() {
    let test = FormTest::new(two_employees);

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 999).await.unwrap());

    assert!(!emp.query().await.unwrap());
    assert_eq!(test.log().selects(), 1);
    assert_eq!(emp.get_value("sal").await.unwrap(), Value::I64(999));
}

#[tokio::test]
async fn batch_failure_is_reported() {
    let test = FormTest::new(|op| match op {
        Operation::Batch(_) => Response::ok().with_results(vec![
            Response::failure("unique constraint violated"),
        ]),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("empno", 7369).await.unwrap());

    assert!(!emp.flush().await.unwrap());

    // Back to unsynchronized, ready for another attempt
    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::New);
    assert!(record.is_failed());
    assert!(record.is_dirty());

    let diagnostics = test.session().diagnostics().take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "Insert on `emp` failed: unique constraint violated"
    );

    // A failed flush commits nothing
    assert!(!form.commit().await.unwrap());
    assert!(!test.log().has_commit());
}

#[tokio::test]
async fn lost_batch_is_sent_again() {
    let attempts = AtomicUsize::new(0);
    let test = FormTest::new(move |op| match op {
        Operation::Batch(_) if attempts.fetch_add(1, Ordering::SeqCst) == 0 => {
            Response::failure("connection lost")
        }
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("empno", 1).await.unwrap());

    assert!(!emp.flush().await.unwrap());

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::New);
    assert!(record.is_failed());
    assert!(record.is_dirty());
    assert!(test
        .session()
        .diagnostics()
        .any(|d| d.message.contains("connection lost")));

    // The insert goes out again on the next flush
    assert!(emp.flush().await.unwrap());
    assert_eq!(batches(&test.log()).len(), 2);

    let record = emp.current_record().await.unwrap();
    assert_eq!(record.state(), RecordState::Inserted);
    assert!(!record.is_failed());
}

#[tokio::test]
async fn undo_after_lost_batch() {
    let test = FormTest::new(|op| match op {
        Operation::Batch(_) => Response::failure("connection lost"),
        op => standard(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("empno", 1).await.unwrap());
    assert!(!emp.flush().await.unwrap());

    assert!(emp.undo().await.unwrap());
    assert!(emp.is_empty().await);
    assert!(emp.current_record().await.is_none());
}

#[tokio::test]
async fn failed_batch_keeps_earlier_batches() {
    let test = FormTest::new(|op| match op {
        Operation::Batch(batch) if batch.kind == DmlKind::Update => {
            Response::failure("connection lost")
        }
        op => two_employees(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 950).await.unwrap());
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());

    assert!(!emp.flush().await.unwrap());

    let kinds: Vec<_> = batches(&test.log()).into_iter().map(|(kind, _)| kind).collect();
    assert_eq!(kinds, [DmlKind::Insert, DmlKind::Update]);

    // The backend wrote the insert
    let inserted = emp.get_record(1).await.unwrap();
    assert_eq!(inserted.value("ename"), &Value::from("Ann"));
    assert_eq!(inserted.state(), RecordState::Inserted);

    // The update is ready to be sent again
    let smith = emp.get_record(0).await.unwrap();
    assert_eq!(smith.state(), RecordState::Consistent);
    assert!(smith.is_failed());
    assert_eq!(smith.value("sal"), &Value::I64(950));
}

#[tokio::test]
async fn unsent_batches_stay_queued() {
    let test = FormTest::new(|op| match op {
        Operation::Batch(batch) if batch.kind == DmlKind::Insert => {
            Response::failure("connection lost")
        }
        op => two_employees(op),
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());
    assert!(emp.set_value("sal", 950).await.unwrap());
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());

    assert!(!emp.flush().await.unwrap());

    // The update never left
    assert_eq!(batches(&test.log()).len(), 1);
    let smith = emp.get_record(0).await.unwrap();
    assert_eq!(smith.state(), RecordState::Update);
    assert!(!smith.is_failed());

    // Only the fetched row is left; the new record never reached the backend
    assert!(emp.undo().await.unwrap());
    assert_eq!(emp.len().await, 1);

    let smith = emp.get_record(0).await.unwrap();
    assert_eq!(smith.state(), RecordState::Consistent);
    assert_eq!(smith.value("sal"), &Value::I64(800));
}

/// Records hook calls and vetoes the ones it is told to.
#[derive(Default)]
struct Hooks {
    calls: Mutex<Vec<String>>,
    veto_record: bool,
    veto_field: Option<&'static str>,
    veto_fetch: Option<&'static str>,
}

impl Hooks {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

#[async_trait]
impl Events for Hooks {
    async fn pre_insert(&self, _block: &str, record: &mut Record) -> bool {
        self.call("pre_insert");
        record.set_value("sal", 500).is_ok()
    }

    async fn post_insert(&self, _block: &str, _record: &Record) -> bool {
        self.call("post_insert");
        true
    }

    async fn pre_query(&self, block: &str, _filter: &mut formwork::FilterStructure) -> bool {
        self.call(&format!("pre_query {block}"));
        true
    }

    async fn on_fetch(&self, _block: &str, record: &mut Record) -> bool {
        self.veto_fetch != record.value("ename").as_str()
    }

    async fn post_query(&self, _block: &str, count: usize) -> bool {
        self.call(&format!("post_query {count}"));
        true
    }

    async fn validate_field(&self, _block: &str, field: &str, _record: &Record) -> bool {
        self.veto_field != Some(field)
    }

    async fn validate_record(&self, _block: &str, _record: &Record) -> bool {
        self.call("validate_record");
        !self.veto_record
    }
}

#[tokio::test]
async fn hooks_run_around_dml() {
    let test = FormTest::new(standard);
    let hooks = Arc::new(Hooks::default());

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).events(hooks.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.insert(false).await.unwrap());
    assert!(emp.set_value("ename", "Ann").await.unwrap());
    assert!(emp.flush().await.unwrap());

    assert_eq!(
        hooks.calls(),
        ["validate_record", "pre_insert", "post_insert"]
    );

    // The pre-insert hook's value went to the backend
    assert_eq!(
        batches(&test.log())[0].1,
        ["insert into emp (ename, sal) values (:ename, :sal)"]
    );
}

#[tokio::test]
async fn hook_vetoes() {
    let test = FormTest::new(two_employees);
    let hooks = Arc::new(Hooks {
        veto_record: true,
        veto_field: Some("sal"),
        veto_fetch: Some("SMITH"),
        ..Hooks::default()
    });

    let form = Form::builder(test.session())
        .block(BlockDefinition::new("emp", test.emp()).events(hooks.clone()))
        .build()
        .unwrap();

    let emp = form.block("emp").unwrap();
    assert!(emp.query().await.unwrap());

    // SMITH was rejected on fetch
    assert_eq!(emp.get_value("ename").await.unwrap(), Value::from("ALLEN"));
    assert!(emp.last().await.unwrap());
    assert_eq!(emp.len().await, 1);
    assert_eq!(hooks.calls(), ["pre_query emp", "post_query 1"]);

    // The field veto restores the old value
    assert!(!emp.set_value("sal", 2000).await.unwrap());
    assert_eq!(emp.get_value("sal").await.unwrap(), Value::I64(1600));

    // The record veto stops the flush before anything is sent
    assert!(emp.set_value("ename", "ALLAN").await.unwrap());
    assert!(!emp.flush().await.unwrap());
    assert!(batches(&test.log()).is_empty());
}
