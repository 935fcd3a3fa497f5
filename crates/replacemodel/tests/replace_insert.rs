#![allow(clippy::manual_async_fn)]

use asupersync::runtime::RuntimeBuilder;
use std::sync::{Arc, Mutex};

use replacemodel::prelude::*;
use replacemodel::{InvalidationLog, QueryErrorKind, UsageErrorKind, convert};

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

// ============================================================================
// Mock connection
// ============================================================================

#[derive(Debug, Default)]
struct MockState {
    executed: Vec<(String, Vec<Value>)>,
    queried: Vec<(String, Vec<Value>)>,
    last_insert_id: Option<i64>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Default)]
struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn reporting_id(id: i64) -> Self {
        let conn = Self::default();
        conn.state.lock().expect("lock poisoned").last_insert_id = Some(id);
        conn
    }

    fn returning(rows: Vec<Row>) -> Self {
        let conn = Self::default();
        conn.state.lock().expect("lock poisoned").rows = rows;
        conn
    }

    fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().expect("lock poisoned").executed.clone()
    }

    fn queried(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().expect("lock poisoned").queried.clone()
    }

    /// Executed statements other than transaction control.
    fn writes(&self) -> Vec<(String, Vec<Value>)> {
        self.executed()
            .into_iter()
            .filter(|(sql, _)| !matches!(sql.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
            .collect()
    }
}

impl Connection for MockConnection {
    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<ExecResult, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            let mut guard = state.lock().expect("lock poisoned");
            guard.executed.push((sql, params));
            let mut result = ExecResult::affected(1);
            if let Some(id) = guard.last_insert_id {
                result = result.with_last_insert_id(id);
            }
            Outcome::Ok(result)
        }
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            let mut guard = state.lock().expect("lock poisoned");
            guard.queried.push((sql, params));
            Outcome::Ok(guard.rows.clone())
        }
    }
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq)]
struct Hero {
    id: i64,
    name: String,
}

impl Model for Hero {
    const TABLE_NAME: &'static str = "heroes";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("id", SqlType::BigInt, |h: &Hero| Value::BigInt(h.id))
                .auto_increment()
                .with_setter(|h, v| {
                    h.id = v.parse_i64()?;
                    Ok(())
                }),
            Column::new("name", SqlType::Text, |h: &Hero| Value::Text(h.name.clone())),
        ]
    }
}

#[derive(Debug, Default)]
struct Account {
    id: i32,
    email: String,
    plan: String,
    created: i64,
    version: i32,
    saves: u32,
}

impl AfterInsert for Account {
    fn after_insert(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}

impl Model for Account {
    const TABLE_NAME: &'static str = "accounts";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("id", SqlType::Integer, |a: &Account| Value::Int(a.id))
                .auto_increment()
                .with_setter(|a, v| {
                    a.id = i32::try_from(v)?;
                    Ok(())
                }),
            Column::new("email", SqlType::VarChar(255), |a: &Account| {
                Value::Text(a.email.clone())
            }),
            Column::new("plan", SqlType::Text, |a: &Account| Value::Text(a.plan.clone())),
            Column::new("created", SqlType::BigInt, |a: &Account| {
                Value::BigInt(a.created)
            })
            .created()
            .with_setter(|a, v| {
                a.created = v.parse_i64()?;
                Ok(())
            }),
            Column::new("version", SqlType::Integer, |a: &Account| {
                Value::Int(a.version)
            })
            .version()
            .with_setter(|a, v| {
                a.version = i32::try_from(v)?;
                Ok(())
            }),
        ]
    }

    fn after_insert_hook(&mut self) -> Option<&mut dyn AfterInsert> {
        Some(self)
    }
}

#[derive(Debug, Default)]
struct Counter {
    id: i64,
}

impl Model for Counter {
    const TABLE_NAME: &'static str = "counters";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("id", SqlType::BigInt, |c: &Counter| Value::BigInt(c.id))
                .auto_increment(),
        ]
    }
}

#[derive(Debug, Default)]
struct Invoice {
    id: i64,
    total: i64,
}

impl Model for Invoice {
    const TABLE_NAME: &'static str = "invoices";
    const SEQUENCE_NAME: Option<&'static str> = Some("invoice_ids");

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("id", SqlType::BigInt, |i: &Invoice| Value::BigInt(i.id))
                .auto_increment()
                .with_setter(|i, v| {
                    i.id = v.parse_i64()?;
                    Ok(())
                }),
            Column::new("total", SqlType::BigInt, |i: &Invoice| Value::BigInt(i.total)),
        ]
    }
}

#[derive(Debug, Default)]
struct Event {
    kind: String,
    payload: serde_json::Value,
}

impl Model for Event {
    const TABLE_NAME: &'static str = "events";

    fn columns() -> Vec<Column<Self>> {
        vec![
            Column::new("kind", SqlType::Text, |e: &Event| Value::Text(e.kind.clone())),
            Column::new("payload", SqlType::Json, |e: &Event| {
                Value::Json(e.payload.clone())
            })
            .with_conversion(convert::json_to_text),
        ]
    }
}

#[derive(Debug, Default)]
struct Unmapped;

impl Model for Unmapped {
    const TABLE_NAME: &'static str = "";

    fn columns() -> Vec<Column<Self>> {
        Vec::new()
    }
}

fn session(conn: &MockConnection, dialect: Dialect) -> Session<MockConnection> {
    Session::with_config(
        conn.clone(),
        SessionConfig::new()
            .dialect(dialect)
            .quote_policy(QuotePolicy::Never),
    )
}

// ============================================================================
// Single-record inserts
// ============================================================================

#[test]
fn zero_auto_increment_is_excluded_and_driver_id_assigned() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::reporting_id(7);
        let mut session = session(&conn, Dialect::Mysql);

        let mut hero = Hero {
            id: 0,
            name: "a".to_string(),
        };
        let affected = unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        assert_eq!(affected, 1);
        assert_eq!(
            hero,
            Hero {
                id: 7,
                name: "a".to_string()
            }
        );
        let writes = conn.writes();
        assert_eq!(writes[0].0, "REPLACE INTO heroes (name) VALUES (?)");
        assert_eq!(writes[0].1, vec![Value::Text("a".to_string())]);
    });
}

#[test]
fn non_zero_auto_increment_is_included() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Sqlite);

        let mut hero = Hero {
            id: 12,
            name: "b".to_string(),
        };
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let writes = conn.writes();
        assert_eq!(writes[0].0, "REPLACE INTO heroes (id, name) VALUES (?, ?)");
        assert_eq!(
            writes[0].1,
            vec![Value::BigInt(12), Value::Text("b".to_string())]
        );
        assert_eq!(hero.id, 12);
    });
}

#[test]
fn allow_list_limits_columns() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut account = Account {
            email: "a@example.com".into(),
            plan: "pro".into(),
            ..Default::default()
        };
        let spec = InsertSpec::new()
            .cols(["email"])
            .no_auto_time()
            .no_version_check();
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &spec, HookQueue::new())
                .await,
        );

        assert_eq!(conn.writes()[0].0, "REPLACE INTO accounts (email) VALUES (?)");
    });
}

#[test]
fn deny_list_removes_columns() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut account = Account {
            email: "a@example.com".into(),
            plan: "pro".into(),
            ..Default::default()
        };
        let spec = InsertSpec::new().omit(["PLAN", "created"]);
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &spec, HookQueue::new())
                .await,
        );

        let (sql, args) = &conn.writes()[0];
        assert_eq!(sql, "REPLACE INTO accounts (email, version) VALUES (?, ?)");
        assert_eq!(args[1], Value::Int(1));
    });
}

#[test]
fn generated_timestamp_and_version_match_emitted_args() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::reporting_id(41);
        let mut session = session(&conn, Dialect::Mysql);

        let mut account = Account {
            email: "a@example.com".into(),
            plan: "free".into(),
            version: 9,
            ..Default::default()
        };
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let (sql, args) = &conn.writes()[0];
        assert_eq!(
            sql,
            "REPLACE INTO accounts (email, plan, created, version) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(args[2], Value::BigInt(account.created));
        assert!(account.created > 0);
        assert_eq!(args[3], Value::Int(account.version));
        assert_eq!(account.version, 1);
        assert_eq!(account.id, 41);
        assert_eq!(account.saves, 1);
    });
}

#[test]
fn mysql_zero_column_insert_uses_empty_values() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::reporting_id(1);
        let mut session = session(&conn, Dialect::Mysql);

        let mut counter = Counter::default();
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut counter, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let (sql, args) = &conn.writes()[0];
        assert!(sql.ends_with(" VALUES ()"), "got {sql}");
        assert!(args.is_empty());
        // No setter: the generated id is not mirrored.
        assert_eq!(counter.id, 0);
    });
}

#[test]
fn expressions_and_conditions_are_rendered() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Sqlite);

        let mut invoice = Invoice { id: 3, total: 0 };
        let spec = InsertSpec::new()
            .set_expr("total", "total + 1")
            .filter(Cond::eq("id", 3_i64));
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut invoice, &spec, HookQueue::new())
                .await,
        );

        let (sql, args) = &conn.writes()[0];
        assert_eq!(
            sql,
            "REPLACE INTO invoices (id, total) SELECT ?, total + 1 FROM invoices WHERE id = ?"
        );
        assert_eq!(args, &vec![Value::BigInt(3), Value::BigInt(3)]);
    });
}

#[test]
fn conversions_apply_to_bound_values() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut event = Event {
            kind: "signup".into(),
            payload: serde_json::json!({"plan": "pro"}),
        };
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut event, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let (_, args) = &conn.writes()[0];
        assert_eq!(args[1], Value::Text(r#"{"plan":"pro"}"#.to_string()));
    });
}

#[test]
fn alternate_table_name_is_used_and_invalidated() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let log = Arc::new(InvalidationLog::new());
        let mut session = session(&conn, Dialect::Mysql).with_cache(log.clone());

        let mut hero = Hero {
            id: 0,
            name: "c".into(),
        };
        let spec = InsertSpec::new().table("heroes_archive");
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &spec, HookQueue::new())
                .await,
        );
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        assert_eq!(
            conn.writes()[0].0,
            "REPLACE INTO heroes_archive (name) VALUES (?)"
        );
        assert_eq!(
            log.tables(),
            vec!["heroes_archive".to_string(), "heroes".to_string()]
        );
    });
}

// ============================================================================
// Generated keys per dialect
// ============================================================================

#[test]
fn postgres_returning_assigns_id() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::returning(vec![Row::new(
            vec!["id".into()],
            vec![Value::BigInt(55)],
        )]);
        let mut session = session(&conn, Dialect::Postgres);

        let mut hero = Hero {
            id: 0,
            name: "d".into(),
        };
        let affected = unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        assert_eq!(affected, 1);
        assert_eq!(hero.id, 55);
        assert!(conn.writes().is_empty());
        assert_eq!(
            conn.queried()[0].0,
            "REPLACE INTO heroes (name) VALUES ($1) RETURNING id"
        );
    });
}

#[test]
fn postgres_empty_returning_is_an_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::returning(Vec::new());
        let log = Arc::new(InvalidationLog::new());
        let mut session = session(&conn, Dialect::Postgres).with_cache(log.clone());

        let mut hero = Hero {
            id: 0,
            name: "e".into(),
        };
        let outcome = session
            .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
            .await;

        match outcome {
            Outcome::Err(e) => {
                assert_eq!(e.query_kind(), Some(QueryErrorKind::NoGeneratedId));
                assert!(e.sql().is_some_and(|sql| sql.ends_with("RETURNING id")));
            }
            other => panic!("expected missing id error, got {other:?}"),
        }
        assert_eq!(hero.id, 0);
        assert_eq!(log.tables(), vec!["heroes".to_string()]);
    });
}

#[test]
fn unreadable_generated_id_is_swallowed() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::returning(vec![Row::new(
            vec!["id".into()],
            vec![Value::Text("not a number".into())],
        )]);
        let mut session = session(&conn, Dialect::Postgres);

        let mut hero = Hero {
            id: 0,
            name: "f".into(),
        };
        let affected = unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );
        assert_eq!(affected, 1);
        assert_eq!(hero.id, 0);
    });
}

#[test]
fn mssql_uses_output_clause() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::returning(vec![Row::new(
            vec!["id".into()],
            vec![Value::Int(8)],
        )]);
        let mut session = Session::with_config(
            conn.clone(),
            SessionConfig::new().dialect(Dialect::Mssql),
        );

        let mut hero = Hero {
            id: 0,
            name: "g".into(),
        };
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut hero, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        assert_eq!(hero.id, 8);
        assert_eq!(
            conn.queried()[0].0,
            "REPLACE INTO [heroes] ([name]) OUTPUT Inserted.[id] VALUES (@p1)"
        );
    });
}

#[test]
fn oracle_reads_id_from_sequence() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::returning(vec![Row::new(
            vec!["CURRVAL".into()],
            vec![Value::Decimal("21".into())],
        )]);
        let mut session = session(&conn, Dialect::Oracle);

        let mut invoice = Invoice { id: 0, total: 90 };
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut invoice, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        assert_eq!(invoice.id, 21);
        assert_eq!(
            conn.writes()[0].0,
            "REPLACE INTO invoices (total) VALUES (:1)"
        );
        let queried = conn.queried();
        assert_eq!(queried[0].0, "SELECT invoice_ids.CURRVAL FROM DUAL");
        assert!(queried[0].1.is_empty());
    });
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn batch_issues_one_statement_with_all_tuples() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Postgres);

        let mut heroes: Vec<Hero> = ["a", "b", "c"]
            .iter()
            .map(|name| Hero {
                id: 0,
                name: (*name).to_string(),
            })
            .collect();
        unwrap_outcome(
            session
                .replace_insert_many(&cx, &mut heroes, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let writes = conn.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].0,
            "REPLACE INTO heroes (name) VALUES ($1), ($2), ($3)"
        );
        assert_eq!(writes[0].1.len(), 3);
        assert!(heroes.iter().all(|h| h.id == 0));
    });
}

#[test]
fn oracle_batch_repeats_into_blocks() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Oracle);

        let mut heroes = vec![
            Hero {
                id: 0,
                name: "a".into(),
            },
            Hero {
                id: 0,
                name: "b".into(),
            },
        ];
        unwrap_outcome(
            session
                .replace_insert_many(&cx, &mut heroes, &InsertSpec::new(), HookQueue::new())
                .await,
        );

        let writes = conn.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].0,
            "INSERT ALL INTO heroes (name) VALUES (:1) INTO heroes (name) VALUES (:2) SELECT 1 FROM DUAL"
        );
    });
}

#[test]
fn batch_write_back_is_per_record() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut accounts: Vec<Account> = (0..2)
            .map(|i| Account {
                email: format!("{i}@example.com"),
                version: 4,
                ..Default::default()
            })
            .collect();
        let hooks = HookQueue::new().after(|a: &mut Account| a.plan.push_str("seen"));
        unwrap_outcome(
            session
                .replace_insert_many(&cx, &mut accounts, &InsertSpec::new(), hooks)
                .await,
        );

        let (_, args) = &conn.writes()[0];
        assert_eq!(args.len(), 8);
        for (i, account) in accounts.iter().enumerate() {
            assert_eq!(args[i * 4 + 2], Value::BigInt(account.created));
            assert_eq!(account.version, 1);
            assert_eq!(account.plan, "seen");
            assert_eq!(account.saves, 1);
        }
    });
}

#[test]
fn empty_batch_is_a_usage_error() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut heroes: Vec<Hero> = Vec::new();
        match session
            .replace_insert_many(&cx, &mut heroes, &InsertSpec::new(), HookQueue::new())
            .await
        {
            Outcome::Err(e) => assert_eq!(e.usage_kind(), Some(UsageErrorKind::EmptyBatch)),
            other => panic!("expected usage error, got {other:?}"),
        }
        assert!(conn.executed().is_empty());
    });
}

// ============================================================================
// Hook scheduling
// ============================================================================

#[test]
fn auto_commit_runs_after_hooks_before_returning() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);
        assert!(session.is_auto_commit());

        let mut account = Account::default();
        let hooks = HookQueue::new()
            .before(|a: &mut Account| a.email = "filled@example.com".into())
            .after(|a: &mut Account| a.plan = "trial".into());
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &InsertSpec::new(), hooks)
                .await,
        );

        assert_eq!(
            conn.writes()[0].1[0],
            Value::Text("filled@example.com".into())
        );
        assert_eq!(account.plan, "trial");
        assert_eq!(account.saves, 1);
        assert!(session.deferred_hooks().is_empty());
    });
}

#[test]
fn caller_after_hooks_run_before_write_backs() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut account = Account::default();
        let hooks = HookQueue::new().after(|a: &mut Account| a.plan = a.created.to_string());
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &InsertSpec::new(), hooks)
                .await,
        );

        assert_eq!(account.plan, "0");
        assert!(account.created > 0);
        assert_eq!(conn.writes()[0].1[2], Value::BigInt(account.created));
    });
}

#[test]
fn transaction_defers_after_hooks_until_commit() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);
        unwrap_outcome(session.begin(&cx).await);

        let mut account = Account {
            email: "t@example.com".into(),
            ..Default::default()
        };
        let hooks = HookQueue::new().after(|a: &mut Account| a.plan = "trial".into());
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &InsertSpec::new(), hooks)
                .await,
        );

        assert_eq!(account.plan, "");
        assert_eq!(account.created, 0);
        assert_eq!(account.saves, 0);
        assert!(session.deferred_hooks().contains(&account));
        // Timestamp and version write-backs plus the caller's hook.
        assert_eq!(session.deferred_hooks().hook_count(&account), Some(3));

        let mut after = unwrap_outcome(session.commit(&cx).await);
        assert!(session.is_auto_commit());
        assert!(session.deferred_hooks().is_empty());
        assert_eq!(after.pending(), 1);

        assert!(after.run(&mut account));
        assert_eq!(account.plan, "trial");
        assert_eq!(account.version, 1);
        assert_eq!(account.saves, 1);
        assert_eq!(
            conn.writes()[0].1[2],
            Value::BigInt(account.created)
        );
        assert!(after.is_empty());

        let executed: Vec<String> = conn.executed().into_iter().map(|(sql, _)| sql).collect();
        assert_eq!(executed.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(executed.last().map(String::as_str), Some("COMMIT"));
    });
}

#[test]
fn rollback_discards_deferred_hooks() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);
        unwrap_outcome(session.begin(&cx).await);

        let mut account = Account::default();
        unwrap_outcome(
            session
                .replace_insert(&cx, &mut account, &InsertSpec::new(), HookQueue::new())
                .await,
        );
        assert_eq!(session.deferred_hooks().len(), 1);

        unwrap_outcome(session.rollback(&cx).await);
        assert!(session.deferred_hooks().is_empty());
        assert_eq!(account.saves, 0);

        let after = unwrap_outcome(session.commit(&cx).await);
        assert!(after.is_empty());
    });
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn unmapped_model_is_rejected() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MockConnection::default();
        let mut session = session(&conn, Dialect::Mysql);

        let mut record = Unmapped;
        match session
            .replace_insert(&cx, &mut record, &InsertSpec::new(), HookQueue::new())
            .await
        {
            Outcome::Err(e) => assert_eq!(e.usage_kind(), Some(UsageErrorKind::NotMapped)),
            other => panic!("expected usage error, got {other:?}"),
        }
        assert!(conn.executed().is_empty());
    });
}

#[test]
fn session_config_loads_from_json() {
    let config = SessionConfig::from_json(
        r#"{"dialect": "postgres", "quote_policy": "always", "time_zone_offset_secs": 3600}"#,
    )
    .expect("valid config");
    assert_eq!(config.dialect, Dialect::Postgres);
    assert_eq!(config.quote_policy, QuotePolicy::Always);
    assert_eq!(config.time_zone_offset_secs, 3600);

    let session = Session::with_config(MockConnection::default(), config.clone());
    assert_eq!(session.config(), &config);
}
