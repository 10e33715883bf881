//! End-to-end pipeline tests over the scripted adapter: parse → introspect →
//! validate → map → view, no live engine involved.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use squill::prelude::*;

const USERS_FILE: &str = "\
-- MIGRATE 1
CREATE TABLE users(id INTEGER PRIMARY KEY, name TEXT NOT NULL);

-- TESTDATA
INSERT INTO users VALUES (1, 'Alice');

-- QUERY get :one
@set id = 1
SELECT id, name FROM users WHERE id = ${id}

-- QUERY all
SELECT id, name FROM users
";

fn users_adapter() -> MockAdapter {
    let columns = || {
        vec![
            // The engine misreports the sole integer primary key as
            // nullable; the introspector corrects it.
            NativeColumn::new("id", NativeType::scalar("integer"))
                .nullable(true)
                .sole_integer_pk(),
            NativeColumn::new("name", NativeType::scalar("text")).nullable(false),
        ]
    };
    MockAdapter::new()
        .with_columns("get", columns())
        .with_columns("all", columns())
}

fn parse(text: &str) -> Vec<Query> {
    parse_file("users.sql", text, &BTreeMap::new()).expect("parse failed")
}

async fn introspect(queries: &mut [Query], mut adapter: MockAdapter) -> MockAdapter {
    Introspector::new("users.sql")
        .run(queries, &mut adapter)
        .await
        .expect("introspection failed");
    adapter
}

#[tokio::test]
async fn test_one_query_yields_bare_struct() {
    let mut queries = parse(USERS_FILE);
    introspect(&mut queries, users_adapter()).await;

    let unit = build_unit("users.sql", &queries, &TypeScriptBackend).expect("view failed");
    let get = unit
        .queries
        .iter()
        .find(|q| q.function_name == "get")
        .expect("missing get");

    // :one → bare nominal struct, not a list.
    assert_eq!(get.return_type.as_deref(), Some("Get"));
    assert_eq!(get.params.len(), 1);
    assert_eq!(get.params[0].name, "id");
    assert_eq!(get.params[0].ty, "number");

    let decl = unit
        .declarations
        .iter()
        .find(|d| d.name == "Get")
        .expect("missing declaration");
    // Primary-key override and schema NOT NULL both survive into the
    // declaration.
    assert_eq!(
        decl.rendered,
        "export interface Get {\n  id: number;\n  name: string;\n}"
    );
}

#[tokio::test]
async fn test_unmodified_query_yields_list_of_struct() {
    let mut queries = parse(USERS_FILE);
    introspect(&mut queries, users_adapter()).await;

    let unit = build_unit("users.sql", &queries, &TypeScriptBackend).expect("view failed");
    let all = unit
        .queries
        .iter()
        .find(|q| q.function_name == "all")
        .expect("missing all");
    assert_eq!(all.return_type.as_deref(), Some("All[]"));
    assert!(all.params.is_empty());
}

#[tokio::test]
async fn test_migrations_run_in_embedded_order() {
    let text = "\
-- MIGRATE 2
CREATE TABLE b(x INTEGER);

-- MIGRATE 1
CREATE TABLE a(x INTEGER);
";
    let mut queries = parse(text);
    let adapter = introspect(&mut queries, MockAdapter::new()).await;

    let log = adapter.log();
    assert_eq!(log.len(), 2);
    assert!(log[0].contains("CREATE TABLE a"));
    assert!(log[1].contains("CREATE TABLE b"));
}

#[tokio::test]
async fn test_pluck_requires_exactly_one_column() {
    let text = "\
-- QUERY names :pluck
SELECT id, name FROM users
";
    let mut queries = parse(text);
    let mut adapter = users_adapter().with_columns(
        "names",
        vec![
            NativeColumn::new("id", NativeType::scalar("integer")),
            NativeColumn::new("name", NativeType::scalar("text")),
        ],
    );
    let err = Introspector::new("users.sql")
        .run(&mut queries, &mut adapter)
        .await
        .expect_err("should fail validation");
    assert!(matches!(err, SquillError::Validation { ref query, .. } if query == "names"));
}

#[tokio::test]
async fn test_pluck_without_one_yields_scalar_list() {
    let text = "\
-- QUERY ids :pluck
SELECT id FROM users
";
    let mut queries = parse(text);
    let adapter = MockAdapter::new().with_columns(
        "ids",
        vec![NativeColumn::new("id", NativeType::scalar("integer")).nullable(false)],
    );
    introspect(&mut queries, adapter).await;

    let unit = build_unit("users.sql", &queries, &TypeScriptBackend).expect("view failed");
    assert_eq!(unit.queries[0].return_type.as_deref(), Some("number[]"));
    assert!(unit.declarations.is_empty());
}

#[test]
fn test_missing_variable_is_parse_time() {
    let text = "\
-- QUERY broken
SELECT * FROM users WHERE id = ${user_id}
";
    let err = parse_file("users.sql", text, &BTreeMap::new()).expect_err("should fail");
    match err {
        SquillError::MissingVariable { file, query, name } => {
            assert_eq!(file, "users.sql");
            assert_eq!(query, "broken");
            assert_eq!(name, "user_id");
        }
        other => panic!("expected MissingVariable, got {other:?}"),
    }
}

#[test]
fn test_renderings_agree_on_parameter_split() {
    let text = "\
-- QUERY search
@set term = 'alice'
@set limit = 10
SELECT * FROM users WHERE name = ${term} OR alias = ${term} LIMIT ${limit}
";
    let queries = parse(text);
    let q = &queries[0];

    assert_eq!(
        q.anonymous.sql,
        "SELECT * FROM users WHERE name = ? OR alias = ? LIMIT ?"
    );
    assert_eq!(
        q.positional.sql,
        "SELECT * FROM users WHERE name = $1 OR alias = $1 LIMIT $2"
    );
    assert_eq!(
        q.named.sql,
        "SELECT * FROM users WHERE name = $term OR alias = $term LIMIT $limit"
    );

    // Distinct count equals distinct @set names referenced; per-occurrence
    // count only in the anonymous rendering.
    assert_eq!(q.positional.parameters.len(), 2);
    assert_eq!(q.named.parameters.len(), 2);
    assert_eq!(q.anonymous.parameters.len(), 3);
}

#[tokio::test]
async fn test_probe_wraps_each_query_in_begin_rollback() {
    let mut queries = parse(USERS_FILE);
    let adapter = introspect(&mut queries, users_adapter().with_probe()).await;

    let log = adapter.log();
    // migration, testdata, then BEGIN/query/ROLLBACK per query block
    assert_eq!(log.len(), 8);
    assert!(log[0].contains("CREATE TABLE"));
    assert!(log[1].contains("INSERT INTO"));
    assert_eq!(log[2], "BEGIN");
    assert!(log[3].starts_with("SELECT"));
    assert_eq!(log[4], "ROLLBACK");
    assert_eq!(log[5], "BEGIN");
    assert!(log[6].starts_with("SELECT"));
    assert_eq!(log[7], "ROLLBACK");
}

#[tokio::test]
async fn test_failed_migration_aborts_with_context() {
    let mut queries = parse(USERS_FILE);
    let mut adapter = users_adapter().fail_on("CREATE TABLE");
    let err = Introspector::new("users.sql")
        .run(&mut queries, &mut adapter)
        .await
        .expect_err("should fail");
    match err {
        SquillError::Introspection { query, sql, .. } => {
            assert_eq!(query, "migrate_1");
            assert!(sql.contains("CREATE TABLE users"));
        }
        other => panic!("expected Introspection, got {other:?}"),
    }
    // Fail-fast: nothing ran.
    assert!(adapter.log().is_empty());
}

#[tokio::test]
async fn test_type_override_replaces_introspected_column() {
    let text = "\
/* QUERY stats :one
   result:
     total: \"DECIMAL NOT NULL\"
*/
SELECT sum(amount) AS total FROM orders
";
    let mut queries = parse(text);
    let adapter = MockAdapter::new().with_columns(
        "stats",
        vec![NativeColumn::new("total", NativeType::scalar("hugeint")).nullable(true)],
    );
    introspect(&mut queries, adapter).await;

    let unit = build_unit("users.sql", &queries, &RustBackend).expect("view failed");
    let decl = &unit.declarations[0];
    assert_eq!(
        decl.rendered,
        "#[derive(Debug, Clone)]\npub struct Stats {\n    pub total: f64,\n}"
    );
}

#[tokio::test]
async fn test_override_naming_unknown_column_fails() {
    let text = "\
/* QUERY stats
   result:
     missing: \"DECIMAL\"
*/
SELECT 1 AS total
";
    let mut queries = parse(text);
    let mut adapter = MockAdapter::new().with_columns(
        "stats",
        vec![NativeColumn::new("total", NativeType::scalar("integer"))],
    );
    let err = Introspector::new("users.sql")
        .run(&mut queries, &mut adapter)
        .await
        .expect_err("should fail");
    assert!(matches!(err, SquillError::Validation { .. }));
}

#[tokio::test]
async fn test_declaration_collision_is_explicit_error() {
    let text = "\
-- QUERY first
SELECT metadata FROM a

-- QUERY second
SELECT metadata FROM b
";
    let mut queries = parse(text);
    let adapter = MockAdapter::new()
        .with_columns(
            "first",
            vec![NativeColumn::new(
                "metadata",
                NativeType::Struct(vec![("x".to_string(), NativeType::scalar("integer"))]),
            )],
        )
        .with_columns(
            "second",
            vec![NativeColumn::new(
                "metadata",
                NativeType::Struct(vec![("y".to_string(), NativeType::scalar("varchar"))]),
            )],
        );
    introspect(&mut queries, adapter).await;

    let err = build_unit("users.sql", &queries, &TypeScriptBackend).expect_err("should collide");
    assert!(matches!(err, SquillError::TypeMapping { ref name, .. } if name == "Metadata"));
}

#[tokio::test]
async fn test_identical_shapes_share_one_declaration() {
    let text = "\
-- QUERY first
SELECT metadata FROM a

-- QUERY second
SELECT metadata FROM b
";
    let mut queries = parse(text);
    let shape = || {
        vec![NativeColumn::new(
            "metadata",
            NativeType::Struct(vec![("x".to_string(), NativeType::scalar("integer"))]),
        )]
    };
    let adapter = MockAdapter::new()
        .with_columns("first", shape())
        .with_columns("second", shape());
    introspect(&mut queries, adapter).await;

    let unit = build_unit("users.sql", &queries, &TypeScriptBackend).expect("view failed");
    let metadata: Vec<_> = unit
        .declarations
        .iter()
        .filter(|d| d.name == "Metadata")
        .collect();
    assert_eq!(metadata.len(), 1);
}

#[tokio::test]
async fn test_nested_engine_types_flow_through() {
    let text = "\
-- QUERY report :one
SELECT tags, scores FROM events
";
    let mut queries = parse(text);
    let adapter = MockAdapter::new().with_columns(
        "report",
        vec![
            NativeColumn::new(
                "tags",
                NativeType::List(Box::new(NativeType::Enum(vec![
                    "low".to_string(),
                    "high".to_string(),
                ]))),
            )
            .nullable(false),
            NativeColumn::new(
                "scores",
                NativeType::Map(
                    Box::new(NativeType::scalar("varchar")),
                    Box::new(NativeType::scalar("double")),
                ),
            )
            .nullable(false),
        ],
    );
    introspect(&mut queries, adapter).await;

    let unit = build_unit("users.sql", &queries, &TypeScriptBackend).expect("view failed");
    let report = &unit.queries[0];
    assert_eq!(report.return_type.as_deref(), Some("Report"));
    let decl = unit
        .declarations
        .iter()
        .find(|d| d.name == "Report")
        .expect("missing declaration");
    assert!(decl.rendered.contains("tags: (\"low\" | \"high\")[];"));
    assert!(decl.rendered.contains("scores: ScoresMap;"));
}

#[tokio::test]
async fn test_table_appender_declares_row_struct() {
    let text = "-- TABLE users :appender\n";
    let mut queries = parse(text);
    let adapter = MockAdapter::new().with_table(
        "users",
        vec![
            NativeColumn::new("id", NativeType::scalar("integer"))
                .nullable(true)
                .sole_integer_pk(),
            NativeColumn::new("name", NativeType::scalar("varchar")).nullable(false),
        ],
    );
    introspect(&mut queries, adapter).await;

    let unit = build_unit("users.sql", &queries, &PythonBackend).expect("view failed");
    assert_eq!(unit.queries[0].return_type.as_deref(), Some("Users"));
    assert_eq!(
        unit.declarations[0].rendered,
        "@dataclass\nclass Users:\n    id: int\n    name: str"
    );
}

#[tokio::test]
async fn test_constants_inline_and_never_bind() {
    let mut constants = BTreeMap::new();
    constants.insert("data_dir".to_string(), "'/var/data'".to_string());
    let text = "\
-- QUERY rows
SELECT * FROM read_csv(${data_dir})
";
    let queries = parse_file("load.sql", text, &constants).expect("parse failed");
    let q = &queries[0];
    assert_eq!(q.anonymous.sql, "SELECT * FROM read_csv('/var/data')");
    assert!(q.named.parameters.is_empty());
}
