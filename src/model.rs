//! Core data model: annotated query blocks and the canonical column type
//! system shared by every engine and every output language.

use serde::{Deserialize, Serialize};

/// Kind of an annotated block in a SQL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Schema migration, ordered by its embedded integer.
    Migrate,
    /// Seed data executed after all migrations, in file order.
    Testdata,
    /// A named query whose column types are introspected.
    Query,
    /// A named statement executed for effect; no result columns.
    Exec,
    /// A table marked for bulk insertion; columns come from catalog
    /// introspection instead of query execution.
    Table,
}

/// Modifier flags attached to a block header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// `:one` — single row instead of a list.
    pub one: bool,
    /// `:pluck` — bare scalar instead of a row object; requires exactly one
    /// column after validation.
    pub pluck: bool,
    /// `:appender` — bulk-insert path for a `Table` block.
    pub appender: bool,
}

/// One resolved `${name}` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    /// Sample literal from `@set`, or the constant's literal text.
    pub value: String,
    /// Externally injected path constant: inlined as literal SQL in every
    /// rendering, never bound.
    pub constant: bool,
}

/// A span of a query body: opaque SQL text or a parameter reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlQueryPart {
    Literal(String),
    Parameter(ParameterEntry),
}

/// One rendering of a query body in a fixed placeholder convention.
///
/// All three renderings of a query agree on which parts are literal and
/// which are parameters; only the placeholder syntax differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRendering {
    pub sql: String,
    pub parts: Vec<SqlQueryPart>,
    /// Bind-order parameter list. Anonymous renderings list one entry per
    /// occurrence; positional and named renderings list distinct names in
    /// first-occurrence order.
    pub parameters: Vec<ParameterEntry>,
}

/// A typed result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub nullable: bool,
}

/// Canonical column type, independent of source engine and target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Uppercased native type name, e.g. `INTEGER`, `VARCHAR`.
    Primitive(String),
    List(Box<ColumnType>),
    /// Nominal: named by the field that holds it, not by shape.
    Struct(Vec<ColumnInfo>),
    Map {
        key: Box<ColumnInfo>,
        value: Box<ColumnInfo>,
    },
    Enum(Vec<String>),
}

/// Inline type override from a `result:` block, replacing the introspected
/// column entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOverride {
    #[serde(rename = "type")]
    pub ty: String,
    pub nullable: bool,
}

/// One annotated block, from parse through introspection to validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Unique within its file. Derived: `migrate_<n>` for migrations,
    /// `testdata_<n>` for unnamed seed blocks, the declared name otherwise.
    pub id: String,
    pub kind: QueryKind,
    /// Trimmed SQL body, `@set` lines removed.
    pub raw_sql: String,
    /// Embedded integer of a `MIGRATE` block; execution order, not file order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_order: Option<i64>,
    pub modifiers: Modifiers,
    /// Ordered `@set` name → literal pairs.
    pub variables: Vec<(String, String)>,
    /// Ordered override name → (type, nullability) pairs.
    pub type_overrides: Vec<(String, TypeOverride)>,
    pub anonymous: StatementRendering,
    pub positional: StatementRendering,
    pub named: StatementRendering,
    /// Populated by the introspector.
    pub columns: Vec<ColumnInfo>,
    /// Synthetic struct wrapping `columns`, built during validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_columns: Option<ColumnInfo>,
}

impl Query {
    /// The query body with every parameter spliced in as its sample literal.
    ///
    /// This is what adapters actually run: `@set` samples are SQL literals
    /// by construction, so the result is a complete, executable statement.
    pub fn sql_with_samples(&self) -> String {
        let mut sql = String::new();
        for part in &self.named.parts {
            match part {
                SqlQueryPart::Literal(text) => sql.push_str(text),
                SqlQueryPart::Parameter(p) => sql.push_str(&p.value),
            }
        }
        sql.trim().to_string()
    }

    /// Look up a `@set` sample value by name.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl ColumnType {
    /// Shorthand for a primitive type; uppercases the name.
    pub fn primitive(name: &str) -> Self {
        Self::Primitive(name.to_uppercase())
    }
}
