//! Engine adapter contract.
//!
//! An adapter owns one connection to one engine and exposes exactly what the
//! introspector needs: run raw setup SQL, run a query and hand back native
//! column metadata, read a table's columns from the catalog, and close.
//! Everything engine-specific — wire protocol, type-name caches, quoting —
//! stays behind this boundary, scoped to the adapter instance.

use std::fmt;

use crate::model::Query;

/// Error raised by a concrete engine. Adapters flatten their driver errors
/// into this; the introspector wraps it with query and file context.
#[derive(Debug)]
pub struct EngineError(String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

#[cfg(feature = "duckdb")]
impl From<duckdb::Error> for EngineError {
    fn from(err: duckdb::Error) -> Self {
        Self(err.to_string())
    }
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

/// A column as one engine reports it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumn {
    pub name: String,
    pub ty: NativeType,
    /// `None` when the engine does not report nullability; the introspector
    /// defaults unknowns to nullable.
    pub nullable: Option<bool>,
    /// The column is the sole integer primary key of its table. Engines that
    /// misreport such columns as nullable are corrected by the introspector.
    pub sole_integer_pk: bool,
}

impl NativeColumn {
    pub fn new(name: impl Into<String>, ty: NativeType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: None,
            sole_integer_pk: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn sole_integer_pk(mut self) -> Self {
        self.sole_integer_pk = true;
        self
    }
}

/// An engine's own type shape, mirroring the canonical model in native
/// type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
    Scalar(String),
    List(Box<NativeType>),
    Struct(Vec<(String, NativeType)>),
    Map(Box<NativeType>, Box<NativeType>),
    Enum(Vec<String>),
}

impl NativeType {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::Scalar(name.into())
    }
}

/// Result of executing one query block.
#[derive(Debug, Default)]
pub struct Execution {
    /// Column metadata for `Query` blocks; `None` for statements that
    /// produce no result shape.
    pub columns: Option<Vec<NativeColumn>>,
}

/// Columns of one introspected table, for the appender path.
#[derive(Debug)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<NativeColumn>,
}

/// Contract between the introspector and a concrete engine.
#[allow(async_fn_in_trait)]
pub trait EngineAdapter {
    /// Execute raw setup SQL: migrations, seed data, transaction probes.
    async fn initialize(&mut self, sql: &str) -> Result<(), EngineError>;

    /// Execute one query block and report native column metadata.
    async fn execute(&mut self, query: &Query) -> Result<Execution, EngineError>;

    /// Read the columns of the named tables from the engine catalog.
    async fn introspect_tables(&mut self, tables: &[String])
    -> Result<Vec<TableColumns>, EngineError>;

    /// Tear down the connection.
    async fn close(self) -> Result<(), EngineError>;

    /// Whether the introspector should wrap each query execution in a
    /// BEGIN/ROLLBACK pair so type discovery leaves no durable state.
    fn transactional_probe(&self) -> bool {
        false
    }
}
