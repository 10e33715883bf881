//! Introspector: runs a file's blocks against a live engine, in order, and
//! normalizes the engine's native column metadata into the canonical model.

pub mod adapter;
pub mod mock;

#[cfg(feature = "duckdb")]
pub mod duckdb;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use tracing::debug;

use crate::error::{SquillError, SquillResult};
use crate::model::{ColumnInfo, ColumnType, Query, QueryKind};

use adapter::{EngineAdapter, NativeColumn, NativeType};

/// Drives one (engine, file) compilation unit: migrations in embedded-integer
/// order, seed data in file order, then every query — strictly sequential,
/// fail-fast.
pub struct Introspector {
    file: String,
}

impl Introspector {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    /// Run the whole unit. On success every `Query`/`Table` block carries
    /// validated canonical columns and its synthetic `all_columns` struct.
    pub async fn run<A: EngineAdapter>(
        &self,
        queries: &mut [Query],
        adapter: &mut A,
    ) -> SquillResult<()> {
        self.run_migrations(queries, adapter).await?;
        self.run_testdata(queries, adapter).await?;

        for query in queries
            .iter_mut()
            .filter(|q| matches!(q.kind, QueryKind::Query | QueryKind::Exec | QueryKind::Table))
        {
            let probe = adapter.transactional_probe();
            if probe {
                adapter
                    .initialize("BEGIN")
                    .await
                    .map_err(|e| self.engine_err(query, e))?;
            }
            let outcome = self.execute_block(query, adapter).await;
            match outcome {
                Ok(native) => {
                    if probe {
                        adapter
                            .initialize("ROLLBACK")
                            .await
                            .map_err(|e| self.engine_err(query, e))?;
                    }
                    if let Some(native) = native {
                        query.columns = native.iter().map(convert_column).collect();
                    }
                    self.finalize(query)?;
                }
                Err(err) => {
                    if probe {
                        // Best effort: the unit is aborting anyway.
                        let _ = adapter.initialize("ROLLBACK").await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn run_migrations<A: EngineAdapter>(
        &self,
        queries: &mut [Query],
        adapter: &mut A,
    ) -> SquillResult<()> {
        let mut order: Vec<usize> = (0..queries.len())
            .filter(|&i| queries[i].kind == QueryKind::Migrate)
            .collect();
        // Embedded integer is authoritative; the sort is stable so equal
        // orders keep file position.
        order.sort_by_key(|&i| queries[i].migration_order.unwrap_or(0));

        for i in order {
            let query = &queries[i];
            debug!(migration = %query.id, "applying migration");
            adapter
                .initialize(&query.sql_with_samples())
                .await
                .map_err(|e| self.engine_err(query, e))?;
        }
        Ok(())
    }

    async fn run_testdata<A: EngineAdapter>(
        &self,
        queries: &mut [Query],
        adapter: &mut A,
    ) -> SquillResult<()> {
        for query in queries.iter().filter(|q| q.kind == QueryKind::Testdata) {
            debug!(block = %query.id, "loading seed data");
            adapter
                .initialize(&query.sql_with_samples())
                .await
                .map_err(|e| self.engine_err(query, e))?;
        }
        Ok(())
    }

    async fn execute_block<A: EngineAdapter>(
        &self,
        query: &Query,
        adapter: &mut A,
    ) -> SquillResult<Option<Vec<NativeColumn>>> {
        match query.kind {
            QueryKind::Table => {
                debug!(table = %query.id, "introspecting table for appender");
                let tables = adapter
                    .introspect_tables(std::slice::from_ref(&query.id))
                    .await
                    .map_err(|e| self.engine_err(query, e))?;
                let table = tables.into_iter().next().ok_or_else(|| {
                    SquillError::validation(
                        &self.file,
                        &query.id,
                        "engine reported no such table",
                    )
                })?;
                Ok(Some(table.columns))
            }
            QueryKind::Query => {
                debug!(query = %query.id, "executing query for column types");
                let execution = adapter
                    .execute(query)
                    .await
                    .map_err(|e| self.engine_err(query, e))?;
                let columns = execution.columns.ok_or_else(|| {
                    SquillError::validation(
                        &self.file,
                        &query.id,
                        "engine returned no column metadata",
                    )
                })?;
                Ok(Some(columns))
            }
            _ => {
                debug!(query = %query.id, "executing statement");
                adapter
                    .execute(query)
                    .await
                    .map_err(|e| self.engine_err(query, e))?;
                Ok(None)
            }
        }
    }

    /// Override merge and validation; builds the synthetic row struct.
    fn finalize(&self, query: &mut Query) -> SquillResult<()> {
        for (name, over) in &query.type_overrides {
            match query.columns.iter_mut().find(|c| c.name == *name) {
                Some(column) => {
                    *column = ColumnInfo {
                        name: name.clone(),
                        ty: ColumnType::primitive(&over.ty),
                        nullable: over.nullable,
                    };
                }
                None => {
                    return Err(SquillError::validation(
                        &self.file,
                        &query.id,
                        format!("type override names unknown column '{name}'"),
                    ));
                }
            }
        }

        if query.modifiers.pluck && query.columns.len() != 1 {
            return Err(SquillError::validation(
                &self.file,
                &query.id,
                format!(
                    ":pluck requires exactly one column, found {}",
                    query.columns.len()
                ),
            ));
        }

        if matches!(query.kind, QueryKind::Query | QueryKind::Table) {
            query.all_columns = Some(ColumnInfo {
                name: query.id.clone(),
                ty: ColumnType::Struct(query.columns.clone()),
                nullable: false,
            });
        }
        Ok(())
    }

    fn engine_err(&self, query: &Query, err: adapter::EngineError) -> SquillError {
        SquillError::introspection(&self.file, &query.id, &query.raw_sql, err)
    }
}

/// Normalize one native column, applying the nullability policy: trust the
/// engine, default unknowns to nullable, and force the sole integer primary
/// key non-nullable (engines misreport it).
fn convert_column(native: &NativeColumn) -> ColumnInfo {
    let nullable = if native.sole_integer_pk {
        false
    } else {
        native.nullable.unwrap_or(true)
    };
    ColumnInfo {
        name: native.name.clone(),
        ty: convert_type(&native.ty),
        nullable,
    }
}

/// Recursive native → canonical conversion. Nested struct fields and map
/// entries default to nullable; inline overrides are the only way to
/// tighten them.
fn convert_type(native: &NativeType) -> ColumnType {
    match native {
        NativeType::Scalar(name) => ColumnType::Primitive(name.to_uppercase()),
        NativeType::List(element) => ColumnType::List(Box::new(convert_type(element))),
        NativeType::Struct(fields) => ColumnType::Struct(
            fields
                .iter()
                .map(|(name, ty)| ColumnInfo {
                    name: name.clone(),
                    ty: convert_type(ty),
                    nullable: true,
                })
                .collect(),
        ),
        NativeType::Map(key, value) => ColumnType::Map {
            key: Box::new(ColumnInfo {
                name: "key".to_string(),
                ty: convert_type(key),
                nullable: true,
            }),
            value: Box::new(ColumnInfo {
                name: "value".to_string(),
                ty: convert_type(value),
                nullable: true,
            }),
        },
        NativeType::Enum(values) => ColumnType::Enum(values.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_convert_scalar_uppercases() {
        let native = NativeColumn::new("id", NativeType::scalar("int4")).nullable(false);
        let column = convert_column(&native);
        assert_eq!(column.ty, ColumnType::Primitive("INT4".into()));
        assert!(!column.nullable);
    }

    #[test]
    fn test_unknown_nullability_defaults_to_nullable() {
        let native = NativeColumn::new("x", NativeType::scalar("varchar"));
        assert!(convert_column(&native).nullable);
    }

    #[test]
    fn test_sole_integer_pk_forced_non_nullable() {
        let native = NativeColumn::new("id", NativeType::scalar("integer"))
            .nullable(true)
            .sole_integer_pk();
        assert!(!convert_column(&native).nullable);
    }

    #[test]
    fn test_convert_nested_types() {
        let native = NativeType::List(Box::new(NativeType::Struct(vec![
            ("a".to_string(), NativeType::scalar("integer")),
            (
                "b".to_string(),
                NativeType::Map(
                    Box::new(NativeType::scalar("varchar")),
                    Box::new(NativeType::scalar("double")),
                ),
            ),
        ])));
        let ty = convert_type(&native);
        match ty {
            ColumnType::List(element) => match *element {
                ColumnType::Struct(fields) => {
                    assert_eq!(fields.len(), 2);
                    assert_eq!(fields[0].ty, ColumnType::Primitive("INTEGER".into()));
                    assert!(fields[0].nullable);
                    match &fields[1].ty {
                        ColumnType::Map { key, value } => {
                            assert_eq!(key.ty, ColumnType::Primitive("VARCHAR".into()));
                            assert_eq!(value.ty, ColumnType::Primitive("DOUBLE".into()));
                        }
                        other => panic!("expected map, got {other:?}"),
                    }
                }
                other => panic!("expected struct, got {other:?}"),
            },
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_enum_keeps_values() {
        let ty = convert_type(&NativeType::Enum(vec!["low".into(), "high".into()]));
        assert_eq!(ty, ColumnType::Enum(vec!["low".into(), "high".into()]));
    }
}
