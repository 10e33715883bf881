//! DuckDB adapter.
//!
//! DuckDB is the engine whose native metadata exercises the whole canonical
//! model: LIST, STRUCT, MAP, and ENUM column types come straight out of the
//! result schema. The catalog side reads `PRAGMA table_info` for the
//! appender path.

use duckdb::Connection;
use duckdb::arrow::datatypes::DataType;

use crate::model::{Query, QueryKind};

use super::adapter::{EngineAdapter, EngineError, Execution, NativeColumn, NativeType, TableColumns};

pub struct DuckDbAdapter {
    conn: Connection,
}

impl DuckDbAdapter {
    /// Open a DuckDB database. `":memory:"` opens a fresh in-memory
    /// database, the normal mode for type discovery.
    pub fn open(database: &str) -> Result<Self, EngineError> {
        let conn = if database == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(database)?
        };
        Ok(Self { conn })
    }
}

fn native_of(ty: &DataType) -> NativeType {
    match ty {
        DataType::List(field)
        | DataType::LargeList(field)
        | DataType::FixedSizeList(field, _) => {
            NativeType::List(Box::new(native_of(field.data_type())))
        }
        DataType::Struct(fields) => NativeType::Struct(
            fields
                .iter()
                .map(|field| (field.name().clone(), native_of(field.data_type())))
                .collect(),
        ),
        DataType::Map(entries, _) => match entries.data_type() {
            DataType::Struct(kv) if kv.len() == 2 => NativeType::Map(
                Box::new(native_of(kv[0].data_type())),
                Box::new(native_of(kv[1].data_type())),
            ),
            other => NativeType::Scalar(format!("{other}").to_uppercase()),
        },
        // DuckDB enums arrive as dictionary-encoded strings; the schema does
        // not expose the member list.
        DataType::Dictionary(_, _) => NativeType::Enum(Vec::new()),
        DataType::Boolean => NativeType::scalar("BOOLEAN"),
        DataType::Int8 => NativeType::scalar("TINYINT"),
        DataType::Int16 => NativeType::scalar("SMALLINT"),
        DataType::Int32 => NativeType::scalar("INTEGER"),
        DataType::Int64 => NativeType::scalar("BIGINT"),
        DataType::UInt8 => NativeType::scalar("UTINYINT"),
        DataType::UInt16 => NativeType::scalar("USMALLINT"),
        DataType::UInt32 => NativeType::scalar("UINTEGER"),
        DataType::UInt64 => NativeType::scalar("UBIGINT"),
        DataType::Float32 => NativeType::scalar("FLOAT"),
        DataType::Float64 => NativeType::scalar("DOUBLE"),
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => NativeType::scalar("DECIMAL"),
        DataType::Utf8 | DataType::LargeUtf8 => NativeType::scalar("VARCHAR"),
        DataType::Binary | DataType::LargeBinary => NativeType::scalar("BLOB"),
        DataType::Date32 | DataType::Date64 => NativeType::scalar("DATE"),
        DataType::Time32(_) | DataType::Time64(_) => NativeType::scalar("TIME"),
        DataType::Timestamp(_, Some(_)) => NativeType::scalar("TIMESTAMPTZ"),
        DataType::Timestamp(_, None) => NativeType::scalar("TIMESTAMP"),
        DataType::Interval(_) => NativeType::scalar("INTERVAL"),
        other => NativeType::Scalar(format!("{other}").to_uppercase()),
    }
}

impl EngineAdapter for DuckDbAdapter {
    async fn initialize(&mut self, sql: &str) -> Result<(), EngineError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    async fn execute(&mut self, query: &Query) -> Result<Execution, EngineError> {
        let sql = query.sql_with_samples();
        if query.kind == QueryKind::Query {
            let mut stmt = self.conn.prepare(&sql)?;
            let schema = stmt.query_arrow([])?.get_schema();
            let columns = schema
                .fields()
                .iter()
                .map(|field| {
                    NativeColumn::new(field.name().clone(), native_of(field.data_type()))
                        .nullable(field.is_nullable())
                })
                .collect();
            return Ok(Execution {
                columns: Some(columns),
            });
        }
        self.conn.execute_batch(&sql)?;
        Ok(Execution::default())
    }

    async fn introspect_tables(
        &mut self,
        tables: &[String],
    ) -> Result<Vec<TableColumns>, EngineError> {
        let mut out = Vec::new();
        for table in tables {
            // Table names come from the annotation grammar, so they are
            // plain identifiers.
            let mut stmt = self
                .conn
                .prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(5)?,
                ))
            })?;
            let mut raw: Vec<(String, String, bool, bool)> = Vec::new();
            for row in rows {
                raw.push(row?);
            }

            let pk_count = raw.iter().filter(|(_, _, _, pk)| *pk).count();
            let columns = raw
                .into_iter()
                .map(|(name, ty, notnull, pk)| {
                    let upper = ty.to_uppercase();
                    let sole_pk = pk
                        && pk_count == 1
                        && (upper.contains("INT") && !upper.contains("POINT"));
                    let mut column =
                        NativeColumn::new(name, NativeType::Scalar(upper)).nullable(!notnull);
                    if sole_pk {
                        column = column.sole_integer_pk();
                    }
                    column
                })
                .collect();
            out.push(TableColumns {
                table: table.clone(),
                columns,
            });
        }
        Ok(out)
    }

    async fn close(self) -> Result<(), EngineError> {
        self.conn.close().map_err(|(_, err)| EngineError::from(err))
    }

    fn transactional_probe(&self) -> bool {
        true
    }
}
