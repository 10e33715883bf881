//! PostgreSQL adapter over sqlx.
//!
//! Query metadata comes from statement description against the live server;
//! the catalog side reads `information_schema`. Array types surface as
//! lists; everything else PostgreSQL reports at this level is scalar.

use sqlx::postgres::PgConnection;
use sqlx::{Column, Connection, Executor, Row, TypeInfo};

use crate::model::{Query, QueryKind};

use super::adapter::{EngineAdapter, EngineError, Execution, NativeColumn, NativeType, TableColumns};

pub struct PostgresAdapter {
    conn: PgConnection,
}

impl PostgresAdapter {
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        let conn = PgConnection::connect(url).await?;
        Ok(Self { conn })
    }
}

/// `_int4` (catalog) and `INT4[]` (describe) both denote an array type.
fn native_of(type_name: &str) -> NativeType {
    if let Some(element) = type_name.strip_suffix("[]") {
        return NativeType::List(Box::new(NativeType::scalar(element)));
    }
    if let Some(element) = type_name.strip_prefix('_') {
        return NativeType::List(Box::new(NativeType::scalar(element)));
    }
    NativeType::scalar(type_name)
}

fn is_integer_udt(udt: &str) -> bool {
    matches!(udt, "int2" | "int4" | "int8" | "serial" | "bigserial")
}

impl EngineAdapter for PostgresAdapter {
    async fn initialize(&mut self, sql: &str) -> Result<(), EngineError> {
        // Raw execution: migration blocks may hold several statements.
        self.conn.execute(sql).await?;
        Ok(())
    }

    async fn execute(&mut self, query: &Query) -> Result<Execution, EngineError> {
        if query.kind == QueryKind::Query {
            let described = self.conn.describe(&query.positional.sql).await?;
            let columns = described
                .columns()
                .iter()
                .enumerate()
                .map(|(i, col)| NativeColumn {
                    name: col.name().to_string(),
                    ty: native_of(col.type_info().name()),
                    nullable: described.nullable(i),
                    sole_integer_pk: false,
                })
                .collect();
            return Ok(Execution {
                columns: Some(columns),
            });
        }
        let sql = query.sql_with_samples();
        self.conn.execute(sql.as_str()).await?;
        Ok(Execution::default())
    }

    async fn introspect_tables(
        &mut self,
        tables: &[String],
    ) -> Result<Vec<TableColumns>, EngineError> {
        let mut out = Vec::new();
        for table in tables {
            let rows = sqlx::query(
                "SELECT column_name, udt_name, is_nullable \
                 FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(table.as_str())
            .fetch_all(&mut self.conn)
            .await?;

            let pk_rows = sqlx::query(
                "SELECT kcu.column_name \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                 WHERE tc.table_schema = 'public' AND tc.table_name = $1 \
                   AND tc.constraint_type = 'PRIMARY KEY'",
            )
            .bind(table.as_str())
            .fetch_all(&mut self.conn)
            .await?;

            let mut pk_columns = Vec::with_capacity(pk_rows.len());
            for row in &pk_rows {
                pk_columns.push(row.try_get::<String, _>("column_name")?);
            }

            let mut columns = Vec::with_capacity(rows.len());
            for row in &rows {
                let name: String = row.try_get("column_name")?;
                let udt: String = row.try_get("udt_name")?;
                let is_nullable: String = row.try_get("is_nullable")?;
                let sole_pk = pk_columns.len() == 1
                    && pk_columns[0] == name
                    && is_integer_udt(udt.as_str());
                let mut column =
                    NativeColumn::new(name, native_of(&udt)).nullable(is_nullable == "YES");
                if sole_pk {
                    column = column.sole_integer_pk();
                }
                columns.push(column);
            }
            out.push(TableColumns {
                table: table.clone(),
                columns,
            });
        }
        Ok(out)
    }

    async fn close(self) -> Result<(), EngineError> {
        self.conn.close().await?;
        Ok(())
    }

    fn transactional_probe(&self) -> bool {
        true
    }
}
