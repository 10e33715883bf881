//! SQLite adapter over sqlx.
//!
//! Column metadata comes from statement description (prepare-time), so
//! `Query` blocks never materialize rows. SQLite reports scalar types only;
//! the catalog side reads `PRAGMA table_info` for the appender path.

use sqlx::sqlite::SqliteConnection;
use sqlx::{Column, Connection, Executor, Row, TypeInfo};

use crate::model::{Query, QueryKind};

use super::adapter::{EngineAdapter, EngineError, Execution, NativeColumn, NativeType, TableColumns};

pub struct SqliteAdapter {
    conn: SqliteConnection,
}

impl SqliteAdapter {
    /// Connect to a SQLite database. `":memory:"` opens a fresh in-memory
    /// database, which is the normal mode for type discovery.
    pub async fn connect(database: &str) -> Result<Self, EngineError> {
        let url = if database == ":memory:" {
            "sqlite::memory:".to_string()
        } else if database.starts_with("sqlite:") {
            database.to_string()
        } else {
            format!("sqlite://{database}?mode=rwc")
        };
        let conn = SqliteConnection::connect(&url).await?;
        Ok(Self { conn })
    }
}

impl EngineAdapter for SqliteAdapter {
    async fn initialize(&mut self, sql: &str) -> Result<(), EngineError> {
        // Raw execution: migration blocks may hold several statements.
        self.conn.execute(sql).await?;
        Ok(())
    }

    async fn execute(&mut self, query: &Query) -> Result<Execution, EngineError> {
        if query.kind == QueryKind::Query {
            let described = self.conn.describe(&query.anonymous.sql).await?;
            let columns = described
                .columns()
                .iter()
                .enumerate()
                .map(|(i, col)| NativeColumn {
                    name: col.name().to_string(),
                    ty: NativeType::scalar(col.type_info().name()),
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
            // Table names come from the annotation grammar, so they are
            // plain identifiers.
            let sql = format!("PRAGMA table_info(\"{table}\")");
            let rows = sqlx::query(&sql).fetch_all(&mut self.conn).await?;

            let mut raw: Vec<(String, String, bool, bool)> = Vec::with_capacity(rows.len());
            for row in &rows {
                let name: String = row.try_get("name")?;
                let ty: String = row.try_get("type")?;
                let notnull: i64 = row.try_get("notnull")?;
                let pk: i64 = row.try_get("pk")?;
                raw.push((name, ty, notnull != 0, pk != 0));
            }

            let pk_count = raw.iter().filter(|(_, _, _, pk)| *pk).count();
            let columns = raw
                .into_iter()
                .map(|(name, ty, notnull, pk)| {
                    let sole_pk = pk && pk_count == 1 && ty.to_uppercase().starts_with("INT");
                    let mut column =
                        NativeColumn::new(name, NativeType::scalar(ty)).nullable(!notnull);
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
        self.conn.close().await?;
        Ok(())
    }

    fn transactional_probe(&self) -> bool {
        true
    }
}
