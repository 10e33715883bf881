//! Scripted in-memory adapter.
//!
//! Serves fixture metadata instead of talking to an engine, and records
//! every statement it is asked to run so tests can assert on execution
//! order. Also backs offline checks in the CLI.

use std::collections::HashMap;

use crate::model::Query;

use super::adapter::{EngineAdapter, EngineError, Execution, NativeColumn, TableColumns};

#[derive(Debug, Default)]
pub struct MockAdapter {
    columns: HashMap<String, Vec<NativeColumn>>,
    tables: HashMap<String, Vec<NativeColumn>>,
    probe: bool,
    fail_on: Option<String>,
    log: Vec<String>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register result columns for the query with the given id.
    pub fn with_columns(mut self, id: &str, columns: Vec<NativeColumn>) -> Self {
        self.columns.insert(id.to_string(), columns);
        self
    }

    /// Register catalog columns for a table.
    pub fn with_table(mut self, table: &str, columns: Vec<NativeColumn>) -> Self {
        self.tables.insert(table.to_string(), columns);
        self
    }

    /// Report the engine as wanting BEGIN/ROLLBACK probe wrapping.
    pub fn with_probe(mut self) -> Self {
        self.probe = true;
        self
    }

    /// Fail the statement whose SQL contains the given marker.
    pub fn fail_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.to_string());
        self
    }

    /// Every statement run so far, in order.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn check_failure(&self, sql: &str) -> Result<(), EngineError> {
        if let Some(marker) = &self.fail_on {
            if sql.contains(marker.as_str()) {
                return Err(EngineError::new(format!(
                    "scripted failure on '{marker}'"
                )));
            }
        }
        Ok(())
    }
}

impl EngineAdapter for MockAdapter {
    async fn initialize(&mut self, sql: &str) -> Result<(), EngineError> {
        self.check_failure(sql)?;
        self.log.push(sql.to_string());
        Ok(())
    }

    async fn execute(&mut self, query: &Query) -> Result<Execution, EngineError> {
        let sql = query.sql_with_samples();
        self.check_failure(&sql)?;
        self.log.push(sql);
        Ok(Execution {
            columns: self.columns.get(&query.id).cloned(),
        })
    }

    async fn introspect_tables(
        &mut self,
        tables: &[String],
    ) -> Result<Vec<TableColumns>, EngineError> {
        let mut out = Vec::new();
        for name in tables {
            if let Some(columns) = self.tables.get(name) {
                out.push(TableColumns {
                    table: name.clone(),
                    columns: columns.clone(),
                });
            }
        }
        Ok(out)
    }

    async fn close(self) -> Result<(), EngineError> {
        Ok(())
    }

    fn transactional_probe(&self) -> bool {
        self.probe
    }
}
