//! Project configuration.
//!
//! ```yaml
//! project: demo
//! engine: duckdb
//! database: ":memory:"
//! language: typescript
//! sql:
//!   - queries/users.sql
//! out: gen/
//! constants:
//!   data_dir: "'/var/data'"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SquillError, SquillResult};

/// Database engine used for type discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Duckdb,
    Postgres,
    Sqlite,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Duckdb => "duckdb",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        })
    }
}

/// Output language for the generated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Typescript,
    Rust,
    Python,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Typescript => "typescript",
            Self::Rust => "rust",
            Self::Python => "python",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project: String,
    pub engine: Engine,
    #[serde(default = "default_database")]
    pub database: String,
    pub language: Language,
    pub sql: Vec<PathBuf>,
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Externally injected path constants, inlined wherever `${name}`
    /// references them.
    #[serde(default)]
    pub constants: BTreeMap<String, String>,
}

fn default_database() -> String {
    ":memory:".to_string()
}

fn default_out() -> PathBuf {
    PathBuf::from("gen")
}

impl ProjectConfig {
    pub fn load(path: &Path) -> SquillResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        if config.sql.is_empty() {
            return Err(SquillError::Config(
                "`sql:` must list at least one file".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let yaml = "\
project: demo
engine: sqlite
language: typescript
sql:
  - queries/users.sql
";
        let config: ProjectConfig = serde_yaml::from_str(yaml).expect("parse failed");
        assert_eq!(config.engine, Engine::Sqlite);
        assert_eq!(config.language, Language::Typescript);
        assert_eq!(config.database, ":memory:");
        assert_eq!(config.out, PathBuf::from("gen"));
        assert!(config.constants.is_empty());
    }

    #[test]
    fn test_parse_constants() {
        let yaml = "\
project: demo
engine: duckdb
language: python
sql: [a.sql]
constants:
  data_dir: \"'/var/data'\"
";
        let config: ProjectConfig = serde_yaml::from_str(yaml).expect("parse failed");
        assert_eq!(
            config.constants.get("data_dir").map(String::as_str),
            Some("'/var/data'")
        );
    }

    #[test]
    fn test_unknown_engine_rejected() {
        let yaml = "\
project: demo
engine: oracle
language: rust
sql: [a.sql]
";
        assert!(serde_yaml::from_str::<ProjectConfig>(yaml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "\
project: demo
engine: sqlite
language: rust
sql: [a.sql]
bogus: 1
";
        assert!(serde_yaml::from_str::<ProjectConfig>(yaml).is_err());
    }
}
