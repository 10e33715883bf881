//! Error types for squill.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SquillError {
    /// Malformed annotation block, override entry, or `@set` line.
    #[error("parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("duplicate query name '{name}' in {file}")]
    DuplicateQuery { file: String, name: String },

    /// `${name}` resolved against neither a local `@set` nor an injected
    /// path constant.
    #[error("unknown variable '${{{name}}}' in query '{query}' ({file})")]
    MissingVariable {
        file: String,
        query: String,
        name: String,
    },

    /// Migration, seed, or query execution failed on the live engine.
    #[error("introspection of '{query}' failed ({file}): {message}")]
    Introspection {
        file: String,
        query: String,
        sql: String,
        message: String,
    },

    #[error("validation of '{query}' failed ({file}): {message}")]
    Validation {
        file: String,
        query: String,
        message: String,
    },

    /// Two differently-shaped structured columns collided on one declared
    /// type name.
    #[error("type mapping failed for '{name}': {message}")]
    TypeMapping { name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SquillError {
    /// Create a parse error for the given file.
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an introspection error wrapping an engine failure.
    pub fn introspection(
        file: impl Into<String>,
        query: impl Into<String>,
        sql: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Introspection {
            file: file.into(),
            query: query.into(),
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error for one query.
    pub fn validation(
        file: impl Into<String>,
        query: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            file: file.into(),
            query: query.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::DuplicateQuery { .. } => "DUPLICATE_QUERY",
            Self::MissingVariable { .. } => "MISSING_VARIABLE",
            Self::Introspection { .. } => "INTROSPECTION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::TypeMapping { .. } => "TYPE_MAPPING_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Optional hint shown beneath the error message.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingVariable { .. } => {
                Some("declare the variable with `@set <name> = <literal>` inside the block, or add it to `constants:` in the project config")
            }
            Self::DuplicateQuery { .. } => Some("query names must be unique within a file"),
            Self::TypeMapping { .. } => {
                Some("structured columns sharing a field name share a declared type; rename one of the columns or align their shapes")
            }
            _ => None,
        }
    }

    /// Build the structured report for this error.
    pub fn report(&self) -> ErrorReport {
        let (file, query, sql) = match self {
            Self::Parse { file, .. } => (Some(file.clone()), None, None),
            Self::DuplicateQuery { file, name } => (Some(file.clone()), Some(name.clone()), None),
            Self::MissingVariable { file, query, .. } => {
                (Some(file.clone()), Some(query.clone()), None)
            }
            Self::Introspection {
                file, query, sql, ..
            } => (Some(file.clone()), Some(query.clone()), Some(sql.clone())),
            Self::Validation { file, query, .. } => {
                (Some(file.clone()), Some(query.clone()), None)
            }
            _ => (None, None, None),
        };
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            suggestion: self.suggestion(),
            file,
            query,
            sql,
        }
    }
}

/// One error rendered as data: the same report feeds the human-readable
/// terminal output and the machine-readable JSON output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Result type alias for squill operations.
pub type SquillResult<T> = Result<T, SquillError>;
