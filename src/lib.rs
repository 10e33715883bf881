//! squill — compile annotated SQL into strongly-typed data-access code.
//!
//! A SQL file annotated with `-- MIGRATE`, `-- TESTDATA`, and `-- QUERY`
//! blocks is parsed into query models, run against a live database engine to
//! discover exact column types, and projected into typed views ready for
//! code emission in TypeScript, Rust, or Python.

pub mod config;
pub mod error;
pub mod introspect;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod statement;
pub mod view;

pub use parser::parse_file;

pub mod prelude {
    pub use crate::config::{Engine, Language, ProjectConfig};
    pub use crate::error::{ErrorReport, SquillError, SquillResult};
    pub use crate::introspect::Introspector;
    pub use crate::introspect::adapter::{
        EngineAdapter, EngineError, Execution, NativeColumn, NativeType, TableColumns,
    };
    pub use crate::introspect::mock::MockAdapter;
    pub use crate::mapper::{
        DeclarationSet, LanguageBackend, PythonBackend, RustBackend, TypeMapper, TypeScriptBackend,
    };
    pub use crate::model::*;
    pub use crate::parser::parse_file;
    pub use crate::view::{QueryView, UnitView, build_unit};
}
