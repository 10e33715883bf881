//! Type mapper: canonical column types → target-language type names and
//! nominal declarations.
//!
//! One `LanguageBackend` per output language; all of them share the same
//! recursive algorithm and differ only in lookup tables and formatting.
//! Adding a language means one primitive table and a handful of formatter
//! functions, nothing more.

mod python;
mod rust;
mod typescript;

pub use python::PythonBackend;
pub use rust::RustBackend;
pub use typescript::TypeScriptBackend;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{SquillError, SquillResult};
use crate::model::{ColumnInfo, ColumnType};

/// Per-language lookup tables and syntax.
pub trait LanguageBackend {
    fn name(&self) -> &'static str;

    /// Target type for an uppercased primitive name, if mapped.
    fn primitive(&self, name: &str) -> Option<&'static str>;

    /// Fallback for unmapped primitives. A lossy default, never an error.
    fn untyped(&self) -> &'static str;

    fn nullable_type(&self, base: &str) -> String;

    fn list_type(&self, element: &str) -> String;

    /// Declared type name for a struct column, derived from the field name.
    fn type_ident(&self, field: &str) -> String {
        pascal_case(field)
    }

    /// Declared type name for a map column.
    fn map_ident(&self, field: &str) -> String {
        format!("{}Map", pascal_case(field))
    }

    fn enum_type(&self, values: &[String]) -> String;

    /// Render one nominal struct declaration.
    fn struct_decl(&self, name: &str, fields: &[(String, String)]) -> String;

    /// Expression converting a raw driver value into the mapped type.
    /// Identity is valid for drivers that already return shaped values.
    fn parse_value(&self, _column: &ColumnInfo, raw: &str) -> String {
        raw.to_string()
    }
}

/// One emitted nominal declaration.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub name: String,
    pub rendered: String,
    #[serde(skip)]
    fingerprint: String,
}

/// Name-keyed declaration collection for one compilation unit.
///
/// A second request for an already-declared name is skipped when the shape
/// matches; a divergent shape under the same name is a hard error rather
/// than silent first-wins.
#[derive(Debug, Default)]
pub struct DeclarationSet {
    declarations: Vec<Declaration>,
    index: HashMap<String, usize>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn into_vec(self) -> Vec<Declaration> {
        self.declarations
    }

    /// Returns `true` if the declaration was new.
    fn insert(&mut self, name: &str, fingerprint: &str, rendered: String) -> SquillResult<bool> {
        match self.index.get(name) {
            Some(&i) if self.declarations[i].fingerprint == fingerprint => Ok(false),
            Some(&i) => Err(SquillError::TypeMapping {
                name: name.to_string(),
                message: format!(
                    "two differently-shaped columns share the declared name: {} vs {}",
                    self.declarations[i].fingerprint, fingerprint
                ),
            }),
            None => {
                self.index.insert(name.to_string(), self.declarations.len());
                self.declarations.push(Declaration {
                    name: name.to_string(),
                    rendered,
                    fingerprint: fingerprint.to_string(),
                });
                Ok(true)
            }
        }
    }
}

/// The shared recursive resolver.
pub struct TypeMapper<'a, B: LanguageBackend> {
    backend: &'a B,
}

impl<'a, B: LanguageBackend> TypeMapper<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Target type name for a column, nullable-suffixed per backend
    /// convention.
    pub fn type_name(&self, column: &ColumnInfo, path_prefix: &str) -> String {
        let base = self.base_type_name(column, path_prefix);
        if column.nullable {
            self.backend.nullable_type(&base)
        } else {
            base
        }
    }

    fn base_type_name(&self, column: &ColumnInfo, prefix: &str) -> String {
        match &column.ty {
            ColumnType::Primitive(name) => self
                .backend
                .primitive(name)
                .map(str::to_string)
                .unwrap_or_else(|| self.backend.untyped().to_string()),
            ColumnType::List(element) => {
                // The element inherits the holding field's name: a list of
                // structs under `tags` declares `Tags`.
                let inner = ColumnInfo {
                    name: column.name.clone(),
                    ty: (**element).clone(),
                    nullable: false,
                };
                self.backend.list_type(&self.base_type_name(&inner, prefix))
            }
            ColumnType::Struct(_) => format!("{prefix}{}", self.backend.type_ident(&column.name)),
            ColumnType::Map { .. } => format!("{prefix}{}", self.backend.map_ident(&column.name)),
            ColumnType::Enum(values) => self.backend.enum_type(values),
        }
    }

    /// Collect nominal declarations for every struct reachable from this
    /// column. Nested structs get path-qualified names; lists and maps
    /// recurse without declaring anything themselves.
    pub fn declarations(
        &self,
        column: &ColumnInfo,
        path_prefix: &str,
        set: &mut DeclarationSet,
    ) -> SquillResult<()> {
        let mut stack = Vec::new();
        self.walk(column, path_prefix, set, &mut stack)
    }

    /// Declare the synthetic row struct of a query.
    ///
    /// The row wrapper is transparent for naming: its fields keep their own
    /// unqualified type names, so two queries projecting the same structured
    /// column share one declaration — or collide loudly when their shapes
    /// diverge.
    pub fn row_declarations(
        &self,
        row: &ColumnInfo,
        set: &mut DeclarationSet,
    ) -> SquillResult<()> {
        let ColumnType::Struct(fields) = &row.ty else {
            return self.declarations(row, "", set);
        };
        let name = self.backend.type_ident(&row.name);
        let fingerprint = shape_fingerprint(&row.ty);
        let rendered_fields: Vec<(String, String)> = fields
            .iter()
            .map(|field| (field.name.clone(), self.type_name(field, "")))
            .collect();
        let rendered = self.backend.struct_decl(&name, &rendered_fields);
        if set.insert(&name, &fingerprint, rendered)? {
            for field in fields {
                self.declarations(field, "", set)?;
            }
        }
        Ok(())
    }

    fn walk(
        &self,
        column: &ColumnInfo,
        prefix: &str,
        set: &mut DeclarationSet,
        stack: &mut Vec<String>,
    ) -> SquillResult<()> {
        match &column.ty {
            ColumnType::Struct(fields) => {
                let name = format!("{prefix}{}", self.backend.type_ident(&column.name));
                // Self-referential structs terminate here instead of
                // recursing forever.
                if stack.contains(&name) {
                    return Ok(());
                }
                let fingerprint = shape_fingerprint(&column.ty);
                let rendered_fields: Vec<(String, String)> = fields
                    .iter()
                    .map(|field| (field.name.clone(), self.type_name(field, &name)))
                    .collect();
                let rendered = self.backend.struct_decl(&name, &rendered_fields);
                if set.insert(&name, &fingerprint, rendered)? {
                    stack.push(name.clone());
                    for field in fields {
                        self.walk(field, &name, set, stack)?;
                    }
                    stack.pop();
                }
                Ok(())
            }
            ColumnType::List(element) => {
                let inner = ColumnInfo {
                    name: column.name.clone(),
                    ty: (**element).clone(),
                    nullable: false,
                };
                self.walk(&inner, prefix, set, stack)
            }
            ColumnType::Map { key, value } => {
                self.walk(key, prefix, set, stack)?;
                self.walk(value, prefix, set, stack)
            }
            _ => Ok(()),
        }
    }

    /// Backend hook for raw-value conversion expressions.
    pub fn parse_value(&self, column: &ColumnInfo, raw: &str) -> String {
        self.backend.parse_value(column, raw)
    }
}

/// Stable structural fingerprint used for collision detection.
fn shape_fingerprint(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Primitive(name) => name.clone(),
        ColumnType::List(element) => format!("list<{}>", shape_fingerprint(element)),
        ColumnType::Struct(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|f| {
                    format!(
                        "{}:{}{}",
                        f.name,
                        shape_fingerprint(&f.ty),
                        if f.nullable { "?" } else { "" }
                    )
                })
                .collect();
            format!("struct<{}>", rendered.join(","))
        }
        ColumnType::Map { key, value } => format!(
            "map<{},{}>",
            shape_fingerprint(&key.ty),
            shape_fingerprint(&value.ty)
        ),
        ColumnType::Enum(values) => format!("enum<{}>", values.join(",")),
    }
}

/// `user_id` → `UserId`.
pub(crate) fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if upper_next {
                out.extend(c.to_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        } else {
            upper_next = true;
        }
    }
    out
}
