//! Query view: the read-only projection of a validated unit that the
//! template backend consumes. Serializes to JSON so emission has a concrete,
//! testable surface.

use serde::Serialize;

use crate::error::{SquillError, SquillResult};
use crate::mapper::{Declaration, DeclarationSet, LanguageBackend, TypeMapper};
use crate::model::{ColumnInfo, ColumnType, Query, QueryKind, StatementRendering};

/// One function parameter with its mapped target type.
#[derive(Debug, Clone, Serialize)]
pub struct ParamView {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// One generated function.
#[derive(Debug, Clone, Serialize)]
pub struct QueryView {
    pub function_name: String,
    pub kind: QueryKind,
    pub params: Vec<ParamView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub anonymous: StatementRendering,
    pub positional: StatementRendering,
    pub named: StatementRendering,
}

/// Everything the emitter needs for one (engine, file) unit.
#[derive(Debug, Serialize)]
pub struct UnitView {
    pub file: String,
    pub language: &'static str,
    pub queries: Vec<QueryView>,
    pub declarations: Vec<Declaration>,
}

/// Infer the canonical primitive for a `@set` sample literal: integral
/// numerics are integers, fractional numerics are reals, `true`/`false` are
/// booleans, everything else is text.
pub(crate) fn sniff_literal(value: &str) -> &'static str {
    let v = value.trim();
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false") {
        return "BOOLEAN";
    }
    let unsigned = v.strip_prefix('-').unwrap_or(v);
    if !unsigned.is_empty() && unsigned.chars().all(|c| c.is_ascii_digit()) {
        return "INTEGER";
    }
    if v.parse::<f64>().is_ok() {
        return "DOUBLE";
    }
    "VARCHAR"
}

/// Build the unit view for one file: per-query function signatures plus the
/// unit-wide deduplicated declaration set.
pub fn build_unit<B: LanguageBackend>(
    file: &str,
    queries: &[Query],
    backend: &B,
) -> SquillResult<UnitView> {
    let mapper = TypeMapper::new(backend);
    let mut set = DeclarationSet::new();
    let mut views = Vec::new();

    for query in queries {
        let return_type = match query.kind {
            QueryKind::Migrate | QueryKind::Testdata => continue,
            QueryKind::Exec => None,
            QueryKind::Table => {
                let all = expect_introspected(file, query)?;
                mapper.row_declarations(all, &mut set)?;
                Some(mapper.type_name(all, ""))
            }
            QueryKind::Query => {
                if query.modifiers.pluck {
                    let column = query.columns.first().ok_or_else(|| {
                        SquillError::validation(file, &query.id, "pluck query has no column")
                    })?;
                    mapper.declarations(column, "", &mut set)?;
                    let ty = mapper.type_name(column, "");
                    Some(if query.modifiers.one {
                        ty
                    } else {
                        backend.list_type(&ty)
                    })
                } else {
                    let all = expect_introspected(file, query)?;
                    mapper.row_declarations(all, &mut set)?;
                    let ty = mapper.type_name(all, "");
                    Some(if query.modifiers.one {
                        ty
                    } else {
                        backend.list_type(&ty)
                    })
                }
            }
        };

        let params = query
            .named
            .parameters
            .iter()
            .map(|p| {
                let column = ColumnInfo {
                    name: p.name.clone(),
                    ty: ColumnType::Primitive(sniff_literal(&p.value).to_string()),
                    nullable: false,
                };
                ParamView {
                    name: p.name.clone(),
                    ty: mapper.type_name(&column, ""),
                }
            })
            .collect();

        views.push(QueryView {
            function_name: query.id.clone(),
            kind: query.kind,
            params,
            return_type,
            anonymous: query.anonymous.clone(),
            positional: query.positional.clone(),
            named: query.named.clone(),
        });
    }

    Ok(UnitView {
        file: file.to_string(),
        language: backend.name(),
        queries: views,
        declarations: set.into_vec(),
    })
}

fn expect_introspected<'q>(file: &str, query: &'q Query) -> SquillResult<&'q ColumnInfo> {
    query.all_columns.as_ref().ok_or_else(|| {
        SquillError::validation(file, &query.id, "query has not been introspected")
    })
}
