//! Annotation parser: splits a SQL file into an ordered list of typed query
//! blocks.

mod annotation;
mod body;

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::{SquillError, SquillResult};
use crate::model::{Modifiers, Query, QueryKind, SqlQueryPart, TypeOverride};
use crate::statement;

use annotation::RawHeader;

/// Parse one annotated SQL file into its query blocks.
///
/// `constants` is the externally injected path-constant map (from the
/// project configuration); `${name}` references resolve against a block's
/// own `@set` variables first, then against these constants.
pub fn parse_file(
    file: &str,
    text: &str,
    constants: &BTreeMap<String, String>,
) -> SquillResult<Vec<Query>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks: Vec<RawBlock> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();

        if let Some(rest) = trimmed.strip_prefix("--") {
            let rest = rest.trim_start();
            if annotation::header_keyword(rest).is_some() {
                let header =
                    annotation::parse_header(rest).map_err(|m| SquillError::parse(file, m))?;
                blocks.push(RawBlock::new(header));
                i += 1;
                continue;
            }
        }

        if let Some(rest) = trimmed.strip_prefix("/*") {
            let inner = rest.trim();
            if annotation::header_keyword(inner).is_some() {
                let (block, next) = parse_comment_block(file, inner, &lines, i)?;
                blocks.push(block);
                i = next;
                continue;
            }
        }

        match blocks.last_mut() {
            Some(block) => block.body.push(lines[i].to_string()),
            None => {
                // Only whitespace and plain comments may precede the first
                // annotation.
                if !(trimmed.is_empty()
                    || trimmed.starts_with("--")
                    || trimmed.starts_with("/*")
                    || trimmed.starts_with('*'))
                {
                    return Err(SquillError::parse(
                        file,
                        format!("SQL outside of an annotated block: '{trimmed}'"),
                    ));
                }
            }
        }
        i += 1;
    }

    assemble(file, blocks, constants)
}

struct RawBlock {
    header: RawHeader,
    overrides: Vec<(String, TypeOverride)>,
    body: Vec<String>,
}

impl RawBlock {
    fn new(header: RawHeader) -> Self {
        Self {
            header,
            overrides: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// Parse a `/* QUERY ... result: ... */` block starting at line `start`.
/// Returns the block and the index of the first line after the comment.
fn parse_comment_block(
    file: &str,
    inner: &str,
    lines: &[&str],
    start: usize,
) -> SquillResult<(RawBlock, usize)> {
    // Single-line form: `/* QUERY name */`
    if let Some(head) = inner.strip_suffix("*/") {
        let header =
            annotation::parse_header(head.trim()).map_err(|m| SquillError::parse(file, m))?;
        return Ok((RawBlock::new(header), start + 1));
    }

    let header = annotation::parse_header(inner).map_err(|m| SquillError::parse(file, m))?;
    let mut block = RawBlock::new(header);
    let mut saw_result = false;
    let mut j = start + 1;

    while j < lines.len() {
        let line = lines[j].trim();
        let closing = line.strip_suffix("*/").map(str::trim);
        let content = closing.unwrap_or(line);
        if !content.is_empty() {
            if content == "result:" {
                saw_result = true;
            } else if saw_result {
                let entry = annotation::parse_override_entry(content)
                    .map_err(|m| SquillError::parse(file, m))?;
                if block.overrides.iter().any(|(n, _)| n == &entry.0) {
                    return Err(SquillError::parse(
                        file,
                        format!("duplicate type override for column '{}'", entry.0),
                    ));
                }
                block.overrides.push(entry);
            } else {
                return Err(SquillError::parse(
                    file,
                    format!("unexpected content in annotation comment: '{content}'"),
                ));
            }
        }
        j += 1;
        if closing.is_some() {
            return Ok((block, j));
        }
    }
    Err(SquillError::parse(file, "unterminated annotation comment"))
}

fn keyword(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Migrate => "MIGRATE",
        QueryKind::Testdata => "TESTDATA",
        QueryKind::Query => "QUERY",
        QueryKind::Exec => "EXEC",
        QueryKind::Table => "TABLE",
    }
}

fn assemble(
    file: &str,
    blocks: Vec<RawBlock>,
    constants: &BTreeMap<String, String>,
) -> SquillResult<Vec<Query>> {
    let mut queries = Vec::with_capacity(blocks.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut testdata_count = 0usize;

    for block in blocks {
        let RawBlock {
            header,
            overrides,
            body,
        } = block;
        let kw = keyword(header.kind);

        let id = match header.kind {
            QueryKind::Migrate => format!("migrate_{}", header.order.unwrap_or(0)),
            QueryKind::Testdata => {
                testdata_count += 1;
                header
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("testdata_{testdata_count}"))
            }
            _ => header.name.clone().unwrap_or_default(),
        };
        if !seen.insert(id.clone()) {
            return Err(SquillError::DuplicateQuery {
                file: file.to_string(),
                name: id,
            });
        }

        let mut modifiers = Modifiers::default();
        for m in &header.modifiers {
            match (header.kind, m.as_str()) {
                (QueryKind::Query, "one") => modifiers.one = true,
                (QueryKind::Query, "pluck") => modifiers.pluck = true,
                (QueryKind::Table, "appender") => modifiers.appender = true,
                _ => {
                    return Err(SquillError::parse(
                        file,
                        format!("modifier ':{m}' is not valid on a {kw} block"),
                    ));
                }
            }
        }
        if header.kind == QueryKind::Table && !modifiers.appender {
            return Err(SquillError::parse(
                file,
                format!("TABLE block '{id}' requires the :appender modifier"),
            ));
        }
        if !overrides.is_empty() && header.kind != QueryKind::Query {
            return Err(SquillError::parse(
                file,
                format!("{kw} block '{id}' cannot carry a result: override section"),
            ));
        }

        let mut variables: Vec<(String, String)> = Vec::new();
        let mut sql_lines: Vec<&str> = Vec::new();
        for line in &body {
            let t = line.trim();
            if t.starts_with("@set") {
                let (name, value) =
                    annotation::parse_set_line(t).map_err(|m| SquillError::parse(file, m))?;
                if variables.iter().any(|(n, _)| n == &name) {
                    return Err(SquillError::parse(
                        file,
                        format!("duplicate @set '{name}' in query '{id}'"),
                    ));
                }
                variables.push((name, value));
            } else {
                sql_lines.push(line.as_str());
            }
        }
        let raw_sql = sql_lines.join("\n").trim().to_string();

        if header.kind == QueryKind::Table {
            if !raw_sql.is_empty() {
                return Err(SquillError::parse(
                    file,
                    format!("TABLE block '{id}' takes no SQL body"),
                ));
            }
        } else if raw_sql.is_empty() {
            return Err(SquillError::parse(
                file,
                format!("{kw} block '{id}' has an empty SQL body"),
            ));
        }

        let parts = body::split_parts(&raw_sql, &id, file, &variables, constants)?;
        if matches!(header.kind, QueryKind::Migrate | QueryKind::Testdata)
            && parts.iter().any(
                |p| matches!(p, SqlQueryPart::Parameter(e) if !e.constant),
            )
        {
            return Err(SquillError::parse(
                file,
                format!("{kw} block '{id}' cannot bind parameters; only path constants may appear"),
            ));
        }

        let (anonymous, positional, named) = statement::render_all(&parts);
        debug!(query = %id, kind = kw, parameters = named.parameters.len(), "parsed block");

        queries.push(Query {
            id,
            kind: header.kind,
            raw_sql,
            migration_order: header.order,
            modifiers,
            variables,
            type_overrides: overrides,
            anonymous,
            positional,
            named,
            columns: Vec::new(),
            all_columns: None,
        });
    }

    Ok(queries)
}
