//! SQL body walk.
//!
//! Bodies are opaque except for three things: comments (spliced out,
//! replaced by a single space so adjacent tokens never collapse), quoted
//! string literals (copied verbatim so `--` inside a value is not a
//! comment), and `${name}` variable references.

use std::collections::BTreeMap;

use crate::error::SquillError;
use crate::model::{ParameterEntry, SqlQueryPart};

/// Split a trimmed body into literal spans and parameter entries.
///
/// `${name}` resolves against the block's own `@set` variables first, then
/// the externally injected path constants; anything else is a
/// `MissingVariable` error naming the query and file.
pub(crate) fn split_parts(
    body: &str,
    query: &str,
    file: &str,
    variables: &[(String, String)],
    constants: &BTreeMap<String, String>,
) -> Result<Vec<SqlQueryPart>, SquillError> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < body.len() {
        let rest = &body[i..];
        if rest.starts_with("--") {
            buf.push(' ');
            match rest.find('\n') {
                Some(n) => i += n,
                None => i = body.len(),
            }
        } else if rest.starts_with("/*") {
            match rest.find("*/") {
                Some(n) => {
                    buf.push(' ');
                    i += n + 2;
                }
                None => {
                    return Err(SquillError::parse(
                        file,
                        format!("unterminated block comment in query '{query}'"),
                    ));
                }
            }
        } else if rest.starts_with("${") {
            let end = rest.find('}').ok_or_else(|| {
                SquillError::parse(
                    file,
                    format!("unterminated variable reference in query '{query}'"),
                )
            })?;
            let name = &rest[2..end];
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(SquillError::parse(
                    file,
                    format!("invalid variable name '${{{name}}}' in query '{query}'"),
                ));
            }
            if !buf.is_empty() {
                parts.push(SqlQueryPart::Literal(std::mem::take(&mut buf)));
            }
            let entry = if let Some((_, value)) = variables.iter().find(|(n, _)| n == name) {
                ParameterEntry {
                    name: name.to_string(),
                    value: value.clone(),
                    constant: false,
                }
            } else if let Some(value) = constants.get(name) {
                ParameterEntry {
                    name: name.to_string(),
                    value: value.clone(),
                    constant: true,
                }
            } else {
                return Err(SquillError::MissingVariable {
                    file: file.to_string(),
                    query: query.to_string(),
                    name: name.to_string(),
                });
            };
            parts.push(SqlQueryPart::Parameter(entry));
            i += end + 1;
        } else if rest.starts_with('\'') {
            let closed = scan_string(rest).ok_or_else(|| {
                SquillError::parse(
                    file,
                    format!("unterminated string literal in query '{query}'"),
                )
            })?;
            buf.push_str(&rest[..closed]);
            i += closed;
        } else {
            // rest starts at a char boundary, so next() is always Some
            if let Some(ch) = rest.chars().next() {
                buf.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    let trimmed = buf.trim_end();
    if !trimmed.is_empty() {
        parts.push(SqlQueryPart::Literal(trimmed.to_string()));
    }
    Ok(parts)
}

/// Length of the single-quoted literal at the start of `text`, `''` escapes
/// included, or `None` if it never closes.
fn scan_string(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut j = 1;
    loop {
        let p = bytes[j..].iter().position(|&b| b == b'\'')?;
        let q = j + p;
        if bytes.get(q + 1) == Some(&b'\'') {
            j = q + 2;
        } else {
            return Some(q + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(body: &str, vars: &[(&str, &str)]) -> Result<Vec<SqlQueryPart>, SquillError> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect();
        split_parts(body, "q", "f.sql", &vars, &BTreeMap::new())
    }

    fn sql_of(parts: &[SqlQueryPart]) -> String {
        parts
            .iter()
            .map(|p| match p {
                SqlQueryPart::Literal(t) => t.clone(),
                SqlQueryPart::Parameter(e) => format!("<{}>", e.name),
            })
            .collect()
    }

    #[test]
    fn test_plain_body_is_one_literal() {
        let parts = run("SELECT 1", &[]).expect("parse failed");
        assert_eq!(parts, vec![SqlQueryPart::Literal("SELECT 1".into())]);
    }

    #[test]
    fn test_line_comment_becomes_single_space() {
        let parts = run("SELECT a,-- note\nb FROM t", &[]).expect("parse failed");
        assert_eq!(sql_of(&parts), "SELECT a, \nb FROM t");
    }

    #[test]
    fn test_block_comment_does_not_glue_tokens() {
        let parts = run("SELECT a/* gone */b", &[]).expect("parse failed");
        assert_eq!(sql_of(&parts), "SELECT a b");
    }

    #[test]
    fn test_comment_marker_inside_string_is_opaque() {
        let parts = run("SELECT '--not a comment' AS c", &[]).expect("parse failed");
        assert_eq!(sql_of(&parts), "SELECT '--not a comment' AS c");
        let parts = run("SELECT 'it''s' AS c", &[]).expect("parse failed");
        assert_eq!(sql_of(&parts), "SELECT 'it''s' AS c");
    }

    #[test]
    fn test_variable_resolves_locally() {
        let parts = run("WHERE id = ${id}", &[("id", "7")]).expect("parse failed");
        assert_eq!(sql_of(&parts), "WHERE id = <id>");
        match &parts[1] {
            SqlQueryPart::Parameter(e) => {
                assert_eq!(e.value, "7");
                assert!(!e.constant);
            }
            other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn test_constant_resolution_after_locals() {
        let mut constants = BTreeMap::new();
        constants.insert("data_dir".to_string(), "'/data'".to_string());
        // A local @set shadows a constant of the same name.
        constants.insert("id".to_string(), "'shadowed'".to_string());
        let vars = vec![("id".to_string(), "7".to_string())];
        let parts = split_parts(
            "SELECT * FROM read_csv(${data_dir}) WHERE id = ${id}",
            "q",
            "f.sql",
            &vars,
            &constants,
        )
        .expect("parse failed");
        let params: Vec<&ParameterEntry> = parts
            .iter()
            .filter_map(|p| match p {
                SqlQueryPart::Parameter(e) => Some(e),
                SqlQueryPart::Literal(_) => None,
            })
            .collect();
        assert_eq!(params.len(), 2);
        assert!(params[0].constant);
        assert_eq!(params[0].value, "'/data'");
        assert!(!params[1].constant);
        assert_eq!(params[1].value, "7");
    }

    #[test]
    fn test_unresolved_variable_is_hard_error() {
        let err = run("WHERE id = ${nope}", &[]).expect_err("should fail");
        match err {
            SquillError::MissingVariable { query, name, file } => {
                assert_eq!(query, "q");
                assert_eq!(name, "nope");
                assert_eq!(file, "f.sql");
            }
            other => panic!("expected MissingVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_constructs() {
        assert!(run("SELECT '", &[]).is_err());
        assert!(run("SELECT /* x", &[]).is_err());
        assert!(run("WHERE id = ${id", &[("id", "1")]).is_err());
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let parts = run("SELECT 1   ", &[]).expect("parse failed");
        assert_eq!(parts, vec![SqlQueryPart::Literal("SELECT 1".into())]);
    }
}
