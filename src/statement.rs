//! Statement builder: derives the three placeholder renderings of a query
//! body from one parsed part sequence.

use crate::model::{ParameterEntry, SqlQueryPart, StatementRendering};

/// Placeholder convention for one rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` per occurrence.
    Anonymous,
    /// `$N`, 1-based, one index per distinct name in first-occurrence order.
    Positional,
    /// `$name` verbatim.
    Named,
}

/// Render all three conventions from one part sequence.
pub fn render_all(
    parts: &[SqlQueryPart],
) -> (StatementRendering, StatementRendering, StatementRendering) {
    (
        render(parts, PlaceholderStyle::Anonymous),
        render(parts, PlaceholderStyle::Positional),
        render(parts, PlaceholderStyle::Named),
    )
}

/// Render one convention. The source parts are never mutated; constants are
/// inlined as literal text in every convention.
pub fn render(parts: &[SqlQueryPart], style: PlaceholderStyle) -> StatementRendering {
    let mut sql = String::new();
    let mut parameters: Vec<ParameterEntry> = Vec::new();
    let mut order: Vec<String> = Vec::new();

    for part in parts {
        match part {
            SqlQueryPart::Literal(text) => sql.push_str(text),
            SqlQueryPart::Parameter(p) if p.constant => sql.push_str(&p.value),
            SqlQueryPart::Parameter(p) => match style {
                PlaceholderStyle::Anonymous => {
                    // A bare `?` glued to an identifier changes the token; a
                    // space is only safe to skip after whitespace or a
                    // comparison operator.
                    let needs_space = sql
                        .chars()
                        .last()
                        .is_some_and(|c| !c.is_whitespace() && !matches!(c, '=' | '<' | '>'));
                    if needs_space {
                        sql.push(' ');
                    }
                    sql.push('?');
                    parameters.push(p.clone());
                }
                PlaceholderStyle::Positional => {
                    let index = match order.iter().position(|n| n == &p.name) {
                        Some(i) => i + 1,
                        None => {
                            order.push(p.name.clone());
                            parameters.push(p.clone());
                            order.len()
                        }
                    };
                    sql.push('$');
                    sql.push_str(&index.to_string());
                }
                PlaceholderStyle::Named => {
                    if !parameters.iter().any(|e| e.name == p.name) {
                        parameters.push(p.clone());
                    }
                    sql.push('$');
                    sql.push_str(&p.name);
                }
            },
        }
    }

    StatementRendering {
        sql: sql.trim().to_string(),
        parts: parts.to_vec(),
        parameters,
    }
}
