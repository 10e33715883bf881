//! Grammar for annotation headers, `@set` lines, and inline type overrides.
//!
//! Recognized header forms:
//! ```text
//! -- MIGRATE <int>
//! -- TESTDATA [name]
//! -- QUERY <name> [:one] [:pluck]
//! -- EXEC <name>
//! -- TABLE <name> :appender
//! ```
//! plus the block-comment form carrying a `result:` override section.

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{eof, map_res, opt};
use nom::multi::many0;
use nom::sequence::preceded;

use crate::model::{QueryKind, TypeOverride};

const KEYWORDS: [&str; 5] = ["MIGRATE", "TESTDATA", "QUERY", "EXEC", "TABLE"];

/// A parsed block header, before kind-specific validation.
#[derive(Debug, Clone)]
pub(crate) struct RawHeader {
    pub kind: QueryKind,
    pub name: Option<String>,
    pub order: Option<i64>,
    pub modifiers: Vec<String>,
}

/// Returns the annotation keyword if `text` starts one.
///
/// Used to tell a header apart from an ordinary comment: once a line opens
/// with a keyword, any malformed remainder is a fatal parse error instead of
/// silently becoming body text.
pub(crate) fn header_keyword(text: &str) -> Option<&'static str> {
    KEYWORDS.iter().copied().find(|kw| {
        text.strip_prefix(kw)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    })
}

/// Parse a full header (the text after the comment marker).
pub(crate) fn parse_header(text: &str) -> Result<RawHeader, String> {
    match header(text) {
        Ok((_, raw)) => Ok(raw),
        Err(_) => Err(format!("malformed annotation header: '{}'", text.trim())),
    }
}

/// Parse an `@set <name> = <literal>` line.
pub(crate) fn parse_set_line(line: &str) -> Result<(String, String), String> {
    match set_line(line) {
        Ok((_, (name, value))) if !value.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!(
            "malformed @set line: '{line}' (expected `@set <name> = <literal>`)"
        )),
    }
}

/// Parse one `result:` entry: `<col>: "<TYPE>[ [NOT] NULL]"`.
pub(crate) fn parse_override_entry(line: &str) -> Result<(String, TypeOverride), String> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| format!("malformed type override: '{line}' (expected `<column>: \"<TYPE>\"`)"))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format!("invalid column name in type override: '{line}'"));
    }
    let mut value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value = &value[1..value.len() - 1];
    }
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let over = match tokens.as_slice() {
        [ty] => TypeOverride {
            ty: (*ty).to_string(),
            nullable: true,
        },
        [ty, "NULL"] => TypeOverride {
            ty: (*ty).to_string(),
            nullable: true,
        },
        [ty, "NOT", "NULL"] => TypeOverride {
            ty: (*ty).to_string(),
            nullable: false,
        },
        _ => {
            return Err(format!(
                "invalid type override '{line}': expected `TYPE`, `TYPE NULL`, or `TYPE NOT NULL`"
            ));
        }
    };
    Ok((name.to_string(), over))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn modifier(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), identifier)(input)
}

fn migrate(input: &str) -> IResult<&str, RawHeader> {
    let (input, _) = tag("MIGRATE")(input)?;
    let (input, _) = space1(input)?;
    let (input, order) = map_res(digit1, str::parse::<i64>)(input)?;
    Ok((
        input,
        RawHeader {
            kind: QueryKind::Migrate,
            name: None,
            order: Some(order),
            modifiers: Vec::new(),
        },
    ))
}

fn testdata(input: &str) -> IResult<&str, RawHeader> {
    let (input, _) = tag("TESTDATA")(input)?;
    let (input, name) = opt(preceded(space1, identifier))(input)?;
    Ok((
        input,
        RawHeader {
            kind: QueryKind::Testdata,
            name: name.map(str::to_string),
            order: None,
            modifiers: Vec::new(),
        },
    ))
}

fn named_block(
    keyword: &'static str,
    kind: QueryKind,
) -> impl Fn(&str) -> IResult<&str, RawHeader> {
    move |input| {
        let (input, _) = tag(keyword)(input)?;
        let (input, _) = space1(input)?;
        let (input, name) = identifier(input)?;
        let (input, modifiers) = many0(preceded(space1, modifier))(input)?;
        Ok((
            input,
            RawHeader {
                kind,
                name: Some(name.to_string()),
                order: None,
                modifiers: modifiers.iter().map(|m| (*m).to_string()).collect(),
            },
        ))
    }
}

fn header(input: &str) -> IResult<&str, RawHeader> {
    let (input, raw) = alt((
        migrate,
        testdata,
        named_block("QUERY", QueryKind::Query),
        named_block("EXEC", QueryKind::Exec),
        named_block("TABLE", QueryKind::Table),
    ))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, raw))
}

fn set_line(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("@set")(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = space0(input)?;
    Ok(("", (name, input.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_header() {
        let raw = parse_header("MIGRATE 3").expect("parse failed");
        assert_eq!(raw.kind, QueryKind::Migrate);
        assert_eq!(raw.order, Some(3));
    }

    #[test]
    fn test_query_header_with_modifiers() {
        let raw = parse_header("QUERY get_user :one :pluck").expect("parse failed");
        assert_eq!(raw.kind, QueryKind::Query);
        assert_eq!(raw.name.as_deref(), Some("get_user"));
        assert_eq!(raw.modifiers, vec!["one", "pluck"]);
    }

    #[test]
    fn test_testdata_optional_name() {
        let named = parse_header("TESTDATA seed_users").expect("parse failed");
        assert_eq!(named.name.as_deref(), Some("seed_users"));
        let unnamed = parse_header("TESTDATA").expect("parse failed");
        assert_eq!(unnamed.name, None);
    }

    #[test]
    fn test_table_header() {
        let raw = parse_header("TABLE users :appender").expect("parse failed");
        assert_eq!(raw.kind, QueryKind::Table);
        assert_eq!(raw.modifiers, vec!["appender"]);
    }

    #[test]
    fn test_malformed_header_is_error() {
        assert!(parse_header("QUERY").is_err());
        assert!(parse_header("MIGRATE abc").is_err());
        assert!(parse_header("QUERY name junk").is_err());
    }

    #[test]
    fn test_header_keyword_requires_word_boundary() {
        assert_eq!(header_keyword("QUERY get"), Some("QUERY"));
        assert_eq!(header_keyword("QUERYx"), None);
        assert_eq!(header_keyword("add an index"), None);
    }

    #[test]
    fn test_set_line() {
        let (name, value) = parse_set_line("@set id = 42").expect("parse failed");
        assert_eq!(name, "id");
        assert_eq!(value, "42");
        let (_, value) = parse_set_line("@set name = 'Alice'").expect("parse failed");
        assert_eq!(value, "'Alice'");
        assert!(parse_set_line("@set id =").is_err());
        assert!(parse_set_line("@set = 1").is_err());
    }

    #[test]
    fn test_override_entry_forms() {
        let (name, over) = parse_override_entry("total: \"DECIMAL\"").expect("parse failed");
        assert_eq!(name, "total");
        assert_eq!(over.ty, "DECIMAL");
        assert!(over.nullable);

        let (_, over) = parse_override_entry("total: \"DECIMAL NULL\"").expect("parse failed");
        assert!(over.nullable);

        let (_, over) = parse_override_entry("total: \"DECIMAL NOT NULL\"").expect("parse failed");
        assert!(!over.nullable);
    }

    #[test]
    fn test_override_entry_bad_arity() {
        assert!(parse_override_entry("total: \"DECIMAL NOT NULL EXTRA\"").is_err());
        assert!(parse_override_entry("total: \"\"").is_err());
        assert!(parse_override_entry("no_colon").is_err());
    }
}
