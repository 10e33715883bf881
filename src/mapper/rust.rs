//! Rust backend.

use super::LanguageBackend;

pub struct RustBackend;

impl LanguageBackend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn primitive(&self, name: &str) -> Option<&'static str> {
        match name {
            "TINYINT" => Some("i8"),
            "SMALLINT" | "INT2" => Some("i16"),
            "INTEGER" | "INT" | "INT4" => Some("i32"),
            "BIGINT" | "INT8" => Some("i64"),
            "HUGEINT" => Some("i128"),
            "UTINYINT" => Some("u8"),
            "USMALLINT" => Some("u16"),
            "UINTEGER" => Some("u32"),
            "UBIGINT" => Some("u64"),
            "FLOAT" | "REAL" | "FLOAT4" => Some("f32"),
            "DOUBLE" | "FLOAT8" | "DECIMAL" | "NUMERIC" => Some("f64"),
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" => Some("String"),
            "BOOLEAN" | "BOOL" => Some("bool"),
            "UUID" => Some("uuid::Uuid"),
            "DATE" => Some("chrono::NaiveDate"),
            "TIME" => Some("chrono::NaiveTime"),
            "TIMESTAMP" | "DATETIME" => Some("chrono::NaiveDateTime"),
            "TIMESTAMPTZ" => Some("chrono::DateTime<chrono::Utc>"),
            "BLOB" | "BYTEA" => Some("Vec<u8>"),
            "JSON" | "JSONB" => Some("serde_json::Value"),
            _ => None,
        }
    }

    fn untyped(&self) -> &'static str {
        "serde_json::Value"
    }

    fn nullable_type(&self, base: &str) -> String {
        format!("Option<{base}>")
    }

    fn list_type(&self, element: &str) -> String {
        format!("Vec<{element}>")
    }

    fn enum_type(&self, _values: &[String]) -> String {
        "String".to_string()
    }

    fn struct_decl(&self, name: &str, fields: &[(String, String)]) -> String {
        let mut out = format!("#[derive(Debug, Clone)]\npub struct {name} {{\n");
        for (field, ty) in fields {
            out.push_str(&format!("    pub {field}: {ty},\n"));
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_table() {
        let b = RustBackend;
        assert_eq!(b.primitive("INTEGER"), Some("i32"));
        assert_eq!(b.primitive("BIGINT"), Some("i64"));
        assert_eq!(b.primitive("TIMESTAMPTZ"), Some("chrono::DateTime<chrono::Utc>"));
        assert_eq!(b.primitive("GEOMETRY"), None);
    }

    #[test]
    fn test_struct_decl() {
        let b = RustBackend;
        let decl = b.struct_decl(
            "User",
            &[
                ("id".into(), "i32".into()),
                ("name".into(), "Option<String>".into()),
            ],
        );
        assert_eq!(
            decl,
            "#[derive(Debug, Clone)]\npub struct User {\n    pub id: i32,\n    pub name: Option<String>,\n}"
        );
    }
}
