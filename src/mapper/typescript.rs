//! TypeScript backend.

use super::LanguageBackend;

pub struct TypeScriptBackend;

impl LanguageBackend for TypeScriptBackend {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn primitive(&self, name: &str) -> Option<&'static str> {
        match name {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT4" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" | "FLOAT" | "REAL" | "FLOAT4" | "DOUBLE" | "FLOAT8" | "DECIMAL"
            | "NUMERIC" => Some("number"),
            "BIGINT" | "INT8" | "HUGEINT" | "UBIGINT" => Some("bigint"),
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" | "UUID" | "TIME" | "INTERVAL" => {
                Some("string")
            }
            "BOOLEAN" | "BOOL" => Some("boolean"),
            "DATE" | "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => Some("Date"),
            "BLOB" | "BYTEA" => Some("Uint8Array"),
            "JSON" | "JSONB" => Some("unknown"),
            _ => None,
        }
    }

    fn untyped(&self) -> &'static str {
        "unknown"
    }

    fn nullable_type(&self, base: &str) -> String {
        format!("{base} | null")
    }

    fn list_type(&self, element: &str) -> String {
        // Union element types need parentheses to bind before `[]`.
        if element.contains(' ') {
            format!("({element})[]")
        } else {
            format!("{element}[]")
        }
    }

    fn enum_type(&self, values: &[String]) -> String {
        if values.is_empty() {
            return "string".to_string();
        }
        values
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn struct_decl(&self, name: &str, fields: &[(String, String)]) -> String {
        let mut out = format!("export interface {name} {{\n");
        for (field, ty) in fields {
            out.push_str(&format!("  {field}: {ty};\n"));
        }
        out.push('}');
        out
    }
}
