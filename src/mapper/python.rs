//! Python backend (dataclass declarations, PEP 604 unions).

use super::LanguageBackend;

pub struct PythonBackend;

impl LanguageBackend for PythonBackend {
    fn name(&self) -> &'static str {
        "python"
    }

    fn primitive(&self, name: &str) -> Option<&'static str> {
        match name {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT2" | "INT4" | "BIGINT" | "INT8"
            | "HUGEINT" | "UTINYINT" | "USMALLINT" | "UINTEGER" | "UBIGINT" => Some("int"),
            "FLOAT" | "REAL" | "FLOAT4" | "DOUBLE" | "FLOAT8" | "DECIMAL" | "NUMERIC" => {
                Some("float")
            }
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" | "UUID" | "INTERVAL" => Some("str"),
            "BOOLEAN" | "BOOL" => Some("bool"),
            "DATE" => Some("datetime.date"),
            "TIME" => Some("datetime.time"),
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => Some("datetime.datetime"),
            "BLOB" | "BYTEA" => Some("bytes"),
            "JSON" | "JSONB" => Some("object"),
            _ => None,
        }
    }

    fn untyped(&self) -> &'static str {
        "object"
    }

    fn nullable_type(&self, base: &str) -> String {
        format!("{base} | None")
    }

    fn list_type(&self, element: &str) -> String {
        format!("list[{element}]")
    }

    fn enum_type(&self, values: &[String]) -> String {
        if values.is_empty() {
            return "str".to_string();
        }
        let rendered: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
        format!("Literal[{}]", rendered.join(", "))
    }

    fn struct_decl(&self, name: &str, fields: &[(String, String)]) -> String {
        let mut out = format!("@dataclass\nclass {name}:\n");
        if fields.is_empty() {
            out.push_str("    pass");
            return out;
        }
        for (field, ty) in fields {
            out.push_str(&format!("    {field}: {ty}\n"));
        }
        out.truncate(out.trim_end().len());
        out
    }
}
