//! # Constraint Model
//!
//! Pure declarations of what a document may contain. A [`RecordDef`] is a
//! named object with an explicit allow-list of [`FieldDef`]s; each field has
//! a [`Shape`] and is either required or optional. Shapes nest through
//! `'static` references so the whole model lives in static data and can be
//! shared across threads without synchronisation.
//!
//! Leaf shapes are strict: [`Shape::String`] rejects numbers,
//! [`Shape::Integer`] rejects `1.0` and booleans, [`Shape::Number`] rejects
//! booleans and numeric strings. Strict leaves replace the permissive,
//! coercing leaves of earlier schema revisions; documents those revisions
//! accepted by coercion (`"Name": 1`, `"Derivatives": 1.0`) are now
//! rejected.

use serde::Serialize;
use serde_json::Value;

/// The accepted shape of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// A JSON string. Never coerced from a number.
    String,
    /// A JSON integer. `1.0` is not an integer.
    Integer,
    /// Any JSON number, integer or float.
    Number,
    Boolean,
    Null,
    /// Exactly this integer, e.g. the intercept `1`.
    IntLiteral(i64),
    /// One of a closed set of string literals, compared bit-for-bit.
    Enum {
        name: &'static str,
        values: &'static [&'static str],
    },
    /// Anything at all. The sub-tree belongs to an external consumer.
    Any,
    /// A named record from the registry.
    Ref(&'static str),
    /// A homogeneous array.
    Array(&'static Shape),
    /// A homogeneous array with at least one element.
    NonEmptyArray(&'static Shape),
    /// An object with arbitrary string keys and homogeneous values.
    Map(&'static Shape),
    /// The first variant that matches, tried in order.
    Union(&'static [Shape]),
}

impl Shape {
    /// Short structural description used in violation messages,
    /// e.g. `one of: Run, Session, Subject, Dataset`.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Null => "null".to_string(),
            Self::IntLiteral(n) => format!("literal {n}"),
            Self::Enum { values, .. } => format!("one of: {}", values.join(", ")),
            Self::Any => "any value".to_string(),
            Self::Ref(name) => format!("{name} object"),
            Self::Array(item) => format!("array of {}", item.describe()),
            Self::NonEmptyArray(item) => format!("non-empty array of {}", item.describe()),
            Self::Map(value) => format!("object of {}", value.describe()),
            Self::Union(variants) => variants
                .iter()
                .map(Shape::describe)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

/// The JSON kind of an actual value, for "expected X, got Y" messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Integer,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a record's allow-list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
    /// Human-readable documentation, exported as `description`.
    pub doc: &'static str,
}

impl FieldDef {
    pub const fn required(name: &'static str, shape: Shape, doc: &'static str) -> Self {
        Self {
            name,
            shape,
            required: true,
            doc,
        }
    }

    pub const fn optional(name: &'static str, shape: Shape, doc: &'static str) -> Self {
        Self {
            name,
            shape,
            required: false,
            doc,
        }
    }
}

/// A named object shape with a closed field set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordDef {
    pub name: &'static str,
    pub doc: &'static str,
    pub fields: &'static [FieldDef],
}

impl RecordDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Every record name this record refers to, directly or through nested
    /// arrays, maps and unions.
    pub fn references(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        for field in self.fields {
            collect_refs(&field.shape, &mut out);
        }
        out
    }
}

fn collect_refs(shape: &Shape, out: &mut Vec<&'static str>) {
    match shape {
        Shape::Ref(name) => {
            if !out.contains(name) {
                out.push(*name);
            }
        }
        Shape::Array(inner) | Shape::NonEmptyArray(inner) | Shape::Map(inner) => {
            collect_refs(inner, out)
        }
        Shape::Union(variants) => {
            for v in *variants {
                collect_refs(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEVELS: Shape = Shape::Enum {
        name: "NodeLevel",
        values: &["Run", "Session", "Subject", "Dataset"],
    };

    #[test]
    fn test_describe_enum() {
        assert_eq!(LEVELS.describe(), "one of: Run, Session, Subject, Dataset");
    }

    #[test]
    fn test_describe_nested() {
        let shape = Shape::Array(&Shape::Union(&[Shape::String, Shape::IntLiteral(1)]));
        assert_eq!(shape.describe(), "array of string | literal 1");
        assert_eq!(Shape::Map(&Shape::Any).describe(), "object of any value");
        assert_eq!(Shape::Ref("Node").describe(), "Node object");
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(ValueKind::of(&json!(1)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(1.0)), ValueKind::Float);
        assert_eq!(ValueKind::of(&json!(-3)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Object);
    }

    #[test]
    fn test_references_are_deduplicated() {
        static FIELDS: [FieldDef; 3] = [
            FieldDef::required("A", Shape::Ref("Node"), ""),
            FieldDef::optional("B", Shape::Array(&Shape::Ref("Node")), ""),
            FieldDef::optional("C", Shape::Map(&Shape::Ref("Edge")), ""),
        ];
        let rec = RecordDef {
            name: "T",
            doc: "",
            fields: &FIELDS,
        };
        assert_eq!(rec.references(), vec!["Node", "Edge"]);
        assert_eq!(rec.required_fields().count(), 1);
        assert!(rec.field("B").is_some());
        assert!(rec.field("b").is_none());
    }
}
