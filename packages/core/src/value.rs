//! The value model: [`Element`] = annotations + [`Value`].
//!
//! This is a deliberately small slice of the data model - enough to carry user
//! data and the bookkeeping structs (symbol tables) through a datagram.

use std::fmt;

use base64::Engine;

/// The type of a value, independent of its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    Sexp,
    Struct,
}

impl IonType {
    /// Name used in typed nulls (`null.int`, `null.struct`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            IonType::Null => "null",
            IonType::Bool => "bool",
            IonType::Int => "int",
            IonType::Float => "float",
            IonType::Symbol => "symbol",
            IonType::String => "string",
            IonType::Clob => "clob",
            IonType::Blob => "blob",
            IonType::List => "list",
            IonType::Sexp => "sexp",
            IonType::Struct => "struct",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, IonType::List | IonType::Sexp | IonType::Struct)
    }
}

/// The content of a value.
///
/// # Design Notes
///
/// - Struct fields keep their order and may repeat, so they are a `Vec` of
///   pairs rather than a map
/// - Symbols are carried by text; text of the form `$<digits>` stands for a
///   symbol id whose text is unknown
/// - Integers are `i64`; wider integers are rejected by the decoder
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A typed null. `Null(IonType::Null)` is the untyped `null`.
    Null(IonType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(String),
    String(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    List(Vec<Element>),
    Sexp(Vec<Element>),
    Struct(Vec<(String, Element)>),
}

impl Value {
    pub fn ion_type(&self) -> IonType {
        match self {
            Value::Null(t) => *t,
            Value::Bool(_) => IonType::Bool,
            Value::Int(_) => IonType::Int,
            Value::Float(_) => IonType::Float,
            Value::Symbol(_) => IonType::Symbol,
            Value::String(_) => IonType::String,
            Value::Clob(_) => IonType::Clob,
            Value::Blob(_) => IonType::Blob,
            Value::List(_) => IonType::List,
            Value::Sexp(_) => IonType::Sexp,
            Value::Struct(_) => IonType::Struct,
        }
    }
}

/// A value together with its annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub annotations: Vec<String>,
    pub value: Value,
}

impl Element {
    pub fn new(value: Value) -> Self {
        Self {
            annotations: Vec::new(),
            value,
        }
    }

    /// The untyped `null`.
    pub fn null() -> Self {
        Self::new(Value::Null(IonType::Null))
    }

    pub fn typed_null(ion_type: IonType) -> Self {
        Self::new(Value::Null(ion_type))
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Self::new(Value::Symbol(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(Value::String(text.into()))
    }

    pub fn list(items: impl IntoIterator<Item = Element>) -> Self {
        Self::new(Value::List(items.into_iter().collect()))
    }

    pub fn sexp(items: impl IntoIterator<Item = Element>) -> Self {
        Self::new(Value::Sexp(items.into_iter().collect()))
    }

    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, Element)>) -> Self {
        Self::new(Value::Struct(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Add an annotation, returning the annotated element.
    pub fn with_annotation(mut self, text: impl Into<String>) -> Self {
        self.annotations.push(text.into());
        self
    }

    pub fn ion_type(&self) -> IonType {
        self.value.ion_type()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null(_))
    }

    pub fn has_annotation(&self, text: &str) -> bool {
        self.annotations.iter().any(|a| a == text)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.value {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Members of a list or sexp.
    pub fn as_sequence(&self) -> Option<&[Element]> {
        match &self.value {
            Value::List(items) | Value::Sexp(items) => Some(items),
            _ => None,
        }
    }

    /// First field with the given name, if this is a struct.
    pub fn field(&self, name: &str) -> Option<&Element> {
        match &self.value {
            Value::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Every symbol text this element needs in a symbol table: annotations,
    /// field names and symbol values, depth first.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.annotations.iter().map(String::as_str));
        match &self.value {
            Value::Symbol(s) => out.push(s),
            Value::List(items) | Value::Sexp(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Value::Struct(fields) => {
                for (name, v) in fields {
                    out.push(name);
                    v.collect_symbols(out);
                }
            }
            _ => {}
        }
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Element::new(value)
    }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self {
        Element::new(Value::Bool(v))
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::new(Value::Int(v))
    }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self {
        Element::new(Value::Int(v as i64))
    }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self {
        Element::new(Value::Float(v))
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::string(v)
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::string(v)
    }
}

impl From<Vec<u8>> for Element {
    fn from(v: Vec<u8>) -> Self {
        Element::new(Value::Blob(v))
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn write_symbol(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if is_identifier(text) && !matches!(text, "null" | "true" | "false" | "nan") {
        write!(f, "{}", text)
    } else {
        write!(f, "'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for annotation in &self.annotations {
            write_symbol(f, annotation)?;
            write!(f, "::")?;
        }
        match &self.value {
            Value::Null(IonType::Null) => write!(f, "null"),
            Value::Null(t) => write!(f, "null.{}", t.as_str()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => write!(f, "nan"),
            Value::Float(x) if x.is_infinite() => {
                write!(f, "{}inf", if *x > 0.0 { "+" } else { "-" })
            }
            Value::Float(x) => write!(f, "{:e}", x),
            Value::Symbol(s) => write_symbol(f, s),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Clob(b) => write!(f, "{{{{\"{}\"}}}}", b.escape_ascii()),
            Value::Blob(b) => write!(
                f,
                "{{{{{}}}}}",
                base64::engine::general_purpose::STANDARD.encode(b)
            ),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Sexp(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_symbol(f, name)?;
                    write!(f, ": {}", v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_walks_everything() {
        let element = Element::structure([
            ("name", Element::symbol("alice").with_annotation("person")),
            ("tags", Element::list([Element::symbol("a"), Element::from(1)])),
        ])
        .with_annotation("record");

        assert_eq!(
            element.symbols(),
            vec!["record", "name", "person", "alice", "tags", "a"]
        );
    }

    #[test]
    fn strings_are_not_symbols() {
        let element = Element::list([Element::string("not a symbol")]);
        assert!(element.symbols().is_empty());
    }

    #[test]
    fn field_lookup_returns_first_match() {
        let element = Element::structure([
            ("a", Element::from(1)),
            ("a", Element::from(2)),
        ]);
        assert_eq!(element.field("a").and_then(Element::as_int), Some(1));
        assert!(element.field("b").is_none());
        assert!(Element::from(3).field("a").is_none());
    }

    #[test]
    fn typed_nulls_keep_their_type() {
        let element = Element::typed_null(IonType::Struct);
        assert!(element.is_null());
        assert_eq!(element.ion_type(), IonType::Struct);
        assert_eq!(element.to_string(), "null.struct");
        assert_eq!(Element::null().to_string(), "null");
    }

    #[test]
    fn display_renders_text_form() {
        let element = Element::structure([
            ("n", Element::from(-3)),
            ("s", Element::from("hi")),
            ("q", Element::symbol("two words")),
            ("x", Element::sexp([Element::symbol("+"), Element::from(1.5)])),
        ])
        .with_annotation("ann");

        assert_eq!(
            element.to_string(),
            "ann::{n: -3, s: \"hi\", q: 'two words', x: ('+' 1.5e0)}"
        );
    }

    #[test]
    fn display_blob_is_base64() {
        let element = Element::from(b"hi!".to_vec());
        assert_eq!(element.to_string(), "{{aGkh}}");
    }

    #[test]
    fn keywords_are_quoted_as_symbols() {
        assert_eq!(Element::symbol("null").to_string(), "'null'");
        assert_eq!(Element::symbol("$ion_1_0").to_string(), "$ion_1_0");
    }

    #[test]
    fn container_types() {
        assert!(IonType::List.is_container());
        assert!(IonType::Struct.is_container());
        assert!(!IonType::Symbol.is_container());
    }
}
