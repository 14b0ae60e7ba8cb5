use crate::symbols::{ION_1_0, ION_EMBEDDED_VALUE, ION_SYMBOL_TABLE};
use crate::value::{Element, Value};

/// What role a top-level value plays in a datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// The reserved `$ion_1_0` token. Opens a document and resets the
    /// symbol table context.
    VersionMarker,
    /// A struct annotated `$ion_symbol_table`.
    SymbolTable,
    /// A sexp annotated `$ion_embedded_value`.
    EmbeddedValue,
    User,
}

impl ValueKind {
    /// Bookkeeping values appear only in the system view.
    pub fn is_system(&self) -> bool {
        !matches!(self, ValueKind::User)
    }
}

/// Classify a top-level value by its content and reserved annotations.
pub fn classify(element: &Element) -> ValueKind {
    match &element.value {
        Value::Symbol(text) if text == ION_1_0 && element.annotations.is_empty() => {
            ValueKind::VersionMarker
        }
        Value::Struct(_) if element.has_annotation(ION_SYMBOL_TABLE) => ValueKind::SymbolTable,
        Value::Sexp(_) if element.has_annotation(ION_EMBEDDED_VALUE) => ValueKind::EmbeddedValue,
        _ => ValueKind::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IonType;

    #[test]
    fn bookkeeping_values() {
        assert_eq!(classify(&Element::symbol(ION_1_0)), ValueKind::VersionMarker);
        assert_eq!(
            classify(&Element::new(Value::Struct(Vec::new())).with_annotation(ION_SYMBOL_TABLE)),
            ValueKind::SymbolTable
        );
        assert_eq!(
            classify(
                &Element::new(Value::Struct(Vec::new()))
                    .with_annotation("other")
                    .with_annotation(ION_SYMBOL_TABLE)
            ),
            ValueKind::SymbolTable
        );
        assert_eq!(
            classify(&Element::sexp([Element::from(1)]).with_annotation(ION_EMBEDDED_VALUE)),
            ValueKind::EmbeddedValue
        );
    }

    #[test]
    fn look_alikes_are_user_values() {
        assert_eq!(classify(&Element::string(ION_1_0)), ValueKind::User);
        assert_eq!(
            classify(&Element::symbol(ION_1_0).with_annotation("a")),
            ValueKind::User
        );
        assert_eq!(
            classify(&Element::typed_null(IonType::Symbol)),
            ValueKind::User
        );
        assert_eq!(
            classify(&Element::list([]).with_annotation(ION_SYMBOL_TABLE)),
            ValueKind::User
        );
        assert_eq!(
            classify(&Element::new(Value::Struct(Vec::new())).with_annotation(ION_EMBEDDED_VALUE)),
            ValueKind::User
        );
        assert!(!ValueKind::User.is_system());
        assert!(ValueKind::VersionMarker.is_system());
    }
}
