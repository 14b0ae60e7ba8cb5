//! A raw source over already-parsed elements.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::datagram::{classify, ValueKind};
use crate::source::{RawSource, RawValue};
use crate::symbols::SymbolTable;
use crate::value::Element;
use crate::{Error, Result};

/// Feeds elements to a datagram the way a text reader would: nothing has an
/// existing encoding, so every value is stale. Version markers reset the
/// table in effect and local symbol-table structs install a new one.
pub struct ElementSource {
    elements: VecDeque<Element>,
    table: Arc<SymbolTable>,
    closed: bool,
}

impl ElementSource {
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            table: Arc::new(SymbolTable::new()),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RawSource for ElementSource {
    fn has_next(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::decode("source is closed"));
        }
        Ok(!self.elements.is_empty())
    }

    fn next(&mut self) -> Result<RawValue> {
        if self.closed {
            return Err(Error::decode("source is closed"));
        }
        let element = self
            .elements
            .pop_front()
            .ok_or_else(|| Error::decode("no more values"))?;

        let kind = classify(&element);
        let symbols = self.table.clone();
        match kind {
            ValueKind::VersionMarker => self.table = Arc::new(SymbolTable::new()),
            ValueKind::SymbolTable => {
                let table = SymbolTable::from_element(&element)?;
                if table.is_local() {
                    self.table = Arc::new(table);
                }
            }
            ValueKind::EmbeddedValue | ValueKind::User => {}
        }
        // Markers carry the table they open; everything else the one in effect.
        let symbols = if kind == ValueKind::VersionMarker {
            self.table.clone()
        } else {
            symbols
        };

        Ok(RawValue {
            element: Some(element),
            span: None,
            symbols,
            hidden: kind.is_system(),
            stale: true,
        })
    }

    fn close(&mut self) {
        self.closed = true;
        self.elements.clear();
    }
}
