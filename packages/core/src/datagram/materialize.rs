//! Building a datagram from a raw value source.

use std::cell::OnceCell;
use std::sync::Arc;

use iondg_ll_buffer::Buffer;
use tracing::{debug, trace, warn};

use crate::element_source::ElementSource;
use crate::reader::BinaryReader;
use crate::source::{CloseGuard, RawSource, RawValue};
use crate::symbols::SymbolTable;
use crate::value::Element;
use crate::{Error, Result};

use super::{classify, Datagram, Slot, SymtabId, ValueId, ValueKind};

/// Tables seen so far, keyed by the source's `Arc` identity.
#[derive(Default)]
struct SeenTables {
    seen: Vec<(Arc<SymbolTable>, SymtabId)>,
}

impl Datagram {
    /// Materialize a binary document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_buffer(Buffer::from_slice(bytes))
    }

    /// Materialize a binary document, taking over `buffer` as the arena.
    pub fn from_buffer(buffer: Buffer) -> Result<Self> {
        Self::from_source(&mut BinaryReader::new(buffer))
    }

    /// Build a datagram from already-parsed top-level values, bookkeeping
    /// values included.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Result<Self> {
        Self::from_source(&mut ElementSource::new(elements))
    }

    /// Drain `source` into a new datagram. The source is closed on every
    /// path, including failure.
    pub fn from_source<S: RawSource + ?Sized>(source: &mut S) -> Result<Self> {
        let mut source = CloseGuard::new(source);
        let mut datagram = Self::empty();
        let mut tables = SeenTables::default();
        let mut prev_table: Option<SymtabId> = None;
        let mut stale = 0usize;

        while source.has_next()? {
            let raw = source.next()?;
            let (symtab, fresh) = datagram.intern_table(&mut tables, &raw.symbols);
            let kind = match &raw.element {
                Some(element) => classify(element),
                None => ValueKind::User,
            };

            if datagram.system_contents.is_empty() && kind != ValueKind::VersionMarker {
                let marker = datagram.insert_marker(0);
                prev_table = datagram.slots[marker.0].symtab;
                datagram.dirty = true;
                trace!("synthesized leading version marker");
            }

            // Source markers may not be in the canonical 4-byte form.
            if raw.stale || (raw.hidden && kind == ValueKind::VersionMarker) {
                stale += 1;
                datagram.dirty = true;
            }

            if raw.hidden {
                // Unrecognized system values are kept opaque.
                let kind = match kind {
                    ValueKind::User => ValueKind::EmbeddedValue,
                    kind => kind,
                };
                if kind == ValueKind::EmbeddedValue {
                    datagram.place_table_for(symtab, fresh, prev_table);
                }
                datagram.push_raw(raw, kind, symtab)?;
            } else {
                datagram.place_table_for(symtab, fresh, prev_table);
                let id = datagram.push_raw(raw, ValueKind::User, symtab)?;
                datagram.user_contents.push(id);
            }
            prev_table = Some(symtab);
        }

        match source.take_buffer() {
            Some(buffer) => datagram.buffer = buffer,
            None => datagram.forget_spans()?,
        }

        if stale > 0 {
            debug!(stale, "source reported stale encodings");
        }
        debug!(
            system = datagram.system_contents.len(),
            user = datagram.user_contents.len(),
            tables = datagram.tables.len(),
            dirty = datagram.dirty,
            "materialized datagram"
        );
        Ok(datagram)
    }

    fn intern_table(
        &mut self,
        tables: &mut SeenTables,
        table: &Arc<SymbolTable>,
    ) -> (SymtabId, bool) {
        if let Some((_, symtab)) = tables.seen.iter().find(|(t, _)| Arc::ptr_eq(t, table)) {
            return (*symtab, false);
        }
        let symtab = self.push_table(table.as_ref().clone());
        tables.seen.push((table.clone(), symtab));
        (symtab, true)
    }

    fn push_raw(&mut self, raw: RawValue, kind: ValueKind, symtab: SymtabId) -> Result<ValueId> {
        let element = match raw.element {
            Some(element) => OnceCell::from(element),
            None if raw.hidden => return Err(Error::decode("system value without content")),
            None => OnceCell::new(),
        };
        let id = self.push_slot(Slot {
            element,
            kind,
            symtab: Some(symtab),
            defines: None,
            stale: raw.stale || kind == ValueKind::VersionMarker || raw.span.is_none(),
            span: raw.span,
            contained: true,
        });
        self.system_contents.push(id);
        Ok(id)
    }

    /// Before appending a user or embedded value encoded against `symtab`:
    /// link a preceding table struct to it, or inject the table's struct
    /// (after a marker if needed) when the value switches to a needed table
    /// that is not already right in front of it.
    fn place_table_for(&mut self, symtab: SymtabId, fresh: bool, prev_table: Option<SymtabId>) {
        let last = self.system_contents.len() - 1;
        let prev = self.system_contents[last];
        let prev_slot = &self.slots[prev.0];
        if fresh && prev_slot.kind == ValueKind::SymbolTable && prev_slot.defines.is_none() {
            self.link(prev, symtab);
        }

        if prev_table == Some(symtab)
            || !self.tables[symtab.0].table.is_needed()
            || self.slots[prev.0].defines == Some(symtab)
        {
            return;
        }

        if self.kind_at(last) != ValueKind::VersionMarker {
            self.insert_marker(self.system_contents.len());
        }
        let marker_table = self.slots[self.system_contents[self.system_contents.len() - 1].0].symtab;
        let mut slot = Slot::new(self.tables[symtab.0].table.to_element(), ValueKind::SymbolTable);
        slot.symtab = marker_table;
        slot.contained = true;
        let id = self.push_slot(slot);
        self.system_contents.push(id);
        self.link(id, symtab);
        self.dirty = true;
        trace!(symtab = %symtab, "injected symbol table");
    }

    /// Spans are meaningless without the source's buffer.
    fn forget_spans(&mut self) -> Result<()> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.span.take().is_some() {
                if slot.element.get().is_none() {
                    return Err(Error::decode(format!(
                        "value #{} has neither content nor a buffer",
                        index
                    )));
                }
                warn!(value = index, "source gave a span but no buffer");
                slot.stale = true;
                self.dirty = true;
            }
        }
        Ok(())
    }
}
