//! Bringing the buffer up to date with the in-memory state.

use std::cell::OnceCell;

use iondg_ll_buffer::Writer;
use tracing::{debug, trace};

use crate::binary::{encode, BINARY_VERSION_MARKER};
use crate::source::Span;
use crate::symbols::SymbolTable;
use crate::{Error, Result};

use super::{Datagram, Slot, SymtabId, TableEntry, ValueId, ValueKind};

impl Datagram {
    /// Rewrite the buffer to match the current values. A no-op unless the
    /// datagram is dirty.
    ///
    /// Clean values keep their bytes and are only moved; stale values are
    /// re-encoded in place; new values are inserted. On error the buffer is
    /// left in an indeterminate state.
    pub fn synchronize(&mut self) -> Result<()> {
        self.buffer.reader().sync();

        if self.system_contents.is_empty() {
            self.insert_marker(0);
            self.dirty = true;
        }
        if !self.dirty {
            return Ok(());
        }

        if self.kind_at(0) != ValueKind::VersionMarker {
            self.insert_marker(0);
        }
        self.place_tables()?;
        self.render_tables();
        let delta = self.write_pass()?;
        self.dirty = false;

        debug!(
            bytes = self.buffer.len(),
            values = self.system_contents.len(),
            delta,
            "synchronized datagram"
        );
        Ok(())
    }

    /// Bring every table up to date with the values that changed, and put a
    /// needed table's struct in front of the first value encoded against it.
    /// Embedded values count; markers and a table's own struct do not.
    fn place_tables(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.system_contents.len() {
            let id = self.system_contents[index];
            self.refresh(id)?;

            let slot = &self.slots[id.0];
            if slot.kind != ValueKind::VersionMarker {
                if let Some(symtab) = slot.symtab.filter(|t| slot.defines != Some(*t)) {
                    let entry = &self.tables[symtab.0];
                    if entry.table.is_needed() && entry.realized.is_none() {
                        index = self.inject_table(index, symtab);
                    }
                }
            }
            index += 1;
        }
        Ok(())
    }

    /// Insert the struct for `symtab` before the value at `index`, preceded
    /// by a marker unless one is already right there. Returns the value's new
    /// index.
    fn inject_table(&mut self, index: usize, symtab: SymtabId) -> usize {
        let mut at = index;
        if at == 0 || self.kind_at(at - 1) != ValueKind::VersionMarker {
            self.insert_marker(at);
            at += 1;
        }
        let marker = self.system_contents[at - 1];

        let mut slot = Slot::new(
            self.tables[symtab.0].table.to_element(),
            ValueKind::SymbolTable,
        );
        slot.symtab = self.slots[marker.0].symtab;
        slot.contained = true;
        let id = self.push_slot(slot);
        self.system_contents.insert(at, id);
        self.link(id, symtab);
        trace!(symtab = %symtab, index = at, "placed symbol table");
        at + 1
    }

    /// Decode a changed value and add its symbols to its table.
    fn refresh(&mut self, id: ValueId) -> Result<()> {
        let slot = &self.slots[id.0];
        if (!slot.stale && slot.span.is_some()) || slot.kind == ValueKind::VersionMarker {
            return Ok(());
        }
        self.load(id)?;

        let slot = &self.slots[id.0];
        if let (Some(element), Some(symtab)) = (slot.element.get(), slot.symtab) {
            self.tables[symtab.0].table.intern_all(element)?;
        }
        Ok(())
    }

    /// Re-render the struct of every placed table that gained symbols.
    fn render_tables(&mut self) {
        for entry in &mut self.tables {
            let Some(id) = entry.realized else { continue };
            if entry.table.revision() == entry.rendered {
                continue;
            }
            let slot = &mut self.slots[id.0];
            slot.element = OnceCell::from(entry.table.to_element());
            slot.stale = true;
            entry.rendered = entry.table.revision();
            trace!(value = %id, max_id = entry.table.max_id(), "re-rendered symbol table");
        }
    }

    /// Write every physical value in order, threading the offset delta
    /// between each value's old and current location. Returns the final
    /// delta.
    fn write_pass(&mut self) -> Result<isize> {
        let Datagram {
            slots,
            tables,
            system_contents,
            buffer,
            ..
        } = self;
        let mut writer = buffer.writer_at(0).map_err(Error::from_write)?;

        let delta = system_contents.iter().try_fold(0isize, |delta, id| {
            write_slot(&mut writer, &mut slots[id.0], &tables[..], delta)
        })?;

        let end = system_contents
            .last()
            .and_then(|id| slots[id.0].span)
            .map_or(0, |span| span.end());
        if writer.position() != end {
            return Err(Error::encode(format!(
                "write cursor at {} but last value ends at {}",
                writer.position(),
                end
            )));
        }
        writer.truncate();
        Ok(delta)
    }
}

/// Write one value at the cursor. A value with an old encoding finds it at
/// `span.offset + delta`; anything between the cursor and there belongs to
/// removed values and is cut out.
fn write_slot(
    writer: &mut Writer<'_>,
    slot: &mut Slot,
    tables: &[TableEntry],
    mut delta: isize,
) -> Result<isize> {
    let position = writer.position();

    let old_len = match slot.span {
        Some(span) => {
            let old = usize::try_from(span.offset as isize + delta)
                .ok()
                .filter(|old| *old >= position)
                .ok_or_else(|| Error::encode("value encodings out of order"))?;
            if old > position {
                writer.remove(old - position).map_err(Error::from_write)?;
                delta -= (old - position) as isize;
            }
            Some(span.len)
        }
        None => None,
    };

    let len = match old_len {
        Some(len) if !slot.stale => {
            writer.skip(len).map_err(Error::from_write)?;
            len
        }
        _ => {
            let bytes = encode_slot(slot, tables)?;
            match old_len {
                Some(old_len) => {
                    writer.replace(old_len, &bytes).map_err(Error::from_write)?;
                    delta += bytes.len() as isize - old_len as isize;
                }
                None => {
                    writer.insert(&bytes);
                    delta += bytes.len() as isize;
                }
            }
            bytes.len()
        }
    };

    slot.span = Some(Span::new(position, len));
    slot.stale = false;
    Ok(delta)
}

fn encode_slot(slot: &Slot, tables: &[TableEntry]) -> Result<Vec<u8>> {
    if slot.kind == ValueKind::VersionMarker {
        return Ok(BINARY_VERSION_MARKER.to_vec());
    }
    let element = slot
        .element
        .get()
        .ok_or_else(|| Error::encode("value has no content to encode"))?;
    match slot.symtab {
        Some(symtab) => encode(element, &tables[symtab.0].table),
        None => encode(element, &SymbolTable::new()),
    }
}
