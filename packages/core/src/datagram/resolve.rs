//! Which symbol table is in effect at a position.

use crate::symbols::SymbolTable;
use crate::Result;

use super::{Datagram, SymtabId, ValueId, ValueKind};

impl Datagram {
    /// The table in effect just before a value placed at `user_index` of the
    /// user view and `system_index` of the system view.
    ///
    /// Physical adjacency wins over logical adjacency: what immediately
    /// precedes a value on the wire governs its encoding. `None` means the
    /// caller should start a fresh table.
    pub(crate) fn resolve(
        &mut self,
        user_index: usize,
        system_index: usize,
    ) -> Result<Option<SymtabId>> {
        if system_index > 0 {
            let prev = self.system_contents[system_index - 1];
            if let Some(symtab) = self.table_view(prev)? {
                return Ok(Some(symtab));
            }
            if let Some(symtab) = self.slots[prev.0].symtab {
                return Ok(Some(symtab));
            }
        }
        if user_index > 0 {
            let prev = self.user_contents[user_index - 1];
            if let Some(symtab) = self.slots[prev.0].symtab {
                return Ok(Some(symtab));
            }
        }
        if system_index > 1 {
            let prev = self.system_contents[system_index - 2];
            if let Some(symtab) = self.slots[prev.0].symtab {
                return Ok(Some(symtab));
            }
        }
        Ok(None)
    }

    /// If `id` is a local symbol-table struct, the table it defines. The view
    /// is built and linked the first time it is asked for.
    fn table_view(&mut self, id: ValueId) -> Result<Option<SymtabId>> {
        let slot = &self.slots[id.0];
        if slot.kind != ValueKind::SymbolTable {
            return Ok(None);
        }
        if let Some(symtab) = slot.defines {
            return Ok(Some(symtab));
        }

        let table = SymbolTable::from_element(self.load(id)?)?;
        if !table.is_local() {
            return Ok(None);
        }
        let symtab = self.push_table(table);
        self.link(id, symtab);
        Ok(Some(symtab))
    }
}
