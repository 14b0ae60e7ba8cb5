//! The datagram: a document's top-level values seen two ways.
//!
//! - the **system view** holds every top-level value in physical order,
//!   bookkeeping included (version markers, symbol tables, embedded values)
//! - the **user view** is the subsequence of values an application cares
//!   about
//!
//! Both views are index sequences into one slot arena, so a value is stored
//! once and identified by its [`ValueId`]. Symbol tables live in a second
//! arena and are shared by handle ([`SymtabId`]).
//!
//! Values read from bytes stay undecoded until first accessed. Mutations only
//! mark the datagram dirty; the byte arena is brought up to date the next
//! time bytes are requested (see [`Datagram::synchronize`]).

mod classify;
mod export;
mod materialize;
mod resolve;
mod sync;

use std::cell::OnceCell;
use std::fmt;

use iondg_ll_buffer::Buffer;
use tracing::{debug, warn};

use crate::binary::Decoder;
use crate::source::Span;
use crate::symbols::{SymbolTable, ION_1_0};
use crate::value::Element;
use crate::{Error, Result};

pub use classify::{classify, ValueKind};

/// Handle to a value owned by a [`Datagram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(usize);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a symbol table owned by a [`Datagram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymtabId(usize);

impl fmt::Display for SymtabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symtab#{}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    /// Decoded on first access when the value came from bytes.
    element: OnceCell<Element>,
    kind: ValueKind,
    /// Table the value is encoded against.
    symtab: Option<SymtabId>,
    /// For a symbol-table struct: the table it is the physical form of.
    defines: Option<SymtabId>,
    /// The encoding at `span` no longer matches the element.
    stale: bool,
    /// Where the current encoding lives in the buffer; `None` until written.
    span: Option<Span>,
    contained: bool,
}

impl Slot {
    fn new(element: Element, kind: ValueKind) -> Self {
        Self {
            element: OnceCell::from(element),
            kind,
            symtab: None,
            defines: None,
            stale: true,
            span: None,
            contained: false,
        }
    }

    fn marker() -> Self {
        Self::new(Element::symbol(ION_1_0), ValueKind::VersionMarker)
    }
}

#[derive(Debug)]
struct TableEntry {
    table: SymbolTable,
    /// The struct slot holding this table's physical form, once placed.
    realized: Option<ValueId>,
    /// Table revision the struct slot was rendered from.
    rendered: u64,
}

/// The root container of one encoded document.
#[derive(Debug)]
pub struct Datagram {
    slots: Vec<Slot>,
    tables: Vec<TableEntry>,
    system_contents: Vec<ValueId>,
    user_contents: Vec<ValueId>,
    dirty: bool,
    buffer: Buffer,
}

impl Default for Datagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Datagram {
    /// An empty datagram: just the version marker.
    pub fn new() -> Self {
        let mut datagram = Self::empty();
        datagram.insert_marker(0);
        datagram.dirty = true;
        datagram
    }

    fn empty() -> Self {
        Self {
            slots: Vec::new(),
            tables: Vec::new(),
            system_contents: Vec::new(),
            user_contents: Vec::new(),
            dirty: false,
            buffer: Buffer::new(),
        }
    }

    // ==================== Arena plumbing ====================

    fn slot(&self, id: ValueId) -> Result<&Slot> {
        self.slots.get(id.0).ok_or(Error::UnknownValue { id })
    }

    fn push_slot(&mut self, slot: Slot) -> ValueId {
        self.slots.push(slot);
        ValueId(self.slots.len() - 1)
    }

    fn push_table(&mut self, table: SymbolTable) -> SymtabId {
        self.tables.push(TableEntry {
            table,
            realized: None,
            rendered: 0,
        });
        SymtabId(self.tables.len() - 1)
    }

    /// Record `value` as the physical form of `symtab`.
    fn link(&mut self, value: ValueId, symtab: SymtabId) {
        self.slots[value.0].defines = Some(symtab);
        let entry = &mut self.tables[symtab.0];
        entry.realized = Some(value);
        entry.rendered = entry.table.revision();
    }

    /// Insert a fresh version marker at `index` of the system view. Each
    /// marker opens a new, empty table context.
    fn insert_marker(&mut self, index: usize) -> ValueId {
        let symtab = self.push_table(SymbolTable::new());
        let mut slot = Slot::marker();
        slot.symtab = Some(symtab);
        slot.contained = true;
        let id = self.push_slot(slot);
        self.system_contents.insert(index, id);
        id
    }

    fn kind_at(&self, system_index: usize) -> ValueKind {
        self.slots[self.system_contents[system_index].0].kind
    }

    /// The element of `id`, decoding it from the buffer on first access.
    fn load(&self, id: ValueId) -> Result<&Element> {
        let slot = self.slot(id)?;
        if let Some(element) = slot.element.get() {
            return Ok(element);
        }

        let span = slot
            .span
            .ok_or_else(|| Error::decode(format!("value {} has no content", id)))?;
        let table = slot
            .symtab
            .map(|t| &self.tables[t.0].table)
            .ok_or_else(|| Error::decode(format!("value {} has no symbol table", id)))?;
        let bytes = self
            .buffer
            .as_slice()
            .get(span.offset..span.end())
            .ok_or_else(|| Error::decode_at(span.offset, "value lies outside the buffer"))?;
        let element = Decoder::new(bytes, table).with_base(span.offset).decode()?;
        Ok(slot.element.get_or_init(|| element))
    }

    // ==================== Container operations ====================

    /// Append a value. Bookkeeping values go to the system view only; user
    /// values go to both. The value is attached to the symbol table in effect
    /// at the end of the datagram, or to a fresh table if there is none.
    pub fn add(&mut self, element: impl Into<Element>) -> Result<ValueId> {
        let element = element.into();
        let kind = classify(&element);
        let id = self.push_slot(Slot::new(element, kind));
        self.attach(id)?;
        Ok(id)
    }

    /// Re-append a value that was removed from this datagram.
    ///
    /// Handles stay valid for the datagram's lifetime because slots are never
    /// freed or reused. Detached values, and the fresh table each synthesized
    /// marker opens, keep their memory until the datagram is dropped.
    pub fn add_existing(&mut self, id: ValueId) -> Result<()> {
        let slot = self.slot(id)?;
        if slot.contained {
            return Err(Error::AlreadyContained { id });
        }
        if slot.element.get().is_none() {
            return Err(Error::decode(format!(
                "value {} was detached before it could be decoded",
                id
            )));
        }
        self.attach(id)
    }

    fn attach(&mut self, id: ValueId) -> Result<()> {
        let kind = self.slots[id.0].kind;
        let symtab = if kind == ValueKind::VersionMarker {
            self.push_table(SymbolTable::new())
        } else {
            match self.resolve(self.user_contents.len(), self.system_contents.len())? {
                Some(symtab) => symtab,
                None => self.push_table(SymbolTable::new()),
            }
        };

        let slot = &mut self.slots[id.0];
        slot.symtab = Some(symtab);
        slot.contained = true;
        slot.stale = true;
        self.system_contents.push(id);
        if kind == ValueKind::User {
            self.user_contents.push(id);
        }
        self.dirty = true;
        Ok(())
    }

    /// Positional insertion is not supported; values can only be appended.
    pub fn insert(&mut self, _index: usize, _element: impl Into<Element>) -> Result<ValueId> {
        Err(Error::unsupported("insert"))
    }

    /// The user value at `index`.
    pub fn get(&self, index: usize) -> Result<&Element> {
        self.load(self.id_at(index)?)
    }

    /// The physical value at `index`, bookkeeping included.
    pub fn system_get(&self, index: usize) -> Result<&Element> {
        self.load(self.system_id_at(index)?)
    }

    pub fn id_at(&self, index: usize) -> Result<ValueId> {
        self.user_contents
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.user_contents.len(),
            })
    }

    pub fn system_id_at(&self, index: usize) -> Result<ValueId> {
        self.system_contents
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.system_contents.len(),
            })
    }

    /// Remove a user value from both views. Returns whether it was found.
    ///
    /// Symbol tables the value needed stay in place even if nothing else
    /// uses them. The value's slot stays allocated so its handle can be
    /// passed to [`Datagram::add_existing`].
    pub fn remove(&mut self, id: ValueId) -> bool {
        let Some(user_index) = self.user_contents.iter().position(|v| *v == id) else {
            return false;
        };
        // Removal drops the encoding, so decode while it is still reachable.
        if let Err(e) = self.load(id) {
            warn!(value = %id, error = %e, "removed value could not be decoded");
        }
        self.user_contents.remove(user_index);
        self.system_contents.retain(|v| *v != id);

        let slot = &mut self.slots[id.0];
        slot.contained = false;
        slot.span = None;
        slot.symtab = None;
        slot.stale = true;
        self.dirty = true;
        debug!(value = %id, "removed value");
        true
    }

    /// Keep only the user values for which `keep` returns true. Returns how
    /// many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<usize>
    where
        F: FnMut(&Element) -> bool,
    {
        let mut doomed = Vec::new();
        for id in &self.user_contents {
            if !keep(self.load(*id)?) {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            self.remove(*id);
        }
        Ok(doomed.len())
    }

    /// Replace the content of the user value at `index`.
    pub fn set(&mut self, index: usize, element: impl Into<Element>) -> Result<ValueId> {
        let id = self.id_at(index)?;
        let element = element.into();
        if classify(&element).is_system() {
            return Err(Error::unsupported("set to a system value"));
        }
        let slot = &mut self.slots[id.0];
        slot.element = OnceCell::from(element);
        slot.stale = true;
        self.dirty = true;
        Ok(id)
    }

    /// Number of user values.
    pub fn len(&self) -> usize {
        self.user_contents.len()
    }

    /// Number of physical values.
    pub fn system_len(&self) -> usize {
        self.system_contents.len()
    }

    /// Whether there are no user values.
    pub fn is_empty(&self) -> bool {
        self.user_contents.is_empty()
    }

    pub fn contains(&self, id: ValueId) -> bool {
        self.slot(id).is_ok_and(|slot| slot.contained)
    }

    /// User values in logical order, decoding as needed.
    pub fn iter(&self) -> impl Iterator<Item = Result<&Element>> + '_ {
        self.user_contents.iter().map(move |id| self.load(*id))
    }

    /// Physical values in encoding order.
    pub fn system_iter(&self) -> impl Iterator<Item = Result<&Element>> + '_ {
        self.system_contents.iter().map(move |id| self.load(*id))
    }

    pub fn ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.user_contents.iter().copied()
    }

    pub fn system_ids(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.system_contents.iter().copied()
    }

    // ==================== Structural denials ====================

    /// A datagram cannot be emptied wholesale; its leading marker must stay.
    pub fn clear(&mut self) -> Result<()> {
        Err(Error::unsupported("clear"))
    }

    pub fn make_null(&mut self) -> Result<()> {
        Err(Error::unsupported("make_null"))
    }

    pub fn add_annotation(&mut self, _annotation: &str) -> Result<()> {
        Err(Error::unsupported("add_annotation"))
    }

    /// Datagrams carry no annotations.
    pub fn annotations(&self) -> &[String] {
        &[]
    }

    pub fn clear_annotations(&mut self) {}

    pub fn remove_annotation(&mut self, _annotation: &str) -> bool {
        false
    }

    // ==================== Queries ====================

    pub fn kind(&self, id: ValueId) -> Result<ValueKind> {
        Ok(self.slot(id)?.kind)
    }

    /// The table `id` is encoded against. `None` for removed values.
    pub fn symbol_table_id(&self, id: ValueId) -> Result<Option<SymtabId>> {
        Ok(self.slot(id)?.symtab)
    }

    pub fn symbol_table(&self, symtab: SymtabId) -> Option<&SymbolTable> {
        self.tables.get(symtab.0).map(|entry| &entry.table)
    }

    pub fn value(&self, id: ValueId) -> Result<&Element> {
        self.load(id)
    }

    /// Whether the buffer lags behind the in-memory state.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Distinct tables referenced from the system view, in first-use order.
    pub fn symbol_tables(&self) -> Vec<SymtabId> {
        let mut seen = Vec::new();
        for id in &self.system_contents {
            if let Some(symtab) = self.slots[id.0].symtab {
                if !seen.contains(&symtab) {
                    seen.push(symtab);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ION_SYMBOL_TABLE;
    use crate::value::IonType;

    #[test]
    fn new_datagram_holds_only_the_marker() {
        let datagram = Datagram::new();
        assert_eq!(datagram.system_len(), 1);
        assert_eq!(datagram.len(), 0);
        assert!(datagram.is_empty());
        assert_eq!(
            datagram.kind(datagram.system_id_at(0).unwrap()).unwrap(),
            ValueKind::VersionMarker
        );
        assert_eq!(datagram.system_get(0).unwrap(), &Element::symbol(ION_1_0));
    }

    #[test]
    fn add_routes_by_kind() {
        let mut datagram = Datagram::new();
        let user = datagram.add(1).unwrap();
        let table = datagram
            .add(Element::new(crate::value::Value::Struct(Vec::new())).with_annotation(ION_SYMBOL_TABLE))
            .unwrap();
        let marker = datagram.add(Element::symbol(ION_1_0)).unwrap();

        assert_eq!(datagram.len(), 1);
        assert_eq!(datagram.system_len(), 4);
        assert_eq!(datagram.kind(user).unwrap(), ValueKind::User);
        assert_eq!(datagram.kind(table).unwrap(), ValueKind::SymbolTable);
        assert_eq!(datagram.kind(marker).unwrap(), ValueKind::VersionMarker);
        assert!(datagram.is_dirty());
    }

    #[test]
    fn values_share_the_table_in_effect() {
        let mut datagram = Datagram::new();
        let a = datagram.add(Element::symbol("a")).unwrap();
        let b = datagram.add(Element::symbol("b")).unwrap();
        let marker = datagram.add(Element::symbol(ION_1_0)).unwrap();
        let c = datagram.add(Element::symbol("c")).unwrap();

        let table_of = |id| datagram.symbol_table_id(id).unwrap();
        assert_eq!(table_of(a), table_of(b));
        assert_ne!(table_of(b), table_of(c));
        assert_eq!(table_of(marker), table_of(c));
    }

    #[test]
    fn index_errors() {
        let datagram = Datagram::new();
        assert!(matches!(
            datagram.get(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(matches!(
            datagram.system_get(3),
            Err(Error::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn remove_and_add_back() {
        let mut datagram = Datagram::new();
        let a = datagram.add(1).unwrap();
        let b = datagram.add(2).unwrap();

        assert!(datagram.remove(a));
        assert!(!datagram.remove(a));
        assert!(!datagram.contains(a));
        assert_eq!(datagram.get(0).unwrap(), &Element::from(2));
        assert_eq!(datagram.symbol_table_id(a).unwrap(), None);

        assert!(matches!(
            datagram.add_existing(b),
            Err(Error::AlreadyContained { .. })
        ));
        datagram.add_existing(a).unwrap();
        assert_eq!(datagram.ids().collect::<Vec<_>>(), [b, a]);
        assert!(datagram.symbol_table_id(a).unwrap().is_some());
    }

    #[test]
    fn detached_handle_survives_later_adds() {
        let mut datagram = Datagram::new();
        let kept = datagram.add("kept").unwrap();
        assert!(datagram.remove(kept));
        let slots = datagram.slots.len();
        for i in 0..10 {
            datagram.add(i).unwrap();
        }
        assert_eq!(datagram.slots.len(), slots + 10);
        assert_eq!(datagram.value(kept).unwrap(), &Element::string("kept"));

        datagram.add_existing(kept).unwrap();
        assert_eq!(datagram.get(10).unwrap(), &Element::string("kept"));
    }

    #[test]
    fn markers_cannot_be_removed() {
        let mut datagram = Datagram::new();
        let marker = datagram.system_id_at(0).unwrap();
        assert!(!datagram.remove(marker));
        assert_eq!(datagram.system_len(), 1);
    }

    #[test]
    fn retain_filters_user_values() {
        let mut datagram = Datagram::new();
        for i in 0..5 {
            datagram.add(i).unwrap();
        }
        let removed = datagram
            .retain(|e| e.as_int().is_some_and(|i| i % 2 == 0))
            .unwrap();
        assert_eq!(removed, 2);
        let left: Vec<i64> = datagram
            .iter()
            .map(|e| e.unwrap().as_int().unwrap())
            .collect();
        assert_eq!(left, [0, 2, 4]);
        assert_eq!(datagram.system_len(), 4);
    }

    #[test]
    fn set_replaces_user_content() {
        let mut datagram = Datagram::new();
        datagram.add(1).unwrap();
        datagram.set(0, "one").unwrap();
        assert_eq!(datagram.get(0).unwrap(), &Element::string("one"));
        assert!(datagram.set(0, Element::symbol(ION_1_0)).is_err());
        assert!(datagram.set(1, 2).is_err());
    }

    #[test]
    fn structural_denials() {
        let mut datagram = Datagram::new();
        datagram.add(Element::typed_null(IonType::Int)).unwrap();
        assert!(matches!(
            datagram.insert(0, 1),
            Err(Error::UnsupportedOperation { operation: "insert" })
        ));
        assert!(matches!(
            datagram.clear(),
            Err(Error::UnsupportedOperation { .. })
        ));
        assert!(datagram.make_null().is_err());
        assert!(datagram.add_annotation("a").is_err());
        datagram.clear_annotations();
        assert!(!datagram.remove_annotation("a"));
        assert!(datagram.annotations().is_empty());
        assert_eq!(datagram.len(), 1);
    }

    #[test]
    fn unknown_handles() {
        let datagram = Datagram::new();
        let foreign = ValueId(99);
        assert!(matches!(
            datagram.value(foreign),
            Err(Error::UnknownValue { .. })
        ));
        assert_eq!(format!("{}", foreign), "#99");
        assert!(datagram.symbol_table(SymtabId(42)).is_none());
    }
}
