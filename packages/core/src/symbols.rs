//! Symbol tables: the system table and local tables.
//!
//! Ids `1..=SYSTEM_MAX_ID` always belong to the system table. A local table
//! reserves the next `max_id` ids for each of its imports (in order) and
//! appends its own symbols after them. Ids are never reassigned, so a value
//! encoded against an older revision of a table stays valid.
//!
//! Every id a table can hand out fits in a `u32`: constructors reject import
//! ranges that overflow, and interning fails once the id space is used up.

use std::collections::HashMap;

use crate::value::{Element, IonType, Value};
use crate::{Error, Result};

pub const ION: &str = "$ion";
pub const ION_1_0: &str = "$ion_1_0";
pub const ION_SYMBOL_TABLE: &str = "$ion_symbol_table";
pub const NAME: &str = "name";
pub const VERSION: &str = "version";
pub const IMPORTS: &str = "imports";
pub const SYMBOLS: &str = "symbols";
pub const MAX_ID: &str = "max_id";
pub const ION_SHARED_SYMBOL_TABLE: &str = "$ion_shared_symbol_table";

/// Annotation marking a sexp as an embedded value (bookkeeping, not user data).
pub const ION_EMBEDDED_VALUE: &str = "$ion_embedded_value";

/// The universal system symbol table, id `n` at index `n - 1`.
pub const SYSTEM_SYMBOLS: [&str; 9] = [
    ION,
    ION_1_0,
    ION_SYMBOL_TABLE,
    NAME,
    VERSION,
    IMPORTS,
    SYMBOLS,
    MAX_ID,
    ION_SHARED_SYMBOL_TABLE,
];

pub const SYSTEM_MAX_ID: u32 = SYSTEM_SYMBOLS.len() as u32;

/// Id of a system symbol.
pub fn system_sid(text: &str) -> Option<u32> {
    SYSTEM_SYMBOLS
        .iter()
        .position(|s| *s == text)
        .map(|i| i as u32 + 1)
}

/// Parse symbol-id text (`$12`) into its id.
fn parse_sid_text(text: &str) -> Option<u32> {
    let digits = text.strip_prefix('$')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// An imported shared table. Without a catalog only its id range is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub name: String,
    pub version: u32,
    pub max_id: u32,
}

/// A symbol table mapping symbol text to ids.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    /// Set for shared tables only; local tables are unnamed.
    name: Option<String>,
    version: Option<u32>,
    imports: Vec<Import>,
    /// Sum of the imports' `max_id`s.
    imported: u32,
    /// Local symbols in id order; `None` reserves an id with unknown text.
    symbols: Vec<Option<String>>,
    ids: HashMap<String, u32>,
    revision: u64,
}

impl SymbolTable {
    /// An empty local table.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty local table importing `imports`. Fails when the imported
    /// ranges leave no room for local ids.
    pub fn with_imports(imports: Vec<Import>) -> Result<Self> {
        let imported = imports
            .iter()
            .try_fold(0u32, |sum, import| sum.checked_add(import.max_id))
            .filter(|sum| SYSTEM_MAX_ID.checked_add(*sum).is_some_and(|max| max < u32::MAX))
            .ok_or_else(|| Error::decode("imported symbol ids overflow the id space"))?;
        Ok(Self {
            imports,
            imported,
            ..Self::default()
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Local tables have no name.
    pub fn is_local(&self) -> bool {
        self.name.is_none()
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn has_imports(&self) -> bool {
        !self.imports.is_empty()
    }

    fn first_local_id(&self) -> u32 {
        SYSTEM_MAX_ID + self.imported + 1
    }

    pub fn max_id(&self) -> u32 {
        SYSTEM_MAX_ID + self.imported + self.symbols.len() as u32
    }

    /// Whether this table must be serialized before values that use it:
    /// it has imports, or assigns ids beyond the system table.
    pub fn is_needed(&self) -> bool {
        self.has_imports() || self.max_id() > SYSTEM_MAX_ID
    }

    /// Bumped every time a symbol is added.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Local symbols in id order.
    pub fn local_symbols(&self) -> impl Iterator<Item = Option<&str>> {
        self.symbols.iter().map(|s| s.as_deref())
    }

    pub fn sid(&self, text: &str) -> Option<u32> {
        if let Some(sid) = system_sid(text) {
            return Some(sid);
        }
        if let Some(sid) = self.ids.get(text) {
            return Some(*sid);
        }
        parse_sid_text(text).filter(|sid| *sid <= self.max_id())
    }

    /// Text of a symbol id; `None` when unknown (id 0, imported ids,
    /// reserved slots, or past `max_id`).
    pub fn text(&self, sid: u32) -> Option<&str> {
        if sid == 0 {
            return None;
        }
        if sid <= SYSTEM_MAX_ID {
            return Some(SYSTEM_SYMBOLS[sid as usize - 1]);
        }
        let first_local = self.first_local_id();
        if sid < first_local {
            return None;
        }
        self.symbols
            .get((sid - first_local) as usize)
            .and_then(|s| s.as_deref())
    }

    /// Id for `text`, adding it as a new local symbol when missing.
    pub fn intern(&mut self, text: &str) -> Result<u32> {
        if let Some(sid) = self.sid(text) {
            return Ok(sid);
        }
        // `$N` names an id; it never becomes symbol text.
        if let Some(sid) = parse_sid_text(text) {
            return Ok(sid);
        }
        self.push_symbol(Some(text.to_string()))
            .ok_or_else(|| Error::encode(format!("no symbol id left for '{}'", text)))
    }

    /// `None` once `max_id` has reached `u32::MAX`.
    fn push_symbol(&mut self, text: Option<String>) -> Option<u32> {
        let sid = self.max_id().checked_add(1)?;
        if let Some(text) = &text {
            self.ids.entry(text.clone()).or_insert(sid);
        }
        self.symbols.push(text);
        self.revision += 1;
        Some(sid)
    }

    /// Bring the table up to date with every symbol `element` uses.
    /// Returns whether any symbol was added.
    pub fn intern_all(&mut self, element: &Element) -> Result<bool> {
        let before = self.revision;
        for text in element.symbols() {
            self.intern(text)?;
        }
        Ok(self.revision != before)
    }

    /// Build a table view over its physical struct representation.
    pub fn from_element(element: &Element) -> Result<Self> {
        let fields = match &element.value {
            Value::Struct(fields) => fields,
            Value::Null(IonType::Struct) => return Ok(Self::new()),
            _ => return Err(Error::decode("symbol table must be a struct")),
        };

        let mut name = None;
        let mut version = None;
        let mut imports = Vec::new();
        let mut symbols = Vec::new();
        for (field, v) in fields {
            match field.as_str() {
                NAME => name = v.as_str().map(str::to_string),
                VERSION => version = v.as_int().and_then(|i| u32::try_from(i).ok()),
                IMPORTS => {
                    if let Some(items) = v.as_sequence() {
                        for item in items {
                            imports.push(parse_import(item)?);
                        }
                    }
                }
                SYMBOLS => {
                    if let Some(items) = v.as_sequence() {
                        symbols.extend(items.iter().map(|item| match &item.value {
                            Value::String(s) => Some(s.clone()),
                            _ => None,
                        }));
                    }
                }
                _ => {}
            }
        }

        // Local ids follow every import, whatever the field order.
        let mut table = Self::with_imports(imports)?;
        table.name = name;
        table.version = version;
        for text in symbols {
            table
                .push_symbol(text)
                .ok_or_else(|| Error::decode("local symbols overflow the id space"))?;
        }
        table.revision = 0;
        Ok(table)
    }

    /// The physical struct representation of this table.
    pub fn to_element(&self) -> Element {
        let mut fields: Vec<(String, Element)> = Vec::new();
        if let Some(name) = &self.name {
            fields.push((NAME.to_string(), Element::string(name.clone())));
        }
        if let Some(version) = self.version {
            fields.push((VERSION.to_string(), Element::from(version as i64)));
        }
        if !self.imports.is_empty() {
            let imports = self.imports.iter().map(|import| {
                Element::structure([
                    (NAME, Element::string(import.name.clone())),
                    (VERSION, Element::from(import.version as i64)),
                    (MAX_ID, Element::from(import.max_id as i64)),
                ])
            });
            fields.push((IMPORTS.to_string(), Element::list(imports)));
        }
        if !self.symbols.is_empty() {
            let symbols = self.symbols.iter().map(|s| match s {
                Some(text) => Element::string(text.clone()),
                None => Element::typed_null(IonType::String),
            });
            fields.push((SYMBOLS.to_string(), Element::list(symbols)));
        }
        Element::new(Value::Struct(fields)).with_annotation(ION_SYMBOL_TABLE)
    }
}

fn parse_import(item: &Element) -> Result<Import> {
    let name = item
        .field(NAME)
        .and_then(Element::as_str)
        .ok_or_else(|| Error::decode("import without a name"))?;
    let version = item
        .field(VERSION)
        .and_then(Element::as_int)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(1);
    let max_id = item
        .field(MAX_ID)
        .and_then(Element::as_int)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::decode(format!("import '{}' has no usable max_id", name)))?;
    Ok(Import {
        name: name.to_string(),
        version,
        max_id,
    })
}
