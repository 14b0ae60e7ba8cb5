//! iondg-core: the binary datagram container
//!
//! This layer gives meaning to the bytes held by `iondg-ll-buffer`:
//! - `Element`: a decoded value with its annotations
//! - `SymbolTable`: symbol text to id mapping, system table included
//! - `binary`: the type-descriptor encoding of values
//! - `RawSource`: pull-style producers of top-level values
//! - `Datagram`: a whole document, with a system view (bookkeeping values
//!   included) and a user view
//!
//! # Example
//!
//! ```rust
//! use iondg_core::{Datagram, Element};
//!
//! let mut datagram = Datagram::new();
//! datagram.add(Element::symbol("greeting")).unwrap();
//! datagram.add("hello").unwrap();
//!
//! // marker, symbol table, two user values
//! assert_eq!(datagram.len(), 2);
//! let bytes = datagram.to_bytes().unwrap();
//! assert_eq!(datagram.system_len(), 4);
//!
//! let copy = Datagram::from_bytes(&bytes).unwrap();
//! assert_eq!(copy.get(0).unwrap(), &Element::symbol("greeting"));
//! ```

pub mod binary;
mod datagram;
mod element_source;
mod error;
mod reader;
mod source;
pub mod symbols;
mod value;

pub use datagram::{classify, Datagram, SymtabId, ValueId, ValueKind};
pub use element_source::ElementSource;
pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use source::{RawSource, RawValue, Span};
pub use symbols::{Import, SymbolTable};
pub use value::{Element, IonType, Value};

// Re-export the arena for callers handing over their own buffer
pub use iondg_ll_buffer::Buffer;
