//! # Binary encoding
//!
//! Every value starts with a one-byte type descriptor: the type id in the
//! high nibble, a length code in the low nibble. Length codes below 14 are
//! the body length itself; 14 means a VarUInt length follows; 15 marks a
//! typed null.
//!
//! ```text
//! struct Value {
//!     type_descriptor:    u8,             // (tid << 4) | ln
//!     length:             VarUInt,        // only when ln == 14
//!     body:               [u8; length],
//! }
//!
//! struct Annotated {
//!     type_descriptor:    u8,             // 0xE0 | ln
//!     length:             VarUInt,        // only when ln == 14
//!     annot_length:       VarUInt,
//!     annots:             [VarUInt; ..],  // symbol ids, annot_length bytes
//!     value:              Value,          // never annotated itself
//! }
//!
//! struct StructBody {
//!     fields: [{
//!         field_name:     VarUInt,        // symbol id
//!         value:          Value,
//!     }; ..]
//! }
//! ```
//!
//! Integers store a big-endian magnitude; the sign lives in the type id.
//! A document opens with the 4-byte version marker `E0 01 00 EA`, which
//! would otherwise read as an (illegal) empty annotation wrapper.

mod decode;
mod encode;
mod varint;

pub use decode::{decode, read_frame, Decoder, Frame};
pub use encode::{encode, encode_into};

pub const TID_NULL: u8 = 0x0;
pub const TID_BOOL: u8 = 0x1;
pub const TID_POS_INT: u8 = 0x2;
pub const TID_NEG_INT: u8 = 0x3;
pub const TID_FLOAT: u8 = 0x4;
pub const TID_DECIMAL: u8 = 0x5;
pub const TID_TIMESTAMP: u8 = 0x6;
pub const TID_SYMBOL: u8 = 0x7;
pub const TID_STRING: u8 = 0x8;
pub const TID_CLOB: u8 = 0x9;
pub const TID_BLOB: u8 = 0xA;
pub const TID_LIST: u8 = 0xB;
pub const TID_SEXP: u8 = 0xC;
pub const TID_STRUCT: u8 = 0xD;
pub const TID_ANNOTATION: u8 = 0xE;

pub const LN_VAR_LENGTH: u8 = 14;
pub const LN_NULL: u8 = 15;

/// The reserved token opening every binary document.
pub const BINARY_VERSION_MARKER: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];
