//! iondg-ll-buffer: the byte arena underneath a datagram
//!
//! Everything at this level is pure bytes. There are no values, no symbol
//! tables and no type descriptors here - just an expandable buffer with two
//! independent cursors:
//!
//! - a read cursor with a *limit* that is only reconciled with the real size
//!   when [`Reader::sync`] is called
//! - a write cursor that can overwrite, insert (shifting the tail right),
//!   remove (shifting the tail left) and truncate
//!
//! Both cursors persist inside the [`Buffer`], so a reader obtained later
//! resumes where the previous one stopped.
//!
//! # Example
//!
//! ```rust
//! use iondg_ll_buffer::Buffer;
//!
//! let mut buffer = Buffer::from_slice(b"\xE0\x01\x00\xEA");
//!
//! let mut writer = buffer.writer_at(4).unwrap();
//! writer.insert(&[0x21, 0x05]);
//! assert_eq!(buffer.len(), 6);
//!
//! let mut reader = buffer.reader();
//! reader.sync();
//! reader.set_position(4).unwrap();
//! assert_eq!(reader.read_byte(), Some(0x21));
//! ```

pub use bytes::Bytes;

mod buffer;
mod error;

pub use buffer::{Buffer, Reader, Writer};
pub use error::BufferError;
