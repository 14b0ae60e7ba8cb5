//! The expandable buffer and its cursors.

use std::io::Write;

use bytes::{Bytes, BytesMut};

use crate::BufferError;

/// An expandable byte buffer with persistent read and write cursors.
///
/// The read cursor only sees bytes up to its *limit*. Writes do not move the
/// limit; call [`Reader::sync`] to reconcile it with the current size.
#[derive(Clone, Default)]
pub struct Buffer {
    data: BytesMut,
    read_position: usize,
    read_limit: usize,
    write_position: usize,
}

impl Buffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of existing bytes. The read limit covers all of them.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let read_limit = data.len();
        Self {
            data: BytesMut::from(&data[..]),
            read_position: 0,
            read_limit,
            write_position: 0,
        }
    }

    /// Copy bytes into a new buffer.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: BytesMut::from(data),
            read_position: 0,
            read_limit: data.len(),
            write_position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Consume the buffer, handing out its bytes without copying.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// Borrow the read cursor.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader { buf: self }
    }

    /// Borrow the write cursor at its current position.
    pub fn writer(&mut self) -> Writer<'_> {
        Writer { buf: self }
    }

    /// Borrow the write cursor, moving it to `position` first.
    pub fn writer_at(&mut self, position: usize) -> Result<Writer<'_>, BufferError> {
        let mut writer = Writer { buf: self };
        writer.set_position(position)?;
        Ok(writer)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Buffer::from_vec(data)
    }
}

impl From<&[u8]> for Buffer {
    fn from(data: &[u8]) -> Self {
        Buffer::from_slice(data)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.data.len())
            .field("read_position", &self.read_position)
            .field("read_limit", &self.read_limit)
            .field("write_position", &self.write_position)
            .finish()
    }
}

/// The read cursor of a [`Buffer`].
pub struct Reader<'a> {
    buf: &'a mut Buffer,
}

impl Reader<'_> {
    /// Reconcile the read limit with the buffer's current size.
    pub fn sync(&mut self) {
        self.buf.read_limit = self.buf.data.len();
        if self.buf.read_position > self.buf.read_limit {
            self.buf.read_position = self.buf.read_limit;
        }
    }

    pub fn position(&self) -> usize {
        self.buf.read_position
    }

    pub fn limit(&self) -> usize {
        self.buf.read_limit
    }

    pub fn remaining(&self) -> usize {
        self.buf.read_limit - self.buf.read_position
    }

    pub fn set_position(&mut self, position: usize) -> Result<(), BufferError> {
        if position > self.buf.read_limit {
            return Err(BufferError::OutOfBounds {
                position,
                len: self.buf.read_limit,
            });
        }
        self.buf.read_position = position;
        Ok(())
    }

    /// Copy as many bytes as fit into `dst`, returning how many were read.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.remaining());
        let start = self.buf.read_position;
        dst[..n].copy_from_slice(&self.buf.data[start..start + n]);
        self.buf.read_position += n;
        n
    }

    pub fn read_exact(&mut self, dst: &mut [u8]) -> Result<(), BufferError> {
        let available = self.remaining();
        if dst.len() > available {
            return Err(BufferError::UnexpectedEnd {
                needed: dst.len(),
                available,
            });
        }
        self.read(dst);
        Ok(())
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.buf.read_position += 1;
        Some(b)
    }

    pub fn peek_byte(&self) -> Option<u8> {
        if self.remaining() == 0 {
            return None;
        }
        Some(self.buf.data[self.buf.read_position])
    }

    /// Borrow `len` bytes at the cursor without advancing.
    pub fn slice(&self, len: usize) -> Result<&[u8], BufferError> {
        let available = self.remaining();
        if len > available {
            return Err(BufferError::UnexpectedEnd {
                needed: len,
                available,
            });
        }
        let start = self.buf.read_position;
        Ok(&self.buf.data[start..start + len])
    }

    pub fn skip(&mut self, n: usize) -> Result<(), BufferError> {
        let available = self.remaining();
        if n > available {
            return Err(BufferError::UnexpectedEnd {
                needed: n,
                available,
            });
        }
        self.buf.read_position += n;
        Ok(())
    }

    /// Stream up to `len` bytes from the cursor into `sink`.
    pub fn write_to<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        len: usize,
    ) -> std::io::Result<usize> {
        let n = len.min(self.remaining());
        let start = self.buf.read_position;
        sink.write_all(&self.buf.data[start..start + n])?;
        self.buf.read_position += n;
        Ok(n)
    }
}

/// The write cursor of a [`Buffer`].
///
/// Every operation keeps the bytes after the cursor intact, shifting them as
/// needed, except [`Writer::write`] (which overwrites) and
/// [`Writer::truncate`] (which drops them).
pub struct Writer<'a> {
    buf: &'a mut Buffer,
}

impl Writer<'_> {
    pub fn position(&self) -> usize {
        self.buf.write_position
    }

    pub fn set_position(&mut self, position: usize) -> Result<(), BufferError> {
        if position > self.buf.data.len() {
            return Err(BufferError::OutOfBounds {
                position,
                len: self.buf.data.len(),
            });
        }
        self.buf.write_position = position;
        Ok(())
    }

    /// Overwrite bytes at the cursor, growing the buffer if the write runs
    /// past the end.
    pub fn write(&mut self, bytes: &[u8]) {
        let pos = self.buf.write_position;
        let end = pos + bytes.len();
        if end > self.buf.data.len() {
            self.buf.data.resize(end, 0);
        }
        self.buf.data[pos..end].copy_from_slice(bytes);
        self.buf.write_position = end;
    }

    /// Insert bytes at the cursor, shifting the tail right.
    pub fn insert(&mut self, bytes: &[u8]) {
        let pos = self.buf.write_position;
        let old_len = self.buf.data.len();
        let n = bytes.len();
        self.buf.data.resize(old_len + n, 0);
        self.buf.data.copy_within(pos..old_len, pos + n);
        self.buf.data[pos..pos + n].copy_from_slice(bytes);
        self.buf.write_position = pos + n;
    }

    /// Remove `n` bytes at the cursor, shifting the tail left.
    pub fn remove(&mut self, n: usize) -> Result<(), BufferError> {
        let pos = self.buf.write_position;
        let len = self.buf.data.len();
        if pos + n > len {
            return Err(BufferError::OutOfBounds {
                position: pos + n,
                len,
            });
        }
        self.buf.data.copy_within(pos + n..len, pos);
        self.buf.data.truncate(len - n);
        Ok(())
    }

    /// Replace the `old_len` bytes at the cursor with `bytes`.
    pub fn replace(&mut self, old_len: usize, bytes: &[u8]) -> Result<(), BufferError> {
        if old_len == bytes.len() {
            let pos = self.buf.write_position;
            if pos + old_len > self.buf.data.len() {
                return Err(BufferError::OutOfBounds {
                    position: pos + old_len,
                    len: self.buf.data.len(),
                });
            }
            self.write(bytes);
            return Ok(());
        }
        self.remove(old_len)?;
        self.insert(bytes);
        Ok(())
    }

    /// Move past `n` existing bytes without touching them.
    pub fn skip(&mut self, n: usize) -> Result<(), BufferError> {
        let pos = self.buf.write_position;
        if pos + n > self.buf.data.len() {
            return Err(BufferError::OutOfBounds {
                position: pos + n,
                len: self.buf.data.len(),
            });
        }
        self.buf.write_position = pos + n;
        Ok(())
    }

    /// Drop every byte after the cursor.
    pub fn truncate(&mut self) {
        let pos = self.buf.write_position;
        self.buf.data.truncate(pos);
    }
}
