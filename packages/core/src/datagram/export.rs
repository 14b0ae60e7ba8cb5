//! Byte export. Every call synchronizes first, so callers never see a
//! stale encoding.

use std::io::Write;

use crate::{Error, Result};

use super::Datagram;

impl Datagram {
    /// Size of the encoded datagram in bytes.
    pub fn byte_size(&mut self) -> Result<usize> {
        self.synchronize()?;
        Ok(self.buffer.len())
    }

    /// The encoded datagram as a fresh vector of exactly `byte_size()` bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let size = self.byte_size()?;
        let mut out = vec![0u8; size];
        self.copy_to(&mut out)?;
        Ok(out)
    }

    /// Copy the encoding to the front of `dst`, returning the bytes copied.
    /// Fails with `IndexOutOfRange` if `dst` is too small.
    pub fn copy_to(&mut self, dst: &mut [u8]) -> Result<usize> {
        self.copy_to_at(dst, 0)
    }

    /// Copy the encoding into `dst` starting at `offset`. Fails with
    /// `IndexOutOfRange` (index being the end of the copy) if it would not
    /// fit.
    pub fn copy_to_at(&mut self, dst: &mut [u8], offset: usize) -> Result<usize> {
        let size = self.byte_size()?;
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= dst.len())
            .ok_or(Error::IndexOutOfRange {
                index: offset.saturating_add(size),
                len: dst.len(),
            })?;
        let mut reader = self.buffer.reader();
        reader.sync();
        reader.set_position(0).map_err(Error::from_write)?;
        reader
            .read_exact(&mut dst[offset..end])
            .map_err(Error::from_write)?;
        Ok(size)
    }

    /// Stream the encoding into `sink`, returning the bytes written.
    pub fn write_to<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<usize> {
        let size = self.byte_size()?;
        let mut reader = self.buffer.reader();
        reader.sync();
        reader.set_position(0).map_err(Error::from_write)?;
        let written = reader.write_to(sink, size)?;
        if written != size {
            return Err(Error::encode(format!(
                "wrote {} of {} bytes",
                written, size
            )));
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use crate::binary::BINARY_VERSION_MARKER;
    use crate::{Datagram, Error};

    #[test]
    fn exports_agree() {
        let mut datagram = Datagram::new();
        datagram.add("hello").unwrap();

        let size = datagram.byte_size().unwrap();
        let bytes = datagram.to_bytes().unwrap();
        assert_eq!(bytes.len(), size);

        let mut copied = vec![0xAA; size + 3];
        assert_eq!(datagram.copy_to(&mut copied).unwrap(), size);
        assert_eq!(&copied[..size], &bytes[..]);
        assert_eq!(&copied[size..], &[0xAA; 3]);

        let mut sink = Vec::new();
        assert_eq!(datagram.write_to(&mut sink).unwrap(), size);
        assert_eq!(sink, bytes);
    }

    #[test]
    fn copy_to_short_destination_fails() {
        let mut datagram = Datagram::new();
        let mut dst = [0u8; 3];
        assert!(matches!(
            datagram.copy_to(&mut dst),
            Err(Error::IndexOutOfRange { index: 4, len: 3 })
        ));
    }

    #[test]
    fn copy_to_at_offset() {
        let mut datagram = Datagram::new();
        datagram.add(1).unwrap();
        let bytes = datagram.to_bytes().unwrap();

        let mut dst = vec![0xAA; bytes.len() + 5];
        assert_eq!(datagram.copy_to_at(&mut dst, 2).unwrap(), bytes.len());
        assert_eq!(&dst[..2], &[0xAA; 2]);
        assert_eq!(&dst[2..2 + bytes.len()], &bytes[..]);
        assert_eq!(&dst[2 + bytes.len()..], &[0xAA; 3]);

        assert!(matches!(
            datagram.copy_to_at(&mut dst, 6),
            Err(Error::IndexOutOfRange { index: 12, len: 11 })
        ));
        assert!(datagram.copy_to_at(&mut dst, usize::MAX).is_err());
    }

    #[test]
    fn export_forces_synchronization() {
        let mut datagram = Datagram::new();
        datagram.add(1).unwrap();
        assert!(datagram.is_dirty());
        let bytes = datagram.to_bytes().unwrap();
        assert!(!datagram.is_dirty());
        assert_eq!(&bytes[..4], &BINARY_VERSION_MARKER);
        assert_eq!(&bytes[4..], &[0x21, 0x01]);
    }

    #[test]
    fn failing_sink_is_an_io_error() {
        struct Broken;
        impl std::io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut datagram = Datagram::new();
        assert!(matches!(
            datagram.write_to(&mut Broken),
            Err(Error::Io(_))
        ));
    }
}
