//! Top-level reader over binary bytes.

use std::sync::Arc;

use iondg_ll_buffer::Buffer;
use tracing::trace;

use crate::binary::{self, Decoder, Frame, TID_ANNOTATION, TID_SYMBOL};
use crate::datagram::{classify, ValueKind};
use crate::source::{RawSource, RawValue, Span};
use crate::symbols::{SymbolTable, ION_1_0};
use crate::value::Element;
use crate::{Error, Result};

/// Yields the top-level values of a binary document.
///
/// Plain user values are only framed; their bodies are decoded later by
/// whoever owns the buffer. Symbols and annotated values are decoded on the
/// spot because they may be bookkeeping that changes the table in effect.
pub struct BinaryReader {
    buffer: Option<Buffer>,
    position: usize,
    table: Arc<SymbolTable>,
    pending: Option<RawValue>,
    closed: bool,
}

impl BinaryReader {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer: Some(buffer),
            position: 0,
            table: Arc::new(SymbolTable::new()),
            pending: None,
            closed: false,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(Buffer::from_slice(bytes))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn read_next(&mut self) -> Result<Option<RawValue>> {
        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| Error::decode("reader has given up its buffer"))?;
        let mut reader = buffer.reader();
        reader.sync();
        let data = buffer.as_slice();

        while self.position < data.len() {
            let frame = binary::read_frame(data, self.position)?;
            self.position = frame.end();
            let span = Span::new(frame.start(), frame.end() - frame.start());

            match frame {
                Frame::Pad { .. } => continue,
                Frame::VersionMarker { .. } => {
                    trace!(offset = span.offset, "version marker");
                    self.table = Arc::new(SymbolTable::new());
                    return Ok(Some(self.raw(Element::symbol(ION_1_0), span, true, true)));
                }
                Frame::Value { start, end, tid } => {
                    if tid != TID_ANNOTATION && tid != TID_SYMBOL {
                        return Ok(Some(RawValue {
                            element: None,
                            span: Some(span),
                            symbols: self.table.clone(),
                            hidden: false,
                            stale: false,
                        }));
                    }
                    let element = Decoder::new(&data[start..end], &self.table)
                        .with_base(start)
                        .decode()?;
                    return self.bookkeeping(element, span).map(Some);
                }
            }
        }
        Ok(None)
    }

    fn bookkeeping(&mut self, element: Element, span: Span) -> Result<RawValue> {
        match classify(&element) {
            ValueKind::VersionMarker => {
                // A symbol value standing in for a marker; rewritten as the
                // 4-byte token on the next sync.
                self.table = Arc::new(SymbolTable::new());
                Ok(self.raw(element, span, true, true))
            }
            ValueKind::SymbolTable => {
                let table = SymbolTable::from_element(&element)
                    .map_err(|e| Error::decode_at(span.offset, e.to_string()))?;
                // The struct itself is encoded against the outgoing table.
                let raw = self.raw(element, span, true, false);
                if table.is_local() {
                    trace!(offset = span.offset, max_id = table.max_id(), "local symbol table");
                    self.table = Arc::new(table);
                }
                Ok(raw)
            }
            ValueKind::EmbeddedValue => Ok(self.raw(element, span, true, false)),
            ValueKind::User => Ok(self.raw(element, span, false, false)),
        }
    }

    fn raw(&self, element: Element, span: Span, hidden: bool, stale: bool) -> RawValue {
        RawValue {
            element: Some(element),
            span: Some(span),
            symbols: self.table.clone(),
            hidden,
            stale,
        }
    }
}

impl RawSource for BinaryReader {
    fn has_next(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::decode("reader is closed"));
        }
        if self.pending.is_none() {
            self.pending = self.read_next()?;
        }
        Ok(self.pending.is_some())
    }

    fn next(&mut self) -> Result<RawValue> {
        if !self.has_next()? {
            return Err(Error::decode("no more values"));
        }
        self.pending
            .take()
            .ok_or_else(|| Error::decode("no more values"))
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending = None;
    }

    fn take_buffer(&mut self) -> Option<Buffer> {
        self.buffer.take()
    }
}
