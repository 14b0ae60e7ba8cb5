use crate::binary::varint::{read_uint, read_var_uint};
use crate::binary::*;
use crate::symbols::SymbolTable;
use crate::value::{Element, IonType, Value};
use crate::{Error, Result};

/// Deepest container nesting the decoder accepts. A top-level value sits at
/// depth 0.
pub const MAX_NESTING: usize = 256;

/// Decode exactly one value from `bytes`.
pub fn decode(bytes: &[u8], table: &SymbolTable) -> Result<Element> {
    Decoder::new(bytes, table).decode()
}

/// The extent of one top-level item, found without decoding its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame {
    VersionMarker { start: usize, end: usize },
    Pad { start: usize, end: usize },
    Value { start: usize, end: usize, tid: u8 },
}

impl Frame {
    pub fn start(&self) -> usize {
        match self {
            Frame::VersionMarker { start, .. }
            | Frame::Pad { start, .. }
            | Frame::Value { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Frame::VersionMarker { end, .. } | Frame::Pad { end, .. } | Frame::Value { end, .. } => {
                *end
            }
        }
    }
}

/// Frame the top-level item starting at `pos`.
pub fn read_frame(data: &[u8], pos: usize) -> Result<Frame> {
    if data[pos..].starts_with(&BINARY_VERSION_MARKER) {
        return Ok(Frame::VersionMarker {
            start: pos,
            end: pos + BINARY_VERSION_MARKER.len(),
        });
    }
    let header = read_header(data, pos, 0)?;
    let end = header.body_start + header.body_len;
    if header.tid == TID_NULL && header.ln != LN_NULL {
        Ok(Frame::Pad { start: pos, end })
    } else {
        Ok(Frame::Value {
            start: pos,
            end,
            tid: header.tid,
        })
    }
}

struct Header {
    tid: u8,
    ln: u8,
    body_start: usize,
    body_len: usize,
}

fn read_header(data: &[u8], pos: usize, base: usize) -> Result<Header> {
    let b = *data
        .get(pos)
        .ok_or_else(|| Error::decode_at(base + pos, "unexpected end of input"))?;
    let tid = b >> 4;
    let ln = b & 0x0F;

    let var_length = ln != LN_NULL
        && tid != TID_BOOL
        && (ln == LN_VAR_LENGTH || (tid == TID_STRUCT && ln == 1));

    let (body_start, body_len) = if ln == LN_NULL || tid == TID_BOOL {
        (pos + 1, 0)
    } else if var_length {
        let (len, n) = read_var_uint(&data[pos + 1..])
            .ok_or_else(|| Error::decode_at(base + pos + 1, "malformed length"))?;
        (pos + 1 + n, len as usize)
    } else {
        (pos + 1, ln as usize)
    };

    if !matches!(body_start.checked_add(body_len), Some(end) if end <= data.len()) {
        return Err(Error::decode_at(
            base + pos,
            "value extends past end of input",
        ));
    }
    Ok(Header {
        tid,
        ln,
        body_start,
        body_len,
    })
}

/// Decodes values from a slice of a larger input. `base` is the absolute
/// offset of the slice, used for error positions.
pub struct Decoder<'a> {
    data: &'a [u8],
    base: usize,
    table: &'a SymbolTable,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], table: &'a SymbolTable) -> Self {
        Self {
            data,
            base: 0,
            table,
        }
    }

    pub fn with_base(mut self, base: usize) -> Self {
        self.base = base;
        self
    }

    /// Decode the single value the slice holds. Trailing bytes are an error.
    pub fn decode(&self) -> Result<Element> {
        let (element, next) = self.read_value(0, 0)?;
        let element = element.ok_or_else(|| self.err(0, "expected a value, found padding"))?;
        if next != self.data.len() {
            return Err(self.err(next, "trailing bytes after value"));
        }
        Ok(element)
    }

    fn err(&self, pos: usize, message: impl Into<String>) -> Error {
        Error::decode_at(self.base + pos, message)
    }

    /// Read the value at `pos`; `None` for padding. Returns the offset after it.
    fn read_value(&self, pos: usize, depth: usize) -> Result<(Option<Element>, usize)> {
        if depth > MAX_NESTING {
            return Err(self.err(pos, "nesting too deep"));
        }
        let h = read_header(self.data, pos, self.base)?;
        let body = &self.data[h.body_start..h.body_start + h.body_len];
        let next = h.body_start + h.body_len;

        if h.tid == TID_ANNOTATION {
            return self.read_annotated(pos, &h, depth).map(|e| (Some(e), next));
        }
        if h.ln == LN_NULL {
            return match null_type(h.tid) {
                Some(t) => Ok((Some(Element::typed_null(t)), next)),
                None => Err(self.err(pos, format!("unsupported null type id {:#x}", h.tid))),
            };
        }

        let value = match h.tid {
            TID_NULL => return Ok((None, next)),
            TID_BOOL => match h.ln {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                _ => return Err(self.err(pos, "invalid bool length")),
            },
            TID_POS_INT => {
                let m = self.magnitude(pos, body)?;
                let i = i64::try_from(m).map_err(|_| self.err(pos, "int out of range"))?;
                Value::Int(i)
            }
            TID_NEG_INT => {
                let m = self.magnitude(pos, body)?;
                if m == 0 {
                    return Err(self.err(pos, "negative zero int"));
                }
                let i = 0i64
                    .checked_sub_unsigned(m)
                    .ok_or_else(|| self.err(pos, "int out of range"))?;
                Value::Int(i)
            }
            TID_FLOAT => match body.len() {
                0 => Value::Float(0.0),
                4 => {
                    let mut b = [0u8; 4];
                    b.copy_from_slice(body);
                    Value::Float(f32::from_be_bytes(b) as f64)
                }
                8 => {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(body);
                    Value::Float(f64::from_be_bytes(b))
                }
                n => return Err(self.err(pos, format!("invalid float length {}", n))),
            },
            TID_DECIMAL => return Err(self.err(pos, "decimal values are not supported")),
            TID_TIMESTAMP => return Err(self.err(pos, "timestamp values are not supported")),
            TID_SYMBOL => {
                let sid = self.magnitude(pos, body)?;
                Value::Symbol(self.symbol_text(pos, sid)?)
            }
            TID_STRING => {
                let s = std::str::from_utf8(body)
                    .map_err(|_| self.err(h.body_start, "string is not valid UTF-8"))?;
                Value::String(s.to_string())
            }
            TID_CLOB => Value::Clob(body.to_vec()),
            TID_BLOB => Value::Blob(body.to_vec()),
            TID_LIST => Value::List(self.read_sequence(h.body_start, next, depth + 1)?),
            TID_SEXP => Value::Sexp(self.read_sequence(h.body_start, next, depth + 1)?),
            TID_STRUCT => Value::Struct(self.read_fields(h.body_start, next, depth + 1)?),
            _ => return Err(self.err(pos, format!("illegal type descriptor {:#04x}", h.tid << 4 | h.ln))),
        };
        Ok((Some(Element::new(value)), next))
    }

    fn magnitude(&self, pos: usize, body: &[u8]) -> Result<u64> {
        read_uint(body).ok_or_else(|| self.err(pos, "integer wider than 64 bits"))
    }

    fn symbol_text(&self, pos: usize, sid: u64) -> Result<String> {
        let sid = u32::try_from(sid)
            .ok()
            .filter(|sid| *sid <= self.table.max_id())
            .ok_or_else(|| {
                self.err(
                    pos,
                    format!("symbol id {} exceeds max id {}", sid, self.table.max_id()),
                )
            })?;
        Ok(match self.table.text(sid) {
            Some(text) => text.to_string(),
            None => format!("${}", sid),
        })
    }

    fn read_var_uint(&self, pos: usize, end: usize) -> Result<(u64, usize)> {
        read_var_uint(&self.data[pos..end]).ok_or_else(|| self.err(pos, "malformed VarUInt"))
    }

    fn read_sequence(&self, mut pos: usize, end: usize, depth: usize) -> Result<Vec<Element>> {
        let mut items = Vec::new();
        while pos < end {
            let (item, next) = self.read_value(pos, depth)?;
            if next > end {
                return Err(self.err(pos, "child overruns its container"));
            }
            items.extend(item);
            pos = next;
        }
        Ok(items)
    }

    fn read_fields(
        &self,
        mut pos: usize,
        end: usize,
        depth: usize,
    ) -> Result<Vec<(String, Element)>> {
        let mut fields = Vec::new();
        while pos < end {
            let (sid, n) = self.read_var_uint(pos, end)?;
            let name = self.symbol_text(pos, sid)?;
            pos += n;
            let (value, next) = self.read_value(pos, depth)?;
            if next > end {
                return Err(self.err(pos, "field overruns its struct"));
            }
            if let Some(value) = value {
                fields.push((name, value));
            }
            pos = next;
        }
        Ok(fields)
    }

    fn read_annotated(&self, pos: usize, h: &Header, depth: usize) -> Result<Element> {
        if h.ln == LN_NULL || h.body_len < 3 {
            return Err(self.err(pos, "malformed annotation wrapper"));
        }
        let end = h.body_start + h.body_len;
        let (annot_len, n) = self.read_var_uint(h.body_start, end)?;
        let mut cursor = h.body_start + n;
        let annots_end = cursor
            .checked_add(annot_len as usize)
            .filter(|e| *e < end)
            .ok_or_else(|| self.err(pos, "annotations overrun their wrapper"))?;
        if annot_len == 0 {
            return Err(self.err(pos, "annotation wrapper without annotations"));
        }

        let mut annotations = Vec::new();
        while cursor < annots_end {
            let (sid, n) = self.read_var_uint(cursor, annots_end)?;
            annotations.push(self.symbol_text(cursor, sid)?);
            cursor += n;
        }

        if self.data[cursor] >> 4 == TID_ANNOTATION {
            return Err(self.err(cursor, "nested annotation wrapper"));
        }
        let (value, next) = self.read_value(cursor, depth)?;
        if next != end {
            return Err(self.err(cursor, "wrapped value does not fill its wrapper"));
        }
        let mut element = value.ok_or_else(|| self.err(cursor, "annotated padding"))?;
        element.annotations = annotations;
        Ok(element)
    }
}

fn null_type(tid: u8) -> Option<IonType> {
    Some(match tid {
        TID_NULL => IonType::Null,
        TID_BOOL => IonType::Bool,
        TID_POS_INT | TID_NEG_INT => IonType::Int,
        TID_FLOAT => IonType::Float,
        TID_SYMBOL => IonType::Symbol,
        TID_STRING => IonType::String,
        TID_CLOB => IonType::Clob,
        TID_BLOB => IonType::Blob,
        TID_LIST => IonType::List,
        TID_SEXP => IonType::Sexp,
        TID_STRUCT => IonType::Struct,
        _ => return None,
    })
}
