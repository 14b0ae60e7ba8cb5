use crate::binary::varint::{uint_len, write_uint, write_var_uint};
use crate::binary::*;
use crate::symbols::SymbolTable;
use crate::value::{Element, IonType, Value};
use crate::{Error, Result};

/// Encode one element against `table`. Every symbol the element uses must
/// already have an id in the table.
pub fn encode(element: &Element, table: &SymbolTable) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(element, table, &mut out)?;
    Ok(out)
}

pub fn encode_into(element: &Element, table: &SymbolTable, out: &mut Vec<u8>) -> Result<()> {
    if element.annotations.is_empty() {
        return encode_value(&element.value, table, out);
    }

    let mut annots = Vec::new();
    for annotation in &element.annotations {
        write_var_uint(&mut annots, sid_of(table, annotation)? as u64);
    }
    let mut body = Vec::new();
    write_var_uint(&mut body, annots.len() as u64);
    body.extend_from_slice(&annots);
    encode_value(&element.value, table, &mut body)?;

    write_header(out, TID_ANNOTATION, body.len());
    out.extend_from_slice(&body);
    Ok(())
}

fn sid_of(table: &SymbolTable, text: &str) -> Result<u32> {
    table
        .sid(text)
        .ok_or_else(|| Error::encode(format!("symbol '{}' has no id in the table", text)))
}

fn write_header(out: &mut Vec<u8>, tid: u8, len: usize) {
    if len < LN_VAR_LENGTH as usize {
        out.push((tid << 4) | len as u8);
    } else {
        out.push((tid << 4) | LN_VAR_LENGTH);
        write_var_uint(out, len as u64);
    }
}

fn null_tid(ion_type: IonType) -> u8 {
    match ion_type {
        IonType::Null => TID_NULL,
        IonType::Bool => TID_BOOL,
        IonType::Int => TID_POS_INT,
        IonType::Float => TID_FLOAT,
        IonType::Symbol => TID_SYMBOL,
        IonType::String => TID_STRING,
        IonType::Clob => TID_CLOB,
        IonType::Blob => TID_BLOB,
        IonType::List => TID_LIST,
        IonType::Sexp => TID_SEXP,
        IonType::Struct => TID_STRUCT,
    }
}

fn encode_value(value: &Value, table: &SymbolTable, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null(t) => out.push((null_tid(*t) << 4) | LN_NULL),
        Value::Bool(b) => out.push((TID_BOOL << 4) | *b as u8),
        Value::Int(i) => {
            let tid = if *i < 0 { TID_NEG_INT } else { TID_POS_INT };
            let magnitude = i.unsigned_abs();
            write_header(out, tid, uint_len(magnitude));
            write_uint(out, magnitude);
        }
        Value::Float(x) => {
            if x.to_bits() == 0 {
                out.push(TID_FLOAT << 4);
            } else {
                out.push((TID_FLOAT << 4) | 8);
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
        Value::Symbol(text) => {
            let sid = sid_of(table, text)? as u64;
            write_header(out, TID_SYMBOL, uint_len(sid));
            write_uint(out, sid);
        }
        Value::String(s) => write_bytes(out, TID_STRING, s.as_bytes()),
        Value::Clob(b) => write_bytes(out, TID_CLOB, b),
        Value::Blob(b) => write_bytes(out, TID_BLOB, b),
        Value::List(items) => write_sequence(out, TID_LIST, items, table)?,
        Value::Sexp(items) => write_sequence(out, TID_SEXP, items, table)?,
        Value::Struct(fields) => {
            let mut body = Vec::new();
            for (name, v) in fields {
                write_var_uint(&mut body, sid_of(table, name)? as u64);
                encode_into(v, table, &mut body)?;
            }
            write_header(out, TID_STRUCT, body.len());
            out.extend_from_slice(&body);
        }
    }
    Ok(())
}

fn write_bytes(out: &mut Vec<u8>, tid: u8, bytes: &[u8]) {
    write_header(out, tid, bytes.len());
    out.extend_from_slice(bytes);
}

fn write_sequence(
    out: &mut Vec<u8>,
    tid: u8,
    items: &[Element],
    table: &SymbolTable,
) -> Result<()> {
    let mut body = Vec::new();
    for item in items {
        encode_into(item, table, &mut body)?;
    }
    write_header(out, tid, body.len());
    out.extend_from_slice(&body);
    Ok(())
}
