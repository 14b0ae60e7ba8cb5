//! VarUInt and UInt primitives.
//!
//! VarUInt: 7 bits per byte, big-endian, high bit set on the last byte.
//! UInt: plain big-endian magnitude with no leading zero bytes; its length
//! comes from the enclosing type descriptor.

pub fn var_uint_len(mut v: u64) -> usize {
    let mut len = 1;
    while v >= 0x80 {
        v >>= 7;
        len += 1;
    }
    len
}

pub fn write_var_uint(out: &mut Vec<u8>, v: u64) {
    let len = var_uint_len(v);
    for i in (0..len).rev() {
        let mut b = ((v >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            b |= 0x80;
        }
        out.push(b);
    }
}

/// Decode a VarUInt at the start of `data`, returning `(value, bytes_read)`.
/// `None` when the input ends early or overflows 64 bits.
pub fn read_var_uint(data: &[u8]) -> Option<(u64, usize)> {
    let mut v: u64 = 0;
    for (i, b) in data.iter().enumerate() {
        if v > (u64::MAX >> 7) {
            return None;
        }
        v = (v << 7) | (b & 0x7F) as u64;
        if b & 0x80 != 0 {
            return Some((v, i + 1));
        }
    }
    None
}

pub fn uint_len(v: u64) -> usize {
    (64 - v.leading_zeros() as usize).div_ceil(8)
}

pub fn write_uint(out: &mut Vec<u8>, v: u64) {
    let len = uint_len(v);
    out.extend_from_slice(&v.to_be_bytes()[8 - len..]);
}

/// Decode a UInt magnitude; `None` if it does not fit in 64 bits.
pub fn read_uint(bytes: &[u8]) -> Option<u64> {
    let significant = match bytes.iter().position(|b| *b != 0) {
        Some(i) => &bytes[i..],
        None => return Some(0),
    };
    if significant.len() > 8 {
        return None;
    }
    Some(significant.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}
