//! A minimal CBOR decoder for the structures App Attest actually sends.
//!
//! Attestation objects and assertions only ever contain integers, byte
//! strings, text strings, arrays and maps with definite lengths. Everything
//! else in RFC 8949 - indefinite lengths, tags, floats, simple values - is
//! rejected outright, which removes a lot of parser surface from untrusted
//! input. Maps keep their pairs in wire order and are never deduplicated;
//! lookups return the first matching key.

use crate::error::AppAttestError;

/// Nesting deeper than this is rejected. Genuine App Attest payloads are
/// three levels deep at most.
const MAX_DEPTH: u8 = 16;

/// A decoded CBOR item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    /// Major types 0 and 1. i128 holds the full negative range.
    Integer(i128),
    /// Major type 2.
    Bytes(Vec<u8>),
    /// Major type 3.
    Text(String),
    /// Major type 4.
    Array(Vec<Value>),
    /// Major type 5, in wire order, duplicates preserved.
    Map(Vec<(Value, Value)>),
}

impl Value {
    pub(crate) fn try_array(&self) -> Result<&[Value], AppAttestError> {
        match self {
            Value::Array(a) => Ok(a),
            _ => Err(AppAttestError::MalformedEncoding),
        }
    }

    pub(crate) fn try_bytes(&self) -> Result<&[u8], AppAttestError> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(AppAttestError::MalformedEncoding),
        }
    }

    pub(crate) fn try_text(&self) -> Result<&str, AppAttestError> {
        match self {
            Value::Text(t) => Ok(t),
            _ => Err(AppAttestError::MalformedEncoding),
        }
    }

    pub(crate) fn try_integer(&self) -> Result<i128, AppAttestError> {
        match self {
            Value::Integer(i) => Ok(*i),
            _ => Err(AppAttestError::MalformedEncoding),
        }
    }

    /// First-match lookup in a map. Returns None when self is not a map or
    /// the key is absent.
    pub(crate) fn lookup(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(m) => m.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub(crate) fn lookup_text(&self, key: &str) -> Option<&Value> {
        self.lookup(&Value::Text(key.to_string()))
    }

    pub(crate) fn lookup_integer(&self, key: i128) -> Option<&Value> {
        self.lookup(&Value::Integer(key))
    }
}

/// Decode a single CBOR item that must span the whole input. Trailing bytes
/// are an error - a well-formed attestation object is exactly one item.
pub(crate) fn decode(input: &[u8]) -> Result<Value, AppAttestError> {
    let (value, rest) = decode_item(input, 0)?;
    if !rest.is_empty() {
        return Err(AppAttestError::MalformedEncoding);
    }
    Ok(value)
}

fn decode_item(input: &[u8], depth: u8) -> Result<(Value, &[u8]), AppAttestError> {
    if depth > MAX_DEPTH {
        return Err(AppAttestError::MalformedEncoding);
    }
    let (initial, rest) = input
        .split_first()
        .ok_or(AppAttestError::MalformedEncoding)?;
    let major = initial >> 5;
    let (argument, rest) = decode_argument(initial & 0x1f, rest)?;
    match major {
        0 => Ok((Value::Integer(argument as i128), rest)),
        1 => Ok((Value::Integer(-1 - argument as i128), rest)),
        2 => {
            let (bytes, rest) = split_exact(argument, rest)?;
            Ok((Value::Bytes(bytes.to_vec()), rest))
        }
        3 => {
            let (bytes, rest) = split_exact(argument, rest)?;
            let text = std::str::from_utf8(bytes).map_err(|_| AppAttestError::MalformedEncoding)?;
            Ok((Value::Text(text.to_string()), rest))
        }
        4 => {
            let mut items = Vec::new();
            let mut rest = rest;
            for _ in 0..argument {
                let (item, r) = decode_item(rest, depth + 1)?;
                items.push(item);
                rest = r;
            }
            Ok((Value::Array(items), rest))
        }
        5 => {
            let mut pairs = Vec::new();
            let mut rest = rest;
            for _ in 0..argument {
                let (key, r) = decode_item(rest, depth + 1)?;
                let (value, r) = decode_item(r, depth + 1)?;
                pairs.push((key, value));
                rest = r;
            }
            Ok((Value::Map(pairs), rest))
        }
        // Tags (6) and floats/simple values (7) never appear in App Attest
        // payloads.
        _ => Err(AppAttestError::MalformedEncoding),
    }
}

/// Read the length/value argument following the initial byte. Additional
/// information 24..=27 selects a 1/2/4/8 byte big-endian argument; 28..=30
/// are reserved and 31 marks indefinite-length items, all rejected.
fn decode_argument(info: u8, input: &[u8]) -> Result<(u64, &[u8]), AppAttestError> {
    let width = match info {
        n @ 0..=23 => return Ok((n as u64, input)),
        24 => 1,
        25 => 2,
        26 => 4,
        27 => 8,
        _ => return Err(AppAttestError::MalformedEncoding),
    };
    if input.len() < width {
        return Err(AppAttestError::MalformedEncoding);
    }
    let (arg_bytes, rest) = input.split_at(width);
    let mut argument = 0u64;
    for byte in arg_bytes {
        argument = (argument << 8) | u64::from(*byte);
    }
    Ok((argument, rest))
}

fn split_exact(len: u64, input: &[u8]) -> Result<(&[u8], &[u8]), AppAttestError> {
    let len = usize::try_from(len).map_err(|_| AppAttestError::MalformedEncoding)?;
    if input.len() < len {
        return Err(AppAttestError::MalformedEncoding);
    }
    Ok(input.split_at(len))
}
