//! Plutus data: the structural on-chain data format
//!
//! Inline datums, redeemers and script parameters are all `PlutusData`
//! trees. The binary form is CBOR with the ledger's conventions:
//! - constructor `n` uses tag `121 + n` for `n < 7`, `1280 + (n - 7)` for
//!   `n < 128`, and the general `102 [n, fields]` form beyond that
//! - non-empty lists are written as indefinite-length arrays
//! - byte strings longer than 64 bytes are split into 64-byte chunks
//! - integers outside the 64-bit range use bignum tags 2 and 3

use std::fmt;

use crate::error::{CoreError, Result};

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

const TAG_POS_BIGNUM: u64 = 2;
const TAG_NEG_BIGNUM: u64 = 3;
const TAG_CONSTR_GENERAL: u64 = 102;
const TAG_CONSTR_SMALL: u64 = 121;
const TAG_CONSTR_LARGE: u64 = 1280;

const BYTES_CHUNK: usize = 64;
const MAX_DEPTH: usize = 256;

/// A node of the Plutus data tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Int(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        PlutusData::Constr { tag, fields }
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        PlutusData::Bytes(bytes.into())
    }

    pub fn int(value: impl Into<i128>) -> Self {
        PlutusData::Int(value.into())
    }

    /// Short name of the node kind, used in decode errors
    pub fn kind(&self) -> &'static str {
        match self {
            PlutusData::Constr { .. } => "constructor",
            PlutusData::Map(_) => "map",
            PlutusData::List(_) => "list",
            PlutusData::Int(_) => "integer",
            PlutusData::Bytes(_) => "bytes",
        }
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_data(self, &mut out);
        out
    }

    pub fn to_cbor_hex(&self) -> String {
        hex::encode(self.to_cbor())
    }

    /// Decode a complete CBOR item; trailing bytes are an error
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(bytes);
        let data = decoder.data(0)?;
        if decoder.pos != bytes.len() {
            return Err(decoder.error(format!(
                "{} trailing bytes after data item",
                bytes.len() - decoder.pos
            )));
        }
        Ok(data)
    }

    pub fn from_cbor_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHex(e.to_string()))?;
        Self::from_cbor(&bytes)
    }
}

impl fmt::Display for PlutusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlutusData::Constr { tag, fields } => {
                write!(f, "Constr{}[", tag)?;
                write_joined(f, fields)?;
                f.write_str("]")
            }
            PlutusData::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            PlutusData::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            PlutusData::Int(v) => write!(f, "{}", v),
            PlutusData::Bytes(b) => write!(f, "#{}", hex::encode(b)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[PlutusData]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn write_head(major: u8, value: u64, out: &mut Vec<u8>) {
    let m = major << 5;
    if value < 24 {
        out.push(m | value as u8);
    } else if value <= u8::MAX as u64 {
        out.push(m | 24);
        out.push(value as u8);
    } else if value <= u16::MAX as u64 {
        out.push(m | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        out.push(m | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(m | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn encode_items(items: &[PlutusData], out: &mut Vec<u8>) {
    if items.is_empty() {
        write_head(MAJOR_ARRAY, 0, out);
        return;
    }
    out.push((MAJOR_ARRAY << 5) | INDEFINITE);
    for item in items {
        encode_data(item, out);
    }
    out.push(BREAK);
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    if bytes.len() <= BYTES_CHUNK {
        write_head(MAJOR_BYTES, bytes.len() as u64, out);
        out.extend_from_slice(bytes);
        return;
    }
    out.push((MAJOR_BYTES << 5) | INDEFINITE);
    for chunk in bytes.chunks(BYTES_CHUNK) {
        write_head(MAJOR_BYTES, chunk.len() as u64, out);
        out.extend_from_slice(chunk);
    }
    out.push(BREAK);
}

fn encode_int(value: i128, out: &mut Vec<u8>) {
    if value >= 0 {
        match u64::try_from(value) {
            Ok(v) => write_head(MAJOR_UNSIGNED, v, out),
            Err(_) => {
                write_head(MAJOR_TAG, TAG_POS_BIGNUM, out);
                encode_bytes(&minimal_be_bytes(value as u128), out);
            }
        }
    } else {
        // CBOR negative integers store -1 - n
        let magnitude = (-1 - value) as u128;
        match u64::try_from(magnitude) {
            Ok(v) => write_head(MAJOR_NEGATIVE, v, out),
            Err(_) => {
                write_head(MAJOR_TAG, TAG_NEG_BIGNUM, out);
                encode_bytes(&minimal_be_bytes(magnitude), out);
            }
        }
    }
}

fn minimal_be_bytes(value: u128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn encode_data(data: &PlutusData, out: &mut Vec<u8>) {
    match data {
        PlutusData::Constr { tag, fields } => {
            if *tag < 7 {
                write_head(MAJOR_TAG, TAG_CONSTR_SMALL + tag, out);
                encode_items(fields, out);
            } else if *tag < 128 {
                write_head(MAJOR_TAG, TAG_CONSTR_LARGE + (tag - 7), out);
                encode_items(fields, out);
            } else {
                write_head(MAJOR_TAG, TAG_CONSTR_GENERAL, out);
                write_head(MAJOR_ARRAY, 2, out);
                write_head(MAJOR_UNSIGNED, *tag, out);
                encode_items(fields, out);
            }
        }
        PlutusData::Map(entries) => {
            write_head(MAJOR_MAP, entries.len() as u64, out);
            for (k, v) in entries {
                encode_data(k, out);
                encode_data(v, out);
            }
        }
        PlutusData::List(items) => encode_items(items, out),
        PlutusData::Int(v) => encode_int(*v, out),
        PlutusData::Bytes(b) => encode_bytes(b, out),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Length of a container: a definite count or "until break"
enum Len {
    Definite(u64),
    Indefinite,
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn error(&self, reason: impl Into<String>) -> CoreError {
        CoreError::Cbor {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn byte(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.error(format!("need {} more bytes", n)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn peek_break(&self) -> bool {
        self.data.get(self.pos) == Some(&BREAK)
    }

    /// Read an item head, returning the major type and its argument
    fn head(&mut self) -> Result<(u8, Len)> {
        let initial = self.byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let len = match info {
            0..=23 => Len::Definite(info as u64),
            24 => Len::Definite(self.byte()? as u64),
            25 => Len::Definite(u16::from_be_bytes([self.byte()?, self.byte()?]) as u64),
            26 => {
                let b = self.take(4)?;
                Len::Definite(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            27 => {
                let b = self.take(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                Len::Definite(u64::from_be_bytes(arr))
            }
            INDEFINITE => Len::Indefinite,
            _ => return Err(self.error(format!("reserved additional info {}", info))),
        };
        Ok((major, len))
    }

    fn definite(&self, len: Len, what: &str) -> Result<u64> {
        match len {
            Len::Definite(v) => Ok(v),
            Len::Indefinite => Err(self.error(format!("{} cannot be indefinite", what))),
        }
    }

    fn data(&mut self, depth: usize) -> Result<PlutusData> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let (major, len) = self.head()?;
        match major {
            MAJOR_UNSIGNED => Ok(PlutusData::Int(self.definite(len, "integer")? as i128)),
            MAJOR_NEGATIVE => {
                let v = self.definite(len, "integer")? as i128;
                Ok(PlutusData::Int(-1 - v))
            }
            MAJOR_BYTES => Ok(PlutusData::Bytes(self.bytes_body(len)?)),
            MAJOR_ARRAY => Ok(PlutusData::List(self.items(len, depth)?)),
            MAJOR_MAP => {
                let mut entries = Vec::new();
                match len {
                    Len::Definite(n) => {
                        for _ in 0..n {
                            let k = self.data(depth + 1)?;
                            let v = self.data(depth + 1)?;
                            entries.push((k, v));
                        }
                    }
                    Len::Indefinite => {
                        while !self.peek_break() {
                            let k = self.data(depth + 1)?;
                            let v = self.data(depth + 1)?;
                            entries.push((k, v));
                        }
                        self.pos += 1;
                    }
                }
                Ok(PlutusData::Map(entries))
            }
            MAJOR_TAG => {
                let tag = self.definite(len, "tag")?;
                self.tagged(tag, depth)
            }
            MAJOR_SIMPLE => Err(self.error("simple values are not Plutus data")),
            _ => Err(self.error(format!("unexpected major type {}", major))),
        }
    }

    fn tagged(&mut self, tag: u64, depth: usize) -> Result<PlutusData> {
        match tag {
            t if (TAG_CONSTR_SMALL..TAG_CONSTR_SMALL + 7).contains(&t) => {
                let fields = self.array(depth)?;
                Ok(PlutusData::constr(t - TAG_CONSTR_SMALL, fields))
            }
            t if (TAG_CONSTR_LARGE..=TAG_CONSTR_LARGE + 120).contains(&t) => {
                let fields = self.array(depth)?;
                Ok(PlutusData::constr(t - TAG_CONSTR_LARGE + 7, fields))
            }
            TAG_CONSTR_GENERAL => {
                let (major, len) = self.head()?;
                if major != MAJOR_ARRAY || !matches!(len, Len::Definite(2)) {
                    return Err(self.error("general constructor must be a 2-element array"));
                }
                let index = match self.data(depth + 1)? {
                    PlutusData::Int(i) if i >= 0 => i as u64,
                    other => {
                        return Err(self.error(format!(
                            "constructor index must be a natural, got {}",
                            other.kind()
                        )))
                    }
                };
                let fields = self.array(depth)?;
                Ok(PlutusData::constr(index, fields))
            }
            TAG_POS_BIGNUM | TAG_NEG_BIGNUM => {
                let (major, len) = self.head()?;
                if major != MAJOR_BYTES {
                    return Err(self.error("bignum payload must be bytes"));
                }
                let bytes = self.bytes_body(len)?;
                let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
                if significant.len() > 16 {
                    return Err(self.error("bignum exceeds 128 bits"));
                }
                let magnitude = significant
                    .iter()
                    .fold(0u128, |acc, b| (acc << 8) | *b as u128);
                let magnitude = i128::try_from(magnitude)
                    .map_err(|_| self.error("bignum out of integer range"))?;
                Ok(PlutusData::Int(if tag == TAG_POS_BIGNUM {
                    magnitude
                } else {
                    -1 - magnitude
                }))
            }
            other => Err(self.error(format!("unsupported tag {}", other))),
        }
    }

    fn array(&mut self, depth: usize) -> Result<Vec<PlutusData>> {
        let (major, len) = self.head()?;
        if major != MAJOR_ARRAY {
            return Err(self.error("constructor fields must be an array"));
        }
        self.items(len, depth)
    }

    fn items(&mut self, len: Len, depth: usize) -> Result<Vec<PlutusData>> {
        let mut items = Vec::new();
        match len {
            Len::Definite(n) => {
                for _ in 0..n {
                    items.push(self.data(depth + 1)?);
                }
            }
            Len::Indefinite => {
                while !self.peek_break() {
                    items.push(self.data(depth + 1)?);
                }
                self.pos += 1;
            }
        }
        Ok(items)
    }

    fn bytes_body(&mut self, len: Len) -> Result<Vec<u8>> {
        match len {
            Len::Definite(n) => {
                let n = usize::try_from(n).map_err(|_| self.error("byte string too long"))?;
                Ok(self.take(n)?.to_vec())
            }
            Len::Indefinite => {
                let mut out = Vec::new();
                while !self.peek_break() {
                    let (major, chunk_len) = self.head()?;
                    if major != MAJOR_BYTES {
                        return Err(self.error("byte string chunk must be bytes"));
                    }
                    let n = self.definite(chunk_len, "byte string chunk")?;
                    let n = usize::try_from(n).map_err(|_| self.error("chunk too long"))?;
                    out.extend_from_slice(self.take(n)?);
                }
                self.pos += 1;
                Ok(out)
            }
        }
    }
}
