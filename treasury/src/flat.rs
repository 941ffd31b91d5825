//! Parameter application for compiled validators
//!
//! Blueprint validators are flat-encoded untyped Plutus Core programs wrapped
//! in a CBOR byte string. Applying parameters wraps the program body in one
//! `Apply` node per parameter, each applied to a `Data` constant:
//!
//! ```text
//! (program v body)  +  [p1, p2]  =>  (program v [[body p1] p2])
//! ```
//!
//! The body's end is not marked by the trailing filler, and byte strings
//! inside it are aligned to absolute positions, so the body is walked and
//! re-emitted term by term.

use treasury_core::{blake2b_224, Hash28, PlutusData};

use crate::error::{Result, TreasuryError};

const TERM_VAR: u8 = 0;
const TERM_DELAY: u8 = 1;
const TERM_LAMBDA: u8 = 2;
const TERM_APPLY: u8 = 3;
const TERM_CONSTANT: u8 = 4;
const TERM_FORCE: u8 = 5;
const TERM_ERROR: u8 = 6;
const TERM_BUILTIN: u8 = 7;
const TERM_CONSTR: u8 = 8;
const TERM_CASE: u8 = 9;

const TYPE_INTEGER: u8 = 0;
const TYPE_BYTESTRING: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_UNIT: u8 = 3;
const TYPE_BOOL: u8 = 4;
const TYPE_LIST: u8 = 5;
const TYPE_PAIR: u8 = 6;
const TYPE_APPLY: u8 = 7;
const TYPE_DATA: u8 = 8;

const MAX_DEPTH: usize = 4096;

/// Plutus language version of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlutusVersion {
    V1,
    V2,
    V3,
}

impl PlutusVersion {
    /// Prefix byte hashed in front of the script bytes
    pub fn language_tag(&self) -> u8 {
        match self {
            PlutusVersion::V1 => 0x01,
            PlutusVersion::V2 => 0x02,
            PlutusVersion::V3 => 0x03,
        }
    }
}

/// A Plutus script as carried in transactions: CBOR-wrapped flat bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlutusScript {
    version: PlutusVersion,
    cbor: Vec<u8>,
}

impl PlutusScript {
    /// Accepts single or double CBOR wrapping and normalizes to single
    pub fn from_cbor(version: PlutusVersion, cbor: &[u8]) -> Result<Self> {
        let flat = unwrap_cbor(cbor)?;
        Ok(Self {
            version,
            cbor: wrap_cbor(&flat),
        })
    }

    pub fn from_cbor_hex(version: PlutusVersion, cbor_hex: &str) -> Result<Self> {
        let bytes = hex::decode(cbor_hex).map_err(|e| TreasuryError::Script(e.to_string()))?;
        Self::from_cbor(version, &bytes)
    }

    pub fn version(&self) -> PlutusVersion {
        self.version
    }

    pub fn cbor(&self) -> &[u8] {
        &self.cbor
    }

    pub fn cbor_hex(&self) -> String {
        hex::encode(&self.cbor)
    }

    /// Script hash: blake2b-224 over the language tag and script bytes
    pub fn hash(&self) -> Hash28 {
        blake2b_224(&[&[self.version.language_tag()], &self.cbor])
    }

    /// A new script with `params` applied in order
    pub fn apply_params(&self, params: &[PlutusData]) -> Result<Self> {
        let flat = unwrap_cbor(&self.cbor)?;
        let applied = apply_params_flat(&flat, params)?;
        Ok(Self {
            version: self.version,
            cbor: wrap_cbor(&applied),
        })
    }
}

// ---------------------------------------------------------------------------
// CBOR byte string wrapping
// ---------------------------------------------------------------------------

fn wrap_cbor(bytes: &[u8]) -> Vec<u8> {
    let len = bytes.len() as u64;
    let mut out = Vec::with_capacity(bytes.len() + 9);
    if len < 24 {
        out.push(0x40 | len as u8);
    } else if len <= u8::MAX as u64 {
        out.push(0x58);
        out.push(len as u8);
    } else if len <= u16::MAX as u64 {
        out.push(0x59);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as u64 {
        out.push(0x5a);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        out.push(0x5b);
        out.extend_from_slice(&len.to_be_bytes());
    }
    out.extend_from_slice(bytes);
    out
}

/// Contents of a definite CBOR byte string spanning the whole input
fn bytestring_body(bytes: &[u8]) -> Option<&[u8]> {
    let (&initial, rest) = bytes.split_first()?;
    if initial >> 5 != 2 {
        return None;
    }
    let (len, header) = match initial & 0x1f {
        n @ 0..=23 => (n as usize, 0),
        24 => (*rest.first()? as usize, 1),
        25 => (u16::from_be_bytes(rest.get(..2)?.try_into().ok()?) as usize, 2),
        26 => (u32::from_be_bytes(rest.get(..4)?.try_into().ok()?) as usize, 4),
        27 => (
            usize::try_from(u64::from_be_bytes(rest.get(..8)?.try_into().ok()?)).ok()?,
            8,
        ),
        _ => return None,
    };
    let body = rest.get(header..)?;
    (body.len() == len).then_some(body)
}

/// Strip one or two layers of CBOR byte string wrapping
fn unwrap_cbor(bytes: &[u8]) -> Result<Vec<u8>> {
    let once = bytestring_body(bytes)
        .ok_or_else(|| TreasuryError::Script("script is not a CBOR byte string".to_string()))?;
    Ok(bytestring_body(once).unwrap_or(once).to_vec())
}

// ---------------------------------------------------------------------------
// Bit streams
// ---------------------------------------------------------------------------

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len() * 8
    }

    fn bit(&mut self) -> Result<bool> {
        if self.at_end() {
            return Err(TreasuryError::Script("unexpected end of program".to_string()));
        }
        let b = (self.bytes[self.pos / 8] >> (7 - self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Ok(b)
    }

    fn bits(&mut self, n: usize) -> Result<u8> {
        let mut v = 0u8;
        for _ in 0..n {
            v = (v << 1) | self.bit()? as u8;
        }
        Ok(v)
    }

    fn natural(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let chunk = self.bits(8)?;
            if shift >= 64 {
                return Err(TreasuryError::Script("natural number overflow".to_string()));
            }
            value |= ((chunk & 0x7f) as u64) << shift;
            if chunk & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Skip filler: zero bits up to and including a one bit at a byte boundary
    fn filler(&mut self) -> Result<()> {
        while !self.bit()? {}
        if self.pos % 8 != 0 {
            return Err(TreasuryError::Script("misaligned filler".to_string()));
        }
        Ok(())
    }
}

struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            current: 0,
            used: 0,
        }
    }

    fn bit(&mut self, b: bool) {
        self.current = (self.current << 1) | b as u8;
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    fn bits(&mut self, value: u8, n: usize) {
        for i in (0..n).rev() {
            self.bit((value >> i) & 1 == 1);
        }
    }

    fn natural(&mut self, mut n: u64) {
        loop {
            let chunk = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                self.bits(chunk, 8);
                return;
            }
            self.bits(chunk | 0x80, 8);
        }
    }

    fn filler(&mut self) {
        while self.used != 7 {
            self.bit(false);
        }
        self.bit(true);
    }

    fn bytestring(&mut self, data: &[u8]) {
        self.filler();
        for chunk in data.chunks(255) {
            self.bits(chunk.len() as u8, 8);
            for b in chunk {
                self.bits(*b, 8);
            }
        }
        self.bits(0, 8);
    }

    fn finish(mut self) -> Vec<u8> {
        self.filler();
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// Term transcoding
// ---------------------------------------------------------------------------

/// Constant type, as far as needed to walk a value
enum ConstType {
    Integer,
    ByteString,
    Unit,
    Bool,
    Data,
    List(Box<ConstType>),
    Pair(Box<ConstType>, Box<ConstType>),
}

fn parse_type(tags: &[u8], pos: &mut usize) -> Result<ConstType> {
    let tag = *tags
        .get(*pos)
        .ok_or_else(|| TreasuryError::Script("truncated constant type".to_string()))?;
    *pos += 1;
    match tag {
        TYPE_INTEGER => Ok(ConstType::Integer),
        TYPE_BYTESTRING | TYPE_STRING => Ok(ConstType::ByteString),
        TYPE_UNIT => Ok(ConstType::Unit),
        TYPE_BOOL => Ok(ConstType::Bool),
        TYPE_DATA => Ok(ConstType::Data),
        TYPE_APPLY => match tags.get(*pos).copied() {
            Some(TYPE_LIST) => {
                *pos += 1;
                Ok(ConstType::List(Box::new(parse_type(tags, pos)?)))
            }
            Some(TYPE_APPLY) if tags.get(*pos + 1) == Some(&TYPE_PAIR) => {
                *pos += 2;
                let first = parse_type(tags, pos)?;
                let second = parse_type(tags, pos)?;
                Ok(ConstType::Pair(Box::new(first), Box::new(second)))
            }
            _ => Err(TreasuryError::Script("malformed type application".to_string())),
        },
        other => Err(TreasuryError::Script(format!(
            "constant type {} cannot appear in a program",
            other
        ))),
    }
}

/// Copies a term from `reader` to `writer`
///
/// Byte strings are padded to byte boundaries of the *output*, so the term is
/// re-emitted piece by piece rather than copied as a bit range.
struct Transcoder<'a> {
    reader: BitReader<'a>,
    writer: BitWriter,
}

impl Transcoder<'_> {
    fn bits(&mut self, n: usize) -> Result<u8> {
        let v = self.reader.bits(n)?;
        self.writer.bits(v, n);
        Ok(v)
    }

    fn bit(&mut self) -> Result<bool> {
        let b = self.reader.bit()?;
        self.writer.bit(b);
        Ok(b)
    }

    /// Naturals are copied chunk by chunk; integer constants may exceed u64
    fn natural(&mut self) -> Result<()> {
        while self.bits(8)? & 0x80 != 0 {}
        Ok(())
    }

    fn bytestring(&mut self) -> Result<()> {
        self.reader.filler()?;
        self.writer.filler();
        loop {
            let len = self.bits(8)?;
            if len == 0 {
                return Ok(());
            }
            for _ in 0..len {
                self.bits(8)?;
            }
        }
    }

    fn value(&mut self, ty: &ConstType) -> Result<()> {
        match ty {
            ConstType::Integer => self.natural(),
            ConstType::ByteString | ConstType::Data => self.bytestring(),
            ConstType::Unit => Ok(()),
            ConstType::Bool => self.bit().map(|_| ()),
            ConstType::List(elem) => {
                while self.bit()? {
                    self.value(elem)?;
                }
                Ok(())
            }
            ConstType::Pair(first, second) => {
                self.value(first)?;
                self.value(second)
            }
        }
    }

    fn term_list(&mut self, depth: usize) -> Result<()> {
        while self.bit()? {
            self.term(depth + 1)?;
        }
        Ok(())
    }

    fn term(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(TreasuryError::Script("term nesting too deep".to_string()));
        }
        match self.bits(4)? {
            TERM_VAR => self.natural(),
            TERM_DELAY | TERM_LAMBDA | TERM_FORCE => self.term(depth + 1),
            TERM_APPLY => {
                self.term(depth + 1)?;
                self.term(depth + 1)
            }
            TERM_CONSTANT => {
                let mut tags = Vec::new();
                while self.bit()? {
                    tags.push(self.bits(4)?);
                }
                let mut pos = 0;
                let ty = parse_type(&tags, &mut pos)?;
                if pos != tags.len() {
                    return Err(TreasuryError::Script("trailing constant type tags".to_string()));
                }
                self.value(&ty)
            }
            TERM_ERROR => Ok(()),
            TERM_BUILTIN => self.bits(7).map(|_| ()),
            TERM_CONSTR => {
                self.natural()?;
                self.term_list(depth)
            }
            TERM_CASE => {
                self.term(depth + 1)?;
                self.term_list(depth)
            }
            other => Err(TreasuryError::Script(format!("unknown term tag {}", other))),
        }
    }
}

/// Apply `params` to a flat-encoded program, returning the new flat bytes
pub fn apply_params_flat(flat: &[u8], params: &[PlutusData]) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(flat);
    let version = [reader.natural()?, reader.natural()?, reader.natural()?];
    if version[0] != 1 {
        return Err(TreasuryError::Script(format!(
            "unsupported program version {}.{}.{}",
            version[0], version[1], version[2]
        )));
    }

    let mut writer = BitWriter::new();
    for part in version {
        writer.natural(part);
    }
    for _ in params {
        writer.bits(TERM_APPLY, 4);
    }

    let mut transcoder = Transcoder { reader, writer };
    transcoder.term(0)?;
    let Transcoder {
        mut reader,
        mut writer,
    } = transcoder;
    reader.filler()?;
    if !reader.at_end() {
        return Err(TreasuryError::Script("trailing bytes after program".to_string()));
    }

    for param in params {
        writer.bits(TERM_CONSTANT, 4);
        writer.bit(true);
        writer.bits(TYPE_DATA, 4);
        writer.bit(false);
        writer.bytestring(&param.to_cbor());
    }
    Ok(writer.finish())
}
