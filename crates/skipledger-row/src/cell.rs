use crate::Error;
use skipledger_digest::{Digest, Hash, HASH_LEN};

/// Maximum encoded length for `STRING` and `BYTES` cells.
pub const MAX_VARIABLE_LEN: usize = 65_535;

/// A typed cell value, the unit `SourceRow` cells are built from.
///
/// Collapses the source format's deep value-type hierarchy to a small,
/// fixed tagged enum (see the workspace design notes on deep inheritance
/// over column values): polymorphic behavior becomes a match over the tag.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    Bytes(Vec<u8>),
    Hash(Hash),
    String(String),
    Long(i64),
    Double(f64),
    /// UTC milliseconds.
    Date(i64),
}

impl Cell {
    /// Build a `BYTES` cell, canonically promoting exactly-32-byte values to
    /// `HASH` the way decoders do on the wire.
    pub fn bytes(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() > MAX_VARIABLE_LEN {
            return Err(Error::Oversize { len: data.len() });
        }
        if data.len() == HASH_LEN {
            let mut h = [0u8; HASH_LEN];
            h.copy_from_slice(&data);
            return Ok(Cell::Hash(h));
        }
        Ok(Cell::Bytes(data))
    }

    /// Build a `STRING` cell, rejecting UTF-8 payloads over the byte limit.
    pub fn string(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        if s.len() > MAX_VARIABLE_LEN {
            return Err(Error::Oversize { len: s.len() });
        }
        Ok(Cell::String(s))
    }

    /// Whether salting this cell is permitted. `HASH` is always unsalted;
    /// `DOUBLE` is rejected under any scheme that would salt it (see
    /// `SourceRow::new`).
    pub(crate) fn allows_salt(&self) -> bool {
        !matches!(self, Cell::Hash(_))
    }

    pub(crate) fn is_double(&self) -> bool {
        matches!(self, Cell::Double(_))
    }

    /// The fixed typed encoding used as input to unsalted/salted hashing.
    pub fn typed_encoding(&self) -> Result<Vec<u8>, Error> {
        Ok(match self {
            Cell::Null => vec![0x00],
            Cell::Long(v) => v.to_be_bytes().to_vec(),
            Cell::Date(v) => v.to_be_bytes().to_vec(),
            Cell::Double(v) => v.to_bits().to_be_bytes().to_vec(),
            Cell::String(s) => {
                if s.len() > MAX_VARIABLE_LEN {
                    return Err(Error::Oversize { len: s.len() });
                }
                let mut out = (s.len() as u32).to_be_bytes().to_vec();
                out.extend_from_slice(s.as_bytes());
                out
            }
            Cell::Bytes(b) => {
                if b.len() > MAX_VARIABLE_LEN {
                    return Err(Error::Oversize { len: b.len() });
                }
                let mut out = (b.len() as u16).to_be_bytes().to_vec();
                out.extend_from_slice(b);
                out
            }
            Cell::Hash(h) => h.to_vec(),
        })
    }

    /// Unsalted cell hash: `H(typed-encoding(value))`.
    pub fn unsalted_hash(&self, digest: &mut Digest) -> Result<Hash, Error> {
        let encoded = self.typed_encoding()?;
        Ok(digest.hash(&[&encoded]))
    }

    /// Salted cell hash: `H( cellSalt ‖ H(typed-encoding(value)) )`. `HASH`
    /// cells ignore the requested salt and always hash unsalted.
    pub fn salted_hash(&self, cell_salt: Hash, digest: &mut Digest) -> Result<Hash, Error> {
        if !self.allows_salt() {
            return self.unsalted_hash(digest);
        }
        let inner = self.unsalted_hash(digest)?;
        Ok(digest.hash(&[&cell_salt, &inner]))
    }

    /// Total function replacing reflection-based `Object -> Cell` dispatch:
    /// classify a loosely-typed JSON value into a `Cell`, or `BadType`.
    pub fn classify(value: &serde_json::Value) -> Result<Self, Error> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Cell::Null),
            Value::Bool(_) => Err(Error::BadType("bool is not a supported cell type")),
            Value::String(s) => Cell::string(s.clone()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Cell::Long(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Cell::Double(f))
                } else {
                    Err(Error::BadType("numeric cell exceeds 64-bit precision"))
                }
            }
            Value::Array(items) => {
                let mut bytes = Vec::with_capacity(items.len());
                for item in items {
                    let n = item
                        .as_u64()
                        .filter(|n| *n <= u8::MAX as u64)
                        .ok_or(Error::BadType("byte array elements must be u8"))?;
                    bytes.push(n as u8);
                }
                Cell::bytes(bytes)
            }
            Value::Object(_) => Err(Error::BadType("nested objects are not a supported cell type")),
        }
    }
}

/// Which cell indices of a `SourceRow` are salted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SaltScheme {
    NoSalt,
    SaltAll,
    SaltOnly(std::collections::BTreeSet<usize>),
    SaltExcept(std::collections::BTreeSet<usize>),
}

impl SaltScheme {
    /// Whether index `idx` is salted under this scheme.
    pub fn salts(&self, idx: usize) -> bool {
        match self {
            SaltScheme::NoSalt => false,
            SaltScheme::SaltAll => true,
            SaltScheme::SaltOnly(set) => set.contains(&idx),
            SaltScheme::SaltExcept(set) => !set.contains(&idx),
        }
    }
}
