use crate::Error;
use std::collections::BTreeMap;

/// Reserved prefix for system-owned sections; caller-supplied section names
/// must not begin with it.
pub const RESERVED_PREFIX: &str = "crums/";

/// A named collection of byte sections, ordered lexicographically by name
/// (a `BTreeMap` gives this for free). Used to bundle a `PathPack` or
/// `NotarizedRow` alongside caller-supplied side material under one
/// container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    sections: BTreeMap<String, Vec<u8>>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a caller-supplied section. Rejects names under the reserved
    /// `crums/` prefix.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(), Error> {
        let name = name.into();
        if name.starts_with(RESERVED_PREFIX) {
            return Err(Error::ReservedSectionName(name));
        }
        self.sections.insert(name, bytes);
        Ok(())
    }

    /// Insert or replace a system-owned `crums/...` section directly.
    /// Unlike [`Bundle::insert`], this is the only way to populate the
    /// reserved prefix.
    pub fn insert_crums(&mut self, suffix: &str, bytes: Vec<u8>) {
        self.sections.insert(format!("{RESERVED_PREFIX}{suffix}"), bytes);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.sections.get(name).map(|v| v.as_slice())
    }

    /// Section names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Serialize: count, then for each section (lexicographic order) a
    /// length-prefixed name and a length-prefixed byte body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.sections.len() as u32).to_be_bytes());
        for (name, bytes) in &self.sections {
            out.extend_from_slice(&(name.len() as u16).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cur = bytes;
        let count = read_u32(&mut cur)? as usize;
        let mut sections = BTreeMap::new();
        for _ in 0..count {
            let name_len = read_u16(&mut cur)? as usize;
            let name_bytes = take(&mut cur, name_len)?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| Error::Malformed("section name is not valid UTF-8"))?;
            let body_len = read_u32(&mut cur)? as usize;
            let body = take(&mut cur, body_len)?.to_vec();
            sections.insert(name, body);
        }
        if !cur.is_empty() {
            return Err(Error::Malformed("trailing bytes after bundle sections"));
        }
        Ok(Self { sections })
    }
}

fn take<'a>(cur: &mut &'a [u8], n: usize) -> Result<&'a [u8], Error> {
    if cur.len() < n {
        return Err(Error::Malformed("unexpected end of bundle bytes"));
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}

fn read_u16(cur: &mut &[u8]) -> Result<u16, Error> {
    Ok(u16::from_be_bytes(take(cur, 2)?.try_into().unwrap()))
}

fn read_u32(cur: &mut &[u8]) -> Result<u32, Error> {
    Ok(u32::from_be_bytes(take(cur, 4)?.try_into().unwrap()))
}
