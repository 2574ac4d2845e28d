use crate::Error;

/// Fixed size of a single crum record. The crum's internal layout is opaque
/// to this crate (see the glossary: "crumtrail / cargo proof ... treated by
/// the core as opaque bytes") — only its length is load-bearing here.
pub const CRUM_SIZE: usize = 48;

/// The two historical trail encodings `NotarizedRow` must read: a single
/// crum record, or a Merkle-style cargo proof over several. Both are
/// preserved for backward read compatibility rather than normalized into
/// one tagged form (see the open design question on this encoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trail {
    Single([u8; CRUM_SIZE]),
    CargoProof { leaves: u32, bytes: Vec<u8> },
}

/// A witness record binding a row hash to a timechain block. The
/// `WitnessRepo` trait (`skipledger-core`) stores `NotarizedRow::to_bytes()`
/// output directly as its opaque trail blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotarizedRow {
    pub row: u64,
    pub trail: Trail,
}

impl NotarizedRow {
    pub fn single(row: u64, crum: [u8; CRUM_SIZE]) -> Self {
        Self { row, trail: Trail::Single(crum) }
    }

    pub fn cargo_proof(row: u64, leaves: u32, bytes: Vec<u8>) -> Self {
        Self { row, trail: Trail::CargoProof { leaves, bytes } }
    }

    pub fn crum_count(&self) -> u32 {
        match &self.trail {
            Trail::Single(_) => 1,
            Trail::CargoProof { leaves, .. } => *leaves,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.row.to_be_bytes());
        out.extend_from_slice(&self.crum_count().to_be_bytes());
        match &self.trail {
            Trail::Single(crum) => out.extend_from_slice(crum),
            Trail::CargoProof { bytes, .. } => {
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cur = bytes;
        let row = u64::from_be_bytes(take(&mut cur, 8)?.try_into().unwrap());
        let cc = u32::from_be_bytes(take(&mut cur, 4)?.try_into().unwrap());
        if cc == 0 {
            return Err(Error::Malformed("crum count must be at least 1"));
        }
        let trail = if cc == 1 {
            let mut crum = [0u8; CRUM_SIZE];
            crum.copy_from_slice(take(&mut cur, CRUM_SIZE)?);
            Trail::Single(crum)
        } else {
            let payload_len = u32::from_be_bytes(take(&mut cur, 4)?.try_into().unwrap()) as usize;
            let payload = take(&mut cur, payload_len)?.to_vec();
            Trail::CargoProof { leaves: cc, bytes: payload }
        };
        if !cur.is_empty() {
            return Err(Error::Malformed("trailing bytes after notarized row"));
        }
        Ok(Self { row, trail })
    }
}

fn take<'a>(cur: &mut &'a [u8], n: usize) -> Result<&'a [u8], Error> {
    if cur.len() < n {
        return Err(Error::Malformed("unexpected end of notarized-row bytes"));
    }
    let (head, tail) = cur.split_at(n);
    *cur = tail;
    Ok(head)
}
